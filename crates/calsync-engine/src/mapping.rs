//! Bijection between source and destination identifiers.
//!
//! The persisted form is line-based text:
//!
//! ```text
//! # NotesID:OutlookID
//! <source id>:<destination id>
//! ```
//!
//! Identifiers are written without escaping, so they must not contain `:`
//! or line breaks.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use crate::error::{EngineError, EngineResult};

/// First line of every mapping file.
pub const MAPPING_HEADER: &str = "# NotesID:OutlookID";

const SEPARATOR: char = ':';

/// Source and destination ids, one-to-one.
///
/// Both directions are kept in step: adding a pair drops whatever either id
/// was paired with before.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierMapping {
    by_source: BTreeMap<String, String>,
    by_destination: HashMap<String, String>,
}

impl IdentifierMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairs `source` with `destination`, replacing earlier pairs of either.
    pub fn add_pair(&mut self, source: impl Into<String>, destination: impl Into<String>) {
        let source = source.into();
        let destination = destination.into();

        if let Some(old_destination) = self.by_source.insert(source.clone(), destination.clone()) {
            if old_destination != destination {
                self.by_destination.remove(&old_destination);
            }
        }
        if let Some(old_source) = self.by_destination.insert(destination, source.clone()) {
            if old_source != source {
                self.by_source.remove(&old_source);
            }
        }
    }

    /// Returns the destination id paired with `source`.
    pub fn destination_for(&self, source: &str) -> Option<&str> {
        self.by_source.get(source).map(String::as_str)
    }

    /// Returns the source id paired with `destination`.
    pub fn source_for(&self, destination: &str) -> Option<&str> {
        self.by_destination.get(destination).map(String::as_str)
    }

    /// Returns true if `source` is paired.
    pub fn contains_source(&self, source: &str) -> bool {
        self.by_source.contains_key(source)
    }

    /// Returns true if `destination` is paired.
    pub fn contains_destination(&self, destination: &str) -> bool {
        self.by_destination.contains_key(destination)
    }

    /// Removes the pair holding `source`, returning its destination id.
    pub fn remove_by_source(&mut self, source: &str) -> Option<String> {
        let destination = self.by_source.remove(source)?;
        self.by_destination.remove(&destination);
        Some(destination)
    }

    /// Removes the pair holding `destination`, returning its source id.
    pub fn remove_by_destination(&mut self, destination: &str) -> Option<String> {
        let source = self.by_destination.remove(destination)?;
        self.by_source.remove(&source);
        Some(source)
    }

    /// Keeps pairs whose source id satisfies `keep`. Returns the number removed.
    pub fn retain_sources(&mut self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let stale: Vec<String> = self
            .by_source
            .keys()
            .filter(|s| !keep(s))
            .cloned()
            .collect();
        for source in &stale {
            self.remove_by_source(source);
        }
        stale.len()
    }

    /// Keeps pairs whose destination id satisfies `keep`. Returns the number removed.
    pub fn retain_destinations(&mut self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let stale: Vec<String> = self
            .by_destination
            .keys()
            .filter(|d| !keep(d))
            .cloned()
            .collect();
        for destination in &stale {
            self.remove_by_destination(destination);
        }
        stale.len()
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.by_source.len()
    }

    /// Returns true if no pair is stored.
    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }

    /// Iterates pairs ordered by source id.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_source
            .iter()
            .map(|(s, d)| (s.as_str(), d.as_str()))
    }

    /// Parses the persisted text form.
    ///
    /// Comment and blank lines are ignored. Malformed lines are skipped with
    /// a warning and counted in the second tuple element.
    pub fn parse(text: &str) -> (Self, usize) {
        let mut mapping = Self::new();
        let mut malformed = 0;

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match split_pair(line) {
                Some((source, destination)) => mapping.add_pair(source, destination),
                None => {
                    warn!(line = number + 1, content = line, "Skipping malformed mapping line");
                    malformed += 1;
                }
            }
        }

        (mapping, malformed)
    }

    /// Renders the persisted text form.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidIdentifier`] if an id cannot be written
    /// unescaped.
    pub fn to_text(&self) -> EngineResult<String> {
        let mut out = String::with_capacity(MAPPING_HEADER.len() + 1 + self.len() * 32);
        out.push_str(MAPPING_HEADER);
        out.push('\n');
        for (source, destination) in self.iter() {
            check_identifier(source)?;
            check_identifier(destination)?;
            out.push_str(source);
            out.push(SEPARATOR);
            out.push_str(destination);
            out.push('\n');
        }
        Ok(out)
    }
}

/// Returns true if `id` can be stored in the mapping file.
///
/// Parsing trims each id, so ids with leading or trailing whitespace would
/// not survive a save and reload.
pub fn is_storable_identifier(id: &str) -> bool {
    !id.is_empty() && !id.contains([SEPARATOR, '\n', '\r']) && id.trim() == id
}

fn check_identifier(id: &str) -> EngineResult<()> {
    if is_storable_identifier(id) {
        Ok(())
    } else {
        Err(EngineError::invalid_identifier(id))
    }
}

fn split_pair(line: &str) -> Option<(&str, &str)> {
    let (source, destination) = line.split_once(SEPARATOR)?;
    let (source, destination) = (source.trim(), destination.trim());
    if source.is_empty() || destination.is_empty() || destination.contains(SEPARATOR) {
        return None;
    }
    Some((source, destination))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod bijection {
        use super::*;

        #[test]
        fn add_and_lookup() {
            let mut mapping = IdentifierMapping::new();
            mapping.add_pair("n1", "o1");
            assert_eq!(mapping.destination_for("n1"), Some("o1"));
            assert_eq!(mapping.source_for("o1"), Some("n1"));
            assert_eq!(mapping.len(), 1);
        }

        #[test]
        fn readding_source_replaces_destination() {
            let mut mapping = IdentifierMapping::new();
            mapping.add_pair("n1", "o1");
            mapping.add_pair("n1", "o2");

            assert_eq!(mapping.destination_for("n1"), Some("o2"));
            assert_eq!(mapping.source_for("o1"), None);
            assert_eq!(mapping.source_for("o2"), Some("n1"));
            assert_eq!(mapping.len(), 1);
        }

        #[test]
        fn readding_destination_replaces_source() {
            let mut mapping = IdentifierMapping::new();
            mapping.add_pair("n1", "o1");
            mapping.add_pair("n2", "o1");

            assert_eq!(mapping.destination_for("n1"), None);
            assert_eq!(mapping.source_for("o1"), Some("n2"));
            assert_eq!(mapping.len(), 1);
        }

        #[test]
        fn same_pair_twice_is_stable() {
            let mut mapping = IdentifierMapping::new();
            mapping.add_pair("n1", "o1");
            mapping.add_pair("n1", "o1");
            assert_eq!(mapping.len(), 1);
            assert!(mapping.contains_destination("o1"));
        }

        #[test]
        fn remove_keeps_both_sides_in_step() {
            let mut mapping = IdentifierMapping::new();
            mapping.add_pair("n1", "o1");
            mapping.add_pair("n2", "o2");

            assert_eq!(mapping.remove_by_source("n1"), Some("o1".to_string()));
            assert!(!mapping.contains_destination("o1"));
            assert_eq!(mapping.remove_by_destination("o2"), Some("n2".to_string()));
            assert!(!mapping.contains_source("n2"));
            assert!(mapping.is_empty());
            assert_eq!(mapping.remove_by_source("n1"), None);
        }

        #[test]
        fn retain_passes_are_independent() {
            let mut mapping = IdentifierMapping::new();
            mapping.add_pair("n1", "o1");
            mapping.add_pair("n2", "o2");
            mapping.add_pair("n3", "o3");

            assert_eq!(mapping.retain_sources(|s| s != "n1"), 1);
            assert_eq!(mapping.retain_destinations(|d| d != "o2"), 1);

            let pairs: Vec<_> = mapping.iter().collect();
            assert_eq!(pairs, vec![("n3", "o3")]);
        }
    }

    mod text {
        use super::*;

        #[test]
        fn render_sorted_with_header() {
            let mut mapping = IdentifierMapping::new();
            mapping.add_pair("n2", "o2");
            mapping.add_pair("n1", "o1");

            insta::assert_snapshot!(mapping.to_text().unwrap().trim_end(), @r"
            # NotesID:OutlookID
            n1:o1
            n2:o2
            ");
        }

        #[test]
        fn empty_mapping_is_header_only() {
            assert_eq!(
                IdentifierMapping::new().to_text().unwrap(),
                "# NotesID:OutlookID\n"
            );
        }

        #[test]
        fn rejects_separator_in_ids() {
            let mut mapping = IdentifierMapping::new();
            mapping.add_pair("n:1", "o1");
            assert!(matches!(
                mapping.to_text(),
                Err(EngineError::InvalidIdentifier { .. })
            ));
        }

        #[test]
        fn parse_skips_comments_and_malformed() {
            let text = "# NotesID:OutlookID\nn1:o1\n\ngarbage\n:o9\nn2:o2:x\n n3 : o3 \n";
            let (mapping, malformed) = IdentifierMapping::parse(text);

            assert_eq!(malformed, 3);
            assert_eq!(mapping.len(), 2);
            assert_eq!(mapping.destination_for("n1"), Some("o1"));
            assert_eq!(mapping.destination_for("n3"), Some("o3"));
        }

        #[test]
        fn parse_render_roundtrip() {
            let text = "# NotesID:OutlookID\nn1:o1\nn2:o2\n";
            let (mapping, malformed) = IdentifierMapping::parse(text);
            assert_eq!(malformed, 0);
            assert_eq!(mapping.to_text().unwrap(), text);
        }

        #[test]
        fn storable_identifiers() {
            assert!(is_storable_identifier("AAMkAGI2"));
            assert!(!is_storable_identifier(""));
            assert!(!is_storable_identifier("a:b"));
            assert!(!is_storable_identifier("a\nb"));
            assert!(!is_storable_identifier(" n1"));
            assert!(!is_storable_identifier("o1 "));
            assert!(!is_storable_identifier("o1\t"));
            assert!(is_storable_identifier("n 1"));
        }

        #[test]
        fn edge_whitespace_is_not_written() {
            let mut mapping = IdentifierMapping::new();
            mapping.add_pair(" n1", "o1 ");
            assert!(matches!(
                mapping.to_text(),
                Err(EngineError::InvalidIdentifier { .. })
            ));
        }

        #[test]
        fn written_text_parses_back_unchanged() {
            let mut mapping = IdentifierMapping::new();
            mapping.add_pair("n 1", "o 1");
            mapping.add_pair("AAMkAGI2-x", "{1234-abcd}");

            let (back, malformed) = IdentifierMapping::parse(&mapping.to_text().unwrap());
            assert_eq!(malformed, 0);
            assert_eq!(back, mapping);
        }
    }
}
