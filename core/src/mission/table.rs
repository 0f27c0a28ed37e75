use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::prelude::{ControlError, ControlResult};

/// What a marker id stands for on the course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MarkerKind {
    Point { name: String },
    Sector { name: String },
}

impl MarkerKind {
    pub fn name(&self) -> &str {
        match self {
            MarkerKind::Point { name } | MarkerKind::Sector { name } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerEntry {
    pub id: u32,
    #[serde(flatten)]
    pub kind: MarkerKind,
}

impl MarkerEntry {
    pub fn point(id: u32, name: &str) -> Self {
        Self {
            id,
            kind: MarkerKind::Point { name: name.into() },
        }
    }

    pub fn sector(id: u32, name: &str) -> Self {
        Self {
            id,
            kind: MarkerKind::Sector { name: name.into() },
        }
    }
}

/// Marker-id lookup table, validated once at startup.
///
/// Entry order is significant: the first `Point` in configured order is the
/// default waypoint that detections are attributed to before any waypoint has
/// been sighted.
#[derive(Debug, Clone)]
pub struct MarkerTable {
    entries: Vec<MarkerEntry>,
    index: HashMap<u32, usize>,
}

impl MarkerTable {
    pub fn new(entries: Vec<MarkerEntry>) -> ControlResult<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if entry.kind.name().trim().is_empty() {
                return Err(ControlError::InvalidConfig(format!(
                    "marker {} has an empty name",
                    entry.id
                )));
            }
            if index.insert(entry.id, position).is_some() {
                return Err(ControlError::InvalidConfig(format!(
                    "marker {} is listed more than once",
                    entry.id
                )));
            }
        }
        Ok(Self { entries, index })
    }

    pub fn lookup(&self, id: u32) -> Option<&MarkerKind> {
        self.index.get(&id).map(|&position| &self.entries[position].kind)
    }

    pub fn entries(&self) -> &[MarkerEntry] {
        &self.entries
    }

    pub fn default_point(&self) -> Option<&str> {
        self.entries.iter().find_map(|entry| match &entry.kind {
            MarkerKind::Point { name } => Some(name.as_str()),
            MarkerKind::Sector { .. } => None,
        })
    }

    /// Course layout the rover was commissioned with.
    pub fn default_entries() -> Vec<MarkerEntry> {
        vec![
            MarkerEntry::point(1, "Alpha"),
            MarkerEntry::sector(2, "sector1"),
            MarkerEntry::sector(3, "sector2"),
            MarkerEntry::sector(4, "sector3"),
            MarkerEntry::sector(5, "sector4"),
            MarkerEntry::sector(6, "sector5"),
            MarkerEntry::sector(7, "sector6"),
            MarkerEntry::point(8, "Bravo"),
            MarkerEntry::sector(9, "sector7"),
            MarkerEntry::point(10, "Charlie"),
            MarkerEntry::sector(11, "sector8"),
            MarkerEntry::sector(12, "sector9"),
            MarkerEntry::point(13, "Finish"),
        ]
    }
}

impl Default for MarkerTable {
    fn default() -> Self {
        let entries = Self::default_entries();
        let index = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.id, position))
            .collect();
        Self { entries, index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_resolves_points_and_sectors() {
        let table = MarkerTable::default();
        assert_eq!(
            table.lookup(8),
            Some(&MarkerKind::Point {
                name: "Bravo".into()
            })
        );
        assert_eq!(table.lookup(11).map(MarkerKind::name), Some("sector8"));
        assert!(table.lookup(42).is_none());
        assert_eq!(table.default_point(), Some("Alpha"));
    }

    #[test]
    fn default_point_follows_configured_order() {
        let table = MarkerTable::new(vec![
            MarkerEntry::sector(1, "sector1"),
            MarkerEntry::point(20, "Zulu"),
            MarkerEntry::point(3, "Alpha"),
        ])
        .unwrap();
        assert_eq!(table.default_point(), Some("Zulu"));
    }

    #[test]
    fn duplicate_ids_and_blank_names_are_rejected() {
        assert!(MarkerTable::new(vec![
            MarkerEntry::point(1, "Alpha"),
            MarkerEntry::sector(1, "sector1"),
        ])
        .is_err());
        assert!(MarkerTable::new(vec![MarkerEntry::point(1, " ")]).is_err());
    }

    #[test]
    fn entries_deserialize_from_tagged_json() {
        let entry: MarkerEntry =
            serde_json::from_str(r#"{"id": 9, "kind": "sector", "name": "sector7"}"#).unwrap();
        assert_eq!(entry, MarkerEntry::sector(9, "sector7"));
    }
}
