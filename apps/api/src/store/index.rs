use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::records::EntityKind;

pub const INDEX_FILE: &str = "index.json";

/// kind → (id → last-touched epoch millis).
///
/// An optimization hint only. The directory listing stays the source of
/// truth for counts and enumeration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Index {
    kinds: BTreeMap<String, BTreeMap<String, i64>>,
}

impl Index {
    pub fn touch(&mut self, kind: EntityKind, id: &str, at_ms: i64) {
        self.kinds
            .entry(kind.dir_name().to_string())
            .or_default()
            .insert(id.to_string(), at_ms);
    }

    pub fn forget(&mut self, kind: EntityKind, id: &str) {
        if let Some(ids) = self.kinds.get_mut(kind.dir_name()) {
            ids.remove(id);
        }
    }

    pub fn last_touched(&self, kind: EntityKind, id: &str) -> Option<i64> {
        self.kinds.get(kind.dir_name())?.get(id).copied()
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.kinds.get(kind.dir_name()).map_or(0, BTreeMap::len)
    }
}
