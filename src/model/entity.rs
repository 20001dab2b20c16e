use std::borrow::Borrow;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use crate::model::key::EntityKey;
use crate::model::ratio::Ratio;

/// One scored entity (peptide node or protein node) loaded from a dataset
/// file. Immutable after load. Equality and hashing are defined over the
/// key only, so entities from different datasets match by identity even
/// when their numeric payloads differ.
#[derive(Debug, Clone)]
pub struct ScoredEntity {
    pub key: EntityKey,
    pub fdr: f64,
    pub ratio: Ratio,
    pub variance: f64,
    pub evidence_count: u32,
}

impl PartialEq for ScoredEntity {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ScoredEntity {}

impl Hash for ScoredEntity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

// Eq and Hash delegate to the key, so key-based set probes are consistent.
impl Borrow<EntityKey> for ScoredEntity {
    fn borrow(&self) -> &EntityKey {
        &self.key
    }
}

/// A dataset label paired with its loaded entity set.
#[derive(Debug, Clone)]
pub struct NamedEntitySet {
    pub name: String,
    pub entities: HashSet<ScoredEntity>,
}

impl NamedEntitySet {
    pub fn new(name: impl Into<String>, entities: HashSet<ScoredEntity>) -> NamedEntitySet {
        NamedEntitySet {
            name: name.into(),
            entities,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn contains_key(&self, key: &EntityKey) -> bool {
        self.entities.contains(key)
    }

    pub fn get(&self, key: &EntityKey) -> Option<&ScoredEntity> {
        self.entities.get(key)
    }
}
