use std::fmt;

/// Composite identity key for a scored entity.
///
/// A key is an ordered list of string components (one for peptide keys,
/// several for protein keys where an accession and a cluster id are joined
/// in a single column). Two entities are the same entity iff their joined
/// key strings are equal; the numeric payload never participates in
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    components: Vec<String>,
    joined: String,
}

impl EntityKey {
    /// Split a raw column value on `separator`, trimming each component.
    /// Empty components are kept out of the key.
    pub fn parse(field: &str, separator: &str) -> EntityKey {
        let components: Vec<String> = field
            .split(separator)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        let joined = components.join(separator);
        EntityKey { components, joined }
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn joined(&self) -> &str {
        &self.joined
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined)
    }
}
