use std::collections::HashSet;

use tracing::info;

use crate::model::{EntityKey, NamedEntitySet, ScoredEntity};

/// Mutually exclusive membership regions of a 2- or 3-way comparison.
///
/// Regions hold one representative entity per key, taken from the earliest
/// dataset that defines the key, and are sorted by key so report output is
/// deterministic.
#[derive(Debug, Clone)]
pub struct OverlapPartition {
    pub names: Vec<String>,
    /// Input set sizes, same order as `names`.
    pub set_sizes: Vec<usize>,
    /// Present in every compared set.
    pub all: Vec<ScoredEntity>,
    pub only_a: Vec<ScoredEntity>,
    pub only_b: Vec<ScoredEntity>,
    /// 3-way regions; `None` for a 2-way comparison.
    pub only_c: Option<Vec<ScoredEntity>>,
    pub ab_only: Option<Vec<ScoredEntity>>,
    pub ac_only: Option<Vec<ScoredEntity>>,
    pub bc_only: Option<Vec<ScoredEntity>>,
    /// Full pairwise intersection sizes (not "only" regions): AB, AC, BC.
    pub pair_sizes: Vec<usize>,
}

impl OverlapPartition {
    pub fn is_three_way(&self) -> bool {
        self.names.len() == 3
    }

    pub fn union_size(&self) -> usize {
        let three_way: usize = [&self.only_c, &self.ab_only, &self.ac_only, &self.bc_only]
            .iter()
            .map(|r| r.as_ref().map_or(0, |v| v.len()))
            .sum();
        self.all.len() + self.only_a.len() + self.only_b.len() + three_way
    }
}

/// Join the non-null dataset names with `" vs "`, inserting the separator
/// only between two present neighbours.
pub fn build_title(names: &[Option<&str>]) -> String {
    let mut title = String::new();
    for name in names.iter().flatten() {
        if !title.is_empty() {
            title.push_str(" vs ");
        }
        title.push_str(name);
    }
    title
}

/// Compute the set partition of 2 or 3 named entity sets by key.
pub fn compute_overlap(
    a: &NamedEntitySet,
    b: &NamedEntitySet,
    c: Option<&NamedEntitySet>,
) -> OverlapPartition {
    let keys_a: HashSet<&EntityKey> = a.entities.iter().map(|e| &e.key).collect();
    let keys_b: HashSet<&EntityKey> = b.entities.iter().map(|e| &e.key).collect();

    let partition = match c {
        None => {
            let all = keys_a.intersection(&keys_b).copied().collect::<Vec<_>>();
            let only_a = keys_a.difference(&keys_b).copied().collect::<Vec<_>>();
            let only_b = keys_b.difference(&keys_a).copied().collect::<Vec<_>>();
            OverlapPartition {
                names: vec![a.name.clone(), b.name.clone()],
                set_sizes: vec![a.len(), b.len()],
                pair_sizes: vec![all.len()],
                all: representatives(&all, &[a, b]),
                only_a: representatives(&only_a, &[a]),
                only_b: representatives(&only_b, &[b]),
                only_c: None,
                ab_only: None,
                ac_only: None,
                bc_only: None,
            }
        }
        Some(c) => {
            let keys_c: HashSet<&EntityKey> = c.entities.iter().map(|e| &e.key).collect();

            let in_ab: HashSet<&EntityKey> = keys_a.intersection(&keys_b).copied().collect();
            let in_ac: HashSet<&EntityKey> = keys_a.intersection(&keys_c).copied().collect();
            let in_bc: HashSet<&EntityKey> = keys_b.intersection(&keys_c).copied().collect();

            let all: Vec<&EntityKey> = in_ab.iter().copied().filter(|k| keys_c.contains(*k)).collect();
            let ab_only: Vec<&EntityKey> =
                in_ab.iter().copied().filter(|k| !keys_c.contains(*k)).collect();
            let ac_only: Vec<&EntityKey> =
                in_ac.iter().copied().filter(|k| !keys_b.contains(*k)).collect();
            let bc_only: Vec<&EntityKey> =
                in_bc.iter().copied().filter(|k| !keys_a.contains(*k)).collect();
            let only_a: Vec<&EntityKey> = keys_a
                .iter()
                .copied()
                .filter(|k| !keys_b.contains(*k) && !keys_c.contains(*k))
                .collect();
            let only_b: Vec<&EntityKey> = keys_b
                .iter()
                .copied()
                .filter(|k| !keys_a.contains(*k) && !keys_c.contains(*k))
                .collect();
            let only_c: Vec<&EntityKey> = keys_c
                .iter()
                .copied()
                .filter(|k| !keys_a.contains(*k) && !keys_b.contains(*k))
                .collect();

            OverlapPartition {
                names: vec![a.name.clone(), b.name.clone(), c.name.clone()],
                set_sizes: vec![a.len(), b.len(), c.len()],
                pair_sizes: vec![in_ab.len(), in_ac.len(), in_bc.len()],
                all: representatives(&all, &[a, b, c]),
                only_a: representatives(&only_a, &[a]),
                only_b: representatives(&only_b, &[b]),
                only_c: Some(representatives(&only_c, &[c])),
                ab_only: Some(representatives(&ab_only, &[a, b])),
                ac_only: Some(representatives(&ac_only, &[a, c])),
                bc_only: Some(representatives(&bc_only, &[b, c])),
            }
        }
    };

    info!(
        "overlap of {}: union {} entities, intersection {}",
        partition.names.join(" / "),
        partition.union_size(),
        partition.all.len()
    );
    partition
}

/// Pick one entity per key from the earliest dataset defining it, sorted by
/// key. Numeric payloads of later datasets are not merged; the
/// representative's payload is what the report prints.
fn representatives(keys: &[&EntityKey], sets: &[&NamedEntitySet]) -> Vec<ScoredEntity> {
    let mut out: Vec<ScoredEntity> = keys
        .iter()
        .filter_map(|key| sets.iter().find_map(|s| s.get(key)).cloned())
        .collect();
    out.sort_by(|x, y| x.key.cmp(&y.key));
    out
}
