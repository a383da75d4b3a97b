use crate::core::error::MoleculeError;
use std::cell::OnceCell;
use std::collections::{BTreeSet, HashMap};

/// Covalent-bond adjacency relation over a set of atom labels.
///
/// The graph is *total* (every label owns a neighbor set, possibly empty) and
/// *symmetric* by construction: inserting a bond registers it on both
/// endpoints. Neighbor sets are stored as an array of small ordered sets
/// indexed by a dense slot handle, with an explicit label-to-slot translation
/// table, so neighbor lookup stays O(1) off the hashing hot path and
/// iteration order is deterministic (ascending label).
///
/// A derived view ordering each neighbor set by descending element valency
/// (label-ascending tie-break) is built lazily on first use; downstream
/// traversals use it when a reproducible branch order matters.
#[derive(Debug, Clone)]
pub struct BondGraph {
    labels: Vec<usize>,
    index: HashMap<usize, usize>,
    neighbors: Vec<BTreeSet<usize>>,
    valencies: Vec<u8>,
    by_valency: OnceCell<Vec<Vec<usize>>>,
}

impl BondGraph {
    /// Creates an edgeless graph over the given labels with their element
    /// valencies.
    ///
    /// # Errors
    ///
    /// Returns [`MoleculeError::Schema`] if a label appears twice.
    pub fn new(labels_with_valencies: Vec<(usize, u8)>) -> Result<Self, MoleculeError> {
        let mut labels = Vec::with_capacity(labels_with_valencies.len());
        let mut valencies = Vec::with_capacity(labels_with_valencies.len());
        let mut index = HashMap::with_capacity(labels_with_valencies.len());
        for (slot, (label, valency)) in labels_with_valencies.into_iter().enumerate() {
            if index.insert(label, slot).is_some() {
                return Err(MoleculeError::Schema(format!(
                    "duplicate label {label} in bond graph"
                )));
            }
            labels.push(label);
            valencies.push(valency);
        }
        let neighbors = vec![BTreeSet::new(); labels.len()];
        Ok(Self {
            labels,
            index,
            neighbors,
            valencies,
            by_valency: OnceCell::new(),
        })
    }

    /// Number of atoms covered by the graph.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// All labels, in insertion (collection) order.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn contains(&self, label: usize) -> bool {
        self.index.contains_key(&label)
    }

    /// Neighbor labels of `label`, in ascending label order.
    pub fn neighbors(&self, label: usize) -> Option<&BTreeSet<usize>> {
        self.index.get(&label).map(|&slot| &self.neighbors[slot])
    }

    /// Like [`neighbors`](Self::neighbors) but failing with context.
    pub fn try_neighbors(&self, label: usize) -> Result<&BTreeSet<usize>, MoleculeError> {
        self.neighbors(label)
            .ok_or(MoleculeError::AtomNotFound { label })
    }

    pub fn degree(&self, label: usize) -> Option<usize> {
        self.neighbors(label).map(|set| set.len())
    }

    /// Registers a bond on both endpoints. Idempotent.
    ///
    /// A self-bond (`a == b`) is stored as a single loop entry; the bond
    /// builder only produces those when self-bonding was explicitly
    /// requested.
    pub fn insert_bond(&mut self, a: usize, b: usize) -> Result<(), MoleculeError> {
        let slot_a = *self
            .index
            .get(&a)
            .ok_or(MoleculeError::AtomNotFound { label: a })?;
        let slot_b = *self
            .index
            .get(&b)
            .ok_or(MoleculeError::AtomNotFound { label: b })?;
        self.neighbors[slot_a].insert(b);
        self.neighbors[slot_b].insert(a);
        self.by_valency = OnceCell::new();
        Ok(())
    }

    /// All bonds as `(low, high)` label pairs, deduplicated and sorted.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges = BTreeSet::new();
        for (slot, set) in self.neighbors.iter().enumerate() {
            let a = self.labels[slot];
            for &b in set {
                edges.insert((a.min(b), a.max(b)));
            }
        }
        edges.into_iter().collect()
    }

    /// Restricts the relation to `keep`: the result is keyed by the retained
    /// labels only and every neighbor set is intersected with `keep`.
    ///
    /// Used to hand fragments a view of their parent's cached adjacency so
    /// per-fragment bond queries need no recomputation.
    pub fn restrict(&self, keep: &BTreeSet<usize>) -> Self {
        let mut labels = Vec::new();
        let mut valencies = Vec::new();
        let mut neighbors = Vec::new();
        let mut index = HashMap::new();
        for (slot, &label) in self.labels.iter().enumerate() {
            if !keep.contains(&label) {
                continue;
            }
            index.insert(label, labels.len());
            labels.push(label);
            valencies.push(self.valencies[slot]);
            neighbors.push(self.neighbors[slot].intersection(keep).copied().collect());
        }
        Self {
            labels,
            index,
            neighbors,
            valencies,
            by_valency: OnceCell::new(),
        }
    }

    /// Neighbor labels of `label` ordered by descending valency, with
    /// ascending label as tie-break.
    ///
    /// The ordered view is computed for the whole graph on first call and
    /// cached; bond insertions drop the cache.
    pub fn valency_ordered_neighbors(&self, label: usize) -> Option<&[usize]> {
        let slot = *self.index.get(&label)?;
        let view = self.by_valency.get_or_init(|| {
            self.neighbors
                .iter()
                .map(|set| {
                    let mut ordered: Vec<usize> = set.iter().copied().collect();
                    ordered.sort_by_key(|neighbor| {
                        let valency = self
                            .index
                            .get(neighbor)
                            .map(|&s| self.valencies[s])
                            .unwrap_or(0);
                        (std::cmp::Reverse(valency), *neighbor)
                    });
                    ordered
                })
                .collect()
        });
        Some(view[slot].as_slice())
    }
}

impl PartialEq for BondGraph {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels && self.neighbors == other.neighbors
    }
}
