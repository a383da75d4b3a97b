use crate::core::error::MoleculeError;
use crate::core::models::collection::AtomCollection;
use crate::core::models::graph::BondGraph;
use nalgebra::{Point3, Vector3};
use std::collections::{BTreeMap, BTreeSet};

/// Chemical-environment signature of one atom: its own element plus the
/// element-count multiset of every atom within a fixed number of bonds.
///
/// Signatures are value types; equal signature means "locally
/// indistinguishable surroundings" at the chosen depth.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChemEnvironment {
    pub element: String,
    /// `(element, count)` pairs sorted by element symbol.
    pub surroundings: Vec<(String, usize)>,
}

impl AtomCollection {
    /// The atoms exactly `n` bonds away from `origin`.
    ///
    /// `n = 0` yields the origin itself; a depth beyond the reach of the
    /// fragment yields an empty set, which is normal termination rather than
    /// an error.
    pub fn coordination_sphere(
        &self,
        graph: &BondGraph,
        origin: usize,
        n: usize,
    ) -> Result<BTreeSet<usize>, MoleculeError> {
        graph.try_neighbors(origin)?;
        let mut visited: BTreeSet<usize> = [origin].into_iter().collect();
        let mut sphere: BTreeSet<usize> = visited.clone();
        for _ in 0..n {
            let mut next = BTreeSet::new();
            for &label in &sphere {
                for &neighbor in graph.try_neighbors(label)? {
                    if visited.insert(neighbor) {
                        next.insert(neighbor);
                    }
                }
            }
            sphere = next;
        }
        Ok(sphere)
    }

    /// Every atom reachable from `origin` without stepping onto an excluded
    /// label, up to `max_depth` bonds away (`None` = unbounded). The origin
    /// is always included.
    pub fn connected_to(
        &self,
        graph: &BondGraph,
        origin: usize,
        max_depth: Option<usize>,
        exclude: &BTreeSet<usize>,
    ) -> Result<BTreeSet<usize>, MoleculeError> {
        graph.try_neighbors(origin)?;
        let mut reached: BTreeSet<usize> = [origin].into_iter().collect();
        let mut frontier = reached.clone();
        let mut depth = 0;
        while !frontier.is_empty() && max_depth.is_none_or(|limit| depth < limit) {
            let mut next = BTreeSet::new();
            for &label in &frontier {
                for &neighbor in graph.try_neighbors(label)? {
                    if exclude.contains(&neighbor) {
                        continue;
                    }
                    if reached.insert(neighbor) {
                        next.insert(neighbor);
                    }
                }
            }
            frontier = next;
            depth += 1;
        }
        Ok(reached)
    }

    /// Splits the collection into its connected components.
    ///
    /// Fragments keep their parent labels and collection order, and each
    /// carries the parent adjacency restricted to its own atoms as its bond
    /// cache, so per-fragment bond queries need no recomputation.
    pub fn fragmentate(&self, graph: &BondGraph) -> Result<Vec<Self>, MoleculeError> {
        let mut assigned: BTreeSet<usize> = BTreeSet::new();
        let mut fragments = Vec::new();
        for &label in self.labels() {
            if assigned.contains(&label) {
                continue;
            }
            let component = self.connected_to(graph, label, None, &BTreeSet::new())?;
            assigned.extend(component.iter().copied());
            let members: Vec<usize> = self
                .labels()
                .iter()
                .copied()
                .filter(|l| component.contains(l))
                .collect();
            let mut fragment = self.subset(members)?;
            fragment.bond_cache = Some(graph.restrict(&component));
            fragments.push(fragment);
        }
        Ok(fragments)
    }

    /// Closes `selection` under bonds: whenever a bond crosses the selection
    /// boundary, the entire dangling fragment on the outside is pulled in.
    ///
    /// The result has no boundary-crossing bonds left, so applying the
    /// closure twice changes nothing.
    pub fn preserve_bonds(
        &self,
        graph: &BondGraph,
        selection: &BTreeSet<usize>,
    ) -> Result<BTreeSet<usize>, MoleculeError> {
        let mut closed = selection.clone();
        for &label in selection {
            for &neighbor in graph.try_neighbors(label)? {
                if closed.contains(&neighbor) {
                    continue;
                }
                let fragment = self.connected_to(graph, neighbor, None, selection)?;
                closed.extend(fragment);
            }
        }
        Ok(closed)
    }

    /// Groups atoms by chemical environment: own element plus the
    /// element-count multiset of all atoms within `depth` bonds (the atom
    /// itself excluded).
    ///
    /// Two atoms land in the same group exactly when their signatures are
    /// equal; the map and its value sets iterate deterministically.
    pub fn partition_chem_env(
        &self,
        graph: &BondGraph,
        depth: usize,
    ) -> Result<BTreeMap<ChemEnvironment, BTreeSet<usize>>, MoleculeError> {
        let mut groups: BTreeMap<ChemEnvironment, BTreeSet<usize>> = BTreeMap::new();
        for &label in self.labels() {
            let reached = self.connected_to(graph, label, Some(depth), &BTreeSet::new())?;
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for &member in &reached {
                if member == label {
                    continue;
                }
                let element = self
                    .element(member)
                    .ok_or(MoleculeError::AtomNotFound { label: member })?;
                *counts.entry(element).or_insert(0) += 1;
            }
            let signature = ChemEnvironment {
                element: self
                    .element(label)
                    .ok_or(MoleculeError::AtomNotFound { label })?
                    .to_string(),
                surroundings: counts
                    .into_iter()
                    .map(|(element, count)| (element.to_string(), count))
                    .collect(),
            };
            groups.entry(signature).or_default().insert(label);
        }
        Ok(groups)
    }

    /// Atoms inside (or outside) a sphere around `origin`.
    ///
    /// With `preserve` set, the selection is closed under bonds of the given
    /// graph before slicing, so no molecule is cut through a bond.
    pub fn cut_sphere(
        &self,
        origin: &Point3<f64>,
        radius: f64,
        outside: bool,
        preserve: Option<&BondGraph>,
    ) -> Result<Self, MoleculeError> {
        self.cut_by(preserve, |position| {
            ((position - origin).norm() <= radius) != outside
        })
    }

    /// Atoms inside (or outside) an axis-aligned box centered on `center`
    /// with the given half-extents.
    pub fn cut_cuboid(
        &self,
        center: &Point3<f64>,
        half_extents: &Vector3<f64>,
        outside: bool,
        preserve: Option<&BondGraph>,
    ) -> Result<Self, MoleculeError> {
        self.cut_by(preserve, |position| {
            let offset = position - center;
            let inside = (0..3).all(|axis| offset[axis].abs() <= half_extents[axis]);
            inside != outside
        })
    }

    fn cut_by<F>(&self, preserve: Option<&BondGraph>, keep: F) -> Result<Self, MoleculeError>
    where
        F: Fn(&Point3<f64>) -> bool,
    {
        let mut selection: BTreeSet<usize> = self
            .iter()
            .filter(|(_, atom)| keep(&atom.position))
            .map(|(label, _)| label)
            .collect();
        if let Some(graph) = preserve {
            selection = self.preserve_bonds(graph, &selection)?;
        }
        let members: Vec<usize> = self
            .labels()
            .iter()
            .copied()
            .filter(|label| selection.contains(label))
            .collect();
        self.subset(members)
    }
}
