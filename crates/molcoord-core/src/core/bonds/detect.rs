use super::partition::{PartitionConfig, SpatialPartition};
use crate::core::data;
use crate::core::error::MoleculeError;
use crate::core::models::collection::AtomCollection;
use crate::core::models::graph::BondGraph;
use nalgebra::Point3;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Configuration of one bond-detection pass.
///
/// Two atoms are bonded when their distance does not exceed the sum of
/// their bonding radii. Radii default to tabulated covalent radii per
/// element and can be overridden per atom label, e.g. to suppress spurious
/// contacts in strained geometries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BondPolicy {
    /// Spatial decomposition parameters.
    pub partition: PartitionConfig,
    /// When set, every atom is additionally reported as bonded to itself.
    pub self_bonding: bool,
    /// Per-label bonding radius overrides in Angstroms.
    pub radius_overrides: HashMap<usize, f64>,
}

/// Candidate pairs within one cell, as dense slot indices with `i <= j`.
fn cell_bond_pairs(
    cell: &[usize],
    positions: &[Point3<f64>],
    radii: &[f64],
    self_bonding: bool,
) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for (rank, &i) in cell.iter().enumerate() {
        let start = if self_bonding { rank } else { rank + 1 };
        for &j in &cell[start..] {
            let cutoff = radii[i] + radii[j];
            if (positions[i] - positions[j]).norm_squared() <= cutoff * cutoff {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

impl AtomCollection {
    /// Bonding radius per dense slot: tabulated covalent radius, unless the
    /// policy overrides the label.
    fn bonding_radii(&self, policy: &BondPolicy) -> Result<Vec<f64>, MoleculeError> {
        self.iter()
            .map(|(label, atom)| match policy.radius_overrides.get(&label) {
                Some(&radius) => Ok(radius),
                None => data::covalent_radius(&atom.element),
            })
            .collect()
    }

    /// An edgeless graph over this collection's labels, carrying element
    /// valencies for the ordered-neighbor view.
    fn edgeless_graph(&self) -> Result<BondGraph, MoleculeError> {
        let labels_with_valencies: Result<Vec<(usize, u8)>, MoleculeError> = self
            .iter()
            .map(|(label, atom)| Ok((label, data::valency(&atom.element)?)))
            .collect();
        BondGraph::new(labels_with_valencies?)
    }

    /// Detects covalent bonds from current positions.
    ///
    /// The atom set is decomposed into overlapping spatial cells and the
    /// pairwise radius test runs per cell; with the default margin the
    /// result is independent of the decomposition. Does not consult or
    /// update the cache.
    ///
    /// # Errors
    ///
    /// [`MoleculeError::UnknownElement`] for an element symbol missing from
    /// the radius table that has no override.
    pub fn compute_bonds(&self, policy: &BondPolicy) -> Result<BondGraph, MoleculeError> {
        let positions = self.positions();
        let radii = self.bonding_radii(policy)?;
        let partition = SpatialPartition::build(&positions, &policy.partition);

        #[cfg(feature = "parallel")]
        let per_cell: Vec<Vec<(usize, usize)>> = partition
            .cells()
            .par_iter()
            .map(|cell| cell_bond_pairs(cell, &positions, &radii, policy.self_bonding))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let per_cell: Vec<Vec<(usize, usize)>> = partition
            .cells()
            .iter()
            .map(|cell| cell_bond_pairs(cell, &positions, &radii, policy.self_bonding))
            .collect();

        let mut graph = self.edgeless_graph()?;
        for pairs in per_cell {
            for (i, j) in pairs {
                graph.insert_bond(self.labels()[i], self.labels()[j])?;
            }
        }
        debug!(
            atoms = self.len(),
            cells = partition.cells().len(),
            bonds = graph.edges().len(),
            "detected covalent bonds"
        );
        Ok(graph)
    }

    /// All-pairs reference implementation of [`compute_bonds`]
    /// (single cell covering the whole collection).
    ///
    /// [`compute_bonds`]: AtomCollection::compute_bonds
    pub fn compute_bonds_brute_force(
        &self,
        policy: &BondPolicy,
    ) -> Result<BondGraph, MoleculeError> {
        let positions = self.positions();
        let radii = self.bonding_radii(policy)?;
        let cell: Vec<usize> = (0..self.len()).collect();
        let mut graph = self.edgeless_graph()?;
        for (i, j) in cell_bond_pairs(&cell, &positions, &radii, policy.self_bonding) {
            graph.insert_bond(self.labels()[i], self.labels()[j])?;
        }
        Ok(graph)
    }

    /// Bond graph with explicit cache control.
    ///
    /// With `use_lookup` a cached graph is returned as-is, even if positions
    /// changed since it was computed; otherwise the graph is recomputed from
    /// current positions. With `set_lookup` the returned graph also replaces
    /// the cache; without it the cache is left untouched, so a one-off query
    /// under a non-default policy does not poison later lookups.
    pub fn get_bonds(
        &mut self,
        policy: &BondPolicy,
        use_lookup: bool,
        set_lookup: bool,
    ) -> Result<BondGraph, MoleculeError> {
        if use_lookup && let Some(cached) = &self.bond_cache {
            return Ok(cached.clone());
        }
        let graph = self.compute_bonds(policy)?;
        if set_lookup {
            self.bond_cache = Some(graph.clone());
        }
        Ok(graph)
    }
}
