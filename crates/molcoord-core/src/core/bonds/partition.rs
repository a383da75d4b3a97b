use itertools::iproduct;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Tuning knobs for the spatial domain decomposition used by bond
/// detection.
///
/// The partition is a pure performance device: given a sufficient `margin`
/// the detected bond graph is identical to a brute-force all-pairs
/// computation for every choice of `atoms_per_cell`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Target number of atoms per spatial cell.
    pub atoms_per_cell: usize,
    /// Linear overlap margin in Angstroms added to both ends of every band.
    /// Must exceed twice the largest bonding radius in the system so no
    /// boundary-crossing bond is missed.
    pub margin: f64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            atoms_per_cell: 500,
            margin: 3.0,
        }
    }
}

/// Overlapping 3-D decomposition of an atom set into cells.
///
/// Atoms are sorted independently along each axis and sliced into
/// contiguous bands, each widened by the overlap margin on both ends; the
/// cells are the triple intersections of one band per axis. Cells hold
/// dense slot indices into the originating position array and the partition
/// is discarded after one bond-detection pass.
#[derive(Debug, Clone)]
pub struct SpatialPartition {
    cells: Vec<Vec<usize>>,
    bands_per_axis: usize,
}

impl SpatialPartition {
    pub fn build(positions: &[Point3<f64>], config: &PartitionConfig) -> Self {
        let n = positions.len();
        if n == 0 {
            return Self {
                cells: Vec::new(),
                bands_per_axis: 0,
            };
        }
        let target_cells = n as f64 / config.atoms_per_cell.max(1) as f64;
        let bands_per_axis = (target_cells.cbrt().ceil() as usize).max(1);
        let per_band = n.div_ceil(bands_per_axis);

        let bands_for_axis = |axis: usize| -> Vec<HashSet<usize>> {
            let mut sorted: Vec<(f64, usize)> = positions
                .iter()
                .enumerate()
                .map(|(slot, p)| (p[axis], slot))
                .collect();
            sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
            let coords: Vec<f64> = sorted.iter().map(|&(c, _)| c).collect();

            (0..bands_per_axis)
                .map(|band| {
                    let lo_rank = (band * per_band).min(n - 1);
                    let hi_rank = ((band + 1) * per_band).min(n - 1);
                    let lo = coords[lo_rank] - config.margin;
                    let hi = coords[hi_rank] + config.margin;
                    let start = coords.partition_point(|&c| c < lo);
                    let end = coords.partition_point(|&c| c <= hi);
                    sorted[start..end].iter().map(|&(_, slot)| slot).collect()
                })
                .collect()
        };

        let x_bands = bands_for_axis(0);
        let y_bands = bands_for_axis(1);
        let z_bands = bands_for_axis(2);

        let mut cells = Vec::new();
        for (i, j, k) in iproduct!(0..bands_per_axis, 0..bands_per_axis, 0..bands_per_axis) {
            let mut cell: Vec<usize> = x_bands[i]
                .iter()
                .filter(|slot| y_bands[j].contains(slot) && z_bands[k].contains(slot))
                .copied()
                .collect();
            if cell.is_empty() {
                continue;
            }
            cell.sort_unstable();
            cells.push(cell);
        }

        Self {
            cells,
            bands_per_axis,
        }
    }

    /// Non-empty cells as sorted dense slot indices.
    pub fn cells(&self) -> &[Vec<usize>] {
        &self.cells
    }

    pub fn bands_per_axis(&self) -> usize {
        self.bands_per_axis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize, spacing: f64) -> Vec<Point3<f64>> {
        (0..n)
            .map(|i| Point3::new(i as f64 * spacing, 0.0, 0.0))
            .collect()
    }

    #[test]
    fn single_cell_when_under_target() {
        let positions = line(10, 1.0);
        let partition = SpatialPartition::build(&positions, &PartitionConfig::default());
        assert_eq!(partition.bands_per_axis(), 1);
        assert_eq!(partition.cells().len(), 1);
        assert_eq!(partition.cells()[0].len(), 10);
    }

    #[test]
    fn every_atom_lands_in_at_least_one_cell() {
        let positions = line(50, 2.0);
        let config = PartitionConfig {
            atoms_per_cell: 4,
            margin: 3.0,
        };
        let partition = SpatialPartition::build(&positions, &config);
        assert!(partition.bands_per_axis() > 1);
        let mut covered: HashSet<usize> = HashSet::new();
        for cell in partition.cells() {
            covered.extend(cell.iter().copied());
        }
        assert_eq!(covered.len(), 50);
    }

    #[test]
    fn neighboring_bands_overlap_by_the_margin() {
        // Two atoms 1.0 apart must share a cell whenever margin >= 1.0,
        // even when the band cut falls between them.
        let positions = line(40, 1.0);
        let config = PartitionConfig {
            atoms_per_cell: 2,
            margin: 1.5,
        };
        let partition = SpatialPartition::build(&positions, &config);
        for pair in (0..39).map(|i| (i, i + 1)) {
            let shared = partition
                .cells()
                .iter()
                .any(|cell| cell.contains(&pair.0) && cell.contains(&pair.1));
            assert!(shared, "pair {pair:?} not covered by any cell");
        }
    }

    #[test]
    fn cells_are_sorted_and_deterministic() {
        let positions = line(20, 0.9);
        let config = PartitionConfig {
            atoms_per_cell: 3,
            margin: 2.0,
        };
        let first = SpatialPartition::build(&positions, &config);
        let second = SpatialPartition::build(&positions, &config);
        assert_eq!(first.cells(), second.cells());
        for cell in first.cells() {
            assert!(cell.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
