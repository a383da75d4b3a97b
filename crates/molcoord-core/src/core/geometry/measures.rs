use crate::core::data;
use crate::core::error::MoleculeError;
use crate::core::models::collection::AtomCollection;
use nalgebra::Point3;

/// Vectors shorter than this are treated as geometrically degenerate.
pub(crate) const DEGENERACY_TOLERANCE: f64 = 1e-10;

/// Euclidean distance between two points.
pub fn distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (a - b).norm()
}

/// Angle in degrees at vertex `b` between the rays to `i` and `a`.
///
/// The normalized dot product is clamped to [-1, 1] before the inverse
/// cosine so floating-point overshoot can never produce a domain error.
/// Returns `None` if either ray has zero length.
pub fn angle_deg(i: &Point3<f64>, b: &Point3<f64>, a: &Point3<f64>) -> Option<f64> {
    let bi = i - b;
    let ba = a - b;
    if bi.norm() < DEGENERACY_TOLERANCE || ba.norm() < DEGENERACY_TOLERANCE {
        return None;
    }
    let dot = (bi.normalize().dot(&ba.normalize())).clamp(-1.0, 1.0);
    Some(dot.acos().to_degrees())
}

/// Torsion angle in degrees about the `b`-`a` axis, in [0, 360).
///
/// Uses the two-plane-normal formulation. The raw inverse cosine only fixes
/// the angle up to reflection; the rotation direction is resolved by the
/// scalar triple product of the `b`-`a` vector with the cross product of the
/// two plane normals, and a positive value replaces the raw angle by
/// `360 - angle`. Returns `None` if either plane is degenerate (three of the
/// four points collinear).
pub fn dihedral_deg(
    i: &Point3<f64>,
    b: &Point3<f64>,
    a: &Point3<f64>,
    d: &Point3<f64>,
) -> Option<f64> {
    let ib = b - i;
    let ba = a - b;
    let ad = d - a;

    let n1 = ib.cross(&ba);
    let n2 = ba.cross(&ad);
    if n1.norm() < DEGENERACY_TOLERANCE || n2.norm() < DEGENERACY_TOLERANCE {
        return None;
    }
    let n1 = n1.normalize();
    let n2 = n2.normalize();

    let dot = n1.dot(&n2).clamp(-1.0, 1.0);
    let raw = dot.acos().to_degrees();
    if ba.dot(&n1.cross(&n2)) > 0.0 {
        Some(360.0 - raw)
    } else {
        Some(raw)
    }
}

impl AtomCollection {
    /// Unweighted mean position of all atoms.
    pub fn topologic_center(&self) -> Point3<f64> {
        let sum = self
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, (_, atom)| {
                acc + atom.position.coords
            });
        Point3::from(sum / self.len() as f64)
    }

    /// Sum of atomic masses.
    pub fn total_mass(&self) -> Result<f64, MoleculeError> {
        self.iter()
            .map(|(_, atom)| data::mass(&atom.element))
            .sum()
    }

    /// Mass-weighted mean position.
    pub fn barycenter(&self) -> Result<Point3<f64>, MoleculeError> {
        let mut weighted = nalgebra::Vector3::zeros();
        let mut total = 0.0;
        for (_, atom) in self.iter() {
            let mass = data::mass(&atom.element)?;
            weighted += atom.position.coords * mass;
            total += mass;
        }
        Ok(Point3::from(weighted / total))
    }

    /// Distances for a batch of `[i, b]` label pairs.
    pub fn bond_lengths(&self, pairs: &[[usize; 2]]) -> Result<Vec<f64>, MoleculeError> {
        pairs
            .iter()
            .map(|&[i, b]| {
                Ok(distance(
                    &self.try_position(i)?,
                    &self.try_position(b)?,
                ))
            })
            .collect()
    }

    /// Angles in degrees for a batch of `[i, b, a]` label triples, measured
    /// at the vertex `b`.
    pub fn angle_degrees(&self, triples: &[[usize; 3]]) -> Result<Vec<f64>, MoleculeError> {
        triples
            .iter()
            .map(|&[i, b, a]| {
                angle_deg(
                    &self.try_position(i)?,
                    &self.try_position(b)?,
                    &self.try_position(a)?,
                )
                .ok_or(MoleculeError::Geometry {
                    check: "angle rays have nonzero length",
                    residual: 0.0,
                })
            })
            .collect()
    }

    /// Dihedrals in degrees, in [0, 360), for a batch of `[i, b, a, d]`
    /// label quadruples.
    pub fn dihedral_degrees(&self, quads: &[[usize; 4]]) -> Result<Vec<f64>, MoleculeError> {
        quads
            .iter()
            .map(|&[i, b, a, d]| {
                dihedral_deg(
                    &self.try_position(i)?,
                    &self.try_position(b)?,
                    &self.try_position(a)?,
                    &self.try_position(d)?,
                )
                .ok_or(MoleculeError::Geometry {
                    check: "dihedral plane normals have nonzero length",
                    residual: 0.0,
                })
            })
            .collect()
    }

    /// Distance from `origin` to every atom, as `(label, distance)` pairs.
    ///
    /// With `sort` the result is ordered by ascending distance (label as
    /// tie-break); otherwise it follows collection order.
    pub fn distances_from(&self, origin: &Point3<f64>, sort: bool) -> Vec<(usize, f64)> {
        let mut result: Vec<(usize, f64)> = self
            .iter()
            .map(|(label, atom)| (label, distance(&atom.position, origin)))
            .collect();
        if sort {
            result.sort_by(|(la, da), (lb, db)| {
                da.partial_cmp(db)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(la.cmp(lb))
            });
        }
        result
    }

    /// The closest pair of atoms between `self` and `other`, as
    /// `(label_here, label_there, distance)`.
    ///
    /// Deterministic: on exact ties the pair encountered first in collection
    /// order wins.
    pub fn shortest_distance(&self, other: &Self) -> (usize, usize, f64) {
        let mut best = (self.labels()[0], other.labels()[0], f64::INFINITY);
        for (label_a, atom_a) in self.iter() {
            for (label_b, atom_b) in other.iter() {
                let d = distance(&atom_a.position, &atom_b.position);
                if d < best.2 {
                    best = (label_a, label_b, d);
                }
            }
        }
        best
    }
}
