use super::entity::{Reference, ZMatrix};
use super::error::ResolveError;
use crate::core::error::MoleculeError;
use crate::core::geometry::measures::DEGENERACY_TOLERANCE;
use crate::core::models::atom::Atom;
use crate::core::models::collection::AtomCollection;
use nalgebra::Point3;

/// Converts internal coordinates into Cartesian positions.
///
/// A trait seam so the safe mutation protocol can be exercised against a
/// scripted resolver in tests; production code uses [`ZmatResolver`].
pub trait CartesianResolver {
    fn resolve(&self, zmat: &ZMatrix) -> Result<AtomCollection, ResolveError>;
}

/// Sequential natural-extension resolver.
///
/// Rows are placed in build order. Each position is the bond-reference
/// point displaced by the bond length along a direction constructed in the
/// local frame of the reference triple, chosen so that re-measuring the
/// bond angle and dihedral from the result reproduces the row's scalars
/// exactly (the dihedral in [0, 360) under the triple-product sign
/// convention).
#[derive(Debug, Clone, Copy, Default)]
pub struct ZmatResolver;

impl ZmatResolver {
    fn point_of(
        reference: &Reference,
        built: &[(usize, Atom)],
    ) -> Result<Point3<f64>, MoleculeError> {
        if let Some(point) = reference.absolute_point() {
            return Ok(point);
        }
        let label = reference.label().unwrap_or_default();
        built
            .iter()
            .find(|(placed, _)| *placed == label)
            .map(|(_, atom)| atom.position)
            .ok_or(MoleculeError::AtomNotFound { label })
    }
}

impl CartesianResolver for ZmatResolver {
    fn resolve(&self, zmat: &ZMatrix) -> Result<AtomCollection, ResolveError> {
        let mut built: Vec<(usize, Atom)> = Vec::with_capacity(zmat.len());
        for (label, row) in zmat.iter() {
            let references = [row.bond_ref, row.angle_ref, row.dihedral_ref];
            let b = Self::point_of(&row.bond_ref, &built)?;

            let position = if row.bond.abs() < DEGENERACY_TOLERANCE {
                // Zero bond length: coincident with the reference point, the
                // frame carries no information.
                b
            } else {
                let a = Self::point_of(&row.angle_ref, &built)?;
                let d = Self::point_of(&row.dihedral_ref, &built)?;
                let ab = a - b;
                let normal = ab.cross(&(d - a));
                if ab.norm() < DEGENERACY_TOLERANCE || normal.norm() < DEGENERACY_TOLERANCE {
                    return Err(ResolveError::DegenerateReference {
                        label,
                        references,
                        already_built: built,
                    });
                }
                let u = ab.normalize();
                let n = normal.normalize();
                let m = n.cross(&u);

                let theta = row.angle.to_radians();
                let phi = row.dihedral.to_radians();
                b + row.bond
                    * (theta.cos() * u + theta.sin() * (phi.cos() * m + phi.sin() * n))
            };

            built.push((label, Atom::new(&row.element, position)));
        }
        Ok(AtomCollection::new(built)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zmat::entity::{ZmatField, ZmatRow};

    fn row(
        element: &str,
        refs: [Reference; 3],
        bond: f64,
        angle: f64,
        dihedral: f64,
    ) -> ZmatRow {
        ZmatRow {
            element: element.to_string(),
            bond_ref: refs[0],
            angle_ref: refs[1],
            dihedral_ref: refs[2],
            bond,
            angle,
            dihedral,
        }
    }

    /// Four-atom chain: 0 at the origin, 1 on the x-axis, 2 in the
    /// xy-plane, 3 free.
    fn chain_zmat(dihedral: f64) -> ZMatrix {
        ZMatrix::new(vec![
            (
                0,
                row("C", [Reference::Origin, Reference::ExX, Reference::ExY], 0.0, 0.0, 0.0),
            ),
            (
                1,
                row("C", [Reference::Atom(0), Reference::ExX, Reference::ExY], 1.5, 0.0, 0.0),
            ),
            (
                2,
                row(
                    "C",
                    [Reference::Atom(1), Reference::Atom(0), Reference::ExY],
                    1.5,
                    109.5,
                    0.0,
                ),
            ),
            (
                3,
                row(
                    "C",
                    [Reference::Atom(2), Reference::Atom(1), Reference::Atom(0)],
                    1.5,
                    109.5,
                    dihedral,
                ),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn placement_reproduces_the_row_scalars() {
        for &phi in &[0.0, 45.0, 90.0, 180.0, 270.0, 359.0] {
            let cartesian = ZmatResolver.resolve(&chain_zmat(phi)).unwrap();
            let bond = cartesian.bond_lengths(&[[3, 2]]).unwrap()[0];
            let angle = cartesian.angle_degrees(&[[3, 2, 1]]).unwrap()[0];
            let dihedral = cartesian.dihedral_degrees(&[[3, 2, 1, 0]]).unwrap()[0];
            assert!((bond - 1.5).abs() < 1e-9);
            assert!((angle - 109.5).abs() < 1e-7);
            let delta = (dihedral - phi)
                .abs()
                .min((dihedral - phi + 360.0).abs())
                .min((dihedral - phi - 360.0).abs());
            assert!(delta < 1e-7, "phi = {phi}, measured = {dihedral}");
        }
    }

    #[test]
    fn zero_bond_places_on_the_reference() {
        let cartesian = ZmatResolver.resolve(&chain_zmat(60.0)).unwrap();
        assert!(cartesian.position(0).unwrap().coords.norm() < 1e-12);
        let p1 = cartesian.position(1).unwrap();
        assert!((p1 - Point3::new(1.5, 0.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn collinear_frame_reports_offender_and_partial_build() {
        let mut zmat = chain_zmat(60.0);
        // Straightening atom 2 collapses atom 3's reference frame.
        zmat.set_value(2, ZmatField::Angle, 180.0).unwrap();
        let err = ZmatResolver.resolve(&zmat).unwrap_err();
        match err {
            ResolveError::DegenerateReference {
                label,
                references,
                already_built,
            } => {
                assert_eq!(label, 3);
                assert_eq!(references[0], Reference::Atom(2));
                let placed: Vec<usize> =
                    already_built.iter().map(|&(l, _)| l).collect();
                assert_eq!(placed, vec![0, 1, 2]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
