use crate::core::data;
use crate::core::error::MoleculeError;
use crate::core::models::collection::AtomCollection;
use nalgebra::{Matrix3, Point3, Vector3};

/// Numeric tolerance for the orthonormality and handedness preconditions of
/// [`AtomCollection::basis_transform`].
const BASIS_TOLERANCE: f64 = 1e-8;

/// Result of an inertia-tensor analysis.
#[derive(Debug, Clone)]
pub struct Inertia {
    /// Copy of the molecule expressed in the principal-axis basis, centered
    /// on the barycenter; the x-axis is the lowest-inertia axis.
    pub transformed: AtomCollection,
    /// Principal moments, sorted ascending.
    pub moments: Vector3<f64>,
    /// The inertia tensor in the original basis.
    pub tensor: Matrix3<f64>,
    /// Orthonormal, right-handed principal axes as matrix columns, ordered
    /// by ascending moment.
    pub axes: Matrix3<f64>,
}

fn check_rotation_basis(
    basis: &Matrix3<f64>,
    orthonormal_check: &'static str,
    handedness_check: &'static str,
) -> Result<(), MoleculeError> {
    let residual = (basis * basis.transpose() - Matrix3::identity()).norm();
    if residual > BASIS_TOLERANCE {
        return Err(MoleculeError::Geometry {
            check: orthonormal_check,
            residual,
        });
    }
    let col0 = basis.column(0).into_owned();
    let col1 = basis.column(1).into_owned();
    let col2 = basis.column(2).into_owned();
    let residual = (col0.cross(&col1) - col2).norm();
    if residual > BASIS_TOLERANCE {
        return Err(MoleculeError::Geometry {
            check: handedness_check,
            residual,
        });
    }
    Ok(())
}

impl AtomCollection {
    /// Rigid change of basis from `old_basis` to `new_basis`.
    ///
    /// Both bases are asserted orthonormal and right-handed within
    /// tolerance, which allows the transformation to be inverted by
    /// transposition instead of matrix inversion.
    ///
    /// # Errors
    ///
    /// [`MoleculeError::Geometry`] with the failing residual when either
    /// precondition does not hold.
    pub fn basis_transform(
        &self,
        new_basis: &Matrix3<f64>,
        old_basis: &Matrix3<f64>,
    ) -> Result<Self, MoleculeError> {
        check_rotation_basis(
            new_basis,
            "new basis is orthonormal",
            "new basis is right-handed",
        )?;
        check_rotation_basis(
            old_basis,
            "old basis is orthonormal",
            "old basis is right-handed",
        )?;
        let rotation = new_basis * old_basis.transpose();
        Ok(self.transformed(&rotation.transpose()))
    }

    /// Mass-weighted inertia tensor about the barycenter, with its
    /// eigendecomposition.
    ///
    /// Eigenvalues are sorted ascending and the eigenvector basis is
    /// orthonormal and right-handed (the third axis is flipped when the
    /// eigensolver returns a left-handed set).
    pub fn inertia(&self) -> Result<Inertia, MoleculeError> {
        let barycenter = self.barycenter()?;
        let centered = self.translated(Point3::origin() - barycenter);

        let mut tensor = Matrix3::zeros();
        for (_, atom) in centered.iter() {
            let mass = data::mass(&atom.element)?;
            let r = atom.position.coords;
            tensor += mass * (Matrix3::identity() * r.norm_squared() - r * r.transpose());
        }

        let eigen = tensor.symmetric_eigen();
        let mut order: Vec<usize> = (0..3).collect();
        order.sort_by(|&a, &b| {
            eigen.eigenvalues[a]
                .partial_cmp(&eigen.eigenvalues[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let moments = Vector3::new(
            eigen.eigenvalues[order[0]],
            eigen.eigenvalues[order[1]],
            eigen.eigenvalues[order[2]],
        );
        let mut axes = Matrix3::from_columns(&[
            eigen.eigenvectors.column(order[0]),
            eigen.eigenvectors.column(order[1]),
            eigen.eigenvectors.column(order[2]),
        ]);
        if axes.determinant() < 0.0 {
            let flipped = -axes.column(2).into_owned();
            axes.set_column(2, &flipped);
        }

        let transformed = centered.basis_transform(&axes, &Matrix3::identity())?;
        Ok(Inertia {
            transformed,
            moments,
            tensor,
            axes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;

    const TOL: f64 = 1e-9;

    fn dioxygen() -> AtomCollection {
        AtomCollection::from_atoms(vec![
            Atom::new("O", Point3::new(-1.0, 0.0, 0.0)),
            Atom::new("O", Point3::new(1.0, 0.0, 0.0)),
        ])
        .unwrap()
    }

    #[test]
    fn linear_molecule_has_one_vanishing_moment() {
        let inertia = dioxygen().inertia().unwrap();
        assert!(inertia.moments[0].abs() < TOL);
        assert!((inertia.moments[1] - 2.0 * 15.999).abs() < 1e-6);
        assert!((inertia.moments[2] - 2.0 * 15.999).abs() < 1e-6);
    }

    #[test]
    fn moments_are_sorted_ascending() {
        let mol = AtomCollection::from_atoms(vec![
            Atom::new("C", Point3::new(-1.5, 0.0, 0.0)),
            Atom::new("C", Point3::new(1.5, 0.0, 0.0)),
            Atom::new("O", Point3::new(0.0, 0.4, 0.0)),
        ])
        .unwrap();
        let inertia = mol.inertia().unwrap();
        assert!(inertia.moments[0] <= inertia.moments[1]);
        assert!(inertia.moments[1] <= inertia.moments[2]);
    }

    #[test]
    fn axes_are_orthonormal_and_right_handed() {
        let mol = AtomCollection::from_atoms(vec![
            Atom::new("O", Point3::new(0.2, 0.1, 0.0)),
            Atom::new("H", Point3::new(1.1, 0.3, 0.2)),
            Atom::new("H", Point3::new(-0.1, 1.0, -0.3)),
        ])
        .unwrap();
        let inertia = mol.inertia().unwrap();
        let gram = inertia.axes * inertia.axes.transpose();
        assert!((gram - Matrix3::identity()).norm() < 1e-9);
        assert!((inertia.axes.determinant() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn transformed_copy_is_centered_on_barycenter() {
        let mol = AtomCollection::from_atoms(vec![
            Atom::new("O", Point3::new(3.0, 2.0, 1.0)),
            Atom::new("O", Point3::new(5.0, 2.0, 1.0)),
        ])
        .unwrap();
        let inertia = mol.inertia().unwrap();
        let center = inertia.transformed.barycenter().unwrap();
        assert!(center.coords.norm() < 1e-9);
    }

    #[test]
    fn basis_transform_rotates_via_transpose() {
        // New basis = 90 degree rotation about z.
        let new_basis = Matrix3::from_columns(&[
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ]);
        let mol = AtomCollection::from_atoms(vec![Atom::new("C", Point3::new(1.0, 0.0, 0.0))])
            .unwrap();
        let rotated = mol
            .basis_transform(&new_basis, &Matrix3::identity())
            .unwrap();
        let p = rotated.position(0).unwrap();
        assert!((p - Point3::new(0.0, -1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn non_orthonormal_basis_is_rejected_with_residual() {
        let skewed = Matrix3::from_columns(&[
            Vector3::new(1.0, 0.1, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ]);
        let mol = dioxygen();
        let err = mol
            .basis_transform(&skewed, &Matrix3::identity())
            .unwrap_err();
        match err {
            MoleculeError::Geometry { residual, .. } => assert!(residual > 0.0),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn left_handed_basis_is_rejected() {
        let mirrored = Matrix3::from_columns(&[
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, -1.0),
        ]);
        let err = dioxygen()
            .basis_transform(&mirrored, &Matrix3::identity())
            .unwrap_err();
        assert!(matches!(err, MoleculeError::Geometry { .. }));
    }
}
