use crate::core::error::MoleculeError;
use crate::core::models::collection::AtomCollection;
use nalgebra::{Matrix3, Point3, Rotation3};

/// Result of a rigid least-squares alignment.
#[derive(Debug, Clone)]
pub struct Alignment {
    /// Copy of the reference molecule, centered on its topologic center.
    pub reference: AtomCollection,
    /// Copy of the other molecule, centered and rotated onto the reference.
    pub aligned: AtomCollection,
    /// The optimal rotation applied to the centered other molecule.
    pub rotation: Rotation3<f64>,
    /// Root-mean-square deviation over the fitted atom subset after
    /// alignment.
    pub rmsd: f64,
}

/// Optimal rotation mapping `moving` onto `target` in the least-squares
/// sense (Kabsch procedure).
///
/// Both point sets must be centered by the caller. The SVD of the
/// cross-covariance matrix yields the rotation; when the candidate has a
/// negative determinant (a reflection), the smallest singular direction is
/// flipped so the result is always a proper rotation.
pub fn kabsch(
    moving: &[Point3<f64>],
    target: &[Point3<f64>],
) -> Result<Rotation3<f64>, MoleculeError> {
    let mut covariance = Matrix3::zeros();
    for (m, t) in moving.iter().zip(target.iter()) {
        covariance += m.coords * t.coords.transpose();
    }

    let svd = covariance.svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => {
            return Err(MoleculeError::Geometry {
                check: "cross-covariance SVD converges",
                residual: f64::NAN,
            });
        }
    };
    let v = v_t.transpose();

    let mut correction = Matrix3::identity();
    if (v * u.transpose()).determinant() < 0.0 {
        correction[(2, 2)] = -1.0;
    }
    let rotation = v * correction * u.transpose();
    Ok(Rotation3::from_matrix_unchecked(rotation))
}

impl AtomCollection {
    /// Rigidly aligns `other` onto `self`.
    ///
    /// Both molecules are centered on their topologic centers, then the
    /// Kabsch rotation is fitted on the shared atoms — optionally excluding
    /// every atom of `ignore_element` from the fit (the classic
    /// "ignore hydrogens" RMSD) — and applied to *all* atoms of `other`.
    ///
    /// # Errors
    ///
    /// [`MoleculeError::IndexMismatch`] if the two collections are not
    /// indexed alike, [`MoleculeError::Schema`] if excluding
    /// `ignore_element` leaves no atoms to fit.
    pub fn align(
        &self,
        other: &Self,
        ignore_element: Option<&str>,
    ) -> Result<Alignment, MoleculeError> {
        self.assert_same_indexing(other)?;

        let reference = self.translated(Point3::origin() - self.topologic_center());
        let centered_other = other.translated(Point3::origin() - other.topologic_center());

        let fit_labels: Vec<usize> = reference
            .labels()
            .iter()
            .copied()
            .filter(|&label| match ignore_element {
                Some(excluded) => reference.element(label) != Some(excluded),
                None => true,
            })
            .collect();
        if fit_labels.is_empty() {
            return Err(MoleculeError::Schema(
                "no atoms left to fit after element exclusion".to_string(),
            ));
        }

        let target: Vec<Point3<f64>> = fit_labels
            .iter()
            .map(|&label| reference.try_position(label))
            .collect::<Result<_, _>>()?;
        let moving: Vec<Point3<f64>> = fit_labels
            .iter()
            .map(|&label| centered_other.try_position(label))
            .collect::<Result<_, _>>()?;

        let rotation = kabsch(&moving, &target)?;
        let aligned = centered_other.transformed(rotation.matrix());

        let squared_sum: f64 = fit_labels
            .iter()
            .map(|&label| {
                let p = aligned.position(label).unwrap_or(Point3::origin());
                let q = reference.position(label).unwrap_or(Point3::origin());
                (p - q).norm_squared()
            })
            .sum();
        let rmsd = (squared_sum / fit_labels.len() as f64).sqrt();

        Ok(Alignment {
            reference,
            aligned,
            rotation,
            rmsd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use nalgebra::Vector3;

    fn bent_molecule() -> AtomCollection {
        AtomCollection::from_atoms(vec![
            Atom::new("C", Point3::new(0.0, 0.0, 0.0)),
            Atom::new("C", Point3::new(1.5, 0.0, 0.0)),
            Atom::new("O", Point3::new(2.1, 1.2, 0.0)),
            Atom::new("N", Point3::new(-0.7, 0.9, 0.8)),
        ])
        .unwrap()
    }

    #[test]
    fn alignment_undoes_a_known_rotation() {
        let reference = bent_molecule();
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.7);
        let rotated = reference
            .transformed(rotation.matrix())
            .translated(Vector3::new(3.0, -1.0, 2.0));

        let alignment = reference.align(&rotated, None).unwrap();
        assert!(alignment.rmsd < 1e-9, "rmsd = {}", alignment.rmsd);
        assert!((alignment.rotation.matrix().determinant() - 1.0).abs() < 1e-9);
        for &label in alignment.reference.labels() {
            let p = alignment.aligned.position(label).unwrap();
            let q = alignment.reference.position(label).unwrap();
            assert!((p - q).norm() < 1e-9);
        }
    }

    #[test]
    fn mirrored_geometry_still_yields_a_proper_rotation() {
        let reference = bent_molecule();
        let mirror = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, -1.0));
        let mirrored = reference.transformed(&mirror);

        let alignment = reference.align(&mirrored, None).unwrap();
        // A chiral set cannot be aligned onto its mirror image, but the
        // reflection correction must keep the rotation proper.
        assert!((alignment.rotation.matrix().determinant() - 1.0).abs() < 1e-9);
        assert!(alignment.rmsd > 0.1);
    }

    #[test]
    fn element_exclusion_restricts_the_fit_but_rotates_everything() {
        let mut records: Vec<(usize, Atom)> = bent_molecule()
            .iter()
            .map(|(l, a)| (l, a.clone()))
            .collect();
        records.push((4, Atom::new("H", Point3::new(0.3, -0.9, 0.1))));
        let reference = AtomCollection::new(records).unwrap();

        let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), 1.1);
        let mut rotated = reference.transformed(rotation.matrix());
        // Perturb only the hydrogen; excluding it from the fit must improve
        // the reported deviation.
        rotated
            .set_position(4, Point3::new(9.0, 9.0, 9.0))
            .unwrap();

        let with_h = reference.align(&rotated, None).unwrap();
        let without_h = reference.align(&rotated, Some("H")).unwrap();
        assert!(without_h.rmsd < with_h.rmsd);
        // The hydrogen was rotated along with the rest.
        assert!(without_h.aligned.contains(4));
    }

    #[test]
    fn excluding_every_atom_is_an_error() {
        let reference = AtomCollection::from_atoms(vec![
            Atom::new("H", Point3::origin()),
            Atom::new("H", Point3::new(1.0, 0.0, 0.0)),
        ])
        .unwrap();
        let err = reference.align(&reference.clone(), Some("H")).unwrap_err();
        assert!(matches!(err, MoleculeError::Schema(_)));
    }

    #[test]
    fn differently_indexed_molecules_are_rejected() {
        let reference = bent_molecule();
        let other = reference.subset([0, 1, 2]).unwrap();
        let err = reference.align(&other, None).unwrap_err();
        assert!(matches!(err, MoleculeError::IndexMismatch(_)));
    }
}
