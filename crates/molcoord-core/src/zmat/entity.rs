use super::error::ZmatError;
use crate::core::geometry::measures::{DEGENERACY_TOLERANCE, angle_deg, dihedral_deg, distance};
use crate::core::models::collection::AtomCollection;
use nalgebra::Point3;
use std::collections::HashMap;

/// Partner of one internal coordinate: either another atom, or one of the
/// four absolute anchor points that seed the first rows of a Z-matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    /// Another row of the same Z-matrix, which must be defined earlier.
    Atom(usize),
    /// The coordinate origin.
    Origin,
    /// Unit point on the x-axis.
    ExX,
    /// Unit point on the y-axis.
    ExY,
    /// Unit point on the z-axis.
    ExZ,
}

impl Reference {
    /// The fixed location of an absolute reference, `None` for [`Reference::Atom`].
    pub fn absolute_point(&self) -> Option<Point3<f64>> {
        match self {
            Reference::Atom(_) => None,
            Reference::Origin => Some(Point3::origin()),
            Reference::ExX => Some(Point3::new(1.0, 0.0, 0.0)),
            Reference::ExY => Some(Point3::new(0.0, 1.0, 0.0)),
            Reference::ExZ => Some(Point3::new(0.0, 0.0, 1.0)),
        }
    }

    pub fn label(&self) -> Option<usize> {
        match self {
            Reference::Atom(label) => Some(*label),
            _ => None,
        }
    }
}

/// Which scalar of a row a write addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZmatField {
    BondLength,
    Angle,
    Dihedral,
}

/// One atom in internal coordinates: three reference partners and the
/// scalars measured against them.
#[derive(Debug, Clone, PartialEq)]
pub struct ZmatRow {
    pub element: String,
    /// Partner the bond length is measured to.
    pub bond_ref: Reference,
    /// Partner closing the bond angle.
    pub angle_ref: Reference,
    /// Partner closing the dihedral.
    pub dihedral_ref: Reference,
    /// Bond length in Angstroms.
    pub bond: f64,
    /// Bond angle in degrees, at the vertex of `bond_ref`.
    pub angle: f64,
    /// Dihedral in degrees, in [0, 360).
    pub dihedral: f64,
}

/// A molecule in internal coordinates.
///
/// Rows are ordered (the build order of the corresponding Cartesian) and
/// keyed by the same stable labels as [`AtomCollection`]. Construction
/// enforces that every atom reference points to an *earlier* row, so a
/// single forward pass can always resolve positions.
#[derive(Debug, Clone, PartialEq)]
pub struct ZMatrix {
    labels: Vec<usize>,
    rows: Vec<ZmatRow>,
    index: HashMap<usize, usize>,
}

impl ZMatrix {
    /// Builds a Z-matrix from ordered `(label, row)` records.
    ///
    /// # Errors
    ///
    /// [`ZmatError::Schema`] for an empty record list, duplicate labels,
    /// empty element symbols, non-finite scalars, or a reference to the row
    /// itself or to a row not defined earlier.
    pub fn new(records: Vec<(usize, ZmatRow)>) -> Result<Self, ZmatError> {
        if records.is_empty() {
            return Err(ZmatError::Schema(
                "a z-matrix must contain at least one row".to_string(),
            ));
        }
        let mut labels = Vec::with_capacity(records.len());
        let mut rows = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        for (slot, (label, row)) in records.into_iter().enumerate() {
            if row.element.is_empty() {
                return Err(ZmatError::Schema(format!(
                    "row {label} has an empty element symbol"
                )));
            }
            for value in [row.bond, row.angle, row.dihedral] {
                if !value.is_finite() {
                    return Err(ZmatError::Schema(format!(
                        "row {label} has a non-finite coordinate value"
                    )));
                }
            }
            for reference in [row.bond_ref, row.angle_ref, row.dihedral_ref] {
                if let Some(referenced) = reference.label() {
                    if referenced == label {
                        return Err(ZmatError::Schema(format!(
                            "row {label} references itself"
                        )));
                    }
                    if !index.contains_key(&referenced) {
                        return Err(ZmatError::Schema(format!(
                            "row {label} references row {referenced}, which is not defined earlier"
                        )));
                    }
                }
            }
            if index.insert(label, slot).is_some() {
                return Err(ZmatError::Schema(format!("duplicate label {label}")));
            }
            labels.push(label);
            rows.push(row);
        }
        Ok(Self {
            labels,
            rows,
            index,
        })
    }

    /// Measures a Z-matrix from Cartesian positions along a caller-supplied
    /// construction table of `(label, [bond_ref, angle_ref, dihedral_ref])`
    /// entries.
    ///
    /// When the atom sits on its own bond-angle axis its dihedral is
    /// undefined but irrelevant for placement and recorded as zero; a
    /// collapsed reference frame, by contrast, is an error.
    ///
    /// # Errors
    ///
    /// [`ZmatError::DegenerateReference`] when a reference triple is
    /// collinear, [`ZmatError::Molecule`] for labels missing from the
    /// collection, [`ZmatError::Schema`] for a malformed table.
    pub fn from_cartesian(
        collection: &AtomCollection,
        table: &[(usize, [Reference; 3])],
    ) -> Result<Self, ZmatError> {
        let point_of = |reference: &Reference| -> Result<Point3<f64>, ZmatError> {
            match reference.absolute_point() {
                Some(point) => Ok(point),
                None => {
                    // label() is Some exactly when absolute_point is None
                    let label = reference.label().unwrap_or_default();
                    Ok(collection.try_position(label)?)
                }
            }
        };

        let mut records = Vec::with_capacity(table.len());
        for &(label, references) in table {
            let x = collection.try_position(label)?;
            let element = collection
                .element(label)
                .unwrap_or_default()
                .to_string();
            let b = point_of(&references[0])?;
            let a = point_of(&references[1])?;
            let d = point_of(&references[2])?;

            let bond = distance(&x, &b);
            if bond < DEGENERACY_TOLERANCE {
                // Coincident with its bond reference: the frame carries no
                // information and the scalars are placeholders.
                records.push((
                    label,
                    ZmatRow {
                        element,
                        bond_ref: references[0],
                        angle_ref: references[1],
                        dihedral_ref: references[2],
                        bond: 0.0,
                        angle: 0.0,
                        dihedral: 0.0,
                    },
                ));
                continue;
            }

            let ab = a - b;
            if ab.norm() < DEGENERACY_TOLERANCE
                || ab.cross(&(d - a)).norm() < DEGENERACY_TOLERANCE
            {
                return Err(ZmatError::DegenerateReference {
                    label,
                    references,
                    pending: None,
                });
            }

            let angle = angle_deg(&x, &b, &a).unwrap_or(0.0);
            // None here means x lies on the bond-angle axis; any dihedral
            // resolves to the same position.
            let dihedral = dihedral_deg(&x, &b, &a, &d).unwrap_or(0.0);
            records.push((
                label,
                ZmatRow {
                    element,
                    bond_ref: references[0],
                    angle_ref: references[1],
                    dihedral_ref: references[2],
                    bond,
                    angle,
                    dihedral,
                },
            ));
        }
        Self::new(records)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in build order.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn contains(&self, label: usize) -> bool {
        self.index.contains_key(&label)
    }

    pub fn row(&self, label: usize) -> Option<&ZmatRow> {
        self.index.get(&label).map(|&slot| &self.rows[slot])
    }

    /// Like [`row`](Self::row) but failing with context.
    pub fn try_row(&self, label: usize) -> Result<&ZmatRow, ZmatError> {
        self.row(label).ok_or(ZmatError::RowNotFound { label })
    }

    /// Iterates `(label, row)` pairs in build order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ZmatRow)> {
        self.labels.iter().copied().zip(self.rows.iter())
    }

    /// Clones the ordered records, e.g. to derive a modified Z-matrix.
    pub(crate) fn records(&self) -> Vec<(usize, ZmatRow)> {
        self.iter().map(|(label, row)| (label, row.clone())).collect()
    }

    pub fn value(&self, label: usize, field: ZmatField) -> Option<f64> {
        self.row(label).map(|row| match field {
            ZmatField::BondLength => row.bond,
            ZmatField::Angle => row.angle,
            ZmatField::Dihedral => row.dihedral,
        })
    }

    /// Overwrites one scalar of one row. This does not touch any Cartesian
    /// representation; consistency is the concern of the safe mutation
    /// protocol on top.
    pub fn set_value(
        &mut self,
        label: usize,
        field: ZmatField,
        value: f64,
    ) -> Result<(), ZmatError> {
        if !value.is_finite() {
            return Err(ZmatError::Schema(format!(
                "non-finite value written to row {label}"
            )));
        }
        let slot = *self
            .index
            .get(&label)
            .ok_or(ZmatError::RowNotFound { label })?;
        let row = &mut self.rows[slot];
        match field {
            ZmatField::BondLength => row.bond = value,
            ZmatField::Angle => row.angle = value,
            ZmatField::Dihedral => row.dihedral = value,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::zmat::resolver::{CartesianResolver, ZmatResolver};

    fn seed_row(element: &str) -> ZmatRow {
        ZmatRow {
            element: element.to_string(),
            bond_ref: Reference::Origin,
            angle_ref: Reference::ExX,
            dihedral_ref: Reference::ExY,
            bond: 0.0,
            angle: 0.0,
            dihedral: 0.0,
        }
    }

    mod construction {
        use super::*;

        #[test]
        fn rows_round_trip() {
            let zmat = ZMatrix::new(vec![
                (0, seed_row("C")),
                (
                    1,
                    ZmatRow {
                        bond_ref: Reference::Atom(0),
                        bond: 1.5,
                        ..seed_row("N")
                    },
                ),
            ])
            .unwrap();
            assert_eq!(zmat.len(), 2);
            assert_eq!(zmat.labels(), &[0, 1]);
            assert_eq!(zmat.row(1).unwrap().bond, 1.5);
            assert_eq!(zmat.value(1, ZmatField::BondLength), Some(1.5));
        }

        #[test]
        fn forward_references_are_rejected() {
            let err = ZMatrix::new(vec![(
                0,
                ZmatRow {
                    bond_ref: Reference::Atom(1),
                    ..seed_row("C")
                },
            )])
            .unwrap_err();
            assert!(matches!(err, ZmatError::Schema(_)));
        }

        #[test]
        fn self_references_are_rejected() {
            let err = ZMatrix::new(vec![(
                7,
                ZmatRow {
                    dihedral_ref: Reference::Atom(7),
                    ..seed_row("C")
                },
            )])
            .unwrap_err();
            assert!(matches!(err, ZmatError::Schema(_)));
        }

        #[test]
        fn duplicate_labels_are_rejected() {
            let err =
                ZMatrix::new(vec![(3, seed_row("C")), (3, seed_row("C"))]).unwrap_err();
            assert!(matches!(err, ZmatError::Schema(_)));
        }

        #[test]
        fn non_finite_values_are_rejected() {
            let err = ZMatrix::new(vec![(
                0,
                ZmatRow {
                    angle: f64::NAN,
                    ..seed_row("C")
                },
            )])
            .unwrap_err();
            assert!(matches!(err, ZmatError::Schema(_)));
        }
    }

    mod writes {
        use super::*;

        #[test]
        fn set_value_addresses_one_scalar() {
            let mut zmat = ZMatrix::new(vec![(0, seed_row("C"))]).unwrap();
            zmat.set_value(0, ZmatField::Dihedral, 120.0).unwrap();
            assert_eq!(zmat.value(0, ZmatField::Dihedral), Some(120.0));
            assert_eq!(zmat.value(0, ZmatField::Angle), Some(0.0));
        }

        #[test]
        fn unknown_row_is_reported() {
            let mut zmat = ZMatrix::new(vec![(0, seed_row("C"))]).unwrap();
            let err = zmat.set_value(9, ZmatField::Angle, 90.0).unwrap_err();
            assert!(matches!(err, ZmatError::RowNotFound { label: 9 }));
        }

        #[test]
        fn non_finite_write_is_rejected() {
            let mut zmat = ZMatrix::new(vec![(0, seed_row("C"))]).unwrap();
            let err = zmat
                .set_value(0, ZmatField::BondLength, f64::INFINITY)
                .unwrap_err();
            assert!(matches!(err, ZmatError::Schema(_)));
        }
    }

    mod measurement {
        use super::*;

        #[test]
        fn from_cartesian_inverts_resolution() {
            let mol = AtomCollection::from_atoms(vec![
                Atom::new("C", Point3::new(0.1, 0.2, 0.3)),
                Atom::new("C", Point3::new(1.5, 0.1, -0.2)),
                Atom::new("C", Point3::new(2.2, 1.3, 0.4)),
                Atom::new("O", Point3::new(1.9, 2.1, 1.6)),
            ])
            .unwrap();
            let table = [
                (0, [Reference::Origin, Reference::ExX, Reference::ExY]),
                (1, [Reference::Atom(0), Reference::Origin, Reference::ExX]),
                (2, [Reference::Atom(1), Reference::Atom(0), Reference::Origin]),
                (3, [Reference::Atom(2), Reference::Atom(1), Reference::Atom(0)]),
            ];
            let zmat = ZMatrix::from_cartesian(&mol, &table).unwrap();
            let rebuilt = ZmatResolver.resolve(&zmat).unwrap();
            for &label in mol.labels() {
                let p = mol.position(label).unwrap();
                let q = rebuilt.position(label).unwrap();
                assert!((p - q).norm() < 1e-9, "atom {label}: {p:?} vs {q:?}");
            }
        }

        #[test]
        fn collinear_reference_triple_is_rejected() {
            let mol = AtomCollection::from_atoms(vec![
                Atom::new("C", Point3::new(0.0, 0.0, 0.0)),
                Atom::new("C", Point3::new(1.0, 0.0, 0.0)),
                Atom::new("C", Point3::new(2.0, 0.0, 0.0)),
                Atom::new("C", Point3::new(3.0, 1.0, 0.0)),
            ])
            .unwrap();
            let table = [
                (0, [Reference::Origin, Reference::ExY, Reference::ExZ]),
                (1, [Reference::Atom(0), Reference::ExY, Reference::ExZ]),
                (2, [Reference::Atom(1), Reference::Atom(0), Reference::ExY]),
                // 2, 1, 0 are collinear: no frame for atom 3.
                (3, [Reference::Atom(2), Reference::Atom(1), Reference::Atom(0)]),
            ];
            let err = ZMatrix::from_cartesian(&mol, &table).unwrap_err();
            assert!(matches!(
                err,
                ZmatError::DegenerateReference { label: 3, .. }
            ));
        }

        #[test]
        fn unknown_label_surfaces_from_the_collection() {
            let mol =
                AtomCollection::from_atoms(vec![Atom::new("C", Point3::origin())]).unwrap();
            let table = [(5, [Reference::Origin, Reference::ExX, Reference::ExY])];
            let err = ZMatrix::from_cartesian(&mol, &table).unwrap_err();
            assert!(matches!(err, ZmatError::Molecule(_)));
        }
    }
}
