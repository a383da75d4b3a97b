use super::entity::{Reference, ZMatrix, ZmatField, ZmatRow};
use super::error::{ResolveError, ZmatError};
use super::resolver::{CartesianResolver, ZmatResolver};
use crate::core::geometry::measures::{
    DEGENERACY_TOLERANCE, angle_deg, dihedral_deg, distance,
};
use crate::core::models::atom::Atom;
use crate::core::models::collection::AtomCollection;
use nalgebra::{Point3, Vector3};
use tracing::{debug, warn};

/// How a safe write reached consistency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The candidate resolved directly.
    Committed,
    /// The candidate needed one transient dummy atom; the committed
    /// Cartesian contains no trace of it.
    Recovered,
}

/// A Z-matrix paired with its resolved Cartesian, kept consistent through
/// the safe mutation protocol.
///
/// Safe writes are transactional: the scalar change is applied to a scratch
/// copy, resolved, and only committed together with the fresh Cartesian.
/// When resolution hits a collinear reference frame and dummy manipulation
/// is enabled, one deterministic recovery attempt runs with a transient
/// dummy atom; the dummy never appears in the committed Z-matrix or in any
/// Cartesian handed to the caller. Unsafe writes skip resolution entirely
/// and merely mark the Cartesian stale; the caller owns eventual
/// consistency via [`refresh_cartesian`](ZmatSystem::refresh_cartesian).
#[derive(Debug)]
pub struct ZmatSystem<R: CartesianResolver = ZmatResolver> {
    zmat: ZMatrix,
    cartesian: AtomCollection,
    resolver: R,
    dummy_manipulation: bool,
    cartesian_stale: bool,
}

impl ZmatSystem<ZmatResolver> {
    pub fn new(zmat: ZMatrix) -> Result<Self, ZmatError> {
        Self::with_resolver(zmat, ZmatResolver)
    }
}

impl<R: CartesianResolver> ZmatSystem<R> {
    pub fn with_resolver(zmat: ZMatrix, resolver: R) -> Result<Self, ZmatError> {
        let cartesian = resolver
            .resolve(&zmat)
            .map_err(|err| ZmatError::from_resolve(err, None))?;
        Ok(Self {
            zmat,
            cartesian,
            resolver,
            dummy_manipulation: false,
            cartesian_stale: false,
        })
    }

    pub fn zmat(&self) -> &ZMatrix {
        &self.zmat
    }

    /// The resolved Cartesian. Stale after unsafe writes until
    /// [`refresh_cartesian`](Self::refresh_cartesian) runs.
    pub fn cartesian(&self) -> &AtomCollection {
        &self.cartesian
    }

    pub fn is_cartesian_stale(&self) -> bool {
        self.cartesian_stale
    }

    /// Opts into (or out of) dummy-atom recovery for safe writes.
    pub fn allow_dummy_manipulation(&mut self, allowed: bool) {
        self.dummy_manipulation = allowed;
    }

    /// Applies one scalar change and re-resolves, committing both
    /// representations together or leaving the system untouched.
    ///
    /// # Errors
    ///
    /// [`ZmatError::DegenerateReference`] carrying the uncommitted candidate
    /// when resolution collapses and recovery is disabled or fails;
    /// [`ZmatError::RowNotFound`] / [`ZmatError::Schema`] for an invalid
    /// write.
    pub fn safe_write(
        &mut self,
        label: usize,
        field: ZmatField,
        value: f64,
    ) -> Result<WriteOutcome, ZmatError> {
        let mut candidate = self.zmat.clone();
        candidate.set_value(label, field, value)?;

        match self.resolver.resolve(&candidate) {
            Ok(cartesian) => {
                self.commit(candidate, cartesian);
                Ok(WriteOutcome::Committed)
            }
            Err(ResolveError::DegenerateReference {
                label: offender,
                references,
                already_built,
            }) => {
                if !self.dummy_manipulation {
                    return Err(ZmatError::DegenerateReference {
                        label: offender,
                        references,
                        pending: Some(Box::new(candidate)),
                    });
                }
                match self.recover(&candidate, offender, &already_built) {
                    Some(cartesian) => {
                        warn!(
                            row = offender,
                            "recovered collinear reference frame with a transient dummy atom"
                        );
                        self.commit(candidate, cartesian);
                        Ok(WriteOutcome::Recovered)
                    }
                    None => Err(ZmatError::DegenerateReference {
                        label: offender,
                        references,
                        pending: Some(Box::new(candidate)),
                    }),
                }
            }
            Err(ResolveError::Molecule(inner)) => Err(inner.into()),
        }
    }

    /// Applies one scalar change without resolving.
    ///
    /// The cached Cartesian is marked stale and keeps its previous content
    /// until [`refresh_cartesian`](Self::refresh_cartesian).
    pub fn unsafe_write(
        &mut self,
        label: usize,
        field: ZmatField,
        value: f64,
    ) -> Result<(), ZmatError> {
        self.zmat.set_value(label, field, value)?;
        self.cartesian_stale = true;
        Ok(())
    }

    /// Re-resolves the current Z-matrix, reconciling after unsafe writes.
    pub fn refresh_cartesian(&mut self) -> Result<(), ZmatError> {
        let cartesian = self
            .resolver
            .resolve(&self.zmat)
            .map_err(|err| ZmatError::from_resolve(err, None))?;
        self.cartesian = cartesian;
        self.cartesian_stale = false;
        Ok(())
    }

    fn commit(&mut self, zmat: ZMatrix, cartesian: AtomCollection) {
        self.zmat = zmat;
        self.cartesian = cartesian;
        self.cartesian_stale = false;
    }

    /// One dummy-atom recovery attempt for a collapsed reference frame.
    ///
    /// A dummy is placed one Angstrom off the degenerate axis, perpendicular
    /// to it; a scratch Z-matrix re-targets the offending row's dihedral at
    /// the dummy, with the value re-measured from the atom's last consistent
    /// position so the atom stays where it was azimuthally. After
    /// resolution the dummy is stripped again.
    fn recover(
        &self,
        candidate: &ZMatrix,
        offender: usize,
        already_built: &[(usize, Atom)],
    ) -> Option<AtomCollection> {
        let row = candidate.row(offender)?;
        let p_b = placed_point(&row.bond_ref, already_built)?;
        let p_a = placed_point(&row.angle_ref, already_built)?;

        let axis = p_a - p_b;
        if axis.norm() < DEGENERACY_TOLERANCE {
            return None;
        }
        let u = axis.normalize();
        let dummy_position = p_a + perpendicular_unit(&u);

        // Azimuth of the offender against the dummy, taken from its last
        // consistent position.
        let previous = self.cartesian.position(offender)?;
        let dihedral = dihedral_deg(&previous, &p_b, &p_a, &dummy_position)?;

        let dummy_label = candidate.labels().iter().max().copied()? + 1;
        let mut records = Vec::with_capacity(candidate.len() + 1);
        for (label, row) in candidate.records() {
            if label == offender {
                records.push((dummy_label, absolute_row(&dummy_position)));
                records.push((
                    label,
                    ZmatRow {
                        dihedral_ref: Reference::Atom(dummy_label),
                        dihedral,
                        ..row
                    },
                ));
            } else {
                records.push((label, row));
            }
        }

        let scratch = ZMatrix::new(records).ok()?;
        let resolved = self.resolver.resolve(&scratch).ok()?;
        debug!(row = offender, dummy = dummy_label, "dummy recovery resolved");
        let keep: Vec<usize> = resolved
            .labels()
            .iter()
            .copied()
            .filter(|&label| label != dummy_label)
            .collect();
        resolved.subset(keep).ok()
    }
}

/// Unit vector perpendicular to `u`: the coordinate axis least aligned with
/// `u`, projected off it and normalized.
fn perpendicular_unit(u: &Vector3<f64>) -> Vector3<f64> {
    let axes = [Vector3::x(), Vector3::y(), Vector3::z()];
    let least = axes
        .into_iter()
        .min_by(|a, b| {
            let fa = a.dot(u).abs();
            let fb = b.dot(u).abs();
            fa.partial_cmp(&fb).unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap_or(Vector3::x());
    (least - u * least.dot(u)).normalize()
}

fn placed_point(reference: &Reference, built: &[(usize, Atom)]) -> Option<Point3<f64>> {
    if let Some(point) = reference.absolute_point() {
        return Some(point);
    }
    let label = reference.label()?;
    built
        .iter()
        .find(|(placed, _)| *placed == label)
        .map(|(_, atom)| atom.position)
}

/// A row pinned to an absolute position via the origin and axis anchors,
/// used only for transient dummy atoms.
fn absolute_row(position: &Point3<f64>) -> ZmatRow {
    let origin = Point3::origin();
    let e_x = Point3::new(1.0, 0.0, 0.0);
    let e_y = Point3::new(0.0, 1.0, 0.0);
    ZmatRow {
        element: "X".to_string(),
        bond_ref: Reference::Origin,
        angle_ref: Reference::ExX,
        dihedral_ref: Reference::ExY,
        bond: distance(position, &origin),
        angle: angle_deg(position, &origin, &e_x).unwrap_or(0.0),
        dihedral: dihedral_deg(position, &origin, &e_x, &e_y).unwrap_or(0.0),
    }
}
