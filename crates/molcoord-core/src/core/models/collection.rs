use super::atom::Atom;
use super::graph::BondGraph;
use crate::core::error::MoleculeError;
use nalgebra::{Matrix3, Point3, Vector3};
use std::collections::HashMap;

/// An ordered set of atoms with stable integer labels.
///
/// This is the central data structure of the Cartesian layer. Atoms are held
/// in struct-of-arrays form: a dense record array plus a sparse
/// label-to-slot translation map, so labels survive slicing and filtering
/// without being positional. Two collections may share labels to denote
/// "the same atom" (e.g. a molecule and a displaced copy of it).
///
/// The collection owns the cached bond graph produced by
/// [`get_bonds`](AtomCollection::get_bonds). The cache is keyed by identity
/// of this snapshot and is *never* invalidated implicitly: after mutating
/// positions through [`set_position`](AtomCollection::set_position), callers
/// must invoke [`invalidate_bonds`](AtomCollection::invalidate_bonds) (or
/// request a fresh computation) themselves.
#[derive(Debug, Clone)]
pub struct AtomCollection {
    labels: Vec<usize>,
    atoms: Vec<Atom>,
    index: HashMap<usize, usize>,
    pub(crate) bond_cache: Option<BondGraph>,
}

impl AtomCollection {
    /// Builds a collection from explicit `(label, atom)` records.
    ///
    /// # Errors
    ///
    /// Returns [`MoleculeError::Schema`] for an empty record list, duplicate
    /// labels, empty element symbols, or non-finite coordinates.
    pub fn new(records: Vec<(usize, Atom)>) -> Result<Self, MoleculeError> {
        if records.is_empty() {
            return Err(MoleculeError::Schema(
                "an atom collection must contain at least one atom".to_string(),
            ));
        }
        let mut labels = Vec::with_capacity(records.len());
        let mut atoms = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        for (slot, (label, atom)) in records.into_iter().enumerate() {
            if atom.element.is_empty() {
                return Err(MoleculeError::Schema(format!(
                    "atom {label} has an empty element symbol"
                )));
            }
            if !atom.position.coords.iter().all(|c| c.is_finite()) {
                return Err(MoleculeError::Schema(format!(
                    "atom {label} has a non-finite coordinate"
                )));
            }
            if index.insert(label, slot).is_some() {
                return Err(MoleculeError::Schema(format!("duplicate label {label}")));
            }
            labels.push(label);
            atoms.push(atom);
        }
        Ok(Self {
            labels,
            atoms,
            index,
            bond_cache: None,
        })
    }

    /// Builds a collection with consecutive labels `0..n`.
    pub fn from_atoms(atoms: Vec<Atom>) -> Result<Self, MoleculeError> {
        Self::new(atoms.into_iter().enumerate().collect())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in collection order.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn contains(&self, label: usize) -> bool {
        self.index.contains_key(&label)
    }

    pub fn atom(&self, label: usize) -> Option<&Atom> {
        self.index.get(&label).map(|&slot| &self.atoms[slot])
    }

    pub fn element(&self, label: usize) -> Option<&str> {
        self.atom(label).map(|atom| atom.element.as_str())
    }

    pub fn position(&self, label: usize) -> Option<Point3<f64>> {
        self.atom(label).map(|atom| atom.position)
    }

    /// Position lookup that fails with context instead of returning `None`.
    pub fn try_position(&self, label: usize) -> Result<Point3<f64>, MoleculeError> {
        self.position(label)
            .ok_or(MoleculeError::AtomNotFound { label })
    }

    /// Overwrites the position of one atom.
    ///
    /// Does *not* touch the bond cache; see the type-level documentation for
    /// the invalidation contract.
    pub fn set_position(
        &mut self,
        label: usize,
        position: Point3<f64>,
    ) -> Result<(), MoleculeError> {
        let slot = *self
            .index
            .get(&label)
            .ok_or(MoleculeError::AtomNotFound { label })?;
        self.atoms[slot].position = position;
        Ok(())
    }

    /// Iterates `(label, atom)` pairs in collection order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Atom)> {
        self.labels.iter().copied().zip(self.atoms.iter())
    }

    /// Positions in collection order.
    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|atom| atom.position).collect()
    }

    pub(crate) fn slot_of(&self, label: usize) -> Option<usize> {
        self.index.get(&label).copied()
    }

    pub(crate) fn atom_at_slot(&self, slot: usize) -> &Atom {
        &self.atoms[slot]
    }

    /// Extracts the atoms named by `labels`, in the given order, keeping
    /// their labels. The bond cache is not carried over.
    pub fn subset<I>(&self, labels: I) -> Result<Self, MoleculeError>
    where
        I: IntoIterator<Item = usize>,
    {
        let records: Result<Vec<(usize, Atom)>, MoleculeError> = labels
            .into_iter()
            .map(|label| {
                self.atom(label)
                    .cloned()
                    .map(|atom| (label, atom))
                    .ok_or(MoleculeError::AtomNotFound { label })
            })
            .collect();
        Self::new(records?)
    }

    /// Returns a relabeled copy according to `rename`; labels absent from
    /// the map are kept.
    pub fn change_numbering(
        &self,
        rename: &HashMap<usize, usize>,
    ) -> Result<Self, MoleculeError> {
        let records = self
            .iter()
            .map(|(label, atom)| (*rename.get(&label).unwrap_or(&label), atom.clone()))
            .collect();
        Self::new(records)
    }

    /// Checks that `other` uses the identical label set with identical
    /// element assignment, as required before elementwise arithmetic.
    pub fn assert_same_indexing(&self, other: &Self) -> Result<(), MoleculeError> {
        for &label in &self.labels {
            match other.element(label) {
                None => {
                    return Err(MoleculeError::IndexMismatch(format!(
                        "label {label} is missing from the other collection"
                    )));
                }
                Some(element) if element != self.element(label).unwrap_or("") => {
                    return Err(MoleculeError::IndexMismatch(format!(
                        "label {label} is '{}' here but '{element}' in the other collection",
                        self.element(label).unwrap_or("")
                    )));
                }
                Some(_) => {}
            }
        }
        if other.len() != self.len() {
            return Err(MoleculeError::IndexMismatch(format!(
                "collections differ in size ({} vs {})",
                self.len(),
                other.len()
            )));
        }
        Ok(())
    }

    /// Elementwise position sum with an identically indexed collection.
    pub fn try_add(&self, other: &Self) -> Result<Self, MoleculeError> {
        self.zip_positions(other, |a, b| Point3::from(a.coords + b.coords))
    }

    /// Elementwise position difference with an identically indexed
    /// collection.
    pub fn try_sub(&self, other: &Self) -> Result<Self, MoleculeError> {
        self.zip_positions(other, |a, b| Point3::from(a.coords - b.coords))
    }

    fn zip_positions<F>(&self, other: &Self, op: F) -> Result<Self, MoleculeError>
    where
        F: Fn(Point3<f64>, Point3<f64>) -> Point3<f64>,
    {
        self.assert_same_indexing(other)?;
        let mut result = self.clone();
        result.bond_cache = None;
        for (slot, &label) in self.labels.iter().enumerate() {
            // assert_same_indexing guarantees the label resolves
            if let Some(position) = other.position(label) {
                result.atoms[slot].position = op(self.atoms[slot].position, position);
            }
        }
        Ok(result)
    }

    /// Returns a copy translated by `shift`.
    pub fn translated(&self, shift: Vector3<f64>) -> Self {
        let mut result = self.clone();
        result.bond_cache = None;
        for atom in &mut result.atoms {
            atom.position += shift;
        }
        result
    }

    /// Returns a copy with every position left-multiplied by `matrix`.
    pub fn transformed(&self, matrix: &Matrix3<f64>) -> Self {
        let mut result = self.clone();
        result.bond_cache = None;
        for atom in &mut result.atoms {
            atom.position = Point3::from(matrix * atom.position.coords);
        }
        result
    }

    /// Drops the cached bond graph.
    ///
    /// Required after any direct position edit when a later `get_bonds`
    /// call is made with `use_lookup = true`.
    pub fn invalidate_bonds(&mut self) {
        self.bond_cache = None;
    }

    /// Whether a bond graph is currently cached for this snapshot.
    pub fn has_cached_bonds(&self) -> bool {
        self.bond_cache.is_some()
    }
}

impl PartialEq for AtomCollection {
    /// Compares labels and atom records; the bond cache is transient state
    /// and does not participate.
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels && self.atoms == other.atoms
    }
}
