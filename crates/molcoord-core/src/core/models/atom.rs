use nalgebra::Point3;

/// A single atom record: an element symbol and a position in Angstroms.
///
/// Atoms carry no identity of their own; the stable integer label that names
/// an atom across all derived views lives in the owning
/// [`AtomCollection`](super::collection::AtomCollection).
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The element symbol (e.g. "C", "Cl").
    pub element: String,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    /// Creates a new atom from an element symbol and a position.
    pub fn new(element: &str, position: Point3<f64>) -> Self {
        Self {
            element: element.to_string(),
            position,
        }
    }
}
