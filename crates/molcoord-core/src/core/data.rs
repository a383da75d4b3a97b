use super::error::MoleculeError;
use phf::phf_map;

/// Per-element physical properties consumed by the bond builder and the
/// geometry kernel.
///
/// Covalent radii are in Angstroms (Cordero et al. single-bond values),
/// masses in unified atomic mass units. The valency is only used as a
/// deterministic tie-break when ordering bond-graph neighbors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementData {
    /// Covalent radius in Angstroms, summed pairwise in the bond test.
    pub covalent_radius: f64,
    /// Standard atomic mass in u.
    pub mass: f64,
    /// Typical number of covalent bonds formed by the element.
    pub valency: u8,
}

const fn elem(covalent_radius: f64, mass: f64, valency: u8) -> ElementData {
    ElementData {
        covalent_radius,
        mass,
        valency,
    }
}

/// Static element property table, keyed by element symbol.
pub static ELEMENTS: phf::Map<&'static str, ElementData> = phf_map! {
    "H"  => elem(0.31, 1.008, 1),
    "He" => elem(0.28, 4.0026, 0),
    "Li" => elem(1.28, 6.94, 1),
    "Be" => elem(0.96, 9.0122, 2),
    "B"  => elem(0.84, 10.81, 3),
    "C"  => elem(0.76, 12.011, 4),
    "N"  => elem(0.71, 14.007, 3),
    "O"  => elem(0.66, 15.999, 2),
    "F"  => elem(0.57, 18.998, 1),
    "Ne" => elem(0.58, 20.180, 0),
    "Na" => elem(1.66, 22.990, 1),
    "Mg" => elem(1.41, 24.305, 2),
    "Al" => elem(1.21, 26.982, 3),
    "Si" => elem(1.11, 28.085, 4),
    "P"  => elem(1.07, 30.974, 3),
    "S"  => elem(1.05, 32.06, 2),
    "Cl" => elem(1.02, 35.45, 1),
    "Ar" => elem(1.06, 39.948, 0),
    "K"  => elem(2.03, 39.098, 1),
    "Ca" => elem(1.76, 40.078, 2),
    "Ti" => elem(1.60, 47.867, 4),
    "Cr" => elem(1.39, 51.996, 6),
    "Mn" => elem(1.39, 54.938, 4),
    "Fe" => elem(1.32, 55.845, 3),
    "Co" => elem(1.26, 58.933, 3),
    "Ni" => elem(1.24, 58.693, 2),
    "Cu" => elem(1.32, 63.546, 2),
    "Zn" => elem(1.22, 65.38, 2),
    "Se" => elem(1.20, 78.971, 2),
    "Br" => elem(1.20, 79.904, 1),
    "Sn" => elem(1.39, 118.71, 4),
    "I"  => elem(1.39, 126.90, 1),
    "Pb" => elem(1.46, 207.2, 4),
};

/// Looks up the full property record for an element symbol.
///
/// # Errors
///
/// Returns [`MoleculeError::UnknownElement`] if the symbol has no entry.
pub fn element_data(symbol: &str) -> Result<&'static ElementData, MoleculeError> {
    ELEMENTS.get(symbol).ok_or(MoleculeError::UnknownElement {
        symbol: symbol.to_string(),
    })
}

/// Covalent radius in Angstroms for an element symbol.
pub fn covalent_radius(symbol: &str) -> Result<f64, MoleculeError> {
    element_data(symbol).map(|data| data.covalent_radius)
}

/// Standard atomic mass in u for an element symbol.
pub fn mass(symbol: &str) -> Result<f64, MoleculeError> {
    element_data(symbol).map(|data| data.mass)
}

/// Typical valency for an element symbol.
pub fn valency(symbol: &str) -> Result<u8, MoleculeError> {
    element_data(symbol).map(|data| data.valency)
}
