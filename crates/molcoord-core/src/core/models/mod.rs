//! Fundamental data structures of the Cartesian layer.
//!
//! - [`atom`] - A single atom: element symbol plus position
//! - [`collection`] - Ordered atom sets with stable integer labels
//! - [`graph`] - The symmetric, total covalent-bond adjacency relation

pub mod atom;
pub mod collection;
pub mod graph;
