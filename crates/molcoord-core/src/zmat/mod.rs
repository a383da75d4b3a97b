//! # Internal-Coordinate Module
//!
//! Z-matrix representation and the safe mutation protocol.
//!
//! ## Key Components
//!
//! - [`entity`] - Z-matrix rows, reference partners, and measurement from
//!   Cartesians along a construction table
//! - [`resolver`] - Sequential placement of internal coordinates into
//!   Cartesian positions, behind the [`resolver::CartesianResolver`] seam
//! - [`safety`] - Transactional writes keeping both representations
//!   consistent, with opt-in dummy-atom recovery for collinear frames
//! - [`error`] - The error taxonomy of this layer
//!
//! The central guarantee: a safe write either commits a Z-matrix *and* its
//! freshly resolved Cartesian together, or leaves the system exactly as it
//! was, surfacing the uncommitted candidate in the error.

pub mod entity;
pub mod error;
pub mod resolver;
pub mod safety;
