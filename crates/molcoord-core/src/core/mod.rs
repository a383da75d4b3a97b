//! # Core Module
//!
//! The Cartesian layer: labeled atom sets, element data, geometry, bond
//! detection, and graph traversal.
//!
//! ## Key Components
//!
//! - [`models`] - Atom records, labeled collections, and the bond graph
//! - [`data`] - Static element property table (radius, mass, valency)
//! - [`geometry`] - Distances, angles, dihedrals, inertia, alignment
//! - [`bonds`] - Spatial decomposition and covalent-bond detection
//! - [`traversal`] - Coordination spheres, fragments, chemical environments
//! - [`error`] - The error taxonomy of this layer
//!
//! All operations work on immutable snapshots; the only mutable state is
//! the per-collection bond cache, whose invalidation is the caller's
//! explicit responsibility.

pub mod bonds;
pub mod data;
pub mod error;
pub mod geometry;
pub mod models;
pub mod traversal;
