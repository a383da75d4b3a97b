//! # molcoord
//!
//! A library for working with molecular coordinates: Cartesian atom sets,
//! covalent-bond topology, and internal (Z-matrix) coordinates with a safe
//! mutation protocol between the two representations.
//!
//! ## Architectural Philosophy
//!
//! The library is split into two layers with a strict dependency direction:
//!
//! - **[`core`]: The Cartesian layer.** Labeled atom collections, the
//!   static element property table, the vector-geometry kernel (distances,
//!   angles, dihedrals, inertia analysis, rigid alignment), covalent-bond
//!   detection via an overlapping spatial decomposition, and traversal
//!   algorithms over the resulting bond graph.
//!
//! - **[`zmat`]: The internal-coordinate layer.** Z-matrix entities keyed
//!   by the same stable labels as the Cartesian layer, a resolver that
//!   places atoms sequentially from their reference frames, and the safe
//!   mutation protocol that keeps both representations consistent —
//!   including one-shot dummy-atom recovery when a reference frame
//!   collapses to a line.
//!
//! Everything is synchronous and value-oriented: operations return new
//! snapshots instead of mutating shared state, and the few caches that
//! exist (the bond graph, the resolved Cartesian) have explicit staleness
//! contracts.

pub mod core;
pub mod zmat;
