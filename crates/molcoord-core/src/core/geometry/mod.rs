//! The vector-geometry kernel.
//!
//! Pure measurement and transformation primitives over atom collections:
//! batched distances, angles and dihedrals ([`measures`]), the inertia
//! tensor with principal-axis transformation ([`inertia`]), and rigid
//! least-squares alignment ([`align`]). All angles are degrees; dihedrals
//! live in [0°, 360°).

pub mod align;
pub mod inertia;
pub mod measures;
