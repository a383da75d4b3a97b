//! Covalent-bond detection.
//!
//! [`partition`] decomposes the atom set into overlapping spatial cells so
//! the pairwise radius test in [`detect`] scales past all-pairs; the
//! decomposition never changes the detected graph, only the work done to
//! find it.

pub mod detect;
pub mod partition;
