use super::entity::{Reference, ZMatrix};
use crate::core::error::MoleculeError;
use crate::core::models::atom::Atom;
use thiserror::Error;

/// Errors of the internal-coordinate layer.
#[derive(Debug, Error)]
pub enum ZmatError {
    /// Structural violation in a Z-matrix: duplicate labels, forward or
    /// self references, non-finite values.
    #[error("z-matrix schema violation: {0}")]
    Schema(String),

    /// A label that names no row.
    #[error("z-matrix row {label} not found")]
    RowNotFound { label: usize },

    /// A reference triple collapsed to a line, so the row's local frame is
    /// undefined. After a failed safe write, `pending` holds the candidate
    /// Z-matrix that was *not* committed, for diagnosis or retry.
    #[error("degenerate reference frame at row {label} (references {references:?})")]
    DegenerateReference {
        label: usize,
        references: [Reference; 3],
        pending: Option<Box<ZMatrix>>,
    },

    #[error(transparent)]
    Molecule(#[from] MoleculeError),
}

/// Failure signal of a resolver pass.
///
/// Degeneracy carries everything a recovery attempt needs: the offending
/// row, its reference triple, and the atoms already placed before the
/// failure (in build order).
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("degenerate reference frame at row {label}")]
    DegenerateReference {
        label: usize,
        references: [Reference; 3],
        already_built: Vec<(usize, Atom)>,
    },

    #[error(transparent)]
    Molecule(#[from] MoleculeError),
}

impl ZmatError {
    /// Converts a resolver failure, attaching the uncommitted candidate
    /// representation when the failure aborted a safe write.
    pub(crate) fn from_resolve(err: ResolveError, pending: Option<Box<ZMatrix>>) -> Self {
        match err {
            ResolveError::DegenerateReference {
                label, references, ..
            } => ZmatError::DegenerateReference {
                label,
                references,
                pending,
            },
            ResolveError::Molecule(inner) => ZmatError::Molecule(inner),
        }
    }
}
