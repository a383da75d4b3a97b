use thiserror::Error;

/// Errors raised by the Cartesian layer of the library.
///
/// Schema and geometry violations are fatal and are never downgraded: they
/// abort the current operation and carry enough context (offending labels or
/// residuals) to diagnose the failure without re-running it.
#[derive(Debug, Error)]
pub enum MoleculeError {
    /// The input atom data cannot describe a molecule (duplicate labels,
    /// empty element symbols, non-finite coordinates, empty collection).
    #[error("Schema violation: {0}")]
    Schema(String),

    /// Two collections combined arithmetically do not share an identical
    /// label set, or identical labels disagree on element assignment.
    #[error("Collections are not indexed alike: {0}")]
    IndexMismatch(String),

    /// An asserted geometric precondition failed within numeric tolerance.
    #[error("Geometric precondition '{check}' failed (residual {residual:.3e})")]
    Geometry { check: &'static str, residual: f64 },

    /// A label lookup did not resolve to an atom of this collection.
    #[error("No atom with label {label} in this collection")]
    AtomNotFound { label: usize },

    /// An element symbol has no entry in the element property table.
    #[error("Unknown element symbol '{symbol}'")]
    UnknownElement { symbol: String },
}
