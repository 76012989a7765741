//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EquivarError {
    /// The requested symmetry group is not supported.
    #[error("Unsupported group type: {0} (expected cyclic, dihedral or symmetric)")]
    UnsupportedGroup(String),

    /// No observation layout is known for the given width.
    #[error("Unsupported layout width: {0}")]
    UnsupportedLayoutWidth(usize),

    /// The labels do not form a bijection on the five colors.
    #[error("Invalid color permutation: {0:?}")]
    InvalidPermutation(Vec<usize>),

    /// Two fields of a layout claim the same index.
    #[error("Fields {first} and {second} overlap at index {index}")]
    LayoutOverlap {
        /// Name of the field that claimed the index first.
        first: String,
        /// Name of the field that claimed it again.
        second: String,
        /// The shared index.
        index: usize,
    },

    /// A field reaches past the end of its layout.
    #[error("Field {field} ends at {end}, past layout width {width}")]
    LayoutOutOfBounds {
        /// Field name.
        field: String,
        /// One past the last index of the field.
        end: usize,
        /// Layout width.
        width: usize,
    },

    /// Tensor or vector sizes disagree.
    #[error("Shape mismatch in {context}: {lhs:?} vs {rhs:?}")]
    ShapeMismatch {
        /// Where the check failed.
        context: String,
        /// Left-hand shape.
        lhs: Vec<i64>,
        /// Right-hand shape.
        rhs: Vec<i64>,
    },

    /// A tensor has an unexpected number of dimensions.
    #[error("Rank mismatch in {context}: expected {expected}, got {actual}")]
    RankMismatch {
        /// Where the check failed.
        context: String,
        /// Accepted ranks, e.g. "2 or 3".
        expected: String,
        /// Actual rank.
        actual: usize,
    },
}
