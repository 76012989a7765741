#![warn(missing_docs)]
//! Color symmetry of two-player Hanabi observations.
//!
//! This crate is backend-free. It enumerates the symmetry groups acting on
//! the five card colors, describes where colors appear in the flat
//! observation and action vectors, and builds the index permutations that
//! relabel those vectors consistently. Tensor backends turn the index
//! permutations into dense operators.
pub mod error;
pub mod group;
pub mod layout;
pub mod operator;

pub use error::EquivarError;
pub use group::{ColorPerm, GroupKind, SymmetryGroup, NUM_COLORS};
pub use layout::{Field, FieldKind, Layout, LayoutKind};
pub use operator::{relabel, IndexPermutation};
