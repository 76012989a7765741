//! Index form of the permutation operators.
//!
//! For a layout of width `W` and a color permutation `σ`, the operator `P_σ`
//! is the `W×W` 0/1 matrix with `(P_σ x)[r] = x[src[r]]`. Within a color
//! field the block of color `i` moves to the slot of color `σ(i)`; every
//! other index maps to itself. Backends turn [`IndexPermutation::src`] into
//! a dense matrix.
use crate::{
    error::EquivarError,
    group::{ColorPerm, NUM_COLORS},
    layout::Layout,
};
use log::trace;

/// A permutation of the indices of a flat vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPermutation {
    src: Vec<usize>,
}

impl IndexPermutation {
    /// The identity on `width` indices.
    pub fn identity(width: usize) -> Self {
        Self {
            src: (0..width).collect(),
        }
    }

    /// Builds the operator that relabels every color field of `layout` by `perm`.
    pub fn for_layout(layout: &Layout, perm: &ColorPerm) -> Self {
        let mut src: Vec<usize> = (0..layout.width()).collect();

        for field in layout.color_fields() {
            let block = match field.kind.color_block() {
                Some(block) => block,
                None => continue,
            };
            for base in field.bases() {
                for i in 0..NUM_COLORS {
                    let from = base + block * i;
                    let to = base + block * perm.apply(i);
                    for j in 0..block {
                        src[to + j] = from + j;
                    }
                }
            }
            trace!("Relabel field {} by {}", field.name, perm);
        }

        Self { src }
    }

    /// Width of the permuted vector.
    pub fn width(&self) -> usize {
        self.src.len()
    }

    /// `src[r]` is the index read into position `r`.
    pub fn src(&self) -> &[usize] {
        &self.src
    }

    /// Returns `true` if every index maps to itself.
    pub fn is_identity(&self) -> bool {
        self.src.iter().enumerate().all(|(r, &s)| r == s)
    }

    /// Returns the operator `self · other`, which applies `other` first.
    pub fn compose(&self, other: &Self) -> Result<Self, EquivarError> {
        self.check_width(other.width(), "composition")?;
        Ok(Self {
            src: self.src.iter().map(|&s| other.src[s]).collect(),
        })
    }

    /// Returns the inverse operator, which is also its transpose.
    pub fn inverse(&self) -> Self {
        let mut src = vec![0; self.src.len()];
        for (r, &s) in self.src.iter().enumerate() {
            src[s] = r;
        }
        Self { src }
    }

    /// Applies the operator to a vector.
    pub fn apply<T: Copy>(&self, x: &[T]) -> Result<Vec<T>, EquivarError> {
        self.check_width(x.len(), "apply")?;
        Ok(self.src.iter().map(|&s| x[s]).collect())
    }

    fn check_width(&self, width: usize, context: &str) -> Result<(), EquivarError> {
        if width != self.width() {
            return Err(EquivarError::ShapeMismatch {
                context: context.to_string(),
                lhs: vec![self.width() as i64],
                rhs: vec![width as i64],
            });
        }
        Ok(())
    }
}

/// Relabels the colors of `x`, a vector laid out as `layout`.
pub fn relabel<T: Copy>(layout: &Layout, perm: &ColorPerm, x: &[T]) -> Result<Vec<T>, EquivarError> {
    IndexPermutation::for_layout(layout, perm).apply(x)
}
