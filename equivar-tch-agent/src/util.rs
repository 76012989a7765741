//! Utilities.
use equivar_core::EquivarError;
use itertools::Itertools;
use tch::{nn, Tensor};

/// Fails unless `t` has one of the ranks in `allowed`.
pub(crate) fn check_dim(t: &Tensor, allowed: &[usize], context: &str) -> Result<(), EquivarError> {
    let dim = t.dim();
    if allowed.contains(&dim) {
        return Ok(());
    }
    Err(EquivarError::RankMismatch {
        context: context.to_string(),
        expected: allowed.iter().join(" or "),
        actual: dim,
    })
}

/// Fails unless `lhs` and `rhs` have the same size.
pub(crate) fn check_same_size(lhs: &Tensor, rhs: &Tensor, context: &str) -> Result<(), EquivarError> {
    if lhs.size() == rhs.size() {
        return Ok(());
    }
    Err(EquivarError::ShapeMismatch {
        context: context.to_string(),
        lhs: lhs.size(),
        rhs: rhs.size(),
    })
}

/// Fails unless the last axis of `t` has `width` entries.
pub(crate) fn check_last_dim(t: &Tensor, width: i64, context: &str) -> Result<(), EquivarError> {
    let size = t.size();
    match size.last() {
        Some(&w) if w == width => Ok(()),
        _ => Err(EquivarError::ShapeMismatch {
            context: context.to_string(),
            lhs: size,
            rhs: vec![width],
        }),
    }
}

/// Linear layers of width `hid_dim`, each followed by ReLU.
///
/// Linear layers sit at the even positions of the sequence, so their
/// variables are named `{p}.0.weight`, `{p}.2.weight` and so on.
pub(crate) fn relu_layers(p: nn::Path, in_dim: i64, hid_dim: i64, num_layer: i64) -> nn::Sequential {
    let mut seq = nn::seq();
    let mut in_dim = in_dim;

    for i in 0..num_layer {
        seq = seq.add(nn::linear(&p / (2 * i), in_dim, hid_dim, Default::default()));
        seq = seq.add_fn(|x| x.relu());
        in_dim = hid_dim;
    }

    seq
}
