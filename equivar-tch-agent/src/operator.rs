//! Dense permutation operators.
//!
//! All operators are built in column form, `P·x`. Batches are row vectors,
//! so code that multiplies a batch from the right stores `Pᵀ`.
use equivar_core::{ColorPerm, IndexPermutation, Layout};
use log::info;
use tch::{Device, Kind, Tensor};

/// Returns the `W×W` matrix `P` with `P[r, src[r]] = 1`.
pub fn permutation_matrix(op: &IndexPermutation, device: Device) -> Tensor {
    let src = op.src().iter().map(|&s| s as i64).collect::<Vec<_>>();
    let index = Tensor::from_slice(&src).to(device);
    Tensor::eye(op.width() as i64, (Kind::Float, device)).index_select(0, &index)
}

/// Returns the operator relabeling vectors laid out as `layout` by `perm`.
pub fn operator(layout: &Layout, perm: &ColorPerm, device: Device) -> Tensor {
    permutation_matrix(&IndexPermutation::for_layout(layout, perm), device)
}

/// Returns `[P_1ᵀ, …, P_Gᵀ]` concatenated along columns, shape `[W, G·W]`.
///
/// `x · M` reshaped to `[B·G, W]` holds `P_g x` for sample `b` at row `b·G + g`.
pub fn stacked_input_operators(layout: &Layout, perms: &[ColorPerm], device: Device) -> Tensor {
    let ops = perms
        .iter()
        .map(|p| operator(layout, p, device).tr())
        .collect::<Vec<_>>();
    info!(
        "Built {} input operators for layout {:?} ({} entries)",
        ops.len(),
        layout.kind(),
        layout.width()
    );
    Tensor::cat(&ops, 1)
}

/// Returns `[P_1ᵀ, …, P_Gᵀ]` stacked along a new leading axis, shape `[G, O, O]`.
///
/// Multiplying a row vector `a` by the `g`-th slice yields `P_g a`; pass the
/// inverse elements to undo a relabeling.
pub fn stacked_output_operators(layout: &Layout, perms: &[ColorPerm], device: Device) -> Tensor {
    let ops = perms
        .iter()
        .map(|p| operator(layout, p, device).tr())
        .collect::<Vec<_>>();
    Tensor::stack(&ops, 0)
}
