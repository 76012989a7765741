//! Auxiliary loss predicting the partner's cards.
use crate::util::check_same_size;
use anyhow::Result;
use equivar_core::EquivarError;
use std::convert::TryFrom;
use tch::{nn, nn::Module, Kind, Tensor};

/// Output of [`cross_entropy`].
#[derive(Debug)]
pub struct AuxLoss {
    /// Cross entropy summed over time, `[batch]`.
    pub loss: Tensor,

    /// Mean over the batch of the loss divided by the sequence length.
    pub avg_loss: f64,

    /// Predicted distribution, shaped like the target.
    pub pred: Tensor,

    /// Cross entropy per step, `[seq, batch]`, detached.
    pub seq_loss: Tensor,
}

/// Masked cross entropy of the auxiliary head.
///
/// * `o` - body output, `[seq, batch, hid_dim]`.
/// * `target` - `[seq, batch, 5, 3]` or `[seq, batch, num_player, 5, 3]`.
/// * `hand_slot_mask` - `target` without its last axis.
/// * `seq_len` - `[batch]`.
///
/// Each step is normalized by the number of valid slots, floored at 1e-6,
/// so steps without a valid slot contribute zero.
pub fn cross_entropy(
    net: &nn::Linear,
    o: &Tensor,
    target: &Tensor,
    hand_slot_mask: &Tensor,
    seq_len: &Tensor,
) -> Result<AuxLoss> {
    let logit = net.forward(o);
    if logit.numel() != target.numel() {
        return Err(EquivarError::ShapeMismatch {
            context: "auxiliary logits".to_string(),
            lhs: logit.size(),
            rhs: target.size(),
        }
        .into());
    }
    let logit = logit.reshape(target.size().as_slice());
    check_same_size(&logit.sum_dim_intlist(Some([-1].as_slice()), false, Kind::Float), hand_slot_mask, "hand slot mask")?;

    let q = logit.softmax(-1, Kind::Float);
    let logq = logit.log_softmax(-1, Kind::Float);
    let plogq = (target * logq).sum_dim_intlist(Some([-1].as_slice()), false, Kind::Float);
    let valid = hand_slot_mask
        .sum_dim_intlist(Some([-1].as_slice()), false, Kind::Float)
        .clamp_min(1e-6);
    let mut xent = -(plogq * hand_slot_mask).sum_dim_intlist(Some([-1].as_slice()), false, Kind::Float) / valid;

    if xent.dim() == 3 {
        // [seq, batch, num_player]
        xent = xent.mean_dim(Some([2].as_slice()), false, Kind::Float);
    }

    let seq_xent = xent.detach();
    let xent = xent.sum_dim_intlist(Some([0].as_slice()), false, Kind::Float);
    check_same_size(&xent, seq_len, "sequence length")?;
    let avg_loss = f64::try_from((&xent / seq_len).mean(Kind::Double))?;

    Ok(AuxLoss {
        loss: xent,
        avg_loss,
        pred: q,
        seq_loss: seq_xent,
    })
}
