//! Value networks.
//!
//! All variants share a dueling head (`fc_v`, `fc_a`) and an auxiliary head
//! (`pred_1st`) predicting a property of each card in the partner's hand.
//! Sequences are time-major, `[seq, batch, dim]`.
mod aux_loss;
mod equivariant_lstm;
mod equivariant_public_lstm;
mod ffwd;
mod head;
mod lstm;
mod public_lstm;
pub use aux_loss::{cross_entropy, AuxLoss};
pub use equivariant_lstm::EquivariantLstmNet;
pub use equivariant_public_lstm::EquivariantPublicLstmNet;
pub use ffwd::FfwdNet;
pub use head::{duel, gather_action, greedy_action, DuelingHead};
pub use lstm::LstmNet;
pub use public_lstm::PublicLstmNet;

use crate::{
    config::{NetKind, ValueNetConfig},
    util::{check_dim, check_same_size},
};
use anyhow::Result;
use equivar_core::EquivarError;
use log::info;
use tch::{
    nn::{self, LSTMState},
    Device, Kind, Tensor,
};

/// Recurrent state of a value network.
///
/// Inside the networks both tensors are `[num_layer, batch, hid_dim]`.
#[derive(Debug)]
pub struct HiddenState {
    /// Hidden state.
    pub h0: Tensor,

    /// Cell state.
    pub c0: Tensor,
}

impl HiddenState {
    /// Zero state of the given shape.
    pub fn zeros(shape: &[i64], device: Device) -> Self {
        Self {
            h0: Tensor::zeros(shape, (Kind::Float, device)),
            c0: Tensor::zeros(shape, (Kind::Float, device)),
        }
    }

    /// Returns a new state sharing storage with `self`.
    pub fn shallow_clone(&self) -> Self {
        Self {
            h0: self.h0.shallow_clone(),
            c0: self.c0.shallow_clone(),
        }
    }

    /// Converts `[num_layer, batch·players, hid_dim]` into the batch-major
    /// layout `[batch, num_layer, players, hid_dim]` kept by actors.
    pub fn to_actor_layout(&self, players: i64) -> Result<Self> {
        let convert = |t: &Tensor| -> Result<Tensor> {
            check_dim(t, &[3], "hidden state")?;
            let size = t.size();
            if players <= 0 || size[1] % players != 0 {
                return Err(EquivarError::ShapeMismatch {
                    context: "hidden state to actor layout".to_string(),
                    lhs: size,
                    rhs: vec![players],
                }
                .into());
            }
            Ok(t.reshape(&[size[0], -1, players, size[2]]).transpose(0, 1))
        };

        Ok(Self {
            h0: convert(&self.h0)?,
            c0: convert(&self.c0)?,
        })
    }

    /// Converts the actor layout `[batch, num_layer, players, hid_dim]` back
    /// into `[num_layer, batch·players, hid_dim]`.
    pub fn from_actor_layout(&self) -> Result<Self> {
        let convert = |t: &Tensor| -> Result<Tensor> {
            check_dim(t, &[4], "actor hidden state")?;
            Ok(t.transpose(0, 1).flatten(1, 2).contiguous())
        };

        Ok(Self {
            h0: convert(&self.h0)?,
            c0: convert(&self.c0)?,
        })
    }

    fn check(&self, expected: &[i64], context: &str) -> Result<()> {
        for t in [&self.h0, &self.c0].iter() {
            if t.size() != expected {
                return Err(EquivarError::ShapeMismatch {
                    context: context.to_string(),
                    lhs: t.size(),
                    rhs: expected.to_vec(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn to_lstm_state(&self, device: Device) -> LSTMState {
        LSTMState((self.h0.to(device), self.c0.to(device)))
    }

    fn from_lstm_state(state: LSTMState) -> Self {
        let LSTMState((h0, c0)) = state;
        Self { h0, c0 }
    }
}

/// Output of [`ValueNet::forward`].
///
/// Single-step inputs give results without the leading time axis.
#[derive(Debug)]
pub struct ForwardOutput {
    /// Q-value of the taken action, `[seq, batch]`.
    pub qa: Tensor,

    /// Greedy legal action, `[seq, batch]`, detached.
    pub greedy_action: Tensor,

    /// Q-values, `[seq, batch, num_action]`.
    pub q: Tensor,

    /// Output of the network body, `[seq, batch, hid_dim]`.
    pub recurrent_output: Tensor,
}

/// Interface of the value networks.
pub trait ValueNet {
    /// Builds the network, registering its variables in `var_store`.
    fn build(var_store: &nn::VarStore, config: ValueNetConfig) -> Result<Self>
    where
        Self: Sized;

    /// Builds a network with the same configuration in another var store.
    fn clone_with_var_store(&self, var_store: &nn::VarStore) -> Result<Self>
    where
        Self: Sized,
    {
        Self::build(var_store, self.config().clone())
    }

    /// Configuration of the network.
    fn config(&self) -> &ValueNetConfig;

    /// Auxiliary head, `Linear(hid_dim, 5·3)`.
    fn aux_head(&self) -> &nn::Linear;

    /// Zero recurrent state for `batch_size` sequences.
    fn initial_hidden_state(&self, batch_size: i64) -> HiddenState;

    /// Advantages for a single step, `[batch, num_action]`, and the next state.
    fn act(&self, priv_s: &Tensor, publ_s: &Tensor, hidden: &HiddenState)
        -> Result<(Tensor, HiddenState)>;

    /// Q-values and greedy actions over `[seq, batch, ..]` or single-step
    /// `[batch, ..]` inputs.
    ///
    /// Without `hidden` the recurrent layers start from the zero state.
    fn forward(
        &self,
        priv_s: &Tensor,
        publ_s: &Tensor,
        legal_move: &Tensor,
        action: &Tensor,
        hidden: Option<&HiddenState>,
    ) -> Result<ForwardOutput>;

    /// Loss of the auxiliary head. See [`cross_entropy`].
    fn auxiliary_loss(
        &self,
        recurrent_output: &Tensor,
        target: &Tensor,
        hand_slot_mask: &Tensor,
        seq_len: &Tensor,
    ) -> Result<AuxLoss> {
        cross_entropy(
            self.aux_head(),
            recurrent_output,
            target,
            hand_slot_mask,
            seq_len,
        )
    }
}

/// Builds the variant selected by `config`.
pub fn build_value_net(var_store: &nn::VarStore, config: ValueNetConfig) -> Result<Box<dyn ValueNet>> {
    let kind = config.kind;
    let net: Box<dyn ValueNet> = match kind {
        NetKind::Ffwd => Box::new(FfwdNet::build(var_store, config)?),
        NetKind::Lstm => Box::new(LstmNet::build(var_store, config)?),
        NetKind::PublicLstm => Box::new(PublicLstmNet::build(var_store, config)?),
        NetKind::EquivariantLstm => Box::new(EquivariantLstmNet::build(var_store, config)?),
        NetKind::EquivariantPublicLstm => {
            Box::new(EquivariantPublicLstmNet::build(var_store, config)?)
        }
    };
    info!("Built value network {:?}", kind);
    Ok(net)
}

/// Inputs of a forward pass, on the network's device, with a time axis.
struct Steps {
    priv_s: Tensor,
    publ_s: Tensor,
    legal_move: Tensor,
    action: Tensor,
    one_step: bool,
}

impl Steps {
    fn new(
        priv_s: &Tensor,
        publ_s: &Tensor,
        legal_move: &Tensor,
        action: &Tensor,
        device: Device,
    ) -> Result<Self> {
        check_dim(priv_s, &[2, 3], "priv_s")?;
        check_dim(publ_s, &[priv_s.dim()], "publ_s")?;
        check_dim(legal_move, &[priv_s.dim()], "legal_move")?;
        check_dim(action, &[priv_s.dim() - 1], "action")?;
        let one_step = priv_s.dim() == 2;
        let lift = |t: &Tensor| match one_step {
            true => t.to(device).unsqueeze(0),
            false => t.to(device),
        };

        Ok(Self {
            priv_s: lift(priv_s),
            publ_s: lift(publ_s),
            legal_move: lift(legal_move),
            action: lift(action),
            one_step,
        })
    }

    /// Combines value and advantage into the output of the pass.
    fn finish(&self, v: &Tensor, a: &Tensor, o: Tensor) -> Result<ForwardOutput> {
        let q = duel(v, a, &self.legal_move)?;
        let qa = gather_action(&q, &self.action);
        check_same_size(&q, &self.legal_move, "q")?;
        let greedy_action = greedy_action(&q, &self.legal_move)?;

        let drop_time = |t: Tensor| match self.one_step {
            true => t.squeeze_dim(0),
            false => t,
        };

        Ok(ForwardOutput {
            qa: drop_time(qa),
            greedy_action: drop_time(greedy_action),
            q: drop_time(q),
            recurrent_output: drop_time(o),
        })
    }
}
