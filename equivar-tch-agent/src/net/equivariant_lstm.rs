//! LSTM value network averaged over a color symmetry group.
use super::{
    lstm::{zero_state, LstmBody},
    DuelingHead, ForwardOutput, HiddenState, Steps, ValueNet,
};
use crate::{config::ValueNetConfig, equivariant::GroupExpansion, util::check_dim};
use anyhow::Result;
use equivar_core::Layout;
use tch::{nn, nn::LSTMState, Device, Tensor};

/// [`LstmNet`](super::LstmNet) run on every relabeled copy of its input.
///
/// Advantages are mapped back to the original labels before averaging, so
/// relabeling the observation relabels the advantages in the same way.
/// Value, body output and recurrent state are plain averages.
pub struct EquivariantLstmNet {
    config: ValueNetConfig,
    device: Device,
    body: LstmBody,
    head: DuelingHead,
    expansion: GroupExpansion,
}

impl EquivariantLstmNet {
    /// The group expansion wrapped around the body.
    pub fn expansion(&self) -> &GroupExpansion {
        &self.expansion
    }

    fn expanded_state(&self, hidden: Option<&HiddenState>, batch_size: i64) -> Result<LSTMState> {
        match hidden {
            Some(hidden) => Ok(LSTMState((
                self.expansion.tile(&hidden.h0.to(self.device))?,
                self.expansion.tile(&hidden.c0.to(self.device))?,
            ))),
            None => Ok(zero_state(&self.config, batch_size * self.expansion.order(), self.device)
                .to_lstm_state(self.device)),
        }
    }
}

impl ValueNet for EquivariantLstmNet {
    fn build(var_store: &nn::VarStore, config: ValueNetConfig) -> Result<Self> {
        let device = var_store.device();
        let priv_layout = Layout::private(config.priv_in_dim as usize)?;
        let action_layout = Layout::action(config.out_dim as usize)?;
        let expansion = GroupExpansion::new(config.group, &priv_layout, None, &action_layout, device);

        let p = &var_store.root();
        let body = LstmBody::build(p, &config);
        let head = DuelingHead::build(p, config.hid_dim, config.out_dim);

        Ok(Self {
            config,
            device,
            body,
            head,
            expansion,
        })
    }

    fn config(&self) -> &ValueNetConfig {
        &self.config
    }

    fn aux_head(&self) -> &nn::Linear {
        self.head.aux()
    }

    fn initial_hidden_state(&self, batch_size: i64) -> HiddenState {
        zero_state(&self.config, batch_size, self.device)
    }

    fn act(&self, priv_s: &Tensor, _publ_s: &Tensor, hidden: &HiddenState) -> Result<(Tensor, HiddenState)> {
        check_dim(priv_s, &[2], "priv_s")?;
        let batch_size = priv_s.size()[0];
        hidden.check(
            &[self.config.num_lstm_layer, batch_size, self.config.hid_dim],
            "hidden state",
        )?;

        let x = self.expansion.expand_private(&priv_s.to(self.device))?.unsqueeze(0);
        let state = self.expanded_state(Some(hidden), batch_size)?;
        let (o, LSTMState((h, c))) = self.body.forward(&x, &state);
        let a = self
            .expansion
            .fold_output(&self.head.advantage(&o).squeeze_dim(0))?;
        let hidden = HiddenState {
            h0: self.expansion.fold_mean(&h)?,
            c0: self.expansion.fold_mean(&c)?,
        };
        Ok((a, hidden))
    }

    fn forward(
        &self,
        priv_s: &Tensor,
        publ_s: &Tensor,
        legal_move: &Tensor,
        action: &Tensor,
        hidden: Option<&HiddenState>,
    ) -> Result<ForwardOutput> {
        let steps = Steps::new(priv_s, publ_s, legal_move, action, self.device)?;
        let batch_size = steps.priv_s.size()[1];
        if let Some(hidden) = hidden {
            hidden.check(
                &[self.config.num_lstm_layer, batch_size, self.config.hid_dim],
                "hidden state",
            )?;
        }
        let x = self.expansion.expand_private(&steps.priv_s)?;
        let state = self.expanded_state(hidden, batch_size)?;

        let (o, _) = self.body.forward(&x, &state);
        let a = self.expansion.fold_output(&self.head.advantage(&o))?;
        let v = self.expansion.fold_mean(&self.head.value(&o))?;
        let o = self.expansion.fold_mean(&o)?;
        steps.finish(&v, &a, o)
    }
}
