//! LSTM value network on the public view, gated by the private view.
use super::{
    lstm::{lstm, zero_state},
    DuelingHead, ForwardOutput, HiddenState, Steps, ValueNet,
};
use crate::{
    config::ValueNetConfig,
    util::{check_dim, relu_layers},
};
use anyhow::Result;
use tch::{
    nn,
    nn::{LSTMState, Module, RNN},
    Device, Tensor,
};

/// An LSTM over the public view multiplied elementwise by an MLP over the
/// private view.
pub(super) struct PublicLstmBody {
    priv_net: nn::Sequential,
    publ_net: nn::Sequential,
    lstm: nn::LSTM,
}

impl PublicLstmBody {
    pub(super) fn build(p: &nn::Path, config: &ValueNetConfig) -> Self {
        let priv_net = relu_layers(p / "priv_net", config.priv_in_dim, config.hid_dim, 3);
        let publ_net = relu_layers(
            p / "publ_net",
            config.publ_in_dim,
            config.hid_dim,
            config.num_ff_layer,
        );
        let lstm = lstm(p, config);

        Self {
            priv_net,
            publ_net,
            lstm,
        }
    }

    /// Runs `[seq, batch, dim]` inputs from `state`.
    pub(super) fn forward(
        &self,
        priv_s: &Tensor,
        publ_s: &Tensor,
        state: &LSTMState,
    ) -> (Tensor, LSTMState) {
        let x = self.publ_net.forward(publ_s);
        let (publ_o, state) = self.lstm.seq_init(&x, state);
        let priv_o = self.priv_net.forward(priv_s);
        (priv_o * publ_o, state)
    }
}

/// LSTM on the public view gated by an MLP on the private view.
pub struct PublicLstmNet {
    config: ValueNetConfig,
    device: Device,
    body: PublicLstmBody,
    head: DuelingHead,
}

impl ValueNet for PublicLstmNet {
    fn build(var_store: &nn::VarStore, config: ValueNetConfig) -> Result<Self> {
        let p = &var_store.root();
        let body = PublicLstmBody::build(p, &config);
        let head = DuelingHead::build(p, config.hid_dim, config.out_dim);

        Ok(Self {
            config,
            device: var_store.device(),
            body,
            head,
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

    fn act(&self, priv_s: &Tensor, publ_s: &Tensor, hidden: &HiddenState) -> Result<(Tensor, HiddenState)> {
        check_dim(priv_s, &[2], "priv_s")?;
        check_dim(publ_s, &[2], "publ_s")?;
        let batch_size = priv_s.size()[0];
        hidden.check(
            &[self.config.num_lstm_layer, batch_size, self.config.hid_dim],
            "hidden state",
        )?;

        let priv_s = priv_s.to(self.device).unsqueeze(0);
        let publ_s = publ_s.to(self.device).unsqueeze(0);
        let (o, state) = self
            .body
            .forward(&priv_s, &publ_s, &hidden.to_lstm_state(self.device));
        let a = self.head.advantage(&o).squeeze_dim(0);
        Ok((a, HiddenState::from_lstm_state(state)))
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
        let state = match hidden {
            Some(hidden) => {
                hidden.check(
                    &[self.config.num_lstm_layer, batch_size, self.config.hid_dim],
                    "hidden state",
                )?;
                hidden.to_lstm_state(self.device)
            }
            None => self.initial_hidden_state(batch_size).to_lstm_state(self.device),
        };

        let (o, _) = self.body.forward(&steps.priv_s, &steps.publ_s, &state);
        let a = self.head.advantage(&o);
        let v = self.head.value(&o);
        steps.finish(&v, &a, o)
    }
}
