//! LSTM value network on the private view.
use super::{DuelingHead, ForwardOutput, HiddenState, Steps, ValueNet};
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

/// Feed-forward layers followed by a time-major LSTM.
pub(super) struct LstmBody {
    net: nn::Sequential,
    lstm: nn::LSTM,
}

impl LstmBody {
    pub(super) fn build(p: &nn::Path, config: &ValueNetConfig) -> Self {
        let net = relu_layers(
            p / "net",
            config.priv_in_dim,
            config.hid_dim,
            config.num_ff_layer,
        );
        let lstm = lstm(p, config);
        Self { net, lstm }
    }

    /// Runs `priv_s`, `[seq, batch, dim]`, from `state`.
    pub(super) fn forward(&self, priv_s: &Tensor, state: &LSTMState) -> (Tensor, LSTMState) {
        let x = self.net.forward(priv_s);
        self.lstm.seq_init(&x, state)
    }
}

/// Time-major LSTM registered as `lstm`.
pub(super) fn lstm(p: &nn::Path, config: &ValueNetConfig) -> nn::LSTM {
    let rnn_config = nn::RNNConfig {
        num_layers: config.num_lstm_layer,
        batch_first: false,
        ..Default::default()
    };
    nn::lstm(p / "lstm", config.hid_dim, config.hid_dim, rnn_config)
}

/// Zero state `[num_layer, batch, hid_dim]`.
pub(super) fn zero_state(config: &ValueNetConfig, batch_size: i64, device: Device) -> HiddenState {
    HiddenState::zeros(
        &[config.num_lstm_layer, batch_size, config.hid_dim],
        device,
    )
}

/// Feed-forward layers and an LSTM on the private view.
pub struct LstmNet {
    config: ValueNetConfig,
    device: Device,
    body: LstmBody,
    head: DuelingHead,
}

impl ValueNet for LstmNet {
    fn build(var_store: &nn::VarStore, config: ValueNetConfig) -> Result<Self> {
        let p = &var_store.root();
        let body = LstmBody::build(p, &config);
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

    fn act(&self, priv_s: &Tensor, _publ_s: &Tensor, hidden: &HiddenState) -> Result<(Tensor, HiddenState)> {
        check_dim(priv_s, &[2], "priv_s")?;
        let batch_size = priv_s.size()[0];
        hidden.check(
            &[self.config.num_lstm_layer, batch_size, self.config.hid_dim],
            "hidden state",
        )?;

        let priv_s = priv_s.to(self.device).unsqueeze(0);
        let (o, state) = self.body.forward(&priv_s, &hidden.to_lstm_state(self.device));
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

        let (o, _) = self.body.forward(&steps.priv_s, &state);
        let a = self.head.advantage(&o);
        let v = self.head.value(&o);
        steps.finish(&v, &a, o)
    }
}
