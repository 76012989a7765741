//! Feed-forward value network.
use super::{DuelingHead, ForwardOutput, HiddenState, Steps, ValueNet};
use crate::{config::ValueNetConfig, util::{check_dim, relu_layers}};
use anyhow::Result;
use tch::{nn, nn::Module, Device, Tensor};

/// Three linear layers with ReLU on the private view.
///
/// The network keeps no recurrent state; [`ValueNet::act`] returns the given
/// state unchanged.
pub struct FfwdNet {
    config: ValueNetConfig,
    device: Device,
    net: nn::Sequential,
    head: DuelingHead,
}

impl ValueNet for FfwdNet {
    fn build(var_store: &nn::VarStore, config: ValueNetConfig) -> Result<Self> {
        let p = &var_store.root();
        let net = relu_layers(p / "net", config.priv_in_dim, config.hid_dim, 3);
        let head = DuelingHead::build(p, config.hid_dim, config.out_dim);

        Ok(Self {
            config,
            device: var_store.device(),
            net,
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
        HiddenState::zeros(&[1, batch_size, 1], self.device)
    }

    fn act(&self, priv_s: &Tensor, _publ_s: &Tensor, hidden: &HiddenState) -> Result<(Tensor, HiddenState)> {
        check_dim(priv_s, &[2], "priv_s")?;
        let o = self.net.forward(&priv_s.to(self.device));
        Ok((self.head.advantage(&o), hidden.shallow_clone()))
    }

    fn forward(
        &self,
        priv_s: &Tensor,
        publ_s: &Tensor,
        legal_move: &Tensor,
        action: &Tensor,
        _hidden: Option<&HiddenState>,
    ) -> Result<ForwardOutput> {
        let steps = Steps::new(priv_s, publ_s, legal_move, action, self.device)?;
        let o = self.net.forward(&steps.priv_s);
        let a = self.head.advantage(&o);
        let v = self.head.value(&o);
        steps.finish(&v, &a, o)
    }
}
