//! Public-view LSTM value network averaged over a color symmetry group.
use super::{
    lstm::zero_state, public_lstm::PublicLstmBody, DuelingHead, ForwardOutput, HiddenState,
    Steps, ValueNet,
};
use crate::{config::ValueNetConfig, equivariant::GroupExpansion, util::check_dim};
use anyhow::Result;
use equivar_core::Layout;
use tch::{nn, nn::LSTMState, Device, Tensor};

/// [`PublicLstmNet`](super::PublicLstmNet) run on every relabeled copy of its input.
///
/// The private and public views are relabeled with the operators of their
/// own layouts.
pub struct EquivariantPublicLstmNet {
    config: ValueNetConfig,
    device: Device,
    body: PublicLstmBody,
    head: DuelingHead,
    expansion: GroupExpansion,
}

impl EquivariantPublicLstmNet {
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

impl ValueNet for EquivariantPublicLstmNet {
    fn build(var_store: &nn::VarStore, config: ValueNetConfig) -> Result<Self> {
        let device = var_store.device();
        let priv_layout = Layout::private(config.priv_in_dim as usize)?;
        let publ_layout = Layout::public(config.publ_in_dim as usize)?;
        let action_layout = Layout::action(config.out_dim as usize)?;
        let expansion = GroupExpansion::new(
            config.group,
            &priv_layout,
            Some(&publ_layout),
            &action_layout,
            device,
        );

        let p = &var_store.root();
        let body = PublicLstmBody::build(p, &config);
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

    fn act(&self, priv_s: &Tensor, publ_s: &Tensor, hidden: &HiddenState) -> Result<(Tensor, HiddenState)> {
        check_dim(priv_s, &[2], "priv_s")?;
        check_dim(publ_s, &[2], "publ_s")?;
        let batch_size = priv_s.size()[0];
        hidden.check(
            &[self.config.num_lstm_layer, batch_size, self.config.hid_dim],
            "hidden state",
        )?;

        let priv_x = self.expansion.expand_private(&priv_s.to(self.device))?.unsqueeze(0);
        let publ_x = self.expansion.expand_public(&publ_s.to(self.device))?.unsqueeze(0);
        let state = self.expanded_state(Some(hidden), batch_size)?;
        let (o, LSTMState((h, c))) = self.body.forward(&priv_x, &publ_x, &state);
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
        let priv_x = self.expansion.expand_private(&steps.priv_s)?;
        let publ_x = self.expansion.expand_public(&steps.publ_s)?;
        let state = self.expanded_state(hidden, batch_size)?;

        let (o, _) = self.body.forward(&priv_x, &publ_x, &state);
        let a = self.expansion.fold_output(&self.head.advantage(&o))?;
        let v = self.expansion.fold_mean(&self.head.value(&o))?;
        let o = self.expansion.fold_mean(&o)?;
        steps.finish(&v, &a, o)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{config::NetKind, net::test::inputs, operator};
    use equivar_core::{GroupKind, LayoutKind};
    use tch::Kind;

    #[test]
    fn test_forward_and_act_are_equivariant() -> Result<()> {
        tch::manual_seed(7);
        let vs = nn::VarStore::new(Device::Cpu);
        let config = crate::net::test::config(NetKind::EquivariantPublicLstm)
            .num_lstm_layer(1)
            .group(GroupKind::Dihedral);
        let net = EquivariantPublicLstmNet::build(&vs, config)?;

        let priv_layout = Layout::new(LayoutKind::Private);
        let publ_layout = Layout::new(LayoutKind::Public);
        let action_layout = Layout::new(LayoutKind::Action);
        let (priv_s, publ_s, legal_move, action) = inputs(3, 2);
        let hidden = HiddenState {
            h0: Tensor::rand(&[1, 2, 16], (Kind::Float, Device::Cpu)),
            c0: Tensor::rand(&[1, 2, 16], (Kind::Float, Device::Cpu)),
        };
        let out = net.forward(&priv_s, &publ_s, &legal_move, &action, Some(&hidden))?;
        let (a, _) = net.act(&priv_s.get(0), &publ_s.get(0), &hidden)?;

        for g in net.expansion().group().elements() {
            let p = operator::operator(&priv_layout, g, Device::Cpu).tr();
            let r = operator::operator(&publ_layout, g, Device::Cpu).tr();
            let q = operator::operator(&action_layout, g, Device::Cpu).tr();

            let out_g = net.forward(
                &priv_s.matmul(&p),
                &publ_s.matmul(&r),
                &legal_move,
                &action,
                Some(&hidden),
            )?;
            assert!(out_g.q.allclose(&out.q.matmul(&q), 1e-4, 1e-4, false));

            let (a_g, _) = net.act(&priv_s.get(0).matmul(&p), &publ_s.get(0).matmul(&r), &hidden)?;
            assert!(a_g.allclose(&a.matmul(&q), 1e-4, 1e-4, false));
        }
        Ok(())
    }

    #[test]
    fn test_missing_public_width_fails_at_build() {
        let vs = nn::VarStore::new(Device::Cpu);
        let config =
            crate::net::test::config(NetKind::EquivariantPublicLstm).in_dims(783, 658, 540);
        assert!(EquivariantPublicLstmNet::build(&vs, config).is_err());
    }
}
