//! Dueling head.
use crate::util::{check_dim, check_same_size};
use anyhow::Result;
use tch::{nn, nn::Module, Kind, Tensor};

/// Number of cards in a hand.
const HAND_SIZE: i64 = 5;

/// Number of classes predicted per card.
const NUM_CARD_CLASSES: i64 = 3;

/// Value, advantage and auxiliary layers on top of a network body.
#[derive(Debug)]
pub struct DuelingHead {
    fc_v: nn::Linear,
    fc_a: nn::Linear,
    pred_1st: nn::Linear,
}

impl DuelingHead {
    /// Registers `fc_v`, `fc_a` and `pred_1st` under `p`.
    pub fn build(p: &nn::Path, hid_dim: i64, out_dim: i64) -> Self {
        Self {
            fc_v: nn::linear(p / "fc_v", hid_dim, 1, Default::default()),
            fc_a: nn::linear(p / "fc_a", hid_dim, out_dim, Default::default()),
            pred_1st: nn::linear(
                p / "pred_1st",
                hid_dim,
                HAND_SIZE * NUM_CARD_CLASSES,
                Default::default(),
            ),
        }
    }

    /// State value, `[.., 1]`.
    pub fn value(&self, o: &Tensor) -> Tensor {
        self.fc_v.forward(o)
    }

    /// Advantages, `[.., num_action]`.
    pub fn advantage(&self, o: &Tensor) -> Tensor {
        self.fc_a.forward(o)
    }

    /// Auxiliary layer.
    pub fn aux(&self) -> &nn::Linear {
        &self.pred_1st
    }
}

/// Dueling decomposition `q = v + a·legal − mean(a·legal)`.
///
/// `a` and `legal_move` are `[seq, batch, num_action]`. The mean runs over
/// the whole action axis.
pub fn duel(v: &Tensor, a: &Tensor, legal_move: &Tensor) -> Result<Tensor> {
    check_same_size(a, legal_move, "duel")?;
    check_dim(legal_move, &[3], "duel")?;
    let legal_a = a * legal_move;
    let mean = legal_a.mean_dim(Some([2].as_slice()), true, Kind::Float);
    Ok(v + legal_a - mean)
}

/// Arg-max of `q` over legal actions, detached.
///
/// Legal entries are shifted to be at least 1 and illegal ones are zeroed,
/// so an illegal action never wins while one legal action remains.
pub fn greedy_action(q: &Tensor, legal_move: &Tensor) -> Result<Tensor> {
    check_same_size(q, legal_move, "greedy action")?;
    let legal_q = (q - q.min() + 1.0) * legal_move;
    Ok(legal_q.argmax(-1, false).detach())
}

/// Q-value of the taken action; `action` has the shape of `q` without its last axis.
pub fn gather_action(q: &Tensor, action: &Tensor) -> Tensor {
    q.gather(-1, &action.unsqueeze(-1), false).squeeze_dim(-1)
}

#[cfg(test)]
mod test {
    use super::*;
    use tch::Device;

    #[test]
    fn test_duel_with_all_legal() -> Result<()> {
        let v = Tensor::from_slice(&[1.0f32]).reshape(&[1, 1, 1]);
        let a = Tensor::from_slice(&[1.0f32, 2.0, 3.0]).reshape(&[1, 1, 3]);
        let legal = Tensor::ones(&[1, 1, 3], (Kind::Float, Device::Cpu));
        let q = duel(&v, &a, &legal)?;
        let expected = Tensor::from_slice(&[0.0f32, 1.0, 2.0]).reshape(&[1, 1, 3]);
        assert!(q.allclose(&expected, 1e-6, 1e-6, false));
        Ok(())
    }

    #[test]
    fn test_duel_rejects_mismatch() {
        let v = Tensor::zeros(&[2, 1], (Kind::Float, Device::Cpu));
        let a = Tensor::zeros(&[2, 3], (Kind::Float, Device::Cpu));
        let legal = Tensor::ones(&[2, 3], (Kind::Float, Device::Cpu));
        assert!(duel(&v, &a, &legal).is_err());

        let a = Tensor::zeros(&[1, 2, 3], (Kind::Float, Device::Cpu));
        let legal = Tensor::ones(&[1, 2, 4], (Kind::Float, Device::Cpu));
        assert!(duel(&v, &a, &legal).is_err());
    }

    #[test]
    fn test_single_legal_action_is_selected() -> Result<()> {
        let q = Tensor::from_slice(&[100.0f32, -50.0, 7.0, -1000.0]).reshape(&[1, 1, 4]);
        let legal = Tensor::from_slice(&[0.0f32, 0.0, 0.0, 1.0]).reshape(&[1, 1, 4]);
        let greedy = greedy_action(&q, &legal)?;
        assert_eq!(greedy.int64_value(&[0, 0]), 3);
        Ok(())
    }

    #[test]
    fn test_greedy_action_prefers_best_legal() -> Result<()> {
        let q = Tensor::from_slice(&[5.0f32, 3.0, -2.0, 4.0, 9.0, 1.0]).reshape(&[1, 2, 3]);
        let legal = Tensor::from_slice(&[0.0f32, 1.0, 1.0, 1.0, 0.0, 1.0]).reshape(&[1, 2, 3]);
        let greedy = greedy_action(&q, &legal)?;
        assert_eq!(greedy.int64_value(&[0, 0]), 1);
        assert_eq!(greedy.int64_value(&[0, 1]), 0);
        Ok(())
    }

    #[test]
    fn test_gather_action() {
        let q = Tensor::from_slice(&[0.5f32, 1.5, 2.5, 3.5]).reshape(&[2, 2]);
        let action = Tensor::from_slice(&[1i64, 0]);
        let qa = gather_action(&q, &action);
        assert!(qa.allclose(&Tensor::from_slice(&[1.5f32, 2.5]), 1e-6, 1e-6, false));
    }
}
