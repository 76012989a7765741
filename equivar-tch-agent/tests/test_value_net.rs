use anyhow::Result;
use equivar_core::GroupKind;
use equivar_tch_agent::{build_value_net, LstmNet, NetKind, ValueNet, ValueNetConfig};
use tch::{nn, Device, Kind, Tensor};
use tempdir::TempDir;

fn inputs(seq: i64, batch: i64) -> (Tensor, Tensor, Tensor, Tensor) {
    let opts = (Kind::Float, Device::Cpu);
    (
        Tensor::rand(&[seq, batch, 658], opts),
        Tensor::rand(&[seq, batch, 533], opts),
        Tensor::ones(&[seq, batch, 21], opts),
        Tensor::zeros(&[seq, batch], (Kind::Int64, Device::Cpu)),
    )
}

#[test]
fn test_build_from_config_file() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = TempDir::new("value_net")?;
    let path = dir.path().join("value_net.yaml");
    ValueNetConfig::default()
        .kind(NetKind::EquivariantPublicLstm)
        .hid_dim(8)
        .num_lstm_layer(1)
        .group(GroupKind::Cyclic)
        .save(&path)?;

    let config = ValueNetConfig::load(&path)?;
    let vs = config.var_store();
    assert_eq!(vs.device(), Device::Cpu);
    let net = build_value_net(&vs, config)?;
    let (priv_s, publ_s, legal_move, action) = inputs(5, 2);
    let out = net.forward(&priv_s, &publ_s, &legal_move, &action, None)?;
    assert_eq!(out.q.size(), vec![5, 2, 21]);

    // Auxiliary loss on the body output with every slot masked out.
    let target = Tensor::full(&[5, 2, 5, 3], 1.0 / 3.0, (Kind::Float, Device::Cpu));
    let mask = Tensor::zeros(&[5, 2, 5], (Kind::Float, Device::Cpu));
    let seq_len = Tensor::from_slice(&[5.0f32, 4.0]);
    let aux = net.auxiliary_loss(&out.recurrent_output, &target, &mask, &seq_len)?;
    assert!(aux.avg_loss.is_finite());
    assert_eq!(aux.loss.size(), vec![2]);

    Ok(())
}

#[test]
fn test_clone_with_var_store() -> Result<()> {
    let config = ValueNetConfig::default().hid_dim(8);
    let vs = nn::VarStore::new(Device::Cpu);
    let net = LstmNet::build(&vs, config)?;

    let mut vs2 = nn::VarStore::new(Device::Cpu);
    let net2 = net.clone_with_var_store(&vs2)?;
    vs2.copy(&vs)?;

    let (priv_s, publ_s, legal_move, action) = inputs(3, 2);
    let out = net.forward(&priv_s, &publ_s, &legal_move, &action, None)?;
    let out2 = net2.forward(&priv_s, &publ_s, &legal_move, &action, None)?;
    assert!(out.q.allclose(&out2.q, 1e-6, 1e-6, false));
    assert!(out.greedy_action.equal(&out2.greedy_action));

    Ok(())
}

#[test]
fn test_actor_layout_step() -> Result<()> {
    let config = ValueNetConfig::default().hid_dim(8);
    let vs = nn::VarStore::new(Device::Cpu);
    let net = build_value_net(&vs, config)?;

    // Two games with two players each.
    let actor_hidden = net.initial_hidden_state(4).to_actor_layout(2)?;
    assert_eq!(actor_hidden.h0.size(), vec![2, 2, 2, 8]);

    let hidden = actor_hidden.from_actor_layout()?;
    let (priv_s, publ_s, _, _) = inputs(1, 4);
    let (a, next) = net.act(&priv_s.get(0), &publ_s.get(0), &hidden)?;
    assert_eq!(a.size(), vec![4, 21]);
    assert_eq!(next.to_actor_layout(2)?.c0.size(), vec![2, 2, 2, 8]);

    Ok(())
}
