use anyhow::Result;
use equivar_core::{ColorPerm, GroupKind, Layout, LayoutKind};
use equivar_tch_agent::{
    operator::operator, EquivariantProjection, FfwdNet, NetKind, ProjectionTargets, ValueNet,
    ValueNetConfig,
};
use tch::{nn, Device, Kind, Tensor};

fn config() -> ValueNetConfig {
    ValueNetConfig::default()
        .kind(NetKind::Ffwd)
        .in_dim(783)
        .hid_dim(32)
}

fn q_values(net: &FfwdNet, priv_s: &Tensor) -> Result<Tensor> {
    let batch = priv_s.size()[0];
    let publ_s = Tensor::zeros(&[batch, 533], (Kind::Float, Device::Cpu));
    let legal_move = Tensor::ones(&[batch, 21], (Kind::Float, Device::Cpu));
    let action = Tensor::zeros(&[batch], (Kind::Int64, Device::Cpu));
    Ok(net.forward(priv_s, &publ_s, &legal_move, &action, None)?.q)
}

#[test]
fn test_projected_network_respects_color_swap() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    tch::manual_seed(0);

    let mut vs = nn::VarStore::new(Device::Cpu);
    let net = FfwdNet::build(&vs, config())?;

    let priv_layout = Layout::new(LayoutKind::Private);
    let action_layout = Layout::new(LayoutKind::Action);
    let swap02 = ColorPerm::new([2, 1, 0, 3, 4])?;
    let p = operator(&priv_layout, &swap02, Device::Cpu);
    let r = operator(&action_layout, &swap02, Device::Cpu);

    let priv_s = Tensor::rand(&[4, 658], (Kind::Float, Device::Cpu));
    let swapped = priv_s.matmul(&p.tr());

    // Trained weights are not symmetric.
    let q = q_values(&net, &priv_s)?;
    let q_swapped = q_values(&net, &swapped)?;
    assert!(!q_swapped.allclose(&q.matmul(&r.tr()), 1e-4, 1e-4, false));

    let proj = EquivariantProjection::new(GroupKind::Symmetric, 658, 21, Device::Cpu)?;
    proj.project_var_store(&mut vs, &ProjectionTargets::default())?;

    let q = q_values(&net, &priv_s)?;
    let q_swapped = q_values(&net, &swapped)?;
    assert!(q_swapped.allclose(&q.matmul(&r.tr()), 1e-4, 1e-4, false));

    Ok(())
}

#[test]
fn test_projection_leaves_other_variables() -> Result<()> {
    tch::manual_seed(1);
    let mut vs = nn::VarStore::new(Device::Cpu);
    let _net = FfwdNet::build(&vs, config())?;
    let before = vs.variables()["net.2.weight"].copy();

    let proj = EquivariantProjection::new(GroupKind::Cyclic, 658, 21, Device::Cpu)?;
    proj.project_var_store(&mut vs, &ProjectionTargets::default())?;
    assert!(vs.variables()["net.2.weight"].equal(&before));

    let targets = ProjectionTargets {
        input_weight: "missing.weight".to_string(),
        ..Default::default()
    };
    assert!(proj.project_var_store(&mut vs, &targets).is_err());

    Ok(())
}
