//! Configuration of value networks.
use crate::Device;
use anyhow::Result;
use equivar_core::{layout::PARTNER_HAND_WIDTH, GroupKind};
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};
use tch::nn;

/// Value-network variants.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum NetKind {
    /// Feed-forward network on the private view.
    Ffwd,

    /// LSTM on the private view.
    Lstm,

    /// LSTM on the public view gated by an MLP on the private view.
    PublicLstm,

    /// [`NetKind::Lstm`] averaged over a color symmetry group.
    EquivariantLstm,

    /// [`NetKind::PublicLstm`] averaged over a color symmetry group.
    EquivariantPublicLstm,
}

impl NetKind {
    /// Returns `true` for the variants that expand batches over a group.
    pub fn is_equivariant(&self) -> bool {
        matches!(self, Self::EquivariantLstm | Self::EquivariantPublicLstm)
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of the value networks in [`net`](crate::net).
pub struct ValueNetConfig {
    pub(crate) kind: NetKind,
    pub(crate) in_dim: i64,
    pub(crate) priv_in_dim: i64,
    pub(crate) publ_in_dim: i64,
    pub(crate) hid_dim: i64,
    pub(crate) out_dim: i64,
    pub(crate) num_lstm_layer: i64,
    #[serde(default = "default_num_ff_layer")]
    pub(crate) num_ff_layer: i64,
    #[serde(default)]
    pub(crate) group: GroupKind,
    #[serde(default)]
    pub(crate) device: Option<Device>,
}

fn default_num_ff_layer() -> i64 {
    1
}

impl Default for ValueNetConfig {
    fn default() -> Self {
        Self {
            kind: NetKind::Lstm,
            in_dim: 783,
            priv_in_dim: 783 - PARTNER_HAND_WIDTH as i64,
            publ_in_dim: 783 - 2 * PARTNER_HAND_WIDTH as i64,
            hid_dim: 512,
            out_dim: 21,
            num_lstm_layer: 2,
            num_ff_layer: default_num_ff_layer(),
            group: GroupKind::Cyclic,
            device: None,
        }
    }
}

impl ValueNetConfig {
    /// Sets the network variant.
    pub fn kind(mut self, v: NetKind) -> Self {
        self.kind = v;
        self
    }

    /// Sets the width of the full observation.
    ///
    /// The private view drops the own-hand block and the public view
    /// additionally drops the partner hand.
    pub fn in_dim(mut self, v: i64) -> Self {
        self.in_dim = v;
        self.priv_in_dim = v - PARTNER_HAND_WIDTH as i64;
        self.publ_in_dim = v - 2 * PARTNER_HAND_WIDTH as i64;
        self
    }

    /// Sets the widths of the full, private and public observations.
    pub fn in_dims(mut self, full: i64, private: i64, public: i64) -> Self {
        self.in_dim = full;
        self.priv_in_dim = private;
        self.publ_in_dim = public;
        self
    }

    /// Sets the hidden size.
    pub fn hid_dim(mut self, v: i64) -> Self {
        self.hid_dim = v;
        self
    }

    /// Sets the number of actions.
    pub fn out_dim(mut self, v: i64) -> Self {
        self.out_dim = v;
        self
    }

    /// Sets the number of LSTM layers.
    pub fn num_lstm_layer(mut self, v: i64) -> Self {
        self.num_lstm_layer = v;
        self
    }

    /// Sets the number of feed-forward layers in front of the LSTM.
    pub fn num_ff_layer(mut self, v: i64) -> Self {
        self.num_ff_layer = v;
        self
    }

    /// Sets the symmetry group of the equivariant variants.
    pub fn group(mut self, v: GroupKind) -> Self {
        self.group = v;
        self
    }

    /// Sets the device the variables of the network are placed on.
    pub fn device(mut self, device: tch::Device) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Network variant.
    pub fn get_kind(&self) -> NetKind {
        self.kind
    }

    /// Width of the private observation.
    pub fn get_priv_in_dim(&self) -> i64 {
        self.priv_in_dim
    }

    /// Width of the public observation.
    pub fn get_publ_in_dim(&self) -> i64 {
        self.publ_in_dim
    }

    /// Hidden size.
    pub fn get_hid_dim(&self) -> i64 {
        self.hid_dim
    }

    /// Number of actions.
    pub fn get_out_dim(&self) -> i64 {
        self.out_dim
    }

    /// Number of LSTM layers.
    pub fn get_num_lstm_layer(&self) -> i64 {
        self.num_lstm_layer
    }

    /// Symmetry group.
    pub fn get_group(&self) -> GroupKind {
        self.group
    }

    /// Device of the network, CPU when not given.
    pub fn get_device(&self) -> tch::Device {
        self.device.unwrap_or_default().into()
    }

    /// Creates an empty var store on [`ValueNetConfig::get_device`] for
    /// building the network.
    pub fn var_store(&self) -> nn::VarStore {
        nn::VarStore::new(self.get_device())
    }

    /// Constructs [`ValueNetConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of value network from {:?}", path_);
        Ok(b)
    }

    /// Saves [`ValueNetConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of value network into {:?}", path_);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_value_net_config() -> Result<()> {
        let config = ValueNetConfig::default()
            .kind(NetKind::EquivariantPublicLstm)
            .in_dim(838)
            .hid_dim(256)
            .group(GroupKind::Dihedral)
            .device(tch::Device::Cuda(1));
        assert_eq!(config.priv_in_dim, 713);
        assert_eq!(config.publ_in_dim, 588);

        let dir = TempDir::new("value_net_config")?;
        let path = dir.path().join("value_net_config.yaml");

        config.save(&path)?;
        let config_ = ValueNetConfig::load(&path)?;
        assert_eq!(config, config_);
        assert_eq!(config_.get_device(), tch::Device::Cuda(1));

        Ok(())
    }

    #[test]
    fn test_device_defaults_to_cpu() -> Result<()> {
        let config = ValueNetConfig::default();
        assert_eq!(config.get_device(), tch::Device::Cpu);
        assert_eq!(config.var_store().device(), tch::Device::Cpu);

        // Config files written without a device still load.
        let yaml = serde_yaml::to_string(&config)?
            .replace("device: ~\n", "")
            .replace("device: null\n", "");
        assert!(!yaml.contains("device"));
        let config_: ValueNetConfig = serde_yaml::from_str(&yaml)?;
        assert_eq!(config_.device, None);

        let yaml = serde_yaml::to_string(&config.device(tch::Device::Cuda(0)))?;
        assert!(yaml.contains("Cuda"));
        Ok(())
    }

    #[test]
    fn test_unknown_group_is_rejected() {
        let yaml = serde_yaml::to_string(&ValueNetConfig::default())
            .unwrap()
            .replace("cyclic", "alternating");
        assert!(serde_yaml::from_str::<ValueNetConfig>(&yaml).is_err());
    }
}
