//! Hanabi value networks with color symmetry, implemented with [tch](https://crates.io/crates/tch).
//!
//! * [`operator`] turns the index permutations of `equivar-core` into dense operators.
//! * [`projection`] projects the weights of a trained network onto the
//!   subspace fixed by a symmetry group.
//! * [`equivariant`] expands a batch over the group and folds the results back,
//!   making every forward pass equivariant.
//! * [`net`] holds the value-network variants.
pub mod config;
pub mod equivariant;
pub mod net;
pub mod operator;
pub mod projection;
mod util;

pub use config::{NetKind, ValueNetConfig};
pub use equivariant::GroupExpansion;
pub use net::{
    build_value_net, AuxLoss, EquivariantLstmNet, EquivariantPublicLstmNet, FfwdNet,
    ForwardOutput, HiddenState, LstmNet, PublicLstmNet, ValueNet,
};
pub use projection::{EquivariantProjection, ProjectionTargets};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using tch.
///
/// This enum is added because [`tch::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The main GPU device.
    Cuda(usize),
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu
    }
}

impl From<tch::Device> for Device {
    fn from(device: tch::Device) -> Self {
        match device {
            tch::Device::Cuda(n) => Self::Cuda(n),
            _ => Self::Cpu,
        }
    }
}

impl From<Device> for tch::Device {
    fn from(device: Device) -> Self {
        match device {
            Device::Cpu => tch::Device::Cpu,
            Device::Cuda(n) => tch::Device::Cuda(n),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_device_conversion() {
        let yaml = serde_yaml::to_string(&Device::Cuda(1)).unwrap();
        let device: Device = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(tch::Device::from(device), tch::Device::Cuda(1));
        assert_eq!(Device::from(tch::Device::Cpu), Device::Cpu);
    }
}
