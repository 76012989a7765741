//! Projection of trained weights onto the color-symmetric subspace.
//!
//! Averaging the first layer over `W_in · P_g` and the last layer over
//! `Q_g · W_out` for every element `g` of a group makes the network's output
//! insensitive to relabeling its input, without retraining.
use crate::{operator, util::check_dim};
use anyhow::{Context, Result};
use equivar_core::{EquivarError, GroupKind, Layout, SymmetryGroup};
use log::info;
use serde::{Deserialize, Serialize};
use tch::{nn::VarStore, Device, Kind, Tensor};

/// Names of the variables rewritten by [`EquivariantProjection::project_var_store`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ProjectionTargets {
    /// Weight of the first layer, shape `[hidden, input_width]`.
    pub input_weight: String,

    /// Weight of the advantage layer, shape `[output_width, hidden]`.
    pub output_weight: String,

    /// Bias of the advantage layer, shape `[output_width]`.
    pub output_bias: String,
}

impl Default for ProjectionTargets {
    fn default() -> Self {
        Self {
            input_weight: "net.0.weight".to_string(),
            output_weight: "fc_a.weight".to_string(),
            output_bias: "fc_a.bias".to_string(),
        }
    }
}

/// Projects input and output weights of a network onto the subspace fixed by a group.
pub struct EquivariantProjection {
    group: SymmetryGroup,
    device: Device,
    input_width: i64,
    output_width: i64,

    // [P_1, …, P_G] along columns, [W, G·W].
    input_perms: Tensor,

    // [Q_1, …, Q_G] along rows, [G·O, O], where row `k` of `Q_g` reads entry `g(k)`.
    output_perms: Tensor,
}

impl EquivariantProjection {
    /// Constructs the projection for the private observation of width `private_width`.
    ///
    /// `device` is a [`tch::Device`] or the serializable [`crate::Device`].
    pub fn new(
        kind: GroupKind,
        private_width: usize,
        out_dim: usize,
        device: impl Into<Device>,
    ) -> Result<Self> {
        let device = device.into();
        let input_layout = Layout::private(private_width)?;
        let output_layout = Layout::action(out_dim)?;
        Ok(Self::from_layouts(
            SymmetryGroup::new(kind),
            &input_layout,
            &output_layout,
            device,
        ))
    }

    /// Constructs the projection for arbitrary input and output layouts.
    pub fn from_layouts(
        group: SymmetryGroup,
        input_layout: &Layout,
        output_layout: &Layout,
        device: Device,
    ) -> Self {
        let input_perms = Tensor::cat(
            &group
                .elements()
                .iter()
                .map(|g| operator::operator(input_layout, g, device))
                .collect::<Vec<_>>(),
            1,
        );
        let n = group.order() as i64;
        let o = output_layout.width() as i64;
        let output_perms =
            operator::stacked_output_operators(output_layout, group.elements(), device)
                .reshape(&[n * o, o]);
        info!(
            "Built projection onto the {} group ({} elements)",
            group.kind(),
            group.order()
        );

        Self {
            group,
            device,
            input_width: input_layout.width() as i64,
            output_width: o,
            input_perms,
            output_perms,
        }
    }

    /// The group averaged over.
    pub fn group(&self) -> &SymmetryGroup {
        &self.group
    }

    /// Returns projected copies of `(input_weight, output_weight, output_bias)`.
    ///
    /// * `input_weight` - `[hidden, input_width]`.
    /// * `output_weight` - `[output_width, hidden]`.
    /// * `output_bias` - `[output_width]`.
    pub fn project(
        &self,
        input_weight: &Tensor,
        output_weight: &Tensor,
        output_bias: &Tensor,
    ) -> Result<(Tensor, Tensor, Tensor)> {
        check_dim(input_weight, &[2], "projection input weight")?;
        check_dim(output_weight, &[2], "projection output weight")?;
        check_dim(output_bias, &[1], "projection output bias")?;
        let (hid, w) = (input_weight.size()[0], input_weight.size()[1]);
        let (o, h) = (output_weight.size()[0], output_weight.size()[1]);
        if w != self.input_width || o != self.output_width || output_bias.size()[0] != o {
            return Err(EquivarError::ShapeMismatch {
                context: "projection".to_string(),
                lhs: vec![hid, w, o, h, output_bias.size()[0]],
                rhs: vec![hid, self.input_width, self.output_width, h, self.output_width],
            }
            .into());
        }
        let n = self.group.order() as i64;

        Ok(tch::no_grad(|| {
            let w_in = input_weight
                .to(self.device)
                .matmul(&self.input_perms)
                .reshape(&[hid, n, w])
                .mean_dim(Some([1].as_slice()), false, Kind::Float);
            let w_out = self
                .output_perms
                .matmul(&output_weight.to(self.device))
                .reshape(&[n, o, h])
                .mean_dim(Some([0].as_slice()), false, Kind::Float);
            let b_out = self
                .output_perms
                .matmul(&output_bias.to(self.device))
                .reshape(&[n, o])
                .mean_dim(Some([0].as_slice()), false, Kind::Float);
            (w_in, w_out, b_out)
        }))
    }

    /// Replaces the target variables of `var_store` by their projections.
    pub fn project_var_store(&self, var_store: &mut VarStore, targets: &ProjectionTargets) -> Result<()> {
        let mut vars = var_store.variables();
        let (w_in, w_out, b_out) = {
            let get = |name: &str| {
                vars.get(name)
                    .with_context(|| format!("Variable {} not found in var store", name))
            };
            self.project(
                get(&targets.input_weight)?,
                get(&targets.output_weight)?,
                get(&targets.output_bias)?,
            )?
        };

        tch::no_grad(|| {
            for (name, src) in [
                (&targets.input_weight, &w_in),
                (&targets.output_weight, &w_out),
                (&targets.output_bias, &b_out),
            ]
            .iter()
            {
                if let Some(dest) = vars.get_mut(name.as_str()) {
                    dest.copy_(src);
                }
            }
        });
        info!(
            "Projected {}, {} and {} onto the {} group",
            targets.input_weight,
            targets.output_weight,
            targets.output_bias,
            self.group.kind()
        );

        Ok(())
    }
}
