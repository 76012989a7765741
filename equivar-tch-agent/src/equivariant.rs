//! Group expansion of batches.
//!
//! Each sample of a batch is replaced by one relabeled copy per group element.
//! The network body runs once over the expanded batch, then the copies are
//! mapped back to the original labels and averaged. Because the group is
//! closed under composition, relabeling the input permutes the copies among
//! themselves and the averaged output is relabeled in the same way.
//!
//! Copy `g` of sample `b` lives at row `b·G + g` of the expanded batch.
use crate::{
    operator,
    util::{check_dim, check_last_dim},
};
use anyhow::{bail, Result};
use equivar_core::{EquivarError, GroupKind, Layout, SymmetryGroup};
use log::info;
use tch::{Device, Kind, Tensor};

/// Expands batches over a color symmetry group and folds the results back.
pub struct GroupExpansion {
    group: SymmetryGroup,
    priv_width: i64,
    publ_width: Option<i64>,
    out_dim: i64,

    // [W, G·W]
    priv_perms: Tensor,

    // [W', G·W']
    publ_perms: Option<Tensor>,

    // [G, O, O], operators of the inverse elements.
    output_perms: Tensor,
}

impl GroupExpansion {
    /// Builds the operator tables on `device`.
    ///
    /// `publ_layout` is given only for networks that also read the public view.
    pub fn new(
        kind: GroupKind,
        priv_layout: &Layout,
        publ_layout: Option<&Layout>,
        action_layout: &Layout,
        device: Device,
    ) -> Self {
        let group = SymmetryGroup::new(kind);
        let priv_perms = operator::stacked_input_operators(priv_layout, group.elements(), device);
        let publ_perms =
            publ_layout.map(|l| operator::stacked_input_operators(l, group.elements(), device));
        let output_perms =
            operator::stacked_output_operators(action_layout, group.inverses(), device);
        info!(
            "Built group expansion over the {} group ({} elements)",
            group.kind(),
            group.order()
        );

        Self {
            group,
            priv_width: priv_layout.width() as i64,
            publ_width: publ_layout.map(|l| l.width() as i64),
            out_dim: action_layout.width() as i64,
            priv_perms,
            publ_perms,
            output_perms,
        }
    }

    /// The group expanded over.
    pub fn group(&self) -> &SymmetryGroup {
        &self.group
    }

    /// Number of copies per sample.
    pub fn order(&self) -> i64 {
        self.group.order() as i64
    }

    /// Expands private observations, `[.., B, W]` to `[.., B·G, W]`.
    pub fn expand_private(&self, x: &Tensor) -> Result<Tensor> {
        check_last_dim(x, self.priv_width, "private observation")?;
        self.expand(&self.priv_perms, self.priv_width, x)
    }

    /// Expands public observations, `[.., B, W']` to `[.., B·G, W']`.
    pub fn expand_public(&self, x: &Tensor) -> Result<Tensor> {
        match (&self.publ_perms, self.publ_width) {
            (Some(perms), Some(width)) => {
                check_last_dim(x, width, "public observation")?;
                self.expand(perms, width, x)
            }
            _ => bail!("Group expansion was built without a public layout"),
        }
    }

    fn expand(&self, perms: &Tensor, width: i64, x: &Tensor) -> Result<Tensor> {
        check_dim(x, &[2, 3], "group expansion")?;
        let mut shape = x.size();
        let n = shape.len();
        shape[n - 2] *= self.order();
        shape[n - 1] = width;
        Ok(x.to_device(perms.device()).matmul(perms).reshape(shape.as_slice()))
    }

    /// Tiles `[.., B, H]` to `[.., B·G, H]` without relabeling.
    pub fn tile(&self, t: &Tensor) -> Result<Tensor> {
        check_dim(t, &[2, 3], "tiling")?;
        let size = t.size();
        let n = size.len();
        let mut expanded = size.clone();
        expanded.insert(n - 1, self.order());
        let mut shape = size;
        shape[n - 2] *= self.order();
        Ok(t
            .unsqueeze(-2)
            .expand(expanded.as_slice(), false)
            .reshape(shape.as_slice()))
    }

    /// Maps every copy in `[.., B·G, O]` back to the original labels and
    /// averages the copies, giving `[.., B, O]`.
    pub fn fold_output(&self, a: &Tensor) -> Result<Tensor> {
        check_last_dim(a, self.out_dim, "advantage")?;
        let grouped = self.split_group_axis(a)?;
        Ok(grouped
            .transpose(-3, -2)
            .matmul(&self.output_perms)
            .mean_dim(Some([-3].as_slice()), false, Kind::Float))
    }

    /// Averages the copies in `[.., B·G, D]`, giving `[.., B, D]`.
    pub fn fold_mean(&self, t: &Tensor) -> Result<Tensor> {
        let grouped = self.split_group_axis(t)?;
        Ok(grouped.mean_dim(Some([-2].as_slice()), false, Kind::Float))
    }

    // [.., B·G, D] -> [.., B, G, D]
    fn split_group_axis(&self, t: &Tensor) -> Result<Tensor> {
        check_dim(t, &[2, 3], "group folding")?;
        let size = t.size();
        let n = size.len();
        let g = self.order();
        if size[n - 2] % g != 0 {
            return Err(EquivarError::ShapeMismatch {
                context: "group folding".to_string(),
                lhs: size,
                rhs: vec![g],
            }
            .into());
        }
        let mut shape = size[..n - 2].to_vec();
        shape.extend_from_slice(&[size[n - 2] / g, g, size[n - 1]]);
        Ok(t.reshape(shape.as_slice()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use equivar_core::LayoutKind;

    fn expansion(kind: GroupKind) -> GroupExpansion {
        GroupExpansion::new(
            kind,
            &Layout::new(LayoutKind::Private),
            Some(&Layout::new(LayoutKind::Public)),
            &Layout::new(LayoutKind::Action),
            Device::Cpu,
        )
    }

    #[test]
    fn test_expand_shapes() -> Result<()> {
        let e = expansion(GroupKind::Dihedral);
        let x = Tensor::rand(&[4, 3, 658], (Kind::Float, Device::Cpu));
        assert_eq!(e.expand_private(&x)?.size(), vec![4, 30, 658]);
        let x = Tensor::rand(&[3, 533], (Kind::Float, Device::Cpu));
        assert_eq!(e.expand_public(&x)?.size(), vec![30, 533]);
        Ok(())
    }

    #[test]
    fn test_expanded_copies_are_relabeled() -> Result<()> {
        let e = expansion(GroupKind::Cyclic);
        let layout = Layout::new(LayoutKind::Private);
        let x = Tensor::rand(&[2, 658], (Kind::Float, Device::Cpu));
        let xs = e.expand_private(&x)?;
        for (i, g) in e.group().elements().iter().enumerate() {
            let p = operator::operator(&layout, g, Device::Cpu);
            for b in 0..2 {
                let expected = p.mv(&x.get(b));
                assert!(xs.get(b * 5 + i as i64).allclose(&expected, 1e-6, 1e-6, false));
            }
        }
        Ok(())
    }

    #[test]
    fn test_tile_then_fold_mean_is_identity() -> Result<()> {
        let e = expansion(GroupKind::Symmetric);
        let h = Tensor::rand(&[2, 3, 8], (Kind::Float, Device::Cpu));
        let tiled = e.tile(&h)?;
        assert_eq!(tiled.size(), vec![2, 360, 8]);
        assert!(tiled.get(1).get(121).equal(&h.get(1).get(1)));
        assert!(e.fold_mean(&tiled)?.allclose(&h, 1e-6, 1e-6, false));
        Ok(())
    }

    #[test]
    fn test_fold_output_undoes_relabeling() -> Result<()> {
        let e = expansion(GroupKind::Dihedral);
        let layout = Layout::new(LayoutKind::Action);
        let a = Tensor::rand(&[21], (Kind::Float, Device::Cpu));

        // Every copy carries `a` relabeled by its own element.
        let copies = e
            .group()
            .elements()
            .iter()
            .map(|g| operator::operator(&layout, g, Device::Cpu).mv(&a))
            .collect::<Vec<_>>();
        let copies = Tensor::stack(&copies, 0);
        let folded = e.fold_output(&copies)?;
        assert_eq!(folded.size(), vec![1, 21]);
        assert!(folded.get(0).allclose(&a, 1e-6, 1e-6, false));
        Ok(())
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let e = expansion(GroupKind::Cyclic);
        let x = Tensor::rand(&[3, 700], (Kind::Float, Device::Cpu));
        assert!(e.expand_private(&x).is_err());
        let a = Tensor::rand(&[7, 21], (Kind::Float, Device::Cpu));
        assert!(e.fold_output(&a).is_err());
        let t = Tensor::rand(&[21], (Kind::Float, Device::Cpu));
        assert!(e.fold_mean(&t).is_err());
    }
}
