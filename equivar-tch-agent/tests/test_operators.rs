use equivar_core::{ColorPerm, GroupKind, Layout, LayoutKind, SymmetryGroup};
use equivar_tch_agent::operator::{operator, stacked_input_operators};
use std::{collections::HashSet, convert::TryFrom};
use tch::{Device, Kind, Tensor};

const LAYOUTS: [LayoutKind; 5] = [
    LayoutKind::Private,
    LayoutKind::PrivateGreedy,
    LayoutKind::Public,
    LayoutKind::PublicGreedy,
    LayoutKind::Action,
];

fn eye(n: i64) -> Tensor {
    Tensor::eye(n, (Kind::Float, Device::Cpu))
}

#[test]
fn test_homomorphism_for_small_groups() {
    for kind in [GroupKind::Cyclic, GroupKind::Dihedral].iter() {
        let group = SymmetryGroup::new(*kind);
        for layout in LAYOUTS.iter().map(|k| Layout::new(*k)) {
            let ops = group
                .elements()
                .iter()
                .map(|g| operator(&layout, g, Device::Cpu))
                .collect::<Vec<_>>();
            for (i, p) in group.elements().iter().enumerate() {
                for (j, q) in group.elements().iter().enumerate() {
                    let lhs = operator(&layout, &p.compose(q), Device::Cpu);
                    let rhs = ops[i].matmul(&ops[j]);
                    assert!(lhs.allclose(&rhs, 1e-5, 1e-5, false));
                }
            }
        }
    }
}

#[test]
fn test_homomorphism_for_symmetric_group() {
    let group = SymmetryGroup::new(GroupKind::Symmetric);

    let layout = Layout::new(LayoutKind::Action);
    for p in group.elements() {
        for q in group.elements() {
            let lhs = operator(&layout, &p.compose(q), Device::Cpu);
            let rhs = operator(&layout, p, Device::Cpu).matmul(&operator(&layout, q, Device::Cpu));
            assert!(lhs.allclose(&rhs, 1e-5, 1e-5, false));
        }
    }

    // The wide layouts on a sample of pairs.
    let layout = Layout::new(LayoutKind::PrivateGreedy);
    let x = Tensor::rand(&[layout.width() as i64], (Kind::Float, Device::Cpu));
    for p in group.elements().iter().step_by(13) {
        let op_p = operator(&layout, p, Device::Cpu);
        for q in group.elements().iter().step_by(17) {
            let lhs = operator(&layout, &p.compose(q), Device::Cpu).mv(&x);
            let rhs = op_p.mv(&operator(&layout, q, Device::Cpu).mv(&x));
            assert!(lhs.allclose(&rhs, 1e-5, 1e-5, false));
        }
    }
}

#[test]
fn test_operators_are_orthogonal() {
    let group = SymmetryGroup::new(GroupKind::Symmetric);
    for layout in LAYOUTS.iter().map(|k| Layout::new(*k)) {
        let w = layout.width() as i64;
        assert!(operator(&layout, &ColorPerm::identity(), Device::Cpu).equal(&eye(w)));
        for p in group.elements().iter().step_by(29) {
            let op = operator(&layout, p, Device::Cpu);
            assert!(op.tr().matmul(&op).equal(&eye(w)));
        }
    }
}

#[test]
fn test_symmetric_group_gives_distinct_operators() {
    let group = SymmetryGroup::new(GroupKind::Symmetric);
    assert_eq!(group.order(), 120);
    assert!(group.is_closed());

    let layout = Layout::new(LayoutKind::Private);
    let index = Tensor::arange(layout.width() as i64, (Kind::Float, Device::Cpu));
    let images = group
        .elements()
        .iter()
        .map(|g| {
            let y = operator(&layout, g, Device::Cpu).mv(&index).to_kind(Kind::Int64);
            Vec::<i64>::try_from(&y).unwrap()
        })
        .collect::<HashSet<_>>();
    assert_eq!(images.len(), 120);
}

#[test]
fn test_greedy_fields_are_only_in_wide_layouts() {
    let group = SymmetryGroup::new(GroupKind::Cyclic);
    let narrow = Layout::new(LayoutKind::Private);
    let wide = Layout::new(LayoutKind::PrivateGreedy);
    let n = narrow.width() as i64;

    for g in group.elements() {
        // The narrow operator is the top-left block of the wide one.
        let op = operator(&wide, g, Device::Cpu);
        let block = op.narrow(0, 0, n).narrow(1, 0, n);
        assert!(block.equal(&operator(&narrow, g, Device::Cpu)));
    }

    let m = stacked_input_operators(&narrow, group.elements(), Device::Cpu);
    assert_eq!(m.size(), vec![n, 5 * n]);
}
