//! Color permutations and the symmetry groups built from them.
use crate::error::EquivarError;
use itertools::Itertools;
use log::trace;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt, str::FromStr};

/// Number of card colors in the game.
pub const NUM_COLORS: usize = 5;

/// A relabeling of the five card colors.
///
/// `labels[i]` is the new label of color `i`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct ColorPerm([usize; NUM_COLORS]);

impl ColorPerm {
    /// The permutation that leaves every color in place.
    pub fn identity() -> Self {
        Self([0, 1, 2, 3, 4])
    }

    /// Constructs a permutation, checking that `labels` is a bijection on `0..5`.
    pub fn new(labels: [usize; NUM_COLORS]) -> Result<Self, EquivarError> {
        let mut seen = [false; NUM_COLORS];
        for &l in labels.iter() {
            if l >= NUM_COLORS || seen[l] {
                return Err(EquivarError::InvalidPermutation(labels.to_vec()));
            }
            seen[l] = true;
        }
        Ok(Self(labels))
    }

    /// Constructs a permutation from a slice of length 5.
    pub fn from_slice(labels: &[usize]) -> Result<Self, EquivarError> {
        if labels.len() != NUM_COLORS {
            return Err(EquivarError::InvalidPermutation(labels.to_vec()));
        }
        let mut arr = [0; NUM_COLORS];
        arr.copy_from_slice(labels);
        Self::new(arr)
    }

    /// New label of `color`.
    ///
    /// # Panics
    ///
    /// Panics if `color >= NUM_COLORS`. See [`ColorPerm::get`] for a checked version.
    pub fn apply(&self, color: usize) -> usize {
        self.0[color]
    }

    /// New label of `color`, or `None` if `color` is not a color index.
    pub fn get(&self, color: usize) -> Option<usize> {
        self.0.get(color).copied()
    }

    /// Returns `self ∘ other`, the relabeling that applies `other` first.
    pub fn compose(&self, other: &Self) -> Self {
        let mut labels = [0; NUM_COLORS];
        for (i, l) in labels.iter_mut().enumerate() {
            *l = self.0[other.0[i]];
        }
        Self(labels)
    }

    /// Returns the inverse relabeling.
    pub fn inverse(&self) -> Self {
        let mut labels = [0; NUM_COLORS];
        for (i, &l) in self.0.iter().enumerate() {
            labels[l] = i;
        }
        Self(labels)
    }

    /// Returns `true` if this is the identity.
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Labels as an array.
    pub fn labels(&self) -> &[usize; NUM_COLORS] {
        &self.0
    }
}

impl TryFrom<Vec<usize>> for ColorPerm {
    type Error = EquivarError;

    fn try_from(v: Vec<usize>) -> Result<Self, Self::Error> {
        Self::from_slice(&v)
    }
}

impl From<ColorPerm> for Vec<usize> {
    fn from(p: ColorPerm) -> Self {
        p.0.to_vec()
    }
}

impl fmt::Display for ColorPerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Symmetry groups acting on the color labels.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// Rotations of the five colors, order 5.
    Cyclic,

    /// Rotations and reflections of the five colors, order 10.
    Dihedral,

    /// All relabelings, order 120.
    Symmetric,
}

impl GroupKind {
    /// Number of elements of the group.
    pub fn order(&self) -> usize {
        match self {
            Self::Cyclic => 5,
            Self::Dihedral => 10,
            Self::Symmetric => 120,
        }
    }
}

impl Default for GroupKind {
    fn default() -> Self {
        Self::Cyclic
    }
}

impl FromStr for GroupKind {
    type Err = EquivarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cyclic" => Ok(Self::Cyclic),
            "dihedral" => Ok(Self::Dihedral),
            "symmetric" => Ok(Self::Symmetric),
            _ => Err(EquivarError::UnsupportedGroup(s.to_string())),
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Cyclic => "cyclic",
            Self::Dihedral => "dihedral",
            Self::Symmetric => "symmetric",
        };
        f.write_str(s)
    }
}

const CYCLIC: [[usize; NUM_COLORS]; 5] = [
    [0, 1, 2, 3, 4],
    [4, 0, 1, 2, 3],
    [3, 4, 0, 1, 2],
    [2, 3, 4, 0, 1],
    [1, 2, 3, 4, 0],
];

const DIHEDRAL: [[usize; NUM_COLORS]; 10] = [
    [0, 1, 2, 3, 4],
    [1, 2, 3, 4, 0],
    [2, 3, 4, 0, 1],
    [3, 4, 0, 1, 2],
    [4, 0, 1, 2, 3],
    [0, 4, 3, 2, 1],
    [4, 3, 2, 1, 0],
    [3, 2, 1, 0, 4],
    [2, 1, 0, 4, 3],
    [1, 0, 4, 3, 2],
];

/// Ordered table of group elements, identity first, with their inverses.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetryGroup {
    kind: GroupKind,
    elements: Vec<ColorPerm>,
    inverses: Vec<ColorPerm>,
}

impl SymmetryGroup {
    /// Enumerates the elements of the group of the given kind.
    pub fn new(kind: GroupKind) -> Self {
        let elements: Vec<ColorPerm> = match kind {
            GroupKind::Cyclic => CYCLIC.iter().map(|&l| ColorPerm(l)).collect(),
            GroupKind::Dihedral => DIHEDRAL.iter().map(|&l| ColorPerm(l)).collect(),
            // Lexicographic order, so the identity comes first.
            GroupKind::Symmetric => (0..NUM_COLORS)
                .permutations(NUM_COLORS)
                .map(|p| {
                    let mut labels = [0; NUM_COLORS];
                    labels.copy_from_slice(&p);
                    ColorPerm(labels)
                })
                .collect(),
        };
        debug_assert_eq!(elements.len(), kind.order());
        debug_assert!(elements[0].is_identity());

        let inverses = elements.iter().map(ColorPerm::inverse).collect();
        trace!("Enumerated {} group of order {}", kind, elements.len());

        Self {
            kind,
            elements,
            inverses,
        }
    }

    /// Enumerates the group named by `name` (`cyclic`, `dihedral` or `symmetric`).
    pub fn from_name(name: &str) -> Result<Self, EquivarError> {
        Ok(Self::new(name.parse()?))
    }

    /// Kind of the group.
    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    /// Number of elements.
    pub fn order(&self) -> usize {
        self.elements.len()
    }

    /// All elements, identity first.
    pub fn elements(&self) -> &[ColorPerm] {
        &self.elements
    }

    /// Inverses of [`SymmetryGroup::elements`], element-wise.
    pub fn inverses(&self) -> &[ColorPerm] {
        &self.inverses
    }

    /// Elements without the leading identity.
    pub fn non_identity(&self) -> &[ColorPerm] {
        &self.elements[1..]
    }

    /// Returns `true` if `p` is an element of the group.
    pub fn contains(&self, p: &ColorPerm) -> bool {
        self.elements.contains(p)
    }

    /// Returns `true` if composing any two elements yields an element.
    pub fn is_closed(&self) -> bool {
        self.elements
            .iter()
            .cartesian_product(self.elements.iter())
            .all(|(a, b)| self.contains(&a.compose(b)))
    }
}
