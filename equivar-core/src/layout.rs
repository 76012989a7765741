//! Field layouts of observation and action vectors.
//!
//! A layout is the contract with the observation encoder: every named field
//! occupies a fixed index range of the flat vector. The tables here describe
//! the canonical two-player encoding (5 colors, 5 ranks, hand size 5).
//! Only fields whose contents move when colors are relabeled matter to the
//! operator builder, but invariant fields are listed too so that a layout
//! can be checked for full coverage.
use crate::{error::EquivarError, group::NUM_COLORS};
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Width of the partner-hand field, absent from the public view.
pub const PARTNER_HAND_WIDTH: usize = 125;

/// Width of one last-action block (also used for the greedy action).
pub const LAST_ACTION_WIDTH: usize = 55;

/// Width of the private observation.
pub const PRIVATE_WIDTH: usize = 658;

/// Width of the private observation with the greedy-action block.
pub const PRIVATE_GREEDY_WIDTH: usize = PRIVATE_WIDTH + LAST_ACTION_WIDTH;

/// Width of the public observation.
pub const PUBLIC_WIDTH: usize = PRIVATE_WIDTH - PARTNER_HAND_WIDTH;

/// Width of the public observation with the greedy-action block.
pub const PUBLIC_GREEDY_WIDTH: usize = PUBLIC_WIDTH + LAST_ACTION_WIDTH;

/// Number of actions.
pub const ACTION_WIDTH: usize = 21;

/// Offset of the hint-color block in the action vector.
pub const HINT_COLOR_OFFSET: usize = 10;

const NUM_RANKS: usize = 5;
const CARD_WIDTH: usize = NUM_COLORS * NUM_RANKS;
const HAND_SIZE: usize = 5;
const NUM_PLAYERS: usize = 2;
const KNOWLEDGE_STRIDE: usize = CARD_WIDTH + NUM_COLORS + NUM_RANKS;

/// How a field transforms when colors are relabeled.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum FieldKind {
    /// Five contiguous per-color blocks of `block` entries each.
    ColorMajor {
        /// Entries per color.
        block: usize,
    },

    /// A one-hot over the five colors.
    ColorOneHot,

    /// Unaffected by relabeling.
    Invariant,
}

impl FieldKind {
    /// Entries per color block, or `None` for invariant fields.
    pub fn color_block(&self) -> Option<usize> {
        match self {
            Self::ColorMajor { block } => Some(*block),
            Self::ColorOneHot => Some(1),
            Self::Invariant => None,
        }
    }
}

/// A named, contiguous and possibly repeated range of a layout.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct Field {
    /// Name of the field.
    pub name: String,

    /// Index of the first entry of the first repetition.
    pub offset: usize,

    /// Width of a single repetition.
    pub width: usize,

    /// Distance between the starts of two consecutive repetitions.
    pub stride: usize,

    /// Number of repetitions.
    pub repeats: usize,

    /// Behavior under relabeling.
    pub kind: FieldKind,
}

impl Field {
    fn new(name: &str, offset: usize, width: usize, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            offset,
            width,
            stride: width,
            repeats: 1,
            kind,
        }
    }

    fn repeated(mut self, stride: usize, repeats: usize) -> Self {
        self.stride = stride;
        self.repeats = repeats;
        self
    }

    fn shifted(mut self, by: usize) -> Self {
        self.offset += by;
        self
    }

    fn with_prefix(mut self, prefix: &str) -> Self {
        self.name = format!("{}_{}", prefix, self.name);
        self
    }

    /// Start index of every repetition.
    pub fn bases(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.repeats).map(move |k| self.offset + k * self.stride)
    }

    /// One past the last index covered by the field.
    pub fn end(&self) -> usize {
        match self.repeats {
            0 => self.offset,
            n => self.offset + (n - 1) * self.stride + self.width,
        }
    }
}

/// Known layout variants.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum LayoutKind {
    /// Private view.
    Private,

    /// Private view with the greedy-action block.
    PrivateGreedy,

    /// Public view, partner hand masked out.
    Public,

    /// Public view with the greedy-action block.
    PublicGreedy,

    /// Action (advantage) vector.
    Action,
}

/// Field table of a flat observation or action vector.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct Layout {
    kind: LayoutKind,
    width: usize,
    fields: Vec<Field>,
}

impl Layout {
    /// Constructs the layout of the given variant.
    pub fn new(kind: LayoutKind) -> Self {
        let (width, fields) = match kind {
            LayoutKind::Private => (PRIVATE_WIDTH, observation_fields(true, false)),
            LayoutKind::PrivateGreedy => (PRIVATE_GREEDY_WIDTH, observation_fields(true, true)),
            LayoutKind::Public => (PUBLIC_WIDTH, observation_fields(false, false)),
            LayoutKind::PublicGreedy => (PUBLIC_GREEDY_WIDTH, observation_fields(false, true)),
            LayoutKind::Action => (ACTION_WIDTH, action_fields()),
        };

        Self {
            kind,
            width,
            fields,
        }
    }

    /// Selects the private layout matching `width`.
    pub fn private(width: usize) -> Result<Self, EquivarError> {
        match width {
            PRIVATE_WIDTH => Ok(Self::new(LayoutKind::Private)),
            PRIVATE_GREEDY_WIDTH => Ok(Self::new(LayoutKind::PrivateGreedy)),
            _ => Err(EquivarError::UnsupportedLayoutWidth(width)),
        }
    }

    /// Selects the public layout matching `width`.
    pub fn public(width: usize) -> Result<Self, EquivarError> {
        match width {
            PUBLIC_WIDTH => Ok(Self::new(LayoutKind::Public)),
            PUBLIC_GREEDY_WIDTH => Ok(Self::new(LayoutKind::PublicGreedy)),
            _ => Err(EquivarError::UnsupportedLayoutWidth(width)),
        }
    }

    /// Selects the action layout matching `width`.
    pub fn action(width: usize) -> Result<Self, EquivarError> {
        match width {
            ACTION_WIDTH => Ok(Self::new(LayoutKind::Action)),
            _ => Err(EquivarError::UnsupportedLayoutWidth(width)),
        }
    }

    /// Variant of the layout.
    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    /// Length of the vector described by the layout.
    pub fn width(&self) -> usize {
        self.width
    }

    /// All fields, in index order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields that move under relabeling.
    pub fn color_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.kind != FieldKind::Invariant)
    }

    /// Number of indices claimed by some field.
    pub fn covered(&self) -> usize {
        self.fields.iter().map(|f| f.width * f.repeats).sum()
    }

    /// Checks that fields are in bounds, do not overlap and that
    /// color fields are exactly five blocks wide.
    pub fn validate(&self) -> Result<(), EquivarError> {
        let mut owner: Vec<Option<&str>> = vec![None; self.width];

        for f in self.fields.iter() {
            if f.end() > self.width {
                return Err(EquivarError::LayoutOutOfBounds {
                    field: f.name.clone(),
                    end: f.end(),
                    width: self.width,
                });
            }
            if let Some(block) = f.kind.color_block() {
                if f.width != NUM_COLORS * block {
                    return Err(EquivarError::ShapeMismatch {
                        context: format!("color blocks of field {}", f.name),
                        lhs: vec![f.width as i64],
                        rhs: vec![(NUM_COLORS * block) as i64],
                    });
                }
            }
            for base in f.bases() {
                for index in base..base + f.width {
                    if let Some(first) = owner[index] {
                        return Err(EquivarError::LayoutOverlap {
                            first: first.to_string(),
                            second: f.name.clone(),
                            index,
                        });
                    }
                    owner[index] = Some(f.name.as_str());
                }
            }
        }

        Ok(())
    }

    /// Loads a layout from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(&path)?;
        let rdr = BufReader::new(file);
        let layout: Self = serde_yaml::from_reader(rdr)?;
        layout.validate()?;
        info!("Load layout {:?} from {:?}", layout.kind, path.as_ref());
        Ok(layout)
    }

    /// Saves the layout as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(&path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save layout {:?} into {:?}", self.kind, path.as_ref());
        Ok(())
    }
}

fn last_action_fields(prefix: &str, base: usize) -> Vec<Field> {
    use FieldKind::*;
    vec![
        Field::new("player", 0, NUM_PLAYERS, Invariant),
        Field::new("move_type", 2, 4, Invariant),
        Field::new("target", 6, NUM_PLAYERS, Invariant),
        Field::new("color", 8, NUM_COLORS, ColorOneHot),
        Field::new("rank", 13, NUM_RANKS, Invariant),
        Field::new("revealed_slots", 18, HAND_SIZE, Invariant),
        Field::new("position", 23, HAND_SIZE, Invariant),
        Field::new("card", 28, CARD_WIDTH, ColorMajor { block: NUM_RANKS }),
        Field::new("play_success", 53, 1, Invariant),
        Field::new("info_added", 54, 1, Invariant),
    ]
    .into_iter()
    .map(|f| f.shifted(base).with_prefix(prefix))
    .collect()
}

fn observation_fields(with_partner_hand: bool, greedy: bool) -> Vec<Field> {
    use FieldKind::*;
    let mut fields = vec![];

    let base = if with_partner_hand {
        fields.push(
            Field::new("partner_hand", 0, CARD_WIDTH, ColorMajor { block: NUM_RANKS })
                .repeated(CARD_WIDTH, HAND_SIZE),
        );
        PARTNER_HAND_WIDTH
    } else {
        0
    };

    // Discards are thermometers over the 10 copies of each color (3, 2, 2, 2, 1).
    let board = vec![
        Field::new("missing_cards", 0, NUM_PLAYERS, Invariant),
        Field::new("deck_size", 2, 40, Invariant),
        Field::new("fireworks", 42, CARD_WIDTH, ColorMajor { block: NUM_RANKS }),
        Field::new("info_tokens", 67, 8, Invariant),
        Field::new("life_tokens", 75, 3, Invariant),
        Field::new("discards", 78, 50, ColorMajor { block: 10 }),
    ];
    fields.extend(board.into_iter().map(|f| f.shifted(base)));
    fields.extend(last_action_fields("last_action", base + 128));

    let slots = HAND_SIZE * NUM_PLAYERS;
    let knowledge = vec![
        Field::new("knowledge_cards", 183, CARD_WIDTH, ColorMajor { block: NUM_RANKS }),
        Field::new("knowledge_colors", 208, NUM_COLORS, ColorOneHot),
        Field::new("knowledge_ranks", 213, NUM_RANKS, Invariant),
    ];
    fields.extend(
        knowledge
            .into_iter()
            .map(|f| f.repeated(KNOWLEDGE_STRIDE, slots).shifted(base)),
    );

    if greedy {
        fields.extend(last_action_fields("greedy_action", base + 533));
    }

    fields
}

fn action_fields() -> Vec<Field> {
    use FieldKind::*;
    vec![
        Field::new("discard", 0, HAND_SIZE, Invariant),
        Field::new("play", 5, HAND_SIZE, Invariant),
        Field::new("hint_color", HINT_COLOR_OFFSET, NUM_COLORS, ColorOneHot),
        Field::new("hint_rank", 15, NUM_RANKS, Invariant),
        Field::new("pass", 20, 1, Invariant),
    ]
}
