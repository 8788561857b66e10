#![forbid(unsafe_code)]

use crate::ids::NodeId;
use std::collections::BTreeSet;

/// How the first node of a pair relates to the second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Relationship {
    Same,
    Ancestor,
    Descendant,
    Peer,
    Unknown,
}

impl Relationship {
    pub fn inverse(self) -> Self {
        match self {
            Self::Ancestor => Self::Descendant,
            Self::Descendant => Self::Ancestor,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Same => "same",
            Self::Ancestor => "ancestor",
            Self::Descendant => "descendant",
            Self::Peer => "peer",
            Self::Unknown => "unknown",
        }
    }
}

/// Directions a relationship query may skip. A skipped direction reports
/// `Peer` for pairs that could only be related that way.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelationshipChecks {
    pub skip_ancestor: bool,
    pub skip_descendant: bool,
}

impl RelationshipChecks {
    pub const BOTH: Self = Self {
        skip_ancestor: false,
        skip_descendant: false,
    };

    pub const ANCESTOR_ONLY: Self = Self {
        skip_ancestor: false,
        skip_descendant: true,
    };

    pub const DESCENDANT_ONLY: Self = Self {
        skip_ancestor: true,
        skip_descendant: false,
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeadsStatus {
    IsLeaf,
    Unique,
    Multiple,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DescendantHeads {
    pub status: HeadsStatus,
    pub heads: BTreeSet<NodeId>,
}

/// Marks carried by frontier items; merging is a bitwise OR.
pub trait Marks: Clone + PartialEq {
    fn merge(&mut self, other: &Self);
}

/// Two-bit tag used by the two-endpoint delta walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeltaSide(u8);

impl DeltaSide {
    pub const NEW: Self = Self(0b01);
    pub const OLD: Self = Self(0b10);
    pub const BOTH: Self = Self(0b11);

    pub fn is_new_only(self) -> bool {
        self == Self::NEW
    }
}

impl Marks for DeltaSide {
    fn merge(&mut self, other: &Self) {
        self.0 |= other.0;
    }
}

/// One bit per input node of a common-ancestor search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AncestorMask {
    words: Vec<u64>,
    width: usize,
}

impl AncestorMask {
    pub fn empty(width: usize) -> Self {
        Self {
            words: vec![0; width.div_ceil(64)],
            width,
        }
    }

    pub fn single(width: usize, bit: usize) -> Self {
        let mut mask = Self::empty(width);
        mask.set(bit);
        mask
    }

    pub fn set(&mut self, bit: usize) {
        debug_assert!(bit < self.width);
        self.words[bit / 64] |= 1u64 << (bit % 64);
    }

    pub fn is_set(&self, bit: usize) -> bool {
        bit < self.width && self.words[bit / 64] & (1u64 << (bit % 64)) != 0
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn is_full(&self) -> bool {
        self.count() == self.width
    }
}

impl Marks for AncestorMask {
    fn merge(&mut self, other: &Self) {
        for (word, incoming) in self.words.iter_mut().zip(other.words.iter()) {
            *word |= *incoming;
        }
    }
}
