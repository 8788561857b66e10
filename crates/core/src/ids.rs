#![forbid(unsafe_code)]

use std::fmt;

const MAX_NODE_ID_LEN: usize = 128;

/// Content hash of a node, kept in canonical lower-case hex.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, NodeIdError> {
        let mut value = value.into();
        validate_node_id(&value)?;
        value.make_ascii_lowercase();
        Ok(Self(value))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeIdError {
    Empty,
    TooLong,
    InvalidChar { ch: char, index: usize },
}

impl NodeIdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "node id must not be empty",
            Self::TooLong => "node id is too long",
            Self::InvalidChar { .. } => "node id must be hex",
        }
    }
}

fn validate_node_id(value: &str) -> Result<(), NodeIdError> {
    if value.is_empty() {
        return Err(NodeIdError::Empty);
    }
    if value.len() > MAX_NODE_ID_LEN {
        return Err(NodeIdError::TooLong);
    }
    for (index, ch) in value.chars().enumerate() {
        if !ch.is_ascii_hexdigit() {
            return Err(NodeIdError::InvalidChar { ch, index });
        }
    }
    Ok(())
}

/// Returns true when `value` could be the start of a node id.
pub fn is_hex_prefix(value: &str) -> bool {
    !value.is_empty() && value.len() <= MAX_NODE_ID_LEN && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// Identifier of one independent graph inside a shared store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DagNum(u64);

impl DagNum {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Fixed-width hex used to namespace per-graph tables.
    pub fn hex(self) -> String {
        format!("{:016x}", self.0)
    }

    pub fn from_hex(value: &str) -> Option<Self> {
        if value.is_empty() || value.len() > 16 || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        u64::from_str_radix(value, 16).ok().map(Self)
    }
}

impl fmt::Display for DagNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
