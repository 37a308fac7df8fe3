//! Shared types for orchard
//!
//! This crate provides the item data model used by the store, the request
//! handler, and the HTTP server.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Item identifier, assigned by the store and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        ItemId(id)
    }
}

impl From<ItemId> for u64 {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a string is not a valid item id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidItemId(pub String);

impl fmt::Display for InvalidItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid item id: {:?}", self.0)
    }
}

impl std::error::Error for InvalidItemId {}

/// Ids are positive integers; zero is never assigned.
impl FromStr for ItemId {
    type Err = InvalidItemId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(InvalidItemId(s.to_string())),
            Ok(id) => Ok(ItemId(id)),
        }
    }
}

/// Identifier of an authenticated principal
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-supplied descriptive fields of an item.
///
/// Only `name` is interpreted (it must not be blank); any other JSON fields
/// are carried through untouched in `attributes`, except the keys the item
/// itself owns (see [`ItemPayload::RESERVED_KEYS`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPayload {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ItemPayload {
    /// Keys that belong to [`Item`] and may not appear in `attributes`.
    pub const RESERVED_KEYS: [&'static str; 2] = ["id", "ownerId"];

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// A payload is well-formed when it carries a non-blank name and does not
    /// try to set the item's id or owner.
    pub fn is_well_formed(&self) -> bool {
        !self.name.trim().is_empty()
            && !Self::RESERVED_KEYS
                .iter()
                .any(|key| self.attributes.contains_key(*key))
    }
}

/// A stored item. `id` and `owner_id` are fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub owner_id: SubjectId,
    #[serde(flatten)]
    pub payload: ItemPayload,
}
