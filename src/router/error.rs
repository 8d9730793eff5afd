//! Error types for the fallible edges of the router
//!
//! The routing core itself reports infeasible geometry and collisions with
//! booleans and status enums. These errors cover stale handles, bad input
//! files and the like.

use super::item::ItemId;
use super::node::NodeId;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    /// The node handle was released or belongs to an older generation
    #[error("Stale node handle {0:?}")]
    StaleNode(NodeId),

    #[error("Unknown item {0}")]
    UnknownItem(ItemId),

    /// The board description is structurally invalid
    #[error("Invalid board: {0}")]
    InvalidBoard(String),

    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RouterError>;
