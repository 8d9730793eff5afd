//! Helpers shared by the request handlers

use crate::router::context::RecordingIface;
use crate::router::error::RouterError;
use crate::router::line::Line;
use crate::server::protocol::{error_codes, Response};
use serde::Serialize;
use serde_json::{json, Value};

/// JSON view of a trace
#[derive(Debug, Serialize)]
pub struct TraceJson {
    pub points: Vec<[i64; 2]>,
    pub width: i64,
    pub net: i32,
    pub layer: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via: Option<[i64; 2]>,
}

impl From<&Line> for TraceJson {
    fn from(line: &Line) -> Self {
        TraceJson {
            points: line.chain.points().iter().map(|p| [p.x, p.y]).collect(),
            width: line.width,
            net: line.net,
            layer: line.layer,
            via: line.via.as_ref().map(|v| [v.pos.x, v.pos.y]),
        }
    }
}

/// Maps a router error onto a response with the matching error code
pub fn router_error(id: Option<Value>, err: &RouterError) -> Response {
    let code = match err {
        RouterError::UnknownItem(_) => error_codes::UNKNOWN_ITEM,
        RouterError::InvalidBoard(_) => error_codes::INVALID_BOARD,
        RouterError::InvalidSetting { .. } | RouterError::Json(_) => error_codes::INVALID_PARAMS,
        RouterError::StaleNode(_) | RouterError::Io(_) => error_codes::INTERNAL_ERROR,
    };
    Response::error(id, code, err.to_string())
}

pub fn no_board(id: Option<Value>) -> Response {
    Response::error(id, error_codes::NO_BOARD_LOADED, "No board loaded. Call LoadBoard first.".to_string())
}

pub fn not_routing(id: Option<Value>) -> Response {
    Response::error(id, error_codes::PLACEMENT_NOT_ACTIVE, "No placement in progress. Call Start first.".to_string())
}

/// Drains the added/removed item log into a JSON object
pub fn take_changes(changes: &RecordingIface) -> Value {
    let added: Vec<u64> = changes.added.borrow().iter().map(|id| id.0).collect();
    let removed: Vec<u64> = changes.removed.borrow().iter().map(|id| id.0).collect();
    changes.clear();
    json!({ "added": added, "removed": removed })
}
