//! Router server - JSON lines front end driving a routing session
//!
//! Each request line `{"id", "method", "params"}` is answered with exactly
//! one response line carrying either `result` or `error`.
//!
//! # Module Structure
//! - `protocol` - JSON-RPC request/response types
//! - `state` - Server state management
//! - `board` - Board description loading and validation
//! - `util` - Helpers shared by handlers
//! - `handlers` - Request handlers organized by functionality

pub mod board;
pub mod handlers;
pub mod protocol;
pub mod state;
pub mod util;

// Re-export key types for convenience
pub use board::BoardDescription;
pub use protocol::{error_codes, ErrorResponse, Request, Response};
pub use state::ServerState;

use tracing::debug;

/// Routes one request to its handler
pub fn dispatch(state: &mut ServerState, request: Request) -> Response {
    let Request { id, method, params } = request;
    debug!("[Server] {}", method);
    match method.as_str() {
        "LoadBoard" => handlers::handle_load_board(state, id, params),
        "SetSettings" => handlers::handle_set_settings(state, id, params),
        "Start" => handlers::handle_start(state, id, params),
        "Move" => handlers::handle_move(state, id, params),
        "Fix" => handlers::handle_fix(state, id, params),
        "Unfix" => handlers::handle_unfix(state, id),
        "Commit" => handlers::handle_commit(state, id),
        "Abort" => handlers::handle_abort(state, id),
        "SetLayer" => handlers::handle_set_layer(state, id, params),
        "ToggleVia" => handlers::handle_toggle_via(state, id, params),
        "FlipPosture" => handlers::handle_flip_posture(state, id),
        "GetTrace" => handlers::handle_get_trace(state, id),
        "GetItems" => handlers::handle_get_items(state, id),
        _ => Response::error(id, error_codes::METHOD_NOT_FOUND, format!("Method not found: {}", method)),
    }
}

/// Parses and answers one request line
pub fn handle_line(state: &mut ServerState, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => dispatch(state, request),
        Err(e) => Response::error(None, error_codes::PARSE_ERROR, format!("Parse error: {}", e)),
    }
}
