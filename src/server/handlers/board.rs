//! Board operations: LoadBoard, SetSettings

use crate::router::settings::{RoutingSettings, SizesSettings};
use crate::server::board::BoardDescription;
use crate::server::protocol::{error_codes, Response};
use crate::server::state::ServerState;
use crate::server::util::{no_board, router_error};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Handle LoadBoard request - builds a routing session from a board
/// description given inline or as a file path
pub fn handle_load_board(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize)]
    struct LoadParams {
        path: Option<String>,
        board: Option<serde_json::Value>,
    }

    let params: LoadParams = match params.and_then(|p| serde_json::from_value(p).ok()) {
        Some(p) => p,
        None => {
            return Response::error(id, error_codes::INVALID_PARAMS,
                "Invalid params: expected {path: string} or {board: object}".to_string());
        }
    };

    let start = Instant::now();
    let board = match (&params.path, params.board) {
        (_, Some(inline)) => match BoardDescription::from_json(inline) {
            Ok(b) => b,
            Err(e) => return router_error(id, &e),
        },
        (Some(path), None) => match BoardDescription::load(Path::new(path)) {
            Ok(b) => b,
            Err(e) => {
                warn!("[Server] {:#}", e);
                return Response::error(id, error_codes::INVALID_BOARD, format!("{:#}", e));
            }
        },
        (None, None) => {
            return Response::error(id, error_codes::INVALID_PARAMS,
                "Invalid params: expected {path: string} or {board: object}".to_string());
        }
    };

    let session = match board.into_session() {
        Ok(s) => s,
        Err(e) => return router_error(id, &e),
    };
    let item_count = session.items().len();
    state.install_session(session, params.path);

    info!("[Server] LoadBoard: {} items in {:.2?}", item_count, start.elapsed());
    Response::success(id, json!({ "items": item_count }))
}

/// Handle SetSettings request - replaces routing settings and/or sizes
pub fn handle_set_settings(
    state: &mut ServerState,
    id: Option<serde_json::Value>,
    params: Option<serde_json::Value>,
) -> Response {
    #[derive(Deserialize)]
    struct SettingsParams {
        settings: Option<RoutingSettings>,
        sizes: Option<SizesSettings>,
    }

    let Some(session) = state.session.as_mut() else { return no_board(id) };

    let params: SettingsParams = match params.map(serde_json::from_value) {
        Some(Ok(p)) => p,
        Some(Err(e)) => {
            return Response::error(id, error_codes::INVALID_PARAMS, format!("Invalid settings: {}", e));
        }
        None => {
            return Response::error(id, error_codes::INVALID_PARAMS,
                "Invalid params: expected {settings?: object, sizes?: object}".to_string());
        }
    };

    if let Some(settings) = params.settings {
        if let Err(e) = session.set_settings(settings) {
            return router_error(id, &e);
        }
    }
    if let Some(sizes) = params.sizes {
        if let Err(e) = session.update_sizes(sizes) {
            return router_error(id, &e);
        }
    }

    Response::success(id, json!({
        "mode": session.settings().mode,
        "clearance": session.settings().clearance,
        "track_width": session.sizes().track_width,
    }))
}
