//! Placement operations: Start, Move, Fix, Unfix, Commit, Abort, SetLayer,
//! ToggleVia, FlipPosture

use crate::geometry::Point;
use crate::router::item::{ItemId, NO_NET};
use crate::router::session::RoutingSession;
use crate::server::protocol::{error_codes, Response};
use crate::server::state::ServerState;
use crate::server::util::{no_board, not_routing, router_error, take_changes, TraceJson};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Deserialize)]
struct CursorParams {
    x: i64,
    y: i64,
    /// Item under the cursor; picked automatically when absent
    item: Option<u64>,
    #[serde(default)]
    force: bool,
}

fn cursor_params(id: &Option<Value>, params: Option<Value>) -> Result<CursorParams, Response> {
    params.and_then(|p| serde_json::from_value(p).ok()).ok_or_else(|| {
        Response::error(id.clone(), error_codes::INVALID_PARAMS,
            "Invalid params: expected {x: int, y: int, item?: int}".to_string())
    })
}

/// Resolves the explicit item, or picks one of the routed net under `p`
fn resolve_item(
    session: &RoutingSession,
    id: &Option<Value>,
    p: Point,
    item: Option<u64>,
) -> Result<Option<ItemId>, Response> {
    match item {
        Some(raw) => {
            let item_id = ItemId(raw);
            if !session.arena().contains(session.world(), item_id) {
                return Err(Response::error(id.clone(), error_codes::UNKNOWN_ITEM, format!("Unknown item {}", item_id)));
            }
            Ok(Some(item_id))
        }
        None => {
            let net = session.placer().map(|pl| pl.current_net()).filter(|n| *n > NO_NET);
            Ok(match (session.is_routing(), net) {
                (false, _) => session.pick_item(p, session.layer(), None),
                (true, Some(n)) => session.pick_item(p, session.layer(), Some(n)),
                (true, None) => None,
            })
        }
    }
}

fn trace_json(session: &RoutingSession) -> Value {
    match session.trace() {
        Some(line) => serde_json::to_value(TraceJson::from(&line)).unwrap_or(Value::Null),
        None => Value::Null,
    }
}

/// Handle Start request - begins a route at the cursor
pub fn handle_start(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    let Some(session) = state.session.as_mut() else { return no_board(id) };
    let params = match cursor_params(&id, params) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let p = Point::new(params.x, params.y);
    let item = match resolve_item(session, &id, p, params.item) {
        Ok(i) => i,
        Err(r) => return r,
    };

    match session.start_routing(p, item) {
        Ok(started) => {
            debug!("[Server] Start at ({}, {}) on {:?}: {}", p.x, p.y, item, started);
            let net = session.placer().map_or(NO_NET, |pl| pl.current_net());
            Response::success(id, json!({
                "started": started,
                "item": item.map(|i| i.0),
                "net": net,
                "layer": session.layer(),
            }))
        }
        Err(e) => router_error(id, &e),
    }
}

/// Handle Move request - reroutes the head to the cursor
pub fn handle_move(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    let Some(session) = state.session.as_mut() else { return no_board(id) };
    if !session.is_routing() {
        return not_routing(id);
    }
    let params = match cursor_params(&id, params) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let p = Point::new(params.x, params.y);
    let item = match resolve_item(session, &id, p, params.item) {
        Ok(i) => i,
        Err(r) => return r,
    };

    let reached = session.move_to(p, item);
    Response::success(id, json!({ "reached": reached, "trace": trace_json(session) }))
}

/// Handle Fix request - fixes the trace; a route ending on its own net is committed
pub fn handle_fix(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    let Some(session) = state.session.as_mut() else { return no_board(id) };
    if !session.is_routing() {
        return not_routing(id);
    }
    let params = match cursor_params(&id, params) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let p = Point::new(params.x, params.y);
    let item = match resolve_item(session, &id, p, params.item) {
        Ok(i) => i,
        Err(r) => return r,
    };

    let finished = session.fix_route(p, item, params.force);
    let routing = session.is_routing();
    let trace = trace_json(session);
    Response::success(id, json!({
        "finished": finished,
        "routing": routing,
        "trace": trace,
        "changes": take_changes(&state.changes),
    }))
}

/// Handle Unfix request - undoes the last fix
pub fn handle_unfix(state: &mut ServerState, id: Option<Value>) -> Response {
    let Some(session) = state.session.as_mut() else { return no_board(id) };
    if !session.is_routing() {
        return not_routing(id);
    }
    let undone = session.unfix_route();
    Response::success(id, json!({ "undone": undone, "trace": trace_json(session) }))
}

/// Handle Commit request - keeps everything fixed so far and ends the gesture
pub fn handle_commit(state: &mut ServerState, id: Option<Value>) -> Response {
    let Some(session) = state.session.as_mut() else { return no_board(id) };
    if !session.is_routing() {
        return not_routing(id);
    }
    let committed = session.stop_routing();
    Response::success(id, json!({ "committed": committed, "changes": take_changes(&state.changes) }))
}

/// Handle Abort request - drops the gesture in progress
pub fn handle_abort(state: &mut ServerState, id: Option<Value>) -> Response {
    let Some(session) = state.session.as_mut() else { return no_board(id) };
    if !session.is_routing() {
        return not_routing(id);
    }
    session.abort_routing();
    state.changes.clear();
    Response::success(id, json!({ "aborted": true }))
}

/// Handle SetLayer request - switches the routing layer
pub fn handle_set_layer(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    #[derive(Deserialize)]
    struct LayerParams {
        layer: i32,
    }

    let Some(session) = state.session.as_mut() else { return no_board(id) };
    let params: LayerParams = match params.and_then(|p| serde_json::from_value(p).ok()) {
        Some(p) => p,
        None => {
            let message = "Invalid params: expected {layer: int}".to_string();
            return Response::error(id, error_codes::INVALID_PARAMS, message);
        }
    };
    if params.layer < 0 {
        return Response::error(id, error_codes::INVALID_PARAMS, format!("Invalid layer {}", params.layer));
    }

    let switched = session.set_layer(params.layer);
    Response::success(id, json!({ "switched": switched, "layer": session.layer() }))
}

/// Handle ToggleVia request - arms or disarms a via at the end of the trace
pub fn handle_toggle_via(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    #[derive(Deserialize)]
    struct ViaParams {
        enabled: bool,
    }

    let Some(session) = state.session.as_mut() else { return no_board(id) };
    if !session.is_routing() {
        return not_routing(id);
    }
    let params: ViaParams = match params.and_then(|p| serde_json::from_value(p).ok()) {
        Some(p) => p,
        None => {
            let message = "Invalid params: expected {enabled: bool}".to_string();
            return Response::error(id, error_codes::INVALID_PARAMS, message);
        }
    };

    session.toggle_via(params.enabled);
    Response::success(id, json!({ "via": params.enabled, "trace": trace_json(session) }))
}

/// Handle FlipPosture request - rotates the preferred posture
pub fn handle_flip_posture(state: &mut ServerState, id: Option<Value>) -> Response {
    let Some(session) = state.session.as_mut() else { return no_board(id) };
    if !session.is_routing() {
        return not_routing(id);
    }
    session.flip_posture();
    Response::success(id, json!({ "trace": trace_json(session) }))
}
