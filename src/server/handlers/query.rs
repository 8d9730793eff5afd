//! Query operations: GetTrace, GetItems

use crate::server::protocol::Response;
use crate::server::state::ServerState;
use crate::server::util::{no_board, TraceJson};
use serde::Serialize;
use serde_json::Value;

/// Handle GetTrace request - the trace of the gesture in progress, or null
pub fn handle_get_trace(state: &ServerState, id: Option<Value>) -> Response {
    let Some(session) = state.session.as_ref() else { return no_board(id) };
    match session.trace() {
        Some(line) => Response::from_serializable(id, &TraceJson::from(&line)),
        None => Response::success(id, Value::Null),
    }
}

/// Handle GetItems request - every item of the committed board
pub fn handle_get_items(state: &ServerState, id: Option<Value>) -> Response {
    #[derive(Serialize)]
    struct ItemEntry<'a> {
        id: u64,
        #[serde(flatten)]
        item: &'a crate::router::item::Item,
    }

    let Some(session) = state.session.as_ref() else { return no_board(id) };
    let entries: Vec<ItemEntry> = session
        .items()
        .into_iter()
        .map(|(item_id, item)| ItemEntry { id: item_id.0, item })
        .collect();
    Response::from_serializable(id, &entries)
}
