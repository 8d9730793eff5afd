//! Server state management for the router server

use crate::router::context::RecordingIface;
use crate::router::session::RoutingSession;
use std::rc::Rc;

/// In-memory state: the loaded board's routing session and the editor-side
/// log of what the router changed
pub struct ServerState {
    pub board_path: Option<String>,
    pub session: Option<RoutingSession>,
    /// Shared with the session; drained into responses
    pub changes: Rc<RecordingIface>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            board_path: None,
            session: None,
            changes: Rc::new(RecordingIface::default()),
        }
    }

    pub fn is_board_loaded(&self) -> bool {
        self.session.is_some()
    }

    /// Installs a new session, wiring its editor callbacks to `changes`
    pub fn install_session(&mut self, session: RoutingSession, path: Option<String>) {
        self.changes.clear();
        self.session = Some(session.with_iface(Box::new(Rc::clone(&self.changes))));
        self.board_path = path;
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}
