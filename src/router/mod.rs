//! Interactive push-and-shove trace router
//!
//! Items live in a [`NodeArena`], a tree of copy-on-write overlays over the
//! committed board. A [`LinePlacer`] turns cursor movement into track by
//! routing a head line in one of three modes (mark obstacles, walk around,
//! shove) against a private branch of that tree.
//!
//! # Submodules
//! - `direction` - 45 degree directions, angles and trace construction
//! - `shape` / `item` / `line` - routable items and the lines built from them
//! - `node` - the overlay arena, joints and collision queries
//! - `walkaround` - hugging obstacle hulls
//! - `shove` - pushing conflicting tracks aside
//! - `optimizer` - shortening and cleaning up lines
//! - `trail` / `fixed_tail` - posture inference and undo stages
//! - `placer` - the line placer itself
//! - `session` - one board plus the gesture in progress
//! - `settings` / `error` / `context` / `debug` / `topology` - plumbing

pub mod context;
pub mod debug;
pub mod direction;
pub mod error;
pub mod fixed_tail;
pub mod item;
pub mod line;
pub mod node;
pub mod optimizer;
pub mod placer;
pub mod session;
pub mod settings;
pub mod shape;
pub mod shove;
pub mod topology;
pub mod trail;
pub mod walkaround;

pub use context::{commit_routing, NullIface, RecordingIface, RouterContext, RouterIface};
pub use debug::{DebugSink, NullDebugSink, RecordingDebugSink, TracingDebugSink};
pub use direction::{AngleType, CornerMode, Direction45};
pub use error::{Result, RouterError};
pub use item::{Item, ItemId, ItemKind, KindMask, LayerRange, NetCode, Segment, Solid, SolidShape, Via, ViaType, NO_NET};
pub use line::Line;
pub use node::{NodeArena, NodeId};
pub use placer::LinePlacer;
pub use session::RoutingSession;
pub use settings::{DesignRules, OptimizerEffort, RouterMode, RoutingSettings, SizesSettings};
pub use shove::{Shove, ShoveStatus};
pub use walkaround::{Walkaround, WalkaroundResult, WalkaroundStatus};
