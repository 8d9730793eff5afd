//! Board descriptions: the JSON the server loads a routing session from

use crate::router::error::{Result, RouterError};
use crate::router::item::{Item, SolidShape};
use crate::router::node::NodeArena;
use crate::router::session::RoutingSession;
use crate::router::settings::{RoutingSettings, SizesSettings};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardDescription {
    #[serde(default)]
    pub settings: RoutingSettings,
    #[serde(default)]
    pub sizes: SizesSettings,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl BoardDescription {
    /// Reads a board description from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading board from {}", path.display()))?;
        let board = serde_json::from_str(&text).with_context(|| format!("parsing board {}", path.display()))?;
        Ok(board)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Checks every item, then builds the committed world from them
    pub fn into_arena(&self) -> Result<NodeArena> {
        self.settings.validate()?;
        for (i, item) in self.items.iter().enumerate() {
            validate_item(item).map_err(|reason| RouterError::InvalidBoard(format!("item {}: {}", i, reason)))?;
        }

        let mut arena = NodeArena::new(self.settings.rules());
        let root = arena.root();
        for item in &self.items {
            arena.add(root, item.clone());
        }
        Ok(arena)
    }

    /// Builds a session over this board
    pub fn into_session(self) -> Result<RoutingSession> {
        let arena = self.into_arena()?;
        info!(target: "pns", "[Server] board loaded: {} items", arena.item_count(arena.root()));
        let mut session = RoutingSession::new(arena, self.settings, SizesSettings::default());
        session.update_sizes(self.sizes)?;
        Ok(session)
    }
}

fn validate_item(item: &Item) -> std::result::Result<(), String> {
    let layers = item.layers();
    if layers.start < 0 {
        return Err(format!("negative layer {}", layers.start));
    }
    match item {
        Item::Segment(s) => {
            if s.width <= 0 {
                return Err("segment width must be positive".into());
            }
            if s.seg.a == s.seg.b {
                return Err("zero-length segment".into());
            }
        }
        Item::Arc(a) => {
            if a.width <= 0 {
                return Err("arc width must be positive".into());
            }
            if a.arc.start == a.arc.end {
                return Err("degenerate arc".into());
            }
        }
        Item::Via(v) => {
            if v.diameter <= 0 || v.drill <= 0 || v.drill >= v.diameter {
                return Err("via drill must be positive and smaller than its diameter".into());
            }
        }
        Item::Solid(s) => match &s.shape {
            SolidShape::Circle { radius, .. } if *radius <= 0 => return Err("circle radius must be positive".into()),
            SolidShape::Rect { half_width, half_height, .. } if *half_width <= 0 || *half_height <= 0 => {
                return Err("rectangle must have a positive size".into())
            }
            SolidShape::Polygon { outline } if outline.len() < 3 => {
                return Err("polygon needs at least three points".into())
            }
            _ => {}
        },
    }
    Ok(())
}
