//! Undo history of a routing gesture
//!
//! Every fixed stretch of track pushes a stage recording where routing
//! resumed and which node held the board at that moment. The bottom stage is
//! the initial click and is never popped.

use super::direction::Direction45;
use super::node::NodeId;
use crate::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage {
    pub p: Point,
    pub layer: i32,
    pub placing_vias: bool,
    pub direction: Direction45,
    /// Node to roll back to
    pub commit: NodeId,
}

#[derive(Debug, Clone, Default)]
pub struct FixedTail {
    stages: Vec<Stage>,
}

impl FixedTail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.stages.clear();
    }

    pub fn add_stage(&mut self, p: Point, layer: i32, placing_vias: bool, direction: Direction45, commit: NodeId) {
        self.stages.push(Stage { p, layer, placing_vias, direction, commit });
    }

    /// Top stage; removed from the stack unless it is the only one left
    pub fn pop_stage(&mut self) -> Option<Stage> {
        let top = *self.stages.last()?;
        if self.stages.len() > 1 {
            self.stages.pop();
        }
        Some(top)
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}
