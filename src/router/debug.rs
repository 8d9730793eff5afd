//! Debug annotation sinks
//!
//! Routing code reports intermediate geometry (candidate paths, hulls,
//! decision points) through `DebugSink`. Sinks only observe; nothing they do
//! can feed back into a routing decision.

use crate::geometry::{Point, PointChain};
use std::cell::RefCell;

pub trait DebugSink {
    fn begin_group(&self, _name: &str) {}
    fn end_group(&self) {}
    fn add_line(&self, _chain: &PointChain, _name: &str) {}
    fn add_point(&self, _p: Point, _name: &str) {}
    fn message(&self, _text: &str) {}
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NullDebugSink;

impl DebugSink for NullDebugSink {}

/// Forwards annotations to `tracing` at trace level
#[derive(Debug, Default)]
pub struct TracingDebugSink;

impl DebugSink for TracingDebugSink {
    fn begin_group(&self, name: &str) {
        tracing::trace!(target: "pns", "[Debug] begin {}", name);
    }

    fn end_group(&self) {
        tracing::trace!(target: "pns", "[Debug] end");
    }

    fn add_line(&self, chain: &PointChain, name: &str) {
        tracing::trace!(target: "pns", "[Debug] line {} ({} pts): {:?}", name, chain.point_count(), chain.points());
    }

    fn add_point(&self, p: Point, name: &str) {
        tracing::trace!(target: "pns", "[Debug] point {} at ({}, {})", name, p.x, p.y);
    }

    fn message(&self, text: &str) {
        tracing::trace!(target: "pns", "[Debug] {}", text);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DebugEntry {
    Group(String),
    EndGroup,
    Line(String, PointChain),
    Point(String, Point),
    Message(String),
}

/// Keeps annotations in memory for inspection
#[derive(Debug, Default)]
pub struct RecordingDebugSink {
    entries: RefCell<Vec<DebugEntry>>,
}

impl RecordingDebugSink {
    pub fn entries(&self) -> Vec<DebugEntry> {
        self.entries.borrow().clone()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl DebugSink for RecordingDebugSink {
    fn begin_group(&self, name: &str) {
        self.entries.borrow_mut().push(DebugEntry::Group(name.to_string()));
    }

    fn end_group(&self) {
        self.entries.borrow_mut().push(DebugEntry::EndGroup);
    }

    fn add_line(&self, chain: &PointChain, name: &str) {
        self.entries.borrow_mut().push(DebugEntry::Line(name.to_string(), chain.clone()));
    }

    fn add_point(&self, p: Point, name: &str) {
        self.entries.borrow_mut().push(DebugEntry::Point(name.to_string(), p));
    }

    fn message(&self, text: &str) {
        self.entries.borrow_mut().push(DebugEntry::Message(text.to_string()));
    }
}
