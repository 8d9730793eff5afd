//! Geometry kernel for the router
//!
//! Integer-grid primitives shared by every routing algorithm.
//!
//! # Submodules
//! - `point` - Points/vectors with wide-integer products
//! - `seg` - Segments: intersection, projection and distance
//! - `arc` - Circular arcs and their polyline approximation
//! - `chain` - Ordered point chains with embedded arcs
//! - `hull` - Octagonal obstacle hulls and convex hull

mod arc;
mod chain;
mod hull;
mod point;
mod seg;

pub use point::{round, Point};
pub use seg::Seg;
pub use arc::{arc_to_segment_count, Arc, DEFAULT_ARC_ERROR};
pub use chain::{Intersection, PointChain};
pub use hull::{bbox_octagon, circle_hull, convex_hull, octagon, polygon_hull, segment_hull};
