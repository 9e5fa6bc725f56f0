//! Scene Model - Plain data shared by the plotting scene graph
//!
//! This crate holds the value types every visual component is made of:
//! stable node identifiers, the positioned rectangle that layout writes
//! into, and the sizing policies a component advertises to the layout
//! solver. It has no knowledge of constraint solving.

mod geometry;
mod node_id;
mod policy;

pub use geometry::*;
pub use node_id::*;
pub use policy::*;
