//! Layout Engine - Constraint-based layout of component hierarchies
//!
//! Components live in a [`Scene`]. Constraints containers translate their
//! layout intent (box and alignment helpers, raw linear constraints, size
//! hints and policies) into a linear constraint system, solve it with
//! `cassowary`, and write positions and bounds back onto their children.
//! Containers marked `share_layout` hand their constraints to the nearest
//! constraints-aware ancestor, so a whole subtree can be solved at once.
//!
//! # Example
//!
//! ```
//! use layout_engine::{vbox, Component, LayoutConstraints, Scene};
//!
//! let mut scene = Scene::new();
//! let root = scene.insert(Component::constraints_container().with_bounds(100.0, 130.0));
//! let a = scene.insert(Component::leaf().with_id("a").with_size_hint(100.0, 50.0));
//! let b = scene.insert(Component::leaf().with_id("b").with_size_hint(100.0, 80.0));
//! scene.add_all(root, &[a, b]).unwrap();
//! scene
//!     .set_layout_constraints(root, LayoutConstraints::Items(vec![vbox([a, b]).into()]))
//!     .unwrap();
//! scene.relayout(root).unwrap();
//! let [_, height] = scene.bounds(b).unwrap();
//! assert!((height - 80.0).abs() < 1e-6);
//! ```

mod component;
mod config;
mod error;
mod generate;
mod helpers;
mod namespace;
mod scene;
mod session;
mod solver;
mod table;

pub use component::*;
pub use config::*;
pub use error::*;
pub use helpers::{
    align, hbox, horizontal, spacer, vbox, vertical, Alignment, BoxItem, LayoutHelper,
    LayoutItem, LinearBox, Orientation,
};
pub use namespace::*;
pub use scene::*;
pub use solver::{LayoutManager, Solution, SolverFailure};
pub use table::*;

pub use cassowary;
pub use scene_model::{CoordinateBox, NodeId, Padding, SizePolicies, SizePolicy};
