#![forbid(unsafe_code)]

//! Interactive rendering core for collapsible ontology trees.
//!
//! Nothing in this crate touches a real drawing surface. [`layout`] turns the visible part of an
//! [`ontree_core::Ontology`] into coordinates, [`reconcile`] diffs consecutive layouts into
//! enter/update/exit transitions and [`controller::DiagramController`] turns host events into
//! [`view::Effect`]s. [`svg`] renders a settled frame for static export.

pub mod config;
pub mod controller;
pub mod encoding;
pub mod geom;
pub mod layout;
pub mod reconcile;
pub mod svg;
pub mod transition;
pub mod view;

pub use config::{DiagramConfig, Palette};
pub use controller::{DiagramController, Event};
pub use layout::{TreeLayout, layout_tree};
pub use reconcile::{Phase, Reconciler, UpdatePlan};
pub use transition::Animator;
pub use view::{DragEvent, Effect, Gesture, ViewState, ViewTransform};

use ontree_core::NodeId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] ontree_core::Error),
    #[error("node {0} is not part of the diagram")]
    UnknownNode(NodeId),
    #[error("invalid diagram config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
