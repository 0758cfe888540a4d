//! Keyed enter/update/exit diffing between consecutive layouts.
//!
//! Nodes are keyed by [`NodeId`], links by their target id. Every node that has ever been drawn
//! keeps its last settled position (its "previous" position), which is where its next
//! transition starts from.

use crate::geom::{Point, Vector};
use crate::layout::TreeLayout;
use indexmap::{IndexMap, IndexSet};
use ontree_core::{NodeId, Ontology};
use rustc_hash::FxHashMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Enter,
    Update,
    Exit,
}

/// End points of a link; the curve between them is derived at draw time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkPath {
    pub source: Point,
    pub target: Point,
}

impl LinkPath {
    pub fn new(source: Point, target: Point) -> Self {
        Self { source, target }
    }

    /// Zero-length link, used for links growing out of or shrinking into a node.
    pub fn collapsed(at: Point) -> Self {
        Self {
            source: at,
            target: at,
        }
    }

    pub fn lerp(&self, other: &LinkPath, t: f64) -> LinkPath {
        LinkPath {
            source: self.source.lerp(other.source, t),
            target: self.target.lerp(other.target, t),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransition {
    pub id: NodeId,
    pub phase: Phase,
    pub from: Point,
    pub to: Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkTransition {
    pub source: NodeId,
    pub target: NodeId,
    pub phase: Phase,
    pub from: LinkPath,
    pub to: LinkPath,
}

/// Everything that has to move for one diagram update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    /// Node whose change triggered the update.
    pub source: NodeId,
    pub nodes: Vec<NodeTransition>,
    pub links: Vec<LinkTransition>,
}

impl UpdatePlan {
    pub fn node(&self, id: NodeId) -> Option<&NodeTransition> {
        self.nodes.iter().find(|t| t.id == id)
    }

    pub fn link(&self, target: NodeId) -> Option<&LinkTransition> {
        self.links.iter().find(|t| t.target == target)
    }

    pub fn nodes_in(&self, phase: Phase) -> impl Iterator<Item = &NodeTransition> {
        self.nodes.iter().filter(move |t| t.phase == phase)
    }

    pub fn links_in(&self, phase: Phase) -> impl Iterator<Item = &LinkTransition> {
        self.links.iter().filter(move |t| t.phase == phase)
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    previous: FxHashMap<NodeId, Point>,
    rendered: IndexSet<NodeId>,
    /// target -> source
    rendered_links: IndexMap<NodeId, NodeId>,
}

impl Reconciler {
    /// Starts with nothing drawn; the root's previous position is `origin`, so the first
    /// update grows the whole tree out of it.
    pub fn new(root: NodeId, origin: Point) -> Self {
        let mut previous = FxHashMap::default();
        previous.insert(root, origin);
        Self {
            previous,
            rendered: IndexSet::new(),
            rendered_links: IndexMap::new(),
        }
    }

    pub fn previous(&self, id: NodeId) -> Option<Point> {
        self.previous.get(&id).copied()
    }

    pub fn is_rendered(&self, id: NodeId) -> bool {
        self.rendered.contains(&id)
    }

    pub fn rendered(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.rendered.iter().copied()
    }

    pub fn has_link(&self, target: NodeId) -> bool {
        self.rendered_links.contains_key(&target)
    }

    /// Diffs `layout` against what is currently drawn and records it as drawn.
    ///
    /// Entering items start at the previous position of their nearest ancestor that was drawn,
    /// falling back to the source's previous position. Exiting items move to the source's new
    /// position.
    pub fn reconcile(
        &mut self,
        ontology: &Ontology,
        layout: &TreeLayout,
        source: NodeId,
    ) -> UpdatePlan {
        let source_before = self
            .previous(source)
            .or_else(|| layout.position(source))
            .unwrap_or_default();
        let source_after = layout.position(source).unwrap_or(source_before);

        let mut nodes = Vec::with_capacity(layout.len() + self.rendered.len());
        let mut entered_at: FxHashMap<NodeId, Point> = FxHashMap::default();
        for placement in &layout.nodes {
            let to = placement.position();
            let (phase, from) = match self.previous(placement.id) {
                Some(prev) if self.rendered.contains(&placement.id) => (Phase::Update, prev),
                _ => {
                    let origin = self.enter_origin(ontology, placement.id, source_before);
                    entered_at.insert(placement.id, origin);
                    (Phase::Enter, origin)
                }
            };
            nodes.push(NodeTransition {
                id: placement.id,
                phase,
                from,
                to,
            });
        }
        for &id in &self.rendered {
            if !layout.contains(id) {
                nodes.push(NodeTransition {
                    id,
                    phase: Phase::Exit,
                    from: self.previous(id).unwrap_or(source_before),
                    to: source_after,
                });
            }
        }

        let mut links = Vec::with_capacity(layout.links.len() + self.rendered_links.len());
        for link in &layout.links {
            let (Some(s), Some(t)) = (layout.position(link.source), layout.position(link.target))
            else {
                continue;
            };
            let to = LinkPath::new(s, t);
            let drawn = self.rendered_links.contains_key(&link.target);
            let from = match (self.previous(link.source), self.previous(link.target)) {
                (Some(ps), Some(pt)) if drawn => Some(LinkPath::new(ps, pt)),
                _ => None,
            };
            let (phase, from) = match from {
                Some(from) => (Phase::Update, from),
                None => {
                    let origin = entered_at.get(&link.target).copied().unwrap_or_else(|| {
                        self.enter_origin(ontology, link.target, source_before)
                    });
                    (Phase::Enter, LinkPath::collapsed(origin))
                }
            };
            links.push(LinkTransition {
                source: link.source,
                target: link.target,
                phase,
                from,
                to,
            });
        }
        for (&target, &src) in &self.rendered_links {
            if layout.contains(target) {
                continue;
            }
            let from = LinkPath::new(
                self.previous(src).unwrap_or(source_before),
                self.previous(target).unwrap_or(source_before),
            );
            links.push(LinkTransition {
                source: src,
                target,
                phase: Phase::Exit,
                from,
                to: LinkPath::collapsed(source_after),
            });
        }

        self.rendered = layout.nodes.iter().map(|p| p.id).collect();
        self.rendered_links = layout.links.iter().map(|l| (l.target, l.source)).collect();
        for placement in &layout.nodes {
            self.previous.insert(placement.id, placement.position());
        }

        tracing::debug!(
            source = %source,
            entering = nodes.iter().filter(|t| t.phase == Phase::Enter).count(),
            exiting = nodes.iter().filter(|t| t.phase == Phase::Exit).count(),
            "reconciled diagram"
        );
        UpdatePlan {
            source,
            nodes,
            links,
        }
    }

    fn enter_origin(&self, ontology: &Ontology, id: NodeId, fallback: Point) -> Point {
        ontology
            .ancestors(id)
            .find(|a| self.rendered.contains(a))
            .and_then(|a| self.previous(a))
            .unwrap_or(fallback)
    }

    /// Removes the descendants of `node` and its incoming link from the drawn set, leaving
    /// `node` itself drawn. Returns the removed nodes.
    pub fn hide_descendants(&mut self, ontology: &Ontology, node: NodeId) -> Vec<NodeId> {
        let hidden: Vec<NodeId> = self
            .rendered
            .iter()
            .copied()
            .filter(|&id| ontology.is_ancestor(node, id))
            .collect();
        for id in &hidden {
            self.rendered.shift_remove(id);
            self.rendered_links.shift_remove(id);
        }
        self.rendered_links.shift_remove(&node);
        hidden
    }

    /// Shifts the previous position of a drawn node, e.g. while it follows the pointer.
    pub fn nudge(&mut self, id: NodeId, delta: Vector) -> Option<Point> {
        let pos = self.previous.get_mut(&id)?;
        *pos += delta;
        Some(*pos)
    }
}
