//! Host-clocked tweening of reconciliation plans.
//!
//! Each node and each link (keyed by target) has at most one running tween. Applying a new plan
//! while a tween is still running restarts it from the currently interpolated value, so rapid
//! toggles never make an item jump back to a stale start point.

use crate::geom::Point;
use crate::reconcile::{LinkPath, Phase, UpdatePlan};
use indexmap::IndexMap;
use ontree_core::NodeId;

/// d3's `cubic-in-out`.
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

pub trait Lerp: Copy {
    fn lerp_to(&self, other: &Self, t: f64) -> Self;
}

impl Lerp for Point {
    fn lerp_to(&self, other: &Self, t: f64) -> Self {
        self.lerp(*other, t)
    }
}

impl Lerp for LinkPath {
    fn lerp_to(&self, other: &Self, t: f64) -> Self {
        self.lerp(other, t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween<T> {
    pub from: T,
    pub to: T,
    pub phase: Phase,
    pub start_ms: f64,
}

impl<T: Lerp> Tween<T> {
    /// Eased progress in `[0, 1]`.
    pub fn progress(&self, now_ms: f64, duration_ms: f64) -> f64 {
        if duration_ms <= 0.0 {
            return 1.0;
        }
        ease_cubic_in_out((now_ms - self.start_ms) / duration_ms)
    }

    pub fn value(&self, now_ms: f64, duration_ms: f64) -> T {
        self.from.lerp_to(&self.to, self.progress(now_ms, duration_ms))
    }

    pub fn is_finished(&self, now_ms: f64, duration_ms: f64) -> bool {
        now_ms - self.start_ms >= duration_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedNode {
    pub id: NodeId,
    pub position: Point,
    pub phase: Phase,
    pub progress: f64,
}

impl AnimatedNode {
    /// Labels fade in while entering and out while exiting.
    pub fn label_opacity(&self) -> f64 {
        match self.phase {
            Phase::Enter => self.progress,
            Phase::Update => 1.0,
            Phase::Exit => 1.0 - self.progress,
        }
    }

    /// Circles of exiting nodes shrink to nothing.
    pub fn radius_scale(&self) -> f64 {
        match self.phase {
            Phase::Exit => 1.0 - self.progress,
            Phase::Enter | Phase::Update => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedLink {
    pub target: NodeId,
    pub path: LinkPath,
    pub phase: Phase,
}

/// Interpolated state of every item at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub nodes: Vec<AnimatedNode>,
    pub links: Vec<AnimatedLink>,
}

#[derive(Debug, Clone)]
pub struct Animator {
    duration_ms: f64,
    nodes: IndexMap<NodeId, Tween<Point>>,
    links: IndexMap<NodeId, Tween<LinkPath>>,
}

impl Animator {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            duration_ms,
            nodes: IndexMap::new(),
            links: IndexMap::new(),
        }
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Starts the tweens of `plan` at `now_ms`, restarting any that are still running.
    pub fn apply(&mut self, plan: &UpdatePlan, now_ms: f64) {
        let mut restarted = 0usize;
        for t in &plan.nodes {
            let from = match self.nodes.get(&t.id) {
                Some(running) if !running.is_finished(now_ms, self.duration_ms) => {
                    restarted += 1;
                    running.value(now_ms, self.duration_ms)
                }
                _ => t.from,
            };
            self.nodes.insert(
                t.id,
                Tween {
                    from,
                    to: t.to,
                    phase: t.phase,
                    start_ms: now_ms,
                },
            );
        }
        for t in &plan.links {
            let from = match self.links.get(&t.target) {
                Some(running) if !running.is_finished(now_ms, self.duration_ms) => {
                    running.value(now_ms, self.duration_ms)
                }
                _ => t.from,
            };
            self.links.insert(
                t.target,
                Tween {
                    from,
                    to: t.to,
                    phase: t.phase,
                    start_ms: now_ms,
                },
            );
        }
        if restarted > 0 {
            tracing::debug!(restarted, "restarted running node transitions");
        }
    }

    /// Drops tweens of `ids` without finishing them, e.g. nodes removed for a drag.
    pub fn forget(&mut self, ids: &[NodeId]) {
        for id in ids {
            self.nodes.shift_remove(id);
            self.links.shift_remove(id);
        }
    }

    /// Drops the tween of the link ending at `target`, leaving the node's own tween alone.
    pub fn forget_link(&mut self, target: NodeId) {
        self.links.shift_remove(&target);
    }

    /// Places a node immediately, cancelling its tween.
    pub fn jump(&mut self, id: NodeId, position: Point, now_ms: f64) {
        self.nodes.insert(
            id,
            Tween {
                from: position,
                to: position,
                phase: Phase::Update,
                start_ms: now_ms - self.duration_ms,
            },
        );
    }

    pub fn position(&self, id: NodeId, now_ms: f64) -> Option<Point> {
        self.nodes
            .get(&id)
            .map(|t| t.value(now_ms, self.duration_ms))
    }

    pub fn is_running(&self, now_ms: f64) -> bool {
        let d = self.duration_ms;
        self.nodes.values().any(|t| !t.is_finished(now_ms, d))
            || self.links.values().any(|t| !t.is_finished(now_ms, d))
    }

    /// Interpolates every item at `now_ms`. Exit tweens that have finished are removed after
    /// being reported one last time.
    pub fn frame(&mut self, now_ms: f64) -> Frame {
        let d = self.duration_ms;
        let nodes = self
            .nodes
            .iter()
            .map(|(&id, t)| AnimatedNode {
                id,
                position: t.value(now_ms, d),
                phase: t.phase,
                progress: t.progress(now_ms, d),
            })
            .collect();
        let links = self
            .links
            .iter()
            .map(|(&target, t)| AnimatedLink {
                target,
                path: t.value(now_ms, d),
                phase: t.phase,
            })
            .collect();
        self.nodes
            .retain(|_, t| t.phase != Phase::Exit || !t.is_finished(now_ms, d));
        self.links
            .retain(|_, t| t.phase != Phase::Exit || !t.is_finished(now_ms, d));
        Frame { nodes, links }
    }
}
