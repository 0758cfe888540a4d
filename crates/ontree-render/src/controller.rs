//! Event loop glue: owns the tree, its layout and the view, and answers host events with effects.

use crate::{Error, Result};
use crate::config::DiagramConfig;
use crate::encoding::tooltip_lines;
use crate::geom::{Point, Vector, point};
use crate::layout::{TreeLayout, layout_tree};
use crate::reconcile::{LinkPath, Reconciler};
use crate::transition::{Animator, Frame};
use crate::view::{DragEvent, Effect, GestureAction, GestureContext, ViewState};
use ontree_core::{NodeId, Ontology};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// Click on a node: toggle its children one level.
    Click { node: NodeId },
    Drag(DragEvent),
    /// Wheel/pinch result in viewport units.
    Zoom { translate: Vector, scale: f64 },
    Hover { node: NodeId },
}

#[derive(Debug, Clone)]
pub struct DiagramController {
    ontology: Ontology,
    config: DiagramConfig,
    layout: TreeLayout,
    reconciler: Reconciler,
    animator: Animator,
    view: ViewState,
}

impl DiagramController {
    /// Takes an annotated ontology; nothing is drawn until [`DiagramController::start`].
    pub fn new(ontology: Ontology, config: DiagramConfig) -> Self {
        // The root grows out of the left edge, half way down.
        let origin = point(0.0, config.viewport_height / 2.0);
        let reconciler = Reconciler::new(ontology.root(), origin);
        let animator = Animator::new(config.duration_ms);
        Self {
            ontology,
            config,
            layout: TreeLayout::default(),
            reconciler,
            animator,
            view: ViewState::default(),
        }
    }

    pub fn ontology(&self) -> &Ontology {
        &self.ontology
    }

    pub fn config(&self) -> &DiagramConfig {
        &self.config
    }

    pub fn layout(&self) -> &TreeLayout {
        &self.layout
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn into_ontology(self) -> Ontology {
        self.ontology
    }

    /// First layout, centered on the root.
    pub fn start(&mut self, now_ms: f64) -> Vec<Effect> {
        let root = self.ontology.root();
        vec![self.update(root, now_ms), self.center_on(root)]
    }

    /// Interpolated diagram at `now_ms`.
    pub fn frame(&mut self, now_ms: f64) -> Frame {
        self.animator.frame(now_ms)
    }

    pub fn is_animating(&self, now_ms: f64) -> bool {
        self.animator.is_running(now_ms)
    }

    pub fn handle(&mut self, event: Event, now_ms: f64) -> Vec<Effect> {
        match event {
            Event::Click { node } => self.click(node, now_ms),
            Event::Drag(drag) => self.drag(drag, now_ms),
            Event::Zoom { translate, scale } => {
                let transform =
                    self.view
                        .zoom(translate, scale, self.config.min_zoom, self.config.max_zoom);
                vec![Effect::Transform(transform)]
            }
            Event::Hover { node } => match self.ontology.get(node) {
                Some(n) => vec![Effect::Tooltip {
                    node,
                    lines: tooltip_lines(n),
                }],
                None => Vec::new(),
            },
        }
    }

    /// Shows or hides the children of a drawn `node` outside of a click, then re-renders around
    /// it.
    pub fn set_expanded(
        &mut self,
        node: NodeId,
        expanded: bool,
        now_ms: f64,
    ) -> Result<Vec<Effect>> {
        if !self.reconciler.is_rendered(node) {
            return Err(Error::UnknownNode(node));
        }
        self.ontology.set_expanded(node, expanded)?;
        Ok(vec![self.update(node, now_ms), self.center_on(node)])
    }

    /// Expands every node and re-renders from the root.
    pub fn expand_all(&mut self, now_ms: f64) -> Vec<Effect> {
        self.ontology.expand_all();
        let root = self.ontology.root();
        vec![self.update(root, now_ms), self.center_on(root)]
    }

    fn click(&mut self, node: NodeId, now_ms: f64) -> Vec<Effect> {
        if self.view.gesture.is_dragging() {
            tracing::debug!(node = %node, "click suppressed during drag");
            return Vec::new();
        }
        if !self.reconciler.is_rendered(node) {
            tracing::debug!(node = %node, "click on a node that is not drawn");
            return Vec::new();
        }
        match self.ontology.toggle(node) {
            Ok(toggled) => tracing::debug!(node = %node, toggled, "toggled node"),
            Err(err) => {
                tracing::debug!(node = %node, error = %err, "ignored click");
                return Vec::new();
            }
        }
        vec![self.update(node, now_ms), self.center_on(node)]
    }

    fn drag(&mut self, event: DragEvent, now_ms: f64) -> Vec<Effect> {
        if let DragEvent::Start { node } = event {
            if !self.reconciler.is_rendered(node) {
                tracing::debug!(node = %node, "drag on a node that is not drawn");
                return Vec::new();
            }
        }
        let ctx = GestureContext {
            root: self.ontology.root(),
            viewport: self.config.viewport(),
            pan_boundary: self.config.pan_boundary,
        };
        let (next, actions) = self.view.gesture.step(&event, &ctx);
        if next != self.view.gesture {
            tracing::debug!(from = ?self.view.gesture, to = ?next, "gesture transition");
        }
        self.view.gesture = next;

        let mut effects = Vec::new();
        for action in actions {
            self.perform(action, now_ms, &mut effects);
        }
        effects
    }

    fn perform(&mut self, action: GestureAction, now_ms: f64, effects: &mut Vec<Effect>) {
        match action {
            GestureAction::Begin { node } => {
                let hidden = self.reconciler.hide_descendants(&self.ontology, node);
                self.animator.forget(&hidden);
                self.animator.forget_link(node);
                effects.push(Effect::HideSubtree { node, hidden });
            }
            GestureAction::Follow { node, delta } => {
                if let Some(position) = self.reconciler.nudge(node, delta) {
                    self.animator.jump(node, position, now_ms);
                    effects.push(Effect::MoveNode { node, position });
                }
            }
            GestureAction::StartPan(dir) => effects.push(Effect::StartPan(dir)),
            GestureAction::StopPan => effects.push(Effect::StopPan),
            GestureAction::PanBy(dir) => {
                let transform = self.view.pan_by(dir.delta(self.config.pan_speed));
                effects.push(Effect::Transform(transform));
            }
            GestureAction::Connector { dragging, selected } => {
                let path = selected.and_then(|s| {
                    let from = self.reconciler.previous(s)?;
                    let to = self.reconciler.previous(dragging)?;
                    Some(LinkPath::new(from, to))
                });
                effects.push(Effect::TempConnector(path));
            }
            GestureAction::Drop { node, target } => {
                if let Some(target) = target {
                    self.reparent(node, target);
                }
                let root = self.ontology.root();
                effects.push(self.update(root, now_ms));
                effects.push(self.center_on(node));
            }
        }
    }

    fn reparent(&mut self, node: NodeId, target: NodeId) {
        if let Err(err) = self.ontology.reparent(node, target) {
            tracing::warn!(node = %node, target = %target, error = %err, "drop rejected");
            return;
        }
        if let Err(err) = self.ontology.expand_recursive(target) {
            tracing::warn!(target = %target, error = %err, "could not expand drop target");
        }
        self.ontology.sort_all_siblings();
    }

    fn update(&mut self, source: NodeId, now_ms: f64) -> Effect {
        self.layout = layout_tree(&self.ontology, &self.config);
        let plan = self.reconciler.reconcile(&self.ontology, &self.layout, source);
        self.animator.apply(&plan, now_ms);
        Effect::Render(plan)
    }

    fn center_on(&mut self, node: NodeId) -> Effect {
        let p: Point = self.reconciler.previous(node).unwrap_or_default();
        let transform = self.view.center_on(p, self.config.viewport());
        Effect::CenterOn { node, transform }
    }
}
