//! Zoom/pan transform and the drag-to-reparent gesture machine.
//!
//! [`Gesture::step`] is pure: it maps `(state, event)` to the next state plus a list of
//! [`GestureAction`]s, and never touches the tree. The controller carries the actions out and
//! reports what the host has to draw as [`Effect`]s.

use crate::geom::{Point, Size, Vector, point, vector};
use crate::reconcile::{LinkPath, UpdatePlan};
use ontree_core::NodeId;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewTransform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            scale: 1.0,
        }
    }
}

impl ViewTransform {
    pub fn translate(&self) -> Vector {
        vector(self.translate_x, self.translate_y)
    }

    /// Diagram coordinates to viewport coordinates.
    pub fn apply(&self, p: Point) -> Point {
        point(
            p.x * self.scale + self.translate_x,
            p.y * self.scale + self.translate_y,
        )
    }

    /// Viewport coordinates to diagram coordinates.
    pub fn invert(&self, p: Point) -> Point {
        point(
            (p.x - self.translate_x) / self.scale,
            (p.y - self.translate_y) / self.scale,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanDirection {
    Left,
    Right,
    Up,
    Down,
}

impl PanDirection {
    /// Translation for one pan step. Panning left moves the content right.
    pub fn delta(self, speed: f64) -> Vector {
        match self {
            PanDirection::Left => vector(speed, 0.0),
            PanDirection::Right => vector(-speed, 0.0),
            PanDirection::Up => vector(0.0, speed),
            PanDirection::Down => vector(0.0, -speed),
        }
    }
}

/// Edge the pointer is pressing against, checked left, right, up, down in that order.
pub fn pan_direction(pointer: Point, viewport: Size, boundary: f64) -> Option<PanDirection> {
    if pointer.x < boundary {
        Some(PanDirection::Left)
    } else if pointer.x > viewport.width - boundary {
        Some(PanDirection::Right)
    } else if pointer.y < boundary {
        Some(PanDirection::Up)
    } else if pointer.y > viewport.height - boundary {
        Some(PanDirection::Down)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Pointer is down on a node but has not moved yet.
    Pending { node: NodeId },
    Dragging {
        node: NodeId,
        selected: Option<NodeId>,
        pan: Option<PanDirection>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragEvent {
    Start { node: NodeId },
    /// `delta` is the pointer movement in diagram units, `pointer` its viewport position.
    Move { delta: Vector, pointer: Point },
    /// Pointer entered the drop target around `node`.
    Over { node: NodeId },
    Out { node: NodeId },
    End,
    Cancel,
    /// Timer tick while edge panning.
    PanTick,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureAction {
    /// First movement of a drag: take the node's subtree out of the diagram.
    Begin { node: NodeId },
    Follow { node: NodeId, delta: Vector },
    StartPan(PanDirection),
    StopPan,
    PanBy(PanDirection),
    Connector {
        dragging: NodeId,
        selected: Option<NodeId>,
    },
    /// Release; `target` is `None` when the drag should leave the tree unchanged.
    Drop {
        node: NodeId,
        target: Option<NodeId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureContext {
    pub root: NodeId,
    pub viewport: Size,
    pub pan_boundary: f64,
}

impl Gesture {
    pub fn is_dragging(&self) -> bool {
        matches!(self, Gesture::Dragging { .. })
    }

    pub fn step(self, event: &DragEvent, ctx: &GestureContext) -> (Gesture, Vec<GestureAction>) {
        use GestureAction as A;
        match (self, *event) {
            (Gesture::Idle, DragEvent::Start { node }) if node != ctx.root => {
                (Gesture::Pending { node }, Vec::new())
            }
            (Gesture::Pending { node }, DragEvent::Move { delta, pointer }) => {
                let pan = pan_direction(pointer, ctx.viewport, ctx.pan_boundary);
                let mut actions = vec![A::Begin { node }];
                if let Some(dir) = pan {
                    actions.push(A::StartPan(dir));
                }
                actions.push(A::Follow { node, delta });
                actions.push(A::Connector {
                    dragging: node,
                    selected: None,
                });
                let next = Gesture::Dragging {
                    node,
                    selected: None,
                    pan,
                };
                (next, actions)
            }
            (Gesture::Pending { .. }, DragEvent::End | DragEvent::Cancel) => {
                (Gesture::Idle, Vec::new())
            }
            (
                Gesture::Dragging {
                    node,
                    selected,
                    pan,
                },
                DragEvent::Move { delta, pointer },
            ) => {
                let next_pan = pan_direction(pointer, ctx.viewport, ctx.pan_boundary);
                let mut actions = Vec::new();
                if next_pan != pan {
                    actions.push(match next_pan {
                        Some(dir) => A::StartPan(dir),
                        None => A::StopPan,
                    });
                }
                actions.push(A::Follow { node, delta });
                actions.push(A::Connector {
                    dragging: node,
                    selected,
                });
                let next = Gesture::Dragging {
                    node,
                    selected,
                    pan: next_pan,
                };
                (next, actions)
            }
            (Gesture::Dragging { node, pan, .. }, DragEvent::Over { node: target })
                if target != node =>
            {
                let next = Gesture::Dragging {
                    node,
                    selected: Some(target),
                    pan,
                };
                let actions = vec![A::Connector {
                    dragging: node,
                    selected: Some(target),
                }];
                (next, actions)
            }
            (Gesture::Dragging { node, pan, .. }, DragEvent::Out { .. }) => {
                let next = Gesture::Dragging {
                    node,
                    selected: None,
                    pan,
                };
                let actions = vec![A::Connector {
                    dragging: node,
                    selected: None,
                }];
                (next, actions)
            }
            (Gesture::Dragging { pan: Some(dir), .. }, DragEvent::PanTick) => {
                (self, vec![A::PanBy(dir)])
            }
            (
                Gesture::Dragging {
                    node,
                    selected,
                    pan,
                },
                DragEvent::End | DragEvent::Cancel,
            ) => {
                let target = match event {
                    DragEvent::End => selected,
                    _ => None,
                };
                let mut actions = Vec::new();
                if pan.is_some() {
                    actions.push(A::StopPan);
                }
                actions.push(A::Connector {
                    dragging: node,
                    selected: None,
                });
                actions.push(A::Drop { node, target });
                (Gesture::Idle, actions)
            }
            (state, _) => (state, Vec::new()),
        }
    }
}

/// Interaction state owned by the controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub transform: ViewTransform,
    pub gesture: Gesture,
}

impl ViewState {
    /// Keeps the scale and moves `p` to the middle of the viewport.
    pub fn center_on(&mut self, p: Point, viewport: Size) -> ViewTransform {
        let scale = self.transform.scale;
        self.transform.translate_x = -p.x * scale + viewport.width / 2.0;
        self.transform.translate_y = -p.y * scale + viewport.height / 2.0;
        self.transform
    }

    pub fn pan_by(&mut self, delta: Vector) -> ViewTransform {
        self.transform.translate_x += delta.x;
        self.transform.translate_y += delta.y;
        self.transform
    }

    /// Takes a zoom gesture's transform, clamping the scale into `[min_zoom, max_zoom]`.
    pub fn zoom(
        &mut self,
        translate: Vector,
        scale: f64,
        min_zoom: f64,
        max_zoom: f64,
    ) -> ViewTransform {
        self.transform = ViewTransform {
            translate_x: translate.x,
            translate_y: translate.y,
            scale: scale.clamp(min_zoom, max_zoom),
        };
        self.transform
    }
}

/// Work for the host's drawing surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Animate the diagram according to the plan.
    Render(UpdatePlan),
    /// Animate the view transform so `node` ends up centered.
    CenterOn {
        node: NodeId,
        transform: ViewTransform,
    },
    /// Set the view transform immediately.
    Transform(ViewTransform),
    /// Remove these nodes and the incoming link of `node` from the diagram.
    HideSubtree { node: NodeId, hidden: Vec<NodeId> },
    MoveNode { node: NodeId, position: Point },
    /// Start repeating [`DragEvent::PanTick`] every `pan_interval_ms`.
    StartPan(PanDirection),
    StopPan,
    /// Dashed line between the drop target and the dragged node, or none.
    TempConnector(Option<LinkPath>),
    Tooltip { node: NodeId, lines: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::size;

    fn ctx() -> GestureContext {
        GestureContext {
            root: NodeId::from_index(0),
            viewport: size(960.0, 800.0),
            pan_boundary: 20.0,
        }
    }

    #[test]
    fn pan_direction_checks_horizontal_edges_first() {
        let vp = size(960.0, 800.0);
        assert_eq!(pan_direction(point(5.0, 5.0), vp, 20.0), Some(PanDirection::Left));
        assert_eq!(pan_direction(point(950.0, 400.0), vp, 20.0), Some(PanDirection::Right));
        assert_eq!(pan_direction(point(400.0, 10.0), vp, 20.0), Some(PanDirection::Up));
        assert_eq!(pan_direction(point(400.0, 790.0), vp, 20.0), Some(PanDirection::Down));
        assert_eq!(pan_direction(point(400.0, 400.0), vp, 20.0), None);
    }

    #[test]
    fn center_on_keeps_scale() {
        let mut view = ViewState::default();
        view.transform.scale = 2.0;
        let t = view.center_on(point(100.0, 50.0), size(960.0, 800.0));
        assert_eq!((t.translate_x, t.translate_y, t.scale), (280.0, 300.0, 2.0));
        assert_eq!(t.apply(point(100.0, 50.0)), point(480.0, 400.0));
    }

    #[test]
    fn pending_drag_released_without_moving_does_nothing() {
        let node = NodeId::from_index(4);
        let (state, actions) = Gesture::Idle.step(&DragEvent::Start { node }, &ctx());
        assert_eq!(state, Gesture::Pending { node });
        assert!(actions.is_empty());
        let (state, actions) = state.step(&DragEvent::End, &ctx());
        assert_eq!(state, Gesture::Idle);
        assert!(actions.is_empty());
    }

    #[test]
    fn out_clears_selection() {
        let node = NodeId::from_index(4);
        let target = NodeId::from_index(2);
        let state = Gesture::Dragging {
            node,
            selected: Some(target),
            pan: None,
        };
        let (state, actions) = state.step(&DragEvent::Out { node: target }, &ctx());
        assert_eq!(
            state,
            Gesture::Dragging {
                node,
                selected: None,
                pan: None
            }
        );
        assert_eq!(
            actions,
            vec![GestureAction::Connector {
                dragging: node,
                selected: None
            }]
        );
    }
}
