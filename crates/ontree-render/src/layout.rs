//! Tidy-tree layout of the visible part of an ontology.
//!
//! Breadth positions come from the Buchheim-Jünger-Leipert variant of Reingold-Tilford: a
//! post-order walk assigns preliminary offsets and merges subtree contours through threads,
//! then a pre-order walk accumulates modifiers. Siblings sit one unit apart, cousins two. The
//! result is normalized to `[0, widest level × px_per_level]` the way d3's `tree().size()`
//! does, so dense levels get more room and sparse trees don't stretch.
//!
//! Depth is `depth × longest label × label_char_width`. Coordinates are screen-oriented: `x` is
//! the depth offset (the tree grows to the right) and `y` the breadth.

use crate::config::DiagramConfig;
use crate::geom::{Point, Rect, bounds, point};
use ontree_core::{NodeId, Ontology};
use rustc_hash::FxHashMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodePlacement {
    pub id: NodeId,
    pub depth: usize,
    pub x: f64,
    pub y: f64,
}

impl NodePlacement {
    pub fn position(&self) -> Point {
        point(self.x, self.y)
    }
}

/// Parent-to-child edge, keyed by its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TreeLayout {
    /// Visible nodes in pre-order.
    pub nodes: Vec<NodePlacement>,
    pub links: Vec<Link>,
    /// Breadth extent the layout was normalized to.
    pub breadth: f64,
    /// Distance between consecutive depth levels.
    pub depth_step: f64,
    #[serde(skip)]
    index: FxHashMap<NodeId, usize>,
}

impl TreeLayout {
    pub fn get(&self, id: NodeId) -> Option<&NodePlacement> {
        self.index.get(&id).map(|&idx| &self.nodes[idx])
    }

    pub fn position(&self, id: NodeId) -> Option<Point> {
        self.get(id).map(NodePlacement::position)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn bounds(&self) -> Option<Rect> {
        bounds(self.nodes.iter().map(NodePlacement::position))
    }
}

/// Number of visible nodes per depth level; the root level always counts one.
pub fn level_widths(ontology: &Ontology) -> Vec<usize> {
    let mut widths = vec![1];
    let mut stack = vec![(ontology.root(), 0usize)];
    while let Some((id, level)) = stack.pop() {
        let children = ontology[id].branch().visible_children();
        if children.is_empty() {
            continue;
        }
        if widths.len() <= level + 1 {
            widths.push(0);
        }
        widths[level + 1] += children.len();
        stack.extend(children.iter().map(|&c| (c, level + 1)));
    }
    widths
}

pub fn layout_tree(ontology: &Ontology, config: &DiagramConfig) -> TreeLayout {
    let widest = level_widths(ontology).into_iter().max().unwrap_or(1);
    let breadth = widest as f64 * config.px_per_level;
    let depth_step = ontology.max_label_width() as f64 * config.label_char_width;

    let mut tidy = TidyTree::new(ontology);
    let offsets = tidy.run();

    // Normalize like d3: the outermost nodes keep half a separation unit of margin.
    let (left, right) = tidy.extremes(&offsets);
    let tx = tidy.separation(left, right) / 2.0 - offsets[left];
    let kx = breadth / (offsets[right] + tidy.separation(right, left) / 2.0 + tx);

    let mut nodes = Vec::with_capacity(tidy.slots.len() - 1);
    let mut links = Vec::with_capacity(tidy.slots.len().saturating_sub(2));
    let mut index = FxHashMap::default();
    for slot in ROOT..tidy.slots.len() {
        let s = &tidy.slots[slot];
        index.insert(s.node, nodes.len());
        nodes.push(NodePlacement {
            id: s.node,
            depth: s.depth,
            x: s.depth as f64 * depth_step,
            y: (offsets[slot] + tx) * kx,
        });
        if slot != ROOT {
            links.push(Link {
                source: tidy.slots[s.parent].node,
                target: s.node,
            });
        }
    }

    tracing::debug!(
        nodes = nodes.len(),
        widest,
        breadth,
        depth_step,
        "computed tree layout"
    );
    TreeLayout {
        nodes,
        links,
        breadth,
        depth_step,
        index,
    }
}

/// Slot 0 is a virtual parent of the root so every real node has a parent slot.
const VIRTUAL: usize = 0;
const ROOT: usize = 1;

#[derive(Debug)]
struct Slot {
    node: NodeId,
    depth: usize,
    parent: usize,
    children: Vec<usize>,
    /// Position among siblings.
    number: usize,
    prelim: f64,
    modifier: f64,
    change: f64,
    shift: f64,
    thread: Option<usize>,
    ancestor: usize,
    /// Default ancestor used while apportioning this slot's children.
    default_ancestor: Option<usize>,
}

impl Slot {
    fn new(slot: usize, node: NodeId, depth: usize, parent: usize, number: usize) -> Self {
        Self {
            node,
            depth,
            parent,
            children: Vec::new(),
            number,
            prelim: 0.0,
            modifier: 0.0,
            change: 0.0,
            shift: 0.0,
            thread: None,
            ancestor: slot,
            default_ancestor: None,
        }
    }
}

struct TidyTree {
    /// Slots in pre-order after the virtual one.
    slots: Vec<Slot>,
}

impl TidyTree {
    fn new(ontology: &Ontology) -> Self {
        let root = ontology.root();
        let mut slots = vec![Slot::new(VIRTUAL, root, 0, VIRTUAL, 0)];
        slots[VIRTUAL].children.push(ROOT);

        let mut stack = vec![(root, VIRTUAL, 0usize, 0usize)];
        while let Some((node, parent, depth, number)) = stack.pop() {
            let slot = slots.len();
            slots.push(Slot::new(slot, node, depth, parent, number));
            if parent != VIRTUAL {
                slots[parent].children.push(slot);
            }
            let children = ontology[node].branch().visible_children();
            for (child_number, &child) in children.iter().enumerate().rev() {
                stack.push((child, slot, depth + 1, child_number));
            }
        }
        Self { slots }
    }

    /// Returns the final breadth offset of every slot, the root at 0.
    fn run(&mut self) -> Vec<f64> {
        // Right-to-left pre-order; reversed it visits children left to right before parents.
        let mut order = Vec::with_capacity(self.slots.len());
        let mut stack = vec![ROOT];
        while let Some(v) = stack.pop() {
            order.push(v);
            stack.extend_from_slice(&self.slots[v].children);
        }
        for &v in order.iter().rev() {
            self.first_walk(v);
        }
        self.slots[VIRTUAL].modifier = -self.slots[ROOT].prelim;

        let mut offsets = vec![0.0; self.slots.len()];
        for v in ROOT..self.slots.len() {
            let parent_mod = self.slots[self.slots[v].parent].modifier;
            offsets[v] = self.slots[v].prelim + parent_mod;
            self.slots[v].modifier += parent_mod;
        }
        offsets
    }

    fn separation(&self, a: usize, b: usize) -> f64 {
        if self.slots[a].parent == self.slots[b].parent {
            1.0
        } else {
            2.0
        }
    }

    /// Leftmost and rightmost slots, first occurrence in pre-order.
    fn extremes(&self, offsets: &[f64]) -> (usize, usize) {
        let (mut left, mut right) = (ROOT, ROOT);
        for v in ROOT..self.slots.len() {
            if offsets[v] < offsets[left] {
                left = v;
            }
            if offsets[v] > offsets[right] {
                right = v;
            }
        }
        (left, right)
    }

    fn next_left(&self, v: usize) -> Option<usize> {
        self.slots[v].children.first().copied().or(self.slots[v].thread)
    }

    fn next_right(&self, v: usize) -> Option<usize> {
        self.slots[v].children.last().copied().or(self.slots[v].thread)
    }

    fn first_walk(&mut self, v: usize) {
        let parent = self.slots[v].parent;
        let number = self.slots[v].number;
        let left_sibling = (number > 0).then(|| self.slots[parent].children[number - 1]);

        let children = &self.slots[v].children;
        let ends = children.first().copied().zip(children.last().copied());
        if let Some((first, last)) = ends {
            self.execute_shifts(v);
            let midpoint = (self.slots[first].prelim + self.slots[last].prelim) / 2.0;
            match left_sibling {
                Some(w) => {
                    self.slots[v].prelim = self.slots[w].prelim + self.separation(v, w);
                    self.slots[v].modifier = self.slots[v].prelim - midpoint;
                }
                None => self.slots[v].prelim = midpoint,
            }
        } else if let Some(w) = left_sibling {
            self.slots[v].prelim = self.slots[w].prelim + self.separation(v, w);
        }

        let fallback = self.slots[parent]
            .default_ancestor
            .unwrap_or(self.slots[parent].children[0]);
        let ancestor = self.apportion(v, left_sibling, fallback);
        self.slots[parent].default_ancestor = Some(ancestor);
    }

    /// Pushes `v`'s subtree right until it clears every subtree to its left.
    fn apportion(&mut self, v: usize, left_sibling: Option<usize>, mut ancestor: usize) -> usize {
        let Some(w) = left_sibling else {
            return ancestor;
        };
        let parent = self.slots[v].parent;

        // Inner/outer contours of the right (`v`) and left (`w` and its siblings) subtrees.
        let mut in_right = v;
        let mut out_right = v;
        let mut in_left = w;
        let mut out_left = self.slots[parent].children[0];
        let mut s_in_right = self.slots[in_right].modifier;
        let mut s_out_right = self.slots[out_right].modifier;
        let mut s_in_left = self.slots[in_left].modifier;
        let mut s_out_left = self.slots[out_left].modifier;

        let (next_in_left, next_in_right) = loop {
            let next_in_left = self.next_right(in_left);
            let next_in_right = self.next_left(in_right);
            let (Some(il), Some(ir)) = (next_in_left, next_in_right) else {
                break (next_in_left, next_in_right);
            };
            let (Some(ol), Some(or)) = (self.next_left(out_left), self.next_right(out_right))
            else {
                break (None, None);
            };
            in_left = il;
            in_right = ir;
            out_left = ol;
            out_right = or;
            self.slots[out_right].ancestor = v;

            let shift = self.slots[in_left].prelim + s_in_left
                - self.slots[in_right].prelim
                - s_in_right
                + self.separation(in_left, in_right);
            if shift > 0.0 {
                let from = self.greatest_distinct_ancestor(in_left, v, ancestor);
                self.move_subtree(from, v, shift);
                s_in_right += shift;
                s_out_right += shift;
            }
            s_in_left += self.slots[in_left].modifier;
            s_in_right += self.slots[in_right].modifier;
            s_out_left += self.slots[out_left].modifier;
            s_out_right += self.slots[out_right].modifier;
        };

        if let Some(il) = next_in_left {
            if self.next_right(out_right).is_none() {
                self.slots[out_right].thread = Some(il);
                self.slots[out_right].modifier += s_in_left - s_out_right;
            }
        }
        if let Some(ir) = next_in_right {
            if self.next_left(out_left).is_none() {
                self.slots[out_left].thread = Some(ir);
                self.slots[out_left].modifier += s_in_right - s_out_left;
                ancestor = v;
            }
        }
        ancestor
    }

    fn greatest_distinct_ancestor(&self, in_left: usize, v: usize, fallback: usize) -> usize {
        let candidate = self.slots[in_left].ancestor;
        if self.slots[candidate].parent == self.slots[v].parent {
            candidate
        } else {
            fallback
        }
    }

    fn move_subtree(&mut self, from: usize, to: usize, shift: f64) {
        let subtrees = (self.slots[to].number - self.slots[from].number) as f64;
        let change = shift / subtrees;
        self.slots[to].change -= change;
        self.slots[to].shift += shift;
        self.slots[from].change += change;
        self.slots[to].prelim += shift;
        self.slots[to].modifier += shift;
    }

    /// Spreads the shifts recorded by `move_subtree` over the intermediate children.
    fn execute_shifts(&mut self, v: usize) {
        let mut shift = 0.0;
        let mut change = 0.0;
        let children = std::mem::take(&mut self.slots[v].children);
        for &w in children.iter().rev() {
            let slot = &mut self.slots[w];
            slot.prelim += shift;
            slot.modifier += shift;
            change += slot.change;
            shift += slot.shift + change;
        }
        self.slots[v].children = children;
    }
}
