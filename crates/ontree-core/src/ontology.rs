//! Arena-backed ontology tree.
//!
//! Nodes live in a flat `Vec` and reference each other through [`NodeId`]s. A node's children are
//! held by a [`Branch`], which is either expanded (children take part in the diagram), collapsed
//! (children are kept but hidden) or a leaf. Ids are assigned once while parsing and stay stable
//! across toggles and reparenting, so they double as reconciliation keys for the renderer.

use crate::aggregate::Stats;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;
use unicode_width::UnicodeWidthStr;

pub const NAME_KEY: &str = "name";
pub const CHILDREN_KEY: &str = "children";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    /// Rebuilds an id from its arena index (e.g. an id echoed back by a host UI).
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Child list of a node together with its visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Branch {
    #[default]
    Leaf,
    Expanded(Vec<NodeId>),
    Collapsed(Vec<NodeId>),
}

impl Branch {
    /// Every child, visible or hidden.
    pub fn all_children(&self) -> &[NodeId] {
        match self {
            Branch::Leaf => &[],
            Branch::Expanded(children) | Branch::Collapsed(children) => children,
        }
    }

    /// Children that take part in layout.
    pub fn visible_children(&self) -> &[NodeId] {
        match self {
            Branch::Expanded(children) => children,
            Branch::Leaf | Branch::Collapsed(_) => &[],
        }
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self, Branch::Expanded(_))
    }

    pub fn is_collapsed(&self) -> bool {
        matches!(self, Branch::Collapsed(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Branch::Leaf)
    }

    /// Swaps between expanded and collapsed. Returns whether anything changed; leaves never change.
    pub(crate) fn set_expanded(&mut self, expanded: bool) -> bool {
        let changed = match (&*self, expanded) {
            (Branch::Collapsed(_), true) | (Branch::Expanded(_), false) => true,
            _ => false,
        };
        if changed {
            *self = match std::mem::take(self) {
                Branch::Expanded(children) => Branch::Collapsed(children),
                Branch::Collapsed(children) => Branch::Expanded(children),
                Branch::Leaf => Branch::Leaf,
            };
        }
        changed
    }

    fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            Branch::Leaf => None,
            Branch::Expanded(children) | Branch::Collapsed(children) => Some(children),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OntologyNode {
    name: String,
    parent: Option<NodeId>,
    branch: Branch,
    stats: Stats,
    attributes: Map<String, Value>,
}

impl OntologyNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn branch(&self) -> &Branch {
        &self.branch
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub(crate) fn set_expanded(&mut self, expanded: bool) -> bool {
        self.branch.set_expanded(expanded)
    }

    pub(crate) fn set_stats(&mut self, stats: Stats) {
        self.stats = stats;
    }

    /// Extra fields of the source JSON node (everything except `name` and `children`).
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.attributes
    }

    /// True when the node has children, whether shown or hidden.
    pub fn has_children(&self) -> bool {
        !self.branch.is_leaf()
    }

    /// Value used to join this node against a data table.
    ///
    /// `field` is either `name` or the name of an attribute; numeric and boolean attributes are
    /// compared through their JSON text form.
    pub fn key(&self, field: &str) -> Option<Cow<'_, str>> {
        if field == NAME_KEY {
            return Some(Cow::Borrowed(&self.name));
        }
        match self.attributes.get(field)? {
            Value::String(s) => Some(Cow::Borrowed(s)),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ontology {
    nodes: Vec<OntologyNode>,
    root: NodeId,
}

impl Ontology {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Builds the arena from a nested `{name, children?}` document.
    ///
    /// Every node starts expanded; sibling lists are sorted case-insensitively by name.
    pub fn from_value(value: &Value) -> Result<Self> {
        let mut nodes = Vec::new();
        let root = push_node(&mut nodes, value, None, "$")?;
        let mut ontology = Self { nodes, root };
        ontology.sort_all_siblings();
        tracing::debug!(nodes = ontology.len(), "parsed ontology");
        Ok(ontology)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&OntologyNode> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut OntologyNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut OntologyNode> {
        self.nodes.get_mut(id.0).ok_or(Error::UnknownNode(id))
    }

    fn check(&self, id: NodeId) -> Result<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(Error::UnknownNode(id))
        }
    }

    /// All nodes in pre-order, hidden subtrees included.
    pub fn preorder(&self) -> Vec<NodeId> {
        self.walk(self.root, Branch::all_children)
    }

    /// Nodes reachable from the root through expanded branches, in pre-order.
    pub fn visible_preorder(&self) -> Vec<NodeId> {
        self.walk(self.root, Branch::visible_children)
    }

    /// `id` and all of its descendants, hidden ones included.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        self.walk(id, Branch::all_children)
    }

    /// `id` and the descendants currently shown under it.
    pub fn visible_subtree(&self, id: NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        self.walk(id, Branch::visible_children)
    }

    fn walk(&self, start: NodeId, children: fn(&Branch) -> &[NodeId]) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            out.push(id);
            for &child in children(&self.nodes[id.0].branch).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            ontology: self,
            next: self.get(id).and_then(OntologyNode::parent),
        }
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// True when `ancestor` lies strictly above `id`.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// True when `id` is shown in the diagram (every ancestor is expanded).
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.contains(id) && self.ancestors(id).all(|a| self.nodes[a.0].branch.is_expanded())
    }

    /// First node in pre-order whose name matches exactly.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.preorder()
            .into_iter()
            .find(|&id| self.nodes[id.0].name == name)
    }

    /// Resolves a chain of names starting with the root's name.
    pub fn find_path(&self, path: &[&str]) -> Option<NodeId> {
        let (first, rest) = path.split_first()?;
        if self.nodes[self.root.0].name != *first {
            return None;
        }
        let mut cur = self.root;
        for segment in rest {
            cur = *self.nodes[cur.0]
                .branch
                .all_children()
                .iter()
                .find(|&&c| self.nodes[c.0].name == *segment)?;
        }
        Some(cur)
    }

    /// Widest name in display columns, over every node including hidden ones.
    pub fn max_label_width(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| UnicodeWidthStr::width(n.name.as_str()))
            .max()
            .unwrap_or(0)
    }

    /// Swaps expanded and collapsed children, one level only. Returns false for leaves.
    pub fn toggle(&mut self, id: NodeId) -> Result<bool> {
        let node = self.node_mut(id)?;
        node.branch = match std::mem::take(&mut node.branch) {
            Branch::Expanded(children) => Branch::Collapsed(children),
            Branch::Collapsed(children) => Branch::Expanded(children),
            Branch::Leaf => return Ok(false),
        };
        Ok(true)
    }

    /// Shows or hides the children of `id`. Returns whether anything changed.
    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> Result<bool> {
        Ok(self.node_mut(id)?.branch.set_expanded(expanded))
    }

    /// Expands `id` and, if it was collapsed, every collapsed node below it.
    pub fn expand_recursive(&mut self, id: NodeId) -> Result<()> {
        self.check(id)?;
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if self.set_expanded(cur, true)? {
                stack.extend_from_slice(self.nodes[cur.0].branch.all_children());
            }
        }
        Ok(())
    }

    /// Collapses `id` and every expanded node below it.
    pub fn collapse_recursive(&mut self, id: NodeId) -> Result<()> {
        self.check(id)?;
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if self.set_expanded(cur, false)? {
                stack.extend_from_slice(self.nodes[cur.0].branch.all_children());
            }
        }
        Ok(())
    }

    pub fn expand_all(&mut self) {
        for node in &mut self.nodes {
            node.branch.set_expanded(true);
        }
    }

    /// Moves `node` (with its subtree) under `new_parent`.
    ///
    /// The node is appended to the target's child list whatever its visibility; a leaf target
    /// gets a fresh expanded list. The target's siblings are re-sorted afterwards.
    pub fn reparent(&mut self, node: NodeId, new_parent: NodeId) -> Result<()> {
        self.check(node)?;
        self.check(new_parent)?;
        let Some(old_parent) = self.nodes[node.0].parent else {
            return Err(Error::InvalidReparent {
                message: "the root cannot be moved".to_string(),
            });
        };
        if node == new_parent || self.is_ancestor(node, new_parent) {
            return Err(Error::InvalidReparent {
                message: format!(
                    "`{}` cannot be moved below its own subtree",
                    self.nodes[node.0].name
                ),
            });
        }

        let old = &mut self.nodes[old_parent.0].branch;
        let emptied = match old.children_mut() {
            Some(children) => {
                children.retain(|&c| c != node);
                children.is_empty()
            }
            None => false,
        };
        if emptied {
            *old = Branch::Leaf;
        }

        let target = &mut self.nodes[new_parent.0].branch;
        match target {
            Branch::Expanded(children) | Branch::Collapsed(children) => children.push(node),
            Branch::Leaf => *target = Branch::Expanded(vec![node]),
        }
        self.nodes[node.0].parent = Some(new_parent);
        self.sort_children_of(new_parent);

        tracing::debug!(
            node = %node,
            from = %old_parent,
            to = %new_parent,
            "reparented ontology node"
        );
        Ok(())
    }

    /// Sorts every sibling list case-insensitively by name. The sort is stable.
    pub fn sort_all_siblings(&mut self) {
        for idx in 0..self.nodes.len() {
            self.sort_children_of(NodeId(idx));
        }
    }

    fn sort_children_of(&mut self, id: NodeId) {
        let mut branch = std::mem::take(&mut self.nodes[id.0].branch);
        if let Some(children) = branch.children_mut() {
            children.sort_by_cached_key(|c| self.nodes[c.0].name.to_lowercase());
        }
        self.nodes[id.0].branch = branch;
    }

    /// Nested JSON form, hidden children included.
    pub fn to_value(&self) -> Value {
        self.node_value(self.root, false)
    }

    /// Like [`Ontology::to_value`], with the aggregated statistics written onto every node.
    pub fn to_value_with_stats(&self) -> Value {
        self.node_value(self.root, true)
    }

    fn node_value(&self, id: NodeId, with_stats: bool) -> Value {
        let node = &self.nodes[id.0];
        let mut obj = Map::new();
        obj.insert(NAME_KEY.to_string(), Value::String(node.name.clone()));
        for (k, v) in &node.attributes {
            obj.insert(k.clone(), v.clone());
        }
        if with_stats {
            obj.insert(
                "matched_size".to_string(),
                Value::from(node.stats.matched_count),
            );
            obj.insert("group_size".to_string(), Value::from(node.stats.group_size));
            obj.insert(
                "occurrence_fraction".to_string(),
                Value::from(node.stats.occurrence_fraction),
            );
        }
        let children = node.branch.all_children();
        if !children.is_empty() {
            obj.insert(
                CHILDREN_KEY.to_string(),
                Value::Array(
                    children
                        .iter()
                        .map(|&c| self.node_value(c, with_stats))
                        .collect(),
                ),
            );
        }
        Value::Object(obj)
    }
}

impl std::ops::Index<NodeId> for Ontology {
    type Output = OntologyNode;

    fn index(&self, id: NodeId) -> &OntologyNode {
        &self.nodes[id.0]
    }
}

pub struct Ancestors<'a> {
    ontology: &'a Ontology,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.next?;
        self.next = self.ontology.nodes[cur.0].parent;
        Some(cur)
    }
}

fn shape_error(path: &str, message: &str) -> Error {
    Error::OntologyShape {
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn push_node(
    nodes: &mut Vec<OntologyNode>,
    value: &Value,
    parent: Option<NodeId>,
    path: &str,
) -> Result<NodeId> {
    let Value::Object(obj) = value else {
        return Err(shape_error(path, "expected an object"));
    };
    let name = match obj.get(NAME_KEY) {
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(shape_error(path, "`name` must be a string")),
        None => return Err(shape_error(path, "missing `name`")),
    };
    let attributes = obj
        .iter()
        .filter(|(k, _)| k.as_str() != NAME_KEY && k.as_str() != CHILDREN_KEY)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let id = NodeId(nodes.len());
    nodes.push(OntologyNode {
        name,
        parent,
        branch: Branch::Leaf,
        stats: Stats::default(),
        attributes,
    });

    let items = match obj.get(CHILDREN_KEY) {
        None | Some(Value::Null) => return Ok(id),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(shape_error(path, "`children` must be an array")),
    };
    let mut children = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let child_path = format!("{path}.children[{idx}]");
        children.push(push_node(nodes, item, Some(id), &child_path)?);
    }
    if !children.is_empty() {
        nodes[id.0].branch = Branch::Expanded(children);
    }
    Ok(id)
}
