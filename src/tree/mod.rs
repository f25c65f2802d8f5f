//! Tree and Node model for the transducer core.
//!
//! Trees are rooted, ordered, and arena-backed: nodes live in a flat vector
//! owned exclusively by their [`Tree`] and are addressed by [`NodeId`]. No
//! node is ever shared across trees; branching a decoding hypothesis deep
//! copies the whole arena. Traversal is an explicit iterative pre-order so
//! that deep ASTs cannot overflow the stack and so the visit order — the
//! single source of truth for encoder/decoder alignment — is trivially
//! auditable.

use serde::{Deserialize, Serialize};

use crate::diagnostics::VyakaError;
use crate::grammar::{Rule, RuleInstance};
use crate::vocab::EOS_TOKEN;

// ============================================================================
// NODE TYPES
// ============================================================================

/// A node category, interned as a plain string so grammars extracted from
/// arbitrary corpora need no compile-time type universe.
///
/// Three sentinels are reserved: `root` (the initial decoding frontier),
/// `epsilon` (an explicitly empty optional slot), and `literal` (a terminal
/// value slot whose `label` carries the literal text).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeType(String);

pub const ROOT_TYPE: &str = "root";
pub const EPSILON_TYPE: &str = "epsilon";
pub const LITERAL_TYPE: &str = "literal";

impl NodeType {
    pub fn new(name: impl Into<String>) -> Self {
        NodeType(name.into())
    }

    pub fn root() -> Self {
        NodeType(ROOT_TYPE.into())
    }

    pub fn epsilon() -> Self {
        NodeType(EPSILON_TYPE.into())
    }

    pub fn literal() -> Self {
        NodeType(LITERAL_TYPE.into())
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_TYPE
    }

    pub fn is_epsilon(&self) -> bool {
        self.0 == EPSILON_TYPE
    }

    pub fn is_literal(&self) -> bool {
        self.0 == LITERAL_TYPE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeType {
    fn from(name: &str) -> Self {
        NodeType(name.to_string())
    }
}

impl From<String> for NodeType {
    fn from(name: String) -> Self {
        NodeType(name)
    }
}

/// Index of a node within its owning tree's arena.
///
/// Ids are only meaningful for the tree that issued them; structural
/// equality of trees never compares raw indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One node of a tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub ty: NodeType,
    /// Literal payload. Only value slots carry one; during decoding it
    /// accumulates emitted tokens and is sealed by a trailing `<eos>`.
    pub label: Option<String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// True iff this node is a terminal value slot rather than a
    /// structural node.
    pub holds_value: bool,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// A value slot is open until its label ends with the end-of-sequence
    /// marker.
    pub fn value_closed(&self) -> bool {
        self.holds_value
            && self
                .label
                .as_deref()
                .is_some_and(|l| l.ends_with(EOS_TOKEN))
    }
}

// ============================================================================
// TREE
// ============================================================================

/// Rooted ordered tree of [`Node`]s.
///
/// Created root-only at the start of decoding ([`Tree::new`]) or
/// materialized from a serialized corpus record. `Clone` is a deep copy of
/// the arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "NodeRepr", into = "NodeRepr")]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    /// A tree holding only the `root` sentinel node.
    pub fn new() -> Self {
        Tree {
            nodes: vec![Node {
                ty: NodeType::root(),
                label: None,
                parent: None,
                children: Vec::new(),
                holds_value: false,
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Constructs a detached structural node and returns its id. The node
    /// is not reachable from the root until attached with [`Tree::add_child`].
    pub fn create_node(&mut self, ty: NodeType) -> NodeId {
        self.push(Node {
            ty,
            label: None,
            parent: None,
            children: Vec::new(),
            holds_value: false,
        })
    }

    /// Constructs a detached terminal node.
    ///
    /// Fails when `label` is supplied for a structural (non-value) category:
    /// only `literal`-typed value slots carry labels.
    pub fn create_leaf(
        &mut self,
        ty: NodeType,
        label: Option<String>,
    ) -> Result<NodeId, VyakaError> {
        let holds_value = ty.is_literal();
        if label.is_some() && !holds_value {
            return Err(VyakaError::invalid_node(format!(
                "structural category '{ty}' cannot carry a label"
            )));
        }
        Ok(self.push(Node {
            ty,
            label,
            parent: None,
            children: Vec::new(),
            holds_value,
        }))
    }

    /// Appends `child` to `parent`'s ordered child list.
    ///
    /// Value slots and `epsilon` nodes never take children.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), VyakaError> {
        let parent_node = &self.nodes[parent.0];
        if parent_node.holds_value {
            return Err(VyakaError::invalid_node(format!(
                "value slot '{}' cannot take children",
                parent_node.ty
            )));
        }
        if parent_node.ty.is_epsilon() {
            return Err(VyakaError::invalid_node(
                "epsilon nodes represent an empty slot and cannot be expanded",
            ));
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    /// Appends a token to the label of an open value slot.
    ///
    /// The caller (the decode state machine) is responsible for checking
    /// that the slot is open; this is the raw mutation.
    pub(crate) fn append_token(&mut self, id: NodeId, token: &str) {
        self.nodes[id.0]
            .label
            .get_or_insert_with(String::new)
            .push_str(token);
    }

    /// Iterative left-to-right pre-order over reachable node ids.
    pub fn pre_order(&self) -> PreOrder<'_> {
        PreOrder {
            tree: self,
            stack: vec![self.root],
        }
    }

    /// Emits one production per structural node with children, in pre-order.
    ///
    /// This order is the single source of truth for encoder/decoder
    /// alignment: the n-th rule applied during decoding corresponds to the
    /// n-th rule emitted here.
    ///
    /// With `include_leaf` false, leaf productions (those whose child
    /// signature consists entirely of value slots) are omitted. With
    /// `leaf_val` true, the literal carried by a value child is attached to
    /// the emitted instance; the literal never participates in rule
    /// identity.
    pub fn rule_list(&self, include_leaf: bool, leaf_val: bool) -> Vec<RuleInstance> {
        let mut rules = Vec::new();
        for id in self.pre_order() {
            let node = self.node(id);
            if node.children.is_empty() {
                continue;
            }
            let child_types: Vec<NodeType> = node
                .children
                .iter()
                .map(|c| self.node(*c).ty.clone())
                .collect();
            let leaf_only = node.children.iter().all(|c| self.node(*c).holds_value);
            if leaf_only && !include_leaf {
                continue;
            }
            let literal = if leaf_val && leaf_only {
                node.children
                    .iter()
                    .find_map(|c| self.node(*c).label.clone())
            } else {
                None
            };
            rules.push(RuleInstance {
                rule: Rule::new(node.ty.clone(), child_types),
                literal,
            });
        }
        rules
    }

    /// Rewrites value-slot labels in place; `f` returns the replacement
    /// for labels it wants to change. Used by corpus preprocessing to
    /// substitute extracted string literals with their placeholders before
    /// encoding.
    pub fn relabel_values(&mut self, mut f: impl FnMut(&str) -> Option<String>) {
        for node in &mut self.nodes {
            if !node.holds_value {
                continue;
            }
            if let Some(label) = &node.label {
                if let Some(replacement) = f(label) {
                    node.label = Some(replacement);
                }
            }
        }
    }

    /// Copy of this tree with decode-time bookkeeping stripped: the
    /// trailing `<eos>` marker is removed from every closed value slot.
    ///
    /// Round-trip comparison and unparsing operate on normalized trees.
    pub fn normalized(&self) -> Tree {
        let mut out = self.clone();
        for node in &mut out.nodes {
            if node.holds_value {
                if let Some(label) = &node.label {
                    if let Some(stripped) = label.strip_suffix(EOS_TOKEN) {
                        node.label = Some(stripped.to_string());
                    }
                }
            }
        }
        out
    }

    /// Compact s-expression rendering, for diagnostics and diffs.
    pub fn pretty(&self) -> String {
        self.pretty_node(self.root)
    }

    fn pretty_node(&self, id: NodeId) -> String {
        let node = self.node(id);
        if node.holds_value {
            return format!("{:?}", node.label.as_deref().unwrap_or(""));
        }
        if node.children.is_empty() {
            return node.ty.to_string();
        }
        let inner = node
            .children
            .iter()
            .map(|c| self.pretty_node(*c))
            .collect::<Vec<_>>()
            .join(" ");
        format!("({} {})", node.ty, inner)
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural equality: same types, labels, value flags, and child order,
/// independent of arena index assignment.
impl PartialEq for Tree {
    fn eq(&self, other: &Tree) -> bool {
        let mut stack = vec![(self.root, other.root)];
        while let Some((a, b)) = stack.pop() {
            let (na, nb) = (self.node(a), other.node(b));
            if na.ty != nb.ty
                || na.label != nb.label
                || na.holds_value != nb.holds_value
                || na.children.len() != nb.children.len()
            {
                return false;
            }
            stack.extend(na.children.iter().copied().zip(nb.children.iter().copied()));
        }
        true
    }
}

impl Eq for Tree {}

/// Iterative pre-order id iterator.
pub struct PreOrder<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for PreOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        // Children are pushed right-to-left so the leftmost pops first.
        for child in self.tree.node(id).children.iter().rev() {
            self.stack.push(*child);
        }
        Some(id)
    }
}

// ============================================================================
// SERIALIZED SHAPE
// ============================================================================

/// Nested serialized form of a tree. Corpus records use this shape; the
/// arena is an in-memory representation only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRepr {
    #[serde(rename = "type")]
    pub ty: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub holds_value: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeRepr>,
}

impl TryFrom<NodeRepr> for Tree {
    type Error = VyakaError;

    fn try_from(repr: NodeRepr) -> Result<Tree, VyakaError> {
        let mut tree = Tree::new();
        if repr.ty.is_root() && !repr.holds_value {
            if repr.label.is_some() {
                return Err(VyakaError::invalid_node("root node cannot carry a label"));
            }
            for child in repr.children {
                let id = build_node(&mut tree, child)?;
                tree.add_child(tree.root(), id)?;
            }
            return Ok(tree);
        }
        // Records may omit the root sentinel and start at the first real
        // production; re-root them.
        let id = build_node(&mut tree, repr)?;
        tree.add_child(tree.root(), id)?;
        Ok(tree)
    }
}

fn build_node(tree: &mut Tree, repr: NodeRepr) -> Result<NodeId, VyakaError> {
    if repr.holds_value {
        if !repr.children.is_empty() {
            return Err(VyakaError::invalid_node(format!(
                "value slot '{}' cannot have children",
                repr.ty
            )));
        }
        if !repr.ty.is_literal() {
            return Err(VyakaError::invalid_node(format!(
                "value slot must use the '{LITERAL_TYPE}' category, found '{}'",
                repr.ty
            )));
        }
        return tree.create_leaf(repr.ty, repr.label);
    }
    if repr.label.is_some() {
        return Err(VyakaError::invalid_node(format!(
            "structural category '{}' cannot carry a label",
            repr.ty
        )));
    }
    let id = tree.create_node(repr.ty);
    for child in repr.children {
        let child_id = build_node(tree, child)?;
        tree.add_child(id, child_id)?;
    }
    Ok(id)
}

impl From<Tree> for NodeRepr {
    fn from(tree: Tree) -> NodeRepr {
        repr_node(&tree, tree.root())
    }
}

fn repr_node(tree: &Tree, id: NodeId) -> NodeRepr {
    let node = tree.node(id);
    NodeRepr {
        ty: node.ty.clone(),
        label: node.label.clone(),
        holds_value: node.holds_value,
        children: node.children.iter().map(|c| repr_node(tree, *c)).collect(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
