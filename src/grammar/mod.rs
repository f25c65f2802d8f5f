//! Grammar rules and the rule registry.
//!
//! A [`Rule`] is a production: a parent node type plus the ordered child
//! type signature it introduces when applied. A [`Grammar`] is the set of
//! distinct rules observed in a training corpus, each assigned a stable
//! integer id in insertion order.
//!
//! Registry invariant: a grammar is built once at the entrypoint, frozen,
//! and passed by reference (or `Arc`) to all encoding and decoding code.
//! Never construct a hidden local grammar; multiple grammars may coexist in
//! one process, but each pipeline uses exactly the one it was given.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::diagnostics::VyakaError;
use crate::tree::{NodeType, Tree};

/// Stable integer id of a registered rule. Ids are assigned in insertion
/// order and are only meaningful together with the grammar fingerprint that
/// issued them.
pub type RuleId = u32;

/// Node categories treated as builtin/primitive: their productions carry a
/// literal value and are encoded through the token generation/copy path
/// rather than as plain rule applications.
pub const DEFAULT_BUILTIN_TYPES: &[&str] = &["str", "int", "float", "bool", "identifier"];

// ============================================================================
// RULES
// ============================================================================

/// An ordered production. Two rules are equal iff the parent type and the
/// full ordered child-type signature match; literals never participate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub parent: NodeType,
    pub children: Vec<NodeType>,
}

impl Rule {
    pub fn new(parent: NodeType, children: Vec<NodeType>) -> Self {
        Rule { parent, children }
    }

    /// True when the signature consists entirely of value slots.
    pub fn is_leaf_production(&self) -> bool {
        !self.children.is_empty() && self.children.iter().all(|c| c.is_literal())
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ->", self.parent)?;
        for child in &self.children {
            write!(f, " {child}")?;
        }
        Ok(())
    }
}

/// A rule plus the literal observed at its terminal child, as extracted by
/// `Tree::rule_list(leaf_val = true)`. The literal is used downstream to
/// recover literal strings; it is not part of rule identity.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleInstance {
    pub rule: Rule,
    pub literal: Option<String>,
}

// ============================================================================
// GRAMMAR REGISTRY
// ============================================================================

/// Registry of all distinct rules of a corpus, with insert-order-stable ids.
///
/// Mutable while being built, then [`frozen`](Grammar::freeze) and shared
/// read-only across encoding and decoding. Re-deriving a grammar from a
/// different corpus invalidates previously serialized ids; the fingerprint
/// exists so that mismatch is detectable instead of silent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grammar {
    rules: Vec<Rule>,
    #[serde(skip)]
    rule_ids: HashMap<Rule, RuleId>,
    builtin_types: BTreeSet<NodeType>,
    /// Types never observed as a rule parent. Derived at freeze time; such
    /// nodes are complete as soon as they are attached and are never
    /// selected as a decoding frontier.
    terminal_types: BTreeSet<NodeType>,
    frozen: bool,
    fingerprint: Option<String>,
}

impl Grammar {
    /// An empty grammar with the default builtin-type set.
    pub fn new() -> Self {
        Self::with_builtins(DEFAULT_BUILTIN_TYPES.iter().map(|t| NodeType::new(*t)))
    }

    /// An empty grammar with a caller-supplied builtin-type universe.
    pub fn with_builtins(builtins: impl IntoIterator<Item = NodeType>) -> Self {
        Grammar {
            rules: Vec::new(),
            rule_ids: HashMap::new(),
            builtin_types: builtins.into_iter().collect(),
            terminal_types: BTreeSet::new(),
            frozen: false,
            fingerprint: None,
        }
    }

    /// Inserts a rule if not already present and returns its id; reuses the
    /// existing id otherwise. Insertion order is preserved so ids are
    /// reproducible across builds from the same ordered corpus.
    ///
    /// Shape validation failures are logic defects upstream (the tree
    /// invariants already forbid these shapes), surfaced immediately as
    /// `Grammar` errors.
    pub fn register_rule(&mut self, rule: Rule) -> Result<RuleId, VyakaError> {
        if self.frozen {
            return Err(VyakaError::grammar("cannot register rules after freeze"));
        }
        self.validate_shape(&rule)?;
        if let Some(id) = self.rule_ids.get(&rule) {
            return Ok(*id);
        }
        let id = self.rules.len() as RuleId;
        self.rule_ids.insert(rule.clone(), id);
        self.rules.push(rule);
        Ok(id)
    }

    /// Registers every production of a concrete tree, leaf productions
    /// included (their identity is already literal-independent).
    pub fn register_tree(&mut self, tree: &Tree) -> Result<(), VyakaError> {
        for instance in tree.rule_list(true, false) {
            self.register_rule(instance.rule)?;
        }
        Ok(())
    }

    fn validate_shape(&self, rule: &Rule) -> Result<(), VyakaError> {
        if rule.children.is_empty() {
            return Err(VyakaError::grammar(format!(
                "rule '{}' introduces no children",
                rule.parent
            )));
        }
        if rule.parent.is_epsilon() || rule.parent.is_literal() {
            return Err(VyakaError::grammar(format!(
                "'{}' cannot be a rule parent",
                rule.parent
            )));
        }
        if self.is_builtin_type(&rule.parent) && rule.children.len() != 1 {
            return Err(VyakaError::grammar(format!(
                "builtin production '{rule}' must introduce exactly one value slot"
            )));
        }
        Ok(())
    }

    /// Seals the registry: derives the terminal-type set and computes the
    /// fingerprint. Lookups are valid only after freezing.
    pub fn freeze(&mut self) {
        let parents: BTreeSet<&NodeType> = self.rules.iter().map(|r| &r.parent).collect();
        self.terminal_types = self
            .rules
            .iter()
            .flat_map(|r| r.children.iter())
            .filter(|c| !parents.contains(c) && !c.is_epsilon() && !c.is_literal())
            .cloned()
            .collect();
        let mut hasher = Sha256::new();
        for rule in &self.rules {
            hasher.update(rule.parent.as_str().as_bytes());
            hasher.update([0x1f]);
            for child in &rule.children {
                hasher.update(child.as_str().as_bytes());
                hasher.update([0x1e]);
            }
            hasher.update([0x1d]);
        }
        self.fingerprint = Some(format!("{:x}", hasher.finalize()));
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// SHA-256 over the ordered rule list. `None` until frozen.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub fn rule_to_id(&self, rule: &Rule) -> Option<RuleId> {
        self.rule_ids.get(rule).copied()
    }

    pub fn id_to_rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id as usize)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Classifies a node type as a terminal/primitive category versus a
    /// structural one. This routing decides whether a production is encoded
    /// as a plain rule application or through the token generation path.
    pub fn is_builtin_type(&self, ty: &NodeType) -> bool {
        self.builtin_types.contains(ty)
    }

    /// True for types that never appear as a rule parent: once attached,
    /// such a node has no further expansion and is skipped by frontier
    /// selection.
    pub fn is_terminal_type(&self, ty: &NodeType) -> bool {
        self.terminal_types.contains(ty)
    }

    /// Rebuilds the id map after deserialization (the map is skipped by
    /// serde; the rule vector is authoritative).
    pub fn rebuild_index(&mut self) {
        self.rule_ids = self
            .rules
            .iter()
            .enumerate()
            .map(|(i, r)| (r.clone(), i as RuleId))
            .collect();
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
