//! Hypothesis state machine for grammar-constrained decoding.
//!
//! A [`Hyp`] is one live beam candidate: a partial tree plus a cumulative
//! score. The machine is OPEN while a frontier node exists and TERMINAL
//! once none does; at that point the tree is a fully realized,
//! grammar-valid AST.
//!
//! Legality is enforced twice by design: the search policy restricts
//! proposals to the legal action set, and [`Hyp::apply`] re-validates as a
//! safety net. A rejection here is a scorer/search defect, never a
//! recoverable condition, so rejected actions must simply be excluded from
//! the beam.

use crate::action::Action;
use crate::config::Config;
use crate::diagnostics::VyakaError;
use crate::grammar::Grammar;
use crate::tree::{Node, NodeId, Tree};
use crate::vocab::Vocab;

/// Read-only context shared by every hypothesis of one decode run.
///
/// Everything is passed by reference: no ambient grammar or vocabulary
/// state, so multiple target languages can decode in the same process.
pub struct DecodeContext<'a> {
    pub grammar: &'a Grammar,
    pub terminal_vocab: &'a Vocab,
    /// The input query's token sequence; copy actions index into its
    /// bounded prefix.
    pub query: &'a [String],
    pub config: &'a Config,
}

impl<'a> DecodeContext<'a> {
    pub fn new(
        grammar: &'a Grammar,
        terminal_vocab: &'a Vocab,
        query: &'a [String],
        config: &'a Config,
    ) -> Self {
        DecodeContext {
            grammar,
            terminal_vocab,
            query,
            config,
        }
    }

    /// Resolves a copy source index against the bounded window.
    fn copy_source(&self, source_idx: usize) -> Result<&str, VyakaError> {
        if source_idx >= self.config.max_query_length {
            return Err(VyakaError::illegal_action(format!(
                "copy source index {source_idx} is outside the input window of {}",
                self.config.max_query_length
            )));
        }
        self.query.get(source_idx).map(String::as_str).ok_or_else(|| {
            VyakaError::illegal_action(format!(
                "copy source index {source_idx} is beyond the query length {}",
                self.query.len()
            ))
        })
    }
}

/// One decoding hypothesis: a private partial tree plus its score.
///
/// Branching a beam clones the hypothesis; trees are never aliased between
/// hypotheses, which is the whole concurrency story (see the crate docs).
#[derive(Debug, Clone)]
pub struct Hyp {
    tree: Tree,
    pub score: f64,
}

impl Hyp {
    /// A fresh hypothesis holding only the `root` sentinel, which is always
    /// expandable in the initial state.
    pub fn new() -> Self {
        Hyp {
            tree: Tree::new(),
            score: 0.0,
        }
    }

    /// Wraps an existing partial tree (e.g. for resuming a decode).
    pub fn from_tree(tree: Tree) -> Self {
        Hyp { tree, score: 0.0 }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    /// Frontier-selection predicate. Applied to leaves only, in pre-order;
    /// the first match is the frontier.
    pub fn can_expand(grammar: &Grammar, node: &Node) -> bool {
        if node.holds_value {
            // A value slot stays expandable until sealed by <eos>.
            return !node.value_closed();
        }
        if node.ty.is_epsilon() {
            return false;
        }
        if grammar.is_terminal_type(&node.ty) {
            return false;
        }
        true
    }

    /// The next node eligible for expansion: the first leaf in pre-order
    /// passing [`Hyp::can_expand`]. Total pre-order makes this
    /// deterministic — two hypotheses with identical action histories
    /// always select the same frontier.
    pub fn frontier_nt(&self, grammar: &Grammar) -> Option<NodeId> {
        self.tree.pre_order().find(|id| {
            let node = self.tree.node(*id);
            node.is_leaf() && Self::can_expand(grammar, node)
        })
    }

    /// TERMINAL iff no frontier node remains; the tree is then complete
    /// and eligible for unparsing.
    pub fn is_terminal(&self, grammar: &Grammar) -> bool {
        self.frontier_nt(grammar).is_none()
    }

    /// Number of expandable leaves; applying a legal action closes exactly
    /// one slot or replaces the frontier with the rule's new open slots.
    pub fn open_slots(&self, grammar: &Grammar) -> usize {
        self.tree
            .pre_order()
            .filter(|id| {
                let node = self.tree.node(*id);
                node.is_leaf() && Self::can_expand(grammar, node)
            })
            .count()
    }

    /// Validates `action` against the current frontier and applies it to
    /// the tree in place. The frontier is recomputed from scratch on the
    /// next call; closed nodes are never revisited.
    pub fn apply(&mut self, action: &Action, ctx: &DecodeContext) -> Result<(), VyakaError> {
        let frontier = self.frontier_nt(ctx.grammar).ok_or_else(|| {
            VyakaError::illegal_action("hypothesis is terminal; no frontier node remains")
        })?;
        let frontier_node = self.tree.node(frontier);

        match action {
            Action::ApplyRule { rule } => {
                if frontier_node.holds_value {
                    return Err(VyakaError::wrong_action_type(
                        action.kind(),
                        "an open value slot",
                    ));
                }
                let rule = ctx.grammar.id_to_rule(*rule).ok_or_else(|| {
                    VyakaError::illegal_action(format!("unknown rule id {rule}"))
                })?;
                if rule.parent != frontier_node.ty {
                    return Err(VyakaError::illegal_action(format!(
                        "rule parent '{}' does not match frontier type '{}'",
                        rule.parent, frontier_node.ty
                    )));
                }
                for child_ty in rule.children.clone() {
                    let child = if child_ty.is_literal() {
                        self.tree.create_leaf(child_ty, None)?
                    } else {
                        self.tree.create_node(child_ty)
                    };
                    self.tree.add_child(frontier, child)?;
                }
            }

            Action::GenToken { token } => {
                self.require_value_slot(frontier, action)?;
                self.tree.append_token(frontier, token);
            }

            Action::CopyToken { source_idx } => {
                self.require_value_slot(frontier, action)?;
                let token = ctx.copy_source(*source_idx)?.to_string();
                self.tree.append_token(frontier, &token);
            }

            Action::GenCopyToken {
                source_idx,
                literal,
            } => {
                self.require_value_slot(frontier, action)?;
                let source = ctx.copy_source(*source_idx)?;
                if source != literal {
                    return Err(VyakaError::illegal_action(format!(
                        "copy source '{source}' at index {source_idx} does not match literal '{literal}'"
                    )));
                }
                if ctx.terminal_vocab.lookup(literal) == ctx.terminal_vocab.unk() {
                    return Err(VyakaError::illegal_action(format!(
                        "literal '{literal}' does not resolve in the terminal vocabulary; \
                         a copy-only action is required"
                    )));
                }
                self.tree.append_token(frontier, literal);
            }
        }
        Ok(())
    }

    fn require_value_slot(&self, frontier: NodeId, action: &Action) -> Result<(), VyakaError> {
        let node = self.tree.node(frontier);
        if !node.holds_value {
            return Err(VyakaError::wrong_action_type(
                action.kind(),
                format!("structural node '{}'", node.ty),
            ));
        }
        Ok(())
    }
}

impl Default for Hyp {
    fn default() -> Self {
        Self::new()
    }
}

/// Replays an encoder-produced action sequence over a fresh hypothesis.
///
/// The result still carries value-slot `<eos>` markers; compare against
/// concrete trees via [`Tree::normalized`].
pub fn decode_actions(actions: &[Action], ctx: &DecodeContext) -> Result<Tree, VyakaError> {
    let mut hyp = Hyp::new();
    for action in actions {
        hyp.apply(action, ctx)?;
    }
    Ok(hyp.into_tree())
}
