//! AST → action-sequence encoder.
//!
//! A deterministic transducer: a pure function of the tree, the frozen
//! grammar, the terminal vocabulary, and the tokenization policy. The walk
//! order is exactly `Tree::rule_list`'s pre-order, which is what guarantees
//! that the n-th action applied during decoding reconstructs the n-th
//! production of the original tree.

use crate::action::Action;
use crate::config::{Config, TokenizationPolicy};
use crate::diagnostics::VyakaError;
use crate::grammar::Grammar;
use crate::tree::Tree;
use crate::vocab::{Vocab, EOS_TOKEN};

/// Internal separator marker used by corpus literals. Sub-token splitting
/// re-emits the marker so concatenation reproduces the literal byte for
/// byte.
pub const SEPARATOR_MARKER: &str = "-SP-";

/// Borrowing encoder over a frozen grammar and terminal vocabulary.
pub struct Encoder<'a> {
    grammar: &'a Grammar,
    terminal_vocab: &'a Vocab,
    config: &'a Config,
}

impl<'a> Encoder<'a> {
    pub fn new(grammar: &'a Grammar, terminal_vocab: &'a Vocab, config: &'a Config) -> Self {
        Encoder {
            grammar,
            terminal_vocab,
            config,
        }
    }

    /// Linearizes a concrete tree into the action sequence that rebuilds it.
    ///
    /// Structural productions become `ApplyRule`. A builtin production
    /// (parent is a primitive category) becomes its literal-independent
    /// rule application — the registered rule already uses the normalized
    /// `P → literal` identity — followed by one token action per sub-token
    /// of the literal and a closing `GenToken(<eos>)`.
    ///
    /// An empty result is an error: the example carries nothing to learn
    /// from and the caller drops it (a corpus-cleaning signal, not a
    /// crash).
    pub fn encode(&self, tree: &Tree, query: &[String]) -> Result<Vec<Action>, VyakaError> {
        let mut actions = Vec::new();
        for instance in tree.rule_list(true, true) {
            let rule_id = self.grammar.rule_to_id(&instance.rule).ok_or_else(|| {
                VyakaError::grammar(format!("unregistered rule '{}'", instance.rule))
            })?;
            actions.push(Action::ApplyRule { rule: rule_id });

            if !self.grammar.is_builtin_type(&instance.rule.parent) {
                continue;
            }

            let literal = instance.literal.as_deref().ok_or_else(|| {
                VyakaError::invalid_node(format!(
                    "builtin production '{}' carries no literal",
                    instance.rule
                ))
            })?;
            let sub_tokens = self.terminal_tokens(literal);
            if sub_tokens.is_empty() {
                return Err(VyakaError::invalid_node(format!(
                    "builtin production '{}' carries an empty literal",
                    instance.rule
                )));
            }
            for token in sub_tokens {
                actions.push(self.route_token(token, query));
            }
            actions.push(Action::GenToken {
                token: EOS_TOKEN.to_string(),
            });
        }
        if actions.is_empty() {
            return Err(VyakaError::EmptyActionSequence);
        }
        Ok(actions)
    }

    fn terminal_tokens(&self, literal: &str) -> Vec<String> {
        terminal_sub_tokens(literal, self.config.tokenization)
    }

    /// Routes one sub-token to generate, copy, or the redundant combined
    /// kind, against the bounded input window.
    fn route_token(&self, token: String, query: &[String]) -> Action {
        let window = query.len().min(self.config.max_query_length);
        match query[..window].iter().position(|q| q == &token) {
            // Not present in the window: only generation can produce it
            // (and it may well be <unk> at training time).
            None => Action::GenToken { token },
            Some(source_idx) => {
                if self.terminal_vocab.lookup(&token) == self.terminal_vocab.unk() {
                    // Out-of-vocabulary on the output side: copy only.
                    Action::CopyToken { source_idx }
                } else {
                    // Both routes available; keep both for scoring
                    // redundancy.
                    Action::GenCopyToken {
                        source_idx,
                        literal: token,
                    }
                }
            }
        }
    }
}

/// Splits a terminal literal into sub-tokens under the given policy.
///
/// Also used by corpus preprocessing to harvest the terminal vocabulary
/// before any encoder exists.
pub fn terminal_sub_tokens(literal: &str, policy: TokenizationPolicy) -> Vec<String> {
    match policy {
        TokenizationPolicy::WholeString => {
            if literal.is_empty() {
                Vec::new()
            } else {
                vec![literal.to_string()]
            }
        }
        TokenizationPolicy::SeparatorSplit => {
            let mut tokens = Vec::new();
            for fragment in literal.split(SEPARATOR_MARKER) {
                if !fragment.is_empty() {
                    tokens.push(fragment.to_string());
                }
                tokens.push(SEPARATOR_MARKER.to_string());
            }
            tokens.pop(); // no trailing separator
            tokens
        }
    }
}
