//! The action taxonomy: one atomic step of encoding or decoding.
//!
//! [`Action`] is a closed tagged union with exactly four kinds. Every
//! consumption site (encoder validation, decoder application, record
//! serialization) matches exhaustively, so adding a kind is a compile-time
//! checked change everywhere it matters.

use serde::{Deserialize, Serialize};

use crate::grammar::RuleId;
use crate::vocab::{TokenId, Vocab};

/// An atomic transduction step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "act", rename_all = "snake_case")]
pub enum Action {
    /// Expand the frontier node according to a registered production.
    ApplyRule { rule: RuleId },
    /// Emit one literal token from the output vocabulary (including the
    /// reserved end-of-sequence token).
    GenToken { token: String },
    /// Emit one literal token by copying position `source_idx` of the input
    /// query, bypassing the output vocabulary entirely (the token is
    /// out-of-vocabulary on the output side).
    CopyToken { source_idx: usize },
    /// Emit one literal token that is both in the output vocabulary and
    /// present in the input; records both routes for downstream scoring
    /// redundancy.
    GenCopyToken { source_idx: usize, literal: String },
}

impl Action {
    /// Short tag name, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::ApplyRule { .. } => "APPLY_RULE",
            Action::GenToken { .. } => "GEN_TOKEN",
            Action::CopyToken { .. } => "COPY_TOKEN",
            Action::GenCopyToken { .. } => "GEN_COPY_TOKEN",
        }
    }

    /// True for the three token-emitting kinds.
    pub fn emits_token(&self) -> bool {
        !matches!(self, Action::ApplyRule { .. })
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::ApplyRule { rule } => write!(f, "APPLY_RULE[{rule}]"),
            Action::GenToken { token } => write!(f, "GEN_TOKEN[{token}]"),
            Action::CopyToken { source_idx } => write!(f, "COPY_TOKEN[{source_idx}]"),
            Action::GenCopyToken {
                source_idx,
                literal,
            } => write!(f, "GEN_COPY_TOKEN[{source_idx}, {literal}]"),
        }
    }
}

/// Slot indices of the fixed-width record form.
pub const SLOT_RULE: usize = 0;
pub const SLOT_TOKEN: usize = 1;
pub const SLOT_COPY: usize = 2;

/// Fixed-width serialized form of one decoding step: three parallel integer
/// slots (rule id / generated token id / copy source index) and three
/// parallel flags marking which slots are active. `GenCopyToken` activates
/// the token and copy slots simultaneously; inactive slots stay zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub slots: [u32; 3],
    pub flags: [bool; 3],
}

impl ActionRecord {
    /// Serializes an action against the terminal vocabulary. Generated
    /// tokens missing from the vocabulary record the `<unk>` id, mirroring
    /// the lookup fallback used at training time.
    pub fn from_action(action: &Action, terminal_vocab: &Vocab) -> ActionRecord {
        let mut record = ActionRecord::default();
        match action {
            Action::ApplyRule { rule } => {
                record.slots[SLOT_RULE] = *rule;
                record.flags[SLOT_RULE] = true;
            }
            Action::GenToken { token } => {
                record.slots[SLOT_TOKEN] = terminal_vocab.lookup(token);
                record.flags[SLOT_TOKEN] = true;
            }
            Action::CopyToken { source_idx } => {
                record.slots[SLOT_COPY] = *source_idx as u32;
                record.flags[SLOT_COPY] = true;
            }
            Action::GenCopyToken {
                source_idx,
                literal,
            } => {
                record.slots[SLOT_TOKEN] = terminal_vocab.lookup(literal);
                record.flags[SLOT_TOKEN] = true;
                record.slots[SLOT_COPY] = *source_idx as u32;
                record.flags[SLOT_COPY] = true;
            }
        }
        record
    }

    pub fn rule_id(&self) -> Option<RuleId> {
        self.flags[SLOT_RULE].then_some(self.slots[SLOT_RULE])
    }

    pub fn token_id(&self) -> Option<TokenId> {
        self.flags[SLOT_TOKEN].then_some(self.slots[SLOT_TOKEN])
    }

    pub fn copy_idx(&self) -> Option<usize> {
        self.flags[SLOT_COPY].then_some(self.slots[SLOT_COPY] as usize)
    }
}
