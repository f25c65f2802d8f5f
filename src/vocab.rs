//! Token vocabularies for generation and copying.
//!
//! Two vocabularies exist per trained model: one over annotation (query)
//! tokens and one over terminal sub-tokens. Both reserve `<pad>`, `<unk>`,
//! and `<eos>` at fixed ids so serialized matrices stay aligned across
//! runs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const PAD_TOKEN: &str = "<pad>";
pub const UNK_TOKEN: &str = "<unk>";
pub const EOS_TOKEN: &str = "<eos>";

pub type TokenId = u32;

/// Insertion-ordered token vocabulary with unk fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocab {
    tokens: Vec<String>,
    #[serde(skip)]
    ids: HashMap<String, TokenId>,
}

impl Vocab {
    /// A vocabulary holding only the reserved tokens.
    pub fn new() -> Self {
        let mut vocab = Vocab {
            tokens: Vec::new(),
            ids: HashMap::new(),
        };
        vocab.insert(PAD_TOKEN);
        vocab.insert(UNK_TOKEN);
        vocab.insert(EOS_TOKEN);
        vocab
    }

    /// Builds a vocabulary from an ordered token stream: tokens seen at
    /// least twice are ranked by frequency, capped at `vocab_size`, and
    /// inserted in first-occurrence order so builds are reproducible.
    pub fn build<'a>(tokens: impl IntoIterator<Item = &'a str>, vocab_size: usize) -> Self {
        let mut freq: HashMap<&str, (u64, usize)> = HashMap::new();
        let mut order = 0usize;
        for token in tokens {
            let entry = freq.entry(token).or_insert((0, order));
            entry.0 += 1;
            order += 1;
        }

        let mut ranked: Vec<(&str, u64, usize)> = freq
            .iter()
            .filter(|(_, (count, _))| *count >= 2)
            .map(|(token, (count, first))| (*token, *count, *first))
            .collect();
        // Frequency descending; ties broken by first occurrence so the cut
        // is stable.
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        ranked.truncate(vocab_size.saturating_sub(Self::reserved_len()));
        ranked.sort_by_key(|(_, _, first)| *first);

        let mut vocab = Vocab::new();
        for (token, _, _) in ranked {
            vocab.insert(token);
        }
        vocab
    }

    const fn reserved_len() -> usize {
        3
    }

    pub fn unk(&self) -> TokenId {
        1
    }

    pub fn eos(&self) -> TokenId {
        2
    }

    /// Inserts a token if absent; returns its id either way.
    pub fn insert(&mut self, token: &str) -> TokenId {
        if let Some(id) = self.ids.get(token) {
            return *id;
        }
        let id = self.tokens.len() as TokenId;
        self.tokens.push(token.to_string());
        self.ids.insert(token.to_string(), id);
        id
    }

    /// Id lookup, falling back to `<unk>` for unknown tokens.
    /// Out-of-vocabulary tokens are expected input, never an error; callers
    /// that care (preprocessing statistics) count them via [`Vocab::contains`].
    pub fn lookup(&self, token: &str) -> TokenId {
        self.ids.get(token).copied().unwrap_or_else(|| self.unk())
    }

    pub fn contains(&self, token: &str) -> bool {
        self.ids.contains_key(token)
    }

    pub fn token(&self, id: TokenId) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Rebuilds the id map after deserialization (the token vector is
    /// authoritative).
    pub fn rebuild_index(&mut self) {
        self.ids = self
            .tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as TokenId))
            .collect();
    }
}

impl Default for Vocab {
    fn default() -> Self {
        Self::new()
    }
}
