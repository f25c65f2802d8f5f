//! Corpus model and two-pass preprocessing.
//!
//! Preprocessing turns a paired corpus (annotation lines + serialized
//! trees) into a dataset the training collaborator can consume: a frozen
//! grammar, the two vocabularies, and per-example fixed-width matrices.
//! The pipeline is tolerant at example granularity — a malformed record or
//! an empty action sequence increments a counter and drops that example;
//! nothing short of an I/O failure aborts the batch.

pub mod loader;
pub mod query;

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionRecord};
use crate::config::Config;
use crate::diagnostics::VyakaError;
use crate::encode::{terminal_sub_tokens, Encoder};
use crate::grammar::Grammar;
use crate::tree::Tree;
use crate::vocab::{TokenId, Vocab};

// ============================================================================
// EXAMPLES AND DATASETS
// ============================================================================

/// One training example: the cleaned query, its tree, and the action
/// sequence that rebuilds the tree.
#[derive(Debug, Clone)]
pub struct DataEntry {
    /// Line number of the example in the source corpus.
    pub raw_id: usize,
    pub query_tokens: Vec<String>,
    pub tree: Tree,
    pub actions: Vec<Action>,
}

/// A named collection of examples sharing one frozen grammar and one pair
/// of vocabularies.
#[derive(Debug, Clone)]
pub struct DataSet {
    pub name: String,
    pub grammar: Arc<Grammar>,
    pub annot_vocab: Arc<Vocab>,
    pub terminal_vocab: Arc<Vocab>,
    pub entries: Vec<DataEntry>,
}

impl DataSet {
    pub fn new(
        name: impl Into<String>,
        grammar: Arc<Grammar>,
        annot_vocab: Arc<Vocab>,
        terminal_vocab: Arc<Vocab>,
    ) -> Self {
        DataSet {
            name: name.into(),
            grammar,
            annot_vocab,
            terminal_vocab,
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, entry: DataEntry) {
        self.entries.push(entry);
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// A new dataset holding deep copies of the selected examples; grammar
    /// and vocabularies stay shared. Used to carve train/dev/test splits.
    pub fn subset(&self, ids: &[usize], name: impl Into<String>) -> DataSet {
        let mut subset = DataSet::new(
            name,
            Arc::clone(&self.grammar),
            Arc::clone(&self.annot_vocab),
            Arc::clone(&self.terminal_vocab),
        );
        for id in ids {
            if let Some(entry) = self.entries.get(*id) {
                subset.add(entry.clone());
            }
        }
        subset
    }

    /// Serializes every example to its fixed-width form: query token ids
    /// padded to `max_query_length` (with `<pad>` = 0) and the action
    /// sequence truncated to `max_example_action_num`. Truncation belongs
    /// to this batching layer, not to the encoder.
    pub fn to_matrices(&self, config: &Config) -> Vec<ExampleMatrix> {
        self.entries
            .iter()
            .map(|entry| {
                let mut query_token_ids: Vec<TokenId> = entry
                    .query_tokens
                    .iter()
                    .take(config.max_query_length)
                    .map(|t| self.annot_vocab.lookup(t))
                    .collect();
                query_token_ids.resize(config.max_query_length, 0);

                let actions = entry
                    .actions
                    .iter()
                    .take(config.max_example_action_num)
                    .map(|a| ActionRecord::from_action(a, &self.terminal_vocab))
                    .collect();

                ExampleMatrix {
                    raw_id: entry.raw_id,
                    query_token_ids,
                    actions,
                }
            })
            .collect()
    }
}

/// Fixed-width serialized form of one example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleMatrix {
    pub raw_id: usize,
    pub query_token_ids: Vec<TokenId>,
    pub actions: Vec<ActionRecord>,
}

/// The on-disk dataset produced by `vyaka preprocess`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DatasetFile {
    /// Fingerprint of the grammar the rule ids in `examples` refer to.
    pub grammar_fingerprint: String,
    pub grammar: Grammar,
    pub annot_vocab: Vocab,
    pub terminal_vocab: Vocab,
    pub examples: Vec<ExampleMatrix>,
}

// ============================================================================
// PREPROCESSING
// ============================================================================

/// Aggregate counters reported after a preprocessing run. Example-level
/// failures land here instead of aborting the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreprocessStats {
    pub examples_seen: usize,
    pub examples_kept: usize,
    /// Records that failed to deserialize or violated tree/grammar
    /// invariants.
    pub corpus_errors: usize,
    /// Examples whose encoding produced no actions.
    pub empty_action_sequences: usize,
    /// Query tokens that fell back to `<unk>` in the annotation vocabulary.
    pub unknown_query_tokens: usize,
    pub max_query_len: usize,
    pub max_action_len: usize,
}

/// Everything a preprocessing run produces.
#[derive(Debug)]
pub struct Preprocessed {
    pub dataset: DataSet,
    pub stats: PreprocessStats,
}

impl Preprocessed {
    pub fn into_file(self, config: &Config) -> DatasetFile {
        let matrices = self.dataset.to_matrices(config);
        DatasetFile {
            grammar_fingerprint: self
                .dataset
                .grammar
                .fingerprint()
                .unwrap_or_default()
                .to_string(),
            grammar: (*self.dataset.grammar).clone(),
            annot_vocab: (*self.dataset.annot_vocab).clone(),
            terminal_vocab: (*self.dataset.terminal_vocab).clone(),
            examples: matrices,
        }
    }
}

/// Runs the full two-pass pipeline over a paired corpus.
///
/// Pass one cleans each query (string-literal placeholders mirrored into
/// the tree), registers every production into the grammar, and harvests
/// the token streams for both vocabularies. Pass two encodes each cleaned
/// example against the frozen grammar, dropping and counting the failures.
pub fn preprocess(
    annot_path: &Path,
    trees_path: &Path,
    config: &Config,
) -> Result<Preprocessed, VyakaError> {
    let annotations = loader::read_annotations(annot_path)?;
    let tree_records = loader::load_trees(trees_path)?;
    let mut stats = PreprocessStats::default();

    // Pass one: clean queries, build the grammar, harvest vocab streams.
    let mut grammar = Grammar::new();
    let mut cleaned: Vec<(usize, Vec<String>, Tree)> = Vec::new();
    let mut annot_stream: Vec<String> = Vec::new();
    let mut terminal_stream: Vec<String> = Vec::new();

    for (raw_id, (annotation, record)) in annotations.iter().zip(tree_records).enumerate() {
        stats.examples_seen += 1;
        let mut tree = match record {
            Ok(tree) => tree,
            Err(_) => {
                stats.corpus_errors += 1;
                continue;
            }
        };
        let cleaned_query = query::process_query(annotation, &mut tree);
        if grammar.register_tree(&tree).is_err() {
            stats.corpus_errors += 1;
            continue;
        }
        for instance in tree.rule_list(true, true) {
            if !grammar.is_builtin_type(&instance.rule.parent) {
                continue;
            }
            if let Some(literal) = &instance.literal {
                terminal_stream.extend(terminal_sub_tokens(literal, config.tokenization));
            }
        }
        annot_stream.extend(cleaned_query.tokens.iter().cloned());
        cleaned.push((raw_id, cleaned_query.tokens, tree));
    }

    let annot_vocab = Arc::new(Vocab::build(
        annot_stream.iter().map(String::as_str),
        config.annot_vocab_size,
    ));
    let terminal_vocab = Arc::new(Vocab::build(
        terminal_stream.iter().map(String::as_str),
        config.terminal_vocab_size,
    ));
    grammar.freeze();
    let grammar = Arc::new(grammar);

    // Pass two: encode against the frozen grammar.
    let mut dataset = DataSet::new(
        "train_data",
        Arc::clone(&grammar),
        Arc::clone(&annot_vocab),
        Arc::clone(&terminal_vocab),
    );
    let encoder = Encoder::new(&grammar, &terminal_vocab, config);
    for (raw_id, query_tokens, tree) in cleaned {
        match encoder.encode(&tree, &query_tokens) {
            Ok(actions) => {
                stats.unknown_query_tokens += query_tokens
                    .iter()
                    .filter(|t| !annot_vocab.contains(t))
                    .count();
                stats.max_query_len = stats.max_query_len.max(query_tokens.len());
                stats.max_action_len = stats.max_action_len.max(actions.len());
                stats.examples_kept += 1;
                dataset.add(DataEntry {
                    raw_id,
                    query_tokens,
                    tree,
                    actions,
                });
            }
            Err(VyakaError::EmptyActionSequence) => {
                stats.empty_action_sequences += 1;
            }
            Err(_) => {
                stats.corpus_errors += 1;
            }
        }
    }

    Ok(Preprocessed { dataset, stats })
}
