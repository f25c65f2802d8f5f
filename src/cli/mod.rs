//! The Vyaka command-line interface.
//!
//! This module is the entry point for all CLI commands and orchestrates
//! the core library functions; it owns no transduction logic of its own.

use std::fs;
use std::path::Path;
use std::process;
use std::sync::Arc;

use clap::Parser;

use crate::cli::args::{Command, VyakaArgs};
use crate::config::Config;
use crate::dataset::{self, loader, query};
use crate::decode::{decode_actions, DecodeContext};
use crate::diagnostics::{print_error, VyakaError};
use crate::encode::Encoder;
use crate::grammar::Grammar;
use crate::vocab::Vocab;

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = VyakaArgs::parse();

    let result = match args.command {
        Command::Preprocess {
            annot,
            trees,
            out,
            config,
        } => handle_preprocess(&annot, &trees, &out, config.as_deref()),
        Command::Grammar { trees } => handle_grammar(&trees),
        Command::Check {
            annot,
            trees,
            config,
        } => handle_check(&annot, &trees, config.as_deref()),
    };

    if let Err(e) = result {
        print_error(e);
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, VyakaError> {
    match path {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    }
}

/// Handles the `preprocess` subcommand.
fn handle_preprocess(
    annot: &Path,
    trees: &Path,
    out: &Path,
    config: Option<&Path>,
) -> Result<(), VyakaError> {
    let config = load_config(config)?;
    let preprocessed = dataset::preprocess(annot, trees, &config)?;

    output::print_stats(&preprocessed.stats);

    let file = preprocessed.into_file(&config);
    let json = serde_json::to_string(&file)
        .map_err(|e| VyakaError::config(format!("serializing dataset: {e}")))?;
    fs::write(out, json)
        .map_err(|e| VyakaError::io(format!("writing dataset {}", out.display()), e))?;

    output::print_heading(&format!(
        "wrote {} examples to {} (grammar {})",
        file.examples.len(),
        out.display(),
        &file.grammar_fingerprint[..12.min(file.grammar_fingerprint.len())],
    ));
    Ok(())
}

/// Handles the `grammar` subcommand.
fn handle_grammar(trees: &Path) -> Result<(), VyakaError> {
    let mut grammar = Grammar::new();
    let mut skipped = 0usize;
    for record in loader::load_trees(trees)? {
        match record {
            Ok(tree) => grammar.register_tree(&tree)?,
            Err(_) => skipped += 1,
        }
    }
    grammar.freeze();

    for (id, rule) in grammar.rules().iter().enumerate() {
        println!("{id:4}  {rule}");
    }
    output::print_heading(&format!(
        "{} rules, fingerprint {}",
        grammar.rule_count(),
        grammar.fingerprint().unwrap_or_default(),
    ));
    if skipped > 0 {
        println!("skipped {skipped} malformed records");
    }
    Ok(())
}

/// Handles the `check` subcommand: encodes every example and replays the
/// actions through the decode state machine, comparing the normalized
/// result against the original tree.
fn handle_check(annot: &Path, trees: &Path, config: Option<&Path>) -> Result<(), VyakaError> {
    let config = load_config(config)?;
    let annotations = loader::read_annotations(annot)?;
    let tree_records = loader::load_trees(trees)?;

    // Same two-pass shape as preprocessing, kept inline so the check also
    // exercises the public pipeline pieces a collaborator would use.
    let mut grammar = Grammar::new();
    let mut cleaned = Vec::new();
    let mut terminal_stream: Vec<String> = Vec::new();
    let mut skipped = 0usize;
    for (annotation, record) in annotations.iter().zip(tree_records) {
        let mut tree = match record {
            Ok(tree) => tree,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        let cleaned_query = query::process_query(annotation, &mut tree);
        grammar.register_tree(&tree)?;
        for instance in tree.rule_list(true, true) {
            if grammar.is_builtin_type(&instance.rule.parent) {
                if let Some(literal) = &instance.literal {
                    terminal_stream
                        .extend(crate::encode::terminal_sub_tokens(literal, config.tokenization));
                }
            }
        }
        cleaned.push((cleaned_query.tokens, tree));
    }
    grammar.freeze();
    let terminal_vocab = Arc::new(Vocab::build(
        terminal_stream.iter().map(String::as_str),
        config.terminal_vocab_size,
    ));

    let encoder = Encoder::new(&grammar, &terminal_vocab, &config);
    let mut mismatches = 0usize;
    let mut checked = 0usize;
    for (query_tokens, tree) in &cleaned {
        let actions = match encoder.encode(tree, query_tokens) {
            Ok(actions) => actions,
            Err(VyakaError::EmptyActionSequence) => continue,
            Err(e) => return Err(e),
        };
        let ctx = DecodeContext::new(&grammar, &terminal_vocab, query_tokens, &config);
        let decoded = decode_actions(&actions, &ctx)?.normalized();
        checked += 1;
        if decoded != *tree {
            mismatches += 1;
            output::print_tree_diff(&tree.pretty(), &decoded.pretty());
        }
    }

    output::print_heading(&format!(
        "checked {checked} examples, {mismatches} mismatches, {skipped} skipped records",
    ));
    if mismatches > 0 {
        return Err(VyakaError::illegal_action(format!(
            "round-trip mismatch in {mismatches} of {checked} examples"
        )));
    }
    Ok(())
}
