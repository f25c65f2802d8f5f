//! Defines the command-line arguments and subcommands for the Vyaka CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "vyaka",
    version,
    about = "A grammar-constrained AST/action transducer for semantic-parsing code generation."
)]
pub struct VyakaArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Clean, encode, and serialize a corpus into training matrices.
    Preprocess {
        /// The annotation file: one natural-language query per line.
        #[arg(required = true)]
        annot: PathBuf,
        /// The tree corpus: a JSON-lines file or a directory of shards.
        #[arg(required = true)]
        trees: PathBuf,
        /// Output path for the serialized dataset.
        #[arg(short, long, default_value = "dataset.json")]
        out: PathBuf,
        /// Optional YAML file overriding the default limits and policies.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Extract a grammar from a tree corpus and print its rules.
    Grammar {
        /// The tree corpus: a JSON-lines file or a directory of shards.
        #[arg(required = true)]
        trees: PathBuf,
    },
    /// Verify the encode/decode round-trip over a corpus.
    Check {
        /// The annotation file: one natural-language query per line.
        #[arg(required = true)]
        annot: PathBuf,
        /// The tree corpus: a JSON-lines file or a directory of shards.
        #[arg(required = true)]
        trees: PathBuf,
        /// Optional YAML file overriding the default limits and policies.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
