//! Unified, `miette`-based diagnostics for the Vyaka transducer.
//!
//! Every failure produced by any stage of the pipeline (tree mutation,
//! grammar registration, encoding, decoding, corpus preprocessing) is
//! represented by [`VyakaError`]. The taxonomy is deliberately small and
//! closed: a variant either signals a logic defect (invalid tree mutation,
//! malformed rule, illegal decode action) that must surface immediately, or
//! an example-level corpus problem that callers count and skip.

use std::sync::Arc;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// The single error type for the crate.
///
/// Decode-time legality violations (`WrongActionType`, `IllegalAction`) are
/// safety-net errors: the search policy is responsible for never proposing
/// an illegal action, so hitting one indicates a scorer/search defect, not a
/// recoverable runtime condition.
#[derive(Error, Diagnostic, Debug)]
pub enum VyakaError {
    #[error("Invalid node operation: {message}")]
    #[diagnostic(code(vyaka::tree::invalid_node))]
    InvalidNode {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Grammar error: {message}")]
    #[diagnostic(code(vyaka::grammar::malformed_rule))]
    Grammar {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Wrong action type: {action} proposed at {frontier}")]
    #[diagnostic(code(vyaka::decode::wrong_action_type))]
    WrongActionType {
        action: String,
        frontier: String,
        #[help]
        help: Option<String>,
    },

    #[error("Illegal action: {message}")]
    #[diagnostic(code(vyaka::decode::illegal_action))]
    IllegalAction {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Encoding produced an empty action sequence")]
    #[diagnostic(
        code(vyaka::encode::empty_actions),
        help("the example carries no productions and should be dropped from the corpus")
    )]
    EmptyActionSequence,

    #[error("Malformed corpus record: {message}")]
    #[diagnostic(code(vyaka::corpus::malformed_record))]
    Corpus {
        message: String,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("offending record")]
        span: SourceSpan,
    },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(vyaka::config::invalid))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("I/O error while {context}")]
    #[diagnostic(code(vyaka::io::failure))]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse error classification, used by tests and the CLI summary instead of
/// fragile string matching on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Tree,
    Grammar,
    Decode,
    Encode,
    Corpus,
    Config,
    Io,
}

impl VyakaError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidNode { .. } => ErrorCategory::Tree,
            Self::Grammar { .. } => ErrorCategory::Grammar,
            Self::WrongActionType { .. } | Self::IllegalAction { .. } => ErrorCategory::Decode,
            Self::EmptyActionSequence => ErrorCategory::Encode,
            Self::Corpus { .. } => ErrorCategory::Corpus,
            Self::Config { .. } => ErrorCategory::Config,
            Self::Io { .. } => ErrorCategory::Io,
        }
    }

    // ------------------------------------------------------------------
    // Constructors. Call sites never build variants by hand; these keep
    // message shape consistent across the crate.
    // ------------------------------------------------------------------

    pub fn invalid_node(message: impl Into<String>) -> Self {
        Self::InvalidNode {
            message: message.into(),
            help: None,
        }
    }

    pub fn grammar(message: impl Into<String>) -> Self {
        Self::Grammar {
            message: message.into(),
            help: None,
        }
    }

    pub fn wrong_action_type(action: impl Into<String>, frontier: impl Into<String>) -> Self {
        Self::WrongActionType {
            action: action.into(),
            frontier: frontier.into(),
            help: Some(
                "the search policy must restrict proposals to the frontier's legal action set"
                    .into(),
            ),
        }
    }

    pub fn illegal_action(message: impl Into<String>) -> Self {
        Self::IllegalAction {
            message: message.into(),
            help: None,
        }
    }

    pub fn corpus(message: impl Into<String>, record_name: &str, record: &str) -> Self {
        Self::Corpus {
            message: message.into(),
            src: Arc::new(NamedSource::new(record_name, record.to_string())),
            span: (0..record.len()).into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Attach a help message to variants that carry one.
    pub fn with_help(mut self, suggestion: impl Into<String>) -> Self {
        match &mut self {
            Self::InvalidNode { help, .. }
            | Self::Grammar { help, .. }
            | Self::WrongActionType { help, .. }
            | Self::IllegalAction { help, .. }
            | Self::Config { help, .. } => *help = Some(suggestion.into()),
            Self::EmptyActionSequence | Self::Corpus { .. } | Self::Io { .. } => {}
        }
        self
    }
}

/// Prints an error with full miette diagnostics.
///
/// Use this for user-facing error display in CLI contexts; library callers
/// propagate the error instead.
pub fn print_error(error: VyakaError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}
