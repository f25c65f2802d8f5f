//! Handles all user-facing output for the CLI.
//!
//! Centralizing the pretty-printing, colorizing, and diff rendering here
//! keeps the command handlers focused on orchestration and the output
//! consistent across subcommands.

use difference::{Changeset, Difference};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::dataset::PreprocessStats;

/// Color only when stdout is a terminal.
pub fn color_choice() -> ColorChoice {
    if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

/// Prints the aggregate preprocessing counters.
///
/// Dropped-example counters are warnings, not failures: the batch
/// succeeded, and these numbers are the corpus-cleaning signal.
pub fn print_stats(stats: &PreprocessStats) {
    let mut stdout = StandardStream::stdout(color_choice());

    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
    println!("--- preprocessing summary ---");
    let _ = stdout.reset();

    println!("examples seen:          {}", stats.examples_seen);
    println!("examples kept:          {}", stats.examples_kept);
    println!("max query length:       {}", stats.max_query_len);
    println!("max action length:      {}", stats.max_action_len);
    println!("unknown query tokens:   {}", stats.unknown_query_tokens);

    let dropped = stats.corpus_errors + stats.empty_action_sequences;
    if dropped > 0 {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        println!("corpus errors:          {}", stats.corpus_errors);
        println!("empty action sequences: {}", stats.empty_action_sequences);
        let _ = stdout.reset();
    }
}

/// Prints a line-level colored diff between the expected and the decoded
/// rendering of a tree.
pub fn print_tree_diff(expected: &str, actual: &str) {
    let mut stdout = StandardStream::stdout(color_choice());
    let changeset = Changeset::new(expected, actual, "\n");
    for diff in &changeset.diffs {
        match diff {
            Difference::Same(x) => {
                let _ = stdout.reset();
                println!(" {}", x);
            }
            Difference::Add(x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
                println!("+{}", x);
            }
            Difference::Rem(x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
                println!("-{}", x);
            }
        }
    }
    let _ = stdout.reset();
}

/// Prints a headline in bold.
pub fn print_heading(text: &str) {
    let mut stdout = StandardStream::stdout(color_choice());
    let _ = stdout.set_color(ColorSpec::new().set_bold(true));
    println!("{text}");
    let _ = stdout.reset();
}
