//! Encoder behavior and the encode/decode round-trip law.

mod common;

use common::{assign_tree, call_tree, grammar_for, query, vocab_with};
use vyaka::action::Action;
use vyaka::config::{Config, TokenizationPolicy};
use vyaka::decode::{decode_actions, DecodeContext};
use vyaka::encode::Encoder;
use vyaka::vocab::EOS_TOKEN;

fn is_eos(action: &Action) -> bool {
    matches!(action, Action::GenToken { token } if token == EOS_TOKEN)
}

#[test]
fn encoding_is_deterministic() {
    let tree = assign_tree("x", "hello");
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["x", "hello"]);
    let config = Config::default();
    let encoder = Encoder::new(&grammar, &vocab, &config);
    let q = query("assign hello to x");

    let first = encoder.encode(&tree, &q).unwrap();
    let second = encoder.encode(&tree, &q).unwrap();
    assert_eq!(first, second);
    // Byte-identical under serialization too.
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn round_trip_reconstructs_the_tree() {
    let tree = assign_tree("x", "hello");
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["x", "hello"]);
    let config = Config::default();
    let encoder = Encoder::new(&grammar, &vocab, &config);
    let q = query("assign hello to x");

    let actions = encoder.encode(&tree, &q).unwrap();
    let ctx = DecodeContext::new(&grammar, &vocab, &q, &config);
    let decoded = decode_actions(&actions, &ctx).unwrap();
    assert_eq!(decoded.normalized(), tree);
}

#[test]
fn round_trip_holds_for_out_of_query_literals() {
    // Nothing in the query matches the literals: pure generation path.
    let tree = assign_tree("counter", "unmatched");
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&[]);
    let config = Config::default();
    let encoder = Encoder::new(&grammar, &vocab, &config);
    let q = query("an unrelated sentence");

    let actions = encoder.encode(&tree, &q).unwrap();
    assert!(actions
        .iter()
        .all(|a| !matches!(a, Action::CopyToken { .. } | Action::GenCopyToken { .. })));
    let ctx = DecodeContext::new(&grammar, &vocab, &q, &config);
    assert_eq!(decode_actions(&actions, &ctx).unwrap().normalized(), tree);
}

#[test]
fn round_trip_preserves_separator_literals() {
    let tree = assign_tree("x", "hello-SP-world");
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["hello", "world"]);
    let config = Config::default();
    let encoder = Encoder::new(&grammar, &vocab, &config);
    let q = query("join hello and world");

    let actions = encoder.encode(&tree, &q).unwrap();
    let ctx = DecodeContext::new(&grammar, &vocab, &q, &config);
    assert_eq!(decode_actions(&actions, &ctx).unwrap().normalized(), tree);
}

#[test]
fn structural_prefix_has_no_token_actions() {
    // Scenario: root -> Call(Name("foo"), args=[]) yields only APPLY_RULE
    // actions until the literal is reached.
    let tree = call_tree();
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["foo"]);
    let config = Config::default();
    let encoder = Encoder::new(&grammar, &vocab, &config);

    let actions = encoder.encode(&tree, &query("call foo please")).unwrap();
    // Pre-order productions: root, Call, Name, identifier(builtin) — four
    // rule applications before any token is emitted.
    assert!(actions[..4]
        .iter()
        .all(|a| matches!(a, Action::ApplyRule { .. })));
    assert!(actions[4].emits_token());
}

#[test]
fn unmatched_literal_generates_then_closes() {
    // Scenario: literal "abc" absent from the query, whole-string policy:
    // exactly GEN_TOKEN("abc") then GEN_TOKEN(<eos>).
    let tree = assign_tree("x", "abc");
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["x"]);
    let config = Config {
        tokenization: TokenizationPolicy::WholeString,
        ..Config::default()
    };
    let encoder = Encoder::new(&grammar, &vocab, &config);

    let actions = encoder.encode(&tree, &query("set it")).unwrap();
    let str_tokens: Vec<&Action> = actions.iter().filter(|a| a.emits_token()).collect();
    // identifier slot: GEN(x) GEN(eos); str slot: GEN(abc) GEN(eos).
    assert_eq!(str_tokens.len(), 4);
    assert!(matches!(str_tokens[2], Action::GenToken { token } if token == "abc"));
    assert!(is_eos(str_tokens[3]));
}

#[test]
fn matched_known_literal_uses_gen_copy() {
    // Scenario: literal equals the query token at index 2 and is known in
    // the terminal vocabulary: one GEN_COPY_TOKEN then eos.
    let tree = assign_tree("x", "flag");
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["x", "flag"]);
    let config = Config::default();
    let encoder = Encoder::new(&grammar, &vocab, &config);

    let actions = encoder.encode(&tree, &query("please set flag now")).unwrap();
    assert!(actions.contains(&Action::GenCopyToken {
        source_idx: 2,
        literal: "flag".into(),
    }));
}

#[test]
fn matched_unknown_literal_copies_only() {
    let tree = assign_tree("x", "obscure");
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["x"]); // "obscure" resolves to <unk>
    let config = Config::default();
    let encoder = Encoder::new(&grammar, &vocab, &config);

    let actions = encoder.encode(&tree, &query("set obscure thing")).unwrap();
    assert!(actions.contains(&Action::CopyToken { source_idx: 1 }));
    assert!(!actions
        .iter()
        .any(|a| matches!(a, Action::GenCopyToken { .. })));
}

#[test]
fn copy_indices_stay_inside_the_window() {
    let tree = assign_tree("x", "needle");
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["x", "needle"]);
    let config = Config {
        max_query_length: 4,
        ..Config::default()
    };
    let encoder = Encoder::new(&grammar, &vocab, &config);

    // "needle" appears only at index 5, outside the 4-token window.
    let q = query("a b c d e needle");
    let actions = encoder.encode(&tree, &q).unwrap();
    for action in &actions {
        match action {
            Action::CopyToken { source_idx } | Action::GenCopyToken { source_idx, .. } => {
                assert!(*source_idx < config.max_query_length);
            }
            _ => {}
        }
    }
    // And the out-of-window match fell back to generation.
    assert!(actions.contains(&Action::GenToken {
        token: "needle".into()
    }));
}

#[test]
fn every_value_slot_closes_with_exactly_one_eos() {
    let tree = assign_tree("x", "a-SP-b");
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["x", "a", "b"]);
    let config = Config::default();
    let encoder = Encoder::new(&grammar, &vocab, &config);

    let actions = encoder.encode(&tree, &query("set a to b")).unwrap();
    // Split into token runs delimited by rule applications; each nonempty
    // run is one value slot's sub-sequence.
    let mut runs: Vec<Vec<&Action>> = vec![Vec::new()];
    for action in &actions {
        if matches!(action, Action::ApplyRule { .. }) {
            if !runs.last().unwrap().is_empty() {
                runs.push(Vec::new());
            }
        } else {
            runs.last_mut().unwrap().push(action);
        }
    }
    let runs: Vec<Vec<&Action>> = runs.into_iter().filter(|r| !r.is_empty()).collect();
    assert_eq!(runs.len(), 2); // identifier slot + str slot
    for run in runs {
        assert!(is_eos(run.last().unwrap()));
        assert_eq!(run.iter().filter(|a| is_eos(a)).count(), 1);
    }
}

#[test]
fn empty_trees_are_reported_not_panicked() {
    let tree = call_tree();
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&[]);
    let config = Config::default();
    let encoder = Encoder::new(&grammar, &vocab, &config);

    let err = encoder
        .encode(&vyaka::tree::Tree::new(), &query("anything"))
        .unwrap_err();
    assert_eq!(err.category(), vyaka::ErrorCategory::Encode);
}
