//! Hypothesis state machine: frontier selection, legality, termination.

mod common;

use common::{assign_tree, call_tree, grammar_for, query, vocab_with};
use vyaka::action::Action;
use vyaka::config::Config;
use vyaka::decode::{DecodeContext, Hyp};
use vyaka::encode::Encoder;
use vyaka::grammar::Rule;
use vyaka::tree::NodeType;
use vyaka::vocab::EOS_TOKEN;
use vyaka::ErrorCategory;

fn rule_id(grammar: &vyaka::grammar::Grammar, parent: &str, children: &[&str]) -> u32 {
    grammar
        .rule_to_id(&Rule::new(
            NodeType::new(parent),
            children.iter().map(|c| NodeType::new(*c)).collect(),
        ))
        .unwrap()
}

#[test]
fn fresh_hypothesis_is_open_at_root() {
    // Scenario: an empty tree is just `root`, which must itself be
    // expandable in the initial state.
    let tree = call_tree();
    let grammar = grammar_for(&[&tree]);
    let hyp = Hyp::new();
    let frontier = hyp.frontier_nt(&grammar).expect("root must be expandable");
    assert!(hyp.tree().node(frontier).ty.is_root());
    assert!(!hyp.is_terminal(&grammar));
}

#[test]
fn replay_reaches_terminal_exactly_at_the_last_action() {
    let tree = assign_tree("x", "hello");
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["x", "hello"]);
    let config = Config::default();
    let q = query("assign hello to x");
    let encoder = Encoder::new(&grammar, &vocab, &config);
    let actions = encoder.encode(&tree, &q).unwrap();
    let ctx = DecodeContext::new(&grammar, &vocab, &q, &config);

    let mut hyp = Hyp::new();
    for (i, action) in actions.iter().enumerate() {
        assert!(
            !hyp.is_terminal(&grammar),
            "terminal before action {i} of {}",
            actions.len()
        );
        hyp.apply(action, &ctx).unwrap();
    }
    assert!(hyp.is_terminal(&grammar));
}

#[test]
fn frontier_selection_is_deterministic() {
    let tree = assign_tree("x", "hello");
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["x", "hello"]);
    let config = Config::default();
    let q = query("assign hello to x");
    let encoder = Encoder::new(&grammar, &vocab, &config);
    let actions = encoder.encode(&tree, &q).unwrap();
    let ctx = DecodeContext::new(&grammar, &vocab, &q, &config);

    let mut a = Hyp::new();
    let mut b = Hyp::new();
    for action in &actions {
        assert_eq!(a.frontier_nt(&grammar), b.frontier_nt(&grammar));
        a.apply(action, &ctx).unwrap();
        b.apply(action, &ctx).unwrap();
    }
}

#[test]
fn closed_slots_are_never_revisited() {
    let tree = assign_tree("x", "hello");
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["x", "hello"]);
    let config = Config::default();
    let q = query("assign hello to x");
    let encoder = Encoder::new(&grammar, &vocab, &config);
    let actions = encoder.encode(&tree, &q).unwrap();
    let ctx = DecodeContext::new(&grammar, &vocab, &q, &config);

    let mut hyp = Hyp::new();
    let mut seen_frontiers = Vec::new();
    let mut closed = Vec::new();
    for action in &actions {
        let frontier = hyp.frontier_nt(&grammar).unwrap();
        assert!(
            !closed.contains(&frontier),
            "frontier revisited a closed node"
        );
        seen_frontiers.push(frontier);
        if matches!(action, Action::GenToken { token } if token == EOS_TOKEN) {
            closed.push(frontier);
        }
        hyp.apply(action, &ctx).unwrap();
    }
    assert!(!seen_frontiers.is_empty());
}

#[test]
fn open_slots_only_grow_through_rule_expansion() {
    let tree = assign_tree("x", "hello");
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["x", "hello"]);
    let config = Config::default();
    let q = query("assign hello to x");
    let encoder = Encoder::new(&grammar, &vocab, &config);
    let actions = encoder.encode(&tree, &q).unwrap();
    let ctx = DecodeContext::new(&grammar, &vocab, &q, &config);

    let mut hyp = Hyp::new();
    for action in &actions {
        let before = hyp.open_slots(&grammar);
        hyp.apply(action, &ctx).unwrap();
        let after = hyp.open_slots(&grammar);
        match action {
            Action::ApplyRule { .. } => {
                // The frontier closes; the rule's children bound the growth.
                assert!(after >= before - 1);
            }
            Action::GenToken { token } if token == EOS_TOKEN => {
                assert_eq!(after, before - 1, "eos must close exactly one slot");
            }
            _ => assert_eq!(after, before, "token emission keeps the slot open"),
        }
    }
    assert_eq!(hyp.open_slots(&grammar), 0);
}

#[test]
fn token_actions_on_structural_frontier_are_wrong_action_type() {
    let tree = call_tree();
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["foo"]);
    let config = Config::default();
    let q = query("call foo");
    let ctx = DecodeContext::new(&grammar, &vocab, &q, &config);

    // Fresh hypothesis: the frontier is the structural root.
    let mut hyp = Hyp::new();
    let err = hyp
        .apply(
            &Action::GenToken {
                token: "foo".into(),
            },
            &ctx,
        )
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Decode);
    assert!(err.to_string().contains("Wrong action type"));
}

#[test]
fn apply_rule_on_open_value_slot_is_wrong_action_type() {
    let tree = call_tree();
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["foo"]);
    let config = Config::default();
    let q = query("call foo");
    let ctx = DecodeContext::new(&grammar, &vocab, &q, &config);

    let mut hyp = Hyp::new();
    // Expand down to the identifier's value slot.
    for (parent, children) in [
        ("root", vec!["Call"]),
        ("Call", vec!["Name", "arguments"]),
        ("Name", vec!["identifier"]),
        ("identifier", vec!["literal"]),
    ] {
        let id = rule_id(&grammar, parent, &children);
        hyp.apply(&Action::ApplyRule { rule: id }, &ctx).unwrap();
    }
    // The frontier is now the open value slot; re-applying a rule there is
    // the canonical "wrong action type".
    let id = rule_id(&grammar, "identifier", &["literal"]);
    let err = hyp.apply(&Action::ApplyRule { rule: id }, &ctx).unwrap_err();
    assert!(err.to_string().contains("Wrong action type"));
}

#[test]
fn mismatched_rule_parent_is_rejected() {
    let tree = call_tree();
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["foo"]);
    let config = Config::default();
    let q = query("call foo");
    let ctx = DecodeContext::new(&grammar, &vocab, &q, &config);

    let mut hyp = Hyp::new();
    // Frontier is `root`, but the proposed rule expands `Name`.
    let id = rule_id(&grammar, "Name", &["identifier"]);
    let err = hyp.apply(&Action::ApplyRule { rule: id }, &ctx).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Decode);
}

#[test]
fn copy_outside_the_window_is_rejected() {
    let tree = assign_tree("x", "hello");
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["x", "hello"]);
    let config = Config {
        max_query_length: 4,
        ..Config::default()
    };
    let q = query("a b c d e f");
    let ctx = DecodeContext::new(&grammar, &vocab, &q, &config);

    let mut hyp = Hyp::new();
    for (parent, children) in [
        ("root", vec!["Assign"]),
        ("Assign", vec!["Name", "str"]),
        ("Name", vec!["identifier"]),
        ("identifier", vec!["literal"]),
    ] {
        let id = rule_id(&grammar, parent, &children);
        hyp.apply(&Action::ApplyRule { rule: id }, &ctx).unwrap();
    }
    let err = hyp
        .apply(&Action::CopyToken { source_idx: 5 }, &ctx)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Decode);
}

#[test]
fn terminal_hypothesis_rejects_further_actions() {
    let tree = assign_tree("x", "hello");
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["x", "hello"]);
    let config = Config::default();
    let q = query("assign hello to x");
    let encoder = Encoder::new(&grammar, &vocab, &config);
    let actions = encoder.encode(&tree, &q).unwrap();
    let ctx = DecodeContext::new(&grammar, &vocab, &q, &config);

    let mut hyp = Hyp::new();
    for action in &actions {
        hyp.apply(action, &ctx).unwrap();
    }
    let err = hyp
        .apply(
            &Action::GenToken {
                token: EOS_TOKEN.into(),
            },
            &ctx,
        )
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Decode);
}

#[test]
fn branching_clones_the_tree() {
    let tree = assign_tree("x", "hello");
    let grammar = grammar_for(&[&tree]);
    let vocab = vocab_with(&["x", "hello"]);
    let config = Config::default();
    let q = query("assign hello to x");
    let ctx = DecodeContext::new(&grammar, &vocab, &q, &config);

    let mut a = Hyp::new();
    let id = rule_id(&grammar, "root", &["Assign"]);
    a.apply(&Action::ApplyRule { rule: id }, &ctx).unwrap();

    // Branch: the clone owns a private tree; diverging it leaves the
    // original untouched.
    let before = a.tree().clone();
    let mut b = a.clone();
    let id = rule_id(&grammar, "Assign", &["Name", "str"]);
    b.apply(&Action::ApplyRule { rule: id }, &ctx).unwrap();
    b.score += 1.5;

    assert_eq!(*a.tree(), before);
    assert_ne!(*a.tree(), *b.tree());
    assert_eq!(a.score, 0.0);
}
