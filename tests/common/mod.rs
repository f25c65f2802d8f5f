//! Shared fixtures for the integration suites.
// Not every suite uses every fixture.
#![allow(dead_code)]

use std::sync::Arc;

use vyaka::grammar::Grammar;
use vyaka::tree::{NodeType, Tree};
use vyaka::vocab::Vocab;

/// `root -> Call(Name("foo"), arguments -> epsilon)` — one literal
/// descendant ("foo"), an explicitly empty argument slot.
pub fn call_tree() -> Tree {
    let mut tree = Tree::new();
    let call = tree.create_node(NodeType::new("Call"));
    tree.add_child(tree.root(), call).unwrap();
    let name = tree.create_node(NodeType::new("Name"));
    tree.add_child(call, name).unwrap();
    let ident = tree.create_node(NodeType::new("identifier"));
    tree.add_child(name, ident).unwrap();
    let val = tree
        .create_leaf(NodeType::literal(), Some("foo".into()))
        .unwrap();
    tree.add_child(ident, val).unwrap();
    let args = tree.create_node(NodeType::new("arguments"));
    tree.add_child(call, args).unwrap();
    let eps = tree.create_node(NodeType::epsilon());
    tree.add_child(args, eps).unwrap();
    tree
}

/// `root -> Assign(Name(name), str(value))`.
pub fn assign_tree(name: &str, value: &str) -> Tree {
    let mut tree = Tree::new();
    let assign = tree.create_node(NodeType::new("Assign"));
    tree.add_child(tree.root(), assign).unwrap();
    let target = tree.create_node(NodeType::new("Name"));
    tree.add_child(assign, target).unwrap();
    let ident = tree.create_node(NodeType::new("identifier"));
    tree.add_child(target, ident).unwrap();
    let ident_val = tree
        .create_leaf(NodeType::literal(), Some(name.into()))
        .unwrap();
    tree.add_child(ident, ident_val).unwrap();
    let string = tree.create_node(NodeType::new("str"));
    tree.add_child(assign, string).unwrap();
    let string_val = tree
        .create_leaf(NodeType::literal(), Some(value.into()))
        .unwrap();
    tree.add_child(string, string_val).unwrap();
    tree
}

/// A frozen grammar covering the given trees.
pub fn grammar_for(trees: &[&Tree]) -> Arc<Grammar> {
    let mut grammar = Grammar::new();
    for tree in trees {
        grammar.register_tree(tree).unwrap();
    }
    grammar.freeze();
    Arc::new(grammar)
}

/// A terminal vocabulary seeded with the given tokens.
pub fn vocab_with(tokens: &[&str]) -> Arc<Vocab> {
    let mut vocab = Vocab::new();
    for token in tokens {
        vocab.insert(token);
    }
    Arc::new(vocab)
}

/// Splits a query sentence into owned tokens.
pub fn query(words: &str) -> Vec<String> {
    words.split_whitespace().map(str::to_string).collect()
}
