//! Property-based tests for transactional edits
//!
//! Uses proptest to check that commit keeps every edit and rollback
//! restores the exact rendering captured at transaction start.

use proptest::prelude::*;
use sexpr_tree::{Atom, List};

#[derive(Debug, Clone)]
enum Edit {
    Add(String),
    Insert(usize, String),
    Remove(usize),
}

fn atom_value() -> impl Strategy<Value = String> {
    "[a-z]{1,6}"
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        atom_value().prop_map(Edit::Add),
        (0usize..8, atom_value()).prop_map(|(i, v)| Edit::Insert(i, v)),
        (0usize..8).prop_map(Edit::Remove),
    ]
}

fn build(values: &[String]) -> List {
    let root = List::new();
    for value in values {
        root.add(Atom::new(value.clone())).unwrap();
    }
    root
}

/// Lenient edits, mirrored on a plain Vec.
fn apply(list: &List, model: &mut Vec<String>, edit: &Edit) {
    match edit {
        Edit::Add(value) => {
            list.add(Atom::new(value.clone())).unwrap();
            model.push(value.clone());
        }
        Edit::Insert(index, value) => {
            list.insert(*index, Atom::new(value.clone())).unwrap();
            if *index <= model.len() {
                model.insert(*index, value.clone());
            }
        }
        Edit::Remove(index) => {
            let removed = list.remove(*index).unwrap();
            if *index < model.len() {
                let expected = model.remove(*index);
                assert_eq!(removed.unwrap().value().unwrap(), expected);
            } else {
                assert!(removed.is_none());
            }
        }
    }
}

fn render(values: &[String]) -> String {
    let mut out = String::from("(");
    for value in values {
        out.push_str(value);
        out.push(' ');
    }
    out.push(')');
    out
}

proptest! {
    #[test]
    fn commit_keeps_prior_children_and_addition(
        initial in prop::collection::vec(atom_value(), 0..8),
        extra in atom_value(),
    ) {
        let root = build(&initial);

        root.transaction_start().unwrap();
        root.add(Atom::new(extra.clone())).unwrap();
        root.transaction_commit().unwrap();

        let mut expected = initial.clone();
        expected.push(extra);
        prop_assert_eq!(root.len().unwrap(), expected.len());
        prop_assert_eq!(root.print().unwrap(), render(&expected));
    }

    #[test]
    fn rollback_restores_rendering(
        initial in prop::collection::vec(atom_value(), 0..8),
        edits in prop::collection::vec(edit_strategy(), 0..16),
    ) {
        let root = build(&initial);
        let before = root.print().unwrap();

        root.transaction_start().unwrap();
        let mut model = initial.clone();
        for edit in &edits {
            apply(&root, &mut model, edit);
        }
        prop_assert_eq!(root.print().unwrap(), render(&model));
        root.transaction_rollback().unwrap();

        prop_assert_eq!(root.print().unwrap(), before);
        prop_assert!(root.active_token().unwrap().is_none());
    }

    #[test]
    fn edits_match_vec_model(
        initial in prop::collection::vec(atom_value(), 0..8),
        edits in prop::collection::vec(edit_strategy(), 0..24),
    ) {
        let root = build(&initial);
        let mut model = initial.clone();
        for edit in &edits {
            apply(&root, &mut model, edit);
        }

        prop_assert_eq!(root.print().unwrap(), render(&model));
    }
}
