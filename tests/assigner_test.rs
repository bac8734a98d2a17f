//! Tests for the tree time assigner

use serde_json::json;

use timeassign::domain::{assign, assign_scoped, AssignReport, Node, Scope};
use timeassign::util::testing::{init_test_setup, node};

#[ctor::ctor]
fn init() {
    init_test_setup();
}

/// Follow child indices from `root`.
fn at<'a>(root: &'a Node, path: &[usize]) -> &'a Node {
    path.iter().fold(root, |n, &i| &n.children[i])
}

fn estimate(root: &Node, path: &[usize]) -> Option<i64> {
    at(root, path).estimated_time()
}

fn leaf() -> serde_json::Value {
    json!({"children": []})
}

fn timed_leaf(time: serde_json::Value) -> serde_json::Value {
    json!({"children": [], "variables": {"time": time}})
}

fn visit<'a>(n: &'a Node, out: &mut Vec<&'a Node>) {
    out.push(n);
    for child in &n.children {
        visit(child, out);
    }
}

fn all_nodes(root: &Node) -> Vec<&Node> {
    let mut out = Vec::new();
    visit(root, &mut out);
    out
}

// ============================================================
// Distribution
// ============================================================

#[test]
fn given_owner_with_three_open_leaves_when_assigning_then_first_leaf_gets_remainder() {
    let mut root = node(json!({
        "children": [
            {"variables": {"time": 100}, "children": [leaf(), leaf(), leaf()]}
        ]
    }));

    let report = assign(&mut root);

    assert_eq!(estimate(&root, &[0, 0]), Some(34));
    assert_eq!(estimate(&root, &[0, 1]), Some(33));
    assert_eq!(estimate(&root, &[0, 2]), Some(33));
    assert_eq!(report.owners, 1);
    assert_eq!(report.distributed, 3);
}

#[test]
fn given_leaf_with_explicit_time_when_assigning_then_remainder_excludes_it() {
    let mut root = node(json!({
        "children": [
            {"variables": {"time": 100}, "children": [timed_leaf(json!(40)), leaf(), leaf()]}
        ]
    }));

    let report = assign(&mut root);

    assert_eq!(estimate(&root, &[0, 0]), Some(40));
    assert_eq!(estimate(&root, &[0, 1]), Some(30));
    assert_eq!(estimate(&root, &[0, 2]), Some(30));
    assert_eq!(report.explicit, 1);
    assert_eq!(report.distributed, 2);
}

#[test]
fn given_string_times_when_assigning_then_they_are_parsed() {
    let mut root = node(json!({
        "children": [
            {"variables": {"time": "50"}, "children": [timed_leaf(json!("20")), leaf()]}
        ]
    }));

    assign(&mut root);

    assert_eq!(estimate(&root, &[0, 0]), Some(20));
    assert_eq!(estimate(&root, &[0, 1]), Some(30));
}

#[test]
fn given_unparseable_leaf_time_when_assigning_then_leaf_shares_budget() {
    let mut root = node(json!({
        "children": [
            {"variables": {"time": 100}, "children": [timed_leaf(json!("not-a-number")), leaf(), leaf()]}
        ]
    }));

    assign(&mut root);

    assert_eq!(estimate(&root, &[0, 0]), Some(34));
    assert_eq!(estimate(&root, &[0, 1]), Some(33));
    assert_eq!(estimate(&root, &[0, 2]), Some(33));
}

#[test]
fn given_exclusion_exceeding_budget_when_assigning_then_open_leaves_get_zero() {
    let mut root = node(json!({
        "children": [
            {"variables": {"time": 10}, "children": [timed_leaf(json!(30)), leaf(), leaf()]}
        ]
    }));

    assign(&mut root);

    assert_eq!(estimate(&root, &[0, 0]), Some(30));
    assert_eq!(estimate(&root, &[0, 1]), Some(0));
    assert_eq!(estimate(&root, &[0, 2]), Some(0));
}

#[test]
fn given_owner_without_open_leaves_when_assigning_then_nothing_is_distributed() {
    let mut root = node(json!({
        "children": [
            {"variables": {"time": 10}, "children": [timed_leaf(json!(4))]}
        ]
    }));

    let report = assign(&mut root);

    assert_eq!(estimate(&root, &[0, 0]), Some(4));
    assert_eq!(report.distributed, 0);
}

#[test]
fn given_open_leaves_in_nested_groups_when_assigning_then_order_follows_preorder() {
    // owner(7) -> [group -> [a, b], c]: preorder of open leaves is a, b, c
    let mut root = node(json!({
        "variables": {"time": 7},
        "children": [
            {"children": [leaf(), leaf()]},
            leaf()
        ]
    }));

    assign(&mut root);

    assert_eq!(estimate(&root, &[0, 0]), Some(3));
    assert_eq!(estimate(&root, &[0, 1]), Some(2));
    assert_eq!(estimate(&root, &[1]), Some(2));
}

// ============================================================
// Ownership
// ============================================================

#[test]
fn given_nested_owners_when_assigning_then_nearest_owner_wins() {
    let mut root = node(json!({
        "variables": {"time": 100},
        "children": [
            {"variables": {"time": 60}, "children": [leaf(), leaf()]},
            leaf()
        ]
    }));

    let report = assign(&mut root);

    assert_eq!(estimate(&root, &[0, 0]), Some(30));
    assert_eq!(estimate(&root, &[0, 1]), Some(30));
    // the inner owner's 60 is excluded from the outer budget
    assert_eq!(estimate(&root, &[1]), Some(40));
    assert_eq!(report.owners, 2);
    assert_eq!(estimate(&root, &[0]), None);
}

#[test]
fn given_leaf_without_any_owner_when_assigning_then_it_stays_unassigned() {
    let mut root = node(json!({"children": [{"children": [leaf()]}]}));

    let report = assign(&mut root);

    assert_eq!(estimate(&root, &[0, 0]), None);
    assert!(at(&root, &[0, 0]).initial_values.is_none());
    assert_eq!(report.unassigned, 1);
}

#[test]
fn given_leaf_with_time_but_no_owner_when_assigning_then_it_keeps_its_time() {
    let mut root = node(json!({"children": [timed_leaf(json!(12))]}));

    assign(&mut root);

    assert_eq!(estimate(&root, &[0]), Some(12));
}

// ============================================================
// Default time
// ============================================================

#[test]
fn given_default_time_above_leaf_when_no_owner_then_leaf_gets_default() {
    let mut root = node(json!({
        "children": [
            {
                "variables": {"default_time": 5},
                "children": [{"children": [leaf()]}]
            }
        ]
    }));

    let report = assign(&mut root);

    assert_eq!(estimate(&root, &[0, 0, 0]), Some(5));
    assert_eq!(report.defaulted, 1);
    assert_eq!(report.unassigned, 0);
}

#[test]
fn given_default_time_below_owner_when_assigning_then_defaults_are_excluded_from_budget() {
    let mut root = node(json!({
        "variables": {"time": 100},
        "children": [
            {"variables": {"default_time": 10}, "children": [leaf(), leaf()]},
            leaf()
        ]
    }));

    assign(&mut root);

    assert_eq!(estimate(&root, &[0, 0]), Some(10));
    assert_eq!(estimate(&root, &[0, 1]), Some(10));
    assert_eq!(estimate(&root, &[1]), Some(80));
}

#[test]
fn given_two_defaults_on_path_when_assigning_then_nearest_default_wins() {
    let mut root = node(json!({
        "variables": {"default_time": 9},
        "children": [
            {"variables": {"default_time": 3}, "children": [leaf()]}
        ]
    }));

    assign(&mut root);

    assert_eq!(estimate(&root, &[0, 0]), Some(3));
}

#[test]
fn given_default_time_on_owner_itself_when_assigning_then_budget_wins() {
    let mut root = node(json!({
        "variables": {"time": 20, "default_time": 3},
        "children": [leaf(), leaf()]
    }));

    assign(&mut root);

    assert_eq!(estimate(&root, &[0]), Some(10));
    assert_eq!(estimate(&root, &[1]), Some(10));
}

// ============================================================
// Exclusion
// ============================================================

#[test]
fn given_cancelled_leaf_when_assigning_then_it_is_skipped() {
    let mut root = node(json!({
        "children": [
            {
                "variables": {"time": 10},
                "children": [
                    {"children": [], "initialValues": {"result": "-cancelled"}},
                    leaf(),
                    leaf()
                ]
            }
        ]
    }));

    let report = assign(&mut root);

    assert_eq!(estimate(&root, &[0, 0]), None);
    assert_eq!(estimate(&root, &[0, 1]), Some(5));
    assert_eq!(estimate(&root, &[0, 2]), Some(5));
    assert_eq!(report.excluded, 1);
}

#[test]
fn given_cancelled_leaf_with_time_when_assigning_then_it_neither_gets_nor_claims_time() {
    let mut root = node(json!({
        "variables": {"time": 10},
        "children": [
            {"children": [], "variables": {"time": 3}, "initialValues": {"result": "-dropped"}},
            leaf()
        ]
    }));

    assign(&mut root);

    assert_eq!(estimate(&root, &[0]), None);
    assert_eq!(estimate(&root, &[1]), Some(10));
}

#[test]
fn given_cancelled_group_when_assigning_then_its_leaves_still_count() {
    let mut root = node(json!({
        "variables": {"time": 10},
        "children": [
            {"initialValues": {"result": "-group"}, "children": [leaf()]}
        ]
    }));

    assign(&mut root);

    assert_eq!(estimate(&root, &[0, 0]), Some(10));
}

#[test]
fn given_result_without_dash_when_assigning_then_leaf_is_included() {
    let mut root = node(json!({
        "variables": {"time": 10},
        "children": [
            {"children": [], "initialValues": {"result": "ok"}},
            leaf()
        ]
    }));

    assign(&mut root);

    assert_eq!(estimate(&root, &[0]), Some(5));
    assert_eq!(estimate(&root, &[1]), Some(5));
}

// ============================================================
// Cleanup
// ============================================================

#[test]
fn given_assigned_tree_then_no_run_fields_remain() {
    let mut root = node(json!({
        "variables": {"time": 30, "note": "keep"},
        "parent": "stale",
        "children": [
            {"variables": {"default_time": 2}, "affectNodes": [], "children": [leaf()]},
            {"exclusionTime": 4, "children": [leaf()]}
        ]
    }));

    assign(&mut root);

    for n in all_nodes(&root) {
        if let Some(vars) = &n.variables {
            assert!(!vars.contains_key("time"));
            assert!(!vars.contains_key("default_time"));
        }
        for field in ["parent", "affectNodes", "exclusionTime"] {
            assert!(!n.extra.contains_key(field), "{} left behind", field);
        }
    }
    assert_eq!(
        root.variables.as_ref().and_then(|v| v.get("note")),
        Some(&json!("keep"))
    );
}

#[test]
fn given_unknown_fields_when_assigning_then_they_round_trip() {
    let mut root = node(json!({
        "name": "plan",
        "children": [
            {
                "title": "sheet",
                "meta": {"color": "red"},
                "variables": {"time": 4},
                "initialValues": {"result": "", "owner": "ann"},
                "children": [leaf()]
            }
        ]
    }));

    assign(&mut root);

    assert_eq!(root.extra.get("name"), Some(&json!("plan")));
    let sheet = at(&root, &[0]);
    assert_eq!(sheet.extra.get("meta"), Some(&json!({"color": "red"})));
    assert_eq!(
        sheet.initial_values.as_ref().and_then(|v| v.get("owner")),
        Some(&json!("ann"))
    );
    assert_eq!(estimate(&root, &[0, 0]), Some(4));
}

#[test]
fn given_tree_assigned_twice_then_second_run_has_no_inputs_left() {
    let mut root = node(json!({
        "variables": {"time": 10},
        "children": [leaf(), leaf()]
    }));

    assign(&mut root);
    let report = assign(&mut root);

    assert_eq!(report.owners, 0);
    // estimates of the first run are kept
    assert_eq!(estimate(&root, &[0]), Some(5));
    assert_eq!(estimate(&root, &[1]), Some(5));
}

// ============================================================
// Scope
// ============================================================

fn sheets() -> Node {
    node(json!({
        "variables": {"time": 100},
        "children": [
            {"variables": {"time": 10}, "children": [leaf()]},
            {"children": [leaf()]}
        ]
    }))
}

#[test]
fn given_document_scope_when_assigning_then_root_budget_applies() {
    let mut root = sheets();

    assign_scoped(&mut root, Scope::Document);

    assert_eq!(estimate(&root, &[0, 0]), Some(10));
    assert_eq!(estimate(&root, &[1, 0]), Some(90));
    assert!(!root.variables.as_ref().unwrap().contains_key("time"));
}

#[test]
fn given_sheet_scope_when_assigning_then_each_sheet_runs_alone() {
    let mut root = sheets();

    let report = assign_scoped(&mut root, Scope::Sheet);

    assert_eq!(estimate(&root, &[0, 0]), Some(10));
    assert_eq!(estimate(&root, &[1, 0]), None);
    assert_eq!(root.variables.as_ref().unwrap().get("time"), Some(&json!(100)));
    assert_eq!(
        report,
        AssignReport {
            nodes: 4,
            owners: 1,
            distributed: 1,
            unassigned: 1,
            ..Default::default()
        }
    );
}
