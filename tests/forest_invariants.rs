//! 任意记录输入下的森林不变量

use proptest::prelude::*;

use flat_tree_view::model::state::{ancestors_of, find};
use flat_tree_view::model::tree::flatten;
use flat_tree_view::{assemble, propagate, AssemblyOptions, FlatRecord, NodeId, PropagationPolicy, TreeNode};

/// 每条记录的父节点只能是更早生成的记录，之后打乱顺序
fn records() -> impl Strategy<Value = Vec<FlatRecord>> {
    (1usize..60)
        .prop_flat_map(|n| {
            (0..n)
                .map(|i| {
                    if i == 0 {
                        Just(None).boxed()
                    } else {
                        proptest::option::of(0..i).boxed()
                    }
                })
                .collect::<Vec<_>>()
        })
        .prop_map(|parents| {
            parents
                .into_iter()
                .enumerate()
                .map(|(i, parent)| {
                    FlatRecord::new(format!("n{i}"), format!("node {i}"), parent.map(|p| NodeId::new(format!("n{p}"))))
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

/// 记录列表与其中一条记录的下标
fn records_with_active() -> impl Strategy<Value = (Vec<FlatRecord>, usize)> {
    records().prop_flat_map(|recs| {
        let n = recs.len();
        (Just(recs), 0..n)
    })
}

fn sorted_ids<'a>(ids: impl Iterator<Item = &'a NodeId>) -> Vec<&'a str> {
    let mut ids: Vec<&str> = ids.map(NodeId::as_str).collect();
    ids.sort_unstable();
    ids
}

fn build(records: &[FlatRecord]) -> Vec<TreeNode> {
    assemble(records, &AssemblyOptions::default()).expect("生成的记录总能组装")
}

proptest! {
    #[test]
    fn every_id_appears_exactly_once(recs in records()) {
        let forest = build(&recs);
        let seen: Vec<&NodeId> = flatten(&forest).map(|n| &n.id).collect();
        prop_assert_eq!(seen.len(), recs.len());
        prop_assert_eq!(sorted_ids(seen.into_iter()), sorted_ids(recs.iter().map(|r| &r.id)));
        for root in &forest {
            prop_assert!(root.is_root());
        }
    }

    #[test]
    fn assembly_is_idempotent(recs in records()) {
        prop_assert_eq!(build(&recs), build(&recs));
    }

    #[test]
    fn folder_iff_children(recs in records()) {
        for node in flatten(&build(&recs)) {
            prop_assert_eq!(node.state.folder, !node.children.is_empty());
        }
    }

    #[test]
    fn active_path_and_subtree_are_opened((recs, active) in records_with_active()) {
        let base = build(&recs);
        let active_id = recs[active].id.clone();
        let forest = propagate(&base, Some(&active_id), &PropagationPolicy::default());

        let target = find(&forest, &active_id).expect("活动节点存在");
        for node in target.iter() {
            prop_assert!(node.state.opened, "后代 {} 应展开", node.id);
        }
        for ancestor in ancestors_of(&forest, &active_id).expect("活动节点存在") {
            prop_assert!(ancestor.state.opened, "祖先 {} 应展开", ancestor.id);
        }
        for root in &forest {
            prop_assert!(root.state.opened);
        }

        // 传播不改变结构
        let before: Vec<&str> = flatten(&base).map(|n| n.id.as_str()).collect();
        let after: Vec<&str> = flatten(&forest).map(|n| n.id.as_str()).collect();
        prop_assert_eq!(before, after);
    }
}
