//! 树构建：扁平记录 -> 去重后的嵌套森林
//!
//! 两遍算法，节点先放进以下标寻址的槽位表（arena），父子关系记录在邻接表里，
//! 最后自底向上物化为独占子节点的 `TreeNode`。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::config::{DanglingPolicy, DuplicatePolicy};
use crate::model::controller::TreeError;
use crate::model::record::{FlatRecord, NodeId};

/// 节点显示状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    /// 是否展开（由状态传播计算）
    pub opened: bool,
    /// 是否为文件夹：当且仅当存在子节点
    pub folder: bool,
}

/// 森林节点
///
/// `Clone` 与 `Drop` 都用显式栈实现，深链不会耗尽线程栈。
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(rename = "_id")]
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "parentId")]
    pub parent_id: Option<NodeId>,
    pub state: NodeState,
    /// 子节点，顺序与输入记录顺序一致
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn from_record(record: &FlatRecord, children: Vec<TreeNode>) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            parent_id: record.parent().cloned(),
            state: NodeState {
                opened: false,
                folder: !children.is_empty(),
            },
            children,
        }
    }

    fn with_children(&self, children: Vec<TreeNode>) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            parent_id: self.parent_id.clone(),
            state: self.state,
            children,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// 先序遍历（自身在前，子节点按顺序）
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    /// 对自身及所有后代执行 `f`（顺序不保证）
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut TreeNode)) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            f(node);
            stack.extend(node.children.iter_mut());
        }
    }
}

impl Clone for TreeNode {
    fn clone(&self) -> Self {
        self.with_children(clone_forest(&self.children))
    }
}

impl Drop for TreeNode {
    fn drop(&mut self) {
        // 子节点挪到本地栈上逐个释放，出栈的节点已没有子节点
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// 深拷贝一组兄弟节点
pub fn clone_forest(nodes: &[TreeNode]) -> Vec<TreeNode> {
    // (剩余的源子节点, 源父节点, 已复制的子节点)
    let mut stack: Vec<(std::slice::Iter<'_, TreeNode>, Option<&TreeNode>, Vec<TreeNode>)> =
        vec![(nodes.iter(), None, Vec::with_capacity(nodes.len()))];
    while let Some((mut rest, parent, copied)) = stack.pop() {
        if let Some(child) = rest.next() {
            stack.push((rest, parent, copied));
            stack.push((child.children.iter(), Some(child), Vec::with_capacity(child.children.len())));
            continue;
        }
        let Some(source) = parent else {
            return copied;
        };
        if let Some((_, _, siblings)) = stack.last_mut() {
            siblings.push(source.with_children(copied));
        }
    }
    Vec::new()
}

pub struct PreOrder<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// 森林的先序遍历
pub fn flatten(roots: &[TreeNode]) -> impl Iterator<Item = &TreeNode> {
    roots.iter().flat_map(TreeNode::iter)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyOptions {
    pub dangling: DanglingPolicy,
    pub duplicates: DuplicatePolicy,
}

/// 将扁平记录组装成森林，返回根节点序列
///
/// 根的顺序即其在输入中首次出现的顺序；每个节点恰好出现一次。
pub fn assemble(records: &[FlatRecord], options: &AssemblyOptions) -> Result<Vec<TreeNode>, TreeError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    // 第一遍：id -> 槽位
    let mut index: HashMap<&NodeId, usize> = HashMap::with_capacity(records.len());
    let mut slots: Vec<&FlatRecord> = Vec::with_capacity(records.len());
    for record in records {
        match index.get(&record.id) {
            Some(&slot) => match options.duplicates {
                DuplicatePolicy::LastWriteWins => {
                    tracing::warn!("重复的节点ID {}，后写覆盖", record.id);
                    slots[slot] = record;
                }
                DuplicatePolicy::Reject => return Err(TreeError::DuplicateId(record.id.clone())),
            },
            None => {
                index.insert(&record.id, slots.len());
                slots.push(record);
            }
        }
    }

    // 第二遍：父 -> 子 邻接表，未挂到父节点上的就是根
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];
    let mut roots: Vec<usize> = Vec::new();
    for (i, record) in slots.iter().enumerate() {
        let Some(parent_id) = record.parent() else {
            roots.push(i);
            continue;
        };
        match index.get(parent_id) {
            Some(&p) => children[p].push(i),
            None => match options.dangling {
                DanglingPolicy::Reject => {
                    return Err(TreeError::MalformedRecord {
                        id: record.id.clone(),
                        parent_id: parent_id.clone(),
                    })
                }
                DanglingPolicy::ImplicitRoot => {
                    tracing::warn!("节点 {} 的父节点 {} 不存在，作为根节点处理", record.id, parent_id);
                    roots.push(i);
                }
            },
        }
    }

    // 从根出发的先序；到不了的节点一定处在父链环中
    let mut order: Vec<usize> = Vec::with_capacity(slots.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(i) = stack.pop() {
        order.push(i);
        stack.extend(children[i].iter().rev().copied());
    }
    if order.len() != slots.len() {
        let mut reached = vec![false; slots.len()];
        for &i in &order {
            reached[i] = true;
        }
        if let Some(stray) = reached.iter().position(|r| !*r) {
            return Err(TreeError::CyclicRecord {
                id: slots[stray].id.clone(),
            });
        }
    }

    // 先序倒过来处理，保证子节点先于父节点物化
    let mut built: Vec<Option<TreeNode>> = (0..slots.len()).map(|_| None).collect();
    for &i in order.iter().rev() {
        let kids: Vec<TreeNode> = children[i].iter().filter_map(|&c| built[c].take()).collect();
        built[i] = Some(TreeNode::from_record(slots[i], kids));
    }

    let forest: Vec<TreeNode> = roots.iter().filter_map(|&r| built[r].take()).collect();
    tracing::debug!("森林构建完成: {} 条记录, {} 个根", records.len(), forest.len());
    Ok(forest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(id: &str, name: &str, parent: Option<&str>) -> FlatRecord {
        FlatRecord::new(id, name, parent.map(NodeId::from))
    }

    fn ids(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_empty_input() {
        let forest = assemble(&[], &AssemblyOptions::default()).unwrap();
        assert!(forest.is_empty());
    }

    #[test]
    fn test_three_level_chain() {
        let records = vec![
            rec("1", "root", None),
            rec("2", "child", Some("1")),
            rec("3", "grandchild", Some("2")),
        ];
        let forest = assemble(&records, &AssemblyOptions::default()).unwrap();

        assert_eq!(ids(&forest), vec!["1"]);
        assert_eq!(ids(&forest[0].children), vec!["2"]);
        assert_eq!(ids(&forest[0].children[0].children), vec!["3"]);
        assert!(forest[0].state.folder);
        assert!(!forest[0].children[0].children[0].state.folder);
    }

    #[test]
    fn test_child_before_parent_in_input() {
        let records = vec![
            rec("c", "child", Some("p")),
            rec("p", "parent", None),
            rec("d", "second child", Some("p")),
        ];
        let forest = assemble(&records, &AssemblyOptions::default()).unwrap();

        // 子节点没有重复出现在顶层
        assert_eq!(ids(&forest), vec!["p"]);
        assert_eq!(ids(&forest[0].children), vec!["c", "d"]);
    }

    #[test]
    fn test_every_id_exactly_once_and_folder_invariant() {
        let records = vec![
            rec("a", "a", None),
            rec("b", "b", Some("a")),
            rec("c", "c", Some("a")),
            rec("d", "d", None),
            rec("e", "e", Some("c")),
            rec("f", "f", Some("d")),
        ];
        let forest = assemble(&records, &AssemblyOptions::default()).unwrap();

        let mut seen: Vec<&str> = flatten(&forest).map(|n| n.id.as_str()).collect();
        assert_eq!(seen, vec!["a", "b", "c", "e", "d", "f"]);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), records.len());

        for node in flatten(&forest) {
            assert_eq!(node.state.folder, !node.children.is_empty(), "节点 {}", node.id);
            assert!(!node.state.opened, "构建阶段不计算展开状态");
        }
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let records = vec![
            rec("1", "x", None),
            rec("2", "y", Some("1")),
            rec("3", "z", Some("1")),
        ];
        let first = assemble(&records, &AssemblyOptions::default()).unwrap();
        let second = assemble(&records, &AssemblyOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_dangling_parent_rejected() {
        let records = vec![rec("2", "x", Some("99"))];
        let err = assemble(&records, &AssemblyOptions::default()).unwrap_err();
        match err {
            TreeError::MalformedRecord { id, parent_id } => {
                assert_eq!(id.as_str(), "2");
                assert_eq!(parent_id.as_str(), "99");
            }
            other => panic!("意外的错误: {other:?}"),
        }
    }

    #[test]
    fn test_dangling_parent_as_implicit_root() {
        let options = AssemblyOptions {
            dangling: DanglingPolicy::ImplicitRoot,
            ..Default::default()
        };
        let records = vec![rec("1", "root", None), rec("2", "x", Some("99"))];
        let forest = assemble(&records, &options).unwrap();
        assert_eq!(ids(&forest), vec!["1", "2"]);
        // 保留原始 parentId 以便排查
        assert_eq!(forest[1].parent_id, Some(NodeId::from("99")));
    }

    #[test]
    fn test_duplicate_last_write_wins() {
        let records = vec![
            rec("1", "root", None),
            rec("2", "old", Some("1")),
            rec("3", "other", None),
            rec("2", "new", Some("3")),
        ];
        let forest = assemble(&records, &AssemblyOptions::default()).unwrap();

        assert_eq!(ids(&forest), vec!["1", "3"]);
        assert!(forest[0].children.is_empty());
        assert_eq!(forest[1].children[0].name, "new");
        assert_eq!(flatten(&forest).count(), 3);
    }

    #[test]
    fn test_duplicate_rejected() {
        let options = AssemblyOptions {
            duplicates: DuplicatePolicy::Reject,
            ..Default::default()
        };
        let records = vec![rec("1", "a", None), rec("1", "b", None)];
        assert!(matches!(
            assemble(&records, &options),
            Err(TreeError::DuplicateId(id)) if id.as_str() == "1"
        ));
    }

    #[test]
    fn test_parent_cycle_detected() {
        let records = vec![
            rec("r", "root", None),
            rec("a", "a", Some("b")),
            rec("b", "b", Some("a")),
        ];
        assert!(matches!(
            assemble(&records, &AssemblyOptions::default()),
            Err(TreeError::CyclicRecord { .. })
        ));
    }

    #[test]
    fn test_self_parent_detected() {
        let records = vec![rec("a", "a", Some("a"))];
        assert!(matches!(
            assemble(&records, &AssemblyOptions::default()),
            Err(TreeError::CyclicRecord { id }) if id.as_str() == "a"
        ));
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let mut records = vec![rec("0", "n0", None)];
        for i in 1..20_000 {
            records.push(FlatRecord::new(
                i.to_string().as_str(),
                format!("n{i}"),
                Some(NodeId::from((i - 1).to_string())),
            ));
        }
        let forest = assemble(&records, &AssemblyOptions::default()).unwrap();
        assert_eq!(flatten(&forest).count(), 20_000);

        let copy = forest.clone();
        assert_eq!(flatten(&copy).last().map(|n| n.id.as_str()), Some("19999"));
        drop(copy);
        drop(forest);
    }

    #[test]
    fn test_clone_keeps_shape_and_state() {
        let records = vec![
            rec("1", "root", None),
            rec("2", "a", Some("1")),
            rec("3", "b", Some("1")),
            rec("4", "c", Some("3")),
        ];
        let mut forest = assemble(&records, &AssemblyOptions::default()).unwrap();
        forest[0].children[1].state.opened = true;

        let copy = clone_forest(&forest);
        assert_eq!(copy, forest);
        assert!(copy[0].children[1].state.opened);
        assert!(clone_forest(&[]).is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let records = vec![rec("1", "root", None), rec("2", "leaf", Some("1"))];
        let forest = assemble(&records, &AssemblyOptions::default()).unwrap();
        let value = serde_json::to_value(&forest).unwrap();
        assert_eq!(
            value,
            json!([{
                "_id": "1",
                "name": "root",
                "parentId": null,
                "state": {"opened": false, "folder": true},
                "children": [{
                    "_id": "2",
                    "name": "leaf",
                    "parentId": "1",
                    "state": {"opened": false, "folder": false},
                    "children": []
                }]
            }])
        );
    }
}
