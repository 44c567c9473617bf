//! 状态传播：根据活动节点计算每个节点的展开状态

use crate::model::config::{DescendantExpansion, PropagationPolicy};
use crate::model::record::NodeId;
use crate::model::tree::{clone_forest, TreeNode};

/// 定位节点：返回从根开始每一层的子节点下标
pub fn node_path(roots: &[TreeNode], id: &NodeId) -> Option<Vec<usize>> {
    let mut stack: Vec<(usize, usize, &TreeNode)> =
        roots.iter().enumerate().rev().map(|(i, n)| (0, i, n)).collect();
    let mut path = Vec::new();
    while let Some((depth, idx, node)) = stack.pop() {
        path.truncate(depth);
        path.push(idx);
        if node.id == *id {
            return Some(path);
        }
        stack.extend(
            node.children
                .iter()
                .enumerate()
                .rev()
                .map(|(i, child)| (depth + 1, i, child)),
        );
    }
    None
}

pub fn node_at<'a>(roots: &'a [TreeNode], path: &[usize]) -> Option<&'a TreeNode> {
    let (&first, rest) = path.split_first()?;
    let mut node = roots.get(first)?;
    for &i in rest {
        node = node.children.get(i)?;
    }
    Some(node)
}

pub fn node_at_mut<'a>(roots: &'a mut [TreeNode], path: &[usize]) -> Option<&'a mut TreeNode> {
    let (&first, rest) = path.split_first()?;
    let mut node = roots.get_mut(first)?;
    for &i in rest {
        node = node.children.get_mut(i)?;
    }
    Some(node)
}

pub fn find<'a>(roots: &'a [TreeNode], id: &NodeId) -> Option<&'a TreeNode> {
    node_at(roots, &node_path(roots, id)?)
}

/// 祖先链（从根到直接父节点），不含节点本身
pub fn ancestors_of<'a>(roots: &'a [TreeNode], id: &NodeId) -> Option<Vec<&'a TreeNode>> {
    let path = node_path(roots, id)?;
    let mut chain = Vec::with_capacity(path.len().saturating_sub(1));
    let mut level = roots;
    for &i in &path[..path.len() - 1] {
        let node = level.get(i)?;
        chain.push(node);
        level = node.children.as_slice();
    }
    Some(chain)
}

/// 展开路径上的所有节点（祖先链 + 末端节点），返回末端节点
pub(crate) fn open_path<'a>(roots: &'a mut [TreeNode], path: &[usize]) -> Option<&'a mut TreeNode> {
    let (&last, ancestors) = path.split_last()?;
    let mut level = roots;
    for &i in ancestors {
        let current = level;
        let node = current.get_mut(i)?;
        node.state.opened = true;
        level = node.children.as_mut_slice();
    }
    let target = level.get_mut(last)?;
    target.state.opened = true;
    Some(target)
}

/// 节点自身或任一后代处于展开状态
pub fn is_opened_subtree(node: &TreeNode) -> bool {
    node.iter().any(|n| n.state.opened)
}

/// 原地传播展开状态，返回是否找到了活动节点
///
/// 规则：先全部复位为关闭；按策略展开根；活动节点及其祖先链一定展开；
/// 活动节点的后代按 `policy.descendants` 展开。
pub fn propagate_in_place(
    roots: &mut [TreeNode],
    active_id: Option<&NodeId>,
    policy: &PropagationPolicy,
) -> bool {
    for root in roots.iter_mut() {
        root.for_each_mut(|n| n.state.opened = false);
        root.state.opened = policy.root_always_open;
    }

    let Some(active_id) = active_id else {
        return false;
    };
    let Some(path) = node_path(roots, active_id) else {
        tracing::warn!("活动节点 {} 不在树中，仅应用根节点默认状态", active_id);
        return false;
    };
    let Some(active) = open_path(roots, &path) else {
        return false;
    };

    match policy.descendants {
        DescendantExpansion::None => {}
        DescendantExpansion::DirectChildren => {
            for child in active.children.iter_mut() {
                child.state.opened = true;
            }
        }
        DescendantExpansion::FullSubtree => {
            for child in active.children.iter_mut() {
                child.for_each_mut(|n| n.state.opened = true);
            }
        }
    }
    tracing::debug!("活动节点 {} 位于深度 {}", active_id, path.len() - 1);
    true
}

/// 纯函数版本：返回标注了展开状态的新森林
pub fn propagate(roots: &[TreeNode], active_id: Option<&NodeId>, policy: &PropagationPolicy) -> Vec<TreeNode> {
    let mut annotated = clone_forest(roots);
    propagate_in_place(&mut annotated, active_id, policy);
    annotated
}
