//! 文本渲染：把标注好的森林展开为可见行，并提供名称搜索高亮

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::model::record::NodeId;
use crate::model::tree::{flatten, TreeNode};

/// 一行可见节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRow {
    pub id: NodeId,
    pub name: String,
    /// 缩进层级
    pub depth: u32,
    pub folder: bool,
    /// 文件夹且子树中有展开节点
    pub expanded: bool,
    pub active: bool,
    pub highlighted: bool,
}

struct RenderContext<'a> {
    active: Option<&'a NodeId>,
    highlights: &'a HashSet<NodeId>,
}

/// 展开为可见行：只有子树处于展开状态的文件夹才输出子节点
pub fn flatten_visible(
    forest: &[TreeNode],
    active: Option<&NodeId>,
    highlights: &HashSet<NodeId>,
) -> Vec<RenderRow> {
    let ctx = RenderContext { active, highlights };
    let mut rows = Vec::new();
    for root in forest {
        collect_rows(root, &ctx, &mut rows);
    }
    rows
}

/// 正在展开的节点：子节点处理完后才知道其子树是否展开
struct Frame<'a> {
    node: &'a TreeNode,
    depth: u32,
    row_index: usize,
    next_child: usize,
    open: bool,
}

impl<'a> Frame<'a> {
    fn enter(node: &'a TreeNode, depth: u32, ctx: &RenderContext<'_>, rows: &mut Vec<RenderRow>) -> Self {
        let row_index = rows.len();
        rows.push(RenderRow {
            id: node.id.clone(),
            name: node.name.clone(),
            depth,
            folder: node.state.folder,
            expanded: false,
            active: false,
            highlighted: ctx.highlights.contains(&node.id),
        });
        Self {
            node,
            depth,
            row_index,
            next_child: 0,
            open: node.state.opened,
        }
    }
}

fn collect_rows(root: &TreeNode, ctx: &RenderContext<'_>, rows: &mut Vec<RenderRow>) {
    let mut stack = vec![Frame::enter(root, 0, ctx, rows)];
    while let Some(mut frame) = stack.pop() {
        let node = frame.node;
        if let Some(child) = node.children.get(frame.next_child) {
            frame.next_child += 1;
            let depth = frame.depth + 1;
            stack.push(frame);
            stack.push(Frame::enter(child, depth, ctx, rows));
            continue;
        }

        if !frame.open {
            // 子容器隐藏
            rows.truncate(frame.row_index + 1);
        }
        let row = &mut rows[frame.row_index];
        row.expanded = frame.open && node.state.folder;
        row.active = frame.open && ctx.active == Some(&node.id);
        if let Some(parent) = stack.last_mut() {
            parent.open |= frame.open;
        }
    }
}

/// 渲染为缩进文本：`-` 已展开，`+` 已折叠，叶子无标记
pub fn render_text(rows: &[RenderRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let expando = match (row.folder, row.expanded) {
            (true, true) => '-',
            (true, false) => '+',
            (false, _) => ' ',
        };
        let _ = write!(out, "{}{} {}", "  ".repeat(row.depth as usize), expando, row.name);
        if row.active {
            out.push_str("  <- active");
        }
        if row.highlighted {
            out.push_str("  [match]");
        }
        out.push('\n');
    }
    out
}

/// 名称包含搜索词（忽略大小写）的节点；搜索词过短时不匹配任何节点
pub fn search_matches(forest: &[TreeNode], query: &str, min_len: usize) -> HashSet<NodeId> {
    let query = query.trim().to_lowercase();
    if query.chars().count() < min_len.max(1) {
        return HashSet::new();
    }
    flatten(forest)
        .filter(|n| n.name.to_lowercase().contains(&query))
        .map(|n| n.id.clone())
        .collect()
}
