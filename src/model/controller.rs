//! TreeController：持有已加载的数据，驱动树构建与状态传播，并转发交互事件

use thiserror::Error;

use crate::model::config::TreeConfig;
use crate::model::record::{FlatRecord, NodeId};
use crate::model::state::{self, is_opened_subtree, node_path, propagate_in_place};
use crate::model::tree::{assemble, AssemblyOptions, TreeNode};
use crate::utils::source::{load_sources, SourceLocation};
use crate::vm::event_bus::{EventBus, EventKind};

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("IO失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON解析失败: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("加载失败 {location}: {reason}")]
    Load { location: String, reason: String },
    #[error("记录 {id} 引用了不存在的父节点 {parent_id}")]
    MalformedRecord { id: NodeId, parent_id: NodeId },
    #[error("记录 {id} 的父链无法到达根节点（循环引用）")]
    CyclicRecord { id: NodeId },
    #[error("重复的节点ID: {0}")]
    DuplicateId(NodeId),
    #[error("未知事件: {0}")]
    UnknownEvent(String),
    #[error("节点不存在: {0}")]
    UnknownNode(NodeId),
    #[error("状态错误: {0}")]
    State(String),
}

/// 树控制器
///
/// `expand`、`collapse`、`select` 只把事件排进总线队列，不会立即执行回调。
/// 队列里的每一项都持有一份处理函数的 `Rc` 和事件本身，直到调用方执行
/// [`TreeController::dispatch_events`] 或 `events().clear_pending()` 为止；
/// 长期持有控制器而从不派发会让队列无限增长。
#[derive(Debug)]
pub struct TreeController {
    config: TreeConfig,
    records: Vec<FlatRecord>,
    active_id: Option<NodeId>,
    forest: Vec<TreeNode>,
    events: EventBus,
}

impl TreeController {
    /// 由已解码的记录构建森林并传播展开状态
    pub fn new(
        records: Vec<FlatRecord>,
        active_id: Option<NodeId>,
        config: TreeConfig,
    ) -> Result<Self, TreeError> {
        let mut controller = Self {
            config,
            records: Vec::new(),
            active_id: None,
            forest: Vec::new(),
            events: EventBus::new(),
        };
        controller.reload(records, active_id)?;
        Ok(controller)
    }

    /// 并发拉取两个数据源，全部成功后再构建
    pub async fn load(
        records: &SourceLocation,
        active: &SourceLocation,
        config: TreeConfig,
    ) -> Result<Self, TreeError> {
        let (records, active) = load_sources(records, active, &config).await?;
        Self::new(records, Some(active.active_node_id), config)
    }

    /// 丢弃当前森林并用新数据重建；失败时保留原状态
    pub fn reload(&mut self, records: Vec<FlatRecord>, active_id: Option<NodeId>) -> Result<(), TreeError> {
        let options = AssemblyOptions {
            dangling: self.config.dangling,
            duplicates: self.config.duplicates,
        };
        let mut forest = assemble(&records, &options)?;
        propagate_in_place(&mut forest, active_id.as_ref(), &self.config.propagation);

        tracing::info!(
            "树已构建: {} 条记录, {} 个根节点, 活动节点 {}",
            records.len(),
            forest.len(),
            active_id.as_ref().map(NodeId::as_str).unwrap_or("-")
        );
        self.records = records;
        self.active_id = active_id;
        self.forest = forest;
        Ok(())
    }

    pub fn forest(&self) -> &[TreeNode] {
        &self.forest
    }

    pub fn records(&self) -> &[FlatRecord] {
        &self.records
    }

    pub fn active_id(&self) -> Option<&NodeId> {
        self.active_id.as_ref()
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn find(&self, id: &NodeId) -> Option<&TreeNode> {
        state::find(&self.forest, id)
    }

    pub fn ancestors(&self, id: &NodeId) -> Result<Vec<&TreeNode>, TreeError> {
        state::ancestors_of(&self.forest, id).ok_or_else(|| TreeError::UnknownNode(id.clone()))
    }

    /// 节点子树中是否有展开的节点（渲染层据此决定子容器是否可见）
    pub fn is_opened(&self, id: &NodeId) -> Result<bool, TreeError> {
        self.find(id)
            .map(is_opened_subtree)
            .ok_or_else(|| TreeError::UnknownNode(id.clone()))
    }

    fn node_mut(&mut self, id: &NodeId) -> Result<&mut TreeNode, TreeError> {
        let path = node_path(&self.forest, id).ok_or_else(|| TreeError::UnknownNode(id.clone()))?;
        state::node_at_mut(&mut self.forest, &path).ok_or_else(|| TreeError::UnknownNode(id.clone()))
    }

    /// 展开节点
    pub fn expand(&mut self, id: &NodeId) -> Result<(), TreeError> {
        self.node_mut(id)?.state.opened = true;
        self.events.emit(EventKind::Expand, id.clone());
        Ok(())
    }

    /// 折叠节点：整棵子树关闭，子容器随之隐藏
    pub fn collapse(&mut self, id: &NodeId) -> Result<(), TreeError> {
        self.node_mut(id)?.for_each_mut(|n| n.state.opened = false);
        self.events.emit(EventKind::Collapse, id.clone());
        Ok(())
    }

    /// 切换展开状态，返回切换后的状态；叶子节点不做任何事
    pub fn toggle(&mut self, id: &NodeId) -> Result<bool, TreeError> {
        let node = self.find(id).ok_or_else(|| TreeError::UnknownNode(id.clone()))?;
        if !node.state.folder {
            tracing::debug!("节点 {} 没有子节点，忽略切换", id);
            return Ok(node.state.opened);
        }
        if is_opened_subtree(node) {
            self.collapse(id)?;
            tracing::info!("节点折叠: {}", id);
            Ok(false)
        } else {
            self.expand(id)?;
            tracing::info!("节点展开: {}", id);
            Ok(true)
        }
    }

    /// 选中节点：成为活动节点，并展开它和它的祖先链，其余展开状态保留
    pub fn select(&mut self, id: &NodeId) -> Result<(), TreeError> {
        let path = node_path(&self.forest, id).ok_or_else(|| TreeError::UnknownNode(id.clone()))?;
        state::open_path(&mut self.forest, &path)
            .ok_or_else(|| TreeError::State(format!("节点路径失效: {id}")))?;
        self.active_id = Some(id.clone());
        self.events.emit(EventKind::Select, id.clone());
        tracing::info!("节点选中: {}", id);
        Ok(())
    }

    /// 执行事件总线上排队的回调，返回执行的回调数；调用后队列为空
    pub fn dispatch_events(&self) -> usize {
        self.events.dispatch_pending()
    }
}
