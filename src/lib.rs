//! 扁平记录树视图库
//!
//! 将 `{_id, name, parentId}` 扁平记录组装为去重的嵌套森林，
//! 根据活动节点计算展开状态，并通过事件总线通知展开/折叠/选中操作

pub mod model;
pub mod utils;
pub mod vm;

// 重新导出主要类型
pub use model::config::{DanglingPolicy, DescendantExpansion, DuplicatePolicy, PropagationPolicy, TreeConfig};
pub use model::controller::{TreeController, TreeError};
pub use model::record::{ActiveNode, FlatRecord, NodeId};
pub use model::state::{is_opened_subtree, propagate, propagate_in_place};
pub use model::tree::{assemble, AssemblyOptions, NodeState, TreeNode};
pub use utils::source::SourceLocation;
pub use vm::event_bus::{EventBus, EventKind, Handler, TreeEvent};
