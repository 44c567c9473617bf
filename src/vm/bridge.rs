//! VM桥接层：命令行界面与 TreeController 之间共用的状态文本

// === 常量定义（消除魔法值） ===
pub const STATUS_LOADING: &str = "正在加载数据源...";
pub const STATUS_LOADED: &str = "树加载完成";
pub const STATUS_NO_MATCH: &str = "没有匹配的节点";
pub const STATUS_ERROR_PREFIX: &str = "错误: ";

/// 事件日志文本，例如 `展开: 42`
pub fn event_status(kind: crate::vm::event_bus::EventKind, node: &str) -> String {
    use crate::vm::event_bus::EventKind;
    let action = match kind {
        EventKind::Expand => "展开",
        EventKind::Collapse => "折叠",
        EventKind::Select => "选中",
    };
    format!("{}: {}", action, node)
}
