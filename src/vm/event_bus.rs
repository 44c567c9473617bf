//! 事件总线：固定的三种事件（展开 / 折叠 / 选中），订阅、退订与延迟派发
//!
//! `emit` 不会同步调用处理器，而是为每个处理器排入一次待执行调用；
//! `dispatch_pending` 按先进先出顺序执行它们。处理器在派发中再次 `emit`
//! 产生的调用会在同一轮派发中执行。

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::str::FromStr;

use crate::model::controller::TreeError;
use crate::model::record::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Expand,
    Collapse,
    Select,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Expand, EventKind::Collapse, EventKind::Select];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Expand => "expand",
            EventKind::Collapse => "collapse",
            EventKind::Select => "select",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expand" => Ok(EventKind::Expand),
            "collapse" => Ok(EventKind::Collapse),
            "select" => Ok(EventKind::Select),
            other => Err(TreeError::UnknownEvent(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEvent {
    pub kind: EventKind,
    pub node_id: NodeId,
}

pub type Handler = Rc<dyn Fn(&TreeEvent)>;

#[derive(Default)]
pub struct EventBus {
    handlers: RefCell<HashMap<EventKind, Vec<Handler>>>,
    pending: RefCell<VecDeque<(Handler, TreeEvent)>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.borrow().values().map(Vec::len).sum::<usize>())
            .field("pending", &self.pending.borrow().len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册处理器，返回同一个句柄以便之后 `off`
    pub fn on(&self, kind: EventKind, handler: Handler) -> Handler {
        self.handlers
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push(handler.clone());
        handler
    }

    /// 以接收者 `scope` 注册回调
    pub fn on_scoped<S: 'static>(
        &self,
        kind: EventKind,
        scope: Rc<S>,
        callback: impl Fn(&S, &TreeEvent) + 'static,
    ) -> Handler {
        let handler: Handler = Rc::new(move |event: &TreeEvent| callback(&scope, event));
        self.on(kind, handler)
    }

    /// 按名称注册；名称不在固定集合内时返回 `UnknownEvent`
    pub fn on_named(&self, name: &str, handler: Handler) -> Result<Handler, TreeError> {
        let kind: EventKind = name.parse()?;
        Ok(self.on(kind, handler))
    }

    /// 移除第一个与 `handler` 为同一引用的处理器，返回是否移除
    pub fn off(&self, kind: EventKind, handler: &Handler) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };
        match list.iter().position(|h| Rc::ptr_eq(h, handler)) {
            Some(pos) => {
                list.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.borrow().get(&kind).map_or(0, Vec::len)
    }

    /// 为每个已注册处理器排入一次延迟调用，返回排入的数量
    ///
    /// 排入的调用在 `dispatch_pending` 或 `clear_pending` 之前一直持有处理器和事件。
    pub fn emit(&self, kind: EventKind, node_id: NodeId) -> usize {
        let event = TreeEvent { kind, node_id };
        let handlers = self.handlers.borrow();
        let Some(list) = handlers.get(&kind) else {
            tracing::debug!("事件 {} 无订阅者", kind);
            return 0;
        };
        let mut pending = self.pending.borrow_mut();
        for handler in list {
            pending.push_back((handler.clone(), event.clone()));
        }
        tracing::debug!("事件 {}({}) 排入 {} 个调用", kind, event.node_id, list.len());
        list.len()
    }

    pub fn emit_named(&self, name: &str, node_id: NodeId) -> Result<usize, TreeError> {
        let kind: EventKind = name.parse()?;
        Ok(self.emit(kind, node_id))
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// 取消所有尚未执行的调用
    pub fn clear_pending(&self) -> usize {
        let mut pending = self.pending.borrow_mut();
        let dropped = pending.len();
        pending.clear();
        dropped
    }

    /// 执行所有待执行调用，返回执行的数量
    ///
    /// 处理器 panic 会被记录，不影响其余调用。
    pub fn dispatch_pending(&self) -> usize {
        let mut executed = 0;
        loop {
            // 出队后立即释放借用，处理器内部可以继续 emit/on/off
            let next = self.pending.borrow_mut().pop_front();
            let Some((handler, event)) = next else {
                break;
            };
            executed += 1;
            if panic::catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                tracing::error!("事件处理器执行失败: {}({})", event.kind, event.node_id);
            }
        }
        executed
    }
}
