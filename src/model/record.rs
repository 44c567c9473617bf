//! 扁平记录：外部数据源提供的 `{_id, name, parentId}` 以及活动节点文档

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// 节点标识（不透明、可比较）
///
/// 数据源里的 id 可能是字符串也可能是整数，统一规整为十进制文本，
/// 这样 `1` 与 `"1"` 被视为同一个节点。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<i32> for NodeId {
    fn from(n: i32) -> Self {
        Self(n.to_string())
    }
}

impl From<i64> for NodeId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => NodeId(s),
            RawId::Signed(n) => NodeId(n.to_string()),
            RawId::Unsigned(n) => NodeId(n.to_string()),
        })
    }
}

/// 输入记录（只读）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "parentId", default)]
    pub parent_id: Option<NodeId>,
}

impl FlatRecord {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, parent_id: Option<NodeId>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id,
        }
    }

    /// 有效父节点：`null`、缺省与空字符串都表示根
    pub fn parent(&self) -> Option<&NodeId> {
        self.parent_id.as_ref().filter(|p| !p.is_empty())
    }
}

/// 第二个数据源：`{"activeNodeId": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveNode {
    #[serde(rename = "activeNodeId")]
    pub active_node_id: NodeId,
}
