//! 树构建与状态传播的配置（全部字段带默认值，可从 JSON 文件加载）

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::controller::TreeError;
use crate::utils::fs::read_json_file;

/// 父节点 id 找不到对应记录时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DanglingPolicy {
    /// 整个构建失败（`MalformedRecord`）
    #[default]
    Reject,
    /// 当作隐式根节点，记录警告
    ImplicitRoot,
}

/// 多条记录共享同一 id 时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// 后写覆盖：保留首次出现的位置，字段取最后一条记录
    #[default]
    LastWriteWins,
    Reject,
}

/// 活动节点的后代如何展开
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescendantExpansion {
    /// 只展开活动节点本身
    None,
    /// 展开活动节点的直接子节点
    DirectChildren,
    /// 展开活动节点的全部后代
    #[default]
    FullSubtree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationPolicy {
    /// 根节点不论是否命中活动节点都展开
    pub root_always_open: bool,
    pub descendants: DescendantExpansion,
}

impl Default for PropagationPolicy {
    fn default() -> Self {
        Self {
            root_always_open: true,
            descendants: DescendantExpansion::FullSubtree,
        }
    }
}

pub const DEFAULT_SEARCH_MIN_LEN: usize = 3;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub dangling: DanglingPolicy,
    pub duplicates: DuplicatePolicy,
    pub propagation: PropagationPolicy,
    /// 搜索词短于该长度时不做高亮
    pub search_min_len: usize,
    pub http_timeout_ms: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            dangling: DanglingPolicy::default(),
            duplicates: DuplicatePolicy::default(),
            propagation: PropagationPolicy::default(),
            search_min_len: DEFAULT_SEARCH_MIN_LEN,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
        }
    }
}

impl TreeConfig {
    /// 从 JSON 配置文件加载，缺省字段使用默认值
    pub fn from_file(p: &Path) -> Result<Self, TreeError> {
        let config: Self = read_json_file(p)?;
        tracing::debug!("配置已加载: {} -> {:?}", p.display(), config);
        Ok(config)
    }
}
