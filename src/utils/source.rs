//! 数据源加载：记录列表与活动节点文档，来自本地文件或 HTTP

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::model::config::TreeConfig;
use crate::model::controller::TreeError;
use crate::model::record::{ActiveNode, FlatRecord};
use crate::utils::fs::parse_json_text;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    File(PathBuf),
    Url(String),
}

impl FromStr for SourceLocation {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TreeError::State("数据源地址为空".into()));
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(SourceLocation::Url(s.to_string()))
        } else {
            Ok(SourceLocation::File(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::File(p) => write!(f, "{}", p.display()),
            SourceLocation::Url(u) => f.write_str(u),
        }
    }
}

fn load_failure(location: &SourceLocation, reason: impl fmt::Display) -> TreeError {
    TreeError::Load {
        location: location.to_string(),
        reason: reason.to_string(),
    }
}

/// 读取单个数据源的原始文本；HTTP 非 2xx 状态视为失败
pub async fn fetch_text(location: &SourceLocation, client: &reqwest::Client) -> Result<String, TreeError> {
    match location {
        SourceLocation::File(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| load_failure(location, e)),
        SourceLocation::Url(url) => {
            let response = client
                .get(url.as_str())
                .send()
                .await
                .map_err(|e| load_failure(location, e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(load_failure(location, format!("HTTP {status}")));
            }
            response.text().await.map_err(|e| load_failure(location, e))
        }
    }
}

/// 构建带超时的 HTTP 客户端；失败与具体数据源无关
fn http_client(config: &TreeConfig) -> Result<reqwest::Client, TreeError> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(config.http_timeout_ms))
        .build()
        .map_err(|e| TreeError::State(format!("HTTP客户端初始化失败: {e}")))
}

/// 并发拉取两个数据源，两者都成功后才解码；任一失败则整体失败
pub async fn load_sources(
    records: &SourceLocation,
    active: &SourceLocation,
    config: &TreeConfig,
) -> Result<(Vec<FlatRecord>, ActiveNode), TreeError> {
    let client = http_client(config)?;

    tracing::info!("开始加载数据源: {} / {}", records, active);
    let (records_text, active_text) =
        tokio::try_join!(fetch_text(records, &client), fetch_text(active, &client))?;

    let records_list: Vec<FlatRecord> =
        parse_json_text(&records_text).map_err(|e| load_failure(records, e))?;
    let active_node: ActiveNode = parse_json_text(&active_text).map_err(|e| load_failure(active, e))?;
    tracing::info!(
        "数据源加载完成: {} 条记录, 活动节点 {}",
        records_list.len(),
        active_node.active_node_id
    );
    Ok((records_list, active_node))
}
