//! 程序入口：初始化日志，加载两个数据源，构建树并以文本形式渲染

use std::{collections::HashSet, path::PathBuf, rc::Rc, time::Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::fmt::SubscriberBuilder;

use flat_tree_view::vm::bridge::*;
use flat_tree_view::vm::renderer::{flatten_visible, render_text, search_matches};
use flat_tree_view::{EventKind, NodeId, SourceLocation, TreeConfig, TreeController, TreeEvent};

/// 扁平记录树视图
#[derive(Parser, Debug)]
#[command(name = "flat_tree_view")]
#[command(version, about, long_about = None)]
struct Args {
    /// 记录列表（文件路径或 http(s) 地址）
    records: String,

    /// 活动节点文档 `{"activeNodeId": ...}`（文件路径或 http(s) 地址）
    active: String,

    /// JSON 配置文件
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 高亮名称包含该词的节点
    #[arg(short, long)]
    search: Option<String>,

    /// 依次切换这些节点的展开状态
    #[arg(short, long)]
    toggle: Vec<String>,

    /// 选中节点
    #[arg(long)]
    select: Option<String>,

    /// 输出标注后的森林 JSON 而不是文本树
    #[arg(long)]
    json: bool,

    /// 输出调试日志
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志输出
    let _ = SubscriberBuilder::default()
        .with_max_level(if args.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(e) = run(args).await {
        tracing::error!("{}{:#}", STATUS_ERROR_PREFIX, e);
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => TreeConfig::from_file(path).with_context(|| format!("读取配置失败: {}", path.display()))?,
        None => TreeConfig::default(),
    };
    let records: SourceLocation = args.records.parse()?;
    let active: SourceLocation = args.active.parse()?;

    tracing::info!("{}", STATUS_LOADING);
    let start_time = Instant::now();
    let mut controller = TreeController::load(&records, &active, config).await?;
    tracing::info!(
        "{}: {} 个根节点，耗时: {}ms",
        STATUS_LOADED,
        controller.forest().len(),
        start_time.elapsed().as_millis()
    );

    for kind in EventKind::ALL {
        controller.events().on(
            kind,
            Rc::new(|event: &TreeEvent| {
                tracing::info!("{}", event_status(event.kind, event.node_id.as_str()));
            }),
        );
    }

    for id in &args.toggle {
        controller.toggle(&NodeId::from(id.as_str()))?;
    }
    if let Some(id) = &args.select {
        controller.select(&NodeId::from(id.as_str()))?;
    }
    controller.dispatch_events();

    if args.json {
        println!("{}", serde_json::to_string_pretty(controller.forest())?);
        return Ok(());
    }

    let highlights = match &args.search {
        Some(query) => {
            let hits = search_matches(controller.forest(), query, controller.config().search_min_len);
            if hits.is_empty() {
                tracing::info!("{}: {}", STATUS_NO_MATCH, query);
            } else {
                tracing::info!("搜索 {}: {} 个匹配", query, hits.len());
            }
            hits
        }
        None => HashSet::new(),
    };

    let rows = flatten_visible(controller.forest(), controller.active_id(), &highlights);
    print!("{}", render_text(&rows));
    Ok(())
}
