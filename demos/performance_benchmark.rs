//! 性能基准：生成大规模扁平记录，测量树构建与状态传播
//!
//! 运行: cargo run --release --example performance_benchmark

use flat_tree_view::model::performance::run_performance_benchmark;
use tracing_subscriber::fmt::SubscriberBuilder;

fn main() {
    let _ = SubscriberBuilder::default()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    for (depth, width) in [(4, 10), (6, 6), (3, 40)] {
        println!("== depth={} width={}", depth, width);
        let results = run_performance_benchmark(depth, width);
        if results.iter().any(|r| !r.success) {
            eprintln!("基准测试存在失败项");
            std::process::exit(1);
        }
    }
}
