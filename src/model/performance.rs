//! 性能基准辅助
//!
//! 生成大规模扁平记录，测量树构建与状态传播耗时

use std::time::Instant;

use crate::model::config::PropagationPolicy;
use crate::model::record::{FlatRecord, NodeId};
use crate::model::state::propagate_in_place;
use crate::model::tree::{assemble, flatten, AssemblyOptions, TreeNode};

/// 性能测试结果
#[derive(Debug)]
pub struct PerformanceResult {
    pub operation: String,
    pub duration_ms: u128,
    pub success: bool,
    pub details: String,
}

impl PerformanceResult {
    pub fn new(operation: &str, duration_ms: u128, success: bool, details: &str) -> Self {
        Self {
            operation: operation.to_string(),
            duration_ms,
            success,
            details: details.to_string(),
        }
    }
}

/// 生成满 `width` 叉、`depth` 层的扁平记录
///
/// 记录按层倒序排列，子节点总是先于父节点出现，用来覆盖组装的乱序路径。
pub fn generate_records(depth: usize, width: usize) -> Vec<FlatRecord> {
    let mut levels: Vec<Vec<FlatRecord>> = Vec::with_capacity(depth);
    let mut parents: Vec<Option<NodeId>> = vec![None];
    let mut next_id: u64 = 0;

    for level in 0..depth {
        let fan_out = if level == 0 { width.max(1) } else { width };
        let mut current = Vec::with_capacity(parents.len() * fan_out);
        for parent in &parents {
            for i in 0..fan_out {
                next_id += 1;
                current.push(FlatRecord::new(
                    NodeId::new(next_id.to_string()),
                    format!("节点_{}_{}", level, i),
                    parent.clone(),
                ));
            }
        }
        parents = current.iter().map(|r| Some(r.id.clone())).collect();
        levels.push(current);
    }

    levels.into_iter().rev().flatten().collect()
}

/// 测试树构建性能
pub fn benchmark_assembly(records: &[FlatRecord]) -> (PerformanceResult, Vec<TreeNode>) {
    let start = Instant::now();
    let result = assemble(records, &AssemblyOptions::default());
    let duration = start.elapsed();

    match result {
        Ok(forest) => {
            let count = flatten(&forest).count();
            let perf = PerformanceResult::new(
                "树构建",
                duration.as_millis(),
                count == records.len(),
                &format!("{} 条记录 -> {} 个根, {} 个节点", records.len(), forest.len(), count),
            );
            (perf, forest)
        }
        Err(e) => (
            PerformanceResult::new("树构建", duration.as_millis(), false, &format!("构建失败: {}", e)),
            Vec::new(),
        ),
    }
}

/// 测试状态传播性能（以最后一个先序节点为活动节点，即最深的一条链）
pub fn benchmark_propagation(forest: &mut [TreeNode]) -> PerformanceResult {
    let Some(active) = flatten(forest).last().map(|n| n.id.clone()) else {
        return PerformanceResult::new("状态传播", 0, false, "森林为空");
    };

    let start = Instant::now();
    let found = propagate_in_place(forest, Some(&active), &PropagationPolicy::default());
    let duration = start.elapsed();

    let opened = flatten(forest).filter(|n| n.state.opened).count();
    PerformanceResult::new(
        "状态传播",
        duration.as_millis(),
        found,
        &format!("活动节点 {}，展开 {} 个节点", active, opened),
    )
}

/// 运行完整基准并打印结果
pub fn run_performance_benchmark(depth: usize, width: usize) -> Vec<PerformanceResult> {
    let records = generate_records(depth, width);
    tracing::info!("生成 {} 条测试记录 (depth={}, width={})", records.len(), depth, width);

    let (assembly, mut forest) = benchmark_assembly(&records);
    let propagation = benchmark_propagation(&mut forest);

    let results = vec![assembly, propagation];
    for r in &results {
        println!(
            "{}: {}ms [{}] {}",
            r.operation,
            r.duration_ms,
            if r.success { "通过" } else { "失败" },
            r.details
        );
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_records_shape() {
        let records = generate_records(3, 2);
        // 2 + 4 + 8
        assert_eq!(records.len(), 14);
        // 最深一层排在最前
        assert!(records[0].parent().is_some());
        assert!(records.last().unwrap().parent().is_none());
    }

    #[test]
    fn test_benchmark_small_tree() {
        let records = generate_records(4, 3);
        let (assembly, mut forest) = benchmark_assembly(&records);
        assert!(assembly.success, "{}", assembly.details);
        assert_eq!(forest.len(), 3);

        let propagation = benchmark_propagation(&mut forest);
        assert!(propagation.success);
    }

    #[test]
    fn test_benchmark_empty_forest() {
        let result = benchmark_propagation(&mut []);
        assert!(!result.success);
    }
}
