// ==========================================
// 周考勤登记引擎 - 层级完成度汇总
// ==========================================
// 输入: 层级树 + 选定周集合 + 汇总事实 (find_period_facts)
// 输出: 每一层 (人员/区域/总督导/全局) 的完成度与产量统计
// 规则: 人员 covered ⇔ 选定的每一周都有已提交记录
// 规则: completion_rate = submitted_count / total (total = 0 时为 0)
// 规则: 产量与出勤天数只统计已提交记录，草稿不计
// ==========================================

use crate::domain::record::PeriodFact;
use crate::domain::types::{CompletionStatus, RecordStatus, WorkerStatus};
use crate::engine::hierarchy::{AreaNode, GeralNode, HierarchyTree, NodeKey, WorkerLeaf};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{info, instrument};

// ==========================================
// 统计结构
// ==========================================

/// 节点统计 (区域/总督导/全局共用)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupStats {
    pub total: usize,
    pub submitted_count: usize,
    pub pending_count: usize,
    pub completion_rate: f64,
    pub status: CompletionStatus,
    pub worked_days: u32,
    pub production: f64,
}

impl Default for RollupStats {
    fn default() -> Self {
        Self::from_parts(0, 0, 0, 0.0)
    }
}

impl RollupStats {
    fn from_parts(total: usize, submitted_count: usize, worked_days: u32, production: f64) -> Self {
        let completion_rate = if total == 0 {
            0.0
        } else {
            submitted_count as f64 / total as f64
        };
        Self {
            total,
            submitted_count,
            pending_count: total - submitted_count,
            completion_rate,
            status: CompletionStatus::classify(submitted_count, total),
            worked_days,
            production,
        }
    }

    /// 自下而上折叠子节点统计
    pub fn fold<'a>(children: impl IntoIterator<Item = &'a RollupStats>) -> Self {
        let (total, submitted, worked, production) = children.into_iter().fold(
            (0usize, 0usize, 0u32, 0.0f64),
            |(t, s, w, p), c| (t + c.total, s + c.submitted_count, w + c.worked_days, p + c.production),
        );
        Self::from_parts(total, submitted, worked, production)
    }

    /// 百分比 (0..=100, 四舍五入)
    pub fn completion_percent(&self) -> u32 {
        (self.completion_rate * 100.0).round() as u32
    }
}

/// 人员叶子统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRollup {
    pub worker_id: String,
    pub name: String,
    pub matricula: String,
    pub worker_status: WorkerStatus,
    pub covered: bool,
    pub submitted_periods: Vec<u32>,
    pub last_submitted_at: Option<NaiveDateTime>,
    pub worked_days: u32,
    pub production: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRollup {
    pub key: NodeKey,
    pub name: String,
    pub stats: RollupStats,
    pub workers: Vec<WorkerRollup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeralRollup {
    pub key: NodeKey,
    pub name: String,
    pub stats: RollupStats,
    pub areas: Vec<AreaRollup>,
}

/// 汇总结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupReport {
    pub year: i32,
    pub periods: Vec<u32>,
    pub global: RollupStats,
    pub gerais: Vec<GeralRollup>,
}

/// 监控页过滤条件 (按总督导节点)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollupFilter {
    #[default]
    All,
    /// 未全部完成 (pending + partial)
    Pending,
    Complete,
}

impl RollupFilter {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Some(RollupFilter::All),
            "pending" => Some(RollupFilter::Pending),
            "complete" => Some(RollupFilter::Complete),
            _ => None,
        }
    }

    fn keeps(&self, status: CompletionStatus) -> bool {
        match self {
            RollupFilter::All => true,
            RollupFilter::Pending => status != CompletionStatus::Complete,
            RollupFilter::Complete => status == CompletionStatus::Complete,
        }
    }
}

// ==========================================
// RollupAggregator - 汇总引擎
// ==========================================
// 红线: 无状态，不访问存储；事实由调用方一次查询后传入
#[derive(Debug, Clone, Copy, Default)]
pub struct RollupAggregator;

impl RollupAggregator {
    pub fn new() -> Self {
        Self
    }

    /// 计算层级汇总
    ///
    /// # 参数
    /// - tree: 已按角色裁剪的层级树
    /// - periods: 选定周集合 (去重后使用；为空时所有人员均未覆盖)
    /// - facts: 这些人员在这些周的汇总事实，缺失的 (人员, 周) 视为零统计
    #[instrument(skip(self, tree, facts), fields(workers = tree.worker_count(), facts = facts.len()))]
    pub fn rollup(
        &self,
        tree: &HierarchyTree,
        year: i32,
        periods: &[u32],
        facts: &[PeriodFact],
    ) -> RollupReport {
        let period_set: BTreeSet<u32> = periods.iter().copied().collect();

        // 人员ID → 已提交事实
        let mut submitted: HashMap<&str, Vec<&PeriodFact>> = HashMap::new();
        for fact in facts {
            if fact.status == RecordStatus::Submitted && period_set.contains(&fact.week_number) {
                submitted.entry(fact.server_id.as_str()).or_default().push(fact);
            }
        }

        let gerais: Vec<GeralRollup> = tree
            .gerais
            .iter()
            .map(|g| rollup_geral(g, &period_set, &submitted))
            .collect();
        let global = RollupStats::fold(gerais.iter().map(|g| &g.stats));

        info!(
            total = global.total,
            submitted = global.submitted_count,
            rate = global.completion_rate,
            "层级汇总完成"
        );

        RollupReport {
            year,
            periods: period_set.into_iter().collect(),
            global,
            gerais,
        }
    }
}

fn rollup_geral(
    geral: &GeralNode,
    periods: &BTreeSet<u32>,
    submitted: &HashMap<&str, Vec<&PeriodFact>>,
) -> GeralRollup {
    let areas: Vec<AreaRollup> = geral
        .areas
        .iter()
        .map(|a| rollup_area(a, periods, submitted))
        .collect();
    GeralRollup {
        key: geral.key.clone(),
        name: geral.name.clone(),
        stats: RollupStats::fold(areas.iter().map(|a| &a.stats)),
        areas,
    }
}

fn rollup_area(
    area: &AreaNode,
    periods: &BTreeSet<u32>,
    submitted: &HashMap<&str, Vec<&PeriodFact>>,
) -> AreaRollup {
    let workers: Vec<WorkerRollup> = area
        .workers
        .iter()
        .map(|w| rollup_worker(w, periods, submitted.get(w.worker_id.as_str())))
        .collect();

    let covered = workers.iter().filter(|w| w.covered).count();
    let worked_days = workers.iter().map(|w| w.worked_days).sum();
    let production = workers.iter().map(|w| w.production).sum();

    AreaRollup {
        key: area.key.clone(),
        name: area.name.clone(),
        stats: RollupStats::from_parts(workers.len(), covered, worked_days, production),
        workers,
    }
}

fn rollup_worker(
    leaf: &WorkerLeaf,
    periods: &BTreeSet<u32>,
    facts: Option<&Vec<&PeriodFact>>,
) -> WorkerRollup {
    let facts: &[&PeriodFact] = facts.map(|v| v.as_slice()).unwrap_or(&[]);

    let submitted_periods: BTreeSet<u32> = facts.iter().map(|f| f.week_number).collect();
    let covered = !periods.is_empty() && periods.iter().all(|p| submitted_periods.contains(p));

    WorkerRollup {
        worker_id: leaf.worker_id.clone(),
        name: leaf.name.clone(),
        matricula: leaf.matricula.clone(),
        worker_status: leaf.status,
        covered,
        submitted_periods: submitted_periods.into_iter().collect(),
        last_submitted_at: facts.iter().map(|f| f.updated_at).max(),
        worked_days: facts.iter().map(|f| f.worked_days).sum(),
        production: facts.iter().map(|f| f.production).sum(),
    }
}

/// 按完成度过滤总督导节点
///
/// 全局统计保持不变 (仍为可见范围的整体)
pub fn filter_rollup(report: &RollupReport, filter: RollupFilter) -> RollupReport {
    RollupReport {
        year: report.year,
        periods: report.periods.clone(),
        global: report.global.clone(),
        gerais: report
            .gerais
            .iter()
            .filter(|g| filter.keeps(g.stats.status))
            .cloned()
            .collect(),
    }
}
