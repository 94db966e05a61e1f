// ==========================================
// 周考勤登记引擎 - 督导层级索引
// ==========================================
// 职责: 平铺名册 → 总督导 → 区域督导 → 人员 三层树
// 规则: 树对输入人员是全覆盖的，每个人员恰好出现一次
// 规则: 无区域的人员归入所属总督导下的 "未分配区域"；
//       总督导也缺失时归入 "未分配总督导"
// 规则: 同层按显示名排序，未分配节点排在最后
// ==========================================

use crate::domain::roster::{Roster, SupervisorArea, SupervisorGeral, Worker};
use crate::domain::types::WorkerStatus;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument, warn};

/// 未分配区域的固定标识
pub const UNASSIGNED_AREA_ID: &str = "sem-area";
/// 未分配总督导的固定标识
pub const UNASSIGNED_GERAL_ID: &str = "sem-geral";

pub const UNASSIGNED_AREA_NAME: &str = "Sem Supervisor de Área";
pub const UNASSIGNED_GERAL_NAME: &str = "Sem Supervisor Geral";

// ==========================================
// NodeKey - 节点键
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NodeKey {
    Assigned(String),
    Unassigned,
}

impl NodeKey {
    pub fn is_unassigned(&self) -> bool {
        matches!(self, NodeKey::Unassigned)
    }

    pub fn assigned_id(&self) -> Option<&str> {
        match self {
            NodeKey::Assigned(id) => Some(id),
            NodeKey::Unassigned => None,
        }
    }
}

/// 叶子: 人员
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerLeaf {
    pub worker_id: String,
    pub name: String,
    pub matricula: String,
    pub status: WorkerStatus,
}

/// 区域督导节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaNode {
    pub key: NodeKey,
    pub name: String,
    pub workers: Vec<WorkerLeaf>,
}

/// 总督导节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeralNode {
    pub key: NodeKey,
    pub name: String,
    pub areas: Vec<AreaNode>,
}

impl GeralNode {
    pub fn worker_count(&self) -> usize {
        self.areas.iter().map(|a| a.workers.len()).sum()
    }
}

/// 层级树
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchyTree {
    pub gerais: Vec<GeralNode>,
}

impl HierarchyTree {
    pub fn worker_count(&self) -> usize {
        self.gerais.iter().map(GeralNode::worker_count).sum()
    }

    /// 树中全部人员ID (按树序)
    pub fn worker_ids(&self) -> Vec<String> {
        self.gerais
            .iter()
            .flat_map(|g| g.areas.iter())
            .flat_map(|a| a.workers.iter())
            .map(|w| w.worker_id.clone())
            .collect()
    }

    pub fn find_geral(&self, key: &NodeKey) -> Option<&GeralNode> {
        self.gerais.iter().find(|g| &g.key == key)
    }
}

// ==========================================
// HierarchyIndex - 层级构建
// ==========================================
// 红线: 无状态，每次调用独立
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchyIndex;

impl HierarchyIndex {
    pub fn new() -> Self {
        Self
    }

    /// 由名册快照构建层级树
    #[instrument(skip_all, fields(workers = roster.workers.len(), areas = roster.areas.len(), gerais = roster.gerais.len()))]
    pub fn build_from_roster(&self, roster: &Roster) -> HierarchyTree {
        self.build(&roster.workers, &roster.areas, &roster.gerais)
    }

    /// 构建层级树
    ///
    /// - 人员ID重复时保留首次出现
    /// - 区域引用未知总督导时，区域挂在未分配总督导下
    /// - 人员引用未知区域时，按无区域处理
    /// - 没有人员的已知督导节点同样保留 (total = 0)
    pub fn build(
        &self,
        workers: &[Worker],
        areas: &[SupervisorArea],
        gerais: &[SupervisorGeral],
    ) -> HierarchyTree {
        // 一次性建立索引，后续折叠均为 O(1) 查找
        let mut geral_index: HashMap<&str, &SupervisorGeral> = HashMap::new();
        for g in gerais {
            geral_index.entry(g.id.as_str()).or_insert(g);
        }
        let mut area_index: HashMap<&str, &SupervisorArea> = HashMap::new();
        for a in areas {
            area_index.entry(a.id.as_str()).or_insert(a);
        }

        let geral_of_area = |area: &SupervisorArea| -> NodeKey {
            match area.supervisor_geral_id.as_deref() {
                Some(id) if geral_index.contains_key(id) => NodeKey::Assigned(id.to_string()),
                _ => NodeKey::Unassigned,
            }
        };

        // (geral_key, area_key) → workers
        let mut buckets: HashMap<NodeKey, HashMap<NodeKey, Vec<WorkerLeaf>>> = HashMap::new();

        for g in geral_index.keys() {
            buckets.entry(NodeKey::Assigned(g.to_string())).or_default();
        }
        for a in area_index.values() {
            buckets
                .entry(geral_of_area(a))
                .or_default()
                .entry(NodeKey::Assigned(a.id.clone()))
                .or_default();
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut duplicates = 0usize;
        for w in workers {
            if !seen.insert(w.id.as_str()) {
                duplicates += 1;
                continue;
            }

            let area = w
                .supervisor_area_id
                .as_deref()
                .and_then(|id| area_index.get(id).copied());

            let (geral_key, area_key) = match area {
                Some(a) => (geral_of_area(a), NodeKey::Assigned(a.id.clone())),
                None => {
                    let geral_key = match w.supervisor_geral_id.as_deref() {
                        Some(id) if geral_index.contains_key(id) => NodeKey::Assigned(id.to_string()),
                        _ => NodeKey::Unassigned,
                    };
                    (geral_key, NodeKey::Unassigned)
                }
            };

            buckets
                .entry(geral_key)
                .or_default()
                .entry(area_key)
                .or_default()
                .push(WorkerLeaf {
                    worker_id: w.id.clone(),
                    name: w.name.clone(),
                    matricula: w.matricula.clone(),
                    status: w.status,
                });
        }

        if duplicates > 0 {
            warn!(duplicates, "名册中存在重复人员ID，已保留首次出现");
        }

        let mut tree_gerais: Vec<GeralNode> = buckets
            .into_iter()
            .map(|(geral_key, area_map)| {
                let mut area_nodes: Vec<AreaNode> = area_map
                    .into_iter()
                    .map(|(area_key, mut leaves)| {
                        leaves.sort_by(|a, b| {
                            a.name.cmp(&b.name).then_with(|| a.worker_id.cmp(&b.worker_id))
                        });
                        let name = match &area_key {
                            NodeKey::Assigned(id) => area_index
                                .get(id.as_str())
                                .map(|a| a.name.clone())
                                .unwrap_or_else(|| id.clone()),
                            NodeKey::Unassigned => UNASSIGNED_AREA_NAME.to_string(),
                        };
                        AreaNode {
                            key: area_key,
                            name,
                            workers: leaves,
                        }
                    })
                    .collect();
                sort_nodes(&mut area_nodes, |a| (&a.key, &a.name));

                let name = match &geral_key {
                    NodeKey::Assigned(id) => geral_index
                        .get(id.as_str())
                        .map(|g| g.name.clone())
                        .unwrap_or_else(|| id.clone()),
                    NodeKey::Unassigned => UNASSIGNED_GERAL_NAME.to_string(),
                };
                GeralNode {
                    key: geral_key,
                    name,
                    areas: area_nodes,
                }
            })
            .collect();
        sort_nodes(&mut tree_gerais, |g| (&g.key, &g.name));

        let tree = HierarchyTree { gerais: tree_gerais };
        debug!(worker_count = tree.worker_count(), "层级树构建完成");
        tree
    }
}

/// 同层排序: 已分配在前 (按名称、ID)，未分配在后
fn sort_nodes<T>(nodes: &mut [T], key: impl Fn(&T) -> (&NodeKey, &String)) {
    nodes.sort_by(|a, b| {
        let (ka, na) = key(a);
        let (kb, nb) = key(b);
        ka.is_unassigned()
            .cmp(&kb.is_unassigned())
            .then_with(|| na.cmp(nb))
            .then_with(|| ka.assigned_id().cmp(&kb.assigned_id()))
    });
}
