// ==========================================
// 周考勤登记引擎 - 角色可见范围
// ==========================================
// 职责: 给定调用方角色与ID，一次性确定可见的名册子集
// 说明: 下游 (层级/汇总/提交) 只处理这里给出的明确集合，
//       不再按角色拼装过滤条件
// ==========================================

use crate::domain::roster::Roster;
use crate::domain::types::Role;
use std::collections::HashSet;
use tracing::debug;

/// 按角色裁剪名册
///
/// - super_admin / gestor: 全部
/// - supervisor_geral: supervisor_geral_id 为调用方，或所在区域归属调用方的人员
/// - supervisor_area: supervisor_area_id 为调用方的人员
/// - servidor: 仅本人
///
/// 督导行裁剪为层级中实际承载可见人员的节点，外加调用方自身节点
pub fn scope_roster(role: Role, scope_id: &str, roster: &Roster) -> Roster {
    if role.sees_everything() {
        return roster.clone();
    }

    let workers: Vec<_> = match role {
        Role::SupervisorGeral => {
            let owned_areas: HashSet<&str> = roster
                .areas
                .iter()
                .filter(|a| a.supervisor_geral_id.as_deref() == Some(scope_id))
                .map(|a| a.id.as_str())
                .collect();
            roster
                .workers
                .iter()
                .filter(|w| {
                    w.supervisor_geral_id.as_deref() == Some(scope_id)
                        || w
                            .supervisor_area_id
                            .as_deref()
                            .map_or(false, |a| owned_areas.contains(a))
                })
                .cloned()
                .collect()
        }
        Role::SupervisorArea => roster
            .workers
            .iter()
            .filter(|w| w.supervisor_area_id.as_deref() == Some(scope_id))
            .cloned()
            .collect(),
        Role::Servidor => roster
            .workers
            .iter()
            .filter(|w| w.id == scope_id)
            .take(1)
            .cloned()
            .collect(),
        Role::SuperAdmin | Role::Gestor => roster.workers.clone(),
    };

    let mut area_ids: HashSet<&str> = workers
        .iter()
        .filter_map(|w| w.supervisor_area_id.as_deref())
        .collect();
    match role {
        Role::SupervisorArea => {
            area_ids.insert(scope_id);
        }
        Role::SupervisorGeral => {
            for a in &roster.areas {
                if a.supervisor_geral_id.as_deref() == Some(scope_id) {
                    area_ids.insert(a.id.as_str());
                }
            }
        }
        _ => {}
    }

    let areas: Vec<_> = roster
        .areas
        .iter()
        .filter(|a| area_ids.contains(a.id.as_str()))
        .cloned()
        .collect();

    // 与层级构建一致: 有已知区域的人员挂在区域的总督导下，
    // 只有无区域 (或区域未知) 的人员按自身 supervisor_geral_id 归属
    let known_areas: HashSet<&str> = areas.iter().map(|a| a.id.as_str()).collect();
    let mut geral_ids: HashSet<&str> = workers
        .iter()
        .filter(|w| {
            w.supervisor_area_id
                .as_deref()
                .map_or(true, |a| !known_areas.contains(a))
        })
        .filter_map(|w| w.supervisor_geral_id.as_deref())
        .chain(areas.iter().filter_map(|a| a.supervisor_geral_id.as_deref()))
        .collect();
    if role == Role::SupervisorGeral {
        geral_ids.insert(scope_id);
    }

    let gerais: Vec<_> = roster
        .gerais
        .iter()
        .filter(|g| geral_ids.contains(g.id.as_str()))
        .cloned()
        .collect();

    debug!(
        role = %role,
        scope_id,
        workers = workers.len(),
        areas = areas.len(),
        gerais = gerais.len(),
        "名册按角色裁剪"
    );

    Roster {
        workers,
        areas,
        gerais,
    }
}
