// ==========================================
// 周考勤登记引擎 - 人员与督导名册
// ==========================================
// 对齐: servers 表 (外勤人员) / users 表 (督导)
// 说明: 名册由外部协作方提供，本引擎只读
// ==========================================

use crate::domain::types::WorkerStatus;
use serde::{Deserialize, Serialize};

/// 外勤人员 (servidor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub id: String,
    pub name: String,
    pub matricula: String,
    pub status: WorkerStatus,
    pub supervisor_area_id: Option<String>,
    pub supervisor_geral_id: Option<String>,
}

/// 区域督导 (Supervisor de Área)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorArea {
    pub id: String,
    pub name: String,
    pub supervisor_geral_id: Option<String>,
}

/// 总督导 (Supervisor Geral)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorGeral {
    pub id: String,
    pub name: String,
}

/// 名册快照: 三组平铺行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    pub workers: Vec<Worker>,
    pub areas: Vec<SupervisorArea>,
    pub gerais: Vec<SupervisorGeral>,
}

impl Roster {
    pub fn worker_ids(&self) -> Vec<String> {
        self.workers.iter().map(|w| w.id.clone()).collect()
    }
}

impl Worker {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            matricula: String::new(),
            status: WorkerStatus::Active,
            supervisor_area_id: None,
            supervisor_geral_id: None,
        }
    }

    pub fn with_area(mut self, area_id: &str) -> Self {
        self.supervisor_area_id = Some(area_id.to_string());
        self
    }

    pub fn with_geral(mut self, geral_id: &str) -> Self {
        self.supervisor_geral_id = Some(geral_id.to_string());
        self
    }
}
