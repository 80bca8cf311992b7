//! 数据模型：Project / Resource 及列表摘要

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 项目 ID（稳定、全局唯一）
pub type ProjectId = String;

/// 资源 ID（项目内唯一）
pub type ResourceId = String;

/// 项目：由持久化层创建，会话只引用不修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: ProjectId,
    pub name: String,
    pub path: PathBuf,
    pub last_modified: DateTime<Utc>,
}

/// 资源类别：可编译源文件 / 其它附属文件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    DocumentSource,
    Asset,
}

impl ResourceKind {
    /// 按文件后缀推断类别
    pub fn for_name(name: &str, source_suffix: &str) -> Self {
        if name.ends_with(source_suffix) {
            ResourceKind::DocumentSource
        } else {
            ResourceKind::Asset
        }
    }
}

/// 资源元数据；内容按需通过 ResourceStore::read_resource 读取
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub resource_id: ResourceId,
    pub name: String,
    pub kind: ResourceKind,
    /// 相对项目根目录的子目录，空串表示根目录
    #[serde(default)]
    pub relative_dir: String,
}

impl Resource {
    /// 资源文件相对项目根的路径
    pub fn relative_path(&self) -> PathBuf {
        if self.relative_dir.is_empty() {
            PathBuf::from(&self.name)
        } else {
            PathBuf::from(&self.relative_dir).join(&self.name)
        }
    }
}

/// 首页项目卡片：名称 + 最后修改日期
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub project_id: ProjectId,
    pub name: String,
    pub modified: String,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        Self {
            project_id: project.project_id.clone(),
            name: project.name.clone(),
            modified: format!("Last modified: {}", project.last_modified.date_naive()),
        }
    }
}
