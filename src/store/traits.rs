//! 持久化协作者接口
//!
//! 会话层只依赖这两个 trait；磁盘实现见 fs.rs，测试中可替换为内存/故障注入实现。

use std::path::Path;

use async_trait::async_trait;

use super::types::{Project, Resource, ResourceKind};
use crate::core::SessionError;

/// 项目目录：查找、列出、创建、移除项目
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// 按 ID 查找；不存在时返回 ProjectNotFound
    async fn get_project_by_id(&self, project_id: &str) -> Result<Project, SessionError>;

    async fn get_projects(&self) -> Result<Vec<Project>, SessionError>;

    /// 创建项目；template 为空串表示不使用模板
    async fn create_project(
        &self,
        name: &str,
        path: &Path,
        template: &str,
    ) -> Result<Project, SessionError>;

    async fn remove_project(&self, project_id: &str) -> Result<(), SessionError>;
}

/// 资源存储：项目内资源的增删查改
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// 列出项目全部资源；清单损坏或文件不可读时返回 InvalidResource
    async fn get_resources(&self, project_id: &str) -> Result<Vec<Resource>, SessionError>;

    async fn read_resource(&self, resource_id: &str, project_id: &str)
        -> Result<String, SessionError>;

    async fn write_resource(
        &self,
        resource_id: &str,
        project_id: &str,
        text: &str,
    ) -> Result<(), SessionError>;

    #[allow(clippy::too_many_arguments)]
    async fn add_resource(
        &self,
        name: &str,
        relative_dir: &str,
        kind: ResourceKind,
        project_id: &str,
        base_path: &Path,
        default_content: &str,
    ) -> Result<Resource, SessionError>;

    async fn remove_resource(&self, resource_id: &str, project_id: &str)
        -> Result<(), SessionError>;
}
