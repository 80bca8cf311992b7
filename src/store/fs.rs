//! 磁盘实现：项目注册表 + 项目内资源清单
//!
//! 布局：
//! - `<data_dir>/projects.json`：已注册项目列表（id、名称、路径、最后修改时间）
//! - `<project>/.folio/project.json`：资源清单；资源文件位于 `<project>/<relative_dir>/<name>`
//!
//! 所有 JSON 写入都走「临时文件 + rename」，避免半写入的清单。

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use walkdir::WalkDir;

use super::traits::{ProjectDirectory, ResourceStore};
use super::types::{Project, Resource, ResourceKind};
use crate::core::SessionError;

const MANIFEST_DIR: &str = ".folio";
const MANIFEST_FILE: &str = "project.json";
const REGISTRY_FILE: &str = "projects.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Registry {
    #[serde(default)]
    projects: Vec<Project>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    #[serde(default)]
    resources: Vec<Resource>,
}

fn project_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[\p{L}\p{N}_][\p{L}\p{N}_ .\-]*$").expect("project name regex is valid")
    })
}

fn manifest_path(project_root: &Path) -> PathBuf {
    project_root.join(MANIFEST_DIR).join(MANIFEST_FILE)
}

/// 同目录下的唯一临时文件名，不会与其它资源重名
fn temp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4().simple()))
}

/// 临时文件 + rename 的原子写
async fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = temp_sibling(path);
    if let Err(e) = tokio::fs::write(&tmp_path, data).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    Ok(())
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SessionError> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| SessionError::Io(std::io::Error::new(IoErrorKind::InvalidData, e)))?;
    write_atomic(path, &json)
        .await
        .map_err(|e| SessionError::from_io(e, path.display().to_string()))
}

/// 基于 JSON 注册表的项目目录
#[derive(Debug)]
pub struct FsProjectDirectory {
    registry_path: PathBuf,
    templates_dir: PathBuf,
    source_suffix: String,
    /// 串行化注册表的读-改-写
    lock: Mutex<()>,
}

impl FsProjectDirectory {
    pub fn new(
        data_dir: impl AsRef<Path>,
        templates_dir: impl AsRef<Path>,
        source_suffix: impl Into<String>,
    ) -> Self {
        Self {
            registry_path: data_dir.as_ref().join(REGISTRY_FILE),
            templates_dir: templates_dir.as_ref().to_path_buf(),
            source_suffix: source_suffix.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load_registry(&self) -> Result<Registry, SessionError> {
        match tokio::fs::read_to_string(&self.registry_path).await {
            Ok(data) => serde_json::from_str(&data).map_err(|e| {
                SessionError::InvalidResource(format!(
                    "{}: {}",
                    self.registry_path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(Registry::default()),
            Err(e) => Err(SessionError::from_io(
                e,
                self.registry_path.display().to_string(),
            )),
        }
    }

    /// 更新项目的最后修改时间（资源写入后调用）
    pub async fn touch(&self, project_id: &str) -> Result<(), SessionError> {
        let _guard = self.lock.lock().await;
        let mut registry = self.load_registry().await?;
        let project = registry
            .projects
            .iter_mut()
            .find(|p| p.project_id == project_id)
            .ok_or_else(|| SessionError::ProjectNotFound(project_id.to_string()))?;
        project.last_modified = Utc::now();
        write_json(&self.registry_path, &registry).await
    }

    fn validate(&self, name: &str, path: &Path, template: &str) -> Result<(), SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::InvalidValue(
                "Project name must not be empty".to_string(),
            ));
        }
        if !project_name_pattern().is_match(name) {
            return Err(SessionError::InvalidValue(format!(
                "Invalid project name: {name}"
            )));
        }
        if path.as_os_str().is_empty() {
            return Err(SessionError::InvalidValue(
                "Project path must not be empty".to_string(),
            ));
        }
        if !template.is_empty() && !self.templates_dir.join(template).is_dir() {
            return Err(SessionError::InvalidValue(format!(
                "Unknown template: {template}"
            )));
        }
        Ok(())
    }
}

/// 把模板目录复制到项目目录，返回复制出的资源（跳过隐藏文件）
fn copy_template(
    template_root: &Path,
    project_root: &Path,
    source_suffix: &str,
) -> Result<Vec<Resource>, SessionError> {
    let mut resources = Vec::new();
    for entry in WalkDir::new(template_root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            SessionError::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::from(IoErrorKind::Other)),
            )
        })?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(template_root)
            .map_err(|e| SessionError::InvalidValue(e.to_string()))?;
        let target = project_root.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SessionError::from_io(e, parent.display().to_string()))?;
        }
        std::fs::copy(entry.path(), &target)
            .map_err(|e| SessionError::from_io(e, target.display().to_string()))?;

        let relative_dir = relative
            .parent()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        resources.push(Resource {
            resource_id: uuid::Uuid::new_v4().to_string(),
            kind: ResourceKind::for_name(&name, source_suffix),
            name,
            relative_dir,
        });
    }
    Ok(resources)
}

#[async_trait]
impl ProjectDirectory for FsProjectDirectory {
    async fn get_project_by_id(&self, project_id: &str) -> Result<Project, SessionError> {
        self.load_registry()
            .await?
            .projects
            .into_iter()
            .find(|p| p.project_id == project_id)
            .ok_or_else(|| SessionError::ProjectNotFound(project_id.to_string()))
    }

    async fn get_projects(&self) -> Result<Vec<Project>, SessionError> {
        Ok(self.load_registry().await?.projects)
    }

    async fn create_project(
        &self,
        name: &str,
        path: &Path,
        template: &str,
    ) -> Result<Project, SessionError> {
        self.validate(name, path, template)?;
        let name = name.trim();

        let _guard = self.lock.lock().await;
        let mut registry = self.load_registry().await?;
        if registry
            .projects
            .iter()
            .any(|p| p.path == path || p.name == name)
        {
            return Err(SessionError::AlreadyExists(name.to_string()));
        }

        match tokio::fs::metadata(path).await {
            Ok(meta) if !meta.is_dir() => {
                return Err(SessionError::AlreadyExists(path.display().to_string()))
            }
            Ok(_) => {
                let mut entries = tokio::fs::read_dir(path)
                    .await
                    .map_err(|e| SessionError::from_io(e, path.display().to_string()))?;
                if entries
                    .next_entry()
                    .await
                    .map_err(|e| SessionError::from_io(e, path.display().to_string()))?
                    .is_some()
                {
                    return Err(SessionError::DirectoryNotEmpty(path.to_path_buf()));
                }
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => {}
            Err(e) => return Err(SessionError::from_io(e, path.display().to_string())),
        }
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| SessionError::from_io(e, path.display().to_string()))?;

        let resources = if template.is_empty() {
            Vec::new()
        } else {
            let template_root = self.templates_dir.join(template);
            let project_root = path.to_path_buf();
            let suffix = self.source_suffix.clone();
            tokio::task::spawn_blocking(move || {
                copy_template(&template_root, &project_root, &suffix)
            })
            .await
            .map_err(|e| SessionError::Io(std::io::Error::new(IoErrorKind::Other, e)))??
        };
        write_json(&manifest_path(path), &Manifest { resources }).await?;

        let project = Project {
            project_id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            path: path.to_path_buf(),
            last_modified: Utc::now(),
        };
        registry.projects.push(project.clone());
        write_json(&self.registry_path, &registry).await?;
        tracing::info!(project_id = %project.project_id, name = %project.name, "project created");
        Ok(project)
    }

    async fn remove_project(&self, project_id: &str) -> Result<(), SessionError> {
        let _guard = self.lock.lock().await;
        let mut registry = self.load_registry().await?;
        let before = registry.projects.len();
        registry.projects.retain(|p| p.project_id != project_id);
        if registry.projects.len() == before {
            return Err(SessionError::ProjectNotFound(project_id.to_string()));
        }
        write_json(&self.registry_path, &registry).await?;
        tracing::info!(project_id = %project_id, "project removed from registry");
        Ok(())
    }
}

/// 基于项目清单的资源存储
#[derive(Debug)]
pub struct FsResourceStore {
    projects: Arc<FsProjectDirectory>,
    lock: Mutex<()>,
}

impl FsResourceStore {
    pub fn new(projects: Arc<FsProjectDirectory>) -> Self {
        Self {
            projects,
            lock: Mutex::new(()),
        }
    }

    async fn project_root(&self, project_id: &str) -> Result<PathBuf, SessionError> {
        Ok(self.projects.get_project_by_id(project_id).await?.path)
    }

    /// 清单缺失时：项目目录仍在则视为空清单，目录不存在则为 InvalidResource
    async fn load_manifest(&self, root: &Path) -> Result<Manifest, SessionError> {
        let path = manifest_path(root);
        match tokio::fs::read_to_string(&path).await {
            Ok(data) => serde_json::from_str(&data)
                .map_err(|e| SessionError::InvalidResource(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                match tokio::fs::metadata(root).await {
                    Ok(meta) if meta.is_dir() => Ok(Manifest::default()),
                    _ => Err(SessionError::InvalidResource(format!(
                        "project directory missing: {}",
                        root.display()
                    ))),
                }
            }
            Err(e) => Err(SessionError::from_io(e, path.display().to_string())),
        }
    }

    async fn find(
        &self,
        resource_id: &str,
        project_id: &str,
    ) -> Result<(PathBuf, Resource), SessionError> {
        let root = self.project_root(project_id).await?;
        let resource = self
            .load_manifest(&root)
            .await?
            .resources
            .into_iter()
            .find(|r| r.resource_id == resource_id)
            .ok_or_else(|| SessionError::ResourceNotFound(resource_id.to_string()))?;
        Ok((root, resource))
    }
}

#[async_trait]
impl ResourceStore for FsResourceStore {
    async fn get_resources(&self, project_id: &str) -> Result<Vec<Resource>, SessionError> {
        let root = self.project_root(project_id).await?;
        let manifest = self.load_manifest(&root).await?;
        for resource in &manifest.resources {
            let path = root.join(resource.relative_path());
            let unreadable =
                |e: std::io::Error| SessionError::InvalidResource(format!("{}: {}", resource.name, e));
            match resource.kind {
                // 源文件要能作为文本打开；素材只确认存在
                ResourceKind::DocumentSource => {
                    let bytes = tokio::fs::read(&path).await.map_err(unreadable)?;
                    if std::str::from_utf8(&bytes).is_err() {
                        return Err(SessionError::InvalidResource(format!(
                            "{}: not valid UTF-8",
                            resource.name
                        )));
                    }
                }
                ResourceKind::Asset => {
                    let meta = tokio::fs::metadata(&path).await.map_err(unreadable)?;
                    if !meta.is_file() {
                        return Err(SessionError::InvalidResource(format!(
                            "{}: not a file",
                            resource.name
                        )));
                    }
                }
            }
        }
        Ok(manifest.resources)
    }

    async fn read_resource(
        &self,
        resource_id: &str,
        project_id: &str,
    ) -> Result<String, SessionError> {
        let (root, resource) = self.find(resource_id, project_id).await?;
        match tokio::fs::read_to_string(root.join(resource.relative_path())).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                Err(SessionError::ResourceNotFound(resource.name))
            }
            Err(e) => Err(SessionError::from_io(e, resource.name)),
        }
    }

    async fn write_resource(
        &self,
        resource_id: &str,
        project_id: &str,
        text: &str,
    ) -> Result<(), SessionError> {
        let (root, resource) = self.find(resource_id, project_id).await?;
        let path = root.join(resource.relative_path());
        write_atomic(&path, text.as_bytes())
            .await
            .map_err(|e| SessionError::from_io(e, path.display().to_string()))?;
        self.projects.touch(project_id).await
    }

    async fn add_resource(
        &self,
        name: &str,
        relative_dir: &str,
        kind: ResourceKind,
        project_id: &str,
        base_path: &Path,
        default_content: &str,
    ) -> Result<Resource, SessionError> {
        let _guard = self.lock.lock().await;
        let mut manifest = self.load_manifest(base_path).await?;
        if manifest
            .resources
            .iter()
            .any(|r| r.name == name && r.relative_dir == relative_dir)
        {
            return Err(SessionError::AlreadyExists(name.to_string()));
        }

        let resource = Resource {
            resource_id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            kind,
            relative_dir: relative_dir.to_string(),
        };
        let path = base_path.join(resource.relative_path());
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(SessionError::AlreadyExists(path.display().to_string()));
        }
        write_atomic(&path, default_content.as_bytes())
            .await
            .map_err(|e| SessionError::from_io(e, path.display().to_string()))?;

        manifest.resources.push(resource.clone());
        write_json(&manifest_path(base_path), &manifest).await?;
        self.projects.touch(project_id).await?;
        Ok(resource)
    }

    async fn remove_resource(
        &self,
        resource_id: &str,
        project_id: &str,
    ) -> Result<(), SessionError> {
        let _guard = self.lock.lock().await;
        let root = self.project_root(project_id).await?;
        let mut manifest = self.load_manifest(&root).await?;
        let index = manifest
            .resources
            .iter()
            .position(|r| r.resource_id == resource_id)
            .ok_or_else(|| SessionError::ResourceNotFound(resource_id.to_string()))?;

        let path = root.join(manifest.resources[index].relative_path());
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == IoErrorKind::NotFound => {}
            Err(e) => return Err(SessionError::from_io(e, path.display().to_string())),
        }
        manifest.resources.remove(index);
        write_json(&manifest_path(&root), &manifest).await?;
        self.projects.touch(project_id).await
    }
}
