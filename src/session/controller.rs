//! 会话控制器：把用户意图翻译为有序的状态变更 + 委托给存储/构建的 IO
//!
//! 所有方法只在交互路径上串行调用（见 core::orchestrator）；多步操作失败时先做补偿再返回错误，
//! 调用结束后外部观察到的 Session 要么是新状态，要么与调用前完全一致。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::build::{BuildCompletion, BuildJob, BuildOrchestrator, BuildOutcome, BuildTicket, Compiler};
use crate::config::AppConfig;
use crate::core::SessionError;
use crate::store::{
    Project, ProjectDirectory, ProjectId, ProjectSummary, Resource, ResourceKind, ResourceStore,
};

use super::state::{Closed, Session};

/// 控制器需要的配置子集
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub resource_suffix: String,
    pub resource_dir: String,
    pub default_resource_content: String,
    pub default_project_path: Option<PathBuf>,
    pub build_timeout: Option<Duration>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl SessionSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            resource_suffix: cfg.app.resource_suffix.clone(),
            resource_dir: cfg.app.resource_dir.clone(),
            default_resource_content: cfg.app.default_resource_content.clone(),
            default_project_path: cfg.app.default_project_path.clone(),
            build_timeout: (cfg.build.timeout_secs > 0)
                .then(|| Duration::from_secs(cfg.build.timeout_secs)),
        }
    }
}

/// open_project 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened,
    AlreadyOpen,
}

/// 构建完成事件的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionReport {
    Applied {
        project_id: ProjectId,
        outcome: BuildOutcome,
    },
    /// 项目已关闭 / 重新打开 / 构建被新的派发取代
    Discarded {
        project_id: ProjectId,
        ticket: BuildTicket,
    },
}

/// 补全资源后缀；空名非法
pub fn normalize_resource_name(name: &str, suffix: &str) -> Result<String, SessionError> {
    let name = name.trim();
    if name.is_empty() || name == suffix {
        return Err(SessionError::InvalidValue(
            "Resource name must not be empty".to_string(),
        ));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(SessionError::InvalidValue(format!(
            "Invalid resource name: {name}"
        )));
    }
    if name.ends_with(suffix) {
        Ok(name.to_string())
    } else {
        Ok(format!("{name}{suffix}"))
    }
}

/// 会话控制器：持有会话聚合与全部协作者
pub struct ProjectSession {
    session: Session,
    projects: Arc<dyn ProjectDirectory>,
    resources: Arc<dyn ResourceStore>,
    builds: BuildOrchestrator,
    settings: SessionSettings,
}

impl ProjectSession {
    /// 返回控制器与构建完成事件接收端；接收端必须在交互路径上消费
    pub fn new(
        projects: Arc<dyn ProjectDirectory>,
        resources: Arc<dyn ResourceStore>,
        compiler: Arc<dyn Compiler>,
        settings: SessionSettings,
    ) -> (Self, mpsc::UnboundedReceiver<BuildCompletion>) {
        let (builds, completions) = BuildOrchestrator::new(compiler, settings.build_timeout);
        (
            Self {
                session: Session::new(),
                projects,
                resources,
                builds,
                settings,
            },
            completions,
        )
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn default_project_path(&self) -> Option<&Path> {
        self.settings.default_project_path.as_deref()
    }

    fn current_id(&self) -> Result<ProjectId, SessionError> {
        self.session
            .current()
            .map(str::to_string)
            .ok_or(SessionError::NoCurrentProject)
    }

    /// 打开项目；加载资源失败时整体回滚（丢弃新标签页与项目条目）
    pub async fn open_project(&mut self, project_id: &str) -> Result<OpenOutcome, SessionError> {
        if self.session.is_open(project_id) {
            tracing::debug!(project_id = %project_id, "project already open");
            return Ok(OpenOutcome::AlreadyOpen);
        }

        let project = self.projects.get_project_by_id(project_id).await?;
        self.session.insert(project);

        let resources = match self.resources.get_resources(project_id).await {
            Ok(resources) => resources,
            Err(e) => {
                tracing::warn!(project_id = %project_id, error = %e, "resource loading failed, rolling back open");
                self.session.discard(project_id);
                return Err(e);
            }
        };
        if let Some(tab) = self.session.tab_mut(project_id) {
            for resource in resources {
                tab.add_entry(resource);
            }
        }
        self.session.adopt_if_unset(project_id);

        tracing::info!(
            project_id = %project_id,
            open = self.session.open_projects().len(),
            "project opened"
        );
        Ok(OpenOutcome::Opened)
    }

    pub fn show_project(&mut self, project_id: &str) -> Result<(), SessionError> {
        self.session.activate(project_id)?;
        tracing::debug!(project_id = %project_id, "project shown");
        Ok(())
    }

    /// 在当前项目中打开资源；已打开时只切换焦点
    pub async fn open_resource(&mut self, name: &str, resource_id: &str) -> Result<(), SessionError> {
        let (project, tab) = self.session.current_tab()?;
        if tab.entry(resource_id).is_none() {
            return Err(SessionError::ResourceNotFound(resource_id.to_string()));
        }
        let project_id = project.project_id.clone();
        if tab.is_open(resource_id) {
            self.session.current_tab_mut()?.show(resource_id);
            return Ok(());
        }

        let contents = self.resources.read_resource(resource_id, &project_id).await?;
        self.session
            .current_tab_mut()?
            .open(name, resource_id, contents);
        tracing::debug!(project_id = %project_id, resource_id = %resource_id, "resource opened");
        Ok(())
    }

    /// 返回是否发生了焦点变化（未打开的资源为 no-op）
    pub fn show_resource(&mut self, resource_id: &str) -> Result<bool, SessionError> {
        let tab = self.session.current_tab_mut()?;
        if tab.entry(resource_id).is_none() {
            return Err(SessionError::ResourceNotFound(resource_id.to_string()));
        }
        Ok(tab.show(resource_id))
    }

    /// 返回是否真的关闭了（未打开的资源为 no-op）
    pub fn close_resource(&mut self, resource_id: &str) -> Result<bool, SessionError> {
        let tab = self.session.current_tab_mut()?;
        if tab.entry(resource_id).is_none() {
            return Err(SessionError::ResourceNotFound(resource_id.to_string()));
        }
        Ok(tab.close(resource_id))
    }

    /// 新建资源：补全后缀 → 写入存储 → 加入标签页
    pub async fn add_resource(&mut self, name: &str) -> Result<Resource, SessionError> {
        let name = normalize_resource_name(name, &self.settings.resource_suffix)?;
        let (project, tab) = self.session.current_tab()?;
        if tab.has_entry_named(&name, &self.settings.resource_dir) {
            return Err(SessionError::AlreadyExists(name));
        }
        let project_id = project.project_id.clone();
        let base_path = project.path.clone();
        let kind = ResourceKind::for_name(&name, &self.settings.resource_suffix);

        let resource = self
            .resources
            .add_resource(
                &name,
                &self.settings.resource_dir,
                kind,
                &project_id,
                &base_path,
                &self.settings.default_resource_content,
            )
            .await?;
        self.session.current_tab_mut()?.add_entry(resource.clone());
        tracing::info!(project_id = %project_id, resource = %resource.name, "resource added");
        Ok(resource)
    }

    /// 删除资源：存储拒绝时原样返回错误，标签页保持不变
    pub async fn remove_resource(&mut self, resource_id: &str) -> Result<(), SessionError> {
        let (project, tab) = self.session.current_tab()?;
        if tab.entry(resource_id).is_none() {
            return Err(SessionError::ResourceNotFound(resource_id.to_string()));
        }
        let project_id = project.project_id.clone();

        self.resources.remove_resource(resource_id, &project_id).await?;
        self.session.current_tab_mut()?.remove_entry(resource_id);
        tracing::info!(project_id = %project_id, resource_id = %resource_id, "resource removed");
        Ok(())
    }

    /// 用编辑器内容替换当前显示的缓冲
    pub fn edit_resource(&mut self, text: String) -> Result<(), SessionError> {
        if self.session.current_tab_mut()?.edit_displayed(text) {
            Ok(())
        } else {
            Err(SessionError::NoDisplayedResource)
        }
    }

    /// 保存当前显示的资源
    pub async fn save_resource(&mut self) -> Result<Resource, SessionError> {
        let (project, tab) = self.session.current_tab()?;
        let displayed = tab.displayed().ok_or(SessionError::NoDisplayedResource)?;
        let project_id = project.project_id.clone();
        let resource_id = displayed.resource_id.clone();
        let text = displayed.buffer.clone();
        let resource = tab
            .entry(&resource_id)
            .cloned()
            .ok_or_else(|| SessionError::ResourceNotFound(resource_id.clone()))?;

        self.resources
            .write_resource(&resource_id, &project_id, &text)
            .await?;
        self.session.current_tab_mut()?.mark_saved(&resource_id);
        tracing::info!(project_id = %project_id, resource_id = %resource_id, "resource saved");
        Ok(resource)
    }

    /// 关闭项目（缺省为当前项目）；没有打开的项目时为 no-op
    pub fn close_project(&mut self, project_id: Option<&str>) -> Result<Option<Closed>, SessionError> {
        let closed = self.session.close(project_id)?;
        if let Some(closed) = &closed {
            tracing::info!(
                project_id = %closed.project.project_id,
                current = ?closed.current,
                "project closed"
            );
        }
        Ok(closed)
    }

    /// 为当前项目派发构建；没有当前项目时为 no-op
    pub fn build_project(&mut self) -> Result<Option<BuildTicket>, SessionError> {
        let Ok(project_id) = self.current_id() else {
            return Ok(None);
        };
        let (project, tab) = self.session.current_tab()?;
        let job = BuildJob {
            project: project.clone(),
            resources: tab.entries().to_vec(),
        };
        let ticket = self.builds.start(job);
        if let Some(tab) = self.session.tab_mut(&project_id) {
            tab.begin_build(ticket);
        }
        Ok(Some(ticket))
    }

    /// 在交互路径上应用构建结果；按派发时捕获的 project_id + ticket 判断是否过期
    pub fn apply_completion(&mut self, completion: BuildCompletion) -> CompletionReport {
        let BuildCompletion {
            ticket,
            project_id,
            outcome,
        } = completion;
        let applied = self
            .session
            .tab_mut(&project_id)
            .map_or(false, |tab| tab.finish_build(ticket, outcome.clone()));
        if applied {
            CompletionReport::Applied {
                project_id,
                outcome,
            }
        } else {
            tracing::warn!(project_id = %project_id, ticket = %ticket, "discarding stale build result");
            CompletionReport::Discarded { project_id, ticket }
        }
    }

    pub async fn list_projects(&self) -> Result<Vec<ProjectSummary>, SessionError> {
        Ok(self
            .projects
            .get_projects()
            .await?
            .iter()
            .map(ProjectSummary::from)
            .collect())
    }

    pub async fn create_project(
        &self,
        name: &str,
        path: &Path,
        template: &str,
    ) -> Result<Project, SessionError> {
        self.projects.create_project(name, path, template).await
    }

    /// 从注册表移除项目；若已打开则随后关闭
    pub async fn remove_project(&mut self, project_id: &str) -> Result<(), SessionError> {
        self.projects.remove_project(project_id).await?;
        if self.session.is_open(project_id) {
            self.close_project(Some(project_id))?;
        }
        Ok(())
    }

    /// 会话退出：取消所有在途构建
    pub fn shutdown(&self) {
        self.builds.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{ArtifactRef, BuildError, BuildState};
    use crate::store::{FsProjectDirectory, FsResourceStore};
    use async_trait::async_trait;
    use tempfile::{tempdir, TempDir};
    use tokio::time::timeout;

    /// 有源文件就成功，否则失败
    struct SourceCountingCompiler;

    #[async_trait]
    impl Compiler for SourceCountingCompiler {
        async fn compile(&self, job: &BuildJob) -> Result<ArtifactRef, BuildError> {
            if job
                .resources
                .iter()
                .any(|r| r.kind == ResourceKind::DocumentSource)
            {
                Ok(ArtifactRef::from_path(&job.project.path.join("build/main.pdf")))
            } else {
                Err(BuildError::NoSources)
            }
        }
    }

    /// 删除请求一律拒绝的存储
    struct RejectingRemovals(Arc<FsResourceStore>);

    #[async_trait]
    impl ResourceStore for RejectingRemovals {
        async fn get_resources(&self, project_id: &str) -> Result<Vec<Resource>, SessionError> {
            self.0.get_resources(project_id).await
        }
        async fn read_resource(&self, id: &str, project_id: &str) -> Result<String, SessionError> {
            self.0.read_resource(id, project_id).await
        }
        async fn write_resource(
            &self,
            id: &str,
            project_id: &str,
            text: &str,
        ) -> Result<(), SessionError> {
            self.0.write_resource(id, project_id, text).await
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
            self.0
                .add_resource(name, relative_dir, kind, project_id, base_path, default_content)
                .await
        }
        async fn remove_resource(&self, _id: &str, _project_id: &str) -> Result<(), SessionError> {
            Err(SessionError::PermissionDenied("read-only project".into()))
        }
    }

    struct Fixture {
        _tmp: TempDir,
        root: PathBuf,
        directory: Arc<FsProjectDirectory>,
        store: Arc<FsResourceStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempdir().unwrap();
            let root = tmp.path().to_path_buf();
            let directory = Arc::new(FsProjectDirectory::new(
                root.join("data"),
                root.join("templates"),
                ".tex",
            ));
            let store = Arc::new(FsResourceStore::new(directory.clone()));
            Self {
                _tmp: tmp,
                root,
                directory,
                store,
            }
        }

        fn controller(&self) -> (ProjectSession, mpsc::UnboundedReceiver<BuildCompletion>) {
            ProjectSession::new(
                self.directory.clone(),
                self.store.clone(),
                Arc::new(SourceCountingCompiler),
                SessionSettings::default(),
            )
        }

        /// 创建项目并写入给定资源
        async fn project(&self, name: &str, resources: &[&str]) -> Project {
            let project = self
                .directory
                .create_project(name, &self.root.join(name), "")
                .await
                .unwrap();
            for res in resources {
                self.store
                    .add_resource(
                        res,
                        "",
                        ResourceKind::for_name(res, ".tex"),
                        &project.project_id,
                        &project.path,
                        "content",
                    )
                    .await
                    .unwrap();
            }
            project
        }
    }

    fn open_ids(controller: &ProjectSession) -> Vec<String> {
        controller
            .session()
            .open_projects()
            .iter()
            .map(|p| p.project_id.clone())
            .collect()
    }

    async fn next_completion(rx: &mut mpsc::UnboundedReceiver<BuildCompletion>) -> BuildCompletion {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("build should complete")
            .expect("channel open")
    }

    #[test]
    fn test_normalize_resource_name() {
        assert_eq!(normalize_resource_name("notes", ".tex").unwrap(), "notes.tex");
        assert_eq!(normalize_resource_name(" notes.tex ", ".tex").unwrap(), "notes.tex");
        assert!(normalize_resource_name("", ".tex").is_err());
        assert!(normalize_resource_name(".tex", ".tex").is_err());
        assert!(normalize_resource_name("../x", ".tex").is_err());
    }

    #[tokio::test]
    async fn test_open_project_is_idempotent() {
        let fx = Fixture::new();
        let p1 = fx.project("p1", &["a.tex", "b.tex"]).await;
        let (mut controller, _rx) = fx.controller();

        assert_eq!(controller.open_project(&p1.project_id).await.unwrap(), OpenOutcome::Opened);
        assert_eq!(
            controller.open_project(&p1.project_id).await.unwrap(),
            OpenOutcome::AlreadyOpen
        );
        let session = controller.session();
        assert_eq!(session.open_projects().len(), 1);
        assert_eq!(session.tab_count(), 1);
        assert_eq!(session.tab(&p1.project_id).unwrap().entries().len(), 2);
        assert_eq!(session.current(), Some(p1.project_id.as_str()));
    }

    #[tokio::test]
    async fn test_open_missing_project_is_not_found() {
        let fx = Fixture::new();
        let (mut controller, _rx) = fx.controller();
        let err = controller.open_project("ghost").await.unwrap_err();
        assert!(matches!(err, SessionError::ProjectNotFound(_)));
        assert!(controller.session().open_projects().is_empty());
        assert!(controller.session().invariants_hold());
    }

    #[tokio::test]
    async fn test_invalid_resource_rolls_back_open() {
        let fx = Fixture::new();
        let good = fx.project("good", &["main.tex"]).await;
        let bad = fx.project("bad", &["main.tex"]).await;
        std::fs::remove_file(bad.path.join("main.tex")).unwrap();

        let (mut controller, _rx) = fx.controller();
        controller.open_project(&good.project_id).await.unwrap();
        let before_ids = open_ids(&controller);

        let err = controller.open_project(&bad.project_id).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidResource(_)));

        let session = controller.session();
        assert_eq!(open_ids(&controller), before_ids);
        assert!(session.tab(&bad.project_id).is_none());
        assert_eq!(session.tab_count(), 1);
        assert_eq!(session.current(), Some(good.project_id.as_str()));
        assert!(session.invariants_hold());
    }

    #[tokio::test]
    async fn test_open_with_deleted_project_dir_fails_cleanly() {
        let fx = Fixture::new();
        let gone = fx.project("gone", &["main.tex"]).await;
        std::fs::remove_dir_all(&gone.path).unwrap();

        let (mut controller, _rx) = fx.controller();
        let err = controller.open_project(&gone.project_id).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidResource(_)));

        let session = controller.session();
        assert!(session.tab(&gone.project_id).is_none());
        assert_eq!(session.tab_count(), 0);
        assert!(session.current().is_none());
        assert!(session.invariants_hold());
    }

    #[tokio::test]
    async fn test_close_first_of_two_makes_second_current() {
        let fx = Fixture::new();
        let p1 = fx.project("p1", &["a.tex", "b.tex"]).await;
        let p2 = fx.project("p2", &[]).await;
        let (mut controller, _rx) = fx.controller();

        controller.open_project(&p1.project_id).await.unwrap();
        controller.open_project(&p2.project_id).await.unwrap();
        assert_eq!(controller.session().current(), Some(p1.project_id.as_str()));

        let closed = controller.close_project(None).unwrap().unwrap();
        assert_eq!(closed.project.project_id, p1.project_id);
        assert_eq!(controller.session().current(), Some(p2.project_id.as_str()));
        assert_eq!(open_ids(&controller), vec![p2.project_id.clone()]);

        controller.close_project(None).unwrap();
        assert!(controller.session().current().is_none());
        assert!(controller.close_project(None).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resource_lifecycle_in_current_project() {
        let fx = Fixture::new();
        let p1 = fx.project("p1", &[]).await;
        let (mut controller, _rx) = fx.controller();
        controller.open_project(&p1.project_id).await.unwrap();

        let notes = controller.add_resource("notes").await.unwrap();
        assert_eq!(notes.name, "notes.tex");
        assert_eq!(notes.kind, ResourceKind::DocumentSource);
        assert_eq!(
            fx.store
                .read_resource(&notes.resource_id, &p1.project_id)
                .await
                .unwrap(),
            ""
        );
        assert!(matches!(
            controller.add_resource("notes.tex").await,
            Err(SessionError::AlreadyExists(_))
        ));

        // 未打开的资源：show/close 是 no-op
        assert!(!controller.show_resource(&notes.resource_id).unwrap());
        assert!(!controller.close_resource(&notes.resource_id).unwrap());

        controller.open_resource("notes.tex", &notes.resource_id).await.unwrap();
        controller.edit_resource("\\section{Notes}".into()).unwrap();
        controller.save_resource().await.unwrap();
        assert_eq!(
            fx.store
                .read_resource(&notes.resource_id, &p1.project_id)
                .await
                .unwrap(),
            "\\section{Notes}"
        );
        let tab = controller.session().tab(&p1.project_id).unwrap();
        assert!(!tab.displayed().unwrap().dirty);

        assert!(controller.close_resource(&notes.resource_id).unwrap());
        assert!(matches!(
            controller.save_resource().await,
            Err(SessionError::NoDisplayedResource)
        ));

        controller.remove_resource(&notes.resource_id).await.unwrap();
        assert!(controller
            .session()
            .tab(&p1.project_id)
            .unwrap()
            .entries()
            .is_empty());
        assert!(matches!(
            controller.show_resource(&notes.resource_id),
            Err(SessionError::ResourceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_open_resource_missing_file_leaves_tab_unchanged() {
        let fx = Fixture::new();
        let p1 = fx.project("p1", &["main.tex"]).await;
        let (mut controller, _rx) = fx.controller();
        controller.open_project(&p1.project_id).await.unwrap();
        let main = controller.session().tab(&p1.project_id).unwrap().entries()[0].clone();

        std::fs::remove_file(p1.path.join("main.tex")).unwrap();
        let err = controller
            .open_resource("main.tex", &main.resource_id)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::ResourceNotFound(_)));
        let tab = controller.session().tab(&p1.project_id).unwrap();
        assert!(tab.open_resources().is_empty());
        assert!(tab.shown().is_none());
    }

    #[tokio::test]
    async fn test_remove_rejected_by_store_is_propagated() {
        let fx = Fixture::new();
        let p1 = fx.project("p1", &["main.tex"]).await;
        let (mut controller, _rx) = ProjectSession::new(
            fx.directory.clone(),
            Arc::new(RejectingRemovals(fx.store.clone())),
            Arc::new(SourceCountingCompiler),
            SessionSettings::default(),
        );
        controller.open_project(&p1.project_id).await.unwrap();
        let main = controller.session().tab(&p1.project_id).unwrap().entries()[0].clone();
        controller.open_resource("main.tex", &main.resource_id).await.unwrap();

        let err = controller.remove_resource(&main.resource_id).await.unwrap_err();
        assert!(matches!(err, SessionError::PermissionDenied(_)));
        let tab = controller.session().tab(&p1.project_id).unwrap();
        assert_eq!(tab.entries().len(), 1);
        assert!(tab.is_open(&main.resource_id));
    }

    #[tokio::test]
    async fn test_operations_without_current_project() {
        let fx = Fixture::new();
        let (mut controller, _rx) = fx.controller();
        assert!(controller.build_project().unwrap().is_none());
        assert!(matches!(
            controller.add_resource("x").await,
            Err(SessionError::NoCurrentProject)
        ));
        assert!(matches!(
            controller.save_resource().await,
            Err(SessionError::NoCurrentProject)
        ));
        assert!(matches!(
            controller.show_project("p1"),
            Err(SessionError::ProjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_build_without_sources_fails_with_no_artifact() {
        let fx = Fixture::new();
        let p1 = fx.project("p1", &["figure.png"]).await;
        let (mut controller, mut rx) = fx.controller();
        controller.open_project(&p1.project_id).await.unwrap();

        let ticket = controller.build_project().unwrap().unwrap();
        assert_eq!(
            controller.session().tab(&p1.project_id).unwrap().preview(),
            &BuildState::Running { ticket }
        );

        let completion = next_completion(&mut rx).await;
        assert!(completion.outcome.artifact().is_none());
        assert!(!completion.outcome.success());
        let report = controller.apply_completion(completion);
        assert!(matches!(report, CompletionReport::Applied { .. }));
        assert!(matches!(
            controller.session().tab(&p1.project_id).unwrap().preview(),
            BuildState::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn test_stale_completion_does_not_touch_other_project() {
        let fx = Fixture::new();
        let a = fx.project("a", &["main.tex"]).await;
        let b = fx.project("b", &["main.tex"]).await;
        let (mut controller, mut rx) = fx.controller();

        controller.open_project(&a.project_id).await.unwrap();
        controller.build_project().unwrap().unwrap();
        controller.close_project(None).unwrap();
        controller.open_project(&b.project_id).await.unwrap();

        let completion = next_completion(&mut rx).await;
        assert_eq!(completion.project_id, a.project_id);
        let report = controller.apply_completion(completion);
        assert!(matches!(report, CompletionReport::Discarded { .. }));
        assert_eq!(
            controller.session().tab(&b.project_id).unwrap().preview(),
            &BuildState::Idle
        );
    }

    #[tokio::test]
    async fn test_reopened_project_ignores_old_build() {
        let fx = Fixture::new();
        let a = fx.project("a", &["main.tex"]).await;
        let (mut controller, mut rx) = fx.controller();

        controller.open_project(&a.project_id).await.unwrap();
        controller.build_project().unwrap();
        controller.close_project(None).unwrap();
        controller.open_project(&a.project_id).await.unwrap();

        let report = controller.apply_completion(next_completion(&mut rx).await);
        assert!(matches!(report, CompletionReport::Discarded { .. }));
        assert_eq!(
            controller.session().tab(&a.project_id).unwrap().preview(),
            &BuildState::Idle
        );
    }

    #[tokio::test]
    async fn test_remove_open_project_closes_it() {
        let fx = Fixture::new();
        let p1 = fx.project("p1", &[]).await;
        let (mut controller, _rx) = fx.controller();
        controller.open_project(&p1.project_id).await.unwrap();

        assert_eq!(controller.list_projects().await.unwrap().len(), 1);
        controller.remove_project(&p1.project_id).await.unwrap();
        assert!(controller.session().open_projects().is_empty());
        assert!(controller.list_projects().await.unwrap().is_empty());
        assert!(matches!(
            controller.remove_project(&p1.project_id).await,
            Err(SessionError::ProjectNotFound(_))
        ));
    }
}
