//! 状态投影：SessionView
//!
//! 展示层只持有 SessionView（有序的已打开项目、当前项目、每个标签页的资源与预览）；
//! 完整的 Session 只在会话任务内部存在，每步处理后重新投影并通过 watch 通道发布。

use std::path::PathBuf;

use serde::Serialize;

use crate::build::BuildState;
use crate::session::{OpenResource, ProjectTab, Session};
use crate::store::{ProjectId, Resource, ResourceId};

/// 展示层看到的会话快照
#[derive(Clone, Debug, Default, Serialize)]
pub struct SessionView {
    /// 按打开顺序排列
    pub projects: Vec<ProjectView>,
    pub current: Option<ProjectId>,
}

/// 单个已打开项目（含标签页）的快照
#[derive(Clone, Debug, Serialize)]
pub struct ProjectView {
    pub project_id: ProjectId,
    pub name: String,
    pub path: PathBuf,
    pub resources: Vec<Resource>,
    pub open: Vec<OpenResource>,
    pub shown: Option<ResourceId>,
    pub preview: BuildState,
}

impl SessionView {
    /// 从内部会话投影出快照
    pub fn project(session: &Session) -> Self {
        let projects = session
            .open_projects()
            .iter()
            .filter_map(|p| {
                let tab = session.tab(&p.project_id)?;
                Some(ProjectView::new(p.path.clone(), tab))
            })
            .collect();
        Self {
            projects,
            current: session.current().map(str::to_string),
        }
    }

    pub fn current_project(&self) -> Option<&ProjectView> {
        let id = self.current.as_deref()?;
        self.projects.iter().find(|p| p.project_id == id)
    }

    pub fn find(&self, project_id: &str) -> Option<&ProjectView> {
        self.projects.iter().find(|p| p.project_id == project_id)
    }
}

impl ProjectView {
    fn new(path: PathBuf, tab: &ProjectTab) -> Self {
        Self {
            project_id: tab.project_id().to_string(),
            name: tab.title().to_string(),
            path,
            resources: tab.entries().to_vec(),
            open: tab.open_resources().to_vec(),
            shown: tab.shown().map(str::to_string),
            preview: tab.preview().clone(),
        }
    }

    /// 当前显示的资源缓冲
    pub fn displayed(&self) -> Option<&OpenResource> {
        let shown = self.shown.as_deref()?;
        self.open.iter().find(|r| r.resource_id == shown)
    }
}
