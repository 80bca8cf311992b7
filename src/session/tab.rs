//! 项目标签页：资源列表、已打开资源、当前显示资源与预览状态
//!
//! 纯内存结构，不做 IO；会话控制器负责先完成存储读写，再调用这里的变更方法。

use serde::Serialize;

use crate::build::{BuildOutcome, BuildState, BuildTicket};
use crate::store::{ProjectId, Resource, ResourceId};

/// 编辑区中打开的资源缓冲
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenResource {
    pub resource_id: ResourceId,
    pub name: String,
    pub buffer: String,
    /// 缓冲与磁盘内容不一致
    pub dirty: bool,
}

/// 单个项目的标签页状态
#[derive(Debug, Clone)]
pub struct ProjectTab {
    project_id: ProjectId,
    title: String,
    entries: Vec<Resource>,
    open: Vec<OpenResource>,
    shown: Option<ResourceId>,
    preview: BuildState,
}

impl ProjectTab {
    pub fn new(project_id: impl Into<ProjectId>, title: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            title: title.into(),
            entries: Vec::new(),
            open: Vec::new(),
            shown: None,
            preview: BuildState::Idle,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn entries(&self) -> &[Resource] {
        &self.entries
    }

    pub fn open_resources(&self) -> &[OpenResource] {
        &self.open
    }

    pub fn shown(&self) -> Option<&str> {
        self.shown.as_deref()
    }

    pub fn preview(&self) -> &BuildState {
        &self.preview
    }

    pub fn entry(&self, resource_id: &str) -> Option<&Resource> {
        self.entries.iter().find(|r| r.resource_id == resource_id)
    }

    pub fn has_entry_named(&self, name: &str, relative_dir: &str) -> bool {
        self.entries
            .iter()
            .any(|r| r.name == name && r.relative_dir == relative_dir)
    }

    pub fn is_open(&self, resource_id: &str) -> bool {
        self.open.iter().any(|r| r.resource_id == resource_id)
    }

    /// 资源列表中追加条目（已存在则忽略）
    pub fn add_entry(&mut self, resource: Resource) {
        if self.entry(&resource.resource_id).is_none() {
            self.entries.push(resource);
        }
    }

    /// 移除条目并关闭对应的编辑缓冲
    pub fn remove_entry(&mut self, resource_id: &str) -> Option<Resource> {
        let index = self
            .entries
            .iter()
            .position(|r| r.resource_id == resource_id)?;
        self.close(resource_id);
        Some(self.entries.remove(index))
    }

    /// 打开并显示资源；已打开时只切换焦点，保留未保存的修改
    pub fn open(&mut self, name: &str, resource_id: &str, contents: String) {
        if !self.is_open(resource_id) {
            self.open.push(OpenResource {
                resource_id: resource_id.to_string(),
                name: name.to_string(),
                buffer: contents,
                dirty: false,
            });
        }
        self.shown = Some(resource_id.to_string());
    }

    /// 切换显示的资源；未打开时为 no-op，返回是否生效
    pub fn show(&mut self, resource_id: &str) -> bool {
        if !self.is_open(resource_id) {
            return false;
        }
        self.shown = Some(resource_id.to_string());
        true
    }

    /// 关闭资源；若关闭的是当前显示的资源，焦点移到最后一个仍打开的资源
    pub fn close(&mut self, resource_id: &str) -> bool {
        let before = self.open.len();
        self.open.retain(|r| r.resource_id != resource_id);
        if self.open.len() == before {
            return false;
        }
        if self.shown.as_deref() == Some(resource_id) {
            self.shown = self.open.last().map(|r| r.resource_id.clone());
        }
        true
    }

    /// 当前显示的资源缓冲
    pub fn displayed(&self) -> Option<&OpenResource> {
        let shown = self.shown.as_deref()?;
        self.open.iter().find(|r| r.resource_id == shown)
    }

    /// 用编辑器内容替换当前显示的缓冲
    pub fn edit_displayed(&mut self, text: String) -> bool {
        let Some(shown) = self.shown.clone() else {
            return false;
        };
        match self.open.iter_mut().find(|r| r.resource_id == shown) {
            Some(open) => {
                if open.buffer != text {
                    open.buffer = text;
                    open.dirty = true;
                }
                true
            }
            None => false,
        }
    }

    pub fn mark_saved(&mut self, resource_id: &str) {
        if let Some(open) = self.open.iter_mut().find(|r| r.resource_id == resource_id) {
            open.dirty = false;
        }
    }

    /// 新的构建接管预览（旧票据的结果此后会被丢弃）
    pub fn begin_build(&mut self, ticket: BuildTicket) {
        self.preview = BuildState::Running { ticket };
    }

    /// 仅当票据与当前在途构建一致时应用结果，返回是否应用
    pub fn finish_build(&mut self, ticket: BuildTicket, outcome: BuildOutcome) -> bool {
        match self.preview {
            BuildState::Running { ticket: running } if running == ticket => {
                self.preview = outcome.into();
                true
            }
            _ => false,
        }
    }
}
