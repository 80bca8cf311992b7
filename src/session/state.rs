//! 会话聚合：已打开项目（有序）、每项目标签页、当前项目游标
//!
//! 不变量：
//! - open_projects 按 project_id 去重，顺序即打开顺序
//! - tabs 的键集合与 open_projects 完全一致
//! - current 为空，或指向 open_projects 中的某个项目；open_projects 非空时 current 必定非空
//!
//! 所有修改方法在同一次调用内维护上述不变量，调用方无需额外修正游标。

use std::collections::HashMap;

use crate::core::SessionError;
use crate::store::{Project, ProjectId};

use super::tab::ProjectTab;

/// 关闭项目后的结果：被关闭的项目与新的当前项目
#[derive(Debug, Clone)]
pub struct Closed {
    pub project: Project,
    pub current: Option<ProjectId>,
}

#[derive(Debug, Default)]
pub struct Session {
    open_projects: Vec<Project>,
    tabs: HashMap<ProjectId, ProjectTab>,
    current: Option<ProjectId>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_projects(&self) -> &[Project] {
        &self.open_projects
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn is_open(&self, project_id: &str) -> bool {
        self.open_projects.iter().any(|p| p.project_id == project_id)
    }

    pub fn project(&self, project_id: &str) -> Option<&Project> {
        self.open_projects.iter().find(|p| p.project_id == project_id)
    }

    pub fn tab(&self, project_id: &str) -> Option<&ProjectTab> {
        self.tabs.get(project_id)
    }

    pub fn tab_mut(&mut self, project_id: &str) -> Option<&mut ProjectTab> {
        self.tabs.get_mut(project_id)
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    /// 当前项目及其标签页；没有当前项目时返回 NoCurrentProject
    pub fn current_tab(&self) -> Result<(&Project, &ProjectTab), SessionError> {
        let id = self.current.as_deref().ok_or(SessionError::NoCurrentProject)?;
        match (self.project(id), self.tabs.get(id)) {
            (Some(project), Some(tab)) => Ok((project, tab)),
            _ => Err(SessionError::NoCurrentProject),
        }
    }

    pub fn current_tab_mut(&mut self) -> Result<&mut ProjectTab, SessionError> {
        let id = self.current.as_deref().ok_or(SessionError::NoCurrentProject)?;
        self.tabs.get_mut(id).ok_or(SessionError::NoCurrentProject)
    }

    /// 追加项目并创建空标签页；已打开时返回 false 且不做任何修改
    pub fn insert(&mut self, project: Project) -> bool {
        if self.is_open(&project.project_id) {
            return false;
        }
        let tab = ProjectTab::new(project.project_id.clone(), project.name.clone());
        self.tabs.insert(project.project_id.clone(), tab);
        self.open_projects.push(project);
        true
    }

    /// 撤销 insert：整体丢弃标签页与项目条目（打开失败时的补偿动作）
    pub fn discard(&mut self, project_id: &str) {
        self.tabs.remove(project_id);
        self.open_projects.retain(|p| p.project_id != project_id);
        if self.current.as_deref() == Some(project_id) {
            self.current = self.open_projects.last().map(|p| p.project_id.clone());
        }
    }

    /// current 为空时指向该项目
    pub fn adopt_if_unset(&mut self, project_id: &str) {
        if self.current.is_none() && self.is_open(project_id) {
            self.current = Some(project_id.to_string());
        }
    }

    /// 切换当前项目（纯焦点变更）
    pub fn activate(&mut self, project_id: &str) -> Result<(), SessionError> {
        if !self.is_open(project_id) {
            return Err(SessionError::ProjectNotFound(project_id.to_string()));
        }
        self.current = Some(project_id.to_string());
        Ok(())
    }

    /// 关闭项目（缺省为当前项目）。没有打开的项目时返回 Ok(None)。
    ///
    /// 关闭的是当前项目时，游标移到打开序列的最后一个项目；关闭其它项目时游标不变。
    pub fn close(&mut self, project_id: Option<&str>) -> Result<Option<Closed>, SessionError> {
        if self.open_projects.is_empty() {
            return Ok(None);
        }
        let target = match project_id {
            Some(id) => id.to_string(),
            None => match &self.current {
                Some(id) => id.clone(),
                None => return Ok(None),
            },
        };
        let index = self
            .open_projects
            .iter()
            .position(|p| p.project_id == target)
            .ok_or_else(|| SessionError::ProjectNotFound(target.clone()))?;

        self.tabs.remove(&target);
        let project = self.open_projects.remove(index);
        if self.current.as_deref() == Some(target.as_str()) {
            self.current = self.open_projects.last().map(|p| p.project_id.clone());
        }
        debug_assert!(self.invariants_hold());
        Ok(Some(Closed {
            project,
            current: self.current.clone(),
        }))
    }

    /// 校验不变量（测试与 debug 断言使用）
    pub fn invariants_hold(&self) -> bool {
        let unique = self
            .open_projects
            .iter()
            .enumerate()
            .all(|(i, p)| self.open_projects[..i].iter().all(|q| q.project_id != p.project_id));
        let tabs_match = self.tabs.len() == self.open_projects.len()
            && self.open_projects.iter().all(|p| self.tabs.contains_key(&p.project_id));
        let cursor_valid = match &self.current {
            Some(id) => self.is_open(id),
            None => self.open_projects.is_empty(),
        };
        unique && tabs_match && cursor_valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;

    fn project(id: &str) -> Project {
        Project {
            project_id: id.to_string(),
            name: format!("Project {id}"),
            path: PathBuf::from("/tmp").join(id),
            last_modified: Utc::now(),
        }
    }

    fn open(session: &mut Session, id: &str) {
        assert!(session.insert(project(id)));
        session.adopt_if_unset(id);
    }

    fn ids(session: &Session) -> Vec<&str> {
        session
            .open_projects()
            .iter()
            .map(|p| p.project_id.as_str())
            .collect()
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut session = Session::new();
        open(&mut session, "p1");
        assert!(!session.insert(project("p1")));
        assert_eq!(ids(&session), vec!["p1"]);
        assert_eq!(session.tab_count(), 1);
        assert_eq!(session.current(), Some("p1"));
        assert!(session.invariants_hold());
    }

    #[test]
    fn test_discard_restores_previous_state() {
        let mut session = Session::new();
        open(&mut session, "p1");
        assert!(session.insert(project("p2")));
        session.discard("p2");
        assert_eq!(ids(&session), vec!["p1"]);
        assert!(session.tab("p2").is_none());
        assert_eq!(session.current(), Some("p1"));
        assert!(session.invariants_hold());
    }

    #[test]
    fn test_close_current_moves_to_last_remaining() {
        let mut session = Session::new();
        open(&mut session, "p1");
        open(&mut session, "p2");
        open(&mut session, "p3");
        assert_eq!(session.current(), Some("p1"));

        let closed = session.close(None).unwrap().unwrap();
        assert_eq!(closed.project.project_id, "p1");
        assert_eq!(closed.current.as_deref(), Some("p3"));
        assert_eq!(session.current(), Some("p3"));
        assert_eq!(ids(&session), vec!["p2", "p3"]);
        assert!(session.invariants_hold());
    }

    #[test]
    fn test_close_other_keeps_cursor() {
        let mut session = Session::new();
        open(&mut session, "p1");
        open(&mut session, "p2");
        session.activate("p2").unwrap();

        session.close(Some("p1")).unwrap();
        assert_eq!(session.current(), Some("p2"));
        assert!(session.invariants_hold());
    }

    #[test]
    fn test_close_last_unsets_cursor_and_empty_is_noop() {
        let mut session = Session::new();
        assert!(session.close(None).unwrap().is_none());

        open(&mut session, "p1");
        let closed = session.close(None).unwrap().unwrap();
        assert!(closed.current.is_none());
        assert!(session.current().is_none());
        assert_eq!(session.tab_count(), 0);
        assert!(session.close(None).unwrap().is_none());
        assert!(session.invariants_hold());
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let mut session = Session::new();
        open(&mut session, "p1");
        assert!(matches!(
            session.activate("nope"),
            Err(SessionError::ProjectNotFound(_))
        ));
        assert!(matches!(
            session.close(Some("nope")),
            Err(SessionError::ProjectNotFound(_))
        ));
        assert_eq!(session.current(), Some("p1"));
    }

    #[test]
    fn test_current_tab_requires_project() {
        let mut session = Session::new();
        assert!(matches!(
            session.current_tab(),
            Err(SessionError::NoCurrentProject)
        ));
        open(&mut session, "p1");
        let (project, tab) = session.current_tab().unwrap();
        assert_eq!(project.project_id, "p1");
        assert_eq!(tab.title(), "Project p1");
    }
}
