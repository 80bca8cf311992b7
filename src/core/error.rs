//! 会话错误类型与面向用户的失败描述
//!
//! SessionError 是整个 crate 的错误分类；Failure 是交给展示层的结构（kind + 标题 + 消息），
//! 标题由具体意图决定（如 "Project creation failed"），在 runtime 边界处翻译。

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// 会话层可能出现的错误（查找失败、输入非法、资源损坏、构建失败等）
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("No project is open")]
    NoCurrentProject,

    #[error("No resource is displayed")]
    NoDisplayedResource,

    #[error("{0}")]
    InvalidValue(String),

    #[error("Directory not empty: {}", .0.display())]
    DirectoryNotEmpty(PathBuf),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    #[error("Storage error: {0}")]
    Io(#[from] io::Error),
}

/// 错误大类，供展示层决定图标/样式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NotFound,
    InvalidValue,
    DirectoryNotEmpty,
    AlreadyExists,
    PermissionDenied,
    InvalidResource,
    /// 仅通过构建完成通知出现
    BuildFailed,
    Io,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::ProjectNotFound(_)
            | SessionError::ResourceNotFound(_)
            | SessionError::NoCurrentProject
            | SessionError::NoDisplayedResource => ErrorKind::NotFound,
            SessionError::InvalidValue(_) => ErrorKind::InvalidValue,
            SessionError::DirectoryNotEmpty(_) => ErrorKind::DirectoryNotEmpty,
            SessionError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            SessionError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            SessionError::InvalidResource(_) => ErrorKind::InvalidResource,
            SessionError::Io(err) => match err.kind() {
                io::ErrorKind::NotFound => ErrorKind::NotFound,
                io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
                _ => ErrorKind::Io,
            },
        }
    }

    /// 把 IO 错误按类别折叠进分类；context 用于消息（通常是路径）
    pub fn from_io(err: io::Error, context: impl Into<String>) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => SessionError::PermissionDenied(context.into()),
            _ => SessionError::Io(err),
        }
    }

    /// 项目创建对话框使用的简短消息（与分类一一对应）
    fn creation_message(&self) -> String {
        match self {
            SessionError::DirectoryNotEmpty(_) => "Directory not empty".to_string(),
            SessionError::AlreadyExists(_) => "Project exists".to_string(),
            SessionError::PermissionDenied(_) => "Permission denied".to_string(),
            other => other.to_string(),
        }
    }
}

/// 展示层看到的失败：短标题 + 人类可读消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub title: String,
    pub message: String,
}

impl Failure {
    pub fn new(kind: ErrorKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn from_error(title: impl Into<String>, err: &SessionError) -> Self {
        Self::new(err.kind(), title, err.to_string())
    }

    /// 创建项目失败时沿用旧对话框的措辞
    pub fn project_creation(err: &SessionError) -> Self {
        Self::new(err.kind(), "Project creation failed", err.creation_message())
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}
