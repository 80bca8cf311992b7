//! 核心编排层：错误分类、状态投影、构建监管、会话主控循环

pub mod error;
pub mod orchestrator;
pub mod session_supervisor;
pub mod state;

pub use error::{ErrorKind, Failure, SessionError};
pub use orchestrator::{
    spawn_session, Intent, Notice, Reply, SessionHandle, SessionParts, BUILD_FAILED_MESSAGE,
};
pub use session_supervisor::SessionSupervisor;
pub use state::{ProjectView, SessionView};
