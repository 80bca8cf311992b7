//! 会话层：会话聚合、项目标签页与意图控制器

pub mod controller;
pub mod state;
pub mod tab;

pub use controller::{
    normalize_resource_name, CompletionReport, OpenOutcome, ProjectSession, SessionSettings,
};
pub use state::{Closed, Session};
pub use tab::{OpenResource, ProjectTab};
