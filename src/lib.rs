//! Folio - 多文档写作工具的项目会话与构建编排层
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、状态投影、会话主控循环
//! - **session**: 会话聚合、项目标签页、意图控制器
//! - **store**: 项目目录与资源存储（trait + 磁盘实现）
//! - **build**: 编译器抽象、命令行编译器、构建编排器
//! - **cli**: 行式命令解析（stdin 驱动）
//! - **observability**: 日志初始化

pub mod build;
pub mod cli;
pub mod config;
pub mod core;
pub mod observability;
pub mod session;
pub mod store;

pub use crate::core::{spawn_session, Intent, Notice, Reply, SessionHandle, SessionParts};
