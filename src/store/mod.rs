//! 持久化协作者：项目目录 / 资源存储的接口与磁盘实现

pub mod fs;
pub mod traits;
pub mod types;

pub use fs::{FsProjectDirectory, FsResourceStore};
pub use traits::{ProjectDirectory, ResourceStore};
pub use types::{Project, ProjectId, ProjectSummary, Resource, ResourceId, ResourceKind};
