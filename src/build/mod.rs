//! 构建层：编译器边界与异步构建编排

pub mod compiler;
pub mod orchestrator;

pub use compiler::{ArtifactRef, BuildError, BuildJob, CommandCompiler, Compiler};
pub use orchestrator::{BuildCompletion, BuildOrchestrator, BuildOutcome, BuildState, BuildTicket};
