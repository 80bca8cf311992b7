//! 构建编排器
//!
//! start() 立即返回 BuildTicket，编译在独立的 tokio 任务中进行；无论成功、失败、超时、
//! panic 还是被取消，都会恰好向完成通道发送一次 BuildCompletion。
//! 完成事件携带派发时捕获的 project_id 与 ticket，由交互路径据此判断结果是否过期。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::compiler::{ArtifactRef, BuildError, BuildJob, Compiler};
use crate::core::SessionSupervisor;
use crate::store::ProjectId;

/// 构建票据：每次派发唯一
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub struct BuildTicket(u64);

static NEXT_BUILD_TICKET: AtomicU64 = AtomicU64::new(1);

impl BuildTicket {
    pub(crate) fn next() -> Self {
        Self(NEXT_BUILD_TICKET.fetch_add(1, Ordering::Relaxed))
    }

}

impl std::fmt::Display for BuildTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 单次构建的终态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Succeeded { artifact: ArtifactRef },
    Failed { reason: String },
}

impl BuildOutcome {
    pub fn artifact(&self) -> Option<&ArtifactRef> {
        match self {
            BuildOutcome::Succeeded { artifact } => Some(artifact),
            BuildOutcome::Failed { .. } => None,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, BuildOutcome::Succeeded { .. })
    }
}

/// 预览状态机：Idle → Running → {Succeeded, Failed}
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BuildState {
    Idle,
    Running { ticket: BuildTicket },
    Succeeded { artifact: ArtifactRef },
    Failed { reason: String },
}

impl Default for BuildState {
    fn default() -> Self {
        BuildState::Idle
    }
}

impl From<BuildOutcome> for BuildState {
    fn from(outcome: BuildOutcome) -> Self {
        match outcome {
            BuildOutcome::Succeeded { artifact } => BuildState::Succeeded { artifact },
            BuildOutcome::Failed { reason } => BuildState::Failed { reason },
        }
    }
}

/// 送回交互路径的完成事件
#[derive(Debug, Clone)]
pub struct BuildCompletion {
    pub ticket: BuildTicket,
    pub project_id: ProjectId,
    pub outcome: BuildOutcome,
}

/// 构建编排器：持有编译器与完成通道发送端
pub struct BuildOrchestrator {
    compiler: Arc<dyn Compiler>,
    completions: mpsc::UnboundedSender<BuildCompletion>,
    /// None 表示不限时
    timeout: Option<Duration>,
    supervisor: SessionSupervisor,
}

impl BuildOrchestrator {
    /// 返回编排器与完成事件接收端（由交互路径消费）
    pub fn new(
        compiler: Arc<dyn Compiler>,
        timeout: Option<Duration>,
    ) -> (Self, mpsc::UnboundedReceiver<BuildCompletion>) {
        let (completions, completion_rx) = mpsc::unbounded_channel();
        (
            Self {
                compiler,
                completions,
                timeout,
                supervisor: SessionSupervisor::new(),
            },
            completion_rx,
        )
    }

    /// 派发一次构建，立即返回票据
    pub fn start(&self, job: BuildJob) -> BuildTicket {
        let ticket = BuildTicket::next();
        let project_id = job.project.project_id.clone();
        let compiler = self.compiler.clone();
        let completions = self.completions.clone();
        let timeout = self.timeout;
        let token = self.supervisor.child_token();

        tracing::info!(project_id = %project_id, ticket = %ticket, "build dispatched");
        tokio::spawn(async move {
            let started = Instant::now();
            // 编译放进内层任务，panic 会变成 JoinError 而不是吞掉完成事件
            let work = tokio::spawn(async move { compiler.compile(&job).await });
            let abort = work.abort_handle();

            let result = tokio::select! {
                result = run_to_completion(work, timeout) => result,
                _ = token.cancelled() => {
                    abort.abort();
                    Err(BuildError::Cancelled)
                }
            };

            let outcome = match result {
                Ok(artifact) => {
                    tracing::info!(
                        project_id = %project_id,
                        ticket = %ticket,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        artifact = %artifact,
                        "build succeeded"
                    );
                    BuildOutcome::Succeeded { artifact }
                }
                Err(e) => {
                    tracing::warn!(project_id = %project_id, ticket = %ticket, error = %e, "build failed");
                    BuildOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            let completion = BuildCompletion {
                ticket,
                project_id,
                outcome,
            };
            if completions.send(completion).is_err() {
                tracing::debug!(ticket = %ticket, "completion receiver closed");
            }
        });
        ticket
    }

    /// 取消全部在途构建；它们仍各自送出一次 Failed 完成事件
    pub fn cancel_all(&self) {
        self.supervisor.cancel();
    }
}

async fn run_to_completion(
    work: JoinHandle<Result<ArtifactRef, BuildError>>,
    timeout: Option<Duration>,
) -> Result<ArtifactRef, BuildError> {
    let abort = work.abort_handle();
    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(joined) => joined,
            Err(_) => {
                abort.abort();
                return Err(BuildError::TimedOut(limit));
            }
        },
        None => work.await,
    };
    joined.map_err(|e| BuildError::Aborted(e.to_string()))?
}
