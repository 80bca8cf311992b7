//! 会话编排器：单写者主控循环
//!
//! spawn_session 建立三条通道（意图 → 会话；会话 → 展示层的状态快照；会话 → 展示层的通知），
//! 并在后台任务中串行处理意图与构建完成事件。Session 只被这一个任务修改，
//! 构建结果也在这里按票据校验后才落到标签页上。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::build::{ArtifactRef, BuildOutcome, BuildTicket, Compiler};
use crate::core::{ErrorKind, Failure, SessionError, SessionView};
use crate::session::{CompletionReport, OpenOutcome, ProjectSession, SessionSettings};
use crate::store::{Project, ProjectDirectory, ProjectId, ProjectSummary, Resource, ResourceId, ResourceStore};

/// 构建失败时展示给用户的消息
pub const BUILD_FAILED_MESSAGE: &str = "Compilation failed. No output generated.";

/// 从展示层发往会话的用户意图
#[derive(Debug, Clone)]
pub enum Intent {
    OpenProject(ProjectId),
    ShowProject(ProjectId),
    /// None 表示当前项目
    CloseProject(Option<ProjectId>),
    OpenResource { resource_id: ResourceId, name: String },
    ShowResource(ResourceId),
    CloseResource(ResourceId),
    AddResource(String),
    RemoveResource(ResourceId),
    /// 编辑器内容回写到当前显示的缓冲
    EditResource(String),
    SaveResource,
    BuildProject,
    ListProjects,
    CreateProject { name: String, path: PathBuf, template: String },
    RemoveProject(ProjectId),
    DefaultProjectPath,
    /// 取消在途构建并退出循环
    Quit,
}

impl Intent {
    /// 失败时展示的标题
    pub fn failure_title(&self) -> &'static str {
        match self {
            Intent::OpenProject(_) => "Cannot open project",
            Intent::ShowProject(_) => "Cannot show project",
            Intent::CloseProject(_) => "Cannot close project",
            Intent::OpenResource { .. } => "Cannot open resource",
            Intent::ShowResource(_) => "Cannot show resource",
            Intent::CloseResource(_) => "Cannot close resource",
            Intent::AddResource(_) => "Cannot add resource",
            Intent::RemoveResource(_) => "Cannot remove resource",
            Intent::EditResource(_) => "Cannot edit resource",
            Intent::SaveResource => "Save failed",
            Intent::BuildProject => "Build failed",
            Intent::ListProjects => "Cannot list projects",
            Intent::CreateProject { .. } => "Project creation failed",
            Intent::RemoveProject(_) => "Cannot remove project",
            Intent::DefaultProjectPath | Intent::Quit => "Error",
        }
    }
}

/// 会话对单个意图的应答
#[derive(Debug, Clone)]
pub enum Reply {
    Ok,
    Opened(OpenOutcome),
    Closed {
        closed: Option<ProjectId>,
        current: Option<ProjectId>,
    },
    Project(Project),
    Projects(Vec<ProjectSummary>),
    Resource(Resource),
    /// None：没有当前项目，未派发
    BuildStarted(Option<BuildTicket>),
    DefaultPath(Option<PathBuf>),
    Failed(Failure),
}

impl Reply {
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Reply::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.failure().is_none()
    }
}

/// 会话主动推送给展示层的通知（构建结果）
#[derive(Debug, Clone)]
pub enum Notice {
    BuildSucceeded {
        project_id: ProjectId,
        artifact: ArtifactRef,
    },
    BuildFailed {
        project_id: ProjectId,
        failure: Failure,
        /// 编译器给出的原始原因（写日志用）
        reason: String,
    },
    /// 结果对应的项目已关闭或构建已被取代，未应用
    BuildDiscarded {
        project_id: ProjectId,
        ticket: BuildTicket,
    },
}

impl From<CompletionReport> for Notice {
    fn from(report: CompletionReport) -> Self {
        match report {
            CompletionReport::Applied {
                project_id,
                outcome: BuildOutcome::Succeeded { artifact },
            } => Notice::BuildSucceeded {
                project_id,
                artifact,
            },
            CompletionReport::Applied {
                project_id,
                outcome: BuildOutcome::Failed { reason },
            } => Notice::BuildFailed {
                project_id,
                failure: Failure::new(ErrorKind::BuildFailed, "Build failed", BUILD_FAILED_MESSAGE),
                reason,
            },
            CompletionReport::Discarded { project_id, ticket } => {
                Notice::BuildDiscarded { project_id, ticket }
            }
        }
    }
}

/// 构造会话所需的协作者
pub struct SessionParts {
    pub projects: Arc<dyn ProjectDirectory>,
    pub resources: Arc<dyn ResourceStore>,
    pub compiler: Arc<dyn Compiler>,
    pub settings: SessionSettings,
}

struct Request {
    intent: Intent,
    reply: oneshot::Sender<Reply>,
}

/// 展示层持有的会话句柄
pub struct SessionHandle {
    intents: mpsc::UnboundedSender<Request>,
    pub state: watch::Receiver<SessionView>,
    pub notices: broadcast::Receiver<Notice>,
}

impl SessionHandle {
    /// 发送意图并等待应答
    pub async fn request(&self, intent: Intent) -> anyhow::Result<Reply> {
        let (reply, rx) = oneshot::channel();
        self.intents
            .send(Request { intent, reply })
            .map_err(|_| anyhow!("session task has stopped"))?;
        rx.await.map_err(|_| anyhow!("session task dropped the request"))
    }

    /// 最新的会话快照
    pub fn view(&self) -> SessionView {
        self.state.borrow().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.intents.is_closed()
    }
}

/// 启动会话任务，返回句柄；后台任务消费意图与构建完成事件并更新 state/notices
pub fn spawn_session(parts: SessionParts) -> SessionHandle {
    let (mut controller, mut completions) = ProjectSession::new(
        parts.projects,
        parts.resources,
        parts.compiler,
        parts.settings,
    );

    // 三通道：展示层 -> 会话 意图；会话 -> 展示层 状态快照；会话 -> 展示层 通知
    let (intent_tx, mut intent_rx) = mpsc::unbounded_channel::<Request>();
    let (state_tx, state_rx) = watch::channel(SessionView::default());
    let (notice_tx, notice_rx) = broadcast::channel::<Notice>(64);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                request = intent_rx.recv() => {
                    let Some(Request { intent, reply }) = request else {
                        // 所有句柄已释放
                        controller.shutdown();
                        break;
                    };
                    if matches!(intent, Intent::Quit) {
                        controller.shutdown();
                        let _ = reply.send(Reply::Ok);
                        break;
                    }
                    let response = dispatch(&mut controller, intent).await;
                    // 先发布快照再应答，收到应答的一方看到的一定是新状态
                    state_tx.send_replace(SessionView::project(controller.session()));
                    let _ = reply.send(response);
                }
                Some(completion) = completions.recv() => {
                    let notice = Notice::from(controller.apply_completion(completion));
                    state_tx.send_replace(SessionView::project(controller.session()));
                    let _ = notice_tx.send(notice);
                }
            }
        }
        tracing::info!("session loop stopped");
    });

    SessionHandle {
        intents: intent_tx,
        state: state_rx,
        notices: notice_rx,
    }
}

/// 执行单个意图并把错误翻译为带标题的 Failure
async fn dispatch(controller: &mut ProjectSession, intent: Intent) -> Reply {
    let title = intent.failure_title();
    let creating = matches!(intent, Intent::CreateProject { .. });

    let result: Result<Reply, SessionError> = match intent {
        Intent::OpenProject(id) => controller.open_project(&id).await.map(Reply::Opened),
        Intent::ShowProject(id) => controller.show_project(&id).map(|_| Reply::Ok),
        Intent::CloseProject(id) => controller.close_project(id.as_deref()).map(|closed| {
            let current = controller.session().current().map(str::to_string);
            Reply::Closed {
                closed: closed.map(|c| c.project.project_id),
                current,
            }
        }),
        Intent::OpenResource { resource_id, name } => controller
            .open_resource(&name, &resource_id)
            .await
            .map(|_| Reply::Ok),
        Intent::ShowResource(id) => controller.show_resource(&id).map(|_| Reply::Ok),
        Intent::CloseResource(id) => controller.close_resource(&id).map(|_| Reply::Ok),
        Intent::AddResource(name) => controller.add_resource(&name).await.map(Reply::Resource),
        Intent::RemoveResource(id) => controller.remove_resource(&id).await.map(|_| Reply::Ok),
        Intent::EditResource(text) => controller.edit_resource(text).map(|_| Reply::Ok),
        Intent::SaveResource => controller.save_resource().await.map(Reply::Resource),
        Intent::BuildProject => controller.build_project().map(Reply::BuildStarted),
        Intent::ListProjects => controller.list_projects().await.map(Reply::Projects),
        Intent::CreateProject {
            name,
            path,
            template,
        } => controller
            .create_project(&name, &path, &template)
            .await
            .map(Reply::Project),
        Intent::RemoveProject(id) => controller.remove_project(&id).await.map(|_| Reply::Ok),
        Intent::DefaultProjectPath => Ok(Reply::DefaultPath(
            controller.default_project_path().map(Path::to_path_buf),
        )),
        Intent::Quit => Ok(Reply::Ok),
    };

    result.unwrap_or_else(|e| {
        tracing::warn!(title = title, error = %e, "intent failed");
        let failure = if creating {
            Failure::project_creation(&e)
        } else {
            Failure::from_error(title, &e)
        };
        Reply::Failed(failure)
    })
}
