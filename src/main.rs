//! Folio - 项目会话与构建编排
//!
//! 入口：初始化日志、加载配置、装配存储与编译器、启动会话任务，并运行 stdin 行式驱动。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use folio::build::CommandCompiler;
use folio::cli::{parse_line, Command, HELP};
use folio::config::{load_config, AppConfig};
use folio::core::{Intent, Notice, Reply, SessionView};
use folio::observability;
use folio::session::SessionSettings;
use folio::store::{FsProjectDirectory, FsResourceStore};
use folio::{spawn_session, SessionParts};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    // 可选：第一个参数为额外的配置文件
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    std::fs::create_dir_all(&cfg.app.data_dir)
        .with_context(|| format!("Failed to create data dir {}", cfg.app.data_dir.display()))?;

    let suffix = cfg.app.resource_suffix.clone();
    let projects = Arc::new(FsProjectDirectory::new(
        &cfg.app.data_dir,
        &cfg.app.templates_dir,
        suffix.clone(),
    ));
    let resources = Arc::new(FsResourceStore::new(projects.clone()));
    let compiler = Arc::new(CommandCompiler::from_config(&cfg.build, &suffix));

    let mut handle = spawn_session(SessionParts {
        projects,
        resources,
        compiler,
        settings: SessionSettings::from_config(&cfg),
    });
    tracing::info!(data_dir = %cfg.app.data_dir.display(), "folio session started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    handle.request(Intent::Quit).await.ok();
                    break;
                };
                let command = match parse_line(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                match command {
                    Command::Help => println!("{HELP}"),
                    Command::Status => print_view(&handle.view()),
                    Command::Session(intent) => {
                        let quitting = matches!(intent, Intent::Quit);
                        let reply = handle.request(intent).await.context("Session request failed")?;
                        print_reply(&reply);
                        if quitting {
                            break;
                        }
                    }
                }
            }
            notice = handle.notices.recv() => match notice {
                Ok(notice) => print_notice(&notice),
                Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "notice stream lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                handle.request(Intent::Quit).await.ok();
                break;
            }
        }
    }

    Ok(())
}

fn print_reply(reply: &Reply) {
    match reply {
        Reply::Ok => println!("ok"),
        Reply::Opened(outcome) => println!("{outcome:?}"),
        Reply::Closed { closed, current } => println!(
            "closed {} (current: {})",
            closed.as_deref().unwrap_or("-"),
            current.as_deref().unwrap_or("-")
        ),
        Reply::Project(p) => println!("{}  {}  {}", p.project_id, p.name, p.path.display()),
        Reply::Projects(list) if list.is_empty() => println!("no projects"),
        Reply::Projects(list) => {
            for p in list {
                println!("{}  {}  {}", p.project_id, p.name, p.modified);
            }
        }
        Reply::Resource(r) => println!("{}  {}", r.resource_id, r.relative_path().display()),
        Reply::BuildStarted(Some(ticket)) => println!("build {ticket} started"),
        Reply::BuildStarted(None) => println!("no project open"),
        Reply::DefaultPath(path) => match path {
            Some(path) => println!("{}", path.display()),
            None => println!("-"),
        },
        Reply::Failed(failure) => println!("{failure}"),
    }
}

fn print_notice(notice: &Notice) {
    match notice {
        Notice::BuildSucceeded {
            project_id,
            artifact,
        } => println!("[{project_id}] build succeeded: {artifact}"),
        Notice::BuildFailed {
            project_id,
            failure,
            ..
        } => println!("[{project_id}] {failure}"),
        Notice::BuildDiscarded { .. } => {}
    }
}

fn print_view(view: &SessionView) {
    if view.projects.is_empty() {
        println!("no open projects");
        return;
    }
    for project in &view.projects {
        let marker = if view.current.as_deref() == Some(project.project_id.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{marker} {}  {}  {:?}", project.project_id, project.name, project.preview);
        for resource in &project.resources {
            let open = project.open.iter().find(|o| o.resource_id == resource.resource_id);
            let flag = match open {
                Some(o) if project.shown.as_deref() == Some(o.resource_id.as_str()) => {
                    if o.dirty { ">*" } else { "> " }
                }
                Some(o) if o.dirty => " *",
                Some(_) => " o",
                None => "  ",
            };
            println!("    {flag} {}  {}", resource.resource_id, resource.relative_path().display());
        }
    }
}
