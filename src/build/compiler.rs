//! 编译器入口
//!
//! Compiler trait 是构建编排器调用的外部工具链边界；CommandCompiler 通过 tokio::process
//! 调用配置中的命令（默认 pdflatex），在项目目录中生成产物并返回 file:// 引用。

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::process::Command;

use crate::config::BuildSection;
use crate::store::{Project, Resource, ResourceKind};

/// 产物引用（可渲染的预览位置，如 file:// URL）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(format!("file://{}", path.display()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 一次编译所需的上下文：派发时捕获的项目快照 + 资源列表
#[derive(Debug, Clone)]
pub struct BuildJob {
    pub project: Project,
    pub resources: Vec<Resource>,
}

/// 编译失败的原因
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("No compilable resource in project")]
    NoSources,

    #[error("Failed to start compiler: {0}")]
    Spawn(std::io::Error),

    #[error("Compiler exited with code {code}: {log}")]
    Exited { code: i32, log: String },

    #[error("Compiler produced no output at {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("Compilation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Compilation cancelled")]
    Cancelled,

    #[error("Compilation task aborted: {0}")]
    Aborted(String),
}

/// 外部编译器：把项目编译为产物
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(&self, job: &BuildJob) -> Result<ArtifactRef, BuildError>;
}

/// 保留的日志尾部长度（字符）
const LOG_TAIL_CHARS: usize = 2000;

/// 命令行编译器；args 中支持 {main} {out} {project} 占位符
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
    output_dir: String,
    artifact_extension: String,
    main_resource: String,
    source_suffix: String,
}

impl CommandCompiler {
    pub fn new(program: impl Into<String>, source_suffix: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            output_dir: "build".to_string(),
            artifact_extension: "pdf".to_string(),
            main_resource: "main".to_string(),
            source_suffix: source_suffix.into(),
        }
    }

    pub fn from_config(build: &BuildSection, source_suffix: &str) -> Self {
        Self {
            program: build.program.clone(),
            args: build.args.clone(),
            output_dir: build.output_dir.clone(),
            artifact_extension: build.artifact_extension.clone(),
            main_resource: build.main_resource.clone(),
            source_suffix: source_suffix.to_string(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// 选择入口资源：优先 main<suffix>，否则第一个源文件
    pub fn entry_resource<'a>(&self, resources: &'a [Resource]) -> Option<&'a Resource> {
        let preferred = format!("{}{}", self.main_resource, self.source_suffix);
        let suffix = self.source_suffix.as_str();
        let is_source = |r: &&Resource| {
            r.kind == ResourceKind::DocumentSource && r.name.ends_with(suffix)
        };
        resources
            .iter()
            .filter(is_source)
            .find(|r| r.name == preferred)
            .or_else(|| resources.iter().find(is_source))
    }

    fn expand(arg: &str, main: &Path, out: &Path, project: &Path) -> String {
        arg.replace("{main}", &main.to_string_lossy())
            .replace("{out}", &out.to_string_lossy())
            .replace("{project}", &project.to_string_lossy())
    }
}

fn tail(text: &str) -> String {
    let count = text.chars().count();
    if count <= LOG_TAIL_CHARS {
        text.to_string()
    } else {
        text.chars().skip(count - LOG_TAIL_CHARS).collect()
    }
}

#[async_trait]
impl Compiler for CommandCompiler {
    async fn compile(&self, job: &BuildJob) -> Result<ArtifactRef, BuildError> {
        let entry = self
            .entry_resource(&job.resources)
            .ok_or(BuildError::NoSources)?;
        let root = &job.project.path;
        let main = root.join(entry.relative_path());
        let out = root.join(&self.output_dir);
        tokio::fs::create_dir_all(&out)
            .await
            .map_err(BuildError::Spawn)?;

        let mut cmd = Command::new(&self.program);
        cmd.current_dir(root);
        for arg in &self.args {
            cmd.arg(Self::expand(arg, &main, &out, root));
        }
        if !self.args.iter().any(|a| a.contains("{main}")) {
            cmd.arg(&main);
        }
        cmd.kill_on_drop(true);

        tracing::info!(program = %self.program, entry = %entry.name, "running compiler");
        let output = cmd.output().await.map_err(BuildError::Spawn)?;
        if !output.status.success() {
            let mut log = String::from_utf8_lossy(&output.stdout).to_string();
            log.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(BuildError::Exited {
                code: output.status.code().unwrap_or(-1),
                log: tail(&log),
            });
        }

        let stem = Path::new(&entry.name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| entry.name.clone());
        let artifact = out.join(format!("{}.{}", stem, self.artifact_extension));
        if !tokio::fs::try_exists(&artifact).await.unwrap_or(false) {
            return Err(BuildError::MissingArtifact(artifact));
        }
        Ok(ArtifactRef::from_path(&artifact))
    }
}
