//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `FOLIO__*` 覆盖（双下划线表示嵌套，如 `FOLIO__BUILD__PROGRAM=xelatex`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub build: BuildSection,
}

/// [app] 段：数据目录、模板目录、新建资源的后缀与默认内容
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    /// 项目注册表所在目录
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
    /// 新建项目对话框的默认路径
    pub default_project_path: Option<PathBuf>,
    /// 可编译源文件的后缀，add_resource 时自动补全
    #[serde(default = "default_resource_suffix")]
    pub resource_suffix: String,
    /// 新资源放置的相对目录（空串为项目根）
    #[serde(default)]
    pub resource_dir: String,
    #[serde(default)]
    pub default_resource_content: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            templates_dir: default_templates_dir(),
            default_project_path: None,
            resource_suffix: default_resource_suffix(),
            resource_dir: String::new(),
            default_resource_content: String::new(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("folio-data")
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_resource_suffix() -> String {
    ".tex".to_string()
}

/// [build] 段：编译命令、产物位置与超时
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    #[serde(default = "default_program")]
    pub program: String,
    /// 支持 {main} {out} {project} 占位符；不含 {main} 时入口文件追加在末尾
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_artifact_extension")]
    pub artifact_extension: String,
    /// 单次构建超时（秒），超时按失败处理
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 优先作为入口的资源名（不含后缀）
    #[serde(default = "default_main_resource")]
    pub main_resource: String,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            output_dir: default_output_dir(),
            artifact_extension: default_artifact_extension(),
            timeout_secs: default_timeout_secs(),
            main_resource: default_main_resource(),
        }
    }
}

fn default_program() -> String {
    "pdflatex".to_string()
}

fn default_args() -> Vec<String> {
    vec![
        "-interaction=nonstopmode".into(),
        "-halt-on-error".into(),
        "-output-directory={out}".into(),
        "{main}".into(),
    ]
}

fn default_output_dir() -> String {
    "build".to_string()
}

fn default_artifact_extension() -> String {
    "pdf".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_main_resource() -> String {
    "main".to_string()
}

/// 从 config 目录加载配置，环境变量 FOLIO__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 FOLIO__*（双下划线表示嵌套键）
///
/// 常用覆盖：`FOLIO__APP__DATA_DIR`、`FOLIO__BUILD__PROGRAM`、
/// `FOLIO__BUILD__TIMEOUT_SECS=0`（关闭构建超时）。
/// `FOLIO__BUILD__ARGS` 按空格切分后整体替换参数列表，如
/// `FOLIO__BUILD__ARGS="-interaction=nonstopmode {main}"`；单个参数内含空格时需写在配置文件里。
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(env_source());

    let c = builder.build()?;
    c.try_deserialize()
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix("FOLIO")
        .separator("__")
        .try_parsing(true)
        .list_separator(" ")
        .with_list_parse_key("build.args")
}
