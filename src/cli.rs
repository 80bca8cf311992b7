//! 行式命令解析：把 stdin 的一行文本映射为会话意图

use std::path::PathBuf;

use thiserror::Error;

use crate::core::Intent;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command: {0} (try `help`)")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

/// 解析结果：会话意图或仅由驱动处理的本地命令
#[derive(Debug, Clone)]
pub enum Command {
    Session(Intent),
    Help,
    /// 打印当前会话快照
    Status,
}

pub const HELP: &str = "\
commands:
  list                              list registered projects
  create <name> <path> [template]   create and register a project
  remove-project <id>               unregister a project
  open <id> | show <id> | close [id]
  open-res <id> <name> | show-res <id> | close-res <id>
  add <name> | rm <id> | edit <text> | save
  build                             build the current project
  status | help | quit";

/// 空行返回 Ok(None)
pub fn parse_line(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let intent = match verb {
        "help" | "?" => return Ok(Some(Command::Help)),
        "status" => return Ok(Some(Command::Status)),
        "quit" | "exit" => Intent::Quit,
        "list" => Intent::ListProjects,
        "default-path" => Intent::DefaultProjectPath,
        "create" => match args.as_slice() {
            [name, path] => Intent::CreateProject {
                name: name.to_string(),
                path: PathBuf::from(path),
                template: String::new(),
            },
            [name, path, template] => Intent::CreateProject {
                name: name.to_string(),
                path: PathBuf::from(path),
                template: template.to_string(),
            },
            _ => return Err(ParseError::Usage("create <name> <path> [template]")),
        },
        "remove-project" => Intent::RemoveProject(one(&args, "remove-project <id>")?),
        "open" => Intent::OpenProject(one(&args, "open <id>")?),
        "show" => Intent::ShowProject(one(&args, "show <id>")?),
        "close" => match args.as_slice() {
            [] => Intent::CloseProject(None),
            [id] => Intent::CloseProject(Some(id.to_string())),
            _ => return Err(ParseError::Usage("close [id]")),
        },
        "open-res" => match args.as_slice() {
            [id, name] => Intent::OpenResource {
                resource_id: id.to_string(),
                name: name.to_string(),
            },
            _ => return Err(ParseError::Usage("open-res <id> <name>")),
        },
        "show-res" => Intent::ShowResource(one(&args, "show-res <id>")?),
        "close-res" => Intent::CloseResource(one(&args, "close-res <id>")?),
        "add" => Intent::AddResource(one(&args, "add <name>")?),
        "rm" => Intent::RemoveResource(one(&args, "rm <id>")?),
        // 保留原文（含空格），\n 转成换行
        "edit" => Intent::EditResource(rest.replace("\\n", "\n")),
        "save" => Intent::SaveResource,
        "build" => Intent::BuildProject,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    Ok(Some(Command::Session(intent)))
}

fn one(args: &[&str], usage: &'static str) -> Result<String, ParseError> {
    match args {
        [value] => Ok(value.to_string()),
        _ => Err(ParseError::Usage(usage)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(line: &str) -> Intent {
        match parse_line(line) {
            Ok(Some(Command::Session(intent))) => intent,
            other => panic!("expected intent for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_project_commands() {
        assert!(matches!(intent("open p1"), Intent::OpenProject(ref id) if id == "p1"));
        assert!(matches!(intent("close"), Intent::CloseProject(None)));
        assert!(matches!(intent("close p2"), Intent::CloseProject(Some(ref id)) if id == "p2"));
        assert!(matches!(
            intent("create Thesis /tmp/thesis article"),
            Intent::CreateProject { ref template, .. } if template == "article"
        ));
        assert!(matches!(intent("  list  "), Intent::ListProjects));
    }

    #[test]
    fn test_parse_resource_commands() {
        assert!(matches!(
            intent("open-res r1 main.tex"),
            Intent::OpenResource { ref resource_id, ref name } if resource_id == "r1" && name == "main.tex"
        ));
        assert!(matches!(intent("add notes"), Intent::AddResource(ref n) if n == "notes"));
        assert!(matches!(
            intent("edit \\section{A}\\nbody text"),
            Intent::EditResource(ref t) if t == "\\section{A}\nbody text"
        ));
        assert!(matches!(intent("build"), Intent::BuildProject));
    }

    #[test]
    fn test_parse_errors_and_locals() {
        assert!(parse_line("   ").unwrap().is_none());
        assert!(matches!(parse_line("help"), Ok(Some(Command::Help))));
        assert_eq!(
            parse_line("frobnicate").unwrap_err(),
            ParseError::UnknownCommand("frobnicate".into())
        );
        assert_eq!(
            parse_line("open").unwrap_err(),
            ParseError::Usage("open <id>")
        );
        assert!(parse_line("open-res r1").is_err());
    }
}
