//! 控制台命令解析与执行

use super::render;
use super::state::Session;
use crate::error::CoreError;
use crate::selection::TreeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Update,
    Search(String),
    List,
    Toggle(TreeId, usize),
    SelectAll(TreeId),
    DeselectAll(TreeId),
    Install,
    Remove,
    Compress,
    Clean,
    Status,
    Settings,
    Set(String, String),
    Quit,
}

/// 解析一行输入；空行返回 `Ok(None)`
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "" => return Ok(None),
        "help" | "h" | "?" => Command::Help,
        "update" | "u" => Command::Update,
        "search" | "s" => Command::Search(rest.to_string()),
        "list" | "installed" | "l" => Command::List,
        "toggle" | "t" => Command::Toggle(TreeId::Search, number(rest)?),
        "itoggle" | "it" => Command::Toggle(TreeId::Installed, number(rest)?),
        "all" => Command::SelectAll(TreeId::Search),
        "none" => Command::DeselectAll(TreeId::Search),
        "iall" => Command::SelectAll(TreeId::Installed),
        "inone" => Command::DeselectAll(TreeId::Installed),
        "install" | "i" => Command::Install,
        "remove" | "rm" => Command::Remove,
        "compress" => Command::Compress,
        "clean" => Command::Clean,
        "status" => Command::Status,
        "settings" => Command::Settings,
        "set" => match rest.split_once(char::is_whitespace) {
            Some((key, value)) if !value.trim().is_empty() => {
                Command::Set(key.to_string(), value.trim().to_string())
            }
            _ => return Err("用法: set <配置项> <值>".to_string()),
        },
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("未知命令: {}（输入 help 查看帮助）", other)),
    };
    Ok(Some(command))
}

fn number(arg: &str) -> Result<usize, String> {
    arg.parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| format!("需要一个序号，收到 {:?}", arg))
}

fn started(started: bool, what: &str) -> String {
    if started {
        format!("已开始{}", what)
    } else {
        format!("{}正在进行中", what)
    }
}

/// 执行命令，返回要输出的文本
pub fn execute(session: &mut Session, command: Command) -> String {
    match command {
        Command::Help => render::help(),
        Command::Update => started(session.start_refresh(), "更新目录"),
        Command::Search(raw) => match session.search(&raw).map(|_| ()) {
            Ok(()) => match session.search_view() {
                Some(view) => render::search_results(view, session.selection()),
                None => String::new(),
            },
            Err(CoreError::CatalogUnavailable) => {
                format!("{}，请先执行 update", CoreError::CatalogUnavailable)
            }
            Err(e) => e.to_string(),
        },
        Command::List => {
            session.refresh_installed();
            render::installed_library(session.installed(), session.selection())
        }
        Command::Toggle(tree, n) => {
            let toggled = session
                .leaf_at(tree, n)
                .and_then(|key| session.toggle(tree, &key));
            match toggled {
                Some(true) => format!("已勾选 {}", n),
                Some(false) => format!("已取消 {}", n),
                None => format!("序号 {} 不在当前列表中", n),
            }
        }
        Command::SelectAll(tree) => {
            session.select_all(tree);
            format!("已勾选 {} 项", session.selection().selected_count(tree))
        }
        Command::DeselectAll(tree) => {
            session.deselect_all(tree);
            "已全部取消".to_string()
        }
        Command::Install => {
            let count = session.selection().selected_count(TreeId::Search);
            match session.install_selected() {
                Ok(ok) => started(ok, &format!("安装 {} 个游戏", count)),
                Err(e) => e.to_string(),
            }
        }
        Command::Remove => match session.remove_selected() {
            Ok(n) => format!("已删除 {} 个文件", n),
            Err(e) => format!("删除失败: {}", e),
        },
        Command::Compress => started(session.start_compress(), "压缩"),
        Command::Clean => started(
            session.start_clean(),
            &format!("清理重复游戏（{}）", session.region_priority()),
        ),
        Command::Status => format!(
            "{}\n{}",
            render::catalog_summary(session.catalog()),
            render::task_records(session.tasks().records())
        ),
        Command::Settings => render::settings(session.config(), session.config_path()),
        Command::Set(key, value) => match session.set_option(&key, &value) {
            Ok(()) => format!("已保存 {} = {}", key, value),
            Err(e) => format!("设置失败: {:#}", e),
        },
        // 由交互循环处理
        Command::Quit => String::new(),
    }
}
