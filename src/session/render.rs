//! 控制台文本输出

use super::state::{SearchView, TaskReport};
use crate::catalog::{format_size, CatalogSnapshot, InstallState, InstalledGroup};
use crate::config::Config;
use std::path::Path;
use crate::selection::{LeafKey, SelectionStore, TreeId};
use crate::task::{TaskRecord, TaskStatus};

const RULE_WIDTH: usize = 60;

fn checkbox(selected: bool) -> &'static str {
    if selected {
        "[✓]"
    } else {
        "[ ]"
    }
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// 搜索结果，序号与 toggle 命令对应
pub fn search_results(view: &SearchView, selection: &SelectionStore) -> String {
    if view.results.is_empty() {
        return "没有找到游戏".to_string();
    }

    let mut out = format!("找到 {} 个游戏:\n{}\n", view.results.total, rule());
    let mut number = 0;
    for group in &view.groups {
        let g = &group.group;
        out.push_str(&format!(
            "\n[{}] {} ({} 个游戏",
            g.system.id,
            format_size(g.total_size),
            g.count
        ));
        match group.installed_count() {
            0 => out.push(')'),
            n => out.push_str(&format!(", {} 个已安装)", n)),
        }
        if let InstallState::Unreadable(reason) = &group.state {
            out.push_str(&format!("  ⚠ 无法读取安装目录: {}", reason));
        }
        out.push('\n');

        for (item, installed) in group.rows() {
            number += 1;
            let key = LeafKey::new(&g.system.id, item.index);
            out.push_str(&format!(
                "  {} {:>4}. {} ({}){}\n",
                checkbox(selection.is_selected(TreeId::Search, &key)),
                number,
                item.entry.name,
                format_size(item.entry.size),
                if installed { "  [已安装]" } else { "" }
            ));
        }
    }
    out
}

/// 已安装游戏列表
pub fn installed_library(groups: &[InstalledGroup], selection: &SelectionStore) -> String {
    let mut out = format!("已安装的游戏:\n{}\n", rule());
    if groups.is_empty() {
        out.push_str("\n还没有安装任何游戏\n");
        return out;
    }

    let mut number = 0;
    let mut total_files = 0;
    let mut total_size = 0;
    for group in groups {
        out.push_str(&format!(
            "\n[{}] {} ({} 个游戏)\n",
            group.system,
            format_size(group.total_size),
            group.files.len()
        ));
        for (i, file) in group.files.iter().enumerate() {
            number += 1;
            let key = LeafKey::new(&group.system, i);
            out.push_str(&format!(
                "  {} {:>4}. {} ({})\n",
                checkbox(selection.is_selected(TreeId::Installed, &key)),
                number,
                file.name,
                format_size(file.size)
            ));
        }
        total_files += group.files.len();
        total_size += group.total_size;
    }
    out.push_str(&format!(
        "\n{}\n合计: {} ({} 个游戏)\n",
        rule(),
        format_size(total_size),
        total_files
    ));
    out
}

/// 目录概况，包含最后更新时间
pub fn catalog_summary(catalog: Option<&CatalogSnapshot>) -> String {
    let Some(catalog) = catalog else {
        return "目录: 未加载".to_string();
    };
    let mut out = format!(
        "目录: {} 个平台, {} 个游戏",
        catalog.systems().len(),
        catalog.entries().len()
    );
    if let Some(at) = catalog.fetched_at() {
        out.push_str(&format!("（更新于 {}）", at.format("%Y-%m-%d %H:%M")));
    }
    out
}

pub fn settings(config: &Config, path: &Path) -> String {
    let mut out = format!("配置文件: {}\n", path.display());
    for (key, value) in config.settings() {
        out.push_str(&format!("  {:<16} {}\n", key, value));
    }
    out.push_str("使用 set <配置项> <值> 修改");
    out
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Idle => "空闲",
        TaskStatus::Running => "运行中",
        TaskStatus::Succeeded => "成功",
        TaskStatus::Failed => "失败",
    }
}

pub fn task_records<'a>(records: impl Iterator<Item = &'a TaskRecord>) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&format!("  {:<8} {}", record.kind.label(), status_label(record.status)));
        if !record.message.is_empty() {
            out.push_str(&format!("  {}", record.message));
        }
        if let Some(at) = record.finished_at {
            out.push_str(&format!("  ({})", at.format("%H:%M:%S")));
        }
        out.push('\n');
    }
    out
}

pub fn task_report(report: &TaskReport) -> String {
    match report.status {
        TaskStatus::Failed => format!("✗ {}", report.message),
        _ => format!("✓ {}", report.message),
    }
}

pub fn help() -> String {
    [
        "命令:",
        "  update                 从远端更新游戏数据库",
        "  search <关键词...>      搜索（平台名过滤，-词 排除）",
        "  toggle <序号>           勾选 / 取消搜索结果",
        "  all | none             全选 / 全不选搜索结果",
        "  install                安装勾选的游戏",
        "  list                   列出已安装的游戏",
        "  itoggle <序号>          勾选 / 取消已安装的游戏",
        "  iall | inone           全选 / 全不选已安装的游戏",
        "  remove                 删除勾选的已安装游戏",
        "  compress               将 ISO/CUE/GDI 压缩为 CHD",
        "  clean                  按地区优先级清理重复游戏",
        "  status                 查看目录和后台任务状态",
        "  settings               查看设置",
        "  set <配置项> <值>        修改并保存设置",
        "  quit                   退出",
    ]
    .join("\n")
}
