//! 目录相关数据类型定义

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path};

/// 是否恰好是一个普通路径组成部分（不含分隔符、`..`、绝对路径）
pub fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == name
    )
}

/// 校验平台标识和文件名都能直接用作安装目录下的路径
pub fn check_plain_name(name: &str) -> CoreResult<()> {
    if is_plain_name(name) {
        Ok(())
    } else {
        Err(CoreError::UnsafeName(name.to_string()))
    }
}

/// 游戏平台
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct System {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl System {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    /// 显示名，未配置时回退到平台标识
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// 目录中的单个游戏文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub system: String,
    pub name: String,
    #[serde(rename = "size_bytes", alias = "size", default)]
    pub size: u64,
    #[serde(rename = "url", alias = "source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl CatalogEntry {
    pub fn new(system: &str, name: &str, size: u64) -> Self {
        Self {
            system: system.to_string(),
            name: name.to_string(),
            size,
            source: None,
        }
    }

    pub fn with_source(mut self, url: &str) -> Self {
        self.source = Some(url.to_string());
        self
    }
}

/// 目录快照：加载后不可变
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSnapshot {
    systems: Vec<System>,
    #[serde(rename = "files")]
    entries: Vec<CatalogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fetched_at: Option<DateTime<Local>>,
}

/// 磁盘 / 网络上的原始文档格式
#[derive(Debug, Deserialize)]
pub struct CatalogDocument {
    pub systems: Vec<System>,
    #[serde(rename = "files", alias = "entries", default)]
    pub entries: Vec<CatalogEntry>,
    #[serde(default)]
    pub fetched_at: Option<DateTime<Local>>,
}

impl CatalogSnapshot {
    /// 校验每个条目都引用已知平台，并把平台引用规范化为平台标识
    ///
    /// 平台标识和文件名会拼接成安装路径，必须是单个文件名。
    pub fn new(systems: Vec<System>, entries: Vec<CatalogEntry>) -> CoreResult<Self> {
        for system in &systems {
            check_plain_name(&system.id)?;
        }
        let lookup: HashMap<String, &str> = systems
            .iter()
            .map(|s| (s.id.to_lowercase(), s.id.as_str()))
            .collect();

        let mut checked = Vec::with_capacity(entries.len());
        for mut entry in entries {
            check_plain_name(&entry.name)?;
            match lookup.get(&entry.system.to_lowercase()) {
                Some(id) => {
                    entry.system = id.to_string();
                    checked.push(entry);
                }
                None => {
                    return Err(CoreError::UnknownSystem {
                        system: entry.system,
                        entry: entry.name,
                    })
                }
            }
        }

        Ok(Self {
            systems,
            entries: checked,
            fetched_at: None,
        })
    }

    pub fn from_document(doc: CatalogDocument) -> CoreResult<Self> {
        let mut snapshot = Self::new(doc.systems, doc.entries)?;
        snapshot.fetched_at = doc.fetched_at;
        Ok(snapshot)
    }

    pub fn stamped(mut self, at: DateTime<Local>) -> Self {
        self.fetched_at = Some(at);
        self
    }

    pub fn systems(&self) -> &[System] {
        &self.systems
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn fetched_at(&self) -> Option<DateTime<Local>> {
        self.fetched_at
    }

    pub fn system(&self, id: &str) -> Option<&System> {
        self.systems.iter().find(|s| s.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 搜索结果中的一条，保留它在目录中的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub index: usize,
    pub entry: CatalogEntry,
}

/// 按平台聚合的搜索结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultGroup {
    pub system: System,
    pub entries: Vec<GroupEntry>,
    pub total_size: u64,
    pub count: usize,
}

/// 已安装状态的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallState {
    Resolved,
    /// 平台目录不存在，视为空
    MissingDirectory,
    /// 读取目录失败，仅影响该平台
    Unreadable(String),
}

/// 带安装标记的结果分组（原分组的副本）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGroup {
    pub group: ResultGroup,
    pub installed: Vec<bool>,
    pub state: InstallState,
}

impl ResolvedGroup {
    pub fn installed_count(&self) -> usize {
        self.installed.iter().filter(|flag| **flag).count()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&GroupEntry, bool)> {
        self.group
            .entries
            .iter()
            .zip(self.installed.iter().copied())
    }
}

/// 本地已安装的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledFile {
    pub name: String,
    pub path: std::path::PathBuf,
    pub size: u64,
}

/// 某个平台目录下的已安装文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledGroup {
    pub system: String,
    pub files: Vec<InstalledFile>,
    pub total_size: u64,
}

/// 字节数格式化为人类可读的大小
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
