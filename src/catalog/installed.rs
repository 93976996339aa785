//! 本地安装状态
//!
//! 安装根目录下每个平台一个子目录，子目录中存在同名（去掉扩展名后）文件即视为已安装。

use super::types::{InstallState, InstalledFile, InstalledGroup, ResolvedGroup, ResultGroup, System};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 去掉扩展名：取最后一个 `.` 之前的部分，开头的 `.` 不算扩展名
pub fn strip_extension(name: &str) -> &str {
    let trimmed = name.trim_start_matches('.');
    let offset = name.len() - trimmed.len();
    match trimmed.rfind('.') {
        Some(pos) => &name[..offset + pos],
        None => name,
    }
}

/// 列出目录下的普通文件名
fn list_file_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for item in fs::read_dir(dir)? {
        let item = item?;
        // 跟随符号链接，失效的链接不算
        if fs::metadata(item.path()).map(|m| m.is_file()).unwrap_or(false) {
            names.push(item.file_name().to_string_lossy().to_string());
        }
    }
    Ok(names)
}

#[derive(Debug, Clone)]
pub struct InstalledStateResolver {
    root: PathBuf,
}

impl InstalledStateResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn system_dir(&self, system: &str) -> PathBuf {
        self.root.join(system)
    }

    /// 为每个分组生成带安装标记的副本，不修改输入
    pub fn resolve(&self, groups: &[ResultGroup]) -> Vec<ResolvedGroup> {
        groups.iter().map(|g| self.resolve_group(g)).collect()
    }

    pub fn resolve_group(&self, group: &ResultGroup) -> ResolvedGroup {
        let not_installed = vec![false; group.entries.len()];
        let dir = self.system_dir(&group.system.id);

        if !dir.exists() {
            return ResolvedGroup {
                group: group.clone(),
                installed: not_installed,
                state: InstallState::MissingDirectory,
            };
        }

        let names = match list_file_names(&dir) {
            Ok(names) => names,
            Err(e) => {
                log::warn!("读取目录 {} 失败: {}", dir.display(), e);
                return ResolvedGroup {
                    group: group.clone(),
                    installed: not_installed,
                    state: InstallState::Unreadable(e.to_string()),
                };
            }
        };

        let stems: HashSet<&str> = names.iter().map(|n| strip_extension(n)).collect();
        let installed = group
            .entries
            .iter()
            .map(|e| stems.contains(strip_extension(&e.entry.name)))
            .collect();

        ResolvedGroup {
            group: group.clone(),
            installed,
            state: InstallState::Resolved,
        }
    }

    /// 扫描已安装的游戏（跳过隐藏文件），按平台标识排序
    pub fn scan_library(&self, systems: &[System]) -> Vec<InstalledGroup> {
        let mut ids: Vec<&str> = systems.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();

        let mut groups = Vec::new();
        for id in ids {
            let dir = self.system_dir(id);
            if !dir.exists() {
                continue;
            }
            match scan_dir(&dir) {
                Ok(files) if !files.is_empty() => {
                    let total_size = files.iter().map(|f| f.size).sum();
                    groups.push(InstalledGroup {
                        system: id.to_string(),
                        files,
                        total_size,
                    });
                }
                Ok(_) => {}
                Err(e) => log::warn!("扫描 {} 失败: {}", dir.display(), e),
            }
        }
        groups
    }
}

fn scan_dir(dir: &Path) -> io::Result<Vec<InstalledFile>> {
    let mut files = Vec::new();
    for item in fs::read_dir(dir)? {
        let item = item?;
        let name = item.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let Ok(meta) = fs::metadata(item.path()) else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        files.push(InstalledFile {
            name,
            path: item.path(),
            size: meta.len(),
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// 删除已安装文件，已不存在的文件跳过；返回实际删除的数量
pub fn remove_files(paths: &[PathBuf]) -> io::Result<usize> {
    let mut removed = 0;
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => {
                log::info!("已删除 {}", path.display());
                removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(removed)
}
