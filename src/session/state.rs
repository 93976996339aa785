//! 交互状态
//!
//! 目录快照、搜索结果、安装标记和勾选状态只在交互循环中修改。后台任务只返回结果，
//! 由 [`Session::apply_outcome`] 统一应用。

use crate::catalog::{
    self, CatalogEntry, CatalogSnapshot, InstalledFile, InstalledGroup, InstalledStateResolver,
    ResolvedGroup, SearchResults,
};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::manager::{CatalogManager, ManagerFactory, RegionPriority};
use crate::selection::{LeafKey, SelectionStore, TreeId};
use crate::task::{TaskKind, TaskOutcome, TaskOutput, TaskRunner, TaskStatus};
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

// ========== 事件 ==========

#[derive(Debug)]
pub enum AppEvent {
    /// 控制台输入的一行
    Input(String),
    /// 标准输入已关闭
    InputClosed,
    TaskFinished(TaskOutcome),
}

impl From<TaskOutcome> for AppEvent {
    fn from(outcome: TaskOutcome) -> Self {
        AppEvent::TaskFinished(outcome)
    }
}

// ========== 视图数据 ==========

/// 当前显示的搜索结果
#[derive(Debug, Clone)]
pub struct SearchView {
    pub query: String,
    pub results: SearchResults,
    pub groups: Vec<ResolvedGroup>,
}

/// 任务结束后交给前端展示的信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub message: String,
}

// ========== Session ==========

pub struct Session {
    config: Config,
    config_path: PathBuf,
    make_manager: ManagerFactory,
    manager: Arc<dyn CatalogManager>,
    resolver: InstalledStateResolver,
    region_priority: RegionPriority,
    catalog: Option<Arc<CatalogSnapshot>>,
    search: Option<SearchView>,
    installed: Vec<InstalledGroup>,
    selection: SelectionStore,
    tasks: TaskRunner<AppEvent>,
}

impl Session {
    pub fn new(config: Config, make_manager: ManagerFactory, tx: mpsc::Sender<AppEvent>) -> Self {
        let region_priority = RegionPriority::parse(&config.region_priority).unwrap_or_else(|e| {
            log::warn!("{}，使用默认优先级", e);
            RegionPriority::default()
        });
        let manager = make_manager(&config);
        Self {
            config_path: Config::config_path(),
            make_manager,
            manager,
            resolver: InstalledStateResolver::new(config.roms_dir.clone()),
            region_priority,
            catalog: None,
            search: None,
            installed: Vec::new(),
            selection: SelectionStore::new(),
            tasks: TaskRunner::new(tx),
            config,
        }
    }

    /// 设置保存位置，默认为 [`Config::config_path`]
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    /// 启动时加载本地缓存的目录
    pub fn initial_load(&mut self) -> CoreResult<()> {
        let snapshot = self.manager.load()?;
        let Some(snapshot) = snapshot else {
            return Err(CoreError::CatalogUnavailable);
        };
        log::info!(
            "已加载目录: {} 个平台, {} 个游戏",
            snapshot.systems().len(),
            snapshot.entries().len()
        );
        self.catalog = Some(Arc::new(snapshot));
        self.refresh_installed();
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn catalog(&self) -> Option<&CatalogSnapshot> {
        self.catalog.as_deref()
    }

    pub fn search_view(&self) -> Option<&SearchView> {
        self.search.as_ref()
    }

    pub fn installed(&self) -> &[InstalledGroup] {
        &self.installed
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn tasks(&self) -> &TaskRunner<AppEvent> {
        &self.tasks
    }

    pub fn region_priority(&self) -> &RegionPriority {
        &self.region_priority
    }

    // ===== 搜索 =====

    /// 执行搜索并替换显示的结果，搜索树的勾选随之清空
    pub fn search(&mut self, raw: &str) -> CoreResult<&SearchView> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CoreError::InvalidQuery);
        }
        let snapshot = match &self.catalog {
            Some(snapshot) if !snapshot.is_empty() => snapshot.clone(),
            _ => return Err(CoreError::CatalogUnavailable),
        };

        let results = catalog::search(&snapshot, raw)?;
        let groups = self.resolver.resolve(&results.groups);
        self.selection.replace(TreeId::Search, search_leaves(&groups));
        Ok(self.search.insert(SearchView {
            query: raw.to_string(),
            results,
            groups,
        }))
    }

    /// 重新计算安装标记，不改变结果和勾选
    fn reresolve(&mut self) {
        if let Some(view) = self.search.as_mut() {
            view.groups = self.resolver.resolve(&view.results.groups);
        }
    }

    /// 重新扫描已安装的游戏，已安装树的勾选随之清空
    pub fn refresh_installed(&mut self) {
        self.installed = match &self.catalog {
            Some(snapshot) => self.resolver.scan_library(snapshot.systems()),
            None => Vec::new(),
        };
        self.selection
            .replace(TreeId::Installed, installed_leaves(&self.installed));
    }

    // ===== 设置 =====

    /// 修改并保存一项设置，随后按新配置重建管理器和安装状态
    ///
    /// 后台任务运行时拒绝修改，正在运行的任务仍使用旧配置。
    pub fn set_option(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        if self.tasks.any_running() {
            anyhow::bail!("后台任务运行中，请等待结束后再修改设置");
        }
        let mut next = self.config.clone();
        next.set(key, value)?;
        next.save_to(&self.config_path)
            .with_context(|| format!("保存配置到 {} 失败", self.config_path.display()))?;
        log::info!("设置已更新: {} = {}", key, value.trim());

        self.region_priority = RegionPriority::parse(&next.region_priority)?;
        self.resolver = InstalledStateResolver::new(next.roms_dir.clone());
        self.manager = (self.make_manager)(&next);
        self.config = next;
        self.refresh_installed();
        self.reresolve();
        Ok(())
    }

    // ===== 勾选 =====

    pub fn toggle(&mut self, tree: TreeId, key: &LeafKey) -> Option<bool> {
        self.selection.toggle(tree, key)
    }

    pub fn select_all(&mut self, tree: TreeId) {
        self.selection.select_all(tree);
    }

    pub fn deselect_all(&mut self, tree: TreeId) {
        self.selection.deselect_all(tree);
    }

    /// 按显示序号（从 1 开始）取条目
    pub fn leaf_at(&self, tree: TreeId, number: usize) -> Option<LeafKey> {
        number
            .checked_sub(1)
            .and_then(|i| self.selection.displayed(tree).get(i))
            .cloned()
    }

    /// 搜索树中勾选的目录条目，按显示顺序
    pub fn selected_entries(&self) -> Vec<CatalogEntry> {
        let Some(snapshot) = &self.catalog else {
            return Vec::new();
        };
        self.selection
            .selected_leaves(TreeId::Search)
            .into_iter()
            .filter_map(|key| snapshot.entries().get(key.leaf).cloned())
            .collect()
    }

    /// 已安装树中勾选的文件
    pub fn selected_installed(&self) -> Vec<&InstalledFile> {
        self.selection
            .selected_leaves(TreeId::Installed)
            .into_iter()
            .filter_map(|key| {
                self.installed
                    .iter()
                    .find(|g| g.system == key.group)
                    .and_then(|g| g.files.get(key.leaf))
            })
            .collect()
    }

    // ===== 后台任务 =====

    pub fn start_refresh(&mut self) -> bool {
        let manager = self.manager.clone();
        self.tasks
            .start(TaskKind::Refresh, move || manager.fetch().map(TaskOutput::Catalog))
    }

    pub fn install_selected(&mut self) -> CoreResult<bool> {
        let entries = self.selected_entries();
        if entries.is_empty() {
            return Err(CoreError::NothingSelected);
        }
        Ok(self.install(entries))
    }

    pub fn install(&mut self, entries: Vec<CatalogEntry>) -> bool {
        let manager = self.manager.clone();
        self.tasks.start(TaskKind::Install, move || {
            manager.install(&entries).map(TaskOutput::Installed)
        })
    }

    pub fn start_compress(&mut self) -> bool {
        let manager = self.manager.clone();
        self.tasks
            .start(TaskKind::Compress, move || manager.compress().map(|_| TaskOutput::Done))
    }

    pub fn start_clean(&mut self) -> bool {
        let manager = self.manager.clone();
        let priority = self.region_priority.clone();
        self.tasks.start(TaskKind::Clean, move || {
            manager.clean(&priority).map(|_| TaskOutput::Done)
        })
    }

    /// 删除勾选的已安装文件，返回删除数量
    pub fn remove_selected(&mut self) -> CoreResult<usize> {
        let paths: Vec<PathBuf> = self
            .selected_installed()
            .into_iter()
            .map(|f| f.path.clone())
            .collect();
        if paths.is_empty() {
            return Err(CoreError::NothingSelected);
        }
        let removed = catalog::installed::remove_files(&paths);
        self.refresh_installed();
        self.reresolve();
        Ok(removed?)
    }

    /// 应用后台任务结果：更新任务状态，并按任务类型刷新视图
    pub fn apply_outcome(&mut self, outcome: TaskOutcome) -> Option<TaskReport> {
        let status = self.tasks.complete(&outcome)?;
        let kind = outcome.kind;

        match (kind, outcome.result) {
            (TaskKind::Refresh, Ok(TaskOutput::Catalog(snapshot))) => {
                self.catalog = Some(Arc::new(snapshot));
                self.refresh_installed();
                // 目录替换后重新执行上一次搜索
                if let Some(query) = self.search.take().map(|v| v.query) {
                    if let Some(e) = self.search(&query).err() {
                        log::warn!("刷新后重新搜索失败: {}", e);
                        self.selection.clear(TreeId::Search);
                    }
                }
            }
            (TaskKind::Refresh, _) => {}
            // 安装失败时可能已有部分完成，同样刷新
            (TaskKind::Install | TaskKind::Compress | TaskKind::Clean, _) => {
                self.refresh_installed();
                self.reresolve();
            }
        }

        let message = self.tasks.record(kind).message.clone();
        self.tasks.acknowledge(kind);
        Some(TaskReport {
            kind,
            status,
            message,
        })
    }
}

fn search_leaves(groups: &[ResolvedGroup]) -> Vec<LeafKey> {
    groups
        .iter()
        .flat_map(|g| {
            g.group
                .entries
                .iter()
                .map(move |e| LeafKey::new(&g.group.system.id, e.index))
        })
        .collect()
}

fn installed_leaves(groups: &[InstalledGroup]) -> Vec<LeafKey> {
    groups
        .iter()
        .flat_map(|g| (0..g.files.len()).map(move |i| LeafKey::new(&g.system, i)))
        .collect()
}
