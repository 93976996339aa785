//! 基于 HTTP 的目录管理器
//!
//! 目录快照缓存在 `<data_dir>/catalog.json`，游戏文件下载到 `<roms_dir>/<平台>/<文件名>`。

use super::{CatalogManager, ExternalTools, RegionPriority};
use crate::catalog::{check_plain_name, CatalogDocument, CatalogEntry, CatalogSnapshot};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use chrono::Local;
use reqwest::blocking::Client;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const USER_AGENT: &str = concat!("retro-shelf/", env!("CARGO_PKG_VERSION"));

pub struct RemoteCatalog {
    catalog_url: String,
    cache_path: PathBuf,
    roms_dir: PathBuf,
    install_workers: usize,
    tools: ExternalTools,
}

impl RemoteCatalog {
    pub fn new(config: &Config) -> Self {
        Self {
            catalog_url: config.catalog_url.clone(),
            cache_path: config.catalog_cache_path(),
            roms_dir: config.roms_dir.clone(),
            install_workers: config.install_workers.max(1),
            tools: ExternalTools::new(config.tools.clone(), config.roms_dir.clone()),
        }
    }

    /// 阻塞客户端只能在后台线程中创建和释放
    fn client() -> reqwest::Result<Client> {
        Client::builder().user_agent(USER_AGENT).build()
    }

    fn read_cache(&self) -> CoreResult<Option<CatalogSnapshot>> {
        if !self.cache_path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.cache_path)?;
        match serde_json::from_str::<CatalogDocument>(&raw) {
            Ok(doc) => Ok(Some(CatalogSnapshot::from_document(doc)?)),
            Err(e) => {
                // 缓存损坏时当作没有缓存，等待重新更新
                log::warn!("目录缓存 {} 无法解析: {}", self.cache_path.display(), e);
                Ok(None)
            }
        }
    }

    fn write_cache(&self, snapshot: &CatalogSnapshot) -> io::Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.cache_path, raw)
    }

    fn download(&self, client: &Client, entry: &CatalogEntry) -> Result<(), String> {
        let url = entry
            .source
            .as_deref()
            .ok_or_else(|| format!("{} 没有下载地址", entry.name))?;
        // 只允许写到 <roms_dir>/<平台>/ 下
        check_plain_name(&entry.system)
            .and_then(|_| check_plain_name(&entry.name))
            .map_err(|e| format!("{}: {}", entry.name, e))?;
        let dir = self.roms_dir.join(&entry.system);
        fs::create_dir_all(&dir).map_err(|e| format!("创建 {} 失败: {}", dir.display(), e))?;

        let target = dir.join(&entry.name);
        let partial = dir.join(format!("{}.part", entry.name));

        let mut response = client
            .get(url)
            .send()
            .map_err(|e| format!("{}: {}", entry.name, e))?;
        if !response.status().is_success() {
            return Err(format!("{}: HTTP {}", entry.name, response.status()));
        }

        write_atomically(&partial, &target, |file| {
            response.copy_to(file).map(|_| ()).map_err(io::Error::other)
        })
        .map_err(|e| format!("{}: {}", entry.name, e))?;

        log::info!("已下载 {} -> {}", entry.name, target.display());
        Ok(())
    }
}

/// 先写入临时文件，成功后再改名
fn write_atomically<F>(partial: &Path, target: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut fs::File) -> io::Result<()>,
{
    let mut file = fs::File::create(partial)?;
    let result = write(&mut file).and_then(|_| file.sync_all());
    drop(file);
    let result = result.and_then(|_| fs::rename(partial, target));
    if result.is_err() {
        let _ = fs::remove_file(partial);
    }
    result
}

impl CatalogManager for RemoteCatalog {
    fn load(&self) -> CoreResult<Option<CatalogSnapshot>> {
        self.read_cache()
    }

    fn fetch(&self) -> CoreResult<CatalogSnapshot> {
        log::info!("获取目录: {}", self.catalog_url);
        let client = Self::client().map_err(|e| CoreError::FetchFailed(e.to_string()))?;
        let response = client
            .get(&self.catalog_url)
            .send()
            .map_err(|e| CoreError::FetchFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(CoreError::FetchFailed(format!(
                "{} 返回状态码 {}",
                self.catalog_url,
                response.status()
            )));
        }
        let doc: CatalogDocument = response
            .json()
            .map_err(|e| CoreError::FetchFailed(e.to_string()))?;
        let snapshot = CatalogSnapshot::from_document(doc)?.stamped(Local::now());

        self.write_cache(&snapshot)
            .map_err(|e| CoreError::FetchFailed(format!("保存目录缓存失败: {}", e)))?;
        Ok(snapshot)
    }

    fn install(&self, entries: &[CatalogEntry]) -> CoreResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }
        let client = Self::client().map_err(|e| CoreError::InstallFailed(e.to_string()))?;
        let next = AtomicUsize::new(0);
        let done = AtomicUsize::new(0);
        let errors: Mutex<Vec<String>> = Mutex::new(Vec::new());
        let workers = self.install_workers.min(entries.len());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let i = next.fetch_add(1, Ordering::SeqCst);
                    let Some(entry) = entries.get(i) else {
                        break;
                    };
                    match self.download(&client, entry) {
                        Ok(()) => {
                            done.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => {
                            log::warn!("安装失败: {}", e);
                            if let Ok(mut errs) = errors.lock() {
                                errs.push(e);
                            }
                        }
                    }
                });
            }
        });

        let errors = errors.into_inner().unwrap_or_default();
        let done = done.into_inner();
        if errors.is_empty() {
            Ok(done)
        } else {
            // 已完成的部分保留，不回滚
            Err(CoreError::InstallFailed(format!(
                "成功 {}/{}，失败: {}",
                done,
                entries.len(),
                errors.join("; ")
            )))
        }
    }

    fn compress(&self) -> CoreResult<()> {
        self.tools.compress().map(|_| ()).map_err(CoreError::CompressFailed)
    }

    fn clean(&self, priority: &RegionPriority) -> CoreResult<()> {
        self.tools.clean(priority).map(|_| ()).map_err(CoreError::CleanFailed)
    }
}
