use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
}

/// 外部工具命令（argv 形式）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// 批量压缩为 CHD
    pub compress: Vec<String>,
    /// 重复游戏清理，执行时追加地区优先级参数
    pub clean: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            compress: vec!["retro".into(), "compress".into(), "--auto".into()],
            clean: vec!["retro".into(), "clean".into(), "--priority".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub roms_dir: PathBuf,
    pub data_dir: PathBuf,
    pub catalog_url: String,
    pub install_workers: usize,
    pub region_priority: String,
    pub tools: ToolsConfig,
}

impl Default for Config {
    fn default() -> Self {
        let home = home_dir();
        Self {
            roms_dir: home.join("roms"),
            data_dir: home.join(".local/share/retro-shelf"),
            catalog_url: "http://127.0.0.1:8000/catalog.json".to_string(),
            install_workers: 4,
            region_priority: "W,E,U,J".to_string(),
            tools: ToolsConfig::default(),
        }
    }
}

/// 可以在会话中修改的配置项
pub const SETTING_KEYS: [&str; 4] = ["roms_dir", "catalog_url", "install_workers", "region_priority"];

impl Config {
    pub fn config_path() -> PathBuf {
        home_dir().join(".config/retro-shelf/config.toml")
    }

    pub fn load_or_default() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        if let Ok(dir) = std::env::var("RETRO_ROMS_DIR") {
            if !dir.is_empty() {
                config.roms_dir = PathBuf::from(dir);
            }
        }
        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("读取配置文件 {} 失败", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("解析配置文件 {} 失败", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("序列化配置失败")?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.install_workers == 0 {
            anyhow::bail!("install_workers 必须大于 0");
        }
        if self.roms_dir.as_os_str().is_empty() {
            anyhow::bail!("roms_dir 不能为空");
        }
        crate::manager::RegionPriority::parse(&self.region_priority)
            .context("region_priority 配置无效")?;
        Ok(())
    }

    /// 修改单个配置项，校验通过后才生效
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let mut next = self.clone();
        match key {
            "roms_dir" => next.roms_dir = PathBuf::from(value),
            "catalog_url" => next.catalog_url = value.to_string(),
            "install_workers" => {
                next.install_workers = value
                    .parse()
                    .with_context(|| format!("install_workers 需要一个整数，收到 {:?}", value))?;
            }
            "region_priority" => next.region_priority = value.to_uppercase(),
            _ => anyhow::bail!("未知配置项 {}，可选: {}", key, SETTING_KEYS.join(", ")),
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// 可修改配置项的当前值，顺序同 [`SETTING_KEYS`]
    pub fn settings(&self) -> Vec<(&'static str, String)> {
        vec![
            ("roms_dir", self.roms_dir.display().to_string()),
            ("catalog_url", self.catalog_url.clone()),
            ("install_workers", self.install_workers.to_string()),
            ("region_priority", self.region_priority.clone()),
        ]
    }

    pub fn catalog_cache_path(&self) -> PathBuf {
        self.data_dir.join("catalog.json")
    }
}
