//! 目录管理器：加载 / 更新目录、安装游戏、压缩与去重
//!
//! 交互层只通过 [`CatalogManager`] 访问这些长耗时操作，它们都在后台任务中调用。

pub mod external;
pub mod remote;

pub use external::ExternalTools;
pub use remote::RemoteCatalog;

use crate::catalog::{CatalogEntry, CatalogSnapshot};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::sync::Arc;

pub trait CatalogManager: Send + Sync {
    /// 本地缓存的目录快照，没有缓存时返回 None
    fn load(&self) -> CoreResult<Option<CatalogSnapshot>>;

    /// 从远端获取完整目录
    fn fetch(&self) -> CoreResult<CatalogSnapshot>;

    /// 下载并安装到安装根目录，返回安装数量
    fn install(&self, entries: &[CatalogEntry]) -> CoreResult<usize>;

    /// 批量压缩已安装的光盘镜像
    fn compress(&self) -> CoreResult<()>;

    /// 按地区优先级删除重复游戏
    fn clean(&self, priority: &RegionPriority) -> CoreResult<()>;
}

/// 按配置创建目录管理器，修改设置后重新创建
pub type ManagerFactory = Box<dyn Fn(&Config) -> Arc<dyn CatalogManager> + Send>;

/// 地区优先级，如 `W,E,U,J` 表示 World > Europe > USA > Japan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionPriority(Vec<String>);

impl RegionPriority {
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let mut codes: Vec<String> = Vec::new();
        for part in raw.split(',') {
            let code = part.trim().to_uppercase();
            if code.is_empty() || codes.contains(&code) {
                return Err(CoreError::InvalidRegionPriority(raw.to_string()));
            }
            codes.push(code);
        }
        Ok(Self(codes))
    }

}

impl Default for RegionPriority {
    fn default() -> Self {
        Self(["W", "E", "U", "J"].iter().map(|c| c.to_string()).collect())
    }
}

impl fmt::Display for RegionPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}
