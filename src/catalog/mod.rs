//! 游戏目录：搜索解析、过滤、聚合与安装状态

pub mod aggregate;
pub mod filter;
pub mod installed;
pub mod query;
pub mod types;

// 重新导出常用类型和函数
pub use aggregate::SearchResults;
pub use installed::InstalledStateResolver;
pub use query::SearchQuery;
pub use types::{
    check_plain_name, format_size, CatalogDocument, CatalogEntry, CatalogSnapshot, GroupEntry, InstallState,
    InstalledFile, InstalledGroup, ResolvedGroup, ResultGroup, System,
};

use crate::error::CoreResult;

/// 解析、过滤、聚合一次完成
pub fn search(snapshot: &CatalogSnapshot, raw: &str) -> CoreResult<SearchResults> {
    let query = SearchQuery::parse(raw, snapshot.systems())?;
    let hits = filter::filter(snapshot.entries(), &query);
    log::debug!("搜索 {:?}: {} 条命中", raw, hits.len());
    Ok(aggregate::aggregate(snapshot, &hits))
}
