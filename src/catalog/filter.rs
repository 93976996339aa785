//! 按搜索条件过滤目录

use super::query::SearchQuery;
use super::types::CatalogEntry;

/// 平台过滤
pub fn system_matches(entry: &CatalogEntry, query: &SearchQuery) -> bool {
    query.include_systems.is_empty() || query.include_systems.contains(&entry.system)
}

/// 包含关键词全部出现在名称中
pub fn keywords_match(entry: &CatalogEntry, query: &SearchQuery) -> bool {
    if query.keywords.is_empty() {
        return true;
    }
    let name = entry.name.to_lowercase();
    query.keywords.iter().all(|k| name.contains(k.as_str()))
}

/// 排除关键词都不出现在名称中
pub fn exclusions_pass(entry: &CatalogEntry, query: &SearchQuery) -> bool {
    if query.exclusions.is_empty() {
        return true;
    }
    let name = entry.name.to_lowercase();
    !query.exclusions.iter().any(|e| name.contains(e.as_str()))
}

pub fn matches(entry: &CatalogEntry, query: &SearchQuery) -> bool {
    system_matches(entry, query) && keywords_match(entry, query) && exclusions_pass(entry, query)
}

/// 返回命中的条目及其在目录中的位置，保持目录顺序
pub fn filter<'a>(entries: &'a [CatalogEntry], query: &SearchQuery) -> Vec<(usize, &'a CatalogEntry)> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| matches(entry, query))
        .collect()
}
