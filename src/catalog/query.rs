//! 搜索语法解析
//!
//! 以空白分隔，每个词按顺序判断：
//! - 等于某个平台标识（忽略大小写）→ 平台过滤
//! - 以 `-` 开头 → 排除关键词
//! - 其他 → 包含关键词

use super::types::System;
use crate::error::{CoreError, CoreResult};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// 平台过滤（任一命中即可）
    pub include_systems: BTreeSet<String>,
    /// 包含关键词（全部命中），已转小写
    pub keywords: Vec<String>,
    /// 排除关键词（任一命中即排除），已转小写
    pub exclusions: Vec<String>,
}

impl SearchQuery {
    pub fn parse(raw: &str, systems: &[System]) -> CoreResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CoreError::InvalidQuery);
        }

        let mut query = SearchQuery::default();
        for token in raw.split_whitespace() {
            if let Some(system) = systems.iter().find(|s| s.id.eq_ignore_ascii_case(token)) {
                query.include_systems.insert(system.id.clone());
            } else if let Some(rest) = token.strip_prefix('-') {
                // 单独的 "-" 会排除所有条目，忽略
                if !rest.is_empty() {
                    query.exclusions.push(rest.to_lowercase());
                }
            } else {
                query.keywords.push(token.to_lowercase());
            }
        }

        Ok(query)
    }
}
