//! 搜索结果按平台聚合

use super::types::{CatalogEntry, CatalogSnapshot, GroupEntry, ResultGroup, System};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    pub groups: Vec<ResultGroup>,
    pub total: usize,
    pub total_size: u64,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// 按平台分组，分组按显示名升序，组内保持目录顺序
pub fn aggregate(snapshot: &CatalogSnapshot, hits: &[(usize, &CatalogEntry)]) -> SearchResults {
    let mut by_system: HashMap<&str, Vec<GroupEntry>> = HashMap::new();
    for (index, entry) in hits {
        by_system
            .entry(entry.system.as_str())
            .or_default()
            .push(GroupEntry {
                index: *index,
                entry: (*entry).clone(),
            });
    }

    let mut groups: Vec<ResultGroup> = by_system
        .into_iter()
        .map(|(id, entries)| {
            let system = snapshot
                .system(id)
                .cloned()
                .unwrap_or_else(|| System::new(id, ""));
            let total_size = entries.iter().map(|e| e.entry.size).sum();
            ResultGroup {
                system,
                count: entries.len(),
                entries,
                total_size,
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        a.system
            .display_name()
            .cmp(b.system.display_name())
            .then_with(|| a.system.id.cmp(&b.system.id))
    });

    let total = groups.iter().map(|g| g.count).sum();
    let total_size = groups.iter().map(|g| g.total_size).sum();
    SearchResults {
        groups,
        total,
        total_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::filter::filter;
    use crate::catalog::query::SearchQuery;
    use pretty_assertions::assert_eq;

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot::new(
            vec![
                System::new("SNES", "Super Nintendo"),
                System::new("GBA", "Game Boy Advance"),
                System::new("MD", ""),
            ],
            vec![
                CatalogEntry::new("SNES", "Mario World", 500_000),
                CatalogEntry::new("SNES", "Mario Kart", 600_000),
                CatalogEntry::new("GBA", "Zelda", 400_000),
                CatalogEntry::new("MD", "Sonic", 250_000),
                CatalogEntry::new("GBA", "Metroid", 800_000),
            ],
        )
        .unwrap()
    }

    fn search(snapshot: &CatalogSnapshot, raw: &str) -> SearchResults {
        let query = SearchQuery::parse(raw, snapshot.systems()).unwrap();
        let hits = filter(snapshot.entries(), &query);
        aggregate(snapshot, &hits)
    }

    #[test]
    fn scenario_groups_snes_marios() {
        let snapshot = snapshot();
        let results = search(&snapshot, "mario snes");
        assert_eq!(results.groups.len(), 1);
        let group = &results.groups[0];
        assert_eq!(group.system.id, "SNES");
        assert_eq!(group.count, 2);
        assert_eq!(group.total_size, 1_100_000);
        assert_eq!(results.total, 2);
    }

    #[test]
    fn groups_sorted_by_display_name() {
        let snapshot = snapshot();
        let results = search(&snapshot, "-zzz");
        let order: Vec<&str> = results.groups.iter().map(|g| g.system.id.as_str()).collect();
        // "Game Boy Advance" < "MD" < "Super Nintendo"
        assert_eq!(order, vec!["GBA", "MD", "SNES"]);
    }

    #[test]
    fn group_totals_match_members() {
        let snapshot = snapshot();
        let results = search(&snapshot, "-zzz");
        for group in &results.groups {
            assert_eq!(group.count, group.entries.len());
            assert_eq!(group.total_size, group.entries.iter().map(|e| e.entry.size).sum::<u64>());
        }
        assert_eq!(results.total, snapshot.entries().len());
        assert_eq!(results.total_size, 2_550_000);
    }

    #[test]
    fn members_keep_catalog_order() {
        let snapshot = snapshot();
        let results = search(&snapshot, "gba");
        let indices: Vec<usize> = results.groups[0].entries.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![2, 4]);
    }

    #[test]
    fn no_hits_yield_no_groups() {
        let snapshot = snapshot();
        let results = search(&snapshot, "castlevania");
        assert!(results.is_empty());
        assert!(results.groups.is_empty());
    }
}
