//! 分组 → 条目 两级勾选状态
//!
//! 与显示层无关，按 (分组, 条目) 记录布尔值。每棵树替换显示内容时清空。

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeId {
    /// 搜索结果，条目为目录位置
    Search,
    /// 已安装列表，条目为分组内位置
    Installed,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafKey {
    pub group: String,
    pub leaf: usize,
}

impl LeafKey {
    pub fn new(group: &str, leaf: usize) -> Self {
        Self {
            group: group.to_string(),
            leaf,
        }
    }
}

#[derive(Debug, Default)]
struct TreeSelection {
    /// 当前显示的条目，按显示顺序
    displayed: Vec<LeafKey>,
    index: HashSet<LeafKey>,
    marked: HashMap<LeafKey, bool>,
}

#[derive(Debug, Default)]
pub struct SelectionStore {
    trees: HashMap<TreeId, TreeSelection>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 替换显示内容，旧的勾选全部失效
    pub fn replace(&mut self, tree: TreeId, leaves: impl IntoIterator<Item = LeafKey>) {
        let displayed: Vec<LeafKey> = leaves.into_iter().collect();
        let index = displayed.iter().cloned().collect();
        self.trees.insert(
            tree,
            TreeSelection {
                displayed,
                index,
                marked: HashMap::new(),
            },
        );
    }

    pub fn clear(&mut self, tree: TreeId) {
        self.trees.remove(&tree);
    }

    /// 切换单个条目，返回新值；条目不在显示中时返回 None
    pub fn toggle(&mut self, tree: TreeId, key: &LeafKey) -> Option<bool> {
        let sel = self.trees.get_mut(&tree)?;
        if !sel.index.contains(key) {
            return None;
        }
        let value = sel.marked.entry(key.clone()).or_insert(false);
        *value = !*value;
        Some(*value)
    }

    pub fn select_all(&mut self, tree: TreeId) {
        self.set_all(tree, true);
    }

    pub fn deselect_all(&mut self, tree: TreeId) {
        self.set_all(tree, false);
    }

    fn set_all(&mut self, tree: TreeId, value: bool) {
        if let Some(sel) = self.trees.get_mut(&tree) {
            for key in &sel.displayed {
                sel.marked.insert(key.clone(), value);
            }
        }
    }

    pub fn is_selected(&self, tree: TreeId, key: &LeafKey) -> bool {
        self.trees
            .get(&tree)
            .and_then(|sel| sel.marked.get(key))
            .copied()
            .unwrap_or(false)
    }

    /// 已勾选的条目，按显示顺序
    pub fn selected_leaves(&self, tree: TreeId) -> Vec<&LeafKey> {
        match self.trees.get(&tree) {
            Some(sel) => sel
                .displayed
                .iter()
                .filter(|key| sel.marked.get(*key).copied().unwrap_or(false))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn selected_count(&self, tree: TreeId) -> usize {
        self.selected_leaves(tree).len()
    }

    pub fn displayed(&self, tree: TreeId) -> &[LeafKey] {
        self.trees
            .get(&tree)
            .map(|sel| sel.displayed.as_slice())
            .unwrap_or(&[])
    }
}
