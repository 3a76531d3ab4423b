//! Category tree
//!
//! Categories are stored in an arena indexed by id. Each record keeps its
//! parent id, and every walk follows the id chain, so the tree never holds
//! references into itself.

use std::collections::{BTreeSet, HashMap};

use crate::error::{Error, Result};
use crate::models::Category;

/// Separator used by category paths ("Food > Groceries")
pub const PATH_SEPARATOR: &str = " > ";

/// Read-only category hierarchy
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    categories: Vec<Category>,
    index: HashMap<i64, usize>,
    children: HashMap<i64, Vec<i64>>,
}

impl CategoryTree {
    /// Build a tree, rejecting duplicate ids, dangling parents and cycles
    pub fn new(categories: Vec<Category>) -> Result<Self> {
        let mut index = HashMap::with_capacity(categories.len());
        for (pos, category) in categories.iter().enumerate() {
            if index.insert(category.id, pos).is_some() {
                return Err(Error::InvalidData(format!(
                    "duplicate category id {}",
                    category.id
                )));
            }
        }

        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        for category in &categories {
            if let Some(parent_id) = category.parent_id {
                if !index.contains_key(&parent_id) {
                    return Err(Error::InvalidData(format!(
                        "category {} references missing parent {}",
                        category.id, parent_id
                    )));
                }
                children.entry(parent_id).or_default().push(category.id);
            }
        }
        for ids in children.values_mut() {
            ids.sort_unstable();
        }

        let tree = Self {
            categories,
            index,
            children,
        };

        // A chain longer than the number of categories must revisit a node
        for category in &tree.categories {
            let mut steps = 0;
            let mut current = category.parent_id;
            while let Some(id) = current {
                steps += 1;
                if steps > tree.categories.len() {
                    return Err(Error::InvalidData(format!(
                        "category {} is part of a parent cycle",
                        category.id
                    )));
                }
                current = tree.get(id).and_then(|c| c.parent_id);
            }
        }

        tracing::trace!(categories = tree.len(), "Category tree built");
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn get(&self, id: i64) -> Option<&Category> {
        self.index.get(&id).map(|&pos| &self.categories[pos])
    }

    pub fn contains(&self, id: i64) -> bool {
        self.index.contains_key(&id)
    }

    /// Fail with `UnknownCategory` when `id` is not in the tree
    pub fn require(&self, id: i64) -> Result<&Category> {
        self.get(id).ok_or(Error::UnknownCategory(id))
    }

    pub fn name(&self, id: i64) -> Option<&str> {
        self.get(id).map(|c| c.name.as_str())
    }

    pub fn parent(&self, id: i64) -> Option<i64> {
        self.get(id).and_then(|c| c.parent_id)
    }

    pub fn children(&self, id: i64) -> &[i64] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Categories without a parent, in id order
    pub fn roots(&self) -> Vec<i64> {
        let mut roots: Vec<i64> = self
            .categories
            .iter()
            .filter(|c| c.parent_id.is_none())
            .map(|c| c.id)
            .collect();
        roots.sort_unstable();
        roots
    }

    /// `id` followed by its parent chain up to the root
    ///
    /// An id missing from the tree yields only itself.
    pub fn ancestors(&self, id: i64) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: Some(id),
        }
    }

    /// Top-level ancestor of `id` (itself for roots and unknown ids)
    pub fn top_level(&self, id: i64) -> i64 {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// Number of parents above `id` (0 for roots)
    pub fn depth(&self, id: i64) -> usize {
        self.ancestors(id).count() - 1
    }

    /// `id` and every category below it
    pub fn descendants(&self, id: i64) -> BTreeSet<i64> {
        let mut found = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if found.insert(current) {
                stack.extend_from_slice(self.children(current));
            }
        }
        found
    }

    /// True when `ancestor` is `id` itself or one of its parents
    pub fn is_within(&self, id: i64, ancestor: i64) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Full path such as "Food > Groceries"
    pub fn path(&self, id: i64) -> Option<String> {
        self.get(id)?;
        let mut names: Vec<&str> = self.ancestors(id).filter_map(|a| self.name(a)).collect();
        names.reverse();
        Some(names.join(PATH_SEPARATOR))
    }

    /// Resolve a full path (case-insensitive) or a bare root name
    pub fn find_by_path(&self, path: &str) -> Option<i64> {
        let wanted: Vec<String> = path
            .split(PATH_SEPARATOR.trim())
            .map(|part| part.trim().to_lowercase())
            .filter(|part| !part.is_empty())
            .collect();
        if wanted.is_empty() {
            return None;
        }

        let mut candidates = self.roots();
        let mut found = None;
        for part in &wanted {
            let next = candidates
                .iter()
                .copied()
                .find(|&id| self.name(id).map(|n| n.to_lowercase()) == Some(part.clone()))?;
            found = Some(next);
            candidates = self.children(next).to_vec();
        }
        found
    }
}

/// Iterator over a category and its parents
pub struct Ancestors<'a> {
    tree: &'a CategoryTree,
    next: Option<i64>,
}

impl Iterator for Ancestors<'_> {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_tree;

    #[test]
    fn test_ancestors_and_roots() {
        let tree = sample_tree();
        // 12 Groceries -> 1 Food
        assert_eq!(tree.ancestors(12).collect::<Vec<_>>(), vec![12, 1]);
        assert_eq!(tree.ancestors(1).collect::<Vec<_>>(), vec![1]);
        assert_eq!(tree.top_level(12), 1);
        assert_eq!(tree.depth(12), 1);
        assert_eq!(tree.depth(1), 0);
        assert_eq!(tree.roots(), vec![1, 2, 3]);
    }

    #[test]
    fn test_unknown_id_walks_to_itself() {
        let tree = sample_tree();
        assert_eq!(tree.ancestors(999).collect::<Vec<_>>(), vec![999]);
        assert_eq!(tree.top_level(999), 999);
        assert!(tree.path(999).is_none());
        assert!(matches!(tree.require(999), Err(Error::UnknownCategory(999))));
    }

    #[test]
    fn test_descendants() {
        let tree = sample_tree();
        let food: Vec<i64> = tree.descendants(1).into_iter().collect();
        assert_eq!(food, vec![1, 11, 12]);
        assert!(tree.is_within(11, 1));
        assert!(!tree.is_within(1, 11));
    }

    #[test]
    fn test_paths() {
        let tree = sample_tree();
        assert_eq!(tree.path(12).as_deref(), Some("Food > Groceries"));
        assert_eq!(tree.path(2).as_deref(), Some("Salary"));
        assert_eq!(tree.find_by_path("food > groceries"), Some(12));
        assert_eq!(tree.find_by_path("Food"), Some(1));
        assert_eq!(tree.find_by_path("Groceries"), None);
        assert_eq!(tree.find_by_path(""), None);
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let result = CategoryTree::new(vec![
            Category::new(1, "A", None),
            Category::new(1, "B", None),
        ]);
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_rejects_missing_parent() {
        let result = CategoryTree::new(vec![Category::new(2, "Child", Some(42))]);
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_rejects_cycles() {
        let result = CategoryTree::new(vec![
            Category::new(1, "A", Some(3)),
            Category::new(2, "B", Some(1)),
            Category::new(3, "C", Some(2)),
        ]);
        assert!(matches!(result, Err(Error::InvalidData(_))));

        let self_loop = CategoryTree::new(vec![Category::new(5, "Loop", Some(5))]);
        assert!(self_loop.is_err());
    }
}
