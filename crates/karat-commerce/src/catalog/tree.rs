//! Category hierarchy queries over a loaded set of categories.
//!
//! Parent links are not trusted: a parent that is missing from the set makes
//! the node a root, and every traversal keeps a visited set so corrupted data
//! containing a cycle still terminates.

use crate::catalog::{Category, CategoryNode};
use crate::ids::CategoryId;
use std::collections::{HashMap, HashSet, VecDeque};

/// Index over a set of categories.
#[derive(Debug, Clone)]
pub struct CategoryIndex<'a> {
    /// Categories ordered by sort order, ties kept in input order.
    ordered: Vec<&'a Category>,
    by_id: HashMap<&'a CategoryId, &'a Category>,
    children: HashMap<&'a CategoryId, Vec<&'a Category>>,
}

impl<'a> CategoryIndex<'a> {
    /// Build the index. `categories` is expected in insertion order.
    pub fn new(categories: &'a [Category]) -> Self {
        let mut ordered: Vec<&Category> = categories.iter().collect();
        ordered.sort_by_key(|c| c.sort_order);

        let by_id: HashMap<_, _> = ordered.iter().map(|&c| (&c.id, c)).collect();

        let mut children: HashMap<&CategoryId, Vec<&Category>> = HashMap::new();
        for &category in &ordered {
            if let Some(parent) = &category.parent_id {
                if by_id.contains_key(parent) {
                    children.entry(parent).or_default().push(category);
                }
            }
        }

        Self {
            ordered,
            by_id,
            children,
        }
    }

    pub fn get(&self, id: &CategoryId) -> Option<&'a Category> {
        self.by_id.get(id).copied()
    }

    pub fn contains(&self, id: &CategoryId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Whether the category has no resolvable parent.
    fn is_root(&self, category: &Category) -> bool {
        match &category.parent_id {
            None => true,
            Some(parent) => !self.by_id.contains_key(parent),
        }
    }

    /// Build the forest of root categories with nested subcategories.
    ///
    /// Every category appears exactly once. Nodes caught in a parent cycle
    /// are unreachable from any root and are promoted to roots themselves.
    pub fn tree(&self) -> Vec<CategoryNode> {
        let mut visited: HashSet<&'a CategoryId> = HashSet::new();
        let mut forest = Vec::new();

        for &category in &self.ordered {
            if self.is_root(category) && visited.insert(&category.id) {
                forest.push(self.subtree(category, &mut visited));
            }
        }

        for &category in &self.ordered {
            if visited.insert(&category.id) {
                forest.push(self.subtree(category, &mut visited));
            }
        }

        forest
    }

    fn subtree(&self, category: &'a Category, visited: &mut HashSet<&'a CategoryId>) -> CategoryNode {
        let mut node = CategoryNode::leaf(category);
        if let Some(children) = self.children.get(&category.id) {
            for &child in children {
                if visited.insert(&child.id) {
                    node.subcategories.push(self.subtree(child, visited));
                }
            }
        }
        node
    }

    /// Names from the root down to `id`.
    ///
    /// Stops at a category without a parent or at a parent link that does
    /// not resolve. An unknown `id` yields an empty path.
    pub fn path(&self, id: &CategoryId) -> Vec<String> {
        let mut names = Vec::new();
        let mut seen: HashSet<&CategoryId> = HashSet::new();
        let mut current = self.get(id);

        while let Some(category) = current {
            if !seen.insert(&category.id) {
                break;
            }
            names.push(category.name.clone());
            current = category.parent_id.as_ref().and_then(|p| self.get(p));
        }

        names.reverse();
        names
    }

    /// `id` plus all of its transitive descendants, breadth first.
    pub fn descendants(&self, id: &CategoryId) -> Vec<CategoryId> {
        let Some(root) = self.get(id) else {
            return Vec::new();
        };

        let mut seen: HashSet<&CategoryId> = HashSet::from([&root.id]);
        let mut result = vec![root.id.clone()];
        let mut queue: VecDeque<&CategoryId> = VecDeque::from([&root.id]);

        while let Some(current) = queue.pop_front() {
            for child in self.children.get(current).into_iter().flatten() {
                if seen.insert(&child.id) {
                    result.push(child.id.clone());
                    queue.push_back(&child.id);
                }
            }
        }

        result
    }

    /// Whether making `new_parent` the parent of `id` would close a cycle.
    pub fn would_cycle(&self, id: &CategoryId, new_parent: &CategoryId) -> bool {
        id == new_parent || self.descendants(id).iter().any(|d| d == new_parent)
    }
}
