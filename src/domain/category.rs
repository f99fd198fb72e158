//! Market category hierarchy.
//!
//! Category data arrives from reference-data sync as a flat node list and
//! may be malformed: missing parents, orphans, even cycles. Every traversal
//! here terminates on arbitrary input; [`CategoryTree::validate`] reports
//! the damage instead of panicking.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::id::CategoryId;

/// One node of the market category tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: CategoryId,
    pub name: String,
    /// `None` for root categories.
    pub parent: Option<CategoryId>,
    /// Whether items are listed directly under this node.
    pub has_items: bool,
}

/// Queryable index over a flat node list.
///
/// Construction never validates; the sync process owns data quality and
/// [`CategoryTree::validate`] reports on it.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    nodes: HashMap<CategoryId, CategoryNode>,
    children: HashMap<CategoryId, Vec<CategoryId>>,
}

/// Structural health summary produced by [`CategoryTree::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyReport {
    pub node_count: usize,
    /// Nodes whose parent id does not resolve.
    pub orphan_count: usize,
    /// Distinct parent-link cycles.
    pub cycle_count: usize,
    /// Distinct parent ids referenced but absent from the node set.
    pub missing_parent_count: usize,
    pub issues: Vec<String>,
}

impl HierarchyReport {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.orphan_count == 0 && self.cycle_count == 0 && self.missing_parent_count == 0
    }
}

impl CategoryTree {
    /// Build the id and child indexes from a flat node list.
    ///
    /// Duplicate ids keep the last occurrence.
    #[must_use]
    pub fn from_nodes(nodes: Vec<CategoryNode>) -> Self {
        let mut index: HashMap<CategoryId, CategoryNode> = HashMap::with_capacity(nodes.len());
        for node in nodes {
            index.insert(node.id, node);
        }

        let mut children: HashMap<CategoryId, Vec<CategoryId>> = HashMap::new();
        for node in index.values() {
            if let Some(parent) = node.parent {
                children.entry(parent).or_default().push(node.id);
            }
        }
        for ids in children.values_mut() {
            ids.sort_unstable();
        }

        Self {
            nodes: index,
            children,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn node(&self, id: CategoryId) -> Option<&CategoryNode> {
        self.nodes.get(&id)
    }

    /// Nodes with no parent, ordered by id.
    #[must_use]
    pub fn root_nodes(&self) -> Vec<&CategoryNode> {
        let mut roots: Vec<&CategoryNode> =
            self.nodes.values().filter(|n| n.parent.is_none()).collect();
        roots.sort_unstable_by_key(|n| n.id);
        roots
    }

    /// Direct children only, ordered by id.
    #[must_use]
    pub fn children(&self, id: CategoryId) -> Vec<&CategoryNode> {
        self.children
            .get(&id)
            .map(|ids| ids.iter().filter_map(|c| self.nodes.get(c)).collect())
            .unwrap_or_default()
    }

    /// Breadth-first walk over child links from `id`.
    ///
    /// The visited set guarantees every reachable descendant appears exactly
    /// once, even when child links loop back.
    #[must_use]
    pub fn descendants(&self, id: CategoryId) -> Vec<&CategoryNode> {
        let mut visited: HashSet<CategoryId> = HashSet::new();
        visited.insert(id);

        let mut result = Vec::new();
        let mut queue: VecDeque<CategoryId> = VecDeque::new();
        queue.push_back(id);

        while let Some(current) = queue.pop_front() {
            for child in self.children.get(&current).into_iter().flatten() {
                if visited.insert(*child) {
                    if let Some(node) = self.nodes.get(child) {
                        result.push(node);
                    }
                    queue.push_back(*child);
                }
            }
        }
        result
    }

    /// Walk parent links upward from `id`, returning the chain root-first.
    ///
    /// Iteration is bounded by the node count so a parent-link cycle
    /// terminates with a truncated path. `None` for an unknown id.
    #[must_use]
    pub fn path_to_root(&self, id: CategoryId) -> Option<Vec<&CategoryNode>> {
        let start = self.nodes.get(&id)?;

        let mut path: Vec<&CategoryNode> = Vec::new();
        let mut current = Some(start);
        while let Some(node) = current {
            if path.len() >= self.nodes.len() {
                break;
            }
            path.push(node);
            current = node.parent.and_then(|p| self.nodes.get(&p));
        }
        path.reverse();
        Some(path)
    }

    /// Depth of the subtree under `id`: 0 for a leaf, `1 + max(child
    /// depths)` otherwise. Unknown ids report 0.
    #[must_use]
    pub fn max_depth(&self, id: CategoryId) -> usize {
        let mut visited = HashSet::new();
        self.depth_below(id, &mut visited)
    }

    fn depth_below(&self, id: CategoryId, visited: &mut HashSet<CategoryId>) -> usize {
        if !visited.insert(id) {
            return 0;
        }
        self.children
            .get(&id)
            .into_iter()
            .flatten()
            .map(|child| self.depth_below(*child, visited))
            .max()
            .map_or(0, |depth| depth + 1)
    }

    /// Ids of `id` and its descendants that list items directly, the set an
    /// arbitrage scan scopes item lookups with.
    #[must_use]
    pub fn item_category_ids(&self, id: CategoryId) -> Vec<CategoryId> {
        let mut ids = Vec::new();
        if self.nodes.get(&id).is_some_and(|n| n.has_items) {
            ids.push(id);
        }
        ids.extend(
            self.descendants(id)
                .into_iter()
                .filter(|n| n.has_items)
                .map(|n| n.id),
        );
        ids
    }

    /// Sweep the whole node set for orphans, cycles, and missing parents.
    ///
    /// Reports, never repairs: resync is the fix and it belongs to the
    /// caller.
    #[must_use]
    pub fn validate(&self) -> HierarchyReport {
        let mut report = HierarchyReport {
            node_count: self.nodes.len(),
            ..HierarchyReport::default()
        };

        let mut missing_parents: HashSet<CategoryId> = HashSet::new();
        for node in self.nodes.values() {
            if let Some(parent) = node.parent {
                if !self.nodes.contains_key(&parent) {
                    report.orphan_count += 1;
                    missing_parents.insert(parent);
                    report.issues.push(format!(
                        "category {} ({}) references missing parent {}",
                        node.id, node.name, parent
                    ));
                }
            }
        }
        report.missing_parent_count = missing_parents.len();
        for parent in &missing_parents {
            report
                .issues
                .push(format!("parent category {parent} is absent from the node set"));
        }

        // Each node's ancestor chain is walked with a per-walk seen set;
        // re-entry marks a cycle. Nodes already attributed to a known cycle
        // are skipped so one loop is counted once.
        let mut on_cycle: HashSet<CategoryId> = HashSet::new();
        let mut ids: Vec<CategoryId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        for start in ids {
            if on_cycle.contains(&start) {
                continue;
            }
            let mut seen: Vec<CategoryId> = Vec::new();
            let mut current = Some(start);
            while let Some(id) = current {
                if on_cycle.contains(&id) {
                    break;
                }
                if let Some(position) = seen.iter().position(|s| *s == id) {
                    on_cycle.extend(seen[position..].iter().copied());
                    report.cycle_count += 1;
                    report
                        .issues
                        .push(format!("parent-link cycle detected through category {id}"));
                    break;
                }
                seen.push(id);
                current = self
                    .nodes
                    .get(&id)
                    .and_then(|n| n.parent)
                    .filter(|p| self.nodes.contains_key(p));
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u32, name: &str, parent: Option<u32>, has_items: bool) -> CategoryNode {
        CategoryNode {
            id: CategoryId::new(id),
            name: name.to_string(),
            parent: parent.map(CategoryId::new),
            has_items,
        }
    }

    fn market_tree() -> CategoryTree {
        CategoryTree::from_nodes(vec![
            node(1, "Ships", None, false),
            node(10, "Frigates", Some(1), true),
            node(11, "Cruisers", Some(1), true),
            node(100, "Assault Frigates", Some(10), true),
            node(2, "Minerals", None, true),
        ])
    }

    #[test]
    fn root_nodes_ordered_by_id() {
        let tree = market_tree();
        let roots: Vec<u32> = tree.root_nodes().iter().map(|n| n.id.value()).collect();
        assert_eq!(roots, vec![1, 2]);
    }

    #[test]
    fn children_are_direct_only() {
        let tree = market_tree();
        let ids: Vec<u32> = tree
            .children(CategoryId::new(1))
            .iter()
            .map(|n| n.id.value())
            .collect();
        assert_eq!(ids, vec![10, 11]);
    }

    #[test]
    fn descendants_reach_every_level_once() {
        let tree = market_tree();
        let mut ids: Vec<u32> = tree
            .descendants(CategoryId::new(1))
            .iter()
            .map(|n| n.id.value())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![10, 11, 100]);
    }

    #[test]
    fn path_to_root_runs_root_first() {
        let tree = market_tree();
        let path: Vec<u32> = tree
            .path_to_root(CategoryId::new(100))
            .unwrap()
            .iter()
            .map(|n| n.id.value())
            .collect();
        assert_eq!(path, vec![1, 10, 100]);
    }

    #[test]
    fn path_to_root_unknown_id_is_none() {
        assert!(market_tree().path_to_root(CategoryId::new(999)).is_none());
    }

    #[test]
    fn max_depth_counts_levels_below() {
        let tree = market_tree();
        assert_eq!(tree.max_depth(CategoryId::new(1)), 2);
        assert_eq!(tree.max_depth(CategoryId::new(10)), 1);
        assert_eq!(tree.max_depth(CategoryId::new(100)), 0);
        assert_eq!(tree.max_depth(CategoryId::new(2)), 0);
    }

    #[test]
    fn item_category_ids_include_self_when_it_lists_items() {
        let tree = market_tree();
        let mut ids: Vec<u32> = tree
            .item_category_ids(CategoryId::new(10))
            .iter()
            .map(|id| id.value())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![10, 100]);
    }

    #[test]
    fn healthy_tree_validates_clean() {
        let report = market_tree().validate();
        assert!(report.is_healthy());
        assert_eq!(report.node_count, 5);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn orphans_and_missing_parents_are_counted() {
        let tree = CategoryTree::from_nodes(vec![
            node(1, "Ships", None, false),
            node(10, "Frigates", Some(99), true),
            node(11, "Cruisers", Some(99), true),
        ]);
        let report = tree.validate();
        assert_eq!(report.orphan_count, 2);
        assert_eq!(report.missing_parent_count, 1);
        assert!(!report.is_healthy());
    }

    #[test]
    fn two_node_cycle_flagged_once() {
        let tree = CategoryTree::from_nodes(vec![
            node(1, "Ships", Some(2), false),
            node(2, "Minerals", Some(1), false),
            node(3, "Drones", None, true),
        ]);
        let report = tree.validate();
        assert_eq!(report.cycle_count, 1);
        assert!(!report.is_healthy());
    }

    #[test]
    fn cyclic_descendants_terminate() {
        let tree = CategoryTree::from_nodes(vec![
            node(1, "Ships", Some(2), false),
            node(2, "Minerals", Some(1), false),
        ]);
        // Child links loop; the walk must still visit each node at most once.
        let names: Vec<&str> = tree
            .descendants(CategoryId::new(1))
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(names, vec!["Minerals"]);
    }

    #[test]
    fn cyclic_path_to_root_terminates() {
        let tree = CategoryTree::from_nodes(vec![
            node(1, "Ships", Some(2), false),
            node(2, "Minerals", Some(1), false),
        ]);
        let path = tree.path_to_root(CategoryId::new(1)).unwrap();
        assert!(path.len() <= 2);
    }
}
