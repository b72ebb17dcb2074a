//! Post-scan tree finalization and queries.
//!
//! The finalizer runs single-threaded, strictly after every scanner worker
//! has exited, so it observes every appended child. Queries treat the tree
//! as immutable from then on.

use crate::types::{NodeKind, ScanNode};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Assigns directory sizes bottom-up and sorts children largest-first.
///
/// After this pass, every directory's `size_bytes` and `disk_usage` equal
/// the sums over its children, and `children` is ordered by `disk_usage`
/// descending.
pub fn finalize_sizes(node: &mut ScanNode) {
    if !node.is_dir() {
        return;
    }
    let mut size_bytes = 0u64;
    let mut disk_usage = 0u64;
    for child in &mut node.children {
        finalize_sizes(child);
        size_bytes += child.size_bytes;
        disk_usage += child.disk_usage;
    }
    node.size_bytes = size_bytes;
    node.disk_usage = disk_usage;
    node.children
        .sort_by(|a, b| b.disk_usage.cmp(&a.disk_usage));
}

/// Depth-first iterator over every node in the tree, root included.
pub fn iter_nodes(root: &ScanNode) -> NodeIter<'_> {
    NodeIter { stack: vec![root] }
}

pub struct NodeIter<'a> {
    stack: Vec<&'a ScanNode>,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = &'a ScanNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter());
        Some(node)
    }
}

/// Orders nodes by `(disk_usage, path)` so heap eviction is deterministic.
struct ByUsage<'a>(&'a ScanNode);

impl PartialEq for ByUsage<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0.disk_usage == other.0.disk_usage && self.0.path == other.0.path
    }
}

impl Eq for ByUsage<'_> {}

impl PartialOrd for ByUsage<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByUsage<'_> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .disk_usage
            .cmp(&other.0.disk_usage)
            .then_with(|| self.0.path.cmp(&other.0.path))
    }
}

/// Returns the `n` largest nodes by `disk_usage`, excluding the root itself,
/// optionally restricted to one node kind.
///
/// Streams the tree through a bounded min-heap of size `n`; the full node
/// list is never materialized. The result is sorted by `disk_usage`
/// descending.
pub fn top_nodes<'a>(root: &'a ScanNode, n: usize, kind: Option<NodeKind>) -> Vec<&'a ScanNode> {
    if n == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<Reverse<ByUsage<'a>>> = BinaryHeap::with_capacity(n + 1);
    let mut stack: Vec<&ScanNode> = root.children.iter().collect();
    while let Some(node) = stack.pop() {
        stack.extend(node.children.iter());
        if kind.is_some_and(|k| node.kind != k) {
            continue;
        }
        if heap.len() < n {
            heap.push(Reverse(ByUsage(node)));
        } else if heap
            .peek()
            .is_some_and(|Reverse(smallest)| ByUsage(node) > *smallest)
        {
            heap.pop();
            heap.push(Reverse(ByUsage(node)));
        }
    }

    let mut nodes: Vec<&ScanNode> = heap.into_iter().map(|Reverse(ByUsage(n))| n).collect();
    nodes.sort_by(|a, b| {
        b.disk_usage
            .cmp(&a.disk_usage)
            .then_with(|| a.path.cmp(&b.path))
    });
    nodes
}
