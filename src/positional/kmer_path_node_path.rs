use crate::positional::kmer_path_node::{KmerPathGraph, KmerPathNodeId};
use crate::positional::kmer_path_subnode::KmerPathSubnode;
use crate::utils::interval_utils::IntervalUtils;

#[derive(Debug, Clone)]
struct TraversalEntry {
    subnode: KmerPathSubnode,
    // cumulative kmer count up to and including this node
    path_length: usize,
    path_weight: u64,
    next_child: usize,
}

/**
 * Saved tip of a traversal, used to restore the stack after a speculative
 * pop is abandoned
 */
pub struct SavedTraversal(TraversalEntry);

/**
 * Bounded depth-first cursor over the paths reachable from a starting
 * subnode.
 *
 * The cursor maintains an explicit stack of traversal entries. Children are
 * the interval-intersected successors of the tip when traversing forward,
 * its predecessors when traversing backward. The stack is never extended so
 * that the cumulative path length exceeds the configured maximum.
 *
 * Interval bookkeeping: every entry's subnode interval is already
 * intersected with the constraints of all of its ancestors, so projecting
 * the tip interval along the path ("anchor projection") yields the feasible
 * positions of the kmer adjacent to the traversal root. Two cursors rooted
 * at the same node are therefore always comparable through their anchors,
 * regardless of their lengths.
 */
pub struct KmerPathNodePath {
    entries: Vec<TraversalEntry>,
    traverse_forward: bool,
    max_path_length: usize,
}

impl KmerPathNodePath {
    pub fn new(
        start: KmerPathSubnode,
        traverse_forward: bool,
        max_path_length: usize,
        graph: &KmerPathGraph,
    ) -> KmerPathNodePath {
        let entry = TraversalEntry {
            subnode: start,
            path_length: start.length(graph),
            path_weight: start.weight(graph),
            next_child: 0,
        };
        KmerPathNodePath {
            entries: vec![entry],
            traverse_forward,
            max_path_length,
        }
    }

    pub fn traverse_forward(&self) -> bool {
        self.traverse_forward
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /**
     * Total number of kmers along the current stack
     */
    pub fn path_length(&self) -> usize {
        self.entries.last().unwrap().path_length
    }

    /**
     * Total support along the current stack
     */
    pub fn path_weight(&self) -> u64 {
        self.entries.last().unwrap().path_weight
    }

    pub fn head(&self) -> KmerPathSubnode {
        self.entries.last().unwrap().subnode
    }

    pub fn head_path(&self) -> KmerPathNodeId {
        self.head().node()
    }

    fn head_length(&self) -> usize {
        let n = self.entries.len();
        let before = if n >= 2 {
            self.entries[n - 2].path_length
        } else {
            0
        };
        self.entries[n - 1].path_length - before
    }

    /**
     * Underlying node of every entry, in traversal order
     */
    pub fn current_path_ids(&self) -> Vec<KmerPathNodeId> {
        self.entries.iter().map(|e| e.subnode.node()).collect()
    }

    /**
     * Flattened kmer chain of the current stack, in graph order (leftmost
     * kmer first) irrespective of the traversal direction
     */
    pub fn current_path_kmers(&self, graph: &KmerPathGraph) -> Vec<u64> {
        let mut kmers = Vec::with_capacity(self.path_length());
        if self.traverse_forward {
            for e in self.entries.iter() {
                kmers.extend_from_slice(graph.get(e.subnode.node()).kmers());
            }
        } else {
            for e in self.entries.iter().rev() {
                kmers.extend_from_slice(graph.get(e.subnode.node()).kmers());
            }
        }
        return kmers;
    }

    fn children_of_head(&self, graph: &KmerPathGraph) -> Vec<KmerPathSubnode> {
        if self.traverse_forward {
            self.head().next(graph)
        } else {
            self.head().prev(graph)
        }
    }

    /**
     * Push the next unvisited child of the tip. Children that would extend
     * the path beyond the length bound are skipped. Returns false when no
     * further child remains.
     */
    pub fn dfs_next_child(&mut self, graph: &KmerPathGraph) -> bool {
        let children = self.children_of_head(graph);
        let base_length = self.path_length();
        let base_weight = self.path_weight();
        let mut index = self.entries.last().unwrap().next_child;
        while index < children.len() {
            let child = children[index];
            index += 1;
            let child_length = child.length(graph);
            if base_length + child_length <= self.max_path_length {
                self.entries.last_mut().unwrap().next_child = index;
                let entry = TraversalEntry {
                    subnode: child,
                    path_length: base_length + child_length,
                    path_weight: base_weight + child.weight(graph),
                    next_child: 0,
                };
                self.entries.push(entry);
                return true;
            }
        }
        self.entries.last_mut().unwrap().next_child = index;
        return false;
    }

    /**
     * Pop the tip. The starting subnode is never popped.
     */
    pub fn dfs_pop(&mut self) {
        assert!(
            self.entries.len() >= 2,
            "Cannot pop the starting subnode of a traversal"
        );
        self.entries.pop();
    }

    /**
     * Restart child enumeration at the tip
     */
    pub fn dfs_reset_child_traversal(&mut self) {
        self.entries.last_mut().unwrap().next_child = 0;
    }

    pub fn save_head(&self) -> SavedTraversal {
        SavedTraversal(self.entries.last().unwrap().clone())
    }

    pub fn restore_head(&mut self, saved: SavedTraversal) {
        self.entries.push(saved.0);
    }

    /**
     * Feasible positions of the kmer adjacent to the traversal root: the
     * first kmer of the path when traversing forward, the last when
     * traversing backward. Ancestor constraints are already folded into the
     * tip interval, so a pure shift is exact.
     */
    pub fn anchor_interval(&self) -> (i32, i32) {
        let head = self.head();
        let total = self.path_length() as i32;
        if self.traverse_forward {
            let before_head = total - self.head_length() as i32;
            (
                head.first_start() - before_head,
                head.first_end() - before_head,
            )
        } else {
            (head.first_start() + total - 1, head.first_end() + total - 1)
        }
    }

    /**
     * Intersection of the anchors of two traversals rooted at the same
     * node, None when the paths cannot occupy a common position
     */
    pub fn overlapping_anchor(&self, other: &KmerPathNodePath) -> Option<(i32, i32)> {
        let a = self.anchor_interval();
        let b = other.anchor_interval();
        IntervalUtils::intersection_closed(a.0, a.1, b.0, b.1)
    }

    /**
     * The stack as a list of subnodes in graph order, each restricted to
     * the positions consistent with the given anchor interval
     */
    pub fn restricted_subnodes(
        &self,
        graph: &KmerPathGraph,
        anchor: (i32, i32),
    ) -> Vec<KmerPathSubnode> {
        let total = self.path_length() as i32;
        let path_first = if self.traverse_forward {
            anchor
        } else {
            (anchor.0 - total + 1, anchor.1 - total + 1)
        };
        let mut result = Vec::with_capacity(self.entries.len());
        let mut cumulative = 0i32;
        let mut push = |sn: KmerPathSubnode, len: i32| {
            result.push(KmerPathSubnode::new(
                sn.node(),
                path_first.0 + cumulative,
                path_first.1 + cumulative,
            ));
            cumulative += len;
        };
        if self.traverse_forward {
            for e in self.entries.iter() {
                push(e.subnode, e.subnode.length(graph) as i32);
            }
        } else {
            for e in self.entries.iter().rev() {
                push(e.subnode, e.subnode.length(graph) as i32);
            }
        }
        return result;
    }

    /**
     * Narrow the given anchor to the first sub-range over which the tip has
     * no onward edge in the traversal direction, None when the tip can be
     * extended everywhere within it
     */
    pub fn first_terminal_leaf_anchor(
        &self,
        graph: &KmerPathGraph,
        anchor: (i32, i32),
    ) -> Option<(i32, i32)> {
        let total = self.path_length() as i32;
        let head_length = self.head_length() as i32;
        let delta = if self.traverse_forward {
            total - head_length
        } else {
            -(total - 1)
        };
        let head = KmerPathSubnode::new(self.head_path(), anchor.0 + delta, anchor.1 + delta);
        let range = if self.traverse_forward {
            head.first_range_with_no_next(graph)
        } else {
            head.first_range_with_no_prev(graph)
        };
        range.map(|(s, e)| (s - delta, e - delta))
    }
}
