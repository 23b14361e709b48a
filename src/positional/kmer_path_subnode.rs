use std::cmp::max;

use itertools::Itertools;

use crate::positional::kmer_path_node::{KmerPathGraph, KmerPathNodeId};
use crate::utils::interval_utils::IntervalUtils;

/**
 * Restriction of a path node to a sub-interval of its positional range.
 *
 * A subnode is a derived view and holds no state of its own; it stays valid
 * only as long as the underlying node is neither split nor merged.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerPathSubnode {
    node: KmerPathNodeId,
    first_start: i32,
    first_end: i32,
}

impl KmerPathSubnode {
    /**
     * View of a node over its full positional interval
     */
    pub fn of(graph: &KmerPathGraph, node: KmerPathNodeId) -> KmerPathSubnode {
        let n = graph.get(node);
        KmerPathSubnode {
            node,
            first_start: n.first_start(),
            first_end: n.first_end(),
        }
    }

    pub fn new(node: KmerPathNodeId, first_start: i32, first_end: i32) -> KmerPathSubnode {
        assert!(
            first_start <= first_end,
            "Invalid subnode interval [{},{}]",
            first_start,
            first_end
        );
        KmerPathSubnode {
            node,
            first_start,
            first_end,
        }
    }

    pub fn node(&self) -> KmerPathNodeId {
        self.node
    }

    pub fn first_start(&self) -> i32 {
        self.first_start
    }

    pub fn first_end(&self) -> i32 {
        self.first_end
    }

    pub fn width(&self) -> i32 {
        self.first_end - self.first_start + 1
    }

    pub fn length(&self, graph: &KmerPathGraph) -> usize {
        graph.get(self.node).length()
    }

    pub fn last_start(&self, graph: &KmerPathGraph) -> i32 {
        self.first_start + self.length(graph) as i32 - 1
    }

    pub fn last_end(&self, graph: &KmerPathGraph) -> i32 {
        self.first_end + self.length(graph) as i32 - 1
    }

    /**
     * Support of the underlying chain at any single position of the
     * interval
     */
    pub fn weight(&self, graph: &KmerPathGraph) -> u64 {
        graph.get(self.node).weight()
    }

    /**
     * Subnodes reachable by a single successor edge, one per neighbour with
     * a non-empty interval intersection after the length shift
     */
    pub fn next(&self, graph: &KmerPathGraph) -> Vec<KmerPathSubnode> {
        let n = graph.get(self.node);
        let len = n.length() as i32;
        let mut result = Vec::new();
        for &t in n.next() {
            let tn = graph.get(t);
            if let Some((s, e)) = IntervalUtils::intersection_closed(
                self.first_start + len,
                self.first_end + len,
                tn.first_start(),
                tn.first_end(),
            ) {
                result.push(KmerPathSubnode::new(t, s, e));
            }
        }
        result
            .into_iter()
            .sorted_by_key(|sn| (sn.first_start, sn.first_end, graph.get(sn.node).serial()))
            .collect()
    }

    /**
     * Subnodes reachable by a single predecessor edge
     */
    pub fn prev(&self, graph: &KmerPathGraph) -> Vec<KmerPathSubnode> {
        let mut result = Vec::new();
        for &p in graph.get(self.node).prev() {
            let pn = graph.get(p);
            let plen = pn.length() as i32;
            if let Some((s, e)) = IntervalUtils::intersection_closed(
                self.first_start - plen,
                self.first_end - plen,
                pn.first_start(),
                pn.first_end(),
            ) {
                result.push(KmerPathSubnode::new(p, s, e));
            }
        }
        result
            .into_iter()
            .sorted_by_key(|sn| (sn.first_start, sn.first_end, graph.get(sn.node).serial()))
            .collect()
    }

    /**
     * First maximal sub-range of this interval over which the node has no
     * successor, None when every position can be extended
     */
    pub fn first_range_with_no_next(&self, graph: &KmerPathGraph) -> Option<(i32, i32)> {
        let n = graph.get(self.node);
        let len = n.length() as i32;
        let mut covered = Vec::new();
        for &t in n.next() {
            let tn = graph.get(t);
            if let Some(range) = IntervalUtils::intersection_closed(
                tn.first_start() - len,
                tn.first_end() - len,
                self.first_start,
                self.first_end,
            ) {
                covered.push(range);
            }
        }
        self.first_gap(covered)
    }

    /**
     * First maximal sub-range of this interval over which the node has no
     * predecessor
     */
    pub fn first_range_with_no_prev(&self, graph: &KmerPathGraph) -> Option<(i32, i32)> {
        let mut covered = Vec::new();
        for &p in graph.get(self.node).prev() {
            let pn = graph.get(p);
            let plen = pn.length() as i32;
            if let Some(range) = IntervalUtils::intersection_closed(
                pn.first_start() + plen,
                pn.first_end() + plen,
                self.first_start,
                self.first_end,
            ) {
                covered.push(range);
            }
        }
        self.first_gap(covered)
    }

    fn first_gap(&self, mut covered: Vec<(i32, i32)>) -> Option<(i32, i32)> {
        covered.sort();
        let mut gap_start = self.first_start;
        for (cs, ce) in covered {
            if cs > gap_start {
                return Some((gap_start, cs - 1));
            }
            gap_start = max(gap_start, ce + 1);
            if gap_start > self.first_end {
                return None;
            }
        }
        if gap_start <= self.first_end {
            Some((gap_start, self.first_end))
        } else {
            None
        }
    }
}
