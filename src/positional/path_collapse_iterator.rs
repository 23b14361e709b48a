use std::cmp::{max, min};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::iter::Peekable;

use crate::kmers::kmer_encoding::KmerEncoding;
use crate::positional::kmer_path_node::{KmerPathGraph, KmerPathNode, KmerPathNodeId};
use crate::positional::kmer_path_node_path::KmerPathNodePath;
use crate::positional::kmer_path_subnode::KmerPathSubnode;
use crate::utils::errors::BrolgaError;

/// Buffer ordering key: (first_start, first_end, first_kmer, serial)
type ProcessedKey = (i32, i32, u64, u64);
/// Buffer ordering key: (last_end, last_start, last_kmer, serial)
type UnprocessedKey = (i32, i32, u64, u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufferKind {
    Processed,
    Unprocessed,
}

/**
 * Graph simplifier that merges similar paths.
 *
 * Input: path nodes in ascending order of start position of the first kmer.
 *
 * Output: path nodes in ascending order of start position of the first kmer
 * after graph simplification. Each emitted node is guaranteed not to be
 * modified by further reduction.
 *
 * When collapsing two paths together, every node along both paths must be
 * fully defined so the edge lists of adjacent nodes can be updated when a
 * node is split. The driver therefore quantifies a settled horizon before
 * acting: a node whose last kmer ends more than the maximum collapse length
 * before the current input position has every potential collapse partner
 * already loaded.
 *
 * For branch collapse, a candidate node n adjacent to the collapse root may
 * need to be split along two axes before source weights can be folded in:
 * a) length: the alternate path may have nodes of shorter length,
 *    requiring n to be broken into shorter nodes
 * b) start/end: the alternate path may be valid over a narrower positional
 *    window, requiring splitting into multiple validity intervals
 *
 * For leaf collapse, a terminal branch is folded into the sibling main path
 * covering the same positions, aligned at the traversal root.
 *
 * Note: the output graph is not minimal and may contain adjacent nodes that
 * could be joined.
 */
pub struct PathCollapseIterator<I: Iterator<Item = KmerPathNode>> {
    underlying: Peekable<I>,
    graph: KmerPathGraph,
    k: usize,
    max_collapse_length: usize,
    max_bases_mismatch: u32,
    bubbles_and_leaves_only: bool,
    process_offset: i64,
    processed: BTreeMap<ProcessedKey, KmerPathNodeId>,
    unprocessed: BTreeMap<UnprocessedKey, KmerPathNodeId>,
    input_position: i64,
    last_loaded_start: i64,
    max_node_width: i64,
    max_node_length: i64,
}

impl<I: Iterator<Item = KmerPathNode>> PathCollapseIterator<I> {
    pub fn new(
        it: I,
        k: usize,
        max_path_collapse_length: usize,
        max_bases_mismatch: u32,
        bubbles_and_leaves_only: bool,
    ) -> Result<PathCollapseIterator<I>, BrolgaError> {
        if k < 1 || k > KmerEncoding::MAX_K {
            return Err(BrolgaError::InvalidConfiguration(format!(
                "kmer size must be in [1,{}], got {}",
                KmerEncoding::MAX_K,
                k
            )));
        }
        if max_path_collapse_length < 1 {
            return Err(BrolgaError::InvalidConfiguration(format!(
                "maximum collapse length must be at least 1, got {}",
                max_path_collapse_length
            )));
        }
        Ok(PathCollapseIterator {
            underlying: it.peekable(),
            graph: KmerPathGraph::new(k),
            k,
            max_collapse_length: max_path_collapse_length,
            max_bases_mismatch,
            bubbles_and_leaves_only,
            process_offset: max_path_collapse_length as i64 + 1,
            processed: BTreeMap::new(),
            unprocessed: BTreeMap::new(),
            input_position: i64::MIN,
            last_loaded_start: i64::MIN,
            max_node_width: 0,
            max_node_length: 0,
        })
    }

    fn emit_offset(&self) -> i64 {
        // nodes ending before this offset behind the input position cannot
        // be changed by any subsequent operation
        let unchanged_offset = self.process_offset
            + self.max_node_length
            + self.max_node_width
            + self.max_collapse_length as i64
            + 1;
        // entering the processed buffer happens in last-kmer order; the
        // extra margin lets entries resort into first-kmer order
        return unchanged_offset + self.max_node_length + self.max_node_width + 1;
    }

    fn processed_key(&self, id: KmerPathNodeId) -> ProcessedKey {
        let n = self.graph.get(id);
        (n.first_start(), n.first_end(), n.first_kmer(), n.serial())
    }

    fn unprocessed_key(&self, id: KmerPathNodeId) -> UnprocessedKey {
        let n = self.graph.get(id);
        (n.last_end(), n.last_start(), n.last_kmer(), n.serial())
    }

    /**
     * Remove a node from whichever buffer holds it, reporting which one it
     * was. Must be called before the node is mutated so that the snapshot
     * key still matches.
     */
    fn buffer_take(&mut self, id: KmerPathNodeId) -> BufferKind {
        let pk = self.processed_key(id);
        if self.processed.remove(&pk).is_some() {
            return BufferKind::Processed;
        }
        let uk = self.unprocessed_key(id);
        if self.unprocessed.remove(&uk).is_some() {
            return BufferKind::Unprocessed;
        }
        panic!(
            "{}",
            BrolgaError::InvariantViolation(format!("Node {:?} is in neither buffer", id))
        );
    }

    fn buffer_put(&mut self, id: KmerPathNodeId, kind: BufferKind) {
        match kind {
            BufferKind::Processed => {
                let key = self.processed_key(id);
                self.processed.insert(key, id);
            }
            BufferKind::Unprocessed => {
                let key = self.unprocessed_key(id);
                self.unprocessed.insert(key, id);
            }
        }
    }

    fn ensure_buffer(&mut self) {
        while self.input_position < i32::MAX as i64
            && (self.processed.is_empty() || {
                let first_start = self.processed.keys().next().unwrap().0 as i64;
                first_start > self.input_position.saturating_sub(self.emit_offset())
            })
        {
            // advance graph position
            self.input_position = match self.underlying.peek() {
                Some(n) => n.first_start() as i64,
                None => i32::MAX as i64,
            };
            self.load_graph_nodes();
            while self.collapse() > 0 {} // collapse as much as we can
        }
    }

    /**
     * Load every input node whose first kmer starts at or before the
     * current input position
     */
    fn load_graph_nodes(&mut self) {
        while {
            let input_position = self.input_position;
            self.underlying
                .peek()
                .map_or(false, |n| (n.first_start() as i64) <= input_position)
        } {
            let node = self.underlying.next().unwrap();
            if (node.first_start() as i64) < self.last_loaded_start {
                panic!(
                    "{}",
                    BrolgaError::MalformedInput(format!(
                        "Input node starting at {} delivered after position {}",
                        node.first_start(),
                        self.last_loaded_start
                    ))
                );
            }
            self.last_loaded_start = node.first_start() as i64;
            self.max_node_width = max(self.max_node_width, node.width() as i64);
            self.max_node_length = max(self.max_node_length, node.length() as i64);
            let id = self.graph.insert(node);
            self.graph.wire(id);
            let key = self.unprocessed_key(id);
            self.unprocessed.insert(key, id);
        }
    }

    fn collapse(&mut self) -> usize {
        let mut collapse_count = 0;
        loop {
            let horizon = self.input_position.saturating_sub(self.process_offset);
            let key = match self.unprocessed.keys().next() {
                Some(&key) if (key.0 as i64) < horizon => key,
                _ => break,
            };
            let id = self.unprocessed.remove(&key).unwrap();
            let pk = self.processed_key(id);
            self.processed.insert(pk, id);
            if self.collapse_node(id) {
                collapse_count += 1;
            }
        }
        return collapse_count;
    }

    /**
     * Attempt a collapse centred on the given node: try every unordered
     * pair of successors forward, then every unordered pair of
     * predecessors backward
     */
    fn collapse_node(&mut self, node: KmerPathNodeId) -> bool {
        let root = KmerPathSubnode::of(&self.graph, node);
        let next_nodes = root.next(&self.graph);
        for i in 0..next_nodes.len() {
            for j in (i + 1)..next_nodes.len() {
                if self.collapse_similar_path_from(
                    node,
                    next_nodes[i],
                    next_nodes[j],
                    true,
                    true,
                    true,
                ) {
                    return true;
                }
            }
        }
        let prev_nodes = root.prev(&self.graph);
        for i in 0..prev_nodes.len() {
            for j in (i + 1)..prev_nodes.len() {
                if self.collapse_similar_path_from(
                    node,
                    prev_nodes[i],
                    prev_nodes[j],
                    true,
                    false,
                    false,
                ) {
                    return true;
                }
            }
        }
        return false;
    }

    fn collapse_similar_path_from(
        &mut self,
        root: KmerPathNodeId,
        start_a: KmerPathSubnode,
        start_b: KmerPathSubnode,
        find_leaf: bool,
        find_common_child: bool,
        traverse_forward: bool,
    ) -> bool {
        let mut path_a = KmerPathNodePath::new(
            start_a,
            traverse_forward,
            self.max_collapse_length,
            &self.graph,
        );
        let mut path_b = KmerPathNodePath::new(
            start_b,
            traverse_forward,
            self.max_collapse_length,
            &self.graph,
        );
        if path_a.path_length() <= self.max_collapse_length
            && path_b.path_length() <= self.max_collapse_length
        {
            return self.collapse_similar_path(
                root,
                &mut path_a,
                &mut path_b,
                find_leaf,
                find_common_child,
                traverse_forward,
            );
        }
        return false;
    }

    /**
     * Recursive simultaneous traversal of both path trees, comparing every
     * feasible path combination until a collapse is found. Both cursors are
     * restored to their pre-call stacks when no collapse happens.
     */
    fn collapse_similar_path(
        &mut self,
        root: KmerPathNodeId,
        path_a: &mut KmerPathNodePath,
        path_b: &mut KmerPathNodePath,
        find_leaf: bool,
        find_common_child: bool,
        traverse_forward: bool,
    ) -> bool {
        // paths that share no common position can never be merged
        if path_a.overlapping_anchor(path_b).is_none() {
            return false;
        }
        // paths with too many mismatching bases
        if !self.are_similar_partial_paths(path_a, path_b, traverse_forward) {
            return false;
        }
        if self.try_collapse(
            root,
            path_a,
            path_b,
            find_leaf,
            find_common_child,
            traverse_forward,
        ) {
            return true;
        }
        let length_a = path_a.path_length();
        let length_b = path_b.path_length();
        if length_a <= length_b {
            // extend the shorter path
            while path_a.dfs_next_child(&self.graph) {
                path_b.dfs_reset_child_traversal();
                if self.collapse_similar_path(
                    root,
                    path_a,
                    path_b,
                    find_leaf,
                    find_common_child,
                    traverse_forward,
                ) {
                    return true;
                }
                path_a.dfs_pop();
            }
        } else {
            while path_b.dfs_next_child(&self.graph) {
                if self.collapse_similar_path(
                    root,
                    path_a,
                    path_b,
                    find_leaf,
                    find_common_child,
                    traverse_forward,
                ) {
                    return true;
                }
                path_b.dfs_pop();
            }
        }
        debug_assert!(path_a.path_length() == length_a);
        debug_assert!(path_b.path_length() == length_b);
        return false;
    }

    fn are_similar_partial_paths(
        &self,
        path_a: &KmerPathNodePath,
        path_b: &KmerPathNodePath,
        traverse_forward: bool,
    ) -> bool {
        let kmers_a = path_a.current_path_kmers(&self.graph);
        let kmers_b = path_b.current_path_kmers(&self.graph);
        let bases_difference = if traverse_forward {
            KmerEncoding::bases_different(self.k, &kmers_a, &kmers_b)
        } else {
            KmerEncoding::reverse_bases_different(self.k, &kmers_a, &kmers_b)
        };
        return bases_difference <= self.max_bases_mismatch;
    }

    fn try_collapse(
        &mut self,
        root: KmerPathNodeId,
        path_a: &mut KmerPathNodePath,
        path_b: &mut KmerPathNodePath,
        find_leaf: bool,
        find_common_child: bool,
        traverse_forward: bool,
    ) -> bool {
        debug_assert!(find_leaf || find_common_child);
        if find_common_child
            && path_a.head_path() == path_b.head_path()
            && path_a.path_length() == path_b.path_length()
            && self.repeated_path_node_count(root, &[&*path_a, &*path_b]) == 1
        {
            // drop the shared tip so only the divergent bodies take part
            let saved_a = path_a.save_head();
            let saved_b = path_b.save_head();
            path_a.dfs_pop();
            path_b.dfs_pop();
            if let Some(anchor) = path_a.overlapping_anchor(path_b) {
                let body_a = path_a.restricted_subnodes(&self.graph, anchor);
                let body_b = path_b.restricted_subnodes(&self.graph, anchor);
                let (source, target) = if path_a.path_weight() < path_b.path_weight() {
                    (body_a, body_b)
                } else {
                    (body_b, body_a)
                };
                if !self.bubbles_and_leaves_only || self.is_bubble_path(&source) {
                    debug!(
                        "Collapsing bubble of {} nodes rooted at {:?}",
                        source.len(),
                        root
                    );
                    self.merge_paths(source, target, 0, 0);
                    return true;
                }
            }
            path_a.restore_head(saved_a);
            path_b.restore_head(saved_b);
        }
        if find_leaf {
            if self.try_leaf_collapse(root, path_a, path_b, traverse_forward) {
                return true;
            }
            if self.try_leaf_collapse(root, path_b, path_a, traverse_forward) {
                return true;
            }
        }
        return false;
    }

    /**
     * A path is considered a bubble if each node except the last has a
     * single source and a single successor
     */
    fn is_bubble_path(&self, path: &[KmerPathSubnode]) -> bool {
        if path.is_empty() {
            return true;
        }
        for sn in &path[..path.len() - 1] {
            if sn.next(&self.graph).len() != 1 {
                return false;
            }
            if sn.prev(&self.graph).len() != 1 {
                return false;
            }
        }
        return true;
    }

    /**
     * Number of times any path node appears more than once across the root
     * and the given traversals. Collapse is forbidden when a non-root node
     * repeats since the split boundaries could not be satisfied by a single
     * node.
     */
    fn repeated_path_node_count(
        &self,
        root: KmerPathNodeId,
        paths: &[&KmerPathNodePath],
    ) -> usize {
        let mut set: HashSet<KmerPathNodeId> = HashSet::new();
        set.insert(root);
        let mut node_count = 1;
        for path in paths {
            let ids = path.current_path_ids();
            node_count += ids.len();
            set.extend(ids);
        }
        return node_count - set.len();
    }

    fn try_leaf_collapse(
        &mut self,
        root: KmerPathNodeId,
        leaf: &KmerPathNodePath,
        path: &KmerPathNodePath,
        traverse_forward: bool,
    ) -> bool {
        // the leaf cannot be longer or better supported than the main path
        if leaf.path_length() > path.path_length() {
            return false;
        }
        if leaf.path_weight() > path.path_weight() {
            return false;
        }
        let anchor = match leaf.overlapping_anchor(path) {
            Some(anchor) => anchor,
            None => return false,
        };
        let leaf_anchor = match leaf.first_terminal_leaf_anchor(&self.graph, anchor) {
            Some(anchor) => anchor,
            None => return false,
        };
        if self.repeated_path_node_count(root, &[leaf, path]) > 0 {
            return false;
        }
        let source = leaf.restricted_subnodes(&self.graph, leaf_anchor);
        let target = path.restricted_subnodes(&self.graph, leaf_anchor);
        let leaf_skip = 0;
        let path_skip = if traverse_forward {
            0
        } else {
            path.path_length() - leaf.path_length()
        };
        debug!(
            "Collapsing leaf of {} kmers rooted at {:?}",
            leaf.path_length(),
            root
        );
        self.merge_paths(source, target, leaf_skip, path_skip);
        return true;
    }

    /**
     * Merge the given source path into the target path.
     *
     * Leading skip kmers are trimmed off each path, each subnode interval is
     * carved out of its underlying node, internal node boundaries are
     * aligned across the two paths, and finally each source node is folded
     * into its positionally identical target counterpart.
     */
    fn merge_paths(
        &mut self,
        mut source: Vec<KmerPathSubnode>,
        mut target: Vec<KmerPathSubnode>,
        source_skip_kmers: usize,
        target_skip_kmers: usize,
    ) {
        self.trim_start_kmers(&mut source, source_skip_kmers);
        self.trim_start_kmers(&mut target, target_skip_kmers);
        assert!(
            source[0].width() == target[0].width()
                && source[0].first_start() == target[0].first_start(),
            "{}",
            BrolgaError::InvariantViolation(format!(
                "Merge paths misaligned: source starts [{},{}], target starts [{},{}]",
                source[0].first_start(),
                source[0].first_end(),
                target[0].first_start(),
                target[0].first_end()
            ))
        );
        let source_nodes = self.position_split_path(&source);
        let target_nodes = self.position_split_path(&target);
        let mut kmer_start_positions: BTreeSet<i32> = BTreeSet::new();
        for &id in source_nodes.iter().chain(target_nodes.iter()) {
            let n = self.graph.get(id);
            kmer_start_positions.insert(n.first_start());
            kmer_start_positions.insert(n.first_start() + n.length() as i32);
        }
        let source_nodes = self.length_split_by_boundaries(source_nodes, &kmer_start_positions);
        let target_nodes = self.length_split_by_boundaries(target_nodes, &kmer_start_positions);
        // merge the common nodes
        for i in 0..min(source_nodes.len(), target_nodes.len()) {
            let to_merge = source_nodes[i];
            let into = target_nodes[i];
            self.buffer_take(to_merge);
            self.graph.merge(into, to_merge);
        }
    }

    /**
     * Drop the given number of leading kmers from the path, length
     * splitting the node under the cut when it falls mid-node. A zero count
     * is a no-op.
     */
    fn trim_start_kmers(&mut self, path: &mut Vec<KmerPathSubnode>, kmer_count: usize) {
        if kmer_count == 0 {
            return;
        }
        self.length_split_list_after(path, kmer_count);
        let mut remaining = kmer_count;
        while remaining > 0 {
            let len = path[0].length(&self.graph);
            assert!(
                len <= remaining,
                "{}",
                BrolgaError::InvariantViolation(format!(
                    "Trim of {} kmers fell inside a node of length {}",
                    kmer_count, len
                ))
            );
            remaining -= len;
            path.remove(0);
        }
    }

    /**
     * Ensure a node boundary exists in the path after the given number of
     * kmers, splitting the underlying node when the boundary falls inside
     * one
     */
    fn length_split_list_after(&mut self, path: &mut Vec<KmerPathSubnode>, split_after: usize) {
        assert!(split_after > 0);
        let mut length = 0;
        for index in 0..path.len() {
            let node_length = path[index].length(&self.graph);
            if length + node_length == split_after {
                // already a split at the given position
                return;
            } else if length + node_length < split_after {
                // advance to the next node
                length += node_length;
            } else {
                // split the underlying node
                let split_length = split_after - length;
                let sn = path[index];
                let prefix = self.length_split_node(sn.node(), split_length);
                path[index] = KmerPathSubnode::new(prefix, sn.first_start(), sn.first_end());
                path.insert(
                    index + 1,
                    KmerPathSubnode::new(
                        sn.node(),
                        sn.first_start() + split_length as i32,
                        sn.first_end() + split_length as i32,
                    ),
                );
                return;
            }
        }
        panic!(
            "{}",
            BrolgaError::InvariantViolation(format!(
                "Cannot split {} kmers into a path of {} kmers",
                split_after, length
            ))
        );
    }

    /**
     * Split a buffered node at the given length, re-inserting both halves
     * into whichever buffer held the original
     */
    fn length_split_node(&mut self, id: KmerPathNodeId, length: usize) -> KmerPathNodeId {
        let kind = self.buffer_take(id);
        let prefix = self.graph.split_at_length(id, length);
        self.buffer_put(prefix, kind);
        self.buffer_put(id, kind);
        return prefix;
    }

    fn position_split_path(&mut self, path: &[KmerPathSubnode]) -> Vec<KmerPathNodeId> {
        let mut result = Vec::with_capacity(path.len());
        for &sn in path {
            result.push(self.position_split(sn));
        }
        return result;
    }

    /**
     * Split the containing node so that exactly the subnode's interval
     * becomes a distinct path node, returning that node
     */
    fn position_split(&mut self, sn: KmerPathSubnode) -> KmerPathNodeId {
        let mut id = sn.node();
        if sn.first_start() != self.graph.get(id).first_start() {
            let kind = self.buffer_take(id);
            let pre = self.graph.split_at_start_position(id, sn.first_start());
            self.buffer_put(pre, kind);
            self.buffer_put(id, kind);
        }
        if self.graph.get(id).first_end() != sn.first_end() {
            let kind = self.buffer_take(id);
            let mid = self.graph.split_at_start_position(id, sn.first_end() + 1);
            self.buffer_put(mid, kind);
            self.buffer_put(id, kind);
            id = mid;
        }
        debug_assert!(self.graph.get(id).first_start() == sn.first_start());
        debug_assert!(self.graph.get(id).first_end() == sn.first_end());
        return id;
    }

    /**
     * Break every node of the path at each boundary position falling
     * strictly inside it, so that node boundaries align across the two
     * merge paths
     */
    fn length_split_by_boundaries(
        &mut self,
        nodes: Vec<KmerPathNodeId>,
        start_positions: &BTreeSet<i32>,
    ) -> Vec<KmerPathNodeId> {
        let mut result = Vec::with_capacity(start_positions.len());
        for id in nodes {
            let (first_start, length) = {
                let n = self.graph.get(id);
                (n.first_start(), n.length() as i32)
            };
            let cuts: Vec<i32> = start_positions
                .range((first_start + 1)..(first_start + length))
                .cloned()
                .collect();
            for break_start in cuts {
                let break_length = (break_start - self.graph.get(id).first_start()) as usize;
                let prefix = self.length_split_node(id, break_length);
                result.push(prefix);
            }
            result.push(id);
        }
        return result;
    }
}

impl<I: Iterator<Item = KmerPathNode>> Iterator for PathCollapseIterator<I> {
    type Item = KmerPathNode;

    fn next(&mut self) -> Option<KmerPathNode> {
        self.ensure_buffer();
        let (_, id) = self.processed.pop_first()?;
        self.graph.detach(id);
        let node = self.graph.remove(id);
        trace!(
            "Emitting node of length {} at [{},{}]",
            node.length(),
            node.first_start(),
            node.first_end()
        );
        Some(node)
    }
}
