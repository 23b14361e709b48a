use std::collections::HashMap;

use crate::kmers::kmer_encoding::KmerEncoding;
use crate::utils::interval_utils::IntervalUtils;

/**
 * Stable identity of a path node within a KmerPathGraph arena.
 *
 * Identifiers are never dangling while the node is live; splitting and
 * merging are responsible for rewiring every edge list that refers to a
 * restructured node.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KmerPathNodeId(usize);

/**
 * Evidence retained from an error chain that was merged away: the kmer that
 * was observed, its per-position support, and its offset within the node
 * that absorbed it. Downstream evidence assignment uses these to find reads
 * that supported the removed branch.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollapsedKmer {
    pub offset: usize,
    pub kmer: u64,
    pub weight: u32,
}

/**
 * An unbranched chain of kmers observed over an interval of reference
 * positions.
 *
 * Consecutive kmers overlap by k-1 bases. The positional interval
 * [first_start, first_end] is the inclusive range of start positions of the
 * first kmer; the i-th kmer of the chain occupies the interval shifted right
 * by i. Support weight is tracked per kmer and applies uniformly across the
 * interval.
 */
#[derive(Debug, Clone)]
pub struct KmerPathNode {
    kmers: Vec<u64>,
    weights: Vec<u32>,
    first_start: i32,
    first_end: i32,
    reference: bool,
    collapsed: Vec<CollapsedKmer>,
    next: Vec<KmerPathNodeId>,
    prev: Vec<KmerPathNodeId>,
    serial: u64,
}

impl KmerPathNode {
    /**
     * Create a new detached path node. Panics if the chain is not a valid
     * unbranched kmer path or the weight vector does not match it.
     */
    pub fn new(
        k: usize,
        kmers: Vec<u64>,
        weights: Vec<u32>,
        first_start: i32,
        first_end: i32,
        reference: bool,
    ) -> KmerPathNode {
        assert!(k >= 1 && k <= KmerEncoding::MAX_K, "Invalid kmer size {}", k);
        assert!(!kmers.is_empty(), "Path node must contain at least one kmer");
        assert!(
            weights.len() == kmers.len(),
            "Weight vector length {} does not match kmer count {}",
            weights.len(),
            kmers.len()
        );
        assert!(
            first_start <= first_end,
            "Invalid positional interval [{},{}]",
            first_start,
            first_end
        );
        let mask = KmerEncoding::kmer_mask(k);
        for (i, &kmer) in kmers.iter().enumerate() {
            assert!(kmer <= mask, "Kmer {} does not fit size {}", kmer, k);
            if i > 0 {
                assert!(
                    KmerEncoding::adjacent(k, kmers[i - 1], kmer),
                    "Kmers at offsets {} and {} do not overlap by k-1 bases",
                    i - 1,
                    i
                );
            }
        }
        KmerPathNode {
            kmers,
            weights,
            first_start,
            first_end,
            reference,
            collapsed: Vec::new(),
            next: Vec::new(),
            prev: Vec::new(),
            serial: 0,
        }
    }

    /**
     * Number of kmers in the chain
     */
    pub fn length(&self) -> usize {
        self.kmers.len()
    }

    /**
     * Number of distinct start positions in the positional interval
     */
    pub fn width(&self) -> i32 {
        self.first_end - self.first_start + 1
    }

    pub fn first_start(&self) -> i32 {
        self.first_start
    }

    pub fn first_end(&self) -> i32 {
        self.first_end
    }

    pub fn last_start(&self) -> i32 {
        self.first_start + self.length() as i32 - 1
    }

    pub fn last_end(&self) -> i32 {
        self.first_end + self.length() as i32 - 1
    }

    pub fn first_kmer(&self) -> u64 {
        self.kmers[0]
    }

    pub fn last_kmer(&self) -> u64 {
        self.kmers[self.kmers.len() - 1]
    }

    pub fn kmer(&self, offset: usize) -> u64 {
        self.kmers[offset]
    }

    pub fn kmers(&self) -> &[u64] {
        &self.kmers
    }

    pub fn weights(&self) -> &[u32] {
        &self.weights
    }

    /**
     * Total support of the chain at any single position of its interval
     */
    pub fn weight(&self) -> u64 {
        self.weights.iter().map(|&w| w as u64).sum()
    }

    pub fn is_reference(&self) -> bool {
        self.reference
    }

    pub fn next(&self) -> &[KmerPathNodeId] {
        &self.next
    }

    pub fn prev(&self) -> &[KmerPathNodeId] {
        &self.prev
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn collapsed_kmers(&self) -> &[CollapsedKmer] {
        &self.collapsed
    }
}

/**
 * Arena owning every live path node, together with the adjacency index used
 * to derive edges when a node is loaded.
 *
 * An edge A -> B exists iff the last kmer of A overlaps the first kmer of B
 * by k-1 bases and the interval of the last kmer of A, shifted right by one,
 * intersects the interval of the first kmer of B. Both conditions are
 * checked when nodes are wired in; structural operations afterwards rebuild
 * edges from the existing lists rather than rederiving adjacency.
 */
pub struct KmerPathGraph {
    k: usize,
    nodes: Vec<Option<KmerPathNode>>,
    free: Vec<usize>,
    next_serial: u64,
    // live nodes keyed by the leading k-1 bases of their first kmer
    by_prefix: HashMap<u64, Vec<KmerPathNodeId>>,
    // live nodes keyed by the trailing k-1 bases of their last kmer
    by_suffix: HashMap<u64, Vec<KmerPathNodeId>>,
}

impl KmerPathGraph {
    pub fn new(k: usize) -> KmerPathGraph {
        assert!(k >= 1 && k <= KmerEncoding::MAX_K, "Invalid kmer size {}", k);
        KmerPathGraph {
            k,
            nodes: Vec::new(),
            free: Vec::new(),
            next_serial: 0,
            by_prefix: HashMap::new(),
            by_suffix: HashMap::new(),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn contains(&self, id: KmerPathNodeId) -> bool {
        id.0 < self.nodes.len() && self.nodes[id.0].is_some()
    }

    pub fn get(&self, id: KmerPathNodeId) -> &KmerPathNode {
        self.nodes[id.0]
            .as_ref()
            .unwrap_or_else(|| panic!("Node {:?} is not live", id))
    }

    fn get_mut(&mut self, id: KmerPathNodeId) -> &mut KmerPathNode {
        self.nodes[id.0]
            .as_mut()
            .unwrap_or_else(|| panic!("Node {:?} is not live", id))
    }

    /**
     * Take ownership of a detached node. The caller is responsible for
     * wiring edges afterwards.
     */
    pub fn insert(&mut self, mut node: KmerPathNode) -> KmerPathNodeId {
        node.serial = self.next_serial;
        self.next_serial += 1;
        let id = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                KmerPathNodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                KmerPathNodeId(self.nodes.len() - 1)
            }
        };
        self.index_register(id);
        return id;
    }

    /**
     * Remove a node from the arena. Edge lists referring to it must already
     * have been rewired or detached.
     */
    pub fn remove(&mut self, id: KmerPathNodeId) -> KmerPathNode {
        self.index_deregister(id);
        let node = self.nodes[id.0]
            .take()
            .unwrap_or_else(|| panic!("Node {:?} is not live", id));
        self.free.push(id.0);
        return node;
    }

    fn index_register(&mut self, id: KmerPathNodeId) {
        let k = self.k;
        let (prefix_key, suffix_key) = {
            let n = self.get(id);
            (
                KmerEncoding::prefix(n.first_kmer()),
                KmerEncoding::suffix(k, n.last_kmer()),
            )
        };
        self.by_prefix.entry(prefix_key).or_insert_with(Vec::new).push(id);
        self.by_suffix.entry(suffix_key).or_insert_with(Vec::new).push(id);
    }

    fn index_deregister(&mut self, id: KmerPathNodeId) {
        let k = self.k;
        let (prefix_key, suffix_key) = {
            let n = self.get(id);
            (
                KmerEncoding::prefix(n.first_kmer()),
                KmerEncoding::suffix(k, n.last_kmer()),
            )
        };
        if let Some(ids) = self.by_prefix.get_mut(&prefix_key) {
            ids.retain(|&x| x != id);
        }
        if let Some(ids) = self.by_suffix.get_mut(&suffix_key) {
            ids.retain(|&x| x != id);
        }
    }

    /**
     * True when the interval of the last kmer of `from`, shifted right by
     * one position, intersects the interval of the first kmer of `to`
     */
    pub fn edge_intervals_connect(&self, from: KmerPathNodeId, to: KmerPathNodeId) -> bool {
        let f = self.get(from);
        let t = self.get(to);
        IntervalUtils::overlaps_closed(
            f.last_start() + 1,
            f.last_end() + 1,
            t.first_start(),
            t.first_end(),
        )
    }

    fn add_edge(&mut self, from: KmerPathNodeId, to: KmerPathNodeId) {
        if self.get(from).next.contains(&to) {
            return;
        }
        self.get_mut(from).next.push(to);
        self.get_mut(to).prev.push(from);
    }

    /**
     * Derive the edges of a freshly loaded node from the live adjacency
     * index. A node positionally adjacent to itself gains a self edge.
     */
    pub fn wire(&mut self, id: KmerPathNodeId) {
        let k = self.k;
        let (first_kmer, last_kmer) = {
            let n = self.get(id);
            (n.first_kmer(), n.last_kmer())
        };
        let preds = self
            .by_suffix
            .get(&KmerEncoding::prefix(first_kmer))
            .cloned()
            .unwrap_or_default();
        for cand in preds {
            if self.edge_intervals_connect(cand, id) {
                self.add_edge(cand, id);
            }
        }
        let succs = self
            .by_prefix
            .get(&KmerEncoding::suffix(k, last_kmer))
            .cloned()
            .unwrap_or_default();
        for cand in succs {
            if self.edge_intervals_connect(id, cand) {
                self.add_edge(id, cand);
            }
        }
    }

    /**
     * Partition a node into a prefix of first_length kmers and a suffix of
     * the remainder. The prefix inherits the predecessors, the suffix keeps
     * the successors, and a new prefix -> suffix edge is added. Returns the
     * prefix; the argument node becomes the suffix with its interval shifted
     * right by first_length.
     */
    pub fn split_at_length(&mut self, id: KmerPathNodeId, first_length: usize) -> KmerPathNodeId {
        let length = self.get(id).length();
        assert!(
            first_length > 0 && first_length < length,
            "Cannot split node of length {} after {} kmers",
            length,
            first_length
        );
        self.index_deregister(id);
        let prefix_kmers;
        let prefix_weights;
        let prefix_collapsed;
        let old_prev;
        let first_start;
        let first_end;
        let reference;
        {
            let n = self.get_mut(id);
            prefix_kmers = n.kmers.drain(..first_length).collect::<Vec<u64>>();
            prefix_weights = n.weights.drain(..first_length).collect::<Vec<u32>>();
            let (pre, post): (Vec<CollapsedKmer>, Vec<CollapsedKmer>) = n
                .collapsed
                .drain(..)
                .partition(|c| c.offset < first_length);
            prefix_collapsed = pre;
            n.collapsed = post
                .into_iter()
                .map(|c| CollapsedKmer {
                    offset: c.offset - first_length,
                    ..c
                })
                .collect();
            old_prev = std::mem::take(&mut n.prev);
            first_start = n.first_start;
            first_end = n.first_end;
            reference = n.reference;
            n.first_start += first_length as i32;
            n.first_end += first_length as i32;
        }
        let prefix = KmerPathNode {
            kmers: prefix_kmers,
            weights: prefix_weights,
            first_start,
            first_end,
            reference,
            collapsed: prefix_collapsed,
            next: vec![id],
            prev: old_prev.clone(),
            serial: 0,
        };
        let prefix_id = self.insert(prefix);
        self.get_mut(id).prev = vec![prefix_id];
        // incoming edges follow the leading kmer into the prefix node; a
        // self edge turns into an edge from the suffix back onto the prefix
        for p in old_prev {
            let pn = self.get_mut(p);
            for t in pn.next.iter_mut() {
                if *t == id {
                    *t = prefix_id;
                }
            }
        }
        self.index_register(id);
        return prefix_id;
    }

    /**
     * Partition a node of interval [a, b] into a left node covering
     * [a, new_start - 1] and a right node covering [new_start, b] with the
     * identical kmer chain. Edges are rebuilt from the old lists wherever
     * the narrowed intervals still permit adjacency. Returns the left node;
     * the argument keeps the right interval.
     */
    pub fn split_at_start_position(
        &mut self,
        id: KmerPathNodeId,
        new_start: i32,
    ) -> KmerPathNodeId {
        let (first_start, first_end) = {
            let n = self.get(id);
            (n.first_start, n.first_end)
        };
        assert!(
            first_start < new_start && new_start <= first_end,
            "Cannot split interval [{},{}] at {}",
            first_start,
            first_end,
            new_start
        );
        let kmers;
        let weights;
        let reference;
        let collapsed;
        let old_next;
        let old_prev;
        {
            let n = self.get_mut(id);
            kmers = n.kmers.clone();
            weights = n.weights.clone();
            reference = n.reference;
            collapsed = n.collapsed.clone();
            old_next = std::mem::take(&mut n.next);
            old_prev = std::mem::take(&mut n.prev);
            n.first_start = new_start;
        }
        let left = KmerPathNode {
            kmers,
            weights,
            first_start,
            first_end: new_start - 1,
            reference,
            collapsed,
            next: Vec::new(),
            prev: Vec::new(),
            serial: 0,
        };
        let left_id = self.insert(left);
        for &t in &old_next {
            if t != id {
                self.get_mut(t).prev.retain(|&x| x != id);
            }
        }
        for &s in &old_prev {
            if s != id {
                self.get_mut(s).next.retain(|&x| x != id);
            }
        }
        for t in old_next {
            if t == id {
                // self edge: the first and last kmer now live in both halves
                for &src in &[left_id, id] {
                    for &dst in &[left_id, id] {
                        if self.edge_intervals_connect(src, dst) {
                            self.add_edge(src, dst);
                        }
                    }
                }
            } else {
                for &src in &[left_id, id] {
                    if self.edge_intervals_connect(src, t) {
                        self.add_edge(src, t);
                    }
                }
            }
        }
        for s in old_prev {
            if s == id {
                // already handled as part of the self edge above
                continue;
            }
            for &dst in &[left_id, id] {
                if self.edge_intervals_connect(s, dst) {
                    self.add_edge(s, dst);
                }
            }
        }
        return left_id;
    }

    /**
     * Fold an error chain into the path it mismatches. Both nodes must have
     * the same length and occupy the same positional interval; the target
     * chain wins, per-kmer weights are added, edge lists are unioned and the
     * source chain is recorded as collapsed evidence on the target. The
     * source node is removed from the arena.
     */
    pub fn merge(&mut self, into_id: KmerPathNodeId, src_id: KmerPathNodeId) {
        assert!(into_id != src_id, "Cannot merge {:?} into itself", into_id);
        {
            let src = self.get(src_id);
            let into = self.get(into_id);
            assert!(
                src.length() == into.length(),
                "Cannot merge nodes of lengths {} and {}",
                src.length(),
                into.length()
            );
            assert!(
                src.last_start() == into.last_start() && src.last_end() == into.last_end(),
                "Cannot merge nodes at [{},{}] and [{},{}]",
                src.first_start,
                src.first_end,
                into.first_start,
                into.first_end
            );
        }
        let old_next;
        let old_prev;
        {
            let s = self.get_mut(src_id);
            old_next = std::mem::take(&mut s.next);
            old_prev = std::mem::take(&mut s.prev);
        }
        for &t in &old_next {
            if t != src_id {
                self.get_mut(t).prev.retain(|&x| x != src_id);
            }
        }
        for &p in &old_prev {
            if p != src_id {
                self.get_mut(p).next.retain(|&x| x != src_id);
            }
        }
        for t in old_next {
            let dst = if t == src_id { into_id } else { t };
            self.add_edge(into_id, dst);
        }
        for p in old_prev {
            if p == src_id {
                // self edge already transferred with the successors
                continue;
            }
            self.add_edge(p, into_id);
        }
        let src_node = self.remove(src_id);
        let into = self.get_mut(into_id);
        for (i, &w) in src_node.weights.iter().enumerate() {
            into.weights[i] += w;
        }
        into.reference |= src_node.reference;
        for (i, &kmer) in src_node.kmers.iter().enumerate() {
            into.collapsed.push(CollapsedKmer {
                offset: i,
                kmer,
                weight: src_node.weights[i],
            });
        }
        into.collapsed.extend(src_node.collapsed.iter().cloned());
    }

    /**
     * Re-join the two halves of a length split. Defined only when the
     * suffix is the sole successor of the prefix, the prefix the sole
     * predecessor of the suffix, the intervals are the exact length shift
     * of one another and the chains are adjacent. Restores the node the
     * split produced them from.
     */
    pub fn concat(&mut self, prefix_id: KmerPathNodeId, suffix_id: KmerPathNodeId) {
        assert!(prefix_id != suffix_id, "Cannot concat {:?} with itself", prefix_id);
        {
            let p = self.get(prefix_id);
            let s = self.get(suffix_id);
            assert!(
                p.next.len() == 1 && p.next[0] == suffix_id,
                "Suffix is not the sole successor of the prefix"
            );
            assert!(
                s.prev.len() == 1 && s.prev[0] == prefix_id,
                "Prefix is not the sole predecessor of the suffix"
            );
            assert!(
                s.first_start == p.first_start + p.length() as i32
                    && s.first_end == p.first_end + p.length() as i32,
                "Suffix interval [{},{}] is not the length shift of [{},{}]",
                s.first_start,
                s.first_end,
                p.first_start,
                p.first_end
            );
            assert!(
                KmerEncoding::adjacent(self.k, p.last_kmer(), s.first_kmer()),
                "Prefix and suffix chains do not overlap by k-1 bases"
            );
        }
        self.index_deregister(prefix_id);
        let prefix_len = self.get(prefix_id).length();
        let mut suffix = self.remove(suffix_id);
        let suffix_next = std::mem::take(&mut suffix.next);
        {
            let p = self.get_mut(prefix_id);
            p.kmers.append(&mut suffix.kmers);
            p.weights.append(&mut suffix.weights);
            p.reference |= suffix.reference;
            let suffix_collapsed = suffix.collapsed;
            p.collapsed.extend(suffix_collapsed.into_iter().map(|c| CollapsedKmer {
                offset: c.offset + prefix_len,
                ..c
            }));
            p.next = suffix_next.clone();
        }
        for t in suffix_next {
            let t_node = self.get_mut(t);
            for x in t_node.prev.iter_mut() {
                if *x == suffix_id {
                    *x = prefix_id;
                }
            }
        }
        self.index_register(prefix_id);
    }

    /**
     * Disconnect a node from every neighbour prior to emission or disposal
     */
    pub fn detach(&mut self, id: KmerPathNodeId) {
        let old_next;
        let old_prev;
        {
            let n = self.get_mut(id);
            old_next = std::mem::take(&mut n.next);
            old_prev = std::mem::take(&mut n.prev);
        }
        for t in old_next {
            if t != id {
                self.get_mut(t).prev.retain(|&x| x != id);
            }
        }
        for p in old_prev {
            if p != id {
                self.get_mut(p).next.retain(|&x| x != id);
            }
        }
    }

    /**
     * Verify the structural invariants of every live node. Intended for
     * tests and debugging only.
     */
    pub fn sanity_check(&self) {
        for slot in 0..self.nodes.len() {
            let node = match &self.nodes[slot] {
                Some(n) => n,
                None => continue,
            };
            let id = KmerPathNodeId(slot);
            assert!(node.weights.len() == node.kmers.len());
            assert!(node.first_start <= node.first_end);
            for i in 1..node.kmers.len() {
                assert!(
                    KmerEncoding::adjacent(self.k, node.kmers[i - 1], node.kmers[i]),
                    "Node {:?} chain broken at offset {}",
                    id,
                    i
                );
            }
            for &t in &node.next {
                assert!(self.contains(t), "Node {:?} has dangling successor {:?}", id, t);
                assert!(
                    self.get(t).prev.contains(&id),
                    "Edge {:?} -> {:?} is not bidirectional",
                    id,
                    t
                );
            }
            for &p in &node.prev {
                assert!(self.contains(p), "Node {:?} has dangling predecessor {:?}", id, p);
                assert!(
                    self.get(p).next.contains(&id),
                    "Edge {:?} -> {:?} is not bidirectional",
                    p,
                    id
                );
            }
        }
    }
}
