use crate::kmers::kmer_encoding::KmerEncoding;
use crate::positional::kmer_path_node::KmerPathNode;
use crate::positional::path_collapse_iterator::PathCollapseIterator;

/**
 * Builders and assertions shared by the unit test suite
 */
pub struct PathNodeTestUtils {}

impl PathNodeTestUtils {
    /**
     * Kmer chain spelt by a call sequence: n bases yield n - k + 1 kmers
     */
    pub fn kmers_of(k: usize, bases: &str) -> Vec<u64> {
        let calls = bases.as_bytes();
        assert!(calls.len() >= k, "Need at least {} bases, got {}", k, calls.len());
        let mut kmers = vec![KmerEncoding::assemble(k, calls)];
        for i in k..calls.len() {
            kmers.push(KmerEncoding::next_kmer(k, *kmers.last().unwrap(), calls[i]));
        }
        return kmers;
    }

    /**
     * Path node spelling the given call sequence, every kmer uniformly
     * weighted
     */
    pub fn node(
        k: usize,
        bases: &str,
        first_start: i32,
        first_end: i32,
        weight: u32,
    ) -> KmerPathNode {
        Self::node_with_reference(k, bases, first_start, first_end, weight, false)
    }

    pub fn node_with_reference(
        k: usize,
        bases: &str,
        first_start: i32,
        first_end: i32,
        weight: u32,
        reference: bool,
    ) -> KmerPathNode {
        let kmers = Self::kmers_of(k, bases);
        let weights = vec![weight; kmers.len()];
        KmerPathNode::new(k, kmers, weights, first_start, first_end, reference)
    }

    /**
     * Call sequence spelt by a node's kmer chain
     */
    pub fn bases_of(k: usize, node: &KmerPathNode) -> String {
        let mut bases = KmerEncoding::base_calls(k, node.first_kmer());
        for i in 1..node.length() {
            bases.push(KmerEncoding::decode_base(KmerEncoding::last_base(node.kmer(i))));
        }
        String::from_utf8(bases).unwrap()
    }

    /**
     * Run the given stream through a collapse pass and collect the output
     */
    pub fn collapse(
        k: usize,
        nodes: Vec<KmerPathNode>,
        max_path_collapse_length: usize,
        max_bases_mismatch: u32,
        bubbles_and_leaves_only: bool,
    ) -> Vec<KmerPathNode> {
        PathCollapseIterator::new(
            nodes.into_iter(),
            k,
            max_path_collapse_length,
            max_bases_mismatch,
            bubbles_and_leaves_only,
        )
        .unwrap()
        .collect()
    }

    /**
     * Support summed over every kmer and every position of every node
     */
    pub fn total_support(nodes: &[KmerPathNode]) -> u64 {
        nodes.iter().map(|n| n.width() as u64 * n.weight()).sum()
    }

    /**
     * Assert the emitted stream is ordered by first kmer start position and
     * that (first kmer, first start) identifies a node uniquely
     */
    pub fn assert_well_formed_output(nodes: &[KmerPathNode]) {
        for i in 1..nodes.len() {
            assert!(
                nodes[i - 1].first_start() <= nodes[i].first_start(),
                "Output out of order at index {}: {} after {}",
                i,
                nodes[i].first_start(),
                nodes[i - 1].first_start()
            );
        }
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                assert!(
                    !(nodes[i].first_kmer() == nodes[j].first_kmer()
                        && nodes[i].first_start() == nodes[j].first_start()),
                    "Duplicate (first kmer, first start) at indices {} and {}",
                    i,
                    j
                );
            }
        }
    }

    /**
     * Assert two streams spell the same nodes: chain, interval, weights and
     * reference flag
     */
    pub fn assert_equivalent(expected: &[KmerPathNode], actual: &[KmerPathNode]) {
        assert!(
            expected.len() == actual.len(),
            "Expected {} nodes, got {}",
            expected.len(),
            actual.len()
        );
        for (i, (e, a)) in expected.iter().zip(actual.iter()).enumerate() {
            assert!(e.kmers() == a.kmers(), "Kmer chain differs at index {}", i);
            assert!(e.weights() == a.weights(), "Weights differ at index {}", i);
            assert!(
                e.first_start() == a.first_start() && e.first_end() == a.first_end(),
                "Interval differs at index {}: [{},{}] vs [{},{}]",
                i,
                e.first_start(),
                e.first_end(),
                a.first_start(),
                a.first_end()
            );
            assert!(
                e.is_reference() == a.is_reference(),
                "Reference flag differs at index {}",
                i
            );
        }
    }

    /**
     * Rebuild a detached input node from an emitted one, dropping collapse
     * bookkeeping
     */
    pub fn reconstruct(k: usize, node: &KmerPathNode) -> KmerPathNode {
        KmerPathNode::new(
            k,
            node.kmers().to_vec(),
            node.weights().to_vec(),
            node.first_start(),
            node.first_end(),
            node.is_reference(),
        )
    }
}
