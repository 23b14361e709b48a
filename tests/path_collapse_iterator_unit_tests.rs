#![allow(unused_imports)]

extern crate brolga_sv;
extern crate rand;

use brolga_sv::kmers::kmer_encoding::KmerEncoding;
use brolga_sv::positional::kmer_path_node::KmerPathNode;
use brolga_sv::positional::path_collapse_iterator::PathCollapseIterator;
use brolga_sv::test_utils::path_node_test_utils::PathNodeTestUtils;
use brolga_sv::utils::errors::BrolgaError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn node(k: usize, bases: &str, first_start: i32, first_end: i32, weight: u32) -> KmerPathNode {
    PathNodeTestUtils::node(k, bases, first_start, first_end, weight)
}

fn collapse(
    nodes: Vec<KmerPathNode>,
    max_path_collapse_length: usize,
    max_bases_mismatch: u32,
    bubbles_and_leaves_only: bool,
) -> Vec<KmerPathNode> {
    PathNodeTestUtils::collapse(
        4,
        nodes,
        max_path_collapse_length,
        max_bases_mismatch,
        bubbles_and_leaves_only,
    )
}

fn find<'a>(nodes: &'a [KmerPathNode], bases: &str, first_start: i32) -> &'a KmerPathNode {
    let kmers = PathNodeTestUtils::kmers_of(4, bases);
    nodes
        .iter()
        .find(|n| n.kmers() == kmers.as_slice() && n.first_start() == first_start)
        .unwrap_or_else(|| panic!("No node spelling {} at {}", bases, first_start))
}

#[test]
fn invalid_configuration_is_rejected() {
    let empty = Vec::<KmerPathNode>::new();
    assert!(matches!(
        PathCollapseIterator::new(empty.clone().into_iter(), 0, 5, 1, false),
        Err(BrolgaError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        PathCollapseIterator::new(empty.clone().into_iter(), 33, 5, 1, false),
        Err(BrolgaError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        PathCollapseIterator::new(empty.into_iter(), 4, 0, 1, false),
        Err(BrolgaError::InvalidConfiguration(_))
    ));
}

#[test]
fn empty_input_yields_empty_output() {
    let out = collapse(Vec::new(), 5, 1, false);
    assert!(out.is_empty());
}

#[test]
fn single_node_passes_through() {
    let input = vec![node(4, "AAAATG", 10, 10, 1)];
    let out = collapse(input.clone(), 5, 1, false);
    PathNodeTestUtils::assert_equivalent(&input, &out);
    PathNodeTestUtils::assert_well_formed_output(&out);
}

#[test]
#[should_panic(expected = "Malformed input")]
fn out_of_order_input_is_fatal() {
    let input = vec![
        node(4, "AAAT", 5, 5, 1),
        node(4, "CCCC", 1, 1, 1),
    ];
    collapse(input, 5, 1, false);
}

/// Single-kmer error branch with no onward edge folds into its sibling.
#[test]
fn lighter_branch_merges_into_heavier_sibling() {
    let input = vec![
        node(4, "AAAA", 1, 10, 1),
        node(4, "AAAT", 2, 11, 2),
        node(4, "AAAG", 2, 11, 1),
        node(4, "AATA", 3, 12, 1),
    ];
    let ingested = PathNodeTestUtils::total_support(&input);
    let out = collapse(input, 5, 1, false);
    assert_eq!(out.len(), 3);
    PathNodeTestUtils::assert_well_formed_output(&out);
    assert_eq!(PathNodeTestUtils::total_support(&out), ingested);
    assert_eq!(find(&out, "AAAA", 1).weights(), &[1]);
    let merged = find(&out, "AAAT", 2);
    assert_eq!(merged.weights(), &[3]);
    assert_eq!(merged.collapsed_kmers().len(), 1);
    assert_eq!(
        merged.collapsed_kmers()[0].kmer,
        KmerEncoding::assemble(4, b"AAAG")
    );
    assert_eq!(find(&out, "AATA", 3).weights(), &[1]);
}

/// Two length-4 branches differing by one base converge on a common child.
#[test]
fn bubble_collapses_through_common_child() {
    let input = vec![
        node(4, "AAAA", 1, 10, 1),
        node(4, "AAATGCA", 2, 11, 2),
        node(4, "AAACGCA", 2, 11, 1),
        node(4, "GCAT", 6, 15, 1),
    ];
    let ingested = PathNodeTestUtils::total_support(&input);
    // a pure bubble collapses even in bubbles-and-leaves-only mode
    let out = collapse(input, 5, 1, true);
    assert_eq!(out.len(), 3);
    PathNodeTestUtils::assert_well_formed_output(&out);
    assert_eq!(PathNodeTestUtils::total_support(&out), ingested);
    let merged = find(&out, "AAATGCA", 2);
    assert_eq!(merged.weights(), &[3, 3, 3, 3]);
    let collapsed = merged.collapsed_kmers();
    assert_eq!(collapsed.len(), 4);
    let source_kmers = PathNodeTestUtils::kmers_of(4, "AAACGCA");
    for (i, c) in collapsed.iter().enumerate() {
        assert_eq!(c.offset, i);
        assert_eq!(c.kmer, source_kmers[i]);
        assert_eq!(c.weight, 1);
    }
    assert_eq!(find(&out, "GCAT", 6).weights(), &[1]);
}

/// A dead-end branch folds into the continuing main path.
#[test]
fn leaf_collapses_into_main_path() {
    let input = vec![
        node(4, "CCCC", 1, 10, 1),
        node(4, "CCCA", 2, 11, 1),
        node(4, "CCCG", 2, 11, 4),
        node(4, "CCGG", 3, 12, 1),
    ];
    let ingested = PathNodeTestUtils::total_support(&input);
    let out = collapse(input, 5, 1, false);
    assert_eq!(out.len(), 3);
    PathNodeTestUtils::assert_well_formed_output(&out);
    assert_eq!(PathNodeTestUtils::total_support(&out), ingested);
    assert_eq!(find(&out, "CCCC", 1).weights(), &[1]);
    assert_eq!(find(&out, "CCCG", 2).weights(), &[5]);
    assert_eq!(find(&out, "CCGG", 3).weights(), &[1]);
}

/// Siblings too far apart are left alone.
#[test]
fn too_many_mismatches_prevent_collapse() {
    let input = vec![
        node(4, "AAAA", 1, 10, 1),
        node(4, "AAAT", 2, 11, 2),
        node(4, "TTTT", 2, 11, 1),
        node(4, "AATA", 3, 12, 1),
    ];
    let out = collapse(input.clone(), 5, 1, false);
    PathNodeTestUtils::assert_equivalent(&input, &out);

    // two mismatching bases along length-4 branches with a budget of one
    let input = vec![
        node(4, "AAAA", 1, 10, 1),
        node(4, "AAACGGA", 2, 11, 1),
        node(4, "AAATGCA", 2, 11, 2),
        node(4, "GCAT", 6, 15, 1),
    ];
    let out = collapse(input.clone(), 5, 1, false);
    PathNodeTestUtils::assert_equivalent(&input, &out);
}

#[test]
fn zero_mismatch_budget_never_merges_distinct_chains() {
    let input = vec![
        node(4, "AAAA", 1, 10, 1),
        node(4, "AAACGCA", 2, 11, 1),
        node(4, "AAATGCA", 2, 11, 2),
        node(4, "GCAT", 6, 15, 1),
    ];
    let out = collapse(input.clone(), 5, 0, false);
    PathNodeTestUtils::assert_equivalent(&input, &out);
}

/// Merging a two-node source into a single long target
/// splits the target so node boundaries align.
#[test]
fn target_is_length_split_to_align_with_the_source() {
    let input = vec![
        node(4, "AAAA", 1, 5, 1),
        node(4, "AAATCG", 2, 6, 5),
        node(4, "AAAC", 2, 6, 1),
        node(4, "AACCG", 3, 7, 1),
    ];
    let ingested = PathNodeTestUtils::total_support(&input);
    let out = collapse(input, 5, 1, false);
    assert_eq!(out.len(), 3);
    PathNodeTestUtils::assert_well_formed_output(&out);
    assert_eq!(PathNodeTestUtils::total_support(&out), ingested);
    assert_eq!(find(&out, "AAAA", 1).weights(), &[1]);
    // the length-3 target emerges as aligned pieces of lengths 1 and 2
    assert_eq!(find(&out, "AAAT", 2).weights(), &[6]);
    assert_eq!(find(&out, "AATCG", 3).weights(), &[6, 6]);
}

fn shared_predecessor_bubble() -> Vec<KmerPathNode> {
    vec![
        node(4, "CAAA", 1, 10, 5),
        node(4, "AAAA", 2, 10, 1),
        node(4, "AAAC", 3, 11, 1),
        node(4, "AAATGCA", 3, 11, 2),
        node(4, "AACGCA", 4, 12, 1),
        node(4, "GCAT", 7, 15, 1),
    ]
}

/// A source body whose first node has an extra external
/// predecessor is not a pure bubble.
#[test]
fn bubbles_and_leaves_only_gates_impure_bubbles() {
    let input = shared_predecessor_bubble();
    let out = collapse(input.clone(), 5, 1, true);
    PathNodeTestUtils::assert_equivalent(&input, &out);

    let ingested = PathNodeTestUtils::total_support(&input);
    let out = collapse(input, 5, 1, false);
    assert_eq!(out.len(), 5);
    PathNodeTestUtils::assert_well_formed_output(&out);
    assert_eq!(PathNodeTestUtils::total_support(&out), ingested);
    // target was split at the source node boundary before merging
    assert_eq!(find(&out, "AAAT", 3).weights(), &[3]);
    assert_eq!(find(&out, "AATGCA", 4).weights(), &[3, 3, 3]);
    assert_eq!(find(&out, "GCAT", 7).weights(), &[1]);
}

/// Backward traversal: a stub with no predecessors folds into the main
/// path, which is trimmed at its far end to align the tips.
#[test]
fn reverse_leaf_collapse_trims_the_target() {
    let input = vec![
        node(4, "AAATGCA", 2, 11, 4),
        node(4, "CGCA", 5, 14, 1),
        node(4, "GCAT", 6, 15, 1),
    ];
    let ingested = PathNodeTestUtils::total_support(&input);
    let out = collapse(input, 5, 1, false);
    assert_eq!(out.len(), 3);
    PathNodeTestUtils::assert_well_formed_output(&out);
    assert_eq!(PathNodeTestUtils::total_support(&out), ingested);
    assert_eq!(find(&out, "AAATGC", 2).weights(), &[4, 4, 4]);
    assert_eq!(find(&out, "TGCA", 5).weights(), &[5]);
    assert_eq!(find(&out, "GCAT", 6).weights(), &[1]);
}

#[test]
fn output_is_ordered_and_conserved_across_disjoint_regions() {
    let mut input = Vec::new();
    // leaf collapse region
    input.push(node(4, "CCCC", 1, 10, 1));
    input.push(node(4, "CCCA", 2, 11, 1));
    input.push(node(4, "CCCG", 2, 11, 4));
    input.push(node(4, "CCGG", 3, 12, 1));
    // bubble region
    input.push(node(4, "AAAA", 501, 510, 1));
    input.push(node(4, "AAATGCA", 502, 511, 2));
    input.push(node(4, "AAACGCA", 502, 511, 1));
    input.push(node(4, "GCAT", 506, 515, 1));
    // reverse leaf region
    input.push(node(4, "AAATGCA", 1002, 1011, 4));
    input.push(node(4, "CGCA", 1005, 1014, 1));
    input.push(node(4, "GCAT", 1006, 1015, 1));
    // distant untouched node, forcing the earlier regions to settle and
    // emit while it is still pending
    input.push(node(4, "TTTT", 10000, 10000, 1));

    let ingested = PathNodeTestUtils::total_support(&input);
    let out = collapse(input, 5, 1, false);
    assert_eq!(out.len(), 3 + 3 + 3 + 1);
    PathNodeTestUtils::assert_well_formed_output(&out);
    assert_eq!(PathNodeTestUtils::total_support(&out), ingested);
    assert_eq!(find(&out, "CCCG", 2).weights(), &[5]);
    assert_eq!(find(&out, "AAATGCA", 502).weights(), &[3, 3, 3, 3]);
    assert_eq!(find(&out, "TGCA", 1005).weights(), &[5]);
    assert_eq!(find(&out, "TTTT", 10000).weights(), &[1]);
}

#[test]
fn collapse_is_idempotent() {
    let input = vec![
        node(4, "AAAA", 1, 10, 1),
        node(4, "AAATGCA", 2, 11, 2),
        node(4, "AAACGCA", 2, 11, 1),
        node(4, "GCAT", 6, 15, 1),
    ];
    let once = collapse(input, 5, 1, false);
    let rebuilt: Vec<KmerPathNode> = once
        .iter()
        .map(|n| PathNodeTestUtils::reconstruct(4, n))
        .collect();
    let twice = collapse(rebuilt, 5, 1, false);
    PathNodeTestUtils::assert_equivalent(&once, &twice);

    // a zero budget pass is the identity on its own output as well
    let rebuilt: Vec<KmerPathNode> = once
        .iter()
        .map(|n| PathNodeTestUtils::reconstruct(4, n))
        .collect();
    let zero = collapse(rebuilt, 5, 0, false);
    PathNodeTestUtils::assert_equivalent(&once, &zero);
}

#[test]
fn randomised_bubble_weights_conserve_support() {
    let mut rng = StdRng::seed_from_u64(1844);
    for _ in 0..25 {
        let width = rng.gen_range(1..15);
        let w_main: u32 = rng.gen_range(1..20);
        let w_err: u32 = rng.gen_range(1..20);
        let input = vec![
            node(4, "AAAA", 1, 1 + width, 1),
            node(4, "AAATGCA", 2, 2 + width, w_main),
            node(4, "AAACGCA", 2, 2 + width, w_err),
            node(4, "GCAT", 6, 6 + width, 1),
        ];
        let ingested = PathNodeTestUtils::total_support(&input);
        let out = collapse(input, 5, 1, false);
        assert_eq!(out.len(), 3);
        PathNodeTestUtils::assert_well_formed_output(&out);
        assert_eq!(PathNodeTestUtils::total_support(&out), ingested);
        // the lighter branch is always the one merged away; on a tie the
        // deterministic pair order keeps the first-loaded chain
        let survivor = if w_err > w_main { "AAACGCA" } else { "AAATGCA" };
        let merged = find(&out, survivor, 2);
        assert_eq!(merged.weights(), &[w_main + w_err; 4]);
        assert_eq!(merged.collapsed_kmers().len(), 4);
    }
}
