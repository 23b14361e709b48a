#![allow(unused_imports)]

extern crate brolga_sv;

use brolga_sv::kmers::kmer_encoding::KmerEncoding;
use brolga_sv::test_utils::path_node_test_utils::PathNodeTestUtils;

#[test]
fn assemble_packs_first_base_high() {
    // ACGT = 00 01 10 11
    assert_eq!(KmerEncoding::assemble(4, b"ACGT"), 0b00011011);
    assert_eq!(KmerEncoding::assemble(4, b"AAAA"), 0);
    assert_eq!(KmerEncoding::assemble(4, b"TTTT"), 0b11111111);
    assert_eq!(KmerEncoding::assemble(4, b"acgt"), 0b00011011);
}

#[test]
fn base_calls_round_trips() {
    for bases in &[&b"ACGT"[..], b"AAAA", b"TGCA", b"GGGG"] {
        let kmer = KmerEncoding::assemble(4, bases);
        assert_eq!(KmerEncoding::base_calls(4, kmer), bases.to_vec());
    }
    let kmer = KmerEncoding::assemble(16, b"ACGTACGTACGTACGT");
    assert_eq!(
        KmerEncoding::base_calls(16, kmer),
        b"ACGTACGTACGTACGT".to_vec()
    );
}

#[test]
fn next_kmer_advances_by_one_base() {
    let acgt = KmerEncoding::assemble(4, b"ACGT");
    assert_eq!(
        KmerEncoding::next_kmer(4, acgt, b'A'),
        KmerEncoding::assemble(4, b"CGTA")
    );
}

#[test]
fn prefix_and_suffix_overlap() {
    let acgt = KmerEncoding::assemble(4, b"ACGT");
    let cgta = KmerEncoding::assemble(4, b"CGTA");
    assert_eq!(KmerEncoding::prefix(cgta), KmerEncoding::suffix(4, acgt));
    assert!(KmerEncoding::adjacent(4, acgt, cgta));
    assert!(!KmerEncoding::adjacent(4, acgt, KmerEncoding::assemble(4, b"TTTT")));
}

#[test]
fn first_and_last_base() {
    let tgca = KmerEncoding::assemble(4, b"TGCA");
    assert_eq!(KmerEncoding::first_base(4, tgca), 3);
    assert_eq!(KmerEncoding::last_base(tgca), 0);
}

#[test]
fn kmer_mask_covers_full_word_at_max_k() {
    assert_eq!(KmerEncoding::kmer_mask(32), u64::MAX);
    assert_eq!(KmerEncoding::kmer_mask(4), 0xFF);
    assert_eq!(KmerEncoding::kmer_mask(1), 0b11);
}

#[test]
fn base_mismatches_counts_differing_positions() {
    let aaat = KmerEncoding::assemble(4, b"AAAT");
    let aaag = KmerEncoding::assemble(4, b"AAAG");
    let tttt = KmerEncoding::assemble(4, b"TTTT");
    assert_eq!(KmerEncoding::base_mismatches(4, aaat, aaat), 0);
    assert_eq!(KmerEncoding::base_mismatches(4, aaat, aaag), 1);
    assert_eq!(KmerEncoding::base_mismatches(4, aaat, tttt), 3);
}

#[test]
fn bases_different_compares_left_aligned() {
    let a = PathNodeTestUtils::kmers_of(4, "AAATGCA");
    let b = PathNodeTestUtils::kmers_of(4, "AAACGCA");
    assert_eq!(KmerEncoding::bases_different(4, &a, &b), 1);

    let c = PathNodeTestUtils::kmers_of(4, "AAACGGA");
    assert_eq!(KmerEncoding::bases_different(4, &a, &c), 2);

    // unequal lengths compare over the shorter chain plus k - 1 bases
    let short = PathNodeTestUtils::kmers_of(4, "AAAC");
    assert_eq!(KmerEncoding::bases_different(4, &a, &short), 1);
}

#[test]
fn reverse_bases_different_compares_right_aligned() {
    let a = PathNodeTestUtils::kmers_of(4, "AAATGCA");
    let tail = PathNodeTestUtils::kmers_of(4, "TGCA");
    assert_eq!(KmerEncoding::reverse_bases_different(4, &a, &tail), 0);

    let near = PathNodeTestUtils::kmers_of(4, "CGCA");
    assert_eq!(KmerEncoding::reverse_bases_different(4, &a, &near), 1);

    let b = PathNodeTestUtils::kmers_of(4, "ATGCA");
    let c = PathNodeTestUtils::kmers_of(4, "CCGCA");
    assert_eq!(KmerEncoding::reverse_bases_different(4, &b, &c), 2);
}

#[test]
#[should_panic(expected = "Cannot encode base")]
fn ambiguous_bases_are_rejected() {
    KmerEncoding::assemble(4, b"ACGN");
}
