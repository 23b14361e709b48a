use std::cmp::min;

/**
 * Fast 2-bit packing of DNA kmers into u64 words
 *
 * A kmer of length k occupies the low 2k bits of the word with the first
 * base in the most significant occupied position, so a kmer can be advanced
 * one base with a shift and a mask. Supports kmer sizes 1..=32.
 */
pub struct KmerEncoding {}

impl KmerEncoding {
    pub const MAX_K: usize = 32;

    const BASE_MASK: u64 = 0x5555_5555_5555_5555;

    pub fn encode_base(base: u8) -> u64 {
        match base {
            b'A' | b'a' => 0,
            b'C' | b'c' => 1,
            b'G' | b'g' => 2,
            b'T' | b't' => 3,
            _ => panic!("Cannot encode base {}", base as char),
        }
    }

    pub fn decode_base(bits: u64) -> u8 {
        match bits & 3 {
            0 => b'A',
            1 => b'C',
            2 => b'G',
            _ => b'T',
        }
    }

    /**
     * Bit mask covering every base of a kmer of the given size
     */
    pub fn kmer_mask(k: usize) -> u64 {
        assert!(k <= Self::MAX_K, "kmer size {} exceeds maximum {}", k, Self::MAX_K);
        if k == Self::MAX_K {
            u64::MAX
        } else {
            (1u64 << (2 * k)) - 1
        }
    }

    /**
     * Pack the first k bases of the given call sequence
     */
    pub fn assemble(k: usize, bases: &[u8]) -> u64 {
        assert!(k >= 1 && k <= Self::MAX_K, "Invalid kmer size {}", k);
        assert!(bases.len() >= k, "Need {} bases, got {}", k, bases.len());
        let mut kmer = 0u64;
        for &b in &bases[..k] {
            kmer = (kmer << 2) | Self::encode_base(b);
        }
        return kmer;
    }

    /**
     * Advance a kmer by one base call
     */
    pub fn next_kmer(k: usize, kmer: u64, base: u8) -> u64 {
        ((kmer << 2) | Self::encode_base(base)) & Self::kmer_mask(k)
    }

    pub fn first_base(k: usize, kmer: u64) -> u64 {
        (kmer >> (2 * (k - 1))) & 3
    }

    pub fn last_base(kmer: u64) -> u64 {
        kmer & 3
    }

    /**
     * Leading k-1 bases of a kmer
     */
    pub fn prefix(kmer: u64) -> u64 {
        kmer >> 2
    }

    /**
     * Trailing k-1 bases of a kmer
     */
    pub fn suffix(k: usize, kmer: u64) -> u64 {
        kmer & Self::kmer_mask(k - 1)
    }

    /**
     * Two kmers are adjacent when they overlap by k-1 bases, that is when
     * `to` can directly extend `from` in a de Bruijn graph
     */
    pub fn adjacent(k: usize, from: u64, to: u64) -> bool {
        Self::suffix(k, from) == Self::prefix(to)
    }

    pub fn base_calls(k: usize, kmer: u64) -> Vec<u8> {
        let mut bases = vec![0u8; k];
        for i in 0..k {
            bases[k - 1 - i] = Self::decode_base(kmer >> (2 * i));
        }
        return bases;
    }

    /**
     * Number of base positions at which two kmers of the same size differ
     */
    pub fn base_mismatches(k: usize, a: u64, b: u64) -> u32 {
        let delta = (a ^ b) & Self::kmer_mask(k);
        // collapse each 2-bit base difference into its low bit
        ((delta | (delta >> 1)) & Self::BASE_MASK).count_ones()
    }

    /**
     * Count of mismatched bases between the call sequences spelt by two kmer
     * chains, aligned on their first base. Compared over
     * min(lenA, lenB) + k - 1 bases.
     */
    pub fn bases_different(k: usize, path_a: &[u64], path_b: &[u64]) -> u32 {
        if path_a.is_empty() || path_b.is_empty() {
            return 0;
        }
        let n = min(path_a.len(), path_b.len());
        let mut mismatches = Self::base_mismatches(k, path_a[0], path_b[0]);
        for i in 1..n {
            // each subsequent kmer contributes one new trailing base
            if Self::last_base(path_a[i]) != Self::last_base(path_b[i]) {
                mismatches += 1;
            }
        }
        return mismatches;
    }

    /**
     * As bases_different() but aligned on the last base, for paths built by
     * backward traversal
     */
    pub fn reverse_bases_different(k: usize, path_a: &[u64], path_b: &[u64]) -> u32 {
        if path_a.is_empty() || path_b.is_empty() {
            return 0;
        }
        let la = path_a.len();
        let lb = path_b.len();
        let n = min(la, lb);
        let mut mismatches = Self::base_mismatches(k, path_a[la - 1], path_b[lb - 1]);
        for i in 1..n {
            if Self::first_base(k, path_a[la - 1 - i]) != Self::first_base(k, path_b[lb - 1 - i]) {
                mismatches += 1;
            }
        }
        return mismatches;
    }
}
