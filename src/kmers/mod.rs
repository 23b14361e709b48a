pub mod kmer_encoding;
