pub mod kmer_path_node;
pub mod kmer_path_node_path;
pub mod kmer_path_subnode;
pub mod path_collapse_iterator;
