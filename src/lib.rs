pub mod kmers;
pub mod positional;
pub mod test_utils;
pub mod utils;

// Utilities
extern crate itertools;

#[macro_use]
extern crate log;
