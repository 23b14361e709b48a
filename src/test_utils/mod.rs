pub mod path_node_test_utils;
