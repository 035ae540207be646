//! Codec tests that need hand-built files

mod test_utils;
mod byte_order_tests;
mod reader_tests;
