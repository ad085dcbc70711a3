//! Integration test binary.

mod helpers;

mod cli_test;
mod pipeline_test;
