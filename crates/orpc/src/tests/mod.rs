//! Cross-module tests for the dispatch engine
//!
//! Unit tests live next to the code; these exercise the pipeline, routers,
//! clients and handlers together, plus property-based tests using proptest.

pub mod pipeline_tests;
pub mod router_tests;
