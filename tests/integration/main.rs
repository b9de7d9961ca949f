//! Integration tests for Fiction-Harvest
//!
//! Every test runs the real fetcher against a wiremock server and stores
//! into a SQLite database inside a temporary directory.

mod crawl_tests;
mod refresh_tests;
mod support;
