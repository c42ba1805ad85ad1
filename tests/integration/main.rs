//! Integration tests for the collector
//!
//! These tests use wiremock to stand in for the listing site and the scraping
//! proxy, and exercise the fetch layer and the full pipeline end-to-end.

mod fetch_tests;
mod run_tests;
