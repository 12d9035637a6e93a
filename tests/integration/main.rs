//! Integration tests for Sumi-Snapshot
//!
//! `capture_tests` drives the orchestrator with an in-process fake scraper;
//! `http_scraper_tests` runs the HTTP scraper against wiremock servers with
//! a SQLite store on disk.

mod capture_tests;
