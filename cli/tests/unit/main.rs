//! Unit tests for the deckhand CLI
//!
//! These tests use mocked dependencies and run fast without external I/O.

mod mocks;

mod architecture;
mod build_logs_service;
mod pipeline_status_service;
mod property_tests;
