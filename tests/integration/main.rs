//! Integration tests (require external services, run with `cargo test -- --ignored`)

mod api_tests;
mod ledger_tests;
