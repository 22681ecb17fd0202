//! Unit tests for individual components

mod audit_test;
mod builders_test;
mod error_test;
mod util_test;
