//! Tests for utility functions

use command_scheduler::util::{init_tracing, init_tracing_with, now_ms};

#[test]
fn test_now_ms_advances() {
    let a = now_ms();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let b = now_ms();
    assert!(a > 0);
    assert!(b > a);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing_with("debug");
    init_tracing();
    init_tracing();
}
