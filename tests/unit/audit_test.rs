//! Tests for audit sink

use std::sync::Arc;

use command_scheduler::core::{
    build_audit_event, AuditEvent, AuditSink, CommandState, InMemoryAuditSink,
};
use command_scheduler::config::SchedulerConfig;
use parking_lot::Mutex;

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(7, "raise", CommandState::Running, 100);
    sink.record(event.clone());
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0], event);
    assert_eq!(events[0].runner, 7);
    assert_eq!(events[0].command, "raise");
    assert_eq!(events[0].at_ms, 100);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event(1, "a", CommandState::Running, 0));
    sink.record(build_audit_event(2, "b", CommandState::Running, 1));
    sink.record(build_audit_event(3, "c", CommandState::Running, 2));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].runner, 2); // First one popped
    assert_eq!(events[1].runner, 3);
}

#[test]
fn test_zero_capacity_records_nothing() {
    let cfg = SchedulerConfig {
        audit_capacity: 0,
        ..SchedulerConfig::default()
    };
    let mut sink = InMemoryAuditSink::from_config(&cfg);
    sink.record(build_audit_event(1, "a", CommandState::Finished, 0));
    assert!(sink.events().is_empty());
}

#[test]
fn test_clones_share_buffer() {
    let reader = InMemoryAuditSink::new(8);
    let mut writer = reader.clone();
    writer.record(build_audit_event(1, "a", CommandState::Running, 0));
    writer.record(build_audit_event(1, "a", CommandState::Finished, 1));
    writer.record(build_audit_event(2, "b", CommandState::Interrupted, 1));
    writer.record(build_audit_event(1, "a", CommandState::Finalized, 1));

    assert_eq!(
        reader.states_of("a"),
        [
            CommandState::Running,
            CommandState::Finished,
            CommandState::Finalized
        ]
    );
    assert_eq!(reader.states_of("b"), [CommandState::Interrupted]);

    reader.clear();
    assert!(writer.events().is_empty());
}

#[test]
fn test_closure_sink() {
    let seen: Arc<Mutex<Vec<AuditEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&seen);
    let mut sink = move |event: AuditEvent| captured.lock().push(event);

    sink.record(build_audit_event(4, "x", CommandState::Interrupted, 9));
    assert_eq!(seen.lock().len(), 1);
    assert_eq!(seen.lock()[0].state, CommandState::Interrupted);
}

#[test]
fn test_audit_event_serializes() {
    let event = build_audit_event(3, "lower", CommandState::Finalized, 42);
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["runner"], 3);
    assert_eq!(json["command"], "lower");
    assert_eq!(json["state"], "finalized");
    assert_eq!(json["at_ms"], 42);
}
