//! Tests for builders

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use command_scheduler::builders::{pause, run_until, CommandBuilder, SchedulerBuilder};
use command_scheduler::config::SchedulerConfig;
use command_scheduler::core::{leaf, sequential, AuditEvent, Command, CommandState, Requirement};

#[test]
fn test_command_builder_callbacks_run_in_order() {
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let (a, b, c) = (Arc::clone(&order), Arc::clone(&order), Arc::clone(&order));
    let (mut scheduler, sink) = {
        let (builder, sink) = SchedulerBuilder::new(SchedulerConfig::default()).with_in_memory_audit();
        (builder.build().unwrap(), sink)
    };

    scheduler
        .submit(
            CommandBuilder::new("ordered")
                .on_initialize(move || {
                    a.lock().push("initialize");
                    Ok(())
                })
                .on_execute(move || {
                    b.lock().push("execute");
                    Ok(true)
                })
                .on_end(move || {
                    c.lock().push("end");
                    Ok(())
                })
                .build(),
        )
        .unwrap();
    scheduler.step(0);

    assert_eq!(*order.lock(), ["initialize", "execute", "end"]);
    assert_eq!(
        sink.states_of("ordered"),
        [
            CommandState::Running,
            CommandState::Finished,
            CommandState::Finalized
        ]
    );
}

#[test]
fn test_command_builder_interrupted_on_error() {
    let interrupted = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&interrupted);
    let mut scheduler = SchedulerBuilder::new(SchedulerConfig::default())
        .build()
        .unwrap();

    let handle = scheduler
        .submit(
            CommandBuilder::new("flaky")
                .on_execute(|| Err(anyhow!("sensor unplugged")))
                .on_interrupted(move || {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .build(),
        )
        .unwrap();
    scheduler.step(0);

    assert_eq!(interrupted.load(Ordering::SeqCst), 1);
    assert!(handle.is_finished());
}

#[test]
fn test_command_builder_properties() {
    let arm = Requirement::new("arm");
    let cmd = CommandBuilder::new("grip")
        .requires(arm.clone())
        .timeout(Duration::from_millis(40))
        .not_interruptible()
        .build();
    assert_eq!(cmd.name(), "grip");
    assert_eq!(cmd.timeout(), Duration::from_millis(40));
    assert_eq!(cmd.requirements(), vec![arm]);
    assert!(!cmd.is_interruptible());
}

#[test]
fn test_run_until_stops_when_condition_holds() {
    let polls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&polls);
    let mut scheduler = SchedulerBuilder::new(SchedulerConfig::default())
        .build()
        .unwrap();
    let handle = scheduler
        .submit(run_until("settle", Duration::from_secs(10), move || {
            counter.fetch_add(1, Ordering::SeqCst) + 1 >= 4
        }))
        .unwrap();

    for tick in 0..10 {
        scheduler.step(tick);
    }
    assert_eq!(polls.load(Ordering::SeqCst), 4);
    assert!(handle.is_finished());
}

#[test]
fn test_run_until_times_out() {
    let mut scheduler = SchedulerBuilder::new(SchedulerConfig::default())
        .build()
        .unwrap();
    let handle = scheduler
        .submit(run_until("never", Duration::from_millis(100), || false))
        .unwrap();

    scheduler.step(0);
    scheduler.step(99);
    assert!(!handle.is_finished());
    scheduler.step(100);
    assert!(handle.is_finished());
}

#[test]
fn test_pause_in_sequence() {
    let (builder, sink) = SchedulerBuilder::new(SchedulerConfig::default()).with_in_memory_audit();
    let mut scheduler = builder.build().unwrap();
    scheduler
        .submit(sequential([
            leaf(pause(Duration::from_millis(50))),
            leaf(CommandBuilder::new("after").build()),
        ]))
        .unwrap();

    scheduler.step(0);
    scheduler.step(49);
    assert!(sink.states_of("after").is_empty());
    scheduler.step(50); // pause times out
    scheduler.step(51);
    assert_eq!(sink.states_of("after").last(), Some(&CommandState::Finalized));
    assert!(scheduler.is_empty());
}

#[test]
fn test_scheduler_builder_with_custom_sink() {
    let count = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&count);
    let mut scheduler = SchedulerBuilder::new(SchedulerConfig::default())
        .with_audit(move |_event: AuditEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    scheduler.submit(CommandBuilder::new("one").build()).unwrap();
    scheduler.step(0);
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[test]
fn test_scheduler_builder_honours_max_pending() {
    let cfg = SchedulerConfig {
        max_pending: 2,
        ..SchedulerConfig::default()
    };
    let scheduler = SchedulerBuilder::new(cfg).build().unwrap();
    scheduler.submit(CommandBuilder::new("a").build()).unwrap();
    scheduler.submit(CommandBuilder::new("b").build()).unwrap();
    assert!(scheduler.submit(CommandBuilder::new("c").build()).is_err());
}
