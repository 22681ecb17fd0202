//! Tests for error types

use command_scheduler::core::{AppResult, SchedulerError};

#[test]
fn test_error_display() {
    assert_eq!(
        SchedulerError::QueueFull(8).to_string(),
        "pending queue full: 8 submissions waiting"
    );
    assert_eq!(
        SchedulerError::ShutDown.to_string(),
        "scheduler has been shut down"
    );
    assert_eq!(
        SchedulerError::InvalidConfig("max_pending must be greater than 0".into()).to_string(),
        "invalid configuration: max_pending must be greater than 0"
    );
    assert_eq!(
        SchedulerError::Driver("boom".into()).to_string(),
        "driver error: boom"
    );
}

#[test]
fn test_error_converts_into_app_result() {
    fn reject() -> Result<(), SchedulerError> {
        Err(SchedulerError::ShutDown)
    }

    fn submit() -> AppResult<()> {
        reject()?;
        Ok(())
    }

    let err = submit().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SchedulerError>(),
        Some(SchedulerError::ShutDown)
    ));
}
