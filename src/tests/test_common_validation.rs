use std::time::{Duration, SystemTime};

use crate::{BucketKey, BucketState, LeakyBucketError, WindowDuration};

#[test]
fn window_duration_try_from_validates_min_1ms() {
    let w = WindowDuration::try_from(Duration::from_millis(1)).unwrap();
    assert_eq!(*w, Duration::from_millis(1));
    assert_eq!(w.as_millis(), 1);

    assert_eq!(
        WindowDuration::try_from(Duration::ZERO).unwrap_err(),
        "Window duration must be at least 1 millisecond"
    );
    assert_eq!(
        WindowDuration::try_from(Duration::from_micros(999)).unwrap_err(),
        "Window duration must be at least 1 millisecond"
    );
}

#[test]
fn window_duration_try_from_rejects_oversized_windows() {
    let w = WindowDuration::try_from(WindowDuration::MAX).unwrap();
    assert_eq!(w.as_millis(), i64::MAX as u64);

    assert_eq!(
        WindowDuration::try_from(WindowDuration::MAX + Duration::from_millis(1)).unwrap_err(),
        "Window duration must not exceed i64::MAX milliseconds"
    );
    assert_eq!(
        WindowDuration::try_from(Duration::MAX).unwrap_err(),
        "Window duration must not exceed i64::MAX milliseconds"
    );
}

#[test]
fn window_duration_as_millis_truncates_sub_millisecond_part() {
    let w = WindowDuration::try_from(Duration::from_micros(1500)).unwrap();
    assert_eq!(w.as_millis(), 1);
}

#[test]
fn bucket_key_try_from_validates_length() {
    let k = BucketKey::try_from("user_123").unwrap();
    assert_eq!(k.as_str(), "user_123");
    assert_eq!(k.to_string(), "user_123");

    // Colons are fine; they are how callers namespace their own keys.
    assert!(BucketKey::try_from("api:route:/v1/items").is_ok());
    assert!(BucketKey::try_from("a".repeat(255)).is_ok());

    assert!(matches!(
        BucketKey::try_from(""),
        Err(LeakyBucketError::InvalidBucketKey(_))
    ));
    assert!(matches!(
        BucketKey::try_from("a".repeat(256)),
        Err(LeakyBucketError::InvalidBucketKey(_))
    ));
}

#[test]
fn retry_after_is_zero_once_reset_passed() {
    let past = BucketState {
        capacity: 1,
        remaining: 0,
        reset: SystemTime::now() - Duration::from_secs(1),
    };
    assert_eq!(past.retry_after(), Duration::ZERO);

    let future = BucketState {
        reset: SystemTime::now() + Duration::from_secs(10),
        ..past
    };
    assert!(future.retry_after() > Duration::from_secs(9));
}

#[test]
fn reset_after_saturates_instead_of_overflowing() {
    let now = SystemTime::now();

    assert_eq!(
        crate::common::reset_after(now, Duration::from_secs(1)),
        now + Duration::from_secs(1)
    );
    assert!(crate::common::reset_after(now, Duration::MAX) > now);
}

#[test]
fn bucket_full_error_reports_remaining() {
    let state = BucketState {
        capacity: 10,
        remaining: 6,
        reset: SystemTime::now(),
    };
    let err = LeakyBucketError::BucketFull(state);

    assert!(err.is_full());
    assert_eq!(err.state(), Some(&state));
    assert_eq!(err.to_string(), "bucket is full (6 of 10 remaining)");
    assert!(!LeakyBucketError::Cancelled.is_full());
    assert_eq!(LeakyBucketError::Cancelled.state(), None);
}
