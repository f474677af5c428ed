//! Property tests for timing and artifact-naming guarantees.

use chrono::TimeZone;
use proptest::prelude::*;
use sondar::{screenshot_filename, PollOptions, Poller};
use std::time::{Duration, Instant};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// The poller always terminates within its budget plus one interval of
    /// slack, however hopeless the predicate.
    #[test]
    fn poller_terminates_within_budget(timeout_ms in 0u64..120, interval_ms in 1u64..30) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let start = Instant::now();
        let result = runtime.block_on(async {
            let poller = Poller::new();
            let options = PollOptions::new()
                .with_timeout(timeout_ms)
                .with_interval(interval_ms);
            poller.wait_until(|| async { Ok(false) }, &options).await
        });
        prop_assert!(result.is_err());
        let slack = Duration::from_millis(timeout_ms + interval_ms + 200);
        prop_assert!(start.elapsed() < slack);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Distinct capture times always yield distinct, chronologically
    /// sortable filenames for the same label.
    #[test]
    fn screenshot_names_distinct_and_sorted(
        secs_a in 0i64..2_000_000_000,
        secs_b in 0i64..2_000_000_000,
        millis_a in 0u32..1000,
        millis_b in 0u32..1000,
    ) {
        prop_assume!((secs_a, millis_a) != (secs_b, millis_b));
        let at_a = chrono::Utc.timestamp_opt(secs_a, millis_a * 1_000_000).unwrap();
        let at_b = chrono::Utc.timestamp_opt(secs_b, millis_b * 1_000_000).unwrap();
        let name_a = screenshot_filename("landing", at_a);
        let name_b = screenshot_filename("landing", at_b);
        prop_assert_ne!(&name_a, &name_b);
        prop_assert_eq!(at_a < at_b, name_a < name_b);
        prop_assert!(!name_a.contains(':'));
    }
}
