//! Scenario tests for the live standings loop.
//!
//! Each test plays the simulator through a [`TelemetryFixture`] and records
//! every snapshot the loop posts. A per-post hook lets a test change the
//! simulator's state between ticks, the way the real writer would while the
//! loop sleeps.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::decoder::DecoderConfig;
use crate::region::SignalMode;
use crate::test_utils::{RegionBuilder, SAMPLE_SESSION_YAML, TelemetryFixture};
use crate::types::VariableType;

type Hook = Box<dyn FnMut(usize) + Send>;

/// Records every post. `fail_on` lists 1-based post numbers that fail.
struct RecordingSink {
    posts: Vec<LivePositions>,
    fail_on: Vec<usize>,
    after_post: Hook,
}

impl RecordingSink {
    fn new() -> Self {
        Self { posts: Vec::new(), fail_on: Vec::new(), after_post: Box::new(|_| {}) }
    }

    fn after_post(mut self, hook: impl FnMut(usize) + Send + 'static) -> Self {
        self.after_post = Box::new(hook);
        self
    }

    fn failing_on(mut self, posts: &[usize]) -> Self {
        self.fail_on = posts.to_vec();
        self
    }
}

#[async_trait]
impl StandingsSink for RecordingSink {
    async fn post(&mut self, positions: &LivePositions) -> Result<()> {
        self.posts.push(positions.clone());
        let count = self.posts.len();
        (self.after_post)(count);
        if self.fail_on.contains(&count) {
            return Err(TelemetryError::sink_failed(format!("post {} rejected", count)));
        }
        Ok(())
    }
}

fn config() -> LiveSessionConfig {
    LiveSessionConfig {
        poll_timeout: Duration::from_millis(10),
        post_interval: Duration::ZERO,
        redact: false,
    }
}

fn racing_fixture() -> TelemetryFixture {
    let fixture = RegionBuilder::standings().signal_mode(SignalMode::AlwaysReady).build();
    fixture.set_i32("SessionNum", 1);
    fixture.set_i32("SessionState", 4);
    fixture.set_i32s("CarIdxClassPosition", &[0, 2, 6, 13, 9, 1]);
    fixture.set_i32s("CarIdxLapCompleted", &[0, 5, 6, 7, 3, 8]);
    fixture
}

fn session_for(fixture: &TelemetryFixture, sink: RecordingSink) -> LiveSession<RecordingSink> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let decoder = TelemetryDecoder::new(fixture.region(), DecoderConfig::default());
    LiveSession::new(decoder, sink, config())
}

fn cool_down_after(fixture: &TelemetryFixture, post: usize) -> impl FnMut(usize) + Send + 'static {
    let fixture = fixture.clone();
    move |count| {
        if count == post {
            fixture.set_i32("SessionState", 6);
        }
    }
}

#[tokio::test]
async fn racing_then_cool_down_posts_standings_then_final_report() {
    let fixture = racing_fixture();
    let sink = RecordingSink::new().after_post(cool_down_after(&fixture, 1));
    let mut live = session_for(&fixture, sink);
    assert_eq!(live.phase(), Phase::Idle);

    live.run(CancellationToken::new()).await.unwrap();
    assert_eq!(live.phase(), Phase::Terminated);

    let posts = &live.sink().posts;
    assert_eq!(posts.len(), 2);

    let standings = &posts[0];
    assert!(!standings.is_final());
    let weekend = standings.weekend.as_ref().unwrap();
    assert_eq!(weekend.track_id, 127);
    assert_eq!(weekend.sub_session_id, 4242);
    assert_eq!(standings.session.session_state, "Racing");
    assert_eq!(standings.session.session_type, "Race");

    let merged: Vec<(i32, i32, i32)> = standings
        .drivers
        .iter()
        .map(|d| (d.car_idx, d.class_position, d.laps_completed))
        .collect();
    // pace car (0), spectator (3) and AI (4) are filtered out
    assert_eq!(merged, vec![(1, 2, 5), (2, 6, 6), (5, 1, 8)]);

    let last = &posts[1];
    assert!(last.is_final());
    assert_eq!(last.session.session_state, "Cool Down");
    assert_eq!(last.session.session_name, "RACE");
    assert!(last.session.error_text.is_empty());
}

#[tokio::test]
async fn unchanged_version_only_merges_positions() {
    let fixture = racing_fixture();
    let writer = fixture.clone();
    let sink = RecordingSink::new().after_post(move |count| match count {
        1 => {
            // New names under the same version must not be picked up
            writer.set_session_yaml(&SAMPLE_SESSION_YAML.replace("Jane Doe", "Janet Doe"), 1);
            writer.set_i32s("CarIdxClassPosition", &[0, 1, 2, 0, 0, 3]);
        }
        2 => writer.set_i32("SessionState", 6),
        _ => {}
    });
    let mut live = session_for(&fixture, sink);

    live.run(CancellationToken::new()).await.unwrap();

    let posts = &live.sink().posts;
    assert_eq!(posts.len(), 3);
    let second = &posts[1].drivers;
    assert_eq!(second[1].user_name, "Jane Doe");
    let positions: Vec<i32> = second.iter().map(|d| d.class_position).collect();
    assert_eq!(positions, vec![1, 2, 3]);
}

#[tokio::test]
async fn version_change_rebuilds_drivers_fresh() {
    let fixture = racing_fixture();
    let writer = fixture.clone();
    let sink = RecordingSink::new().after_post(move |count| match count {
        1 => {
            let without_last = SAMPLE_SESSION_YAML
                .split(" - CarIdx: 5")
                .next()
                .unwrap_or_default()
                .replace("Jane Doe", "Janet Doe");
            writer.set_session_yaml(&without_last, 2);
        }
        2 => writer.set_i32("SessionState", 6),
        _ => {}
    });
    let mut live = session_for(&fixture, sink);

    live.run(CancellationToken::new()).await.unwrap();

    let posts = &live.sink().posts;
    assert_eq!(posts.len(), 3);
    let names: Vec<&str> = posts[1].drivers.iter().map(|d| d.user_name.as_str()).collect();
    assert_eq!(names, vec!["O'Connor, Mike", "Janet Doe"]);
    // positions are merged into the rebuilt set on the same tick
    assert_eq!(posts[1].drivers[0].class_position, 2);
}

#[tokio::test]
async fn missing_session_state_is_fatal_with_one_final_report() {
    let fixture = RegionBuilder::new()
        .variable("SessionNum", VariableType::Int32, 1)
        .signal_mode(SignalMode::AlwaysReady)
        .build();
    let mut live = session_for(&fixture, RecordingSink::new());

    let err = live.run(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, TelemetryError::NotFound { .. }));

    let posts = &live.sink().posts;
    assert_eq!(posts.len(), 1);
    assert!(posts[0].is_final());
    assert_eq!(posts[0].session.session_state, "Invalid");
    assert!(posts[0].session.error_text.starts_with("Can not determine SessionState"));
}

#[tokio::test]
async fn missing_session_num_is_fatal() {
    let fixture = RegionBuilder::new()
        .variable("SessionState", VariableType::Int32, 1)
        .signal_mode(SignalMode::AlwaysReady)
        .build();
    let mut live = session_for(&fixture, RecordingSink::new());

    assert!(live.run(CancellationToken::new()).await.is_err());

    let posts = &live.sink().posts;
    assert_eq!(posts.len(), 1);
    assert!(posts[0].session.error_text.starts_with("Can not determine SessionNum"));
}

#[tokio::test]
async fn simulator_not_running_is_fatal() {
    let fixture = RegionBuilder::standings()
        .connected(false)
        .signal_mode(SignalMode::AlwaysReady)
        .build();
    let mut live = session_for(&fixture, RecordingSink::new());

    let err = live.run(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, TelemetryError::NotFound { .. }));
    assert_eq!(live.sink().posts.len(), 1);
    assert!(!live.session().error_text.is_empty());
}

#[tokio::test]
async fn missing_position_array_is_fatal() {
    let fixture = RegionBuilder::new()
        .variable("SessionNum", VariableType::Int32, 1)
        .variable("SessionState", VariableType::Int32, 1)
        .variable("CarIdxLapCompleted", VariableType::Int32, 64)
        .signal_mode(SignalMode::AlwaysReady)
        .build();
    fixture.set_i32("SessionState", 4);
    let mut live = session_for(&fixture, RecordingSink::new());

    assert!(live.run(CancellationToken::new()).await.is_err());

    let posts = &live.sink().posts;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].session.session_state, "Invalid");
    assert!(posts[0].session.error_text.contains("CarIdxClassPosition"));
}

#[tokio::test]
async fn invalid_state_skips_without_posting() {
    let fixture = racing_fixture();
    fixture.set_i32("SessionState", 0);
    let mut live = session_for(&fixture, RecordingSink::new());

    assert!(matches!(live.tick().await, TickOutcome::Skip));
    assert!(matches!(live.tick().await, TickOutcome::Skip));
    assert_eq!(live.phase(), Phase::Active);
    assert!(live.sink().posts.is_empty());
    assert_eq!(live.session().session_state, "Invalid");

    // unmapped codes behave the same
    fixture.set_i32("SessionState", 42);
    assert!(matches!(live.tick().await, TickOutcome::Skip));

    fixture.set_i32("SessionState", 1);
    assert!(matches!(live.tick().await, TickOutcome::Continue));
    assert_eq!(live.sink().posts.len(), 1);
    assert_eq!(live.sink().posts[0].session.session_state, "Get In Car");
}

#[tokio::test]
async fn mid_loop_post_failure_is_not_fatal() {
    let fixture = racing_fixture();
    let sink = RecordingSink::new().failing_on(&[1]).after_post(cool_down_after(&fixture, 1));
    let mut live = session_for(&fixture, sink);

    live.run(CancellationToken::new()).await.unwrap();

    let posts = &live.sink().posts;
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[1].session.session_state, "Cool Down");
    assert!(posts[1].session.error_text.starts_with("Can not post standings"));
}

#[tokio::test]
async fn final_post_failure_is_returned() {
    let fixture = racing_fixture();
    let sink = RecordingSink::new().failing_on(&[2]).after_post(cool_down_after(&fixture, 1));
    let mut live = session_for(&fixture, sink);

    let err = live.run(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, TelemetryError::Sink { .. }));
    assert_eq!(live.sink().posts.len(), 2);
}

#[tokio::test]
async fn cancellation_ends_with_final_report() {
    let fixture = racing_fixture();
    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    let sink = RecordingSink::new().after_post(move |count| {
        if count == 1 {
            stop.cancel();
        }
    });
    let mut live = session_for(&fixture, sink);

    live.run(cancel).await.unwrap();

    let posts = &live.sink().posts;
    assert_eq!(posts.len(), 2);
    assert!(posts[1].is_final());
    assert_eq!(posts[1].session.session_state, "Racing");
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_post_interval() {
    let fixture = racing_fixture();
    let decoder = TelemetryDecoder::new(fixture.region(), DecoderConfig::default());
    let config = LiveSessionConfig { post_interval: Duration::from_secs(3600), ..config() };
    let mut live = LiveSession::new(decoder, RecordingSink::new(), config);

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        stop.cancel();
    });

    live.run(cancel).await.unwrap();
    assert_eq!(live.sink().posts.len(), 2);
}

#[tokio::test]
async fn cancelled_before_start_posts_only_the_final_report() {
    let fixture = racing_fixture();
    let mut live = session_for(&fixture, RecordingSink::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    live.run(cancel).await.unwrap();

    assert_eq!(live.sink().posts.len(), 1);
    assert!(live.sink().posts[0].is_final());
}

#[tokio::test]
async fn redaction_hides_driver_names() {
    let fixture = racing_fixture();
    let sink = RecordingSink::new().after_post(cool_down_after(&fixture, 1));
    let decoder = TelemetryDecoder::new(fixture.region(), DecoderConfig::default());
    let mut live = LiveSession::new(decoder, sink, LiveSessionConfig { redact: true, ..config() });

    live.run(CancellationToken::new()).await.unwrap();

    let names: Vec<&str> = live.sink().posts[0].drivers.iter().map(|d| d.user_name.as_str()).collect();
    assert_eq!(names, vec!["Driver 1", "Driver 2", "Driver 5"]);
}

#[tokio::test]
async fn terminated_session_cannot_run_again() {
    let fixture = racing_fixture();
    fixture.set_i32("SessionState", 6);
    let mut live = session_for(&fixture, RecordingSink::new());

    live.run(CancellationToken::new()).await.unwrap();
    assert_eq!(live.sink().posts.len(), 1);

    assert!(live.run(CancellationToken::new()).await.is_err());
    assert_eq!(live.into_sink().posts.len(), 1);
}

#[tokio::test]
async fn recoverable_decode_error_skips_one_tick() {
    let fixture = racing_fixture();
    let mut live = session_for(&fixture, RecordingSink::new());
    assert!(matches!(live.tick().await, TickOutcome::Continue));

    // one sample with buffer 0 pointing past the region
    let good_offset = fixture.buffer_offsets()[0] as i32;
    fixture.set_header_field(52, fixture.region_len() as i32);
    assert!(matches!(live.tick().await, TickOutcome::Skip));
    assert!(live.session().error_text.is_empty());
    assert_eq!(live.phase(), Phase::Active);

    fixture.set_header_field(52, good_offset);
    assert!(matches!(live.tick().await, TickOutcome::Continue));

    let posts = &live.sink().posts;
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[1].session.session_state, "Racing");
    assert_eq!(posts[1].drivers.len(), 3);
}

#[tokio::test]
async fn decode_glitch_during_run_does_not_end_the_broadcast() {
    let fixture = racing_fixture();
    let writer = fixture.clone();
    let good_offset = fixture.buffer_offsets()[0] as i32;
    let corrupt_at = fixture.region_len() as i32;
    let sink = RecordingSink::new().after_post(move |count| {
        if count == 1 {
            writer.set_header_field(52, corrupt_at);
        }
    });
    let mut live = session_for(&fixture, sink);

    assert!(matches!(live.tick().await, TickOutcome::Continue));
    assert!(matches!(live.tick().await, TickOutcome::Skip));

    fixture.set_header_field(52, good_offset);
    fixture.set_i32("SessionState", 6);
    live.run(CancellationToken::new()).await.unwrap();

    let posts = &live.sink().posts;
    assert_eq!(posts.len(), 2);
    assert!(posts[1].is_final());
    assert_eq!(posts[1].session.session_state, "Cool Down");
    assert!(posts[1].session.error_text.is_empty());
}

#[tokio::test]
async fn unsupported_sdk_version_is_fatal() {
    let fixture = racing_fixture();
    let mut live = session_for(&fixture, RecordingSink::new());
    assert!(matches!(live.tick().await, TickOutcome::Continue));

    fixture.set_header_field(0, 3);
    let outcome = live.tick().await;
    assert!(matches!(outcome, TickOutcome::Fail(TelemetryError::Version { found: 3, .. })));
    assert_eq!(live.session().session_state, "Invalid");
    assert!(live.session().error_text.starts_with("Can not read telemetry"));
}
