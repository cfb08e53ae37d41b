use talkback::audio::mock::MockOutput;
use talkback::audio::{AudioFrame, PLAYBACK_SAMPLE_RATE};
use talkback::engine::playback::PlaybackScheduler;

fn frame(seconds: f64) -> AudioFrame {
    let samples = (PLAYBACK_SAMPLE_RATE as f64 * seconds) as usize;
    AudioFrame::new(vec![0.1; samples], PLAYBACK_SAMPLE_RATE, 1)
}

#[test]
fn test_gapless_back_to_back_scheduling() {
    let mut scheduler = PlaybackScheduler::new(MockOutput::new());

    scheduler.enqueue(frame(0.25));
    scheduler.enqueue(frame(0.5));
    scheduler.enqueue(frame(0.125));

    let calls = &scheduler.out.scheduled;
    assert_eq!(calls.len(), 3);

    // Segment k starts at the sum of durations of segments 1..k-1
    assert!((calls[0].start - 0.0).abs() < 1e-9);
    assert!((calls[1].start - 0.25).abs() < 1e-9);
    assert!((calls[2].start - 0.75).abs() < 1e-9);

    // No two [start, start+duration) intervals overlap
    for window in calls.windows(2) {
        assert!(
            window[1].start >= window[0].start + window[0].duration - 1e-9,
            "segments overlap: {:?}",
            window
        );
    }

    assert_eq!(scheduler.in_flight_len(), 3);
    assert!(scheduler.is_speaking());
}

#[test]
fn test_idle_catch_up_clamps_to_device_time() {
    let mut scheduler = PlaybackScheduler::new(MockOutput::new());

    let id = scheduler.enqueue(frame(0.25));
    scheduler.on_segment_finished(id);
    assert!(!scheduler.is_speaking(), "idle after last segment finishes");

    // Device clock has moved well past the stale cursor
    scheduler.out.clock = 3.0;
    scheduler.enqueue(frame(0.25));

    let last = scheduler.out.scheduled.last().unwrap();
    assert!(
        (last.start - 3.0).abs() < 1e-9,
        "enqueue after idle must start at now, got {}",
        last.start
    );
    assert!(scheduler.is_speaking());
}

#[test]
fn test_enqueue_ahead_of_device_time_keeps_cursor() {
    let mut scheduler = PlaybackScheduler::new(MockOutput::new());

    scheduler.enqueue(frame(1.0));
    // Clock advances a little, but the cursor is still ahead
    scheduler.out.clock = 0.4;
    scheduler.enqueue(frame(0.5));

    let calls = &scheduler.out.scheduled;
    assert!((calls[1].start - 1.0).abs() < 1e-9, "no overlap with segment 1");
}

#[test]
fn test_reset_stops_everything_and_unsets_cursor() {
    let mut scheduler = PlaybackScheduler::new(MockOutput::new());

    let a = scheduler.enqueue(frame(0.5));
    let b = scheduler.enqueue(frame(0.5));
    assert_eq!(scheduler.in_flight_len(), 2);

    scheduler.reset();

    assert_eq!(scheduler.in_flight_len(), 0);
    assert!(!scheduler.is_speaking());
    assert_eq!(scheduler.cursor(), None, "cursor must be unset, not zero");
    assert!(scheduler.out.stopped.contains(&a));
    assert!(scheduler.out.stopped.contains(&b));

    // Next enqueue computes its start from the device clock, not the
    // pre-reset cursor
    scheduler.out.clock = 0.2;
    scheduler.enqueue(frame(0.25));
    let last = scheduler.out.scheduled.last().unwrap();
    assert!((last.start - 0.2).abs() < 1e-9);
}

#[test]
fn test_reset_after_natural_completion_is_a_no_op_stop() {
    let mut scheduler = PlaybackScheduler::new(MockOutput::new());

    let id = scheduler.enqueue(frame(0.25));
    scheduler.on_segment_finished(id);

    // The segment already finished; reset must not fail and must not try
    // to stop it again
    scheduler.reset();
    assert!(scheduler.out.stopped.is_empty());
    assert_eq!(scheduler.cursor(), None);
}

#[test]
fn test_speaking_flag_follows_in_flight_set() {
    let mut scheduler = PlaybackScheduler::new(MockOutput::new());
    assert!(!scheduler.is_speaking());

    let a = scheduler.enqueue(frame(0.25));
    let b = scheduler.enqueue(frame(0.25));
    assert!(scheduler.is_speaking());

    scheduler.on_segment_finished(a);
    assert!(scheduler.is_speaking(), "still one segment in flight");

    scheduler.on_segment_finished(b);
    assert!(!scheduler.is_speaking(), "set emptied, playback idle");
}

#[test]
fn test_unknown_completion_is_ignored() {
    let mut scheduler = PlaybackScheduler::new(MockOutput::new());

    let a = scheduler.enqueue(frame(0.25));
    scheduler.on_segment_finished(a);
    // A duplicate completion for the same id must not panic or unbalance
    // anything
    scheduler.on_segment_finished(a);
    assert_eq!(scheduler.in_flight_len(), 0);
}
