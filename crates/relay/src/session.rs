//! Contains [Session], which runs a [ProducerLoop] and a [ConsumerLoop]
//! against each other for one stream.

use std::thread;
use std::time::{Duration, Instant};

use crate::clock::{Clock, MonotonicClock};
use crate::consumer::{ConsumerLoop, ConsumerReport};
use crate::error::{ConfigError, RelayError, SinkError};
use crate::pacing::{PacingMode, PacingPolicy};
use crate::pipeline::{Decoder, Filter, OutputSink, Region};
use crate::producer::{ProducerLoop, ProducerReport};
use crate::slot::FrameSlot;

/// How a [Session] should play its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub pacing: PacingMode,
    /// Where on the output frames are drawn.
    pub region: Region,
}

/// What happened during a [Session].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub producer: ProducerReport,
    pub consumer: ConsumerReport,
    pub elapsed: Duration,
}

/// One playback of one stream: a producer on the calling thread, a consumer on
/// a scoped thread of its own, and a [FrameSlot] between them.
pub struct Session<C = MonotonicClock> {
    config: SessionConfig,
    clock: C,
    should_stop: Option<Box<dyn Fn() -> bool + Send>>,
}

impl Session<MonotonicClock> {
    /// A session paced by the real clock.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, MonotonicClock::new())
    }
}

impl<C: Clock> Session<C> {
    pub fn with_clock(config: SessionConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            should_stop: None,
        }
    }

    /// See [ProducerLoop::with_stop_check].
    pub fn with_stop_check(mut self, should_stop: impl Fn() -> bool + Send + 'static) -> Self {
        self.should_stop = Some(Box::new(should_stop));
        self
    }

    /// Play the stream from `decoder` through `filter` onto `sink`, returning
    /// once the stream has ended (or failed) and both threads are finished.
    ///
    /// The sink stays owned by the caller. It is only touched from the
    /// consumer thread while this runs.
    ///
    /// When both sides fail, the error that started it wins: a producer error
    /// unless it's only the [RelayError::Cancelled] echo of a sink failure.
    pub fn run<D, F, S>(self, decoder: D, filter: F, sink: &mut S) -> Result<SessionReport, RelayError>
    where
        D: Decoder,
        F: Filter<Input = D::Frame>,
        S: OutputSink + Send,
    {
        let Self {
            config,
            clock,
            should_stop,
        } = self;

        check_stream(&decoder)?;

        let mut producer = ProducerLoop::new(decoder, filter, PacingPolicy::new(clock, config.pacing));
        if let Some(should_stop) = should_stop {
            producer = producer.with_stop_check(should_stop);
        }
        let consumer = ConsumerLoop::new(sink, config.region);

        util::debug_log_info!(
            "Starting session ({:?}) into region {}.",
            config.pacing,
            config.region
        );

        let slot = FrameSlot::new();
        let started = Instant::now();

        let (producer_result, consumer_result) = thread::scope(|s| {
            let slot = &slot;
            let consumer = thread::Builder::new()
                .name("relay-consumer".to_owned())
                .spawn_scoped(s, move || consumer.run(slot));

            let consumer = match consumer {
                Ok(consumer) => consumer,
                Err(e) => {
                    util::debug_log_error!("Failed to spawn the consumer thread: {e}");
                    slot.close();
                    return (Err(RelayError::SpawnConsumer(e)), Err(()));
                }
            };

            let producer_result = producer.run(slot);
            let consumer_result = consumer.join().map_err(|_| ());

            (producer_result, consumer_result)
        });

        merge_results(producer_result, consumer_result, started.elapsed())
    }
}

/// Refuse streams the relay can't pace or show before any thread starts.
fn check_stream<D: Decoder>(decoder: &D) -> Result<(), ConfigError> {
    let info = decoder.stream_info();

    if info.width == 0 || info.height == 0 {
        return Err(ConfigError::EmptyVideo {
            width: info.width,
            height: info.height,
        });
    }
    if !info.time_base.is_valid() || info.time_base.den < 0 {
        return Err(ConfigError::InvalidTimeBase(info.time_base));
    }

    Ok(())
}

/// A consumer that panicked is `Err(())`.
type ConsumerResult = Result<Result<ConsumerReport, SinkError>, ()>;

/// Combine what both sides returned into one result for the caller.
fn merge_results(
    producer_result: Result<ProducerReport, RelayError>,
    consumer_result: ConsumerResult,
    elapsed: Duration,
) -> Result<SessionReport, RelayError> {
    match (producer_result, consumer_result) {
        (Ok(producer), Ok(Ok(consumer))) => {
            let report = SessionReport {
                producer,
                consumer,
                elapsed,
            };
            util::debug_log_info!("Session finished: {report:?}");
            Ok(report)
        }

        (Err(e), _) if !e.is_cancelled() => Err(e),
        (_, Err(())) => Err(RelayError::ConsumerPanicked),
        (_, Ok(Err(e))) => Err(e.into()),
        (Err(e), Ok(Ok(_))) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::time::Duration;

    use super::*;
    use crate::error::DecodeError;
    use crate::test_support::{FakeFilter, RecordingSink, ScriptedDecoder, TEST_REGION};
    use crate::time::Rational;

    fn config(pacing: PacingMode) -> SessionConfig {
        SessionConfig {
            pacing,
            region: TEST_REGION,
        }
    }

    #[test]
    fn plays_ten_frames_at_source_rate() {
        let decoder = ScriptedDecoder::with_pts((0..10).map(|i| i * 33_000));
        let mut sink = RecordingSink::new();

        let report = Session::new(config(PacingMode::Paced))
            .run(decoder, FakeFilter::passthrough(), &mut sink)
            .unwrap();

        assert_eq!(sink.configured(), Some(TEST_REGION));
        assert_eq!(sink.frame_count(), 10);
        assert_eq!(sink.bytes_received(), 10 * RecordingSink::FRAME_BYTES);
        assert_eq!(sink.frame_markers(), (0..10).collect::<Vec<u8>>());

        let starts = sink.frame_starts();
        for pair in starts.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_millis(30), "Frames only {gap:?} apart.");
        }

        // 9 gaps of 33ms after the first frame, within 10% of the nominal
        // 330ms run.
        assert!(report.elapsed >= Duration::from_millis(297), "{:?}", report.elapsed);
        assert!(report.elapsed <= Duration::from_millis(363), "{:?}", report.elapsed);

        assert_eq!(report.producer.published, 10);
        assert_eq!(report.producer.dropped_late, 0);
        assert_eq!(report.consumer.frames, 10);
    }

    #[test]
    fn slow_sink_sees_only_the_latest_frames() {
        let decoder = ScriptedDecoder::with_pts((0..10).map(|i| i * 33_000));
        let mut sink = RecordingSink::new().with_frame_delay(Duration::from_millis(100));

        let report = Session::new(config(PacingMode::Paced))
            .run(decoder, FakeFilter::passthrough(), &mut sink)
            .unwrap();

        let markers = sink.frame_markers();
        assert!(markers.len() < 10, "Expected frames to be skipped: {markers:?}");
        assert!(markers.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(markers.last(), Some(&9));
        assert_eq!(report.producer.published, 10);
        assert_eq!(report.consumer.frames, markers.len() as u64);
    }

    #[test]
    fn unpaced_session_shows_the_last_frame() {
        let decoder = ScriptedDecoder::with_pts((0..50).map(|i| i * 1_000_000));
        let mut sink = RecordingSink::new();

        let started = Instant::now();
        let report = Session::new(config(PacingMode::Unpaced))
            .run(decoder, FakeFilter::passthrough(), &mut sink)
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(report.producer.published, 50);
        assert_eq!(sink.frame_markers().last(), Some(&49));
    }

    #[test]
    fn decode_error_stops_both_threads() {
        let decoder = ScriptedDecoder::with_pts((0..10).map(|i| i * 1_000)).failing_after(3);
        let mut sink = RecordingSink::new();

        let result = Session::new(config(PacingMode::Unpaced)).run(
            decoder,
            FakeFilter::passthrough(),
            &mut sink,
        );

        assert!(matches!(result, Err(RelayError::Decode(DecodeError::Decode(_)))));
        assert!(sink.frame_count() <= 3);
    }

    #[test]
    fn sink_error_wins_over_the_cancelled_producer() {
        let decoder = ScriptedDecoder::with_pts((0..1_000).map(|i| i * 33_000));
        let mut sink = RecordingSink::new().failing_after(2);

        let started = Instant::now();
        let result = Session::new(config(PacingMode::Paced)).run(
            decoder,
            FakeFilter::passthrough(),
            &mut sink,
        );

        assert!(matches!(result, Err(RelayError::Sink(SinkError::Transmit(_)))));
        assert_eq!(sink.frame_count(), 2);
        // The producer noticed and stopped long before the 33s stream ended.
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn stop_check_ends_the_session() {
        let decoder = ScriptedDecoder::with_pts((0..1_000).map(|i| i * 33_000));
        let mut sink = RecordingSink::new();

        let started = Instant::now();
        let result = Session::new(config(PacingMode::Paced))
            .with_stop_check(move || started.elapsed() > Duration::from_millis(100))
            .run(decoder, FakeFilter::passthrough(), &mut sink);

        assert!(matches!(result, Err(RelayError::Cancelled)));
        assert!(sink.frame_count() > 0);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn unusable_time_base_is_refused_before_starting() {
        let decoder = ScriptedDecoder::with_pts([0, 1, 2]).with_time_base(Rational::new(1, 0));
        let mut sink = RecordingSink::new();

        let result = Session::new(config(PacingMode::Paced)).run(
            decoder,
            FakeFilter::passthrough(),
            &mut sink,
        );

        assert!(matches!(
            result,
            Err(RelayError::Config(ConfigError::InvalidTimeBase(tb))) if tb == Rational::new(1, 0)
        ));
        assert_eq!(sink.configured(), None);
        assert_eq!(sink.frame_count(), 0);
    }

    #[test]
    fn spawn_failure_is_reported_as_such() {
        let spawn_error = io::Error::new(io::ErrorKind::OutOfMemory, "no threads left");

        let result = merge_results(
            Err(RelayError::SpawnConsumer(spawn_error)),
            Err(()),
            Duration::ZERO,
        );

        assert!(matches!(
            result,
            Err(RelayError::SpawnConsumer(e)) if e.kind() == io::ErrorKind::OutOfMemory
        ));
    }

    #[test]
    fn consumer_panic_beats_a_cancelled_producer() {
        let result = merge_results(Err(RelayError::Cancelled), Err(()), Duration::ZERO);
        assert!(matches!(result, Err(RelayError::ConsumerPanicked)));
    }
}
