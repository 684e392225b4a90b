use bytes::Bytes;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use super::data::{
    output_name, percent_saved, CompressionResult, HistoryEntry, Quality, SourceImage,
};
use super::handle::{HandleRegistry, Slot};
use crate::compress::CompressOptions;
use crate::error::{CompressError, SessionError};

/// Where the compression state machine currently is
///
/// `Succeeded` and `Failed` are passed through on the way back to `Idle`;
/// they are observable in [`Session::trail`] but never rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Compressing,
    Succeeded,
    Failed,
}

/// Edges of the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Begin,
    Succeed,
    Fail,
    Settle,
}

impl Phase {
    /// The single transition table
    pub fn next(self, transition: Transition) -> Result<Phase, SessionError> {
        match (self, transition) {
            (Phase::Idle, Transition::Begin) => Ok(Phase::Compressing),
            (Phase::Compressing, Transition::Succeed) => Ok(Phase::Succeeded),
            (Phase::Compressing, Transition::Fail) => Ok(Phase::Failed),
            (Phase::Succeeded | Phase::Failed, Transition::Settle) => Ok(Phase::Idle),
            (from, transition) => Err(SessionError::IllegalTransition { from, transition }),
        }
    }
}

/// Identifies a compression in flight and what it was started from
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: u64,
    pub original_size: u64,
    pub output_name: String,
    pub quality: Quality,
}

/// A compression ready to hand to a [`Compressor`](crate::compress::Compressor)
#[derive(Debug, Clone)]
pub struct Job {
    pub ticket: Ticket,
    pub input: Bytes,
    pub options: CompressOptions,
}

/// What a finished compression did
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Succeeded {
        compressed_size: u64,
        percent_saved: Option<f64>,
    },
    Failed(CompressError),
}

/// All state for one window: source, settings, result, history
///
/// Everything lives in memory and is dropped with the window.
#[derive(Debug)]
pub struct Session {
    registry: HandleRegistry,
    source: Slot<SourceImage>,
    result: Slot<CompressionResult>,
    quality: Quality,
    phase: Phase,
    /// Phases visited by the most recent compression; empty after a reset
    trail: Vec<Phase>,
    last_job: u64,
    /// Most recent first
    history: VecDeque<HistoryEntry>,
    history_visible: bool,
    preview_open: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Quality::default())
    }
}

impl Session {
    pub fn new(quality: Quality) -> Self {
        Self {
            registry: HandleRegistry::new(),
            source: Slot::new("source"),
            result: Slot::new("result"),
            quality,
            phase: Phase::Idle,
            trail: Vec::new(),
            last_job: 0,
            history: VecDeque::new(),
            history_visible: false,
            preview_open: false,
        }
    }

    // ========== Upload ==========

    /// Replace the source image and clear any result derived from the old one
    pub fn select_image(&mut self, name: String, bytes: Vec<u8>) -> Result<(), SessionError> {
        if self.is_compressing() {
            return Err(SessionError::Busy);
        }

        let size = bytes.len() as u64;
        // The display handle shares the buffer with later compress jobs
        let image = SourceImage {
            output_name: output_name(&name),
            handle: self.registry.issue(bytes),
            name,
            size,
        };
        info!("selected {} ({} bytes)", image.name, image.size);

        // A result always belongs to the current source
        self.source.install(image);
        self.result.release();
        self.preview_open = false;
        Ok(())
    }

    // ========== Settings ==========

    /// Clamp and store the quality; never touches an existing result
    pub fn set_quality(&mut self, value: f32) {
        self.quality = Quality::new(value);
    }

    // ========== Compression ==========

    /// Leave `Idle` and describe the compression to run
    pub fn compress(&mut self) -> Result<Job, SessionError> {
        if self.is_compressing() {
            return Err(SessionError::Busy);
        }
        let source = self.source.get().ok_or(SessionError::MissingInput)?;

        // Each job gets a fresh id so late answers can be told apart
        self.last_job += 1;
        let job = Job {
            ticket: Ticket {
                id: self.last_job,
                original_size: source.size,
                output_name: source.output_name.clone(),
                quality: self.quality,
            },
            // Bytes clone is a refcount bump, not a copy
            input: source.handle.bytes().clone(),
            options: CompressOptions::new(self.quality),
        };

        // Start a fresh trail from the current resting phase
        self.trail.clear();
        self.trail.push(self.phase);
        self.step(Transition::Begin)?;
        debug!("job {} started for {}", job.ticket.id, job.ticket.output_name);
        Ok(job)
    }

    /// Apply the compressor's answer for `ticket` and return to `Idle`
    pub fn finish(
        &mut self,
        ticket: Ticket,
        output: Result<Vec<u8>, CompressError>,
    ) -> Result<Outcome, SessionError> {
        // Only the most recently issued job may complete
        if ticket.id != self.last_job {
            return Err(SessionError::StaleCompletion {
                got: ticket.id,
                expected: self.is_compressing().then_some(self.last_job),
            });
        }

        match output {
            Ok(bytes) => {
                self.step(Transition::Succeed)?;

                // Size comes from the bytes actually produced
                let handle = self.registry.issue(bytes);
                let compressed_size = handle.len() as u64;
                let saved = percent_saved(ticket.original_size, compressed_size);
                let result = CompressionResult {
                    output_name: ticket.output_name,
                    original_size: ticket.original_size,
                    compressed_size,
                    percent_saved: saved,
                    quality: ticket.quality,
                    handle,
                };

                // History entry shares the result's buffer; installing drops the old result
                self.history.push_front(HistoryEntry::from_result(&result));
                self.result.install(result);
                self.step(Transition::Settle)?;

                info!(
                    "job {} done: {} -> {} bytes ({:?}% saved)",
                    ticket.id, ticket.original_size, compressed_size, saved
                );
                Ok(Outcome::Succeeded {
                    compressed_size,
                    percent_saved: saved,
                })
            }
            // Previous result and history stay as they were
            Err(err) => {
                self.step(Transition::Fail)?;
                self.step(Transition::Settle)?;
                warn!("job {} failed: {}", ticket.id, err);
                Ok(Outcome::Failed(err))
            }
        }
    }

    fn step(&mut self, transition: Transition) -> Result<(), SessionError> {
        let next = self.phase.next(transition)?;
        debug!("{:?} --{:?}--> {:?}", self.phase, transition, next);
        self.phase = next;
        self.trail.push(next);
        Ok(())
    }

    // ========== Reset ==========

    /// Clear source and result; history stays
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.is_compressing() {
            return Err(SessionError::Busy);
        }
        self.source.release();
        self.result.release();
        self.trail.clear();
        self.preview_open = false;
        info!("session reset ({} history entries kept)", self.history.len());
        Ok(())
    }

    // ========== Panels ==========

    pub fn toggle_history_panel(&mut self) {
        self.history_visible = !self.history_visible;
    }

    /// Open the full-size preview; only possible while a result exists
    pub fn open_preview(&mut self) -> bool {
        self.preview_open = !self.result.is_empty();
        self.preview_open
    }

    pub fn close_preview(&mut self) {
        self.preview_open = false;
    }

    // ========== Queries ==========

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_compressing(&self) -> bool {
        self.phase == Phase::Compressing
    }

    /// Phases visited by the most recent compression, starting state included
    ///
    /// Empty before the first compression and after a reset.
    pub fn trail(&self) -> &[Phase] {
        &self.trail
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.get()
    }

    pub fn result(&self) -> Option<&CompressionResult> {
        self.result.get()
    }

    pub fn original_size(&self) -> u64 {
        self.source().map_or(0, |s| s.size)
    }

    pub fn compressed_size(&self) -> u64 {
        self.result().map_or(0, |r| r.compressed_size)
    }

    pub fn history(&self) -> &VecDeque<HistoryEntry> {
        &self.history
    }

    pub fn history_visible(&self) -> bool {
        self.history_visible
    }

    pub fn preview_open(&self) -> bool {
        self.preview_open
    }

    /// Name and bytes for saving the current result
    pub fn download(&self) -> Option<(String, Bytes)> {
        self.result()
            .map(|r| (r.output_name.clone(), r.handle.bytes().clone()))
    }

    /// Name and bytes for saving a history entry (0 = most recent)
    pub fn history_download(&self, index: usize) -> Option<(String, Bytes)> {
        self.history
            .get(index)
            .map(|e| (e.name.clone(), e.handle.bytes().clone()))
    }

    /// Image buffers still referenced by a slot or history entry
    pub fn live_handles(&self) -> usize {
        self.registry.live_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::{self, Compressor, JpegCompressor};
    use std::sync::Arc;

    /// Compressor double with a fixed answer
    struct FakeCompressor {
        fail: bool,
    }

    impl Compressor for FakeCompressor {
        fn compress(&self, input: &[u8], _options: &CompressOptions) -> Result<Vec<u8>, CompressError> {
            if self.fail {
                Err(CompressError::Encode("unsupported".into()))
            } else {
                Ok(input[..input.len() / 4].to_vec())
            }
        }
    }

    async fn run_job(session: &mut Session, compressor: Arc<dyn Compressor>) -> Outcome {
        let job = session.compress().unwrap();
        let output = compress::run(compressor, job.input, job.options).await;
        session.finish(job.ticket, output).unwrap()
    }

    fn with_image(size: usize) -> Session {
        let mut session = Session::default();
        session
            .select_image("holiday.png".into(), vec![0u8; size])
            .unwrap();
        session
    }

    fn succeed(session: &mut Session, output_len: usize) -> Outcome {
        let job = session.compress().unwrap();
        session.finish(job.ticket, Ok(vec![1u8; output_len])).unwrap()
    }

    #[test]
    fn test_transition_table() {
        assert_eq!(Phase::Idle.next(Transition::Begin), Ok(Phase::Compressing));
        assert_eq!(Phase::Compressing.next(Transition::Succeed), Ok(Phase::Succeeded));
        assert_eq!(Phase::Compressing.next(Transition::Fail), Ok(Phase::Failed));
        assert_eq!(Phase::Succeeded.next(Transition::Settle), Ok(Phase::Idle));
        assert_eq!(Phase::Failed.next(Transition::Settle), Ok(Phase::Idle));

        assert!(Phase::Idle.next(Transition::Succeed).is_err());
        assert!(Phase::Compressing.next(Transition::Begin).is_err());
        assert!(Phase::Succeeded.next(Transition::Fail).is_err());
    }

    #[test]
    fn test_compress_walks_every_quality() {
        let mut session = with_image(1000);

        for (i, quality) in Quality::all().enumerate() {
            session.set_quality(quality.value());
            let job = session.compress().unwrap();
            assert_eq!(job.options.quality, quality);
            assert!(session.is_compressing());

            session.finish(job.ticket, Ok(vec![0u8; 400])).unwrap();

            assert_eq!(
                session.trail(),
                &[Phase::Idle, Phase::Compressing, Phase::Succeeded, Phase::Idle]
            );
            assert_eq!(session.history().len(), i + 1);
            assert_eq!(session.result().map(|r| r.quality), Some(quality));
        }
    }

    #[test]
    fn test_success_builds_result_and_prepends_history() {
        let mut session = with_image(1_000_000);

        let outcome = succeed(&mut session, 250_000);

        assert_eq!(
            outcome,
            Outcome::Succeeded {
                compressed_size: 250_000,
                percent_saved: Some(75.0)
            }
        );
        let result = session.result().unwrap();
        assert_eq!(result.output_name, "holiday_compressed.jpg");
        assert_eq!(session.compressed_size(), 250_000);
        assert_eq!(session.history()[0].percent_saved, Some(75.0));

        session.set_quality(0.3);
        succeed(&mut session, 100_000);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[0].percent_saved, Some(90.0));
        assert_eq!(session.history()[1].percent_saved, Some(75.0));
    }

    #[test]
    fn test_compress_without_image_is_missing_input() {
        let mut session = Session::default();

        assert_eq!(session.compress().unwrap_err(), SessionError::MissingInput);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.trail().is_empty());
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_second_compress_while_busy_is_rejected() {
        let mut session = with_image(100);
        let job = session.compress().unwrap();

        assert_eq!(session.compress().unwrap_err(), SessionError::Busy);

        session.finish(job.ticket, Ok(vec![0u8; 10])).unwrap();
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_failure_leaves_result_untouched() {
        let mut session = with_image(1000);
        succeed(&mut session, 500);
        let before = session.result().unwrap().handle.id();

        let job = session.compress().unwrap();
        let outcome = session
            .finish(job.ticket, Err(CompressError::Decode("bad".into())))
            .unwrap();

        assert_eq!(outcome, Outcome::Failed(CompressError::Decode("bad".into())));
        assert_eq!(
            session.trail(),
            &[Phase::Idle, Phase::Compressing, Phase::Failed, Phase::Idle]
        );
        assert!(!session.is_compressing());
        assert_eq!(session.result().unwrap().handle.id(), before);
        assert_eq!(session.compressed_size(), 500);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_failure_with_no_prior_result() {
        let mut session = with_image(1000);
        let job = session.compress().unwrap();
        session
            .finish(job.ticket, Err(CompressError::EmptyInput))
            .unwrap();

        assert!(session.result().is_none());
        assert_eq!(session.compressed_size(), 0);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn test_new_image_clears_result_but_not_history() {
        let mut session = with_image(1000);
        succeed(&mut session, 300);
        assert!(session.open_preview());

        session
            .select_image("next.jpg".into(), vec![0u8; 2000])
            .unwrap();

        assert!(session.result().is_none());
        assert_eq!(session.compressed_size(), 0);
        assert_eq!(session.original_size(), 2000);
        assert_eq!(session.source().unwrap().output_name, "next_compressed.jpg");
        assert_eq!(session.history().len(), 1);
        assert!(!session.preview_open());
    }

    #[test]
    fn test_select_while_compressing_is_busy() {
        let mut session = with_image(1000);
        let _job = session.compress().unwrap();

        let err = session.select_image("other.png".into(), vec![1u8; 5]);

        assert_eq!(err, Err(SessionError::Busy));
        assert_eq!(session.source().unwrap().name, "holiday.png");
    }

    #[test]
    fn test_reset_keeps_history() {
        let mut session = with_image(1000);
        succeed(&mut session, 400);
        succeed(&mut session, 300);

        session.reset().unwrap();

        assert!(session.source().is_none());
        assert!(session.result().is_none());
        assert_eq!(session.original_size(), 0);
        assert_eq!(session.compressed_size(), 0);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.compress().unwrap_err(), SessionError::MissingInput);
    }

    #[test]
    fn test_reset_clears_trail() {
        let mut session = with_image(1000);
        succeed(&mut session, 400);
        assert!(!session.trail().is_empty());

        session.reset().unwrap();

        assert!(session.trail().is_empty());
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn test_reset_while_compressing_is_busy() {
        let mut session = with_image(10);
        let _job = session.compress().unwrap();
        assert_eq!(session.reset(), Err(SessionError::Busy));
        assert!(session.source().is_some());
    }

    #[test]
    fn test_toggle_history_twice_is_identity() {
        let mut session = with_image(1000);
        succeed(&mut session, 200);
        let history_len = session.history().len();
        let compressed = session.compressed_size();

        session.toggle_history_panel();
        assert!(session.history_visible());
        session.toggle_history_panel();

        assert!(!session.history_visible());
        assert_eq!(session.history().len(), history_len);
        assert_eq!(session.compressed_size(), compressed);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn test_quality_change_does_not_touch_result() {
        let mut session = with_image(1000);
        succeed(&mut session, 200);

        session.set_quality(0.2);

        assert_eq!(session.quality(), Quality::new(0.2));
        assert_eq!(session.result().unwrap().quality, Quality::default());
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn test_out_of_range_quality_is_clamped() {
        let mut session = Session::default();
        session.set_quality(3.0);
        assert_eq!(session.quality(), Quality::MAX);
        session.set_quality(-1.0);
        assert_eq!(session.quality(), Quality::MIN);
    }

    #[test]
    fn test_zero_byte_source_has_no_percentage() {
        let mut session = with_image(0);
        let outcome = succeed(&mut session, 10);
        assert_eq!(
            outcome,
            Outcome::Succeeded {
                compressed_size: 10,
                percent_saved: None
            }
        );
    }

    #[test]
    fn test_stale_completion_is_rejected() {
        let mut session = with_image(1000);
        let first = session.compress().unwrap();
        let stale = first.ticket.clone();
        session.finish(first.ticket, Ok(vec![0u8; 10])).unwrap();
        let _second = session.compress().unwrap();

        let err = session.finish(stale, Ok(vec![0u8; 5])).unwrap_err();

        assert_eq!(
            err,
            SessionError::StaleCompletion {
                got: 1,
                expected: Some(2)
            }
        );
        assert!(session.is_compressing());
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_duplicate_completion_is_illegal() {
        let mut session = with_image(1000);
        let job = session.compress().unwrap();
        let ticket = job.ticket.clone();
        session.finish(job.ticket, Ok(vec![0u8; 10])).unwrap();

        let err = session.finish(ticket, Ok(vec![0u8; 10])).unwrap_err();

        assert!(matches!(err, SessionError::IllegalTransition { .. }));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_preview_needs_a_result() {
        let mut session = with_image(1000);
        assert!(!session.open_preview());

        succeed(&mut session, 100);
        assert!(session.open_preview());
        session.close_preview();
        assert!(!session.preview_open());

        session.reset().unwrap();
        assert!(!session.open_preview());
    }

    #[test]
    fn test_slots_never_leak_handles() {
        let mut session = Session::default();
        for i in 0..5 {
            session
                .select_image(format!("img{}.png", i), vec![0u8; 64])
                .unwrap();
        }
        // Only the current source is alive
        assert_eq!(session.live_handles(), 1);

        succeed(&mut session, 10);
        succeed(&mut session, 8);
        // Source + two results, both still referenced by history
        assert_eq!(session.live_handles(), 3);

        session.reset().unwrap();
        assert_eq!(session.live_handles(), 2);
    }

    #[test]
    fn test_downloads() {
        let mut session = with_image(100);
        assert!(session.download().is_none());

        succeed(&mut session, 3);
        let (name, bytes) = session.download().unwrap();
        assert_eq!(name, "holiday_compressed.jpg");
        assert_eq!(bytes.len(), 3);

        session.reset().unwrap();
        assert!(session.download().is_none());
        let (name, bytes) = session.history_download(0).unwrap();
        assert_eq!(name, "holiday_compressed.jpg");
        assert_eq!(bytes.len(), 3);
        assert!(session.history_download(1).is_none());
    }

    #[tokio::test]
    async fn test_async_round_trip_with_fake_compressor() {
        let mut session = with_image(1_000_000);

        let outcome = run_job(&mut session, Arc::new(FakeCompressor { fail: false })).await;

        assert_eq!(
            outcome,
            Outcome::Succeeded {
                compressed_size: 250_000,
                percent_saved: Some(75.0)
            }
        );
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn test_async_failure_keeps_state() {
        let mut session = with_image(1000);

        let outcome = run_job(&mut session, Arc::new(FakeCompressor { fail: true })).await;

        assert!(matches!(outcome, Outcome::Failed(CompressError::Encode(_))));
        assert!(session.result().is_none());
        assert!(!session.is_compressing());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_real_compressor_on_a_png() {
        let img = image::RgbImage::from_fn(1200, 900, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
        });
        let mut png = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();

        let mut session = Session::default();
        session
            .select_image("pattern.png".into(), png.into_inner())
            .unwrap();

        let outcome = run_job(&mut session, Arc::new(JpegCompressor::new())).await;

        assert!(matches!(outcome, Outcome::Succeeded { .. }));
        let result = session.result().unwrap();
        assert_eq!(result.output_name, "pattern_compressed.jpg");
        let decoded = image::load_from_memory(result.handle.bytes()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 600));
    }
}
