use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::camera::source::{Snapshot, VideoSource};
use crate::capture::compress::{self, EncodedImage};
use crate::capture::error::{CaptureError, Result};
use crate::capture::geometry;
use crate::capture::render::{self, RawFrame};
use crate::capture::sink::OutputSink;
use crate::diagnostics::stats::{CaptureSnapshot, CaptureStats};
use crate::settings::config::{CaptureConfig, ConfigError};

/// Turns the current frame of a video source into a cropped, cover-scaled
/// JPEG and hands it to an output sink.
///
/// Each [`capture`](Self::capture) call allocates its own decode buffer and
/// canvas; nothing but diagnostics survives between calls.
pub struct CapturePipeline {
    source: Arc<dyn VideoSource>,
    sink: Arc<dyn OutputSink>,
    config: CaptureConfig,
    in_flight: AtomicBool,
    stats: Mutex<CaptureStats>,
}

/// Clears the in-flight flag when a capture finishes, however it finishes.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CapturePipeline {
    /// Build a pipeline, rejecting configs that could only yield blank or
    /// unencodable captures.
    pub fn new(
        source: Arc<dyn VideoSource>,
        sink: Arc<dyn OutputSink>,
        config: CaptureConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            source,
            sink,
            config,
            in_flight: AtomicBool::new(false),
            stats: Mutex::new(CaptureStats::new()),
        })
    }

    /// The validated config this pipeline captures with.
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Whether a capture is currently running.
    pub fn is_capturing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Take a snapshot of capture stats for this pipeline.
    pub fn diagnostics(&self) -> CaptureSnapshot {
        self.stats.lock().snapshot()
    }

    /// Capture the source's current frame and deliver it to the sink.
    ///
    /// The sink is called exactly once on success and never on error.
    /// Overlapping calls on the same pipeline fail with
    /// [`CaptureError::CaptureInProgress`]; failures are not retried.
    pub async fn capture(&self) -> Result<()> {
        let _guard =
            InFlightGuard::acquire(&self.in_flight).ok_or(CaptureError::CaptureInProgress)?;
        let started = Instant::now();

        match self.transform().await {
            Ok(image) => {
                let bytes = image.as_str().len();
                self.sink.deliver(image);
                let elapsed = started.elapsed();
                self.stats.lock().record_success(bytes, elapsed);
                info!(
                    "capture delivered {bytes} bytes in {:.1}ms",
                    elapsed.as_secs_f64() * 1000.0
                );
                Ok(())
            }
            Err(e) => {
                warn!("capture failed: {e}");
                self.stats.lock().record_failure(&e.to_string());
                Err(e)
            }
        }
    }

    async fn transform(&self) -> Result<EncodedImage> {
        let snapshot = self
            .source
            .screenshot()
            .ok_or(CaptureError::CaptureUnavailable)?;
        debug!("got {snapshot:?} from video source");

        let frame = self.decode(snapshot).await?;
        let geometry = geometry::compute(frame.width(), frame.height(), &self.config);
        debug!(
            "frame {}x{}: crop start ({}, {}), draw {:?}",
            frame.width(),
            frame.height(),
            geometry.crop_start_x,
            geometry.crop_start_y,
            geometry.draw
        );
        if geometry.is_clipped() {
            debug!("sample region clipped to {:?}", geometry.crop);
        }

        let canvas = render::render(&frame, &geometry, &self.config)?;
        drop(frame);
        compress::encode_canvas(&canvas, self.config.jpeg_quality)
    }

    /// Decode off the async thread, bounded by `decode_timeout_ms` when set.
    async fn decode(&self, snapshot: Snapshot) -> Result<RawFrame> {
        let task = tokio::task::spawn_blocking(move || render::decode(&snapshot));
        let joined = match self.config.decode_timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), task)
                .await
                .map_err(|_| {
                    CaptureError::Decode(format!("decode did not finish within {ms}ms"))
                })?,
            None => task.await,
        };
        joined.map_err(|e| CaptureError::Decode(format!("decode task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::frame_buffer::{Frame, FrameBuffer};
    use crate::camera::still::{test_pattern, DummySource};

    /// Sink that keeps every image it receives.
    #[derive(Default)]
    struct RecordingSink {
        images: Mutex<Vec<EncodedImage>>,
    }

    impl RecordingSink {
        fn count(&self) -> usize {
            self.images.lock().len()
        }
    }

    impl OutputSink for RecordingSink {
        fn deliver(&self, image: EncodedImage) {
            self.images.lock().push(image);
        }
    }

    /// Source that never has a frame ready.
    struct OfflineSource;

    impl VideoSource for OfflineSource {
        fn screenshot(&self) -> Option<Snapshot> {
            None
        }
    }

    /// Source returning a fixed snapshot.
    struct FixedSource(Snapshot);

    impl VideoSource for FixedSource {
        fn screenshot(&self) -> Option<Snapshot> {
            Some(self.0.clone())
        }
    }

    fn pipeline_with(
        source: impl VideoSource + 'static,
        config: CaptureConfig,
    ) -> (CapturePipeline, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let pipeline = CapturePipeline::new(Arc::new(source), sink.clone(), config).unwrap();
        (pipeline, sink)
    }

    #[test]
    fn zero_sample_size_is_rejected_at_construction() {
        let sink = Arc::new(RecordingSink::default());
        for config in [
            CaptureConfig {
                sample_height: 0,
                ..CaptureConfig::default()
            },
            CaptureConfig {
                sample_width: 0,
                ..CaptureConfig::default()
            },
        ] {
            let result = CapturePipeline::new(
                Arc::new(DummySource::with_size(1280, 720)),
                sink.clone(),
                config,
            );
            assert!(matches!(result, Err(ConfigError::Invalid(_))));
        }
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn zero_jpeg_quality_is_rejected_at_construction() {
        let config = CaptureConfig {
            jpeg_quality: 0,
            ..CaptureConfig::default()
        };
        let result = CapturePipeline::new(
            Arc::new(DummySource::with_size(1280, 720)),
            Arc::new(RecordingSink::default()),
            config,
        );
        match result {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("jpegQuality"), "{msg}"),
            Err(other) => panic!("expected invalid config, got {other}"),
            Ok(_) => panic!("quality 0 should be rejected"),
        }
    }

    #[tokio::test]
    async fn no_frame_fails_without_delivery() {
        let (pipeline, sink) = pipeline_with(OfflineSource, CaptureConfig::default());

        let result = pipeline.capture().await;

        assert!(matches!(result, Err(CaptureError::CaptureUnavailable)));
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn successful_capture_delivers_exactly_once() {
        let (pipeline, sink) =
            pipeline_with(DummySource::with_size(1200, 1600), CaptureConfig::default());

        pipeline.capture().await.unwrap();

        let images = sink.images.lock();
        assert_eq!(images.len(), 1);
        assert!(images[0].as_str().starts_with("data:image/jpeg;base64,"));
        assert!(images[0].as_str().len() > "data:image/jpeg;base64,".len());
    }

    #[tokio::test]
    async fn delivered_image_has_output_dimensions() {
        let (pipeline, sink) =
            pipeline_with(DummySource::with_size(640, 480), CaptureConfig::default());

        pipeline.capture().await.unwrap();

        let jpeg = sink.images.lock()[0].jpeg_bytes().unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (480, 360));
    }

    #[tokio::test]
    async fn repeated_captures_of_same_frame_are_identical() {
        let (pipeline, sink) =
            pipeline_with(DummySource::with_size(1280, 720), CaptureConfig::default());

        pipeline.capture().await.unwrap();
        pipeline.capture().await.unwrap();

        let images = sink.images.lock();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0], images[1]);
    }

    #[tokio::test]
    async fn undecodable_snapshot_is_decode_error() {
        let source = FixedSource(Snapshot::Encoded(b"not an image at all".to_vec()));
        let (pipeline, sink) = pipeline_with(source, CaptureConfig::default());

        let result = pipeline.capture().await;

        assert!(matches!(result, Err(CaptureError::Decode(_))));
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn mismatched_raw_buffer_is_decode_error() {
        let frame = Frame {
            data: vec![0; 5],
            width: 4,
            height: 4,
            timestamp_us: 0,
        };
        let source = FixedSource(Snapshot::Rgb(Arc::new(frame)));
        let (pipeline, sink) = pipeline_with(source, CaptureConfig::default());

        assert!(matches!(
            pipeline.capture().await,
            Err(CaptureError::Decode(_))
        ));
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn encoded_snapshot_is_decoded_and_captured() {
        let frame = test_pattern(800, 600);
        let image = image::RgbImage::from_raw(800, 600, frame.data).unwrap();
        let mut png = std::io::Cursor::new(Vec::new());
        image.write_to(&mut png, image::ImageFormat::Png).unwrap();
        let source = FixedSource(Snapshot::Encoded(png.into_inner()));
        let (pipeline, sink) = pipeline_with(source, CaptureConfig::default());

        pipeline.capture().await.unwrap();

        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn stalled_decode_times_out_as_decode_error() {
        // One blocking thread, kept busy, so the decode task can never start.
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .max_blocking_threads(1)
            .build()
            .unwrap();
        let config = CaptureConfig {
            decode_timeout_ms: Some(20),
            ..CaptureConfig::default()
        };
        let (pipeline, sink) = pipeline_with(DummySource::with_size(640, 480), config);

        let result = rt.block_on(async {
            let blocker =
                tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_millis(300)));
            let result = pipeline.capture().await;
            blocker.await.unwrap();
            result
        });

        match result {
            Err(CaptureError::Decode(msg)) => assert!(msg.contains("within 20ms"), "{msg}"),
            other => panic!("expected decode timeout, got {other:?}"),
        }
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn overlapping_capture_is_rejected() {
        let (pipeline, sink) =
            pipeline_with(DummySource::with_size(640, 480), CaptureConfig::default());

        let held = InFlightGuard::acquire(&pipeline.in_flight).unwrap();
        assert!(pipeline.is_capturing());
        let result = pipeline.capture().await;
        assert!(matches!(result, Err(CaptureError::CaptureInProgress)));
        assert_eq!(sink.count(), 0);

        drop(held);
        assert!(!pipeline.is_capturing());
        pipeline.capture().await.unwrap();
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test]
    async fn failed_capture_releases_in_flight_flag() {
        let (pipeline, _sink) = pipeline_with(OfflineSource, CaptureConfig::default());

        for _ in 0..2 {
            assert!(matches!(
                pipeline.capture().await,
                Err(CaptureError::CaptureUnavailable)
            ));
        }
        assert!(!pipeline.is_capturing());
    }

    #[tokio::test]
    async fn frame_buffer_source_captures_latest_frame() {
        let buffer = Arc::new(FrameBuffer::new(3));
        let sink = Arc::new(RecordingSink::default());
        let pipeline =
            CapturePipeline::new(buffer.clone(), sink.clone(), CaptureConfig::default()).unwrap();

        assert!(matches!(
            pipeline.capture().await,
            Err(CaptureError::CaptureUnavailable)
        ));

        buffer.push(test_pattern(1280, 720));
        pipeline.capture().await.unwrap();
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test]
    async fn diagnostics_count_successes_and_failures() {
        let buffer = Arc::new(FrameBuffer::new(1));
        let sink = Arc::new(RecordingSink::default());
        let pipeline =
            CapturePipeline::new(buffer.clone(), sink, CaptureConfig::default()).unwrap();

        let _ = pipeline.capture().await;
        buffer.push(test_pattern(640, 480));
        pipeline.capture().await.unwrap();

        let snap = pipeline.diagnostics();
        assert_eq!(snap.capture_count, 1);
        assert_eq!(snap.failure_count, 1);
        assert_eq!(
            snap.last_error.as_deref(),
            Some("no frame available from video source")
        );
        assert!(snap.average_bytes > 0);
    }

    #[tokio::test]
    async fn closure_sink_is_accepted() {
        let delivered = Arc::new(AtomicBool::new(false));
        let delivered_clone = Arc::clone(&delivered);
        let sink = move |image: EncodedImage| {
            assert!(!image.as_str().is_empty());
            delivered_clone.store(true, Ordering::Relaxed);
        };
        let pipeline = CapturePipeline::new(
            Arc::new(DummySource::with_size(320, 240)),
            Arc::new(sink),
            CaptureConfig::default(),
        )
        .unwrap();

        pipeline.capture().await.unwrap();
        assert!(delivered.load(Ordering::Relaxed));
    }

    #[test]
    fn pipeline_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CapturePipeline>();
    }
}
