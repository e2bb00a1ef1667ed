use crate::depth::{self, Colormap};
use crate::driver::ReceiveBuffer;
use crate::types::Frame;
use crate::{IlidarError, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Receives the artifacts of each processed frame.
///
/// Called on the pipeline's worker thread. Each call hands over a complete
/// replacement for the previous frame.
pub trait FrameSink: Send + 'static {
    fn publish(&mut self, frame: Frame);
}

impl<F> FrameSink for F
where
    F: FnMut(Frame) + Send + 'static,
{
    fn publish(&mut self, frame: Frame) {
        self(frame)
    }
}

/// Sink that forwards frames into a channel without blocking.
///
/// Frames are dropped when the receiver is full or gone, so a slow renderer
/// never stalls ingest.
pub fn channel_sink(sender: Sender<Frame>) -> impl FrameSink {
    move |frame: Frame| match sender.try_send(frame) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => log::trace!("Frame channel full, dropping frame"),
        Err(TrySendError::Disconnected(_)) => log::trace!("Frame channel closed, dropping frame"),
    }
}

/// Turns the contents of the receive buffer into a [`Frame`].
pub struct FrameProcessor {
    colormap: Colormap,
    projection_scale: f64,
    field: Vec<u16>,
    sequence: u64,
}

impl FrameProcessor {
    pub fn new(projection_scale: f64) -> Self {
        Self {
            colormap: Colormap::jet(),
            projection_scale,
            field: Vec::new(),
            sequence: 0,
        }
    }

    /// Read the depth field in place and derive both artifacts from it.
    pub fn process_frame(&mut self, buffer: &ReceiveBuffer) -> Frame {
        buffer.copy_depth_field(&mut self.field);
        self.sequence += 1;
        Frame {
            sequence: self.sequence,
            depth: depth::depth_image(&self.field, &self.colormap),
            points: depth::point_cloud(&self.field, self.projection_scale),
        }
    }
}

/// Single consumer of frame-ready signals.
///
/// A dedicated worker thread drains one signal at a time, so frames are
/// never processed concurrently. The signal channel holds at most one
/// pending notification; anything arriving while a frame is in flight
/// collapses into it.
pub struct FramePipeline {
    stop_flag: Arc<AtomicBool>,
    processed: Arc<AtomicU64>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl FramePipeline {
    pub(crate) fn start(
        buffer: ReceiveBuffer,
        signals: Receiver<()>,
        streaming: Arc<AtomicBool>,
        sink: Box<dyn FrameSink>,
        projection_scale: f64,
    ) -> Result<FramePipeline> {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let processed = Arc::new(AtomicU64::new(0));
        let worker = FrameWorker {
            buffer,
            signals,
            streaming,
            sink,
            processor: FrameProcessor::new(projection_scale),
            stop_flag: stop_flag.clone(),
            processed: processed.clone(),
        };

        let thread = std::thread::Builder::new()
            .name("ilidar-frames".into())
            .spawn(move || worker.run())
            .map_err(IlidarError::WorkerSpawn)?;

        Ok(FramePipeline {
            stop_flag,
            processed,
            thread: Some(thread),
        })
    }

    /// Frames handed to the sink so far.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn is_active(&self) -> bool {
        !self.stop_flag.load(Ordering::Relaxed)
    }

    /// Stop the worker and wait for it to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("Frame worker panicked");
            }
        }
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct FrameWorker {
    buffer: ReceiveBuffer,
    signals: Receiver<()>,
    streaming: Arc<AtomicBool>,
    sink: Box<dyn FrameSink>,
    processor: FrameProcessor,
    stop_flag: Arc<AtomicBool>,
    processed: Arc<AtomicU64>,
}

impl FrameWorker {
    fn run(mut self) {
        log::info!("Frame worker started");

        loop {
            if self.stop_flag.load(Ordering::Relaxed) {
                log::info!("Frame worker stopping (stop flag set)");
                break;
            }

            // Bounded wait so the stop flag is polled regularly.
            match self.signals.recv_timeout(Duration::from_millis(100)) {
                Ok(()) => {}
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    log::info!("Frame signal channel closed, stopping worker");
                    break;
                }
            }

            // The session may have stopped between notify and pickup.
            if !self.streaming.load(Ordering::Acquire) {
                log::trace!("Pending frame dropped, not streaming");
                continue;
            }

            let frame = self.processor.process_frame(&self.buffer);
            log::trace!(
                "Frame {}: {} points",
                frame.sequence,
                frame.points.len()
            );
            self.sink.publish(frame);
            self.processed.fetch_add(1, Ordering::Relaxed);
        }
    }
}
