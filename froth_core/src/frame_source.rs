//! Camera acquisition with bounded re-acquisition.
//!
//! The device is opened lazily on the first capture. Each acquisition makes
//! up to `retries` open attempts separated by a fixed delay; an attempt only
//! counts as successful once a test read returns a frame. A failed read marks
//! the device closed so the next capture starts a fresh acquisition.
//!
//! With a shutdown receiver attached, the retry delay waits on that channel
//! instead of the clock, so disconnecting the sender ends a pending
//! acquisition at once.

use crossbeam_channel as xch;
use froth_traits::clock::{Clock, MonotonicClock};
use froth_traits::{Camera, Frame};
use tracing::{debug, info, warn};

use crate::config::CaptureCfg;
use crate::hw_error::map_hw_error;

/// A frame together with its capture time (unix ms from the source clock).
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub image: Frame,
    pub captured_at_ms: u64,
}

/// Why a capture cycle produced no frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Every open attempt failed.
    Unavailable { attempts: u32 },
    /// The device was open but the read failed.
    ReadFailed(String),
    /// `release` was called, or shutdown was signalled during acquisition.
    Released,
}

#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Frame(CapturedFrame),
    Dropped(DropReason),
}

enum Acquire {
    Opened,
    Exhausted(u32),
    Cancelled,
}

pub struct FrameSource<Cam: Camera, C: Clock = MonotonicClock> {
    camera: Cam,
    cfg: CaptureCfg,
    clock: C,
    shutdown: Option<xch::Receiver<()>>,
    released: bool,
}

impl<Cam: Camera> FrameSource<Cam, MonotonicClock> {
    pub fn new(camera: Cam, cfg: CaptureCfg) -> Self {
        Self::with_clock(camera, cfg, MonotonicClock::new())
    }
}

impl<Cam: Camera, C: Clock> FrameSource<Cam, C> {
    pub fn with_clock(camera: Cam, cfg: CaptureCfg, clock: C) -> Self {
        Self {
            camera,
            cfg,
            clock,
            shutdown: None,
            released: false,
        }
    }

    /// Abort pending retry delays once every sender of `rx` is dropped.
    pub fn with_shutdown(mut self, rx: xch::Receiver<()>) -> Self {
        self.shutdown = Some(rx);
        self
    }

    fn shutdown_signalled(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|rx| !matches!(rx.try_recv(), Err(xch::TryRecvError::Empty)))
    }

    /// Wait out the retry delay. Returns false when shutdown cut it short.
    fn pause(&self, delay: std::time::Duration) -> bool {
        match &self.shutdown {
            Some(rx) => matches!(rx.recv_timeout(delay), Err(xch::RecvTimeoutError::Timeout)),
            None => {
                self.clock.sleep(delay);
                true
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.camera.is_open()
    }

    /// Open the device, retrying with the configured delay.
    fn acquire(&mut self) -> Acquire {
        let retries = self.cfg.retries.max(1);
        let started = self.clock.now();
        for attempt in 1..=retries {
            if self.shutdown_signalled() {
                return Acquire::Cancelled;
            }
            let result = self.camera.open().and_then(|()| self.camera.read().map(|_| ()));
            match result {
                Ok(()) => {
                    info!(
                        attempt,
                        elapsed_ms = self.clock.ms_since(started),
                        "camera acquired"
                    );
                    return Acquire::Opened;
                }
                Err(e) => {
                    let err = map_hw_error(e.as_ref());
                    warn!(attempt, retries, error = %err, "camera acquisition failed");
                    self.camera.release();
                    if attempt < retries && !self.pause(self.cfg.retry_delay) {
                        return Acquire::Cancelled;
                    }
                }
            }
        }
        warn!(
            attempts = retries,
            elapsed_ms = self.clock.ms_since(started),
            "camera unavailable; frame dropped"
        );
        Acquire::Exhausted(retries)
    }

    /// Capture one frame, (re)acquiring the device when needed.
    pub fn capture(&mut self) -> CaptureOutcome {
        if self.released {
            return CaptureOutcome::Dropped(DropReason::Released);
        }
        if !self.camera.is_open() {
            match self.acquire() {
                Acquire::Opened => {}
                Acquire::Exhausted(attempts) => {
                    return CaptureOutcome::Dropped(DropReason::Unavailable { attempts });
                }
                Acquire::Cancelled => {
                    debug!("acquisition cancelled by shutdown");
                    return CaptureOutcome::Dropped(DropReason::Released);
                }
            }
        }
        match self.camera.read() {
            Ok(image) => CaptureOutcome::Frame(CapturedFrame {
                image,
                captured_at_ms: self.clock.wall_ms(),
            }),
            Err(e) => {
                let err = map_hw_error(e.as_ref());
                warn!(error = %err, "frame read failed; device will be re-acquired");
                self.camera.release();
                CaptureOutcome::Dropped(DropReason::ReadFailed(err.to_string()))
            }
        }
    }

    /// Release the device. Safe to call repeatedly.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.camera.release();
            debug!("frame source released");
        }
    }
}

impl<Cam: Camera, C: Clock> Drop for FrameSource<Cam, C> {
    fn drop(&mut self) {
        self.release();
    }
}
