//! Host shim: button events in, frames out, optional pacing.
//!
//! The emulator core is single-threaded; a windowing host lives on its own
//! thread and talks to the core through a [`HostHandle`]: button transitions
//! go over a channel that the core drains at frame boundaries, and a shared
//! flag cancels the run between frames. Wall-clock pacing is the host's
//! problem, solved here by blocking after each V-Blank.

use crate::joypad::Button;
use crate::{GbError, GbSystem};
use dmg_core::types::Frame;
use dmg_core::System;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// DMG vertical refresh: 4194304 / 70224
pub const FRAME_RATE: f64 = 59.7275;

/// One frame of wall-clock time at [`FRAME_RATE`]
pub const FRAME_DURATION: Duration = Duration::from_nanos(16_742_706);

/// A single button transition from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: Button,
    pub pressed: bool,
}

/// The host's side of the shim: send inputs, request cancellation.
#[derive(Clone)]
pub struct HostHandle {
    events: Sender<ButtonEvent>,
    cancel: Arc<AtomicBool>,
}

impl HostHandle {
    /// Queue a button transition; quietly dropped if the core is gone.
    pub fn send(&self, button: Button, pressed: bool) {
        let _ = self.events.send(ButtonEvent { button, pressed });
    }

    /// Ask the core to stop after the frame in flight.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

/// Drives a [`GbSystem`] frame by frame on behalf of a host.
pub struct Emulator {
    system: GbSystem,
    events: Receiver<ButtonEvent>,
    cancel: Arc<AtomicBool>,
    pace: bool,
    deadline: Instant,
    fps_window: Instant,
    fps_frames: u32,
}

impl Emulator {
    pub fn new(system: GbSystem) -> (Self, HostHandle) {
        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let handle = HostHandle {
            events: tx,
            cancel: Arc::clone(&cancel),
        };
        let now = Instant::now();
        (
            Self {
                system,
                events: rx,
                cancel,
                pace: false,
                deadline: now + FRAME_DURATION,
                fps_window: now,
                fps_frames: 0,
            },
            handle,
        )
    }

    /// Enable or disable ~59.73 Hz pacing.
    pub fn set_pacing(&mut self, pace: bool) {
        self.pace = pace;
        self.deadline = Instant::now() + FRAME_DURATION;
    }

    pub fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn system(&self) -> &GbSystem {
        &self.system
    }

    /// Drain host input, emulate one frame, pace if asked to.
    pub fn run_frame(&mut self) -> Result<Frame, GbError> {
        self.drain_events()?;
        let frame = self.system.step_frame()?;

        self.fps_frames += 1;
        let elapsed = self.fps_window.elapsed();
        if elapsed >= Duration::from_secs(1) {
            log::debug!(
                "{:.1} fps",
                self.fps_frames as f64 / elapsed.as_secs_f64()
            );
            self.fps_window = Instant::now();
            self.fps_frames = 0;
        }

        if self.pace {
            let now = Instant::now();
            if self.deadline > now {
                std::thread::sleep(self.deadline - now);
            }
            self.deadline += FRAME_DURATION;
        }
        Ok(frame)
    }

    /// Run until cancelled or `max_frames` frames have been produced.
    /// A disconnected host counts as a clean shutdown.
    pub fn run(&mut self, max_frames: Option<u64>) -> Result<u64, GbError> {
        let mut frames = 0;
        while !self.cancelled() && max_frames.map_or(true, |max| frames < max) {
            match self.run_frame() {
                Ok(_) => frames += 1,
                Err(GbError::HostDisconnected) => break,
                Err(err) => return Err(err),
            }
        }
        Ok(frames)
    }

    fn drain_events(&mut self) -> Result<(), GbError> {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.system.set_button(event.button, event.pressed),
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => return Err(GbError::HostDisconnected),
            }
        }
    }
}
