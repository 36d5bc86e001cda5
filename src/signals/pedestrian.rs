//! Pedestrian request inputs.
//!
//! Every input reports a press at most once: a button held across many ticks
//! is still a single request.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Source of debounced pedestrian presses.
pub trait PedestrianInput {
    /// Return `true` once for each press since the previous call.
    /// Must not block.
    fn take_press(&mut self) -> bool;
}

impl<P: PedestrianInput + ?Sized> PedestrianInput for Box<P> {
    fn take_press(&mut self) -> bool {
        (**self).take_press()
    }
}

/// Turns a debounced level reading into one press per rising edge.
///
/// # Example
///
/// ```rust
/// use crossing::signals::{PedestrianInput, RisingEdge};
///
/// let mut levels = [false, true, true, false, true].into_iter();
/// let mut button = RisingEdge::new(move || levels.next().unwrap_or(false));
///
/// let presses: Vec<bool> = (0..5).map(|_| button.take_press()).collect();
/// assert_eq!(presses, [false, true, false, false, true]);
/// ```
pub struct RisingEdge<F> {
    read_level: F,
    was_down: bool,
}

impl<F: FnMut() -> bool> RisingEdge<F> {
    pub fn new(read_level: F) -> Self {
        Self {
            read_level,
            was_down: false,
        }
    }
}

impl<F: FnMut() -> bool> PedestrianInput for RisingEdge<F> {
    fn take_press(&mut self) -> bool {
        let down = (self.read_level)();
        let pressed = down && !self.was_down;
        self.was_down = down;
        pressed
    }
}

/// Press flag shared with a producer on another thread.
///
/// Several presses between two ticks collapse into one request, which is
/// all the controller needs.
#[derive(Clone, Debug, Default)]
pub struct PressLatch {
    pressed: Arc<AtomicBool>,
}

impl PressLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press. Safe to call from any thread.
    pub fn press(&self) {
        self.pressed.store(true, Ordering::Release);
    }
}

impl PedestrianInput for PressLatch {
    fn take_press(&mut self) -> bool {
        self.pressed.swap(false, Ordering::AcqRel)
    }
}

/// Request file created by the button service, consumed on read.
///
/// The button service creates the file once per debounced press; the
/// controller removes it when it takes the press. Removal is atomic, so a
/// press is never counted twice.
#[derive(Clone, Debug)]
pub struct PedestrianRequestFile {
    path: PathBuf,
}

impl PedestrianRequestFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PedestrianInput for PedestrianRequestFile {
    fn take_press(&mut self) -> bool {
        match fs::remove_file(&self.path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot consume pedestrian request");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn held_button_is_one_press() {
        let mut button = RisingEdge::new(|| true);

        assert!(button.take_press());
        assert!(!button.take_press());
        assert!(!button.take_press());
    }

    #[test]
    fn release_rearms_edge() {
        let mut levels = vec![true, false, true].into_iter();
        let mut button = RisingEdge::new(move || levels.next().unwrap_or(false));

        assert!(button.take_press());
        assert!(!button.take_press());
        assert!(button.take_press());
    }

    #[test]
    fn press_latch_reports_once() {
        let mut latch = PressLatch::new();
        let producer = latch.clone();

        thread::spawn(move || {
            producer.press();
            producer.press();
        })
        .join()
        .unwrap();

        assert!(latch.take_press());
        assert!(!latch.take_press());
    }

    #[test]
    fn request_file_is_consumed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pedestrian_request");
        let mut input = PedestrianRequestFile::new(&path);

        assert!(!input.take_press());

        fs::write(&path, b"").unwrap();
        assert!(input.take_press());
        assert!(!path.exists());
        assert!(!input.take_press());
    }
}
