//! Vehicle-presence handoff between the detector and the controller.
//!
//! The detector publishes its latest boolean at its own cadence; the
//! controller reads whatever was published last, together with its age.
//! Both transports here guarantee atomic publish (no torn reads) and
//! monotonic freshness (a reader never sees an older value after a newer
//! one).
//!
//! # File channel
//!
//! The detector writes `1` or `0` to a temp file in the channel's directory,
//! fsyncs it, and renames it over the channel file, so the reader always sees
//! either the old or the new value. Age comes from the file's modification
//! time. A modification time ahead of the wall clock means the clock stepped
//! back, and the reading is rejected rather than trusted as fresh.
//!
//! # In-memory channel
//!
//! [`presence_channel`] returns a single-writer/single-reader pair sharing one
//! `AtomicU64` that packs the value together with its publish time. A
//! publish replaces the slot only if its stamp is not older than the one
//! already there.

use super::clock::to_nanos;
use super::error::SamplerError;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Latest known vehicle-presence value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PresenceReading {
    pub present: bool,
    /// Time since the value was published.
    pub age: Duration,
}

/// Non-blocking provider of the most recently published presence value.
pub trait PresenceSource {
    /// Read the latest value as seen at monotonic time `now`.
    fn latest(&self, now: Duration) -> Result<PresenceReading, SamplerError>;
}

impl<P: PresenceSource + ?Sized> PresenceSource for Box<P> {
    fn latest(&self, now: Duration) -> Result<PresenceReading, SamplerError> {
        (**self).latest(now)
    }
}

/// How far ahead of the wall clock a channel file's mtime may be before the
/// reading is rejected.
const FUTURE_MTIME_TOLERANCE: Duration = Duration::from_millis(100);

/// Reader half of the file channel.
#[derive(Clone, Debug)]
pub struct FilePresenceSource {
    path: PathBuf,
}

impl FilePresenceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unreadable(&self, source: io::Error) -> SamplerError {
        SamplerError::Unreadable {
            path: self.path.clone(),
            source,
        }
    }
}

impl PresenceSource for FilePresenceSource {
    /// Age is measured against the wall clock, since that is what stamps
    /// the file; `now` is unused.
    fn latest(&self, _now: Duration) -> Result<PresenceReading, SamplerError> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(SamplerError::NoData),
            Err(e) => return Err(self.unreadable(e)),
        };

        // Metadata and contents come from the same handle, so they describe
        // the same published file even if a rename lands mid-read.
        let modified = file
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|e| self.unreadable(e))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| self.unreadable(e))?;

        let present = parse_flag(&contents)?;
        let age = match SystemTime::now().duration_since(modified) {
            Ok(age) => age,
            Err(e) if e.duration() <= FUTURE_MTIME_TOLERANCE => Duration::ZERO,
            // The wall clock stepped back, so the value's age is unknown
            Err(e) => return Err(SamplerError::FromFuture { ahead: e.duration() }),
        };

        Ok(PresenceReading { present, age })
    }
}

fn parse_flag(contents: &str) -> Result<bool, SamplerError> {
    match contents.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(SamplerError::Malformed {
            contents: other.to_string(),
        }),
    }
}

/// Atomically publish a presence value to the file channel at `path`.
///
/// The rename and the file contents are both fsynced before returning.
pub fn publish_presence_file(path: impl AsRef<Path>, present: bool) -> io::Result<()> {
    replace_file(path.as_ref(), if present { b"1" } else { b"0" }, true)
}

/// Replace `path` with `contents` so readers see either the old or the new
/// file, never a partial one.
///
/// Writes to `<dir>/.<name>.tmp` and renames it over `path`. When `durable`
/// is set the temp file and the directory are fsynced as well.
pub(crate) fn replace_file(path: &Path, contents: &[u8], durable: bool) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "channel path has no file name")
    })?;

    let mut tmp_name = OsString::from(".");
    tmp_name.push(name);
    tmp_name.push(".tmp");
    let tmp_path = dir.join(tmp_name);

    {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(contents)?;
        if durable {
            tmp.sync_all()?;
        }
    }

    fs::rename(&tmp_path, path)?;
    if durable {
        OpenOptions::new().read(true).open(dir)?.sync_all()?;
    }
    Ok(())
}

const NEVER_PUBLISHED: u64 = 0;
const MAX_STAMP_NANOS: u64 = (u64::MAX >> 1) - 1;

fn pack(present: bool, at: Duration) -> u64 {
    let stamp = to_nanos(at).min(MAX_STAMP_NANOS) + 1;
    (stamp << 1) | u64::from(present)
}

fn stamp(slot: u64) -> u64 {
    slot >> 1
}

fn unpack(slot: u64) -> Option<(bool, Duration)> {
    if slot == NEVER_PUBLISHED {
        return None;
    }
    let present = slot & 1 == 1;
    let stamp = (slot >> 1) - 1;
    Some((present, Duration::from_nanos(stamp)))
}

/// Create a connected in-memory presence channel.
///
/// # Example
///
/// ```rust
/// use crossing::signals::{presence_channel, PresenceSource};
/// use std::time::Duration;
///
/// let (publisher, cell) = presence_channel();
/// assert!(cell.latest(Duration::ZERO).is_err());
///
/// publisher.publish(true, Duration::from_secs(1));
/// let reading = cell.latest(Duration::from_millis(1_300)).unwrap();
/// assert!(reading.present);
/// assert_eq!(reading.age, Duration::from_millis(300));
/// ```
pub fn presence_channel() -> (PresencePublisher, PresenceCell) {
    let slot = Arc::new(AtomicU64::new(NEVER_PUBLISHED));
    (
        PresencePublisher {
            slot: Arc::clone(&slot),
        },
        PresenceCell { slot },
    )
}

/// Writer half of the in-memory channel. Deliberately not `Clone`.
#[derive(Debug)]
pub struct PresencePublisher {
    slot: Arc<AtomicU64>,
}

impl PresencePublisher {
    /// Publish `present` as observed at monotonic time `at`.
    ///
    /// A publish stamped earlier than the current value is ignored. One
    /// stamped at the same instant replaces it.
    pub fn publish(&self, present: bool, at: Duration) {
        let packed = pack(present, at);
        let _ = self
            .slot
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (stamp(packed) >= stamp(current)).then_some(packed)
            });
    }
}

/// Reader half of the in-memory channel. Deliberately not `Clone`.
#[derive(Debug)]
pub struct PresenceCell {
    slot: Arc<AtomicU64>,
}

impl PresenceSource for PresenceCell {
    fn latest(&self, now: Duration) -> Result<PresenceReading, SamplerError> {
        let (present, published) =
            unpack(self.slot.load(Ordering::Acquire)).ok_or(SamplerError::NoData)?;
        Ok(PresenceReading {
            present,
            age: now.saturating_sub(published),
        })
    }
}
