//! The polling loop and its output sinks.

use super::{Controller, TickReport};
use crate::core::AspectPair;
use crate::signals::{Clock, PedestrianInput, PresenceSource, SignalSampler};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

/// Receives the aspects to display after every tick.
pub trait AspectSink {
    /// Drive outputs for this tick. `controller` and `now` are available for
    /// sinks that report more than the aspects.
    fn drive(&mut self, report: &TickReport, controller: &Controller, now: Duration)
        -> io::Result<()>;
}

impl<A: AspectSink, B: AspectSink> AspectSink for (A, B) {
    fn drive(
        &mut self,
        report: &TickReport,
        controller: &Controller,
        now: Duration,
    ) -> io::Result<()> {
        // Second sink still runs when the first fails
        let first = self.0.drive(report, controller, now);
        let second = self.1.drive(report, controller, now);
        first.and(second)
    }
}

impl<S: AspectSink> AspectSink for Option<S> {
    fn drive(
        &mut self,
        report: &TickReport,
        controller: &Controller,
        now: Duration,
    ) -> io::Result<()> {
        match self {
            Some(sink) => sink.drive(report, controller, now),
            None => Ok(()),
        }
    }
}

/// Logs aspect changes at `info` and every tick at `debug`.
#[derive(Debug, Default)]
pub struct LogSink {
    shown: Option<AspectPair>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AspectSink for LogSink {
    fn drive(&mut self, report: &TickReport, _: &Controller, now: Duration) -> io::Result<()> {
        if self.shown != Some(report.aspects) {
            info!(
                state = %report.state,
                main = ?report.aspects.main(),
                side = ?report.aspects.side(),
                "aspects"
            );
            self.shown = Some(report.aspects);
        }
        debug!(
            at_ms = now.as_millis() as u64,
            state = %report.state,
            car_present = report.car_present,
            car_request = report.latches.car_request,
            pedestrian_request = report.latches.pedestrian_request,
            "tick"
        );
        Ok(())
    }
}

/// Re-writes a JSON status file after every tick.
///
/// The file is replaced atomically, so readers never see a partial document.
#[derive(Debug, Clone)]
pub struct StatusFileSink {
    path: PathBuf,
}

impl StatusFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AspectSink for StatusFileSink {
    fn drive(&mut self, _: &TickReport, controller: &Controller, now: Duration) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(&controller.status(now))?;
        crate::signals::replace_file(&self.path, &json, false)
    }
}

/// Drives a [`Controller`] from a clock, a sampler and a sink.
///
/// # Example
///
/// ```rust
/// use crossing::config::ControllerConfig;
/// use crossing::controller::{LogSink, Runner};
/// use crossing::core::IntersectionState;
/// use crossing::signals::{presence_channel, ManualClock, PressLatch, SignalSampler};
/// use std::time::Duration;
///
/// let config = ControllerConfig::default();
/// let clock = ManualClock::new();
/// let (_publisher, cell) = presence_channel();
/// let button = PressLatch::new();
/// let sampler = SignalSampler::new(cell, button.clone(), config.detection.stale_after);
///
/// let mut runner = Runner::new(&config, clock.clone(), sampler, LogSink::new());
/// runner.start();
///
/// button.press();
/// clock.advance(Duration::from_secs(5));
/// let report = runner.run_once();
/// assert_eq!(report.state, IntersectionState::MainYellow);
/// ```
pub struct Runner<C, P, B, S> {
    clock: C,
    sampler: SignalSampler<P, B>,
    controller: Controller,
    sink: S,
    tick_interval: Duration,
    sink_failing: bool,
}

impl<C, P, B, S> Runner<C, P, B, S>
where
    C: Clock,
    P: PresenceSource,
    B: PedestrianInput,
    S: AspectSink,
{
    /// Create a runner whose controller enters `MainGreen` now.
    pub fn new(
        config: &crate::config::ControllerConfig,
        clock: C,
        sampler: SignalSampler<P, B>,
        sink: S,
    ) -> Self {
        let controller = Controller::new(config, clock.now());
        Self {
            clock,
            sampler,
            controller,
            sink,
            tick_interval: config.tick_interval,
            sink_failing: false,
        }
    }

    /// Drive the initial aspects before the first tick.
    pub fn start(&mut self) {
        let now = self.clock.now();
        let report = self.controller.report();
        info!(state = %report.state, "controller started");
        self.drive(&report, now);
    }

    /// Sample, tick and drive outputs once.
    pub fn run_once(&mut self) -> TickReport {
        let now = self.clock.now();
        let signals = self.sampler.sample(now);
        let report = self.controller.tick(signals, now);
        self.drive(&report, now);
        report
    }

    /// Tick forever at the configured interval.
    pub fn run(mut self) -> ! {
        self.start();
        loop {
            let started = self.clock.now();
            self.run_once();
            let spent = self.clock.now().saturating_sub(started);
            thread::sleep(self.tick_interval.saturating_sub(spent));
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn sampler(&self) -> &SignalSampler<P, B> {
        &self.sampler
    }

    fn drive(&mut self, report: &TickReport, now: Duration) {
        match self.sink.drive(report, &self.controller, now) {
            Ok(()) if self.sink_failing => {
                info!("outputs recovered");
                self.sink_failing = false;
            }
            Ok(()) => {}
            Err(e) if !self.sink_failing => {
                error!(error = %e, "failed to drive outputs");
                self.sink_failing = true;
            }
            Err(_) => {}
        }
    }
}
