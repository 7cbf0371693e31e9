//! The collaborators and world model one process drives.
//! This module exists so blocking capture, matching and actuation run off the async loop
//! behind one shared handle.
//! It does not own scheduling or toggling; see `controller`.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use fogchart_core::{
    Actuator, CycleReport, FrameSource, Navigator, ObserverLocator, PixelPos, WorldModel,
    annotate, format_snapshot_hash,
};
use tracing::{debug, info, warn};

use crate::actuator::{CommandActuator, DryRunActuator, Settling};
use crate::config::AppConfig;
use crate::control_input::calibrate_offset;
use crate::frame_source::FileFrameSource;
use crate::locator::TemplateLocator;
use crate::overlay_file;

pub type BoxedSource = Box<dyn FrameSource + Send>;
pub type BoxedLocator = Box<dyn ObserverLocator + Send + Sync>;
pub type BoxedActuator = Box<dyn Actuator + Send>;

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Pipeline {
    navigator: Navigator,
    source: Mutex<BoxedSource>,
    locator: BoxedLocator,
    actuator: Mutex<BoxedActuator>,
    world: Mutex<WorldModel>,
    last_frame_size: Mutex<Option<(u32, u32)>>,
    overlay: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(
        navigator: Navigator,
        source: BoxedSource,
        locator: BoxedLocator,
        actuator: BoxedActuator,
        world: WorldModel,
    ) -> Self {
        Self {
            navigator,
            source: Mutex::new(source),
            locator,
            actuator: Mutex::new(actuator),
            world: Mutex::new(world),
            last_frame_size: Mutex::new(None),
            overlay: None,
        }
    }

    pub fn with_overlay(mut self, path: Option<PathBuf>) -> Self {
        self.overlay = path;
        self
    }

    pub fn from_config(config: &AppConfig, dry_run: bool) -> Result<Self> {
        let navigator = Navigator {
            rules: config.classifier,
            policy: config.search,
            transition: config.timing.transition(),
        };
        let locator = TemplateLocator::load(
            &config.locator.template,
            config.locator.confidence,
            config.locator.coarse_factor,
        )
        .with_context(|| {
            format!("failed to load observer template {}", config.locator.template.display())
        })?;

        let actuator: BoxedActuator = match (&config.actuator.command, dry_run) {
            (Some(argv), false) => Box::new(Settling::new(
                CommandActuator::new(argv.clone()),
                config.timing.settle(),
            )),
            (None, false) => {
                warn!("no actuator command configured, clicks will only be logged");
                Box::new(DryRunActuator)
            }
            (_, true) => Box::new(DryRunActuator),
        };

        Ok(Self::new(
            navigator,
            Box::new(FileFrameSource::from_config(&config.capture)),
            Box::new(locator),
            actuator,
            WorldModel::new(config.grid),
        )
        .with_overlay(config.output.overlay.clone()))
    }

    /// A full navigation cycle; may actuate and grows the visited cache.
    pub fn navigate(&self, now_ms: u64) -> CycleReport {
        let report = {
            let mut source = lock(&self.source);
            let mut actuator = lock(&self.actuator);
            self.navigator.run_cycle(
                &mut **source,
                &*self.locator,
                &mut **actuator,
                &self.world,
                now_ms,
            )
        };
        self.publish(&report);
        report
    }

    /// Observation only: never actuates and never touches the visited cache.
    pub fn refresh(&self, now_ms: u64) -> CycleReport {
        let report = {
            let mut source = lock(&self.source);
            self.navigator.refresh(&mut **source, &*self.locator, &self.world, now_ms)
        };
        self.publish(&report);
        report
    }

    /// Re-anchors the grid from a click on a displayed view of the last frame. Starts a
    /// new grid session; returns the new offsets.
    pub fn calibrate(&self, click: PixelPos, display: (u32, u32)) -> Option<(u32, u32)> {
        let Some(source_size) = *lock(&self.last_frame_size) else {
            warn!("no frame captured yet, cannot calibrate");
            return None;
        };
        let Some((offset_x, offset_y)) = calibrate_offset(click, display, source_size) else {
            let display_size = display;
            warn!(display = ?display_size, "degenerate display size, cannot calibrate");
            return None;
        };
        lock(&self.world).recalibrate(offset_x, offset_y);
        info!(offset_x, offset_y, "grid offset calibrated, world memory cleared");
        Some((offset_x, offset_y))
    }

    pub fn world(&self) -> MutexGuard<'_, WorldModel> {
        lock(&self.world)
    }

    fn publish(&self, report: &CycleReport) {
        let Some(frame) = &report.frame else {
            return;
        };
        *lock(&self.last_frame_size) = Some(frame.dimensions());
        if let Some(grid) = &report.observation.grid {
            debug!(hash = %format_snapshot_hash(grid.snapshot_hash()), tiles = grid.len(), "grid");
        }
        if let Some(path) = &self.overlay {
            let annotated = annotate(frame, &report.observation);
            if let Err(err) = overlay_file::write_atomic(&annotated, path) {
                warn!(error = %err, path = %path.display(), "could not write overlay");
            }
        }
    }
}
