//! One observation and the decision drawn from it.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use image::RgbImage;
use tracing::{info, warn};

use super::{Actuator, FrameSource, ObserverLocator};
use crate::classify::{ClassifierRules, classify_and_record};
use crate::explore::{Reachability, SearchPolicy, nearest_candidate, reachable_fog};
use crate::pathfinding::find_path;
use crate::state::{Grid, WorldModel};
use crate::types::*;

/// Everything derived from one bitmap, kept for overlays and status output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observation {
    pub observer: Option<PixelPos>,
    /// `None` when the observer was not found; classification is skipped entirely then.
    pub grid: Option<Grid>,
    pub reachability: Option<Reachability>,
    pub target: Option<Candidate>,
    pub path: Vec<TileCoord>,
    pub decision: Decision,
}

impl Observation {
    fn skipped(observer: Option<PixelPos>, grid: Option<Grid>, reason: SkipReason) -> Self {
        Self {
            observer,
            grid,
            reachability: None,
            target: None,
            path: Vec::new(),
            decision: Decision::Skip(reason),
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        self.reachability.as_ref().map_or(&[], |r| r.candidates.as_slice())
    }

    pub fn status_text(&self) -> String {
        match &self.decision {
            Decision::Skip(SkipReason::ObserverNotFound) => "Observer not found".to_string(),
            Decision::Skip(SkipReason::ObserverOffGrid { .. }) => {
                "Observer not aligned to grid".to_string()
            }
            Decision::Skip(SkipReason::Capture(message)) => format!("Capture failed: {message}"),
            _ => format!("Reachable fog: {}", self.candidates().len()),
        }
    }
}

/// A finished observation together with the frame it was drawn from.
#[derive(Clone, Debug)]
pub struct CycleReport {
    /// `None` when capture failed.
    pub frame: Option<RgbImage>,
    pub observation: Observation,
}

impl CycleReport {
    pub fn decision(&self) -> &Decision {
        &self.observation.decision
    }
}

/// Stateless planning rules; all mutable knowledge lives in the `WorldModel` passed in.
#[derive(Clone, Debug, Default)]
pub struct Navigator {
    pub rules: ClassifierRules,
    pub policy: SearchPolicy,
    /// Pointer motion time handed to the actuator.
    pub transition: Option<Duration>,
}

impl Navigator {
    /// Classifies `bitmap` into world memory and works out the next step, without touching
    /// the visited cache.
    pub fn observe(
        &self,
        world: &mut WorldModel,
        bitmap: &RgbImage,
        observer: Option<PixelPos>,
        now_ms: u64,
    ) -> Observation {
        let Some(observer_pos) = observer else {
            return Observation::skipped(None, None, SkipReason::ObserverNotFound);
        };

        let grid =
            classify_and_record(bitmap, world.geometry(), &self.rules, &mut world.memory, now_ms);
        let reachability = match reachable_fog(observer_pos, &grid, world, &self.policy) {
            Ok(reachability) => reachability,
            Err(reason) => return Observation::skipped(observer, Some(grid), reason),
        };
        info!(
            fog = grid.count(TerrainLabel::Fog),
            reachable = reachability.candidates.len(),
            "frontier search complete"
        );

        let Some(target) = nearest_candidate(observer_pos, &reachability.candidates) else {
            return Observation {
                reachability: Some(reachability),
                ..Observation::skipped(observer, Some(grid), SkipReason::NoReachableTargets)
            };
        };

        let path = find_path(&grid, reachability.anchor, target.tile.coord);
        let decision = match path.get(1) {
            Some(next) => {
                let next = grid.tile(*next);
                Decision::Step { target: target.tile, next, click: next.center() }
            }
            None => Decision::Skip(SkipReason::NoPathFound {
                target: target.tile.coord,
                path_len: path.len(),
            }),
        };

        Observation {
            observer,
            grid: Some(grid),
            reachability: Some(reachability),
            target: Some(target),
            path,
            decision,
        }
    }

    /// `observe`, then records the chosen or unreachable target in the visited cache.
    pub fn plan(
        &self,
        world: &mut WorldModel,
        bitmap: &RgbImage,
        observer: Option<PixelPos>,
        now_ms: u64,
    ) -> Observation {
        let observation = self.observe(world, bitmap, observer, now_ms);
        match &observation.decision {
            Decision::Step { target, click, .. } => {
                let (x, y) = (target.coord.x, target.coord.y);
                info!(x, y, click = ?click, "stepping toward fog");
                world.visited.insert(target.coord);
            }
            Decision::Skip(SkipReason::NoPathFound { target, path_len }) => {
                info!(x = target.x, y = target.y, path_len, "already at or cut off from target");
                world.visited.insert(*target);
            }
            Decision::Skip(reason) => info!(%reason, "navigation cycle skipped"),
        }
        observation
    }

    /// A full navigation cycle. The world lock is held only while planning; capture,
    /// location and actuation run outside it.
    pub fn run_cycle<S, L, A>(
        &self,
        source: &mut S,
        locator: &L,
        actuator: &mut A,
        world: &Mutex<WorldModel>,
        now_ms: u64,
    ) -> CycleReport
    where
        S: FrameSource + ?Sized,
        L: ObserverLocator + ?Sized,
        A: Actuator + ?Sized,
    {
        let report = self.capture_then(source, locator, |bitmap, observer| {
            let mut world = world.lock().unwrap_or_else(PoisonError::into_inner);
            self.plan(&mut world, bitmap, observer, now_ms)
        });
        if let Decision::Step { click, .. } = report.decision() {
            actuator.move_and_trigger(*click, self.transition);
        }
        report
    }

    /// Observation for presentation: updates world memory but never the visited cache,
    /// and never actuates.
    pub fn refresh<S, L>(
        &self,
        source: &mut S,
        locator: &L,
        world: &Mutex<WorldModel>,
        now_ms: u64,
    ) -> CycleReport
    where
        S: FrameSource + ?Sized,
        L: ObserverLocator + ?Sized,
    {
        self.capture_then(source, locator, |bitmap, observer| {
            let mut world = world.lock().unwrap_or_else(PoisonError::into_inner);
            self.observe(&mut world, bitmap, observer, now_ms)
        })
    }

    fn capture_then<S, L, F>(&self, source: &mut S, locator: &L, then: F) -> CycleReport
    where
        S: FrameSource + ?Sized,
        L: ObserverLocator + ?Sized,
        F: FnOnce(&RgbImage, Option<PixelPos>) -> Observation,
    {
        let frame = match source.capture() {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "frame capture failed");
                let reason = SkipReason::Capture(err.to_string());
                return CycleReport {
                    frame: None,
                    observation: Observation::skipped(None, None, reason),
                };
            }
        };
        let observer = locator.locate(&frame);
        let observation = then(&frame, observer);
        CycleReport { frame: Some(frame), observation }
    }
}
