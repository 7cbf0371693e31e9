//! Cycle-level tests with in-memory collaborators.

use std::sync::Mutex;
use std::time::Duration;

use image::RgbImage;

use super::*;
use crate::explore::SearchPolicy;
use crate::state::WorldModel;
use crate::test_support::*;
use crate::types::*;

use crate::types::TerrainLabel::{Fog, Land, Water};

struct StaticSource(Option<RgbImage>);

impl FrameSource for StaticSource {
    fn capture(&mut self) -> Result<RgbImage, CaptureError> {
        self.0.clone().ok_or_else(|| CaptureError::Command {
            command: "grab".to_string(),
            status: "exit status: 1".to_string(),
        })
    }
}

struct FixedLocator(Option<PixelPos>);

impl ObserverLocator for FixedLocator {
    fn locate(&self, _bitmap: &RgbImage) -> Option<PixelPos> {
        self.0
    }
}

#[derive(Default)]
struct RecordingActuator(Vec<(PixelPos, Option<Duration>)>);

impl Actuator for RecordingActuator {
    fn move_and_trigger(&mut self, target: PixelPos, transition: Option<Duration>) {
        self.0.push((target, transition));
    }
}

fn navigator() -> Navigator {
    Navigator { transition: Some(Duration::from_millis(300)), ..Navigator::default() }
}

/// `LAND FOG WATER LAND FOG` in one row.
fn gapped_row() -> RgbImage {
    paint_tiles(GridGeometry::default(), 5, 1, &[Land, Fog, Water, Land, Fog])
}

#[test]
fn cycle_steps_toward_nearest_fog_and_caches_it() {
    let world = Mutex::new(WorldModel::default());
    let mut source = StaticSource(Some(gapped_row()));
    let locator = FixedLocator(Some(center_of(tile_at(2, 0))));
    let mut actuator = RecordingActuator::default();

    let report = navigator().run_cycle(&mut source, &locator, &mut actuator, &world, 1_000);

    assert_eq!(report.observation.path, vec![tile_at(2, 0), tile_at(1, 0)]);
    let Decision::Step { target, next, click } = report.decision() else {
        panic!("expected a step, got {:?}", report.decision());
    };
    assert_eq!(target.coord, tile_at(1, 0));
    assert_eq!(next.coord, tile_at(1, 0));
    assert_eq!(*click, PixelPos::new(75, 22));
    assert_eq!(actuator.0, vec![(PixelPos::new(75, 22), Some(Duration::from_millis(300)))]);

    let world = world.lock().expect("unpoisoned");
    assert!(world.visited.contains(tile_at(1, 0)));
    assert_eq!(world.memory.len(), 5);
    assert_eq!(world.memory.get(tile_at(4, 0)).map(|e| e.last_seen_ms), Some(1_000));
}

#[test]
fn unreachable_remembered_fog_is_cached_without_actuation() {
    let world = Mutex::new(WorldModel::default());
    let mut source = StaticSource(Some(gapped_row()));
    let locator = FixedLocator(Some(center_of(tile_at(2, 0))));
    let mut actuator = RecordingActuator::default();
    let nav = navigator();

    nav.run_cycle(&mut source, &locator, &mut actuator, &world, 1);
    let second = nav.run_cycle(&mut source, &locator, &mut actuator, &world, 2);

    // The frontier tile is cached; only the fog beyond the land gap remains.
    assert_eq!(
        second.decision(),
        &Decision::Skip(SkipReason::NoPathFound { target: tile_at(4, 0), path_len: 0 })
    );
    assert_eq!(actuator.0.len(), 1);
    assert!(world.lock().expect("unpoisoned").visited.contains(tile_at(4, 0)));
}

#[test]
fn blocked_remembered_fog_is_not_offered_again() {
    let world = Mutex::new(WorldModel::default());
    let mut source = StaticSource(Some(gapped_row()));
    let locator = FixedLocator(Some(center_of(tile_at(2, 0))));
    let mut actuator = RecordingActuator::default();
    let nav = navigator();

    for now in 0..2 {
        nav.run_cycle(&mut source, &locator, &mut actuator, &world, now);
    }
    for now in 2..5 {
        let report = nav.run_cycle(&mut source, &locator, &mut actuator, &world, now);
        assert_eq!(report.decision(), &Decision::Skip(SkipReason::NoReachableTargets));
        assert_eq!(report.observation.status_text(), "Reachable fog: 0");
    }
    assert_eq!(actuator.0.len(), 1);
}

#[test]
fn retry_policy_offers_blocked_fog_again() {
    let world = Mutex::new(WorldModel::default());
    let mut source = StaticSource(Some(gapped_row()));
    let locator = FixedLocator(Some(center_of(tile_at(2, 0))));
    let mut actuator = RecordingActuator::default();
    let nav = Navigator { policy: SearchPolicy { retry_remembered: true }, ..navigator() };

    for now in 0..2 {
        nav.run_cycle(&mut source, &locator, &mut actuator, &world, now);
    }
    let third = nav.run_cycle(&mut source, &locator, &mut actuator, &world, 2);
    assert_eq!(
        third.decision(),
        &Decision::Skip(SkipReason::NoPathFound { target: tile_at(4, 0), path_len: 0 })
    );
}

#[test]
fn unreachable_nearer_fog_is_skipped_once_then_farther_fog_is_stepped_toward() {
    let world = Mutex::new(WorldModel::default());
    let bitmap = paint_tiles(GridGeometry::default(), 6, 1, &[Fog, Land, Water, Water, Water, Fog]);
    let mut source = StaticSource(Some(bitmap));
    let locator = FixedLocator(Some(center_of(tile_at(2, 0))));
    let mut actuator = RecordingActuator::default();
    let nav = navigator();

    let first = nav.run_cycle(&mut source, &locator, &mut actuator, &world, 0);
    assert_eq!(
        first.decision(),
        &Decision::Skip(SkipReason::NoPathFound { target: tile_at(0, 0), path_len: 0 })
    );
    assert!(actuator.0.is_empty());

    let second = nav.run_cycle(&mut source, &locator, &mut actuator, &world, 1);
    let Decision::Step { target, next, .. } = second.decision() else {
        panic!("expected a step, got {:?}", second.decision());
    };
    assert_eq!(target.coord, tile_at(5, 0));
    assert_eq!(next.coord, tile_at(3, 0));
    assert_eq!(actuator.0.len(), 1);
    assert_eq!(actuator.0[0].0, center_of(tile_at(3, 0)));
}

#[test]
fn standing_on_the_only_fog_is_already_at_destination() {
    let geometry = GridGeometry::default();
    let world = Mutex::new(WorldModel::new(geometry));
    let mut source = StaticSource(Some(paint_tiles(geometry, 2, 1, &[Water, Fog])));
    let locator = FixedLocator(Some(center_of(tile_at(1, 0))));
    let mut actuator = RecordingActuator::default();

    let report = navigator().run_cycle(&mut source, &locator, &mut actuator, &world, 0);

    assert_eq!(report.observation.path, vec![tile_at(1, 0)]);
    assert_eq!(
        report.decision(),
        &Decision::Skip(SkipReason::NoPathFound { target: tile_at(1, 0), path_len: 1 })
    );
    assert!(actuator.0.is_empty());
    assert!(world.lock().expect("unpoisoned").visited.contains(tile_at(1, 0)));
}

#[test]
fn missing_observer_skips_classification() {
    let world = Mutex::new(WorldModel::default());
    let mut source = StaticSource(Some(gapped_row()));
    let mut actuator = RecordingActuator::default();

    let report =
        navigator().run_cycle(&mut source, &FixedLocator(None), &mut actuator, &world, 0);

    assert_eq!(report.decision(), &Decision::Skip(SkipReason::ObserverNotFound));
    assert_eq!(report.observation.status_text(), "Observer not found");
    assert!(report.observation.grid.is_none());
    assert!(report.frame.is_some());
    assert!(world.lock().expect("unpoisoned").memory.is_empty());
    assert!(actuator.0.is_empty());
}

#[test]
fn observer_off_grid_keeps_classification() {
    let world = Mutex::new(WorldModel::default());
    let mut source = StaticSource(Some(gapped_row()));
    let locator = FixedLocator(Some(PixelPos::new(5_000, 5_000)));
    let mut actuator = RecordingActuator::default();

    let report = navigator().run_cycle(&mut source, &locator, &mut actuator, &world, 0);

    assert_eq!(
        report.decision(),
        &Decision::Skip(SkipReason::ObserverOffGrid { observer: PixelPos::new(5_000, 5_000) })
    );
    assert_eq!(world.lock().expect("unpoisoned").memory.len(), 5);
}

#[test]
fn capture_failure_is_a_skipped_cycle() {
    let world = Mutex::new(WorldModel::default());
    let mut source = StaticSource(None);
    let locator = FixedLocator(Some(PixelPos::new(0, 0)));
    let mut actuator = RecordingActuator::default();

    let report = navigator().run_cycle(&mut source, &locator, &mut actuator, &world, 0);

    assert!(report.frame.is_none());
    assert!(matches!(report.decision(), Decision::Skip(SkipReason::Capture(_))));
    assert!(report.observation.status_text().starts_with("Capture failed"));
}

#[test]
fn refresh_updates_memory_but_not_the_visited_cache() {
    let world = Mutex::new(WorldModel::default());
    let mut source = StaticSource(Some(gapped_row()));
    let locator = FixedLocator(Some(center_of(tile_at(2, 0))));

    let report = navigator().refresh(&mut source, &locator, &world, 9);

    assert!(matches!(report.decision(), Decision::Step { .. }));
    assert_eq!(report.observation.status_text(), "Reachable fog: 2");
    let world = world.lock().expect("unpoisoned");
    assert_eq!(world.memory.len(), 5);
    assert!(world.visited.is_empty());
}
