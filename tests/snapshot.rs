//! Stereo snapshot loop driven by a manual clock.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use csi_camera::capture::{
    CaptureBackend, FrameSource, MockFeeder, MockSource, PipelineDescriptor, SyntheticSource,
};
use csi_camera::preview::{HeadlessDisplay, HeadlessHandle, Interruptible};
use csi_camera::snapshot::{open_pair, ManualClock, SavedPair, SnapshotConfig, SnapshotSession};
use csi_camera::{CaptureError, Frame, PipelineConfig, StepOutcome};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Rig {
    session: SnapshotSession<ManualClock>,
    clock: ManualClock,
    right: MockFeeder,
    left: MockFeeder,
    display: HeadlessHandle,
    _output: tempfile::TempDir,
    output_dir: PathBuf,
}

fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 7, 9)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

fn rig() -> Rig {
    let output = tempfile::tempdir().unwrap();
    let output_dir = output.path().join("images");
    let (right_source, right) = MockSource::new();
    let (left_source, left) = MockSource::new();
    let display = HeadlessDisplay::default();
    let handle = display.handle();
    let clock = ManualClock::new(start_time());
    let config = SnapshotConfig {
        output_dir: output_dir.clone(),
        key_poll_ms: 1,
        ..SnapshotConfig::default()
    };

    let session = SnapshotSession::new(
        Box::new(right_source),
        Box::new(left_source),
        Box::new(display),
        clock.clone(),
        config,
    )
    .unwrap();

    Rig {
        session,
        clock,
        right,
        left,
        display: handle,
        _output: output,
        output_dir,
    }
}

impl Rig {
    fn feed(&self, sequence: u64) {
        self.right.push(Frame::filled(4, 2, [10, 20, 30], sequence));
        self.left.push(Frame::filled(4, 2, [40, 50, 60], sequence));
    }

    fn step_after(&mut self, millis: i64) -> StepOutcome {
        self.clock.advance(TimeDelta::milliseconds(millis));
        self.feed(1);
        self.session.step()
    }
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[test]
fn saves_one_pair_after_five_seconds() {
    let mut rig = rig();

    assert_eq!(rig.step_after(0), StepOutcome::Continue);
    assert_eq!(rig.step_after(2500), StepOutcome::Continue);
    assert_eq!(rig.step_after(2499), StepOutcome::Continue);

    let outcome = rig.step_after(1);
    let right_dir = rig.output_dir.join("Right").join("2024-07-09");
    let left_dir = rig.output_dir.join("Left").join("2024-07-09");
    assert_eq!(
        outcome,
        StepOutcome::Saved(SavedPair {
            right: right_dir.join("10:00:05.png"),
            left: left_dir.join("10:00:05.png"),
        })
    );

    // The timer restarts from the save.
    assert_eq!(rig.step_after(0), StepOutcome::Continue);
    assert_eq!(rig.step_after(4000), StepOutcome::Continue);

    assert_eq!(files_in(&right_dir), vec!["10:00:05.png"]);
    assert_eq!(files_in(&left_dir), vec!["10:00:05.png"]);
    assert_eq!(rig.session.pairs_saved(), 1);

    assert!(matches!(rig.step_after(1000), StepOutcome::Saved(_)));
    assert_eq!(files_in(&right_dir), vec!["10:00:05.png", "10:00:10.png"]);
}

#[test]
fn saved_images_are_rotated_and_converted_to_rgb() {
    let mut rig = rig();
    rig.clock.advance(TimeDelta::seconds(5));

    // Top-left pixel marked, everything else black.
    let mut pixels = vec![0u8; 4 * 2 * 3];
    pixels[..3].copy_from_slice(&[1, 2, 3]);
    rig.right.push(Frame::new(pixels, 4, 2, 1));
    rig.left.push(Frame::filled(4, 2, [0, 0, 0], 1));

    let StepOutcome::Saved(pair) = rig.session.step() else {
        panic!("expected a save");
    };

    let image = image::open(&pair.right).unwrap().to_rgb8();
    assert_eq!(image.dimensions(), (4, 2));
    assert_eq!(image.get_pixel(3, 1).0, [3, 2, 1]);
    assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
}

#[test]
fn new_day_gets_its_own_folder() {
    let mut rig = rig();
    rig.clock
        .set(start_time().date().and_hms_opt(23, 59, 53).unwrap());
    assert!(matches!(rig.step_after(5000), StepOutcome::Saved(_)));
    assert!(matches!(rig.step_after(5000), StepOutcome::Saved(_)));

    assert_eq!(
        files_in(&rig.output_dir.join("Left").join("2024-07-09")),
        vec!["23:59:58.png"]
    );
    assert_eq!(
        files_in(&rig.output_dir.join("Left").join("2024-07-10")),
        vec!["00:00:03.png"]
    );
}

#[test]
fn wall_clock_stepping_back_does_not_pause_saving() {
    let mut rig = rig();
    assert!(matches!(rig.step_after(5000), StepOutcome::Saved(_)));

    // Daylight saving ends: local time falls back an hour.
    rig.clock
        .set(start_time().date().and_hms_opt(9, 0, 5).unwrap());
    assert_eq!(rig.step_after(4000), StepOutcome::Continue);

    let StepOutcome::Saved(pair) = rig.step_after(1000) else {
        panic!("expected a save five seconds after the last one");
    };
    assert!(pair.right.ends_with("09:00:10.png"));
    assert_eq!(rig.session.pairs_saved(), 2);
}

#[test]
fn failed_read_skips_the_iteration() {
    let mut rig = rig();
    rig.clock.advance(TimeDelta::seconds(6));
    rig.right.fail("no signal");
    rig.left.push(Frame::filled(4, 2, [0, 0, 0], 1));

    assert_eq!(rig.session.step(), StepOutcome::Skipped);
    assert_eq!(rig.display.frames_shown(), 0);
    assert!(!rig.output_dir.exists());

    assert!(matches!(rig.step_after(0), StepOutcome::Saved(_)));
    assert_eq!(rig.display.frames_shown(), 2);
}

#[test]
fn closing_a_window_ends_the_run() {
    let rig = rig();
    rig.feed(1);
    rig.display.close_window("Left Camera");

    let saved = rig.session.run();

    assert_eq!(saved, 0);
    assert!(rig.right.is_released());
    assert!(rig.left.is_released());
    assert!(!rig.display.is_window_open("Right Camera"));
}

#[test]
fn escape_ends_the_run() {
    let mut rig = rig();
    rig.display.press_escape();

    assert_eq!(rig.step_after(0), StepOutcome::Stop);
}

#[test]
fn raised_cancel_flag_ends_the_run() {
    let (right_source, right) = MockSource::new();
    let (left_source, left) = MockSource::new();
    let cancel = Arc::new(AtomicBool::new(false));
    let display = Interruptible::new(HeadlessDisplay::default(), Arc::clone(&cancel));
    let output = tempfile::tempdir().unwrap();
    let config = SnapshotConfig {
        output_dir: output.path().join("images"),
        key_poll_ms: 1,
        ..SnapshotConfig::default()
    };
    let session = SnapshotSession::new(
        Box::new(right_source),
        Box::new(left_source),
        Box::new(display),
        ManualClock::new(start_time()),
        config,
    )
    .unwrap();

    right.push(Frame::filled(4, 2, [0, 0, 0], 1));
    left.push(Frame::filled(4, 2, [0, 0, 0], 1));
    cancel.store(true, Ordering::SeqCst);

    assert_eq!(session.run(), 0);
    assert!(right.is_released());
    assert!(left.is_released());
}

struct HalfOpenBackend;

impl CaptureBackend for HalfOpenBackend {
    fn open(&self, _: &PipelineDescriptor, config: &PipelineConfig) -> Box<dyn FrameSource> {
        if config.sensor_id == 0 {
            Box::new(SyntheticSource::new(config))
        } else {
            Box::new(MockSource::closed().0)
        }
    }
}

#[test]
fn open_pair_reports_the_failing_sensor() {
    let result = open_pair(
        &HalfOpenBackend,
        &PipelineConfig::square(0),
        &PipelineConfig::square(1),
    );

    assert!(matches!(result, Err(CaptureError::Open { sensor_id: 1, .. })));
}
