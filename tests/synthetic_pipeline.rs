//! End-to-end work item processing on synthetic frames.
//!
//! Exercises the full convert/copy paths: SPE decode, FITS round trip, star
//! detection, candidate selection, the coordinate scratch file and the
//! results log, with the external collaborators replaced by fakes.

use seeing_monitor::config::MonitorConfig;
use seeing_monitor::console::{Confirm, OperatorConsole};
use seeing_monitor::display::NullDisplay;
use seeing_monitor::pipeline::{Pipeline, ProcessOutcome};
use seeing_monitor::psf::{PsfError, PsfMeasure, PsfMeasurement};
use seeing_monitor::select::read_coord_file;
use seeing_monitor::spe::HEADER_LEN;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

/// Measurement fake: returns a canned result and counts invocations.
struct FakeMeasure {
    result: Option<PsfMeasurement>,
    calls: Arc<AtomicUsize>,
}

impl PsfMeasure for FakeMeasure {
    fn measure(
        &mut self,
        _frame_path: &Path,
        coord_path: &Path,
    ) -> Result<Option<PsfMeasurement>, PsfError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(coord_path.exists(), "coordinate file must exist when measuring");
        Ok(self.result.clone())
    }
}

/// Console fake: always proceeds, hands out a fixed focus value.
struct ScriptedConsole {
    focus: Option<String>,
}

impl OperatorConsole for ScriptedConsole {
    fn confirm(&mut self, _prompt: &str) -> Confirm {
        Confirm::Proceed
    }

    fn prompt_value(&mut self, _prompt: &str) -> Option<String> {
        self.focus.clone()
    }
}

fn measurement() -> PsfMeasurement {
    PsfMeasurement {
        avg_fwhm_pix: 3.4,
        avg_ellipticity: 0.12,
        individual_fwhms: vec![3.4],
        n_stars: 1,
    }
}

/// Write a float32 SPE file containing a flat background plus Gaussian peaks.
fn write_spe_file(path: &Path, width: u16, height: u16, stars: &[(f64, f64, f64)]) {
    let mut header = vec![0u8; HEADER_LEN];
    header[42..44].copy_from_slice(&width.to_le_bytes());
    header[656..658].copy_from_slice(&height.to_le_bytes());
    header[108..110].copy_from_slice(&0i16.to_le_bytes()); // float32 payload

    let mut pixels = vec![100.0f32; width as usize * height as usize];
    for &(cx, cy, amplitude) in stars {
        let sigma = 1.5;
        for y in 0..height as usize {
            for x in 0..width as usize {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                let r2 = dx * dx + dy * dy;
                if r2 < 36.0 {
                    pixels[y * width as usize + x] +=
                        (amplitude * (-r2 / (2.0 * sigma * sigma)).exp()) as f32;
                }
            }
        }
    }

    let mut bytes = header;
    bytes.extend(pixels.iter().flat_map(|v| v.to_le_bytes()));
    fs::write(path, bytes).unwrap();
}

struct Fixture {
    _remote: TempDir,
    _local: TempDir,
    remote_dir: PathBuf,
    config: MonitorConfig,
    calls: Arc<AtomicUsize>,
}

fn fixture() -> Fixture {
    let remote = tempdir().unwrap();
    let local = tempdir().unwrap();
    let remote_dir = remote.path().to_path_buf();
    let config = MonitorConfig::new(remote_dir.clone(), local.path().to_path_buf());
    Fixture {
        _remote: remote,
        _local: local,
        remote_dir,
        config,
        calls: Arc::new(AtomicUsize::new(0)),
    }
}

fn pipeline(
    fix: &Fixture,
    result: Option<PsfMeasurement>,
    focus: Option<String>,
) -> Pipeline<ScriptedConsole, FakeMeasure, NullDisplay> {
    let measurer = FakeMeasure {
        result,
        calls: fix.calls.clone(),
    };
    Pipeline::new(
        fix.config.clone(),
        ScriptedConsole { focus },
        measurer,
        NullDisplay,
    )
    .unwrap()
}

#[test]
fn test_convert_path_measures_and_logs() {
    let fix = fixture();
    write_spe_file(
        &fix.remote_dir.join("focus_0420.spe"),
        64,
        64,
        &[(30.0, 40.0, 1000.0)],
    );

    let mut pipe = pipeline(&fix, Some(measurement()), Some("12.5".to_string()));

    let items = pipe.scan_cycle().unwrap();
    assert_eq!(items.len(), 1);

    let outcome = pipe.process_item(&items[0]).unwrap();
    let record = match outcome {
        ProcessOutcome::Measured(record) => record,
        other => panic!("expected a measurement, got {other:?}"),
    };

    assert_eq!(record.filename, "focus_0420.fits");
    assert_eq!(record.focus, "12.5");
    assert!((record.fwhm_pix - 3.4).abs() < 1e-12);
    assert!((record.fwhm_arcsec - 3.4 * 0.257).abs() < 1e-12);

    // Converted FITS landed in the local store with the focus in its header
    let fits_path = fix.config.local_dir.join("focus_0420.fits");
    assert!(fits_path.exists());
    assert_eq!(
        seeing_monitor::frame::read_keyword(&fits_path, "FOCUS"),
        Some("12.5".to_string())
    );

    // The coordinate file holds the single detected peak, 1-based
    let coords = read_coord_file(&fix.config.coord_path).unwrap();
    assert_eq!(coords, vec![(31.0, 41.0)]);

    // One row in the log, plus header
    let log = fs::read_to_string(&fix.config.log_path).unwrap();
    assert_eq!(log.lines().count(), 2);
    assert_eq!(fix.calls.load(Ordering::SeqCst), 1);

    // The next cycle sees the observation as satisfied
    assert!(pipe.scan_cycle().unwrap().is_empty());
}

#[test]
fn test_saturated_peak_excluded_from_candidates() {
    let fix = fixture();
    write_spe_file(
        &fix.remote_dir.join("bright.spe"),
        96,
        96,
        &[(25.0, 25.0, 150_000.0), (70.0, 60.0, 5_000.0)],
    );

    let mut pipe = pipeline(&fix, Some(measurement()), None);
    let items = pipe.scan_cycle().unwrap();
    let outcome = pipe.process_item(&items[0]).unwrap();
    assert!(matches!(outcome, ProcessOutcome::Measured(_)));

    // Only the unsaturated star reaches the coordinate file
    let coords = read_coord_file(&fix.config.coord_path).unwrap();
    assert_eq!(coords, vec![(71.0, 61.0)]);
}

#[test]
fn test_starless_frame_skips_measurement() {
    let fix = fixture();
    write_spe_file(&fix.remote_dir.join("blank.spe"), 64, 64, &[]);

    let mut pipe = pipeline(&fix, Some(measurement()), None);
    let items = pipe.scan_cycle().unwrap();
    let outcome = pipe.process_item(&items[0]).unwrap();

    assert_eq!(outcome, ProcessOutcome::NoUsableCandidates);
    // Measurement tool never invoked, no coordinate file written
    assert_eq!(fix.calls.load(Ordering::SeqCst), 0);
    assert!(!fix.config.coord_path.exists());
    assert!(!fix.config.log_path.exists());
}

#[test]
fn test_unparseable_measurement_writes_no_row() {
    let fix = fixture();
    write_spe_file(
        &fix.remote_dir.join("hazy.spe"),
        64,
        64,
        &[(32.0, 32.0, 800.0)],
    );

    let mut pipe = pipeline(&fix, None, None);
    let items = pipe.scan_cycle().unwrap();
    let outcome = pipe.process_item(&items[0]).unwrap();

    assert_eq!(outcome, ProcessOutcome::NoParseableResult);
    assert_eq!(fix.calls.load(Ordering::SeqCst), 1);
    assert!(!fix.config.log_path.exists());
}

#[test]
fn test_bad_sample_type_abandons_item_only() {
    let fix = fixture();

    // A corrupt raw dump next to a good one
    let mut bad = vec![0u8; HEADER_LEN + 32];
    bad[42..44].copy_from_slice(&4u16.to_le_bytes());
    bad[656..658].copy_from_slice(&4u16.to_le_bytes());
    bad[108..110].copy_from_slice(&9i16.to_le_bytes());
    fs::write(fix.remote_dir.join("corrupt.spe"), bad).unwrap();
    write_spe_file(
        &fix.remote_dir.join("good.spe"),
        64,
        64,
        &[(20.0, 20.0, 900.0)],
    );

    let mut pipe = pipeline(&fix, Some(measurement()), None);
    let items = pipe.scan_cycle().unwrap();
    assert_eq!(items.len(), 2);

    // The corrupt one fails with a decode error...
    assert!(pipe.process_item(&items[0]).is_err());
    // ...and the good one still goes through
    assert!(matches!(
        pipe.process_item(&items[1]).unwrap(),
        ProcessOutcome::Measured(_)
    ));
}
