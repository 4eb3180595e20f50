//! Filesystem-level reconciliation across poll cycles.

use seeing_monitor::store::{reconcile, scan_local, scan_remote, Action};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_reconcile_over_two_cycles() {
    let remote = tempdir().unwrap();
    let local = tempdir().unwrap();

    fs::write(remote.path().join("ngc1234_001.fits"), b"x").unwrap();
    fs::write(remote.path().join("ngc1234_002.spe"), b"x").unwrap();
    // Same logical observation in both physical forms
    fs::write(remote.path().join("ngc1234_003.fits"), b"x").unwrap();
    fs::write(remote.path().join("ngc1234_003.spe"), b"x").unwrap();
    // Unrelated clutter
    fs::write(remote.path().join("notes.txt"), b"x").unwrap();

    let inventory = scan_remote(remote.path()).unwrap();
    let processed = scan_local(local.path()).unwrap();
    let items = reconcile(&inventory, &processed);

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].source_name, "ngc1234_001.fits");
    assert_eq!(items[0].action, Action::Copy);
    assert_eq!(items[1].source_name, "ngc1234_002.spe");
    assert_eq!(items[1].action, Action::Convert);
    assert_eq!(items[2].source_name, "ngc1234_003.fits");
    assert_eq!(items[2].action, Action::Copy);

    // Simulate processing: each item leaves its local FITS behind.
    for item in &items {
        fs::write(local.path().join(&item.local_name), b"x").unwrap();
    }

    // Second cycle sees nothing new even though remote files remain.
    let inventory = scan_remote(remote.path()).unwrap();
    let processed = scan_local(local.path()).unwrap();
    assert!(reconcile(&inventory, &processed).is_empty());
}

#[test]
fn test_new_arrival_mid_run() {
    let remote = tempdir().unwrap();
    let local = tempdir().unwrap();

    fs::write(remote.path().join("a.fits"), b"x").unwrap();
    fs::write(local.path().join("a.fits"), b"x").unwrap();

    let inventory = scan_remote(remote.path()).unwrap();
    let processed = scan_local(local.path()).unwrap();
    assert!(reconcile(&inventory, &processed).is_empty());

    // A raw dump lands between cycles.
    fs::write(remote.path().join("b.spe"), b"x").unwrap();

    let inventory = scan_remote(remote.path()).unwrap();
    let items = reconcile(&inventory, &processed);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].local_name, "b.fits");
    assert_eq!(items[0].action, Action::Convert);
}

#[test]
fn test_scan_local_only_counts_fits() {
    let local = tempdir().unwrap();
    fs::write(local.path().join("a.fits"), b"x").unwrap();
    fs::write(local.path().join("live_fwhm_data.csv"), b"x").unwrap();
    fs::write(local.path().join("temp_sources.coo"), b"x").unwrap();

    let processed = scan_local(local.path()).unwrap();
    assert_eq!(processed.len(), 1);
    assert!(processed.contains("a.fits"));
}
