//! Frame store reconciliation.
//!
//! Compares the remote frame inventory against the set of frames already
//! mirrored locally and produces the ordered list of pending work. A logical
//! observation may exist remotely in two physical forms: a pre-reduced FITS
//! image, or a raw SPE sensor dump that still needs conversion. Both map to
//! the same local `<base>.fits`, so reconciliation is keyed on the base name.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

/// How a pending observation reaches the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Remote pre-reduced FITS file, copied verbatim
    Copy,
    /// Raw SPE dump, decoded and written out as FITS
    Convert,
}

/// One pending observation, consumed exactly once by the pipeline driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Filename at the remote location
    pub source_name: String,
    /// Filename of the local FITS output (`<base>.fits`)
    pub local_name: String,
    /// Transfer mode
    pub action: Action,
}

/// Transient per-cycle grouping of remote files sharing a base name.
#[derive(Debug, Default)]
struct FrameGroup {
    preprocessed: Option<String>,
    raw: Option<String>,
}

fn split_base_ext(name: &str) -> (&str, String) {
    match name.rsplit_once('.') {
        Some((base, ext)) => (base, ext.to_ascii_lowercase()),
        None => (name, String::new()),
    }
}

/// Compute the pending work for one scan cycle.
///
/// `remote` is the full remote inventory; `local_fits` is the set of FITS
/// filenames already present locally. The result is sorted by source
/// filename so processing order is deterministic.
///
/// Rules:
/// - a base name whose `<base>.fits` already exists locally yields nothing,
///   regardless of what is still present remotely
/// - a remote FITS always wins over a raw dump with the same base name
/// - a base name with neither recognized format yields nothing
pub fn reconcile(remote: &[String], local_fits: &HashSet<String>) -> Vec<WorkItem> {
    // BTreeMap keeps group iteration stable; final order is by source name.
    let mut groups: BTreeMap<String, FrameGroup> = BTreeMap::new();

    for name in remote {
        let (base, ext) = split_base_ext(name);
        let group = groups.entry(base.to_string()).or_default();
        match ext.as_str() {
            "fits" => group.preprocessed = Some(name.clone()),
            "spe" => group.raw = Some(name.clone()),
            _ => {}
        }
    }

    let mut items = Vec::new();
    for (base, group) in groups {
        let local_name = format!("{base}.fits");
        if local_fits.contains(&local_name) {
            continue;
        }

        if let Some(source_name) = group.preprocessed {
            items.push(WorkItem {
                source_name,
                local_name,
                action: Action::Copy,
            });
        } else if let Some(source_name) = group.raw {
            items.push(WorkItem {
                source_name,
                local_name,
                action: Action::Convert,
            });
        }
    }

    items.sort_by(|a, b| a.source_name.cmp(&b.source_name));
    items
}

/// List every filename in the remote directory.
///
/// Non-UTF-8 names are skipped; the reconciler could never match them to a
/// local FITS name anyway.
pub fn scan_remote(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Collect the FITS filenames already present in the local store.
pub fn scan_local(dir: &Path) -> io::Result<HashSet<String>> {
    let mut names = HashSet::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            let (_, ext) = split_base_ext(name);
            if ext == "fits" {
                names.insert(name.to_string());
            }
        }
    }
    Ok(names)
}
