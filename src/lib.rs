//! Live FWHM seeing monitor for telescope focus runs.
//!
//! Watches a remote directory for newly captured frames, mirrors them into a
//! local store (decoding raw SPE sensor dumps to FITS when no pre-reduced
//! frame exists), detects candidate stars, selects the brightest unsaturated
//! ones and hands them to an external PSF measurement tool. Parsed results
//! are appended to a CSV log that a plotting front end can tail.
//!
//! The crate is a library plus one binary (`seeing_monitor`); the modules
//! mirror the processing order:
//!
//! - [`store`] decides which remote files are new work
//! - [`spe`] decodes raw sensor dumps
//! - [`frame`] reads and writes FITS frames
//! - [`background`] / [`detect`] find star candidates
//! - [`select`] ranks them and writes the coordinate scratch file
//! - [`psf`] / [`display`] are the external collaborator seams
//! - [`pipeline`] drives the poll loop

pub mod background;
pub mod config;
pub mod console;
pub mod detect;
pub mod display;
pub mod frame;
pub mod fwhm_log;
pub mod pipeline;
pub mod psf;
pub mod select;
pub mod spe;
pub mod store;

pub use config::{DetectionConfig, MonitorConfig, SelectionConfig};
pub use detect::Source;
pub use pipeline::{Pipeline, ProcessOutcome};
pub use store::{Action, WorkItem};
