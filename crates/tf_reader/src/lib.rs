//! TF Reader
//!
//! Headless front end over `tfr_core`: command-line parsing, the plotted
//! series registry and the saved-scalars report.

pub mod cli;
pub mod facets;
pub mod info;
pub mod plotted;
pub mod query;
pub mod report;
