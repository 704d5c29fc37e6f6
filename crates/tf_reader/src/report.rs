//! Saved Scalars Report
//!
//! Writes the plotted series, their ranking metric and the tag they were
//! ranked by to `saved_scalars/scalars-<timestamp>.txt`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Args;
use tfr_core::params::python_float;
use tfr_core::{Catalog, QueryEngine, QueryEntry};
use tracing::{info, warn};

use crate::cli::FilterArgs;
use crate::plotted::PlotSet;

pub const REPORT_DIR: &str = "saved_scalars";

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Output directory (default: `<root>/saved_scalars`)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(catalog: &Catalog, args: ReportArgs) -> Result<()> {
    let engine = QueryEngine::new(catalog.config())?;
    let mut plots = PlotSet::new();
    plots.rank_by(args.filter.rank_key());
    plots.append(engine.query(catalog, &args.filter.filter()));

    let dir = match (&args.out, catalog.root()) {
        (Some(out), _) => out.clone(),
        (None, Some(root)) => root.join(REPORT_DIR),
        (None, None) => PathBuf::from(REPORT_DIR),
    };
    match write_report(&dir, &plots, &catalog.config().tag_prefix, Local::now())? {
        Some(path) => println!("Saved {} series to {}", plots.len(), path.display()),
        None => warn!("⚠️ Nothing saved: a report needs more than one plotted series"),
    }
    Ok(())
}

/// One report row: both label lines joined, then the metric (float text,
/// so `5.0` rather than `5`) and the displayed rank tag.
pub fn report_line(plots: &PlotSet, entry: &QueryEntry, tag_prefix: &str) -> String {
    let mut label = entry.label.split('\n');
    let first = label.next().unwrap_or_default();
    let second = label.next().unwrap_or_default();
    format!(
        "{}{}   Max Test Avg: {}   Scalar Tag: {}",
        first,
        second,
        python_float(entry.metric),
        plots.ranked_tag(entry, tag_prefix)
    )
}

/// Writes the report into `dir` when more than one series is plotted.
/// Returns the written file.
pub fn write_report(
    dir: &Path,
    plots: &PlotSet,
    tag_prefix: &str,
    now: DateTime<Local>,
) -> Result<Option<PathBuf>> {
    if plots.len() <= 1 {
        return Ok(None);
    }

    fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    let path = dir.join(format!("scalars-{}.txt", now.format("%Y-%m-%d-%H-%M-%S")));

    let mut out = String::from("Scalars Plotted:\n");
    for entry in plots.entries() {
        out.push_str(&report_line(plots, entry, tag_prefix));
        out.push('\n');
    }

    let mut file = fs::File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
    file.write_all(out.as_bytes())?;

    info!("💾 Saved {} series to {:?}", plots.len(), path);
    Ok(Some(path))
}
