use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tfr_core::series::display_tag;
use tfr_core::{Catalog, EventFileReader, ScalarSource};

#[derive(Args, Debug, Clone)]
pub struct InfoArgs {
    /// Run directory, absolute or relative to the root
    pub run: PathBuf,

    /// Also list the scalar tags of the run's event log
    #[arg(long)]
    pub tags: bool,
}

pub fn run(catalog: &Catalog, args: InfoArgs) -> Result<()> {
    let session = catalog
        .find_run(&args.run)
        .with_context(|| format!("No discovered run matches {:?}", args.run))?;

    println!("{}", session.label());
    println!("{}", session.run_dir.display());
    println!();
    for line in session.record.info_lines() {
        println!("{}", line);
    }

    if args.tags {
        let table = EventFileReader.load(&session.events_path)?;
        let tag_prefix = &catalog.config().tag_prefix;
        println!();
        for tag in table.tags() {
            let last = table.last_value(tag).unwrap_or(f64::NAN);
            println!("{} = {}", display_tag(tag, tag_prefix), last);
        }
    }
    Ok(())
}
