use anyhow::Result;
use clap::Args;
use tfr_core::series::smooth;
use tfr_core::{Catalog, QueryEngine};
use tracing::info;

use crate::cli::FilterArgs;
use crate::plotted::PlotSet;

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Also print the smoothed final value (TensorBoard weight, 0..1)
    #[arg(long)]
    pub smooth: Option<f64>,
}

pub fn run(catalog: &Catalog, args: QueryArgs) -> Result<()> {
    let engine = QueryEngine::new(catalog.config())?;
    info!("--- Query ({} workers) ---", engine.workers());

    let mut plots = PlotSet::new();
    plots.rank_by(args.filter.rank_key());
    plots.append(engine.query(catalog, &args.filter.filter()));

    if plots.is_empty() {
        println!("No runs match.");
        return Ok(());
    }

    let tag_prefix = &catalog.config().tag_prefix;
    for (i, entry) in plots.entries().iter().enumerate() {
        let label = entry.label.replace('\n', " | ");
        match &entry.series {
            Ok(table) => {
                let tag = plots.ranked_tag(entry, tag_prefix);
                print!("{:>3}. {:>12.4}  {}  [{}]", i + 1, entry.metric, label, tag);
                if let (Some(weight), Some(raw)) = (args.smooth, table.rank_tag(plots.rank_key())) {
                    let values: Vec<f64> = table.series(raw).into_iter().map(|(_, v)| v).collect();
                    if let Some(last) = smooth(&values, weight).last() {
                        print!("  smoothed {:.4}", last);
                    }
                }
                println!();
            }
            Err(e) => println!("{:>3}. {:>12}  {}  failed: {}", i + 1, "-", label, e),
        }
    }
    Ok(())
}
