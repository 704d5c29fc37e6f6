use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tfr_core::{Catalog, CatalogConfig, TagFolder, WILDCARD};
use tracing::info;

use crate::facets::FacetsArgs;
use crate::info::InfoArgs;
use crate::query::QueryArgs;
use crate::report::ReportArgs;

#[derive(Parser, Debug)]
#[command(author, version, about = "TF Reader: browse and rank TensorBoard runs", long_about = None)]
pub struct Cli {
    /// Root holding `<model tags> | <reward tags>` folders
    pub root: PathBuf,

    /// JSON catalog config; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also scan root entries whose name contains '.'
    #[arg(long)]
    pub include_malformed: bool,

    /// Series loader threads (clamped to 1..=10)
    #[arg(long)]
    pub workers: Option<usize>,

    #[arg(long)]
    pub model_prefix: Option<String>,

    #[arg(long)]
    pub tag_prefix: Option<String>,

    /// Tag folder or run directory to import after the scan (repeatable)
    #[arg(long = "import", value_name = "DIR")]
    pub imports: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List model/reward tags and network sizes (Default)
    Facets(FacetsArgs),

    /// Load and rank the scalars of matching runs
    Query(QueryArgs),

    /// Show the hyperparameters and scalar tags of one run
    Info(InfoArgs),

    /// Save the ranked scalars of matching runs to `saved_scalars/`
    Report(ReportArgs),
}

/// Facet selection shared by `query` and `report`.
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    #[arg(long, default_value = WILDCARD)]
    pub model: String,

    #[arg(long, default_value = WILDCARD)]
    pub reward: String,

    /// Batch size; 0 together with --hidden 0 means any size
    #[arg(long, default_value_t = 0)]
    pub batch: i64,

    #[arg(long, default_value_t = 0)]
    pub hidden: i64,

    /// Rank by this exact scalar tag instead of the final test average
    #[arg(long)]
    pub rank_tag: Option<String>,
}

impl FilterArgs {
    pub fn filter(&self) -> tfr_core::QueryFilter {
        tfr_core::QueryFilter::new(&self.model, &self.reward, self.batch, self.hidden)
    }

    pub fn rank_key(&self) -> tfr_core::RankKey {
        match &self.rank_tag {
            Some(tag) => tfr_core::RankKey::Tag(tag.clone()),
            None => tfr_core::RankKey::FinalTest,
        }
    }
}

impl Cli {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn catalog_config(&self) -> Result<CatalogConfig> {
        let mut config = match &self.config {
            Some(path) => CatalogConfig::load(path)
                .with_context(|| format!("Failed to load config {:?}", path))?,
            None => CatalogConfig::default(),
        };
        if self.include_malformed {
            config.exclude_malformed = false;
        }
        if let Some(workers) = self.workers {
            config.max_workers = workers;
        }
        if let Some(prefix) = &self.model_prefix {
            config.model_prefix = prefix.clone();
        }
        if let Some(prefix) = &self.tag_prefix {
            config.tag_prefix = prefix.clone();
        }
        Ok(config)
    }

    /// Scans the root, then applies every `--import`.
    pub fn open_catalog(&self) -> Result<Catalog> {
        let mut catalog = Catalog::new(self.catalog_config()?);
        let summary = catalog
            .scan(&self.root)
            .with_context(|| format!("Failed to scan {:?}", self.root))?;
        info!(
            "📂 {} runs, {} model tags, {} reward tags",
            summary.sessions,
            summary.model_tags.len(),
            summary.reward_tags.len()
        );

        for dir in &self.imports {
            import(&mut catalog, dir)?;
        }
        Ok(catalog)
    }
}

/// A directory named like a tag folder is imported whole, anything else as
/// a single run.
fn import(catalog: &mut Catalog, dir: &Path) -> Result<()> {
    if TagFolder::parse(dir).is_ok() {
        catalog
            .import_tag_folder(dir)
            .with_context(|| format!("Failed to import tag folder {:?}", dir))?;
    } else {
        catalog
            .import_single_run(dir)
            .with_context(|| format!("Failed to import run {:?}", dir))?;
    }
    Ok(())
}
