use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tfr_core::{Catalog, SizeCount, WILDCARD};

#[derive(Args, Debug, Clone)]
pub struct FacetsArgs {
    /// Restrict reward tags and sizes to one model
    #[arg(long, default_value = WILDCARD)]
    pub model: String,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

impl Default for FacetsArgs {
    fn default() -> Self {
        Self {
            model: WILDCARD.to_string(),
            json: false,
        }
    }
}

#[derive(Serialize, Debug, PartialEq)]
pub struct FacetSummary {
    pub runs: usize,
    pub model_tags: Vec<String>,
    pub reward_tags: Vec<String>,
    pub sizes: Vec<SizeEntry>,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct SizeEntry {
    pub model: String,
    pub reward: String,
    pub hidden: i64,
    pub batch: i64,
    pub count: usize,
}

/// Selector contents for `model`, wildcard entries included.
pub fn summarize(catalog: &Catalog, model: &str) -> FacetSummary {
    let index = catalog.index();
    let models: Vec<String> = if model == WILDCARD {
        index.model_tags().to_vec()
    } else {
        vec![model.to_string()]
    };

    let mut sizes = Vec::new();
    for m in &models {
        for reward in index.rewards_for(m) {
            sizes.extend(index.sizes_for(m, reward).iter().map(|s: &SizeCount| SizeEntry {
                model: m.clone(),
                reward: reward.clone(),
                hidden: s.hidden,
                batch: s.batch,
                count: s.count,
            }));
        }
    }

    FacetSummary {
        runs: catalog.sessions().len(),
        model_tags: catalog.all_model_tags(),
        reward_tags: catalog.reward_tags_for(model),
        sizes,
    }
}

pub fn run(catalog: &Catalog, args: FacetsArgs) -> Result<()> {
    let summary = summarize(catalog, &args.model);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Runs:        {}", summary.runs);
    println!("Model tags:  {}", summary.model_tags.join(", "));
    println!("Reward tags: {}", summary.reward_tags.join(", "));
    for s in &summary.sizes {
        println!(
            "  {} | {}  [{},{}] x{}",
            s.model, s.reward, s.hidden, s.batch, s.count
        );
    }
    Ok(())
}
