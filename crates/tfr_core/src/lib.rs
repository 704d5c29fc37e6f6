//! TF Reader Core
//!
//! Run discovery and scalar aggregation for directories of TensorBoard
//! training logs: scans `<model tags> | <reward tags>/<run>` trees, recovers
//! each run's hyperparameters, indexes runs by facet and answers filtered,
//! ranked scalar queries.

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod facets;
pub mod params;
pub mod query;
pub mod scanner;
pub mod series;
pub mod session;

pub use catalog::{Catalog, ScanSummary, WILDCARD};
pub use config::CatalogConfig;
pub use error::{ConfigError, DiscoveryError, RunFile, SeriesError};
pub use events::{EventFileReader, ScalarSource};
pub use facets::{FacetIndex, SizeCount};
pub use params::{HyperparameterRecord, ParamValue, Schema};
pub use query::{QueryEngine, QueryEntry, QueryFilter, QueryResult, SizeFilter};
pub use series::{RankKey, ScalarPoint, ScalarTable, MISSING_METRIC};
pub use session::{Session, TagFolder};
