//! Exploratory statistics over quarterly management consulting data
//!
//! The pipeline loads a validated [`ObservationTable`], summarises its
//! numeric columns, fits regressions and rank correlations, and tests
//! tertile bins of the merged raw tables for independence.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::uninlined_format_args, clippy::module_name_repetitions)]

pub mod analysis;
mod csv_reader;
pub mod structs;

pub use analysis::binning::{qcut, qcut_tertiles};
pub use analysis::contingency::chi2_contingency;
pub use analysis::correlation::{kendall, pearson, spearman};
pub use analysis::merge::inner_join;
pub use analysis::pipeline::{run_pipeline, AnalysisConfig, InputPaths, Inputs};
pub use analysis::regression::linregress;
pub use analysis::stats::summarize;
pub use structs::{EdaError, ErrorKind, ObservationTable, Result, Schema};
