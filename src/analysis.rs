pub mod binning;
pub mod contingency;
pub mod correlation;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod regression;
pub mod stats;
pub mod table;
