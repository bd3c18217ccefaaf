//! Pipeline orchestration and stage logic for Agency LeadGen.
//!
//! This crate ties discovery, page fetching, contact selection, text
//! generation and export together into one run (see [`run_pipeline`]).

pub mod contact;
pub mod discover;
pub mod enrichment;
pub mod export;
pub mod llm;
pub mod outreach;
pub mod pipeline;

#[cfg(test)]
mod testing;

pub use export::{ExportSummary, SecondaryStatus};
pub use llm::{GenerationRequest, GeneratorConfig, OpenAiCompatGenerator, TextGenerator};
pub use pipeline::{
    Collaborators, ProgressReporter, RunReport, SilentProgress, StageCounts, run_pipeline,
};
