//! Skill gap analysis: extract skill mentions from a resume and a job description,
//! align them with a reference vocabulary, and report matched vs missing skills.

pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod ner;
pub mod pipeline;
pub mod report;
pub mod text;
pub mod vocabulary;

pub use error::{Result, SkillGapError};
pub use pipeline::{run, SkillGapAnalyzer};
pub use report::{ComparisonReport, Verdict};
