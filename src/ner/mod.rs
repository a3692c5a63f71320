mod annotator;
mod skills;

pub use annotator::{Annotation, Annotator, RuleAnnotator};
pub use skills::{CandidateSkillSet, SkillExtractor};
