//! # Data Model
//!
//! Fact rows (learner attempts), reference tables and the typed JSON
//! structures decoded from the source schema.

pub mod fact;
pub mod reference;
pub mod taxonomy;

pub use fact::{score_totals, LearnerAttempt, RawAttempt};
pub use reference::{
    GradeRecord, LastQuestionRecord, LearnerRecord, LoginEventRecord, QsetTypeRecord,
    QuestionSequenceRecord, ReferenceSnapshot, RepositoryRecord, SchoolRecord, SkillRecord,
    TenantRecord,
};
pub use taxonomy::{LocalizedText, RepositoryRef, Taxonomy, TaxonomyNode};
