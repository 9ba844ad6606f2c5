//! Slowly-changing reference tables, replaced wholesale on every refresh.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::constants;

/// Grade master row. `grade` holds the canonical name derived from `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct GradeRecord {
    pub identifier: String,
    pub id: i64,
    pub grade: Option<String>,
}

impl GradeRecord {
    /// Replace the stored name with the canonical name for the ordinal
    pub fn canonicalize(mut self) -> Self {
        self.grade = constants::grade_name(self.id).map(str::to_string);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SchoolRecord {
    pub school_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct QsetTypeRecord {
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RepositoryRecord {
    pub identifier: String,
    pub repo_name: Option<String>,
}

/// Skill master row for any of the three skill levels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SkillRecord {
    pub identifier: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TenantRecord {
    pub id: String,
    pub tenant_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LearnerRecord {
    pub identifier: String,
    pub user_name: Option<String>,
    pub name: Option<String>,
    pub school: Option<String>,
}

/// Final question of the final question set for an (operation, qset grade)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct LastQuestionRecord {
    pub operation: Option<String>,
    pub qset_grade: Option<String>,
    pub question_set_id: Option<String>,
    pub question_id: Option<String>,
}

/// `learner_logged_in` telemetry event joined with the learner's context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LoginEventRecord {
    pub id: String,
    pub level: Option<String>,
    pub learner_id: Option<String>,
    pub created_on: Option<NaiveDateTime>,
    pub school: Option<String>,
    pub grade: Option<String>,
    pub tenant_name: Option<String>,
}

/// Position of a question inside its question set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct QuestionSequenceRecord {
    pub question_id: String,
    pub question_set_id: String,
    pub sequence: Option<i64>,
}

/// Every reference table read in one refresh cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSnapshot {
    pub last_question_per_qset_grade: Vec<LastQuestionRecord>,
    pub learners: Vec<LearnerRecord>,
    pub grades: Vec<GradeRecord>,
    pub schools: Vec<SchoolRecord>,
    pub qset_types: Vec<QsetTypeRecord>,
    pub repositories: Vec<RepositoryRecord>,
    pub l1_skills: Vec<SkillRecord>,
    pub l2_skills: Vec<SkillRecord>,
    pub l3_skills: Vec<SkillRecord>,
    pub tenants: Vec<TenantRecord>,
    pub logged_in_users: Vec<LoginEventRecord>,
}

impl ReferenceSnapshot {
    /// Canonical grade names and the synthetic "No School" entry
    pub fn normalize(mut self) -> Self {
        self.grades = self
            .grades
            .into_iter()
            .map(GradeRecord::canonicalize)
            .collect();

        let has_no_school = self
            .schools
            .iter()
            .any(|s| s.school_name.as_deref() == Some(constants::NO_SCHOOL));
        if !has_no_school {
            self.schools.push(SchoolRecord {
                school_name: Some(constants::NO_SCHOOL.to_string()),
            });
        }
        self
    }
}
