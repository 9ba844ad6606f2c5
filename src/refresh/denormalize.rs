//! Resolve reference identifiers on raw attempt rows

use crate::constants::{grade_name, grade_ordinal, NO_SCHOOL};
use crate::models::{LearnerAttempt, RawAttempt, ReferenceSnapshot, SkillRecord};
use std::collections::HashMap;

/// Identifier lookups built from one reference snapshot.
///
/// Unknown identifiers resolve to `None`; rows are never dropped.
#[derive(Debug, Default)]
pub struct Denormalizer {
    grades: HashMap<String, String>,
    l1_skills: HashMap<String, String>,
    l2_skills: HashMap<String, String>,
    l3_skills: HashMap<String, String>,
    repositories: HashMap<String, String>,
}

fn skill_map(rows: &[SkillRecord]) -> HashMap<String, String> {
    rows.iter()
        .filter_map(|r| Some((r.identifier.clone(), r.name.clone()?)))
        .collect()
}

fn lookup(map: &HashMap<String, String>, key: Option<&str>) -> Option<String> {
    map.get(key?).cloned()
}

/// Canonical learner grade from the stored class name.
///
/// Class names hold the ordinal as text ("3"); already-canonical names are
/// kept, anything else is unknown.
pub fn canonical_learner_grade(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    match raw.parse::<i64>() {
        Ok(ordinal) => grade_name(ordinal).map(str::to_string),
        Err(_) => grade_ordinal(raw).map(|_| raw.to_string()),
    }
}

impl Denormalizer {
    pub fn new(reference: &ReferenceSnapshot) -> Self {
        Self {
            grades: reference
                .grades
                .iter()
                .filter_map(|g| Some((g.identifier.clone(), g.grade.clone()?)))
                .collect(),
            l1_skills: skill_map(&reference.l1_skills),
            l2_skills: skill_map(&reference.l2_skills),
            l3_skills: skill_map(&reference.l3_skills),
            repositories: reference
                .repositories
                .iter()
                .filter_map(|r| Some((r.identifier.clone(), r.repo_name.clone()?)))
                .collect(),
        }
    }

    pub fn apply(&self, raw: RawAttempt) -> LearnerAttempt {
        LearnerAttempt {
            grade: canonical_learner_grade(raw.learner_grade.as_deref()),
            qset_grade: lookup(&self.grades, raw.qset_grade_identifier.as_deref()),
            operation: lookup(&self.l1_skills, raw.operation_identifier.as_deref()),
            l1_skill: lookup(&self.l1_skills, raw.l1_skill_identifier.as_deref()),
            l2_skill: lookup(&self.l2_skills, raw.l2_skill_identifier.as_deref()),
            l3_skill: lookup(&self.l3_skills, raw.l3_skill_identifier.as_deref()),
            repo_name: lookup(&self.repositories, raw.repository_identifier.as_deref()),
            tenant_name: raw.tenant_name,
            school: raw.school.unwrap_or_else(|| NO_SCHOOL.to_string()),
            learner_name: raw.learner_name,
            learner_username: raw.learner_username,
            learner_id: raw.learner_id,
            question_id: raw.question_id,
            question_set_id: raw.question_set_id,
            updated_at: raw.updated_at,
            attempts_count: raw.attempts_count,
            score: raw.score,
            qset_name: raw.qset_name,
            qset_uid: raw.qset_uid,
            purpose: raw.purpose,
            sequence: raw.sequence,
            status: raw.status,
        }
    }

    pub fn apply_all(&self, rows: Vec<RawAttempt>) -> Vec<LearnerAttempt> {
        rows.into_iter().map(|raw| self.apply(raw)).collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::RawAttempt;
    use chrono::NaiveDateTime;

    /// Raw row with identifiers matching `reference()`
    pub fn raw(learner: &str, at: &str) -> RawAttempt {
        RawAttempt {
            tenant_name: Some("Tenant".to_string()),
            school: Some("School A".to_string()),
            learner_grade: Some("2".to_string()),
            learner_name: Some(format!("{learner} name")),
            learner_username: Some(learner.to_lowercase()),
            learner_id: learner.to_string(),
            question_id: format!("q-{at}"),
            question_set_id: "qs-1".to_string(),
            updated_at: NaiveDateTime::parse_from_str(at, "%Y-%m-%d %H:%M:%S").unwrap(),
            attempts_count: Some(1),
            score: Some(1.0),
            qset_grade_identifier: Some("grd-1".to_string()),
            operation_identifier: Some("op-add".to_string()),
            qset_name: Some("Set 1".to_string()),
            qset_uid: Some("QS1".to_string()),
            purpose: Some("Practice".to_string()),
            repository_identifier: Some("repo-1".to_string()),
            l1_skill_identifier: Some("op-add".to_string()),
            l2_skill_identifier: Some("l2-carry".to_string()),
            l3_skill_identifier: None,
            sequence: Some(1),
            status: Some("completed".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::raw;
    use super::*;
    use crate::models::{GradeRecord, RepositoryRecord};

    fn reference() -> ReferenceSnapshot {
        ReferenceSnapshot {
            grades: vec![GradeRecord {
                identifier: "grd-1".to_string(),
                id: 1,
                grade: Some("1".to_string()),
            }],
            l1_skills: vec![SkillRecord {
                identifier: "op-add".to_string(),
                name: Some("Addition".to_string()),
            }],
            l2_skills: vec![SkillRecord {
                identifier: "l2-carry".to_string(),
                name: Some("Carry".to_string()),
            }],
            repositories: vec![RepositoryRecord {
                identifier: "repo-1".to_string(),
                repo_name: Some("Core".to_string()),
            }],
            ..Default::default()
        }
        .normalize()
    }

    #[test]
    fn resolves_identifiers() {
        let row = Denormalizer::new(&reference()).apply(raw("L1", "2024-03-04 10:00:00"));
        assert_eq!(row.grade.as_deref(), Some("class-two"));
        assert_eq!(row.qset_grade.as_deref(), Some("class-one"));
        assert_eq!(row.operation.as_deref(), Some("Addition"));
        assert_eq!(row.l1_skill.as_deref(), Some("Addition"));
        assert_eq!(row.l2_skill.as_deref(), Some("Carry"));
        assert_eq!(row.l3_skill, None);
        assert_eq!(row.repo_name.as_deref(), Some("Core"));
    }

    #[test]
    fn unmatched_identifiers_become_none() {
        let mut input = raw("L1", "2024-03-04 10:00:00");
        input.qset_grade_identifier = Some("grd-unknown".to_string());
        input.school = None;
        let row = Denormalizer::new(&reference()).apply(input);
        assert_eq!(row.qset_grade, None);
        assert_eq!(row.school, "No School");
    }

    #[test]
    fn learner_grade_canonicalisation() {
        assert_eq!(canonical_learner_grade(Some("3")).as_deref(), Some("class-three"));
        assert_eq!(canonical_learner_grade(Some(" 10 ")).as_deref(), Some("class-ten"));
        assert_eq!(canonical_learner_grade(Some("class-four")).as_deref(), Some("class-four"));
        assert_eq!(canonical_learner_grade(Some("11")), None);
        assert_eq!(canonical_learner_grade(Some("Grade 3")), None);
        assert_eq!(canonical_learner_grade(None), None);
    }
}
