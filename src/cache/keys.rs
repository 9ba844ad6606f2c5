//! Fixed cache keys

use std::fmt;

/// Every entry the refresh pipeline maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    LearnersData,
    LastFetchedTime,
    LastQuestionPerQsetGrade,
    AllLearners,
    AllGrades,
    AllSchools,
    AllQsetTypes,
    AllRepositoryNames,
    AllL1Skills,
    AllL2Skills,
    AllL3Skills,
    AllTenants,
    AllLoggedInUsers,
}

impl CacheKey {
    pub const ALL: [CacheKey; 13] = [
        CacheKey::LearnersData,
        CacheKey::LastFetchedTime,
        CacheKey::LastQuestionPerQsetGrade,
        CacheKey::AllLearners,
        CacheKey::AllGrades,
        CacheKey::AllSchools,
        CacheKey::AllQsetTypes,
        CacheKey::AllRepositoryNames,
        CacheKey::AllL1Skills,
        CacheKey::AllL2Skills,
        CacheKey::AllL3Skills,
        CacheKey::AllTenants,
        CacheKey::AllLoggedInUsers,
    ];

    /// Reference tables replaced wholesale on every refresh
    pub const REFERENCE: [CacheKey; 11] = [
        CacheKey::LastQuestionPerQsetGrade,
        CacheKey::AllLearners,
        CacheKey::AllGrades,
        CacheKey::AllSchools,
        CacheKey::AllQsetTypes,
        CacheKey::AllRepositoryNames,
        CacheKey::AllL1Skills,
        CacheKey::AllL2Skills,
        CacheKey::AllL3Skills,
        CacheKey::AllTenants,
        CacheKey::AllLoggedInUsers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKey::LearnersData => "learners_data_json",
            CacheKey::LastFetchedTime => "last_fetched_time",
            CacheKey::LastQuestionPerQsetGrade => "last_question_per_qset_grade",
            CacheKey::AllLearners => "all_learners",
            CacheKey::AllGrades => "all_grades",
            CacheKey::AllSchools => "all_schools",
            CacheKey::AllQsetTypes => "all_qset_types",
            CacheKey::AllRepositoryNames => "all_repository_names",
            CacheKey::AllL1Skills => "all_l1_skills",
            CacheKey::AllL2Skills => "all_l2_skills",
            CacheKey::AllL3Skills => "all_l3_skills",
            CacheKey::AllTenants => "all_tenants",
            CacheKey::AllLoggedInUsers => "all_logged_in_users",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
