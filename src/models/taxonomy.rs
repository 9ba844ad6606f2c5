//! Typed views over the JSON columns of the source schema.
//!
//! `taxonomy`, `title`, `name` and `repository` columns are decoded once at the
//! query boundary into these structures; the rest of the crate reads them
//! through accessor methods instead of path expressions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DEFAULT_LOCALE: &str = "en";

/// Locale-keyed text such as `{"en": "Addition"}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(pub BTreeMap<String, String>);

impl LocalizedText {
    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0.get(locale).map(String::as_str)
    }

    pub fn en(&self) -> Option<&str> {
        self.get(DEFAULT_LOCALE)
    }
}

impl From<&str> for LocalizedText {
    fn from(value: &str) -> Self {
        let mut map = BTreeMap::new();
        map.insert(DEFAULT_LOCALE.to_string(), value.to_string());
        Self(map)
    }
}

/// One level of a taxonomy: a reference identifier plus its display name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyNode {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub name: Option<LocalizedText>,
}

impl TaxonomyNode {
    pub fn name_en(&self) -> Option<&str> {
        self.name.as_ref().and_then(LocalizedText::en)
    }
}

/// Taxonomy attached to question sets and question-level attempts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(default)]
    pub class: Option<TaxonomyNode>,
    #[serde(default)]
    pub l1_skill: Option<TaxonomyNode>,
    #[serde(default)]
    pub l2_skill: Vec<TaxonomyNode>,
    #[serde(default)]
    pub l3_skill: Vec<TaxonomyNode>,
}

impl Taxonomy {
    pub fn grade_identifier(&self) -> Option<&str> {
        self.class.as_ref()?.identifier.as_deref()
    }

    pub fn grade_name(&self) -> Option<&str> {
        self.class.as_ref()?.name_en()
    }

    /// Level-one skill doubles as the arithmetic operation
    pub fn operation_identifier(&self) -> Option<&str> {
        self.l1_skill.as_ref()?.identifier.as_deref()
    }

    pub fn operation_name(&self) -> Option<&str> {
        self.l1_skill.as_ref()?.name_en()
    }

    pub fn l2_identifier(&self) -> Option<&str> {
        self.l2_skill.first()?.identifier.as_deref()
    }

    pub fn l2_name(&self) -> Option<&str> {
        self.l2_skill.first()?.name_en()
    }

    pub fn l3_identifier(&self) -> Option<&str> {
        self.l3_skill.first()?.identifier.as_deref()
    }

    pub fn l3_name(&self) -> Option<&str> {
        self.l3_skill.first()?.name_en()
    }
}

/// Repository reference stored on question sets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub name: Option<LocalizedText>,
}
