use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FaqRow {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A FAQ entry with its tag names, as exposed to callers and to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faq {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Faq {
    pub fn from_row(row: FaqRow, tags: Vec<String>) -> Self {
        Self {
            id: row.id,
            question: row.question,
            answer: row.answer,
            tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredFaq {
    #[serde(flatten)]
    pub faq: Faq,
    pub similarity: f64,
}

/// Fields that may be changed on an existing FAQ. `tags`, when present,
/// replaces the whole tag set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaqPatch {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOptions {
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}
