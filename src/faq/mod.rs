pub mod similarity;

use crate::db::models::{Faq, FaqPatch, FaqRow, ListOptions, ScoredFaq};
use crate::error::AppError;
use serde::Serialize;
use sqlx::SqlitePool;

/// Matches at or below this score are dropped from search results.
pub const MIN_SIMILARITY: f64 = 0.2;

const DEFAULT_LIST_LIMIT: i64 = 100;

/// `{success, data | error, message?}` result shape used by the FAQ
/// operations that report domain failures instead of raising them.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }
}

/// Handle to the FAQ tables. Cheap to clone; built once per process.
#[derive(Clone)]
pub struct FaqStore {
    pool: SqlitePool,
}

impl FaqStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn search(
        &self,
        query: &str,
        tags: Option<&[String]>,
    ) -> Result<Vec<ScoredFaq>, AppError> {
        let candidates = self.load(tags, None, None).await?;

        let mut results: Vec<ScoredFaq> = candidates
            .into_iter()
            .map(|faq| {
                let lang = similarity::detect_language(&faq.question);
                let score = similarity::similarity(query, &faq.question, lang)
                    .max(similarity::similarity(query, &faq.answer, lang) * 0.8);
                ScoredFaq {
                    faq,
                    similarity: score,
                }
            })
            .filter(|scored| scored.similarity > MIN_SIMILARITY)
            .collect();

        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        Ok(results)
    }

    pub async fn add(&self, question: &str, answer: &str, tags: &[String]) -> Envelope<Faq> {
        match self.try_add(question, answer, tags).await {
            Ok(faq) => Envelope::ok(faq),
            Err(e) => {
                log::error!("Error adding FAQ: {}", e);
                Envelope::failure(e.to_string())
            }
        }
    }

    async fn try_add(&self, question: &str, answer: &str, tags: &[String]) -> Result<Faq, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO faqs (id, question, answer, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(question)
        .bind(answer)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        attach_tags(&mut tx, &id, tags).await?;
        tx.commit().await?;

        self.get(&id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("FAQ {} vanished after insert", id)))
    }

    pub async fn update(&self, id: &str, patch: &FaqPatch) -> Result<Faq, AppError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE faqs SET question = COALESCE(?, question), answer = COALESCE(?, answer), updated_at = ? WHERE id = ?",
        )
        .bind(patch.question.as_deref())
        .bind(patch.answer.as_deref())
        .bind(timestamp())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("FAQ {}", id)));
        }

        if let Some(tags) = &patch.tags {
            sqlx::query("DELETE FROM faq_tags WHERE faq_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            attach_tags(&mut tx, id, tags).await?;
        }
        tx.commit().await?;

        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("FAQ {}", id)))
    }

    pub async fn list(&self, options: &ListOptions) -> Result<Vec<Faq>, AppError> {
        let limit = options.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let offset = options.offset.unwrap_or(0);
        self.load(options.tags.as_deref(), Some(limit), Some(offset))
            .await
    }

    /// Returns `false` when no FAQ has the given id.
    pub async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM faq_tags WHERE faq_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM faqs WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_text(&self, text: &str) -> Envelope<Vec<Faq>> {
        let faqs = match self.matching_question(text).await {
            Ok(faqs) => faqs,
            Err(e) => {
                log::error!("Error finding FAQ to delete: {}", e);
                return Envelope::failure(e.to_string());
            }
        };

        if faqs.is_empty() {
            return Envelope::failure("Nenhuma FAQ encontrada com esse texto");
        }

        let message = if let [faq] = faqs.as_slice() {
            format!(
                "Encontrei esta FAQ:\n\nPergunta: {}\nResposta: {}\n\nID: {}\n\nVocê confirma que deseja removê-la? (Responda com sim ou não)",
                faq.question, faq.answer, faq.id
            )
        } else {
            let listing = faqs
                .iter()
                .enumerate()
                .map(|(i, faq)| {
                    format!(
                        "{}. [ID: {}]\nPergunta: {}\nResposta: {}\n",
                        i + 1,
                        faq.id,
                        faq.question,
                        faq.answer
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "Encontrei {} FAQs:\n\n{}\nQual delas você deseja remover? (Indique o número)",
                faqs.len(),
                listing
            )
        };

        Envelope::ok_with_message(faqs, message)
    }

    pub async fn confirm_delete(&self, id: &str, confirmed: bool) -> Envelope<Faq> {
        if !confirmed {
            return Envelope::failure("Remoção cancelada pelo usuário");
        }

        let faq = match self.get(id).await {
            Ok(Some(faq)) => faq,
            Ok(None) => return Envelope::failure("FAQ não encontrada"),
            Err(e) => {
                log::error!("Error confirming FAQ deletion: {}", e);
                return Envelope::failure(e.to_string());
            }
        };

        match self.delete(id).await {
            Ok(_) => Envelope::ok(faq),
            Err(e) => {
                log::error!("Error confirming FAQ deletion: {}", e);
                Envelope::failure(e.to_string())
            }
        }
    }

    pub async fn delete_by_text(&self, text: &str) -> Envelope<Faq> {
        let mut faqs = match self.matching_question(text).await {
            Ok(faqs) => faqs,
            Err(e) => {
                log::error!("Error deleting FAQ by text: {}", e);
                return Envelope::failure(e.to_string());
            }
        };

        match faqs.len() {
            0 => Envelope::failure("Nenhuma FAQ encontrada com esse texto"),
            1 => {
                let faq = faqs.remove(0);
                match self.delete(&faq.id).await {
                    Ok(_) => {
                        let message = format!("FAQ removida com sucesso:\nPergunta: {}", faq.question);
                        Envelope::ok_with_message(faq, message)
                    }
                    Err(e) => {
                        log::error!("Error deleting FAQ by text: {}", e);
                        Envelope::failure(e.to_string())
                    }
                }
            }
            n => {
                let listing = faqs
                    .iter()
                    .enumerate()
                    .map(|(i, faq)| {
                        format!("{}. Pergunta: {}\nResposta: {}\n", i + 1, faq.question, faq.answer)
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                Envelope::failure(format!(
                    "Encontradas {} FAQs com esse texto. Por favor, seja mais específico:\n\n{}",
                    n, listing
                ))
            }
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Faq>, AppError> {
        let row = sqlx::query_as::<_, FaqRow>("SELECT * FROM faqs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let tags = self.tags_of(&row.id).await?;
                Ok(Some(Faq::from_row(row, tags)))
            }
            None => Ok(None),
        }
    }

    async fn matching_question(&self, text: &str) -> Result<Vec<Faq>, AppError> {
        let rows = sqlx::query_as::<_, FaqRow>(
            "SELECT * FROM faqs WHERE instr(question, ?) > 0 OR instr(question, ?) > 0 OR instr(question, ?) > 0 ORDER BY created_at DESC",
        )
        .bind(text)
        .bind(text.to_lowercase())
        .bind(text.to_uppercase())
        .fetch_all(&self.pool)
        .await?;

        self.with_tags(rows).await
    }

    /// FAQs newest first, optionally restricted to those carrying any of `tags`.
    async fn load(
        &self,
        tags: Option<&[String]>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Faq>, AppError> {
        let limit = limit.unwrap_or(-1);
        let offset = offset.unwrap_or(0);

        let rows = match tags.filter(|t| !t.is_empty()) {
            Some(tags) => {
                let placeholders = vec!["?"; tags.len()].join(", ");
                let sql = format!(
                    "SELECT * FROM faqs WHERE id IN (SELECT faq_id FROM faq_tags WHERE tag_name IN ({})) ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
                    placeholders
                );
                let mut query = sqlx::query_as::<_, FaqRow>(&sql);
                for tag in tags {
                    query = query.bind(tag);
                }
                query
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as::<_, FaqRow>(
                    "SELECT * FROM faqs ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        self.with_tags(rows).await
    }

    async fn with_tags(&self, rows: Vec<FaqRow>) -> Result<Vec<Faq>, AppError> {
        let mut faqs = Vec::with_capacity(rows.len());
        for row in rows {
            let tags = self.tags_of(&row.id).await?;
            faqs.push(Faq::from_row(row, tags));
        }
        Ok(faqs)
    }

    async fn tags_of(&self, faq_id: &str) -> Result<Vec<String>, AppError> {
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT tag_name FROM faq_tags WHERE faq_id = ? ORDER BY tag_name",
        )
        .bind(faq_id)
        .fetch_all(&self.pool)
        .await?)
    }
}

async fn attach_tags(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    faq_id: &str,
    tags: &[String],
) -> Result<(), AppError> {
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        sqlx::query("INSERT OR IGNORE INTO tags (name) VALUES (?)")
            .bind(tag)
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT OR IGNORE INTO faq_tags (faq_id, tag_name) VALUES (?, ?)")
            .bind(faq_id)
            .bind(tag)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
