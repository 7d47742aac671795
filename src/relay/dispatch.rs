use super::conversation::Conversation;
use super::functions::{FaqCall, FaqFunction};
use crate::error::AppError;
use crate::faq::FaqStore;
use serde::Serialize;
use serde_json::{json, Value};

/// Result of running one FAQ function, before it is shown to the caller or
/// recorded in the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionOutcome {
    Success {
        payload: Value,
        /// Text forwarded to the caller, if the operation announces itself.
        notice: Option<String>,
    },
    Failure {
        error: String,
    },
}

impl FunctionOutcome {
    fn success<T: Serialize>(payload: &T, notice: Option<String>) -> Self {
        match serde_json::to_value(payload) {
            Ok(payload) => FunctionOutcome::Success { payload, notice },
            Err(e) => FunctionOutcome::Failure {
                error: format!("Erro ao serializar resultado: {}", e),
            },
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        FunctionOutcome::Failure {
            error: error.into(),
        }
    }

    /// Failure of the call as a whole: bad arguments or a store error.
    pub fn from_error(name: &str, error: &AppError) -> Self {
        Self::failure(format!("Erro ao executar função {}: {}", name, error))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FunctionOutcome::Success { .. })
    }

    /// Append the function-result entry and return the text to forward, if any.
    pub fn record(self, name: &str, conversation: &mut Conversation) -> Option<String> {
        match self {
            FunctionOutcome::Success { payload, notice } => {
                conversation.push_function_result(name, payload.to_string());
                notice
            }
            FunctionOutcome::Failure { error } => {
                conversation.push_function_result(name, json!({ "error": error }).to_string());
                Some(format!("{}\n", error))
            }
        }
    }
}

/// Run one call against the store. Store errors become [`FunctionOutcome::Failure`].
pub async fn execute(call: FaqCall, store: &FaqStore) -> FunctionOutcome {
    match call {
        FaqCall::Search(args) => match store.search(&args.query, args.tags.as_deref()).await {
            Ok(results) => FunctionOutcome::success(&results, None),
            Err(e) => FunctionOutcome::from_error(FaqFunction::SearchFaq.as_str(), &e),
        },
        FaqCall::Add(args) => {
            let result = store.add(&args.question, &args.answer, &args.tags).await;
            match (result.data, result.error) {
                (Some(faq), _) => FunctionOutcome::success(
                    &faq,
                    Some(format!(
                        "FAQ adicionado com sucesso!\nPergunta: {}\n",
                        args.question
                    )),
                ),
                (None, error) => FunctionOutcome::failure(format!(
                    "Erro ao adicionar FAQ: {}",
                    error.unwrap_or_default()
                )),
            }
        }
        FaqCall::Update(args) => match store.update(&args.id, &args.patch).await {
            Ok(faq) => FunctionOutcome::success(&faq, None),
            Err(e) => FunctionOutcome::from_error(FaqFunction::UpdateFaq.as_str(), &e),
        },
        FaqCall::List(options) => match store.list(&options).await {
            Ok(faqs) => {
                let notice = if faqs.is_empty() {
                    "Nenhuma FAQ encontrada.\n".to_string()
                } else {
                    format!("Encontradas {} FAQs.\n", faqs.len())
                };
                FunctionOutcome::success(&faqs, Some(notice))
            }
            Err(e) => FunctionOutcome::failure(format!("Erro ao listar FAQs: {}", e)),
        },
        FaqCall::Delete(args) => match store.delete(&args.id).await {
            Ok(true) => FunctionOutcome::success(
                &json!({ "success": true }),
                Some("FAQ removido com sucesso!\n".to_string()),
            ),
            Ok(false) => FunctionOutcome::failure(format!(
                "Erro ao remover FAQ: FAQ {} não encontrada",
                args.id
            )),
            Err(e) => FunctionOutcome::failure(format!("Erro ao remover FAQ: {}", e)),
        },
        FaqCall::FindToDelete(args) => {
            let result = store.find_by_text(&args.question_text).await;
            match result.data {
                Some(faqs) => FunctionOutcome::success(
                    &faqs,
                    result.message.map(|m| format!("{}\n", m)),
                ),
                None => FunctionOutcome::failure(format!(
                    "Erro ao buscar FAQ: {}",
                    result.error.unwrap_or_default()
                )),
            }
        }
        FaqCall::ConfirmDelete(args) => {
            if !args.confirmed {
                let message = "Remoção cancelada pelo usuário.";
                return FunctionOutcome::success(
                    &json!({ "success": false, "message": message }),
                    Some(format!("{}\n", message)),
                );
            }
            let result = store.confirm_delete(&args.id, true).await;
            match result.data {
                Some(faq) => {
                    FunctionOutcome::success(&faq, Some("FAQ removida com sucesso!\n".to_string()))
                }
                None => FunctionOutcome::failure(format!(
                    "Erro ao confirmar remoção: {}",
                    result.error.unwrap_or_default()
                )),
            }
        }
        FaqCall::DeleteByText(args) => {
            let result = store.delete_by_text(&args.question_text).await;
            if result.success {
                let notice = result.message.as_ref().map(|m| format!("{}\n", m));
                FunctionOutcome::success(&result, notice)
            } else {
                FunctionOutcome::failure(result.error.unwrap_or_default())
            }
        }
    }
}
