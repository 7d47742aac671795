use crate::db::models::{FaqPatch, ListOptions};
use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// FAQ operations the model may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaqFunction {
    SearchFaq,
    AddFaq,
    UpdateFaq,
    ListFaq,
    DeleteFaq,
    FindFaqToDelete,
    ConfirmDeleteFaq,
    DeleteFaqByText,
}

impl FaqFunction {
    pub const ALL: [FaqFunction; 8] = [
        FaqFunction::SearchFaq,
        FaqFunction::AddFaq,
        FaqFunction::UpdateFaq,
        FaqFunction::ListFaq,
        FaqFunction::DeleteFaq,
        FaqFunction::FindFaqToDelete,
        FaqFunction::ConfirmDeleteFaq,
        FaqFunction::DeleteFaqByText,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FaqFunction::SearchFaq => "search_faq",
            FaqFunction::AddFaq => "add_faq",
            FaqFunction::UpdateFaq => "update_faq",
            FaqFunction::ListFaq => "list_faq",
            FaqFunction::DeleteFaq => "delete_faq",
            FaqFunction::FindFaqToDelete => "find_faq_to_delete",
            FaqFunction::ConfirmDeleteFaq => "confirm_delete_faq",
            FaqFunction::DeleteFaqByText => "delete_faq_by_text",
        }
    }

    fn definition(&self) -> Value {
        let tags = |description: &str| {
            json!({
                "type": "array",
                "items": { "type": "string" },
                "description": description
            })
        };

        let (description, parameters) = match self {
            FaqFunction::SearchFaq => (
                "Busca perguntas frequentes na base de conhecimento usando texto ou tags",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Texto para buscar nas perguntas e respostas" },
                        "tags": tags("Lista de tags para filtrar os resultados")
                    },
                    "required": ["query"]
                }),
            ),
            FaqFunction::AddFaq => (
                "Adiciona uma nova pergunta frequente à base de conhecimento",
                json!({
                    "type": "object",
                    "properties": {
                        "question": { "type": "string", "description": "A pergunta a ser adicionada" },
                        "answer": { "type": "string", "description": "A resposta para a pergunta" },
                        "tags": tags("Lista de tags relacionadas à pergunta")
                    },
                    "required": ["question", "answer"]
                }),
            ),
            FaqFunction::UpdateFaq => (
                "Atualiza a pergunta, a resposta ou as tags de uma FAQ existente",
                json!({
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "description": "ID da FAQ a ser atualizada" },
                        "question": { "type": "string", "description": "Nova pergunta" },
                        "answer": { "type": "string", "description": "Nova resposta" },
                        "tags": tags("Novas tags, substituindo as atuais")
                    },
                    "required": ["id"]
                }),
            ),
            FaqFunction::ListFaq => (
                "Lista todas as perguntas frequentes, opcionalmente filtradas por tags",
                json!({
                    "type": "object",
                    "properties": {
                        "tags": tags("Lista de tags para filtrar os resultados"),
                        "limit": { "type": "number", "description": "Número máximo de resultados a retornar" },
                        "offset": { "type": "number", "description": "Número de resultados a pular (para paginação)" }
                    }
                }),
            ),
            FaqFunction::DeleteFaq => (
                "Remove uma FAQ pelo seu ID",
                json!({
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "description": "ID da FAQ a ser removida" }
                    },
                    "required": ["id"]
                }),
            ),
            FaqFunction::FindFaqToDelete => (
                "Procura FAQs pelo texto da pergunta e pede confirmação antes de removê-las",
                json!({
                    "type": "object",
                    "properties": {
                        "question_text": { "type": "string", "description": "Texto da pergunta que se deseja remover" }
                    },
                    "required": ["question_text"]
                }),
            ),
            FaqFunction::ConfirmDeleteFaq => (
                "Confirma ou cancela a remoção de uma FAQ encontrada anteriormente",
                json!({
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "description": "ID da FAQ a ser removida" },
                        "confirmed": { "type": "boolean", "description": "Se o usuário confirmou a remoção" }
                    },
                    "required": ["id", "confirmed"]
                }),
            ),
            FaqFunction::DeleteFaqByText => (
                "Encontra e remove uma FAQ baseado no texto da pergunta. Use esta função quando o usuário pedir para remover uma FAQ.",
                json!({
                    "type": "object",
                    "properties": {
                        "question_text": { "type": "string", "description": "Texto da pergunta que se deseja remover" }
                    },
                    "required": ["question_text"]
                }),
            ),
        };

        json!({
            "name": self.as_str(),
            "description": description,
            "parameters": parameters,
        })
    }
}

/// The `functions` catalogue declared on the first upstream call.
pub fn definitions() -> Vec<Value> {
    FaqFunction::ALL.iter().map(FaqFunction::definition).collect()
}

/// A completed invocation with its argument text parsed once.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallRecord {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl FunctionCallRecord {
    /// Fails when the accumulated text is not a JSON object.
    pub fn parse(name: &str, raw_arguments: &str) -> Result<Self, AppError> {
        match serde_json::from_str::<Value>(raw_arguments)? {
            Value::Object(arguments) => Ok(Self {
                name: name.to_string(),
                arguments,
            }),
            other => Err(AppError::BadRequest(format!(
                "argumentos de {} não são um objeto JSON: {}",
                name, other
            ))),
        }
    }

    fn args<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        Ok(serde_json::from_value(Value::Object(self.arguments.clone()))?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchArgs {
    pub query: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddArgs {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateArgs {
    pub id: String,
    #[serde(flatten)]
    pub patch: FaqPatch,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextArgs {
    pub question_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmArgs {
    pub id: String,
    #[serde(default)]
    pub confirmed: bool,
}

/// A recognised function together with its typed arguments.
#[derive(Debug, Clone)]
pub enum FaqCall {
    Search(SearchArgs),
    Add(AddArgs),
    Update(UpdateArgs),
    List(ListOptions),
    Delete(IdArgs),
    FindToDelete(TextArgs),
    ConfirmDelete(ConfirmArgs),
    DeleteByText(TextArgs),
}

impl FaqCall {
    pub fn from_record(function: FaqFunction, record: &FunctionCallRecord) -> Result<Self, AppError> {
        Ok(match function {
            FaqFunction::SearchFaq => FaqCall::Search(record.args()?),
            FaqFunction::AddFaq => FaqCall::Add(record.args()?),
            FaqFunction::UpdateFaq => FaqCall::Update(record.args()?),
            FaqFunction::ListFaq => FaqCall::List(record.args()?),
            FaqFunction::DeleteFaq => FaqCall::Delete(record.args()?),
            FaqFunction::FindFaqToDelete => FaqCall::FindToDelete(record.args()?),
            FaqFunction::ConfirmDeleteFaq => FaqCall::ConfirmDelete(record.args()?),
            FaqFunction::DeleteFaqByText => FaqCall::DeleteByText(record.args()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_and_unknown_is_rejected() {
        for function in FaqFunction::ALL {
            assert_eq!(FaqFunction::from_name(function.as_str()), Some(function));
        }
        assert_eq!(FaqFunction::from_name("delete_all"), None);
    }

    #[test]
    fn catalogue_declares_every_function() {
        let defs = definitions();
        let names: Vec<&str> = defs.iter().filter_map(|d| d["name"].as_str()).collect();
        assert_eq!(names.len(), 8);
        assert!(names.contains(&"confirm_delete_faq"));
        assert_eq!(defs[0]["parameters"]["required"], json!(["query"]));
    }

    #[test]
    fn record_requires_an_object() {
        let record = FunctionCallRecord::parse("search_faq", r#"{"query":"test"}"#).unwrap();
        assert_eq!(record.arguments["query"], "test");

        assert!(matches!(
            FunctionCallRecord::parse("search_faq", r#"{"query":"#),
            Err(AppError::Json(_))
        ));
        assert!(matches!(
            FunctionCallRecord::parse("search_faq", "[1]"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn typed_arguments() {
        let record = FunctionCallRecord::parse(
            "update_faq",
            r#"{"id":"42","answer":"Nova","tags":["x"]}"#,
        )
        .unwrap();
        match FaqCall::from_record(FaqFunction::UpdateFaq, &record).unwrap() {
            FaqCall::Update(args) => {
                assert_eq!(args.id, "42");
                assert_eq!(args.patch.question, None);
                assert_eq!(args.patch.answer.as_deref(), Some("Nova"));
                assert_eq!(args.patch.tags, Some(vec!["x".to_string()]));
            }
            other => panic!("unexpected call {other:?}"),
        }

        let record = FunctionCallRecord::parse("confirm_delete_faq", r#"{"id":"1"}"#).unwrap();
        match FaqCall::from_record(FaqFunction::ConfirmDeleteFaq, &record).unwrap() {
            FaqCall::ConfirmDelete(args) => assert!(!args.confirmed),
            other => panic!("unexpected call {other:?}"),
        }

        let record = FunctionCallRecord::parse("add_faq", r#"{"question":"Q"}"#).unwrap();
        assert!(FaqCall::from_record(FaqFunction::AddFaq, &record).is_err());
    }
}
