use super::router::AppState;
use crate::db::models::{Faq, FaqPatch, ListOptions};
use crate::error::AppError;
use crate::faq::Envelope;
use axum::extract::{Path, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

const REST_LIST_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct CreateFaq {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub async fn list_faqs(State(state): State<AppState>) -> Result<Json<Vec<Faq>>, AppError> {
    let faqs = state
        .store
        .list(&ListOptions {
            limit: Some(REST_LIST_LIMIT),
            ..Default::default()
        })
        .await?;
    Ok(Json(faqs))
}

pub async fn create_faq(
    State(state): State<AppState>,
    Json(body): Json<CreateFaq>,
) -> Result<Json<Envelope<Faq>>, AppError> {
    let (Some(question), Some(answer)) = (
        body.question.filter(|q| !q.is_empty()),
        body.answer.filter(|a| !a.is_empty()),
    ) else {
        return Err(AppError::BadRequest(
            "Pergunta e resposta são obrigatórios".into(),
        ));
    };

    let result = state.store.add(&question, &answer, &body.tags).await;
    if result.success {
        log::info!("FAQ created via API");
    }
    Ok(Json(result))
}

pub async fn update_faq(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<FaqPatch>,
) -> Result<Json<Faq>, AppError> {
    let faq = state.store.update(&id, &patch).await?;
    Ok(Json(faq))
}

pub async fn delete_faq(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !state.store.delete(&id).await? {
        return Err(AppError::NotFound(format!("FAQ {}", id)));
    }
    log::info!("FAQ {} deleted via API", id);
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::super::router::create_router;
    use super::super::router::test_support::*;
    use crate::config::UpstreamConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn create_list_update_delete() {
        let app = create_router(state(UpstreamConfig::default()).await);

        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/faq",
                json!({"question": "Qual o horário?", "answer": "9h às 18h", "tags": ["horario"]}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let created = body_json(resp).await;
        assert_eq!(created["success"], true);
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let resp = app
            .clone()
            .oneshot(Request::get("/api/faq").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let listed = body_json(resp).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["tags"], json!(["horario"]));

        let resp = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/faq/{id}"),
                json!({"answer": "8h às 17h"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let updated = body_json(resp).await;
        assert_eq!(updated["question"], "Qual o horário?");
        assert_eq!(updated["answer"], "8h às 17h");

        let delete = || {
            Request::delete(format!("/api/faq/{id}"))
                .body(Body::empty())
                .unwrap()
        };
        let resp = app.clone().oneshot(delete()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({"success": true}));

        let resp = app.oneshot(delete()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_requires_question_and_answer() {
        let app = create_router(state(UpstreamConfig::default()).await);
        let resp = app
            .oneshot(json_request("POST", "/api/faq", json!({"question": "Só a pergunta"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Pergunta e resposta são obrigatórios"));
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let app = create_router(state(UpstreamConfig::default()).await);
        let resp = app
            .oneshot(json_request("PUT", "/api/faq/nope", json!({"answer": "x"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
