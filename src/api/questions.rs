use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::post,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::{Credentials, authorize};
use super::resource::{CrudResource, Operation, OperationAuth, crud_router, route_auth};
use super::{ApiError, QuestionDto};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QuestionBody {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitOutcomeRequest {
    pub correct: bool,
}

pub struct QuestionsResource;

#[async_trait::async_trait]
impl CrudResource for QuestionsResource {
    const NAME: &'static str = "questions";
    const HAS_UPDATE: bool = true;
    const EXTRA_LIST_SEGMENT: Option<&'static str> = Some("user");

    type Presented = QuestionDto;
    type CreateBody = QuestionBody;
    type UpdateBody = QuestionBody;

    fn auth(operation: Operation) -> OperationAuth {
        match operation {
            Operation::Create | Operation::Update | Operation::Delete => {
                OperationAuth::bearer("admin")
            }
            Operation::List | Operation::Get | Operation::ExtraList => {
                OperationAuth::bearer("user")
            }
        }
    }

    async fn list(
        state: &AppState,
        _credentials: &Credentials,
    ) -> Result<Vec<QuestionDto>, ApiError> {
        let questions = state.store().list_questions().await?;
        Ok(questions.into_iter().map(QuestionDto::from).collect())
    }

    async fn get(
        state: &AppState,
        _credentials: &Credentials,
        id: &str,
    ) -> Result<QuestionDto, ApiError> {
        let question = state
            .store()
            .get_question(id)
            .await?
            .ok_or_else(|| ApiError::not_found("question", id))?;
        Ok(QuestionDto::from(question))
    }

    async fn create(
        state: &AppState,
        _credentials: &Credentials,
        body: QuestionBody,
    ) -> Result<QuestionDto, ApiError> {
        if body.question.is_empty() {
            return Err(ApiError::validation("question text is required"));
        }
        if body.answer.is_empty() {
            return Err(ApiError::validation("answer text is required"));
        }

        let question = state
            .store()
            .add_question(&body.question, &body.answer)
            .await?;
        Ok(QuestionDto::from(question))
    }

    async fn update(
        state: &AppState,
        _credentials: &Credentials,
        id: &str,
        body: QuestionBody,
    ) -> Result<QuestionDto, ApiError> {
        let question = state
            .store()
            .update_question(id, &body.question, &body.answer)
            .await?;
        Ok(QuestionDto::from(question))
    }

    async fn delete(
        state: &AppState,
        _credentials: &Credentials,
        id: &str,
    ) -> Result<(), ApiError> {
        state.store().delete_question(id).await?;
        Ok(())
    }

    /// Questions the caller has answered, annotated with their counts.
    async fn extra_list(
        state: &AppState,
        credentials: &Credentials,
    ) -> Result<Vec<QuestionDto>, ApiError> {
        let user = credentials.user()?;
        let questions = state.store().list_questions_for_user(&user.id).await?;
        Ok(questions.into_iter().map(QuestionDto::from).collect())
    }
}

pub fn router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    crud_router::<QuestionsResource>(state).route(
        "/questions/{id}/submit",
        post(submit_outcome).layer(middleware::from_fn_with_state(
            route_auth(state, OperationAuth::bearer("user")),
            authorize,
        )),
    )
}

/// POST /api/questions/{id}/submit
/// Record one correctness outcome for the caller against a question.
async fn submit_outcome(
    State(state): State<Arc<AppState>>,
    Extension(credentials): Extension<Credentials>,
    Path(id): Path<String>,
    Json(payload): Json<SubmitOutcomeRequest>,
) -> Result<StatusCode, ApiError> {
    let user = credentials.user()?;

    state
        .store()
        .get_question(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("question", &id))?;

    state
        .store()
        .record_outcome(&user.id, &id, payload.correct)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
