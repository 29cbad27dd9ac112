use std::collections::BTreeMap;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::{
    db::{
        queries::{categories::get_category, questions},
        NewQuestion, Question,
    },
    server::{
        app::AppState,
        deserializers::deserialize_optional_id,
        error::ApiError,
        pagination::{Page, PageQuery},
    },
    telemetry::{QUESTIONS_CREATED, QUESTIONS_DELETED},
};

use super::{categories::categories_by_id, ApiResponse};

const SEARCH_TERM_FIELD: &str = "searchTerm";

#[derive(Serialize)]
struct QuestionsResponse {
    success: bool,
    questions: Vec<Question>,
    total_questions: i64,
    current_category: Option<i64>,
    categories: BTreeMap<i64, String>,
}

#[derive(Serialize)]
struct SearchResponse {
    success: bool,
    questions: Vec<Question>,
    total_questions: i64,
}

#[derive(Serialize)]
struct CreatedResponse {
    success: bool,
    created: i64,
}

#[derive(Serialize)]
struct DeletedResponse {
    success: bool,
    deleted: i64,
}

#[derive(Deserialize)]
struct QuestionForm {
    question: Option<String>,
    answer: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    category: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    difficulty: Option<i64>,
}

impl QuestionForm {
    fn validate(self) -> Result<NewQuestion, ApiError> {
        let non_blank = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        let question = non_blank(self.question).ok_or(ApiError::Unprocessable)?;
        let answer = non_blank(self.answer).ok_or(ApiError::Unprocessable)?;
        let category = self.category.ok_or(ApiError::Unprocessable)?;
        let difficulty = self
            .difficulty
            .filter(|d| (1..=5).contains(d))
            .ok_or(ApiError::Unprocessable)?;
        Ok(NewQuestion {
            question,
            answer,
            category,
            difficulty,
        })
    }
}

async fn get_questions(
    State(pool): State<SqlitePool>,
    Query(page): Query<PageQuery>,
) -> ApiResponse<QuestionsResponse> {
    let page = Page::from(page);
    let offset = page.offset().ok_or(ApiError::NotFound)?;

    let questions = questions::get_questions_page(&pool, None, page.limit(), offset).await?;
    if questions.is_empty() {
        return Err(ApiError::NotFound);
    }

    Ok(Json(QuestionsResponse {
        success: true,
        questions,
        total_questions: questions::count_questions(&pool, None).await?,
        current_category: None,
        categories: categories_by_id(&pool).await?,
    }))
}

/// POST /questions either searches or creates, depending on whether the body carries a
/// search term. Both answer with JSON of a different shape.
async fn post_questions(
    State(pool): State<SqlitePool>,
    Query(page): Query<PageQuery>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body.map_err(|e| {
        tracing::debug!("Rejected question payload: {e}");
        ApiError::Unprocessable
    })?;

    match body.get(SEARCH_TERM_FIELD) {
        Some(Value::String(term)) => {
            let found = search(&pool, term, Page::from(page)).await?;
            Ok(found.into_response())
        }
        Some(_) => Err(ApiError::Unprocessable),
        None => {
            let form: QuestionForm =
                serde_json::from_value(body).map_err(|_| ApiError::Unprocessable)?;
            let created = create(&pool, form.validate()?).await?;
            Ok(created.into_response())
        }
    }
}

async fn search(pool: &SqlitePool, term: &str, page: Page) -> ApiResponse<SearchResponse> {
    let total_questions = questions::count_search_results(pool, term).await?;
    if total_questions == 0 {
        return Err(ApiError::NotFound);
    }
    let offset = page.offset().ok_or(ApiError::NotFound)?;
    let questions = questions::search_questions(pool, term, page.limit(), offset).await?;
    if questions.is_empty() {
        return Err(ApiError::NotFound);
    }

    Ok(Json(SearchResponse {
        success: true,
        questions,
        total_questions,
    }))
}

async fn create(pool: &SqlitePool, question: NewQuestion) -> ApiResponse<CreatedResponse> {
    let category = get_category(pool, question.category).await.map_err(|e| {
        tracing::warn!("Failed to look up category {}: {e}", question.category);
        ApiError::Unprocessable
    })?;
    if category.is_none() {
        tracing::info!("Refusing question for unknown category {}", question.category);
        return Err(ApiError::Unprocessable);
    }
    let id = questions::create_question(pool, &question)
        .await
        .map_err(|e| {
            tracing::warn!("Failed to insert question: {e}");
            ApiError::Unprocessable
        })?;
    QUESTIONS_CREATED.inc();
    tracing::info!("Created question {id}");

    Ok(Json(CreatedResponse {
        success: true,
        created: id,
    }))
}

async fn delete_question(
    State(pool): State<SqlitePool>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResponse<DeletedResponse> {
    let Path(id) = id.map_err(|_| ApiError::NotFound)?;
    let deleted = questions::delete_question(&pool, id).await.map_err(|e| {
        tracing::warn!("Failed to delete question {id}: {e}");
        ApiError::Unprocessable
    })?;
    if deleted == 0 {
        return Err(ApiError::NotFound);
    }
    QUESTIONS_DELETED.inc();
    tracing::info!("Deleted question {id}");

    Ok(Json(DeletedResponse {
        success: true,
        deleted: id,
    }))
}

pub fn questions_router(state: AppState) -> Router {
    Router::new()
        .route("/questions", get(get_questions).post(post_questions))
        .route("/questions/{id}", delete(delete_question))
        .with_state(state)
}
