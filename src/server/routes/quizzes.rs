use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    db::{queries::questions, Question},
    server::{app::AppState, deserializers::deserialize_optional_id, error::ApiError},
    telemetry::QUIZ_QUESTIONS_SERVED,
};

use super::ApiResponse;

/// Category id the frontend sends for "all categories".
const ALL_CATEGORIES: i64 = 0;

#[derive(Deserialize)]
struct QuizRequest {
    previous_questions: Option<Vec<i64>>,
    quiz_category: Option<QuizCategory>,
}

#[derive(Deserialize)]
struct QuizCategory {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    id: Option<i64>,
}

#[derive(Serialize)]
struct QuizResponse {
    success: bool,
    // null once the player has seen every question
    question: Option<Question>,
}

struct QuizRound {
    category: Option<i64>,
    previous: Vec<i64>,
}

impl TryFrom<QuizRequest> for QuizRound {
    type Error = ApiError;

    fn try_from(req: QuizRequest) -> Result<Self, Self::Error> {
        let previous = req.previous_questions.ok_or(ApiError::BadRequest)?;
        let id = req
            .quiz_category
            .and_then(|c| c.id)
            .ok_or(ApiError::BadRequest)?;
        Ok(QuizRound {
            category: (id != ALL_CATEGORIES).then_some(id),
            previous,
        })
    }
}

async fn next_quiz_question(
    State(pool): State<SqlitePool>,
    body: Result<Json<QuizRequest>, JsonRejection>,
) -> ApiResponse<QuizResponse> {
    let Json(req) = body.map_err(|e| {
        tracing::debug!("Rejected quiz payload: {e}");
        ApiError::BadRequest
    })?;
    let round = QuizRound::try_from(req)?;
    let question = pick_random_question(&pool, &round).await?;

    if let Some(q) = &question {
        let label = round
            .category
            .map_or_else(|| "all".to_owned(), |c| c.to_string());
        QUIZ_QUESTIONS_SERVED
            .with_label_values(&[label.as_str()])
            .inc();
        tracing::debug!("Serving quiz question {}", q.id);
    }

    Ok(Json(QuizResponse {
        success: true,
        question,
    }))
}

// Counts the candidates, then reads the one at a random offset. Both reads share one
// transaction so they see the same rows.
async fn pick_random_question(
    pool: &SqlitePool,
    round: &QuizRound,
) -> sqlx::Result<Option<Question>> {
    let mut tx = pool.begin().await?;
    let count =
        questions::count_quiz_candidates(&mut *tx, round.category, &round.previous).await?;
    if count == 0 {
        return Ok(None);
    }
    let offset = rand::thread_rng().gen_range(0..count);
    let question = candidate_at(&mut tx, round, offset).await?;
    tx.commit().await?;
    Ok(question)
}

// falls back to the first candidate when `offset` is past the end
async fn candidate_at(
    conn: &mut SqliteConnection,
    round: &QuizRound,
    offset: i64,
) -> sqlx::Result<Option<Question>> {
    let question =
        questions::get_quiz_candidate(&mut *conn, round.category, &round.previous, offset).await?;
    match question {
        None if offset > 0 => {
            questions::get_quiz_candidate(conn, round.category, &round.previous, 0).await
        }
        question => Ok(question),
    }
}

pub fn quizzes_router(state: AppState) -> Router {
    Router::new()
        .route("/quizzes", post(next_quiz_question))
        .with_state(state)
}
