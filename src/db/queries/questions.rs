use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteExecutor;
use sqlx::types::Json;
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub category: i64,
    pub difficulty: i64,
}

/// A validated question that is ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question: String,
    pub answer: String,
    pub category: i64,
    pub difficulty: i64,
}

pub async fn get_all_questions(pool: &SqlitePool) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, answer, category, difficulty FROM questions ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Counts questions, optionally restricted to one category.
pub async fn count_questions(pool: &SqlitePool, category: Option<i64>) -> sqlx::Result<i64> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM questions WHERE ?1 IS NULL OR questions.category = ?1
        "#,
    )
    .bind(category)
    .fetch_one(pool)
    .await
}

pub async fn get_questions_page(
    pool: &SqlitePool,
    category: Option<i64>,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, answer, category, difficulty FROM questions
        WHERE ?1 IS NULL OR questions.category = ?1
        ORDER BY id
        LIMIT ?2 OFFSET ?3
        "#,
    )
    .bind(category)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

// LIKE wildcards in the term must match literally
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

pub async fn count_search_results(pool: &SqlitePool, term: &str) -> sqlx::Result<i64> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM questions WHERE questions.question LIKE ?1 ESCAPE '\'
        "#,
    )
    .bind(like_pattern(term))
    .fetch_one(pool)
    .await
}

/// Substring search over question text.
///
/// SQLite's `LIKE` (and `lower()`) fold case for ASCII letters only, so "PENICILLIN"
/// finds "penicillin" but "ÉCOLE" does not find "école".
pub async fn search_questions(
    pool: &SqlitePool,
    term: &str,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, answer, category, difficulty FROM questions
        WHERE questions.question LIKE ?1 ESCAPE '\'
        ORDER BY id
        LIMIT ?2 OFFSET ?3
        "#,
    )
    .bind(like_pattern(term))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn create_question(pool: &SqlitePool, question: &NewQuestion) -> sqlx::Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO questions (question, answer, category, difficulty) VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(&question.question)
    .bind(&question.answer)
    .bind(question.category)
    .bind(question.difficulty)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// Returns the number of deleted rows, zero when the question does not exist.
pub async fn delete_question(pool: &SqlitePool, id: i64) -> sqlx::Result<u64> {
    let res = sqlx::query(
        r#"
        DELETE FROM questions WHERE questions.id = ?1
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

/// Number of questions still available for a quiz round.
///
/// `previous` is bound once as a JSON array, so its length is not limited by the
/// number of parameters SQLite accepts per statement.
pub async fn count_quiz_candidates(
    executor: impl SqliteExecutor<'_>,
    category: Option<i64>,
    previous: &[i64],
) -> sqlx::Result<i64> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM questions
        WHERE (?1 IS NULL OR questions.category = ?1)
          AND questions.id NOT IN (SELECT value FROM json_each(?2))
        "#,
    )
    .bind(category)
    .bind(Json(previous))
    .fetch_one(executor)
    .await
}

/// Reads the quiz candidate at `offset`, ordered by id.
pub async fn get_quiz_candidate(
    executor: impl SqliteExecutor<'_>,
    category: Option<i64>,
    previous: &[i64],
    offset: i64,
) -> sqlx::Result<Option<Question>> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, answer, category, difficulty FROM questions
        WHERE (?1 IS NULL OR questions.category = ?1)
          AND questions.id NOT IN (SELECT value FROM json_each(?2))
        ORDER BY id
        LIMIT 1 OFFSET ?3
        "#,
    )
    .bind(category)
    .bind(Json(previous))
    .bind(offset)
    .fetch_optional(executor)
    .await
}

/// Inserts questions by id, overwriting the questions that already exist.
pub async fn import_questions(pool: &SqlitePool, questions: Vec<Question>) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    for q in questions {
        sqlx::query(
            r#"
            INSERT INTO questions (id, question, answer, category, difficulty) VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (id) DO UPDATE SET
                question = excluded.question,
                answer = excluded.answer,
                category = excluded.category,
                difficulty = excluded.difficulty
            "#,
        )
        .bind(q.id)
        .bind(&q.question)
        .bind(&q.answer)
        .bind(q.category)
        .bind(q.difficulty)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::queries::categories::create_category;
    use crate::db::test_pool;

    async fn get_question_by_id(pool: &SqlitePool, id: i64) -> Option<Question> {
        sqlx::query_as::<_, Question>(
            "SELECT id, question, answer, category, difficulty FROM questions WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .unwrap()
    }

    fn new_question(text: &str, category: i64) -> NewQuestion {
        NewQuestion {
            question: text.into(),
            answer: "answer".into(),
            category,
            difficulty: 2,
        }
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("title"), "%title%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[tokio::test]
    async fn create_then_fetch_and_delete() {
        let pool = test_pool().await;
        let cat = create_category(&pool, "History").await.unwrap();

        let id = create_question(&pool, &new_question("Who?", cat)).await.unwrap();
        let q = get_question_by_id(&pool, id).await.unwrap();
        assert_eq!(q.question, "Who?");
        assert_eq!(q.category, cat);
        assert_eq!(count_questions(&pool, None).await.unwrap(), 1);

        assert_eq!(delete_question(&pool, id).await.unwrap(), 1);
        assert_eq!(delete_question(&pool, id).await.unwrap(), 0);
        assert!(get_question_by_id(&pool, id).await.is_none());
    }

    #[tokio::test]
    async fn difficulty_is_checked_by_schema() {
        let pool = test_pool().await;
        let cat = create_category(&pool, "History").await.unwrap();
        let mut q = new_question("Too hard", cat);
        q.difficulty = 6;
        assert!(create_question(&pool, &q).await.is_err());
    }

    #[tokio::test]
    async fn pages_are_filtered_by_category() {
        let pool = test_pool().await;
        let art = create_category(&pool, "Art").await.unwrap();
        let sports = create_category(&pool, "Sports").await.unwrap();
        for i in 0..5 {
            create_question(&pool, &new_question(&format!("art {i}"), art)).await.unwrap();
        }
        create_question(&pool, &new_question("sports", sports)).await.unwrap();

        assert_eq!(count_questions(&pool, Some(art)).await.unwrap(), 5);
        assert_eq!(count_questions(&pool, None).await.unwrap(), 6);

        let page = get_questions_page(&pool, Some(art), 2, 2).await.unwrap();
        let texts: Vec<_> = page.iter().map(|q| q.question.as_str()).collect();
        assert_eq!(texts, vec!["art 2", "art 3"]);
        assert!(get_questions_page(&pool, Some(art), 2, 6).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_literal() {
        let pool = test_pool().await;
        let cat = create_category(&pool, "Science").await.unwrap();
        create_question(&pool, &new_question("Who discovered Penicillin?", cat)).await.unwrap();
        create_question(&pool, &new_question("What is 100% of 3?", cat)).await.unwrap();
        create_question(&pool, &new_question("What is 1000 of 3?", cat)).await.unwrap();

        assert_eq!(count_search_results(&pool, "penicillin").await.unwrap(), 1);
        let found = search_questions(&pool, "0%", 10, 0).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].question, "What is 100% of 3?");
        assert_eq!(count_search_results(&pool, "xyz").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn quiz_candidates_skip_previous_questions() {
        let pool = test_pool().await;
        let art = create_category(&pool, "Art").await.unwrap();
        let sports = create_category(&pool, "Sports").await.unwrap();
        let a1 = create_question(&pool, &new_question("a1", art)).await.unwrap();
        let a2 = create_question(&pool, &new_question("a2", art)).await.unwrap();
        create_question(&pool, &new_question("s1", sports)).await.unwrap();

        assert_eq!(count_quiz_candidates(&pool, None, &[]).await.unwrap(), 3);
        assert_eq!(count_quiz_candidates(&pool, Some(art), &[a1]).await.unwrap(), 1);

        let q = get_quiz_candidate(&pool, Some(art), &[a1], 0).await.unwrap().unwrap();
        assert_eq!(q.id, a2);
        assert!(get_quiz_candidate(&pool, Some(art), &[a1, a2], 0)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn search_folds_ascii_case_only() {
        let pool = test_pool().await;
        let cat = create_category(&pool, "Geography").await.unwrap();
        create_question(&pool, &new_question("Where is the école militaire?", cat)).await.unwrap();

        assert_eq!(count_search_results(&pool, "MILITAIRE").await.unwrap(), 1);
        assert_eq!(count_search_results(&pool, "école").await.unwrap(), 1);
        assert_eq!(count_search_results(&pool, "ÉCOLE").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn quiz_candidates_accept_long_exclusion_lists() {
        let pool = test_pool().await;
        let art = create_category(&pool, "Art").await.unwrap();
        let a1 = create_question(&pool, &new_question("a1", art)).await.unwrap();
        create_question(&pool, &new_question("a2", art)).await.unwrap();

        // far more ids than SQLite allows bound parameters in one statement
        let mut previous: Vec<i64> = (1000..41000).collect();
        previous.push(a1);

        assert_eq!(count_quiz_candidates(&pool, None, &previous).await.unwrap(), 1);
        let q = get_quiz_candidate(&pool, None, &previous, 0).await.unwrap().unwrap();
        assert_eq!(q.question, "a2");
    }

    #[tokio::test]
    async fn import_upserts_by_id() {
        let pool = test_pool().await;
        let cat = create_category(&pool, "Art").await.unwrap();
        let id = create_question(&pool, &new_question("old", cat)).await.unwrap();

        import_questions(
            &pool,
            vec![
                Question {
                    id,
                    question: "new".into(),
                    answer: "a".into(),
                    category: cat,
                    difficulty: 3,
                },
                Question {
                    id: id + 10,
                    question: "other".into(),
                    answer: "b".into(),
                    category: cat,
                    difficulty: 1,
                },
            ],
        )
        .await
        .unwrap();

        let all = get_all_questions(&pool).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].question, "new");
        assert_eq!(all[0].difficulty, 3);
    }
}
