// tests/pg_store_tests.rs

use chrono::{Duration, Utc};
use exam_session::{
    error::AppError,
    models::progress::{NewModuleProgress, QuestionResponse},
    store::{PgStore, ProgressStore},
};
use sqlx::{PgPool, postgres::PgPoolOptions};

const EXAM_TAKER: i64 = 7;

/// Ids of one freshly seeded group with `slots` slots on the same module.
struct Seeded {
    assignment_id: i64,
    participation_id: i64,
    slot_ids: Vec<i64>,
    version_id: i64,
    question_id: i64,
}

/// Connects and migrates when `DATABASE_URL` is set; these tests are skipped otherwise.
async fn connect() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres store tests");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    Some(pool)
}

async fn seed(pool: &PgPool, slots: i32) -> Seeded {
    let group_id: i64 = sqlx::query_scalar("INSERT INTO groups (name) VALUES ('Store tests') RETURNING id")
        .fetch_one(pool)
        .await
        .unwrap();
    let module_id: i64 = sqlx::query_scalar("INSERT INTO modules (title) VALUES ('Geography') RETURNING id")
        .fetch_one(pool)
        .await
        .unwrap();

    let mut slot_ids = Vec::new();
    for order_number in 1..=slots {
        let slot_id: i64 = sqlx::query_scalar(
            "INSERT INTO group_members (group_id, order_number, module_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(group_id)
        .bind(order_number)
        .bind(module_id)
        .fetch_one(pool)
        .await
        .unwrap();
        slot_ids.push(slot_id);
    }

    let version_id: i64 = sqlx::query_scalar(
        "INSERT INTO module_versions (module_id, duration_in_minutes, published_at) \
         VALUES ($1, 10, CURRENT_TIMESTAMP) RETURNING id",
    )
    .bind(module_id)
    .fetch_one(pool)
    .await
    .unwrap();
    let question_id: i64 = sqlx::query_scalar(
        "INSERT INTO questions (module_version_id, type, content) VALUES ($1, 'single', 'Capital?') RETURNING id",
    )
    .bind(version_id)
    .fetch_one(pool)
    .await
    .unwrap();

    let assignment_id: i64 = sqlx::query_scalar("INSERT INTO assignments (group_id) VALUES ($1) RETURNING id")
        .bind(group_id)
        .fetch_one(pool)
        .await
        .unwrap();
    let participation_id: i64 = sqlx::query_scalar(
        "INSERT INTO assignment_participations (assignment_id, exam_taker_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(assignment_id)
    .bind(EXAM_TAKER)
    .fetch_one(pool)
    .await
    .unwrap();

    Seeded {
        assignment_id,
        participation_id,
        slot_ids,
        version_id,
        question_id,
    }
}

fn new_progress(seeded: &Seeded, slot_id: i64, started_at: chrono::DateTime<Utc>) -> NewModuleProgress {
    NewModuleProgress {
        exam_taker_id: EXAM_TAKER,
        participation_id: seeded.participation_id,
        assignment_id: seeded.assignment_id,
        group_member_id: slot_id,
        module_version_id: seeded.version_id,
        duration_in_minutes: 10,
        started_at,
        question_seed: Some(42),
        answer_seed: None,
    }
}

fn response(progress_id: i64, question_id: i64, selected: Vec<i64>) -> QuestionResponse {
    QuestionResponse {
        module_progress_id: progress_id,
        question_id,
        question_type: "single".to_string(),
        selected_answer_ids: selected,
        free_text: None,
        is_correct: false,
        responded_at: Utc::now(),
    }
}

#[tokio::test]
async fn duplicate_start_is_conflict() {
    let Some(pool) = connect().await else { return };
    let seeded = seed(&pool, 1).await;
    let store = PgStore::new(pool);

    let created = store
        .insert_progress(new_progress(&seeded, seeded.slot_ids[0], Utc::now()))
        .await
        .unwrap();
    assert_eq!(created.question_seed, Some(42));
    assert!(created.completed_at.is_none());

    let err = store
        .insert_progress(new_progress(&seeded, seeded.slot_ids[0], Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let all = store.list_progress(EXAM_TAKER, seeded.assignment_id).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn responses_are_replaced_until_completion() {
    let Some(pool) = connect().await else { return };
    let seeded = seed(&pool, 1).await;
    let store = PgStore::new(pool);
    let progress = store
        .insert_progress(new_progress(&seeded, seeded.slot_ids[0], Utc::now()))
        .await
        .unwrap();

    store
        .upsert_response(response(progress.id, seeded.question_id, vec![1]))
        .await
        .unwrap();
    store
        .upsert_response(response(progress.id, seeded.question_id, vec![2]))
        .await
        .unwrap();

    let stored = store.find_progress(progress.id).await.unwrap().unwrap();
    assert_eq!(stored.responses.len(), 1);
    assert_eq!(stored.responses[0].selected_answer_ids, vec![2]);

    store.complete_progress(progress.id, Utc::now()).await.unwrap();
    let err = store
        .upsert_response(response(progress.id, seeded.question_id, vec![3]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let stored = store.find_progress(progress.id).await.unwrap().unwrap();
    assert_eq!(stored.responses[0].selected_answer_ids, vec![2]);
}

#[tokio::test]
async fn completion_happens_once() {
    let Some(pool) = connect().await else { return };
    let seeded = seed(&pool, 1).await;
    let store = PgStore::new(pool);
    let progress = store
        .insert_progress(new_progress(&seeded, seeded.slot_ids[0], Utc::now()))
        .await
        .unwrap();

    let first_completion = Utc::now();
    let completed = store.complete_progress(progress.id, first_completion).await.unwrap();
    assert!(completed.completed_at.is_some());

    let err = store
        .complete_progress(progress.id, first_completion + Duration::minutes(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = store.complete_progress(i64::MAX, Utc::now()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn version_lookup_prefers_running_attempt() {
    let Some(pool) = connect().await else { return };
    let seeded = seed(&pool, 2).await;
    let store = PgStore::new(pool);
    let now = Utc::now();

    let older = store
        .insert_progress(new_progress(&seeded, seeded.slot_ids[0], now - Duration::minutes(5)))
        .await
        .unwrap();
    let newer = store
        .insert_progress(new_progress(&seeded, seeded.slot_ids[1], now))
        .await
        .unwrap();

    let found = store
        .find_progress_for_version(EXAM_TAKER, seeded.assignment_id, seeded.version_id, now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, newer.id);

    store.complete_progress(newer.id, now).await.unwrap();
    let found = store
        .find_progress_for_version(EXAM_TAKER, seeded.assignment_id, seeded.version_id, now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, older.id);

    let later = now + Duration::minutes(6);
    let found = store
        .find_progress_for_version(EXAM_TAKER, seeded.assignment_id, seeded.version_id, later)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, newer.id);
}
