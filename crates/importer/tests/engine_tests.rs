//! End-to-end engine behaviour over the in-memory store.

mod common;

use assert_matches::assert_matches;
use serde_json::json;

use common::{Caps, MemoryStore};
use quizmill_core::catalog::{CategoryRef, Quiz, QuizStatus};
use quizmill_core::types::DbId;
use quizmill_core::{
    Difficulty, ImportError, ImportFormat, ImportOptions, ImportStrategy, ImportSummary,
    Visibility,
};
use quizmill_importer::ImportService;

fn payload(quizzes: serde_json::Value) -> Vec<u8> {
    json!({ "quizzes": quizzes }).to_string().into_bytes()
}

async fn run(
    store: &MemoryStore,
    moderator: bool,
    options: &ImportOptions,
    raw: &[u8],
    actor_id: DbId,
) -> ImportSummary {
    let mut service = ImportService::new(store.clone(), Caps { moderator });
    service
        .import(raw, ImportFormat::Json, options, actor_id)
        .await
        .unwrap()
}

fn persisted_quiz(id: DbId, creator_id: DbId, import_content_hash: Option<String>) -> Quiz {
    Quiz {
        id,
        creator_id,
        category: CategoryRef {
            id: DbId::new_v4(),
            name: "general".to_string(),
        },
        tags: vec![],
        title: "Existing".to_string(),
        description: None,
        visibility: Visibility::Private,
        difficulty: Difficulty::Medium,
        estimated_time_minutes: None,
        questions: vec![],
        status: QuizStatus::Draft,
        content_hash: "stale".to_string(),
        presentation_hash: "stale".to_string(),
        import_content_hash,
        reviewed_at: None,
        reviewed_by: None,
        rejection_reason: None,
    }
}

// ── Create path ─────────────────────────────────────────────────────────

#[tokio::test]
async fn create_only_creates_a_draft_private_quiz() {
    let store = MemoryStore::new();
    let options = ImportOptions::with_strategy(ImportStrategy::CreateOnly);
    let raw = payload(json!([{
        "title": "Rust Basics",
        "questions": [{"type": "OPEN", "text": "Why?", "content": {"answer": "Because"}}],
    }]));

    let summary = run(&store, false, &options, &raw, DbId::new_v4()).await;

    assert_eq!(summary.total, 1);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.failed, 0);
    let quizzes = store.quizzes();
    assert_eq!(quizzes.len(), 1);
    assert_eq!(quizzes[0].title, "Rust Basics");
    assert_eq!(quizzes[0].status, QuizStatus::Draft);
    assert_eq!(quizzes[0].visibility, Visibility::Private);
    assert_eq!(quizzes[0].questions.len(), 1);
    assert!(quizzes[0].import_content_hash.is_none());
    assert!(!quizzes[0].content_hash.is_empty());
}

#[tokio::test]
async fn moderator_public_request_is_published() {
    let store = MemoryStore::new();
    let options = ImportOptions::with_strategy(ImportStrategy::CreateOnly);
    let raw = payload(json!([{"title": "Quiz", "visibility": "PUBLIC"}]));

    run(&store, true, &options, &raw, DbId::new_v4()).await;

    let quiz = &store.quizzes()[0];
    assert_eq!(quiz.visibility, Visibility::Public);
    assert_eq!(quiz.status, QuizStatus::Published);
}

#[tokio::test]
async fn non_moderator_public_request_is_coerced_to_private_draft() {
    let store = MemoryStore::new();
    let options = ImportOptions::with_strategy(ImportStrategy::CreateOnly);
    let raw = payload(json!([{"title": "Quiz", "visibility": "PUBLIC"}]));

    run(&store, false, &options, &raw, DbId::new_v4()).await;

    let quiz = &store.quizzes()[0];
    assert_eq!(quiz.visibility, Visibility::Private);
    assert_eq!(quiz.status, QuizStatus::Draft);
}

#[tokio::test]
async fn named_category_is_auto_created_and_default_applied_otherwise() {
    let store = MemoryStore::new();
    let options = ImportOptions::with_strategy(ImportStrategy::CreateOnly);
    let raw = payload(json!([
        {"title": "Categorized", "categoryName": "Machine Learning"},
        {"title": "Uncategorized"},
    ]));

    let summary = run(&store, false, &options, &raw, DbId::new_v4()).await;

    assert_eq!(summary.created, 2);
    let quizzes = store.quizzes();
    let categorized = quizzes.iter().find(|q| q.title == "Categorized").unwrap();
    let uncategorized = quizzes.iter().find(|q| q.title == "Uncategorized").unwrap();
    assert_eq!(categorized.category.name, "Machine Learning");
    assert_eq!(uncategorized.category.name, "general");
}

#[tokio::test]
async fn tags_are_attached_in_input_order() {
    let store = MemoryStore::new();
    store.seed_tag("rust");
    let options = ImportOptions::with_strategy(ImportStrategy::CreateOnly);
    let raw = payload(json!([{"title": "Quiz", "tagNames": ["databases", "rust"]}]));

    run(&store, false, &options, &raw, DbId::new_v4()).await;

    let quiz = &store.quizzes()[0];
    let names: Vec<&str> = quiz.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["databases", "rust"]);
}

// ── UPSERT_BY_ID ────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_by_id_without_id_fails_and_saves_nothing() {
    let store = MemoryStore::new();
    let options = ImportOptions::with_strategy(ImportStrategy::UpsertById);
    let raw = payload(json!([{"title": "No id"}]));

    let summary = run(&store, false, &options, &raw, DbId::new_v4()).await;

    assert_eq!(summary.failed, 1);
    assert!(summary.errors[0]
        .message
        .contains("UPSERT_BY_ID requires quiz id"));
    assert_eq!(store.state.lock().unwrap().save_calls, 0);
    assert!(store.quizzes().is_empty());
}

#[tokio::test]
async fn upsert_by_id_creates_with_the_supplied_id_when_absent() {
    let store = MemoryStore::new();
    let options = ImportOptions::with_strategy(ImportStrategy::UpsertById);
    let id = DbId::new_v4();
    let raw = payload(json!([{"id": id, "title": "Fresh"}]));

    let summary = run(&store, false, &options, &raw, DbId::new_v4()).await;

    assert_eq!(summary.created, 1);
    assert_eq!(store.quiz(id).unwrap().title, "Fresh");
}

#[tokio::test]
async fn upsert_by_id_merges_into_the_existing_quiz() {
    let store = MemoryStore::new();
    let id = DbId::new_v4();
    store.seed_quiz(persisted_quiz(id, DbId::new_v4(), None));
    let options = ImportOptions::with_strategy(ImportStrategy::UpsertById);
    let raw = payload(json!([{"id": id, "title": "Renamed", "difficulty": "HARD"}]));

    let summary = run(&store, false, &options, &raw, DbId::new_v4()).await;

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.created, 0);
    let quiz = store.quiz(id).unwrap();
    assert_eq!(quiz.title, "Renamed");
    assert_eq!(quiz.difficulty, Difficulty::Hard);
    assert_ne!(quiz.content_hash, "stale");
}

#[tokio::test]
async fn published_quiz_with_content_change_enters_review_with_metadata_cleared() {
    let store = MemoryStore::new();
    let id = DbId::new_v4();
    let mut existing = persisted_quiz(id, DbId::new_v4(), None);
    existing.status = QuizStatus::Published;
    existing.reviewed_at = Some(chrono::Utc::now());
    existing.reviewed_by = Some(DbId::new_v4());
    store.seed_quiz(existing);
    let options = ImportOptions::with_strategy(ImportStrategy::UpsertById);
    let raw = payload(json!([{"id": id, "title": "Changed title"}]));

    run(&store, false, &options, &raw, DbId::new_v4()).await;

    let quiz = store.quiz(id).unwrap();
    assert_eq!(quiz.status, QuizStatus::PendingReview);
    assert!(quiz.reviewed_at.is_none());
    assert!(quiz.reviewed_by.is_none());
    assert!(quiz.rejection_reason.is_none());
}

#[tokio::test]
async fn published_quiz_with_unchanged_content_stays_published() {
    let store = MemoryStore::new();
    let id = DbId::new_v4();
    let options = ImportOptions::with_strategy(ImportStrategy::UpsertById);
    let raw = payload(json!([{"id": id, "title": "Stable", "difficulty": "EASY"}]));
    let actor = DbId::new_v4();

    // First pass creates and records the content hash.
    run(&store, false, &options, &raw, actor).await;
    store.update_quiz(id, |quiz| {
        quiz.status = QuizStatus::Published;
        quiz.reviewed_by = Some(DbId::new_v4());
    });

    // Identical payload merges without a content change.
    let summary = run(&store, false, &options, &raw, actor).await;

    assert_eq!(summary.updated, 1);
    let quiz = store.quiz(id).unwrap();
    assert_eq!(quiz.status, QuizStatus::Published);
    assert!(quiz.reviewed_by.is_some());
}

#[tokio::test]
async fn pending_review_quiz_drops_to_draft_even_without_content_change() {
    let store = MemoryStore::new();
    let id = DbId::new_v4();
    let options = ImportOptions::with_strategy(ImportStrategy::UpsertById);
    let raw = payload(json!([{"id": id, "title": "Stable"}]));
    let actor = DbId::new_v4();

    run(&store, false, &options, &raw, actor).await;
    store.update_quiz(id, |quiz| quiz.status = QuizStatus::PendingReview);

    run(&store, false, &options, &raw, actor).await;

    assert_eq!(store.quiz(id).unwrap().status, QuizStatus::Draft);
}

#[tokio::test]
async fn absent_questions_preserve_the_persisted_set_and_empty_list_clears_it() {
    let store = MemoryStore::new();
    let id = DbId::new_v4();
    let options = ImportOptions::with_strategy(ImportStrategy::UpsertById);
    let actor = DbId::new_v4();
    let with_question = payload(json!([{
        "id": id,
        "title": "Quiz",
        "questions": [{"type": "OPEN", "text": "Why?", "content": {"answer": "Because"}}],
    }]));
    run(&store, false, &options, &with_question, actor).await;
    assert_eq!(store.quiz(id).unwrap().questions.len(), 1);

    // No questions key at all: the persisted set is untouched.
    let without_key = payload(json!([{"id": id, "title": "Quiz"}]));
    run(&store, false, &options, &without_key, actor).await;
    assert_eq!(store.quiz(id).unwrap().questions.len(), 1);

    // An explicit empty list replaces wholesale.
    let empty_list = payload(json!([{"id": id, "title": "Quiz", "questions": []}]));
    run(&store, false, &options, &empty_list, actor).await;
    assert!(store.quiz(id).unwrap().questions.is_empty());
}

// ── Hash strategies ─────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_by_content_hash_creates_then_matches_the_same_payload() {
    let store = MemoryStore::new();
    let options = ImportOptions::with_strategy(ImportStrategy::UpsertByContentHash);
    let raw = payload(json!([{"title": "Hashed", "tagNames": ["rust"]}]));
    let actor = DbId::new_v4();

    let first = run(&store, false, &options, &raw, actor).await;
    let second = run(&store, false, &options, &raw, actor).await;

    assert_eq!(first.created, 1);
    assert_eq!(second.updated, 1);
    assert_eq!(second.created, 0);
    let quizzes = store.quizzes();
    assert_eq!(quizzes.len(), 1);
    assert!(quizzes[0].import_content_hash.is_some());
}

#[tokio::test]
async fn content_hash_matching_is_scoped_per_creator() {
    let store = MemoryStore::new();
    let options = ImportOptions::with_strategy(ImportStrategy::UpsertByContentHash);
    let raw = payload(json!([{"title": "Shared content"}]));

    run(&store, false, &options, &raw, DbId::new_v4()).await;
    let summary = run(&store, false, &options, &raw, DbId::new_v4()).await;

    assert_eq!(summary.created, 1);
    assert_eq!(store.quizzes().len(), 2);
}

#[tokio::test]
async fn skip_on_duplicate_by_id_skips_without_any_hash_lookup() {
    let store = MemoryStore::new();
    let id = DbId::new_v4();
    store.seed_quiz(persisted_quiz(id, DbId::new_v4(), None));
    let options = ImportOptions::with_strategy(ImportStrategy::SkipOnDuplicate);
    let raw = payload(json!([{"id": id, "title": "Duplicate"}]));

    let summary = run(&store, false, &options, &raw, DbId::new_v4()).await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(store.state.lock().unwrap().import_hash_lookups, 0);
    assert_eq!(store.quizzes().len(), 1);
}

#[tokio::test]
async fn skip_on_duplicate_by_hash_skips_a_previously_hashed_payload() {
    let store = MemoryStore::new();
    let raw = payload(json!([{"title": "Once only"}]));
    let actor = DbId::new_v4();

    // The content-hash strategy stamps the import hash on create.
    let hash_options = ImportOptions::with_strategy(ImportStrategy::UpsertByContentHash);
    let first = run(&store, false, &hash_options, &raw, actor).await;

    let skip_options = ImportOptions::with_strategy(ImportStrategy::SkipOnDuplicate);
    let second = run(&store, false, &skip_options, &raw, actor).await;

    assert_eq!(first.created, 1);
    assert_eq!(second.skipped, 1);
    assert_eq!(store.quizzes().len(), 1);
}

#[tokio::test]
async fn skip_on_duplicate_creates_leave_the_import_hash_unset() {
    let store = MemoryStore::new();
    let options = ImportOptions::with_strategy(ImportStrategy::SkipOnDuplicate);
    let raw = payload(json!([{"title": "Fresh"}]));

    let summary = run(&store, false, &options, &raw, DbId::new_v4()).await;

    assert_eq!(summary.created, 1);
    assert!(store.quizzes()[0].import_content_hash.is_none());
}

#[tokio::test]
async fn skip_on_duplicate_fails_an_unresolvable_record_even_when_its_hash_matches() {
    let store = MemoryStore::new();
    let actor = DbId::new_v4();
    let record: quizmill_core::ImportRecord =
        serde_json::from_value(json!({"title": "Dup", "tagNames": ["ghost"]})).unwrap();
    let hash = quizmill_core::hashing::record_import_hash(&record);
    store.seed_quiz(persisted_quiz(DbId::new_v4(), actor, Some(hash)));
    let mut options = ImportOptions::with_strategy(ImportStrategy::SkipOnDuplicate);
    options.auto_create_tags = false;
    let raw = payload(json!([{"title": "Dup", "tagNames": ["ghost"]}]));

    let summary = run(&store, false, &options, &raw, actor).await;

    // References resolve before the hash branch, so the bad tag fails
    // the record instead of letting the hash match hide it.
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failed, 1);
    assert!(summary.errors[0].message.contains("ghost"));
}

// ── Dry run, failure isolation, run-fatal conditions ────────────────────

#[tokio::test]
async fn dry_run_validates_fully_but_mutates_nothing() {
    let store = MemoryStore::new();
    let mut options = ImportOptions::with_strategy(ImportStrategy::CreateOnly);
    options.dry_run = true;
    let raw = payload(json!([{
        "title": "Ephemeral",
        "categoryName": "Brand New",
        "tagNames": ["fresh-tag"],
    }]));

    let summary = run(&store, false, &options, &raw, DbId::new_v4()).await;

    assert_eq!(summary.total, 1);
    assert_eq!(summary.created, 0);
    assert_eq!(summary.failed, 0);
    let state = store.state.lock().unwrap();
    assert_eq!(state.save_calls, 0);
    assert_eq!(state.begun, 0);
    assert_eq!(state.categories.len(), 1);
    assert!(state.tags.is_empty());
    assert!(state.quizzes.is_empty());
}

#[tokio::test]
async fn dry_run_still_reports_per_record_failures() {
    let store = MemoryStore::new();
    let mut options = ImportOptions::with_strategy(ImportStrategy::CreateOnly);
    options.dry_run = true;
    options.auto_create_tags = false;
    let raw = payload(json!([
        {"title": "Fine"},
        {"title": "Broken", "tagNames": ["no-such-tag"]},
    ]));

    let summary = run(&store, false, &options, &raw, DbId::new_v4()).await;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors[0].index, 1);
    assert!(summary.errors[0].message.contains("no-such-tag"));
}

#[tokio::test]
async fn one_bad_record_does_not_stop_the_rest() {
    let store = MemoryStore::new();
    let mut options = ImportOptions::with_strategy(ImportStrategy::CreateOnly);
    options.auto_create_category = false;
    let raw = payload(json!([
        {"title": "Good"},
        {"title": "Bad", "categoryName": "missing"},
    ]));

    let summary = run(&store, false, &options, &raw, DbId::new_v4()).await;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors[0].index, 1);
    assert!(summary.errors[0].message.contains("missing"));
    assert_eq!(store.quizzes().len(), 1);
}

#[tokio::test]
async fn failed_record_rolls_back_its_own_writes() {
    let store = MemoryStore::new();
    store.state.lock().unwrap().fail_saves = 1;
    let options = ImportOptions::with_strategy(ImportStrategy::CreateOnly);
    let raw = payload(json!([{"title": "Doomed", "tagNames": ["side-effect"]}]));

    let summary = run(&store, false, &options, &raw, DbId::new_v4()).await;

    assert_eq!(summary.failed, 1);
    let state = store.state.lock().unwrap();
    assert_eq!(state.rolled_back, 1);
    assert!(state.quizzes.is_empty());
    // The tag created while processing the doomed record is gone too.
    assert!(state.tags.is_empty());
}

#[tokio::test]
async fn rolled_back_tag_is_recreated_for_a_later_record() {
    let store = MemoryStore::new();
    store.state.lock().unwrap().fail_saves = 1;
    let options = ImportOptions::with_strategy(ImportStrategy::CreateOnly);
    let raw = payload(json!([
        {"title": "Doomed", "tagNames": ["shared"]},
        {"title": "Survivor", "tagNames": ["shared"]},
    ]));

    let summary = run(&store, false, &options, &raw, DbId::new_v4()).await;

    assert_eq!(summary.created, 1);
    assert_eq!(summary.failed, 1);
    let state = store.state.lock().unwrap();
    let quiz = state.quizzes.values().next().unwrap();
    assert_eq!(quiz.title, "Survivor");
    // The first record's rollback discarded its tag row; the survivor
    // must point at the row that actually exists.
    assert_eq!(state.tags.len(), 1);
    assert_eq!(quiz.tags[0].id, state.tags[0].id);
}

#[tokio::test]
async fn item_cap_aborts_the_whole_run() {
    let store = MemoryStore::new();
    let mut options = ImportOptions::with_strategy(ImportStrategy::CreateOnly);
    options.max_items = 1;
    let raw = payload(json!([{"title": "A"}, {"title": "B"}]));

    let mut service = ImportService::new(store.clone(), Caps { moderator: false });
    let err = service
        .import(&raw, ImportFormat::Json, &options, DbId::new_v4())
        .await
        .unwrap_err();

    assert_matches!(err, ImportError::LimitExceeded { max: 1, found: 2 });
    assert!(store.quizzes().is_empty());
}

#[tokio::test]
async fn invalid_options_are_rejected_up_front() {
    let store = MemoryStore::new();
    let mut options = ImportOptions::with_strategy(ImportStrategy::CreateOnly);
    options.max_items = 0;

    let mut service = ImportService::new(store, Caps { moderator: false });
    let err = service
        .import(b"{}", ImportFormat::Json, &options, DbId::new_v4())
        .await
        .unwrap_err();

    assert_matches!(err, ImportError::Validation(_));
}
