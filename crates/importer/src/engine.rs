//! The reconciliation engine: one record at a time, one strategy per run.
//!
//! `ImportService::import` parses the payload, then walks the records
//! strictly sequentially. Parse-time failures abort the whole run; every
//! later failure is caught at the record boundary, recorded in the
//! summary, and the loop continues. Outside dry-run each record runs in
//! its own transaction.

use tracing::{debug, info, warn};

use quizmill_core::catalog::{CategoryRef, Quiz, QuizQuestion, QuizStatus, TagRef};
use quizmill_core::record::QuestionRecord;
use quizmill_core::types::DbId;
use quizmill_core::{
    document, hashing, review, tabular, ImportError, ImportFormat, ImportOptions, ImportRecord,
    ImportStrategy, ImportSummary, RecordOutcome, SummaryBuilder,
};

use crate::resolver::ReferenceResolver;
use crate::store::{CapabilityProbe, CatalogStore};

struct ResolvedRefs {
    category: CategoryRef,
    tags: Vec<TagRef>,
}

/// Drives imports against a [`CatalogStore`] and a [`CapabilityProbe`].
pub struct ImportService<S, C> {
    store: S,
    caps: C,
    resolver: ReferenceResolver,
}

impl<S: CatalogStore, C: CapabilityProbe> ImportService<S, C> {
    pub fn new(store: S, caps: C) -> Self {
        Self {
            store,
            caps,
            resolver: ReferenceResolver::new(),
        }
    }

    /// Run one import. Returns `Err` only for run-fatal conditions
    /// (undecodable payload, item cap, invalid options); everything else
    /// lands in the summary.
    pub async fn import(
        &mut self,
        raw: &[u8],
        format: ImportFormat,
        options: &ImportOptions,
        actor_id: DbId,
    ) -> Result<ImportSummary, ImportError> {
        options.validate().map_err(ImportError::Validation)?;

        let records = match format {
            ImportFormat::Xlsx => tabular::parse_workbook(raw, options.max_items)?,
            ImportFormat::Json => document::parse_document(raw, options.max_items)?,
        };

        info!(
            total = records.len(),
            format = %format,
            strategy = %options.strategy,
            dry_run = options.dry_run,
            "starting import run"
        );

        self.resolver.reset();
        let total = records.len();
        let mut summary = SummaryBuilder::new(options.dry_run);

        for (index, record) in records.iter().enumerate() {
            match self.process_record(record, options, actor_id).await {
                Ok(outcome) => {
                    debug!(index, outcome = %outcome, title = %record.title, "record reconciled");
                    summary.record(outcome);
                }
                Err(e) => {
                    warn!(index, error = %e, title = %record.title, "record failed");
                    summary.record_failure(index, e.to_string());
                }
            }
        }

        Ok(summary.finish(total))
    }

    /// One record inside its own unit of work. Dry-run opens no
    /// transaction at all.
    async fn process_record(
        &mut self,
        record: &ImportRecord,
        options: &ImportOptions,
        actor_id: DbId,
    ) -> Result<RecordOutcome, ImportError> {
        if options.dry_run {
            return self.reconcile(record, options, actor_id).await;
        }

        self.store.begin().await?;
        self.resolver.begin_record();
        match self.reconcile(record, options, actor_id).await {
            Ok(outcome) => match self.store.commit().await {
                Ok(()) => Ok(outcome),
                Err(e) => {
                    self.resolver.discard_record_creations();
                    Err(e.into())
                }
            },
            Err(e) => {
                // The record's own error is what the summary reports.
                if let Err(rollback_err) = self.store.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                // References created inside the discarded transaction must
                // not be served to later records.
                self.resolver.discard_record_creations();
                Err(e)
            }
        }
    }

    async fn reconcile(
        &mut self,
        record: &ImportRecord,
        options: &ImportOptions,
        actor_id: DbId,
    ) -> Result<RecordOutcome, ImportError> {
        match options.strategy {
            ImportStrategy::CreateOnly => {
                let refs = self.resolve_references(record, options).await?;
                self.create_quiz(record, refs, None, None, options, actor_id)
                    .await?;
                Ok(RecordOutcome::Created)
            }
            ImportStrategy::UpsertById => {
                let id = record.id.ok_or_else(|| {
                    ImportError::Validation("UPSERT_BY_ID requires quiz id".to_string())
                })?;
                let refs = self.resolve_references(record, options).await?;
                match self.store.find_quiz_by_id(id).await? {
                    Some(existing) => {
                        self.merge_quiz(existing, record, refs, options).await?;
                        Ok(RecordOutcome::Updated)
                    }
                    None => {
                        self.create_quiz(record, refs, Some(id), None, options, actor_id)
                            .await?;
                        Ok(RecordOutcome::Created)
                    }
                }
            }
            ImportStrategy::UpsertByContentHash => {
                let refs = self.resolve_references(record, options).await?;
                let hash = hashing::record_import_hash(record);
                match self.store.find_quiz_by_import_hash(actor_id, &hash).await? {
                    Some(existing) => {
                        self.merge_quiz(existing, record, refs, options).await?;
                        Ok(RecordOutcome::Updated)
                    }
                    None => {
                        self.create_quiz(record, refs, None, Some(hash), options, actor_id)
                            .await?;
                        Ok(RecordOutcome::Created)
                    }
                }
            }
            ImportStrategy::SkipOnDuplicate => {
                // The id check settles before anything else, so an
                // id-matched duplicate computes no hash and resolves no
                // references.
                if let Some(id) = record.id {
                    if self.store.quiz_exists(id).await? {
                        return Ok(RecordOutcome::Skipped);
                    }
                }
                let refs = self.resolve_references(record, options).await?;
                let hash = hashing::record_import_hash(record);
                if self
                    .store
                    .find_quiz_by_import_hash(actor_id, &hash)
                    .await?
                    .is_some()
                {
                    return Ok(RecordOutcome::Skipped);
                }
                // Only the content-hash strategy stamps the import hash.
                self.create_quiz(record, refs, None, None, options, actor_id)
                    .await?;
                Ok(RecordOutcome::Created)
            }
        }
    }

    async fn resolve_references(
        &mut self,
        record: &ImportRecord,
        options: &ImportOptions,
    ) -> Result<ResolvedRefs, ImportError> {
        let category = self
            .resolver
            .resolve_category(
                &mut self.store,
                record.category_name.as_deref(),
                options.auto_create_category,
                options.dry_run,
            )
            .await?;
        let category = match category {
            Some(category) => category,
            None => self.store.default_category().await?,
        };
        let tags = self
            .resolver
            .resolve_tags(
                &mut self.store,
                &record.tag_names,
                options.auto_create_tags,
                options.dry_run,
            )
            .await?;
        Ok(ResolvedRefs { category, tags })
    }

    async fn create_quiz(
        &mut self,
        record: &ImportRecord,
        refs: ResolvedRefs,
        supplied_id: Option<DbId>,
        import_hash: Option<String>,
        options: &ImportOptions,
        actor_id: DbId,
    ) -> Result<(), ImportError> {
        let moderator = self.caps.has_moderation_capability(actor_id).await?;
        let (visibility, status) = review::initial_state(record.visibility, moderator);

        let questions = record
            .questions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(to_quiz_question)
            .collect();

        let mut quiz = Quiz {
            id: supplied_id.unwrap_or_else(DbId::new_v4),
            creator_id: actor_id,
            category: refs.category,
            tags: refs.tags,
            title: record.title.clone(),
            description: record.description.clone(),
            visibility,
            difficulty: record.difficulty,
            estimated_time_minutes: record.estimated_time_minutes,
            questions,
            status,
            content_hash: String::new(),
            presentation_hash: String::new(),
            import_content_hash: import_hash,
            reviewed_at: None,
            reviewed_by: None,
            rejection_reason: None,
        };
        quiz.content_hash = hashing::quiz_content_hash(&quiz);
        quiz.presentation_hash = hashing::quiz_presentation_hash(&quiz);

        if !options.dry_run {
            self.store.save_quiz(&quiz).await?;
        }
        Ok(())
    }

    /// Overwrite mutable fields, replace questions only when the input
    /// carries a list, recompute hashes, and apply the review rules.
    async fn merge_quiz(
        &mut self,
        mut quiz: Quiz,
        record: &ImportRecord,
        refs: ResolvedRefs,
        options: &ImportOptions,
    ) -> Result<(), ImportError> {
        quiz.title = record.title.clone();
        quiz.description = record.description.clone();
        quiz.visibility = record.visibility;
        quiz.difficulty = record.difficulty;
        quiz.estimated_time_minutes = record.estimated_time_minutes;
        quiz.category = refs.category;
        quiz.tags = refs.tags;
        if let Some(questions) = record.questions.as_deref() {
            quiz.questions = questions.iter().map(to_quiz_question).collect();
        }

        let new_content_hash = hashing::quiz_content_hash(&quiz);
        let content_changed = new_content_hash != quiz.content_hash;
        quiz.content_hash = new_content_hash;
        quiz.presentation_hash = hashing::quiz_presentation_hash(&quiz);

        let next_status = review::status_after_merge(quiz.status, content_changed);
        if quiz.status == QuizStatus::Published && next_status == QuizStatus::PendingReview {
            quiz.clear_review_metadata();
        }
        quiz.status = next_status;

        if !options.dry_run {
            self.store.save_quiz(&quiz).await?;
        }
        Ok(())
    }
}

fn to_quiz_question(record: &QuestionRecord) -> QuizQuestion {
    QuizQuestion {
        id: record.id.unwrap_or_else(DbId::new_v4),
        question_type: record.question_type,
        difficulty: record.difficulty,
        text: record.text.clone(),
        hint: record.hint.clone(),
        explanation: record.explanation.clone(),
        attachment_url: record.attachment_url.clone(),
        content: record.content.clone(),
    }
}
