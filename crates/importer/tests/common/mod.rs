//! In-memory fakes for the storage and capability contracts.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use quizmill_core::catalog::{CategoryRef, Quiz, TagRef};
use quizmill_core::types::DbId;
use quizmill_importer::store::{CapabilityProbe, CatalogStore, StoreError};

/// How the next `create_category` / `create_tag` call misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictMode {
    /// The racing writer committed first, so the retry lookup succeeds.
    InsertThenConflict,
    /// The conflict persists and the retry lookup misses.
    ConflictOnly,
}

type CatalogSnapshot = (HashMap<DbId, Quiz>, Vec<CategoryRef>, Vec<TagRef>);

#[derive(Debug, Default)]
pub struct State {
    pub quizzes: HashMap<DbId, Quiz>,
    pub categories: Vec<CategoryRef>,
    pub tags: Vec<TagRef>,
    pub default_category: Option<CategoryRef>,

    pub category_conflict: Option<ConflictMode>,
    pub tag_conflict: Option<ConflictMode>,
    /// Number of upcoming `save_quiz` calls that fail.
    pub fail_saves: usize,

    pub save_calls: usize,
    pub import_hash_lookups: usize,
    pub category_lookups: usize,
    pub tag_lookups: usize,
    pub begun: usize,
    pub committed: usize,
    pub rolled_back: usize,

    snapshot: Option<CatalogSnapshot>,
}

/// Clonable handle over shared state, so a test can keep inspecting the
/// catalog after handing a clone to the service.
#[derive(Clone)]
pub struct MemoryStore {
    pub state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// A store with the seeded `general` default category and nothing else.
    pub fn new() -> Self {
        let general = CategoryRef {
            id: DbId::new_v4(),
            name: "general".to_string(),
        };
        let mut state = State::default();
        state.categories.push(general.clone());
        state.default_category = Some(general);
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn seed_quiz(&self, quiz: Quiz) {
        self.state.lock().unwrap().quizzes.insert(quiz.id, quiz);
    }

    pub fn seed_category(&self, name: &str) -> CategoryRef {
        let category = CategoryRef {
            id: DbId::new_v4(),
            name: name.to_string(),
        };
        self.state.lock().unwrap().categories.push(category.clone());
        category
    }

    pub fn seed_tag(&self, name: &str) -> TagRef {
        let tag = TagRef {
            id: DbId::new_v4(),
            name: name.to_string(),
        };
        self.state.lock().unwrap().tags.push(tag.clone());
        tag
    }

    pub fn quizzes(&self) -> Vec<Quiz> {
        self.state.lock().unwrap().quizzes.values().cloned().collect()
    }

    pub fn quiz(&self, id: DbId) -> Option<Quiz> {
        self.state.lock().unwrap().quizzes.get(&id).cloned()
    }

    pub fn update_quiz(&self, id: DbId, mutate: impl FnOnce(&mut Quiz)) {
        let mut state = self.state.lock().unwrap();
        if let Some(quiz) = state.quizzes.get_mut(&id) {
            mutate(quiz);
        }
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn begin(&mut self) -> Result<(), StoreError> {
        let mut s = self.state.lock().unwrap();
        s.begun += 1;
        s.snapshot = Some((s.quizzes.clone(), s.categories.clone(), s.tags.clone()));
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let mut s = self.state.lock().unwrap();
        s.committed += 1;
        s.snapshot = None;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        let mut s = self.state.lock().unwrap();
        s.rolled_back += 1;
        if let Some((quizzes, categories, tags)) = s.snapshot.take() {
            s.quizzes = quizzes;
            s.categories = categories;
            s.tags = tags;
        }
        Ok(())
    }

    async fn find_quiz_by_id(&mut self, id: DbId) -> Result<Option<Quiz>, StoreError> {
        Ok(self.state.lock().unwrap().quizzes.get(&id).cloned())
    }

    async fn find_quiz_by_import_hash(
        &mut self,
        creator_id: DbId,
        hash: &str,
    ) -> Result<Option<Quiz>, StoreError> {
        let mut s = self.state.lock().unwrap();
        s.import_hash_lookups += 1;
        Ok(s.quizzes
            .values()
            .find(|q| {
                q.creator_id == creator_id && q.import_content_hash.as_deref() == Some(hash)
            })
            .cloned())
    }

    async fn quiz_exists(&mut self, id: DbId) -> Result<bool, StoreError> {
        Ok(self.state.lock().unwrap().quizzes.contains_key(&id))
    }

    async fn save_quiz(&mut self, quiz: &Quiz) -> Result<(), StoreError> {
        let mut s = self.state.lock().unwrap();
        s.save_calls += 1;
        if s.fail_saves > 0 {
            s.fail_saves -= 1;
            return Err(StoreError::Backend("save failed".to_string()));
        }
        s.quizzes.insert(quiz.id, quiz.clone());
        Ok(())
    }

    async fn find_category_by_name(
        &mut self,
        normalized: &str,
    ) -> Result<Option<CategoryRef>, StoreError> {
        let mut s = self.state.lock().unwrap();
        s.category_lookups += 1;
        Ok(s.categories
            .iter()
            .find(|c| c.name.to_lowercase() == normalized)
            .cloned())
    }

    async fn create_category(&mut self, name: &str) -> Result<CategoryRef, StoreError> {
        let mut s = self.state.lock().unwrap();
        let category = CategoryRef {
            id: DbId::new_v4(),
            name: name.to_string(),
        };
        match s.category_conflict.take() {
            Some(ConflictMode::InsertThenConflict) => {
                s.categories.push(category);
                Err(StoreError::UniqueViolation(format!("category '{name}'")))
            }
            Some(ConflictMode::ConflictOnly) => {
                Err(StoreError::UniqueViolation(format!("category '{name}'")))
            }
            None => {
                s.categories.push(category.clone());
                Ok(category)
            }
        }
    }

    async fn default_category(&mut self) -> Result<CategoryRef, StoreError> {
        self.state
            .lock()
            .unwrap()
            .default_category
            .clone()
            .ok_or_else(|| StoreError::Backend("no default category".to_string()))
    }

    async fn find_tags_by_names(
        &mut self,
        normalized: &[String],
    ) -> Result<Vec<TagRef>, StoreError> {
        let mut s = self.state.lock().unwrap();
        s.tag_lookups += 1;
        Ok(s.tags
            .iter()
            .filter(|t| normalized.iter().any(|n| t.name.to_lowercase() == *n))
            .cloned()
            .collect())
    }

    async fn create_tag(&mut self, name: &str) -> Result<TagRef, StoreError> {
        let mut s = self.state.lock().unwrap();
        let tag = TagRef {
            id: DbId::new_v4(),
            name: name.to_string(),
        };
        match s.tag_conflict.take() {
            Some(ConflictMode::InsertThenConflict) => {
                s.tags.push(tag);
                Err(StoreError::UniqueViolation(format!("tag '{name}'")))
            }
            Some(ConflictMode::ConflictOnly) => {
                Err(StoreError::UniqueViolation(format!("tag '{name}'")))
            }
            None => {
                s.tags.push(tag.clone());
                Ok(tag)
            }
        }
    }
}

/// Capability fake with a fixed answer.
pub struct Caps {
    pub moderator: bool,
}

#[async_trait]
impl CapabilityProbe for Caps {
    async fn has_moderation_capability(&self, _actor_id: DbId) -> Result<bool, StoreError> {
        Ok(self.moderator)
    }
}
