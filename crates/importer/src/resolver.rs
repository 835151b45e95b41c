//! Run-scoped resolution of category and tag names to persisted references.
//!
//! Names match case-insensitively. Successful resolutions memoize in a
//! per-run cache keyed by normalized name; the engine resets the cache at
//! the start of every run so nothing leaks across runs.
//!
//! Auto-creation tolerates one lost race: if a create hits a uniqueness
//! conflict, the lookup is retried exactly once, and only a miss on that
//! retry surfaces as a conflict.

use std::collections::HashMap;

use tracing::debug;

use quizmill_core::catalog::{CategoryRef, TagRef};
use quizmill_core::types::DbId;
use quizmill_core::ImportError;

use crate::store::{CatalogStore, StoreError};

/// Normalized lookup key for a reference name.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One retry after a lost uniqueness race. The racing writer must have
/// committed the row; if it is still absent, the conflict stands.
fn found_on_retry<T>(found: Option<T>, kind: &str, name: &str) -> Result<T, ImportError> {
    found.ok_or_else(|| {
        ImportError::Conflict(format!(
            "{kind} '{name}' hit a uniqueness conflict and was not found on retry"
        ))
    })
}

/// Caches resolved references for the duration of one import run.
///
/// References auto-created while a record is processed are only durable
/// once that record's transaction commits; the engine brackets each
/// record with [`Self::begin_record`] and calls
/// [`Self::discard_record_creations`] after a rollback so the cache
/// never serves a reference whose row was discarded.
#[derive(Debug, Default)]
pub struct ReferenceResolver {
    categories: HashMap<String, CategoryRef>,
    tags: HashMap<String, TagRef>,
    record_categories: Vec<String>,
    record_tags: Vec<String>,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every memoized reference. Called between runs.
    pub fn reset(&mut self) {
        self.categories.clear();
        self.tags.clear();
        self.record_categories.clear();
        self.record_tags.clear();
    }

    /// Start tracking creations for one record's unit of work.
    pub fn begin_record(&mut self) {
        self.record_categories.clear();
        self.record_tags.clear();
    }

    /// Evict references created since [`Self::begin_record`]. Entries that
    /// were merely looked up (or created by a racing external writer) are
    /// committed rows and stay cached.
    pub fn discard_record_creations(&mut self) {
        for key in self.record_categories.drain(..) {
            self.categories.remove(&key);
        }
        for key in self.record_tags.drain(..) {
            self.tags.remove(&key);
        }
    }

    /// Resolve an optional category name. Blank or absent names yield
    /// `None`; the engine applies the default-category fallback.
    pub async fn resolve_category<S: CatalogStore>(
        &mut self,
        store: &mut S,
        name: Option<&str>,
        auto_create: bool,
        dry_run: bool,
    ) -> Result<Option<CategoryRef>, ImportError> {
        let Some(name) = name else {
            return Ok(None);
        };
        let display_name = name.trim();
        if display_name.is_empty() {
            return Ok(None);
        }
        let key = normalize_name(display_name);

        if let Some(cached) = self.categories.get(&key) {
            return Ok(Some(cached.clone()));
        }
        if let Some(found) = store.find_category_by_name(&key).await? {
            self.categories.insert(key, found.clone());
            return Ok(Some(found));
        }
        if !auto_create {
            return Err(ImportError::NotFound(format!(
                "category '{display_name}' does not exist"
            )));
        }
        if dry_run {
            // Fabricate an uncommitted reference so validation proceeds
            // without any observable write.
            let fabricated = CategoryRef {
                id: DbId::new_v4(),
                name: display_name.to_string(),
            };
            self.categories.insert(key, fabricated.clone());
            return Ok(Some(fabricated));
        }

        let created = match store.create_category(display_name).await {
            Ok(created) => {
                self.record_categories.push(key.clone());
                created
            }
            Err(StoreError::UniqueViolation(_)) => {
                debug!(
                    category = display_name,
                    "lost creation race, retrying lookup"
                );
                found_on_retry(
                    store.find_category_by_name(&key).await?,
                    "category",
                    display_name,
                )?
            }
            Err(e) => return Err(e.into()),
        };
        self.categories.insert(key, created.clone());
        Ok(Some(created))
    }

    /// Resolve a tag name list in input order, deduplicated by normalized
    /// name. An empty list performs no store access. With auto-creation
    /// off, all misses are reported in a single failure.
    pub async fn resolve_tags<S: CatalogStore>(
        &mut self,
        store: &mut S,
        names: &[String],
        auto_create: bool,
        dry_run: bool,
    ) -> Result<Vec<TagRef>, ImportError> {
        let mut ordered_keys: Vec<(String, String)> = Vec::new();
        for name in names {
            let display_name = name.trim();
            if display_name.is_empty() {
                continue;
            }
            let key = normalize_name(display_name);
            if !ordered_keys.iter().any(|(k, _)| *k == key) {
                ordered_keys.push((key, display_name.to_string()));
            }
        }
        if ordered_keys.is_empty() {
            return Ok(Vec::new());
        }

        let uncached: Vec<String> = ordered_keys
            .iter()
            .filter(|(key, _)| !self.tags.contains_key(key))
            .map(|(key, _)| key.clone())
            .collect();
        if !uncached.is_empty() {
            for found in store.find_tags_by_names(&uncached).await? {
                self.tags.insert(normalize_name(&found.name), found);
            }
        }

        let missing: Vec<(String, String)> = ordered_keys
            .iter()
            .filter(|(key, _)| !self.tags.contains_key(key))
            .cloned()
            .collect();

        if !missing.is_empty() && !auto_create {
            let names: Vec<&str> = missing
                .iter()
                .map(|(_, display_name)| display_name.as_str())
                .collect();
            return Err(ImportError::NotFound(format!(
                "tags do not exist: {}",
                names.join(", ")
            )));
        }

        for (key, display_name) in missing {
            let tag = if dry_run {
                TagRef {
                    id: DbId::new_v4(),
                    name: display_name.clone(),
                }
            } else {
                match store.create_tag(&display_name).await {
                    Ok(created) => {
                        self.record_tags.push(key.clone());
                        created
                    }
                    Err(StoreError::UniqueViolation(_)) => {
                        debug!(tag = %display_name, "lost creation race, retrying lookup");
                        let retried = store
                            .find_tags_by_names(std::slice::from_ref(&key))
                            .await?
                            .into_iter()
                            .next();
                        found_on_retry(retried, "tag", &display_name)?
                    }
                    Err(e) => return Err(e.into()),
                }
            };
            self.tags.insert(key, tag);
        }

        Ok(ordered_keys
            .iter()
            .filter_map(|(key, _)| self.tags.get(key).cloned())
            .collect())
    }
}
