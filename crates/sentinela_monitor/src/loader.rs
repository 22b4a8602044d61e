//! `MonitorLoader` (`spec.md` §4.6): validate and register user code. The
//! actual compilation/sandboxing of `code` is the out-of-scope collaborator
//! (`spec.md` §1); what's implemented here is the contract surface the core
//! consumes: structural validation good enough to reject obviously-broken
//! submissions, persistence of the `CodeModule` row, and the periodic
//! "pick up updated CodeModules" procedure (`get_updated_code_modules`).

use crate::validation::MonitorValidationError;
use chrono::{DateTime, Utc};
use sentinela_core::models::{CodeModule, Monitor, MonitorId};
use sentinela_core::SentinelaResult;
use sentinela_store::Store;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Validate `code` without registering it. Fails with
/// `MonitorValidationError` when the submission is missing a required
/// symbol or is otherwise structurally broken.
pub fn check_monitor(code: &str) -> Result<(), MonitorValidationError> {
    if code.trim().is_empty() {
        return Err(MonitorValidationError::single(
            "code",
            "value_error.missing",
            "monitor code must not be empty",
        ));
    }

    if !code.contains("search") {
        return Err(MonitorValidationError::single(
            "code",
            "value_error.missing_symbol",
            "monitor code must define a 'search' operation",
        ));
    }

    Ok(())
}

/// Persist/update the `CodeModule` for `name`, creating the `Monitor` row
/// if it doesn't exist yet. Returns the `Monitor`. Runs `check_monitor`
/// first so an invalid submission never reaches the Store.
pub async fn register_monitor(
    store: &dyn Store,
    name: &str,
    code: &str,
    additional_files: BTreeMap<String, String>,
) -> Result<Monitor, RegisterError> {
    check_monitor(code)?;

    let monitor = match store.get_monitor_by_name(name).await? {
        Some(monitor) => monitor,
        None => store.create_monitor(name).await?,
    };

    store
        .save_code_module(CodeModule {
            monitor_id: monitor.id,
            code: code.to_string(),
            additional_files,
            registered_at: Utc::now(),
        })
        .await?;

    Ok(monitor)
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error(transparent)]
    Validation(#[from] MonitorValidationError),
    #[error(transparent)]
    Store(#[from] sentinela_core::SentinelaError),
}

/// Periodic loader (`monitors_load_schedule`): pick up `CodeModule`s whose
/// `registered_at` is newer than `reference` among `monitor_ids`. The
/// in-process `MonitorRegistry` is decoupled from stored source (see
/// `registry.rs`), so this only reports which monitors changed — an
/// operator (or a real scripting/Wasm loader) decides what to do with that.
pub async fn get_updated_code_modules(
    store: &dyn Store,
    monitor_ids: &[MonitorId],
    reference: DateTime<Utc>,
) -> SentinelaResult<Vec<CodeModule>> {
    store.get_updated_code_modules(monitor_ids, reference).await
}

/// Long-lived task: on each tick, logs which monitors have a newer
/// `CodeModule` than the last check.
pub async fn run(store: Arc<dyn Store>, tick: std::time::Duration, shutdown: impl std::future::Future<Output = ()>) {
    let mut last_checked = Utc::now();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(tick) => {
                let now = Utc::now();
                match store.list_monitors().await {
                    Ok(monitors) => {
                        let ids: Vec<MonitorId> = monitors.iter().map(|m| m.id).collect();
                        match get_updated_code_modules(store.as_ref(), &ids, last_checked).await {
                            Ok(updated) if !updated.is_empty() => {
                                tracing::info!(count = updated.len(), "updated code modules detected");
                            }
                            Ok(_) => {}
                            Err(error) => tracing::warn!(%error, "failed to check for updated code modules"),
                        }
                    }
                    Err(error) => tracing::warn!(%error, "failed to list monitors for the loader tick"),
                }
                last_checked = now;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinela_store::memory::InMemoryStore;

    #[test]
    fn rejects_empty_code() {
        assert!(check_monitor("").is_err());
    }

    #[test]
    fn rejects_code_missing_search() {
        assert!(check_monitor("def update(data): return data").is_err());
    }

    #[test]
    fn accepts_code_with_search() {
        assert!(check_monitor("def search(): return []").is_ok());
    }

    #[tokio::test]
    async fn register_then_get_round_trips_code_and_files() {
        let store = InMemoryStore::new();
        let mut files = BTreeMap::new();
        files.insert("helper.sql".to_string(), "select 1".to_string());

        let monitor = register_monitor(&store, "m1", "def search(): return []", files.clone())
            .await
            .unwrap();

        let module = store.get_code_module(monitor.id).await.unwrap().unwrap();
        assert_eq!(module.code, "def search(): return []");
        assert_eq!(module.additional_files, files);
    }

    #[tokio::test]
    async fn register_invalid_code_never_reaches_store() {
        let store = InMemoryStore::new();
        let err = register_monitor(&store, "m1", "", BTreeMap::new()).await;
        assert!(err.is_err());
        assert!(store.get_monitor_by_name("m1").await.unwrap().is_none());
    }
}
