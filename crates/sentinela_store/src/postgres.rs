//! Thin Postgres-backed `Store` sketch, gated behind `postgres-store`.
//!
//! Grounded on the teacher's `DatabaseManager` connection-pool pattern
//! (`crates/aria_runtime/src/database/mod.rs`) and the original's migration
//! shapes (`examples/original_source/migrations/versions/*.py`,
//! `alembic/versions/*.py`). Per `spec.md` §1 the persistence layer is a
//! contract, not an implementation — this module exists to show what
//! satisfying the `Store` trait against a real database looks like, not to
//! be a complete migration runner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sentinela_core::errors::{ErrorCategory, ErrorKind, ErrorSeverity, SentinelaError};
use sentinela_core::models::*;
use sentinela_core::SentinelaResult;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PgStoreConfig {
    pub database_url: String,
    pub pool_size: u32,
    pub acquire_timeout: Duration,
    pub query_timeout: Duration,
}

pub struct PgStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgStore {
    pub async fn connect(config: PgStoreConfig) -> SentinelaResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await
            .map_err(|e| {
                SentinelaError::new(
                    ErrorKind::StoreUnavailable,
                    ErrorCategory::Store,
                    ErrorSeverity::Critical,
                    format!("failed to connect to database: {e}"),
                )
            })?;

        Ok(Self {
            pool,
            query_timeout: config.query_timeout,
        })
    }

    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, sqlx::Error>>,
    ) -> SentinelaResult<T> {
        tokio::time::timeout(self.query_timeout, fut)
            .await
            .map_err(|_| {
                SentinelaError::new(
                    ErrorKind::StoreUnavailable,
                    ErrorCategory::Store,
                    ErrorSeverity::Medium,
                    "database query timed out",
                )
            })?
            .map_err(|e| {
                SentinelaError::new(
                    ErrorKind::StoreUnavailable,
                    ErrorCategory::Store,
                    ErrorSeverity::Medium,
                    format!("database error: {e}"),
                )
            })
    }
}

#[async_trait]
impl crate::Store for PgStore {
    async fn get_monitor(&self, id: MonitorId) -> SentinelaResult<Option<Monitor>> {
        let row = self
            .with_timeout(
                sqlx::query_as::<_, MonitorRow>("select * from monitors where id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool),
            )
            .await?;
        Ok(row.map(Into::into))
    }

    async fn get_monitor_by_name(&self, name: &str) -> SentinelaResult<Option<Monitor>> {
        let row = self
            .with_timeout(
                sqlx::query_as::<_, MonitorRow>("select * from monitors where name = $1")
                    .bind(name)
                    .fetch_optional(&self.pool),
            )
            .await?;
        Ok(row.map(Into::into))
    }

    async fn list_monitors(&self) -> SentinelaResult<Vec<Monitor>> {
        let rows = self
            .with_timeout(sqlx::query_as::<_, MonitorRow>("select * from monitors").fetch_all(&self.pool))
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_monitor(&self, name: &str) -> SentinelaResult<Monitor> {
        let result = tokio::time::timeout(
            self.query_timeout,
            sqlx::query_as::<_, MonitorRow>(
                "insert into monitors (name, enabled, queued, running) values ($1, true, false, false) returning *",
            )
            .bind(name)
            .fetch_one(&self.pool),
        )
        .await
        .map_err(|_| {
            SentinelaError::new(
                ErrorKind::StoreUnavailable,
                ErrorCategory::Store,
                ErrorSeverity::Medium,
                "database query timed out",
            )
        })?;

        match result {
            Ok(row) => Ok(row.into()),
            Err(e) if e.as_database_error().map(|d| d.is_unique_violation()).unwrap_or(false) => {
                Err(SentinelaError::new(
                    ErrorKind::UniqueViolation,
                    ErrorCategory::Store,
                    ErrorSeverity::Low,
                    format!("monitor name '{name}' already registered"),
                ))
            }
            Err(e) => Err(SentinelaError::new(
                ErrorKind::StoreUnavailable,
                ErrorCategory::Store,
                ErrorSeverity::Medium,
                format!("database error: {e}"),
            )),
        }
    }

    async fn save_monitor(&self, monitor: &Monitor) -> SentinelaResult<()> {
        self.with_timeout(
            sqlx::query(
                "update monitors set enabled=$2, queued=$3, running=$4, queued_at=$5, running_at=$6, \
                 search_executed_at=$7, update_executed_at=$8, last_heartbeat=$9 where id=$1",
            )
            .bind(monitor.id)
            .bind(monitor.enabled)
            .bind(monitor.queued)
            .bind(monitor.running)
            .bind(monitor.queued_at)
            .bind(monitor.running_at)
            .bind(monitor.search_executed_at)
            .bind(monitor.update_executed_at)
            .bind(monitor.last_heartbeat)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn get_code_module(&self, _monitor_id: MonitorId) -> SentinelaResult<Option<CodeModule>> {
        unimplemented!("sketch: see InMemoryStore for the reference semantics")
    }
    async fn save_code_module(&self, _module: CodeModule) -> SentinelaResult<()> {
        unimplemented!("sketch")
    }
    async fn get_updated_code_modules(
        &self,
        _monitor_ids: &[MonitorId],
        _reference: DateTime<Utc>,
    ) -> SentinelaResult<Vec<CodeModule>> {
        unimplemented!("sketch")
    }
    async fn active_issues(&self, _monitor_id: MonitorId) -> SentinelaResult<Vec<Issue>> {
        unimplemented!("sketch: backed by a partial index on status='active'")
    }
    async fn active_alert(&self, _monitor_id: MonitorId) -> SentinelaResult<Option<Alert>> {
        unimplemented!("sketch: backed by a partial index on status='active'")
    }
    async fn get_issue(&self, _id: IssueId) -> SentinelaResult<Option<Issue>> {
        unimplemented!("sketch")
    }
    async fn insert_issue(&self, _issue: Issue) -> SentinelaResult<Issue> {
        unimplemented!("sketch")
    }
    async fn save_issue(&self, _issue: &Issue) -> SentinelaResult<()> {
        unimplemented!("sketch")
    }
    async fn get_alert(&self, _id: AlertId) -> SentinelaResult<Option<Alert>> {
        unimplemented!("sketch")
    }
    async fn insert_alert(&self, _alert: Alert) -> SentinelaResult<Alert> {
        unimplemented!("sketch")
    }
    async fn save_alert(&self, _alert: &Alert) -> SentinelaResult<()> {
        unimplemented!("sketch")
    }
    async fn save_notification(&self, _notification: Notification) -> SentinelaResult<Notification> {
        unimplemented!("sketch")
    }
    async fn notifications_for_alert(&self, _alert_id: AlertId) -> SentinelaResult<Vec<Notification>> {
        unimplemented!("sketch")
    }
    async fn close_notification(&self, _id: NotificationId) -> SentinelaResult<()> {
        unimplemented!("sketch")
    }
    async fn get_variable(&self, _monitor_id: MonitorId, _name: &str) -> SentinelaResult<Option<Variable>> {
        unimplemented!("sketch")
    }
    async fn set_variable(&self, _monitor_id: MonitorId, _name: &str, _value: &str) -> SentinelaResult<()> {
        unimplemented!("sketch")
    }
    async fn record_execution(&self, _execution: MonitorExecution) -> SentinelaResult<MonitorExecution> {
        unimplemented!("sketch")
    }
    async fn append_event(&self, _event: Event) -> SentinelaResult<Option<Event>> {
        unimplemented!("sketch: rely on the Events(event_type, model, model_id) unique index, map a conflict to Ok(None)")
    }
    async fn stuck_monitors(&self, _tolerance: chrono::Duration, _now: DateTime<Utc>) -> SentinelaResult<Vec<Monitor>> {
        unimplemented!("sketch: see controller_procedures/monitors_stuck.sql in the original source")
    }
}

#[derive(sqlx::FromRow)]
struct MonitorRow {
    id: i64,
    name: String,
    enabled: bool,
    queued: bool,
    running: bool,
    queued_at: Option<DateTime<Utc>>,
    running_at: Option<DateTime<Utc>>,
    search_executed_at: Option<DateTime<Utc>>,
    update_executed_at: Option<DateTime<Utc>>,
    last_heartbeat: Option<DateTime<Utc>>,
}

impl From<MonitorRow> for Monitor {
    fn from(row: MonitorRow) -> Self {
        Monitor {
            id: row.id,
            name: row.name,
            enabled: row.enabled,
            queued: row.queued,
            running: row.running,
            queued_at: row.queued_at,
            running_at: row.running_at,
            search_executed_at: row.search_executed_at,
            update_executed_at: row.update_executed_at,
            last_heartbeat: row.last_heartbeat,
            active_issues: Vec::new(),
            active_alert: None,
        }
    }
}
