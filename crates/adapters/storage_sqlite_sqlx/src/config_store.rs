//! `SQLite` implementation of [`ConfigStore`].
//!
//! Both lists are replaced wholesale inside a transaction. A `position`
//! column keeps the order they were written in.

use std::future::Future;
use std::time::Duration;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use plughub_app::ports::ConfigStore;
use plughub_domain::device::Device;
use plughub_domain::error::PlugHubError;
use plughub_domain::id::DeviceId;
use plughub_domain::rule::Rule;
use plughub_domain::state::StateSnapshot;

use crate::error::StorageError;

struct DeviceRow(Device);

impl<'r> FromRow<'r, SqliteRow> for DeviceRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let kind: String = row.try_get("kind")?;

        Ok(Self(Device {
            id: DeviceId::new(id),
            name,
            kind,
        }))
    }
}

struct RuleRow(Rule);

impl<'r> FromRow<'r, SqliteRow> for RuleRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let name: String = row.try_get("name")?;
        let target_json: String = row.try_get("target_state")?;
        let trigger_str: String = row.try_get("trigger_time")?;
        let repeat_secs: i64 = row.try_get("repeat_secs")?;
        let enabled: bool = row.try_get("enabled")?;

        let target_state: StateSnapshot = serde_json::from_str(&target_json)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let trigger_time = chrono::DateTime::parse_from_rfc3339(&trigger_str)
            .map(|dt| dt.to_utc())
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let repeat_secs =
            u64::try_from(repeat_secs).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(Rule {
            name,
            target_state,
            trigger_time,
            repeat: Duration::from_secs(repeat_secs),
            enabled,
        }))
    }
}

const SELECT_DEVICES: &str = "SELECT id, name, kind FROM devices ORDER BY position";
const DELETE_DEVICES: &str = "DELETE FROM devices";
const INSERT_DEVICE: &str = "INSERT INTO devices (position, id, name, kind) VALUES (?, ?, ?, ?)";

const SELECT_RULES: &str = "SELECT name, target_state, trigger_time, repeat_secs, enabled FROM rules ORDER BY position";
const DELETE_RULES: &str = "DELETE FROM rules";
const INSERT_RULE: &str = "INSERT INTO rules (position, name, target_state, trigger_time, repeat_secs, enabled) VALUES (?, ?, ?, ?, ?, ?)";

/// Rule as written to the database.
struct EncodedRule {
    name: String,
    target_state: String,
    trigger_time: String,
    repeat_secs: i64,
    enabled: bool,
}

impl EncodedRule {
    fn encode(rule: Rule) -> Result<Self, StorageError> {
        let repeat_secs = i64::try_from(rule.repeat.as_secs())
            .map_err(|_| StorageError::RepeatOutOfRange(rule.name.clone()))?;
        Ok(Self {
            target_state: serde_json::to_string(&rule.target_state)?,
            trigger_time: rule.trigger_time.to_rfc3339(),
            repeat_secs,
            enabled: rule.enabled,
            name: rule.name,
        })
    }
}

/// `SQLite`-backed configuration store.
#[derive(Clone)]
pub struct SqliteConfigStore {
    pool: SqlitePool,
}

impl SqliteConfigStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ConfigStore for SqliteConfigStore {
    fn get_devices(&self) -> impl Future<Output = Result<Vec<Device>, PlugHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<DeviceRow> = sqlx::query_as(SELECT_DEVICES)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|row| row.0).collect())
        }
    }

    fn set_devices(
        &self,
        devices: Vec<Device>,
    ) -> impl Future<Output = Result<(), PlugHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let mut tx = pool.begin().await.map_err(StorageError::from)?;
            sqlx::query(DELETE_DEVICES)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
            for (position, device) in (0_i64..).zip(&devices) {
                sqlx::query(INSERT_DEVICE)
                    .bind(position)
                    .bind(device.id.as_str())
                    .bind(&device.name)
                    .bind(&device.kind)
                    .execute(&mut *tx)
                    .await
                    .map_err(StorageError::from)?;
            }
            tx.commit().await.map_err(StorageError::from)?;

            tracing::debug!(devices = devices.len(), "device list stored");
            Ok(())
        }
    }

    fn get_rules(&self) -> impl Future<Output = Result<Vec<Rule>, PlugHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<RuleRow> = sqlx::query_as(SELECT_RULES)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|row| row.0).collect())
        }
    }

    fn set_rules(&self, rules: Vec<Rule>) -> impl Future<Output = Result<(), PlugHubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let count = rules.len();
            let encoded = rules
                .into_iter()
                .map(EncodedRule::encode)
                .collect::<Result<Vec<_>, _>>()?;

            let mut tx = pool.begin().await.map_err(StorageError::from)?;
            sqlx::query(DELETE_RULES)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
            for (position, rule) in (0_i64..).zip(encoded) {
                sqlx::query(INSERT_RULE)
                    .bind(position)
                    .bind(rule.name)
                    .bind(rule.target_state)
                    .bind(rule.trigger_time)
                    .bind(rule.repeat_secs)
                    .bind(rule.enabled)
                    .execute(&mut *tx)
                    .await
                    .map_err(StorageError::from)?;
            }
            tx.commit().await.map_err(StorageError::from)?;

            tracing::debug!(rules = count, "rule list stored");
            Ok(())
        }
    }
}
