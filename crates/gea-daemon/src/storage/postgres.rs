//! PostgreSQL storage implementation
//!
//! Every entity is stored as a JSONB document next to the columns that are
//! filtered, ordered or constrained on. Unique indexes back the uniqueness
//! rules (usernames, emails, license numbers, reference numbers, reminder
//! keys) so they hold across daemon instances.

use super::traits::*;
use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gea_types::{
    Announcement, AnnouncementId, ChatMessage, ChecklistItem, ChecklistItemId, Client, ClientId,
    CpdLog, CpdLogId, Document, DocumentId, Glab, GlabId, Notification, NotificationId, Phase,
    PhaseLog, PhaseTemplate, PhaseTemplateId, Project, ProjectId, QualityChecklistItem,
    QualityItemId, ReviewStatus, ScheduledReminder, User, UserId,
};
use serde_json::Value;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Row,
};
use std::time::Duration;

/// PostgreSQL-backed storage
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connect to PostgreSQL and initialize schema
    pub async fn new(
        url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let storage = Self { pool };
        storage.initialize_schema().await?;
        Ok(storage)
    }

    async fn initialize_schema(&self) -> Result<(), StorageError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL,
                email TEXT NOT NULL,
                role TEXT NOT NULL,
                glab_id UUID,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE UNIQUE INDEX IF NOT EXISTS users_username ON users(username);"#,
            r#"CREATE UNIQUE INDEX IF NOT EXISTS users_email ON users(email);"#,
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id UUID NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS glabs (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                license_number TEXT NOT NULL,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE UNIQUE INDEX IF NOT EXISTS glabs_license_number ON glabs(license_number);"#,
            r#"
            CREATE TABLE IF NOT EXISTS clients (
                id UUID PRIMARY KEY,
                glab_id UUID NOT NULL,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS clients_glab_id ON clients(glab_id);"#,
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id UUID PRIMARY KEY,
                glab_id UUID NOT NULL,
                reference_number TEXT NOT NULL,
                current_phase SMALLINT NOT NULL,
                gea_status TEXT NOT NULL,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE UNIQUE INDEX IF NOT EXISTS projects_reference_number ON projects(reference_number);"#,
            r#"CREATE INDEX IF NOT EXISTS projects_glab_id ON projects(glab_id);"#,
            r#"
            CREATE TABLE IF NOT EXISTS checklist_items (
                id UUID PRIMARY KEY,
                project_id UUID NOT NULL,
                phase SMALLINT NOT NULL,
                item_order INTEGER NOT NULL,
                data JSONB NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS checklist_items_project ON checklist_items(project_id, phase, item_order);"#,
            r#"
            CREATE TABLE IF NOT EXISTS quality_items (
                id UUID PRIMARY KEY,
                project_id UUID NOT NULL,
                phase SMALLINT NOT NULL,
                item_order INTEGER NOT NULL,
                data JSONB NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS quality_items_project ON quality_items(project_id, phase, item_order);"#,
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id UUID PRIMARY KEY,
                project_id UUID NOT NULL,
                status TEXT NOT NULL,
                data JSONB NOT NULL,
                uploaded_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS documents_project_id ON documents(project_id);"#,
            r#"
            CREATE TABLE IF NOT EXISTS phase_templates (
                id UUID PRIMARY KEY,
                phase SMALLINT NOT NULL,
                slot_key TEXT NOT NULL,
                is_active BOOLEAN NOT NULL,
                data JSONB NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS phase_logs (
                sequence BIGSERIAL PRIMARY KEY,
                id UUID NOT NULL,
                project_id UUID NOT NULL,
                data JSONB NOT NULL,
                performed_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS phase_logs_project_id ON phase_logs(project_id);"#,
            r#"
            CREATE TABLE IF NOT EXISTS chat_messages (
                sequence BIGSERIAL PRIMARY KEY,
                id UUID NOT NULL,
                project_id UUID NOT NULL,
                sender_id UUID NOT NULL,
                is_read BOOLEAN NOT NULL,
                data JSONB NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS chat_messages_project_id ON chat_messages(project_id);"#,
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL,
                is_read BOOLEAN NOT NULL,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS notifications_user ON notifications(user_id, created_at DESC);"#,
            r#"
            CREATE TABLE IF NOT EXISTS announcements (
                id UUID PRIMARY KEY,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS cpd_logs (
                id UUID PRIMARY KEY,
                assessor_id UUID NOT NULL,
                data JSONB NOT NULL,
                submitted_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS cpd_logs_assessor_id ON cpd_logs(assessor_id);"#,
            r#"
            CREATE TABLE IF NOT EXISTS scheduled_reminders (
                id UUID PRIMARY KEY,
                reminder_type TEXT NOT NULL,
                target_type TEXT NOT NULL,
                target_id UUID NOT NULL,
                days_before INTEGER NOT NULL,
                data JSONB NOT NULL
            );
            "#,
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS scheduled_reminders_key
                ON scheduled_reminders(reminder_type, target_type, target_id, days_before);
            "#,
        ];

        for stmt in statements {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Query(e.to_string()))?;
        }

        Ok(())
    }

    fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, StorageError> {
        serde_json::to_value(value)
            .map_err(|e| StorageError::InvalidData(format!("json serialize error: {}", e)))
    }

    fn from_json<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, StorageError> {
        serde_json::from_value(value)
            .map_err(|e| StorageError::InvalidData(format!("json deserialize error: {}", e)))
    }

    fn decode_row<T: serde::de::DeserializeOwned>(row: PgRow) -> Result<T, StorageError> {
        let data: Value = row
            .try_get("data")
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Self::from_json(data)
    }

    fn decode_opt<T: serde::de::DeserializeOwned>(
        row: Option<PgRow>,
    ) -> Result<Option<T>, StorageError> {
        row.map(Self::decode_row).transpose()
    }

    fn decode_all<T: serde::de::DeserializeOwned>(
        rows: Vec<PgRow>,
    ) -> Result<Vec<T>, StorageError> {
        rows.into_iter().map(Self::decode_row).collect()
    }

    fn query_err(e: sqlx::Error) -> StorageError {
        StorageError::Query(e.to_string())
    }

    /// Map unique violations to `Conflict`
    fn write_err(e: sqlx::Error, what: &str) -> StorageError {
        match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                StorageError::Conflict(format!("{} already exists", what))
            }
            _ => StorageError::Query(e.to_string()),
        }
    }

    fn phase_col(phase: Phase) -> i16 {
        i16::from(phase.number())
    }
}

#[async_trait]
impl UserStorage for PostgresStorage {
    async fn get_user(&self, id: &UserId) -> StorageResult<Option<User>> {
        let row = sqlx::query("SELECT data FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Self::decode_opt(row)
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let row = sqlx::query("SELECT data FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Self::decode_opt(row)
    }

    async fn list_users(&self) -> StorageResult<Vec<User>> {
        let rows = sqlx::query("SELECT data FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Self::decode_all(rows)
    }

    async fn insert_user(&self, user: User) -> StorageResult<()> {
        let data = Self::to_json(&user)?;
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, role, glab_id, data, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.glab_id.map(|g| *g.as_uuid()))
        .bind(data)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_err(e, "username or email"))?;
        Ok(())
    }

    async fn update_user(&self, user: User) -> StorageResult<()> {
        let data = Self::to_json(&user)?;
        let result = sqlx::query(
            r#"
            UPDATE users SET email = $2, role = $3, glab_id = $4,
                data = $5::jsonb || jsonb_build_object(
                    'is_active', data->'is_active',
                    'password_hash', data->'password_hash'
                )
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.glab_id.map(|g| *g.as_uuid()))
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_err(e, "email"))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }

    async fn set_user_active(&self, id: &UserId, active: bool) -> StorageResult<User> {
        let row = sqlx::query(
            r#"
            UPDATE users SET data = jsonb_set(data, '{is_active}', to_jsonb($2::boolean))
            WHERE id = $1
            RETURNING data
            "#,
        )
        .bind(id.as_uuid())
        .bind(active)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::query_err)?;
        Self::decode_opt(row)?.ok_or_else(|| StorageError::NotFound(format!("user {}", id)))
    }

    async fn set_password_hash(&self, id: &UserId, password_hash: String) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET data = jsonb_set(data, '{password_hash}', to_jsonb($2::text))
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(Self::query_err)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    async fn count_users(&self) -> StorageResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(Self::query_err)?;
        let n: i64 = row.try_get("n").map_err(Self::query_err)?;
        Ok(n as usize)
    }
}

#[async_trait]
impl SessionStorage for PostgresStorage {
    async fn create_session(&self, session: Session) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.token)
        .bind(session.user_id.as_uuid())
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_err(e, "session"))?;
        Ok(())
    }

    async fn get_session(&self, token: &str, now: DateTime<Utc>) -> StorageResult<Option<Session>> {
        let row = sqlx::query(
            "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = $1 AND expires_at > $2",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::query_err)?;

        row.map(|r| -> StorageResult<Session> {
            Ok(Session {
                token: r.try_get("token").map_err(Self::query_err)?,
                user_id: UserId::from_uuid(r.try_get("user_id").map_err(Self::query_err)?),
                created_at: r.try_get("created_at").map_err(Self::query_err)?,
                expires_at: r.try_get("expires_at").map_err(Self::query_err)?,
            })
        })
        .transpose()
    }

    async fn delete_session(&self, token: &str) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl GlabStorage for PostgresStorage {
    async fn get_glab(&self, id: &GlabId) -> StorageResult<Option<Glab>> {
        let row = sqlx::query("SELECT data FROM glabs WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Self::decode_opt(row)
    }

    async fn list_glabs(&self) -> StorageResult<Vec<Glab>> {
        let rows = sqlx::query("SELECT data FROM glabs ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Self::decode_all(rows)
    }

    async fn insert_glab(&self, glab: Glab) -> StorageResult<()> {
        let data = Self::to_json(&glab)?;
        sqlx::query(
            "INSERT INTO glabs (id, name, license_number, data, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(glab.id.as_uuid())
        .bind(&glab.name)
        .bind(&glab.license_number)
        .bind(data)
        .bind(glab.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_err(e, "license number"))?;
        Ok(())
    }

    async fn update_glab(&self, glab: Glab) -> StorageResult<()> {
        let data = Self::to_json(&glab)?;
        let result = sqlx::query("UPDATE glabs SET name = $2, data = $3 WHERE id = $1")
            .bind(glab.id.as_uuid())
            .bind(&glab.name)
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(Self::query_err)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("GLAB {}", glab.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ClientStorage for PostgresStorage {
    async fn get_client(&self, id: &ClientId) -> StorageResult<Option<Client>> {
        let row = sqlx::query("SELECT data FROM clients WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Self::decode_opt(row)
    }

    async fn list_clients(&self, glab: Option<&GlabId>) -> StorageResult<Vec<Client>> {
        let rows = sqlx::query(
            "SELECT data FROM clients WHERE ($1::uuid IS NULL OR glab_id = $1) ORDER BY created_at DESC",
        )
        .bind(glab.map(|g| *g.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(Self::query_err)?;
        Self::decode_all(rows)
    }

    async fn insert_client(&self, client: Client) -> StorageResult<()> {
        let data = Self::to_json(&client)?;
        sqlx::query("INSERT INTO clients (id, glab_id, data, created_at) VALUES ($1, $2, $3, $4)")
            .bind(client.id.as_uuid())
            .bind(client.glab_id.as_uuid())
            .bind(data)
            .bind(client.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::write_err(e, "client"))?;
        Ok(())
    }
}

#[async_trait]
impl ProjectStorage for PostgresStorage {
    async fn get_project(&self, id: &ProjectId) -> StorageResult<Option<Project>> {
        let row = sqlx::query("SELECT data FROM projects WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Self::decode_opt(row)
    }

    async fn list_projects(&self) -> StorageResult<Vec<Project>> {
        let rows = sqlx::query("SELECT data FROM projects ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Self::decode_all(rows)
    }

    async fn list_projects_for_glab(&self, glab: &GlabId) -> StorageResult<Vec<Project>> {
        let rows =
            sqlx::query("SELECT data FROM projects WHERE glab_id = $1 ORDER BY created_at DESC")
                .bind(glab.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(Self::query_err)?;
        Self::decode_all(rows)
    }

    async fn count_projects_in_year(&self, glab: &GlabId, year: i32) -> StorageResult<usize> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n FROM projects
            WHERE glab_id = $1
              AND created_at >= make_timestamptz($2, 1, 1, 0, 0, 0, 'UTC')
              AND created_at < make_timestamptz($2 + 1, 1, 1, 0, 0, 0, 'UTC')
            "#,
        )
        .bind(glab.as_uuid())
        .bind(year)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::query_err)?;
        let n: i64 = row.try_get("n").map_err(Self::query_err)?;
        Ok(n as usize)
    }

    async fn insert_project(&self, project: Project) -> StorageResult<()> {
        let data = Self::to_json(&project)?;
        sqlx::query(
            r#"
            INSERT INTO projects
                (id, glab_id, reference_number, current_phase, gea_status, data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(project.id.as_uuid())
        .bind(project.glab_id.as_uuid())
        .bind(&project.reference_number)
        .bind(Self::phase_col(project.current_phase))
        .bind(project.review.status.as_str())
        .bind(data)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_err(e, "reference number"))?;
        Ok(())
    }

    async fn update_project(&self, project: Project, expected: Phase) -> StorageResult<()> {
        if project.current_phase != expected {
            return Err(StorageError::InvalidData(format!(
                "project {} update would move it out of phase {}",
                project.id,
                expected.number()
            )));
        }
        let data = Self::to_json(&project)?;
        let result = sqlx::query(
            r#"
            UPDATE projects SET gea_status = $2, data = $3, updated_at = $4
            WHERE id = $1 AND current_phase = $5
            "#,
        )
        .bind(project.id.as_uuid())
        .bind(project.review.status.as_str())
        .bind(data)
        .bind(project.updated_at)
        .bind(Self::phase_col(expected))
        .execute(&self.pool)
        .await
        .map_err(Self::query_err)?;

        if result.rows_affected() == 0 {
            return Err(self.phase_moved(&project.id, expected).await);
        }
        Ok(())
    }

    async fn commit_advance(&self, commit: AdvanceCommit) -> StorageResult<()> {
        commit.validate()?;
        let AdvanceCommit {
            project,
            expected,
            checklist,
            quality,
            log,
        } = commit;

        let mut tx = self.pool.begin().await.map_err(Self::query_err)?;

        // Only the fields an advance owns; concurrent edits to the rest survive
        let result = sqlx::query(
            r#"
            UPDATE projects SET
                current_phase = $2,
                gea_status = $3,
                updated_at = $4,
                data = data || jsonb_build_object(
                    'current_phase', $5::jsonb,
                    'review', $6::jsonb,
                    'updated_at', $7::jsonb
                )
            WHERE id = $1 AND current_phase = $8
            "#,
        )
        .bind(project.id.as_uuid())
        .bind(Self::phase_col(project.current_phase))
        .bind(project.review.status.as_str())
        .bind(project.updated_at)
        .bind(Self::to_json(&project.current_phase)?)
        .bind(Self::to_json(&project.review)?)
        .bind(Self::to_json(&project.updated_at)?)
        .bind(Self::phase_col(expected))
        .execute(&mut *tx)
        .await
        .map_err(Self::query_err)?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls it back
            drop(tx);
            return Err(self.phase_moved(&project.id, expected).await);
        }

        for item in checklist {
            let data = Self::to_json(&item)?;
            sqlx::query(
                "INSERT INTO checklist_items (id, project_id, phase, item_order, data) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(item.id.as_uuid())
            .bind(item.project_id.as_uuid())
            .bind(Self::phase_col(item.phase))
            .bind(item.order as i32)
            .bind(data)
            .execute(&mut *tx)
            .await
            .map_err(Self::query_err)?;
        }

        for item in quality {
            let data = Self::to_json(&item)?;
            sqlx::query(
                "INSERT INTO quality_items (id, project_id, phase, item_order, data) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(item.id.as_uuid())
            .bind(item.project_id.as_uuid())
            .bind(Self::phase_col(item.phase))
            .bind(item.order as i32)
            .bind(data)
            .execute(&mut *tx)
            .await
            .map_err(Self::query_err)?;
        }

        let data = Self::to_json(&log)?;
        sqlx::query(
            "INSERT INTO phase_logs (id, project_id, data, performed_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(log.id.as_uuid())
        .bind(log.project_id.as_uuid())
        .bind(data)
        .bind(log.performed_at)
        .execute(&mut *tx)
        .await
        .map_err(Self::query_err)?;

        tx.commit().await.map_err(Self::query_err)
    }
}

impl PostgresStorage {
    /// Error for a conditional project write that matched no row
    async fn phase_moved(&self, id: &ProjectId, expected: Phase) -> StorageError {
        match self.get_project(id).await {
            Ok(Some(_)) => StorageError::Conflict(format!(
                "project {} is no longer in phase {}",
                id,
                expected.number()
            )),
            Ok(None) => StorageError::NotFound(format!("project {}", id)),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl ChecklistStorage for PostgresStorage {
    async fn list_checklist(&self, project: &ProjectId) -> StorageResult<Vec<ChecklistItem>> {
        let rows = sqlx::query(
            "SELECT data FROM checklist_items WHERE project_id = $1 ORDER BY phase, item_order",
        )
        .bind(project.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(Self::query_err)?;
        Self::decode_all(rows)
    }

    async fn get_checklist_item(
        &self,
        id: &ChecklistItemId,
    ) -> StorageResult<Option<ChecklistItem>> {
        let row = sqlx::query("SELECT data FROM checklist_items WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Self::decode_opt(row)
    }

    async fn insert_checklist_items(&self, items: Vec<ChecklistItem>) -> StorageResult<()> {
        let mut tx = self.pool.begin().await.map_err(Self::query_err)?;
        for item in items {
            let data = Self::to_json(&item)?;
            sqlx::query(
                "INSERT INTO checklist_items (id, project_id, phase, item_order, data) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(item.id.as_uuid())
            .bind(item.project_id.as_uuid())
            .bind(Self::phase_col(item.phase))
            .bind(item.order as i32)
            .bind(data)
            .execute(&mut *tx)
            .await
            .map_err(Self::query_err)?;
        }
        tx.commit().await.map_err(Self::query_err)
    }

    async fn update_checklist_item(&self, item: ChecklistItem) -> StorageResult<()> {
        let data = Self::to_json(&item)?;
        let result = sqlx::query("UPDATE checklist_items SET data = $2 WHERE id = $1")
            .bind(item.id.as_uuid())
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(Self::query_err)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("checklist item {}", item.id)));
        }
        Ok(())
    }

    async fn list_quality_checklist(
        &self,
        project: &ProjectId,
    ) -> StorageResult<Vec<QualityChecklistItem>> {
        let rows = sqlx::query(
            "SELECT data FROM quality_items WHERE project_id = $1 ORDER BY phase, item_order",
        )
        .bind(project.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(Self::query_err)?;
        Self::decode_all(rows)
    }

    async fn get_quality_item(
        &self,
        id: &QualityItemId,
    ) -> StorageResult<Option<QualityChecklistItem>> {
        let row = sqlx::query("SELECT data FROM quality_items WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Self::decode_opt(row)
    }

    async fn insert_quality_items(&self, items: Vec<QualityChecklistItem>) -> StorageResult<()> {
        let mut tx = self.pool.begin().await.map_err(Self::query_err)?;
        for item in items {
            let data = Self::to_json(&item)?;
            sqlx::query(
                "INSERT INTO quality_items (id, project_id, phase, item_order, data) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(item.id.as_uuid())
            .bind(item.project_id.as_uuid())
            .bind(Self::phase_col(item.phase))
            .bind(item.order as i32)
            .bind(data)
            .execute(&mut *tx)
            .await
            .map_err(Self::query_err)?;
        }
        tx.commit().await.map_err(Self::query_err)
    }

    async fn update_quality_item(&self, item: QualityChecklistItem) -> StorageResult<()> {
        let data = Self::to_json(&item)?;
        let result = sqlx::query("UPDATE quality_items SET data = $2 WHERE id = $1")
            .bind(item.id.as_uuid())
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(Self::query_err)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("quality item {}", item.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStorage for PostgresStorage {
    async fn get_document(&self, id: &DocumentId) -> StorageResult<Option<Document>> {
        let row = sqlx::query("SELECT data FROM documents WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Self::decode_opt(row)
    }

    async fn list_documents(&self, project: &ProjectId) -> StorageResult<Vec<Document>> {
        let rows = sqlx::query(
            "SELECT data FROM documents WHERE project_id = $1 ORDER BY uploaded_at DESC",
        )
        .bind(project.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(Self::query_err)?;
        Self::decode_all(rows)
    }

    async fn list_documents_pending_review(&self) -> StorageResult<Vec<Document>> {
        let rows =
            sqlx::query("SELECT data FROM documents WHERE status = $1 ORDER BY uploaded_at DESC")
                .bind(ReviewStatus::Pending.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(Self::query_err)?;
        Self::decode_all(rows)
    }

    async fn insert_document(&self, document: Document) -> StorageResult<()> {
        let data = Self::to_json(&document)?;
        sqlx::query(
            "INSERT INTO documents (id, project_id, status, data, uploaded_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(document.id.as_uuid())
        .bind(document.project_id.as_uuid())
        .bind(document.status.as_str())
        .bind(data)
        .bind(document.uploaded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_err(e, "document"))?;
        Ok(())
    }

    async fn update_document(&self, document: Document) -> StorageResult<()> {
        let data = Self::to_json(&document)?;
        let result = sqlx::query("UPDATE documents SET status = $2, data = $3 WHERE id = $1")
            .bind(document.id.as_uuid())
            .bind(document.status.as_str())
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(Self::query_err)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("document {}", document.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl TemplateStorage for PostgresStorage {
    async fn get_template(&self, id: &PhaseTemplateId) -> StorageResult<Option<PhaseTemplate>> {
        let row = sqlx::query("SELECT data FROM phase_templates WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Self::decode_opt(row)
    }

    async fn list_templates(&self) -> StorageResult<Vec<PhaseTemplate>> {
        let rows = sqlx::query(
            "SELECT data FROM phase_templates WHERE is_active ORDER BY phase, slot_key",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Self::query_err)?;
        Self::decode_all(rows)
    }

    async fn insert_template(&self, template: PhaseTemplate) -> StorageResult<()> {
        let data = Self::to_json(&template)?;
        let mut tx = self.pool.begin().await.map_err(Self::query_err)?;

        sqlx::query(
            r#"
            UPDATE phase_templates
            SET is_active = FALSE, data = jsonb_set(data, '{is_active}', 'false')
            WHERE phase = $1 AND slot_key = $2 AND is_active
            "#,
        )
        .bind(Self::phase_col(template.phase))
        .bind(&template.slot_key)
        .execute(&mut *tx)
        .await
        .map_err(Self::query_err)?;

        sqlx::query(
            "INSERT INTO phase_templates (id, phase, slot_key, is_active, data) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(template.id.as_uuid())
        .bind(Self::phase_col(template.phase))
        .bind(&template.slot_key)
        .bind(template.is_active)
        .bind(data)
        .execute(&mut *tx)
        .await
        .map_err(Self::query_err)?;

        tx.commit().await.map_err(Self::query_err)
    }
}

#[async_trait]
impl PhaseLogStorage for PostgresStorage {
    async fn append_phase_log(&self, log: PhaseLog) -> StorageResult<()> {
        let data = Self::to_json(&log)?;
        sqlx::query(
            "INSERT INTO phase_logs (id, project_id, data, performed_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(log.id.as_uuid())
        .bind(log.project_id.as_uuid())
        .bind(data)
        .bind(log.performed_at)
        .execute(&self.pool)
        .await
        .map_err(Self::query_err)?;
        Ok(())
    }

    async fn list_phase_logs(&self, project: &ProjectId) -> StorageResult<Vec<PhaseLog>> {
        let rows =
            sqlx::query("SELECT data FROM phase_logs WHERE project_id = $1 ORDER BY sequence")
                .bind(project.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(Self::query_err)?;
        Self::decode_all(rows)
    }
}

#[async_trait]
impl ChatStorage for PostgresStorage {
    async fn insert_message(&self, message: ChatMessage) -> StorageResult<()> {
        let data = Self::to_json(&message)?;
        sqlx::query(
            "INSERT INTO chat_messages (id, project_id, sender_id, is_read, data) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(message.id.as_uuid())
        .bind(message.project_id.as_uuid())
        .bind(message.sender_id.as_uuid())
        .bind(message.is_read)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(Self::query_err)?;
        Ok(())
    }

    async fn list_messages(&self, project: &ProjectId) -> StorageResult<Vec<ChatMessage>> {
        let rows =
            sqlx::query("SELECT data FROM chat_messages WHERE project_id = $1 ORDER BY sequence")
                .bind(project.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(Self::query_err)?;
        Self::decode_all(rows)
    }

    async fn mark_messages_read(
        &self,
        project: &ProjectId,
        reader: &UserId,
    ) -> StorageResult<usize> {
        let result = sqlx::query(
            r#"
            UPDATE chat_messages
            SET is_read = TRUE, data = jsonb_set(data, '{is_read}', 'true')
            WHERE project_id = $1 AND sender_id <> $2 AND NOT is_read
            "#,
        )
        .bind(project.as_uuid())
        .bind(reader.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(Self::query_err)?;
        Ok(result.rows_affected() as usize)
    }
}

#[async_trait]
impl NotificationStorage for PostgresStorage {
    async fn insert_notifications(&self, notifications: Vec<Notification>) -> StorageResult<()> {
        let mut tx = self.pool.begin().await.map_err(Self::query_err)?;
        for n in notifications {
            let data = Self::to_json(&n)?;
            sqlx::query(
                "INSERT INTO notifications (id, user_id, is_read, data, created_at) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(n.id.as_uuid())
            .bind(n.user_id.as_uuid())
            .bind(n.is_read)
            .bind(data)
            .bind(n.created_at)
            .execute(&mut *tx)
            .await
            .map_err(Self::query_err)?;
        }
        tx.commit().await.map_err(Self::query_err)
    }

    async fn list_notifications(
        &self,
        user: &UserId,
        limit: usize,
    ) -> StorageResult<Vec<Notification>> {
        let rows = sqlx::query(
            "SELECT data FROM notifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user.as_uuid())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::query_err)?;
        Self::decode_all(rows)
    }

    async fn unread_count(&self, user: &UserId) -> StorageResult<usize> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(Self::query_err)?;
        let n: i64 = row.try_get("n").map_err(Self::query_err)?;
        Ok(n as usize)
    }

    async fn mark_notification_read(
        &self,
        user: &UserId,
        id: &NotificationId,
        at: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE,
                data = jsonb_set(jsonb_set(data, '{is_read}', 'true'), '{read_at}', to_jsonb($3::timestamptz))
            WHERE id = $1 AND user_id = $2 AND NOT is_read
            "#,
        )
        .bind(id.as_uuid())
        .bind(user.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(Self::query_err)?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        // Already read counts as success as long as it is the user's own
        let row = sqlx::query("SELECT 1 AS found FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(user.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Ok(row.is_some())
    }

    async fn mark_all_read(&self, user: &UserId, at: DateTime<Utc>) -> StorageResult<usize> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE,
                data = jsonb_set(jsonb_set(data, '{is_read}', 'true'), '{read_at}', to_jsonb($2::timestamptz))
            WHERE user_id = $1 AND NOT is_read
            "#,
        )
        .bind(user.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(Self::query_err)?;
        Ok(result.rows_affected() as usize)
    }
}

#[async_trait]
impl AnnouncementStorage for PostgresStorage {
    async fn get_announcement(&self, id: &AnnouncementId) -> StorageResult<Option<Announcement>> {
        let row = sqlx::query("SELECT data FROM announcements WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Self::decode_opt(row)
    }

    async fn list_announcements(&self) -> StorageResult<Vec<Announcement>> {
        let rows = sqlx::query("SELECT data FROM announcements ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Self::decode_all(rows)
    }

    async fn insert_announcement(&self, announcement: Announcement) -> StorageResult<()> {
        let data = Self::to_json(&announcement)?;
        sqlx::query("INSERT INTO announcements (id, data, created_at) VALUES ($1, $2, $3)")
            .bind(announcement.id.as_uuid())
            .bind(data)
            .bind(announcement.created_at)
            .execute(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Ok(())
    }

    async fn update_announcement(&self, announcement: Announcement) -> StorageResult<()> {
        let data = Self::to_json(&announcement)?;
        let result = sqlx::query("UPDATE announcements SET data = $2 WHERE id = $1")
            .bind(announcement.id.as_uuid())
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(Self::query_err)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "announcement {}",
                announcement.id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CpdStorage for PostgresStorage {
    async fn get_cpd_log(&self, id: &CpdLogId) -> StorageResult<Option<CpdLog>> {
        let row = sqlx::query("SELECT data FROM cpd_logs WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Self::decode_opt(row)
    }

    async fn list_cpd_logs(&self, assessor: Option<&UserId>) -> StorageResult<Vec<CpdLog>> {
        let rows = sqlx::query(
            "SELECT data FROM cpd_logs WHERE ($1::uuid IS NULL OR assessor_id = $1) ORDER BY submitted_at DESC",
        )
        .bind(assessor.map(|a| *a.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(Self::query_err)?;
        Self::decode_all(rows)
    }

    async fn insert_cpd_log(&self, log: CpdLog) -> StorageResult<()> {
        let data = Self::to_json(&log)?;
        sqlx::query(
            "INSERT INTO cpd_logs (id, assessor_id, data, submitted_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(log.id.as_uuid())
        .bind(log.assessor_id.as_uuid())
        .bind(data)
        .bind(log.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(Self::query_err)?;
        Ok(())
    }

    async fn update_cpd_log(&self, log: CpdLog) -> StorageResult<()> {
        let data = Self::to_json(&log)?;
        let result = sqlx::query("UPDATE cpd_logs SET data = $2 WHERE id = $1")
            .bind(log.id.as_uuid())
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(Self::query_err)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("CPD log {}", log.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ReminderStorage for PostgresStorage {
    async fn record_reminder(
        &self,
        reminder: ScheduledReminder,
        notifications: Vec<Notification>,
    ) -> StorageResult<bool> {
        let data = Self::to_json(&reminder)?;
        let mut tx = self.pool.begin().await.map_err(Self::query_err)?;

        let result = sqlx::query(
            r#"
            INSERT INTO scheduled_reminders
                (id, reminder_type, target_type, target_id, days_before, data)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (reminder_type, target_type, target_id, days_before) DO NOTHING
            "#,
        )
        .bind(reminder.id.as_uuid())
        .bind(reminder.key.reminder_type.as_str())
        .bind(reminder.key.target.type_str())
        .bind(reminder.key.target.id_uuid())
        .bind(reminder.key.days_before as i32)
        .bind(data)
        .execute(&mut *tx)
        .await
        .map_err(Self::query_err)?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        for n in notifications {
            let data = Self::to_json(&n)?;
            sqlx::query(
                "INSERT INTO notifications (id, user_id, is_read, data, created_at) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(n.id.as_uuid())
            .bind(n.user_id.as_uuid())
            .bind(n.is_read)
            .bind(data)
            .bind(n.created_at)
            .execute(&mut *tx)
            .await
            .map_err(Self::query_err)?;
        }

        tx.commit().await.map_err(Self::query_err)?;
        Ok(true)
    }

    async fn list_reminders(&self) -> StorageResult<Vec<ScheduledReminder>> {
        let rows = sqlx::query("SELECT data FROM scheduled_reminders")
            .fetch_all(&self.pool)
            .await
            .map_err(Self::query_err)?;
        Self::decode_all(rows)
    }
}

impl Storage for PostgresStorage {}
