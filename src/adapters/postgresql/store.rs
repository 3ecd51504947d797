//! PostgreSQL implementation of the sync store
//!
//! Every upsert is a single `INSERT ... ON CONFLICT (remote_id) DO UPDATE`
//! statement so concurrent sync invocations rely on the database's own
//! row-level locking rather than application-level locks. Optional fields
//! coalesce with the existing row; `session_number` and
//! `mhcp_used_sessions` are never touched on conflict.

use crate::adapters::postgresql::client::PostgresClient;
use crate::adapters::store::{SyncStore, Upserted};
use crate::domain::{
    Client, ClientId, MeridianError, Practitioner, PractitionerId, RemoteId, Result, Session,
    SessionId, SessionStatus, SyncLogEntry, SyncLogId, SyncRunStatus, SyncScope, SyncType,
};
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;
use tokio_postgres::Row;

/// PostgreSQL-backed [`SyncStore`]
pub struct PgSyncStore {
    client: Arc<PostgresClient>,
}

impl PgSyncStore {
    /// Create a new store over a pooled client
    pub fn new(client: PostgresClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Create a new store sharing an existing client
    pub fn new_with_arc(client: Arc<PostgresClient>) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgresClient> {
        &self.client
    }
}

fn row_to_practitioner(row: &Row) -> Result<Practitioner> {
    Ok(Practitioner {
        id: PractitionerId::from_uuid(row.get("id")),
        remote_id: RemoteId::new(row.get::<_, String>("remote_id"))
            .map_err(MeridianError::Database)?,
        remote_role_id: row.get("remote_role_id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        display_name: row.get("display_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        qualifications: row.get("qualifications"),
        specialty: row.get("specialty"),
        active: row.get("active"),
        last_synced_at: row.get("last_synced_at"),
    })
}

fn row_to_client(row: &Row) -> Result<Client> {
    Ok(Client {
        id: ClientId::from_uuid(row.get("id")),
        remote_id: RemoteId::new(row.get::<_, String>("remote_id"))
            .map_err(MeridianError::Database)?,
        practitioner_id: PractitionerId::from_uuid(row.get("practitioner_id")),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        initials: row.get("initials"),
        email: row.get("email"),
        phone: row.get("phone"),
        date_of_birth: row.get("date_of_birth"),
        mhcp_total_sessions: row.get("mhcp_total_sessions"),
        mhcp_used_sessions: row.get("mhcp_used_sessions"),
        mhcp_start_date: row.get("mhcp_start_date"),
        mhcp_expiry_date: row.get("mhcp_expiry_date"),
        presenting_issues: row.get("presenting_issues"),
        active: row.get("active"),
        last_synced_at: row.get("last_synced_at"),
    })
}

fn row_to_session(row: &Row) -> Result<Session> {
    Ok(Session {
        id: SessionId::from_uuid(row.get("id")),
        remote_id: RemoteId::new(row.get::<_, String>("remote_id"))
            .map_err(MeridianError::Database)?,
        practitioner_id: PractitionerId::from_uuid(row.get("practitioner_id")),
        client_id: ClientId::from_uuid(row.get("client_id")),
        scheduled_start: row.get("scheduled_start"),
        scheduled_end: row.get("scheduled_end"),
        actual_start: row.get("actual_start"),
        actual_end: row.get("actual_end"),
        session_number: row.get("session_number"),
        status: SessionStatus::from_str(row.get::<_, String>("status").as_str())
            .map_err(MeridianError::Database)?,
        session_type: row.get("session_type"),
        is_telehealth: row.get("is_telehealth"),
        notes: row.get("notes"),
        fee_amount: row.get("fee_amount"),
        fee_currency: row.get("fee_currency"),
        paid: row.get("paid"),
        last_synced_at: row.get("last_synced_at"),
    })
}

fn row_to_sync_log(row: &Row) -> Result<SyncLogEntry> {
    Ok(SyncLogEntry {
        id: SyncLogId::from_uuid(row.get("id")),
        sync_type: SyncType::from_str(row.get::<_, String>("sync_type").as_str())
            .map_err(MeridianError::Database)?,
        scope: SyncScope::from_str(row.get::<_, String>("scope").as_str())
            .map_err(MeridianError::Database)?,
        operation: row.get("operation"),
        status: SyncRunStatus::from_str(row.get::<_, String>("status").as_str())
            .map_err(MeridianError::Database)?,
        error_message: row.get("error_message"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        records_processed: row.get("records_processed"),
        practitioner_id: row
            .get::<_, Option<uuid::Uuid>>("practitioner_id")
            .map(PractitionerId::from_uuid),
    })
}

#[async_trait]
impl SyncStore for PgSyncStore {
    async fn ping(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn find_practitioner_by_remote_id(
        &self,
        remote_id: &RemoteId,
    ) -> Result<Option<Practitioner>> {
        let row = self
            .client
            .query_opt(
                "SELECT * FROM practitioners WHERE remote_id = $1",
                &[&remote_id.as_str()],
            )
            .await?;
        row.as_ref().map(row_to_practitioner).transpose()
    }

    async fn find_practitioner_by_id(
        &self,
        id: PractitionerId,
    ) -> Result<Option<Practitioner>> {
        let row = self
            .client
            .query_opt("SELECT * FROM practitioners WHERE id = $1", &[&id.as_uuid()])
            .await?;
        row.as_ref().map(row_to_practitioner).transpose()
    }

    async fn upsert_practitioner(
        &self,
        practitioner: &Practitioner,
    ) -> Result<Upserted<Practitioner>> {
        let row = self
            .client
            .query_one(
                r#"
                INSERT INTO practitioners (
                    id, remote_id, remote_role_id, first_name, last_name,
                    display_name, email, phone, qualifications, specialty,
                    active, last_synced_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ON CONFLICT (remote_id) DO UPDATE SET
                    remote_role_id = COALESCE(EXCLUDED.remote_role_id, practitioners.remote_role_id),
                    first_name = EXCLUDED.first_name,
                    last_name = EXCLUDED.last_name,
                    display_name = EXCLUDED.display_name,
                    email = EXCLUDED.email,
                    phone = COALESCE(EXCLUDED.phone, practitioners.phone),
                    qualifications = COALESCE(EXCLUDED.qualifications, practitioners.qualifications),
                    specialty = COALESCE(EXCLUDED.specialty, practitioners.specialty),
                    active = EXCLUDED.active,
                    last_synced_at = EXCLUDED.last_synced_at,
                    updated_at = now()
                RETURNING *, (xmax = 0) AS inserted
                "#,
                &[
                    &practitioner.id.as_uuid(),
                    &practitioner.remote_id.as_str(),
                    &practitioner.remote_role_id,
                    &practitioner.first_name,
                    &practitioner.last_name,
                    &practitioner.display_name,
                    &practitioner.email,
                    &practitioner.phone,
                    &practitioner.qualifications,
                    &practitioner.specialty,
                    &practitioner.active,
                    &practitioner.last_synced_at,
                ],
            )
            .await?;

        Ok(Upserted {
            entity: row_to_practitioner(&row)?,
            created: row.get("inserted"),
        })
    }

    async fn list_practitioners(&self) -> Result<Vec<Practitioner>> {
        let rows = self
            .client
            .query("SELECT * FROM practitioners ORDER BY last_name, first_name", &[])
            .await?;
        rows.iter().map(row_to_practitioner).collect()
    }

    async fn find_client_by_remote_id(&self, remote_id: &RemoteId) -> Result<Option<Client>> {
        let row = self
            .client
            .query_opt(
                "SELECT * FROM clients WHERE remote_id = $1",
                &[&remote_id.as_str()],
            )
            .await?;
        row.as_ref().map(row_to_client).transpose()
    }

    async fn upsert_client(&self, client: &Client) -> Result<Upserted<Client>> {
        let row = self
            .client
            .query_one(
                r#"
                INSERT INTO clients (
                    id, remote_id, practitioner_id, first_name, last_name,
                    initials, email, phone, date_of_birth,
                    mhcp_total_sessions, mhcp_used_sessions, mhcp_start_date,
                    mhcp_expiry_date, presenting_issues, active, last_synced_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                ON CONFLICT (remote_id) DO UPDATE SET
                    practitioner_id = EXCLUDED.practitioner_id,
                    first_name = EXCLUDED.first_name,
                    last_name = EXCLUDED.last_name,
                    initials = EXCLUDED.initials,
                    email = COALESCE(EXCLUDED.email, clients.email),
                    phone = COALESCE(EXCLUDED.phone, clients.phone),
                    date_of_birth = COALESCE(EXCLUDED.date_of_birth, clients.date_of_birth),
                    mhcp_total_sessions = COALESCE(EXCLUDED.mhcp_total_sessions, clients.mhcp_total_sessions),
                    mhcp_start_date = COALESCE(EXCLUDED.mhcp_start_date, clients.mhcp_start_date),
                    mhcp_expiry_date = COALESCE(EXCLUDED.mhcp_expiry_date, clients.mhcp_expiry_date),
                    presenting_issues = COALESCE(EXCLUDED.presenting_issues, clients.presenting_issues),
                    active = EXCLUDED.active,
                    last_synced_at = EXCLUDED.last_synced_at,
                    updated_at = now()
                RETURNING *, (xmax = 0) AS inserted
                "#,
                &[
                    &client.id.as_uuid(),
                    &client.remote_id.as_str(),
                    &client.practitioner_id.as_uuid(),
                    &client.first_name,
                    &client.last_name,
                    &client.initials,
                    &client.email,
                    &client.phone,
                    &client.date_of_birth,
                    &client.mhcp_total_sessions,
                    &client.mhcp_used_sessions,
                    &client.mhcp_start_date,
                    &client.mhcp_expiry_date,
                    &client.presenting_issues,
                    &client.active,
                    &client.last_synced_at,
                ],
            )
            .await?;

        Ok(Upserted {
            entity: row_to_client(&row)?,
            created: row.get("inserted"),
        })
    }

    async fn set_client_active(&self, remote_id: &RemoteId, active: bool) -> Result<bool> {
        let affected = self
            .client
            .execute(
                "UPDATE clients SET active = $2, updated_at = now() WHERE remote_id = $1",
                &[&remote_id.as_str(), &active],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn update_client_used_sessions(&self, client_id: ClientId, used: i32) -> Result<()> {
        self.client
            .execute(
                "UPDATE clients SET mhcp_used_sessions = $2, updated_at = now() WHERE id = $1",
                &[&client_id.as_uuid(), &used],
            )
            .await?;
        Ok(())
    }

    async fn clients_for_practitioner(
        &self,
        practitioner_id: PractitionerId,
    ) -> Result<Vec<Client>> {
        let rows = self
            .client
            .query(
                "SELECT * FROM clients WHERE practitioner_id = $1 ORDER BY last_name, first_name",
                &[&practitioner_id.as_uuid()],
            )
            .await?;
        rows.iter().map(row_to_client).collect()
    }

    async fn find_session_by_remote_id(&self, remote_id: &RemoteId) -> Result<Option<Session>> {
        let row = self
            .client
            .query_opt(
                "SELECT * FROM sessions WHERE remote_id = $1",
                &[&remote_id.as_str()],
            )
            .await?;
        row.as_ref().map(row_to_session).transpose()
    }

    async fn upsert_session(&self, session: &Session) -> Result<Upserted<Session>> {
        // session_number is intentionally absent from the UPDATE arm
        let row = self
            .client
            .query_one(
                r#"
                INSERT INTO sessions (
                    id, remote_id, practitioner_id, client_id,
                    scheduled_start, scheduled_end, actual_start, actual_end,
                    session_number, status, session_type, is_telehealth,
                    notes, fee_amount, fee_currency, paid, last_synced_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
                ON CONFLICT (remote_id) DO UPDATE SET
                    practitioner_id = EXCLUDED.practitioner_id,
                    client_id = EXCLUDED.client_id,
                    scheduled_start = EXCLUDED.scheduled_start,
                    scheduled_end = EXCLUDED.scheduled_end,
                    actual_start = COALESCE(EXCLUDED.actual_start, sessions.actual_start),
                    actual_end = COALESCE(EXCLUDED.actual_end, sessions.actual_end),
                    status = EXCLUDED.status,
                    session_type = COALESCE(EXCLUDED.session_type, sessions.session_type),
                    is_telehealth = EXCLUDED.is_telehealth,
                    notes = COALESCE(EXCLUDED.notes, sessions.notes),
                    fee_amount = COALESCE(EXCLUDED.fee_amount, sessions.fee_amount),
                    fee_currency = COALESCE(EXCLUDED.fee_currency, sessions.fee_currency),
                    paid = EXCLUDED.paid,
                    last_synced_at = EXCLUDED.last_synced_at,
                    updated_at = now()
                RETURNING *, (xmax = 0) AS inserted
                "#,
                &[
                    &session.id.as_uuid(),
                    &session.remote_id.as_str(),
                    &session.practitioner_id.as_uuid(),
                    &session.client_id.as_uuid(),
                    &session.scheduled_start,
                    &session.scheduled_end,
                    &session.actual_start,
                    &session.actual_end,
                    &session.session_number,
                    &session.status.as_str(),
                    &session.session_type,
                    &session.is_telehealth,
                    &session.notes,
                    &session.fee_amount,
                    &session.fee_currency,
                    &session.paid,
                    &session.last_synced_at,
                ],
            )
            .await?;

        Ok(Upserted {
            entity: row_to_session(&row)?,
            created: row.get("inserted"),
        })
    }

    async fn set_session_status(
        &self,
        remote_id: &RemoteId,
        status: SessionStatus,
    ) -> Result<bool> {
        let affected = self
            .client
            .execute(
                "UPDATE sessions SET status = $2, updated_at = now() WHERE remote_id = $1",
                &[&remote_id.as_str(), &status.as_str()],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn count_completed_sessions(
        &self,
        client_id: ClientId,
        practitioner_id: PractitionerId,
    ) -> Result<i64> {
        let row = self
            .client
            .query_one(
                "SELECT COUNT(*) FROM sessions \
                 WHERE client_id = $1 AND practitioner_id = $2 AND status = 'completed'",
                &[&client_id.as_uuid(), &practitioner_id.as_uuid()],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn insert_sync_log(&self, entry: &SyncLogEntry) -> Result<()> {
        self.client
            .execute(
                r#"
                INSERT INTO sync_logs (
                    id, sync_type, scope, operation, status, error_message,
                    started_at, completed_at, records_processed, practitioner_id
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
                &[
                    &entry.id.as_uuid(),
                    &entry.sync_type.as_str(),
                    &entry.scope.as_str(),
                    &entry.operation,
                    &entry.status.as_str(),
                    &entry.error_message,
                    &entry.started_at,
                    &entry.completed_at,
                    &entry.records_processed,
                    &entry.practitioner_id.map(|id| id.as_uuid()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn update_sync_log(&self, entry: &SyncLogEntry) -> Result<()> {
        self.client
            .execute(
                r#"
                UPDATE sync_logs SET
                    status = $2,
                    error_message = $3,
                    completed_at = $4,
                    records_processed = $5,
                    practitioner_id = COALESCE($6, practitioner_id)
                WHERE id = $1
                "#,
                &[
                    &entry.id.as_uuid(),
                    &entry.status.as_str(),
                    &entry.error_message,
                    &entry.completed_at,
                    &entry.records_processed,
                    &entry.practitioner_id.map(|id| id.as_uuid()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn last_completed_full_sync(
        &self,
        practitioner_id: PractitionerId,
    ) -> Result<Option<SyncLogEntry>> {
        let row = self
            .client
            .query_opt(
                "SELECT * FROM sync_logs \
                 WHERE practitioner_id = $1 AND sync_type = 'full' AND status = 'success' \
                 ORDER BY completed_at DESC NULLS LAST LIMIT 1",
                &[&practitioner_id.as_uuid()],
            )
            .await?;
        row.as_ref().map(row_to_sync_log).transpose()
    }

    async fn last_incremental_sync(
        &self,
        practitioner_id: PractitionerId,
    ) -> Result<Option<SyncLogEntry>> {
        let row = self
            .client
            .query_opt(
                "SELECT * FROM sync_logs \
                 WHERE practitioner_id = $1 AND sync_type IN ('incremental', 'webhook') \
                 ORDER BY started_at DESC LIMIT 1",
                &[&practitioner_id.as_uuid()],
            )
            .await?;
        row.as_ref().map(row_to_sync_log).transpose()
    }

    async fn last_error_entry(
        &self,
        practitioner_id: PractitionerId,
    ) -> Result<Option<SyncLogEntry>> {
        let row = self
            .client
            .query_opt(
                "SELECT * FROM sync_logs \
                 WHERE practitioner_id = $1 AND status = 'error' \
                 ORDER BY COALESCE(completed_at, started_at) DESC LIMIT 1",
                &[&practitioner_id.as_uuid()],
            )
            .await?;
        row.as_ref().map(row_to_sync_log).transpose()
    }
}
