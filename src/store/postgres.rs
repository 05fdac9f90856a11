//! Postgres-backed [`LeadStore`].
//!
//! Queries are built at runtime (`sqlx::query_as` over `FromRow` row types)
//! so the crate builds without a live database. Enum-like columns are TEXT
//! and are converted into model enums when rows are loaded.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::debug;

use super::{LeadStore, StoreError, StoreResult, StoreTransaction};
use crate::models::{
    AssignmentCursor, Campaign, CampaignAssignee, CampaignOption, ExportRule, Lead,
    LeadAssignmentLog, NewLeadAssignmentLog, NewOutboundMessage, Source, SourceKind,
};
use crate::orchestration::error_classifier::ErrorCategory;

const LEAD_COLUMNS: &str = "id, phone, campaign_id, assigned_to, assigned_at, assignment_error, \
     intention, intention_status, intention_origin, automation_status, automation_attempts, \
     automation_error, automation_error_category, option_selected, last_automation_run_at, \
     created_at, updated_at";

const CAMPAIGN_COLUMNS: &str = "id, name, strategy, export_rule, auto_process_enabled, \
     direct_trigger_config, option_actions, fallback_action, whatsapp_source_id, \
     export_source_id, created_at, updated_at";

const OPTION_COLUMNS: &str = "id, campaign_id, option_key, action, source_id, template_id, \
     message, agent_id, delay_seconds, enabled, created_at, updated_at";

const ASSIGNEE_COLUMNS: &str = "id, campaign_id, user_id, is_active, sort_order, created_at";

const CURSOR_COLUMNS: &str = "campaign_id, current_index, last_assigned_at, created_at, updated_at";

const LOG_COLUMNS: &str = "id, lead_id, campaign_id, assigned_to, previous_assignee, trigger, \
     actor_id, cursor_index, created_at";

fn parse_column<T: std::str::FromStr>(
    table: &'static str,
    column: &'static str,
    value: String,
) -> StoreResult<T> {
    value
        .parse()
        .map_err(|_| StoreError::InvalidColumn { table, column, value })
}

#[derive(Debug, FromRow)]
struct LeadRow {
    id: i64,
    phone: String,
    campaign_id: Option<i64>,
    assigned_to: Option<i64>,
    assigned_at: Option<DateTime<Utc>>,
    assignment_error: Option<String>,
    intention: Option<String>,
    intention_status: String,
    intention_origin: Option<String>,
    automation_status: String,
    automation_attempts: i32,
    automation_error: Option<String>,
    automation_error_category: Option<String>,
    option_selected: Option<String>,
    last_automation_run_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LeadRow> for Lead {
    type Error = StoreError;

    fn try_from(row: LeadRow) -> StoreResult<Self> {
        let automation_error_category = row
            .automation_error_category
            .map(|value| parse_column::<ErrorCategory>("leads", "automation_error_category", value))
            .transpose()?;

        Ok(Lead {
            id: row.id,
            phone: row.phone,
            campaign_id: row.campaign_id,
            assigned_to: row.assigned_to,
            assigned_at: row.assigned_at,
            assignment_error: row.assignment_error,
            intention: row.intention,
            intention_status: parse_column("leads", "intention_status", row.intention_status)?,
            intention_origin: row.intention_origin,
            automation_status: parse_column("leads", "automation_status", row.automation_status)?,
            automation_attempts: row.automation_attempts,
            automation_error: row.automation_error,
            automation_error_category,
            option_selected: row.option_selected,
            last_automation_run_at: row.last_automation_run_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CampaignRow {
    id: i64,
    name: String,
    strategy: String,
    export_rule: String,
    auto_process_enabled: bool,
    direct_trigger_config: Option<serde_json::Value>,
    option_actions: Option<serde_json::Value>,
    fallback_action: Option<String>,
    whatsapp_source_id: Option<i64>,
    export_source_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CampaignRow {
    fn into_campaign(self, options: Vec<CampaignOption>) -> StoreResult<Campaign> {
        Ok(Campaign {
            id: self.id,
            name: self.name,
            strategy: parse_column("campaigns", "strategy", self.strategy)?,
            export_rule: ExportRule::parse_lenient(&self.export_rule),
            auto_process_enabled: self.auto_process_enabled,
            direct_trigger_config: self.direct_trigger_config,
            option_actions: self.option_actions,
            fallback_action: self.fallback_action,
            whatsapp_source_id: self.whatsapp_source_id,
            export_source_id: self.export_source_id,
            options,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CampaignOptionRow {
    id: i64,
    campaign_id: i64,
    option_key: String,
    action: String,
    source_id: Option<i64>,
    template_id: Option<String>,
    message: Option<String>,
    agent_id: Option<String>,
    delay_seconds: i32,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CampaignOptionRow> for CampaignOption {
    fn from(row: CampaignOptionRow) -> Self {
        CampaignOption {
            id: row.id,
            campaign_id: row.campaign_id,
            option_key: row.option_key,
            action: row.action,
            source_id: row.source_id,
            template_id: row.template_id,
            message: row.message,
            agent_id: row.agent_id,
            delay_seconds: row.delay_seconds,
            enabled: row.enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct AssigneeRow {
    id: i64,
    campaign_id: i64,
    user_id: i64,
    is_active: bool,
    sort_order: i32,
    created_at: DateTime<Utc>,
}

impl From<AssigneeRow> for CampaignAssignee {
    fn from(row: AssigneeRow) -> Self {
        CampaignAssignee {
            id: row.id,
            campaign_id: row.campaign_id,
            user_id: row.user_id,
            is_active: row.is_active,
            sort_order: row.sort_order,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CursorRow {
    campaign_id: i64,
    current_index: i32,
    last_assigned_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CursorRow> for AssignmentCursor {
    fn from(row: CursorRow) -> Self {
        AssignmentCursor {
            campaign_id: row.campaign_id,
            current_index: row.current_index,
            last_assigned_at: row.last_assigned_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SourceRow {
    id: i64,
    kind: String,
    name: String,
    is_active: bool,
    settings: Option<serde_json::Value>,
}

impl From<SourceRow> for Source {
    fn from(row: SourceRow) -> Self {
        Source {
            id: row.id,
            kind: SourceKind::parse_lenient(&row.kind),
            name: row.name,
            is_active: row.is_active,
            settings: row.settings.unwrap_or(serde_json::Value::Null),
        }
    }
}

#[derive(Debug, FromRow)]
struct AssignmentLogRow {
    id: i64,
    lead_id: i64,
    campaign_id: Option<i64>,
    assigned_to: Option<i64>,
    previous_assignee: Option<i64>,
    trigger: String,
    actor_id: Option<i64>,
    cursor_index: Option<i32>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AssignmentLogRow> for LeadAssignmentLog {
    type Error = StoreError;

    fn try_from(row: AssignmentLogRow) -> StoreResult<Self> {
        Ok(LeadAssignmentLog {
            id: row.id,
            lead_id: row.lead_id,
            campaign_id: row.campaign_id,
            assigned_to: row.assigned_to,
            previous_assignee: row.previous_assignee,
            trigger: parse_column("lead_assignment_logs", "trigger", row.trigger)?,
            actor_id: row.actor_id,
            cursor_index: row.cursor_index,
            created_at: row.created_at,
        })
    }
}

/// Postgres lead store over a shared connection pool
#[derive(Debug, Clone)]
pub struct PostgresLeadStore {
    pool: PgPool,
}

impl PostgresLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LeadStore for PostgresLeadStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn find_lead(&self, lead_id: i64) -> StoreResult<Option<Lead>> {
        let sql = format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1");
        sqlx::query_as::<_, LeadRow>(&sql)
            .bind(lead_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Lead::try_from)
            .transpose()
    }

    async fn find_campaign(&self, campaign_id: i64) -> StoreResult<Option<Campaign>> {
        let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1");
        let Some(row) = sqlx::query_as::<_, CampaignRow>(&sql)
            .bind(campaign_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {OPTION_COLUMNS} FROM campaign_options WHERE campaign_id = $1 ORDER BY option_key"
        );
        let options = sqlx::query_as::<_, CampaignOptionRow>(&sql)
            .bind(campaign_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(CampaignOption::from)
            .collect();

        row.into_campaign(options).map(Some)
    }

    async fn find_source(&self, source_id: i64) -> StoreResult<Option<Source>> {
        let source = sqlx::query_as::<_, SourceRow>(
            "SELECT id, kind, name, is_active, settings FROM sources WHERE id = $1",
        )
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(source.map(Source::from))
    }

    async fn list_assignees(&self, campaign_id: i64) -> StoreResult<Vec<CampaignAssignee>> {
        let sql = format!(
            "SELECT {ASSIGNEE_COLUMNS} FROM campaign_assignees \
             WHERE campaign_id = $1 ORDER BY sort_order, id"
        );
        let rows = sqlx::query_as::<_, AssigneeRow>(&sql)
            .bind(campaign_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(CampaignAssignee::from).collect())
    }

    async fn find_cursor(&self, campaign_id: i64) -> StoreResult<Option<AssignmentCursor>> {
        let sql = format!("SELECT {CURSOR_COLUMNS} FROM assignment_cursors WHERE campaign_id = $1");
        let row = sqlx::query_as::<_, CursorRow>(&sql)
            .bind(campaign_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(AssignmentCursor::from))
    }

    async fn assignment_history(&self, lead_id: i64) -> StoreResult<Vec<LeadAssignmentLog>> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM lead_assignment_logs WHERE lead_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, AssignmentLogRow>(&sql)
            .bind(lead_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(LeadAssignmentLog::try_from)
            .collect()
    }

    async fn leads_needing_attention(
        &self,
        campaign_id: Option<i64>,
        limit: i64,
    ) -> StoreResult<Vec<Lead>> {
        let sql = format!(
            "SELECT {LEAD_COLUMNS} FROM leads \
             WHERE automation_status IN ('failed', 'skipped') \
               AND ($1::BIGINT IS NULL OR campaign_id = $1) \
             ORDER BY last_automation_run_at DESC NULLS LAST, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, LeadRow>(&sql)
            .bind(campaign_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Lead::try_from)
            .collect()
    }
}

struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn lock_lead(&mut self, lead_id: i64) -> StoreResult<Option<Lead>> {
        let sql = format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, LeadRow>(&sql)
            .bind(lead_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Lead::try_from)
            .transpose()
    }

    async fn update_lead(&mut self, lead: &Lead) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE leads SET
                campaign_id = $2,
                assigned_to = $3,
                assigned_at = $4,
                assignment_error = $5,
                intention = $6,
                intention_status = $7,
                intention_origin = $8,
                automation_status = $9,
                automation_attempts = $10,
                automation_error = $11,
                automation_error_category = $12,
                option_selected = $13,
                last_automation_run_at = $14,
                updated_at = $15
            WHERE id = $1
            "#,
        )
        .bind(lead.id)
        .bind(lead.campaign_id)
        .bind(lead.assigned_to)
        .bind(lead.assigned_at)
        .bind(&lead.assignment_error)
        .bind(&lead.intention)
        .bind(lead.intention_status.to_string())
        .bind(&lead.intention_origin)
        .bind(lead.automation_status.to_string())
        .bind(lead.automation_attempts)
        .bind(&lead.automation_error)
        .bind(lead.automation_error_category.map(|c| c.to_string()))
        .bind(&lead.option_selected)
        .bind(lead.last_automation_run_at)
        .bind(lead.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("lead", lead.id));
        }
        Ok(())
    }

    async fn active_assignees(&mut self, campaign_id: i64) -> StoreResult<Vec<CampaignAssignee>> {
        let sql = format!(
            "SELECT {ASSIGNEE_COLUMNS} FROM campaign_assignees \
             WHERE campaign_id = $1 AND is_active ORDER BY sort_order, id"
        );
        let rows = sqlx::query_as::<_, AssigneeRow>(&sql)
            .bind(campaign_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(CampaignAssignee::from).collect())
    }

    async fn lock_cursor(
        &mut self,
        campaign_id: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<AssignmentCursor> {
        sqlx::query(
            "INSERT INTO assignment_cursors (campaign_id, current_index, created_at, updated_at) \
             VALUES ($1, 0, $2, $2) ON CONFLICT (campaign_id) DO NOTHING",
        )
        .bind(campaign_id)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        let sql = format!(
            "SELECT {CURSOR_COLUMNS} FROM assignment_cursors WHERE campaign_id = $1 FOR UPDATE"
        );
        let row = sqlx::query_as::<_, CursorRow>(&sql)
            .bind(campaign_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(row.into())
    }

    async fn save_cursor(&mut self, cursor: &AssignmentCursor) -> StoreResult<()> {
        sqlx::query(
            "UPDATE assignment_cursors \
             SET current_index = $2, last_assigned_at = $3, updated_at = $4 \
             WHERE campaign_id = $1",
        )
        .bind(cursor.campaign_id)
        .bind(cursor.current_index)
        .bind(cursor.last_assigned_at)
        .bind(cursor.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn replace_assignees(
        &mut self,
        campaign_id: i64,
        user_ids: &[i64],
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<CampaignAssignee>> {
        let removed = sqlx::query(
            "DELETE FROM campaign_assignees WHERE campaign_id = $1 AND NOT (user_id = ANY($2))",
        )
        .bind(campaign_id)
        .bind(user_ids)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        for (position, user_id) in user_ids.iter().enumerate() {
            let sort_order = i32::try_from(position).unwrap_or(i32::MAX);
            sqlx::query(
                r#"
                INSERT INTO campaign_assignees (campaign_id, user_id, is_active, sort_order, created_at)
                VALUES ($1, $2, TRUE, $3, $4)
                ON CONFLICT (campaign_id, user_id)
                DO UPDATE SET is_active = TRUE, sort_order = EXCLUDED.sort_order
                "#,
            )
            .bind(campaign_id)
            .bind(user_id)
            .bind(sort_order)
            .bind(now)
            .execute(&mut *self.tx)
            .await?;
        }

        debug!(campaign_id, removed, kept = user_ids.len(), "Replaced campaign assignees");

        let sql = format!(
            "SELECT {ASSIGNEE_COLUMNS} FROM campaign_assignees \
             WHERE campaign_id = $1 ORDER BY sort_order, id"
        );
        let rows = sqlx::query_as::<_, AssigneeRow>(&sql)
            .bind(campaign_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(CampaignAssignee::from).collect())
    }

    async fn set_assignee_active(
        &mut self,
        campaign_id: i64,
        user_id: i64,
        is_active: bool,
    ) -> StoreResult<Option<CampaignAssignee>> {
        let sql = format!(
            "UPDATE campaign_assignees SET is_active = $3 \
             WHERE campaign_id = $1 AND user_id = $2 RETURNING {ASSIGNEE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AssigneeRow>(&sql)
            .bind(campaign_id)
            .bind(user_id)
            .bind(is_active)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(CampaignAssignee::from))
    }

    async fn append_assignment_log(
        &mut self,
        entry: &NewLeadAssignmentLog,
    ) -> StoreResult<LeadAssignmentLog> {
        let sql = format!(
            "INSERT INTO lead_assignment_logs \
             (lead_id, campaign_id, assigned_to, previous_assignee, trigger, actor_id, cursor_index, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {LOG_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AssignmentLogRow>(&sql)
            .bind(entry.lead_id)
            .bind(entry.campaign_id)
            .bind(entry.assigned_to)
            .bind(entry.previous_assignee)
            .bind(entry.trigger.to_string())
            .bind(entry.actor_id)
            .bind(entry.cursor_index)
            .bind(entry.created_at)
            .fetch_one(&mut *self.tx)
            .await?;
        row.try_into()
    }

    async fn record_outbound_message(&mut self, message: &NewOutboundMessage) -> StoreResult<bool> {
        let inserted = sqlx::query(
            "INSERT INTO outbound_messages (lead_id, source_id, provider_message_id, created_at) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (provider_message_id) DO NOTHING",
        )
        .bind(message.lead_id)
        .bind(message.source_id)
        .bind(&message.provider_message_id)
        .bind(message.created_at)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();
        Ok(inserted == 1)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
