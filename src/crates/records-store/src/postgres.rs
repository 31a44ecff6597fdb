//! Postgres-backed [`Store`].
//!
//! Follows the teacher's `orca::db`/`orca::db::manager` pool-wrapper idiom:
//! one `PgPool`, migrations run once at startup via `sqlx::migrate!`, and a
//! thin `PgStore` newtype around the pool. Unlike the teacher's SQLite
//! default, this store requires Postgres specifically for
//! `pg_try_advisory_lock`/`pg_advisory_unlock`, which back
//! `acquire_case_lock`/`release_case_lock` — SQLite has no equivalent
//! session-scoped advisory lock primitive.
//!
//! Entity structs are persisted as a handful of scalar columns plus JSONB
//! for the nested collections (`constraints`, `scope_items`, `reasoning`,
//! ...), mirroring how `orchestrator`'s repositories store workflow/task
//! metadata.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use records_core::*;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::error::{Result, StoreError};
use crate::traits::{ProposalUpsert, Store};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Runs the embedded migration set. Safe to call on every boot; `sqlx`
    /// tracks which migrations already applied.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    fn case_from_row(row: &sqlx::postgres::PgRow) -> Result<Case> {
        let constraints: Vec<String> =
            serde_json::from_value(row.try_get("constraints")?).unwrap_or_default();
        let scope_items: Vec<ScopeItem> =
            serde_json::from_value(row.try_get("scope_items")?).unwrap_or_default();
        let status: String = row.try_get("status")?;
        let autopilot_mode: String = row.try_get("autopilot_mode")?;
        let pause_reason: Option<String> = row.try_get("pause_reason")?;
        Ok(Case {
            id: CaseId(row.try_get("id")?),
            agency: AgencyIdentity {
                name: row.try_get("agency_name")?,
                email: row.try_get("agency_email")?,
                portal_url: row.try_get("portal_url")?,
                portal_provider: row.try_get("portal_provider")?,
            },
            jurisdiction_code: row.try_get("jurisdiction_code")?,
            status: parse_enum(&status)?,
            substatus: row.try_get("substatus")?,
            pause_reason: pause_reason.map(|p| parse_enum(&p)).transpose()?,
            constraints: constraints.into_iter().collect::<BTreeSet<_>>(),
            scope_items,
            next_due_at: row.try_get("next_due_at")?,
            autopilot_mode: parse_enum(&autopilot_mode)?,
            portal: PortalBookkeeping {
                last_portal_status: row.try_get("last_portal_status")?,
                last_portal_submitted_at: row.try_get("last_portal_submitted_at")?,
                last_portal_error: row.try_get("last_portal_error")?,
            },
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// JSON round-trip through the `serde(rename_all = ...)` closed enums
/// rather than hand-writing a `FromStr` per enum; every enum in
/// `records-core` derives `Deserialize`, so this is a one-line adapter.
fn parse_enum<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(StoreError::Serialization)
}

fn enum_to_string<T: serde::Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_case(&self, case_id: CaseId) -> Result<Case> {
        let row = sqlx::query("SELECT * FROM cases WHERE id = $1")
            .bind(case_id.0)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("case {case_id}")))?;
        Self::case_from_row(&row)
    }

    async fn save_case(&self, case: &Case) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cases (
                id, agency_name, agency_email, portal_url, portal_provider,
                jurisdiction_code, status, substatus, pause_reason, constraints,
                scope_items, next_due_at, autopilot_mode, last_portal_status,
                last_portal_submitted_at, last_portal_error, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, now())
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                substatus = EXCLUDED.substatus,
                pause_reason = EXCLUDED.pause_reason,
                constraints = EXCLUDED.constraints,
                scope_items = EXCLUDED.scope_items,
                next_due_at = EXCLUDED.next_due_at,
                autopilot_mode = EXCLUDED.autopilot_mode,
                last_portal_status = EXCLUDED.last_portal_status,
                last_portal_submitted_at = EXCLUDED.last_portal_submitted_at,
                last_portal_error = EXCLUDED.last_portal_error,
                updated_at = now()
            "#,
        )
        .bind(case.id.0)
        .bind(&case.agency.name)
        .bind(&case.agency.email)
        .bind(&case.agency.portal_url)
        .bind(&case.agency.portal_provider)
        .bind(&case.jurisdiction_code)
        .bind(enum_to_string(&case.status)?)
        .bind(&case.substatus)
        .bind(case.pause_reason.map(|p| enum_to_string(&p)).transpose()?)
        .bind(serde_json::to_value(&case.constraints)?)
        .bind(serde_json::to_value(&case.scope_items)?)
        .bind(case.next_due_at)
        .bind(enum_to_string(&case.autopilot_mode)?)
        .bind(&case.portal.last_portal_status)
        .bind(case.portal.last_portal_submitted_at)
        .bind(&case.portal.last_portal_error)
        .bind(case.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_message(&self, message_id: MessageId) -> Result<Message> {
        let row = sqlx::query_as::<_, MessageRow>("SELECT * FROM messages WHERE id = $1")
            .bind(message_id.0)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("message {message_id}")))?;
        row.try_into()
    }

    async fn list_messages(&self, case_id: CaseId, limit: usize) -> Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM messages WHERE case_id = $1 ORDER BY COALESCE(received_at, sent_at) DESC LIMIT $2",
        )
        .bind(case_id.0)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        let mut messages: Vec<Message> = rows.into_iter().map(TryInto::try_into).collect::<Result<_>>()?;
        messages.reverse();
        Ok(messages)
    }

    async fn ingest_inbound_message(&self, message: Message) -> Result<Message> {
        if let Some(provider_id) = &message.provider_message_id {
            if let Some(row) = sqlx::query_as::<_, MessageRow>(
                "SELECT * FROM messages WHERE case_id = $1 AND provider_message_id = $2",
            )
            .bind(message.case_id.0)
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await?
            {
                return row.try_into();
            }
        }
        self.save_outbound_message(message).await
    }

    async fn save_outbound_message(&self, message: Message) -> Result<Message> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (
                case_id, direction, provider_message_id, rfc2822_id, subject,
                body_text, body_html, message_type, sent_at, received_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(message.case_id.0)
        .bind(enum_to_string(&message.direction)?)
        .bind(&message.provider_message_id)
        .bind(&message.rfc2822_id)
        .bind(&message.subject)
        .bind(&message.body_text)
        .bind(&message.body_html)
        .bind(&message.message_type)
        .bind(message.sent_at)
        .bind(message.received_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn mark_message_processed(
        &self,
        message_id: MessageId,
        run_id: RunId,
        processed_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE messages SET processed_run_id = $2, processed_at = $3 WHERE id = $1 AND processed_run_id IS NULL",
        )
        .bind(message_id.0)
        .bind(run_id.0)
        .bind(processed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_analysis(&self, analysis: &ResponseAnalysis) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO response_analyses (
                message_id, classification, confidence, sentiment, extracted_fee_amount,
                extracted_deadline, constraints_to_add, scope_updates, key_points,
                requires_action, suggested_action
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (message_id) DO UPDATE SET
                classification = EXCLUDED.classification,
                confidence = EXCLUDED.confidence,
                sentiment = EXCLUDED.sentiment,
                extracted_fee_amount = EXCLUDED.extracted_fee_amount,
                extracted_deadline = EXCLUDED.extracted_deadline,
                constraints_to_add = EXCLUDED.constraints_to_add,
                scope_updates = EXCLUDED.scope_updates,
                key_points = EXCLUDED.key_points,
                requires_action = EXCLUDED.requires_action,
                suggested_action = EXCLUDED.suggested_action
            "#,
        )
        .bind(analysis.message_id.0)
        .bind(enum_to_string(&analysis.classification)?)
        .bind(analysis.confidence)
        .bind(enum_to_string(&analysis.sentiment)?)
        .bind(analysis.extracted_fee_amount)
        .bind(analysis.extracted_deadline)
        .bind(serde_json::to_value(&analysis.constraints_to_add)?)
        .bind(serde_json::to_value(&analysis.scope_updates)?)
        .bind(serde_json::to_value(&analysis.key_points)?)
        .bind(analysis.requires_action)
        .bind(analysis.suggested_action.map(|a| enum_to_string(&a)).transpose()?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_latest_analysis(&self, case_id: CaseId) -> Result<Option<ResponseAnalysis>> {
        let row = sqlx::query(
            r#"
            SELECT ra.* FROM response_analyses ra
            JOIN messages m ON m.id = ra.message_id
            WHERE m.case_id = $1
            ORDER BY ra.message_id DESC
            LIMIT 1
            "#,
        )
        .bind(case_id.0)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else { return Ok(None) };
        let constraints_to_add: Vec<String> = serde_json::from_value(row.try_get("constraints_to_add")?)?;
        let scope_updates: Vec<ScopeItem> = serde_json::from_value(row.try_get("scope_updates")?)?;
        let key_points: Vec<String> = serde_json::from_value(row.try_get("key_points")?)?;
        let classification: String = row.try_get("classification")?;
        let sentiment: String = row.try_get("sentiment")?;
        let suggested_action: Option<String> = row.try_get("suggested_action")?;
        Ok(Some(ResponseAnalysis {
            message_id: MessageId(row.try_get("message_id")?),
            classification: parse_enum(&classification)?,
            confidence: row.try_get("confidence")?,
            sentiment: parse_enum(&sentiment)?,
            extracted_fee_amount: row.try_get("extracted_fee_amount")?,
            extracted_deadline: row.try_get("extracted_deadline")?,
            constraints_to_add,
            scope_updates,
            key_points,
            requires_action: row.try_get("requires_action")?,
            suggested_action: suggested_action.map(|a| parse_enum(&a)).transpose()?,
        }))
    }

    async fn upsert_proposal(&self, fields: ProposalUpsert) -> Result<Proposal> {
        let row = sqlx::query(
            r#"
            INSERT INTO proposals (
                case_id, run_id, trigger_message_id, action_type, draft_subject,
                draft_body_text, draft_body_html, reasoning, confidence, risk_flags,
                warnings, can_auto_execute, requires_human, status, proposal_key,
                adjustment_count
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (proposal_key) DO UPDATE SET
                action_type = CASE WHEN proposals.status = 'EXECUTED' THEN proposals.action_type ELSE EXCLUDED.action_type END,
                draft_subject = CASE WHEN proposals.status = 'EXECUTED' THEN proposals.draft_subject ELSE EXCLUDED.draft_subject END,
                draft_body_text = CASE WHEN proposals.status = 'EXECUTED' THEN proposals.draft_body_text ELSE EXCLUDED.draft_body_text END,
                draft_body_html = CASE WHEN proposals.status = 'EXECUTED' THEN proposals.draft_body_html ELSE EXCLUDED.draft_body_html END,
                reasoning = CASE WHEN proposals.status = 'EXECUTED' THEN proposals.reasoning ELSE EXCLUDED.reasoning END,
                confidence = CASE WHEN proposals.status = 'EXECUTED' THEN proposals.confidence ELSE EXCLUDED.confidence END,
                risk_flags = CASE WHEN proposals.status = 'EXECUTED' THEN proposals.risk_flags ELSE EXCLUDED.risk_flags END,
                warnings = CASE WHEN proposals.status = 'EXECUTED' THEN proposals.warnings ELSE EXCLUDED.warnings END,
                can_auto_execute = CASE WHEN proposals.status = 'EXECUTED' THEN proposals.can_auto_execute ELSE EXCLUDED.can_auto_execute END,
                requires_human = CASE WHEN proposals.status = 'EXECUTED' THEN proposals.requires_human ELSE EXCLUDED.requires_human END,
                status = CASE WHEN proposals.status = 'EXECUTED' THEN proposals.status ELSE EXCLUDED.status END,
                adjustment_count = CASE WHEN proposals.status = 'EXECUTED' THEN proposals.adjustment_count ELSE EXCLUDED.adjustment_count END
            RETURNING *
            "#,
        )
        .bind(fields.case_id.0)
        .bind(fields.run_id.0)
        .bind(fields.trigger_message_id.map(|m| m.0))
        .bind(enum_to_string(&fields.action_type)?)
        .bind(&fields.draft.subject)
        .bind(&fields.draft.body_text)
        .bind(&fields.draft.body_html)
        .bind(serde_json::to_value(&fields.reasoning)?)
        .bind(fields.confidence)
        .bind(serde_json::to_value(&fields.risk_flags)?)
        .bind(serde_json::to_value(&fields.warnings)?)
        .bind(fields.can_auto_execute)
        .bind(fields.requires_human)
        .bind(enum_to_string(&fields.status)?)
        .bind(&fields.proposal_key)
        .bind(fields.adjustment_count)
        .fetch_one(&self.pool)
        .await?;
        proposal_from_row(&row)
    }

    async fn get_proposal(&self, proposal_id: ProposalId) -> Result<Proposal> {
        let row = sqlx::query("SELECT * FROM proposals WHERE id = $1")
            .bind(proposal_id.0)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("proposal {proposal_id}")))?;
        proposal_from_row(&row)
    }

    async fn get_latest_pending_proposal(&self, case_id: CaseId) -> Result<Option<Proposal>> {
        let row = sqlx::query(
            "SELECT * FROM proposals WHERE case_id = $1 AND status IN ('PENDING_APPROVAL', 'APPROVED') ORDER BY id DESC LIMIT 1",
        )
        .bind(case_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(proposal_from_row).transpose()
    }

    async fn claim_proposal_execution(
        &self,
        proposal_id: ProposalId,
        execution_key: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE proposals SET execution_key = $2 WHERE id = $1 AND execution_key IS NULL AND status <> 'EXECUTED'",
        )
        .bind(proposal_id.0)
        .bind(execution_key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_proposal_executed(
        &self,
        proposal_id: ProposalId,
        email_job_id: Option<String>,
        executed_at: DateTime<Utc>,
    ) -> Result<Proposal> {
        let row = sqlx::query(
            "UPDATE proposals SET status = 'EXECUTED', executed_at = $2, email_job_id = COALESCE($3, email_job_id) WHERE id = $1 RETURNING *",
        )
        .bind(proposal_id.0)
        .bind(executed_at)
        .bind(email_job_id)
        .fetch_one(&self.pool)
        .await?;
        proposal_from_row(&row)
    }

    async fn set_proposal_human_decision(
        &self,
        proposal_id: ProposalId,
        decision: HumanDecision,
    ) -> Result<Proposal> {
        let row = sqlx::query("UPDATE proposals SET human_decision = $2 WHERE id = $1 RETURNING *")
            .bind(proposal_id.0)
            .bind(serde_json::to_value(&decision)?)
            .fetch_one(&self.pool)
            .await?;
        proposal_from_row(&row)
    }

    async fn count_dismissed_actions(&self, case_id: CaseId) -> Result<HashMap<ActionType, i32>> {
        let rows = sqlx::query(
            "SELECT action_type, COUNT(*) as n FROM proposals WHERE case_id = $1 AND status = 'DISMISSED' GROUP BY action_type",
        )
        .bind(case_id.0)
        .fetch_all(&self.pool)
        .await?;
        let mut counts = HashMap::new();
        for row in rows {
            let action: String = row.try_get("action_type")?;
            let n: i64 = row.try_get("n")?;
            counts.insert(parse_enum(&action)?, n as i32);
        }
        Ok(counts)
    }

    async fn create_run(&self, run: AgentRun) -> Result<AgentRun> {
        let row = sqlx::query(
            r#"
            INSERT INTO agent_runs (case_id, trigger_type, status, started_at, iteration_count, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(run.case_id.0)
        .bind(enum_to_string(&run.trigger_type)?)
        .bind(enum_to_string(&run.status)?)
        .bind(run.started_at)
        .bind(run.iteration_count)
        .bind(&run.metadata)
        .fetch_one(&self.pool)
        .await?;
        run_from_row(&row)
    }

    async fn save_run(&self, run: &AgentRun) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE agent_runs SET status = $2, ended_at = $3, current_node = $4,
                iteration_count = $5, error = $6, metadata = $7
            WHERE id = $1
            "#,
        )
        .bind(run.id.0)
        .bind(enum_to_string(&run.status)?)
        .bind(run.ended_at)
        .bind(&run.current_node)
        .bind(run.iteration_count)
        .bind(&run.error)
        .bind(&run.metadata)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_run(&self, run_id: RunId) -> Result<AgentRun> {
        let row = sqlx::query("SELECT * FROM agent_runs WHERE id = $1")
            .bind(run_id.0)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("run {run_id}")))?;
        run_from_row(&row)
    }

    async fn has_active_run(&self, case_id: CaseId) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as n FROM agent_runs WHERE case_id = $1 AND status IN ('created','queued','running','paused_awaiting_human')",
        )
        .bind(case_id.0)
        .fetch_one(&self.pool)
        .await?;
        let n: i64 = row.try_get("n")?;
        Ok(n > 0)
    }

    async fn get_followup_schedule(&self, case_id: CaseId) -> Result<Option<FollowUpSchedule>> {
        let row = sqlx::query("SELECT * FROM followup_schedules WHERE case_id = $1")
            .bind(case_id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(followup_from_row).transpose()
    }

    async fn upsert_followup_schedule(
        &self,
        case_id: CaseId,
        sent_at: DateTime<Utc>,
        next_followup_date: Option<DateTime<Utc>>,
    ) -> Result<FollowUpSchedule> {
        let row = sqlx::query(
            r#"
            INSERT INTO followup_schedules (case_id, followup_count, last_followup_sent_at, next_followup_date, status)
            VALUES ($1, 1, $2, $3, 'active')
            ON CONFLICT (case_id) DO UPDATE SET
                followup_count = followup_schedules.followup_count + 1,
                last_followup_sent_at = EXCLUDED.last_followup_sent_at,
                next_followup_date = EXCLUDED.next_followup_date
            RETURNING *
            "#,
        )
        .bind(case_id.0)
        .bind(sent_at)
        .bind(next_followup_date)
        .fetch_one(&self.pool)
        .await?;
        followup_from_row(&row)
    }

    async fn upsert_escalation(
        &self,
        case_id: CaseId,
        reason: &str,
        urgency: &str,
        suggested_action: Option<String>,
    ) -> Result<(Escalation, bool)> {
        // Postgres has no immutable-predicate partial unique index on a
        // rolling `now() - interval` window, so the dedup check is a
        // select-then-insert inside one transaction rather than an
        // `ON CONFLICT` clause.
        let mut tx = self.pool.begin().await?;
        let existing = sqlx::query(
            r#"
            SELECT * FROM escalations
            WHERE case_id = $1 AND reason = $2
              AND created_at > now() - (make_interval(secs => $3))
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(case_id.0)
        .bind(reason)
        .bind(records_core::ESCALATION_DEDUP_WINDOW_SECS as f64)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(row) = existing {
            let escalation = escalation_from_row(&row)?;
            tx.commit().await?;
            return Ok((escalation, false));
        }

        let row = sqlx::query(
            r#"
            INSERT INTO escalations (case_id, reason, urgency, suggested_action, created_at, notified)
            VALUES ($1, $2, $3, $4, now(), false)
            RETURNING *
            "#,
        )
        .bind(case_id.0)
        .bind(reason)
        .bind(urgency)
        .bind(suggested_action)
        .fetch_one(&mut *tx)
        .await?;
        let escalation = escalation_from_row(&row)?;
        tx.commit().await?;
        Ok((escalation, true))
    }

    async fn create_portal_task(&self, case_id: CaseId, proposal_id: ProposalId) -> Result<PortalTask> {
        let row = sqlx::query(
            "INSERT INTO portal_tasks (case_id, proposal_id, status) VALUES ($1, $2, 'PENDING') RETURNING *",
        )
        .bind(case_id.0)
        .bind(proposal_id.0)
        .fetch_one(&self.pool)
        .await?;
        let status: String = row.try_get("status")?;
        Ok(PortalTask {
            id: PortalTaskId(row.try_get("id")?),
            case_id,
            proposal_id,
            status: parse_enum(&status)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn create_execution_record(&self, record: ExecutionRecord) -> Result<ExecutionRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO execution_records (proposal_id, execution_key, action_type, channel, status, created_at, detail)
            VALUES ($1, $2, $3, $4, $5, now(), $6)
            RETURNING *
            "#,
        )
        .bind(record.proposal_id.0)
        .bind(&record.execution_key)
        .bind(enum_to_string(&record.action_type)?)
        .bind(enum_to_string(&record.channel)?)
        .bind(enum_to_string(&record.status)?)
        .bind(&record.detail)
        .fetch_one(&self.pool)
        .await?;
        let action_type: String = row.try_get("action_type")?;
        let channel: String = row.try_get("channel")?;
        let status: String = row.try_get("status")?;
        Ok(ExecutionRecord {
            id: ExecutionRecordId(row.try_get("id")?),
            proposal_id: record.proposal_id,
            execution_key: record.execution_key,
            action_type: parse_enum(&action_type)?,
            channel: parse_enum(&channel)?,
            status: parse_enum(&status)?,
            created_at: row.try_get("created_at")?,
            detail: record.detail,
        })
    }

    async fn save_decision_trace(&self, trace: DecisionTrace) -> Result<DecisionTrace> {
        let row = sqlx::query(
            r#"
            INSERT INTO decision_traces (run_id, case_id, classification, router_output, node_trace, gate_decision, timings_ms, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now())
            RETURNING id, created_at
            "#,
        )
        .bind(trace.run_id.0)
        .bind(trace.case_id.0)
        .bind(trace.classification.map(|c| enum_to_string(&c)).transpose()?)
        .bind(&trace.router_output)
        .bind(serde_json::to_value(&trace.node_trace)?)
        .bind(&trace.gate_decision)
        .bind(&trace.timings_ms)
        .fetch_one(&self.pool)
        .await?;
        Ok(DecisionTrace {
            id: DecisionTraceId(row.try_get("id")?),
            created_at: row.try_get("created_at")?,
            ..trace
        })
    }

    async fn acquire_case_lock(&self, case_id: CaseId) -> Result<bool> {
        let row = sqlx::query("SELECT pg_try_advisory_lock(hashtext($1)) as acquired")
            .bind(format!("case:{case_id}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("acquired")?)
    }

    async fn release_case_lock(&self, case_id: CaseId) -> Result<()> {
        sqlx::query("SELECT pg_advisory_unlock(hashtext($1))")
            .bind(format!("case:{case_id}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_proposal_status(&self, proposal_id: ProposalId, status: ProposalStatus) -> Result<Proposal> {
        let row = sqlx::query(
            "UPDATE proposals SET status = CASE WHEN status = 'EXECUTED' THEN status ELSE $2 END WHERE id = $1 RETURNING *",
        )
        .bind(proposal_id.0)
        .bind(enum_to_string(&status)?)
        .fetch_one(&self.pool)
        .await?;
        proposal_from_row(&row)
    }

    async fn find_case_id_by_rfc2822_id(&self, rfc2822_id: &str) -> Result<Option<CaseId>> {
        let row = sqlx::query("SELECT case_id FROM messages WHERE rfc2822_id = $1 LIMIT 1")
            .bind(rfc2822_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Ok(CaseId(r.try_get("case_id")?))).transpose()
    }

    async fn find_case_id_by_agency_email(&self, email: &str) -> Result<Option<CaseId>> {
        let row = sqlx::query("SELECT id FROM cases WHERE lower(agency_email) = lower($1) LIMIT 1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Ok(CaseId(r.try_get("id")?))).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: i64,
    case_id: i64,
    direction: String,
    provider_message_id: Option<String>,
    rfc2822_id: Option<String>,
    subject: Option<String>,
    body_text: Option<String>,
    body_html: Option<String>,
    message_type: Option<String>,
    sent_at: Option<DateTime<Utc>>,
    received_at: Option<DateTime<Utc>>,
    processed_at: Option<DateTime<Utc>>,
    processed_run_id: Option<i64>,
    last_error: Option<String>,
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(Message {
            id: MessageId(row.id),
            case_id: CaseId(row.case_id),
            direction: parse_enum(&row.direction)?,
            provider_message_id: row.provider_message_id,
            rfc2822_id: row.rfc2822_id,
            subject: row.subject,
            body_text: row.body_text,
            body_html: row.body_html,
            message_type: row.message_type,
            sent_at: row.sent_at,
            received_at: row.received_at,
            processed_at: row.processed_at,
            processed_run_id: row.processed_run_id.map(RunId),
            last_error: row.last_error,
        })
    }
}

fn proposal_from_row(row: &sqlx::postgres::PgRow) -> Result<Proposal> {
    let action_type: String = row.try_get("action_type")?;
    let status: String = row.try_get("status")?;
    let reasoning: Vec<String> = serde_json::from_value(row.try_get("reasoning")?)?;
    let risk_flags: Vec<RiskFlag> = serde_json::from_value(row.try_get("risk_flags")?)?;
    let warnings: Vec<String> = serde_json::from_value(row.try_get("warnings")?)?;
    let human_decision: Option<serde_json::Value> = row.try_get("human_decision")?;
    Ok(Proposal {
        id: ProposalId(row.try_get("id")?),
        case_id: CaseId(row.try_get("case_id")?),
        run_id: RunId(row.try_get("run_id")?),
        trigger_message_id: row.try_get::<Option<i64>, _>("trigger_message_id")?.map(MessageId),
        action_type: parse_enum(&action_type)?,
        draft: Draft {
            subject: row.try_get("draft_subject")?,
            body_text: row.try_get("draft_body_text")?,
            body_html: row.try_get("draft_body_html")?,
        },
        reasoning,
        confidence: row.try_get("confidence")?,
        risk_flags,
        warnings,
        can_auto_execute: row.try_get("can_auto_execute")?,
        requires_human: row.try_get("requires_human")?,
        status: parse_enum(&status)?,
        proposal_key: row.try_get("proposal_key")?,
        execution_key: row.try_get("execution_key")?,
        email_job_id: row.try_get("email_job_id")?,
        adjustment_count: row.try_get("adjustment_count")?,
        human_decision: human_decision.map(serde_json::from_value).transpose()?,
        executed_at: row.try_get("executed_at")?,
    })
}

fn run_from_row(row: &sqlx::postgres::PgRow) -> Result<AgentRun> {
    let trigger_type: String = row.try_get("trigger_type")?;
    let status: String = row.try_get("status")?;
    Ok(AgentRun {
        id: RunId(row.try_get("id")?),
        case_id: CaseId(row.try_get("case_id")?),
        trigger_type: parse_enum(&trigger_type)?,
        status: parse_enum(&status)?,
        started_at: row.try_get("started_at")?,
        ended_at: row.try_get("ended_at")?,
        current_node: row.try_get("current_node")?,
        iteration_count: row.try_get("iteration_count")?,
        error: row.try_get("error")?,
        metadata: row.try_get("metadata")?,
    })
}

fn followup_from_row(row: &sqlx::postgres::PgRow) -> Result<FollowUpSchedule> {
    Ok(FollowUpSchedule {
        case_id: CaseId(row.try_get("case_id")?),
        next_followup_date: row.try_get("next_followup_date")?,
        followup_count: row.try_get("followup_count")?,
        last_followup_sent_at: row.try_get("last_followup_sent_at")?,
        status: row.try_get("status")?,
    })
}

fn escalation_from_row(row: &sqlx::postgres::PgRow) -> Result<Escalation> {
    Ok(Escalation {
        id: EscalationId(row.try_get("id")?),
        case_id: CaseId(row.try_get("case_id")?),
        reason: row.try_get("reason")?,
        urgency: row.try_get("urgency")?,
        suggested_action: row.try_get("suggested_action")?,
        created_at: row.try_get("created_at")?,
        notified: row.try_get("notified")?,
    })
}
