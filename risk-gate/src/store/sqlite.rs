//! SQLite implementation of every store trait.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::{schema, IdentityStore, KnowledgeBase, OverrideApplied, ProposalStore, RunStore};
use crate::error::{Result, RiskGateError};
use crate::types::{
    GateStatus, KnowledgeBaseClause, NewRiskGateRun, OverrideRecord, Proposal, ProposalFilter,
    RiskGateRun,
};

const RUN_COLUMNS: &str = "id, proposal_id, requested_by, status, risk_score, findings, \
     kb_citations, redaction_summary, risk_audit, created_at, overridden, override_reason, overridden_by, \
     overridden_at";

const PROPOSAL_COLUMNS: &str =
    "id, title, client, client_email, content, sections, template_key, owner";

/// SQLite-backed proposal, run, identity and knowledge-base store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database file.
    pub fn open(path: &Path) -> Result<Self> {
        info!("Opening SQLite database at {:?}", path);

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        schema::init_schema(&conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RiskGateError::Storage(format!("Lock poisoned: {}", e)))
    }

    /// Insert a proposal and return its id. A zero `id` lets SQLite assign one.
    pub fn insert_proposal(&self, proposal: &Proposal) -> Result<i64> {
        let conn = self.lock()?;
        let sections = proposal
            .sections
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let id = (proposal.id > 0).then_some(proposal.id);

        conn.execute(
            "INSERT INTO proposals (id, title, client, client_email, content, sections, template_key, owner)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                proposal.title,
                proposal.client,
                proposal.client_email,
                proposal.content,
                sections,
                proposal.template_key,
                proposal.owner,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(proposal_id = id, "Inserted proposal");
        Ok(id)
    }

    /// Create or replace an actor's role.
    pub fn upsert_user(&self, actor: &str, role: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (actor, role) VALUES (?1, ?2)
             ON CONFLICT(actor) DO UPDATE SET role = excluded.role",
            params![actor, role],
        )?;
        Ok(())
    }
}

#[async_trait]
impl ProposalStore for SqliteStore {
    async fn get_proposal(&self, proposal_id: i64) -> Result<Option<Proposal>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM proposals WHERE id = ?", PROPOSAL_COLUMNS);
        let row = conn
            .query_row(&sql, params![proposal_id], ProposalRow::from_row)
            .optional()?;
        row.map(ProposalRow::into_proposal).transpose()
    }

    async fn list_proposals(&self, filter: &ProposalFilter) -> Result<Vec<Proposal>> {
        let mut sql = format!("SELECT {} FROM proposals", PROPOSAL_COLUMNS);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![];
        let mut conditions = vec![];

        if let Some(ref ids) = filter.proposal_ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders: Vec<_> = ids.iter().map(|_| "?").collect();
            conditions.push(format!("id IN ({})", placeholders.join(", ")));
            for id in ids {
                params.push(Box::new(*id));
            }
        }

        if let Some(ref owner) = filter.owner {
            conditions.push("owner = ?".to_string());
            params.push(Box::new(owner.clone()));
        }

        if let Some(ref template_key) = filter.template_key {
            conditions.push("template_key = ?".to_string());
            params.push(Box::new(template_key.clone()));
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY id");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), ProposalRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(ProposalRow::into_proposal).collect()
    }
}

#[async_trait]
impl RunStore for SqliteStore {
    async fn insert_run(&self, run: NewRiskGateRun) -> Result<RiskGateRun> {
        let created_at = Utc::now();
        let findings = serde_json::to_string(&run.findings)?;
        let citations = serde_json::to_string(&run.kb_citations)?;
        let redaction = serde_json::to_string(&run.redaction_summary)?;
        let audit = run.risk_audit.as_ref().map(serde_json::to_string).transpose()?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO risk_gate_runs
                (proposal_id, requested_by, status, risk_score, findings, kb_citations,
                 redaction_summary, risk_audit, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run.proposal_id,
                run.requested_by,
                run.status.as_str(),
                run.risk_score,
                findings,
                citations,
                redaction,
                audit,
                format_timestamp(&created_at),
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(RiskGateRun {
            id,
            proposal_id: run.proposal_id,
            requested_by: run.requested_by,
            status: run.status,
            risk_score: run.risk_score,
            findings: run.findings,
            kb_citations: run.kb_citations,
            redaction_summary: run.redaction_summary,
            risk_audit: run.risk_audit,
            created_at,
            overridden: false,
            override_reason: None,
            overridden_by: None,
            overridden_at: None,
        })
    }

    async fn get_run(&self, run_id: i64) -> Result<Option<RiskGateRun>> {
        let conn = self.lock()?;
        query_run(&conn, run_id)
    }

    async fn latest_run(&self, proposal_id: i64) -> Result<Option<RiskGateRun>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM risk_gate_runs WHERE proposal_id = ?
             ORDER BY created_at DESC, id DESC LIMIT 1",
            RUN_COLUMNS
        );
        let row = conn
            .query_row(&sql, params![proposal_id], RunRow::from_row)
            .optional()?;
        row.map(RunRow::into_run).transpose()
    }

    async fn apply_override(
        &self,
        run_id: i64,
        reason: &str,
        actor: &str,
    ) -> Result<OverrideApplied> {
        let approved_at = Utc::now();
        let timestamp = format_timestamp(&approved_at);

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE risk_gate_runs
             SET overridden = 1, override_reason = ?1, overridden_by = ?2, overridden_at = ?3
             WHERE id = ?4 AND overridden = 0",
            params![reason, actor, timestamp, run_id],
        )?;

        if updated == 0 {
            tx.rollback()?;
            return match query_override(&conn, run_id)? {
                Some(existing) => Ok(OverrideApplied::AlreadyOverridden(existing)),
                None if query_run(&conn, run_id)?.is_none() => Err(RiskGateError::NotFound {
                    entity: "Risk Gate run",
                    id: run_id,
                }),
                None => Err(RiskGateError::Storage(format!(
                    "Run {} is overridden but has no audit record",
                    run_id
                ))),
            };
        }

        tx.execute(
            "INSERT INTO risk_gate_overrides (run_id, reason, approved_by, approved_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![run_id, reason, actor, timestamp],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(OverrideApplied::Applied(OverrideRecord {
            id,
            run_id,
            reason: reason.to_string(),
            approved_by: actor.to_string(),
            approved_at,
        }))
    }

    async fn get_override(&self, run_id: i64) -> Result<Option<OverrideRecord>> {
        let conn = self.lock()?;
        query_override(&conn, run_id)
    }

    async fn count_overrides(&self, run_id: i64) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM risk_gate_overrides WHERE run_id = ?",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl IdentityStore for SqliteStore {
    async fn resolve_role(&self, actor: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let role = conn
            .query_row(
                "SELECT role FROM users WHERE actor = ?",
                params![actor],
                |row| row.get(0),
            )
            .optional()?;
        Ok(role)
    }
}

#[async_trait]
impl KnowledgeBase for SqliteStore {
    async fn lookup_clauses(&self, clause_keys: &[&str]) -> Result<Vec<KnowledgeBaseClause>> {
        if clause_keys.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders: Vec<_> = clause_keys.iter().map(|_| "?").collect();
        let sql = format!(
            "SELECT c.id, c.clause_key, c.document_id, d.document_key, c.title, c.category,
                    c.severity, c.clause_text, c.recommended_text, c.tags
             FROM kb_clauses c JOIN kb_documents d ON d.id = c.document_id
             WHERE c.clause_key IN ({})
             ORDER BY c.id",
            placeholders.join(", ")
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(clause_keys.iter()), |row| {
                Ok((
                    KnowledgeBaseClause {
                        id: row.get("id")?,
                        clause_key: row.get("clause_key")?,
                        document_id: row.get("document_id")?,
                        document_key: row.get("document_key")?,
                        title: row.get("title")?,
                        category: row.get("category")?,
                        severity: row.get("severity")?,
                        clause_text: row.get("clause_text")?,
                        recommended_text: row.get("recommended_text")?,
                        tags: Vec::new(),
                    },
                    row.get::<_, String>("tags")?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(mut clause, tags)| {
                clause.tags = serde_json::from_str(&tags)?;
                Ok(clause)
            })
            .collect()
    }
}

fn query_run(conn: &Connection, run_id: i64) -> Result<Option<RiskGateRun>> {
    let sql = format!("SELECT {} FROM risk_gate_runs WHERE id = ?", RUN_COLUMNS);
    let row = conn
        .query_row(&sql, params![run_id], RunRow::from_row)
        .optional()?;
    row.map(RunRow::into_run).transpose()
}

fn query_override(conn: &Connection, run_id: i64) -> Result<Option<OverrideRecord>> {
    let row = conn
        .query_row(
            "SELECT id, run_id, reason, approved_by, approved_at
             FROM risk_gate_overrides WHERE run_id = ?",
            params![run_id],
            |row| {
                Ok((
                    row.get::<_, i64>("id")?,
                    row.get::<_, i64>("run_id")?,
                    row.get::<_, String>("reason")?,
                    row.get::<_, String>("approved_by")?,
                    row.get::<_, String>("approved_at")?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, run_id, reason, approved_by, approved_at)| {
        Ok(OverrideRecord {
            id,
            run_id,
            reason,
            approved_by,
            approved_at: parse_timestamp(&approved_at)?,
        })
    })
    .transpose()
}

/// Fixed-width UTC timestamps sort lexically in time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RiskGateError::Storage(format!("Invalid timestamp {:?}: {}", raw, e)))
}

struct ProposalRow {
    id: i64,
    title: Option<String>,
    client: Option<String>,
    client_email: Option<String>,
    content: Option<String>,
    sections: Option<String>,
    template_key: Option<String>,
    owner: Option<String>,
}

impl ProposalRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            client: row.get("client")?,
            client_email: row.get("client_email")?,
            content: row.get("content")?,
            sections: row.get("sections")?,
            template_key: row.get("template_key")?,
            owner: row.get("owner")?,
        })
    }

    fn into_proposal(self) -> Result<Proposal> {
        let sections: Option<serde_json::Value> = self
            .sections
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(Proposal {
            id: self.id,
            title: self.title,
            client: self.client,
            client_email: self.client_email,
            content: self.content,
            sections,
            template_key: self.template_key,
            owner: self.owner,
        })
    }
}

struct RunRow {
    id: i64,
    proposal_id: i64,
    requested_by: String,
    status: String,
    risk_score: i64,
    findings: String,
    kb_citations: String,
    redaction_summary: String,
    risk_audit: Option<String>,
    created_at: String,
    overridden: bool,
    override_reason: Option<String>,
    overridden_by: Option<String>,
    overridden_at: Option<String>,
}

impl RunRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            proposal_id: row.get("proposal_id")?,
            requested_by: row.get("requested_by")?,
            status: row.get("status")?,
            risk_score: row.get("risk_score")?,
            findings: row.get("findings")?,
            kb_citations: row.get("kb_citations")?,
            redaction_summary: row.get("redaction_summary")?,
            risk_audit: row.get("risk_audit")?,
            created_at: row.get("created_at")?,
            overridden: row.get("overridden")?,
            override_reason: row.get("override_reason")?,
            overridden_by: row.get("overridden_by")?,
            overridden_at: row.get("overridden_at")?,
        })
    }

    fn into_run(self) -> Result<RiskGateRun> {
        let status: GateStatus = self.status.parse().map_err(RiskGateError::Storage)?;
        Ok(RiskGateRun {
            id: self.id,
            proposal_id: self.proposal_id,
            requested_by: self.requested_by,
            status,
            risk_score: self.risk_score,
            findings: serde_json::from_str(&self.findings)?,
            kb_citations: serde_json::from_str(&self.kb_citations)?,
            redaction_summary: serde_json::from_str(&self.redaction_summary)?,
            risk_audit: self
                .risk_audit
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
            overridden: self.overridden,
            override_reason: self.override_reason,
            overridden_by: self.overridden_by,
            overridden_at: self.overridden_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}
