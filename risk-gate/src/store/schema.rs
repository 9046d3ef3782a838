//! Database schema definitions

use rusqlite::{params, Connection};
use tracing::info;

use crate::error::{Result, RiskGateError};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 2;

/// Knowledge-base document seeded on first creation.
pub const CORE_DOCUMENT_KEY: &str = "risk_gate_core";
const CORE_DOCUMENT_TITLE: &str = "Risk Gate Core Policies";

struct SeedClause {
    key: &'static str,
    title: &'static str,
    category: &'static str,
    severity: &'static str,
    text: &'static str,
    recommended: &'static str,
    tags: &'static [&'static str],
}

const SEED_CLAUSES: &[SeedClause] = &[
    SeedClause {
        key: "confidentiality_minimum",
        title: "Confidentiality Minimum",
        category: "legal",
        severity: "high",
        text: "This document contains confidential information and is intended solely for the recipient. Unauthorized disclosure is prohibited.",
        recommended: "Add a confidentiality section stating the document is confidential, intended recipients, and disclosure restrictions.",
        tags: &["confidentiality", "legal"],
    },
    SeedClause {
        key: "pii_handling_minimum",
        title: "PII Handling Minimum",
        category: "security",
        severity: "high",
        text: "No personal data (PII) should be included unless required and authorized. Any personal data must be minimized and protected.",
        recommended: "Remove personal identifiers (names, emails, phone numbers) from the document. Use placeholders where needed.",
        tags: &["pii", "security"],
    },
    SeedClause {
        key: "no_credentials_minimum",
        title: "No Credentials or Secrets",
        category: "security",
        severity: "high",
        text: "Credentials, API keys, access tokens, and secrets must never be included in proposals, SOWs, or RFIs.",
        recommended: "Remove any credentials/tokens/keys and reference secure channels for credential exchange.",
        tags: &["secrets", "security"],
    },
];

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        conn.execute_batch(TABLES_SCHEMA)?;
        conn.execute_batch(INDEXES_SCHEMA)?;
        seed_knowledge_base(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        if current_version < 2 {
            conn.execute_batch(MIGRATION_V2)?;
        }
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(RiskGateError::Storage(format!(
            "Database schema v{} is newer than supported v{}",
            current_version, SCHEMA_VERSION
        )));
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?)",
        [version],
    )?;
    Ok(())
}

fn seed_knowledge_base(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT INTO kb_documents (document_key, title) VALUES (?1, ?2)",
        params![CORE_DOCUMENT_KEY, CORE_DOCUMENT_TITLE],
    )?;
    let document_id = conn.last_insert_rowid();

    for clause in SEED_CLAUSES {
        let tags = serde_json::to_string(clause.tags)?;
        conn.execute(
            "INSERT INTO kb_clauses
                (document_id, clause_key, title, category, severity, clause_text, recommended_text, tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                document_id,
                clause.key,
                clause.title,
                clause.category,
                clause.severity,
                clause.text,
                clause.recommended,
                tags,
            ],
        )?;
    }

    info!(clauses = SEED_CLAUSES.len(), "Seeded knowledge base");
    Ok(())
}

const TABLES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS proposals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT,
    client TEXT,
    client_email TEXT,
    content TEXT,
    sections TEXT,
    template_key TEXT,
    owner TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS users (
    actor TEXT PRIMARY KEY,
    role TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS kb_documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_key TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS kb_clauses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id INTEGER NOT NULL REFERENCES kb_documents(id),
    clause_key TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    category TEXT NOT NULL,
    severity TEXT NOT NULL,
    clause_text TEXT NOT NULL,
    recommended_text TEXT,
    tags TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS risk_gate_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    proposal_id INTEGER NOT NULL,
    requested_by TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('PASS', 'REVIEW', 'BLOCK')),
    risk_score INTEGER NOT NULL CHECK (risk_score BETWEEN 0 AND 100),
    findings TEXT NOT NULL,
    kb_citations TEXT NOT NULL,
    redaction_summary TEXT NOT NULL,
    risk_audit TEXT,
    created_at TEXT NOT NULL,
    overridden INTEGER NOT NULL DEFAULT 0,
    override_reason TEXT,
    overridden_by TEXT,
    overridden_at TEXT
);

CREATE TABLE IF NOT EXISTS risk_gate_overrides (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL UNIQUE REFERENCES risk_gate_runs(id),
    reason TEXT NOT NULL,
    approved_by TEXT NOT NULL,
    approved_at TEXT NOT NULL
);
"#;

/// v2: internal risk opinion per run
const MIGRATION_V2: &str = "ALTER TABLE risk_gate_runs ADD COLUMN risk_audit TEXT;";

const INDEXES_SCHEMA: &str = r#"
CREATE INDEX IF NOT EXISTS idx_runs_proposal ON risk_gate_runs(proposal_id, created_at);
CREATE INDEX IF NOT EXISTS idx_proposals_owner ON proposals(owner);
CREATE INDEX IF NOT EXISTS idx_proposals_template ON proposals(template_key);
"#;
