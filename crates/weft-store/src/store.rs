use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

use weft_core::error::{Result, WeftError};
use weft_core::execution::{
    Execution, ExecutionPatch, ExecutionStatus, NodeLog, NodeRunStatus,
};
use weft_core::traits::{DefinitionStore, LogStore};
use weft_core::workflow::{NodeKind, Workflow};

/// SQLite-backed store for workflow definitions and execution history.
///
/// Workflows are kept as their JSON definition plus extracted `status`
/// and `trigger_type` columns so trigger dispatch is a single indexed
/// query.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                WeftError::Database(format!("Failed to create db directory: {}", e))
            })?;
        }

        let conn =
            Connection::open(path).map_err(|e| WeftError::Database(e.to_string()))?;

        // WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| WeftError::Database(e.to_string()))?;

        init_schema(&conn)?;

        debug!(path = %path.display(), "SQLite store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| WeftError::Database(e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS workflows (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            status TEXT NOT NULL,
            trigger_type TEXT,
            definition TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_workflows_trigger
            ON workflows(status, trigger_type);

        CREATE TABLE IF NOT EXISTS executions (
            id TEXT PRIMARY KEY,
            workflow_id TEXT NOT NULL,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            completed_at TEXT,
            duration_ms INTEGER,
            trigger_data TEXT,
            result_data TEXT,
            error_message TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_executions_workflow
            ON executions(workflow_id, started_at);

        CREATE TABLE IF NOT EXISTS node_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            execution_id TEXT NOT NULL,
            node_id TEXT NOT NULL,
            node_type TEXT NOT NULL,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            completed_at TEXT,
            duration_ms INTEGER,
            input_data TEXT,
            output_data TEXT,
            error_message TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_node_logs_execution
            ON node_logs(execution_id, id);",
    )
    .map_err(|e| WeftError::Database(e.to_string()))
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_definition(json: &str) -> Result<Workflow> {
    serde_json::from_str(json)
        .map_err(|e| WeftError::Database(format!("corrupt workflow definition: {}", e)))
}

type ExecutionRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    Option<i64>,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn build_execution(row: ExecutionRow) -> Result<Execution> {
    let (id, workflow_id, status, started_at, completed_at, duration_ms, trigger, result, error) =
        row;
    let status = ExecutionStatus::parse(&status)
        .ok_or_else(|| WeftError::Database(format!("unknown execution status '{}'", status)))?;
    Ok(Execution {
        id,
        workflow_id,
        status,
        started_at: parse_timestamp(&started_at),
        completed_at: completed_at.as_deref().map(parse_timestamp),
        duration_ms: duration_ms.map(|n| n as u64),
        trigger_data: trigger
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or(Value::Null),
        result_data: result.as_deref().and_then(|s| serde_json::from_str(s).ok()),
        error_message: error,
    })
}

type NodeLogRow = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<i64>,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn build_node_log(row: NodeLogRow) -> Result<NodeLog> {
    let (
        execution_id,
        node_id,
        node_type,
        status,
        started_at,
        completed_at,
        duration_ms,
        input,
        output,
        error,
    ) = row;
    let node_type = NodeKind::parse(&node_type)
        .ok_or_else(|| WeftError::Database(format!("unknown node type '{}'", node_type)))?;
    let status = NodeRunStatus::parse(&status)
        .ok_or_else(|| WeftError::Database(format!("unknown node status '{}'", status)))?;
    Ok(NodeLog {
        execution_id,
        node_id,
        node_type,
        status,
        started_at: parse_timestamp(&started_at),
        completed_at: completed_at.as_deref().map(parse_timestamp),
        duration_ms: duration_ms.map(|n| n as u64),
        input_data: input.as_deref().and_then(|s| serde_json::from_str(s).ok()),
        output_data: output.as_deref().and_then(|s| serde_json::from_str(s).ok()),
        error_message: error,
    })
}

impl DefinitionStore for SqliteStore {
    fn workflow(&self, id: &str) -> BoxFuture<'_, Result<Option<Workflow>>> {
        let id = id.to_string();
        Box::pin(async move {
            let conn = self
                .conn
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?;

            let definition: Option<String> = conn
                .query_row(
                    "SELECT definition FROM workflows WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| WeftError::Database(e.to_string()))?;

            match definition {
                Some(json) => Ok(Some(parse_definition(&json)?)),
                None => Ok(None),
            }
        })
    }

    fn workflows_by_trigger(&self, trigger_type: &str) -> BoxFuture<'_, Result<Vec<Workflow>>> {
        let trigger_type = trigger_type.to_string();
        Box::pin(async move {
            let conn = self
                .conn
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?;

            let mut stmt = conn
                .prepare(
                    "SELECT definition FROM workflows
                     WHERE status = 'published' AND trigger_type = ?1
                     ORDER BY id ASC",
                )
                .map_err(|e| WeftError::Database(e.to_string()))?;

            let rows = stmt
                .query_map(params![trigger_type], |row| row.get::<_, String>(0))
                .map_err(|e| WeftError::Database(e.to_string()))?;

            let mut workflows = Vec::new();
            for row in rows {
                let json = row.map_err(|e| WeftError::Database(e.to_string()))?;
                workflows.push(parse_definition(&json)?);
            }
            Ok(workflows)
        })
    }

    fn save_workflow(&self, workflow: &Workflow) -> BoxFuture<'_, Result<()>> {
        let id = workflow.id.clone();
        let title = workflow.title.clone();
        let status = workflow.status.as_str().to_string();
        let trigger_type = workflow
            .trigger()
            .and_then(|node| node.type_ref())
            .map(str::to_string);
        let definition = serde_json::to_string(workflow);

        Box::pin(async move {
            let definition = definition?;
            let conn = self
                .conn
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?;

            conn.execute(
                "INSERT INTO workflows (id, title, status, trigger_type, definition, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                     title = excluded.title,
                     status = excluded.status,
                     trigger_type = excluded.trigger_type,
                     definition = excluded.definition,
                     updated_at = excluded.updated_at",
                params![id, title, status, trigger_type, definition, Utc::now().to_rfc3339()],
            )
            .map_err(|e| WeftError::Database(e.to_string()))?;
            Ok(())
        })
    }

    fn list_workflows(&self) -> BoxFuture<'_, Result<Vec<Workflow>>> {
        Box::pin(async move {
            let conn = self
                .conn
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?;

            let mut stmt = conn
                .prepare("SELECT definition FROM workflows ORDER BY id ASC")
                .map_err(|e| WeftError::Database(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| WeftError::Database(e.to_string()))?;

            let mut workflows = Vec::new();
            for row in rows {
                let json = row.map_err(|e| WeftError::Database(e.to_string()))?;
                workflows.push(parse_definition(&json)?);
            }
            Ok(workflows)
        })
    }
}

impl LogStore for SqliteStore {
    fn record_execution(&self, execution: &Execution) -> BoxFuture<'_, Result<()>> {
        let execution = execution.clone();
        Box::pin(async move {
            let trigger_data = serde_json::to_string(&execution.trigger_data)?;
            let result_data = execution
                .result_data
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            let conn = self
                .conn
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?;

            conn.execute(
                "INSERT INTO executions
                     (id, workflow_id, status, started_at, completed_at, duration_ms,
                      trigger_data, result_data, error_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    execution.id,
                    execution.workflow_id,
                    execution.status.as_str(),
                    execution.started_at.to_rfc3339(),
                    execution.completed_at.map(|t| t.to_rfc3339()),
                    execution.duration_ms.map(|n| n as i64),
                    trigger_data,
                    result_data,
                    execution.error_message,
                ],
            )
            .map_err(|e| WeftError::Database(e.to_string()))?;
            Ok(())
        })
    }

    fn update_execution(&self, id: &str, patch: &ExecutionPatch) -> BoxFuture<'_, Result<()>> {
        let id = id.to_string();
        let patch = patch.clone();
        Box::pin(async move {
            let result_data = patch
                .result_data
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            let conn = self
                .conn
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?;

            // COALESCE keeps existing result/error when the patch
            // carries none.
            let updated = conn
                .execute(
                    "UPDATE executions SET
                         status = ?1,
                         completed_at = ?2,
                         duration_ms = ?3,
                         result_data = COALESCE(?4, result_data),
                         error_message = COALESCE(?5, error_message)
                     WHERE id = ?6",
                    params![
                        patch.status.as_str(),
                        patch.completed_at.to_rfc3339(),
                        patch.duration_ms as i64,
                        result_data,
                        patch.error_message,
                        id,
                    ],
                )
                .map_err(|e| WeftError::Database(e.to_string()))?;

            if updated == 0 {
                return Err(WeftError::Database(format!(
                    "execution '{}' not found",
                    id
                )));
            }
            Ok(())
        })
    }

    fn record_node_log(&self, log: &NodeLog) -> BoxFuture<'_, Result<()>> {
        let log = log.clone();
        Box::pin(async move {
            let input_data = log
                .input_data
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            let output_data = log
                .output_data
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            let conn = self
                .conn
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?;

            conn.execute(
                "INSERT INTO node_logs
                     (execution_id, node_id, node_type, status, started_at, completed_at,
                      duration_ms, input_data, output_data, error_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    log.execution_id,
                    log.node_id,
                    log.node_type.as_str(),
                    log.status.as_str(),
                    log.started_at.to_rfc3339(),
                    log.completed_at.map(|t| t.to_rfc3339()),
                    log.duration_ms.map(|n| n as i64),
                    input_data,
                    output_data,
                    log.error_message,
                ],
            )
            .map_err(|e| WeftError::Database(e.to_string()))?;
            Ok(())
        })
    }

    fn execution(&self, id: &str) -> BoxFuture<'_, Result<Option<Execution>>> {
        let id = id.to_string();
        Box::pin(async move {
            let conn = self
                .conn
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?;

            let row: Option<ExecutionRow> = conn
                .query_row(
                    "SELECT id, workflow_id, status, started_at, completed_at, duration_ms,
                            trigger_data, result_data, error_message
                     FROM executions WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                            row.get(6)?,
                            row.get(7)?,
                            row.get(8)?,
                        ))
                    },
                )
                .optional()
                .map_err(|e| WeftError::Database(e.to_string()))?;

            row.map(build_execution).transpose()
        })
    }

    fn node_logs(&self, execution_id: &str) -> BoxFuture<'_, Result<Vec<NodeLog>>> {
        let execution_id = execution_id.to_string();
        Box::pin(async move {
            let conn = self
                .conn
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?;

            let mut stmt = conn
                .prepare(
                    "SELECT execution_id, node_id, node_type, status, started_at, completed_at,
                            duration_ms, input_data, output_data, error_message
                     FROM node_logs WHERE execution_id = ?1
                     ORDER BY id ASC",
                )
                .map_err(|e| WeftError::Database(e.to_string()))?;

            let rows = stmt
                .query_map(params![execution_id], |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                        row.get(9)?,
                    ))
                })
                .map_err(|e| WeftError::Database(e.to_string()))?;

            let mut logs = Vec::new();
            for row in rows {
                let row = row.map_err(|e| WeftError::Database(e.to_string()))?;
                logs.push(build_node_log(row)?);
            }
            Ok(logs)
        })
    }

    fn recent_executions(&self, limit: usize) -> BoxFuture<'_, Result<Vec<Execution>>> {
        Box::pin(async move {
            let conn = self
                .conn
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?;

            let mut stmt = conn
                .prepare(
                    "SELECT id, workflow_id, status, started_at, completed_at, duration_ms,
                            trigger_data, result_data, error_message
                     FROM executions
                     ORDER BY started_at DESC
                     LIMIT ?1",
                )
                .map_err(|e| WeftError::Database(e.to_string()))?;

            let rows = stmt
                .query_map(params![limit as i64], |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                    ))
                })
                .map_err(|e| WeftError::Database(e.to_string()))?;

            let mut executions = Vec::new();
            for row in rows {
                let row = row.map_err(|e| WeftError::Database(e.to_string()))?;
                executions.push(build_execution(row)?);
            }
            Ok(executions)
        })
    }
}
