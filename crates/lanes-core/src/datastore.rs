use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::board::{Board, BoardState, Column, Settings};
use crate::datetime::{format_board_date, iso_date_serde};
use crate::task::{Priority, Task, normalize_tags};

const BOARD_FILE: &str = "board.json";

#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub board_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let board_path = data_dir.join(BOARD_FILE);

        info!(
            data_dir = %data_dir.display(),
            board = %board_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            board_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_state(&self) -> anyhow::Result<Option<BoardState>> {
        if !self.board_path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.board_path)
            .with_context(|| format!("failed reading {}", self.board_path.display()))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let state: BoardState = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.board_path.display()))?;
        Ok(Some(state))
    }

    #[tracing::instrument(skip(self, now))]
    pub fn load_state_or_default(&self, now: DateTime<Utc>) -> BoardState {
        match self.load_state() {
            Ok(Some(mut state)) => {
                let repairs = state.normalize();
                if repairs > 0 {
                    warn!(repairs, "normalized board snapshot after load");
                }
                debug!(
                    tasks = state.board.tasks.len(),
                    columns = state.board.columns.len(),
                    "loaded board snapshot"
                );
                state
            }
            Ok(None) => {
                info!("no board snapshot found; starting with the welcome board");
                BoardState::welcome(now)
            }
            Err(err) => {
                error!(
                    file = %self.board_path.display(),
                    error = %err,
                    "failed to load board snapshot; starting with the welcome board"
                );
                BoardState::welcome(now)
            }
        }
    }

    #[tracing::instrument(skip(self, state))]
    pub fn save_state(&self, state: &BoardState) -> anyhow::Result<()> {
        save_json_atomic(&self.board_path, state).context("failed to save board.json")
    }
}

#[tracing::instrument(skip(path, value))]
fn save_json_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    debug!(file = %path.display(), "saving json atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    let serialized = serde_json::to_string_pretty(value)?;
    temp.write_all(serialized.as_bytes())?;
    temp.write_all(b"\n")?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardExport {
    pub board: Board,
    pub settings: Settings,
    #[serde(with = "iso_date_serde")]
    pub export_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskExport {
    pub tasks: Vec<Task>,
    #[serde(with = "iso_date_serde")]
    pub export_date: DateTime<Utc>,
}

#[must_use]
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("lanes-board-{}.json", format_board_date(now))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportTask {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportColumn {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub task_ids: Vec<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBoard {
    #[serde(default)]
    pub tasks: HashMap<String, ImportTask>,
    #[serde(default)]
    pub columns: HashMap<String, ImportColumn>,
    #[serde(default)]
    pub column_order: Vec<String>,
}

#[derive(Debug)]
pub enum ImportPayload {
    Board {
        board: ImportBoard,
        settings: Option<Settings>,
    },
    Tasks(Vec<ImportTask>),
}

#[tracing::instrument(skip(input))]
pub fn parse_import(input: &str) -> anyhow::Result<ImportPayload> {
    let value: serde_json::Value =
        serde_json::from_str(input.trim()).context("failed parsing import document as JSON")?;

    match value {
        serde_json::Value::Array(_) => {
            let tasks: Vec<ImportTask> =
                serde_json::from_value(value).context("failed parsing import task array")?;
            Ok(ImportPayload::Tasks(tasks))
        }
        serde_json::Value::Object(obj) => {
            if let Some(board_value) = obj.get("board") {
                let board: ImportBoard = serde_json::from_value(board_value.clone())
                    .context("failed parsing board section of import document")?;
                let settings = lenient_settings(obj.get("settings"));
                Ok(ImportPayload::Board { board, settings })
            } else if obj.contains_key("columns") {
                let settings = lenient_settings(obj.get("settings"));
                let board: ImportBoard =
                    serde_json::from_value(serde_json::Value::Object(obj))
                        .context("failed parsing columns section of import document")?;
                Ok(ImportPayload::Board { board, settings })
            } else if let Some(tasks_value) = obj.get("tasks") {
                let tasks: Vec<ImportTask> = serde_json::from_value(tasks_value.clone())
                    .context("failed parsing tasks section of import document")?;
                Ok(ImportPayload::Tasks(tasks))
            } else {
                Err(anyhow!(
                    "unrecognized import document (expected a task array, a tasks export, or a board export)"
                ))
            }
        }
        _ => Err(anyhow!("import document must be a JSON array or object")),
    }
}

fn lenient_settings(value: Option<&serde_json::Value>) -> Option<Settings> {
    let value = value?;
    match serde_json::from_value(value.clone()) {
        Ok(settings) => Some(settings),
        Err(err) => {
            warn!(error = %err, "ignoring unparseable settings in import document");
            None
        }
    }
}

pub fn normalize_import_task(row: &ImportTask, now: DateTime<Utc>) -> Option<Task> {
    let title = row.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        warn!(id = ?row.id, "skipping import row without a title");
        return None;
    }

    let priority = match row.priority.as_deref() {
        None => Priority::default(),
        Some(raw) => Priority::parse(raw).unwrap_or_else(|| {
            warn!(raw, "unknown import priority; using medium");
            Priority::Medium
        }),
    };

    let created_at = parse_import_date(row.created_at.as_deref(), "createdAt", now);
    let updated_at = parse_import_date(row.updated_at.as_deref(), "updatedAt", now).max(created_at);

    Some(Task {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: row.description.clone(),
        priority,
        created_at,
        updated_at,
        due_date: parse_import_due(row.due_date.as_deref()),
        assignee: row
            .assignee
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string),
        tags: normalize_tags(row.tags.clone()),
        archived: row.archived,
        completed: row.completed,
    })
}

fn parse_import_date(raw: Option<&str>, field: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    match raw {
        None => now,
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(err) => {
                warn!(field, raw, error = %err, "unparseable import date; using current time");
                now
            }
        },
    }
}

fn parse_import_due(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(err) => {
            warn!(raw, error = %err, "unparseable import due date; dropping it");
            None
        }
    }
}

#[tracing::instrument(skip(import, now))]
pub fn rebuild_board(import: ImportBoard, now: DateTime<Utc>) -> (Board, usize) {
    let mut board = Board::default();
    let mut task_map: HashMap<String, Uuid> = HashMap::new();
    let mut skipped = 0;

    for (key, row) in &import.tasks {
        match normalize_import_task(row, now) {
            Some(task) => {
                task_map.insert(key.clone(), task.id);
                if let Some(raw_id) = &row.id {
                    task_map.insert(raw_id.clone(), task.id);
                }
                board.tasks.insert(task.id, task);
            }
            None => skipped += 1,
        }
    }

    let mut column_map: HashMap<String, Uuid> = HashMap::new();
    let mut dangling = 0;
    for (key, column) in &import.columns {
        let id = Uuid::new_v4();
        column_map.insert(key.clone(), id);
        if let Some(raw_id) = &column.id {
            column_map.insert(raw_id.clone(), id);
        }

        let mut task_ids = Vec::new();
        for old_id in &column.task_ids {
            match task_map.get(old_id) {
                Some(new_id) => task_ids.push(*new_id),
                None => dangling += 1,
            }
        }

        let title = column
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled")
            .to_string();
        board.columns.insert(
            id,
            Column {
                id,
                title,
                task_ids,
                color: column.color.clone(),
                limit: column.limit,
            },
        );
    }

    board.column_order = import
        .column_order
        .iter()
        .filter_map(|old_id| column_map.get(old_id).copied())
        .collect();

    if dangling > 0 {
        warn!(dangling, "import columns referenced unknown task ids");
    }
    if skipped > 0 {
        warn!(skipped, "skipped unusable import rows");
    }

    let repairs = board.normalize();
    if repairs > 0 {
        debug!(repairs, "normalized imported board");
    }

    (board, skipped)
}
