use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::filter::Filters;
use crate::task::{Priority, Task, TaskDraft};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Colorful,
}

impl Theme {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "colorful" => Some(Theme::Colorful),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Colorful => "colorful",
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_true")]
    pub auto_save: bool,
    #[serde(default = "default_true")]
    pub show_task_count: bool,
    #[serde(default)]
    pub compact_mode: bool,
    #[serde(default = "default_true")]
    pub enable_notifications: bool,
    #[serde(default = "default_true")]
    pub show_statistics: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            auto_save: true,
            show_task_count: true,
            compact_mode: false,
            enable_notifications: true,
            show_statistics: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub task_ids: Vec<Uuid>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    #[serde(default)]
    pub tasks: HashMap<Uuid, Task>,
    #[serde(default)]
    pub columns: HashMap<Uuid, Column>,
    #[serde(default)]
    pub column_order: Vec<Uuid>,
}

impl Board {
    pub fn welcome(now: DateTime<Utc>) -> Self {
        let first = Task::new(
            TaskDraft {
                title: "Welcome to your board".to_string(),
                description: "This is your first task. Edit it or delete it.".to_string(),
                priority: Priority::Medium,
                ..TaskDraft::default()
            },
            now,
            Uuid::new_v4(),
        );
        let second = Task::new(
            TaskDraft {
                title: "Try moving this task".to_string(),
                description: "Move tasks between columns to organize your workflow.".to_string(),
                priority: Priority::High,
                ..TaskDraft::default()
            },
            now,
            Uuid::new_v4(),
        );
        let third = Task::new(
            TaskDraft {
                title: "Change themes".to_string(),
                description: "Switch between the light, dark, and colorful themes.".to_string(),
                priority: Priority::Low,
                ..TaskDraft::default()
            },
            now,
            Uuid::new_v4(),
        );

        let todo = Column {
            id: Uuid::new_v4(),
            title: "To Do".to_string(),
            task_ids: vec![first.id, second.id],
            color: None,
            limit: None,
        };
        let in_progress = Column {
            id: Uuid::new_v4(),
            title: "In Progress".to_string(),
            task_ids: Vec::new(),
            color: None,
            limit: None,
        };
        let done = Column {
            id: Uuid::new_v4(),
            title: "Done".to_string(),
            task_ids: vec![third.id],
            color: None,
            limit: None,
        };

        let column_order = vec![todo.id, in_progress.id, done.id];
        let tasks = HashMap::from([(first.id, first), (second.id, second), (third.id, third)]);
        let columns = HashMap::from([
            (todo.id, todo),
            (in_progress.id, in_progress),
            (done.id, done),
        ]);

        Board {
            tasks,
            columns,
            column_order,
        }
    }

    #[must_use]
    pub fn column_of(&self, task_id: Uuid) -> Option<Uuid> {
        self.column_order
            .iter()
            .filter_map(|id| self.columns.get(id))
            .find(|column| column.task_ids.contains(&task_id))
            .map(|column| column.id)
    }

    pub fn ordered_columns(&self) -> impl Iterator<Item = &Column> {
        self.column_order
            .iter()
            .filter_map(|id| self.columns.get(id))
    }

    pub fn normalize(&mut self) -> usize {
        let mut repairs = 0;

        let mut seen_columns = HashSet::new();
        let before = self.column_order.len();
        let columns = &self.columns;
        self.column_order
            .retain(|id| columns.contains_key(id) && seen_columns.insert(*id));
        let dropped = before - self.column_order.len();
        if dropped > 0 {
            warn!(dropped, "removed unknown or duplicate column order entries");
            repairs += dropped;
        }

        let mut missing: Vec<Uuid> = self
            .columns
            .keys()
            .filter(|id| !seen_columns.contains(*id))
            .copied()
            .collect();
        if !missing.is_empty() {
            missing.sort();
            warn!(
                count = missing.len(),
                "appended columns missing from column order"
            );
            repairs += missing.len();
            self.column_order.extend(missing);
        }

        let mut seen_tasks = HashSet::new();
        for column_id in self.column_order.clone() {
            let tasks = &self.tasks;
            let Some(column) = self.columns.get_mut(&column_id) else {
                continue;
            };
            let before = column.task_ids.len();
            column
                .task_ids
                .retain(|id| tasks.contains_key(id) && seen_tasks.insert(*id));
            let dropped = before - column.task_ids.len();
            if dropped > 0 {
                warn!(
                    column = %column.title,
                    dropped,
                    "removed dangling or duplicate task references"
                );
                repairs += dropped;
            }
        }

        let before = self.tasks.len();
        self.tasks.retain(|id, _| seen_tasks.contains(id));
        let orphans = before - self.tasks.len();
        if orphans > 0 {
            warn!(count = orphans, "removed tasks not referenced by any column");
            repairs += orphans;
        }

        repairs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardState {
    pub board: Board,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_true")]
    pub show_onboarding: bool,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub search_query: String,
    #[serde(default)]
    pub selected_tasks: BTreeSet<Uuid>,
}

impl BoardState {
    pub fn welcome(now: DateTime<Utc>) -> Self {
        BoardState {
            board: Board::welcome(now),
            theme: Theme::Light,
            show_onboarding: true,
            settings: Settings::default(),
            filters: Filters::default(),
            search_query: String::new(),
            selected_tasks: BTreeSet::new(),
        }
    }

    pub fn normalize(&mut self) -> usize {
        let mut repairs = self.board.normalize();

        let before = self.selected_tasks.len();
        let tasks = &self.board.tasks;
        self.selected_tasks.retain(|id| tasks.contains_key(id));
        let pruned = before - self.selected_tasks.len();
        if pruned > 0 {
            warn!(count = pruned, "pruned selected task ids that no longer exist");
            repairs += pruned;
        }

        repairs
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::{Board, BoardState, Settings, Theme};

    fn fixed_now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 17, 12, 0, 0)
            .single()
            .expect("valid now")
    }

    #[test]
    fn welcome_board_has_three_columns_in_order() {
        let board = Board::welcome(fixed_now());
        let titles: Vec<&str> = board
            .ordered_columns()
            .map(|column| column.title.as_str())
            .collect();
        assert_eq!(titles, vec!["To Do", "In Progress", "Done"]);
        assert_eq!(board.tasks.len(), 3);

        let member_count: usize = board
            .ordered_columns()
            .map(|column| column.task_ids.len())
            .sum();
        assert_eq!(member_count, 3);
    }

    #[test]
    fn every_welcome_task_lives_in_exactly_one_column() {
        let board = Board::welcome(fixed_now());
        for task_id in board.tasks.keys() {
            assert!(board.column_of(*task_id).is_some());
        }
    }

    #[test]
    fn normalize_repairs_dangling_orphan_and_order_drift() {
        let mut board = Board::welcome(fixed_now());
        let ghost = Uuid::new_v4();
        let first_column = board.column_order[0];
        board
            .columns
            .get_mut(&first_column)
            .expect("first column")
            .task_ids
            .push(ghost);

        let orphan = crate::task::Task::new(
            crate::task::TaskDraft {
                title: "Orphan".to_string(),
                ..crate::task::TaskDraft::default()
            },
            fixed_now(),
            Uuid::new_v4(),
        );
        board.tasks.insert(orphan.id, orphan);

        board.column_order.push(Uuid::new_v4());

        let repairs = board.normalize();
        assert_eq!(repairs, 3);
        assert!(board.ordered_columns().all(|column| column
            .task_ids
            .iter()
            .all(|id| board.tasks.contains_key(id))));
        assert_eq!(board.tasks.len(), 3);
        assert_eq!(board.column_order.len(), 3);
    }

    #[test]
    fn state_normalize_prunes_stale_selection() {
        let mut state = BoardState::welcome(fixed_now());
        state.selected_tasks.insert(Uuid::new_v4());
        let known = *state.board.tasks.keys().next().expect("a task");
        state.selected_tasks.insert(known);

        let repairs = state.normalize();
        assert_eq!(repairs, 1);
        assert_eq!(state.selected_tasks.len(), 1);
        assert!(state.selected_tasks.contains(&known));
    }

    #[test]
    fn settings_default_to_auto_save_on() {
        let settings = Settings::default();
        assert!(settings.auto_save);
        assert!(settings.show_task_count);
        assert!(!settings.compact_mode);
        assert!(settings.enable_notifications);
        assert!(settings.show_statistics);
    }

    #[test]
    fn state_serializes_with_camel_case_keys() {
        let state = BoardState::welcome(fixed_now());
        let json = serde_json::to_string(&state).expect("serialize");
        assert!(json.contains("\"columnOrder\""));
        assert!(json.contains("\"taskIds\""));
        assert!(json.contains("\"showOnboarding\""));
        assert!(json.contains("\"searchQuery\""));
        assert!(json.contains("\"autoSave\""));
    }

    #[test]
    fn state_deserializes_with_missing_optional_sections() {
        let json = r#"{"board":{"tasks":{},"columns":{},"columnOrder":[]}}"#;
        let state: BoardState = serde_json::from_str(json).expect("deserialize");
        assert_eq!(state.theme, Theme::Light);
        assert!(state.show_onboarding);
        assert!(state.settings.auto_save);
        assert!(state.selected_tasks.is_empty());
    }
}
