use std::collections::{BTreeSet, HashMap};

use anyhow::{anyhow, bail};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::board::{Board, BoardState, Column, Settings, Theme};
use crate::bulk::{BulkAction, BulkReport};
use crate::datastore::{DataStore, TaskExport};
use crate::filter::{self, Filters};
use crate::task::{Task, TaskDraft, TaskPatch};

#[derive(Debug)]
pub struct BoardStore {
    state: BoardState,
    datastore: DataStore,
}

impl BoardStore {
    pub fn new(state: BoardState, datastore: DataStore) -> Self {
        BoardStore { state, datastore }
    }

    #[must_use]
    pub fn state(&self) -> &BoardState {
        &self.state
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.state.board
    }

    #[must_use]
    pub fn datastore(&self) -> &DataStore {
        &self.datastore
    }

    fn autosave(&self) {
        if !self.state.settings.auto_save {
            debug!("auto-save disabled; skipping persist");
            return;
        }
        if let Err(err) = self.datastore.save_state(&self.state) {
            error!(error = %err, "failed to persist board state");
        }
    }

    pub fn persist(&self) -> anyhow::Result<()> {
        self.datastore.save_state(&self.state)
    }

    #[tracing::instrument(skip(self, draft, now), fields(column = %column_id))]
    pub fn add_task(
        &mut self,
        column_id: Uuid,
        draft: TaskDraft,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Task> {
        if draft.title.trim().is_empty() {
            bail!("task title cannot be empty");
        }
        let task = Task::new(draft, now, Uuid::new_v4());

        let column = self
            .state
            .board
            .columns
            .get_mut(&column_id)
            .ok_or_else(|| anyhow!("unknown column: {column_id}"))?;
        column.task_ids.push(task.id);
        if let Some(limit) = column.limit
            && column.task_ids.len() > limit
        {
            warn!(
                column = %column.title,
                count = column.task_ids.len(),
                limit,
                "column exceeds its task limit"
            );
        }

        self.state.board.tasks.insert(task.id, task.clone());
        info!(task = %task.id, title = %task.title, "added task");
        self.autosave();
        Ok(task)
    }

    #[tracing::instrument(skip(self, patch, now), fields(task = %task_id))]
    pub fn update_task(
        &mut self,
        task_id: Uuid,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let task = self
            .state
            .board
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| anyhow!("unknown task: {task_id}"))?;
        task.apply_patch(patch, now)?;
        debug!("updated task");
        self.autosave();
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(task = %task_id))]
    pub fn delete_task(&mut self, task_id: Uuid) -> bool {
        let removed = self.remove_task_everywhere(task_id);
        if removed {
            info!("deleted task");
            self.autosave();
        } else {
            debug!("delete ignored; task does not exist");
        }
        removed
    }

    fn remove_task_everywhere(&mut self, task_id: Uuid) -> bool {
        if self.state.board.tasks.remove(&task_id).is_none() {
            return false;
        }
        for column in self.state.board.columns.values_mut() {
            column.task_ids.retain(|id| *id != task_id);
        }
        self.state.selected_tasks.remove(&task_id);
        true
    }

    #[tracing::instrument(
        skip(self),
        fields(task = %task_id, source = %source_id, dest = %dest_id, dest_index)
    )]
    pub fn move_task(
        &mut self,
        task_id: Uuid,
        source_id: Uuid,
        dest_id: Uuid,
        dest_index: usize,
    ) -> anyhow::Result<()> {
        let board = &mut self.state.board;
        if !board.tasks.contains_key(&task_id) {
            bail!("unknown task: {task_id}");
        }
        if !board.columns.contains_key(&dest_id) {
            bail!("unknown destination column: {dest_id}");
        }

        let source = board
            .columns
            .get_mut(&source_id)
            .ok_or_else(|| anyhow!("unknown source column: {source_id}"))?;
        let position = source
            .task_ids
            .iter()
            .position(|id| *id == task_id)
            .ok_or_else(|| anyhow!("task {task_id} is not in the source column"))?;
        source.task_ids.remove(position);

        let dest = board
            .columns
            .get_mut(&dest_id)
            .ok_or_else(|| anyhow!("unknown destination column: {dest_id}"))?;
        let index = dest_index.min(dest.task_ids.len());
        dest.task_ids.insert(index, task_id);
        if source_id != dest_id
            && let Some(limit) = dest.limit
            && dest.task_ids.len() > limit
        {
            warn!(
                column = %dest.title,
                count = dest.task_ids.len(),
                limit,
                "column exceeds its task limit"
            );
        }

        debug!(index, "moved task");
        self.autosave();
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(column = %column_id, from, to))]
    pub fn reorder_task(&mut self, column_id: Uuid, from: usize, to: usize) -> anyhow::Result<()> {
        let column = self
            .state
            .board
            .columns
            .get_mut(&column_id)
            .ok_or_else(|| anyhow!("unknown column: {column_id}"))?;
        let len = column.task_ids.len();
        if from >= len {
            bail!("from position {from} is out of range (column holds {len} tasks)");
        }
        if to >= len {
            bail!("to position {to} is out of range (column holds {len} tasks)");
        }
        if from == to {
            debug!("reorder is a no-op");
            return Ok(());
        }

        let id = column.task_ids.remove(from);
        column.task_ids.insert(to, id);
        debug!("reordered task");
        self.autosave();
        Ok(())
    }

    #[tracing::instrument(skip(self, color))]
    pub fn add_column(
        &mut self,
        title: &str,
        color: Option<String>,
        limit: Option<usize>,
    ) -> anyhow::Result<Column> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            bail!("column title cannot be empty");
        }
        let column = Column {
            id: Uuid::new_v4(),
            title: trimmed.to_string(),
            task_ids: Vec::new(),
            color,
            limit,
        };
        self.state.board.columns.insert(column.id, column.clone());
        self.state.board.column_order.push(column.id);
        info!(column = %column.id, title = %column.title, "added column");
        self.autosave();
        Ok(column)
    }

    #[tracing::instrument(skip(self), fields(column = %column_id))]
    pub fn rename_column(&mut self, column_id: Uuid, title: &str) -> anyhow::Result<()> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            bail!("column title cannot be empty");
        }
        let column = self
            .state
            .board
            .columns
            .get_mut(&column_id)
            .ok_or_else(|| anyhow!("unknown column: {column_id}"))?;
        column.title = trimmed.to_string();
        debug!(title = trimmed, "renamed column");
        self.autosave();
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(column = %column_id))]
    pub fn delete_column(&mut self, column_id: Uuid) -> usize {
        let Some(column) = self.state.board.columns.remove(&column_id) else {
            warn!("delete ignored; column does not exist");
            return 0;
        };
        self.state.board.column_order.retain(|id| *id != column_id);

        let mut cascaded = 0;
        for task_id in &column.task_ids {
            if self.state.board.tasks.remove(task_id).is_some() {
                cascaded += 1;
            }
            self.state.selected_tasks.remove(task_id);
        }

        info!(title = %column.title, cascaded, "deleted column and its tasks");
        self.autosave();
        cascaded
    }

    #[tracing::instrument(skip(self), fields(from, to))]
    pub fn reorder_columns(&mut self, from: usize, to: usize) -> anyhow::Result<()> {
        let len = self.state.board.column_order.len();
        if from >= len {
            bail!("from position {from} is out of range (board has {len} columns)");
        }
        if to >= len {
            bail!("to position {to} is out of range (board has {len} columns)");
        }
        if from == to {
            return Ok(());
        }

        let id = self.state.board.column_order.remove(from);
        self.state.board.column_order.insert(to, id);
        debug!("reordered columns");
        self.autosave();
        Ok(())
    }

    #[tracing::instrument(skip(self, now), fields(action = %action, requested = ids.len()))]
    pub fn bulk_action(
        &mut self,
        action: BulkAction,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> BulkReport {
        let mut applied = 0;
        let mut skipped = Vec::new();
        let mut export = None;
        let mut dirty = false;

        match action {
            BulkAction::SelectAll => {
                self.state.selected_tasks = self.state.board.tasks.keys().copied().collect();
                applied = self.state.selected_tasks.len();
                dirty = true;
            }
            BulkAction::DeselectAll => {
                applied = self.state.selected_tasks.len();
                self.state.selected_tasks.clear();
                dirty = true;
            }
            BulkAction::Delete => {
                for id in ids {
                    if self.remove_task_everywhere(*id) {
                        applied += 1;
                        dirty = true;
                    } else {
                        skipped.push(*id);
                    }
                }
            }
            BulkAction::Duplicate => {
                for id in ids {
                    if self.duplicate_task(*id, now).is_some() {
                        applied += 1;
                        dirty = true;
                    } else {
                        skipped.push(*id);
                    }
                }
            }
            BulkAction::Archive => {
                for id in ids {
                    match self.state.board.tasks.get_mut(id) {
                        Some(task) => {
                            task.archived = true;
                            task.updated_at = now;
                            applied += 1;
                            dirty = true;
                        }
                        None => skipped.push(*id),
                    }
                }
            }
            BulkAction::SetPriority(priority) => {
                for id in ids {
                    match self.state.board.tasks.get_mut(id) {
                        Some(task) => {
                            task.priority = priority;
                            task.updated_at = now;
                            applied += 1;
                            dirty = true;
                        }
                        None => skipped.push(*id),
                    }
                }
            }
            BulkAction::ExportSelected => {
                let tasks = self.tasks_in_board_order(ids, &mut skipped);
                applied = tasks.len();
                export = Some(TaskExport {
                    tasks,
                    export_date: now,
                });
            }
        }

        if !skipped.is_empty() {
            warn!(
                skipped = skipped.len(),
                "bulk action skipped unknown task ids"
            );
        }
        if dirty {
            self.autosave();
        }
        info!(applied, skipped = skipped.len(), "applied bulk action");

        BulkReport {
            action,
            applied,
            skipped,
            export,
        }
    }

    fn duplicate_task(&mut self, task_id: Uuid, now: DateTime<Utc>) -> Option<Uuid> {
        let column_id = self.state.board.column_of(task_id)?;
        let mut copy = self.state.board.tasks.get(&task_id)?.clone();
        copy.id = Uuid::new_v4();
        copy.title = format!("{} (Copy)", copy.title);
        copy.created_at = now;
        copy.updated_at = now;

        let column = self.state.board.columns.get_mut(&column_id)?;
        column.task_ids.push(copy.id);

        let id = copy.id;
        self.state.board.tasks.insert(id, copy);
        Some(id)
    }

    fn tasks_in_board_order(&self, ids: &[Uuid], skipped: &mut Vec<Uuid>) -> Vec<Task> {
        let requested: BTreeSet<Uuid> = ids.iter().copied().collect();
        for id in ids {
            if !self.state.board.tasks.contains_key(id) {
                skipped.push(*id);
            }
        }

        let mut out = Vec::new();
        for column in self.state.board.ordered_columns() {
            for id in &column.task_ids {
                if requested.contains(id)
                    && let Some(task) = self.state.board.tasks.get(id)
                {
                    out.push(task.clone());
                }
            }
        }
        out
    }

    pub fn toggle_selected(&mut self, task_id: Uuid) -> anyhow::Result<bool> {
        if !self.state.board.tasks.contains_key(&task_id) {
            bail!("unknown task: {task_id}");
        }
        let selected = if self.state.selected_tasks.remove(&task_id) {
            false
        } else {
            self.state.selected_tasks.insert(task_id);
            true
        };
        debug!(task = %task_id, selected, "toggled selection");
        self.autosave();
        Ok(selected)
    }

    pub fn set_search_query(&mut self, query: &str) {
        self.state.search_query = query.trim().to_string();
        debug!(query = %self.state.search_query, "set search query");
        self.autosave();
    }

    pub fn set_filters(&mut self, filters: Filters) {
        self.state.filters = filters;
        debug!("set filters");
        self.autosave();
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.state.theme = theme;
        info!(theme = theme.label(), "set theme");
        self.autosave();
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.state.settings = settings;
        info!("updated settings");
        self.autosave();
    }

    pub fn set_show_onboarding(&mut self, show: bool) {
        if self.state.show_onboarding == show {
            return;
        }
        self.state.show_onboarding = show;
        debug!(show, "set onboarding visibility");
        self.autosave();
    }

    #[tracing::instrument(skip(self, now))]
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.state = BoardState::welcome(now);
        info!("reset board to the welcome state");
        self.autosave();
    }

    #[tracing::instrument(skip(self, tasks), fields(column = %column_id, count = tasks.len()))]
    pub fn import_tasks(&mut self, tasks: Vec<Task>, column_id: Uuid) -> anyhow::Result<usize> {
        if !self.state.board.columns.contains_key(&column_id) {
            bail!("unknown column: {column_id}");
        }

        let mut new_ids = Vec::new();
        for mut task in tasks {
            if self.state.board.tasks.contains_key(&task.id) {
                warn!(task = %task.id, "import id collision; assigning a fresh id");
                task.id = Uuid::new_v4();
            }
            new_ids.push(task.id);
            self.state.board.tasks.insert(task.id, task);
        }

        let imported = new_ids.len();
        if imported > 0 {
            let column = self
                .state
                .board
                .columns
                .get_mut(&column_id)
                .ok_or_else(|| anyhow!("unknown column: {column_id}"))?;
            column.task_ids.extend(new_ids);
            if let Some(limit) = column.limit
                && column.task_ids.len() > limit
            {
                warn!(
                    column = %column.title,
                    count = column.task_ids.len(),
                    limit,
                    "column exceeds its task limit"
                );
            }
            info!(imported, "imported tasks");
            self.autosave();
        }
        Ok(imported)
    }

    #[tracing::instrument(skip(self, board, settings))]
    pub fn replace_board(&mut self, board: Board, settings: Option<Settings>) -> usize {
        self.state.board = board;
        if let Some(settings) = settings {
            self.state.settings = settings;
        }
        self.state.search_query.clear();
        self.state.filters = Filters::default();
        self.state.selected_tasks.clear();

        let repairs = self.state.normalize();
        info!(
            tasks = self.state.board.tasks.len(),
            columns = self.state.board.columns.len(),
            repairs,
            "replaced board"
        );
        self.autosave();
        repairs
    }

    #[must_use]
    pub fn filtered_tasks(&self, now: DateTime<Utc>) -> HashMap<Uuid, Task> {
        filter::filtered_tasks(
            &self.state.board,
            &self.state.search_query,
            &self.state.filters,
            now,
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::BoardStore;
    use crate::board::{BoardState, Settings, Theme};
    use crate::bulk::BulkAction;
    use crate::datastore::DataStore;
    use crate::filter::{DateRange, Filters};
    use crate::task::{Priority, TaskDraft, TaskPatch};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 17, 12, 0, 0)
            .single()
            .expect("valid now")
    }

    fn make_store() -> (BoardStore, TempDir) {
        let temp = tempfile::tempdir().expect("tempdir");
        let datastore = DataStore::open(temp.path()).expect("open datastore");
        let store = BoardStore::new(BoardState::welcome(fixed_now()), datastore);
        (store, temp)
    }

    fn column_by_title(store: &BoardStore, title: &str) -> Uuid {
        store
            .board()
            .ordered_columns()
            .find(|column| column.title == title)
            .map(|column| column.id)
            .expect("column exists")
    }

    fn column_task_ids(store: &BoardStore, title: &str) -> Vec<Uuid> {
        let id = column_by_title(store, title);
        store.board().columns[&id].task_ids.clone()
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            ..TaskDraft::default()
        }
    }

    mod task_ops {
        use super::*;

        #[test]
        fn add_appends_to_the_end_of_the_column() {
            let (mut store, _temp) = make_store();
            let todo = column_by_title(&store, "To Do");

            let task = store
                .add_task(todo, draft("New work"), fixed_now())
                .expect("add task");

            let ids = column_task_ids(&store, "To Do");
            assert_eq!(ids.len(), 3);
            assert_eq!(*ids.last().expect("last"), task.id);
            assert_eq!(store.board().tasks[&task.id].title, "New work");
        }

        #[test]
        fn add_rejects_blank_titles_and_unknown_columns() {
            let (mut store, _temp) = make_store();
            let todo = column_by_title(&store, "To Do");

            assert!(store.add_task(todo, draft("   "), fixed_now()).is_err());
            assert!(
                store
                    .add_task(Uuid::new_v4(), draft("Lost"), fixed_now())
                    .is_err()
            );
            assert_eq!(store.board().tasks.len(), 3);
        }

        #[test]
        fn add_beyond_the_column_limit_still_succeeds() {
            let (mut store, _temp) = make_store();
            let column = store
                .add_column("Tiny", None, Some(1))
                .expect("add column");

            store
                .add_task(column.id, draft("First"), fixed_now())
                .expect("first add");
            store
                .add_task(column.id, draft("Second"), fixed_now())
                .expect("second add");

            assert_eq!(store.board().columns[&column.id].task_ids.len(), 2);
        }

        #[test]
        fn update_patches_fields_and_bumps_updated_at() {
            let (mut store, _temp) = make_store();
            let id = column_task_ids(&store, "To Do")[0];
            let later = fixed_now() + Duration::hours(2);

            store
                .update_task(
                    id,
                    TaskPatch {
                        priority: Some(Priority::High),
                        tags: Some(vec!["intro".to_string()]),
                        ..TaskPatch::default()
                    },
                    later,
                )
                .expect("update");

            let task = &store.board().tasks[&id];
            assert_eq!(task.priority, Priority::High);
            assert_eq!(task.tags, vec!["intro".to_string()]);
            assert_eq!(task.updated_at, later);
        }

        #[test]
        fn update_unknown_task_fails() {
            let (mut store, _temp) = make_store();
            assert!(
                store
                    .update_task(Uuid::new_v4(), TaskPatch::default(), fixed_now())
                    .is_err()
            );
        }

        #[test]
        fn delete_is_idempotent() {
            let (mut store, _temp) = make_store();
            let id = column_task_ids(&store, "To Do")[0];
            store.toggle_selected(id).expect("select");

            assert!(store.delete_task(id));
            assert!(!store.delete_task(id));
            assert!(!store.board().tasks.contains_key(&id));
            assert!(!column_task_ids(&store, "To Do").contains(&id));
            assert!(!store.state().selected_tasks.contains(&id));
        }
    }

    mod movement {
        use super::*;

        #[test]
        fn move_clamps_an_oversized_destination_index() {
            let (mut store, _temp) = make_store();
            let todo = column_by_title(&store, "To Do");
            let done = column_by_title(&store, "Done");
            let moved = column_task_ids(&store, "To Do")[0];
            let existing = column_task_ids(&store, "Done")[0];

            store
                .move_task(moved, todo, done, 5)
                .expect("move with a large index");

            assert_eq!(column_task_ids(&store, "Done"), vec![existing, moved]);
            assert_eq!(column_task_ids(&store, "To Do").len(), 1);
        }

        #[test]
        fn move_within_a_column_repositions() {
            let (mut store, _temp) = make_store();
            let todo = column_by_title(&store, "To Do");
            let ids = column_task_ids(&store, "To Do");

            store
                .move_task(ids[1], todo, todo, 0)
                .expect("move to front");

            assert_eq!(column_task_ids(&store, "To Do"), vec![ids[1], ids[0]]);
        }

        #[test]
        fn move_requires_membership_in_the_source_column() {
            let (mut store, _temp) = make_store();
            let todo = column_by_title(&store, "To Do");
            let done = column_by_title(&store, "Done");
            let in_done = column_task_ids(&store, "Done")[0];

            let before_todo = column_task_ids(&store, "To Do");
            let before_done = column_task_ids(&store, "Done");
            assert!(store.move_task(in_done, todo, done, 0).is_err());
            assert_eq!(column_task_ids(&store, "To Do"), before_todo);
            assert_eq!(column_task_ids(&store, "Done"), before_done);
        }

        #[test]
        fn move_to_an_unknown_column_fails_without_mutation() {
            let (mut store, _temp) = make_store();
            let todo = column_by_title(&store, "To Do");
            let id = column_task_ids(&store, "To Do")[0];

            assert!(store.move_task(id, todo, Uuid::new_v4(), 0).is_err());
            assert_eq!(column_task_ids(&store, "To Do").len(), 2);
        }

        #[test]
        fn reorder_swaps_positions_in_place() {
            let (mut store, _temp) = make_store();
            let todo = column_by_title(&store, "To Do");
            let ids = column_task_ids(&store, "To Do");

            store.reorder_task(todo, 0, 1).expect("reorder");
            assert_eq!(column_task_ids(&store, "To Do"), vec![ids[1], ids[0]]);
        }

        #[test]
        fn reorder_rejects_out_of_range_positions() {
            let (mut store, _temp) = make_store();
            let todo = column_by_title(&store, "To Do");
            let before = column_task_ids(&store, "To Do");

            assert!(store.reorder_task(todo, 0, 2).is_err());
            assert!(store.reorder_task(todo, 7, 0).is_err());
            assert_eq!(column_task_ids(&store, "To Do"), before);
        }
    }

    mod column_ops {
        use super::*;

        #[test]
        fn add_column_lands_at_the_end_of_the_order() {
            let (mut store, _temp) = make_store();
            let column = store
                .add_column("Review", Some("cyan".to_string()), Some(4))
                .expect("add column");

            let titles: Vec<String> = store
                .board()
                .ordered_columns()
                .map(|c| c.title.clone())
                .collect();
            assert_eq!(titles, vec!["To Do", "In Progress", "Done", "Review"]);
            assert_eq!(store.board().columns[&column.id].limit, Some(4));
        }

        #[test]
        fn rename_keeps_membership() {
            let (mut store, _temp) = make_store();
            let todo = column_by_title(&store, "To Do");
            let before = column_task_ids(&store, "To Do");

            store.rename_column(todo, "Backlog").expect("rename");
            assert_eq!(column_task_ids(&store, "Backlog"), before);
        }

        #[test]
        fn delete_column_cascades_into_the_task_map() {
            let (mut store, _temp) = make_store();
            let done = column_by_title(&store, "Done");
            let doomed = column_task_ids(&store, "Done")[0];
            store.toggle_selected(doomed).expect("select");

            let cascaded = store.delete_column(done);

            assert_eq!(cascaded, 1);
            assert!(!store.board().tasks.contains_key(&doomed));
            assert!(!store.state().selected_tasks.contains(&doomed));
            assert_eq!(store.board().column_order.len(), 2);
        }

        #[test]
        fn delete_unknown_column_is_a_noop() {
            let (mut store, _temp) = make_store();
            assert_eq!(store.delete_column(Uuid::new_v4()), 0);
            assert_eq!(store.board().column_order.len(), 3);
        }

        #[test]
        fn reorder_columns_moves_within_the_order() {
            let (mut store, _temp) = make_store();
            store.reorder_columns(2, 0).expect("reorder");
            let titles: Vec<String> = store
                .board()
                .ordered_columns()
                .map(|c| c.title.clone())
                .collect();
            assert_eq!(titles, vec!["Done", "To Do", "In Progress"]);

            assert!(store.reorder_columns(0, 3).is_err());
        }
    }

    mod bulk_ops {
        use super::*;

        #[test]
        fn delete_reports_partial_success() {
            let (mut store, _temp) = make_store();
            let survivor = column_task_ids(&store, "To Do")[1];
            let target = column_task_ids(&store, "To Do")[0];
            let gone = column_task_ids(&store, "Done")[0];
            store.delete_task(gone);

            let report = store.bulk_action(BulkAction::Delete, &[target, gone], fixed_now());

            assert_eq!(report.applied, 1);
            assert_eq!(report.skipped, vec![gone]);
            assert!(store.board().tasks.contains_key(&survivor));
            assert!(!store.board().tasks.contains_key(&target));
        }

        #[test]
        fn duplicate_appends_the_copy_to_the_same_column() {
            let (mut store, _temp) = make_store();
            let later = fixed_now() + Duration::hours(1);
            let original = column_task_ids(&store, "To Do")[0];

            let report = store.bulk_action(BulkAction::Duplicate, &[original], later);
            assert_eq!(report.applied, 1);

            let ids = column_task_ids(&store, "To Do");
            assert_eq!(ids.len(), 3);
            assert_eq!(ids[0], original);
            let copy = &store.board().tasks[&ids[2]];
            assert!(copy.title.ends_with(" (Copy)"));
            assert_ne!(copy.id, original);
            assert_eq!(copy.created_at, later);
        }

        #[test]
        fn set_priority_touches_every_known_id() {
            let (mut store, _temp) = make_store();
            let ids = column_task_ids(&store, "To Do");
            let later = fixed_now() + Duration::minutes(5);

            let report =
                store.bulk_action(BulkAction::SetPriority(Priority::Low), &ids, later);

            assert_eq!(report.applied, 2);
            for id in &ids {
                let task = &store.board().tasks[id];
                assert_eq!(task.priority, Priority::Low);
                assert_eq!(task.updated_at, later);
            }
        }

        #[test]
        fn archive_marks_tasks_without_removing_them() {
            let (mut store, _temp) = make_store();
            let id = column_task_ids(&store, "Done")[0];

            let report = store.bulk_action(BulkAction::Archive, &[id], fixed_now());

            assert_eq!(report.applied, 1);
            assert!(store.board().tasks[&id].archived);
            assert!(column_task_ids(&store, "Done").contains(&id));
        }

        #[test]
        fn select_all_and_deselect_all_ignore_the_id_list() {
            let (mut store, _temp) = make_store();

            let report = store.bulk_action(BulkAction::SelectAll, &[], fixed_now());
            assert_eq!(report.applied, 3);
            assert_eq!(store.state().selected_tasks.len(), 3);

            let report = store.bulk_action(BulkAction::DeselectAll, &[], fixed_now());
            assert_eq!(report.applied, 3);
            assert!(store.state().selected_tasks.is_empty());
        }

        #[test]
        fn export_selected_is_a_pure_read_in_board_order() {
            let (mut store, _temp) = make_store();
            let todo = column_task_ids(&store, "To Do");
            let done = column_task_ids(&store, "Done");
            store.toggle_selected(done[0]).expect("select");
            store.toggle_selected(todo[1]).expect("select");

            let ids = vec![done[0], todo[1]];
            let report = store.bulk_action(BulkAction::ExportSelected, &ids, fixed_now());

            let export = report.export.expect("export payload");
            let exported: Vec<Uuid> = export.tasks.iter().map(|t| t.id).collect();
            assert_eq!(exported, vec![todo[1], done[0]]);

            assert_eq!(store.board().tasks.len(), 3);
            assert_eq!(store.state().selected_tasks.len(), 2);
        }
    }

    mod view_state {
        use super::*;

        #[test]
        fn toggle_selected_flips_and_validates() {
            let (mut store, _temp) = make_store();
            let id = column_task_ids(&store, "To Do")[0];

            assert!(store.toggle_selected(id).expect("toggle on"));
            assert!(!store.toggle_selected(id).expect("toggle off"));
            assert!(store.toggle_selected(Uuid::new_v4()).is_err());
        }

        #[test]
        fn setters_are_reflected_in_state() {
            let (mut store, _temp) = make_store();

            store.set_search_query("  welcome  ");
            assert_eq!(store.state().search_query, "welcome");

            store.set_theme(Theme::Dark);
            assert_eq!(store.state().theme, Theme::Dark);

            store.set_filters(Filters {
                date_range: DateRange::Week,
                ..Filters::default()
            });
            assert_eq!(store.state().filters.date_range, DateRange::Week);

            store.set_show_onboarding(false);
            assert!(!store.state().show_onboarding);
        }

        #[test]
        fn filtered_tasks_applies_query_and_filters_together() {
            let (mut store, _temp) = make_store();

            store.set_search_query("welcome");
            assert_eq!(store.filtered_tasks(fixed_now()).len(), 1);

            store.set_search_query("");
            store.set_filters(Filters {
                priority: vec![Priority::High],
                ..Filters::default()
            });
            let found = store.filtered_tasks(fixed_now());
            assert_eq!(found.len(), 1);
            assert!(found.values().all(|t| t.priority == Priority::High));
        }
    }

    mod persistence {
        use super::*;

        #[test]
        fn autosave_writes_through_to_disk() {
            let (mut store, temp) = make_store();
            let todo = column_by_title(&store, "To Do");
            let task = store
                .add_task(todo, draft("Persisted"), fixed_now())
                .expect("add");

            let datastore = DataStore::open(temp.path()).expect("reopen");
            let loaded = datastore.load_state_or_default(fixed_now());
            assert!(loaded.board.tasks.contains_key(&task.id));
        }

        #[test]
        fn disabling_auto_save_defers_writes_until_persist() {
            let (mut store, temp) = make_store();
            store.persist().expect("seed the snapshot");
            store.set_settings(Settings {
                auto_save: false,
                ..Settings::default()
            });

            let todo = column_by_title(&store, "To Do");
            let task = store
                .add_task(todo, draft("Unsaved"), fixed_now())
                .expect("add");

            let datastore = DataStore::open(temp.path()).expect("reopen");
            let loaded = datastore.load_state_or_default(fixed_now());
            assert!(!loaded.board.tasks.contains_key(&task.id));

            store.persist().expect("explicit save");
            let loaded = datastore.load_state_or_default(fixed_now());
            assert!(loaded.board.tasks.contains_key(&task.id));
        }

        #[test]
        fn reset_returns_to_the_welcome_state() {
            let (mut store, _temp) = make_store();
            let todo = column_by_title(&store, "To Do");
            store
                .add_task(todo, draft("Extra"), fixed_now())
                .expect("add");
            store.set_theme(Theme::Colorful);

            store.reset(fixed_now());

            assert_eq!(store.board().tasks.len(), 3);
            assert_eq!(store.state().theme, Theme::Light);
            assert!(store.state().show_onboarding);
        }
    }

    mod imports {
        use super::*;

        #[test]
        fn import_tasks_preserves_their_timestamps() {
            let (mut store, _temp) = make_store();
            let created = fixed_now() - Duration::days(30);
            let task = crate::task::Task::new(draft("Old work"), created, Uuid::new_v4());
            let todo = column_by_title(&store, "To Do");

            let imported = store
                .import_tasks(vec![task.clone()], todo)
                .expect("import");

            assert_eq!(imported, 1);
            assert_eq!(store.board().tasks[&task.id].created_at, created);
            assert_eq!(*column_task_ids(&store, "To Do").last().expect("last"), task.id);
        }

        #[test]
        fn import_into_an_unknown_column_fails() {
            let (mut store, _temp) = make_store();
            let task = crate::task::Task::new(draft("Nowhere"), fixed_now(), Uuid::new_v4());
            assert!(store.import_tasks(vec![task], Uuid::new_v4()).is_err());
        }

        #[test]
        fn replace_board_clears_view_state() {
            let (mut store, _temp) = make_store();
            let id = column_task_ids(&store, "To Do")[0];
            store.toggle_selected(id).expect("select");
            store.set_search_query("welcome");

            let replacement = crate::board::Board::welcome(fixed_now());
            store.replace_board(replacement, None);

            assert!(store.state().selected_tasks.is_empty());
            assert!(store.state().search_query.is_empty());
            assert_eq!(store.board().tasks.len(), 3);
        }
    }
}
