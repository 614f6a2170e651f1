use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::board::Theme;
use crate::bulk::BulkAction;
use crate::cli::Invocation;
use crate::datastore::{self, BoardExport, ImportPayload};
use crate::datetime::parse_due_expr;
use crate::filter::{DateRange, Filters};
use crate::render::Renderer;
use crate::stats::BoardStats;
use crate::store::BoardStore;
use crate::task::{Priority, Task, TaskDraft, TaskPatch};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "board",
        "list",
        "info",
        "add",
        "modify",
        "done",
        "delete",
        "move",
        "reorder",
        "column",
        "columns",
        "select",
        "bulk",
        "search",
        "filter",
        "stats",
        "export",
        "import",
        "theme",
        "settings",
        "save",
        "reset",
        "_commands",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, renderer, inv))]
pub fn dispatch(
    store: &mut BoardStore,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let command = inv.command.as_str();

    debug!(command, args = ?inv.args, "dispatching command");

    match command {
        "board" => cmd_board(store, renderer, now),
        "list" => cmd_list(store, renderer, now),
        "info" => cmd_info(store, renderer, &inv.args),
        "add" => cmd_add(store, &inv.args, now),
        "modify" => cmd_modify(store, &inv.args, now),
        "done" => cmd_done(store, &inv.args, now),
        "delete" => cmd_delete(store, &inv.args),
        "move" => cmd_move(store, &inv.args),
        "reorder" => cmd_reorder(store, &inv.args),
        "column" => cmd_column(store, &inv.args),
        "columns" => cmd_columns(store, renderer),
        "select" => cmd_select(store, &inv.args, now),
        "bulk" => cmd_bulk(store, &inv.args, now),
        "search" => cmd_search(store, &inv.args),
        "filter" => cmd_filter(store, &inv.args, now),
        "stats" => cmd_stats(store, renderer, now),
        "export" => cmd_export(store, &inv.args, now),
        "import" => cmd_import(store, &inv.args, now),
        "theme" => cmd_theme(store, &inv.args),
        "settings" => cmd_settings(store, &inv.args),
        "save" => cmd_save(store),
        "reset" => cmd_reset(store, &inv.args, now),
        "_commands" => cmd_commands(),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(store, renderer, now))]
fn cmd_board(
    store: &mut BoardStore,
    renderer: &mut Renderer,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command board");

    if store.state().show_onboarding {
        renderer.print_onboarding_hint()?;
        store.set_show_onboarding(false);
    }

    let visible = store.filtered_tasks(now);
    renderer.print_board(store.state(), &visible, now)
}

#[instrument(skip(store, renderer, now))]
fn cmd_list(
    store: &mut BoardStore,
    renderer: &mut Renderer,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command list");

    let visible = store.filtered_tasks(now);
    let board = store.board();

    let mut rows: Vec<(String, Task)> = Vec::new();
    for column in board.ordered_columns() {
        for id in &column.task_ids {
            if let Some(task) = visible.get(id) {
                rows.push((column.title.clone(), task.clone()));
            }
        }
    }

    renderer.print_task_table(&rows, now)
}

#[instrument(skip(store, renderer, args))]
fn cmd_info(
    store: &mut BoardStore,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command info");

    if args.is_empty() {
        return Err(anyhow!("info requires a task reference"));
    }

    for (idx, token) in args.iter().enumerate() {
        let task_id = resolve_task(store, token)?;
        let board = store.board();
        let task = board
            .tasks
            .get(&task_id)
            .ok_or_else(|| anyhow!("no such task: {token}"))?;
        let column_title = board
            .column_of(task_id)
            .and_then(|column_id| board.columns.get(&column_id))
            .map(|column| column.title.clone())
            .unwrap_or_default();

        if idx > 0 {
            println!();
        }
        renderer.print_task_info(task, &column_title)?;
    }

    Ok(())
}

#[instrument(skip(store, args, now))]
fn cmd_add(store: &mut BoardStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command add");

    let Some((column_token, rest)) = args.split_first() else {
        return Err(anyhow!("add requires a column and a title"));
    };
    let column_id = resolve_column(store, column_token)?;

    let (title, mods) = parse_title_and_mods(rest, now)?;
    let mut draft = TaskDraft {
        title,
        ..TaskDraft::default()
    };
    for one_mod in &mods {
        match one_mod {
            Mod::TagAdd(tag) => draft.tags.push(tag.clone()),
            Mod::TagRemove(_) => {}
            Mod::Title(title) => draft.title = title.clone(),
            Mod::Description(description) => draft.description = description.clone(),
            Mod::Priority(priority) => draft.priority = *priority,
            Mod::Due(due) => draft.due_date = *due,
            Mod::Assignee(assignee) => draft.assignee = assignee.clone(),
        }
    }

    let task = store.add_task(column_id, draft, now)?;
    println!("Created task {}.", task.short_id());
    Ok(())
}

#[instrument(skip(store, args, now))]
fn cmd_modify(store: &mut BoardStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command modify");

    let Some((token, rest)) = args.split_first() else {
        return Err(anyhow!("modify requires a task reference"));
    };
    let task_id = resolve_task(store, token)?;

    let mods = parse_mods(rest, now)?;
    if mods.is_empty() {
        return Err(anyhow!("modify requires at least one change"));
    }

    let mut tags = store
        .board()
        .tasks
        .get(&task_id)
        .map(|task| task.tags.clone())
        .unwrap_or_default();
    let mut tags_changed = false;

    let mut patch = TaskPatch::default();
    for one_mod in &mods {
        match one_mod {
            Mod::TagAdd(tag) => {
                if tags.iter().all(|existing| existing != tag) {
                    tags.push(tag.clone());
                }
                tags_changed = true;
            }
            Mod::TagRemove(tag) => {
                tags.retain(|existing| existing != tag);
                tags_changed = true;
            }
            Mod::Title(title) => patch.title = Some(title.clone()),
            Mod::Description(description) => patch.description = Some(description.clone()),
            Mod::Priority(priority) => patch.priority = Some(*priority),
            Mod::Due(due) => patch.due_date = Some(*due),
            Mod::Assignee(assignee) => patch.assignee = Some(assignee.clone()),
        }
    }
    if tags_changed {
        patch.tags = Some(tags);
    }

    store.update_task(task_id, patch, now)?;
    println!("Modified task {}.", short(task_id));
    Ok(())
}

#[instrument(skip(store, args, now))]
fn cmd_done(store: &mut BoardStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command done");

    if args.is_empty() {
        return Err(anyhow!("done requires a task reference"));
    }

    for token in args {
        let task_id = resolve_task(store, token)?;
        let completed = store
            .board()
            .tasks
            .get(&task_id)
            .map(|task| task.completed)
            .unwrap_or(false);

        let patch = TaskPatch {
            completed: Some(!completed),
            ..TaskPatch::default()
        };
        store.update_task(task_id, patch, now)?;
        println!(
            "Task {} marked {}.",
            short(task_id),
            if completed { "open" } else { "done" }
        );
    }

    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_delete(store: &mut BoardStore, args: &[String]) -> anyhow::Result<()> {
    info!("command delete");

    if args.is_empty() {
        return Err(anyhow!("delete requires a task reference"));
    }

    let mut deleted = 0_usize;
    for token in args {
        let task_id = resolve_task(store, token)?;
        if store.delete_task(task_id) {
            deleted += 1;
        }
    }

    println!("Deleted {deleted} task(s).");
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_move(store: &mut BoardStore, args: &[String]) -> anyhow::Result<()> {
    info!("command move");

    if args.len() < 2 {
        return Err(anyhow!("move requires a task and a destination column"));
    }

    let task_id = resolve_task(store, &args[0])?;
    let dest_id = resolve_column(store, &args[1])?;
    let dest_index = match args.get(2) {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid position: {raw}"))?,
        // out-of-range falls to the end of the column
        None => usize::MAX,
    };

    let source_id = store
        .board()
        .column_of(task_id)
        .ok_or_else(|| anyhow!("task {} is not on the board", short(task_id)))?;
    let dest_title = store
        .board()
        .columns
        .get(&dest_id)
        .map(|column| column.title.clone())
        .unwrap_or_default();

    store.move_task(task_id, source_id, dest_id, dest_index)?;
    println!("Moved task {} to {dest_title}.", short(task_id));
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_reorder(store: &mut BoardStore, args: &[String]) -> anyhow::Result<()> {
    info!("command reorder");

    if args.len() < 2 {
        return Err(anyhow!("reorder requires a task and a position"));
    }

    let task_id = resolve_task(store, &args[0])?;
    let to = args[1]
        .parse::<usize>()
        .with_context(|| format!("invalid position: {}", args[1]))?;

    let board = store.board();
    let column_id = board
        .column_of(task_id)
        .ok_or_else(|| anyhow!("task {} is not on the board", short(task_id)))?;
    let from = board
        .columns
        .get(&column_id)
        .and_then(|column| column.task_ids.iter().position(|id| *id == task_id))
        .ok_or_else(|| anyhow!("task {} is not on the board", short(task_id)))?;

    store.reorder_task(column_id, from, to)?;
    println!("Reordered task {}.", short(task_id));
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_column(store: &mut BoardStore, args: &[String]) -> anyhow::Result<()> {
    info!("command column");

    let Some((sub, rest)) = args.split_first() else {
        return Err(anyhow!(
            "column requires a subcommand: add, rename, delete, move"
        ));
    };

    match sub.as_str() {
        "add" => {
            let mut color = None;
            let mut limit = None;
            let mut words = Vec::new();
            for token in rest {
                if let Some(value) = token.strip_prefix("color:") {
                    color = if value.is_empty() || value == "none" {
                        None
                    } else {
                        Some(value.to_string())
                    };
                } else if let Some(value) = token.strip_prefix("limit:") {
                    limit = if value == "none" {
                        None
                    } else {
                        Some(
                            value
                                .parse::<usize>()
                                .with_context(|| format!("invalid limit: {value}"))?,
                        )
                    };
                } else {
                    words.push(token.clone());
                }
            }
            if words.is_empty() {
                return Err(anyhow!("column add requires a title"));
            }

            let column = store.add_column(&words.join(" "), color, limit)?;
            println!("Created column {}.", column.title);
            Ok(())
        }
        "rename" => {
            let Some((token, title_parts)) = rest.split_first() else {
                return Err(anyhow!("column rename requires a column and a new title"));
            };
            if title_parts.is_empty() {
                return Err(anyhow!("column rename requires a new title"));
            }

            let column_id = resolve_column(store, token)?;
            store.rename_column(column_id, &title_parts.join(" "))?;
            println!("Renamed column.");
            Ok(())
        }
        "delete" => {
            let Some(token) = rest.first() else {
                return Err(anyhow!("column delete requires a column reference"));
            };

            let column_id = resolve_column(store, token)?;
            let dropped = store.delete_column(column_id);
            println!("Deleted column and {dropped} task(s).");
            Ok(())
        }
        "move" => {
            if rest.len() < 2 {
                return Err(anyhow!("column move requires a column and a position"));
            }

            let column_id = resolve_column(store, &rest[0])?;
            let to = rest[1]
                .parse::<usize>()
                .with_context(|| format!("invalid position: {}", rest[1]))?;
            let from = store
                .board()
                .column_order
                .iter()
                .position(|id| *id == column_id)
                .ok_or_else(|| anyhow!("column is not on the board"))?;

            store.reorder_columns(from, to)?;
            println!("Moved column.");
            Ok(())
        }
        other => Err(anyhow!("unknown column subcommand: {other}")),
    }
}

#[instrument(skip(store, renderer))]
fn cmd_columns(store: &mut BoardStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    info!("command columns");
    renderer.print_columns(store.board())
}

#[instrument(skip(store, args, now))]
fn cmd_select(store: &mut BoardStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command select");

    if args.is_empty() {
        let state = store.state();
        if state.selected_tasks.is_empty() {
            println!("No tasks selected.");
            return Ok(());
        }
        for id in &state.selected_tasks {
            let title = state
                .board
                .tasks
                .get(id)
                .map(|task| task.title.as_str())
                .unwrap_or("?");
            println!("{}  {title}", short(*id));
        }
        return Ok(());
    }

    match args[0].as_str() {
        "all" => {
            let report = store.bulk_action(BulkAction::SelectAll, &[], now);
            println!("Selected {} task(s).", report.applied);
            Ok(())
        }
        "none" => {
            store.bulk_action(BulkAction::DeselectAll, &[], now);
            println!("Selection cleared.");
            Ok(())
        }
        _ => {
            for token in args {
                let task_id = resolve_task(store, token)?;
                let selected = store.toggle_selected(task_id)?;
                println!(
                    "{} task {}.",
                    if selected { "Selected" } else { "Deselected" },
                    short(task_id)
                );
            }
            Ok(())
        }
    }
}

#[instrument(skip(store, args, now))]
fn cmd_bulk(store: &mut BoardStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command bulk");

    let Some((kind_token, rest)) = args.split_first() else {
        return Err(anyhow!(
            "bulk requires an action: {}",
            BulkAction::kinds().join(", ")
        ));
    };
    let action: BulkAction = kind_token.parse()?;

    let from_selection = rest.is_empty();
    let ids: Vec<Uuid> = if from_selection {
        store.state().selected_tasks.iter().copied().collect()
    } else {
        let mut out = Vec::new();
        for token in rest {
            out.push(resolve_task(store, token)?);
        }
        out
    };

    let report = store.bulk_action(action, &ids, now);

    if let Some(export) = &report.export {
        let text = serde_json::to_string_pretty(export).context("failed to serialize export")?;
        println!("{text}");
    } else {
        println!("Applied {} to {} task(s).", report.action, report.applied);
    }
    if !report.skipped.is_empty() {
        println!("Skipped {} unknown task(s).", report.skipped.len());
    }

    // a mutating action consumes the selection it acted on
    if from_selection && report.action.mutates_tasks() {
        store.bulk_action(BulkAction::DeselectAll, &[], now);
    }

    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_search(store: &mut BoardStore, args: &[String]) -> anyhow::Result<()> {
    info!("command search");

    let query = args.join(" ");
    if query.is_empty() || query == "clear" {
        store.set_search_query("");
        println!("Search cleared.");
    } else {
        store.set_search_query(&query);
        println!("Search set: \"{query}\"");
    }

    Ok(())
}

#[instrument(skip(store, args, now))]
fn cmd_filter(store: &mut BoardStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command filter");

    if args.is_empty() {
        let filters = &store.state().filters;
        if filters.is_empty() {
            println!("No filters active.");
            return Ok(());
        }
        if !filters.priority.is_empty() {
            let labels: Vec<&str> = filters.priority.iter().map(Priority::label).collect();
            println!("priority  {}", labels.join(", "));
        }
        if filters.date_range != DateRange::None {
            println!("range     {}", filters.date_range.label());
        }
        if !filters.assignee.is_empty() {
            println!("assignee  {}", filters.assignee.join(", "));
        }
        if !filters.tags.is_empty() {
            println!("tags      {}", filters.tags.join(", "));
        }
        return Ok(());
    }

    if args.len() == 1 && args[0] == "clear" {
        store.set_filters(Filters::default());
        println!("Filters cleared.");
        return Ok(());
    }

    let mut filters = Filters::default();
    for token in args {
        if let Some(value) = token
            .strip_prefix("pri:")
            .or_else(|| token.strip_prefix("priority:"))
        {
            for part in value.split(',') {
                let priority = Priority::parse(part)
                    .ok_or_else(|| anyhow!("unknown priority: {part}"))?;
                filters.priority.push(priority);
            }
        } else if let Some(value) = token.strip_prefix("range:") {
            filters.date_range = DateRange::parse(value).ok_or_else(|| {
                anyhow!("unknown date range: {value} (today, week, month, overdue, all)")
            })?;
        } else if let Some(value) = token.strip_prefix("assignee:") {
            filters.assignee.push(value.to_string());
        } else if let Some(tag) = token.strip_prefix('+') {
            filters.tags.push(tag.to_string());
        } else {
            return Err(anyhow!(
                "unrecognized filter term: {token} (use pri:, range:, assignee:, +tag)"
            ));
        }
    }

    store.set_filters(filters);
    let visible = store.filtered_tasks(now);
    println!("Filters set, {} task(s) match.", visible.len());
    Ok(())
}

#[instrument(skip(store, renderer, now))]
fn cmd_stats(
    store: &mut BoardStore,
    renderer: &mut Renderer,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command stats");

    if !store.state().settings.show_statistics {
        println!("Statistics are turned off (`settings show-statistics on` to enable).");
        return Ok(());
    }

    let stats = BoardStats::compute(store.board(), now);
    renderer.print_stats(&stats)
}

#[instrument(skip(store, args, now))]
fn cmd_export(store: &mut BoardStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command export");

    let mut selected_only = false;
    let mut output: Option<Option<PathBuf>> = None;
    let mut idx = 0;
    while idx < args.len() {
        match args[idx].as_str() {
            "--selected" => selected_only = true,
            "--output" | "-o" => {
                if let Some(next) = args.get(idx + 1)
                    && !next.starts_with('-')
                {
                    output = Some(Some(PathBuf::from(next)));
                    idx += 1;
                } else {
                    output = Some(None);
                }
            }
            other => return Err(anyhow!("unrecognized export option: {other}")),
        }
        idx += 1;
    }

    let text = if selected_only {
        let ids: Vec<Uuid> = store.state().selected_tasks.iter().copied().collect();
        let report = store.bulk_action(BulkAction::ExportSelected, &ids, now);
        let export = report
            .export
            .ok_or_else(|| anyhow!("nothing selected to export"))?;
        serde_json::to_string_pretty(&export)?
    } else {
        let state = store.state();
        let export = BoardExport {
            board: state.board.clone(),
            settings: state.settings.clone(),
            export_date: now,
        };
        serde_json::to_string_pretty(&export)?
    };

    match output {
        Some(maybe_path) => {
            let path =
                maybe_path.unwrap_or_else(|| PathBuf::from(datastore::export_filename(now)));
            std::fs::write(&path, text + "\n")
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported to {}.", path.display());
        }
        None => println!("{text}"),
    }

    Ok(())
}

#[instrument(skip(store, args, now))]
fn cmd_import(store: &mut BoardStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command import");

    let mut replace = false;
    let mut column_token: Option<String> = None;
    let mut idx = 0;
    while idx < args.len() {
        match args[idx].as_str() {
            "--replace" => replace = true,
            "--column" | "-c" => {
                let value = args
                    .get(idx + 1)
                    .ok_or_else(|| anyhow!("--column requires a value"))?;
                column_token = Some(value.clone());
                idx += 1;
            }
            other => return Err(anyhow!("unrecognized import option: {other}")),
        }
        idx += 1;
    }

    let mut stdin = String::new();
    io::stdin()
        .read_to_string(&mut stdin)
        .context("failed reading stdin")?;
    let trimmed = stdin.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("import: empty input"));
    }

    let payload = datastore::parse_import(trimmed)?;

    if replace {
        let ImportPayload::Board { board, settings } = payload else {
            return Err(anyhow!("import --replace requires a board export"));
        };
        let (board, skipped) = datastore::rebuild_board(board, now);
        let repairs = store.replace_board(board, settings);
        if repairs > 0 {
            debug!(repairs, "board repaired during import");
        }
        println!(
            "Imported board: {} task(s), {} row(s) skipped.",
            store.board().tasks.len(),
            skipped
        );
        return Ok(());
    }

    let rows = match payload {
        ImportPayload::Tasks(rows) => rows,
        ImportPayload::Board { board, .. } => board.tasks.into_values().collect(),
    };

    let column_id = match column_token {
        Some(token) => resolve_column(store, &token)?,
        None => store
            .board()
            .column_order
            .first()
            .copied()
            .ok_or_else(|| anyhow!("board has no columns"))?,
    };

    let mut tasks = Vec::new();
    let mut skipped = 0_usize;
    for row in &rows {
        match datastore::normalize_import_task(row, now) {
            Some(task) => tasks.push(task),
            None => skipped += 1,
        }
    }

    let added = store.import_tasks(tasks, column_id)?;
    println!("Imported {added} task(s), skipped {skipped}.");
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_theme(store: &mut BoardStore, args: &[String]) -> anyhow::Result<()> {
    info!("command theme");

    if args.is_empty() {
        println!("{}", store.state().theme.label());
        return Ok(());
    }

    let theme = Theme::parse(&args[0])
        .ok_or_else(|| anyhow!("unknown theme: {} (light, dark, colorful)", args[0]))?;
    store.set_theme(theme);
    println!("Theme set: {}", store.state().theme.label());
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_settings(store: &mut BoardStore, args: &[String]) -> anyhow::Result<()> {
    info!("command settings");

    if args.is_empty() {
        let state = store.state();
        let settings = &state.settings;
        println!("auto-save             {}", on_off(settings.auto_save));
        println!("show-task-count       {}", on_off(settings.show_task_count));
        println!("compact-mode          {}", on_off(settings.compact_mode));
        println!(
            "enable-notifications  {}",
            on_off(settings.enable_notifications)
        );
        println!("show-statistics       {}", on_off(settings.show_statistics));
        println!("show-onboarding       {}", on_off(state.show_onboarding));
        println!("theme                 {}", state.theme.label());
        return Ok(());
    }

    if args.len() != 2 {
        return Err(anyhow!(
            "settings takes a key and a value, e.g. `settings auto-save off`"
        ));
    }
    let key = args[0].to_ascii_lowercase();
    let value = parse_on_off(&args[1])?;

    if key == "show-onboarding" {
        store.set_show_onboarding(value);
    } else {
        let mut settings = store.state().settings.clone();
        match key.as_str() {
            "auto-save" => settings.auto_save = value,
            "show-task-count" => settings.show_task_count = value,
            "compact-mode" => settings.compact_mode = value,
            "enable-notifications" => settings.enable_notifications = value,
            "show-statistics" => settings.show_statistics = value,
            other => return Err(anyhow!("unknown setting: {other}")),
        }
        store.set_settings(settings);
    }

    // settings changes stick even while auto-save is off
    if !store.state().settings.auto_save {
        store.persist()?;
    }

    println!("Setting updated: {key}={}", on_off(value));
    Ok(())
}

#[instrument(skip(store))]
fn cmd_save(store: &mut BoardStore) -> anyhow::Result<()> {
    info!("command save");

    store.persist()?;
    println!("Saved to {}.", store.datastore().board_path.display());
    Ok(())
}

#[instrument(skip(store, args, now))]
fn cmd_reset(store: &mut BoardStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command reset");

    if args.first().map(String::as_str) != Some("--force") {
        return Err(anyhow!(
            "reset replaces the whole board, pass --force to confirm"
        ));
    }

    store.reset(now);
    store.persist()?;
    println!("Board reset to the starter layout.");
    Ok(())
}

fn cmd_commands() -> anyhow::Result<()> {
    for command in known_command_names() {
        println!("{command}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "Implemented commands: board, list, info, add, modify, done, delete, move, reorder, column, columns, select, bulk, search, filter, stats, export, import, theme, settings, save, reset"
    );
    Ok(())
}

fn short(id: Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn parse_on_off(raw: &str) -> anyhow::Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(anyhow!("expected on or off, got {other}")),
    }
}

fn resolve_task(store: &BoardStore, token: &str) -> anyhow::Result<Uuid> {
    let board = store.board();

    if let Ok(id) = Uuid::parse_str(token)
        && board.tasks.contains_key(&id)
    {
        return Ok(id);
    }

    let lowered = token.to_ascii_lowercase();
    let by_prefix: Vec<Uuid> = board
        .tasks
        .keys()
        .filter(|id| id.to_string().starts_with(&lowered))
        .copied()
        .collect();
    match by_prefix.len() {
        1 => return Ok(by_prefix[0]),
        0 => {}
        _ => return Err(anyhow!("task reference is ambiguous: {token}")),
    }

    let by_title: Vec<Uuid> = board
        .tasks
        .values()
        .filter(|task| task.title.eq_ignore_ascii_case(token))
        .map(|task| task.id)
        .collect();
    match by_title.len() {
        0 => Err(anyhow!("no such task: {token}")),
        1 => Ok(by_title[0]),
        _ => Err(anyhow!("task title is ambiguous: {token}")),
    }
}

fn resolve_column(store: &BoardStore, token: &str) -> anyhow::Result<Uuid> {
    let board = store.board();

    if let Ok(id) = Uuid::parse_str(token)
        && board.columns.contains_key(&id)
    {
        return Ok(id);
    }

    let lowered = token.to_ascii_lowercase();
    let by_prefix: Vec<Uuid> = board
        .columns
        .keys()
        .filter(|id| id.to_string().starts_with(&lowered))
        .copied()
        .collect();
    match by_prefix.len() {
        1 => return Ok(by_prefix[0]),
        0 => {}
        _ => return Err(anyhow!("column reference is ambiguous: {token}")),
    }

    let by_title: Vec<Uuid> = board
        .columns
        .values()
        .filter(|column| column.title.eq_ignore_ascii_case(token))
        .map(|column| column.id)
        .collect();
    match by_title.len() {
        0 => Err(anyhow!("no such column: {token}")),
        1 => Ok(by_title[0]),
        _ => Err(anyhow!("column title is ambiguous: {token}")),
    }
}

#[derive(Debug, Clone)]
enum Mod {
    TagAdd(String),
    TagRemove(String),
    Title(String),
    Description(String),
    Priority(Priority),
    Due(Option<DateTime<Utc>>),
    Assignee(Option<String>),
}

#[instrument(skip(args, now))]
fn parse_title_and_mods(
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<(String, Vec<Mod>)> {
    let mut title_parts = Vec::new();
    let mut mods = Vec::new();

    let mut literal = false;
    for arg in args {
        if arg == "--" {
            literal = true;
            continue;
        }

        if !literal && let Some(one_mod) = parse_one_mod(arg, now)? {
            mods.push(one_mod);
            continue;
        }

        title_parts.push(arg.clone());
    }

    if title_parts.is_empty() && !mods.iter().any(|m| matches!(m, Mod::Title(_))) {
        return Err(anyhow!("add: a title is required"));
    }

    Ok((title_parts.join(" "), mods))
}

#[instrument(skip(args, now))]
fn parse_mods(args: &[String], now: DateTime<Utc>) -> anyhow::Result<Vec<Mod>> {
    let mut mods = Vec::new();
    for arg in args {
        if let Some(one_mod) = parse_one_mod(arg, now)? {
            mods.push(one_mod);
        } else {
            warn!(arg = %arg, "unrecognized modifier token ignored");
        }
    }
    Ok(mods)
}

fn parse_one_mod(tok: &str, now: DateTime<Utc>) -> anyhow::Result<Option<Mod>> {
    if let Some(tag) = tok.strip_prefix('+') {
        return Ok(Some(Mod::TagAdd(tag.to_string())));
    }
    if let Some(tag) = tok.strip_prefix('-') {
        return Ok(Some(Mod::TagRemove(tag.to_string())));
    }

    let Some((key, value)) = tok.split_once(':') else {
        return Ok(None);
    };

    match key.to_ascii_lowercase().as_str() {
        "title" => Ok(Some(Mod::Title(value.to_string()))),
        "desc" | "description" => Ok(Some(Mod::Description(value.to_string()))),
        "pri" | "priority" => {
            let priority = Priority::parse(value)
                .ok_or_else(|| anyhow!("unknown priority: {value} (high, medium, low)"))?;
            Ok(Some(Mod::Priority(priority)))
        }
        "due" => {
            if value.is_empty() || value == "none" {
                Ok(Some(Mod::Due(None)))
            } else {
                Ok(Some(Mod::Due(Some(parse_due_expr(value, now)?))))
            }
        }
        "assignee" => {
            if value.is_empty() || value == "none" {
                Ok(Some(Mod::Assignee(None)))
            } else {
                Ok(Some(Mod::Assignee(Some(value.to_string()))))
            }
        }
        _ => Ok(None),
    }
}
