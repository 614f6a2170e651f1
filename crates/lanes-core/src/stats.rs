use chrono::{DateTime, Duration, Utc};

use crate::board::Board;
use crate::task::Priority;

#[derive(Debug, Clone)]
pub struct ColumnStat {
    pub title: String,
    pub count: usize,
    pub percent: usize,
}

#[derive(Debug, Clone)]
pub struct BoardStats {
    pub total: usize,
    pub by_priority: Vec<(Priority, usize)>,
    pub by_column: Vec<ColumnStat>,
    pub completion: usize,
    pub overdue: usize,
    pub recent: usize,
}

impl BoardStats {
    #[must_use]
    pub fn compute(board: &Board, now: DateTime<Utc>) -> Self {
        let total = board.tasks.len();

        let by_priority = [Priority::High, Priority::Medium, Priority::Low]
            .into_iter()
            .map(|priority| {
                let count = board
                    .tasks
                    .values()
                    .filter(|task| task.priority == priority)
                    .count();
                (priority, count)
            })
            .collect();

        let by_column = board
            .ordered_columns()
            .map(|column| ColumnStat {
                title: column.title.clone(),
                count: column.task_ids.len(),
                percent: percent(column.task_ids.len(), total),
            })
            .collect();

        let completion = board
            .column_order
            .last()
            .and_then(|id| board.columns.get(id))
            .map(|column| percent(column.task_ids.len(), total))
            .unwrap_or(0);

        let overdue = board
            .tasks
            .values()
            .filter(|task| task.is_overdue(now))
            .count();

        let week_ago = now - Duration::days(7);
        let recent = board
            .tasks
            .values()
            .filter(|task| task.created_at >= week_ago)
            .count();

        BoardStats {
            total,
            by_priority,
            by_column,
            completion,
            overdue,
            recent,
        }
    }
}

fn percent(part: usize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as usize
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::BoardStats;
    use crate::board::Board;
    use crate::task::Priority;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 17, 12, 0, 0)
            .single()
            .expect("valid now")
    }

    #[test]
    fn welcome_board_stats_add_up() {
        let now = fixed_now();
        let board = Board::welcome(now);
        let stats = BoardStats::compute(&board, now);

        assert_eq!(stats.total, 3);
        assert_eq!(
            stats.by_priority,
            vec![
                (Priority::High, 1),
                (Priority::Medium, 1),
                (Priority::Low, 1)
            ]
        );
        let counts: Vec<usize> = stats.by_column.iter().map(|stat| stat.count).collect();
        assert_eq!(counts, vec![2, 0, 1]);
        assert_eq!(stats.by_column[0].percent, 67);
        assert_eq!(stats.completion, 33);
        assert_eq!(stats.recent, 3);
        assert_eq!(stats.overdue, 0);
    }

    #[test]
    fn overdue_and_recent_track_the_clock() {
        let now = fixed_now();
        let mut board = Board::welcome(now);
        let first = *board
            .column_order
            .first()
            .and_then(|id| board.columns.get(id))
            .and_then(|column| column.task_ids.first())
            .expect("seeded task");
        let task = board.tasks.get_mut(&first).expect("task");
        task.due_date = Some(now - Duration::hours(1));
        task.created_at = now - Duration::days(10);

        let stats = BoardStats::compute(&board, now);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.recent, 2);
    }

    #[test]
    fn empty_board_reports_zero_percentages() {
        let board = Board::default();
        let stats = BoardStats::compute(&board, fixed_now());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.completion, 0);
        assert!(stats.by_column.is_empty());
    }
}
