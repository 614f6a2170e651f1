use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::Board;
use crate::datetime::{month_ago, to_board_date};
use crate::task::{Priority, Task};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    #[default]
    None,
    Today,
    Week,
    Month,
    Overdue,
}

impl DateRange {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "none" | "all" => Some(DateRange::None),
            "today" => Some(DateRange::Today),
            "week" => Some(DateRange::Week),
            "month" => Some(DateRange::Month),
            "overdue" => Some(DateRange::Overdue),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            DateRange::None => "none",
            DateRange::Today => "today",
            DateRange::Week => "week",
            DateRange::Month => "month",
            DateRange::Overdue => "overdue",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    #[serde(default)]
    pub priority: Vec<Priority>,
    #[serde(default)]
    pub date_range: DateRange,
    #[serde(default)]
    pub assignee: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Filters {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.priority.is_empty()
            && self.date_range == DateRange::None
            && self.assignee.is_empty()
            && self.tags.is_empty()
    }
}

#[must_use]
pub fn matches(task: &Task, query: &str, filters: &Filters, now: DateTime<Utc>) -> bool {
    matches_query(task, query)
        && matches_priority(task, &filters.priority)
        && matches_date_range(task, filters.date_range, now)
        && matches_assignee(task, &filters.assignee)
        && matches_tags(task, &filters.tags)
}

pub fn filtered_tasks(
    board: &Board,
    query: &str,
    filters: &Filters,
    now: DateTime<Utc>,
) -> HashMap<Uuid, Task> {
    board
        .tasks
        .iter()
        .filter(|(_, task)| matches(task, query, filters, now))
        .map(|(id, task)| (*id, task.clone()))
        .collect()
}

fn matches_query(task: &Task, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    task.title.to_lowercase().contains(&needle)
        || task.description.to_lowercase().contains(&needle)
        || task
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
}

fn matches_priority(task: &Task, priorities: &[Priority]) -> bool {
    priorities.is_empty() || priorities.contains(&task.priority)
}

fn matches_date_range(task: &Task, range: DateRange, now: DateTime<Utc>) -> bool {
    match range {
        DateRange::None => true,
        DateRange::Today => to_board_date(task.created_at) >= to_board_date(now),
        DateRange::Week => task.created_at >= now - Duration::days(7),
        DateRange::Month => task.created_at >= month_ago(now),
        DateRange::Overdue => task.is_overdue(now),
    }
}

fn matches_assignee(task: &Task, assignees: &[String]) -> bool {
    if assignees.is_empty() {
        return true;
    }
    match &task.assignee {
        Some(assignee) => assignees
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(assignee)),
        None => false,
    }
}

fn matches_tags(task: &Task, tags: &[String]) -> bool {
    if tags.is_empty() {
        return true;
    }
    task.tags.iter().any(|tag| {
        tags.iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(tag))
    })
}
