use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use uuid::Uuid;

use crate::datastore::TaskExport;
use crate::task::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    SelectAll,
    DeselectAll,
    Duplicate,
    Archive,
    Delete,
    SetPriority(Priority),
    ExportSelected,
}

impl BulkAction {
    #[must_use]
    pub fn kinds() -> &'static [&'static str] {
        &[
            "select-all",
            "deselect-all",
            "duplicate",
            "archive",
            "delete",
            "set-priority-high",
            "set-priority-medium",
            "set-priority-low",
            "export-selected",
        ]
    }

    #[must_use]
    pub fn mutates_tasks(&self) -> bool {
        matches!(
            self,
            BulkAction::Duplicate
                | BulkAction::Archive
                | BulkAction::Delete
                | BulkAction::SetPriority(_)
        )
    }
}

impl FromStr for BulkAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "select-all" => Ok(BulkAction::SelectAll),
            "deselect-all" => Ok(BulkAction::DeselectAll),
            "duplicate" => Ok(BulkAction::Duplicate),
            "archive" => Ok(BulkAction::Archive),
            "delete" => Ok(BulkAction::Delete),
            "set-priority-high" => Ok(BulkAction::SetPriority(Priority::High)),
            "set-priority-medium" => Ok(BulkAction::SetPriority(Priority::Medium)),
            "set-priority-low" => Ok(BulkAction::SetPriority(Priority::Low)),
            "export-selected" => Ok(BulkAction::ExportSelected),
            other => Err(anyhow!(
                "unknown bulk action: {other} (expected one of: {})",
                Self::kinds().join(", ")
            )),
        }
    }
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BulkAction::SelectAll => "select-all",
            BulkAction::DeselectAll => "deselect-all",
            BulkAction::Duplicate => "duplicate",
            BulkAction::Archive => "archive",
            BulkAction::Delete => "delete",
            BulkAction::SetPriority(Priority::High) => "set-priority-high",
            BulkAction::SetPriority(Priority::Medium) => "set-priority-medium",
            BulkAction::SetPriority(Priority::Low) => "set-priority-low",
            BulkAction::ExportSelected => "export-selected",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct BulkReport {
    pub action: BulkAction,
    pub applied: usize,
    pub skipped: Vec<Uuid>,
    pub export: Option<TaskExport>,
}

#[cfg(test)]
mod tests {
    use super::BulkAction;
    use crate::task::Priority;

    #[test]
    fn every_kind_parses_and_displays_the_same_name() {
        for name in BulkAction::kinds() {
            let action: BulkAction = name.parse().expect("known kind parses");
            assert_eq!(action.to_string(), *name);
        }
    }

    #[test]
    fn set_priority_carries_its_level() {
        let action: BulkAction = "set-priority-high".parse().expect("parse");
        assert_eq!(action, BulkAction::SetPriority(Priority::High));
    }

    #[test]
    fn unknown_kind_lists_the_vocabulary() {
        let err = "explode".parse::<BulkAction>().expect_err("must fail");
        let message = err.to_string();
        assert!(message.contains("unknown bulk action"));
        assert!(message.contains("select-all"));
    }

    #[test]
    fn selection_toggles_do_not_mutate_tasks() {
        assert!(!BulkAction::SelectAll.mutates_tasks());
        assert!(!BulkAction::DeselectAll.mutates_tasks());
        assert!(!BulkAction::ExportSelected.mutates_tasks());
        assert!(BulkAction::Delete.mutates_tasks());
        assert!(BulkAction::SetPriority(Priority::Low).mutates_tasks());
    }
}
