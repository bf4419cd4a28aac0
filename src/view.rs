use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::task::{Priority, Task, TaskKey};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum FilterMode {
    #[default]
    All,
    Priority,
    Overdue,
}

impl FilterMode {
    pub const ALL: [FilterMode; 3] = [FilterMode::All, FilterMode::Priority, FilterMode::Overdue];

    pub fn label(self) -> &'static str {
        match self {
            FilterMode::All => "All",
            FilterMode::Priority => "High priority",
            FilterMode::Overdue => "Overdue",
        }
    }

    pub fn next(self) -> Self {
        match self {
            FilterMode::All => FilterMode::Priority,
            FilterMode::Priority => FilterMode::Overdue,
            FilterMode::Overdue => FilterMode::All,
        }
    }

    pub fn matches(self, task: &Task, now: DateTime<Utc>) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Priority => task.priority == Some(Priority::Alta),
            FilterMode::Overdue => task.is_overdue(now),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilterMode::All => "all",
            FilterMode::Priority => "priority",
            FilterMode::Overdue => "overdue",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter {0:?}, expected all, priority or overdue")]
pub struct UnknownFilter(pub String);

impl FromStr for FilterMode {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(FilterMode::All),
            "priority" => Ok(FilterMode::Priority),
            "overdue" => Ok(FilterMode::Overdue),
            _ => Err(UnknownFilter(s.to_string())),
        }
    }
}

impl TryFrom<String> for FilterMode {
    type Error = UnknownFilter;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub pending: usize,
    pub postponed: usize,
    pub total: usize,
}

pub fn filter_by(tasks: &[Task], mode: FilterMode, now: DateTime<Utc>) -> Vec<&Task> {
    tasks.iter().filter(|t| mode.matches(t, now)).collect()
}

/// Drops completed tasks unless they are asked for. Applied after
/// [`filter_by`].
pub fn visibility(tasks: Vec<&Task>, show_completed: bool) -> Vec<&Task> {
    if show_completed {
        tasks
    } else {
        tasks.into_iter().filter(|t| !t.completed).collect()
    }
}

pub fn counters(tasks: &[Task]) -> Counters {
    Counters {
        pending: tasks.iter().filter(|t| t.is_pending()).count(),
        postponed: tasks.iter().filter(|t| t.is_postponed()).count(),
        total: tasks.len(),
    }
}

/// Derived state of the task list screen, rebuilt from a store snapshot.
#[derive(Debug, Clone, Default)]
pub struct TaskListView {
    pub filter: FilterMode,
    pub show_completed: bool,
    visible: Vec<TaskKey>,
    counters: Counters,
}

impl TaskListView {
    pub fn new(filter: FilterMode, show_completed: bool) -> Self {
        Self {
            filter,
            show_completed,
            ..Self::default()
        }
    }

    pub fn refresh(&mut self, tasks: &[Task], now: DateTime<Utc>) {
        self.visible = visibility(filter_by(tasks, self.filter, now), self.show_completed)
            .into_iter()
            .map(|t| t.key.clone())
            .collect();
        self.counters = counters(tasks);
    }

    pub fn visible(&self) -> &[TaskKey] {
        &self.visible
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::task::TaskDraft;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn task(title: &str, priority: Priority, deadline: DateTime<Utc>) -> Task {
        Task::new(TaskDraft {
            title: title.to_string(),
            description: String::new(),
            priority,
            deadline,
        })
    }

    fn titles(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn priority_filter_keeps_only_alta() {
        let tasks = vec![
            task("a", Priority::Alta, now()),
            task("b", Priority::Media, now()),
            task("c", Priority::Alta, now()),
        ];

        let shown = filter_by(&tasks, FilterMode::Priority, now());

        assert_eq!(titles(&shown), vec!["a", "c"]);
    }

    #[test]
    fn overdue_filter_drops_completed() {
        let late = task("late", Priority::Baixa, now() - Duration::hours(1));
        let tasks = vec![late.clone(), task("soon", Priority::Baixa, now() + Duration::hours(1))];
        assert_eq!(titles(&filter_by(&tasks, FilterMode::Overdue, now())), vec!["late"]);

        let tasks = vec![late.toggled()];
        assert!(filter_by(&tasks, FilterMode::Overdue, now()).is_empty());
    }

    #[test]
    fn hidden_completed_applies_after_filter() {
        let tasks = vec![
            task("open", Priority::Alta, now()),
            task("done", Priority::Alta, now()).toggled(),
        ];

        let hidden = visibility(filter_by(&tasks, FilterMode::All, now()), false);
        let shown = visibility(filter_by(&tasks, FilterMode::All, now()), true);

        assert_eq!(titles(&hidden), vec!["open"]);
        assert_eq!(titles(&shown), vec!["open", "done"]);
    }

    #[test]
    fn counters_scan_the_whole_list() {
        let tasks = vec![
            task("pending", Priority::Alta, now()),
            task("done", Priority::Alta, now()).toggled(),
            task("moved", Priority::Baixa, now()).postponed(now()),
            task("moved and done", Priority::Baixa, now()).postponed(now()).toggled(),
        ];

        let counts = counters(&tasks);

        assert_eq!(
            counts,
            Counters {
                pending: 1,
                postponed: 2,
                total: 4
            }
        );
        assert!(counts.pending + counts.postponed <= counts.total);
    }

    #[test]
    fn view_total_ignores_filter() {
        let tasks = vec![
            task("a", Priority::Alta, now()),
            task("b", Priority::Baixa, now()).toggled(),
        ];
        let mut view = TaskListView::new(FilterMode::Priority, false);

        view.refresh(&tasks, now());

        assert_eq!(view.visible(), &[tasks[0].key.clone()]);
        assert_eq!(view.counters().total, 2);
    }

    #[test]
    fn filter_names_parse() {
        assert_eq!("Overdue".parse::<FilterMode>(), Ok(FilterMode::Overdue));
        assert!("later".parse::<FilterMode>().is_err());
        assert_eq!(FilterMode::Priority.to_string(), "priority");
    }
}
