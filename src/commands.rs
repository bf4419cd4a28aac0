use std::io::Write;

use anyhow::{anyhow, bail};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::cli::{Command, TaskFields};
use crate::form::TaskForm;
use crate::store::TaskStore;
use crate::task::{Priority, Task, TaskKey};
use crate::ui::format_deadline;
use crate::view::{counters, filter_by, visibility, FilterMode};

/// Runs one non-interactive command against the store and writes its
/// report to `out`.
#[tracing::instrument(skip(store, out))]
pub fn dispatch(
    store: &mut TaskStore,
    command: Command,
    default_filter: FilterMode,
    show_completed: bool,
    now: DateTime<Utc>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Command::Tui => bail!("the interactive list is not a one-shot command"),
        Command::Add(fields) => {
            let form = apply_fields(TaskForm::default(), fields)?;
            let draft = form.submit()?;
            let key = store.add(draft);
            writeln!(out, "added {key}")?;
        }
        Command::Edit { key, fields } => {
            let key = resolve_key(store, &key)?;
            let task = store
                .get(&key)
                .ok_or_else(|| anyhow!("no task {key}"))?;
            let form = apply_fields(TaskForm::for_task(task), fields)?;
            let draft = form.submit()?;
            store.edit(&key, &draft);
            writeln!(out, "edited {key}")?;
        }
        Command::List { filter, all } => {
            let mode = filter.unwrap_or(default_filter);
            let tasks = store.tasks();
            let shown = visibility(filter_by(tasks, mode, now), all || show_completed);
            if shown.is_empty() {
                writeln!(out, "No tasks")?;
            }
            for task in shown {
                writeln!(out, "{}", format_row(task, now))?;
            }
            write_counters(store.tasks(), out)?;
        }
        Command::Toggle { key } => {
            let key = resolve_key(store, &key)?;
            store.toggle_complete(&key);
            let done = store.get(&key).is_some_and(|t| t.completed);
            writeln!(out, "{} {key}", if done { "completed" } else { "reopened" })?;
        }
        Command::Postpone { key } => {
            let key = resolve_key(store, &key)?;
            store.postpone(&key, now);
            let deadline = store.get(&key).and_then(|t| t.deadline);
            writeln!(out, "postponed {key} to {}", format_deadline(deadline))?;
        }
        Command::Delete { key } => {
            let key = resolve_key(store, &key)?;
            store.delete(&key);
            writeln!(out, "deleted {key}")?;
        }
        Command::Stats => write_counters(store.tasks(), out)?,
    }
    store.flush();
    info!(tasks = store.len(), "command finished");
    Ok(())
}

fn apply_fields(mut form: TaskForm, fields: TaskFields) -> anyhow::Result<TaskForm> {
    if let Some(title) = fields.title {
        form.title = title;
    }
    if let Some(description) = fields.description {
        form.description = description;
    }
    if let Some(priority) = fields.priority {
        form.priority = Some(priority.parse::<Priority>()?);
    }
    if let Some(date) = fields.date {
        form.date = date;
    }
    if let Some(time) = fields.time {
        form.time = time;
    }
    Ok(form)
}

/// Accepts a full key or any non-blank prefix matching exactly one task.
pub fn resolve_key(store: &TaskStore, prefix: &str) -> anyhow::Result<TaskKey> {
    if prefix.trim().is_empty() {
        bail!("a task key is required");
    }
    if let Some(task) = store.get(&TaskKey::from(prefix)) {
        return Ok(task.key.clone());
    }
    let matches: Vec<&Task> = store
        .tasks()
        .iter()
        .filter(|t| t.key.as_str().starts_with(prefix))
        .collect();
    match matches.as_slice() {
        [] => bail!("no task matches {prefix:?}"),
        [task] => Ok(task.key.clone()),
        _ => bail!("{prefix:?} matches more than one task"),
    }
}

fn format_row(task: &Task, now: DateTime<Utc>) -> String {
    let short: String = task.key.as_str().chars().take(8).collect();
    let mut row = format!(
        "{short} [{}] {} | {} | {}",
        if task.completed { "x" } else { " " },
        task.title,
        task.priority.map(Priority::label).unwrap_or("-"),
        format_deadline(task.deadline),
    );
    if task.is_overdue(now) {
        row.push_str(" | overdue");
    }
    if task.is_postponed() {
        row.push_str(&format!(" | postponed {}x", task.postponement_history.len()));
    }
    row
}

fn write_counters(tasks: &[Task], out: &mut impl Write) -> anyhow::Result<()> {
    let c = counters(tasks);
    writeln!(
        out,
        "Pending: {}  Postponed: {}  Total: {}",
        c.pending, c.postponed, c.total
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;
    use crate::error::ValidationError;
    use crate::storage::MemoryStore;
    use crate::store::TASKS_KEY;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn run(store: &mut TaskStore, command: Command) -> anyhow::Result<String> {
        let mut out = Vec::new();
        dispatch(store, command, FilterMode::All, false, now(), &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn add(store: &mut TaskStore, title: &str, priority: &str) -> TaskKey {
        run(
            store,
            Command::Add(TaskFields {
                title: Some(title.to_string()),
                priority: Some(priority.to_string()),
                date: Some("2024-05-02".to_string()),
                time: Some("10:00".to_string()),
                ..TaskFields::default()
            }),
        )
        .unwrap();
        store.tasks().last().unwrap().key.clone()
    }

    #[test]
    fn add_without_deadline_is_rejected() {
        let mut store = TaskStore::open(Arc::new(MemoryStore::new()));
        let err = run(
            &mut store,
            Command::Add(TaskFields {
                title: Some("No date".to_string()),
                ..TaskFields::default()
            }),
        )
        .unwrap_err();

        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::MissingRequiredField)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn list_applies_filter_and_prints_counters() {
        let mut store = TaskStore::open(Arc::new(MemoryStore::new()));
        add(&mut store, "Urgent", "alta");
        add(&mut store, "Later", "baixa");

        let out = run(
            &mut store,
            Command::List {
                filter: Some(FilterMode::Priority),
                all: false,
            },
        )
        .unwrap();

        assert!(out.contains("Urgent | Alta"));
        assert!(!out.contains("Later"));
        assert!(out.contains("Total: 2"));
    }

    #[test]
    fn prefix_keys_resolve() {
        let mut store = TaskStore::open(Arc::new(MemoryStore::new()));
        let key = add(&mut store, "Only", "Média");
        let prefix: String = key.as_str().chars().take(6).collect();

        run(&mut store, Command::Postpone { key: prefix.clone() }).unwrap();
        run(&mut store, Command::Toggle { key: prefix }).unwrap();

        let task = store.get(&key).unwrap();
        assert!(task.completed);
        assert_eq!(task.postponement_history, vec![now()]);
        assert!(resolve_key(&store, "zzzz").is_err());
    }

    #[test]
    fn blank_key_matches_nothing() {
        let mut store = TaskStore::open(Arc::new(MemoryStore::new()));
        add(&mut store, "Only", "Alta");

        assert!(run(&mut store, Command::Delete { key: String::new() }).is_err());
        assert!(resolve_key(&store, "  ").is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn toggle_reopens_completed_task() {
        let mut store = TaskStore::open(Arc::new(MemoryStore::new()));
        let key = add(&mut store, "Twice", "Baixa");

        let first = run(&mut store, Command::Toggle { key: key.to_string() }).unwrap();
        let second = run(&mut store, Command::Toggle { key: key.to_string() }).unwrap();

        assert!(first.starts_with("completed"));
        assert!(second.starts_with("reopened"));
        assert!(!store.get(&key).unwrap().completed);
    }

    #[test]
    fn edit_overrides_only_given_fields() {
        let mut store = TaskStore::open(Arc::new(MemoryStore::new()));
        let key = add(&mut store, "Draft", "Baixa");
        let deadline = store.get(&key).unwrap().deadline;

        run(
            &mut store,
            Command::Edit {
                key: key.to_string(),
                fields: TaskFields {
                    title: Some("Final".to_string()),
                    ..TaskFields::default()
                },
            },
        )
        .unwrap();

        let task = store.get(&key).unwrap();
        assert_eq!(task.title, "Final");
        assert_eq!(task.priority, Some(Priority::Baixa));
        assert_eq!(task.deadline, deadline);
    }

    #[test]
    fn renaming_keeps_stored_deadline_to_the_millisecond() {
        let blob = r#"[{"key":"0.77","value":"Dentist","priority":"Alta",
            "deadline":"2024-05-03T10:15:42.123Z","description":"",
            "completed":false,"postponementHistory":[]}]"#;
        let mut store = TaskStore::open(Arc::new(MemoryStore::with_value(TASKS_KEY, blob)));
        let before = store.tasks()[0].deadline;

        run(
            &mut store,
            Command::Edit {
                key: "0.77".to_string(),
                fields: TaskFields {
                    title: Some("Renamed".to_string()),
                    ..TaskFields::default()
                },
            },
        )
        .unwrap();

        let task = &store.tasks()[0];
        assert_eq!(task.title, "Renamed");
        assert_eq!(task.deadline, before);
    }

    #[test]
    fn delete_and_stats() {
        let mut store = TaskStore::open(Arc::new(MemoryStore::new()));
        let key = add(&mut store, "Gone", "Alta");
        add(&mut store, "Stays", "Alta");

        run(&mut store, Command::Delete { key: key.to_string() }).unwrap();
        let out = run(&mut store, Command::Stats).unwrap();

        assert_eq!(out.trim(), "Pending: 1  Postponed: 0  Total: 1");
    }
}
