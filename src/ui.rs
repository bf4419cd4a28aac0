use std::io;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use tracing::info;

use crate::app::{App, Screen};
use crate::form::Field;
use crate::task::{Priority, Task};
use crate::view::FilterMode;

const TICK: Duration = Duration::from_millis(1000);
const ORANGE: Color = Color::Rgb(255, 165, 0);

struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn enter() -> anyhow::Result<Self> {
        enable_raw_mode().context("enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend).context("create terminal")?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

pub fn run_tui(mut app: App) -> anyhow::Result<()> {
    let mut guard = TerminalGuard::enter()?;
    info!("interactive session started");
    run_app(&mut guard.terminal, &mut app).context("terminal loop failed")?;
    app.store.flush();
    info!(tasks = app.store.len(), "interactive session finished");
    Ok(())
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        let now = Utc::now();
        app.sync(now);
        terminal.draw(|f| draw(f, app, now))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key, Utc::now());
            }
        } else {
            app.tick();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

pub fn draw(f: &mut Frame, app: &App, now: DateTime<Utc>) {
    match &app.screen {
        Screen::TaskList => draw_list(f, app, now),
        Screen::TaskInput { editing } => draw_input(f, app, editing.is_some()),
    }
}

fn priority_color(priority: Option<Priority>) -> Color {
    match priority {
        Some(Priority::Alta) => Color::Red,
        Some(Priority::Media) => ORANGE,
        Some(Priority::Baixa) => Color::Green,
        None => Color::DarkGray,
    }
}

pub fn format_deadline(deadline: Option<DateTime<Utc>>) -> String {
    deadline
        .map(|d| d.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_else(|| "no date".to_string())
}

fn task_item<'a>(task: &'a Task, now: DateTime<Utc>) -> ListItem<'a> {
    let title_style = if task.completed {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else if task.is_overdue(now) {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };
    let priority = task.priority.map(Priority::label).unwrap_or("-");

    let mut meta = vec![
        Span::raw("  Priority: "),
        Span::styled(priority, Style::default().fg(priority_color(task.priority))),
        Span::raw(format!("  Due: {}", format_deadline(task.deadline))),
    ];
    if task.is_postponed() {
        meta.push(Span::styled(
            format!("  postponed {}x", task.postponement_history.len()),
            Style::default().fg(ORANGE),
        ));
    }

    let mut lines = vec![
        Line::from(vec![
            Span::styled("▌ ", Style::default().fg(priority_color(task.priority))),
            Span::styled(task.title.as_str(), title_style),
        ]),
        Line::from(meta),
    ];
    if !task.description.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("  {}", task.description),
            Style::default().fg(Color::Gray),
        )));
    }
    ListItem::new(lines)
}

fn draw_list(f: &mut Frame, app: &App, now: DateTime<Utc>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    let selected_tab = FilterMode::ALL
        .iter()
        .position(|m| *m == app.view.filter)
        .unwrap_or(0);
    let tabs = Tabs::new(FilterMode::ALL.iter().map(|m| m.label()).collect::<Vec<_>>())
        .block(Block::default().title("My Tasks").borders(Borders::ALL))
        .select(selected_tab)
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, chunks[0]);

    let counters = app.view.counters();
    let status = Line::from(vec![
        Span::raw(format!(
            "Pending: {}  Postponed: {}  Total: {}",
            counters.pending, counters.postponed, counters.total
        )),
        Span::styled(
            if app.view.show_completed {
                "  [h] hide completed"
            } else {
                "  [h] show completed"
            },
            Style::default().fg(Color::Cyan),
        ),
    ]);
    f.render_widget(Paragraph::new(status), chunks[1]);

    let tasks = app.visible_tasks();
    if tasks.is_empty() {
        let empty = Paragraph::new("No tasks")
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(empty, chunks[2]);
    } else {
        let items: Vec<ListItem> = tasks.iter().map(|t| task_item(t, now)).collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(app.selected));
        f.render_stateful_widget(list, chunks[2], &mut state);
    }

    let help = Paragraph::new(
        "a add  e edit  c toggle  p postpone  d delete  f/1-3 filter  q quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    f.render_widget(help, chunks[3]);
}

fn draw_input(f: &mut Frame, app: &App, editing: bool) {
    let outer = Block::default()
        .title(if editing { "Edit task" } else { "Add task" })
        .borders(Borders::ALL);
    let inner = outer.inner(f.area());
    f.render_widget(outer, f.area());

    let mut constraints = vec![Constraint::Length(3); Field::ORDER.len()];
    constraints.push(Constraint::Min(1));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (i, field) in Field::ORDER.iter().enumerate() {
        let value = match field {
            Field::Title => app.form.title.clone(),
            Field::Description => app.form.description.clone(),
            Field::Priority => match app.form.priority {
                Some(p) => format!("< {} >", p.label()),
                None => "< - >".to_string(),
            },
            Field::Date => app.form.date.clone(),
            Field::Time => app.form.time.clone(),
        };
        let border = if app.focus == *field {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        let widget = Paragraph::new(value).block(
            Block::default()
                .title(field.label())
                .borders(Borders::ALL)
                .border_style(border),
        );
        f.render_widget(widget, chunks[i]);
    }

    let help = Paragraph::new("Tab next field  ←/→ priority  Enter save  Esc cancel")
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(help, chunks[Field::ORDER.len()]);

    if let Some(alert) = &app.alert {
        let area = centered(f.area(), 50, 5);
        let popup = Paragraph::new(alert.as_str())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title("Error")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red)),
            );
        f.render_widget(Clear, area);
        f.render_widget(popup, area);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::storage::MemoryStore;
    use crate::store::TaskStore;
    use crate::task::TaskDraft;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(90, 24)).unwrap();
        terminal.draw(|f| draw(f, app, now())).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn empty_list_shows_placeholder_and_counters() {
        let mut app = App::new(
            TaskStore::open(Arc::new(MemoryStore::new())),
            FilterMode::All,
            false,
        );
        app.sync(now());

        let screen = render(&app);

        assert!(screen.contains("No tasks"));
        assert!(screen.contains("Pending: 0  Postponed: 0  Total: 0"));
    }

    #[test]
    fn list_rows_show_title_and_priority() {
        let mut store = TaskStore::open(Arc::new(MemoryStore::new()));
        store.add(TaskDraft {
            title: "Pay rent".to_string(),
            description: String::new(),
            priority: Priority::Alta,
            deadline: now(),
        });
        let mut app = App::new(store, FilterMode::All, false);
        app.sync(now());

        let screen = render(&app);

        assert!(screen.contains("Pay rent"));
        assert!(screen.contains("Priority: Alta"));
        assert!(screen.contains("Total: 1"));
    }

    #[test]
    fn failed_submit_draws_alert() {
        let mut app = App::new(
            TaskStore::open(Arc::new(MemoryStore::new())),
            FilterMode::All,
            false,
        );
        app.handle_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE), now());
        app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE), now());

        let screen = render(&app);

        assert!(screen.contains("Add task"));
        assert!(screen.contains("Please fill in all required fields."));
    }

    #[test]
    fn missing_deadline_reads_no_date() {
        assert_eq!(format_deadline(None), "no date");
    }
}
