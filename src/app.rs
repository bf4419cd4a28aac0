use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::debug;

use crate::form::{Field, TaskForm};
use crate::store::TaskStore;
use crate::task::{Priority, Task, TaskKey};
use crate::view::{FilterMode, TaskListView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    TaskList,
    /// Add form, or edit form when `editing` names a task.
    TaskInput { editing: Option<TaskKey> },
}

pub struct App {
    pub store: TaskStore,
    pub view: TaskListView,
    pub screen: Screen,
    pub selected: usize,
    pub form: TaskForm,
    pub focus: Field,
    pub alert: Option<String>,
    pub should_quit: bool,
    stale: Rc<Cell<bool>>,
}

impl App {
    pub fn new(mut store: TaskStore, filter: FilterMode, show_completed: bool) -> Self {
        let stale = Rc::new(Cell::new(true));
        store.subscribe({
            let stale = stale.clone();
            move |_| stale.set(true)
        });
        Self {
            store,
            view: TaskListView::new(filter, show_completed),
            screen: Screen::TaskList,
            selected: 0,
            form: TaskForm::default(),
            focus: Field::Title,
            alert: None,
            should_quit: false,
            stale,
        }
    }

    /// Recomputes the derived list if the store or the view settings
    /// changed since the last call.
    pub fn sync(&mut self, now: DateTime<Utc>) {
        if !self.stale.replace(false) {
            return;
        }
        self.view.refresh(self.store.tasks(), now);
        let len = self.view.visible().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    /// Overdue status moves with the clock even when nothing was edited.
    pub fn tick(&mut self) {
        self.stale.set(true);
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.view
            .visible()
            .iter()
            .filter_map(|key| self.store.get(key))
            .collect()
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.view
            .visible()
            .get(self.selected)
            .and_then(|key| self.store.get(key))
    }

    pub fn navigate(&mut self, screen: Screen) {
        debug!(?screen, "navigate");
        if let Screen::TaskInput { editing } = &screen {
            self.form = editing
                .as_ref()
                .and_then(|key| self.store.get(key))
                .map(TaskForm::for_task)
                .unwrap_or_default();
            self.focus = Field::Title;
            self.alert = None;
        }
        self.screen = screen;
    }

    pub fn go_back(&mut self) {
        self.navigate(Screen::TaskList);
    }

    pub fn set_filter(&mut self, filter: FilterMode) {
        self.view.filter = filter;
        self.selected = 0;
        self.stale.set(true);
    }

    pub fn toggle_show_completed(&mut self) {
        self.view.show_completed = !self.view.show_completed;
        self.stale.set(true);
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: DateTime<Utc>) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match self.screen {
            Screen::TaskList => self.handle_list_key(key, now),
            Screen::TaskInput { .. } => self.handle_input_key(key),
        }
        self.sync(now);
    }

    fn handle_list_key(&mut self, key: KeyEvent, now: DateTime<Utc>) {
        let selected = self.selected_task().map(|t| t.key.clone());
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.view.visible().len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('a') => self.navigate(Screen::TaskInput { editing: None }),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(key) = selected {
                    self.navigate(Screen::TaskInput { editing: Some(key) });
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(key) = selected {
                    self.store.delete(&key);
                }
            }
            KeyCode::Char('c') | KeyCode::Char(' ') => {
                if let Some(key) = selected {
                    self.store.toggle_complete(&key);
                }
            }
            KeyCode::Char('p') => {
                if let Some(key) = selected {
                    self.store.postpone(&key, now);
                }
            }
            KeyCode::Char('f') => self.set_filter(self.view.filter.next()),
            KeyCode::Char('1') => self.set_filter(FilterMode::All),
            KeyCode::Char('2') => self.set_filter(FilterMode::Priority),
            KeyCode::Char('3') => self.set_filter(FilterMode::Overdue),
            KeyCode::Char('h') => self.toggle_show_completed(),
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        if self.alert.take().is_some() {
            return;
        }
        match key.code {
            KeyCode::Esc => self.go_back(),
            KeyCode::Enter => self.submit(),
            KeyCode::Tab | KeyCode::Down => self.focus = self.focus.next(),
            KeyCode::BackTab | KeyCode::Up => self.focus = self.focus.prev(),
            KeyCode::Left if self.focus == Field::Priority => {
                self.form.priority = self.form.priority.map(|p| p.prev()).or(Some(Priority::Media));
            }
            KeyCode::Right if self.focus == Field::Priority => {
                self.form.priority = self.form.priority.map(|p| p.next()).or(Some(Priority::Media));
            }
            KeyCode::Backspace => {
                if let Some(text) = self.form.text_mut(self.focus) {
                    text.pop();
                }
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(text) = self.form.text_mut(self.focus) {
                    text.push(c);
                }
            }
            _ => {}
        }
    }

    fn submit(&mut self) {
        let draft = match self.form.submit() {
            Ok(draft) => draft,
            Err(err) => {
                self.alert = Some(err.to_string());
                return;
            }
        };
        if let Screen::TaskInput { editing } = &self.screen {
            match editing.clone() {
                Some(key) => {
                    self.store.edit(&key, &draft);
                }
                None => {
                    self.store.add(draft);
                }
            }
        }
        self.go_back();
    }
}
