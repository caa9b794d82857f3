use std::io::Stdout;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::config::themes::{Palette, ThemeRegistry};
use crate::config::AppConfig;
use crate::tasks::TaskId;
use crate::ui;
use crate::view::{Focus, Key, ViewController, ViewEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    SelectFirst,
    SelectLast,
    ToggleSelected,
    EditSelected,
    DeleteSelected,
    AddTask,
}

pub struct App {
    pub config: Arc<AppConfig>,
    view: ViewController,
    selected: usize,
    list_state: ListState,
    palette: Palette,
    status_message: Option<String>,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: Arc<AppConfig>, view: ViewController) -> Self {
        let palette = ThemeRegistry::default().palette(config.theme);
        Self {
            config,
            view,
            selected: 0,
            list_state: ListState::default(),
            palette,
            status_message: None,
            should_quit: false,
            tick_rate: Duration::from_millis(250),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    pub fn view(&self) -> &ViewController {
        &self.view
    }

    pub fn selected(&self) -> Option<usize> {
        if self.view.is_empty() {
            None
        } else {
            Some(self.selected)
        }
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            let selected = self.selected();
            terminal
                .draw(|frame| {
                    self.list_state.select(selected);
                    let screen = ui::Screen {
                        view: &self.view,
                        palette: &self.palette,
                        status_message: self.status_message.as_deref(),
                    };
                    ui::draw_app(frame, &screen, &mut self.list_state);
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            if event::poll(self.tick_rate).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Resize(_, _) => {
                        // next draw picks up the new size
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        self.status_message = None;

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.handle_action(Action::Quit);
            return;
        }

        if self.view.focus() != Focus::None {
            if let Some(mapped) = map_editing_key(key) {
                self.send(ViewEvent::KeyDown(mapped));
            }
            return;
        }

        let plain = !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
        let action = match key.code {
            KeyCode::Char('q') if plain => Some(Action::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
            KeyCode::Char('g') | KeyCode::Home => Some(Action::SelectFirst),
            KeyCode::Char('G') | KeyCode::End => Some(Action::SelectLast),
            KeyCode::Char(' ') | KeyCode::Char('x') if plain => Some(Action::ToggleSelected),
            KeyCode::Char('e') | KeyCode::Enter if plain => Some(Action::EditSelected),
            KeyCode::Char('d') | KeyCode::Delete if plain => Some(Action::DeleteSelected),
            KeyCode::Char('a') | KeyCode::Char('+') if plain => Some(Action::AddTask),
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => {
                if self.view.focus() != Focus::None {
                    self.send(ViewEvent::Blur);
                }
                self.should_quit = true;
            }
            Action::SelectNext => self.move_selection(1),
            Action::SelectPrevious => self.move_selection(-1),
            Action::SelectFirst => self.selected = 0,
            Action::SelectLast => self.selected = self.view.len().saturating_sub(1),
            Action::ToggleSelected => {
                if let Some(id) = self.selected_id() {
                    self.send(ViewEvent::ToggleClicked(id));
                }
            }
            Action::EditSelected => match self.view.cell_at(self.selected) {
                Some(cell) if cell.is_editable() => {
                    let id = cell.id();
                    self.send(ViewEvent::FocusText(id));
                }
                Some(_) => {
                    self.status_message =
                        Some("Completed tasks are locked; toggle to edit.".to_string());
                }
                None => {}
            },
            Action::DeleteSelected => {
                if let Some(id) = self.selected_id() {
                    self.send(ViewEvent::DeleteClicked(id));
                }
            }
            Action::AddTask => self.send(ViewEvent::AddClicked),
        }
    }

    fn send(&mut self, event: ViewEvent) {
        let before = self.view.len();
        let was_adding = self.view.focus() == Focus::AddInput;
        if let Err(err) = self.view.dispatch(event) {
            tracing::error!(?err, ?event, "view event failed");
            self.status_message = Some(err.to_string());
        }
        if was_adding && self.view.len() > before {
            self.selected = self.view.len() - 1;
            self.status_message = Some("Task added".to_string());
        } else if matches!(event, ViewEvent::DeleteClicked(_)) && self.view.len() < before {
            self.status_message = Some("Task deleted".to_string());
        }
        self.normalize_selection();
    }

    fn selected_id(&self) -> Option<TaskId> {
        self.view.cell_at(self.selected).map(|cell| cell.id())
    }

    fn move_selection(&mut self, delta: isize) {
        if self.view.is_empty() {
            self.selected = 0;
            return;
        }
        let last = self.view.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }

    fn normalize_selection(&mut self) {
        if self.view.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.view.len() {
            self.selected = self.view.len() - 1;
        }
    }
}

fn map_editing_key(key: KeyEvent) -> Option<Key> {
    if key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
    {
        return None;
    }
    let mapped = match key.code {
        KeyCode::Enter if key.state.contains(KeyEventState::KEYPAD) => Key::NumpadEnter,
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        KeyCode::Char(ch) => Key::Char(ch),
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        _ => return None,
    };
    Some(mapped)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("creating terminal backend")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("restoring screen state")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DisplayOptions;
    use crate::storage::MemoryRepository;
    use crate::tasks::TaskList;

    fn app() -> (App, MemoryRepository) {
        let repo = MemoryRepository::default();
        let store = TaskList::hydrate(Box::new(repo.clone()), DisplayOptions::default());
        let view = ViewController::new(store, None);
        (App::new(Arc::new(AppConfig::default()), view), repo)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_line(app: &mut App, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
        press(app, KeyCode::Enter);
    }

    #[test]
    fn add_key_focuses_input_and_enter_commits() {
        let (mut app, repo) = app();
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.view().focus(), Focus::AddInput);
        type_line(&mut app, "quit typing q here");
        assert_eq!(app.view().focus(), Focus::None);
        assert_eq!(app.view().len(), 1);
        assert!(!app.should_quit);
        assert_eq!(repo.snapshot()[0].full_text, "quit typing q here");
        assert_eq!(app.status_message(), Some("Task added"));
    }

    #[test]
    fn selection_follows_new_tasks_and_deletes() {
        let (mut app, repo) = app();
        for text in ["one", "two", "three"] {
            press(&mut app, KeyCode::Char('a'));
            type_line(&mut app, text);
        }
        assert_eq!(app.selected(), Some(2));
        press(&mut app, KeyCode::Char('k'));
        press(&mut app, KeyCode::Char('x'));
        assert!(repo.snapshot()[1].is_completed);

        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.view().focus(), Focus::None);

        press(&mut app, KeyCode::Char('G'));
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.selected(), Some(1));
        let texts: Vec<String> = repo.snapshot().into_iter().map(|r| r.full_text).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn failed_delete_keeps_the_error_message() {
        let (mut app, _repo) = app();
        press(&mut app, KeyCode::Char('a'));
        type_line(&mut app, "only");
        let id = app.selected_id().expect("selected task");

        app.send(ViewEvent::DeleteClicked(id));
        assert_eq!(app.status_message(), Some("Task deleted"));
        assert!(app.view().is_empty());

        app.status_message = None;
        app.send(ViewEvent::DeleteClicked(id));
        let message = app.status_message().expect("error shown");
        assert_ne!(message, "Task deleted");
        assert!(message.contains(&id.to_string()), "{message}");
    }

    #[test]
    fn numpad_enter_maps_to_its_own_key() {
        let mut key = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        key.state = KeyEventState::KEYPAD;
        assert_eq!(map_editing_key(key), Some(Key::NumpadEnter));
        assert_eq!(
            map_editing_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)),
            None
        );
    }

    #[test]
    fn ctrl_c_commits_pending_edit_before_quitting() {
        let (mut app, repo) = app();
        press(&mut app, KeyCode::Char('a'));
        for ch in "unsaved".chars() {
            press(&mut app, KeyCode::Char(ch));
        }
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
        assert_eq!(repo.snapshot()[0].full_text, "unsaved");
    }
}
