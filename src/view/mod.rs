//! Task cells and the event dispatch that keeps them in step with the store.
//!
//! Each task is rendered as one [`CellView`]: a completion toggle, a text
//! region that can be focused for editing, a tooltip and a delete control.
//! Renderers read the cells; user interaction comes back as [`ViewEvent`]s
//! routed through [`ViewController::dispatch`] by task id.

use bitflags::bitflags;
use indexmap::IndexMap;
use time::OffsetDateTime;

use crate::dates::{describe_created, now_local};
use crate::tasks::{EditOutcome, Task, TaskError, TaskId, TaskList};
use crate::text::decode_entities;

mod input;

pub use input::EditBuffer;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CellFlags: u8 {
        const COMPLETED = 1;
        const EDITABLE = 1 << 1;
        const EDITING = 1 << 2;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tooltip {
    /// Present only when the cell shows a shortened text.
    pub full_text: Option<String>,
    pub created: String,
}

impl Tooltip {
    fn for_task(task: &Task, now: OffsetDateTime) -> Self {
        Self {
            full_text: task
                .is_truncated()
                .then(|| decode_entities(task.full_text())),
            created: describe_created(task.created(), now),
        }
    }

    pub fn created_line(&self) -> String {
        format!("Created: {}", self.created)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellView {
    id: TaskId,
    flags: CellFlags,
    text: String,
    tooltip: Tooltip,
    editor: Option<EditBuffer>,
}

impl CellView {
    fn for_task(task: &Task, now: OffsetDateTime) -> Self {
        let flags = if task.is_completed() {
            CellFlags::COMPLETED
        } else {
            CellFlags::EDITABLE
        };
        Self {
            id: task.id(),
            flags,
            text: decode_entities(task.display_text()),
            tooltip: Tooltip::for_task(task, now),
            editor: None,
        }
    }

    fn refresh(&mut self, task: &Task, now: OffsetDateTime) {
        self.text = decode_entities(task.display_text());
        self.tooltip = Tooltip::for_task(task, now);
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn flags(&self) -> CellFlags {
        self.flags
    }

    pub fn is_completed(&self) -> bool {
        self.flags.contains(CellFlags::COMPLETED)
    }

    pub fn is_editable(&self) -> bool {
        self.flags.contains(CellFlags::EDITABLE)
    }

    pub fn is_editing(&self) -> bool {
        self.flags.contains(CellFlags::EDITING)
    }

    /// Shortened text while viewing, the full text being edited otherwise.
    pub fn text(&self) -> &str {
        match &self.editor {
            Some(editor) => editor.text(),
            None => &self.text,
        }
    }

    pub fn tooltip(&self) -> &Tooltip {
        &self.tooltip
    }

    pub fn editor(&self) -> Option<&EditBuffer> {
        self.editor.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    NumpadEnter,
    Escape,
    Char(char),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    ToggleClicked(TaskId),
    DeleteClicked(TaskId),
    FocusText(TaskId),
    AddClicked,
    Blur,
    KeyDown(Key),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    None,
    AddInput,
    Text(TaskId),
}

#[derive(Debug)]
pub struct ViewController {
    store: TaskList,
    cells: IndexMap<TaskId, CellView>,
    focus: Focus,
    add_input: EditBuffer,
    notice: Option<String>,
}

impl ViewController {
    /// Builds one cell per hydrated task, in list order.
    pub fn new(store: TaskList, notice: Option<String>) -> Self {
        let now = now_local();
        let cells = store
            .iter()
            .map(|task| (task.id(), CellView::for_task(task, now)))
            .collect();
        let add_input = EditBuffer::empty(store.display_options().max_task_length);
        Self {
            store,
            cells,
            focus: Focus::None,
            add_input,
            notice,
        }
    }

    pub fn store(&self) -> &TaskList {
        &self.store
    }

    pub fn cells(&self) -> impl Iterator<Item = &CellView> {
        self.cells.values()
    }

    pub fn cell(&self, id: TaskId) -> Option<&CellView> {
        self.cells.get(&id)
    }

    pub fn cell_at(&self, index: usize) -> Option<&CellView> {
        self.cells.get_index(index).map(|(_, cell)| cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn add_input(&self) -> &EditBuffer {
        &self.add_input
    }

    /// Start-up warning, shown until the first event is dispatched.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dispatch(&mut self, event: ViewEvent) -> Result<(), TaskError> {
        self.notice = None;
        match event {
            ViewEvent::ToggleClicked(id) => self.toggle(id),
            ViewEvent::DeleteClicked(id) => self.delete(id),
            ViewEvent::FocusText(id) => self.focus_text(id),
            ViewEvent::AddClicked => self.focus_add_input(),
            ViewEvent::Blur => self.blur(),
            ViewEvent::KeyDown(key) => self.key_down(key),
        }
    }

    fn toggle(&mut self, id: TaskId) -> Result<(), TaskError> {
        self.blur()?;
        if !self.cells.contains_key(&id) {
            // the commit above may have removed this very cell
            return Ok(());
        }
        let completed = self.store.toggle_completed(id)?;
        let cell = self
            .cells
            .get_mut(&id)
            .ok_or(TaskError::UnknownTask(id))?;
        cell.flags.set(CellFlags::COMPLETED, completed);
        cell.flags.set(CellFlags::EDITABLE, !completed);
        Ok(())
    }

    fn delete(&mut self, id: TaskId) -> Result<(), TaskError> {
        if self.focus == Focus::Text(id) {
            self.focus = Focus::None;
        } else {
            self.blur()?;
        }
        self.store.delete_task(id)?;
        self.cells.shift_remove(&id);
        Ok(())
    }

    fn focus_text(&mut self, id: TaskId) -> Result<(), TaskError> {
        if self.focus == Focus::Text(id) {
            return Ok(());
        }
        let editable = self
            .cells
            .get(&id)
            .map(CellView::is_editable)
            .ok_or(TaskError::UnknownTask(id))?;
        if !editable {
            return Ok(());
        }
        self.blur()?;
        let full_text = self
            .store
            .get(id)
            .map(|task| decode_entities(task.full_text()))
            .ok_or(TaskError::UnknownTask(id))?;
        let limit = self.store.display_options().max_task_length;
        let cell = self
            .cells
            .get_mut(&id)
            .ok_or(TaskError::UnknownTask(id))?;
        cell.editor = Some(EditBuffer::new(full_text, limit));
        cell.flags.insert(CellFlags::EDITING);
        self.focus = Focus::Text(id);
        Ok(())
    }

    fn focus_add_input(&mut self) -> Result<(), TaskError> {
        if self.focus == Focus::AddInput {
            return Ok(());
        }
        self.blur()?;
        self.focus = Focus::AddInput;
        Ok(())
    }

    fn blur(&mut self) -> Result<(), TaskError> {
        match std::mem::take(&mut self.focus) {
            Focus::None => Ok(()),
            Focus::AddInput => {
                self.commit_add();
                Ok(())
            }
            Focus::Text(id) => self.commit_edit(id),
        }
    }

    fn commit_add(&mut self) {
        let Some(id) = self.store.add_task(self.add_input.text()) else {
            return;
        };
        self.add_input.clear();
        if let Some(task) = self.store.get(id) {
            self.cells.insert(id, CellView::for_task(task, now_local()));
        }
    }

    fn commit_edit(&mut self, id: TaskId) -> Result<(), TaskError> {
        let cell = self
            .cells
            .get_mut(&id)
            .ok_or(TaskError::UnknownTask(id))?;
        cell.flags.remove(CellFlags::EDITING);
        let Some(editor) = cell.editor.take() else {
            return Ok(());
        };
        match self.store.edit_task(id, editor.text())? {
            EditOutcome::Deleted => {
                self.cells.shift_remove(&id);
            }
            EditOutcome::Updated => {
                if let (Some(task), Some(cell)) = (self.store.get(id), self.cells.get_mut(&id)) {
                    cell.refresh(task, now_local());
                }
            }
        }
        Ok(())
    }

    fn key_down(&mut self, key: Key) -> Result<(), TaskError> {
        if matches!(key, Key::Enter | Key::NumpadEnter | Key::Escape) {
            return self.blur();
        }
        let buffer = match self.focus {
            Focus::None => return Ok(()),
            Focus::AddInput => &mut self.add_input,
            Focus::Text(id) => match self
                .cells
                .get_mut(&id)
                .and_then(|cell| cell.editor.as_mut())
            {
                Some(editor) => editor,
                None => return Ok(()),
            },
        };
        match key {
            Key::Char(ch) => buffer.insert_char(ch),
            Key::Backspace => buffer.backspace(),
            Key::Delete => buffer.delete(),
            Key::Left => buffer.move_left(),
            Key::Right => buffer.move_right(),
            Key::Home => buffer.move_home(),
            Key::End => buffer.move_end(),
            Key::Enter | Key::NumpadEnter | Key::Escape => false,
        };
        Ok(())
    }
}
