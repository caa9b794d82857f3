use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::config::themes::Palette;
use crate::tasks::PersistenceStatus;
use crate::view::{CellView, Focus, ViewController};

const HIGHLIGHT_SYMBOL: &str = "› ";
const CHECKBOX_WIDTH: u16 = 4;

/// Everything a frame needs from the running app.
pub struct Screen<'a> {
    pub view: &'a ViewController,
    pub palette: &'a Palette,
    pub status_message: Option<&'a str>,
}

pub fn draw_app(frame: &mut Frame, screen: &Screen<'_>, list_state: &mut ListState) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(2),
        ])
        .split(frame.size());

    draw_cells(frame, screen, vertical[0], list_state);
    draw_add_input(frame, screen, vertical[1]);
    draw_tooltip(frame, screen, vertical[2], list_state.selected());
    draw_status(frame, screen, vertical[3]);
}

fn draw_cells(frame: &mut Frame, screen: &Screen<'_>, area: Rect, list_state: &mut ListState) {
    let palette = screen.palette;
    let view = screen.view;
    let editing = matches!(view.focus(), Focus::Text(_));

    let title = format!("Tasks ({})", view.len());
    let border_style = if editing {
        Style::default().fg(palette.accent)
    } else {
        Style::default().fg(palette.muted)
    };
    if view.is_empty() {
        let empty = Paragraph::new("No tasks yet. Press a to add one.")
            .style(Style::default().fg(palette.muted))
            .block(
                Block::default()
                    .title("Tasks (0)")
                    .borders(Borders::ALL)
                    .border_style(border_style),
            );
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = view
        .cells()
        .map(|cell| ListItem::new(cell_line(cell, palette)))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(border_style),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol(HIGHLIGHT_SYMBOL);

    frame.render_stateful_widget(list, area, list_state);

    if let Focus::Text(id) = view.focus() {
        let Some(index) = view.store().position(id) else {
            return;
        };
        let Some(editor) = view.cell(id).and_then(CellView::editor) else {
            return;
        };
        let row = index.saturating_sub(list_state.offset());
        let inner_height = area.height.saturating_sub(2) as usize;
        if row >= inner_height {
            return;
        }
        let prefix = HIGHLIGHT_SYMBOL.width() as u16 + CHECKBOX_WIDTH;
        let column = clamp_column(area, 1 + prefix, editor.cursor_column());
        frame.set_cursor(column, area.y + 1 + row as u16);
    }
}

fn cell_line<'a>(cell: &'a CellView, palette: &Palette) -> Line<'a> {
    let checkbox = if cell.is_completed() { "[✓] " } else { "[ ] " };
    let text_style = if cell.is_editing() {
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::UNDERLINED)
    } else if cell.is_completed() {
        Style::default()
            .fg(palette.completed)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(palette.text)
    };
    Line::from(vec![
        Span::styled(checkbox, Style::default().fg(palette.accent)),
        Span::styled(cell.text(), text_style),
    ])
}

fn draw_add_input(frame: &mut Frame, screen: &Screen<'_>, area: Rect) {
    let palette = screen.palette;
    let focused = screen.view.focus() == Focus::AddInput;
    let input = screen.view.add_input();
    let (border_style, text) = if focused || !input.text().is_empty() {
        (
            Style::default().fg(if focused { palette.accent } else { palette.muted }),
            Span::styled(input.text(), Style::default().fg(palette.text)),
        )
    } else {
        (
            Style::default().fg(palette.muted),
            Span::styled("What needs doing?", Style::default().fg(palette.muted)),
        )
    };
    let paragraph = Paragraph::new(Line::from(text)).block(
        Block::default()
            .title("New task")
            .borders(Borders::ALL)
            .border_style(border_style),
    );
    frame.render_widget(paragraph, area);

    if focused {
        let column = clamp_column(area, 1, input.cursor_column());
        frame.set_cursor(column, area.y + 1);
    }
}

fn draw_tooltip(frame: &mut Frame, screen: &Screen<'_>, area: Rect, selected: Option<usize>) {
    let palette = screen.palette;
    let mut lines = Vec::new();
    if let Some(cell) = selected.and_then(|index| screen.view.cell_at(index)) {
        let tooltip = cell.tooltip();
        if let Some(full_text) = &tooltip.full_text {
            lines.push(Line::from(Span::styled(
                full_text.as_str(),
                Style::default().fg(palette.text),
            )));
            lines.push(Line::from(Span::styled(
                "─".repeat(area.width.saturating_sub(2) as usize),
                Style::default().fg(palette.muted),
            )));
        }
        lines.push(Line::from(Span::styled(
            tooltip.created_line(),
            Style::default().fg(palette.muted),
        )));
    }
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Details").borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn draw_status(frame: &mut Frame, screen: &Screen<'_>, area: Rect) {
    let palette = screen.palette;
    let store = screen.view.store();

    let message = screen.view.notice().or(screen.status_message);
    let mut first = Vec::new();
    if let PersistenceStatus::Failed(reason) = store.persistence_status() {
        first.push(Span::styled(
            format!("Save failed: {reason}"),
            Style::default().fg(palette.warning),
        ));
    } else if let Some(message) = message {
        let style = if screen.view.notice().is_some() {
            Style::default().fg(palette.warning)
        } else {
            Style::default().fg(palette.text)
        };
        first.push(Span::styled(message, style));
    }

    let done = store.iter().filter(|task| task.is_completed()).count();
    let summary = format!(
        "{done}/{} done · storage: {}",
        store.len(),
        store.persistence_mode()
    );
    let help = match screen.view.focus() {
        Focus::None => "j/k move · space toggle · e edit · d delete · a add · q quit",
        Focus::AddInput | Focus::Text(_) => "Enter/Esc commit · Ctrl-C quit",
    };

    let lines = vec![
        Line::from(first),
        Line::from(vec![
            Span::styled(summary, Style::default().fg(palette.muted)),
            Span::raw("  "),
            Span::styled(help, Style::default().fg(palette.muted)),
        ]),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn clamp_column(area: Rect, offset: u16, cursor: usize) -> u16 {
    let right = area.x + area.width.saturating_sub(2);
    let column = area.x as usize + offset as usize + cursor;
    column.min(right as usize) as u16
}

#[cfg(test)]
mod tests {
    use ratatui::backend::{Backend, TestBackend};
    use ratatui::buffer::Buffer;
    use ratatui::Terminal;

    use super::*;
    use crate::config::themes::ThemeRegistry;
    use crate::config::{DisplayOptions, ThemeName};
    use crate::storage::MemoryRepository;
    use crate::tasks::TaskList;
    use crate::view::{Key, ViewEvent};

    fn rows(buffer: &Buffer) -> Vec<String> {
        let area = buffer.area;
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buffer.get(x, y).symbol().to_string())
                    .collect::<String>()
            })
            .collect()
    }

    fn render(view: &ViewController, selected: Option<usize>) -> Vec<String> {
        let palette = ThemeRegistry::default().palette(ThemeName::Dark);
        let mut terminal = Terminal::new(TestBackend::new(70, 16)).expect("terminal");
        let mut list_state = ListState::default();
        list_state.select(selected);
        terminal
            .draw(|frame| {
                let screen = Screen {
                    view,
                    palette: &palette,
                    status_message: None,
                };
                draw_app(frame, &screen, &mut list_state);
            })
            .expect("draw");
        rows(terminal.backend().buffer())
    }

    fn view_with(texts: &[&str], notice: Option<&str>) -> ViewController {
        let mut store = TaskList::hydrate(
            Box::new(MemoryRepository::default()),
            DisplayOptions::default(),
        );
        for text in texts {
            store.add_task(text);
        }
        ViewController::new(store, notice.map(str::to_string))
    }

    #[test]
    fn renders_cells_with_checkbox_and_tooltip() {
        let mut view = view_with(
            &["Buy milk", "Buy milk and eggs for breakfast tomorrow & more"],
            None,
        );
        let first = view.cell_at(0).map(CellView::id).expect("first cell");
        view.dispatch(ViewEvent::ToggleClicked(first)).expect("toggle");

        let screen = render(&view, Some(1)).join("\n");
        assert!(screen.contains("[✓] Buy milk"), "{screen}");
        assert!(screen.contains("[ ]  Buy milk and eggs for breakfast…"), "{screen}");
        assert!(
            screen.contains("Buy milk and eggs for breakfast tomorrow & more"),
            "{screen}"
        );
        assert!(screen.contains("Created: Today, "), "{screen}");
        assert!(screen.contains("1/2 done · storage: memory"), "{screen}");
    }

    #[test]
    fn shows_notice_and_empty_placeholder() {
        let view = view_with(&[], Some("Persistent storage is unavailable"));
        let screen = render(&view, None).join("\n");
        assert!(screen.contains("No tasks yet"), "{screen}");
        assert!(screen.contains("Persistent storage is unavailable"), "{screen}");
        assert!(screen.contains("What needs doing?"), "{screen}");
    }

    #[test]
    fn add_input_shows_typed_text() {
        let mut view = view_with(&[], None);
        view.dispatch(ViewEvent::AddClicked).expect("focus");
        for ch in "water plants".chars() {
            view.dispatch(ViewEvent::KeyDown(Key::Char(ch))).expect("type");
        }
        let screen = render(&view, None).join("\n");
        assert!(screen.contains("│water plants"), "{screen}");
        assert!(screen.contains("Enter/Esc commit"), "{screen}");
    }

    #[test]
    fn editing_cell_places_cursor_after_text() {
        let mut view = view_with(&["first", "draft"], None);
        let id = view.cell_at(1).map(CellView::id).expect("second cell");
        view.dispatch(ViewEvent::FocusText(id)).expect("focus");

        let palette = ThemeRegistry::default().palette(ThemeName::Dark);
        let mut terminal = Terminal::new(TestBackend::new(70, 16)).expect("terminal");
        let mut list_state = ListState::default();
        list_state.select(Some(1));
        terminal
            .draw(|frame| {
                let screen = Screen {
                    view: &view,
                    palette: &palette,
                    status_message: None,
                };
                draw_app(frame, &screen, &mut list_state);
            })
            .expect("draw");
        // border, highlight symbol and checkbox precede the five characters
        assert_eq!(terminal.backend_mut().get_cursor().expect("cursor"), (12, 2));
    }
}
