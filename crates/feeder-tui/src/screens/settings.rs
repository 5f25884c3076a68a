//! Settings screen: unwelcome-visitor switches.
//!
//! Each entry is a species the feeder scares off when enabled. Space or
//! Enter flips the selected switch and syncs the enabled set to the
//! device; the row shows a pending marker until the device confirms.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Rect};
use ratatui::text::Span;
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState};

use feeder_core::VisitorToggle;

use crate::action::Action;
use crate::component::Component;
use crate::theme;

pub struct SettingsScreen {
    focused: bool,
    visitors: Arc<Vec<VisitorToggle>>,
    table_state: TableState,
    pending: Option<String>,
}

impl SettingsScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            visitors: Arc::new(Vec::new()),
            table_state: TableState::default().with_selected(Some(0)),
            pending: None,
        }
    }

    fn selected_index(&self) -> usize {
        self.table_state.selected().unwrap_or(0)
    }

    fn select(&mut self, idx: usize) {
        let clamped = idx.min(self.visitors.len().saturating_sub(1));
        self.table_state.select(Some(clamped));
    }

    fn move_selection(&mut self, delta: isize) {
        let idx = self.selected_index().saturating_add_signed(delta);
        self.select(idx);
    }
}

impl Component for SettingsScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('g') => self.select(0),
            KeyCode::Char('G') => self.select(usize::MAX),
            KeyCode::Char(' ') | KeyCode::Enter if self.pending.is_none() => {
                if let Some(visitor) = self.visitors.get(self.selected_index()) {
                    return Ok(Some(Action::ToggleVisitor(visitor.name.clone())));
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::ToggleVisitor(name) => self.pending = Some(name.clone()),
            Action::VisitorsUpdated(visitors) => {
                self.visitors = Arc::clone(visitors);
                self.pending = None;
                self.select(self.selected_index());
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Unwelcome visitors ")
            .title_style(theme::title_style())
            .title_bottom(Span::styled(" space toggle  j/k move ", theme::key_hint()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });

        if self.visitors.is_empty() {
            let empty = Paragraph::new("No unwelcome visitors configured")
                .alignment(Alignment::Center)
                .style(theme::key_hint())
                .block(block);
            frame.render_widget(empty, area);
            return;
        }

        let rows = self.visitors.iter().map(|v| {
            let switch = if self.pending.as_deref() == Some(v.name.as_str()) {
                Span::styled("[ … ]", theme::key_hint())
            } else if v.enabled {
                Span::styled("[ on]", theme::switch_on())
            } else {
                Span::styled("[off]", theme::switch_off())
            };
            Row::new(vec![Cell::from(switch), Cell::from(v.name.clone())])
                .style(theme::table_row())
        });

        let table = Table::new(rows, [Constraint::Length(6), Constraint::Min(10)])
            .header(Row::new(vec!["Scare", "Visitor"]).style(theme::table_header()))
            .row_highlight_style(theme::table_selected())
            .block(block);

        let mut state = self.table_state.clone();
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn id(&self) -> &str {
        "settings"
    }
}
