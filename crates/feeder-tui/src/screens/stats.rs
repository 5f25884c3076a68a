//! Stats screen: the top-species leaderboard.
//!
//! Layout:
//! ┌─ Top species ────────────────────────────────────────────┐
//! │  #   Species            Visits                           │
//! │  1   Robin                  42  ████████████████████     │
//! │  2   Wren                   17  ████████                 │
//! └──────────────────────────────────────────────────────────┘
//!  r refresh

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table};

use feeder_core::SpeciesCount;

use crate::action::Action;
use crate::component::Component;
use crate::theme;

const BAR_WIDTH: u64 = 24;

pub struct StatsScreen {
    focused: bool,
    species: Arc<Vec<SpeciesCount>>,
    refreshing: bool,
}

impl StatsScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            species: Arc::new(Vec::new()),
            refreshing: false,
        }
    }
}

/// Bar scaled against the leader's count.
fn bar(visits: u64, max: u64) -> String {
    if max == 0 {
        return String::new();
    }
    let len = (visits * BAR_WIDTH).div_ceil(max);
    "█".repeat(usize::try_from(len).unwrap_or(0))
}

impl Component for StatsScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match key.code {
            KeyCode::Char('r') if !self.refreshing => Ok(Some(Action::RefreshSpecies)),
            _ => Ok(None),
        }
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::RefreshSpecies => self.refreshing = true,
            Action::SpeciesUpdated(species) => {
                self.species = Arc::clone(species);
                self.refreshing = false;
            }
            Action::Notify(_) => self.refreshing = false,
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let [table_area, hint_area] =
            Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(area);

        let mut title = vec![Span::styled(" Top species ", theme::title_style())];
        if self.refreshing {
            title.push(Span::styled("── refreshing… ", theme::key_hint()));
        }

        let block = Block::default()
            .title(Line::from(title))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });

        if self.species.is_empty() {
            let empty = Paragraph::new("No visits recorded yet")
                .alignment(Alignment::Center)
                .style(theme::key_hint())
                .block(block);
            frame.render_widget(empty, table_area);
        } else {
            let max = self.species.iter().map(|s| s.num_visits).max().unwrap_or(0);
            let rows = self.species.iter().enumerate().map(|(i, s)| {
                Row::new(vec![
                    Cell::from((i + 1).to_string()),
                    Cell::from(s.common_name.clone()),
                    Cell::from(format!("{:>6}", s.num_visits)),
                    Cell::from(Span::styled(bar(s.num_visits, max), theme::food_gauge(false))),
                ])
                .style(theme::table_row())
            });

            let table = Table::new(
                rows,
                [
                    Constraint::Length(3),
                    Constraint::Min(16),
                    Constraint::Length(7),
                    Constraint::Length(u16::try_from(BAR_WIDTH).unwrap_or(24)),
                ],
            )
            .header(Row::new(vec!["#", "Species", "Visits", ""]).style(theme::table_header()))
            .block(block);
            frame.render_widget(table, table_area);
        }

        let hints = Line::from(vec![
            Span::styled(" r ", theme::key_hint_key()),
            Span::styled("refresh", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(hints), hint_area);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn id(&self) -> &str {
        "stats"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::screens::render_to_string;

    fn count(name: &str, visits: u64) -> SpeciesCount {
        SpeciesCount {
            common_name: name.into(),
            num_visits: visits,
        }
    }

    #[test]
    fn bars_scale_to_leader() {
        assert_eq!(bar(42, 42).chars().count(), 24);
        assert_eq!(bar(21, 42).chars().count(), 12);
        assert_eq!(bar(1, 42).chars().count(), 1);
        assert_eq!(bar(0, 0), "");
    }

    #[test]
    fn leaderboard_renders_in_rank_order() {
        let mut stats = StatsScreen::new();
        stats
            .update(&Action::SpeciesUpdated(Arc::new(vec![
                count("Robin", 42),
                count("Wren", 17),
            ])))
            .unwrap();

        let screen = render_to_string(&stats, 70, 8);
        let robin = screen.find("Robin").unwrap();
        let wren = screen.find("Wren").unwrap();
        assert!(robin < wren);
        assert!(screen.contains("42"));
    }

    #[test]
    fn empty_board_has_placeholder() {
        let stats = StatsScreen::new();
        assert!(render_to_string(&stats, 70, 8).contains("No visits recorded yet"));
    }

    #[test]
    fn refresh_key_is_ignored_while_in_flight() {
        let mut stats = StatsScreen::new();
        let key = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE);

        let action = stats.handle_key_event(key).unwrap();
        assert!(matches!(action, Some(Action::RefreshSpecies)));

        stats.update(&Action::RefreshSpecies).unwrap();
        assert!(stats.handle_key_event(key).unwrap().is_none());

        stats.update(&Action::SpeciesUpdated(Arc::new(Vec::new()))).unwrap();
        assert!(stats.handle_key_event(key).unwrap().is_some());
    }
}
