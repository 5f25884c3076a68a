//! Home screen: hopper gauge and the live visit feed.
//!
//! Layout:
//! ┌─ Food ── feeder-1 ───────────────────────────────────────┐
//! │██████████████████████████ 64% ░░░░░░░░░░░░░░░░░░░░░░░░░░│
//! └──────────────────────────────────────────────────────────┘
//! ┌─ Live feed ── ● open ────────────────────────────────────┐
//! │ Robin visited at 2024-05-01T07:12:09Z           3m ago   │
//! │ Wren visited at 2024-05-01T07:10:44Z            5m ago   │
//! │ ...                                                      │
//! └──────────────────────────────────────────────────────────┘
//!
//! When the low-food alert is raised a popup is drawn over the screen
//! until dismissed with Enter or Esc. It reappears on the next raise.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Gauge, List, ListItem, Paragraph};

use feeder_core::{ChannelState, FoodLevel, VisitRecord};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

pub struct HomeScreen {
    focused: bool,
    device: Option<String>,
    food: FoodLevel,
    low_food: bool,
    alert_dismissed: bool,
    history: Arc<Vec<VisitRecord>>,
    feed_state: ChannelState,
    last_error: Option<String>,
}

impl HomeScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            device: None,
            food: FoodLevel::FULL,
            low_food: false,
            alert_dismissed: false,
            history: Arc::new(Vec::new()),
            feed_state: ChannelState::Idle,
            last_error: None,
        }
    }

    fn popup_visible(&self) -> bool {
        self.low_food && !self.alert_dismissed
    }

    fn border_style(&self) -> ratatui::style::Style {
        if self.focused {
            theme::border_focused()
        } else {
            theme::border_default()
        }
    }

    fn render_gauge(&self, frame: &mut Frame, area: Rect) {
        let mut title = vec![Span::styled(" Food ", theme::title_style())];
        if let Some(device) = &self.device {
            title.push(Span::styled(format!("── {device} "), theme::key_hint()));
        }

        let block = Block::default()
            .title(Line::from(title))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(self.border_style());

        let mut label = format!("{}%", self.food.percent());
        if self.low_food {
            label.push_str(" low");
        }

        let gauge = Gauge::default()
            .block(block)
            .gauge_style(theme::food_gauge(self.low_food))
            .percent(u16::from(self.food.percent()))
            .label(label);
        frame.render_widget(gauge, area);
    }

    fn render_feed(&self, frame: &mut Frame, area: Rect) {
        let title = Line::from(vec![
            Span::styled(" Live feed ", theme::title_style()),
            Span::styled(
                format!("── ● {} ", self.feed_state),
                theme::channel_state(self.feed_state),
            ),
        ]);

        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(self.border_style());

        if self.history.is_empty() {
            let message = match (&self.last_error, self.feed_state) {
                (Some(err), _) => format!("Not connected: {err}"),
                (None, ChannelState::Failed) => "Live feed unavailable".to_owned(),
                _ => "Waiting for visitors…".to_owned(),
            };
            let placeholder = Paragraph::new(message)
                .alignment(Alignment::Center)
                .style(theme::key_hint())
                .block(block);
            frame.render_widget(placeholder, area);
            return;
        }

        let now = SystemTime::now();
        let items: Vec<ListItem> = self
            .history
            .iter()
            .map(|record| {
                let mut spans = vec![Span::styled(record.as_str(), theme::table_row())];
                if let Some(age) = visit_age(record, now) {
                    spans.push(Span::styled(format!("  {age} ago"), theme::key_hint()));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        frame.render_widget(List::new(items).block(block), area);
    }

    fn render_alert(&self, frame: &mut Frame, area: Rect) {
        let width = 44u16.min(area.width);
        let height = 5u16.min(area.height);
        let popup = Rect::new(
            area.x + (area.width.saturating_sub(width)) / 2,
            area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
        );

        let block = Block::default()
            .title(" Low food ")
            .title_style(theme::popup_border())
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(theme::popup_border());

        let text = vec![
            Line::from(format!("The hopper is down to {}.", self.food)),
            Line::from(Span::styled("Enter/Esc to dismiss", theme::key_hint())),
        ];

        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(text)
                .alignment(Alignment::Center)
                .block(block),
            popup,
        );
    }
}

/// Time since the visit, when its timestamp is RFC 3339.
fn visit_age(record: &VisitRecord, now: SystemTime) -> Option<String> {
    let at = humantime::parse_rfc3339_weak(record.visited_at()).ok()?;
    let elapsed = now.duration_since(at).ok()?;
    let rounded = Duration::from_secs(elapsed.as_secs());
    Some(humantime::format_duration(rounded).to_string())
}

impl Component for HomeScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.popup_visible() && matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            return Ok(Some(Action::DismissFoodAlert));
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::Connected(device) => {
                self.device = Some(device.clone());
                self.last_error = None;
            }
            Action::Disconnected(reason) => {
                self.last_error = Some(reason.clone());
            }
            Action::FoodLevelUpdated(level) => self.food = *level,
            Action::FoodAlertChanged(raised) => {
                if *raised && !self.low_food {
                    self.alert_dismissed = false;
                }
                self.low_food = *raised;
            }
            Action::DismissFoodAlert => self.alert_dismissed = true,
            Action::HistoryUpdated(records) => self.history = Arc::clone(records),
            Action::FeedStateChanged(state) => self.feed_state = *state,
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let [gauge_area, feed_area] =
            Layout::vertical([Constraint::Length(3), Constraint::Min(3)]).areas(area);

        self.render_gauge(frame, gauge_area);
        self.render_feed(frame, feed_area);

        if self.popup_visible() {
            self.render_alert(frame, area);
        }
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn id(&self) -> &str {
        "home"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::screens::render_to_string;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn feed_lists_records_newest_first() {
        let mut home = HomeScreen::new();
        let records = vec![
            VisitRecord::new("Robin", "1714547529"),
            VisitRecord::new("Wren", "1714547400"),
        ];
        home.update(&Action::HistoryUpdated(Arc::new(records))).unwrap();
        home.update(&Action::FeedStateChanged(ChannelState::Open)).unwrap();

        let screen = render_to_string(&home, 60, 12);
        let robin = screen.find("Robin visited at 1714547529").unwrap();
        let wren = screen.find("Wren visited at 1714547400").unwrap();
        assert!(robin < wren);
        assert!(screen.contains("open"));
    }

    #[test]
    fn gauge_shows_truncated_percent() {
        let mut home = HomeScreen::new();
        home.update(&Action::FoodLevelUpdated(FoodLevel::new(0.647))).unwrap();

        assert!(render_to_string(&home, 60, 12).contains("64%"));
    }

    #[test]
    fn low_food_popup_dismisses_and_returns_on_next_raise() {
        let mut home = HomeScreen::new();
        home.update(&Action::FoodLevelUpdated(FoodLevel::new(0.05))).unwrap();
        home.update(&Action::FoodAlertChanged(true)).unwrap();
        assert!(render_to_string(&home, 60, 12).contains("Low food"));

        let action = home.handle_key_event(key(KeyCode::Enter)).unwrap();
        assert!(matches!(action, Some(Action::DismissFoodAlert)));
        home.update(&Action::DismissFoodAlert).unwrap();
        assert!(!render_to_string(&home, 60, 12).contains("Low food"));

        // Still low: a repeated reading does not bring the popup back
        home.update(&Action::FoodAlertChanged(true)).unwrap();
        assert!(!home.popup_visible());

        home.update(&Action::FoodAlertChanged(false)).unwrap();
        home.update(&Action::FoodAlertChanged(true)).unwrap();
        assert!(home.popup_visible());
    }

    #[test]
    fn keys_pass_through_without_popup() {
        let mut home = HomeScreen::new();
        assert!(home.handle_key_event(key(KeyCode::Enter)).unwrap().is_none());
    }

    #[test]
    fn age_only_for_rfc3339_timestamps() {
        let now = humantime::parse_rfc3339("2024-05-01T07:15:09Z").unwrap();
        let record = VisitRecord::new("Robin", "2024-05-01T07:12:09Z");
        assert_eq!(visit_age(&record, now).as_deref(), Some("3m"));

        let epoch = VisitRecord::new("Robin", "1714547529");
        assert_eq!(visit_age(&epoch, now), None);
    }
}
