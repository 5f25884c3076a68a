//! Screen implementations. Each screen is a top-level Component.

pub mod home;
pub mod settings;
pub mod stats;

use crate::component::Component;
use crate::screen::ScreenId;

/// Create all screens in tab order.
pub fn create_screens() -> Vec<(ScreenId, Box<dyn Component>)> {
    let screens: [(ScreenId, Box<dyn Component>); 3] = [
        (ScreenId::Home, Box::new(home::HomeScreen::new())),
        (ScreenId::Stats, Box::new(stats::StatsScreen::new())),
        (ScreenId::Settings, Box::new(settings::SettingsScreen::new())),
    ];
    screens.into()
}

/// Render a component into an off-screen buffer and flatten it to text.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) fn render_to_string(component: &dyn Component, width: u16, height: u16) -> String {
    use ratatui::{Terminal, backend::TestBackend};

    let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
    terminal
        .draw(|frame| component.render(frame, frame.area()))
        .unwrap();

    let buffer = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..height {
        for x in 0..width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}
