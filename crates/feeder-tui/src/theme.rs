//! Meadow palette and semantic styling for the dashboard.

use ratatui::style::{Color, Modifier, Style};

use feeder_core::ChannelState;

// ── Core Palette ──────────────────────────────────────────────────────

pub const SKY: Color = Color::Rgb(128, 214, 255); // #80d6ff
pub const SUNFLOWER: Color = Color::Rgb(255, 200, 87); // #ffc857
pub const LEAF: Color = Color::Rgb(120, 220, 120); // #78dc78
pub const BERRY: Color = Color::Rgb(235, 87, 115); // #eb5773
pub const PLUM: Color = Color::Rgb(190, 130, 255); // #be82ff

// ── Extended Palette ──────────────────────────────────────────────────

pub const BARK: Color = Color::Rgb(110, 118, 140); // #6e768c
pub const FEATHER: Color = Color::Rgb(205, 208, 218); // #cdd0da
pub const BG_HIGHLIGHT: Color = Color::Rgb(40, 44, 52); // #282c34

// ── Semantic Styles ───────────────────────────────────────────────────

pub fn title_style() -> Style {
    Style::default().fg(SKY).add_modifier(Modifier::BOLD)
}

pub fn border_focused() -> Style {
    Style::default().fg(PLUM)
}

pub fn border_default() -> Style {
    Style::default().fg(BARK)
}

pub fn table_header() -> Style {
    Style::default()
        .fg(SKY)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
}

pub fn table_row() -> Style {
    Style::default().fg(FEATHER)
}

pub fn table_selected() -> Style {
    Style::default()
        .fg(PLUM)
        .bg(BG_HIGHLIGHT)
        .add_modifier(Modifier::BOLD)
}

pub fn tab_active() -> Style {
    Style::default().fg(PLUM).add_modifier(Modifier::BOLD)
}

pub fn tab_inactive() -> Style {
    Style::default().fg(FEATHER)
}

/// Key hint text (e.g., "q quit  ? help").
pub fn key_hint() -> Style {
    Style::default().fg(BARK)
}

pub fn key_hint_key() -> Style {
    Style::default().fg(SKY).add_modifier(Modifier::BOLD)
}

/// Gauge fill: green while stocked, red once under the alert threshold.
pub fn food_gauge(low: bool) -> Style {
    let color = if low { BERRY } else { LEAF };
    Style::default().fg(color).bg(BG_HIGHLIGHT)
}

pub fn switch_on() -> Style {
    Style::default().fg(LEAF).add_modifier(Modifier::BOLD)
}

pub fn switch_off() -> Style {
    Style::default().fg(BARK)
}

/// Colour for the live-feed status indicator.
pub fn channel_state(state: ChannelState) -> Style {
    let color = match state {
        ChannelState::Open => LEAF,
        ChannelState::Connecting => SUNFLOWER,
        ChannelState::Failed => BERRY,
        ChannelState::Idle | ChannelState::Closed => BARK,
    };
    Style::default().fg(color)
}

pub fn popup_border() -> Style {
    Style::default().fg(BERRY).add_modifier(Modifier::BOLD)
}
