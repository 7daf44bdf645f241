use ratatui::style::Color;

/// Light or dark rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Light,
    Dark,
}

/// Color palette for the whole UI. The mode is read from the terminal once at
/// startup and afterwards changes only through [`Theme::toggle`].
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    mode: Mode,
}

impl Theme {
    /// Detect the terminal's background preference. Falls back to dark, the
    /// common terminal default, when no hint is available.
    pub fn detect() -> Self {
        let mode = std::env::var("COLORFGBG")
            .ok()
            .and_then(|value| mode_from_colorfgbg(&value))
            .unwrap_or(Mode::Dark);
        Self { mode }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The only writer of the mode after startup.
    pub fn toggle(&mut self) {
        self.mode = match self.mode {
            Mode::Light => Mode::Dark,
            Mode::Dark => Mode::Light,
        };
    }

    pub fn text(&self) -> Color {
        match self.mode {
            Mode::Light => Color::Black,
            Mode::Dark => Color::White,
        }
    }

    pub fn dim(&self) -> Color {
        match self.mode {
            Mode::Light => Color::Gray,
            Mode::Dark => Color::DarkGray,
        }
    }

    pub fn border(&self) -> Color {
        match self.mode {
            Mode::Light => Color::Gray,
            Mode::Dark => Color::DarkGray,
        }
    }

    pub fn border_active(&self) -> Color {
        match self.mode {
            Mode::Light => Color::Blue,
            Mode::Dark => Color::Cyan,
        }
    }

    pub fn user_accent(&self) -> Color {
        match self.mode {
            Mode::Light => Color::Blue,
            Mode::Dark => Color::Cyan,
        }
    }

    pub fn assistant_accent(&self) -> Color {
        match self.mode {
            Mode::Light => Color::Magenta,
            Mode::Dark => Color::Yellow,
        }
    }
}

/// Parse the COLORFGBG hint, e.g. "15;0" or "0;default;15". The last field is
/// the background color number; 0-6 and 8 are the dark palette entries.
fn mode_from_colorfgbg(value: &str) -> Option<Mode> {
    let bg = value.split(';').last()?;
    let code: u8 = bg.trim().parse().ok()?;
    if code <= 6 || code == 8 {
        Some(Mode::Dark)
    } else {
        Some(Mode::Light)
    }
}
