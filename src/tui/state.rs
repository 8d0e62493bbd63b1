use ratatui::style::{Color, Style};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    White,
    Red,
}

impl Background {
    pub fn toggled(self) -> Self {
        match self {
            Background::White => Background::Red,
            Background::Red => Background::White,
        }
    }

    pub fn style(self) -> Style {
        match self {
            Background::White => Style::default().bg(Color::White).fg(Color::Black),
            Background::Red => Style::default().bg(Color::Red).fg(Color::White),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Background::White => "white",
            Background::Red => "red",
        }
    }
}

pub struct UiState {
    pub tab: usize,
    pub counter: i64,
    pub background: Background,
    pub info: String,
    /// Input handed to the helper on every sort.
    pub input: Vec<i64>,
    pub sort_started: Option<Instant>,
    pub last_elapsed: Option<Duration>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            counter: 0,
            background: Background::White,
            info: String::new(),
            input: Vec::new(),
            sort_started: None,
            last_elapsed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_toggles_between_white_and_red() {
        let bg = Background::White;
        assert_eq!(bg.toggled(), Background::Red);
        assert_eq!(bg.toggled().toggled(), Background::White);
    }
}
