use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Neutral,
    Excited,
}

impl Mood {
    pub const ALL: [Mood; 4] = [Mood::Happy, Mood::Sad, Mood::Neutral, Mood::Excited];

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Neutral => "neutral",
            Mood::Excited => "excited",
        }
    }

    /// Capitalized name shown on badges.
    pub fn label(self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Sad => "Sad",
            Mood::Neutral => "Neutral",
            Mood::Excited => "Excited",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Mood::Happy => ":)",
            Mood::Sad => ":(",
            Mood::Neutral => ":|",
            Mood::Excited => ":D",
        }
    }

    pub fn color(self) -> Color {
        match self {
            Mood::Happy => Color::Yellow,
            Mood::Sad => Color::Blue,
            Mood::Neutral => Color::Gray,
            Mood::Excited => Color::Magenta,
        }
    }

    /// The mood after this one in picker order, wrapping around.
    pub fn next(self) -> Mood {
        let index = Mood::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Mood::ALL[(index + 1) % Mood::ALL.len()]
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str().eq_ignore_ascii_case(wanted))
            .ok_or(ValidationError::MissingMood)
    }
}
