use std::str::FromStr;

use bevy::prelude::*;

pub const TEXT_FONT: &str = "fonts/Quicksand-Light.ttf";
pub const EMOJI_FONT: &str = "fonts/NotoEmoji-Regular.ttf";

// The plumbob is green no matter the theme
pub const PLUMBOB_GREEN: Color = Color::srgba(0.09, 0.945, 0.31, 0.7);

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Theme {
    #[default]
    Stone,
    Blossom,
}

#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub background: Color,
    pub card: Color,
    pub title: Color,
    pub body: Color,
    pub faint: Color,
    pub accept: Color,
    pub accept_text: Color,
    pub decline: Color,
    pub decline_text: Color,
    pub badge: Color,
    pub accent: Color,
}

impl Theme {
    pub fn palette(self) -> Palette {
        match self {
            Theme::Stone => Palette {
                background: Color::srgb(0.98, 0.96, 0.92),
                card: Color::WHITE,
                title: Color::srgb(0.16, 0.15, 0.14),
                body: Color::srgb(0.34, 0.33, 0.31),
                faint: Color::srgb(0.66, 0.64, 0.62),
                accept: Color::srgb(0.11, 0.10, 0.09),
                accept_text: Color::WHITE,
                decline: Color::srgb(0.91, 0.90, 0.89),
                decline_text: Color::srgb(0.34, 0.33, 0.31),
                badge: Color::srgba(1.0, 1.0, 1.0, 0.8),
                accent: Color::srgb(0.06, 0.73, 0.51),
            },
            Theme::Blossom => Palette {
                background: Color::srgb(1.0, 0.91, 0.94),
                card: Color::srgb(1.0, 0.98, 0.99),
                title: Color::srgb(0.55, 0.09, 0.30),
                body: Color::srgb(0.62, 0.24, 0.42),
                faint: Color::srgb(0.85, 0.55, 0.68),
                accept: Color::srgb(0.93, 0.28, 0.55),
                accept_text: Color::WHITE,
                decline: Color::srgb(0.99, 0.85, 0.90),
                decline_text: Color::srgb(0.62, 0.24, 0.42),
                badge: Color::srgba(1.0, 0.95, 0.97, 0.85),
                accent: Color::srgb(0.93, 0.28, 0.55),
            },
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stone" => Ok(Theme::Stone),
            "blossom" => Ok(Theme::Blossom),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}
