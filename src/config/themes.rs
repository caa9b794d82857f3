use std::collections::HashMap;

use ratatui::style::Color;

use super::ThemeName;

/// Colours the task cells are drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub accent: Color,
    pub text: Color,
    pub completed: Color,
    pub muted: Color,
    pub warning: Color,
}

#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    palettes: HashMap<ThemeName, Palette>,
}

impl ThemeRegistry {
    pub fn palette(&self, theme: ThemeName) -> Palette {
        self.palettes
            .get(&theme)
            .or_else(|| self.palettes.get(&ThemeName::Dark))
            .copied()
            .unwrap_or(DARK)
    }
}

const DARK: Palette = Palette {
    accent: Color::Cyan,
    text: Color::White,
    completed: Color::DarkGray,
    muted: Color::Gray,
    warning: Color::Yellow,
};

impl Default for ThemeRegistry {
    fn default() -> Self {
        let palettes = [
            (ThemeName::Dark, DARK),
            (
                ThemeName::Light,
                Palette {
                    accent: Color::Blue,
                    text: Color::Black,
                    completed: Color::Gray,
                    muted: Color::DarkGray,
                    warning: Color::Red,
                },
            ),
            (
                ThemeName::HighContrast,
                Palette {
                    accent: Color::LightYellow,
                    text: Color::White,
                    completed: Color::LightGreen,
                    muted: Color::White,
                    warning: Color::LightRed,
                },
            ),
            (
                ThemeName::Solarized,
                Palette {
                    accent: Color::Rgb(38, 139, 210),
                    text: Color::Rgb(131, 148, 150),
                    completed: Color::Rgb(88, 110, 117),
                    muted: Color::Rgb(101, 123, 131),
                    warning: Color::Rgb(181, 137, 0),
                },
            ),
        ]
        .into_iter()
        .collect();
        Self { palettes }
    }
}
