use std::fmt::Display;

use console::{Style, StyledObject};

/// What a piece of terminal text means. Each role has one look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Brand,
    Heading,
    /// Field labels and secondary details
    Label,
    /// Ids, names and other values read from GitLab or Confluence
    Value,
    /// Work in progress and notices
    Pending,
    Done,
    Failure,
}

impl Tone {
    fn style(self) -> Style {
        match self {
            Self::Brand => Style::new().magenta().bold(),
            Self::Heading => Style::new().bright(),
            Self::Label => Style::new().dim(),
            Self::Value => Style::new().cyan(),
            Self::Pending => Style::new().bright().yellow(),
            Self::Done => Style::new().bright().green(),
            Self::Failure => Style::new().bright().red(),
        }
    }
}

pub fn paint(tone: Tone, text: impl Display) -> StyledObject<String> {
    tone.style().apply_to(text.to_string())
}

/// Icon followed by an underlined title.
pub fn heading(icon: &str, title: &str) -> String {
    format!(
        "{} {}",
        paint(Tone::Heading, icon),
        paint(Tone::Heading, title).underlined()
    )
}
