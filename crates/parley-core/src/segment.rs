//! Splits assistant replies into prose and fenced code segments.
//!
//! Parsing is pure and never fails: a fence without a closing marker is left
//! in the surrounding prose, and unknown language tags fall back to the
//! default accent.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Language declared on the opening fence of a code block
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Language {
    /// No tag followed the opening fence
    Unspecified,
    /// Lower-cased tag from the opening fence line
    Named(String),
}

impl Language {
    pub const UNSPECIFIED: &'static str = "unspecified";

    fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some(tag) if !tag.is_empty() => Language::Named(tag.to_lowercase()),
            _ => Language::Unspecified,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Language::Unspecified => Self::UNSPECIFIED,
            Language::Named(name) => name,
        }
    }

    /// Label shown in a code block header. Untagged blocks read as plain text.
    pub fn label(&self) -> &str {
        match self {
            Language::Unspecified => "text",
            Language::Named(name) => name,
        }
    }

    pub fn accent(&self) -> Accent {
        language_accent(self.as_str())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One renderable unit of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Prose(String),
    Code { language: Language, content: String },
}

impl Segment {
    pub fn content(&self) -> &str {
        match self {
            Segment::Prose(content) => content,
            Segment::Code { content, .. } => content,
        }
    }

    pub fn language(&self) -> Option<&Language> {
        match self {
            Segment::Prose(_) => None,
            Segment::Code { language, .. } => Some(language),
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Segment::Code { .. })
    }
}

/// Language tags are ASCII word characters only.
fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"```([A-Za-z0-9_]+)?\n?([\s\S]*?)```")
            .expect("fence pattern is a valid literal")
    })
}

/// Parse raw reply text into an ordered list of segments.
///
/// Always returns at least one segment; empty input yields a single empty
/// prose segment.
pub fn parse(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last_end = 0;

    for captures in fence_pattern().captures_iter(text) {
        let Some(fence) = captures.get(0) else {
            continue;
        };

        if fence.start() > last_end {
            segments.push(Segment::Prose(text[last_end..fence.start()].to_string()));
        }

        let body = captures.get(2).map_or("", |m| m.as_str());
        segments.push(Segment::Code {
            language: Language::from_tag(captures.get(1).map(|m| m.as_str())),
            content: body.trim().to_string(),
        });

        last_end = fence.end();
    }

    if last_end < text.len() {
        segments.push(Segment::Prose(text[last_end..].to_string()));
    }

    if segments.is_empty() {
        segments.push(Segment::Prose(text.to_string()));
    }

    segments
}

/// RGB accent used for the language marker of a code block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accent {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

const fn rgb(r: u8, g: u8, b: u8) -> Accent {
    Accent { r, g, b }
}

pub const DEFAULT_ACCENT: Accent = rgb(100, 116, 139);

const ACCENTS: &[(&str, Accent)] = &[
    ("javascript", rgb(234, 179, 8)),
    ("typescript", rgb(59, 130, 246)),
    ("python", rgb(34, 197, 94)),
    ("java", rgb(249, 115, 22)),
    ("cpp", rgb(168, 85, 247)),
    ("c", rgb(107, 114, 128)),
    ("html", rgb(239, 68, 68)),
    ("css", rgb(236, 72, 153)),
    ("json", rgb(99, 102, 241)),
    ("sql", rgb(20, 184, 166)),
    ("php", rgb(139, 92, 246)),
    ("ruby", rgb(220, 38, 38)),
    ("go", rgb(6, 182, 212)),
    ("rust", rgb(234, 88, 12)),
    ("swift", rgb(251, 146, 60)),
    ("kotlin", rgb(147, 51, 234)),
    ("bash", rgb(55, 65, 81)),
    ("shell", rgb(55, 65, 81)),
];

/// Look up the accent for a language tag, case-insensitively.
/// Unknown tags get [`DEFAULT_ACCENT`].
pub fn language_accent(tag: &str) -> Accent {
    let tag = tag.to_lowercase();
    ACCENTS
        .iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, accent)| *accent)
        .unwrap_or(DEFAULT_ACCENT)
}
