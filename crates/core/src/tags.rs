//! Count tags: colors and per-tag sequence numbers

use std::collections::HashMap;
use std::fmt;

/// Tag used when the user leaves the tag empty
pub const DEFAULT_COUNT_TAG: &str = "A";

/// RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// `#rrggbb` form, alpha dropped
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Fixed palette cycled through as new tags appear
pub const TAG_COLORS: [Color; 12] = [
    Color::rgb(0xb0, 0x2a, 0x37),
    Color::rgb(0x0b, 0x6e, 0x4f),
    Color::rgb(0x20, 0x4e, 0x75),
    Color::rgb(0x8d, 0x3f, 0x00),
    Color::rgb(0x6f, 0x3f, 0xb3),
    Color::rgb(0x00, 0x83, 0x8f),
    Color::rgb(0xa0, 0x44, 0x15),
    Color::rgb(0x2e, 0x7d, 0x32),
    Color::rgb(0xad, 0x14, 0x57),
    Color::rgb(0x4e, 0x34, 0x2e),
    Color::rgb(0x00, 0x69, 0x5c),
    Color::rgb(0x15, 0x65, 0xc0),
];

/// Display style of a count tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TagStyle {
    pub color: Color,
}

/// Tag to color assignment for one document session
///
/// Colors are handed out in palette order the first time a tag is seen and
/// never change afterwards.
#[derive(Debug, Clone, Default)]
pub struct TagPalette {
    styles: HashMap<String, TagStyle>,
    next_index: usize,
}

impl TagPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Style for `tag`, assigning the next palette color if unseen
    pub fn ensure(&mut self, tag: &str) -> TagStyle {
        if let Some(style) = self.styles.get(tag) {
            return *style;
        }
        let style = TagStyle {
            color: TAG_COLORS[self.next_index % TAG_COLORS.len()],
        };
        self.next_index += 1;
        self.styles.insert(tag.to_string(), style);
        style
    }

    /// Style for `tag` if already assigned
    pub fn get(&self, tag: &str) -> Option<TagStyle> {
        self.styles.get(tag).copied()
    }

    pub fn clear(&mut self) {
        self.styles.clear();
        self.next_index = 0;
    }
}

/// Trim a user supplied tag, falling back to [`DEFAULT_COUNT_TAG`]
pub fn normalize_count_tag(raw: &str) -> String {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        DEFAULT_COUNT_TAG.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Active count tag and the sequence counters of every tag used
///
/// Counters are kept per page and tag, so switching away from a tag and
/// back resumes its numbering.
#[derive(Debug, Clone)]
pub struct CountSession {
    tag: String,
    sequences: HashMap<(u16, String), u32>,
}

impl Default for CountSession {
    fn default() -> Self {
        Self::new(DEFAULT_COUNT_TAG)
    }
}

impl CountSession {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: normalize_count_tag(tag),
            sequences: HashMap::new(),
        }
    }

    /// Currently active tag
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Make `tag` active, returning the normalized form
    pub fn select(&mut self, tag: &str) -> &str {
        let tag = normalize_count_tag(tag);
        if tag != self.tag {
            log::debug!("count tag switched from {} to {}", self.tag, tag);
            self.tag = tag;
        }
        &self.tag
    }

    /// Advance the active tag's counter on `page`
    pub fn next_sequence(&mut self, page: u16) -> u32 {
        let seq = self.sequences.entry((page, self.tag.clone())).or_insert(0);
        *seq += 1;
        *seq
    }

    /// Forget all counters
    pub fn reset(&mut self) {
        self.sequences.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_assigns_in_order_and_cycles() {
        let mut palette = TagPalette::new();
        assert_eq!(palette.ensure("A").color, TAG_COLORS[0]);
        assert_eq!(palette.ensure("B").color, TAG_COLORS[1]);
        assert_eq!(palette.ensure("A").color, TAG_COLORS[0]);

        for i in 0..10 {
            palette.ensure(&format!("T{i}"));
        }
        // 13th distinct tag wraps around
        assert_eq!(palette.ensure("wrap").color, TAG_COLORS[0]);
        assert_eq!(palette.get("missing"), None);
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(TAG_COLORS[0].to_hex(), "#b02a37");
        assert_eq!(TAG_COLORS[11].to_string(), "#1565c0");
    }

    #[test]
    fn test_normalize_count_tag() {
        assert_eq!(normalize_count_tag("  B2 "), "B2");
        assert_eq!(normalize_count_tag("   "), "A");
        assert_eq!(normalize_count_tag(""), "A");
    }

    #[test]
    fn test_sequences_resume_per_tag() {
        let mut session = CountSession::default();
        assert_eq!(session.next_sequence(1), 1);
        session.select("B");
        assert_eq!(session.next_sequence(1), 1);
        session.select("A");
        assert_eq!(session.next_sequence(1), 2);
        // Other pages count independently
        assert_eq!(session.next_sequence(2), 1);

        session.reset();
        assert_eq!(session.tag(), "A");
        assert_eq!(session.next_sequence(1), 1);
    }
}
