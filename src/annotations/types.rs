//! Annotation types
//!
//! An annotation is a colored, labelled range over token ids. Ranges are
//! inclusive on both ends.

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::TokenId;

/// Highlight color used when the dialog value names none
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#ffff00";

/// A colored range over token ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "idLeft")]
    pub id_left: TokenId,
    #[serde(rename = "idRight")]
    pub id_right: TokenId,
    /// Background color (CSS color value)
    pub color: String,
    /// Free-text label
    pub text: String,
}

impl Annotation {
    pub fn new(id_left: TokenId, id_right: TokenId, color: &str, text: &str) -> Self {
        Self {
            id_left,
            id_right,
            color: color.to_string(),
            text: text.to_string(),
        }
    }

    /// The ids covered, `id_left..=id_right`. Empty when inverted.
    pub fn range(&self) -> RangeInclusive<TokenId> {
        self.id_left..=self.id_right
    }

    /// `id_left > id_right`; such an annotation covers nothing
    pub fn is_inverted(&self) -> bool {
        self.id_left > self.id_right
    }

    /// Number of ids in the range
    pub fn span_len(&self) -> u64 {
        if self.is_inverted() {
            0
        } else {
            // The full i64 range holds one more id than u64::MAX
            self.id_right.abs_diff(self.id_left).saturating_add(1)
        }
    }
}

/// Direction the user dragged the selection in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionDirection {
    /// Anchor at or before focus
    Forward,
    /// Anchor after focus (right-to-left drag)
    Backward,
}

/// A text selection resolved to token ids, awaiting its dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedSelection {
    pub text: String,
    pub anchor: TokenId,
    pub focus: TokenId,
    pub direction: SelectionDirection,
    #[serde(rename = "capturedAt")]
    pub captured_at: DateTime<Utc>,
}

impl CapturedSelection {
    pub fn new(text: &str, anchor: TokenId, focus: TokenId) -> Self {
        let direction = if anchor <= focus {
            SelectionDirection::Forward
        } else {
            SelectionDirection::Backward
        };

        Self {
            text: text.to_string(),
            anchor,
            focus,
            direction,
            captured_at: Utc::now(),
        }
    }

    /// Lower end of the selection, whichever endpoint it was
    pub fn id_left(&self) -> TokenId {
        self.anchor.min(self.focus)
    }

    pub fn id_right(&self) -> TokenId {
        self.anchor.max(self.focus)
    }
}

/// Color and label parsed from a dialog value.
///
/// Accepted forms: `#ff0000`, `#ff0000 label text`, `red|label text`,
/// or plain `label text` (no color).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogLabel {
    pub color: Option<String>,
    pub label: String,
}

impl DialogLabel {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();

        if let Some((head, tail)) = value.split_once('|') {
            if is_css_color(head.trim()) {
                return Self {
                    color: Some(head.trim().to_string()),
                    label: tail.trim().to_string(),
                };
            }
        }

        let (head, tail) = value
            .split_once(char::is_whitespace)
            .unwrap_or((value, ""));
        if is_css_color(head) {
            return Self {
                color: Some(head.to_string()),
                label: tail.trim().to_string(),
            };
        }

        Self {
            color: None,
            label: value.to_string(),
        }
    }

    pub fn color_or_default(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_HIGHLIGHT_COLOR)
    }
}

const NAMED_COLORS: &[&str] = &[
    "black", "blue", "cyan", "gray", "green", "grey", "lime", "magenta", "orange", "pink",
    "purple", "red", "teal", "white", "yellow",
];

fn is_css_color(value: &str) -> bool {
    if let Some(hex) = value.strip_prefix('#') {
        return matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }

    let lower = value.to_ascii_lowercase();
    if ["rgb(", "rgba(", "hsl(", "hsla("]
        .iter()
        .any(|p| lower.starts_with(p))
    {
        return lower.ends_with(')');
    }

    NAMED_COLORS.contains(&lower.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_span() {
        let annotation = Annotation::new(2, 5, "#ff0000", "");
        assert_eq!(annotation.span_len(), 4);
        assert_eq!(annotation.range().count(), 4);
        assert!(!annotation.is_inverted());
    }

    #[test]
    fn test_full_range_span_saturates() {
        let annotation = Annotation::new(TokenId::MIN, TokenId::MAX, "red", "");
        assert_eq!(annotation.span_len(), u64::MAX);
    }

    #[test]
    fn test_inverted_annotation() {
        let annotation = Annotation::new(5, 2, "#ff0000", "");
        assert!(annotation.is_inverted());
        assert_eq!(annotation.span_len(), 0);
        assert_eq!(annotation.range().count(), 0);
    }

    #[test]
    fn test_captured_selection_direction() {
        let forward = CapturedSelection::new("a b", 1, 2);
        assert_eq!(forward.direction, SelectionDirection::Forward);

        let backward = CapturedSelection::new("a b", 9, 4);
        assert_eq!(backward.direction, SelectionDirection::Backward);
        assert_eq!(backward.id_left(), 4);
        assert_eq!(backward.id_right(), 9);
    }

    #[test]
    fn test_parse_hex_with_label() {
        let parsed = DialogLabel::parse("#00ff00 economy");
        assert_eq!(parsed.color.as_deref(), Some("#00ff00"));
        assert_eq!(parsed.label, "economy");
    }

    #[test]
    fn test_parse_pipe_separated() {
        let parsed = DialogLabel::parse("red | migration policy");
        assert_eq!(parsed.color.as_deref(), Some("red"));
        assert_eq!(parsed.label, "migration policy");
    }

    #[test]
    fn test_parse_label_only() {
        let parsed = DialogLabel::parse("just a note");
        assert_eq!(parsed.color, None);
        assert_eq!(parsed.label, "just a note");
        assert_eq!(parsed.color_or_default(), DEFAULT_HIGHLIGHT_COLOR);
    }

    #[test]
    fn test_parse_color_only() {
        let parsed = DialogLabel::parse("#abc");
        assert_eq!(parsed.color.as_deref(), Some("#abc"));
        assert_eq!(parsed.label, "");
    }

    #[test]
    fn test_serialization() {
        let annotation = Annotation::new(0, 1, "#ff0000", "label");
        let json = serde_json::to_string(&annotation).unwrap();
        assert!(json.contains("\"idLeft\":0"));
        assert!(json.contains("\"idRight\":1"));
    }
}
