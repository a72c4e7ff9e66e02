//! Render payload types
//!
//! The payload is column-oriented: parallel arrays per paragraph and for
//! the annotation table. Hosts that unbox length-one vectors send scalars
//! instead of arrays, so every column accepts either.

use serde::{Deserialize, Deserializer, Serialize};

use crate::annotations::Annotation;
use crate::config::Settings;
use crate::registry::{Token, TokenId};
use crate::render::{FlatToken, Paragraph};

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// Deserialize a column that may be a scalar, an array or null
pub fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value: Option<OneOrMany<T>> = Option::deserialize(deserializer)?;
    Ok(match value {
        None => Vec::new(),
        Some(OneOrMany::One(v)) => vec![v],
        Some(OneOrMany::Many(v)) => v,
    })
}

/// Everything the host hands to `render_value`
#[derive(Debug, Clone, Deserialize)]
pub struct RenderPayload {
    pub data: PayloadData,
    #[serde(default)]
    pub settings: Settings,
}

impl RenderPayload {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadData {
    #[serde(default)]
    pub paragraphs: Vec<PayloadParagraph>,
    #[serde(default)]
    pub annotations: Option<PayloadAnnotations>,
    /// Flat rendering mode columns
    #[serde(default, deserialize_with = "one_or_many")]
    pub token: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub tag_before: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub tag_after: Vec<String>,
}

impl PayloadData {
    pub fn paragraphs(&self) -> Vec<Paragraph> {
        self.paragraphs.iter().map(|p| p.to_paragraph()).collect()
    }

    pub fn annotations(&self) -> Vec<Annotation> {
        self.annotations
            .as_ref()
            .map(|a| a.to_annotations())
            .unwrap_or_default()
    }

    /// Flat-mode tokens; missing tags default to empty strings
    pub fn flat_tokens(&self) -> Vec<FlatToken> {
        if self.tag_before.len() < self.token.len() || self.tag_after.len() < self.token.len() {
            tracing::warn!(
                "Flat payload has {} tokens but {} / {} tags",
                self.token.len(),
                self.tag_before.len(),
                self.tag_after.len()
            );
        }

        self.token
            .iter()
            .enumerate()
            .map(|(i, text)| FlatToken {
                text: text.clone(),
                tag_before: self.tag_before.get(i).cloned().unwrap_or_default(),
                tag_after: self.tag_after.get(i).cloned().unwrap_or_default(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayloadParagraph {
    pub element: String,
    pub tokenstream: TokenStream,
}

impl PayloadParagraph {
    pub fn to_paragraph(&self) -> Paragraph {
        let stream = &self.tokenstream;
        if stream.id.len() != stream.token.len() {
            tracing::warn!(
                "Paragraph <{}> has {} ids for {} tokens, truncating",
                self.element,
                stream.id.len(),
                stream.token.len()
            );
        }

        let tokens = stream
            .id
            .iter()
            .zip(&stream.token)
            .enumerate()
            .map(|(i, (id, text))| Token {
                id: *id,
                text: text.clone(),
                tag_before: String::new(),
                tag_after: String::new(),
                group: stream.group.get(i).cloned().flatten(),
            })
            .collect();

        Paragraph::new(&self.element, tokens)
    }
}

/// Column-oriented token stream of one paragraph
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenStream {
    #[serde(default, deserialize_with = "one_or_many")]
    pub id: Vec<TokenId>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub token: Vec<String>,
    /// Optional selection group per token
    #[serde(default, deserialize_with = "one_or_many")]
    pub group: Vec<Option<String>>,
}

/// Column-oriented annotation table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadAnnotations {
    #[serde(default, deserialize_with = "one_or_many")]
    pub id_left: Vec<TokenId>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub id_right: Vec<TokenId>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub code: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub text: Vec<String>,
}

impl PayloadAnnotations {
    pub fn to_annotations(&self) -> Vec<Annotation> {
        let rows = self
            .id_left
            .len()
            .min(self.id_right.len())
            .min(self.code.len());
        let longest = self
            .id_left
            .len()
            .max(self.id_right.len())
            .max(self.code.len());
        if rows != longest {
            tracing::warn!(
                "Annotation table columns differ in length, using {} of {} rows",
                rows,
                longest
            );
        }

        (0..rows)
            .map(|i| Annotation {
                id_left: self.id_left[i],
                id_right: self.id_right[i],
                color: self.code[i].clone(),
                text: self.text.get(i).cloned().unwrap_or_default(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paragraph_payload() {
        let payload = RenderPayload::from_json(
            r##"{
                "data": {
                    "paragraphs": [
                        {"element": "p", "tokenstream": {"id": [0, 1], "token": ["Hello", "world"]}}
                    ],
                    "annotations": {"id_left": [0], "id_right": [1], "code": ["#ff0000"], "text": [""]}
                },
                "settings": {"box": true}
            }"##,
        )
        .unwrap();

        let paragraphs = payload.data.paragraphs();
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].tokens[1].text, "world");
        assert_eq!(paragraphs[0].tokens[1].id, 1);

        let annotations = payload.data.annotations();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].color, "#ff0000");
        assert!(payload.settings.boxed);
    }

    #[test]
    fn test_unboxed_scalars() {
        let payload = RenderPayload::from_json(
            r##"{
                "data": {
                    "paragraphs": [
                        {"element": "h1", "tokenstream": {"id": 7, "token": "Title", "group": "A"}}
                    ],
                    "annotations": {"id_left": 7, "id_right": 7, "code": "#00ff00"}
                }
            }"##,
        )
        .unwrap();

        let paragraphs = payload.data.paragraphs();
        assert_eq!(paragraphs[0].tokens[0].id, 7);
        assert_eq!(paragraphs[0].tokens[0].group.as_deref(), Some("A"));

        let annotations = payload.data.annotations();
        assert_eq!(annotations[0].id_left, 7);
        assert_eq!(annotations[0].text, "");
    }

    #[test]
    fn test_mismatched_columns_truncate() {
        let stream = PayloadParagraph {
            element: "p".to_string(),
            tokenstream: TokenStream {
                id: vec![0, 1, 2],
                token: vec!["a".to_string(), "b".to_string()],
                group: vec![],
            },
        };

        assert_eq!(stream.to_paragraph().tokens.len(), 2);

        let table = PayloadAnnotations {
            id_left: vec![0, 1],
            id_right: vec![1],
            code: vec!["red".to_string(), "blue".to_string()],
            text: vec![],
        };
        assert_eq!(table.to_annotations().len(), 1);
    }

    #[test]
    fn test_flat_columns() {
        let payload = RenderPayload::from_json(
            r#"{
                "data": {
                    "token": ["Hello", "world"],
                    "tag_before": ["<span name=\"A\">", "<span name=\"B\">"],
                    "tag_after": ["</span> ", "</span>"]
                }
            }"#,
        )
        .unwrap();

        let tokens = payload.data.flat_tokens();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].tag_before, "<span name=\"B\">");
        assert!(payload.data.paragraphs().is_empty());
    }

    #[test]
    fn test_null_group_entries() {
        let stream: TokenStream =
            serde_json::from_str(r#"{"id": [0, 1], "token": ["a", "b"], "group": ["A", null]}"#)
                .unwrap();

        assert_eq!(stream.group, vec![Some("A".to_string()), None]);
    }
}
