//! Markup helpers built on lol_html
//!
//! Flat-mode payloads ship raw tag fragments (`tag_before` / `tag_after`)
//! around every token. These helpers sanitize those fragments, read the
//! identifying attributes off their first element, and write token state
//! (id, inline style) back onto it when the container is serialized.

use std::borrow::Cow;

use lol_html::{element, rewrite_str, RewriteStrSettings};

use crate::registry::TokenId;

/// Errors during markup processing
#[derive(Debug, thiserror::Error)]
pub enum MarkupError {
    #[error("HTML rewrite failed: {0}")]
    RewriteError(String),
}

/// Identifying attributes of the first element in a tag fragment
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TagAttributes {
    /// Whether the fragment opens any element at all
    pub has_element: bool,
    pub id: Option<String>,
    /// `name` attribute, used as the token's selection group
    pub name: Option<String>,
}

impl TagAttributes {
    /// The `id` attribute parsed as a token id
    pub fn token_id(&self) -> Option<TokenId> {
        self.id.as_deref().and_then(|id| id.trim().parse().ok())
    }
}

/// Remove script/style elements, event handlers and `javascript:` URLs
/// from a raw tag fragment
pub fn sanitize_fragment(html: &str) -> Result<String, MarkupError> {
    if html.is_empty() {
        return Ok(String::new());
    }

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("script", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("style", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("*", |el| {
                    let handlers: Vec<String> = el
                        .attributes()
                        .iter()
                        .map(|a| a.name())
                        .filter(|name| name.starts_with("on"))
                        .collect();
                    for attr in handlers {
                        el.remove_attribute(&attr);
                    }
                    for attr in ["href", "src"] {
                        if let Some(value) = el.get_attribute(attr) {
                            if value.trim().to_lowercase().starts_with("javascript:") {
                                el.remove_attribute(attr);
                            }
                        }
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| MarkupError::RewriteError(e.to_string()))
}

/// Read `id` and `name` off the first element opened by `fragment`
pub fn scan_first_element(fragment: &str) -> Result<TagAttributes, MarkupError> {
    let mut attrs = TagAttributes::default();
    if fragment.is_empty() {
        return Ok(attrs);
    }

    rewrite_str(
        fragment,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", |el| {
                if !attrs.has_element {
                    attrs.has_element = true;
                    attrs.id = el.get_attribute("id");
                    attrs.name = el.get_attribute("name");
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| MarkupError::RewriteError(e.to_string()))?;

    Ok(attrs)
}

/// Stamp the token id and inline style onto the first element of `fragment`.
/// Existing style rules are kept; ours are appended so they take precedence.
///
/// Returns `None` when the fragment opens no element to carry them.
pub fn decorate_first_element(
    fragment: &str,
    id: TokenId,
    css: Option<&str>,
) -> Result<Option<String>, MarkupError> {
    let mut decorated = false;
    let id = id.to_string();

    let output = rewrite_str(
        fragment,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", |el| {
                if decorated {
                    return Ok(());
                }
                decorated = true;

                el.set_attribute("id", &id)?;
                if let Some(css) = css {
                    let style = match el.get_attribute("style") {
                        Some(existing) if !existing.trim().is_empty() => {
                            format!("{}; {}", existing.trim().trim_end_matches(';'), css)
                        }
                        _ => css.to_string(),
                    };
                    el.set_attribute("style", &style)?;
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| MarkupError::RewriteError(e.to_string()))?;

    Ok(decorated.then_some(output))
}

/// Escape token text for element content
pub fn escape_text(text: &str) -> Cow<'_, str> {
    html_escape::encode_text(text)
}

/// Escape a value for a double-quoted attribute
pub fn escape_attribute(value: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(value)
}

/// Whether `name` is safe to splice in as a wrapper tag name
pub fn is_valid_tag_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_rejects_ambiguous_markup() {
        assert!(matches!(
            sanitize_fragment("<select><xmp>"),
            Err(MarkupError::RewriteError(_))
        ));
    }

    #[test]
    fn test_scan_first_element() {
        let attrs = scan_first_element(r#"<span id="12" name="A"><b>"#).unwrap();

        assert!(attrs.has_element);
        assert_eq!(attrs.token_id(), Some(12));
        assert_eq!(attrs.name.as_deref(), Some("A"));
    }

    #[test]
    fn test_scan_fragment_without_element() {
        let attrs = scan_first_element("</span> ").unwrap();

        assert!(!attrs.has_element);
        assert_eq!(attrs.token_id(), None);
    }

    #[test]
    fn test_scan_non_numeric_id() {
        let attrs = scan_first_element(r#"<span id="intro">"#).unwrap();
        assert_eq!(attrs.token_id(), None);
    }

    #[test]
    fn test_sanitize_event_handlers() {
        let result = sanitize_fragment(r#"<span onclick="alert('x')" name="A">"#).unwrap();

        assert!(!result.contains("onclick"));
        assert!(result.contains(r#"name="A""#));
    }

    #[test]
    fn test_sanitize_javascript_url() {
        let result = sanitize_fragment(r#"<a href="javascript:void(0)">"#).unwrap();
        assert!(!result.contains("javascript"));
    }

    #[test]
    fn test_sanitize_script_removal() {
        let result = sanitize_fragment("<script>alert('x')</script><span>").unwrap();

        assert!(!result.contains("script"));
        assert!(result.contains("<span>"));
    }

    #[test]
    fn test_decorate_sets_id_and_style() {
        let result = decorate_first_element(r#"<span name="A">"#, 4, Some("display: none;"))
            .unwrap()
            .unwrap();

        assert!(result.contains(r#"id="4""#));
        assert!(result.contains(r#"style="display: none;""#));
    }

    #[test]
    fn test_decorate_merges_existing_style() {
        let result = decorate_first_element(
            r#"<span style="color: red;"><i>"#,
            1,
            Some("background-color: #ff0000;"),
        )
        .unwrap()
        .unwrap();

        assert!(result.contains("color: red; background-color: #ff0000;"));
        assert!(result.contains("<i>"));
    }

    #[test]
    fn test_decorate_without_element() {
        let result = decorate_first_element("</b>", 1, None).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a < b & c"), "a &lt; b &amp; c");
    }

    #[test]
    fn test_tag_name_validation() {
        assert!(is_valid_tag_name("p"));
        assert!(is_valid_tag_name("h2"));
        assert!(is_valid_tag_name("my-para"));
        assert!(!is_valid_tag_name(""));
        assert!(!is_valid_tag_name("p onclick=x"));
        assert!(!is_valid_tag_name("2p"));
    }
}
