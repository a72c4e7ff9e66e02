//! Token registry
//!
//! Owns the id → element mapping for every rendered token. All range
//! operations (annotation coloring, selection capture, group visibility)
//! go through the registry; nothing else holds token identity.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Bound, RangeInclusive};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier carried by a rendered token (the span's `id` attribute)
pub type TokenId = i64;

/// Registry errors. Neither is fatal to the component.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unresolved token id: {0}")]
    UnresolvedTokenId(TokenId),

    #[error("Duplicate token id: {0}")]
    DuplicateTokenId(TokenId),
}

/// A single token as delivered by the render payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub text: String,
    /// Raw markup emitted before the text (flat mode only)
    #[serde(rename = "tagBefore", default)]
    pub tag_before: String,
    /// Raw markup emitted after the text (flat mode only)
    #[serde(rename = "tagAfter", default)]
    pub tag_after: String,
    /// Selection group this token belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl Token {
    /// Create a plain token with no surrounding markup and no group
    pub fn new(id: TokenId, text: &str) -> Self {
        Self {
            id,
            text: text.to_string(),
            tag_before: String::new(),
            tag_after: String::new(),
            group: None,
        }
    }

    /// Assign the token to a selection group
    pub fn in_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }
}

/// Per-token display toggle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Display {
    /// No explicit display rule
    #[default]
    Inherit,
    Block,
    None,
}

/// Inline style state of a token element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStyle {
    pub background_color: Option<String>,
    pub display: Display,
}

impl TokenStyle {
    /// Render the style as an inline CSS declaration list, if any rule is set
    pub fn to_css(&self) -> Option<String> {
        let mut rules = Vec::new();
        if let Some(color) = &self.background_color {
            rules.push(format!("background-color: {};", color));
        }
        match self.display {
            Display::Inherit => {}
            Display::Block => rules.push("display: block;".to_string()),
            Display::None => rules.push("display: none;".to_string()),
        }

        if rules.is_empty() {
            None
        } else {
            Some(rules.join(" "))
        }
    }
}

/// The element backing a registered token
#[derive(Debug, Clone)]
pub struct TokenElement {
    pub token: Token,
    pub style: TokenStyle,
    /// Set once the token is annotated: the native context menu is
    /// suppressed in favour of the host dialog.
    pub context_menu: bool,
}

impl TokenElement {
    pub fn id(&self) -> TokenId {
        self.token.id
    }

    pub fn group(&self) -> Option<&str> {
        self.token.group.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.style.display != Display::None
    }
}

/// Registry of rendered tokens keyed by id
#[derive(Debug, Default)]
pub struct TokenRegistry {
    elements: BTreeMap<TokenId, TokenElement>,
    /// Next id handed out to tokens that arrive without one.
    /// Never rewinds, not even on `clear`.
    next_id: TokenId,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token under its own id
    pub fn register(&mut self, token: Token) -> Result<TokenId, RegistryError> {
        let id = token.id;
        if self.elements.contains_key(&id) {
            return Err(RegistryError::DuplicateTokenId(id));
        }

        self.elements.insert(
            id,
            TokenElement {
                token,
                style: TokenStyle::default(),
                context_menu: false,
            },
        );
        self.next_id = self.next_id.max(id.saturating_add(1));
        Ok(id)
    }

    /// The id the next unnumbered token should receive
    pub fn next_id(&self) -> TokenId {
        self.next_id
    }

    /// Look up a token element
    pub fn resolve(&self, id: TokenId) -> Result<&TokenElement, RegistryError> {
        self.elements
            .get(&id)
            .ok_or(RegistryError::UnresolvedTokenId(id))
    }

    /// Look up a token element for a style mutation
    pub fn resolve_mut(&mut self, id: TokenId) -> Result<&mut TokenElement, RegistryError> {
        self.elements
            .get_mut(&id)
            .ok_or(RegistryError::UnresolvedTokenId(id))
    }

    pub fn contains(&self, id: TokenId) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Drop every registered token
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Iterate elements in id order
    pub fn iter(&self) -> impl Iterator<Item = &TokenElement> {
        self.elements.values()
    }

    /// Registered elements whose ids fall inside `range`, in id order
    pub fn range_mut(
        &mut self,
        range: RangeInclusive<TokenId>,
    ) -> impl Iterator<Item = &mut TokenElement> {
        let (start, end) = range.into_inner();
        // BTreeMap::range panics on start > end; an inverted range is empty
        let bounds = if start <= end {
            (Bound::Included(start), Bound::Included(end))
        } else {
            (Bound::Included(start), Bound::Excluded(start))
        };
        self.elements.range_mut(bounds).map(|(_, element)| element)
    }

    /// Ids of tokens that belong to a group
    pub fn managed_ids(&self) -> Vec<TokenId> {
        self.elements
            .values()
            .filter(|e| e.group().is_some())
            .map(|e| e.id())
            .collect()
    }

    /// Ids of tokens whose group is one of `keys`
    pub fn ids_in_groups(&self, keys: &BTreeSet<String>) -> Vec<TokenId> {
        if keys.is_empty() {
            return Vec::new();
        }

        self.elements
            .values()
            .filter(|e| e.group().map(|g| keys.contains(g)).unwrap_or(false))
            .map(|e| e.id())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let mut registry = TokenRegistry::new();
        let id = registry.register(Token::new(3, "hello")).unwrap();

        assert_eq!(id, 3);
        assert_eq!(registry.resolve(3).unwrap().token.text, "hello");
        assert_eq!(registry.next_id(), 4);
    }

    #[test]
    fn test_resolve_unknown_id() {
        let registry = TokenRegistry::new();
        assert_eq!(
            registry.resolve(7).unwrap_err(),
            RegistryError::UnresolvedTokenId(7)
        );
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = TokenRegistry::new();
        registry.register(Token::new(0, "a")).unwrap();

        let err = registry.register(Token::new(0, "b")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTokenId(0));
        assert_eq!(registry.resolve(0).unwrap().token.text, "a");
    }

    #[test]
    fn test_clear_keeps_id_counter() {
        let mut registry = TokenRegistry::new();
        registry.register(Token::new(0, "a")).unwrap();
        registry.register(Token::new(1, "b")).unwrap();
        registry.clear();

        assert!(registry.is_empty());
        assert_eq!(registry.next_id(), 2);
    }

    #[test]
    fn test_group_lookup() {
        let mut registry = TokenRegistry::new();
        registry.register(Token::new(0, "a").in_group("A")).unwrap();
        registry.register(Token::new(1, "b").in_group("B")).unwrap();
        registry.register(Token::new(2, "c")).unwrap();

        let keys: BTreeSet<String> = ["A".to_string()].into_iter().collect();
        assert_eq!(registry.ids_in_groups(&keys), vec![0]);
        assert_eq!(registry.managed_ids(), vec![0, 1]);
        assert!(registry.ids_in_groups(&BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_range_mut_skips_gaps() {
        let mut registry = TokenRegistry::new();
        for id in [1, 2, 5, 9] {
            registry.register(Token::new(id, "x")).unwrap();
        }

        let ids: Vec<TokenId> = registry.range_mut(2..=8).map(|e| e.id()).collect();
        assert_eq!(ids, vec![2, 5]);
        assert_eq!(registry.range_mut(8..=2).count(), 0);
    }

    #[test]
    fn test_style_css() {
        let mut style = TokenStyle::default();
        assert_eq!(style.to_css(), None);

        style.background_color = Some("#ff0000".to_string());
        style.display = Display::None;
        assert_eq!(
            style.to_css().unwrap(),
            "background-color: #ff0000; display: none;"
        );
    }
}
