//! Container model
//!
//! The DOM-equivalent tree the widget renders into: an ordered list of
//! blocks, each referencing registered token ids. Token state (style,
//! group) lives in the registry; the container only records structure.

use crate::config::RenderConfig;
use crate::registry::{TokenElement, TokenId, TokenRegistry};

use super::markup::{self, MarkupError};

/// A block of rendered tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// One wrapper element (`<p>`, `<h1>`, ...) around its token spans
    Paragraph { element: String, tokens: Vec<TokenId> },
    /// Tokens emitted as `tag_before + text + tag_after`
    Flat { tokens: Vec<TokenId> },
}

impl Block {
    pub fn tokens(&self) -> &[TokenId] {
        match self {
            Block::Paragraph { tokens, .. } => tokens,
            Block::Flat { tokens } => tokens,
        }
    }
}

/// Inline chrome of the container element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStyle {
    pub overflow: String,
    pub padding: String,
    pub border: Option<String>,
}

impl ContainerStyle {
    fn to_css(&self) -> String {
        let mut css = format!("overflow: {}; padding: {};", self.overflow, self.padding);
        if let Some(border) = &self.border {
            css.push_str(&format!(" border: {};", border));
        }
        css
    }
}

/// The host container the renderer appends into
#[derive(Debug, Clone)]
pub struct Container {
    style: ContainerStyle,
    blocks: Vec<Block>,
    size: Option<(u32, u32)>,
}

impl Container {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            style: ContainerStyle {
                overflow: config.overflow.clone(),
                padding: config.padding.clone(),
                border: None,
            },
            blocks: Vec::new(),
            size: None,
        }
    }

    pub fn style(&self) -> &ContainerStyle {
        &self.style
    }

    pub fn set_border(&mut self, border: Option<String>) {
        self.style.border = border;
    }

    /// Record the host-assigned size. Content is not reflowed.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = Some((width, height));
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Token ids in document order
    pub fn token_order(&self) -> Vec<TokenId> {
        self.blocks
            .iter()
            .flat_map(|b| b.tokens().iter().copied())
            .collect()
    }

    /// Remove all content
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Serialize the container content
    pub fn inner_html(&self, registry: &TokenRegistry) -> Result<String, MarkupError> {
        let mut html = String::new();

        for block in &self.blocks {
            match block {
                Block::Paragraph { element, tokens } => {
                    html.push_str(&format!("<{}>", element));
                    for token in tokens.iter().filter_map(|id| registry.resolve(*id).ok()) {
                        html.push_str(&paragraph_span(token));
                        html.push(' ');
                    }
                    html.push_str(&format!("</{}>", element));
                }
                Block::Flat { tokens } => {
                    for token in tokens.iter().filter_map(|id| registry.resolve(*id).ok()) {
                        html.push_str(&flat_token(token)?);
                    }
                }
            }
        }

        Ok(html)
    }

    /// Serialize the container element including its chrome
    pub fn to_html(&self, registry: &TokenRegistry) -> Result<String, MarkupError> {
        Ok(format!(
            "<div class=\"fulltext\" style=\"{}\">{}</div>",
            markup::escape_attribute(&self.style.to_css()),
            self.inner_html(registry)?
        ))
    }
}

fn paragraph_span(element: &TokenElement) -> String {
    let name = element
        .group()
        .map(|g| format!(" name=\"{}\"", markup::escape_attribute(g)))
        .unwrap_or_default();
    let style = element
        .style
        .to_css()
        .map(|css| format!(" style=\"{}\"", markup::escape_attribute(&css)))
        .unwrap_or_default();

    format!(
        "<span id=\"{}\"{}{}>{}</span>",
        element.id(),
        name,
        style,
        markup::escape_text(&element.token.text)
    )
}

fn flat_token(element: &TokenElement) -> Result<String, MarkupError> {
    let token = &element.token;
    let css = element.style.to_css();
    let text = markup::escape_text(&token.text);

    match markup::decorate_first_element(&token.tag_before, token.id, css.as_deref())? {
        Some(before) => Ok(format!("{}{}{}", before, text, token.tag_after)),
        // No element to carry the id: wrap the text in one
        None => Ok(format!(
            "{}{}{}",
            token.tag_before,
            paragraph_span(element),
            token.tag_after
        )),
    }
}
