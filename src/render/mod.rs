//! Token rendering
//!
//! Turns the payload's token streams into container blocks, registering
//! every token as it goes:
//! - Paragraph mode: one wrapper element per paragraph, one span per token
//! - Flat mode: raw `tag_before + text + tag_after` per token
//!
//! Rendering appends. Rendering the same paragraphs twice appends them twice;
//! the second copy reuses the already registered elements, so both copies
//! share style and visibility. Call [`Container::clear`] and
//! [`TokenRegistry::clear`] first for a fresh render.

mod container;
pub mod markup;

pub use container::{Block, Container, ContainerStyle};
pub use markup::MarkupError;

use markup::TagAttributes;

use crate::registry::{RegistryError, Token, TokenId, TokenRegistry};

/// Fallback wrapper for paragraphs whose element name is unusable
const FALLBACK_ELEMENT: &str = "p";

/// A paragraph of tokens and the tag to wrap it in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub element: String,
    pub tokens: Vec<Token>,
}

impl Paragraph {
    pub fn new(element: &str, tokens: Vec<Token>) -> Self {
        Self {
            element: element.to_string(),
            tokens,
        }
    }
}

/// A flat-mode token before it has been assigned an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatToken {
    pub text: String,
    pub tag_before: String,
    pub tag_after: String,
}

/// Outcome of a render pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub paragraphs: usize,
    /// Tokens registered and placed in the container
    pub tokens: usize,
    /// Ids that were already registered; their spans reuse the existing element
    pub reused: Vec<TokenId>,
    /// Flat tokens dropped because their tag fragments could not be processed
    pub rejected: usize,
}

/// Renders token streams into a container, backed by a registry
pub struct TokenRenderer<'a> {
    container: &'a mut Container,
    registry: &'a mut TokenRegistry,
}

impl<'a> TokenRenderer<'a> {
    pub fn new(container: &'a mut Container, registry: &'a mut TokenRegistry) -> Self {
        Self {
            container,
            registry,
        }
    }

    /// Append one wrapper block per paragraph, preserving order
    pub fn render(&mut self, paragraphs: Vec<Paragraph>) -> RenderReport {
        let mut report = RenderReport::default();

        for paragraph in paragraphs {
            let element = if markup::is_valid_tag_name(&paragraph.element) {
                paragraph.element
            } else {
                tracing::warn!(
                    "Invalid paragraph element {:?}, using <{}>",
                    paragraph.element,
                    FALLBACK_ELEMENT
                );
                FALLBACK_ELEMENT.to_string()
            };

            let tokens = self.register_all(paragraph.tokens, &mut report);
            self.container.push(Block::Paragraph { element, tokens });
            report.paragraphs += 1;
        }

        tracing::debug!(
            "Rendered {} paragraphs, {} tokens ({} reused)",
            report.paragraphs,
            report.tokens,
            report.reused.len()
        );
        report
    }

    /// Append flat-mode tokens as a single block.
    ///
    /// Tag fragments are sanitized; the first element of `tag_before`
    /// supplies the token's id (when numeric) and group (`name`). A token
    /// whose fragments cannot be processed is dropped on its own.
    pub fn render_flat(&mut self, tokens: Vec<FlatToken>) -> RenderReport {
        let mut report = RenderReport::default();
        let mut prepared = Vec::with_capacity(tokens.len());

        for flat in tokens {
            let (tag_before, tag_after, attrs) = match prepare_tags(&flat) {
                Ok(tags) => tags,
                Err(e) => {
                    tracing::warn!("Dropping flat token {:?}: {}", flat.text, e);
                    report.rejected += 1;
                    continue;
                }
            };

            let id = match attrs.token_id() {
                Some(id) => id,
                None => self.next_unclaimed_id(&prepared),
            };

            prepared.push(Token {
                id,
                text: flat.text,
                tag_before,
                tag_after,
                group: attrs.name,
            });
        }

        let tokens = self.register_all(prepared, &mut report);
        self.container.push(Block::Flat { tokens });

        tracing::debug!(
            "Rendered {} flat tokens ({} reused, {} rejected)",
            report.tokens,
            report.reused.len(),
            report.rejected
        );
        report
    }

    /// Next sequential id, stepping over ids already claimed in this batch
    fn next_unclaimed_id(&self, pending: &[Token]) -> TokenId {
        let claimed = pending.iter().map(|t| t.id.saturating_add(1)).max();
        claimed.map_or(self.registry.next_id(), |c| c.max(self.registry.next_id()))
    }

    fn register_all(&mut self, tokens: Vec<Token>, report: &mut RenderReport) -> Vec<TokenId> {
        let mut ids = Vec::with_capacity(tokens.len());

        for token in tokens {
            match self.registry.register(token) {
                Ok(id) => {
                    ids.push(id);
                    report.tokens += 1;
                }
                Err(RegistryError::DuplicateTokenId(id)) => {
                    tracing::warn!("Token id {} already rendered, reusing its element", id);
                    ids.push(id);
                    report.reused.push(id);
                }
                Err(e) => tracing::warn!("Skipping token: {}", e),
            }
        }

        ids
    }
}

fn prepare_tags(flat: &FlatToken) -> Result<(String, String, TagAttributes), MarkupError> {
    let tag_before = markup::sanitize_fragment(&flat.tag_before)?;
    let tag_after = markup::sanitize_fragment(&flat.tag_after)?;
    let attrs = markup::scan_first_element(&tag_before)?;
    Ok((tag_before, tag_after, attrs))
}
