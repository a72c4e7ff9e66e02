//! Annotation overlay
//!
//! Colors annotated id ranges and turns user text selections into
//! pending captures. Works through the registry only; it never owns
//! token identity.

use crate::dialog::{DialogService, InputType, PendingDialog, PromptRequest};
use crate::registry::{TokenId, TokenRegistry};

use super::store::{AnnotationStore, CaptureTicket};
use super::types::{Annotation, CapturedSelection};

/// One end of a host text selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionEndpoint {
    /// `id` attribute of the selected text node's parent element
    pub parent_id: Option<String>,
}

impl SelectionEndpoint {
    /// Endpoint inside the span of token `id`
    pub fn in_token(id: TokenId) -> Self {
        Self {
            parent_id: Some(id.to_string()),
        }
    }

    /// Endpoint whose parent carries no id
    pub fn detached() -> Self {
        Self { parent_id: None }
    }

    fn token_id(&self) -> Option<TokenId> {
        self.parent_id.as_deref()?.trim().parse().ok()
    }
}

/// The host's current text selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSelection {
    pub text: String,
    pub anchor: SelectionEndpoint,
    pub focus: SelectionEndpoint,
}

/// Why a selection gesture produced nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoSelection {
    /// Collapsed selection (a click, not a drag)
    Empty,
    /// Anchor parent does not name a registered token
    UnresolvedAnchor,
    /// Focus parent does not name a registered token
    UnresolvedFocus,
}

/// Result of a selection gesture
#[derive(Debug)]
pub enum CaptureOutcome {
    /// Dialog opened; the capture commits when it resolves
    Pending(PendingDialog),
    NoSelection(NoSelection),
}

/// Summary of an `apply_annotations` pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OverlayReport {
    pub applied: usize,
    /// Token elements that received a color
    pub colored: usize,
    /// Ids inside some range that did not resolve
    pub unresolved: u64,
    /// Annotations with `id_left > id_right`
    pub inverted: usize,
}

/// Overlay operations over one widget's registry and store
pub struct AnnotationOverlay<'a> {
    registry: &'a mut TokenRegistry,
    store: &'a mut AnnotationStore,
}

impl<'a> AnnotationOverlay<'a> {
    pub fn new(registry: &'a mut TokenRegistry, store: &'a mut AnnotationStore) -> Self {
        Self { registry, store }
    }

    /// Color every resolvable id of every annotation, in order
    pub fn apply_annotations(&mut self, annotations: &[Annotation]) -> OverlayReport {
        let mut report = OverlayReport::default();
        for annotation in annotations {
            self.apply(annotation, &mut report);
        }

        if report.unresolved > 0 {
            tracing::warn!("{} annotated ids did not resolve", report.unresolved);
        }
        report
    }

    fn apply(&mut self, annotation: &Annotation, report: &mut OverlayReport) {
        report.applied += 1;
        if annotation.is_inverted() {
            tracing::warn!(
                "Annotation range {}..={} is inverted, nothing colored",
                annotation.id_left,
                annotation.id_right
            );
            report.inverted += 1;
            return;
        }

        // Only registered ids inside the range are visited; the rest are
        // the unresolved remainder.
        let mut resolved = 0u64;
        for element in self.registry.range_mut(annotation.range()) {
            element.style.background_color = Some(annotation.color.clone());
            element.context_menu = true;
            resolved += 1;
        }
        report.colored += resolved as usize;
        report.unresolved = report
            .unresolved
            .saturating_add(annotation.span_len().saturating_sub(resolved));
    }

    /// Resolve a selection to token ids and open the capture dialog.
    ///
    /// Returns immediately; the capture stays pending in the store until
    /// [`finalize`](Self::finalize) or [`abandon`](Self::abandon).
    pub fn capture_selection(
        &mut self,
        selection: &TextSelection,
        dialog: &mut dyn DialogService,
        title: &str,
    ) -> CaptureOutcome {
        if selection.text.is_empty() {
            return CaptureOutcome::NoSelection(NoSelection::Empty);
        }

        let anchor = match self.resolve_endpoint(&selection.anchor) {
            Some(id) => id,
            None => return CaptureOutcome::NoSelection(NoSelection::UnresolvedAnchor),
        };
        let focus = match self.resolve_endpoint(&selection.focus) {
            Some(id) => id,
            None => return CaptureOutcome::NoSelection(NoSelection::UnresolvedFocus),
        };

        let captured = CapturedSelection::new(&selection.text, anchor, focus);
        tracing::debug!(
            "Captured {:?} selection {}..={}",
            captured.direction,
            captured.id_left(),
            captured.id_right()
        );

        let ticket = self.store.begin(captured);
        let (pending, reply) = PendingDialog::open(ticket);
        dialog.prompt(
            PromptRequest {
                title: title.to_string(),
                input_type: InputType::Textarea,
            },
            reply,
        );

        CaptureOutcome::Pending(pending)
    }

    fn resolve_endpoint(&self, endpoint: &SelectionEndpoint) -> Option<TokenId> {
        endpoint
            .token_id()
            .filter(|id| self.registry.contains(*id))
    }

    /// Commit a pending capture with the dialog's value and color it
    pub fn finalize(&mut self, ticket: CaptureTicket, value: &str) -> Option<Annotation> {
        let annotation = self.store.commit(ticket, value)?;
        let mut report = OverlayReport::default();
        self.apply(&annotation, &mut report);

        if report.unresolved > 0 {
            tracing::warn!(
                "Captured annotation lost {} ids since selection",
                report.unresolved
            );
        }
        Some(annotation)
    }

    /// Drop a pending capture whose dialog was dismissed
    pub fn abandon(&mut self, ticket: CaptureTicket) {
        if self.store.abandon(ticket).is_some() {
            tracing::debug!("Capture {} dismissed", ticket);
        }
    }

    /// Whether a context-menu gesture on `id` should go to the dialog
    pub fn handles_context_menu(&self, id: TokenId) -> bool {
        self.registry
            .resolve(id)
            .map(|e| e.context_menu)
            .unwrap_or(false)
    }
}
