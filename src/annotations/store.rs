//! Per-component annotation store
//!
//! Holds the ordered annotations, the parallel sequence of selection
//! texts, and the captures still waiting on their dialog. A capture only
//! reaches the annotation sequence once its dialog resolves; a dismissed
//! dialog leaves no trace.

use std::collections::BTreeMap;

use crate::payload::PayloadAnnotations;
use crate::registry::TokenId;

use super::types::{Annotation, CapturedSelection, DialogLabel};

/// Handle for a capture awaiting its dialog
pub type CaptureTicket = u64;

/// Annotation state owned by one widget
#[derive(Debug, Default)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
    /// Selected text per annotation, index-aligned with `annotations`
    texts: Vec<String>,
    pending: BTreeMap<CaptureTicket, CapturedSelection>,
    next_ticket: CaptureTicket,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with annotations from a render payload
    pub fn load(&mut self, annotations: &[Annotation]) {
        self.reset();
        for annotation in annotations {
            self.push(annotation.clone(), &annotation.text);
        }
    }

    /// Drop all annotations and pending captures
    pub fn reset(&mut self) {
        self.annotations.clear();
        self.texts.clear();
        self.pending.clear();
    }

    pub fn push(&mut self, annotation: Annotation, selected_text: &str) {
        self.annotations.push(annotation);
        self.texts.push(selected_text.to_string());
    }

    /// Park a capture until its dialog resolves
    pub fn begin(&mut self, selection: CapturedSelection) -> CaptureTicket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending.insert(ticket, selection);
        ticket
    }

    /// Finalize a pending capture with the dialog's value
    pub fn commit(&mut self, ticket: CaptureTicket, value: &str) -> Option<Annotation> {
        let selection = self.pending.remove(&ticket)?;
        let label = DialogLabel::parse(value);

        let annotation = Annotation {
            id_left: selection.id_left(),
            id_right: selection.id_right(),
            color: label.color_or_default().to_string(),
            text: label.label,
        };
        self.push(annotation.clone(), &selection.text);
        Some(annotation)
    }

    /// Forget a pending capture whose dialog was dismissed
    pub fn abandon(&mut self, ticket: CaptureTicket) -> Option<CapturedSelection> {
        self.pending.remove(&ticket)
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Annotations whose range covers `id`
    pub fn annotations_at(&self, id: TokenId) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter().filter(move |a| a.range().contains(&id))
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn pending(&self, ticket: CaptureTicket) -> Option<&CapturedSelection> {
        self.pending.get(&ticket)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Export in the payload's column layout
    pub fn export(&self) -> PayloadAnnotations {
        PayloadAnnotations {
            id_left: self.annotations.iter().map(|a| a.id_left).collect(),
            id_right: self.annotations.iter().map(|a| a.id_right).collect(),
            code: self.annotations.iter().map(|a| a.color.clone()).collect(),
            text: self.texts.clone(),
        }
    }
}
