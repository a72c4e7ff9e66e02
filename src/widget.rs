//! Fulltext widget
//!
//! The component the host drives. The host calls `render_value` with each
//! payload and forwards user gestures (`mouse_up`, `context_menu`); between
//! events it calls `pump` so resolved dialogs and group events are applied.
//! Everything runs on the caller's thread.

use std::path::Path;

use crate::annotations::{
    Annotation, AnnotationOverlay, AnnotationStore, CaptureOutcome, CaptureTicket, NoSelection,
    OverlayReport, TextSelection,
};
use crate::config::{RenderConfig, Settings};
use crate::dialog::{DialogPoll, DialogService, HeadlessDialog, PendingDialog};
use crate::error::Result;
use crate::payload::{PayloadAnnotations, RenderPayload};
use crate::registry::{TokenId, TokenRegistry};
use crate::render::{Container, MarkupError, RenderReport, TokenRenderer};
use crate::sync::{GroupHub, SelectionSyncBus, SyncEvent, SyncState, Transition};

/// What the host's result callback receives once a capture dialog resolves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogResult {
    pub ticket: CaptureTicket,
    /// The raw value the dialog returned
    pub value: String,
    pub annotation: Annotation,
}

/// Host callback for resolved capture dialogs
pub type DialogCallback = Box<dyn FnMut(&DialogResult)>;

/// Outcome of a mouse-up gesture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionGesture {
    /// Dialog opened for this capture
    Captured(CaptureTicket),
    Ignored(NoSelection),
    /// Selection capture is off (`settings.dialog` is false)
    Disarmed,
}

/// Outcome of a context-menu gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMenu {
    /// Native menu suppressed, dialog notice shown
    Suppressed,
    /// Leave the native menu alone
    Native,
}

/// Summary of a `render_value` call
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderSummary {
    pub render: RenderReport,
    pub overlay: OverlayReport,
}

/// Work done by one `pump`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PumpReport {
    pub finalized: Vec<Annotation>,
    pub dismissed: usize,
    pub transitions: Vec<Transition>,
}

/// Token rendering, annotation and selection sync for one container
pub struct FulltextWidget {
    config: RenderConfig,
    settings: Settings,
    container: Container,
    registry: TokenRegistry,
    store: AnnotationStore,
    sync: SelectionSyncBus,
    hub: Option<GroupHub>,
    dialog: Box<dyn DialogService>,
    pending: Vec<PendingDialog>,
    callback: Option<DialogCallback>,
}

impl FulltextWidget {
    pub fn new(config: RenderConfig, dialog: Box<dyn DialogService>) -> Self {
        Self {
            container: Container::new(&config),
            config,
            settings: Settings::default(),
            registry: TokenRegistry::new(),
            store: AnnotationStore::new(),
            sync: SelectionSyncBus::new(),
            hub: None,
            dialog,
            pending: Vec::new(),
            callback: None,
        }
    }

    /// A widget with no dialog UI; captures are always dismissed
    pub fn headless(config: RenderConfig) -> Self {
        Self::new(config, Box::new(HeadlessDialog))
    }

    /// Join groups on `hub` when a payload names a `crosstalk_group`
    pub fn with_hub(mut self, hub: GroupHub) -> Self {
        self.hub = Some(hub);
        self
    }

    /// Register the `callbackFunction` invoked with each resolved dialog
    pub fn on_dialog_result(&mut self, callback: impl FnMut(&DialogResult) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Render a payload into the container.
    ///
    /// Content is appended to what earlier calls rendered; call
    /// [`clear`](Self::clear) first to replace it. The annotation store
    /// is reset to the payload's annotations on every call.
    pub fn render_value(&mut self, payload: RenderPayload) -> Result<RenderSummary> {
        let RenderPayload { data, settings } = payload;

        if !settings.crosstalk_key.is_empty() {
            tracing::debug!("Rendering with {} crosstalk keys", settings.crosstalk_key.len());
        }
        match (&self.hub, settings.crosstalk_group.as_deref()) {
            (Some(hub), Some(group)) => self.sync.join(hub, group),
            (_, None) => self.sync.leave(),
            (None, Some(group)) => {
                tracing::debug!("No hub attached, not joining group {:?}", group);
            }
        }

        let border = settings.boxed.then(|| self.config.border.clone());
        self.container.set_border(border);
        self.settings = settings;

        let mut renderer = TokenRenderer::new(&mut self.container, &mut self.registry);
        let mut render = renderer.render(data.paragraphs());
        if !data.token.is_empty() {
            let flat = renderer.render_flat(data.flat_tokens());
            render.tokens += flat.tokens;
            render.reused.extend(flat.reused);
            render.rejected += flat.rejected;
        }

        let annotations = data.annotations();
        self.store.load(&annotations);
        if !self.pending.is_empty() {
            tracing::debug!("Dropping {} open dialogs on re-render", self.pending.len());
            self.pending.clear();
        }
        let overlay =
            AnnotationOverlay::new(&mut self.registry, &mut self.store).apply_annotations(&annotations);

        self.sync.attach(&mut self.registry);

        tracing::info!(
            "Rendered {} tokens with {} annotations",
            render.tokens,
            overlay.applied
        );
        Ok(RenderSummary { render, overlay })
    }

    /// Parse and render a JSON payload
    pub fn render_json(&mut self, json: &str) -> Result<RenderSummary> {
        let payload = RenderPayload::from_json(json)?;
        self.render_value(payload)
    }

    /// Host resize notification
    pub fn resize(&mut self, width: u32, height: u32) {
        self.container.resize(width, height);
    }

    /// Empty the container, registry and annotation store
    pub fn clear(&mut self) {
        self.container.clear();
        self.registry.clear();
        self.store.reset();
        self.pending.clear();
    }

    /// Mouse-up over the container with the host's current selection
    pub fn mouse_up(&mut self, selection: &TextSelection) -> SelectionGesture {
        if !self.settings.dialog {
            return SelectionGesture::Disarmed;
        }

        let title = self.settings.dialog_title().to_string();
        let outcome = AnnotationOverlay::new(&mut self.registry, &mut self.store).capture_selection(
            selection,
            self.dialog.as_mut(),
            &title,
        );

        match outcome {
            CaptureOutcome::Pending(pending) => {
                let ticket = pending.ticket;
                self.pending.push(pending);
                SelectionGesture::Captured(ticket)
            }
            CaptureOutcome::NoSelection(reason) => {
                tracing::debug!("Selection ignored: {:?}", reason);
                SelectionGesture::Ignored(reason)
            }
        }
    }

    /// Context-menu gesture on token `id`
    pub fn context_menu(&mut self, id: TokenId) -> ContextMenu {
        let handled = AnnotationOverlay::new(&mut self.registry, &mut self.store)
            .handles_context_menu(id);
        if !handled {
            return ContextMenu::Native;
        }

        let labels: Vec<&str> = self
            .store
            .annotations_at(id)
            .map(|a| a.text.as_str())
            .filter(|t| !t.is_empty())
            .collect();
        let message = if labels.is_empty() {
            format!("Token {} is annotated", id)
        } else {
            labels.join(", ")
        };
        self.dialog.notify(&message);
        ContextMenu::Suppressed
    }

    /// Apply resolved dialogs and buffered group events
    pub fn pump(&mut self) -> PumpReport {
        let mut report = PumpReport::default();

        for mut pending in std::mem::take(&mut self.pending) {
            match pending.poll() {
                DialogPoll::Waiting => self.pending.push(pending),
                DialogPoll::Resolved(value) => {
                    self.settle_capture(pending.ticket, Some(value), &mut report)
                }
                DialogPoll::Dismissed => self.settle_capture(pending.ticket, None, &mut report),
            }
        }

        report.transitions = self.sync.drain(&mut self.registry);
        report
    }

    /// Wait until every open dialog is answered or dismissed, then apply
    /// buffered group events
    pub async fn settle(&mut self) -> PumpReport {
        let mut report = PumpReport::default();

        for pending in std::mem::take(&mut self.pending) {
            let ticket = pending.ticket;
            let value = pending.wait().await;
            self.settle_capture(ticket, value, &mut report);
        }

        report.transitions = self.sync.drain(&mut self.registry);
        report
    }

    fn settle_capture(
        &mut self,
        ticket: CaptureTicket,
        value: Option<String>,
        report: &mut PumpReport,
    ) {
        match value {
            Some(value) => {
                if let Some(annotation) = self.finalize(ticket, value) {
                    report.finalized.push(annotation);
                }
            }
            None => {
                AnnotationOverlay::new(&mut self.registry, &mut self.store).abandon(ticket);
                report.dismissed += 1;
            }
        }
    }

    fn finalize(&mut self, ticket: CaptureTicket, value: String) -> Option<Annotation> {
        let annotation =
            AnnotationOverlay::new(&mut self.registry, &mut self.store).finalize(ticket, &value)?;

        if let Some(callback) = self.callback.as_mut() {
            callback(&DialogResult {
                ticket,
                value,
                annotation: annotation.clone(),
            });
        }
        Some(annotation)
    }

    /// Apply a group event directly, bypassing the hub
    pub fn handle_sync_event(&mut self, event: SyncEvent) -> Transition {
        self.sync.handle(event, &mut self.registry)
    }

    /// Wait for the next event on the joined group and apply it.
    /// `None` when no group is joined.
    pub async fn next_sync_event(&mut self) -> Option<Transition> {
        self.sync.next(&mut self.registry).await
    }

    /// Current annotations in the payload's column layout
    pub fn export_annotations(&self) -> PayloadAnnotations {
        self.store.export()
    }

    /// The container element as HTML
    pub fn html(&self) -> std::result::Result<String, MarkupError> {
        self.container.to_html(&self.registry)
    }

    /// The container's content as HTML
    pub fn inner_html(&self) -> std::result::Result<String, MarkupError> {
        self.container.inner_html(&self.registry)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn sync_state(&self) -> &SyncState {
        self.sync.state()
    }

    /// Group currently joined on the hub
    pub fn sync_group(&self) -> Option<&str> {
        self.sync.group()
    }

    /// Dialogs still waiting on the user
    pub fn open_dialogs(&self) -> usize {
        self.pending.len()
    }
}

/// Render a payload file headlessly and return the container HTML
pub fn render_file(path: &Path, config: RenderConfig) -> Result<String> {
    let json = std::fs::read_to_string(path)?;
    let mut widget = FulltextWidget::headless(config);
    widget.render_json(&json)?;
    Ok(widget.html()?)
}
