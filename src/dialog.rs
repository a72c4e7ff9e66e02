//! Host dialog service
//!
//! The engine never blocks on a dialog. It hands the host a one-shot
//! [`DialogReply`] and keeps the matching receiver; the host resolves the
//! reply whenever the user answers. Dropping the reply without resolving it
//! is how a dismissed dialog is reported.

use futures::channel::oneshot;

use crate::annotations::CaptureTicket;

/// Input widget the dialog should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    /// Multi-line free text
    Textarea,
}

/// A request for user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub title: String,
    pub input_type: InputType,
}

/// Continuation handed to the dialog service
#[derive(Debug)]
pub struct DialogReply {
    sender: oneshot::Sender<String>,
}

impl DialogReply {
    fn channel() -> (Self, oneshot::Receiver<String>) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, receiver)
    }

    /// Deliver the user's answer. Returns false if the widget is gone.
    pub fn resolve(self, value: impl Into<String>) -> bool {
        self.sender.send(value.into()).is_ok()
    }

    /// Report that the user closed the dialog without answering
    pub fn dismiss(self) {}
}

/// Modal prompt/notice service supplied by the host
pub trait DialogService {
    /// Show a prompt; answer later through `reply`
    fn prompt(&mut self, request: PromptRequest, reply: DialogReply);

    /// Show a notice with no input
    fn notify(&mut self, message: &str);
}

/// Dialog service for hosts without a UI: every prompt is dismissed
#[derive(Debug, Default)]
pub struct HeadlessDialog;

impl DialogService for HeadlessDialog {
    fn prompt(&mut self, request: PromptRequest, reply: DialogReply) {
        tracing::debug!("No dialog available, dismissing prompt {:?}", request.title);
        reply.dismiss();
    }

    fn notify(&mut self, message: &str) {
        tracing::info!("{}", message);
    }
}

/// State of a dialog the engine is waiting on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogPoll {
    Waiting,
    Resolved(String),
    Dismissed,
}

/// Engine side of an in-flight dialog
#[derive(Debug)]
pub struct PendingDialog {
    pub ticket: CaptureTicket,
    receiver: oneshot::Receiver<String>,
}

impl PendingDialog {
    /// Open a dialog for `ticket`: the reply goes to the host, the
    /// pending half stays with the engine
    pub fn open(ticket: CaptureTicket) -> (Self, DialogReply) {
        let (reply, receiver) = DialogReply::channel();
        (Self { ticket, receiver }, reply)
    }

    /// Check for an answer without blocking
    pub fn poll(&mut self) -> DialogPoll {
        match self.receiver.try_recv() {
            Ok(Some(value)) => DialogPoll::Resolved(value),
            Ok(None) => DialogPoll::Waiting,
            Err(oneshot::Canceled) => DialogPoll::Dismissed,
        }
    }

    /// Wait for the answer; `None` when dismissed
    pub async fn wait(self) -> Option<String> {
        self.receiver.await.ok()
    }
}
