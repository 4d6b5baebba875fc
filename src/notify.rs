//! User-facing notifications.
//!
//! The Rust shape of the UI's toast system: operations push a notification
//! when they settle, the presentation layer drains the receiving end and
//! renders however it likes. Exactly one notification per settled mutation
//! and one per bulk batch.

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Info,
  Success,
  Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
  pub severity: Severity,
  pub title: String,
  pub detail: Option<String>,
}

/// Sending half of the notification stream. Cheap to clone.
#[derive(Clone)]
pub struct Notifier {
  tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
  /// Create a notifier and the receiver the presentation layer drains.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }

  pub fn success(&self, title: impl Into<String>, detail: impl Into<String>) {
    self.send(Severity::Success, title.into(), Some(detail.into()));
  }

  pub fn error(&self, title: impl Into<String>, detail: impl Into<String>) {
    self.send(Severity::Error, title.into(), Some(detail.into()));
  }

  pub fn info(&self, title: impl Into<String>) {
    self.send(Severity::Info, title.into(), None);
  }

  fn send(&self, severity: Severity, title: String, detail: Option<String>) {
    // Receiver may be gone (headless use); notifications are best-effort.
    let _ = self.tx.send(Notification {
      severity,
      title,
      detail,
    });
  }
}
