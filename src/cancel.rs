//! Cooperative cancellation for in-flight operations.
//!
//! Mutations and bulk jobs accept a token so that work initiated by a
//! since-torn-down context can be abandoned instead of committing a stale
//! result into the cache. Cancellation is cooperative: the remote call itself
//! is not aborted, its result is discarded.

use tokio::sync::watch;

/// Hands out [`CancelToken`]s and fires them.
pub struct CancelSource {
  tx: watch::Sender<bool>,
}

impl CancelSource {
  pub fn new() -> Self {
    let (tx, _) = watch::channel(false);
    Self { tx }
  }

  pub fn token(&self) -> CancelToken {
    CancelToken {
      rx: Some(self.tx.subscribe()),
    }
  }

  /// Fire all tokens handed out by this source.
  pub fn cancel(&self) {
    let _ = self.tx.send(true);
  }
}

impl Default for CancelSource {
  fn default() -> Self {
    Self::new()
  }
}

/// One-shot cancellation flag.
///
/// The default token never fires, for call sites with no tear-down story.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
  rx: Option<watch::Receiver<bool>>,
}

impl CancelToken {
  /// A token that never fires.
  pub fn never() -> Self {
    Self::default()
  }

  pub fn is_cancelled(&self) -> bool {
    self.rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
  }

  /// Resolves once the token fires; pends forever for a never-token or when
  /// the source is gone without having fired.
  pub async fn cancelled(mut self) {
    match self.rx.as_mut() {
      None => std::future::pending::<()>().await,
      Some(rx) => {
        if *rx.borrow() {
          return;
        }
        loop {
          if rx.changed().await.is_err() {
            // Source dropped without cancelling: this operation will never
            // be cancelled.
            std::future::pending::<()>().await;
          }
          if *rx.borrow() {
            return;
          }
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_token_observes_cancel() {
    let source = CancelSource::new();
    let token = source.token();
    assert!(!token.is_cancelled());

    source.cancel();
    assert!(token.is_cancelled());
    token.cancelled().await; // resolves immediately
  }

  #[tokio::test]
  async fn test_never_token_pends() {
    let token = CancelToken::never();
    assert!(!token.is_cancelled());

    let pending = tokio::time::timeout(std::time::Duration::from_millis(10), token.cancelled());
    assert!(pending.await.is_err());
  }
}
