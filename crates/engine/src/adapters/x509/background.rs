// adapters/x509/background.rs

use tokio::sync::oneshot;
use tracing::warn;

use crate::domain::context::TrustContext;
use crate::domain::evaluator::TrustEvaluator;
use crate::domain::verdict::TrustVerdict;

use super::walker::ChainWalker;

/// Run the chain walk off the caller's thread and deliver the verdict
/// through a oneshot channel.
///
/// Inside a tokio runtime the walk goes to the blocking pool; otherwise a
/// dedicated thread is spawned. Dropping the receiver discards the verdict
/// but does not interrupt the walk.
pub fn evaluate_in_background(context: TrustContext) -> oneshot::Receiver<TrustVerdict> {
  let (tx, rx) = oneshot::channel();
  let job = move || {
    let verdict = ChainWalker.evaluate(&context);
    let _ = tx.send(verdict);
  };

  match tokio::runtime::Handle::try_current() {
    Ok(handle) => {
      handle.spawn_blocking(job);
    }
    Err(_) => {
      if let Err(e) = std::thread::Builder::new()
        .name("pfxtrust-evaluate".into())
        .spawn(job)
      {
        warn!(error = %e, "could not spawn evaluation thread");
      }
    }
  }
  rx
}

/// Await a background evaluation. Fails only if the worker died before
/// sending its verdict.
pub async fn evaluate_async(context: TrustContext) -> Result<TrustVerdict, oneshot::error::RecvError> {
  evaluate_in_background(context).await
}
