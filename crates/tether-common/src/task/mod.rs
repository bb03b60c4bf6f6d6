//! Panic-contained task spawning
//!
//! Every long-lived background routine (broadcast consumer, replicator
//! publish, heartbeat watcher, socket reader) runs under `spawn_logged` so
//! one faulty handler cannot take down the process.

use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;

/// Spawn `future` on the runtime, recovering and logging any panic.
///
/// The task itself always resolves to `()`; a panic is reported through
/// `tracing::error!` with the task name and the panic payload.
pub fn spawn_logged<F>(name: &'static str, future: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(panic) = AssertUnwindSafe(future).catch_unwind().await {
            tracing::error!(
                task = name,
                panic = panic_message(panic.as_ref()),
                "recovered panic in background task"
            );
        }
    })
}

/// Extract a printable message from a panic payload
fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_spawn_logged_runs_future() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        spawn_logged("test-task", async move {
            flag.store(true, Ordering::SeqCst);
        })
        .await
        .unwrap();

        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_spawn_logged_recovers_panic() {
        // The wrapper task must complete normally even though the inner
        // future panics.
        let handle = spawn_logged("panicky-task", async {
            panic!("boom");
        });
        assert!(handle.await.is_ok());

        // And the runtime is still healthy afterwards.
        let follow_up = spawn_logged("follow-up", async {});
        assert!(follow_up.await.is_ok());
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(boxed.as_ref()), "<non-string panic payload>");
    }
}
