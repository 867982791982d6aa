use std::future::Future;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Exit status when a second interrupt cuts the shutdown short (128 + SIGINT).
const FORCED_EXIT_CODE: i32 = 130;

/// Sets up a shutdown signal handler
///
/// The returned receiver fires once when Ctrl+C is pressed. A second Ctrl+C
/// while shutting down exits the process immediately.
pub fn setup_shutdown_handler() -> broadcast::Receiver<()> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    tokio::spawn(forward_interrupts(tokio::signal::ctrl_c, shutdown_tx, || {
        std::process::exit(FORCED_EXIT_CODE);
    }));

    shutdown_rx
}

async fn forward_interrupts<S, Fut, X>(
    mut interrupt: S,
    shutdown_tx: broadcast::Sender<()>,
    force_exit: X,
) where
    S: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
    X: FnOnce(),
{
    match interrupt().await {
        Ok(()) => {
            info!("Received interrupt signal (Ctrl+C)");
            let _ = shutdown_tx.send(());
        }
        Err(e) => {
            error!("Failed to install Ctrl+C handler: {e}");
            // Holding the sender keeps receivers from seeing a closed channel
            std::future::pending::<()>().await;
        }
    }

    if interrupt().await.is_ok() {
        warn!("Second interrupt, exiting without waiting for the broker");
        force_exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    type Interrupt = Pin<Box<dyn Future<Output = io::Result<()>> + Send>>;

    /// Interrupt source that fires `count` times, then never again.
    fn interrupts(count: usize) -> impl FnMut() -> Interrupt {
        let mut left = count;
        move || {
            if left > 0 {
                left -= 1;
                Box::pin(std::future::ready(Ok(())))
            } else {
                Box::pin(std::future::pending())
            }
        }
    }

    #[tokio::test]
    async fn test_no_shutdown_without_signal() {
        let mut shutdown = setup_shutdown_handler();
        let waited = tokio::time::timeout(Duration::from_millis(50), shutdown.recv()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_first_interrupt_requests_shutdown() {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let exits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&exits);

        let task = tokio::spawn(forward_interrupts(interrupts(1), shutdown_tx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        shutdown_rx.recv().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(exits.load(Ordering::SeqCst), 0);
        task.abort();
    }

    #[tokio::test]
    async fn test_second_interrupt_forces_exit() {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let exits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&exits);

        forward_interrupts(interrupts(2), shutdown_tx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert!(shutdown_rx.recv().await.is_ok());
        assert_eq!(exits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_signal_setup_keeps_channel_open() {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
        let task = tokio::spawn(forward_interrupts(
            || std::future::ready(Err(io::Error::other("no signal support"))),
            shutdown_tx,
            || {},
        ));

        let waited = tokio::time::timeout(Duration::from_millis(50), shutdown_rx.recv()).await;
        assert!(waited.is_err());
        task.abort();
    }
}
