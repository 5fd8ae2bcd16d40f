use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const SUBSCRIPTION_BUFFER: usize = 16;

/// A live view onto some store query. Each item is a full snapshot, the first
/// one delivered as soon as the subscription starts. Dropping the subscription
/// (or calling [`Subscription::cancel`]) stops the feeding task.
pub struct Subscription<T> {
    rx: mpsc::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Subscription<T> {
    pub fn spawn<F, Fut>(feed: F) -> Self
        where F: FnOnce(mpsc::Sender<T>) -> Fut, Fut: Future<Output = ()> + Send + 'static
    {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let task = tokio::spawn(feed(tx));
        Self { rx, task }
    }

    /// Next snapshot, or `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    pub fn cancel(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_stops_the_feed() {
        let (done_tx, mut done_rx) = mpsc::channel::<()>(1);
        let mut sub = Subscription::spawn(move |tx| async move {
            let _guard = done_tx;
            let mut n = 0u32;
            loop {
                if tx.send(n).await.is_err() {
                    break;
                }
                n += 1;
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
        assert_eq!(sub.next().await, Some(0));
        sub.cancel();
        // The feed owned the only sender; it closes once the task is aborted.
        let closed = tokio::time::timeout(Duration::from_secs(1), done_rx.recv()).await;
        assert_eq!(closed, Ok(None));
    }
}
