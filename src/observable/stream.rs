//! Bridge from an [`Observable`] to a `futures::Stream`.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::disposables::{Disposable, DisposableCell, DisposableRef};
use crate::error::RxError;
use crate::observable::Observable;
use crate::observers::Observer;

/// Stream of the items of a subscription; the terminal error, if any, arrives as the last
/// element. Dropping the stream disposes the subscription.
pub struct RxStream<T> {
    rx: mpsc::UnboundedReceiver<Result<T, RxError>>,
    handle: Arc<DisposableCell>,
}

impl<T> Stream for RxStream<T> {
    type Item = Result<T, RxError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl<T> Drop for RxStream<T> {
    fn drop(&mut self) {
        self.handle.dispose();
    }
}

struct ChannelObserver<T> {
    tx: Option<mpsc::UnboundedSender<Result<T, RxError>>>,
    upstream: Arc<DisposableCell>,
}

impl<T: Send> Observer<T> for ChannelObserver<T> {
    fn on_subscribe(&mut self, d: DisposableRef) {
        self.upstream.set_once(d);
    }

    fn on_next(&mut self, value: T) {
        if let Some(tx) = &self.tx {
            if tx.send(Ok(value)).is_err() {
                self.tx = None;
                self.upstream.dispose();
            }
        }
    }

    fn on_error(&mut self, error: RxError) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(error));
        }
    }

    fn on_complete(&mut self) {
        self.tx = None;
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Subscribes and exposes the signals as a stream.
    ///
    /// # Example
    /// ```
    /// use futures::StreamExt;
    /// use rxvisor::Observable;
    ///
    /// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    /// # rt.block_on(async {
    /// let mut items = Observable::from_iter(vec![1, 2]).into_stream().unwrap();
    /// assert_eq!(items.next().await.unwrap().unwrap(), 1);
    /// assert_eq!(items.next().await.unwrap().unwrap(), 2);
    /// assert!(items.next().await.is_none());
    /// # });
    /// ```
    ///
    /// # Errors
    /// Whatever [`subscribe`](Observable::subscribe) returns.
    pub fn into_stream(&self) -> Result<RxStream<T>, RxError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let upstream = Arc::new(DisposableCell::new());
        self.subscribe(Box::new(ChannelObserver {
            tx: Some(tx),
            upstream: Arc::clone(&upstream),
        }))?;
        Ok(RxStream {
            rx,
            handle: upstream,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schedulers::Schedulers;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn error_is_the_last_element() {
        let items: Vec<_> = Observable::from_iter(vec![1u8, 2])
            .try_map(|v| {
                if v == 2 {
                    Err(RxError::illegal_state("two"))
                } else {
                    Ok(v)
                }
            })
            .into_stream()
            .unwrap()
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().ok(), Some(&1));
        assert_eq!(
            items[1].as_ref().err().map(RxError::kind),
            Some(ErrorKind::IllegalState)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_stream_disposes_the_subscription() {
        let mut ticks = Observable::interval(
            Duration::ZERO,
            Duration::from_millis(10),
            Schedulers::current().unwrap(),
        )
        .into_stream()
        .unwrap();
        assert_eq!(ticks.next().await.unwrap().unwrap(), 0);
        let handle = Arc::clone(&ticks.handle);
        drop(ticks);
        assert!(handle.is_disposed());
    }
}
