//! Channel abstractions and the bounded worker pool used for overlapping
//! RPCs that have no data dependency on each other (spec §9 "Coroutines /
//! concurrent I/O" — fetching signed file URLs for one lesson's files, for
//! instance). `Tx`/`Rx` generalize over `async_channel` the way `bot.rs`
//! generalizes its own senders behind `channels::Tx`/`channels::Rx` so
//! callers don't depend on the concrete channel implementation.

use std::sync::Arc;

use async_channel::{Receiver, Sender};
use futures::future::join_all;

pub trait Tx<T>: Send + Sync {
    fn send(&self, value: T) -> futures::future::BoxFuture<'_, Result<(), async_channel::SendError<T>>>;
}

pub trait Rx<T>: Send + Sync {
    fn recv(&self) -> futures::future::BoxFuture<'_, Result<T, async_channel::RecvError>>;
}

impl<T: Send + 'static> Tx<T> for Sender<T> {
    fn send(&self, value: T) -> futures::future::BoxFuture<'_, Result<(), async_channel::SendError<T>>> {
        Box::pin(Sender::send(self, value))
    }
}

impl<T: Send + 'static> Rx<T> for Receiver<T> {
    fn recv(&self) -> futures::future::BoxFuture<'_, Result<T, async_channel::RecvError>> {
        Box::pin(Receiver::recv(self))
    }
}

pub type DynTx<T> = Arc<dyn Tx<T>>;

/// Default worker count for [`map_bounded`] (spec §9: "workers = 4 by default").
pub const DEFAULT_WORKERS: usize = 4;

/// Runs `f` over `items` with at most `workers` calls in flight at once.
/// Each item owns its own future; a failing item does not cancel its siblings
/// since the only caller ([`crate::domain::api::DomainApi`]'s file-url
/// resolution) must not let one bad file hide the rest of a listing.
pub async fn map_bounded<T, R, F, Fut>(items: Vec<T>, workers: usize, f: F) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = R> + Send + 'static,
{
    let workers = workers.max(1);
    let (tx, rx) = async_channel::bounded::<T>(items.len().max(1));
    for item in items {
        tx.send(item).await.expect("receiver outlives every sender in this scope");
    }
    tx.close();

    let f = Arc::new(f);
    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let rx = rx.clone();
            let f = Arc::clone(&f);
            tokio::spawn(async move {
                let mut out = Vec::new();
                while let Ok(item) = rx.recv().await {
                    out.push(f(item).await);
                }
                out
            })
        })
        .collect();

    join_all(handles).await.into_iter().filter_map(Result::ok).flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn map_bounded_processes_every_item() {
        let items: Vec<i32> = (0..10).collect();
        let mut results = map_bounded(items, 3, |x| async move { x * 2 }).await;
        results.sort();
        assert_eq!(results, (0..10).map(|x| x * 2).collect::<Vec<_>>());
    }
}
