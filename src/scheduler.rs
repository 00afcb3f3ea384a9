//! Bounded fan-out over gateway calls.
//!
//! Two primitives, one per stage shape:
//! - [`run_all`] drives side-effect-only tasks (cache warming) and keeps nothing.
//! - [`map_bounded`] drives tasks that produce a value and returns them in input order.
//!
//! Both finish every task before returning, so a pipeline stage never overlaps the next.

use futures::stream::{self, StreamExt};
use std::future::Future;

pub async fn run_all<I, F, Fut>(items: I, limit: usize, task: F)
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = ()>,
{
    stream::iter(items)
        .for_each_concurrent(limit.max(1), task)
        .await;
}

pub async fn map_bounded<I, F, Fut, T>(items: I, limit: usize, task: F) -> Vec<T>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = T>,
{
    stream::iter(items)
        .map(task)
        .buffered(limit.max(1))
        .collect()
        .await
}
