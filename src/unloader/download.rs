//! Bounded-parallel partition downloads.

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::session::Partition;
use crate::storage::ObjectStorage;

/// Download every partition to its staged path, at most `concurrency` at a time
///
/// Completion order is arbitrary; callers rely on the fixed `local_path` of each
/// partition, never on the order `on_downloaded` is called. Returns the total
/// bytes downloaded.
///
/// The first failure is returned and the remaining downloads are dropped.
/// Cancelling `cancel` fails the whole batch with `Error::Cancelled`.
pub(super) async fn download_partitions<F>(
    storage: &dyn ObjectStorage,
    partitions: &[Partition],
    concurrency: usize,
    cancel: &CancellationToken,
    mut on_downloaded: F,
) -> Result<u64>
where
    F: FnMut(&Partition, u64),
{
    let pending: Vec<_> = partitions
        .iter()
        .map(|partition| download_one(storage, partition, cancel))
        .collect();
    let mut downloads = stream::iter(pending).buffer_unordered(concurrency.max(1));

    let mut total = 0u64;
    while let Some(result) = downloads.next().await {
        // Returning drops `downloads` and with it every download still in flight
        let (partition, bytes) = result?;
        total += bytes;
        on_downloaded(partition, bytes);
    }

    Ok(total)
}

async fn download_one<'a>(
    storage: &'a dyn ObjectStorage,
    partition: &'a Partition,
    cancel: &'a CancellationToken,
) -> Result<(&'a Partition, u64)> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = storage.download(&partition.key, &partition.local_path) => {
            result.map(|bytes| (partition, bytes))
        }
    }
}
