//! Fan-in of many bounded channels into one.

use futures::stream::{self, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

/// Forward every value from `inputs` into a single output channel.
///
/// Values from one input keep their relative order; across inputs the
/// output takes whichever is ready first. An input leaves the poll set as
/// soon as it closes, and the output closes once the last input has.
pub fn merge<T>(inputs: Vec<mpsc::Receiver<T>>, capacity: usize) -> mpsc::Receiver<T>
where
    T: Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity);
    let count = inputs.len();
    let mut merged = stream::select_all(inputs.into_iter().map(receiver_stream));

    tokio::spawn(async move {
        let mut forwarded = 0usize;
        while let Some(value) = merged.next().await {
            if tx.send(value).await.is_err() {
                debug!("Merged stream receiver dropped, stopping fan-in");
                return;
            }
            forwarded += 1;
        }
        debug!("Merged {} values from {} inputs", forwarded, count);
    });

    rx
}

fn receiver_stream<T>(mut rx: mpsc::Receiver<T>) -> impl Stream<Item = T> + Unpin {
    stream::poll_fn(move |cx| rx.poll_recv(cx))
}
