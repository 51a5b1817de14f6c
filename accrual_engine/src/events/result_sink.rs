//! The consuming end of the pollers' result stream.
use log::*;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::events::{EventProducer, EventProducers, Handler, PointsCreditedEvent, PollerReport};

/// Creates the bounded result stream shared by the pollers. The returned producer can be cloned freely.
pub fn result_stream(
    capacity: usize,
    cancel: CancellationToken,
    on_report: Option<Handler<PollerReport>>,
    producers: EventProducers,
) -> (EventProducer<PollerReport>, ResultSink) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let sink = ResultSink { receiver, cancel, on_report, producers };
    (EventProducer::new(sender), sink)
}

/// Drains [`PollerReport`]s one message at a time, logging each and passing it on to the hooks.
pub struct ResultSink {
    receiver: mpsc::Receiver<PollerReport>,
    cancel: CancellationToken,
    on_report: Option<Handler<PollerReport>>,
    producers: EventProducers,
}

impl ResultSink {
    /// Runs until cancellation, or until every producer has gone away. On cancellation, the stream is closed so that
    /// further sends fail immediately, and whatever is already buffered is still handled. Returns the number of reports
    /// handled.
    pub async fn run(mut self) -> usize {
        debug!("📥️ Result sink started");
        let mut handled = 0;
        loop {
            tokio::select! {
                biased;
                report = self.receiver.recv() => match report {
                    Some(report) => {
                        self.handle(report).await;
                        handled += 1;
                    },
                    None => break,
                },
                _ = self.cancel.cancelled() => {
                    self.receiver.close();
                    while let Some(report) = self.receiver.recv().await {
                        self.handle(report).await;
                        handled += 1;
                    }
                    break;
                },
            }
        }
        debug!("📥️ Result sink stopped after {handled} reports");
        handled
    }

    async fn handle(&self, report: PollerReport) {
        if report.is_failure() {
            warn!("📥️ {report}");
        } else {
            info!("📥️ {report}");
        }
        if let PollerReport::StatusChanged { order_id, to, credited, .. } = &report {
            if !credited.is_zero() {
                let event = PointsCreditedEvent::new(order_id.clone(), *to, *credited);
                self.producers.publish_points_credited(event).await;
            }
        }
        if let Some(hook) = &self.on_report {
            (hook)(report).await;
        }
    }
}

#[cfg(test)]
mod test {
    use std::{future::Future, pin::Pin, sync::Arc};

    use tokio::sync::Mutex;

    use super::*;
    use crate::db_types::{OrderId, OrderStatusType};

    fn confirmed(n: usize) -> PollerReport {
        PollerReport::StatusConfirmed {
            worker_id: n,
            order_id: OrderId::from("12345678903"),
            status: OrderStatusType::Processing,
        }
    }

    #[tokio::test]
    async fn buffered_reports_survive_cancellation() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s2 = seen.clone();
        let hook: Handler<PollerReport> = Arc::new(move |r| {
            let seen = s2.clone();
            Box::pin(async move { seen.lock().await.push(r.worker_id()) }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let cancel = CancellationToken::new();
        let (producer, sink) = result_stream(4, cancel.clone(), Some(hook), EventProducers::default());
        for i in 0..3 {
            assert!(producer.publish_event(confirmed(i)).await);
        }
        cancel.cancel();
        assert_eq!(sink.run().await, 3);
        assert_eq!(*seen.lock().await, vec![0, 1, 2]);
        assert!(!producer.publish_event(confirmed(9)).await);
    }

    #[tokio::test]
    async fn sink_stops_when_producers_leave() {
        let (producer, sink) = result_stream(1, CancellationToken::new(), None, EventProducers::default());
        let task = tokio::spawn(sink.run());
        producer.publish_event(confirmed(1)).await;
        drop(producer);
        assert_eq!(task.await.unwrap(), 1);
    }
}
