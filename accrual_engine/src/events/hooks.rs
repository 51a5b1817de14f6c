use std::{future::Future, pin::Pin, sync::Arc};

use tokio::task::JoinHandle;

use crate::events::{EventHandler, EventProducer, Handler, PointsCreditedEvent, PollerReport};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub points_credited_producer: Vec<EventProducer<PointsCreditedEvent>>,
}

impl EventProducers {
    pub async fn publish_points_credited(&self, event: PointsCreditedEvent) {
        for producer in &self.points_credited_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_points_credited: Option<EventHandler<PointsCreditedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: &EventHooks) -> Self {
        let on_points_credited = hooks.on_points_credited.clone().map(|f| EventHandler::new(buffer_size, f));
        Self { on_points_credited }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_points_credited {
            result.points_credited_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns each handler. A handler finishes once every producer subscribed to it has been dropped and its
    /// outstanding jobs are done, so callers can join the returned handles to wait for delivery.
    pub fn start_handlers(self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        if let Some(handler) = self.on_points_credited {
            handles.push(tokio::spawn(async move {
                handler.start_handler().await;
            }));
        }
        handles
    }
}

/// Optional callbacks into the engine's result stream.
///
/// * `on_report` is awaited by the result sink for every [`PollerReport`], in the order the sink receives them.
/// * `on_points_credited` runs on its own event handler whenever an accrual adds points to a balance.
#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_report: Option<Handler<PollerReport>>,
    pub on_points_credited: Option<Handler<PointsCreditedEvent>>,
}

impl EventHooks {
    pub fn on_report<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PollerReport) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_report = Some(Arc::new(f));
        self
    }

    pub fn on_points_credited<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PointsCreditedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_points_credited = Some(Arc::new(f));
        self
    }
}
