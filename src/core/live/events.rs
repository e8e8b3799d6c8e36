//! Typed publish/subscribe for session events.
//!
//! Every subscriber gets its own unbounded channel, so a slow observer
//! never blocks the reactor or the other observers. Subscribers whose
//! receiver was dropped are pruned on the next publish.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::base::SessionEvent;

/// Fan-out of session events to any number of subscribers.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event published from now on, in order.
    pub fn subscribe(&self) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        EventStream { rx }
    }

    pub fn publish(&self, event: SessionEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

/// An ordered stream of session events.
///
/// Ends when the session that produced it is dropped.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl EventStream {
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }
}

impl Stream for EventStream {
    type Item = SessionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_each_subscriber_sees_every_event_in_order() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(SessionEvent::Opened);
        bus.publish(SessionEvent::TextReceived("hi".into()));
        bus.publish(SessionEvent::TurnComplete);

        for stream in [&mut a, &mut b] {
            assert_eq!(stream.recv().await, Some(SessionEvent::Opened));
            assert_eq!(
                stream.recv().await,
                Some(SessionEvent::TextReceived("hi".into()))
            );
            assert_eq!(stream.next().await, Some(SessionEvent::TurnComplete));
        }
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let bus = EventBus::new();
        bus.publish(SessionEvent::Opened);
        let mut stream = bus.subscribe();
        assert_eq!(stream.try_recv(), None);
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let keep = bus.subscribe();
        let gone = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(gone);
        bus.publish(SessionEvent::TurnComplete);
        assert_eq!(bus.subscriber_count(), 1);
        drop(keep);
    }

    #[tokio::test]
    async fn test_stream_ends_with_bus() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe();
        drop(bus);
        assert_eq!(stream.recv().await, None);
    }
}
