use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard};
use log::{info, trace, warn};

/// Receiver of batch progress and user-facing status messages.
///
/// Implementations must return immediately; the batch runner calls these
/// between images and never waits on the consumer.
pub trait ProgressSink {
    fn reset(&self);
    fn set_maximum(&self, maximum: usize);
    fn set_value(&self, value: usize);

    /// Trailing value sent once the batch loop is over
    fn finish(&self, total: usize) {
        self.set_value(total);
    }

    fn status(&self, _message: &str) {}
}

/// Progress notification as sent over a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Reset,
    Maximum(usize),
    Value(usize),
    Status(String),
}

type Overflow = Arc<Mutex<VecDeque<ProgressEvent>>>;

fn lock(overflow: &Overflow) -> MutexGuard<'_, VecDeque<ProgressEvent>> {
    overflow.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Forwards events into a bounded channel without ever blocking.
///
/// When the channel is full, per-image values are dropped. Reset, maximum,
/// status and the final value are parked in an overflow queue instead and
/// reach the receiver after everything sent before them.
pub struct ChannelProgress {
    sender: SyncSender<ProgressEvent>,
    overflow: Overflow,
}

/// Receiving end of a `ChannelProgress`
pub struct ProgressReceiver {
    receiver: Receiver<ProgressEvent>,
    overflow: Overflow,
}

impl ChannelProgress {
    /// Create a sink and the receiving end of its channel
    pub fn bounded(capacity: usize) -> (Self, ProgressReceiver) {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        let overflow = Overflow::default();
        (
            Self { sender, overflow: Arc::clone(&overflow) },
            ProgressReceiver { receiver, overflow },
        )
    }

    fn send(&self, event: ProgressEvent, keep: bool) {
        let mut overflow = lock(&self.overflow);

        // Parked events go first so the receiver sees them in order
        while let Some(parked) = overflow.pop_front() {
            match self.sender.try_send(parked) {
                Ok(()) => {}
                Err(TrySendError::Full(parked)) => {
                    overflow.push_front(parked);
                    break;
                }
                Err(TrySendError::Disconnected(_)) => {
                    overflow.clear();
                    return;
                }
            }
        }

        if !overflow.is_empty() {
            if keep {
                overflow.push_back(event);
            } else {
                trace!("Progress channel full, dropped {:?}", event);
            }
            return;
        }

        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) if keep => overflow.push_back(event),
            Err(TrySendError::Full(event)) => trace!("Progress channel full, dropped {:?}", event),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl ProgressSink for ChannelProgress {
    fn reset(&self) {
        self.send(ProgressEvent::Reset, true);
    }

    fn set_maximum(&self, maximum: usize) {
        self.send(ProgressEvent::Maximum(maximum), true);
    }

    fn set_value(&self, value: usize) {
        self.send(ProgressEvent::Value(value), false);
    }

    fn finish(&self, total: usize) {
        self.send(ProgressEvent::Value(total), true);
    }

    fn status(&self, message: &str) {
        self.send(ProgressEvent::Status(message.to_string()), true);
    }
}

impl ProgressReceiver {
    /// Next pending event, if any
    pub fn try_recv(&self) -> Option<ProgressEvent> {
        let mut overflow = lock(&self.overflow);
        self.receiver.try_recv().ok().or_else(|| overflow.pop_front())
    }

    /// Drain the events available right now
    pub fn try_iter(&self) -> impl Iterator<Item = ProgressEvent> + '_ {
        std::iter::from_fn(move || self.try_recv())
    }

    /// Wait for the next event. `None` once the sink is gone and everything is drained.
    pub fn recv(&self) -> Option<ProgressEvent> {
        loop {
            {
                let mut overflow = lock(&self.overflow);
                match self.receiver.try_recv() {
                    Ok(event) => return Some(event),
                    Err(TryRecvError::Empty) => {
                        if let Some(event) = overflow.pop_front() {
                            return Some(event);
                        }
                    }
                    Err(TryRecvError::Disconnected) => return overflow.pop_front(),
                }
            }

            // Both queues were empty; anything parked later arrives behind a channel event
            if let Ok(event) = self.receiver.recv() {
                return Some(event);
            }
        }
    }
}

impl Iterator for ProgressReceiver {
    type Item = ProgressEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

/// Writes progress to the log
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn reset(&self) {}

    fn set_maximum(&self, maximum: usize) {
        info!("Processing {} images", maximum);
    }

    fn set_value(&self, value: usize) {
        trace!("Progress: {}", value);
    }

    fn finish(&self, total: usize) {
        info!("Finished {} images", total);
    }

    fn status(&self, message: &str) {
        warn!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_progress_forwards_in_order() {
        let (sink, rx) = ChannelProgress::bounded(8);
        sink.reset();
        sink.set_maximum(2);
        sink.set_value(0);
        sink.status("done");

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                ProgressEvent::Reset,
                ProgressEvent::Maximum(2),
                ProgressEvent::Value(0),
                ProgressEvent::Status("done".to_string()),
            ]
        );
    }

    #[test]
    fn test_channel_progress_never_blocks_when_full() {
        let (sink, rx) = ChannelProgress::bounded(1);
        sink.set_value(0);
        sink.set_value(1);
        sink.set_value(2);

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![ProgressEvent::Value(0)]);
    }

    #[test]
    fn test_channel_progress_keeps_terminal_events_when_full() {
        let (sink, rx) = ChannelProgress::bounded(1);
        sink.reset();
        sink.set_value(0);
        sink.set_value(1);
        sink.finish(2);
        sink.status("done");

        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![
                ProgressEvent::Reset,
                ProgressEvent::Value(2),
                ProgressEvent::Status("done".to_string()),
            ]
        );
    }

    #[test]
    fn test_parked_events_are_flushed_before_newer_ones() {
        let (sink, rx) = ChannelProgress::bounded(1);
        sink.set_maximum(3);
        sink.finish(3);
        assert_eq!(rx.try_recv(), Some(ProgressEvent::Maximum(3)));

        sink.status("exported");

        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![ProgressEvent::Value(3), ProgressEvent::Status("exported".to_string())]
        );
    }

    #[test]
    fn test_receiver_iteration_ends_after_sink_is_dropped() {
        let (sink, rx) = ChannelProgress::bounded(1);
        sink.reset();
        sink.finish(0);
        drop(sink);

        assert_eq!(rx.collect::<Vec<_>>(), vec![ProgressEvent::Reset, ProgressEvent::Value(0)]);
    }

    #[test]
    fn test_channel_progress_survives_dropped_receiver() {
        let (sink, rx) = ChannelProgress::bounded(1);
        drop(rx);
        sink.set_value(3);
        sink.finish(3);
    }
}
