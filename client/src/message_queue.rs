use std::collections::VecDeque;

use rti_shared::{LogicalTime, RtiMessage};

/// Incoming messages waiting for delivery. Receive-order messages go out
/// first in, first out. Time-stamp-ordered messages wait until the federate
/// is granted their time, and leave in timestamp order, ties broken by
/// arrival.
#[derive(Default)]
pub struct MessageQueue {
    ro: VecDeque<RtiMessage>,
    tso: Vec<(LogicalTime, RtiMessage)>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ro(&mut self, message: RtiMessage) {
        self.ro.push_back(message);
    }

    pub fn pop_ro(&mut self) -> Option<RtiMessage> {
        self.ro.pop_front()
    }

    /// Queues by timestamp. A message without one goes to the RO queue.
    pub fn push_tso(&mut self, message: RtiMessage) {
        let Some(timestamp) = message.timestamp else {
            self.push_ro(message);
            return;
        };
        let index = self.tso.partition_point(|(queued, _)| *queued <= timestamp);
        self.tso.insert(index, (timestamp, message));
    }

    /// Timestamp of the earliest TSO message
    pub fn peek_tso(&self) -> Option<LogicalTime> {
        self.tso.first().map(|(timestamp, _)| *timestamp)
    }

    /// Removes every TSO message stamped at or before `time`, in delivery
    /// order
    pub fn release_tso_up_to(&mut self, time: LogicalTime) -> Vec<RtiMessage> {
        let count = self.tso.partition_point(|(timestamp, _)| *timestamp <= time);
        self.tso.drain(..count).map(|(_, message)| message).collect()
    }

    /// Flush queue request: everything up to `max_time` goes out now,
    /// without waiting for a grant
    pub fn flush_tso(&mut self, max_time: LogicalTime) -> Vec<RtiMessage> {
        self.release_tso_up_to(max_time)
    }

    pub fn ro_len(&self) -> usize {
        self.ro.len()
    }

    pub fn tso_len(&self) -> usize {
        self.tso.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ro.is_empty() && self.tso.is_empty()
    }

    /// Drops every waiting TSO message, as when a restore rewinds time.
    /// Returns how many were dropped.
    pub fn clear_tso(&mut self) -> usize {
        let dropped = self.tso.len();
        self.tso.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rti_shared::{FederateHandle, FederationHandle, MessageBody, ObjectHandle};

    fn stamped(object: u32, timestamp: Option<LogicalTime>) -> RtiMessage {
        RtiMessage::new(
            FederateHandle::new(1),
            FederationHandle::new(1),
            MessageBody::DeleteObject {
                object: ObjectHandle::new(object),
                tag: Vec::new(),
            },
        )
        .with_timestamp(timestamp)
    }

    fn objects(messages: &[RtiMessage]) -> Vec<u32> {
        messages
            .iter()
            .map(|message| match message.body {
                MessageBody::DeleteObject { object, .. } => object.value(),
                _ => 0,
            })
            .collect()
    }

    #[test]
    fn tso_orders_by_time_then_arrival() {
        let mut queue = MessageQueue::new();
        queue.push_tso(stamped(1, Some(3.0)));
        queue.push_tso(stamped(2, Some(1.0)));
        queue.push_tso(stamped(3, Some(3.0)));
        queue.push_tso(stamped(4, Some(2.0)));

        assert_eq!(queue.peek_tso(), Some(1.0));
        let released = queue.release_tso_up_to(3.0);
        assert_eq!(objects(&released), vec![2, 4, 1, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn release_stops_at_the_granted_time() {
        let mut queue = MessageQueue::new();
        queue.push_tso(stamped(1, Some(1.0)));
        queue.push_tso(stamped(2, Some(5.0)));

        assert_eq!(objects(&queue.release_tso_up_to(4.0)), vec![1]);
        assert_eq!(queue.tso_len(), 1);
        assert_eq!(queue.peek_tso(), Some(5.0));
    }

    #[test]
    fn unstamped_message_falls_back_to_ro() {
        let mut queue = MessageQueue::new();
        queue.push_tso(stamped(1, None));

        assert_eq!(queue.tso_len(), 0);
        assert_eq!(queue.ro_len(), 1);
        assert!(queue.pop_ro().is_some());
    }
}
