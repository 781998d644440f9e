//! Acknowledgment delivery policy for the driver.
//!
//! The coordinator asks for each acknowledgment to be delivered after a fixed
//! delay. A delivery policy decides what actually happens: production uses
//! the requested delay unchanged, the simulation harness can stretch delays
//! or drop acknowledgments to exercise the timeout path.

use std::time::Duration;

use tokenring_core::Message;

/// Decides when (and whether) a scheduled acknowledgment reaches the holder.
pub trait AckDelivery: Send + Sync + 'static {
    /// Delay before `ack` is delivered, or `None` to drop it.
    ///
    /// `requested` is the delay the coordinator asked for.
    fn delay(&self, ack: &Message, requested: Duration) -> Option<Duration>;
}

impl<T: AckDelivery + ?Sized> AckDelivery for Box<T> {
    fn delay(&self, ack: &Message, requested: Duration) -> Option<Duration> {
        (**self).delay(ack, requested)
    }
}

/// Deliver every acknowledgment after the requested delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OnTime;

impl AckDelivery for OnTime {
    fn delay(&self, _ack: &Message, requested: Duration) -> Option<Duration> {
        Some(requested)
    }
}

/// Deliver every acknowledgment after a fixed delay, ignoring the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay(pub Duration);

impl AckDelivery for FixedDelay {
    fn delay(&self, _ack: &Message, _requested: Duration) -> Option<Duration> {
        Some(self.0)
    }
}

#[cfg(test)]
mod tests {
    use tokenring_core::NodeId;

    use super::*;

    #[test]
    fn on_time_keeps_requested_delay() {
        let ack = Message::acknowledgment(NodeId(1), NodeId(0), 0);
        assert_eq!(OnTime.delay(&ack, Duration::from_millis(250)), Some(Duration::from_millis(250)));
    }

    #[test]
    fn fixed_delay_overrides_request() {
        let ack = Message::acknowledgment(NodeId(1), NodeId(0), 0);
        let policy = FixedDelay(Duration::from_secs(9));
        assert_eq!(policy.delay(&ack, Duration::ZERO), Some(Duration::from_secs(9)));
    }

    #[test]
    fn boxed_policy_delegates() {
        let ack = Message::acknowledgment(NodeId(2), NodeId(0), 3);
        let policy: Box<dyn AckDelivery> = Box::new(FixedDelay(Duration::from_millis(5)));
        assert_eq!(policy.delay(&ack, Duration::ZERO), Some(Duration::from_millis(5)));
    }
}
