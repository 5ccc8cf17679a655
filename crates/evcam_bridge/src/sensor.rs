//! Sensor driver boundary.
//!
//! The hardware SDK is an external collaborator; this module pins down the
//! interface the bridge consumes it through. A driver delivers event
//! slices through the [`EventConsumer`] capability it is handed for the
//! duration of [`EventCamera::run`], and polls
//! [`EventConsumer::keep_running`] between slices to decide when to stop.

use crate::error::Result;
use crate::event::RawEvent;

/// Capability a driver invokes to deliver events.
///
/// Delivery is serialized: a driver must never have two `on_events`
/// invocations in flight for the same consumer. Drivers that deliver from
/// multiple threads must funnel through one path.
pub trait EventConsumer {
    /// One slice of events with non-decreasing timestamps.
    fn on_events(&mut self, events: &[RawEvent]);

    /// Polled by the driver between slices; false requests shutdown.
    fn keep_running(&self) -> bool;
}

/// Event camera driver.
pub trait EventCamera: Send {
    /// Device serial number.
    fn serial(&self) -> String;

    /// Sensor resolution (width, height) in pixels.
    fn resolution(&self) -> (u16, u16);

    /// Current value of a named bias.
    fn bias(&self, name: &str) -> Result<i32>;

    /// Set a named bias. Returns the value read back from the device,
    /// which may differ from the requested one.
    fn set_bias(&mut self, name: &str, value: i32) -> Result<i32>;

    /// Deliver slices to `consumer` until it stops asking for more.
    /// In-flight slices always run to completion.
    fn run(&mut self, consumer: &mut dyn EventConsumer) -> Result<()>;

    /// Release the device.
    fn stop(&mut self) -> Result<()>;
}
