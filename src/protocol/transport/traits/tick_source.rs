//! Millisecond tick abstraction bounding the transmit wait loop.

/// Monotonic millisecond counter. Wrapping is expected and handled by callers.
pub trait TickSource {
    fn now_ms(&mut self) -> u32;
}

impl<F: FnMut() -> u32> TickSource for F {
    fn now_ms(&mut self) -> u32 {
        self()
    }
}

#[cfg(feature = "embassy-time")]
#[derive(Clone, Copy, Debug, Default)]
/// Tick source backed by the embassy time driver.
pub struct EmbassyTicks;

#[cfg(feature = "embassy-time")]
impl TickSource for EmbassyTicks {
    fn now_ms(&mut self) -> u32 {
        embassy_time::Instant::now().as_millis() as u32
    }
}
