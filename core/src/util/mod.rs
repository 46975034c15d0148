mod panic;
mod ring_bytes;
pub use panic::panic_message;
pub use ring_bytes::RingBytes;
