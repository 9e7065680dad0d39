//! Process lifecycle: shutdown signal and stop flag

mod shutdown;

pub use shutdown::ShutdownSignal;
