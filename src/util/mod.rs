pub mod observer;

pub use observer::{PartialObserver, Unsubscribe};
