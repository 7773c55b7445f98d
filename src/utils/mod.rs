pub mod cancellable;
pub mod debounce;

pub use cancellable::{until_cancelled, FetchToken, TaskSlot};
pub use debounce::Debouncer;
