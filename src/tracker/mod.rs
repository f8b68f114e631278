pub mod controller;
pub mod events;
pub mod state;

pub use controller::{Cancelled, SessionTracker};
pub use events::TrackerEvent;
pub use state::TrackerState;
