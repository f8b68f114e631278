pub mod quality;
pub mod session;

pub use quality::SleepQuality;
pub use session::SleepSession;
