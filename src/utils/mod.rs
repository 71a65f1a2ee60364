pub mod progress;

pub use progress::{estimate_eta, format_bytes, format_duration, format_speed};
