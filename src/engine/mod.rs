mod http;

pub use http::{parse_queue, HttpEngine};
