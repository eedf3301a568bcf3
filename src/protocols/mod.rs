pub mod http;

pub use http::ForwardingEngine;
