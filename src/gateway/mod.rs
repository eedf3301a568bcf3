pub mod server;

pub use server::{GatewayServer, GatewayState};
