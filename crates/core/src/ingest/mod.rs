pub mod fitbit;
pub mod source;
pub mod types;
