// amsprobe-api: Async AMS/TCP transport and ADS state-read client

pub mod addr;
pub mod client;
pub mod error;
pub mod frame;
pub mod state;
pub mod transport;

pub use addr::{AmsAddress, AmsNetId, PLC_RUNTIME_PORT};
pub use client::AdsClient;
pub use error::Error;
pub use state::{AdsState, DeviceStateResult};
pub use transport::{AMS_TCP_PORT, DEFAULT_SOURCE_PORT, TransportConfig};
