// ── Device state ──
//
// Result types for the ADS ReadState service.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{Display, FromRepr};

/// Operational state of an ADS device, as reported by ReadState.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr, Serialize)]
#[repr(u16)]
pub enum AdsState {
    Invalid = 0,
    Idle = 1,
    Reset = 2,
    Init = 3,
    Start = 4,
    Run = 5,
    Stop = 6,
    SaveCfg = 7,
    LoadCfg = 8,
    PowerFailure = 9,
    PowerGood = 10,
    Error = 11,
    Shutdown = 12,
    Suspend = 13,
    Resume = 14,
    Config = 15,
    Reconfig = 16,
    Stopping = 17,
    Incompatible = 18,
    Exception = 19,
}

/// One ReadState answer, stamped with the local time it was received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStateResult {
    pub ads_state: AdsState,
    /// Device-specific state word; opaque to ADS.
    pub device_state: u16,
    pub read_at: DateTime<Utc>,
}
