#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod header;
pub mod pdo;
pub mod protocol;
pub mod sink;
pub mod status_log;
pub mod timeout;
pub mod timers;
pub mod token;

pub type Instant = fugit::Instant<u64, 1, 1000>;
pub type Duration = fugit::Duration<u64, 1, 1000>;

/// Errors surfaced by a transceiver driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// Transient, unstable line measurement; retry the poll
    Busy,
    /// Register/FIFO read failed at the transport
    Read,
    /// Register/FIFO write failed at the transport
    Write,
    /// Identification read did not return a recognized device signature
    UnknownDevice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CcPin {
    CC1,
    CC2,
}

/// Measured termination level on one CC pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CcLevel {
    /// Below 200 mV, no pull-up present
    Open,
    /// vRd-USB, default USB current only
    RdUsb,
    /// vRd-1.5
    Rd1A5,
    /// vRd-3.0
    Rd3A0,
}

impl From<u8> for CcLevel {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::Open,
            0b01 => Self::RdUsb,
            0b10 => Self::Rd1A5,
            _ => Self::Rd3A0,
        }
    }
}

impl CcLevel {
    pub fn is_open(self) -> bool {
        self == Self::Open
    }

    /// Whether the source advertises more than default USB current,
    /// i.e. structured PD communication can be expected.
    pub fn is_pd_capable(self) -> bool {
        matches!(self, Self::Rd1A5 | Self::Rd3A0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerRole {
    Source,
    Sink,
}

impl From<bool> for PowerRole {
    fn from(value: bool) -> Self {
        match value {
            false => Self::Sink,
            true => Self::Source,
        }
    }
}

impl From<PowerRole> for bool {
    fn from(role: PowerRole) -> bool {
        match role {
            PowerRole::Sink => false,
            PowerRole::Source => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataRole {
    Ufp,
    Dfp,
}

impl From<bool> for DataRole {
    fn from(value: bool) -> Self {
        match value {
            false => Self::Ufp,
            true => Self::Dfp,
        }
    }
}

impl From<DataRole> for bool {
    fn from(role: DataRole) -> bool {
        match role {
            DataRole::Ufp => false,
            DataRole::Dfp => true,
        }
    }
}
