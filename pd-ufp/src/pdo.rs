//! Power data objects and request data objects.
//!
//! All layouts follow USB PD r3.0, 6.4.1 Capabilities Message and 6.4.2
//! Request Message. Engineering units are the standard's: 50 mV / 10 mA /
//! 250 mW for the ordinary supplies, 100 mV / 50 mA for PPS, and
//! 20 mV / 50 mA inside a PPS request.

use {
    byteorder::{ByteOrder, LittleEndian},
    proc_bitfield::bitfield,
};

/// Source supply category, bits 31..30 of every PDO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SupplyKind {
    Fixed,
    Battery,
    Variable,
    Augmented,
}

impl From<u8> for SupplyKind {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::Fixed,
            0b01 => Self::Battery,
            0b10 => Self::Variable,
            _ => Self::Augmented,
        }
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct FixedSupply(pub u32): Debug, FromRaw, IntoRaw {
        /// Fixed supply
        pub kind: u8 @ 30..=31,
        /// Dual-role power
        pub dual_role_power: bool @ 29,
        /// USB suspend supported
        pub usb_suspend_supported: bool @ 28,
        /// Unconstrained power
        pub unconstrained_power: bool @ 27,
        /// USB communications capable
        pub usb_communications_capable: bool @ 26,
        /// Dual-role data
        pub dual_role_data: bool @ 25,
        /// Unchunked extended messages supported
        pub unchunked_extended_messages_supported: bool @ 24,
        /// Peak current
        pub peak_current: u8 @ 20..=21,
        /// Voltage in 50mV units
        pub voltage: u16 @ 10..=19,
        /// Maximum current in 10mA units
        pub max_current: u16 @ 0..=9,
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Battery(pub u32): Debug, FromRaw, IntoRaw {
        /// Battery
        pub kind: u8 @ 30..=31,
        /// Maximum Voltage in 50mV units
        pub max_voltage: u16 @ 20..=29,
        /// Minimum Voltage in 50mV units
        pub min_voltage: u16 @ 10..=19,
        /// Maximum Allowable Power in 250mW units
        pub max_power: u16 @ 0..=9,
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct VariableSupply(pub u32): Debug, FromRaw, IntoRaw {
        /// Variable supply (non-battery)
        pub kind: u8 @ 30..=31,
        /// Maximum Voltage in 50mV units
        pub max_voltage: u16 @ 20..=29,
        /// Minimum Voltage in 50mV units
        pub min_voltage: u16 @ 10..=19,
        /// Maximum current in 10mA units
        pub max_current: u16 @ 0..=9,
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct ProgrammablePowerSupply(pub u32): Debug, FromRaw, IntoRaw {
        /// Augmented power data object
        pub kind: u8 @ 30..=31,
        /// SPR programmable power supply
        pub supply: u8 @ 28..=29,
        pub pps_power_limited: bool @ 27,
        /// Maximum voltage in 100mV units
        pub max_voltage: u8 @ 17..=24,
        /// Minimum voltage in 100mV units
        pub min_voltage: u8 @ 8..=15,
        /// Maximum current in 50mA units
        pub max_current: u8 @ 0..=6,
    }
}

bitfield! {
    /// Sink Fixed Supply PDO, used when answering Get_Sink_Cap.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct SinkFixedSupply(pub u32): Debug, FromRaw, IntoRaw {
        /// Fixed supply
        pub kind: u8 @ 30..=31,
        /// Higher capability
        pub higher_capability: bool @ 28,
        /// USB communications capable
        pub usb_communications_capable: bool @ 26,
        /// Voltage in 50mV units
        pub voltage: u16 @ 10..=19,
        /// Operational current in 10mA units
        pub operational_current: u16 @ 0..=9,
    }
}

bitfield! {
    /// Request data object for fixed/variable/battery supplies.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct FixedVariableRequestDataObject(pub u32): Debug, FromRaw, IntoRaw {
        /// Valid range 1..=7
        pub object_position: u8 @ 28..=31,
        pub giveback_flag: bool @ 27,
        pub capability_mismatch: bool @ 26,
        pub usb_communications_capable: bool @ 25,
        pub no_usb_suspend: bool @ 24,
        /// Operating current in 10mA units (or power in 250mW units for battery)
        pub operating_current: u16 @ 10..=19,
        /// Maximum operating current in 10mA units (or power in 250mW units)
        pub maximum_operating_current: u16 @ 0..=9,
    }
}

bitfield! {
    /// Request data object for a programmable (PPS) supply.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct PpsRequestDataObject(pub u32): Debug, FromRaw, IntoRaw {
        /// Valid range 1..=7
        pub object_position: u8 @ 28..=31,
        pub capability_mismatch: bool @ 26,
        pub usb_communications_capable: bool @ 25,
        pub no_usb_suspend: bool @ 24,
        /// Output voltage in 20mV units
        pub output_voltage: u16 @ 9..=19,
        /// Operating current in 50mA units
        pub operating_current: u8 @ 0..=6,
    }
}

impl FixedVariableRequestDataObject {
    pub fn to_bytes(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(buf, self.0);
    }
}

impl PpsRequestDataObject {
    pub fn to_bytes(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(buf, self.0);
    }
}

/// Uniform decode of one source capability.
///
/// Voltages in 50 mV units, current in 10 mA units, power in 250 mW
/// units regardless of the underlying PDO flavor (PPS fields are
/// rescaled accordingly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerInfo {
    pub kind: SupplyKind,
    pub min_voltage: u16,
    pub max_voltage: u16,
    pub max_current: u16,
    pub max_power: u16,
}

impl PowerInfo {
    pub fn parse(raw: u32) -> Self {
        let kind = SupplyKind::from((raw >> 30) as u8);
        match kind {
            SupplyKind::Fixed => {
                let pdo = FixedSupply(raw);
                Self {
                    kind,
                    min_voltage: 0,
                    max_voltage: pdo.voltage(),
                    max_current: pdo.max_current(),
                    max_power: 0,
                }
            }
            SupplyKind::Battery => {
                let pdo = Battery(raw);
                Self {
                    kind,
                    min_voltage: pdo.min_voltage(),
                    max_voltage: pdo.max_voltage(),
                    max_current: 0,
                    max_power: pdo.max_power(),
                }
            }
            SupplyKind::Variable => {
                let pdo = VariableSupply(raw);
                Self {
                    kind,
                    min_voltage: pdo.min_voltage(),
                    max_voltage: pdo.max_voltage(),
                    max_current: pdo.max_current(),
                    max_power: 0,
                }
            }
            SupplyKind::Augmented => {
                // 100mV -> 50mV, 50mA -> 10mA
                let pdo = ProgrammablePowerSupply(raw);
                Self {
                    kind,
                    min_voltage: u16::from(pdo.min_voltage()) * 2,
                    max_voltage: u16::from(pdo.max_voltage()) * 2,
                    max_current: u16::from(pdo.max_current()) * 5,
                    max_power: 0,
                }
            }
        }
    }

    pub fn max_voltage_mv(&self) -> u32 {
        u32::from(self.max_voltage) * 50
    }

    pub fn max_current_ma(&self) -> u32 {
        u32::from(self.max_current) * 10
    }
}

/// Power Transmission Flag of a PPS Status Data Block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PtfFlag {
    NotSupported,
    Normal,
    Warning,
    OverTemperature,
}

impl From<u8> for PtfFlag {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::NotSupported,
            0b01 => Self::Normal,
            0b10 => Self::Warning,
            _ => Self::OverTemperature,
        }
    }
}

/// Operating Mode Flag of a PPS Status Data Block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OmfFlag {
    VoltageMode,
    CurrentLimitMode,
}

impl From<bool> for OmfFlag {
    fn from(value: bool) -> Self {
        match value {
            false => Self::VoltageMode,
            true => Self::CurrentLimitMode,
        }
    }
}

/// Decoded PPS Status Data Block.
///
/// Reference: USB PD r3.0, 6.5.10 PPS_Status Message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PpsStatus {
    /// Output voltage in 20mV units, 0xFFFF if not supported
    pub output_voltage: u16,
    /// Output current in 50mA units, 0xFF if not supported
    pub output_current: u8,
    pub ptf: PtfFlag,
    pub omf: OmfFlag,
}

impl PpsStatus {
    pub fn parse(block: &[u8; 4]) -> Self {
        Self {
            output_voltage: u16::from_le_bytes([block[0], block[1]]),
            output_current: block[2],
            ptf: PtfFlag::from((block[3] >> 1) & 0b11),
            omf: OmfFlag::from((block[3] >> 3) & 0b1 != 0),
        }
    }
}
