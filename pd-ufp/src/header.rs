//! PD message header and message-type vocabulary.
//!
//! Reference: USB PD r3.0, 6.2.1.1 Message Header and 6.2.1.2 Extended
//! Message Header.

use {
    crate::{DataRole, PowerRole},
    byteorder::{ByteOrder, LittleEndian},
    proc_bitfield::bitfield,
};

/// Specification Revision field value sent in every header (revision 3.0)
pub const SPEC_REVISION: u8 = 0b10;

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Header(pub u16): Debug, FromRaw, IntoRaw {
        pub extended: bool @ 15,
        pub num_objects: u8 @ 12..=14,
        pub message_id: u8 @ 9..=11,
        pub port_power_role: bool [get PowerRole] @ 8,
        pub spec_revision: u8 @ 6..=7,
        pub port_data_role: bool [get DataRole] @ 5,
        pub message_type_raw: u8 @ 0..=4,
    }
}

impl Header {
    pub fn from_bytes(buf: &[u8]) -> Self {
        Header(LittleEndian::read_u16(buf))
    }

    pub fn to_bytes(self, buf: &mut [u8]) {
        LittleEndian::write_u16(buf, self.0);
    }

    pub fn message_type(&self) -> MessageType {
        if self.extended() {
            MessageType::Extended(self.message_type_raw().into())
        } else if self.num_objects() == 0 {
            MessageType::Control(self.message_type_raw().into())
        } else {
            MessageType::Data(self.message_type_raw().into())
        }
    }
}

bitfield! {
    /// First 16 bits of the first data object of an extended message.
    ///
    /// Single-chunk support only: chunk number and request chunk stay zero.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct ExtendedHeader(pub u16): Debug, FromRaw, IntoRaw {
        pub chunked: bool @ 15,
        pub chunk_number: u8 @ 11..=14,
        pub request_chunk: bool @ 10,
        pub data_size: u16 @ 0..=8,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Control(ControlMessageType),
    Data(DataMessageType),
    Extended(ExtendedMessageType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessageType {
    GoodCRC = 0b0_0001,
    GotoMin = 0b0_0010,
    Accept = 0b0_0011,
    Reject = 0b0_0100,
    Ping = 0b0_0101,
    PsRdy = 0b0_0110,
    GetSourceCap = 0b0_0111,
    GetSinkCap = 0b0_1000,
    DrSwap = 0b0_1001,
    PrSwap = 0b0_1010,
    VconnSwap = 0b0_1011,
    Wait = 0b0_1100,
    SoftReset = 0b0_1101,
    DataReset = 0b0_1110,
    DataResetComplete = 0b0_1111,
    NotSupported = 0b1_0000,
    GetSourceCapExtended = 0b1_0001,
    GetStatus = 0b1_0010,
    FrSwap = 0b1_0011,
    GetPpsStatus = 0b1_0100,
    GetCountryCodes = 0b1_0101,
    GetSinkCapExtended = 0b1_0110,
    Reserved,
}

impl From<u8> for ControlMessageType {
    fn from(value: u8) -> Self {
        match value {
            0b0_0001 => Self::GoodCRC,
            0b0_0010 => Self::GotoMin,
            0b0_0011 => Self::Accept,
            0b0_0100 => Self::Reject,
            0b0_0101 => Self::Ping,
            0b0_0110 => Self::PsRdy,
            0b0_0111 => Self::GetSourceCap,
            0b0_1000 => Self::GetSinkCap,
            0b0_1001 => Self::DrSwap,
            0b0_1010 => Self::PrSwap,
            0b0_1011 => Self::VconnSwap,
            0b0_1100 => Self::Wait,
            0b0_1101 => Self::SoftReset,
            0b0_1110 => Self::DataReset,
            0b0_1111 => Self::DataResetComplete,
            0b1_0000 => Self::NotSupported,
            0b1_0001 => Self::GetSourceCapExtended,
            0b1_0010 => Self::GetStatus,
            0b1_0011 => Self::FrSwap,
            0b1_0100 => Self::GetPpsStatus,
            0b1_0101 => Self::GetCountryCodes,
            0b1_0110 => Self::GetSinkCapExtended,
            _ => Self::Reserved,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMessageType {
    SourceCapabilities = 0b0_0001,
    Request = 0b0_0010,
    Bist = 0b0_0011,
    SinkCapabilities = 0b0_0100,
    BatteryStatus = 0b0_0101,
    Alert = 0b0_0110,
    GetCountryInfo = 0b0_0111,
    EnterUsb = 0b0_1000,
    VendorDefined = 0b0_1111,
    Reserved,
}

impl From<u8> for DataMessageType {
    fn from(value: u8) -> Self {
        match value {
            0b0_0001 => Self::SourceCapabilities,
            0b0_0010 => Self::Request,
            0b0_0011 => Self::Bist,
            0b0_0100 => Self::SinkCapabilities,
            0b0_0101 => Self::BatteryStatus,
            0b0_0110 => Self::Alert,
            0b0_0111 => Self::GetCountryInfo,
            0b0_1000 => Self::EnterUsb,
            0b0_1111 => Self::VendorDefined,
            _ => Self::Reserved,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedMessageType {
    SourceCapExtended = 0b0_0001,
    Status = 0b0_0010,
    GetBatteryCap = 0b0_0011,
    GetBatteryStatus = 0b0_0100,
    BatteryCap = 0b0_0101,
    GetManufacturerInfo = 0b0_0110,
    ManufacturerInfo = 0b0_0111,
    SecurityRequest = 0b0_1000,
    SecurityResponse = 0b0_1001,
    FirmwareUpdateRequest = 0b0_1010,
    FirmwareUpdateResponse = 0b0_1011,
    PpsStatus = 0b0_1100,
    CountryInfo = 0b0_1101,
    CountryCodes = 0b0_1110,
    SinkCapExtended = 0b0_1111,
    Reserved,
}

impl From<u8> for ExtendedMessageType {
    fn from(value: u8) -> Self {
        match value {
            0b0_0001 => Self::SourceCapExtended,
            0b0_0010 => Self::Status,
            0b0_0011 => Self::GetBatteryCap,
            0b0_0100 => Self::GetBatteryStatus,
            0b0_0101 => Self::BatteryCap,
            0b0_0110 => Self::GetManufacturerInfo,
            0b0_0111 => Self::ManufacturerInfo,
            0b0_1000 => Self::SecurityRequest,
            0b0_1001 => Self::SecurityResponse,
            0b0_1010 => Self::FirmwareUpdateRequest,
            0b0_1011 => Self::FirmwareUpdateResponse,
            0b0_1100 => Self::PpsStatus,
            0b0_1101 => Self::CountryInfo,
            0b0_1110 => Self::CountryCodes,
            0b0_1111 => Self::SinkCapExtended,
            _ => Self::Reserved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        for ty in 0..=0b1_1111u8 {
            for id in 0..=7u8 {
                for num in 0..=7u8 {
                    let header = Header(0)
                        .with_message_type_raw(ty)
                        .with_spec_revision(SPEC_REVISION)
                        .with_message_id(id)
                        .with_num_objects(num);

                    let mut buf = [0u8; 2];
                    header.to_bytes(&mut buf);
                    let parsed = Header::from_bytes(&buf);

                    assert_eq!(parsed.message_type_raw(), ty);
                    assert_eq!(parsed.spec_revision(), SPEC_REVISION);
                    assert_eq!(parsed.message_id(), id);
                    assert_eq!(parsed.num_objects(), num);
                    assert!(!parsed.extended());
                }
            }
        }
    }

    #[test]
    fn extended_header_packing() {
        let ext = ExtendedHeader(0).with_chunked(true).with_data_size(21);
        assert_eq!(ext.0, 0x8015);

        let parsed = ExtendedHeader(ext.0);
        assert!(parsed.chunked());
        assert_eq!(parsed.chunk_number(), 0);
        assert!(!parsed.request_chunk());
        assert_eq!(parsed.data_size(), 21);
    }

    #[test]
    fn message_type_dispatches_on_shape() {
        let ctrl = Header(0).with_message_type_raw(0b0_0011);
        assert_eq!(
            ctrl.message_type(),
            MessageType::Control(ControlMessageType::Accept)
        );

        let data = Header(0).with_message_type_raw(0b0_0001).with_num_objects(3);
        assert_eq!(
            data.message_type(),
            MessageType::Data(DataMessageType::SourceCapabilities)
        );

        let ext = Header(0)
            .with_message_type_raw(0b0_1100)
            .with_num_objects(2)
            .with_extended(true);
        assert_eq!(
            ext.message_type(),
            MessageType::Extended(ExtendedMessageType::PpsStatus)
        );
    }
}
