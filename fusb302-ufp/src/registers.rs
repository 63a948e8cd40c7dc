//! FUSB302B register map.
//!
//! Setters/getters/clearers generated using macros, `Default` for each
//! register is its reset value. All accessors are fallible and surface
//! transport failures as [`DriverError`].

use {
    embedded_hal::blocking::i2c::{Write, WriteRead},
    pd_ufp::DriverError,
    proc_bitfield::bitfield,
};

/// Fixed I2C slave address of the FUSB302B
pub const DEVICE_ADDRESS: u8 = 0b010_0010;

macro_rules! generate_register_read {
    ($reg:ident, $fn:ident) => {
        pub fn $fn(&mut self) -> Result<$reg, DriverError> {
            self.read_register_raw(Register::$reg as u8).map($reg)
        }
    };
}

macro_rules! generate_register_write {
    ($reg:ident, $fn:ident) => {
        paste::item! {
            pub fn [<set_ $fn>](&mut self, value: $reg) -> Result<(), DriverError> {
                self.write_register_raw(Register::$reg as u8, value.0)
            }
        }
    };
}

macro_rules! generate_register_clear {
    ($reg:ident, $fn:ident) => {
        paste::item! {
            pub fn [<clear_ $fn>](&mut self) -> Result<(), DriverError> {
                self.write_register_raw(Register::$reg as u8, $reg::default().0)
            }
        }
    };
}

macro_rules! generate_register_accessors {
    () => {};

    (($reg:ident, $fn:ident, r), $($tail:tt)*) => {
        generate_register_read!($reg, $fn);

        generate_register_accessors!($($tail)*);
    };

    (($reg:ident, $fn:ident, rw), $($tail:tt)*) => {
        generate_register_read!($reg, $fn);
        generate_register_write!($reg, $fn);

        generate_register_accessors!($($tail)*);
    };

    (($reg:ident, $fn:ident, wc), $($tail:tt)*) => {
        generate_register_write!($reg, $fn);
        generate_register_clear!($reg, $fn);

        generate_register_accessors!($($tail)*);
    };

    (($reg:ident, $fn:ident, rc), $($tail:tt)*) => {
        generate_register_read!($reg, $fn);
        generate_register_clear!($reg, $fn);

        generate_register_accessors!($($tail)*);
    };

    (($reg:ident, $fn:ident, rwc), $($tail:tt)*) => {
        generate_register_read!($reg, $fn);
        generate_register_write!($reg, $fn);
        generate_register_clear!($reg, $fn);

        generate_register_accessors!($($tail)*);
    };
}

/// Register file behind the I2C transport.
pub struct Registers<I2C> {
    pub(crate) i2c: I2C,
}

impl<I2C: Write + WriteRead> Registers<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Release the underlying bus
    pub fn free(self) -> I2C {
        self.i2c
    }

    fn read_register_raw(&mut self, register: u8) -> Result<u8, DriverError> {
        let mut buffer = [0u8];
        self.i2c
            .write_read(DEVICE_ADDRESS, &[register], &mut buffer)
            .map_err(|_| DriverError::Read)?;
        Ok(buffer[0])
    }

    fn write_register_raw(&mut self, register: u8, value: u8) -> Result<(), DriverError> {
        self.i2c
            .write(DEVICE_ADDRESS, &[register, value])
            .map_err(|_| DriverError::Write)
    }

    /// Read consecutive registers starting at `register`
    pub fn read_burst(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), DriverError> {
        self.i2c
            .write_read(DEVICE_ADDRESS, &[register], buffer)
            .map_err(|_| DriverError::Read)
    }

    /// Pop `buffer.len()` bytes from the receive FIFO
    pub fn read_fifo(&mut self, buffer: &mut [u8]) -> Result<(), DriverError> {
        self.read_burst(Register::Fifos as u8, buffer)
    }

    /// Push up to 40 bytes into the transmit FIFO in one transfer
    pub fn write_fifo(&mut self, data: &[u8]) -> Result<(), DriverError> {
        let mut buffer = [0u8; 41];
        buffer[0] = Register::Fifos as u8;
        buffer[1..=data.len()].copy_from_slice(data);
        self.i2c
            .write(DEVICE_ADDRESS, &buffer[..=data.len()])
            .map_err(|_| DriverError::Write)
    }

    generate_register_accessors!(
        (DeviceId, device_id, r),
        (Switches0, switches0, rw),
        (Switches1, switches1, rw),
        (Measure, measure, rw),
        (Control0, control0, rwc),
        (Control1, control1, rwc),
        (Control2, control2, rw),
        (Control3, control3, rw),
        (Mask1, mask1, rw),
        (Power, power, rw),
        (Reset, reset, wc),
        (MaskA, mask_a, rw),
        (MaskB, mask_b, rw),
        (Status0A, status0a, r),
        (Status1A, status1a, r),
        (InterruptA, interrupta, rc),
        (InterruptB, interruptb, rc),
        (Status0, status0, r),
        (Status1, status1, r),
        (Interrupt, interrupt, rc),
    );
}

pub enum Register {
    DeviceId = 0x01,
    Switches0 = 0x02,
    Switches1 = 0x03,
    Measure = 0x04,
    Control0 = 0x06,
    Control1 = 0x07,
    Control2 = 0x08,
    Control3 = 0x09,
    Mask1 = 0x0A,
    Power = 0x0B,
    Reset = 0x0C,
    MaskA = 0x0E,
    MaskB = 0x0F,
    Status0A = 0x3C,
    Status1A = 0x3D,
    InterruptA = 0x3E,
    InterruptB = 0x3F,
    Status0 = 0x40,
    Status1 = 0x41,
    Interrupt = 0x42,
    Fifos = 0x43,
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct DeviceId(pub u8): Debug, FromRaw, IntoRaw {
        /// Device version ID by Trim or etc
        pub version_id: u8 [read_only] @ 4..=7,
        pub product_id: u8 [read_only] @ 2..=3,
        /// Revision History of each version
        pub revision_id: u8 [read_only] @ 0..=1,
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self(0b1001_0000)
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Switches0(pub u8): Debug, FromRaw, IntoRaw {
        /// Apply host pull up current to CC2 pin
        pub pu_en2: bool @ 7,
        /// Apply host pull up current to CC1 pin
        pub pu_en1: bool @ 6,
        /// Turn on the VCONN current to CC2 pin
        pub vconn_cc2: bool @ 5,
        /// Turn on the VCONN current to CC1 pin
        pub vconn_cc1: bool @ 4,
        /// Use the measure block to monitor or measure the voltage on CC2
        pub meas_cc2: bool @ 3,
        /// Use the measure block to monitor or measure the voltage on CC1
        pub meas_cc1: bool @ 2,
        /// Device pull down on CC2
        pub pdwn2: bool @ 1,
        /// Device pull down on CC1
        pub pdwn1: bool @ 0,
    }
}

impl Default for Switches0 {
    fn default() -> Self {
        Self(0b0000_0011)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Source,
    Sink,
}

impl From<bool> for Role {
    fn from(value: bool) -> Self {
        match value {
            false => Self::Sink,
            true => Self::Source,
        }
    }
}

impl From<Role> for bool {
    fn from(role: Role) -> bool {
        match role {
            Role::Sink => false,
            Role::Source => true,
        }
    }
}

/// Bit used for constructing the GoodCRC acknowledge packet
#[derive(Debug, Clone, Copy)]
pub enum Revision {
    R1_0,
    R2_0,
}

impl From<bool> for Revision {
    fn from(value: bool) -> Self {
        match value {
            false => Self::R1_0,
            true => Self::R2_0,
        }
    }
}

impl From<Revision> for bool {
    fn from(revision: Revision) -> bool {
        match revision {
            Revision::R1_0 => false,
            Revision::R2_0 => true,
        }
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Switches1(pub u8): Debug, FromRaw, IntoRaw {
        /// Bit used for constructing the GoodCRC acknowledge packet. This bit corresponds to the
        /// Port Power Role bit in the message header if an SOP packet is received.
        pub powerrole: bool [set Role, get Role] @ 7,
        /// Bit used for constructing the GoodCRC acknowledge packet. These bits correspond to the
        /// Specification Revision bits in the message header.
        pub specrev: bool [set Revision, get Revision] @ 5,
        /// Bit used for constructing the GoodCRC acknowledge packet. This bit corresponds to the
        /// Port Data Role bit in the message header.
        pub datarole: bool [set Role, get Role] @ 4,
        /// Starts the transmitter automatically when a message with a good CRC is received and
        /// automatically sends a GoodCRC acknowledge packet back to the relevant SOP*
        pub auto_src: bool @ 2,
        /// Enable BMC transmit driver on CC2 pin
        pub txcc2: bool @ 1,
        /// Enable BMC transmit driver on CC1 pin
        pub txcc1: bool @ 0,
    }
}

impl Default for Switches1 {
    fn default() -> Self {
        Self(0b0010_0000)
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Measure(pub u8): Debug, FromRaw, IntoRaw {
        /// false: MDAC/comparator measurement is controlled by MEAS_CC* bits
        /// true: Measure VBUS with the MDAC/comparator. This requires MEAS_CC* bits to be 0
        pub meas_vbus: bool @ 6,
        /// Measure Block DAC data input. LSB is equivalent to 42 mV of voltage which is compared
        /// to the measured CC voltage. The measured CC is selected by MEAS_CC2, or MEAS_CC1 bits.
        pub mdac: u8 @ 0..=5,
    }
}

impl Default for Measure {
    fn default() -> Self {
        Self(0b0011_0001)
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Control0(pub u8): Debug, FromRaw, IntoRaw {
        /// Self clearing bit to flush the content of the transmit FIFO
        pub tx_flush: bool [write_only] @ 6,
        /// Masks all interrupts, when false interrupts to host are enabled
        pub int_mask: bool @ 5,
        /// Controls the host pull up current enabled by PU_EN
        ///
        /// * `00`: No current
        /// * `01`: 80 mA – Default USB power
        /// * `10`: 180 mA – Medium Current Mode: 1.5 A
        /// * `11`: 330 mA – High Current Mode: 3 A
        pub host_cur: u8 @ 2..=3,
        /// Starts the transmitter automatically when a message with a good CRC is received
        pub auto_pre: bool @ 1,
        /// Start transmitter using the data in the transmit FIFO. Self clearing.
        pub tx_start: bool @ 0,
    }
}

impl Default for Control0 {
    fn default() -> Self {
        Self(0b0010_0100)
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Control1(pub u8): Debug, FromRaw, IntoRaw {
        /// Enable SOP''_DEBUG (SOP double prime debug) packets, false for ignore
        pub ensop2db: bool @ 6,
        /// Enable SOP'_DEBUG (SOP prime debug) packets, false for ignore
        pub ensop1db: bool @ 5,
        /// Sent BIST Mode 01s pattern for testing
        pub bist_mode2: bool @ 4,
        /// Self clearing bit to flush the content of the receive FIFO
        pub rx_flush: bool [write_only] @ 2,
        /// Enable SOP'' (SOP double prime) packets, false for ignore
        pub ensop2: bool @ 1,
        /// Enable SOP' (SOP prime) packets, false for ignore
        pub ensop1: bool @ 0,
    }
}

impl Default for Control1 {
    fn default() -> Self {
        Self(0b0000_0000)
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Control2(pub u8): Debug, FromRaw, IntoRaw {
        /// * `00`: Don't go into the DISABLE state after one cycle of toggle
        /// * `01`: Wait between toggle cycles for tDIS time of 40 ms
        /// * `10`: Wait between toggle cycles for tDIS time of 80 ms
        /// * `11`: Wait between toggle cycles for tDIS time of 160 ms
        pub tog_save_pwr: u8 @ 6..=7,
        /// When TOGGLE=1, true restricts the stop condition to Rd values only
        pub tog_rd_only: bool @ 5,
        /// Enable Wake Detection functionality if the power state is correct
        pub wake_en: bool @ 3,
        /// * `11`: Enable SRC polling functionality if TOGGLE=1
        /// * `10`: Enable SNK polling functionality if TOGGLE=1
        /// * `01`: Enable DRP polling functionality if TOGGLE=1
        pub mode: u8 @ 1..=2,
        /// Enable DRP, SNK or SRC Toggle autonomous functionality
        pub toggle: bool @ 0,
    }
}

impl Default for Control2 {
    fn default() -> Self {
        Self(0b0000_0010)
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Control3(pub u8): Debug, FromRaw, IntoRaw {
        /// Send a hard reset packet (highest priority, ignores FIFO content)
        pub send_hard_reset: bool [write_only] @ 6,
        /// Automatically send a hard reset packet after soft reset retries fail
        pub auto_hardreset: bool @ 4,
        /// Automatically send a soft reset packet after retries fail
        pub auto_softreset: bool @ 3,
        /// Number of packet retries following a failed CRC check:
        /// `00` none, `01` one, `10` two, `11` three
        pub n_retries: u8 @ 1..=2,
        /// Enable automatic packet retries when an expected GoodCRC is missing
        pub auto_retry: bool @ 0,
    }
}

impl Default for Control3 {
    fn default() -> Self {
        Self(0b0000_0110)
    }
}

bitfield! {
    /// Interrupt masks for the `Interrupt` register, true masks the source
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Mask1(pub u8): Debug, FromRaw, IntoRaw {
        pub m_vbusok: bool @ 7,
        pub m_activity: bool @ 6,
        pub m_comp_chng: bool @ 5,
        pub m_crc_chk: bool @ 4,
        pub m_alert: bool @ 3,
        pub m_wake: bool @ 2,
        pub m_collision: bool @ 1,
        pub m_bc_lvl: bool @ 0,
    }
}

impl Default for Mask1 {
    fn default() -> Self {
        Self(0b0000_0000)
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Power(pub u8): Debug, FromRaw, IntoRaw {
        /// Enable internal oscillator
        pub internal_oscillator: bool @ 3,
        /// Measure block powered by MEAS_CC* or MEAS_VBUS
        pub measure_block: bool @ 2,
        /// Receiver powered and current references for Measure block
        pub receiver: bool @ 1,
        /// Band gap and wake circuitry
        pub bandgap_wake: bool @ 0,
    }
}

impl Default for Power {
    fn default() -> Self {
        Self(0b0000_0001)
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Reset(pub u8): Debug, FromRaw, IntoRaw {
        /// Reset just the PD logic of the device
        pub pd_reset: bool [write_only] @ 1,
        /// Reset the FUSB302B including the I2C registers to their defaults
        pub sw_reset: bool [write_only] @ 0,
    }
}

impl Default for Reset {
    fn default() -> Self {
        Self(0b0000_0000)
    }
}

bitfield! {
    /// Interrupt masks for the `InterruptA` register, true masks the source
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct MaskA(pub u8): Debug, FromRaw, IntoRaw {
        pub m_ocp_temp: bool @ 7,
        pub m_togdone: bool @ 6,
        pub m_softfail: bool @ 5,
        pub m_retryfail: bool @ 4,
        pub m_hardsent: bool @ 3,
        pub m_txsent: bool @ 2,
        pub m_softrst: bool @ 1,
        pub m_hardrst: bool @ 0,
    }
}

impl Default for MaskA {
    fn default() -> Self {
        Self(0b0000_0000)
    }
}

bitfield! {
    /// Interrupt mask for the `InterruptB` register, true masks the source
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct MaskB(pub u8): Debug, FromRaw, IntoRaw {
        pub m_gcrcsent: bool @ 0,
    }
}

impl Default for MaskB {
    fn default() -> Self {
        Self(0b0000_0000)
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Status0A(pub u8): Debug, FromRaw, IntoRaw {
        /// All soft reset packets with retries have failed
        pub softfail: bool [read_only] @ 5,
        /// All packet retries have failed
        pub retryfail: bool [read_only] @ 4,
        /// A soft reset packet was received
        pub softrst: bool [read_only] @ 1,
        /// A hard reset ordered set was received
        pub hardrst: bool [read_only] @ 0,
    }
}

impl Default for Status0A {
    fn default() -> Self {
        Self(0b0000_0000)
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Status1A(pub u8): Debug, FromRaw, IntoRaw {
        /// State of the toggle logic
        pub togss: u8 [read_only] @ 3..=5,
        /// The last packet placed in the RX FIFO is type SOP''_DEBUG
        pub rxsop2db: bool [read_only] @ 2,
        /// The last packet placed in the RX FIFO is type SOP'_DEBUG
        pub rxsop1db: bool [read_only] @ 1,
        /// The last packet placed in the RX FIFO is type SOP
        pub rxsop: bool [read_only] @ 0,
    }
}

impl Default for Status1A {
    fn default() -> Self {
        Self(0b0000_0000)
    }
}

bitfield! {
    /// Latched events cleared on read
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct InterruptA(pub u8): Debug, FromRaw, IntoRaw {
        pub i_ocp_temp: bool @ 7,
        pub i_togdone: bool @ 6,
        pub i_softfail: bool @ 5,
        pub i_retryfail: bool @ 4,
        pub i_hardsent: bool @ 3,
        pub i_txsent: bool @ 2,
        pub i_softrst: bool @ 1,
        pub i_hardrst: bool @ 0,
    }
}

impl Default for InterruptA {
    fn default() -> Self {
        Self(0b0000_0000)
    }
}

bitfield! {
    /// Latched events cleared on read
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct InterruptB(pub u8): Debug, FromRaw, IntoRaw {
        /// A GoodCRC acknowledge packet was sent
        pub i_gcrcsent: bool @ 0,
    }
}

impl Default for InterruptB {
    fn default() -> Self {
        Self(0b0000_0000)
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Status0(pub u8): Debug, FromRaw, IntoRaw {
        /// VBUS is above the 4.0 V to 4.5 V threshold
        pub vbusok: bool [read_only] @ 7,
        /// Transitions are detected on the active CC line
        pub activity: bool [read_only] @ 6,
        /// Measured CC input is higher than the MDAC reference
        pub comp: bool [read_only] @ 5,
        /// Last received packet had a correct CRC
        pub crc_chk: bool [read_only] @ 4,
        /// Alert software of a TX_FULL or OCP condition
        pub alert: bool [read_only] @ 3,
        /// Voltage on CC indicates a device attempting to attach
        pub wake: bool [read_only] @ 2,
        /// Current voltage band on the measured CC pin:
        /// `00` < 200 mV, `01` > 200 mV & < 660 mV,
        /// `10` > 660 mV & < 1.23 V, `11` > 1.23 V
        pub bc_lvl: u8 [read_only] @ 0..=1,
    }
}

impl Default for Status0 {
    fn default() -> Self {
        Self(0b0000_0000)
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Status1(pub u8): Debug, FromRaw, IntoRaw {
        /// The last packet placed in the RX FIFO is type SOP''
        pub rxsop2: bool [read_only] @ 7,
        /// The last packet placed in the RX FIFO is type SOP'
        pub rxsop1: bool [read_only] @ 6,
        /// The receive FIFO is empty
        pub rx_empty: bool [read_only] @ 5,
        /// The receive FIFO is full
        pub rx_full: bool [read_only] @ 4,
        /// The transmit FIFO is empty
        pub tx_empty: bool [read_only] @ 3,
        /// The transmit FIFO is full
        pub tx_full: bool [read_only] @ 2,
        pub ovrtemp: bool [read_only] @ 1,
        pub ocp: bool [read_only] @ 0,
    }
}

impl Default for Status1 {
    fn default() -> Self {
        Self(0b0010_1000)
    }
}

bitfield! {
    /// Latched events cleared on read
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Interrupt(pub u8): Debug, FromRaw, IntoRaw {
        pub i_vbusok: bool @ 7,
        pub i_activity: bool @ 6,
        pub i_comp_chng: bool @ 5,
        pub i_crc_chk: bool @ 4,
        pub i_alert: bool @ 3,
        pub i_wake: bool @ 2,
        pub i_collision: bool @ 1,
        pub i_bc_lvl: bool @ 0,
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self(0b0000_0000)
    }
}
