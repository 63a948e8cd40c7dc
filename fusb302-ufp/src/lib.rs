//! FUSB302B transceiver driver implementing the [`pd_ufp::sink::Driver`]
//! contract.
//!
//! The chip handles BMC signalling, CRC checking, automatic GoodCRC and
//! packet retries; this driver does attach/orientation detection via the
//! measure block, frames messages into the transmit FIFO and turns the
//! chip's status and interrupt registers into driver events.

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod registers;

use {
    crate::registers::{
        Control1, DeviceId, InterruptA, InterruptB, Mask1, MaskA, MaskB, Measure, Power, Register,
        Registers, Reset, Revision, Status0, Status0A, Status1, Switches0, Switches1,
    },
    byteorder::{ByteOrder, LittleEndian},
    embedded_hal::blocking::{
        delay::DelayMs,
        i2c::{Write, WriteRead},
    },
    heapless::Deque,
    pd_ufp::{
        header::Header,
        sink::{Driver, DriverEvent},
        token::Token,
        CcLevel, CcPin, DriverError, Instant,
    },
};

/// MDAC reference for CC comparisons, 49 * 42 mV = 2.058 V
const MDAC: u8 = 49;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unattached,
    Attached,
}

pub struct Fusb302b<I2C, DELAY> {
    registers: Registers<I2C>,
    delay: DELAY,
    state: State,
    events: Deque<DriverEvent, 4>,
    cc1: CcLevel,
    cc2: CcLevel,
    /// Treat loss of VBUS as a detach; disabled while a PPS contract
    /// moves VBUS outside the 5V window
    vbus_sense: bool,
    /// Accumulated InterruptA flags not yet acted upon
    interrupt_a: u8,
    /// Accumulated InterruptB flags not yet acted upon
    interrupt_b: u8,
}

impl<I2C, DELAY> Fusb302b<I2C, DELAY>
where
    I2C: Write + WriteRead,
    DELAY: DelayMs<u32>,
{
    pub fn new(i2c: I2C, delay: DELAY) -> Self {
        Self {
            registers: Registers::new(i2c),
            delay,
            state: State::Unattached,
            events: Deque::new(),
            cc1: CcLevel::Open,
            cc2: CcLevel::Open,
            vbus_sense: true,
            interrupt_a: 0,
            interrupt_b: 0,
        }
    }

    /// Release the bus and delay provider
    pub fn free(self) -> (I2C, DELAY) {
        (self.registers.free(), self.delay)
    }

    /// Reset only the PD logic, keeping CC configuration intact
    pub fn pd_reset(&mut self) -> Result<(), DriverError> {
        self.registers.set_reset(Reset(0).with_pd_reset(true))
    }

    /// Whether VBUS is above the 4.0 V to 4.5 V valid threshold
    pub fn vbus_level(&mut self) -> Result<bool, DriverError> {
        Ok(self.registers.status0()?.vbusok())
    }

    /// Chip version and revision identification
    pub fn device_id(&mut self) -> Result<DeviceId, DriverError> {
        self.registers.device_id()
    }

    /// Drive or release the device pull-downs on both CC pins
    pub fn set_cc_pulldown(&mut self, enabled: bool) -> Result<(), DriverError> {
        self.registers
            .set_switches0(Switches0(0).with_pdwn1(enabled).with_pdwn2(enabled))
    }

    fn push_event(&mut self, event: DriverEvent) {
        if self.events.push_back(event).is_err() {
            warn!("event queue full, dropping event");
        }
    }

    fn poll_unattached(&mut self) -> Result<(), DriverError> {
        if !self.registers.status0()?.vbusok() {
            return Ok(());
        }

        // partner present, measure block and oscillator on
        self.registers.set_power(
            Power(0)
                .with_bandgap_wake(true)
                .with_receiver(true)
                .with_measure_block(true)
                .with_internal_oscillator(true),
        )?;
        self.delay.delay_ms(1);

        self.cc1 = self.measure_cc(CcPin::CC1)?;
        self.cc2 = self.measure_cc(CcPin::CC2)?;
        debug!("attach, cc1 {} cc2 {}", self.cc1 as u8, self.cc2 as u8);

        // drop anything latched while unattached
        self.registers.interrupta()?;
        self.registers.interruptb()?;
        self.registers.interrupt()?;
        self.interrupt_a = 0;
        self.interrupt_b = 0;

        // auto-GoodCRC on, TX driver only on the single active pin
        let mut switches0 = Switches0(0).with_pdwn1(true).with_pdwn2(true);
        let mut switches1 = Switches1(0)
            .with_specrev(Revision::R2_0)
            .with_auto_src(true);
        match (self.cc1.is_open(), self.cc2.is_open()) {
            (false, true) => {
                switches0.set_meas_cc1(true);
                switches1.set_txcc1(true);
            }
            (true, false) => {
                switches0.set_meas_cc2(true);
                switches1.set_txcc2(true);
            }
            // tied or both open, no usable orientation
            _ => {}
        }
        self.registers.set_switches0(switches0)?;
        self.registers.set_switches1(switches1)?;

        self.state = State::Attached;
        self.push_event(DriverEvent::Attached);
        Ok(())
    }

    /// Measure the termination on one CC pin, requiring BC_LVL to hold
    /// steady across five confirmation reads.
    fn measure_cc(&mut self, pin: CcPin) -> Result<CcLevel, DriverError> {
        let switches0 = Switches0(0).with_pdwn1(true).with_pdwn2(true);
        let switches0 = match pin {
            CcPin::CC1 => switches0.with_meas_cc1(true),
            CcPin::CC2 => switches0.with_meas_cc2(true),
        };
        self.registers.set_switches0(switches0)?;
        self.delay.delay_ms(1);

        let level = self.registers.status0()?.bc_lvl();
        for _ in 0..5 {
            if self.registers.status0()?.bc_lvl() != level {
                return Err(DriverError::Busy);
            }
        }
        Ok(CcLevel::from(level))
    }

    fn poll_attached(&mut self) -> Result<(), DriverError> {
        // Status0A through Interrupt in one burst; reading clears the
        // latched interrupt registers, so accumulate them locally
        let mut status = [0u8; 7];
        self.registers
            .read_burst(Register::Status0A as u8, &mut status)?;
        self.interrupt_a |= status[2];
        self.interrupt_b |= status[3];
        let status0 = Status0(status[4]);
        let status1 = Status1(status[5]);

        if self.vbus_sense && !status0.vbusok() {
            self.teardown()?;
            self.push_event(DriverEvent::Detached);
            return Ok(());
        }

        if Status0A(status[0]).hardrst() {
            debug!("hard reset from partner");
            self.pd_reset()?;
            return Ok(());
        }

        if InterruptA(self.interrupt_a).i_retryfail() {
            self.interrupt_a = InterruptA(self.interrupt_a).with_i_retryfail(false).0;
            warn!("transmit retries exhausted");
        }

        if InterruptB(self.interrupt_b).i_gcrcsent() {
            self.interrupt_b = InterruptB(self.interrupt_b).with_i_gcrcsent(false).0;
            self.push_event(DriverEvent::GoodCrcSent);
        }

        if !status1.rx_empty() {
            self.read_message()?;
        }
        Ok(())
    }

    fn teardown(&mut self) -> Result<(), DriverError> {
        self.state = State::Unattached;
        self.cc1 = CcLevel::Open;
        self.cc2 = CcLevel::Open;
        self.interrupt_a = 0;
        self.interrupt_b = 0;
        self.vbus_sense = true;

        // back to pull-downs only, measure block and oscillator off
        self.registers
            .set_switches0(Switches0(0).with_pdwn1(true).with_pdwn2(true))?;
        self.registers
            .set_switches1(Switches1(0).with_specrev(Revision::R2_0))?;
        self.registers
            .set_power(Power(0).with_bandgap_wake(true).with_receiver(true))?;
        self.pd_reset()
    }

    fn read_message(&mut self) -> Result<(), DriverError> {
        let mut preamble = [0u8; 3];
        if self.registers.read_fifo(&mut preamble).is_err() {
            return self.rx_flush();
        }

        // 0b111x_xxxx tokens mark an SOP packet start
        if preamble[0] & 0xE0 != 0xE0 {
            warn!("unexpected rx token {}, flushing", preamble[0]);
            return self.rx_flush();
        }

        let header = Header::from_bytes(&preamble[1..]);
        let len = usize::from(header.num_objects()) * 4 + 4;

        // data objects plus the trailing CRC32
        let mut payload = [0u8; 32];
        if self.registers.read_fifo(&mut payload[..len]).is_err() {
            return self.rx_flush();
        }

        let mut objects = heapless::Vec::new();
        for chunk in payload[..len - 4].chunks_exact(4) {
            let _ = objects.push(LittleEndian::read_u32(chunk));
        }
        self.push_event(DriverEvent::MessageReceived { header, objects });
        Ok(())
    }

    fn rx_flush(&mut self) -> Result<(), DriverError> {
        self.registers
            .set_control1(Control1(0).with_rx_flush(true))
    }
}

impl<I2C, DELAY> Driver for Fusb302b<I2C, DELAY>
where
    I2C: Write + WriteRead,
    DELAY: DelayMs<u32>,
{
    fn init(&mut self) -> Result<(), DriverError> {
        let id = self.registers.device_id()?;
        if id.0 & 0x80 == 0 {
            return Err(DriverError::UnknownDevice);
        }
        debug!("device version {} revision {}", id.version_id(), id.revision_id());

        self.registers.set_reset(Reset(0).with_sw_reset(true))?;

        self.registers
            .set_switches0(Switches0(0).with_pdwn1(true).with_pdwn2(true))?;
        self.registers
            .set_switches1(Switches1(0).with_specrev(Revision::R2_0))?;
        self.registers.set_measure(Measure(0).with_mdac(MDAC))?;

        let control3 = self.registers.control3()?;
        self.registers
            .set_control3(control3.with_n_retries(3).with_auto_retry(true))?;

        // unmask only the sources the state machine acts upon
        self.registers.set_mask1(
            Mask1(0xFF)
                .with_m_vbusok(false)
                .with_m_activity(false)
                .with_m_collision(false)
                .with_m_alert(false)
                .with_m_crc_chk(false),
        )?;
        self.registers.set_mask_a(
            MaskA(0xFF)
                .with_m_retryfail(false)
                .with_m_hardsent(false)
                .with_m_txsent(false)
                .with_m_hardrst(false),
        )?;
        self.registers
            .set_mask_b(MaskB(0xFF).with_m_gcrcsent(false))?;
        let control0 = self.registers.control0()?;
        self.registers.set_control0(control0.with_int_mask(false))?;

        self.registers.set_power(
            Power(0)
                .with_bandgap_wake(true)
                .with_receiver(true)
                .with_measure_block(true),
        )?;

        self.state = State::Unattached;
        self.events.clear();
        self.cc1 = CcLevel::Open;
        self.cc2 = CcLevel::Open;
        self.vbus_sense = true;
        self.interrupt_a = 0;
        self.interrupt_b = 0;
        Ok(())
    }

    fn poll(&mut self, _now: Instant) -> Result<(), DriverError> {
        match self.state {
            State::Unattached => self.poll_unattached(),
            State::Attached => self.poll_attached(),
        }
    }

    fn get_event(&mut self) -> Option<DriverEvent> {
        self.events.pop_front()
    }

    fn transmit(&mut self, header: Header, objects: &[u32]) -> Result<(), DriverError> {
        let mut buf = [0u8; 40];
        let mut n = 0;

        for _ in 0..3 {
            buf[n] = Token::Sop1 as u8;
            n += 1;
        }
        buf[n] = Token::Sop2 as u8;
        n += 1;
        // packed symbol count: header plus data objects
        buf[n] = Token::PackSym as u8 | (((objects.len() as u8) << 2) + 2);
        n += 1;
        header.to_bytes(&mut buf[n..n + 2]);
        n += 2;
        for &object in objects {
            LittleEndian::write_u32(&mut buf[n..n + 4], object);
            n += 4;
        }
        buf[n] = Token::JamCrc as u8;
        n += 1;
        buf[n] = Token::Eop as u8;
        n += 1;
        buf[n] = Token::TxOff as u8;
        n += 1;
        buf[n] = Token::TxOn as u8;
        n += 1;

        self.registers.write_fifo(&buf[..n])?;
        self.delay.delay_ms(1);
        Ok(())
    }

    fn transmit_hard_reset(&mut self) -> Result<(), DriverError> {
        let control3 = self.registers.control3()?;
        self.registers
            .set_control3(control3.with_send_hard_reset(true))?;
        self.delay.delay_ms(5);
        self.pd_reset()
    }

    fn set_vbus_sense(&mut self, enabled: bool) -> Result<(), DriverError> {
        self.vbus_sense = enabled;
        Ok(())
    }

    fn cc_levels(&self) -> (CcLevel, CcLevel) {
        (self.cc1, self.cc2)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
