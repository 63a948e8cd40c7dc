//! Sink-side policy engine.
//!
//! [`Sink`] owns a transceiver [`Driver`] and a [`Protocol`] instance
//! and runs the negotiation: wait for Source_Capabilities after attach,
//! request the PDO matching the configured target, track PS_RDY, and
//! keep a PPS contract alive by re-requesting within the source's
//! timeout window.
//!
//! The caller supplies a monotonic millisecond clock and calls
//! [`Sink::poll`] from its main loop, passing `alert = true` when the
//! transceiver's interrupt line is asserted.

use {
    crate::{
        header::Header,
        pdo::{PowerInfo, PpsStatus, SupplyKind},
        protocol::{Events, Frame, PowerOption, Protocol, MAX_OBJECTS},
        status_log::{LogKind, StatusLog},
        timeout::Timeout,
        timers, CcLevel, DriverError, Instant,
    },
    heapless::Vec,
};

/// Abstraction over a PD PHY/transceiver.
///
/// A driver owns the link-level machinery (CC measurement, GoodCRC,
/// retries, FIFO framing) and surfaces what the policy engine needs as
/// [`DriverEvent`]s.
pub trait Driver {
    /// Probe and configure the transceiver
    fn init(&mut self) -> Result<(), DriverError>;

    /// Service the hardware, queueing any events that occurred
    fn poll(&mut self, now: Instant) -> Result<(), DriverError>;

    /// Take the next pending event
    fn get_event(&mut self) -> Option<DriverEvent>;

    /// Send one message
    fn transmit(&mut self, header: Header, objects: &[u32]) -> Result<(), DriverError>;

    /// Send a hard reset ordered set
    fn transmit_hard_reset(&mut self) -> Result<(), DriverError>;

    /// Enable or disable treating VBUS undervoltage as a detach
    fn set_vbus_sense(&mut self, enabled: bool) -> Result<(), DriverError>;

    /// Termination levels measured on (CC1, CC2) at attach
    fn cc_levels(&self) -> (CcLevel, CcLevel);

    /// Blocking delay
    fn delay_ms(&mut self, ms: u32);
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverEvent {
    /// A source was connected and CC measurement finished
    Attached,
    /// The source went away
    Detached,
    /// A GoodCRC for a received message went out; replies may be sent now
    GoodCrcSent,
    /// A complete message was received
    MessageReceived {
        header: Header,
        objects: Vec<u32, MAX_OBJECTS>,
    },
}

/// What the negotiated supply currently provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerStatus {
    /// Nothing attached, or negotiation still in flight
    NotAvailable,
    /// A fixed/variable contract, or plain Type-C 5V
    Typical,
    /// A programmable contract at the requested setpoint
    Pps,
}

pub struct Sink<DRIVER, LOG = ()> {
    driver: DRIVER,
    protocol: Protocol,
    log: LOG,

    status: PowerStatus,
    /// Negotiated supply voltage in mV
    ready_voltage: u16,
    /// Negotiated supply current in mA
    ready_current: u16,

    /// Second-stage PPS setpoint for below-5V startup, 0 when unused
    pps_voltage_next: u16,
    pps_current_next: u16,

    poll_timeout: Timeout,
    wait_source_cap: Timeout,
    wait_ps_ready: Timeout,
    pps_keep_alive: Timeout,
    source_cap_retries: u8,
    send_request: bool,
}

impl<DRIVER: Driver> Sink<DRIVER, ()> {
    pub fn new(driver: DRIVER) -> Self {
        Self::new_with_log(driver, ())
    }
}

impl<DRIVER: Driver, LOG: StatusLog> Sink<DRIVER, LOG> {
    pub fn new_with_log(driver: DRIVER, log: LOG) -> Self {
        Self {
            driver,
            protocol: Protocol::new(),
            log,
            status: PowerStatus::NotAvailable,
            ready_voltage: 0,
            ready_current: 0,
            pps_voltage_next: 0,
            pps_current_next: 0,
            poll_timeout: Timeout::new(),
            wait_source_cap: Timeout::new(),
            wait_ps_ready: Timeout::new(),
            pps_keep_alive: Timeout::new(),
            source_cap_retries: 0,
            send_request: false,
        }
    }

    /// Initialize for fixed/variable negotiation under a power option.
    pub fn init(&mut self, now: Instant, option: PowerOption) -> Result<(), DriverError> {
        self.init_pps(now, 0, 0, option)
    }

    /// Initialize with a PPS setpoint, falling back to `option` when the
    /// source offers no matching programmable PDO.
    ///
    /// Setpoints below 5 V start at 5 V and step down after the first
    /// PS_RDY, since VBUS must pass through vSafe5V at attach.
    pub fn init_pps(
        &mut self,
        now: Instant,
        voltage_mv: u16,
        current_ma: u16,
        option: PowerOption,
    ) -> Result<(), DriverError> {
        self.driver.init()?;

        let mut voltage = voltage_mv;
        if voltage > 0 && voltage < 5000 {
            self.pps_voltage_next = voltage;
            self.pps_current_next = current_ma;
            voltage = 5000;
        }
        self.protocol.set_power_option(option);
        self.protocol.set_pps(voltage, current_ma, false);

        self.log.log(now, LogKind::DeviceReady, None);
        Ok(())
    }

    /// Run the engine. `alert` forces a hardware service pass outside
    /// the regular poll cadence.
    pub fn poll(&mut self, now: Instant, alert: bool) -> Result<(), DriverError> {
        let due = self.timer(now)?;
        if !due && !alert {
            return Ok(());
        }

        let mut result = self.driver.poll(now);
        for _ in 0..2 {
            if result.is_ok() {
                break;
            }
            warn!("transceiver poll failed, retrying");
            result = self.driver.poll(now);
        }
        result?;

        while let Some(event) = self.driver.get_event() {
            self.handle_driver_event(now, event)?;
        }
        Ok(())
    }

    pub fn status(&self) -> PowerStatus {
        self.status
    }

    /// Negotiated supply voltage in mV, 0 before PS_RDY
    pub fn voltage_mv(&self) -> u16 {
        self.ready_voltage
    }

    /// Negotiated supply current limit in mA, 0 before PS_RDY
    pub fn current_ma(&self) -> u16 {
        self.ready_current
    }

    /// Negotiated power budget in mW
    pub fn power_mw(&self) -> u32 {
        u32::from(self.ready_voltage) * u32::from(self.ready_current) / 1000
    }

    /// Whether a request is in flight or queued
    pub fn is_transitioning(&self) -> bool {
        self.send_request || self.wait_ps_ready.is_armed()
    }

    /// Move an established PPS contract to a new setpoint. Rejected
    /// without effect when no PPS contract is active or no advertised
    /// programmable PDO covers the setpoint.
    pub fn set_pps(&mut self, voltage_mv: u16, current_ma: u16) -> bool {
        if self.status == PowerStatus::Pps && self.protocol.set_pps(voltage_mv, current_ma, true) {
            self.send_request = true;
            return true;
        }
        false
    }

    /// Change the power option; triggers renegotiation when source
    /// capabilities are already known.
    pub fn set_power_option(&mut self, option: PowerOption) -> bool {
        if self.protocol.set_power_option(option) {
            self.send_request = true;
            return true;
        }
        false
    }

    /// Request a specific source PDO by index.
    pub fn select_power(&mut self, index: u8) -> bool {
        if self.protocol.select_power(index) {
            self.send_request = true;
            return true;
        }
        false
    }

    pub fn selected_power(&self) -> u8 {
        self.protocol.selected_power()
    }

    pub fn power_info(&self, index: u8) -> Option<PowerInfo> {
        self.protocol.power_info(index)
    }

    pub fn source_capability_count(&self) -> usize {
        self.protocol.source_capability_count()
    }

    pub fn pps_status(&self) -> PpsStatus {
        self.protocol.pps_status()
    }

    /// Query the source for a PPS status block; the decoded reply shows
    /// up in [`Self::pps_status`] once the PPS_Status message arrives.
    pub fn request_pps_status(&mut self, now: Instant) -> Result<bool, DriverError> {
        if self.status != PowerStatus::Pps {
            return Ok(false);
        }
        let frame = self.protocol.create_get_pps_status();
        self.transmit_frame(now, &frame)?;
        Ok(true)
    }

    pub fn logger(&mut self) -> &mut LOG {
        &mut self.log
    }

    fn handle_driver_event(&mut self, now: Instant, event: DriverEvent) -> Result<(), DriverError> {
        match event {
            DriverEvent::Detached => {
                self.protocol.reset();
                self.wait_source_cap.cancel();
                self.wait_ps_ready.cancel();
                self.pps_keep_alive.cancel();
                self.send_request = false;
                self.status = PowerStatus::NotAvailable;
                self.ready_voltage = 0;
                self.ready_current = 0;
                self.log.log(now, LogKind::Detach, None);
            }
            DriverEvent::Attached => {
                self.protocol.reset();
                let (cc1, cc2) = self.driver.cc_levels();
                // exactly one pulled-up pin identifies the orientation;
                // both open or both pulled up means no usable partner
                let cc = match (cc1.is_open(), cc2.is_open()) {
                    (false, true) => cc1,
                    (true, false) => cc2,
                    _ => CcLevel::Open,
                };
                if cc.is_pd_capable() {
                    self.source_cap_retries = 0;
                    self.wait_source_cap.start(now, timers::tTypeCSinkWaitCap);
                } else {
                    // non-PD source, settle for Type-C default power
                    self.set_default_power(now);
                }
                self.log.log(now, LogKind::Attach, None);
            }
            DriverEvent::MessageReceived { header, objects } => {
                self.log.log(now, LogKind::RxMessage, Some((header, &objects)));
                let events = self.protocol.handle_message(header, &objects);
                if events.any() {
                    self.handle_protocol_event(now, events)?;
                }
            }
            DriverEvent::GoodCrcSent => {
                // let the source's receiver turn around before replying
                self.driver.delay_ms(2);
                if let Some(frame) = self.protocol.respond() {
                    self.transmit_frame(now, &frame)?;
                }
            }
        }
        Ok(())
    }

    fn handle_protocol_event(&mut self, now: Instant, events: Events) -> Result<(), DriverError> {
        if events.source_capabilities {
            self.wait_source_cap.cancel();
            self.source_cap_retries = 0;
            // the Request goes out after our GoodCRC; watch for PS_RDY
            self.wait_ps_ready.start(now, timers::tRequestToPSReady);
            self.log.log(now, LogKind::SourceCapabilities, None);
        }
        if events.reject && self.wait_ps_ready.is_armed() {
            self.wait_ps_ready.cancel();
            self.log.log(now, LogKind::PowerReject, None);
            self.set_default_power(now);
        }
        if events.ps_ready {
            self.wait_ps_ready.cancel();
            let selected = self.protocol.selected_power();
            match self.protocol.power_info(selected) {
                Some(info) if info.kind == SupplyKind::Augmented => {
                    // VBUS leaves the 5V window under PPS
                    self.driver.set_vbus_sense(false)?;
                    if self.pps_voltage_next > 0 {
                        let voltage = self.pps_voltage_next;
                        let current = self.pps_current_next;
                        self.pps_voltage_next = 0;
                        self.pps_current_next = 0;
                        self.protocol.set_pps(voltage, current, false);
                        self.send_request = true;
                        self.log.log(now, LogKind::PpsStartup, None);
                    } else {
                        self.pps_keep_alive.start(now, timers::tPPSRequest);
                        self.power_ready(
                            now,
                            PowerStatus::Pps,
                            self.protocol.pps_voltage_mv(),
                            self.protocol.pps_current_ma(),
                        );
                    }
                }
                Some(info) => {
                    self.driver.set_vbus_sense(true)?;
                    self.power_ready(
                        now,
                        PowerStatus::Typical,
                        info.max_voltage_mv() as u16,
                        info.max_current_ma() as u16,
                    );
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Service policy deadlines; returns whether the regular hardware
    /// poll is due.
    fn timer(&mut self, now: Instant) -> Result<bool, DriverError> {
        if self.wait_source_cap.is_expired(now) {
            if self.source_cap_retries < 3 {
                self.source_cap_retries += 1;
                let frame = self.protocol.create_get_source_cap();
                self.transmit_frame(now, &frame)?;
            } else {
                // a silent partner gets a hard reset and a fresh start
                self.source_cap_retries = 0;
                self.protocol.reset();
                self.driver.transmit_hard_reset()?;
            }
            self.wait_source_cap.start(now, timers::tTypeCSinkWaitCap);
        } else if self.wait_ps_ready.is_expired(now) {
            // source never confirmed our Request
            self.set_default_power(now);
        } else if !self.wait_ps_ready.is_armed()
            && (self.send_request
                || (self.status == PowerStatus::Pps && self.pps_keep_alive.is_expired(now)))
        {
            self.send_request = false;
            self.pps_keep_alive.start(now, timers::tPPSRequest);
            let frame = self.protocol.create_request();
            self.wait_ps_ready.start(now, timers::tRequestToPSReady);
            self.transmit_frame(now, &frame)?;
        }

        if !self.poll_timeout.is_armed() || self.poll_timeout.is_expired(now) {
            self.poll_timeout.start(now, timers::tPDPolling);
            return Ok(true);
        }
        Ok(false)
    }

    fn set_default_power(&mut self, now: Instant) {
        self.power_ready(now, PowerStatus::Typical, 5000, 1000);
    }

    fn power_ready(&mut self, now: Instant, status: PowerStatus, voltage_mv: u16, current_ma: u16) {
        self.status = status;
        self.ready_voltage = voltage_mv;
        self.ready_current = current_ma;
        self.log.log(now, LogKind::PowerReady, None);
    }

    fn transmit_frame(&mut self, now: Instant, frame: &Frame) -> Result<(), DriverError> {
        self.log
            .log(now, LogKind::TxMessage, Some((frame.header, &frame.objects)));
        self.driver.transmit(frame.header, &frame.objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        header::{ControlMessageType, DataMessageType, MessageType, SPEC_REVISION},
        pdo::PpsRequestDataObject,
    };
    use fugit::ExtU64;
    use std::collections::VecDeque;

    struct MockDriver {
        events: VecDeque<DriverEvent>,
        sent: std::vec::Vec<(Header, std::vec::Vec<u32>)>,
        hard_resets: usize,
        vbus_sense: Option<bool>,
        cc: (CcLevel, CcLevel),
        failures: usize,
    }

    impl MockDriver {
        fn new() -> Self {
            Self {
                events: VecDeque::new(),
                sent: std::vec::Vec::new(),
                hard_resets: 0,
                vbus_sense: None,
                cc: (CcLevel::Open, CcLevel::Open),
                failures: 0,
            }
        }
    }

    impl Driver for MockDriver {
        fn init(&mut self) -> Result<(), DriverError> {
            Ok(())
        }

        fn poll(&mut self, _now: Instant) -> Result<(), DriverError> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(DriverError::Busy);
            }
            Ok(())
        }

        fn get_event(&mut self) -> Option<DriverEvent> {
            self.events.pop_front()
        }

        fn transmit(&mut self, header: Header, objects: &[u32]) -> Result<(), DriverError> {
            self.sent.push((header, objects.to_vec()));
            Ok(())
        }

        fn transmit_hard_reset(&mut self) -> Result<(), DriverError> {
            self.hard_resets += 1;
            Ok(())
        }

        fn set_vbus_sense(&mut self, enabled: bool) -> Result<(), DriverError> {
            self.vbus_sense = Some(enabled);
            Ok(())
        }

        fn cc_levels(&self) -> (CcLevel, CcLevel) {
            self.cc
        }

        fn delay_ms(&mut self, _ms: u32) {}
    }

    fn t0() -> Instant {
        Instant::from_ticks(0)
    }

    fn ctrl(ty: ControlMessageType) -> DriverEvent {
        DriverEvent::MessageReceived {
            header: Header(0)
                .with_message_type_raw(ty as u8)
                .with_spec_revision(SPEC_REVISION),
            objects: Vec::new(),
        }
    }

    /// Fixed 5V/3A, Variable 9V/2A, PPS 3.3-11V/3A
    const CAPS: [u32; 3] = [
        (100 << 10) | 300,
        (2 << 30) | (180 << 20) | (180 << 10) | 200,
        (3 << 30) | (110 << 17) | (33 << 8) | 60,
    ];

    fn source_capabilities() -> DriverEvent {
        let mut objects = Vec::new();
        for &cap in &CAPS {
            objects.push(cap).unwrap();
        }
        DriverEvent::MessageReceived {
            header: Header(0)
                .with_message_type_raw(DataMessageType::SourceCapabilities as u8)
                .with_spec_revision(SPEC_REVISION)
                .with_num_objects(3),
            objects,
        }
    }

    fn sent_type(sink: &Sink<MockDriver>, n: usize) -> MessageType {
        sink.driver.sent[n].0.message_type()
    }

    #[test]
    fn silent_source_gets_retries_then_hard_reset() {
        let mut sink = Sink::new(MockDriver::new());
        sink.init(t0(), PowerOption::Max20V).unwrap();

        sink.driver.cc = (CcLevel::Rd3A0, CcLevel::Open);
        sink.driver.events.push_back(DriverEvent::Attached);
        sink.poll(t0(), true).unwrap();

        let mut now = t0();
        for _ in 0..3 {
            now += 351.millis();
            sink.poll(now, false).unwrap();
        }
        assert_eq!(sink.driver.sent.len(), 3);
        for n in 0..3 {
            assert_eq!(
                sent_type(&sink, n),
                MessageType::Control(ControlMessageType::GetSourceCap)
            );
        }
        assert_eq!(sink.driver.hard_resets, 0);

        now += 351.millis();
        sink.poll(now, false).unwrap();
        assert_eq!(sink.driver.sent.len(), 3);
        assert_eq!(sink.driver.hard_resets, 1);
    }

    #[test]
    fn non_pd_source_settles_for_default_power() {
        let mut sink = Sink::new(MockDriver::new());
        sink.init(t0(), PowerOption::Max20V).unwrap();

        sink.driver.cc = (CcLevel::RdUsb, CcLevel::Open);
        sink.driver.events.push_back(DriverEvent::Attached);
        sink.poll(t0(), true).unwrap();

        assert_eq!(sink.status(), PowerStatus::Typical);
        assert_eq!(sink.voltage_mv(), 5000);
        assert_eq!(sink.current_ma(), 1000);
        assert!(sink.driver.sent.is_empty());
    }

    #[test]
    fn pps_negotiation_reaches_setpoint() {
        let mut sink = Sink::new(MockDriver::new());
        sink.init_pps(t0(), 9000, 2000, PowerOption::Max20V).unwrap();

        sink.driver.cc = (CcLevel::Open, CcLevel::Rd3A0);
        sink.driver.events.push_back(DriverEvent::Attached);
        sink.driver.events.push_back(source_capabilities());
        sink.driver.events.push_back(DriverEvent::GoodCrcSent);
        sink.driver.events.push_back(ctrl(ControlMessageType::Accept));
        sink.driver.events.push_back(ctrl(ControlMessageType::PsRdy));
        sink.poll(t0(), true).unwrap();

        assert_eq!(sink.driver.sent.len(), 1);
        assert_eq!(
            sent_type(&sink, 0),
            MessageType::Data(DataMessageType::Request)
        );
        let request = PpsRequestDataObject(sink.driver.sent[0].1[0]);
        assert_eq!(request.object_position(), 3);
        assert_eq!(request.output_voltage(), 450);
        assert_eq!(request.operating_current(), 40);

        assert_eq!(sink.status(), PowerStatus::Pps);
        assert_eq!(sink.voltage_mv(), 9000);
        assert_eq!(sink.current_ma(), 2000);
        assert_eq!(sink.driver.vbus_sense, Some(false));
        assert!(!sink.is_transitioning());
    }

    #[test]
    fn fixed_negotiation_reports_contract_limits() {
        let mut sink = Sink::new(MockDriver::new());
        sink.init(t0(), PowerOption::Max9V).unwrap();

        sink.driver.cc = (CcLevel::Rd1A5, CcLevel::Open);
        sink.driver.events.push_back(DriverEvent::Attached);
        sink.driver.events.push_back(source_capabilities());
        sink.driver.events.push_back(DriverEvent::GoodCrcSent);
        sink.driver.events.push_back(ctrl(ControlMessageType::Accept));
        sink.driver.events.push_back(ctrl(ControlMessageType::PsRdy));
        sink.poll(t0(), true).unwrap();

        assert_eq!(sink.status(), PowerStatus::Typical);
        assert_eq!(sink.voltage_mv(), 9000);
        assert_eq!(sink.current_ma(), 2000);
        assert_eq!(sink.driver.vbus_sense, Some(true));
        assert_eq!(sink.power_mw(), 18000);
    }

    #[test]
    fn missing_ps_ready_falls_back_to_default_power() {
        let mut sink = Sink::new(MockDriver::new());
        sink.init_pps(t0(), 9000, 2000, PowerOption::Max20V).unwrap();

        sink.driver.cc = (CcLevel::Rd3A0, CcLevel::Open);
        sink.driver.events.push_back(DriverEvent::Attached);
        sink.driver.events.push_back(source_capabilities());
        sink.driver.events.push_back(DriverEvent::GoodCrcSent);
        sink.poll(t0(), true).unwrap();
        assert!(sink.is_transitioning());

        sink.poll(t0() + 581.millis(), false).unwrap();
        assert_eq!(sink.status(), PowerStatus::Typical);
        assert_eq!(sink.voltage_mv(), 5000);
        assert_eq!(sink.current_ma(), 1000);
    }

    #[test]
    fn rejected_request_falls_back_to_default_power() {
        let mut sink = Sink::new(MockDriver::new());
        sink.init_pps(t0(), 9000, 2000, PowerOption::Max20V).unwrap();

        sink.driver.cc = (CcLevel::Rd3A0, CcLevel::Open);
        sink.driver.events.push_back(DriverEvent::Attached);
        sink.driver.events.push_back(source_capabilities());
        sink.driver.events.push_back(DriverEvent::GoodCrcSent);
        sink.driver.events.push_back(ctrl(ControlMessageType::Reject));
        sink.poll(t0(), true).unwrap();

        assert_eq!(sink.status(), PowerStatus::Typical);
        assert_eq!(sink.voltage_mv(), 5000);
        assert!(!sink.is_transitioning());
    }

    #[test]
    fn pps_contract_is_kept_alive() {
        let mut sink = Sink::new(MockDriver::new());
        sink.init_pps(t0(), 9000, 2000, PowerOption::Max20V).unwrap();

        sink.driver.cc = (CcLevel::Rd3A0, CcLevel::Open);
        sink.driver.events.push_back(DriverEvent::Attached);
        sink.driver.events.push_back(source_capabilities());
        sink.driver.events.push_back(DriverEvent::GoodCrcSent);
        sink.driver.events.push_back(ctrl(ControlMessageType::Accept));
        sink.driver.events.push_back(ctrl(ControlMessageType::PsRdy));
        sink.poll(t0(), true).unwrap();
        assert_eq!(sink.driver.sent.len(), 1);

        // quiet inside the keep-alive window
        sink.poll(t0() + 4900.millis(), false).unwrap();
        assert_eq!(sink.driver.sent.len(), 1);

        sink.poll(t0() + 5001.millis(), false).unwrap();
        assert_eq!(sink.driver.sent.len(), 2);
        assert_eq!(
            sent_type(&sink, 1),
            MessageType::Data(DataMessageType::Request)
        );
    }

    #[test]
    fn below_5v_setpoint_steps_down_after_first_contract() {
        let mut sink = Sink::new(MockDriver::new());
        sink.init_pps(t0(), 3300, 2000, PowerOption::Max20V).unwrap();

        sink.driver.cc = (CcLevel::Rd3A0, CcLevel::Open);
        sink.driver.events.push_back(DriverEvent::Attached);
        sink.driver.events.push_back(source_capabilities());
        sink.driver.events.push_back(DriverEvent::GoodCrcSent);
        sink.driver.events.push_back(ctrl(ControlMessageType::Accept));
        sink.driver.events.push_back(ctrl(ControlMessageType::PsRdy));
        sink.poll(t0(), true).unwrap();

        // first stage lands at 5V; the final setpoint is still pending
        let request = PpsRequestDataObject(sink.driver.sent[0].1[0]);
        assert_eq!(request.output_voltage(), 250);
        assert_eq!(sink.status(), PowerStatus::NotAvailable);
        assert!(sink.is_transitioning());

        let later = t0() + 100.millis();
        sink.poll(later, false).unwrap();
        assert_eq!(sink.driver.sent.len(), 2);
        let request = PpsRequestDataObject(sink.driver.sent[1].1[0]);
        assert_eq!(request.output_voltage(), 165);

        sink.driver.events.push_back(ctrl(ControlMessageType::Accept));
        sink.driver.events.push_back(ctrl(ControlMessageType::PsRdy));
        sink.poll(later, true).unwrap();
        assert_eq!(sink.status(), PowerStatus::Pps);
        assert_eq!(sink.voltage_mv(), 3300);
    }

    #[test]
    fn detach_clears_negotiated_state() {
        let mut sink = Sink::new(MockDriver::new());
        sink.init(t0(), PowerOption::Max9V).unwrap();

        sink.driver.cc = (CcLevel::Rd3A0, CcLevel::Open);
        sink.driver.events.push_back(DriverEvent::Attached);
        sink.driver.events.push_back(source_capabilities());
        sink.driver.events.push_back(DriverEvent::GoodCrcSent);
        sink.driver.events.push_back(ctrl(ControlMessageType::Accept));
        sink.driver.events.push_back(ctrl(ControlMessageType::PsRdy));
        sink.poll(t0(), true).unwrap();
        assert_eq!(sink.status(), PowerStatus::Typical);

        sink.driver.events.push_back(DriverEvent::Detached);
        sink.poll(t0() + 10.millis(), true).unwrap();
        assert_eq!(sink.status(), PowerStatus::NotAvailable);
        assert_eq!(sink.voltage_mv(), 0);
        assert_eq!(sink.current_ma(), 0);
        assert!(!sink.is_transitioning());
    }

    #[test]
    fn transient_poll_failures_are_retried() {
        let mut sink = Sink::new(MockDriver::new());
        sink.init(t0(), PowerOption::Max5V).unwrap();

        sink.driver.failures = 2;
        assert!(sink.poll(t0(), true).is_ok());

        sink.driver.failures = 3;
        assert_eq!(
            sink.poll(t0() + 200.millis(), true),
            Err(DriverError::Busy)
        );
    }

    #[test]
    fn pps_status_query_only_under_pps_contract() {
        let mut sink = Sink::new(MockDriver::new());
        sink.init_pps(t0(), 9000, 2000, PowerOption::Max20V).unwrap();
        assert_eq!(sink.request_pps_status(t0()), Ok(false));

        sink.driver.cc = (CcLevel::Rd3A0, CcLevel::Open);
        sink.driver.events.push_back(DriverEvent::Attached);
        sink.driver.events.push_back(source_capabilities());
        sink.driver.events.push_back(DriverEvent::GoodCrcSent);
        sink.driver.events.push_back(ctrl(ControlMessageType::Accept));
        sink.driver.events.push_back(ctrl(ControlMessageType::PsRdy));
        sink.poll(t0(), true).unwrap();

        assert_eq!(sink.request_pps_status(t0()), Ok(true));
        assert_eq!(
            sent_type(&sink, 1),
            MessageType::Control(ControlMessageType::GetPpsStatus)
        );
    }

    #[test]
    fn set_pps_requires_active_pps_contract() {
        let mut sink = Sink::new(MockDriver::new());
        sink.init(t0(), PowerOption::Max5V).unwrap();
        assert!(!sink.set_pps(9000, 2000));

        sink.driver.cc = (CcLevel::Rd3A0, CcLevel::Open);
        sink.driver.events.push_back(DriverEvent::Attached);
        sink.driver.events.push_back(source_capabilities());
        sink.driver.events.push_back(DriverEvent::GoodCrcSent);
        sink.poll(t0(), true).unwrap();
        assert!(!sink.set_pps(9000, 2000));
    }
}
