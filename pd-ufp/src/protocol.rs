//! Protocol engine: message dispatch, capability evaluation and
//! request/response builders.
//!
//! Pure codec plus the minimal session state needed for sequencing
//! (message-ID counter, stored capability list, negotiation target).
//! No I/O and no timers; the policy loop in [`crate::sink`] drives it.

use {
    crate::{
        header::{
            ControlMessageType, DataMessageType, ExtendedHeader, ExtendedMessageType, Header,
            SPEC_REVISION,
        },
        pdo::{
            FixedVariableRequestDataObject, PowerInfo, PpsRequestDataObject, PpsStatus,
            SinkFixedSupply, SupplyKind,
        },
    },
    heapless::Vec,
};

/// A source may advertise at most 7 data objects per message
pub const MAX_OBJECTS: usize = 7;

/// Power selection strategy for non-PPS operation.
///
/// The tiered options select the highest-capability PDO whose voltage
/// stays at or below the tier; the `Max*` options maximize one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerOption {
    Max5V,
    Max9V,
    Max12V,
    Max15V,
    Max20V,
    MaxVoltage,
    MaxCurrent,
    MaxPower,
}

struct PowerOptionSetting {
    limit: u16,
    use_voltage: bool,
    use_current: bool,
}

#[rustfmt::skip]
static POWER_OPTIONS: [PowerOptionSetting; 8] = [
    PowerOptionSetting { limit: 25,    use_voltage: true,  use_current: false }, // Max5V
    PowerOptionSetting { limit: 45,    use_voltage: true,  use_current: false }, // Max9V
    PowerOptionSetting { limit: 60,    use_voltage: true,  use_current: false }, // Max12V
    PowerOptionSetting { limit: 75,    use_voltage: true,  use_current: false }, // Max15V
    PowerOptionSetting { limit: 100,   use_voltage: true,  use_current: false }, // Max20V
    PowerOptionSetting { limit: 100,   use_voltage: true,  use_current: false }, // MaxVoltage
    PowerOptionSetting { limit: 125,   use_voltage: false, use_current: true  }, // MaxCurrent
    PowerOptionSetting { limit: 12500, use_voltage: true,  use_current: true  }, // MaxPower
];

/// Semantic events produced by [`Protocol::handle_message`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Events {
    pub source_capabilities: bool,
    pub accept: bool,
    pub reject: bool,
    pub ps_ready: bool,
    pub pps_status: bool,
}

impl Events {
    pub fn any(&self) -> bool {
        self.source_capabilities || self.accept || self.reject || self.ps_ready || self.pps_status
    }
}

/// An outbound message ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    pub objects: Vec<u32, MAX_OBJECTS>,
}

impl Frame {
    fn new(header: Header, objects: &[u32]) -> Self {
        let mut frame = Self {
            header,
            objects: Vec::new(),
        };
        for &object in objects.iter().take(MAX_OBJECTS) {
            let _ = frame.objects.push(object);
        }
        frame
    }
}

type Handler = fn(&mut Protocol, Header, &[u32], &mut Events);
type Responder = fn(&mut Protocol) -> Option<Frame>;

struct MsgState {
    name: &'static str,
    handler: Option<Handler>,
    responder: Option<Responder>,
}

macro_rules! msg {
    ($name:literal) => {
        MsgState { name: $name, handler: None, responder: None }
    };
    ($name:literal, handler: $handler:path) => {
        MsgState { name: $name, handler: Some($handler), responder: None }
    };
    ($name:literal, responder: $responder:path) => {
        MsgState { name: $name, handler: None, responder: Some($responder) }
    };
    ($name:literal, handler: $handler:path, responder: $responder:path) => {
        MsgState { name: $name, handler: Some($handler), responder: Some($responder) }
    };
}

/// Control messages, indexed by message type; the last entry catches
/// every unrecognized type.
#[rustfmt::skip]
static CTRL_MSG: [MsgState; 24] = [
    msg!("C0"),
    msg!("GoodCRC", handler: Protocol::handle_good_crc),
    msg!("GotoMin"),
    msg!("Accept", handler: Protocol::handle_accept),
    msg!("Reject", handler: Protocol::handle_reject),
    msg!("Ping"),
    msg!("PS_RDY", handler: Protocol::handle_ps_ready),
    msg!("Get_Src_Cap", responder: Protocol::respond_not_supported),
    msg!("Get_Sink_Cap", responder: Protocol::respond_sink_capabilities),
    msg!("DR_Swap", responder: Protocol::respond_reject),
    msg!("PR_Swap", responder: Protocol::respond_reject),
    msg!("VCONN_Swap", responder: Protocol::respond_reject),
    msg!("Wait"),
    msg!("Soft_Rst", responder: Protocol::respond_accept),
    msg!("Dat_Rst"),
    msg!("Dat_Rst_Cpt"),
    msg!("NS"),
    msg!("Get_Src_Ext", responder: Protocol::respond_not_supported),
    msg!("Get_Stat", responder: Protocol::respond_not_supported),
    msg!("FR_Swap", responder: Protocol::respond_not_supported),
    msg!("Get_PPS_Stat", responder: Protocol::respond_not_supported),
    msg!("Get_CC", responder: Protocol::respond_not_supported),
    msg!("Get_Sink_Ext", responder: Protocol::respond_sink_capabilities_extended),
    msg!("C_R", responder: Protocol::respond_not_supported),
];

#[rustfmt::skip]
static DATA_MSG: [MsgState; 17] = [
    msg!("D0"),
    msg!("Src_Cap", handler: Protocol::handle_source_capabilities, responder: Protocol::respond_request),
    msg!("Request", responder: Protocol::respond_not_supported),
    msg!("BIST"),
    msg!("Sink_Cap", responder: Protocol::respond_not_supported),
    msg!("Bat_Stat", responder: Protocol::respond_not_supported),
    msg!("Alert"),
    msg!("Get_CI", responder: Protocol::respond_not_supported),
    msg!("Enter_USB"),
    msg!("D9"),
    msg!("D10"),
    msg!("D11"),
    msg!("D12"),
    msg!("D13"),
    msg!("D14"),
    msg!("VDM", responder: Protocol::respond_not_supported),
    msg!("D_R", responder: Protocol::respond_not_supported),
];

#[rustfmt::skip]
static EXT_MSG: [MsgState; 17] = [
    msg!("E0", responder: Protocol::respond_not_supported),
    msg!("Src_Cap_Ext"),
    msg!("Status"),
    msg!("Get_Bat_Cap", responder: Protocol::respond_not_supported),
    msg!("Get_Bat_Stat", responder: Protocol::respond_not_supported),
    msg!("Bat_Cap"),
    msg!("Get_Mfg_Info", responder: Protocol::respond_not_supported),
    msg!("Mfg_Info"),
    msg!("Sec_Request", responder: Protocol::respond_not_supported),
    msg!("Sec_Response"),
    msg!("FW_Request", responder: Protocol::respond_not_supported),
    msg!("FW_Response"),
    msg!("PPS_Stat", handler: Protocol::handle_pps_status),
    msg!("Country_Info"),
    msg!("Country_Code"),
    msg!("Sink_Cap_Ext", responder: Protocol::respond_not_supported),
    msg!("E_R", responder: Protocol::respond_not_supported),
];

fn dispatch_entry(header: Header) -> &'static MsgState {
    let ty = usize::from(header.message_type_raw());
    if header.extended() {
        &EXT_MSG[ty.min(EXT_MSG.len() - 1)]
    } else if header.num_objects() != 0 {
        &DATA_MSG[ty.min(DATA_MSG.len() - 1)]
    } else {
        &CTRL_MSG[ty.min(CTRL_MSG.len() - 1)]
    }
}

/// Short display name for a message header, for status logging.
pub fn message_name(header: Header) -> &'static str {
    dispatch_entry(header).name
}

pub struct Protocol {
    current: &'static MsgState,
    tx_header: Header,
    rx_header: Header,
    message_id: u8,

    /// PPS target voltage in 20mV units
    pps_voltage: u16,
    /// PPS target current in 50mA units
    pps_current: u8,
    /// PPS Status Data Block from the most recent PPS_Status message
    pps_status_block: [u8; 4],

    power_option: PowerOption,
    pdo: Vec<u32, MAX_OBJECTS>,
    selected: u8,
}

impl Default for Protocol {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol {
    pub fn new() -> Self {
        Self {
            current: &CTRL_MSG[0],
            tx_header: Header(0),
            rx_header: Header(0),
            message_id: 0,
            pps_voltage: 0,
            pps_current: 0,
            pps_status_block: [0; 4],
            power_option: PowerOption::Max5V,
            pdo: Vec::new(),
            selected: 0,
        }
    }

    /// Clear sequencing state on detach or hard reset. The negotiation
    /// target (power option / PPS setpoint) survives.
    pub fn reset(&mut self) {
        self.current = &CTRL_MSG[0];
        self.message_id = 0;
    }

    /// Dispatch one received message, returning the semantic events it
    /// produced. The dispatch entry is retained for a later
    /// [`Self::respond`] call.
    pub fn handle_message(&mut self, header: Header, objects: &[u32]) -> Events {
        let mut events = Events::default();
        self.rx_header = header;
        self.current = dispatch_entry(header);
        if let Some(handler) = self.current.handler {
            handler(self, header, objects, &mut events);
        }
        events
    }

    /// Build the reply to the most recently dispatched message, if that
    /// message calls for one.
    pub fn respond(&mut self) -> Option<Frame> {
        self.current.responder.and_then(|responder| responder(self))
    }

    pub fn create_get_source_cap(&mut self) -> Frame {
        self.control_frame(ControlMessageType::GetSourceCap)
    }

    pub fn create_get_pps_status(&mut self) -> Frame {
        self.control_frame(ControlMessageType::GetPpsStatus)
    }

    /// Build a Request message for the currently selected PDO.
    pub fn create_request(&mut self) -> Frame {
        self.build_request()
    }

    /// Select the PDO matching the active negotiation target.
    ///
    /// A PPS target wins on the first Augmented PDO bracketing it; the
    /// power-option path keeps the last PDO whose coarse power metric
    /// stays within the option's limit, falling back to index 0, the
    /// mandatory vSafe5V entry.
    fn evaluate(&self, pps_voltage: u16, pps_current: u8) -> u8 {
        let setting = &POWER_OPTIONS[self.power_option as usize];
        let mut selected = 0;

        for (n, &raw) in self.pdo.iter().enumerate() {
            let info = PowerInfo::parse(raw);
            if info.kind == SupplyKind::Augmented {
                // compare in 10mV / 10mA units
                let pps_v = pps_voltage * 2;
                let pps_i = u16::from(pps_current) * 5;
                if info.min_voltage * 5 <= pps_v
                    && pps_v <= info.max_voltage * 5
                    && pps_i <= info.max_current
                {
                    return n as u8;
                }
            } else {
                // reduce to 8-bit precision before the 8x8 multiply
                let v = if setting.use_voltage {
                    (info.max_voltage >> 2) as u8
                } else {
                    1
                };
                let i = if setting.use_current {
                    (info.max_current >> 2) as u8
                } else {
                    1
                };
                if u16::from(v) * u16::from(i) <= setting.limit {
                    selected = n as u8;
                }
            }
        }
        selected
    }

    /// Set a tiered power option, clearing any PPS target. Returns true
    /// when a capability list is present and a new Request is due.
    pub fn set_power_option(&mut self, option: PowerOption) -> bool {
        self.power_option = option;
        self.pps_voltage = 0;
        self.pps_current = 0;
        if self.pdo.is_empty() {
            return false;
        }
        self.selected = self.evaluate(0, 0);
        true
    }

    /// Select a PDO by index directly. Returns true when the index is
    /// valid and a new Request is due.
    pub fn select_power(&mut self, index: u8) -> bool {
        if usize::from(index) < self.pdo.len() {
            self.selected = index;
            return true;
        }
        false
    }

    /// Set a PPS target. In strict mode the target is rejected without
    /// any state change when no Augmented PDO satisfies it; non-strict
    /// mode accepts and falls back to the power-option selection.
    /// Returns true exactly when the selection changed.
    pub fn set_pps(&mut self, voltage_mv: u16, current_ma: u16, strict: bool) -> bool {
        let voltage = voltage_mv / 20;
        let current = (current_ma / 50) as u8;
        if self.pps_voltage == voltage && self.pps_current == current {
            return false;
        }
        let selected = self.evaluate(voltage, current);
        if selected != 0 || !strict {
            self.pps_voltage = voltage;
            self.pps_current = current;
            self.selected = selected;
            return true;
        }
        false
    }

    pub fn selected_power(&self) -> u8 {
        self.selected
    }

    pub fn power_info(&self, index: u8) -> Option<PowerInfo> {
        self.pdo
            .get(usize::from(index))
            .map(|&raw| PowerInfo::parse(raw))
    }

    pub fn source_capability_count(&self) -> usize {
        self.pdo.len()
    }

    /// PPS target voltage in mV
    pub fn pps_voltage_mv(&self) -> u16 {
        self.pps_voltage * 20
    }

    /// PPS target current in mA
    pub fn pps_current_ma(&self) -> u16 {
        u16::from(self.pps_current) * 50
    }

    pub fn pps_status(&self) -> PpsStatus {
        PpsStatus::parse(&self.pps_status_block)
    }

    pub fn tx_header(&self) -> Header {
        self.tx_header
    }

    pub fn rx_header(&self) -> Header {
        self.rx_header
    }

    pub fn message_id(&self) -> u8 {
        self.message_id
    }

    fn generate_header(&self, ty: u8, num_objects: u8) -> Header {
        Header(0)
            .with_message_type_raw(ty)
            .with_spec_revision(SPEC_REVISION)
            .with_message_id(self.message_id)
            .with_num_objects(num_objects)
    }

    fn control_frame(&mut self, ty: ControlMessageType) -> Frame {
        let header = self.generate_header(ty as u8, 0);
        self.tx_header = header;
        Frame::new(header, &[])
    }

    fn data_frame(&mut self, ty: DataMessageType, objects: &[u32]) -> Frame {
        let header = self.generate_header(ty as u8, objects.len() as u8);
        self.tx_header = header;
        Frame::new(header, objects)
    }

    fn extended_frame(
        &mut self,
        ty: ExtendedMessageType,
        data_size: u16,
        objects: &mut [u32],
    ) -> Frame {
        // object count sized for the 2-byte extended header plus data
        let num_objects = ((data_size + 5) >> 2) as u8;
        let header = self
            .generate_header(ty as u8, num_objects)
            .with_extended(true);
        self.tx_header = header;
        objects[0] |= u32::from(
            ExtendedHeader(0)
                .with_chunked(true)
                .with_data_size(data_size)
                .0,
        );
        Frame::new(header, objects)
    }

    // Message handlers.

    fn handle_good_crc(&mut self, _header: Header, _objects: &[u32], _events: &mut Events) {
        // MessageIDCounter increments on each GoodCRC for a sent message
        self.message_id = (self.message_id + 1) & 0x7;
    }

    fn handle_accept(&mut self, _header: Header, _objects: &[u32], events: &mut Events) {
        events.accept = true;
    }

    fn handle_reject(&mut self, _header: Header, _objects: &[u32], events: &mut Events) {
        events.reject = true;
    }

    fn handle_ps_ready(&mut self, _header: Header, _objects: &[u32], events: &mut Events) {
        events.ps_ready = true;
    }

    fn handle_source_capabilities(&mut self, header: Header, objects: &[u32], events: &mut Events) {
        self.pdo.clear();
        for &object in objects.iter().take(usize::from(header.num_objects())) {
            let _ = self.pdo.push(object);
        }
        self.selected = self.evaluate(self.pps_voltage, self.pps_current);
        events.source_capabilities = true;
    }

    fn handle_pps_status(&mut self, _header: Header, objects: &[u32], events: &mut Events) {
        // PPSSDB sits after the 2-byte extended header
        if objects.len() < 2 {
            return;
        }
        self.pps_status_block = [
            (objects[0] >> 16) as u8,
            (objects[0] >> 24) as u8,
            objects[1] as u8,
            (objects[1] >> 8) as u8,
        ];
        events.pps_status = true;
    }

    // Responders.

    fn respond_reject(&mut self) -> Option<Frame> {
        Some(self.control_frame(ControlMessageType::Reject))
    }

    fn respond_accept(&mut self) -> Option<Frame> {
        Some(self.control_frame(ControlMessageType::Accept))
    }

    fn respond_not_supported(&mut self) -> Option<Frame> {
        Some(self.control_frame(ControlMessageType::NotSupported))
    }

    fn respond_sink_capabilities(&mut self) -> Option<Frame> {
        // Single 5V/1A fixed sink PDO; sources rarely ask
        let pdo = SinkFixedSupply(0)
            .with_operational_current(100)
            .with_voltage(100)
            .with_usb_communications_capable(true)
            .with_higher_capability(true);
        Some(self.data_frame(DataMessageType::SinkCapabilities, &[pdo.0]))
    }

    fn respond_sink_capabilities_extended(&mut self) -> Option<Frame> {
        const VID: u32 = 0;
        const PID: u32 = 0;
        const XID: u32 = 0;
        const FW_VERSION: u32 = 1;
        const HW_VERSION: u32 = 1;
        const SKEDB_VERSION: u32 = 1;
        // bit 0: PPS charging supported, bit 1: VBUS powered
        const SINK_MODES: u32 = 0x3;
        const SINK_MIN_PDP: u32 = 5;
        const SINK_OP_PDP: u32 = 5;
        const SINK_MAX_PDP: u32 = 100;

        // 21-byte SKEDB packed after the 2-byte extended header
        let mut objects: [u32; 6] = [
            VID << 16,
            PID | ((XID & 0xFFFF) << 16),
            (XID >> 16) | (FW_VERSION << 16) | (HW_VERSION << 24),
            SKEDB_VERSION,
            SINK_MODES << 24,
            SINK_MIN_PDP | (SINK_OP_PDP << 8) | (SINK_MAX_PDP << 16),
        ];
        Some(self.extended_frame(ExtendedMessageType::SinkCapExtended, 21, &mut objects))
    }

    fn respond_request(&mut self) -> Option<Frame> {
        Some(self.build_request())
    }

    fn build_request(&mut self) -> Frame {
        let position = self.selected + 1;
        let raw = self
            .pdo
            .get(usize::from(self.selected))
            .copied()
            .unwrap_or(0);
        let info = PowerInfo::parse(raw);

        let object = if info.kind == SupplyKind::Augmented {
            // Unchunked Extended Messages Supported stays clear for
            // PD 2.0 PHY compatibility
            PpsRequestDataObject(0)
                .with_operating_current(self.pps_current)
                .with_output_voltage(self.pps_voltage)
                .with_usb_communications_capable(true)
                .with_object_position(position)
                .0
        } else {
            let request = if info.max_current != 0 {
                info.max_current
            } else {
                info.max_power
            };
            FixedVariableRequestDataObject(0)
                .with_maximum_operating_current(request)
                .with_operating_current(request)
                .with_usb_communications_capable(true)
                .with_object_position(position)
                .0
        };
        self.data_frame(DataMessageType::Request, &[object])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::MessageType;

    fn ctrl_header(ty: ControlMessageType) -> Header {
        Header(0)
            .with_message_type_raw(ty as u8)
            .with_spec_revision(SPEC_REVISION)
    }

    fn source_cap_header(num: u8) -> Header {
        Header(0)
            .with_message_type_raw(DataMessageType::SourceCapabilities as u8)
            .with_spec_revision(SPEC_REVISION)
            .with_num_objects(num)
    }

    /// Fixed 5V/3A, Variable 9V/2A, PPS 3.3-11V/3A
    const CAPS: [u32; 3] = [
        (100 << 10) | 300,
        (2 << 30) | (180 << 20) | (180 << 10) | 200,
        (3 << 30) | (110 << 17) | (33 << 8) | 60,
    ];

    #[test]
    fn good_crc_advances_message_id_per_call_and_wraps() {
        let mut protocol = Protocol::new();
        let header = ctrl_header(ControlMessageType::GoodCRC);

        protocol.handle_message(header, &[]);
        assert_eq!(protocol.message_id(), 1);

        // duplicate deliveries still count individually
        protocol.handle_message(header, &[]);
        assert_eq!(protocol.message_id(), 2);

        for _ in 0..6 {
            protocol.handle_message(header, &[]);
        }
        assert_eq!(protocol.message_id(), 0);
    }

    #[test]
    fn generated_headers_carry_message_id() {
        let mut protocol = Protocol::new();
        protocol.handle_message(ctrl_header(ControlMessageType::GoodCRC), &[]);

        let frame = protocol.create_get_source_cap();
        assert_eq!(frame.header.message_id(), 1);
        assert_eq!(frame.header.spec_revision(), SPEC_REVISION);
        assert_eq!(
            frame.header.message_type(),
            MessageType::Control(ControlMessageType::GetSourceCap)
        );
        assert!(frame.objects.is_empty());
        assert_eq!(protocol.tx_header(), frame.header);
    }

    #[test]
    fn source_capabilities_stored_and_evaluated() {
        let mut protocol = Protocol::new();
        let events = protocol.handle_message(source_cap_header(3), &CAPS);

        assert!(events.source_capabilities);
        assert!(!events.ps_ready);
        assert_eq!(protocol.source_capability_count(), 3);
        // Max5V default keeps the vSafe5V entry
        assert_eq!(protocol.selected_power(), 0);
    }

    #[test]
    fn pps_target_selects_first_bracketing_augmented_pdo() {
        let mut protocol = Protocol::new();
        protocol.handle_message(source_cap_header(3), &CAPS);

        assert!(protocol.set_pps(9000, 2000, true));
        assert_eq!(protocol.selected_power(), 2);

        let frame = protocol.create_request();
        assert_eq!(
            frame.header.message_type(),
            MessageType::Data(DataMessageType::Request)
        );
        assert_eq!(frame.header.num_objects(), 1);

        let request = PpsRequestDataObject(frame.objects[0]);
        assert_eq!(request.operating_current(), 40); // 2000mA / 50
        assert_eq!(request.output_voltage(), 450); // 9000mV / 20
        assert_eq!(request.object_position(), 3);
        assert!(request.usb_communications_capable());
    }

    #[test]
    fn strict_pps_out_of_range_leaves_state_unchanged() {
        let mut protocol = Protocol::new();
        protocol.handle_message(source_cap_header(3), &CAPS);
        protocol.set_pps(9000, 2000, true);

        // 15V exceeds the 11V programmable range
        assert!(!protocol.set_pps(15000, 1000, true));
        assert_eq!(protocol.selected_power(), 2);
        assert_eq!(protocol.pps_voltage_mv(), 9000);
        assert_eq!(protocol.pps_current_ma(), 2000);
    }

    #[test]
    fn power_option_keeps_last_qualifying_pdo() {
        let mut protocol = Protocol::new();
        protocol.handle_message(source_cap_header(3), &CAPS);

        // 9V tier admits both the fixed 5V and the variable 9V entry
        assert!(protocol.set_power_option(PowerOption::Max9V));
        assert_eq!(protocol.selected_power(), 1);

        let frame = protocol.create_request();
        let request = FixedVariableRequestDataObject(frame.objects[0]);
        assert_eq!(request.operating_current(), 200);
        assert_eq!(request.maximum_operating_current(), 200);
        assert_eq!(request.object_position(), 2);
    }

    #[test]
    fn power_option_without_capabilities_requests_nothing() {
        let mut protocol = Protocol::new();
        assert!(!protocol.set_power_option(PowerOption::Max20V));
    }

    #[test]
    fn accept_reject_ps_ready_are_distinct_events() {
        let mut protocol = Protocol::new();

        let events = protocol.handle_message(ctrl_header(ControlMessageType::Accept), &[]);
        assert!(events.accept && !events.reject && !events.ps_ready);

        let events = protocol.handle_message(ctrl_header(ControlMessageType::Reject), &[]);
        assert!(events.reject && !events.accept && !events.ps_ready);

        let events = protocol.handle_message(ctrl_header(ControlMessageType::PsRdy), &[]);
        assert!(events.ps_ready && !events.accept && !events.reject);
    }

    #[test]
    fn get_sink_cap_answered_with_fixed_5v_1a() {
        let mut protocol = Protocol::new();
        protocol.handle_message(ctrl_header(ControlMessageType::GetSinkCap), &[]);

        let frame = protocol.respond().unwrap();
        assert_eq!(
            frame.header.message_type(),
            MessageType::Data(DataMessageType::SinkCapabilities)
        );
        let pdo = SinkFixedSupply(frame.objects[0]);
        assert_eq!(pdo.voltage(), 100);
        assert_eq!(pdo.operational_current(), 100);
        assert!(pdo.higher_capability());
        assert!(pdo.usb_communications_capable());
    }

    #[test]
    fn swap_requests_rejected_soft_reset_accepted() {
        let mut protocol = Protocol::new();

        protocol.handle_message(ctrl_header(ControlMessageType::DrSwap), &[]);
        let frame = protocol.respond().unwrap();
        assert_eq!(
            frame.header.message_type(),
            MessageType::Control(ControlMessageType::Reject)
        );

        protocol.handle_message(ctrl_header(ControlMessageType::SoftReset), &[]);
        let frame = protocol.respond().unwrap();
        assert_eq!(
            frame.header.message_type(),
            MessageType::Control(ControlMessageType::Accept)
        );
    }

    #[test]
    fn unrecognized_types_clamp_to_not_supported() {
        let mut protocol = Protocol::new();

        let header = Header(0).with_message_type_raw(0b1_1111);
        protocol.handle_message(header, &[]);
        let frame = protocol.respond().unwrap();
        assert_eq!(
            frame.header.message_type(),
            MessageType::Control(ControlMessageType::NotSupported)
        );
        assert_eq!(frame.header.message_type_raw(), 0x10);
    }

    #[test]
    fn ping_has_no_response() {
        let mut protocol = Protocol::new();
        protocol.handle_message(ctrl_header(ControlMessageType::Ping), &[]);
        assert!(protocol.respond().is_none());
    }

    #[test]
    fn sink_cap_extended_is_single_chunk() {
        let mut protocol = Protocol::new();
        protocol.handle_message(ctrl_header(ControlMessageType::GetSinkCapExtended), &[]);

        let frame = protocol.respond().unwrap();
        assert!(frame.header.extended());
        assert_eq!(frame.header.num_objects(), 6); // (21 + 5) >> 2
        assert_eq!(
            frame.header.message_type(),
            MessageType::Extended(ExtendedMessageType::SinkCapExtended)
        );

        let ext = ExtendedHeader(frame.objects[0] as u16);
        assert!(ext.chunked());
        assert_eq!(ext.data_size(), 21);
        assert_eq!(ext.chunk_number(), 0);
    }

    #[test]
    fn pps_status_block_extracted_from_chunked_payload() {
        let mut protocol = Protocol::new();
        let header = Header(0)
            .with_message_type_raw(ExtendedMessageType::PpsStatus as u8)
            .with_num_objects(2)
            .with_extended(true);

        // extended header 0x8004 in the low 16 bits, then the PPSSDB:
        // voltage 0x0140 little-endian, current 0x11, flag byte 0x0A
        let objects = [(0x0140u32 << 16) | 0x8004, 0x0000_0A11];

        let events = protocol.handle_message(header, &objects);
        assert!(events.pps_status);

        let status = protocol.pps_status();
        assert_eq!(status.output_voltage, 0x0140);
        assert_eq!(status.output_current, 0x11);
        assert_eq!(status.ptf, crate::pdo::PtfFlag::Normal);
        assert_eq!(status.omf, crate::pdo::OmfFlag::CurrentLimitMode);
    }

    #[test]
    fn reset_clears_sequencing_but_keeps_target() {
        let mut protocol = Protocol::new();
        protocol.handle_message(source_cap_header(3), &CAPS);
        protocol.set_pps(9000, 2000, true);
        protocol.handle_message(ctrl_header(ControlMessageType::GoodCRC), &[]);

        protocol.reset();
        assert_eq!(protocol.message_id(), 0);
        assert_eq!(protocol.pps_voltage_mv(), 9000);
        assert_eq!(protocol.pps_current_ma(), 2000);
        assert!(protocol.respond().is_none());
    }
}
