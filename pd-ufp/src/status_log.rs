//! Optional event journal for the policy engine.
//!
//! The sink reports every notable transition through a [`StatusLog`];
//! the unit implementation discards them at zero cost, while
//! [`StatusLogger`] keeps a small ring of entries for an application to
//! drain and render at its leisure.

use {
    crate::{
        header::Header,
        protocol::{message_name, MAX_OBJECTS},
        Instant,
    },
    heapless::{Deque, Vec},
};

/// What happened, without the rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogKind {
    DeviceReady,
    Attach,
    Detach,
    TxMessage,
    RxMessage,
    SourceCapabilities,
    PowerReady,
    PpsStartup,
    PowerReject,
}

pub trait StatusLog {
    /// Record one event. `message` carries the header and objects for
    /// `TxMessage` / `RxMessage` entries and is `None` otherwise.
    fn log(&mut self, now: Instant, kind: LogKind, message: Option<(Header, &[u32])>);
}

/// Discards everything.
impl StatusLog for () {
    fn log(&mut self, _now: Instant, _kind: LogKind, _message: Option<(Header, &[u32])>) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogEntry {
    pub time_ms: u64,
    pub kind: LogKind,
    pub header: Option<Header>,
    pub objects: Vec<u32, MAX_OBJECTS>,
}

/// Fixed-capacity event ring; the oldest entry is dropped when full.
#[derive(Default)]
pub struct StatusLogger {
    entries: Deque<LogEntry, 16>,
}

impl StatusLogger {
    pub const fn new() -> Self {
        Self {
            entries: Deque::new(),
        }
    }

    /// Take the oldest pending entry.
    pub fn pop(&mut self) -> Option<LogEntry> {
        self.entries.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Render one entry into anything `core::fmt::Write`, e.g. a
    /// heapless string destined for a serial console.
    pub fn write_entry(entry: &LogEntry, out: &mut impl core::fmt::Write) -> core::fmt::Result {
        write!(out, "{}: ", entry.time_ms)?;
        match (entry.kind, entry.header) {
            (LogKind::TxMessage, Some(header)) => {
                write!(out, "TX {}", message_name(header))?;
                Self::write_objects(entry, out)
            }
            (LogKind::RxMessage, Some(header)) => {
                write!(out, "RX {} id {}", message_name(header), header.message_id())?;
                Self::write_objects(entry, out)
            }
            (LogKind::TxMessage | LogKind::RxMessage, None) => write!(out, "message"),
            (LogKind::DeviceReady, _) => write!(out, "device ready"),
            (LogKind::Attach, _) => write!(out, "attached"),
            (LogKind::Detach, _) => write!(out, "detached"),
            (LogKind::SourceCapabilities, _) => write!(out, "source capabilities"),
            (LogKind::PowerReady, _) => write!(out, "power ready"),
            (LogKind::PpsStartup, _) => write!(out, "PPS startup"),
            (LogKind::PowerReject, _) => write!(out, "request rejected"),
        }
    }

    fn write_objects(entry: &LogEntry, out: &mut impl core::fmt::Write) -> core::fmt::Result {
        for &object in &entry.objects {
            write!(out, " {:08x}", object)?;
        }
        Ok(())
    }
}

impl StatusLog for StatusLogger {
    fn log(&mut self, now: Instant, kind: LogKind, message: Option<(Header, &[u32])>) {
        let mut objects = Vec::new();
        if let Some((_, payload)) = message {
            for &object in payload.iter().take(MAX_OBJECTS) {
                let _ = objects.push(object);
            }
        }
        let entry = LogEntry {
            time_ms: now.ticks(),
            kind,
            header: message.map(|(header, _)| header),
            objects,
        };
        if let Err(entry) = self.entries.push_back(entry) {
            self.entries.pop_front();
            let _ = self.entries.push_back(entry);
        }
    }
}
