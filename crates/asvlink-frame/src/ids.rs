//! Module and message identifiers.
//!
//! Module ids partition the fleet address space: every physical module on the
//! vessel owns one id. Message ids select either a reading/writing mode of a
//! module payload or one of the link control messages (sync, acknowledgements).

use std::fmt;

use crate::error::FrameError;

/// Addressable module on the vessel bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ModuleId {
    Control = 0x01,
    RadioTelemetry = 0x21,
    Communication = 0x31,
    Imu = 0x41,
    Gnss = 0x51,
    Navigation = 0x61,
    DepthMeter = 0x71,
    Lidar = 0x81,
    Camera = 0x91,
    Check = 0xF0,
    Registrar = 0xFF,
}

impl ModuleId {
    pub const ALL: [ModuleId; 11] = [
        ModuleId::Control,
        ModuleId::RadioTelemetry,
        ModuleId::Communication,
        ModuleId::Imu,
        ModuleId::Gnss,
        ModuleId::Navigation,
        ModuleId::DepthMeter,
        ModuleId::Lidar,
        ModuleId::Camera,
        ModuleId::Check,
        ModuleId::Registrar,
    ];

    /// Look up a module by its wire byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_u8() == value)
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Human-readable name, as used in config files and logs.
    pub const fn name(self) -> &'static str {
        match self {
            ModuleId::Control => "control",
            ModuleId::RadioTelemetry => "radio_telemetry",
            ModuleId::Communication => "communication",
            ModuleId::Imu => "imu",
            ModuleId::Gnss => "gnss",
            ModuleId::Navigation => "navigation",
            ModuleId::DepthMeter => "depth_meter",
            ModuleId::Lidar => "lidar",
            ModuleId::Camera => "camera",
            ModuleId::Check => "check",
            ModuleId::Registrar => "registrar",
        }
    }

    /// Parse a module name (case-insensitive, `-` and `_` interchangeable).
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|m| m.name() == wanted)
    }
}

impl TryFrom<u8> for ModuleId {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(FrameError::UnknownModule(value))
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:#04X})", self.name(), self.as_u8())
    }
}

/// Message id: a payload mode or a link control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum MessageId {
    ReadingModeA = 0x11,
    ReadingModeB = 0x12,
    ReadingModeC = 0x13,
    WritingModeA = 0x14,
    WritingModeB = 0x15,
    WritingModeC = 0x16,
    SyncRequest = 0xFA,
    SyncResponse = 0xFB,
    AckOk = 0xFC,
    AckFail = 0xFD,
}

impl MessageId {
    pub const ALL: [MessageId; 10] = [
        MessageId::ReadingModeA,
        MessageId::ReadingModeB,
        MessageId::ReadingModeC,
        MessageId::WritingModeA,
        MessageId::WritingModeB,
        MessageId::WritingModeC,
        MessageId::SyncRequest,
        MessageId::SyncResponse,
        MessageId::AckOk,
        MessageId::AckFail,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_u8() == value)
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            MessageId::ReadingModeA => "READING_MODE_A",
            MessageId::ReadingModeB => "READING_MODE_B",
            MessageId::ReadingModeC => "READING_MODE_C",
            MessageId::WritingModeA => "WRITING_MODE_A",
            MessageId::WritingModeB => "WRITING_MODE_B",
            MessageId::WritingModeC => "WRITING_MODE_C",
            MessageId::SyncRequest => "SYNC_REQUEST",
            MessageId::SyncResponse => "SYNC_RESPONSE",
            MessageId::AckOk => "ACK_OK",
            MessageId::AckFail => "ACK_FAIL",
        }
    }

    /// Returns true for sync and acknowledgement messages.
    pub const fn is_control(self) -> bool {
        matches!(
            self,
            MessageId::SyncRequest | MessageId::SyncResponse | MessageId::AckOk | MessageId::AckFail
        )
    }

    /// Returns true for acknowledgement messages.
    pub const fn is_ack(self) -> bool {
        matches!(self, MessageId::AckOk | MessageId::AckFail)
    }

    /// Parse a mode letter (`A`, `B`, `C`) into the writing mode it selects.
    pub fn writing_mode(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'A' => Some(MessageId::WritingModeA),
            'B' => Some(MessageId::WritingModeB),
            'C' => Some(MessageId::WritingModeC),
            _ => None,
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:#04X})", self.name(), self.as_u8())
    }
}
