#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// ADS1256 Commands
pub const CMD_WAKEUP: u8 = 0x00;
pub const CMD_RDATA: u8 = 0x01;
pub const CMD_RDATAC: u8 = 0x03;
pub const CMD_SDATAC: u8 = 0x0F;
pub const CMD_RREG: u8 = 0x10;
pub const CMD_WREG: u8 = 0x50;
pub const CMD_SELFCAL: u8 = 0xF0;
pub const CMD_SELFOCAL: u8 = 0xF1;
pub const CMD_SELFGCAL: u8 = 0xF2;
pub const CMD_SYSOCAL: u8 = 0xF3;
pub const CMD_SYSGCAL: u8 = 0xF4;
pub const CMD_SYNC: u8 = 0xFC;
pub const CMD_STANDBY: u8 = 0xFD;
pub const CMD_RESET: u8 = 0xFE;
pub const CMD_WAKEUP_ALT: u8 = 0xFF;

/// ADS1256 Registers
pub const REG_STATUS: u8 = 0x00;
pub const REG_MUX: u8 = 0x01;
pub const REG_ADCON: u8 = 0x02;
pub const REG_DRATE: u8 = 0x03;
pub const REG_IO: u8 = 0x04;
pub const REG_OFC0: u8 = 0x05;
pub const REG_OFC1: u8 = 0x06;
pub const REG_OFC2: u8 = 0x07;
pub const REG_FSC0: u8 = 0x08;
pub const REG_FSC1: u8 = 0x09;
pub const REG_FSC2: u8 = 0x0A;

/// Number of addressable registers (0x00 through 0x0A).
pub const NUM_REGISTERS: usize = 11;

/// STATUS register bits
pub const STATUS_ORDER: u8 = 0x08;
pub const STATUS_ACAL: u8 = 0x04;
pub const STATUS_BUFEN: u8 = 0x02;
pub const STATUS_DRDY: u8 = 0x01;

/// ADCON register bits: clock out (bits 6-5), sensor detect (bits 4-3), PGA (bits 2-0)
pub const ADCON_CLK_OFF: u8 = 0x00;
pub const ADCON_CLK_DIV1: u8 = 0x20;
pub const ADCON_CLK_DIV2: u8 = 0x40;
pub const ADCON_CLK_DIV4: u8 = 0x60;
pub const ADCON_SDCS_OFF: u8 = 0x00;
pub const ADCON_SDCS_0P5UA: u8 = 0x08;
pub const ADCON_SDCS_2UA: u8 = 0x10;
pub const ADCON_SDCS_10UA: u8 = 0x18;
pub const ADCON_PGA_MASK: u8 = 0x07;

/// Single-byte commands understood by the ADS1256.
///
/// RREG and WREG are not listed here since they carry an address and a
/// count byte; see [`CMD_RREG`] and [`CMD_WREG`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Complete SYNC and exit standby (0x00 form)
    Wakeup = CMD_WAKEUP,
    /// Read a single conversion result
    ReadData = CMD_RDATA,
    /// Start read data continuously
    ReadDataContinuous = CMD_RDATAC,
    /// Stop read data continuously
    StopReadDataContinuous = CMD_SDATAC,
    SelfCalibrate = CMD_SELFCAL,
    SelfOffsetCalibrate = CMD_SELFOCAL,
    SelfGainCalibrate = CMD_SELFGCAL,
    SystemOffsetCalibrate = CMD_SYSOCAL,
    SystemGainCalibrate = CMD_SYSGCAL,
    /// Synchronize the A/D conversion
    Sync = CMD_SYNC,
    /// Begin standby mode
    Standby = CMD_STANDBY,
    /// Reset registers to power-up values, also ends continuous mode
    Reset = CMD_RESET,
    /// Complete SYNC and exit standby (0xFF form)
    WakeupAlt = CMD_WAKEUP_ALT,
}

impl Command {
    /// Returns the opcode byte sent on the wire
    pub fn opcode(self) -> u8 {
        self as u8
    }

    /// Commands after which the device runs an internal routine and
    /// pulls DRDY low once done.
    pub fn needs_ready_wait(self) -> bool {
        matches!(
            self,
            Command::Reset
                | Command::SelfCalibrate
                | Command::SelfOffsetCalibrate
                | Command::SelfGainCalibrate
                | Command::SystemOffsetCalibrate
                | Command::SystemGainCalibrate
        )
    }
}

/// Register addresses of the ADS1256
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Register {
    Status = REG_STATUS,
    Mux = REG_MUX,
    Adcon = REG_ADCON,
    Drate = REG_DRATE,
    Io = REG_IO,
    Ofc0 = REG_OFC0,
    Ofc1 = REG_OFC1,
    Ofc2 = REG_OFC2,
    Fsc0 = REG_FSC0,
    Fsc1 = REG_FSC1,
    Fsc2 = REG_FSC2,
}

impl Register {
    pub const ALL: [Register; NUM_REGISTERS] = [
        Register::Status,
        Register::Mux,
        Register::Adcon,
        Register::Drate,
        Register::Io,
        Register::Ofc0,
        Register::Ofc1,
        Register::Ofc2,
        Register::Fsc0,
        Register::Fsc1,
        Register::Fsc2,
    ];

    pub fn addr(self) -> u8 {
        self as u8
    }

    pub fn from_addr(addr: u8) -> Option<Register> {
        Register::ALL.get(addr as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::Status => "STATUS",
            Register::Mux => "MUX",
            Register::Adcon => "ADCON",
            Register::Drate => "DRATE",
            Register::Io => "IO",
            Register::Ofc0 => "OFC0",
            Register::Ofc1 => "OFC1",
            Register::Ofc2 => "OFC2",
            Register::Fsc0 => "FSC0",
            Register::Fsc1 => "FSC1",
            Register::Fsc2 => "FSC2",
        }
    }
}

/// Gain settings for the ADS1256 programmable gain amplifier (PGA)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Gain {
    Gain1 = 0b000,
    Gain2 = 0b001,
    Gain4 = 0b010,
    Gain8 = 0b011,
    Gain16 = 0b100,
    Gain32 = 0b101,
    Gain64 = 0b110,
}

impl Gain {
    /// Returns the gain value as a floating-point number
    pub fn value(&self) -> f64 {
        match self {
            Gain::Gain1 => 1.0,
            Gain::Gain2 => 2.0,
            Gain::Gain4 => 4.0,
            Gain::Gain8 => 8.0,
            Gain::Gain16 => 16.0,
            Gain::Gain32 => 32.0,
            Gain::Gain64 => 64.0,
        }
    }

    /// PGA bits as written into ADCON
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Maps a gain code 0..=6 (x1..x64).
    pub fn from_code(code: u8) -> Option<Gain> {
        match code {
            0 => Some(Gain::Gain1),
            1 => Some(Gain::Gain2),
            2 => Some(Gain::Gain4),
            3 => Some(Gain::Gain8),
            4 => Some(Gain::Gain16),
            5 => Some(Gain::Gain32),
            6 => Some(Gain::Gain64),
            _ => None,
        }
    }
}

/// Data rate codes for the DRATE register, slowest to fastest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DataRate {
    Sps2_5 = 0x00,
    Sps5 = 0x01,
    Sps10 = 0x02,
    Sps15 = 0x03,
    Sps25 = 0x04,
    Sps30 = 0x05,
    Sps50 = 0x06,
    Sps60 = 0x07,
    Sps100 = 0x08,
    Sps500 = 0x09,
    Sps1000 = 0x0A,
    Sps2000 = 0x0B,
    Sps3750 = 0x0C,
    Sps7500 = 0x0D,
    Sps15000 = 0x0E,
    Sps30000 = 0x0F,
}

impl DataRate {
    const ALL: [DataRate; 16] = [
        DataRate::Sps2_5,
        DataRate::Sps5,
        DataRate::Sps10,
        DataRate::Sps15,
        DataRate::Sps25,
        DataRate::Sps30,
        DataRate::Sps50,
        DataRate::Sps60,
        DataRate::Sps100,
        DataRate::Sps500,
        DataRate::Sps1000,
        DataRate::Sps2000,
        DataRate::Sps3750,
        DataRate::Sps7500,
        DataRate::Sps15000,
        DataRate::Sps30000,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<DataRate> {
        DataRate::ALL.get(code as usize).copied()
    }

    /// Nominal samples per second
    pub fn sps(self) -> f64 {
        match self {
            DataRate::Sps2_5 => 2.5,
            DataRate::Sps5 => 5.0,
            DataRate::Sps10 => 10.0,
            DataRate::Sps15 => 15.0,
            DataRate::Sps25 => 25.0,
            DataRate::Sps30 => 30.0,
            DataRate::Sps50 => 50.0,
            DataRate::Sps60 => 60.0,
            DataRate::Sps100 => 100.0,
            DataRate::Sps500 => 500.0,
            DataRate::Sps1000 => 1000.0,
            DataRate::Sps2000 => 2000.0,
            DataRate::Sps3750 => 3750.0,
            DataRate::Sps7500 => 7500.0,
            DataRate::Sps15000 => 15000.0,
            DataRate::Sps30000 => 30000.0,
        }
    }
}

/// D0/CLKOUT pin divisor
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ClockOut {
    #[default]
    Off,
    Div1,
    Div2,
    Div4,
}

impl ClockOut {
    /// 0 = off, 1 = CLK/1, 2 = CLK/2, 3 = CLK/4; anything else is off.
    pub fn from_code(code: u8) -> ClockOut {
        match code {
            1 => ClockOut::Div1,
            2 => ClockOut::Div2,
            3 => ClockOut::Div4,
            _ => ClockOut::Off,
        }
    }

    /// ADCON bits 6-5
    pub fn bits(self) -> u8 {
        match self {
            ClockOut::Off => ADCON_CLK_OFF,
            ClockOut::Div1 => ADCON_CLK_DIV1,
            ClockOut::Div2 => ADCON_CLK_DIV2,
            ClockOut::Div4 => ADCON_CLK_DIV4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcodes_match_datasheet() {
        assert_eq!(Command::Wakeup.opcode(), 0x00);
        assert_eq!(Command::ReadData.opcode(), 0x01);
        assert_eq!(Command::ReadDataContinuous.opcode(), 0x03);
        assert_eq!(Command::StopReadDataContinuous.opcode(), 0x0F);
        assert_eq!(Command::SelfCalibrate.opcode(), 0xF0);
        assert_eq!(Command::SystemGainCalibrate.opcode(), 0xF4);
        assert_eq!(Command::Sync.opcode(), 0xFC);
        assert_eq!(Command::Standby.opcode(), 0xFD);
        assert_eq!(Command::Reset.opcode(), 0xFE);
        assert_eq!(Command::WakeupAlt.opcode(), 0xFF);
    }

    #[test]
    fn standby_does_not_wait_for_ready() {
        assert!(Command::Reset.needs_ready_wait());
        assert!(Command::SelfCalibrate.needs_ready_wait());
        assert!(!Command::Standby.needs_ready_wait());
        assert!(!Command::ReadDataContinuous.needs_ready_wait());
    }

    #[test]
    fn register_addresses() {
        for (i, reg) in Register::ALL.iter().enumerate() {
            assert_eq!(reg.addr() as usize, i);
            assert_eq!(Register::from_addr(i as u8), Some(*reg));
        }
        assert_eq!(Register::from_addr(11), None);
    }

    #[test]
    fn caller_codes() {
        assert_eq!(Gain::from_code(6), Some(Gain::Gain64));
        assert_eq!(Gain::from_code(7), None);
        assert_eq!(DataRate::from_code(0x00), Some(DataRate::Sps2_5));
        assert_eq!(DataRate::from_code(0x0F), Some(DataRate::Sps30000));
        assert_eq!(DataRate::from_code(0x10), None);
        assert_eq!(ClockOut::from_code(3).bits(), ADCON_CLK_DIV4);
        assert_eq!(ClockOut::from_code(9), ClockOut::Off);
    }
}
