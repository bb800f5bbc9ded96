#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::{
    ClockOut, DataRate, Gain, ADCON_PGA_MASK, ADCON_SDCS_OFF, STATUS_ACAL, STATUS_BUFEN,
};

/// User-level settings applied by [`Ads1256::initialize`](crate::Ads1256::initialize)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    pub data_rate: DataRate,
    pub gain: Gain,
    /// Enable the analog input buffer
    pub buffer_enabled: bool,
    /// Let the device self-calibrate after PGA, data rate or buffer changes
    pub auto_calibrate: bool,
    pub clock_out: ClockOut,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_rate: DataRate::Sps1000,
            gain: Gain::Gain1,
            buffer_enabled: false,
            auto_calibrate: false,
            clock_out: ClockOut::Off,
        }
    }
}

impl Config {
    pub fn with_data_rate(mut self, data_rate: DataRate) -> Self {
        self.data_rate = data_rate;
        self
    }

    pub fn with_gain(mut self, gain: Gain) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_buffer(mut self, enabled: bool) -> Self {
        self.buffer_enabled = enabled;
        self
    }

    pub fn with_auto_calibrate(mut self, enabled: bool) -> Self {
        self.auto_calibrate = enabled;
        self
    }

    pub fn with_clock_out(mut self, clock_out: ClockOut) -> Self {
        self.clock_out = clock_out;
        self
    }

    /// STATUS register value. ORDER stays 0 (MSB first), ID bits are read-only.
    pub fn status_byte(&self) -> u8 {
        let mut status = 0x00;
        if self.buffer_enabled {
            status |= STATUS_BUFEN;
        }
        if self.auto_calibrate {
            status |= STATUS_ACAL;
        }
        status
    }

    /// ADCON register value with the sensor detect current sources off.
    pub fn adcon_byte(&self) -> u8 {
        self.clock_out.bits() | ADCON_SDCS_OFF | (self.gain.bits() & ADCON_PGA_MASK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_register_bytes() {
        let cfg = Config::default();
        assert_eq!(cfg.status_byte(), 0x00);
        assert_eq!(cfg.adcon_byte(), 0x00);
        assert_eq!(cfg.data_rate.code(), 0x0A);
    }

    #[test]
    fn builder_register_bytes() {
        let cfg = Config::default()
            .with_buffer(true)
            .with_auto_calibrate(true)
            .with_clock_out(ClockOut::Div2)
            .with_gain(Gain::Gain64);
        assert_eq!(cfg.status_byte(), 0x06);
        assert_eq!(cfg.adcon_byte(), 0x46);
    }
}
