use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::codec::to_volts;
use crate::constants::Gain;

/// Analog input selectable by the multiplexer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Channel {
    Ain0 = 0,
    Ain1 = 1,
    Ain2 = 2,
    Ain3 = 3,
    Ain4 = 4,
    Ain5 = 5,
    Ain6 = 6,
    Ain7 = 7,
    AinCom = 8,
}

impl Channel {
    /// The eight analog inputs, AINCOM excluded.
    pub const ANALOG: [Channel; 8] = [
        Channel::Ain0,
        Channel::Ain1,
        Channel::Ain2,
        Channel::Ain3,
        Channel::Ain4,
        Channel::Ain5,
        Channel::Ain6,
        Channel::Ain7,
    ];

    pub fn bits(self) -> u8 {
        self as u8
    }

    pub fn from_bits(bits: u8) -> Option<Channel> {
        match bits {
            8 => Some(Channel::AinCom),
            b => Channel::ANALOG.get(b as usize).copied(),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::AinCom => f.write_str("AINCOM"),
            ch => write!(f, "AIN{}", ch.bits()),
        }
    }
}

/// Positive/negative input selection for one differential conversion
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelPair {
    pub pos: Channel,
    pub neg: Channel,
}

impl ChannelPair {
    pub const fn new(pos: Channel, neg: Channel) -> Self {
        ChannelPair { pos, neg }
    }

    /// `channel` measured against AINCOM
    pub const fn single_ended(channel: Channel) -> Self {
        ChannelPair::new(channel, Channel::AinCom)
    }

    /// MUX register value: positive input in the high nibble, negative in the low.
    pub fn mux(self) -> u8 {
        (self.pos.bits() << 4) | (self.neg.bits() & 0x0F)
    }
}

impl fmt::Display for ChannelPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.pos, self.neg)
    }
}

/// A converted code and the pair it was read from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    pub pair: ChannelPair,
    pub code: i32,
}

impl Sample {
    pub fn volts(&self, v_ref: f64, gain: Gain) -> f64 {
        to_volts(self.code, v_ref, gain.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mux_nibbles() {
        assert_eq!(ChannelPair::single_ended(Channel::Ain0).mux(), 0x08);
        assert_eq!(ChannelPair::new(Channel::Ain3, Channel::Ain2).mux(), 0x32);
        assert_eq!(ChannelPair::new(Channel::AinCom, Channel::Ain7).mux(), 0x87);
    }

    #[test]
    fn channel_names() {
        assert_eq!(Channel::Ain5.to_string(), "AIN5");
        assert_eq!(ChannelPair::single_ended(Channel::Ain1).to_string(), "AIN1-AINCOM");
        assert_eq!(Channel::from_bits(8), Some(Channel::AinCom));
        assert_eq!(Channel::from_bits(9), None);
    }
}
