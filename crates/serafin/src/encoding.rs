//! Byte order and float precision of a Serafin file

// crate modules
use crate::error::Result;

// external crates
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Byte ordering of every value in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    /// Most significant byte first, the TELEMAC default
    #[default]
    Big,
    /// Least significant byte first
    Little,
}

/// Width of the real values in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FloatWidth {
    /// 4 byte reals (SERAFIN)
    #[default]
    Single,
    /// 8 byte reals (SERAFIND)
    Double,
}

impl FloatWidth {
    /// Number of bytes per value
    pub fn bytes(&self) -> usize {
        match self {
            Self::Single => 4,
            Self::Double => 8,
        }
    }

    /// Infer the width from a block holding `count` values
    pub fn from_block_length(length: usize, count: usize) -> Option<Self> {
        if length == 4 * count {
            Some(Self::Single)
        } else if length == 8 * count {
            Some(Self::Double)
        } else {
            None
        }
    }
}

/// Everything needed to turn raw bytes into numbers
///
/// Both properties are detected once from the header and hold for the whole
/// file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Encoding {
    /// Byte ordering
    pub byte_order: ByteOrder,
    /// Real value precision
    pub float_width: FloatWidth,
}

impl Encoding {
    /// New encoding from its two properties
    pub fn new(byte_order: ByteOrder, float_width: FloatWidth) -> Self {
        Self {
            byte_order,
            float_width,
        }
    }

    /// Decode a single 4 byte integer
    pub fn int(&self, bytes: [u8; 4]) -> i32 {
        match self.byte_order {
            ByteOrder::Big => i32::from_be_bytes(bytes),
            ByteOrder::Little => i32::from_le_bytes(bytes),
        }
    }

    /// Encode a single 4 byte integer
    pub fn int_bytes(&self, value: i32) -> [u8; 4] {
        match self.byte_order {
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
        }
    }

    /// Decode a single real value, `bytes` must be exactly one float wide
    pub fn float(&self, bytes: &[u8]) -> f64 {
        let mut single = [0u8; 4];
        let mut double = [0u8; 8];
        match (self.float_width, self.byte_order) {
            (FloatWidth::Single, ByteOrder::Big) => {
                single.copy_from_slice(bytes);
                f32::from_be_bytes(single) as f64
            }
            (FloatWidth::Single, ByteOrder::Little) => {
                single.copy_from_slice(bytes);
                f32::from_le_bytes(single) as f64
            }
            (FloatWidth::Double, ByteOrder::Big) => {
                double.copy_from_slice(bytes);
                f64::from_be_bytes(double)
            }
            (FloatWidth::Double, ByteOrder::Little) => {
                double.copy_from_slice(bytes);
                f64::from_le_bytes(double)
            }
        }
    }

    /// Decode a contiguous array of integers
    pub fn ints(&self, bytes: &[u8]) -> Vec<i32> {
        bytes
            .chunks_exact(4)
            .map(|c| self.int([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    /// Decode a contiguous array of reals
    pub fn floats(&self, bytes: &[u8]) -> Vec<f64> {
        bytes
            .chunks_exact(self.float_width.bytes())
            .map(|c| self.float(c))
            .collect()
    }

    /// Append encoded integers to `buffer`
    pub fn extend_ints(&self, values: &[i32], buffer: &mut Vec<u8>) {
        for v in values {
            buffer.extend_from_slice(&self.int_bytes(*v));
        }
    }

    /// Append encoded reals to `buffer`
    ///
    /// Single precision files lose precision here, exactly as TELEMAC does when
    /// writing REAL*4.
    pub fn extend_floats(&self, values: &[f64], buffer: &mut Vec<u8>) {
        for v in values {
            match (self.float_width, self.byte_order) {
                (FloatWidth::Single, ByteOrder::Big) => {
                    buffer.extend_from_slice(&(*v as f32).to_be_bytes())
                }
                (FloatWidth::Single, ByteOrder::Little) => {
                    buffer.extend_from_slice(&(*v as f32).to_le_bytes())
                }
                (FloatWidth::Double, ByteOrder::Big) => buffer.extend_from_slice(&v.to_be_bytes()),
                (FloatWidth::Double, ByteOrder::Little) => {
                    buffer.extend_from_slice(&v.to_le_bytes())
                }
            }
        }
    }

    /// Deserialise a fixed-layout block of integers into a struct
    ///
    /// Uses bincode with fixed-width integers so that struct fields map one to
    /// one onto the 4 byte values of the block.
    pub fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        let options = bincode::DefaultOptions::new().with_fixint_encoding();
        let value = match self.byte_order {
            ByteOrder::Big => options.with_big_endian().deserialize(bytes)?,
            ByteOrder::Little => options.with_little_endian().deserialize(bytes)?,
        };
        Ok(value)
    }

    /// Serialise a fixed-layout struct into its block content
    pub fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        let options = bincode::DefaultOptions::new().with_fixint_encoding();
        let bytes = match self.byte_order {
            ByteOrder::Big => options.with_big_endian().serialize(value)?,
            ByteOrder::Little => options.with_little_endian().serialize(value)?,
        };
        Ok(bytes)
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let order = match self.byte_order {
            ByteOrder::Big => "big endian",
            ByteOrder::Little => "little endian",
        };
        let width = match self.float_width {
            FloatWidth::Single => "single precision",
            FloatWidth::Double => "double precision",
        };
        write!(f, "{order}, {width}")
    }
}
