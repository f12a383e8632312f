//! Common utility for extended `std` type formatting
//!
//! These are left public for convenience.
//!
//! For example, prettier formatting for scientific numbers and the fixed-width
//! text fields of Fortran records are useful everywhere.

// standard library
use std::fmt::{Display, LowerExp};

// Alias for the format! macro out of laziness
pub use std::format as f;

/// Extends primitives with more specific formatting options
pub trait NumFormat {
    /// Better scientific number formatting
    ///
    /// The default is not very consistent for scientific in particular, so this
    /// allows easy definition.
    ///
    /// Works for anything that can be represented as scientific using the
    /// `LowerExp` trait, which is pretty much every numerical primitive.
    ///
    /// ```rust
    /// # use slftools_format::NumFormat;
    /// let number = -1.0;
    /// assert_eq!(number.sci(5, 2), "-1.00000e+00".to_string());
    /// assert_eq!((1.0).sci(5, 2), "1.00000e+00".to_string());
    /// ```
    fn sci(&self, precision: usize, exp_pad: usize) -> String;
}

impl<T: LowerExp> NumFormat for T {
    fn sci(&self, precision: usize, exp_pad: usize) -> String {
        let mut num = f!("{:.precision$e}", &self, precision = precision);
        let (mantissa_len, exp) = match num.find('e') {
            Some(i) => (i, num.split_off(i)),
            None => return num,
        };
        num.truncate(mantissa_len);
        // Make sure the exponent is signed
        let (sign, exp) = match exp.strip_prefix("e-") {
            Some(exp) => ('-', exp),
            None => ('+', &exp[1..]),
        };
        // Pad the exponent with zeros if needed and put it back on the number
        num.push_str(&f!("e{}{:0>pad$}", sign, exp, pad = exp_pad));
        num
    }
}

/// Extends Option for easy display formatting
pub trait OptionFormat {
    /// Better option outputs
    ///
    /// Generic over anything that implements `Display`, this will either be the
    /// value contained within `Some()` or "none" for the `None` variant.
    ///
    /// ```rust
    /// # use slftools_format::OptionFormat;
    /// let x: Option<u32> = Some(2);
    /// assert_eq!(x.display(), "2");
    ///
    /// let x: Option<u32> = None;
    /// assert_eq!(x.display(), "none");
    /// ```
    fn display(&self) -> String;
}

impl<T: Display> OptionFormat for Option<T> {
    fn display(&self) -> String {
        match self {
            Some(value) => f!("{value}"),
            None => "none".to_string(),
        }
    }
}

/// Pad or truncate text to exactly `width` bytes
///
/// Fortran text fields are fixed width and padded with trailing spaces. Only
/// ASCII survives the conversion, anything else is replaced with `?` so the
/// byte count is always exact.
///
/// ```rust
/// # use slftools_format::fixed_width;
/// assert_eq!(fixed_width("VELOCITY U", 16), b"VELOCITY U      ".to_vec());
/// assert_eq!(fixed_width("ABCDEFGH", 4), b"ABCD".to_vec());
/// ```
pub fn fixed_width(text: &str, width: usize) -> Vec<u8> {
    let mut bytes: Vec<u8> = text
        .chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .take(width)
        .collect();
    bytes.resize(width, b' ');
    bytes
}

/// Convert a fixed-width text field to a trimmed string
///
/// Trailing padding (spaces and nulls) is removed, leading whitespace is kept
/// as some tools use it for alignment.
///
/// ```rust
/// # use slftools_format::trim_field;
/// assert_eq!(trim_field(b"WATER DEPTH     "), "WATER DEPTH");
/// assert_eq!(trim_field(b"M\0\0\0"), "M");
/// ```
pub fn trim_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(|c: char| c == ' ' || c == '\0')
        .to_string()
}
