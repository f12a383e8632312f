//! The integer parameter block and optional reference date

// external crates
use serde::{Deserialize, Serialize};

/// Number of integer flags in the parameter block
pub(crate) const FLAG_COUNT: usize = 10;

/// Number of integers in the reference date block
pub(crate) const DATE_COUNT: usize = 6;

/// Integer parameter block following the variable names
///
/// TELEMAC calls this IPARAM. Only a few of the 10 flags mean anything:
///
/// | Index | Meaning                                           |
/// | ----- | ------------------------------------------------- |
/// | 6     | Number of planes for 3D results (0 or 1 for 2D)   |
/// | 9     | 1 if a six integer reference date block follows   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateBlock {
    /// Raw parameter flags
    pub flags: [i32; FLAG_COUNT],
    /// Raw reference date, present only if `flags[9] == 1`
    pub date: Option<[i32; DATE_COUNT]>,
}

impl DateBlock {
    /// Whether the reference date block should follow the flags
    pub fn has_date(&self) -> bool {
        self.flags[9] == 1
    }

    /// Number of planes, 1 for a 2D file
    pub fn nplan(&self) -> usize {
        self.flags[6].max(1) as usize
    }

    /// True for multi-plane (3D) results
    pub fn is_3d(&self) -> bool {
        self.nplan() > 1
    }

    /// Set the number of planes
    pub fn set_nplan(&mut self, nplan: usize) {
        self.flags[6] = if nplan > 1 { nplan as i32 } else { 0 };
    }

    /// Set the reference date and the flag announcing it
    pub fn set_reference_date(&mut self, date: ReferenceDate) {
        self.flags[9] = 1;
        self.date = Some(date.to_array());
    }

    /// Validated reference date
    ///
    /// Missing or nonsensical dates fall back to the unix epoch, as most files
    /// written without a date carry zeros here.
    pub fn reference_date(&self) -> ReferenceDate {
        self.date
            .map(ReferenceDate::from_array)
            .filter(ReferenceDate::is_valid)
            .unwrap_or_default()
    }
}

/// Calendar date and time of the first time step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDate {
    /// Calendar year
    pub year: i32,
    /// Month of the year, 1 to 12
    pub month: i32,
    /// Day of the month, from 1
    pub day: i32,
    /// Hour of the day, 0 to 23
    pub hour: i32,
    /// Minute, 0 to 59
    pub minute: i32,
    /// Second, 0 to 59
    pub second: i32,
}

impl Default for ReferenceDate {
    /// 1970-01-01 00:00:00
    fn default() -> Self {
        Self {
            year: 1970,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }
}

impl ReferenceDate {
    fn from_array(v: [i32; DATE_COUNT]) -> Self {
        Self {
            year: v[0],
            month: v[1],
            day: v[2],
            hour: v[3],
            minute: v[4],
            second: v[5],
        }
    }

    fn to_array(self) -> [i32; DATE_COUNT] {
        [
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        ]
    }

    /// Check every field is a real calendar value
    pub fn is_valid(&self) -> bool {
        (1..=9999).contains(&self.year)
            && (1..=12).contains(&self.month)
            && (1..=days_in_month(self.year, self.month)).contains(&self.day)
            && (0..24).contains(&self.hour)
            && (0..60).contains(&self.minute)
            && (0..60).contains(&self.second)
    }
}

fn days_in_month(year: i32, month: i32) -> i32 {
    match month {
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

impl std::fmt::Display for ReferenceDate {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}
