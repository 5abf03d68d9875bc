//! # ct-lumi
//!
//! Luminosity bookkeeping for alignment validation plots:
//! - [`brilcalc`] drives `brilcalc lumi` once per year to produce per-run CSV
//!   tables;
//! - [`csv2txt`] turns those tables into the plain `run luminosity` text
//!   format read by the plotting scripts.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod brilcalc;
pub mod csv2txt;
pub mod error;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

pub use brilcalc::{Brilcalc, BrilcalcConfig, NormtagSet, NormtagTable};
pub use csv2txt::{convert, convert_file, output_path};
pub use error::{LumiError, Result};

/// Which luminosity column to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LumiType {
    /// Luminosity delivered by the LHC.
    #[default]
    Delivered,
    /// Luminosity recorded by CMS.
    Recorded,
}

impl LumiType {
    /// Lowercase name, also the substring looked for in CSV headers.
    pub fn as_str(self) -> &'static str {
        match self {
            LumiType::Delivered => "delivered",
            LumiType::Recorded => "recorded",
        }
    }
}

impl fmt::Display for LumiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LumiType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "delivered" => Ok(LumiType::Delivered),
            "recorded" => Ok(LumiType::Recorded),
            other => Err(format!("unknown luminosity type '{other}' (expected delivered or recorded)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lumi_type_parses_case_insensitively() {
        assert_eq!("Recorded".parse::<LumiType>().unwrap(), LumiType::Recorded);
        assert_eq!("delivered".parse::<LumiType>().unwrap(), LumiType::Delivered);
        assert!("integrated".parse::<LumiType>().is_err());
        assert_eq!(LumiType::default().to_string(), "delivered");
    }
}
