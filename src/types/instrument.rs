//! Instrument classification shared by orders and positions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentType {
    Option,
    Future,
    Stock,
}

/// Margin product the position is carried under (intraday, carry-forward derivatives, delivery equity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductType {
    Mis,
    Nrml,
    Cnc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl InstrumentType {
    pub fn as_str(self) -> &'static str {
        match self {
            InstrumentType::Option => "option",
            InstrumentType::Future => "future",
            InstrumentType::Stock => "stock",
        }
    }

    /// Options and futures settle on an expiry date; stocks do not.
    pub fn is_derivative(self) -> bool {
        matches!(self, InstrumentType::Option | InstrumentType::Future)
    }
}

impl ProductType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductType::Mis => "MIS",
            ProductType::Nrml => "NRML",
            ProductType::Cnc => "CNC",
        }
    }
}

impl OptionType {
    pub fn as_str(self) -> &'static str {
        match self {
            OptionType::Call => "call",
            OptionType::Put => "put",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(InstrumentType, ProductType, OptionType);

impl FromStr for InstrumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "option" => Ok(InstrumentType::Option),
            "future" => Ok(InstrumentType::Future),
            "stock" => Ok(InstrumentType::Stock),
            other => Err(format!("unknown instrument type '{}'", other)),
        }
    }
}

impl FromStr for ProductType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MIS" => Ok(ProductType::Mis),
            "NRML" => Ok(ProductType::Nrml),
            "CNC" => Ok(ProductType::Cnc),
            other => Err(format!("unknown product type '{}'", other)),
        }
    }
}

impl FromStr for OptionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "call" => Ok(OptionType::Call),
            "put" => Ok(OptionType::Put),
            other => Err(format!("unknown option type '{}'", other)),
        }
    }
}
