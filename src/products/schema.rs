use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Balancing-market product, serialized under its wire name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Product {
    #[serde(rename = "FCR")]
    Fcr,
    #[serde(rename = "aFRRu")]
    AfrrUp,
    #[serde(rename = "aFRRd")]
    AfrrDown,
    #[serde(rename = "mFRRu")]
    MfrrUp,
    #[serde(rename = "mFRRd")]
    MfrrDown,
}

/// Which way a product regulates. FCR is symmetric and has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductDirection {
    Symmetric,
    Upward,
    Downward,
}

impl Product {
    pub const FULL_SET: [Product; 5] = [
        Product::Fcr,
        Product::AfrrUp,
        Product::AfrrDown,
        Product::MfrrUp,
        Product::MfrrDown,
    ];

    pub const REDUCED_SET: [Product; 4] = [
        Product::AfrrUp,
        Product::AfrrDown,
        Product::MfrrUp,
        Product::MfrrDown,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Fcr => "FCR",
            Self::AfrrUp => "aFRRu",
            Self::AfrrDown => "aFRRd",
            Self::MfrrUp => "mFRRu",
            Self::MfrrDown => "mFRRd",
        }
    }

    pub fn direction(&self) -> ProductDirection {
        match self {
            Self::Fcr => ProductDirection::Symmetric,
            Self::AfrrUp | Self::MfrrUp => ProductDirection::Upward,
            Self::AfrrDown | Self::MfrrDown => ProductDirection::Downward,
        }
    }
}

impl Display for Product {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown product: {0}")]
pub struct ProductParseError(pub String);

impl FromStr for Product {
    type Err = ProductParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "fcr" => Ok(Self::Fcr),
            "afrru" | "afrrup" => Ok(Self::AfrrUp),
            "afrrd" | "afrrdown" => Ok(Self::AfrrDown),
            "mfrru" | "mfrrup" => Ok(Self::MfrrUp),
            "mfrrd" | "mfrrdown" => Ok(Self::MfrrDown),
            _ => Err(ProductParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CalculatorVariant {
    Beks,
    P2h,
    P2g,
    Dsr,
}

impl CalculatorVariant {
    pub const ALL: [CalculatorVariant; 4] = [
        CalculatorVariant::Beks,
        CalculatorVariant::P2h,
        CalculatorVariant::P2g,
        CalculatorVariant::Dsr,
    ];

    /// Path segment appended to the backend base URL.
    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Beks => "beks",
            Self::P2h => "p2h",
            Self::P2g => "p2g",
            Self::Dsr => "dsr",
        }
    }

    pub fn product_set(&self) -> &'static [Product] {
        match self {
            Self::Beks | Self::P2h | Self::P2g => &Product::FULL_SET,
            Self::Dsr => &Product::REDUCED_SET,
        }
    }

    pub fn offers(&self, product: Product) -> bool {
        self.product_set().contains(&product)
    }

    /// BEKS serializes its eligibility flags as `"True"`/`"False"` strings.
    pub fn uses_string_flags(&self) -> bool {
        matches!(self, Self::Beks)
    }
}

impl Display for CalculatorVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Beks => "BEKS",
            Self::P2h => "P2H",
            Self::P2g => "P2G",
            Self::Dsr => "DSR",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown calculator variant: {0}")]
pub struct VariantParseError(pub String);

impl FromStr for CalculatorVariant {
    type Err = VariantParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beks" | "battery" => Ok(Self::Beks),
            "p2h" | "power-to-heat" => Ok(Self::P2h),
            "p2g" | "power-to-gas" => Ok(Self::P2g),
            "dsr" | "demand-response" => Ok(Self::Dsr),
            _ => Err(VariantParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum RegulationDirection {
    Up,
    Down,
    Both,
}

impl RegulationDirection {
    /// Lithuanian selector label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Up => "Aukštyn",
            Self::Down => "Žemyn",
            Self::Both => "Į abi puses",
        }
    }

    pub fn allows(&self, direction: ProductDirection) -> bool {
        match (self, direction) {
            (_, ProductDirection::Symmetric) | (Self::Both, _) => true,
            (Self::Up, ProductDirection::Upward) | (Self::Down, ProductDirection::Downward) => {
                true
            }
            _ => false,
        }
    }
}

impl Display for RegulationDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Both => "both",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("invalid regulation direction: {0:?} (expected up, down or both)")]
pub struct DirectionParseError(pub String);

impl FromStr for RegulationDirection {
    type Err = DirectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "up" | "upward" | "aukštyn" => Ok(Self::Up),
            "down" | "downward" | "žemyn" => Ok(Self::Down),
            "both" | "į abi puses" => Ok(Self::Both),
            _ => Err(DirectionParseError(s.to_string())),
        }
    }
}

impl TryFrom<String> for RegulationDirection {
    type Error = DirectionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RegulationDirection> for String {
    fn from(value: RegulationDirection) -> Self {
        value.to_string()
    }
}

/// Declared response latency band of the asset, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u32", into = "u32")]
pub enum ReactionTime {
    S30,
    S300,
    S750,
    S1000,
}

impl ReactionTime {
    pub const ALL: [ReactionTime; 4] = [
        ReactionTime::S30,
        ReactionTime::S300,
        ReactionTime::S750,
        ReactionTime::S1000,
    ];

    pub fn seconds(&self) -> u32 {
        match self {
            Self::S30 => 30,
            Self::S300 => 300,
            Self::S750 => 750,
            Self::S1000 => 1000,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::S30 => "<=30s",
            Self::S300 => "<=300s",
            Self::S750 => "<=750s",
            Self::S1000 => ">750s",
        }
    }
}

impl Display for ReactionTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.seconds())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("invalid reaction time: {0} (expected one of 30, 300, 750, 1000 seconds)")]
pub struct ReactionTimeError(pub String);

impl TryFrom<u32> for ReactionTime {
    type Error = ReactionTimeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            30 => Ok(Self::S30),
            300 => Ok(Self::S300),
            750 => Ok(Self::S750),
            1000 => Ok(Self::S1000),
            other => Err(ReactionTimeError(other.to_string())),
        }
    }
}

impl From<ReactionTime> for u32 {
    fn from(value: ReactionTime) -> Self {
        value.seconds()
    }
}

impl FromStr for ReactionTime {
    type Err = ReactionTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let seconds = s
            .trim()
            .trim_end_matches('s')
            .parse::<u32>()
            .map_err(|_| ReactionTimeError(s.to_string()))?;
        Self::try_from(seconds)
    }
}
