use std::fmt;

use serde::{Deserialize, Serialize};

/// Minor units per major unit on the ledger.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// An amount in the ledger's minor unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lamports(pub u64);

impl Lamports {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// Major-unit rendering with two decimals, e.g. `"1.50 SOL"`.
    pub fn to_sol_string(&self) -> String {
        let sol = self.0 as f64 / LAMPORTS_PER_SOL as f64;
        format!("{sol:.2} SOL")
    }
}

impl fmt::Display for Lamports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lamports", self.0)
    }
}

/// A derived value that is either known or explicitly undetermined.
///
/// `Unknown` means the source data could not yield a value. It is never a
/// stand-in for zero or an empty string: `Known(Lamports(0))` and `Unknown`
/// are distinct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Determined<T> {
    Known(T),
    Unknown,
}

impl<T> Determined<T> {
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            Self::Unknown => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Known(v) => Some(v),
            Self::Unknown => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Determined<U> {
        match self {
            Self::Known(v) => Determined::Known(f(v)),
            Self::Unknown => Determined::Unknown,
        }
    }
}

impl<T> From<Option<T>> for Determined<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Known(v),
            None => Self::Unknown,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Determined<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(v) => v.fmt(f),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}
