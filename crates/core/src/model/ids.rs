use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IdError;

/// Identifier of a reading plan, as published by the plan catalog.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlanId(String);

impl PlanId {
    /// Creates a new `PlanId`.
    ///
    /// # Errors
    ///
    /// Returns `IdError::EmptyPlanId` if the id is blank.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(IdError::EmptyPlanId);
        }
        Ok(Self(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PlanId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlanId> for String {
    fn from(id: PlanId) -> Self {
        id.0
    }
}

/// 1-based position of a day inside a reading plan.
///
/// Day `k` is the `k`-th element of the plan's day list; zero is not a valid day.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct DayNumber(u32);

impl DayNumber {
    pub const FIRST: Self = Self(1);

    /// Creates a new `DayNumber`.
    ///
    /// # Errors
    ///
    /// Returns `IdError::ZeroDay` for `0`.
    pub fn new(day: u32) -> Result<Self, IdError> {
        if day == 0 {
            return Err(IdError::ZeroDay);
        }
        Ok(Self(day))
    }

    /// Day number for a 0-based index into a plan's day list.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index)
            .ok()
            .and_then(|i| i.checked_add(1))
            .map(Self)
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// 0-based index into a plan's day list.
    #[must_use]
    pub fn index(&self) -> usize {
        usize::try_from(self.0 - 1).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl TryFrom<u32> for DayNumber {
    type Error = IdError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DayNumber> for u32 {
    fn from(day: DayNumber) -> Self {
        day.0
    }
}

impl fmt::Debug for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlanId({:?})", self.0)
    }
}

impl fmt::Debug for DayNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DayNumber({})", self.0)
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DayNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PlanId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for DayNumber {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().parse::<u32>().map_err(|_| IdError::Parse {
            kind: "DayNumber",
            raw: s.to_owned(),
        })?;
        Self::new(raw)
    }
}
