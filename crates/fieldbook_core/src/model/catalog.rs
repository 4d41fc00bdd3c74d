//! Closed catalogs consumed by callers: plans, due-days, payment methods and
//! customer status labels.
//!
//! # Invariants
//! - Wire tags (`as_str`) are stable; they are what SQLite rows and backup
//!   bundles carry.
//! - Parsing an unknown tag fails instead of falling back to a default.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Branches written into a brand new store.
pub const DEFAULT_BRANCHES: &[&str] = &["Iporanga", "Rio Preto", "Juquiaguassu"];

/// Tag that does not belong to the catalog it was parsed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTag {
    pub catalog: &'static str,
    pub value: String,
}

impl Display for UnknownTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {} `{}`", self.catalog, self.value)
    }
}

impl Error for UnknownTag {}

/// Service plan offered to customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Start,
    Master,
}

impl Plan {
    pub const ALL: &'static [Plan] = &[Plan::Start, Plan::Master];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Master => "master",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Start => "Start – R$150",
            Self::Master => "Master – R$179,90",
        }
    }
}

impl FromStr for Plan {
    type Err = UnknownTag;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|plan| plan.as_str() == value)
            .ok_or_else(|| UnknownTag {
                catalog: "plan",
                value: value.to_string(),
            })
    }
}

/// Billing day of the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DueDay {
    #[serde(rename = "5")]
    Day5,
    #[serde(rename = "10")]
    Day10,
    #[serde(rename = "15")]
    Day15,
    #[serde(rename = "20")]
    Day20,
    #[serde(rename = "25")]
    Day25,
    #[serde(rename = "30")]
    Day30,
}

impl DueDay {
    /// Ascending, the order callers display them in.
    pub const ALL: &'static [DueDay] = &[
        DueDay::Day5,
        DueDay::Day10,
        DueDay::Day15,
        DueDay::Day20,
        DueDay::Day25,
        DueDay::Day30,
    ];

    pub fn day(self) -> u8 {
        match self {
            Self::Day5 => 5,
            Self::Day10 => 10,
            Self::Day15 => 15,
            Self::Day20 => 20,
            Self::Day25 => 25,
            Self::Day30 => 30,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day5 => "5",
            Self::Day10 => "10",
            Self::Day15 => "15",
            Self::Day20 => "20",
            Self::Day25 => "25",
            Self::Day30 => "30",
        }
    }
}

impl FromStr for DueDay {
    type Err = UnknownTag;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|day| day.as_str() == trimmed)
            .ok_or_else(|| UnknownTag {
                catalog: "due day",
                value: value.to_string(),
            })
    }
}

/// How one installation payment slot was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Pix,
    Boleto,
}

impl PaymentMethod {
    pub const ALL: &'static [PaymentMethod] =
        &[PaymentMethod::Cash, PaymentMethod::Pix, PaymentMethod::Boleto];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Pix => "pix",
            Self::Boleto => "boleto",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::Pix => "PIX",
            Self::Boleto => "Boleto",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownTag;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|method| method.as_str() == value)
            .ok_or_else(|| UnknownTag {
                catalog: "payment method",
                value: value.to_string(),
            })
    }
}

/// Customer lifecycle state.
///
/// `NotInstalled -> Installed` on first installation, either of them
/// `-> Canceled` on cancel. `Canceled` never goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CustomerStatus {
    NotInstalled,
    Installed,
    Canceled,
}

impl CustomerStatus {
    pub const ALL: &'static [CustomerStatus] = &[
        CustomerStatus::NotInstalled,
        CustomerStatus::Installed,
        CustomerStatus::Canceled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotInstalled => "not-installed",
            Self::Installed => "installed",
            Self::Canceled => "canceled",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotInstalled => "Not installed",
            Self::Installed => "Installed",
            Self::Canceled => "Canceled",
        }
    }

    pub fn is_active(self) -> bool {
        self != Self::Canceled
    }
}

impl FromStr for CustomerStatus {
    type Err = UnknownTag;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownTag {
                catalog: "customer status",
                value: value.to_string(),
            })
    }
}

/// Enumerations handed to callers alongside every snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    /// Configured branches in display order.
    pub branches: Vec<String>,
    pub plans: &'static [Plan],
    pub due_days: &'static [DueDay],
    pub statuses: &'static [CustomerStatus],
    pub payment_methods: &'static [PaymentMethod],
}

impl Catalog {
    pub fn with_branches(branches: Vec<String>) -> Self {
        Self {
            branches,
            plans: Plan::ALL,
            due_days: DueDay::ALL,
            statuses: CustomerStatus::ALL,
            payment_methods: PaymentMethod::ALL,
        }
    }
}
