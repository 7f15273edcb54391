//! Basic types for the core module

use serde::{Deserialize, Serialize};

/// Bank account type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Everyday current account
    Checking,
    /// Savings account
    Savings,
    /// Credit card
    Credit,
    /// Brokerage or investment account
    Investment,
}

impl Default for AccountType {
    fn default() -> Self {
        AccountType::Checking
    }
}

impl AccountType {
    pub const ALL: [AccountType; 4] = [
        AccountType::Checking,
        AccountType::Savings,
        AccountType::Credit,
        AccountType::Investment,
    ];

    /// Capitalized label for listings
    pub fn label(&self) -> &'static str {
        match self {
            AccountType::Checking => "Checking",
            AccountType::Savings => "Savings",
            AccountType::Credit => "Credit",
            AccountType::Investment => "Investment",
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "checking" | "current" => Ok(AccountType::Checking),
            "savings" | "saving" => Ok(AccountType::Savings),
            "credit" | "credit_card" => Ok(AccountType::Credit),
            "investment" | "investments" => Ok(AccountType::Investment),
            _ => Err(format!("Invalid account type: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountType::Checking => write!(f, "checking"),
            AccountType::Savings => write!(f, "savings"),
            AccountType::Credit => write!(f, "credit"),
            AccountType::Investment => write!(f, "investment"),
        }
    }
}

/// Classification of a signed transaction amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    /// Amount >= 0
    Income,
    /// Amount < 0
    Expense,
}

impl std::fmt::Display for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Flow::Income => write!(f, "income"),
            Flow::Expense => write!(f, "expense"),
        }
    }
}
