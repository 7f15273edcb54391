//! Core data models shared with the REST backend

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{AccountType, Flow};

/// A record held by a resource store, addressed by its server identifier
pub trait Record: Clone + std::fmt::Debug + DeserializeOwned + Send + Sync + 'static {
    fn id(&self) -> Uuid;
}

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Bearer token issued by `/auth/login`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: String,
}

/// Bank account information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_type: AccountType,
    /// User-defined name
    #[serde(default)]
    pub account_name: Option<String>,
    /// Masked identifier, usually the last four digits
    #[serde(default)]
    pub account_identifier: Option<String>,
    pub is_active: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl BankAccount {
    /// Name for listings: the user's name, else the masked identifier, else the type
    pub fn display_name(&self) -> String {
        self.account_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.account_identifier.as_deref().filter(|s| !s.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| self.account_type.label().to_string())
    }
}

impl Record for BankAccount {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// A single signed money movement on a bank account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bank_account_id: Uuid,
    /// Positive for income, negative for expenses
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn flow(&self) -> Flow {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            Flow::Expense
        } else {
            Flow::Income
        }
    }

    pub fn is_income(&self) -> bool {
        self.flow() == Flow::Income
    }
}

impl Record for Transaction {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// List envelope returned by collection endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Default for PaginatedResponse<T> {
    fn default() -> Self {
        Self { items: Vec::new(), total: 0 }
    }
}

// ==================== Request payloads ====================

/// Body of `POST /bank-accounts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBankAccount {
    pub account_type: AccountType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_identifier: Option<String>,
    /// Token from the bank's API
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Body of `PATCH /bank-accounts/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankAccountPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Body of `POST /transactions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub bank_account_id: Uuid,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of `PATCH /transactions/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Server timestamps.
///
/// The backend emits naive ISO datetimes for columns stored without a zone;
/// those are taken as UTC. Output is always RFC 3339.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .map(|naive| Utc.from_utc_datetime(&naive))
            .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
    }
}
