//! Form state: raw field values, validation and submission
//!
//! Field values are kept as the strings a user typed. A [`FormModel`] knows
//! its fields, how to validate them and how to turn valid input into a
//! request payload; [`FormState`] tracks errors and the submission outcome
//! around it.

use std::collections::BTreeMap;
use std::future::Future;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::models::{NewBankAccount, NewTransaction, Transaction, TransactionPatch};
use crate::types::AccountType;

/// Validation messages keyed by field name
pub type FieldErrors = BTreeMap<&'static str, String>;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("valid email regex"));

const MAX_DESCRIPTION_CHARS: usize = 255;

/// Field set of one form
pub trait FormModel: Clone + Default {
    type Payload;

    const FIELDS: &'static [&'static str];

    fn get(&self, field: &str) -> Option<&str>;

    /// Store a value; returns false for an unknown field
    fn set(&mut self, field: &str, value: String) -> bool;

    fn validate(&self) -> FieldErrors;

    /// Request payload for valid input
    fn to_payload(&self) -> Result<Self::Payload, FieldErrors>;
}

/// Result of [`FormState::submit`]
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome<T> {
    /// Validation failed; the handler was not called
    Invalid,
    Submitted(T),
    Failed(ClientError),
}

impl<T> SubmitOutcome<T> {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmitOutcome::Submitted(_))
    }
}

#[derive(Debug, Clone)]
pub struct FormState<M: FormModel> {
    initial: M,
    values: M,
    errors: FieldErrors,
    is_submitting: bool,
    submit_error: Option<String>,
}

impl<M: FormModel> Default for FormState<M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

impl<M: FormModel> FormState<M> {
    pub fn new(initial: M) -> Self {
        Self {
            values: initial.clone(),
            initial,
            errors: FieldErrors::new(),
            is_submitting: false,
            submit_error: None,
        }
    }

    pub fn values(&self) -> &M {
        &self.values
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    /// Message of the last failed submission
    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    /// Update a field and clear its error
    pub fn set(&mut self, field: &str, value: impl Into<String>) -> bool {
        if !self.values.set(field, value.into()) {
            log::warn!("Ignoring unknown form field: {}", field);
            return false;
        }
        self.errors.remove(field);
        true
    }

    /// Recompute every field error; true when the form is valid
    pub fn validate(&mut self) -> bool {
        self.errors = self.values.validate();
        self.errors.is_empty()
    }

    /// Validate, then hand the payload to `handler`
    pub async fn submit<F, Fut, T>(&mut self, handler: F) -> SubmitOutcome<T>
    where
        F: FnOnce(M::Payload) -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let payload = match self.values.to_payload() {
            Ok(payload) => payload,
            Err(errors) => {
                self.errors = errors;
                return SubmitOutcome::Invalid;
            }
        };
        self.errors.clear();

        self.is_submitting = true;
        let result = handler(payload).await;
        self.is_submitting = false;

        match result {
            Ok(value) => {
                self.submit_error = None;
                SubmitOutcome::Submitted(value)
            }
            Err(err) => {
                self.submit_error = Some(err.user_message());
                SubmitOutcome::Failed(err)
            }
        }
    }

    /// Restore the initial values and drop all errors
    pub fn reset(&mut self) {
        self.values = self.initial.clone();
        self.errors.clear();
        self.submit_error = None;
    }
}

// ==================== Rules ====================

fn required(errors: &mut FieldErrors, field: &'static str, value: &str, message: &str) -> bool {
    if value.trim().is_empty() {
        errors.insert(field, message.to_string());
        false
    } else {
        true
    }
}

fn parse_amount(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn check_amount(errors: &mut FieldErrors, raw: &str) {
    if !required(errors, "amount", raw, "Amount is required") {
        return;
    }
    match parse_amount(raw) {
        None => {
            errors.insert("amount", "Amount must be a number".to_string());
        }
        Some(amount) if amount.is_zero() => {
            errors.insert("amount", "Amount cannot be zero".to_string());
        }
        Some(_) => {}
    }
}

fn check_description(errors: &mut FieldErrors, raw: &str) {
    if raw.chars().count() > MAX_DESCRIPTION_CHARS {
        errors.insert(
            "description",
            "Description must be less than 255 characters".to_string(),
        );
    }
}

fn optional(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn ensure_valid(errors: FieldErrors) -> Result<(), FieldErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn field_error(field: &'static str, message: &str) -> FieldErrors {
    FieldErrors::from([(field, message.to_string())])
}

// ==================== Models ====================

/// Credentials for `/auth/login`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl FormModel for LoginForm {
    type Payload = (String, String);

    const FIELDS: &'static [&'static str] = &["email", "password"];

    fn get(&self, field: &str) -> Option<&str> {
        match field {
            "email" => Some(&self.email),
            "password" => Some(&self.password),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: String) -> bool {
        match field {
            "email" => self.email = value,
            "password" => self.password = value,
            _ => return false,
        }
        true
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if required(&mut errors, "email", &self.email, "Email is required")
            && !EMAIL_RE.is_match(&self.email)
        {
            errors.insert("email", "Email is invalid".to_string());
        }
        if self.password.is_empty() {
            errors.insert("password", "Password is required".to_string());
        }
        errors
    }

    fn to_payload(&self) -> Result<Self::Payload, FieldErrors> {
        ensure_valid(self.validate())?;
        Ok((self.email.trim().to_string(), self.password.clone()))
    }
}

/// New bank account
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountForm {
    pub account_type: String,
    pub account_name: String,
    pub account_identifier: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl FormModel for AccountForm {
    type Payload = NewBankAccount;

    const FIELDS: &'static [&'static str] = &[
        "account_type",
        "account_name",
        "account_identifier",
        "access_token",
        "refresh_token",
    ];

    fn get(&self, field: &str) -> Option<&str> {
        match field {
            "account_type" => Some(&self.account_type),
            "account_name" => Some(&self.account_name),
            "account_identifier" => Some(&self.account_identifier),
            "access_token" => Some(&self.access_token),
            "refresh_token" => Some(&self.refresh_token),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: String) -> bool {
        match field {
            "account_type" => self.account_type = value,
            "account_name" => self.account_name = value,
            "account_identifier" => self.account_identifier = value,
            "access_token" => self.access_token = value,
            "refresh_token" => self.refresh_token = value,
            _ => return false,
        }
        true
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if required(&mut errors, "account_type", &self.account_type, "Account type is required")
            && AccountType::from_str(&self.account_type).is_err()
        {
            errors.insert("account_type", "Account type is required".to_string());
        }
        required(&mut errors, "access_token", &self.access_token, "Access token is required");
        errors
    }

    fn to_payload(&self) -> Result<Self::Payload, FieldErrors> {
        ensure_valid(self.validate())?;
        let account_type = AccountType::from_str(&self.account_type)
            .map_err(|_| field_error("account_type", "Account type is required"))?;
        Ok(NewBankAccount {
            account_type,
            account_name: optional(&self.account_name),
            account_identifier: optional(&self.account_identifier),
            access_token: self.access_token.trim().to_string(),
            refresh_token: optional(&self.refresh_token),
        })
    }
}

/// New transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionForm {
    pub bank_account_id: String,
    pub amount: String,
    pub description: String,
}

impl FormModel for TransactionForm {
    type Payload = NewTransaction;

    const FIELDS: &'static [&'static str] = &["bank_account_id", "amount", "description"];

    fn get(&self, field: &str) -> Option<&str> {
        match field {
            "bank_account_id" => Some(&self.bank_account_id),
            "amount" => Some(&self.amount),
            "description" => Some(&self.description),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: String) -> bool {
        match field {
            "bank_account_id" => self.bank_account_id = value,
            "amount" => self.amount = value,
            "description" => self.description = value,
            _ => return false,
        }
        true
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if required(&mut errors, "bank_account_id", &self.bank_account_id, "Account is required")
            && Uuid::parse_str(self.bank_account_id.trim()).is_err()
        {
            errors.insert("bank_account_id", "Account is invalid".to_string());
        }
        check_amount(&mut errors, &self.amount);
        check_description(&mut errors, &self.description);
        errors
    }

    fn to_payload(&self) -> Result<Self::Payload, FieldErrors> {
        ensure_valid(self.validate())?;
        let bank_account_id = Uuid::parse_str(self.bank_account_id.trim())
            .map_err(|_| field_error("bank_account_id", "Account is invalid"))?;
        let amount = parse_amount(&self.amount)
            .ok_or_else(|| field_error("amount", "Amount must be a number"))?;
        Ok(NewTransaction {
            bank_account_id,
            amount,
            description: optional(&self.description),
        })
    }
}

/// Changes to an existing transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditTransactionForm {
    pub amount: String,
    pub description: String,
}

impl EditTransactionForm {
    /// Prefill from the record being edited
    pub fn from_transaction(tx: &Transaction) -> Self {
        Self {
            amount: tx.amount.to_string(),
            description: tx.description.clone().unwrap_or_default(),
        }
    }
}

impl FormModel for EditTransactionForm {
    type Payload = TransactionPatch;

    const FIELDS: &'static [&'static str] = &["amount", "description"];

    fn get(&self, field: &str) -> Option<&str> {
        match field {
            "amount" => Some(&self.amount),
            "description" => Some(&self.description),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: String) -> bool {
        match field {
            "amount" => self.amount = value,
            "description" => self.description = value,
            _ => return false,
        }
        true
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        check_amount(&mut errors, &self.amount);
        check_description(&mut errors, &self.description);
        errors
    }

    fn to_payload(&self) -> Result<Self::Payload, FieldErrors> {
        ensure_valid(self.validate())?;
        let amount = parse_amount(&self.amount)
            .ok_or_else(|| field_error("amount", "Amount must be a number"))?;
        Ok(TransactionPatch {
            amount: Some(amount),
            description: optional(&self.description),
        })
    }
}
