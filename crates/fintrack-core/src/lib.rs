//! Core client logic for fintrack
//!
//! Models mirror the REST backend's JSON; [`store`] keeps local copies of
//! remote collections in sync; [`analytics`] derives monthly reports from
//! loaded transactions. Transport lives in `fintrack-client`, which
//! implements [`store::ResourceBackend`].

pub mod analytics;
pub mod error;
pub mod filters;
pub mod form;
pub mod models;
pub mod session;
pub mod store;
pub mod time;
pub mod types;

pub use analytics::{monthly_buckets, monthly_buckets_in, summarize, MonthlyBucket, Summary};
pub use error::{ClientError, ClientResult, ErrorCode, ErrorDetails, ErrorSeverity};
pub use filters::{AccountFilter, QueryFilter, QueryPairs, TransactionFilter};
pub use form::{
    AccountForm, EditTransactionForm, FieldErrors, FormModel, FormState, LoginForm, SubmitOutcome,
    TransactionForm,
};
pub use models::{
    AuthToken, BankAccount, BankAccountPatch, NewBankAccount, NewTransaction, PaginatedResponse,
    Record, Transaction, TransactionPatch, User,
};
pub use session::{FileTokenStore, MemoryTokenStore, Session, SessionEvent, TokenStore};
pub use store::{
    AccountStore, BankAccounts, Resource, ResourceBackend, ResourceStore, StoreState,
    TransactionStore, Transactions,
};
pub use time::DateRange;
pub use types::{AccountType, Flow};
