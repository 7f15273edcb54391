//! Resource stores: a fetched collection plus its mutation operations
//!
//! A [`ResourceStore`] keeps an ordered list of records in sync with a remote
//! collection. Every operation takes `&self`, so several can be in flight on
//! the same store at once; the state lock is never held across an `.await`.
//!
//! - `load` replaces the list wholesale; a response is dropped if a newer
//!   load was started after it.
//! - `create`, `update` and `remove` patch the list by identifier only after
//!   the backend confirms. A failure leaves the list as it was and fills the
//!   error slot.
//! - Pending flags are counters underneath: `is_creating` stays true until
//!   the last outstanding create settles.
//! - After [`ResourceStore::dispose`] responses still reach their callers but
//!   are never applied.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::analytics::{self, MonthlyBucket, Summary};
use crate::error::{ClientError, ClientResult, DefaultErrorLogger, ErrorContext, ErrorLogger};
use crate::filters::{AccountFilter, QueryFilter, QueryPairs, TransactionFilter};
use crate::models::{
    BankAccount, BankAccountPatch, NewBankAccount, NewTransaction, PaginatedResponse, Record,
    Transaction, TransactionPatch,
};

/// Describes a remote collection
pub trait Resource: Send + Sync + 'static {
    type Record: Record;
    type Create: Serialize + Send + Sync;
    type Patch: Serialize + Send + Sync;
    type Filter: QueryFilter + Clone + Default + Send + Sync;

    /// Collection path relative to the API root
    const PATH: &'static str;
    /// Name used in logs
    const LABEL: &'static str;
}

/// `/bank-accounts`
pub struct BankAccounts;

impl Resource for BankAccounts {
    type Record = BankAccount;
    type Create = NewBankAccount;
    type Patch = BankAccountPatch;
    type Filter = AccountFilter;

    const PATH: &'static str = "/bank-accounts";
    const LABEL: &'static str = "bank_accounts";
}

/// `/transactions`
pub struct Transactions;

impl Resource for Transactions {
    type Record = Transaction;
    type Create = NewTransaction;
    type Patch = TransactionPatch;
    type Filter = TransactionFilter;

    const PATH: &'static str = "/transactions";
    const LABEL: &'static str = "transactions";
}

/// Remote side of a store
#[async_trait]
pub trait ResourceBackend<R: Resource>: Send + Sync {
    async fn list(&self, query: &QueryPairs) -> ClientResult<PaginatedResponse<R::Record>>;
    async fn create(&self, data: &R::Create) -> ClientResult<R::Record>;
    async fn update(&self, id: Uuid, data: &R::Patch) -> ClientResult<R::Record>;
    async fn remove(&self, id: Uuid) -> ClientResult<()>;
}

#[async_trait]
impl<R, T> ResourceBackend<R> for Arc<T>
where
    R: Resource,
    T: ResourceBackend<R> + ?Sized,
{
    async fn list(&self, query: &QueryPairs) -> ClientResult<PaginatedResponse<R::Record>> {
        (**self).list(query).await
    }

    async fn create(&self, data: &R::Create) -> ClientResult<R::Record> {
        (**self).create(data).await
    }

    async fn update(&self, id: Uuid, data: &R::Patch) -> ClientResult<R::Record> {
        (**self).update(id, data).await
    }

    async fn remove(&self, id: Uuid) -> ClientResult<()> {
        (**self).remove(id).await
    }
}

/// Point-in-time copy of a store
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub is_loading: bool,
    pub is_creating: bool,
    pub is_updating: bool,
    pub is_deleting: bool,
    pub error: Option<ClientError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Load,
    Create,
    Update,
    Delete,
}

impl OpKind {
    fn name(&self) -> &'static str {
        match self {
            OpKind::Load => "load",
            OpKind::Create => "create",
            OpKind::Update => "update",
            OpKind::Delete => "delete",
        }
    }
}

#[derive(Debug, Default)]
struct Pending {
    loads: usize,
    creates: usize,
    updates: usize,
    deletes: usize,
}

impl Pending {
    fn slot(&mut self, kind: OpKind) -> &mut usize {
        match kind {
            OpKind::Load => &mut self.loads,
            OpKind::Create => &mut self.creates,
            OpKind::Update => &mut self.updates,
            OpKind::Delete => &mut self.deletes,
        }
    }
}

struct StoreInner<R: Resource> {
    items: Vec<R::Record>,
    total: u64,
    pending: Pending,
    error: Option<ClientError>,
    filters: R::Filter,
    /// Canonical key of the most recently requested load
    requested_key: Option<String>,
    load_seq: u64,
    disposed: bool,
}

/// Releases a pending slot when the operation settles or its future is dropped
struct PendingGuard<'a, R: Resource> {
    state: &'a Mutex<StoreInner<R>>,
    kind: OpKind,
}

impl<R: Resource> Drop for PendingGuard<'_, R> {
    fn drop(&mut self) {
        let mut inner = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let slot = inner.pending.slot(self.kind);
        *slot = slot.saturating_sub(1);
    }
}

/// Local mirror of a remote collection
pub struct ResourceStore<R: Resource, B> {
    backend: B,
    state: Mutex<StoreInner<R>>,
    logger: Box<dyn ErrorLogger>,
}

/// Store of the user's bank accounts
pub type AccountStore<B> = ResourceStore<BankAccounts, B>;
/// Store of the user's transactions
pub type TransactionStore<B> = ResourceStore<Transactions, B>;

impl<R, B> ResourceStore<R, B>
where
    R: Resource,
    B: ResourceBackend<R>,
{
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: Mutex::new(StoreInner {
                items: Vec::new(),
                total: 0,
                pending: Pending::default(),
                error: None,
                filters: R::Filter::default(),
                requested_key: None,
                load_seq: 0,
                disposed: false,
            }),
            logger: Box::new(DefaultErrorLogger),
        }
    }

    /// Replace the logger used for failed operations
    pub fn with_logger(mut self, logger: impl ErrorLogger + 'static) -> Self {
        self.logger = Box::new(logger);
        self
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner<R>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self, kind: OpKind) -> PendingGuard<'_, R> {
        *self.lock().pending.slot(kind) += 1;
        PendingGuard { state: &self.state, kind }
    }

    fn report(&self, kind: OpKind, error: &ClientError) {
        let context = ErrorContext::new(format!("{}.{}", R::LABEL, kind.name()));
        self.logger.log_error(error, &context);
    }

    /// Apply a settled mutation: the patch on success, the error slot on failure
    fn settle<T>(
        &self,
        kind: OpKind,
        result: ClientResult<T>,
        apply: impl FnOnce(&mut StoreInner<R>, &T),
    ) -> ClientResult<T> {
        let mut inner = self.lock();
        if inner.disposed {
            log::debug!("{}: store disposed, discarding {} response", R::LABEL, kind.name());
            return result;
        }
        match result {
            Ok(value) => {
                apply(&mut *inner, &value);
                inner.error = None;
                Ok(value)
            }
            Err(err) => {
                inner.error = Some(err.clone());
                drop(inner);
                self.report(kind, &err);
                Err(err)
            }
        }
    }

    // ==================== Fetching ====================

    /// Fetch the collection with `filters`, replacing the local list
    pub async fn load(&self, filters: R::Filter) -> ClientResult<()> {
        let query = filters.query_pairs();
        let key = filters.canonical_key();
        let seq = {
            let mut inner = self.lock();
            inner.filters = filters;
            inner.requested_key = Some(key.clone());
            inner.load_seq += 1;
            inner.load_seq
        };
        let _pending = self.begin(OpKind::Load);

        log::debug!("{}: loading [{}]", R::LABEL, key);
        let result = self.backend.list(&query).await;

        let superseded = self.lock().load_seq != seq;
        if superseded {
            log::debug!("{}: dropping superseded load [{}]", R::LABEL, key);
            return result.map(|_| ());
        }

        self.settle(OpKind::Load, result, |inner, page| {
            inner.items = page.items.clone();
            inner.total = page.total;
        })
        .map(|page| {
            log::debug!("{}: loaded {} of {}", R::LABEL, page.items.len(), page.total);
        })
    }

    /// Load only if the canonical form of `filters` differs from the last request.
    ///
    /// Returns whether a request was issued.
    pub async fn set_filters(&self, filters: R::Filter) -> ClientResult<bool> {
        let key = filters.canonical_key();
        let unchanged = self.lock().requested_key.as_deref() == Some(key.as_str());
        if unchanged {
            return Ok(false);
        }
        self.load(filters).await.map(|_| true)
    }

    /// Re-issue the last load regardless of filters
    pub async fn refresh(&self) -> ClientResult<()> {
        let filters = self.lock().filters.clone();
        self.load(filters).await
    }

    // ==================== Mutations ====================

    /// Create a record and append the server's copy
    pub async fn create(&self, data: R::Create) -> ClientResult<R::Record> {
        let _pending = self.begin(OpKind::Create);
        let result = self.backend.create(&data).await;
        self.settle(OpKind::Create, result, |inner, record| {
            let id = record.id();
            // A load that raced this create may already list the record
            match inner.items.iter_mut().find(|r| r.id() == id) {
                Some(existing) => *existing = record.clone(),
                None => {
                    inner.items.push(record.clone());
                    inner.total += 1;
                }
            }
        })
    }

    /// Patch a record and replace it in place
    pub async fn update(&self, id: Uuid, data: R::Patch) -> ClientResult<R::Record> {
        let _pending = self.begin(OpKind::Update);
        let result = self.backend.update(id, &data).await;
        self.settle(OpKind::Update, result, |inner, record| {
            if let Some(slot) = inner.items.iter_mut().find(|r| r.id() == id) {
                *slot = record.clone();
            }
        })
    }

    /// Delete a record and drop it from the list
    pub async fn remove(&self, id: Uuid) -> ClientResult<()> {
        let _pending = self.begin(OpKind::Delete);
        let result = self.backend.remove(id).await;
        self.settle(OpKind::Delete, result, |inner, _| {
            let before = inner.items.len();
            inner.items.retain(|r| r.id() != id);
            // A record outside the loaded page, or already dropped by a reload, was never counted
            if inner.items.len() < before {
                inner.total = inner.total.saturating_sub(1);
            }
        })
    }

    // ==================== State ====================

    pub fn snapshot(&self) -> StoreState<R::Record> {
        let inner = self.lock();
        StoreState {
            items: inner.items.clone(),
            total: inner.total,
            is_loading: inner.pending.loads > 0,
            is_creating: inner.pending.creates > 0,
            is_updating: inner.pending.updates > 0,
            is_deleting: inner.pending.deletes > 0,
            error: inner.error.clone(),
        }
    }

    pub fn items(&self) -> Vec<R::Record> {
        self.lock().items.clone()
    }

    pub fn total(&self) -> u64 {
        self.lock().total
    }

    pub fn find(&self, id: Uuid) -> Option<R::Record> {
        self.lock().items.iter().find(|r| r.id() == id).cloned()
    }

    pub fn filters(&self) -> R::Filter {
        self.lock().filters.clone()
    }

    pub fn error(&self) -> Option<ClientError> {
        self.lock().error.clone()
    }

    /// Dismiss the last error
    pub fn clear_error(&self) {
        self.lock().error = None;
    }

    pub fn is_loading(&self) -> bool {
        self.lock().pending.loads > 0
    }

    pub fn is_creating(&self) -> bool {
        self.lock().pending.creates > 0
    }

    pub fn is_updating(&self) -> bool {
        self.lock().pending.updates > 0
    }

    pub fn is_deleting(&self) -> bool {
        self.lock().pending.deletes > 0
    }

    /// Stop applying responses to this store
    pub fn dispose(&self) {
        self.lock().disposed = true;
        log::debug!("{}: store disposed", R::LABEL);
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }
}

impl<B: ResourceBackend<BankAccounts>> ResourceStore<BankAccounts, B> {
    /// Accounts still flagged active
    pub fn active(&self) -> Vec<BankAccount> {
        self.lock().items.iter().filter(|a| a.is_active).cloned().collect()
    }
}

impl<B: ResourceBackend<Transactions>> ResourceStore<Transactions, B> {
    /// Loaded transactions of one account
    pub fn for_account(&self, account_id: Uuid) -> Vec<Transaction> {
        self.lock()
            .items
            .iter()
            .filter(|t| t.bank_account_id == account_id)
            .cloned()
            .collect()
    }

    /// Totals over the loaded transactions
    pub fn summary(&self) -> Summary {
        analytics::summarize(&self.lock().items)
    }

    /// Monthly buckets over the loaded transactions, in local time
    pub fn monthly(&self) -> Vec<MonthlyBucket> {
        analytics::monthly_buckets(&self.lock().items)
    }

    /// Page through the whole collection until `id` shows up.
    ///
    /// The list stays on the page where the record was found, or on the last
    /// page when it was not.
    pub async fn locate(&self, id: Uuid, page_size: u32) -> ClientResult<Option<Transaction>> {
        let page_size = page_size.max(1);
        let mut skip = 0u32;
        loop {
            self.load(TransactionFilter::default().paginate(skip, page_size)).await?;
            if let Some(found) = self.find(id) {
                return Ok(Some(found));
            }
            let next = skip.saturating_add(page_size);
            if u64::from(next) >= self.total() || next == skip {
                return Ok(None);
            }
            skip = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::sync::oneshot;

    /// In-memory backend; calls can be held open until the test releases them
    #[derive(Default)]
    struct FakeBackend {
        records: Mutex<Vec<Transaction>>,
        list_calls: Mutex<Vec<QueryPairs>>,
        fail_next: Mutex<Option<ClientError>>,
        gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    }

    impl FakeBackend {
        fn with(records: Vec<Transaction>) -> Arc<Self> {
            Arc::new(Self { records: Mutex::new(records), ..Default::default() })
        }

        fn fail_next(&self, err: ClientError) {
            *self.fail_next.lock().unwrap() = Some(err);
        }

        /// Hold the next call until the returned sender fires
        fn gate(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().push_back(rx);
            tx
        }

        fn take_failure(&self) -> ClientResult<()> {
            match self.fail_next.lock().unwrap().take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        async fn enter(&self) -> ClientResult<()> {
            let gate = self.gates.lock().unwrap().pop_front();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.take_failure()
        }

        fn list_calls(&self) -> usize {
            self.list_calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ResourceBackend<Transactions> for FakeBackend {
        async fn list(&self, query: &QueryPairs) -> ClientResult<PaginatedResponse<Transaction>> {
            self.list_calls.lock().unwrap().push(query.clone());
            self.enter().await?;
            let account = query
                .iter()
                .find(|(k, _)| *k == "bank_account_id")
                .and_then(|(_, v)| Uuid::parse_str(v).ok());
            let number = |key: &str| {
                query.iter().find(|(k, _)| *k == key).and_then(|(_, v)| v.parse::<usize>().ok())
            };
            let matching: Vec<Transaction> = self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|t| account.map_or(true, |a| t.bank_account_id == a))
                .cloned()
                .collect();
            let total = matching.len() as u64;
            let items = matching
                .into_iter()
                .skip(number("skip").unwrap_or(0))
                .take(number("limit").unwrap_or(usize::MAX))
                .collect();
            Ok(PaginatedResponse { items, total })
        }

        /// Commits the record first; a gate only holds back the response
        async fn create(&self, data: &NewTransaction) -> ClientResult<Transaction> {
            let gate = self.gates.lock().unwrap().pop_front();
            self.take_failure()?;
            let record = tx_with(Uuid::new_v4(), data.bank_account_id, data.amount, data.description.clone());
            self.records.lock().unwrap().push(record.clone());
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok(record)
        }

        async fn update(&self, id: Uuid, data: &TransactionPatch) -> ClientResult<Transaction> {
            self.enter().await?;
            let mut records = self.records.lock().unwrap();
            let record = records
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| ClientError::NotFound { detail: "Transaction not found".to_string() })?;
            if let Some(amount) = data.amount {
                record.amount = amount;
            }
            if let Some(description) = &data.description {
                record.description = Some(description.clone());
            }
            Ok(record.clone())
        }

        async fn remove(&self, id: Uuid) -> ClientResult<()> {
            self.enter().await?;
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|t| t.id != id);
            if records.len() == before {
                return Err(ClientError::NotFound { detail: "Transaction not found".to_string() });
            }
            Ok(())
        }
    }

    fn tx_with(id: Uuid, account: Uuid, amount: Decimal, description: Option<String>) -> Transaction {
        Transaction {
            id,
            user_id: Uuid::nil(),
            bank_account_id: account,
            amount,
            description,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn tx(amount: i64) -> Transaction {
        tx_with(Uuid::new_v4(), Uuid::nil(), Decimal::from(amount), None)
    }

    fn new_tx(amount: i64) -> NewTransaction {
        NewTransaction { bank_account_id: Uuid::nil(), amount: Decimal::from(amount), description: None }
    }

    fn ids(store: &TransactionStore<Arc<FakeBackend>>) -> Vec<Uuid> {
        store.items().iter().map(|t| t.id).collect()
    }

    async fn loaded(records: Vec<Transaction>) -> (Arc<FakeBackend>, TransactionStore<Arc<FakeBackend>>) {
        let backend = FakeBackend::with(records);
        let store = TransactionStore::new(backend.clone());
        store.load(TransactionFilter::default()).await.unwrap();
        (backend, store)
    }

    #[tokio::test]
    async fn test_load_replaces_list_and_total() {
        let (_, store) = loaded(vec![tx(100), tx(-40)]).await;
        let state = store.snapshot();
        assert_eq!(state.items.len(), 2);
        assert_eq!(state.total, 2);
        assert!(!state.is_loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_list() {
        let (backend, store) = loaded(vec![tx(1)]).await;
        let before = store.items();
        backend.fail_next(ClientError::Network { message: "connection refused".to_string() });

        let err = store.refresh().await.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::Network);
        assert_eq!(store.items(), before);
        assert_eq!(store.error(), Some(err));
    }

    #[tokio::test]
    async fn test_load_twice_is_idempotent() {
        let (_, store) = loaded(vec![tx(3), tx(1), tx(2)]).await;
        let first = store.items();
        store.refresh().await.unwrap();
        assert_eq!(store.items(), first);
    }

    #[tokio::test]
    async fn test_set_filters_fetches_only_on_canonical_change() {
        let account = Uuid::new_v4();
        let backend = FakeBackend::with(vec![tx(1)]);
        let store = TransactionStore::new(backend.clone());

        assert!(store.set_filters(TransactionFilter::default().for_account(account)).await.unwrap());
        // New value, same canonical form
        assert!(!store.set_filters(TransactionFilter { bank_account_id: Some(account), ..Default::default() }).await.unwrap());
        assert_eq!(backend.list_calls(), 1);

        assert!(store.set_filters(TransactionFilter::default()).await.unwrap());
        assert_eq!(backend.list_calls(), 2);
        assert_eq!(store.filters(), TransactionFilter::default());
    }

    #[tokio::test]
    async fn test_create_appends_once_and_counts() {
        let (_, store) = loaded(vec![tx(10)]).await;
        let created = store.create(new_tx(25)).await.unwrap();

        let ids = ids(&store);
        assert_eq!(ids.iter().filter(|id| **id == created.id).count(), 1);
        assert_eq!(ids.last(), Some(&created.id));
        assert_eq!(store.total(), 2);
        assert!(!store.is_creating());
    }

    #[tokio::test]
    async fn test_create_failure_sets_error_and_leaves_list() {
        let (backend, store) = loaded(vec![tx(10)]).await;
        backend.fail_next(ClientError::Validation { status: 422, detail: "field required".to_string() });

        let err = store.create(new_tx(5)).await.unwrap_err();
        assert_eq!(err.user_message(), "field required");
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.total(), 1);
        assert_eq!(store.error(), Some(err));
    }

    #[tokio::test]
    async fn test_update_replaces_in_place() {
        let records = vec![tx(1), tx(2), tx(3)];
        let target = records[1].id;
        let (_, store) = loaded(records).await;
        let order = ids(&store);

        let patch = TransactionPatch { amount: Some(Decimal::from(-20)), description: Some("Groceries".to_string()) };
        store.update(target, patch).await.unwrap();

        assert_eq!(ids(&store), order);
        let items = store.items();
        assert_eq!(items[1].amount, Decimal::from(-20));
        assert_eq!(items[1].description.as_deref(), Some("Groceries"));
        assert_eq!(items[0].amount, Decimal::from(1));
        assert_eq!(items[2].amount, Decimal::from(3));
    }

    #[tokio::test]
    async fn test_remove_drops_record() {
        let records = vec![tx(1), tx(2), tx(3)];
        let target = records[0].id;
        let (_, store) = loaded(records).await;

        store.remove(target).await.unwrap();
        assert_eq!(store.items().len(), 2);
        assert!(store.find(target).is_none());
        assert_eq!(store.total(), 2);
    }

    #[tokio::test]
    async fn test_failed_remove_is_atomic() {
        let (_, store) = loaded(vec![tx(1)]).await;
        let err = store.remove(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.total(), 1);
        assert!(store.error().is_some());
    }

    #[tokio::test]
    async fn test_remove_outside_loaded_page_keeps_total() {
        let account = Uuid::new_v4();
        let other = tx(7);
        let other_id = other.id;
        let backend = FakeBackend::with(vec![tx_with(Uuid::new_v4(), account, Decimal::from(5), None), other]);
        let store = TransactionStore::new(backend.clone());
        store.load(TransactionFilter::default().for_account(account)).await.unwrap();
        assert_eq!((store.items().len(), store.total()), (1, 1));

        store.remove(other_id).await.unwrap();
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.total(), 1);
        assert!(store.total() >= store.items().len() as u64);
    }

    #[tokio::test]
    async fn test_locate_pages_past_the_first_page() {
        let records: Vec<Transaction> = (1..=5).map(tx).collect();
        let wanted = records[4].id;
        let backend = FakeBackend::with(records);
        let store = TransactionStore::new(backend.clone());

        let found = store.locate(wanted, 2).await.unwrap();
        assert_eq!(found.map(|t| t.id), Some(wanted));
        assert_eq!(backend.list_calls(), 3);
        assert_eq!(store.filters().skip, Some(4));
        assert_eq!(store.total(), 5);
    }

    #[tokio::test]
    async fn test_locate_missing_record_stops_after_last_page() {
        let (backend, store) = loaded((1..=3).map(tx).collect()).await;
        let calls = backend.list_calls();

        assert!(store.locate(Uuid::new_v4(), 2).await.unwrap().is_none());
        assert_eq!(backend.list_calls() - calls, 2);
    }

    #[tokio::test]
    async fn test_success_clears_previous_error() {
        let (backend, store) = loaded(vec![tx(1)]).await;
        backend.fail_next(ClientError::Server { status: 500, detail: "boom".to_string() });
        assert!(store.create(new_tx(1)).await.is_err());
        assert!(store.error().is_some());

        store.create(new_tx(1)).await.unwrap();
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn test_clear_error() {
        let (backend, store) = loaded(vec![]).await;
        backend.fail_next(ClientError::Server { status: 502, detail: "bad gateway".to_string() });
        let _ = store.refresh().await;
        store.clear_error();
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn test_delete_while_create_pending() {
        let records = vec![tx(1), tx(2)];
        let doomed = records[0].id;
        let (backend, store) = loaded(records).await;

        let release_create = backend.gate();
        let release_delete = backend.gate();

        let create = store.create(new_tx(50));
        let remove = store.remove(doomed);
        let release = async {
            tokio::task::yield_now().await;
            assert!(store.is_creating());
            assert!(store.is_deleting());
            // Settle in reverse order of issue
            release_delete.send(()).unwrap();
            tokio::task::yield_now().await;
            release_create.send(()).unwrap();
        };

        let (created, removed, _) = tokio::join!(create, remove, release);
        let created = created.unwrap();
        removed.unwrap();

        let ids = ids(&store);
        assert!(!ids.contains(&doomed));
        assert!(ids.contains(&created.id));
        assert_eq!(ids.len(), 2);
        assert_eq!(store.total(), 2);
        let state = store.snapshot();
        assert!(!state.is_creating && !state.is_deleting);
    }

    #[tokio::test]
    async fn test_create_seen_by_racing_load_is_counted_once() {
        let (backend, store) = loaded(vec![tx(1)]).await;
        let release = backend.gate();

        let create = store.create(new_tx(30));
        let reload = async {
            tokio::task::yield_now().await;
            // The server has committed the record; only its response is pending
            store.refresh().await.unwrap();
            assert_eq!(store.total(), 2);
            assert!(store.is_creating());
            release.send(()).unwrap();
        };
        let (created, _) = tokio::join!(create, reload);
        let created = created.unwrap();

        let ids = ids(&store);
        assert_eq!(ids.iter().filter(|id| **id == created.id).count(), 1);
        assert_eq!(ids.len(), 2);
        assert_eq!(store.total(), 2);
    }

    #[tokio::test]
    async fn test_creating_flag_spans_all_outstanding_creates() {
        let (backend, store) = loaded(vec![]).await;
        let first = backend.gate();
        let second = backend.gate();

        let a = store.create(new_tx(1));
        let b = store.create(new_tx(2));
        let drive = async {
            tokio::task::yield_now().await;
            first.send(()).unwrap();
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            // One create settled, the other is still out
            assert!(store.is_creating());
            second.send(()).unwrap();
        };
        let (a, b, _) = tokio::join!(a, b, drive);
        a.unwrap();
        b.unwrap();
        assert!(!store.is_creating());
        assert_eq!(store.total(), 2);
    }

    #[tokio::test]
    async fn test_superseded_load_is_discarded() {
        let account = Uuid::new_v4();
        let backend = FakeBackend::with(vec![tx(1), tx_with(Uuid::new_v4(), account, Decimal::from(9), None)]);
        let store = TransactionStore::new(backend.clone());

        let slow = backend.gate();
        let first = store.load(TransactionFilter::default());
        let second = async {
            tokio::task::yield_now().await;
            let result = store.load(TransactionFilter::default().for_account(account)).await;
            slow.send(()).unwrap();
            result
        };
        let (first, second) = tokio::join!(first, second);
        first.unwrap();
        second.unwrap();

        let items = store.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].bank_account_id, account);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_dispose_ignores_late_response() {
        let (backend, store) = loaded(vec![tx(1)]).await;
        let gate = backend.gate();

        let create = store.create(new_tx(7));
        let unmount = async {
            tokio::task::yield_now().await;
            store.dispose();
            gate.send(()).unwrap();
        };
        let (created, _) = tokio::join!(create, unmount);

        assert!(created.is_ok());
        assert!(store.is_disposed());
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.total(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_operation_releases_flag() {
        let (backend, store) = loaded(vec![]).await;
        let _held = backend.gate();

        let outcome = tokio::time::timeout(Duration::from_millis(20), store.create(new_tx(1))).await;
        assert!(outcome.is_err());
        assert!(!store.is_creating());
        assert_eq!(store.total(), 0);
    }

    #[tokio::test]
    async fn test_transaction_helpers() {
        let account = Uuid::new_v4();
        let records = vec![
            tx_with(Uuid::new_v4(), account, Decimal::from(100), None),
            tx_with(Uuid::new_v4(), Uuid::nil(), Decimal::from(-40), None),
            tx_with(Uuid::new_v4(), account, Decimal::from(25), None),
        ];
        let (_, store) = loaded(records).await;
        assert_eq!(store.for_account(account).len(), 2);
        let summary = store.summary();
        assert_eq!(summary.income, Decimal::from(125));
        assert_eq!(summary.expenses, Decimal::from(40));
        assert_eq!(summary.balance, Decimal::from(85));
        assert_eq!(store.monthly().iter().map(|b| b.balance).sum::<Decimal>(), Decimal::from(85));
    }
}
