//! Command handlers

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use fintrack_client::ApiClient;
use fintrack_config::{Config, DateRangePreset};
use fintrack_core::{
    AccountFilter, AccountForm, AccountStore, BankAccount, BankAccountPatch, DateRange,
    EditTransactionForm, FieldErrors, FileTokenStore, FormModel, FormState, LoginForm, Session,
    SubmitOutcome, Transaction, TransactionFilter, TransactionForm, TransactionStore,
};
use fintrack_utils::{format_currency, format_date, format_month_label, truncate};
use uuid::Uuid;

use crate::{AccountCommand, Command, TransactionCommand};

struct Context<'a> {
    config: &'a Config,
    api: Arc<ApiClient>,
}

impl Context<'_> {
    fn accounts(&self) -> AccountStore<Arc<ApiClient>> {
        AccountStore::new(self.api.clone())
    }

    fn transactions(&self) -> TransactionStore<Arc<ApiClient>> {
        TransactionStore::new(self.api.clone())
    }

    fn money(&self, amount: rust_decimal::Decimal) -> String {
        format_currency(amount, &self.config.currency)
    }

    fn page(&self) -> u32 {
        self.config.pagination.page_size
    }
}

pub(crate) async fn run(config: &Config, command: Command) -> Result<()> {
    if let Command::Config = command {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let session = Arc::new(Session::init(FileTokenStore::new(&config.session.token_path)));
    let api = Arc::new(ApiClient::new(&config.api, session)?);
    let ctx = Context { config, api };

    match command {
        Command::Config => Ok(()),
        Command::Login { email, password } => login(&ctx, email, password).await,
        Command::Logout => {
            ctx.api.logout();
            println!("Logged out");
            Ok(())
        }
        Command::Whoami => {
            let user = ctx.api.current_user().await?;
            println!("{} ({})", user.email, user.id);
            Ok(())
        }
        Command::Accounts(cmd) => accounts(&ctx, cmd).await,
        Command::Transactions(cmd) => transactions(&ctx, cmd).await,
        Command::Analytics { range, account } => analytics(&ctx, range, account).await,
    }
}

/// Report a submission that did not go through
fn submit_result<T>(outcome: SubmitOutcome<T>, errors: &FieldErrors) -> Result<T> {
    match outcome {
        SubmitOutcome::Submitted(value) => Ok(value),
        SubmitOutcome::Failed(err) => Err(err.into()),
        SubmitOutcome::Invalid => {
            for (field, message) in errors {
                eprintln!("  {}: {}", field, message);
            }
            bail!("invalid input")
        }
    }
}

fn fill<M: FormModel>(form: &mut FormState<M>, values: &[(&str, String)]) {
    for (field, value) in values {
        form.set(field, value.clone());
    }
}

async fn login(ctx: &Context<'_>, email: String, password: String) -> Result<()> {
    let mut form = FormState::<LoginForm>::default();
    fill(&mut form, &[("email", email), ("password", password)]);

    let api = ctx.api.clone();
    let outcome = form
        .submit(|(email, password)| async move { api.login(&email, &password).await })
        .await;
    submit_result(outcome, form.errors())?;

    let user = ctx.api.current_user().await?;
    println!("Logged in as {}", user.email);
    Ok(())
}

// ==================== Accounts ====================

fn print_accounts(accounts: &[BankAccount]) {
    if accounts.is_empty() {
        println!("No accounts");
        return;
    }
    println!("{:<36}  {:<10}  {:<24}  {}", "ID", "TYPE", "NAME", "STATUS");
    for account in accounts {
        println!(
            "{:<36}  {:<10}  {:<24}  {}",
            account.id,
            account.account_type.label(),
            truncate(&account.display_name(), 24),
            if account.is_active { "active" } else { "inactive" }
        );
    }
}

async fn accounts(ctx: &Context<'_>, cmd: AccountCommand) -> Result<()> {
    let store = ctx.accounts();

    match cmd {
        AccountCommand::List { all } => {
            store.load(AccountFilter::default().paginate(0, ctx.page())).await?;
            let shown = if all { store.items() } else { store.active() };
            print_accounts(&shown);
            println!("{} of {} accounts", shown.len(), store.total());
        }
        AccountCommand::Add { account_type, access_token, name, identifier, refresh_token } => {
            let mut form = FormState::<AccountForm>::default();
            fill(
                &mut form,
                &[
                    ("account_type", account_type),
                    ("access_token", access_token),
                    ("account_name", name),
                    ("account_identifier", identifier),
                    ("refresh_token", refresh_token),
                ],
            );
            let outcome = form.submit(|payload| store.create(payload)).await;
            let account = submit_result(outcome, form.errors())?;
            println!("Added {} account {}", account.account_type.label(), account.id);
        }
        AccountCommand::Rename { id, name } => {
            let name = name.trim().to_string();
            if name.is_empty() {
                bail!("name cannot be empty");
            }
            let patch = BankAccountPatch { account_name: Some(name), is_active: None };
            let account = store.update(id, patch).await?;
            println!("Renamed {} to {}", account.id, account.display_name());
        }
        AccountCommand::Deactivate { id } => {
            let patch = BankAccountPatch { account_name: None, is_active: Some(false) };
            let account = store.update(id, patch).await?;
            println!("Deactivated {}", account.display_name());
        }
        AccountCommand::Remove { id } => {
            store.remove(id).await?;
            println!("Removed account {}", id);
        }
    }
    Ok(())
}

// ==================== Transactions ====================

fn transaction_filter(ctx: &Context<'_>, account: Option<Uuid>, range: DateRangePreset) -> TransactionFilter {
    let mut filter = TransactionFilter::default()
        .between(DateRange::from_preset(range))
        .paginate(0, ctx.page());
    filter.bank_account_id = account;
    filter
}

fn print_transactions(ctx: &Context<'_>, transactions: &[Transaction]) {
    if transactions.is_empty() {
        println!("No transactions");
        return;
    }
    println!("{:<36}  {:<10}  {:>14}  {}", "ID", "DATE", "AMOUNT", "DESCRIPTION");
    for tx in transactions {
        println!(
            "{:<36}  {:<10}  {:>14}  {}",
            tx.id,
            format_date(&tx.created_at),
            ctx.money(tx.amount),
            truncate(tx.description.as_deref().unwrap_or("-"), 40)
        );
    }
}

async fn transactions(ctx: &Context<'_>, cmd: TransactionCommand) -> Result<()> {
    let store = ctx.transactions();

    match cmd {
        TransactionCommand::List { account, range } => {
            let range = range.unwrap_or(ctx.config.analytics.default_range);
            store.load(transaction_filter(ctx, account, range)).await?;
            print_transactions(ctx, &store.items());

            let summary = store.summary();
            println!(
                "{} of {} transactions ({}): income {}, expenses {}, balance {}",
                summary.count,
                store.total(),
                range.label(),
                ctx.money(summary.income),
                ctx.money(summary.expenses),
                ctx.money(summary.balance)
            );
        }
        TransactionCommand::Add { account, amount, description } => {
            let mut form = FormState::<TransactionForm>::default();
            fill(
                &mut form,
                &[("bank_account_id", account), ("amount", amount), ("description", description)],
            );
            let outcome = form.submit(|payload| store.create(payload)).await;
            let tx = submit_result(outcome, form.errors())?;
            println!("Added {} ({})", tx.id, ctx.money(tx.amount));
        }
        TransactionCommand::Edit { id, amount, description } => {
            // No single-record endpoint: prefill from the list, page by page
            let current = store
                .locate(id, ctx.page())
                .await?
                .ok_or_else(|| anyhow!("transaction {} not found", id))?;

            let mut form = FormState::new(EditTransactionForm::from_transaction(&current));
            if let Some(amount) = amount {
                form.set("amount", amount);
            }
            if let Some(description) = description {
                form.set("description", description);
            }
            let outcome = form.submit(|patch| store.update(id, patch)).await;
            let tx = submit_result(outcome, form.errors())?;
            println!("Updated {} ({})", tx.id, ctx.money(tx.amount));
        }
        TransactionCommand::Remove { id } => {
            store.remove(id).await?;
            println!("Removed transaction {}", id);
        }
    }
    Ok(())
}

// ==================== Analytics ====================

async fn analytics(ctx: &Context<'_>, range: Option<DateRangePreset>, account: Option<Uuid>) -> Result<()> {
    let range = range.unwrap_or(ctx.config.analytics.default_range);
    let store = ctx.transactions();
    store.load(transaction_filter(ctx, account, range)).await?;

    let buckets = store.monthly();
    println!("{}", DateRange::from_preset(range).description());
    if buckets.is_empty() {
        println!("No activity");
        return Ok(());
    }

    println!("{:<16}  {:>14}  {:>14}  {:>14}  {:>14}", "MONTH", "INCOME", "EXPENSES", "NET", "RUNNING");
    for bucket in &buckets {
        println!(
            "{:<16}  {:>14}  {:>14}  {:>14}  {:>14}",
            format_month_label(&bucket.month),
            ctx.money(bucket.income),
            ctx.money(bucket.expenses),
            ctx.money(bucket.balance),
            ctx.money(bucket.running_balance)
        );
    }

    let summary = store.summary();
    println!(
        "Total: income {}, expenses {}, balance {} over {} transactions",
        ctx.money(summary.income),
        ctx.money(summary.expenses),
        ctx.money(summary.balance),
        summary.count
    );
    Ok(())
}
