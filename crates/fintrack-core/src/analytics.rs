//! Spending analytics derived from a list of transactions

use chrono::{Datelike, TimeZone};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::Transaction;

/// One calendar month of activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    /// `YYYY-MM` in the reporting time zone
    pub month: String,
    /// Sum of non-negative amounts
    pub income: Decimal,
    /// Sum of the absolute values of negative amounts
    pub expenses: Decimal,
    /// Signed net of the month
    pub balance: Decimal,
    /// Signed total of every transaction up to the end of this month
    pub running_balance: Decimal,
}

impl MonthlyBucket {
    fn empty(month: String) -> Self {
        Self {
            month,
            income: Decimal::ZERO,
            expenses: Decimal::ZERO,
            balance: Decimal::ZERO,
            running_balance: Decimal::ZERO,
        }
    }

    fn add(&mut self, amount: Decimal) {
        if amount.is_sign_negative() && !amount.is_zero() {
            self.expenses += amount.abs();
        } else {
            self.income += amount;
        }
        self.balance += amount;
    }
}

/// Totals over a whole list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub income: Decimal,
    pub expenses: Decimal,
    pub balance: Decimal,
    pub count: usize,
}

/// Group transactions by the month of `created_at` as seen in `tz`.
///
/// Rows come back sorted by month key, one per month that has activity.
pub fn monthly_buckets_in<Tz: TimeZone>(transactions: &[Transaction], tz: &Tz) -> Vec<MonthlyBucket> {
    let mut buckets: BTreeMap<String, MonthlyBucket> = BTreeMap::new();

    for tx in transactions {
        let local = tx.created_at.with_timezone(tz);
        let key = format!("{:04}-{:02}", local.year(), local.month());
        buckets
            .entry(key)
            .or_insert_with_key(|k| MonthlyBucket::empty(k.clone()))
            .add(tx.amount);
    }

    let mut running = Decimal::ZERO;
    buckets
        .into_values()
        .map(|mut bucket| {
            running += bucket.balance;
            bucket.running_balance = running;
            bucket
        })
        .collect()
}

/// [`monthly_buckets_in`] using the machine's local time zone
pub fn monthly_buckets(transactions: &[Transaction]) -> Vec<MonthlyBucket> {
    monthly_buckets_in(transactions, &chrono::Local)
}

/// Income, expenses and net balance over every transaction
pub fn summarize(transactions: &[Transaction]) -> Summary {
    let mut bucket = MonthlyBucket::empty(String::new());
    for tx in transactions {
        bucket.add(tx.amount);
    }
    Summary {
        income: bucket.income,
        expenses: bucket.expenses,
        balance: bucket.balance,
        count: transactions.len(),
    }
}
