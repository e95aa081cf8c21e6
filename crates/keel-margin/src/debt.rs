//! Borrowing, interest accrual and repayment.
//!
//! The ledger is append-only: every borrow, repayment and interest accrual is
//! an entry, and balances are the running result of those entries.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use keel_config::RepaymentPolicy;
use keel_core::{AnalyticsError, AnalyticsResult, Symbol};
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Decimal places kept for interest amounts.
const INTEREST_DP: u32 = 10;

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtEntryKind {
    /// New principal borrowed.
    Borrow,
    /// Principal or interest paid back.
    Repay,
    /// Interest charged on the outstanding balance.
    InterestAccrual,
}

impl fmt::Display for DebtEntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Borrow => f.write_str("borrow"),
            Self::Repay => f.write_str("repay"),
            Self::InterestAccrual => f.write_str("interest"),
        }
    }
}

/// An immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtEntry {
    /// Unique entry id.
    pub id: Uuid,
    /// Symbol the debt finances.
    pub symbol: Symbol,
    /// Entry kind.
    pub kind: DebtEntryKind,
    /// Amount of the entry (always positive).
    pub amount: Decimal,
    /// Principal after the entry.
    pub principal_after: Decimal,
    /// Accrued interest after the entry.
    pub interest_after: Decimal,
    /// Entry time.
    pub timestamp: DateTime<Utc>,
}

/// Outstanding debt of one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtBalance {
    /// Borrowed principal outstanding.
    pub principal: Decimal,
    /// Interest accrued and not yet repaid.
    pub accrued_interest: Decimal,
    /// Time up to which interest has been charged.
    pub accrued_through: DateTime<Utc>,
}

impl DebtBalance {
    /// Principal plus accrued interest.
    pub fn total(&self) -> Decimal {
        self.principal + self.accrued_interest
    }
}

/// How a repayment was split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentAllocation {
    /// Part applied to principal.
    pub principal: Decimal,
    /// Part applied to accrued interest.
    pub interest: Decimal,
}

/// Append-only debt ledger.
///
/// Interest compounds daily on principal plus accrued interest, charged per
/// whole elapsed day; a partial day carries over to the next accrual.
#[derive(Debug, Clone)]
pub struct DebtLedger {
    daily_rate: Decimal,
    policy: RepaymentPolicy,
    entries: Vec<DebtEntry>,
    balances: BTreeMap<Symbol, DebtBalance>,
}

impl DebtLedger {
    /// Creates an empty ledger.
    pub fn new(daily_rate: Decimal, policy: RepaymentPolicy) -> AnalyticsResult<Self> {
        if daily_rate.is_sign_negative() {
            return Err(AnalyticsError::invalid_parameter(
                "daily_interest_rate",
                daily_rate,
                "must not be negative",
            ));
        }
        Ok(Self {
            daily_rate,
            policy,
            entries: Vec::new(),
            balances: BTreeMap::new(),
        })
    }

    /// Repayment policy in force.
    pub fn policy(&self) -> RepaymentPolicy {
        self.policy
    }

    /// Borrows `amount` against `symbol`.
    ///
    /// Interest on any existing balance is charged up to `at` first, so the
    /// new principal only earns interest from `at` onward.
    pub fn borrow(
        &mut self,
        symbol: &Symbol,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> AnalyticsResult<&DebtEntry> {
        ensure_positive("borrow amount", amount)?;
        self.accrue_interest(symbol, at);

        let balance = self.balances.entry(symbol.clone()).or_insert(DebtBalance {
            principal: Decimal::ZERO,
            accrued_interest: Decimal::ZERO,
            accrued_through: at,
        });
        balance.principal += amount;
        let snapshot = *balance;

        log::debug!("{symbol}: borrowed {amount}, principal {}", snapshot.principal);
        Ok(self.record(symbol, DebtEntryKind::Borrow, amount, snapshot, at))
    }

    /// Repays `amount`, split per the repayment policy.
    ///
    /// Interest is charged up to `at` first. Paying more than the outstanding
    /// total is rejected.
    pub fn repay(
        &mut self,
        symbol: &Symbol,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> AnalyticsResult<RepaymentAllocation> {
        ensure_positive("repay amount", amount)?;
        self.accrue_interest(symbol, at);

        let policy = self.policy;
        let balance = self.balances.get_mut(symbol).ok_or_else(|| {
            AnalyticsError::invalid_parameter("symbol", symbol, "no outstanding debt")
        })?;
        if amount > balance.total() {
            return Err(AnalyticsError::invalid_parameter(
                "repay amount",
                amount,
                format!("{symbol}: exceeds outstanding debt {}", balance.total()),
            ));
        }

        let allocation = match policy {
            RepaymentPolicy::PrincipalFirst => {
                let principal = amount.min(balance.principal);
                RepaymentAllocation {
                    principal,
                    interest: amount - principal,
                }
            }
            RepaymentPolicy::InterestFirst => {
                let interest = amount.min(balance.accrued_interest);
                RepaymentAllocation {
                    principal: amount - interest,
                    interest,
                }
            }
        };
        balance.principal -= allocation.principal;
        balance.accrued_interest -= allocation.interest;
        let snapshot = *balance;

        log::debug!(
            "{symbol}: repaid {amount} ({} principal, {} interest) under {policy}",
            allocation.principal,
            allocation.interest
        );
        self.record(symbol, DebtEntryKind::Repay, amount, snapshot, at);
        Ok(allocation)
    }

    /// Charges interest on every balance up to `now`, returning the total charged.
    pub fn accrue_all(&mut self, now: DateTime<Utc>) -> Decimal {
        let symbols: Vec<Symbol> = self.balances.keys().cloned().collect();
        symbols.iter().map(|s| self.accrue_interest(s, now)).sum()
    }

    /// Charges interest on one symbol up to `now`, returning the amount charged.
    pub fn accrue_interest(&mut self, symbol: &Symbol, now: DateTime<Utc>) -> Decimal {
        let Some(balance) = self.balances.get_mut(symbol) else {
            return Decimal::ZERO;
        };
        let elapsed = now.signed_duration_since(balance.accrued_through).num_days();
        let days = match u64::try_from(elapsed) {
            Ok(d) if d > 0 => d,
            _ => return Decimal::ZERO,
        };
        balance.accrued_through += chrono::Duration::days(elapsed);

        let base = balance.total();
        if base.is_zero() || self.daily_rate.is_zero() {
            return Decimal::ZERO;
        }
        let growth = (Decimal::ONE + self.daily_rate).powu(days) - Decimal::ONE;
        let interest = (base * growth).round_dp(INTEREST_DP);
        balance.accrued_interest += interest;
        let snapshot = *balance;

        log::trace!("{symbol}: {days} days of interest, charged {interest}");
        let at = snapshot.accrued_through;
        self.record(symbol, DebtEntryKind::InterestAccrual, interest, snapshot, at);
        interest
    }

    fn record(
        &mut self,
        symbol: &Symbol,
        kind: DebtEntryKind,
        amount: Decimal,
        balance: DebtBalance,
        at: DateTime<Utc>,
    ) -> &DebtEntry {
        self.entries.push(DebtEntry {
            id: Uuid::new_v4(),
            symbol: symbol.clone(),
            kind,
            amount,
            principal_after: balance.principal,
            interest_after: balance.accrued_interest,
            timestamp: at,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Balance of one symbol.
    pub fn balance(&self, symbol: &Symbol) -> Option<&DebtBalance> {
        self.balances.get(symbol)
    }

    /// All balances, ordered by symbol.
    pub fn balances(&self) -> impl Iterator<Item = (&Symbol, &DebtBalance)> {
        self.balances.iter()
    }

    /// All entries in the order they were recorded.
    pub fn entries(&self) -> &[DebtEntry] {
        &self.entries
    }

    /// Entries of one symbol.
    pub fn entries_for<'a>(&'a self, symbol: &'a Symbol) -> impl Iterator<Item = &'a DebtEntry> {
        self.entries.iter().filter(move |e| e.symbol == *symbol)
    }

    /// Outstanding principal across symbols.
    pub fn total_principal(&self) -> Decimal {
        self.balances.values().map(|b| b.principal).sum()
    }

    /// Accrued interest across symbols.
    pub fn total_interest(&self) -> Decimal {
        self.balances.values().map(|b| b.accrued_interest).sum()
    }
}

fn ensure_positive(name: &str, amount: Decimal) -> AnalyticsResult<()> {
    if amount <= Decimal::ZERO {
        return Err(AnalyticsError::invalid_parameter(
            name,
            amount,
            "must be positive",
        ));
    }
    Ok(())
}
