//! Derivation of investor-perspective external cash flows from the
//! transaction log, for money-weighted return math.

use chrono::NaiveDate;
use folio_core::{CashFlow, Transaction, TransactionType};
use rust_decimal::prelude::*;
use std::collections::BTreeMap;

/// External cash flows from the investor's point of view: a deposit is
/// negative (money leaving the investor's pocket into the portfolio), a
/// withdrawal positive. Same-date flows are summed into one; output is
/// sorted by date.
///
/// Trades are internal by default. With `include_trades` set, buys count as
/// invested capital and sells as returned capital, valued at the explicit
/// transaction price; trades without one are skipped.
pub fn cash_flows_from_transactions(
    transactions: &[Transaction],
    include_trades: bool,
) -> Vec<CashFlow> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();

    for tx in transactions {
        let signed = match tx.tx_type {
            TransactionType::CashDeposit => tx
                .amount
                .filter(|a| *a > Decimal::ZERO)
                .map(|a| -a.to_f64().unwrap_or(0.0)),
            TransactionType::CashWithdrawal => tx
                .amount
                .filter(|a| *a > Decimal::ZERO)
                .map(|a| a.to_f64().unwrap_or(0.0)),
            TransactionType::Buy | TransactionType::Sell if include_trades => {
                let value = tx
                    .quantity
                    .filter(|q| *q > Decimal::ZERO)
                    .zip(tx.price.filter(|p| *p > Decimal::ZERO))
                    .map(|(q, p)| (q * p).to_f64().unwrap_or(0.0));
                match tx.tx_type {
                    TransactionType::Buy => value.map(|v| -v),
                    _ => value,
                }
            }
            _ => None,
        };

        if let Some(amount) = signed {
            *by_date.entry(tx.date).or_insert(0.0) += amount;
        }
    }

    by_date
        .into_iter()
        .filter(|(_, amount)| *amount != 0.0)
        .map(|(date, amount)| CashFlow { date, amount })
        .collect()
}
