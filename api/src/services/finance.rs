//! Revenue / expense calculator.
//!
//! Stateless: nothing here is persisted. Amounts are decimals and may be
//! sent as JSON strings (`"12.50"`) to avoid float parsing.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub label: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub revenue: Vec<LineItem>,
    #[serde(default)]
    pub expenses: Vec<LineItem>,
}

/// 모든 금액은 소수점 둘째 자리로 표시
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSummary {
    pub total_revenue: Decimal,
    pub total_expenses: Decimal,
    pub net: Decimal,
    /// 수입이 0이면 None
    pub margin_percent: Option<Decimal>,
}

#[derive(Debug, Error, PartialEq)]
pub enum FinanceError {
    #[error("amount for '{0}' must not be negative")]
    InvalidAmount(String),

    #[error("amounts are too large to total")]
    Overflow,
}

impl Ledger {
    pub fn summarize(&self) -> Result<FinanceSummary, FinanceError> {
        let total_revenue = total(&self.revenue)?;
        let total_expenses = total(&self.expenses)?;
        let net = total_revenue
            .checked_sub(total_expenses)
            .ok_or(FinanceError::Overflow)?;

        let margin_percent = if total_revenue > Decimal::ZERO {
            let ratio = net
                .checked_div(total_revenue)
                .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
                .ok_or(FinanceError::Overflow)?;
            Some(to_cents(ratio))
        } else {
            None
        };

        Ok(FinanceSummary {
            total_revenue: to_cents(total_revenue),
            total_expenses: to_cents(total_expenses),
            net: to_cents(net),
            margin_percent,
        })
    }
}

fn total(items: &[LineItem]) -> Result<Decimal, FinanceError> {
    items.iter().try_fold(Decimal::ZERO, |sum, item| {
        if item.amount.is_sign_negative() && !item.amount.is_zero() {
            return Err(FinanceError::InvalidAmount(item.label.clone()));
        }
        sum.checked_add(item.amount).ok_or(FinanceError::Overflow)
    })
}

/// 반올림(0.5는 올림) 후 소수점 둘째 자리로 고정
fn to_cents(value: Decimal) -> Decimal {
    let mut cents = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    cents.rescale(2);
    cents
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(label: &str, amount: &str) -> LineItem {
        LineItem {
            label: label.to_string(),
            amount: dec(amount),
        }
    }

    #[test]
    fn test_summary() {
        let ledger = Ledger {
            revenue: vec![item("membership", "1200"), item("tournament fees", "300.5")],
            expenses: vec![item("hall rental", "800"), item("shuttlecocks", "150.25")],
        };

        let summary = assert_ok!(ledger.summarize());
        assert_eq!(summary.total_revenue.to_string(), "1500.50");
        assert_eq!(summary.total_expenses.to_string(), "950.25");
        assert_eq!(summary.net.to_string(), "550.25");
        assert_eq!(summary.margin_percent, Some(dec("36.67")));
    }

    #[test]
    fn test_loss_and_no_revenue() {
        let ledger = Ledger {
            revenue: vec![],
            expenses: vec![item("coach", "500")],
        };
        let summary = assert_ok!(ledger.summarize());
        assert_eq!(summary.net, dec("-500"));
        assert_eq!(summary.margin_percent, None);
    }

    #[test]
    fn test_half_cent_and_large_amounts_are_exact() {
        let ledger = Ledger {
            revenue: vec![item("raffle", "1.005")],
            expenses: vec![],
        };
        let summary = assert_ok!(ledger.summarize());
        assert_eq!(summary.total_revenue.to_string(), "1.01");

        let ledger = Ledger {
            revenue: vec![item("grant", "90071992547409.93")],
            expenses: vec![item("fee", "0.01")],
        };
        let summary = assert_ok!(ledger.summarize());
        assert_eq!(summary.net.to_string(), "90071992547409.92");
    }

    #[test]
    fn test_amounts_from_json_strings_and_numbers() {
        let ledger: Ledger = serde_json::from_str(
            r#"{"revenue":[{"label":"fees","amount":"0.10"},{"label":"drinks","amount":0.2}]}"#,
        )
        .unwrap();
        let summary = assert_ok!(ledger.summarize());
        assert_eq!(summary.total_revenue.to_string(), "0.30");
        assert!(ledger.expenses.is_empty());
    }

    #[test]
    fn test_rejects_negative_amount() {
        let ledger = Ledger {
            revenue: vec![item("refund", "-20")],
            expenses: vec![],
        };
        let err = assert_err!(ledger.summarize());
        assert_eq!(err, FinanceError::InvalidAmount("refund".to_string()));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let ledger = Ledger {
            revenue: vec![],
            expenses: vec![
                LineItem { label: "a".to_string(), amount: Decimal::MAX },
                LineItem { label: "b".to_string(), amount: Decimal::MAX },
            ],
        };
        assert_eq!(ledger.summarize(), Err(FinanceError::Overflow));
    }
}
