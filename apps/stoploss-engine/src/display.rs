//! Operator-facing report formatting.
//!
//! Amounts are rendered in rupees with Indian digit grouping (the last three
//! digits, then pairs: `₹12,34,567.89`). The functions here only build
//! strings; the poll loop decides what to log and at which level.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::engine::aggregator::PortfolioReport;
use crate::engine::liquidation::{LiquidationOutcome, OrderAttemptStatus};

/// Format a rupee amount with Indian digit grouping and an explicit sign
/// for negative values.
#[must_use]
pub fn format_inr(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let formatted = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let grouped = group_indian(int_part);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-₹{grouped}.{frac_part}")
    } else {
        format!("₹{grouped}.{frac_part}")
    }
}

/// Indian grouping: rightmost group of three, then groups of two.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (mut head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = vec![tail.to_string()];
    while head.len() > 2 {
        let (rest, pair) = head.split_at(head.len() - 2);
        groups.push(pair.to_string());
        head = rest;
    }
    groups.push(head.to_string());
    groups.reverse();
    groups.join(",")
}

/// Format a signed percentage with two decimals.
#[must_use]
pub fn format_percent(value: Decimal) -> String {
    format!(
        "{:.2}%",
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// Render one monitoring cycle as a table for the log.
#[must_use]
pub fn cycle_report(
    iteration: u64,
    max_iterations: u64,
    report: &PortfolioReport,
    available_funds: Option<Decimal>,
    threshold: Decimal,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("cycle {iteration}/{max_iterations}\n"));
    out.push_str(&format!(
        "{:<14} {:>8} {:>14} {:>14} {:>14} {:>10} {:>8}\n",
        "SYMBOL", "QTY", "AVG COST", "PRICE", "P&L", "P&L %", "SOURCE"
    ));

    for position in &report.positions {
        let price = position
            .resolved_price
            .map_or_else(|| "-".to_string(), format_inr);
        let (pnl, pnl_pct) = position.valuation.as_ref().map_or_else(
            || ("excluded".to_string(), "-".to_string()),
            |v| (format_inr(v.pnl), format_percent(v.pnl_percent)),
        );

        out.push_str(&format!(
            "{:<14} {:>8} {:>14} {:>14} {:>14} {:>10} {:>8}\n",
            position.symbol.as_str(),
            position.quantity,
            format_inr(position.average_cost),
            price,
            pnl,
            pnl_pct,
            position.source,
        ));
    }

    out.push_str(&format!(
        "invested {}  current {}  net {} ({})  threshold {}\n",
        format_inr(report.pnl.total_invested),
        format_inr(report.pnl.total_current),
        format_inr(report.pnl.net_pnl),
        report
            .pnl
            .net_pnl_percent
            .map_or_else(|| "-".to_string(), format_percent),
        format_percent(threshold),
    ));

    if report.excluded_count() > 0 {
        out.push_str(&format!(
            "excluded from totals: {} position(s) without a usable price\n",
            report.excluded_count()
        ));
    }

    if let Some(funds) = available_funds {
        out.push_str(&format!("available funds: {}\n", format_inr(funds)));
    }

    out
}

/// Render the liquidation batch outcome.
#[must_use]
pub fn liquidation_summary(outcome: &LiquidationOutcome) -> String {
    let mut out = String::new();
    out.push_str("stop-loss liquidation summary\n");

    for attempt in &outcome.attempts {
        let line = match &attempt.status {
            OrderAttemptStatus::Sold { order_id } => format!(
                "  SOLD     {:<14} qty {:<6} @ {:<12} order {order_id}",
                attempt.symbol.as_str(),
                attempt.quantity,
                attempt
                    .price
                    .map_or_else(|| "-".to_string(), format_inr),
            ),
            OrderAttemptStatus::SkippedNoPrice => format!(
                "  SKIPPED  {:<14} qty {:<6} no usable price",
                attempt.symbol.as_str(),
                attempt.quantity,
            ),
            OrderAttemptStatus::Failed { reason } => format!(
                "  FAILED   {:<14} qty {:<6} {reason}",
                attempt.symbol.as_str(),
                attempt.quantity,
            ),
        };
        out.push_str(&line);
        out.push('\n');
    }

    out.push_str(&format!(
        "sold {}  failed {}  skipped {}  est. proceeds {}\n",
        outcome.success_count,
        outcome.failed_count,
        outcome.skipped_count,
        format_inr(outcome.total_sold_value),
    ));
    out
}
