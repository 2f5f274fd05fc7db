//! Currency formatting for user-facing text.

use std::sync::OnceLock;

use numfmt::{Formatter, Precision};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

/// Format `amount` as dollars with two decimal places and thousands
/// separators, e.g. `$1,234.50` or `-$50.00`.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .abs();
    let sign = if amount.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    // Only whole dollars go through numfmt.
    let cents = (rounded.fract() * Decimal::ONE_HUNDRED)
        .to_u32()
        .unwrap_or_default();

    format!("{sign}{}.{cents:02}", format_dollars(rounded.trunc()))
}

fn format_dollars(dollars: Decimal) -> String {
    static DOLLAR_FMT: OnceLock<Option<Formatter>> = OnceLock::new();

    let dollar_fmt = DOLLAR_FMT.get_or_init(|| {
        Formatter::currency("$")
            .ok()
            .map(|formatter| formatter.precision(Precision::Decimals(0)))
    });

    if dollars.is_zero() {
        // numfmt formats zero as a bare "0".
        return "$0".to_owned();
    }

    match (dollar_fmt, dollars.to_f64()) {
        (Some(formatter), Some(number)) => formatter.fmt_string(number),
        _ => format!("${dollars}"),
    }
}
