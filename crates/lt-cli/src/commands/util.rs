//! Shared formatting helpers for CLI commands.

use lt_core::money::round2;
use rust_decimal::Decimal;

/// Formats a money value with exactly two decimals (e.g., `33.30`).
pub fn money(value: Decimal) -> String {
    format!("{:.2}", round2(value))
}

/// Formats a percentage with two decimals and a `%` sign.
pub fn percent(value: Decimal) -> String {
    format!("{:.2}%", round2(value))
}

/// Date part of a stored RFC 3339 timestamp.
pub fn date_part(timestamp: &str) -> &str {
    timestamp.get(..10).unwrap_or(timestamp)
}

/// Truncates `text` to `width` characters, marking the cut with `...`.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        text.to_string()
    }
}
