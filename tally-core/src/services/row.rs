//! Row parsing and validation

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

use super::header::{normalize_header, HeaderMap};
use crate::domain::{CanonicalField, OrderStatus, ParsedSale, RawRow, RowError, RowErrorKind};

const DATE_FORMATS: [&str; 5] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d"];

/// Currency markers stripped before reading an amount. `R$` goes before `$`.
const CURRENCY_SYMBOLS: [&str; 4] = ["R$", "$", "€", "£"];

/// Decimal places kept on money values
const MONEY_SCALE: u32 = 2;

/// Amounts at or beyond this magnitude are treated as garbage
static MAX_MONEY: LazyLock<Decimal> = LazyLock::new(|| Decimal::from(1_000_000_000_000_000i64));

static ISO_WITH_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})[T ]").expect("valid ISO timestamp pattern"));

// "31 de outubro de 2025 23:59 hs."
static LONG_PORTUGUESE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2})\s+de\s+(\p{L}+)\s+de\s+(\d{4})").expect("valid long date pattern")
});

/// Parse one data row against the resolved header.
///
/// Every row gets exactly one outcome. The column count is checked first,
/// then required fields in canonical order; the first problem is reported.
pub fn parse_row(row: &RawRow, headers: &HeaderMap) -> Result<ParsedSale, RowError> {
    if row.cells.len() > headers.width() {
        return Err(RowError::column_count(row, headers.width()));
    }

    let cells = Cells { row, headers };

    let sale_date = cells.required(CanonicalField::SaleDate, parse_date)?;
    let product_sku = cells.required(CanonicalField::ProductSku, |raw| Ok(raw.to_string()))?;
    let quantity = cells.required(CanonicalField::Quantity, parse_quantity)?;
    let unit_price = cells.required(CanonicalField::UnitPrice, parse_non_negative_money)?;
    let unit_cost = cells.required(CanonicalField::UnitCost, parse_non_negative_money)?;

    let order_status = cells
        .optional(CanonicalField::OrderStatus)
        .map(|label| OrderStatus::from_label(&normalize_header(&label)))
        .unwrap_or_default();

    Ok(ParsedSale {
        line: row.line,
        sale_date,
        product_name: cells
            .optional(CanonicalField::ProductName)
            .unwrap_or_else(|| product_sku.clone()),
        product_sku,
        quantity,
        unit_price,
        unit_cost,
        order_number: cells.optional(CanonicalField::OrderNumber),
        order_status,
        buyer_state: cells.optional(CanonicalField::BuyerState),
        buyer_city: cells.optional(CanonicalField::BuyerCity),
    })
}

/// Field-addressed view over one row
struct Cells<'a> {
    row: &'a RawRow,
    headers: &'a HeaderMap,
}

impl Cells<'_> {
    /// Trimmed cell for a field; absent when the column is unmapped or the
    /// row is short
    fn get(&self, field: CanonicalField) -> Option<&str> {
        let index = self.headers.position(field)?;
        self.row.cells.get(index).map(|c| c.trim())
    }

    fn required<T>(
        &self,
        field: CanonicalField,
        coerce: impl FnOnce(&str) -> Result<T, RowErrorKind>,
    ) -> Result<T, RowError> {
        let raw = self.get(field).unwrap_or("");
        if raw.is_empty() {
            return Err(RowError::for_field(
                self.row,
                field,
                RowErrorKind::MissingRequiredField,
                raw,
            ));
        }
        coerce(raw).map_err(|kind| RowError::for_field(self.row, field, kind, raw))
    }

    fn optional(&self, field: CanonicalField) -> Option<String> {
        self.get(field)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, RowErrorKind> {
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Ok(date);
        }
    }

    if let Some(caps) = ISO_WITH_TIME.captures(raw) {
        return NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d")
            .map_err(|_| RowErrorKind::TypeCoercionFailure);
    }

    if let Some(caps) = LONG_PORTUGUESE_DATE.captures(raw) {
        let day = caps[1].parse().ok();
        let month = portuguese_month(&normalize_header(&caps[2]));
        let year = caps[3].parse().ok();
        if let (Some(d), Some(m), Some(y)) = (day, month, year) {
            return NaiveDate::from_ymd_opt(y, m, d).ok_or(RowErrorKind::TypeCoercionFailure);
        }
    }

    Err(RowErrorKind::TypeCoercionFailure)
}

fn portuguese_month(folded: &str) -> Option<u32> {
    let month = match folded {
        "janeiro" => 1,
        "fevereiro" => 2,
        "marco" => 3,
        "abril" => 4,
        "maio" => 5,
        "junho" => 6,
        "julho" => 7,
        "agosto" => 8,
        "setembro" => 9,
        "outubro" => 10,
        "novembro" => 11,
        "dezembro" => 12,
        _ => return None,
    };
    Some(month)
}

fn parse_quantity(raw: &str) -> Result<u32, RowErrorKind> {
    let (negative, digits) = split_sign(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RowErrorKind::TypeCoercionFailure);
    }
    if negative && digits.bytes().any(|b| b != b'0') {
        return Err(RowErrorKind::NegativeValue);
    }
    u32::from_str(digits).map_err(|_| RowErrorKind::TypeCoercionFailure)
}

fn parse_non_negative_money(raw: &str) -> Result<Decimal, RowErrorKind> {
    let amount = parse_money(raw)?;
    if amount < Decimal::ZERO {
        return Err(RowErrorKind::NegativeValue);
    }
    Ok(amount)
}

/// Read a money amount written with either decimal convention.
///
/// `"R$ 1.234,56"`, `"1,234.56"` and `"(12.50)"` are all understood; the
/// result is rounded to cents.
fn parse_money(raw: &str) -> Result<Decimal, RowErrorKind> {
    let mut s: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    for symbol in CURRENCY_SYMBOLS {
        s = s.replace(symbol, "");
    }

    // Parentheses notation for negative numbers: (100.00) -> -100.00
    let (parenthesized, body) = match s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s.as_str()),
    };

    let (signed, digits) = split_sign(body);
    let canonical = unify_separators(digits).ok_or(RowErrorKind::TypeCoercionFailure)?;

    let amount = Decimal::from_str(&canonical).map_err(|_| RowErrorKind::TypeCoercionFailure)?;
    if amount.abs() >= *MAX_MONEY {
        return Err(RowErrorKind::TypeCoercionFailure);
    }

    let amount = amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if parenthesized || signed {
        Ok(-amount)
    } else {
        Ok(amount)
    }
}

fn split_sign(s: &str) -> (bool, &str) {
    if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (false, rest)
    } else {
        (false, s)
    }
}

/// Rewrite digits with `,`/`.` separators into `1234.56` form.
///
/// Thousands groups must be well formed: a leading group of 1-3 digits,
/// then groups of exactly 3.
fn unify_separators(digits: &str) -> Option<String> {
    if !digits.bytes().any(|b| b.is_ascii_digit())
        || !digits.bytes().all(|b| b.is_ascii_digit() || b == b',' || b == b'.')
    {
        return None;
    }

    let commas = digits.matches(',').count();
    let dots = digits.matches('.').count();

    let (thousands, decimal) = match (commas, dots) {
        (0, 0) => return Some(digits.to_string()),
        (_, 0) if commas == 1 => (None, Some(',')),
        (_, 0) => (Some(','), None),
        (0, 1) => {
            let (before, after) = digits.split_once('.')?;
            if after.len() == 3 && (1..=3).contains(&before.len()) && !before.starts_with('0') {
                (Some('.'), None)
            } else {
                (None, Some('.'))
            }
        }
        (0, _) => (Some('.'), None),
        _ => {
            // Both present: the later one is the decimal separator
            let last_comma = digits.rfind(',')?;
            let last_dot = digits.rfind('.')?;
            if last_comma > last_dot {
                (Some('.'), Some(','))
            } else {
                (Some(','), Some('.'))
            }
        }
    };

    let (integer, fraction) = match decimal {
        Some(sep) => digits.split_once(sep)?,
        None => (digits, ""),
    };
    if decimal.is_some() && !is_digits(fraction) {
        return None;
    }

    let integer = match thousands {
        Some(sep) => {
            let mut groups = integer.split(sep);
            let first = groups.next()?;
            if !is_digits(first) || first.len() > 3 {
                return None;
            }
            let mut joined = first.to_string();
            for group in groups {
                if group.len() != 3 || !is_digits(group) {
                    return None;
                }
                joined.push_str(group);
            }
            joined
        }
        None if is_digits(integer) => integer.to_string(),
        None => return None,
    };

    if decimal.is_some() {
        Some(format!("{}.{}", integer, fraction))
    } else {
        Some(integer)
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
