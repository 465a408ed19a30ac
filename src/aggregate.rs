//! Month and category aggregation over a user's transactions, plus the
//! Indonesian display formatting used by the dashboard.
//!
//! Month keys are the first seven characters of the date string. Nothing is
//! validated: a malformed date groups under a malformed key.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Transaction, TxKind};

pub const MONTH_NAMES: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonthTotals {
    pub income: i64,
    pub expense: i64,
}

impl MonthTotals {
    pub fn net(&self) -> i64 {
        self.income.saturating_sub(self.expense)
    }

    fn add(&mut self, tx: &Transaction) {
        match tx.kind {
            TxKind::Income => self.income = self.income.saturating_add(tx.amount),
            TxKind::Expense => self.expense = self.expense.saturating_add(tx.amount),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub income: i64,
    pub expense: i64,
    pub remaining: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySlice {
    pub name: String,
    pub amount: i64,
    pub share: f64,
}

/// Series for the line, bar and pie charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub months: Vec<String>,
    pub labels: Vec<String>,
    pub income: Vec<i64>,
    pub expense: Vec<i64>,
    pub net: Vec<i64>,
    pub categories: Vec<CategorySlice>,
    pub year: i32,
    pub year_labels: Vec<String>,
    pub year_income: Vec<i64>,
    pub year_expense: Vec<i64>,
}

pub fn month_key(date: &str) -> String {
    date.chars().take(7).collect()
}

fn in_month(tx: &Transaction, month: Option<&str>) -> bool {
    match month {
        Some(month) => month_key(&tx.date) == month,
        None => true,
    }
}

/// An empty or missing month selects every transaction.
pub fn normalize_month(month: Option<&str>) -> Option<&str> {
    month.map(str::trim).filter(|value| !value.is_empty())
}

pub fn filter_by_month<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    month: Option<&str>,
) -> Vec<&'a Transaction> {
    transactions
        .into_iter()
        .filter(|tx| in_month(tx, month))
        .collect()
}

/// Per-month income and expense sums, keyed and ordered by `YYYY-MM`.
pub fn monthly_totals<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> BTreeMap<String, MonthTotals> {
    let mut out: BTreeMap<String, MonthTotals> = BTreeMap::new();
    for tx in transactions {
        out.entry(month_key(&tx.date)).or_default().add(tx);
    }
    out
}

/// Expense sums per category name, in first-seen order.
pub fn category_totals<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    month: Option<&str>,
) -> Vec<CategoryTotal> {
    let mut out: Vec<CategoryTotal> = Vec::new();
    for tx in transactions {
        if tx.kind != TxKind::Expense || !in_month(tx, month) {
            continue;
        }
        match out.iter_mut().find(|total| total.name == tx.category) {
            Some(total) => total.amount = total.amount.saturating_add(tx.amount),
            None => out.push(CategoryTotal {
                name: tx.category.clone(),
                amount: tx.amount,
            }),
        }
    }
    out
}

pub fn balance<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    month: Option<&str>,
) -> Balance {
    let mut totals = MonthTotals::default();
    for tx in transactions {
        if in_month(tx, month) {
            totals.add(tx);
        }
    }
    Balance {
        income: totals.income,
        expense: totals.expense,
        remaining: totals.net(),
    }
}

/// Twelve zero-filled months for `year`, January first.
pub fn year_overview(monthly: &BTreeMap<String, MonthTotals>, year: i32) -> [MonthTotals; 12] {
    let mut out = [MonthTotals::default(); 12];
    for (index, slot) in out.iter_mut().enumerate() {
        if let Some(totals) = monthly.get(&format!("{year:04}-{:02}", index + 1)) {
            *slot = *totals;
        }
    }
    out
}

pub fn category_slices(totals: Vec<CategoryTotal>) -> Vec<CategorySlice> {
    let sum = totals
        .iter()
        .fold(0i64, |sum, total| sum.saturating_add(total.amount));
    totals
        .into_iter()
        .map(|total| {
            let share = if sum == 0 {
                0.0
            } else {
                ((total.amount as f64 / sum as f64) * 1000.0).round() / 10.0
            };
            CategorySlice {
                name: total.name,
                amount: total.amount,
                share,
            }
        })
        .collect()
}

/// Shapes chart series: line/bar over every month key, pie over expenses of
/// `pie_month` (all months when `None`), and a twelve-month view of `year`.
pub fn chart_data(transactions: &[Transaction], pie_month: Option<&str>, year: i32) -> ChartData {
    let monthly = monthly_totals(transactions);
    let months: Vec<String> = monthly.keys().cloned().collect();
    let overview = year_overview(&monthly, year);

    ChartData {
        labels: months.iter().map(|month| month_label(month)).collect(),
        income: monthly.values().map(|totals| totals.income).collect(),
        expense: monthly.values().map(|totals| totals.expense).collect(),
        net: monthly.values().map(MonthTotals::net).collect(),
        months,
        categories: category_slices(category_totals(transactions, pie_month)),
        year,
        year_labels: MONTH_NAMES.iter().map(|name| format!("{name} {year}")).collect(),
        year_income: overview.iter().map(|totals| totals.income).collect(),
        year_expense: overview.iter().map(|totals| totals.expense).collect(),
    }
}

fn month_name(month: &str) -> Option<&'static str> {
    let index: usize = month.parse().ok()?;
    MONTH_NAMES.get(index.checked_sub(1)?).copied()
}

/// `2024-01` -> `Januari 2024`; anything else is returned unchanged.
pub fn month_label(month_key: &str) -> String {
    let mut parts = month_key.split('-');
    let (Some(year), Some(month)) = (parts.next(), parts.next()) else {
        return month_key.to_string();
    };
    match month_name(month) {
        Some(name) if !year.is_empty() => format!("{name} {year}"),
        _ => month_key.to_string(),
    }
}

/// `2024-01-05` -> `5 Januari 2024`; anything else is returned unchanged.
pub fn date_label(date: &str) -> String {
    let mut parts = date.split('-');
    let (Some(year), Some(month), Some(day)) = (parts.next(), parts.next(), parts.next()) else {
        return date.to_string();
    };
    match (month_name(month), day.parse::<u32>()) {
        (Some(name), Ok(day)) if !year.is_empty() => format!("{day} {name} {year}"),
        _ => date.to_string(),
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

pub fn format_rupiah(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    format!("Rp {sign}{}", group_thousands(amount.unsigned_abs()))
}

/// Short axis label: `18.5 Jt`, `12 Rb`, or the plain number.
pub fn format_compact(amount: i64) -> String {
    if amount >= 1_000_000 {
        format!("{:.1} Jt", amount as f64 / 1_000_000.0)
    } else if amount >= 1_000 {
        format!("{:.0} Rb", amount as f64 / 1_000.0)
    } else {
        amount.to_string()
    }
}

/// Largest amount a single transaction may carry (Rp 1.000.000.000.000.000).
pub const MAX_NOMINAL: i64 = 1_000_000_000_000_000;

/// Keeps only the digits of a typed amount, so `Rp. 50.000` reads as 50000.
/// Amounts above [`MAX_NOMINAL`] are rejected.
pub fn parse_nominal(input: &str) -> Option<i64> {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits
        .parse::<i64>()
        .ok()
        .filter(|amount| *amount <= MAX_NOMINAL)
}

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod tests;
