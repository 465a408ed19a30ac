use crate::error::AppError;
use crate::models::Transaction;

pub const CSV_HEADER: [&str; 6] = ["Tanggal", "Kategori", "Deskripsi", "Nominal", "Jenis", "Bukti"];

/// Serializes transactions as CSV with every field quoted.
pub fn transactions_csv<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for tx in transactions {
        let amount = tx.amount.to_string();
        writer.write_record([
            tx.date.as_str(),
            tx.category.as_str(),
            tx.description.as_deref().unwrap_or_default(),
            amount.as_str(),
            tx.kind.as_str(),
            tx.receipt_url.as_deref().unwrap_or_default(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|err| AppError::Io(err.into_error()))
}

pub fn export_filename(month: Option<&str>) -> String {
    let suffix: String = month
        .unwrap_or("semua")
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
        .collect();
    if suffix.is_empty() {
        "transaksi.csv".to_string()
    } else {
        format!("transaksi-{suffix}.csv")
    }
}

#[cfg(test)]
#[path = "export_test.rs"]
mod tests;
