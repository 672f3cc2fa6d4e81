//! CSV export for transaction history.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::activity::Transaction;

/// Column header for CSV history export.
const HEADER: &str = "id,type,description,amount_kwh,timestamp";

/// Exports transactions to a CSV file at the given path.
///
/// Writes a header row followed by one row per transaction, in the order
/// given. Identical input gives identical output.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(transactions: &[Transaction], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(transactions, buf)
}

/// Writes transactions as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(transactions: &[Transaction], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(','))?;

    for tx in transactions {
        wtr.write_record(&[
            tx.id.clone(),
            tx.kind.as_str().to_string(),
            tx.description.clone(),
            format!("{:.3}", tx.amount),
            tx.timestamp.to_rfc3339(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::TransactionKind;
    use chrono::{TimeZone, Utc};

    fn make_tx(n: u32) -> Transaction {
        Transaction {
            id: format!("tx-{n}"),
            kind: if n % 2 == 0 {
                TransactionKind::Purchase
            } else {
                TransactionKind::Sale
            },
            description: format!("Trade, number {n}"),
            amount: 2.5 * f64::from(n + 1),
            timestamp: Utc.with_ymd_and_hms(2025, 11, 1 + n, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn header_row() {
        let mut buf = Vec::new();
        write_csv(&[make_tx(0)], &mut buf).unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert_eq!(
            output.lines().next(),
            Some("id,type,description,amount_kwh,timestamp")
        );
    }

    #[test]
    fn row_count_matches_transactions() {
        let txs: Vec<Transaction> = (0..5).map(make_tx).collect();
        let mut buf = Vec::new();
        write_csv(&txs, &mut buf).unwrap();
        let output = String::from_utf8(buf).unwrap();
        // 1 header + 5 data rows
        assert_eq!(output.lines().count(), 6);
    }

    #[test]
    fn descriptions_with_commas_are_quoted() {
        let txs: Vec<Transaction> = (0..3).map(make_tx).collect();
        let mut buf = Vec::new();
        write_csv(&txs, &mut buf).unwrap();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let rows: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[1][1], "sale");
        assert_eq!(&rows[1][2], "Trade, number 1");
        assert_eq!(&rows[1][3], "5.000");
        assert_eq!(&rows[0][4], "2025-11-01T08:00:00+00:00");
    }
}
