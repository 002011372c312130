//! CSV format handling for transfer requests, account seeds and output
//!
//! This module centralizes all file format concerns, providing:
//! - CsvRecord structure for request deserialization
//! - Conversion from CSV records to domain types
//! - Account seed parsing and final account serialization
//! - JSON-lines response serialization
//!
//! Request files carry the columns
//! `sender,receiver,account_number,amount,remarks,timestamp`; `remarks` and
//! `timestamp` may be left empty.

use crate::types::{
    Account, AccountId, AccountNumber, Balance, Timestamp, TransferRequest, TransferResponse,
};
use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// CSV record structure for request deserialization
///
/// The amount stays a string so a malformed value is reported against its
/// row instead of failing the whole deserializer.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    pub sender: AccountId,
    pub receiver: AccountId,
    pub account_number: AccountNumber,
    pub amount: String,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

/// Convert a CsvRecord to a TransferRequest
///
/// Only the amount syntax is checked here. Business rules (zero amounts,
/// missing accounts) belong to the engine, which logs rejected requests.
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<TransferRequest, String> {
    let amount = csv_record.amount.trim();
    let amount: Balance = amount.parse().map_err(|_| {
        format!(
            "Invalid amount '{}' for transfer {} -> {}",
            csv_record.amount, csv_record.sender, csv_record.receiver
        )
    })?;

    Ok(TransferRequest {
        sender_id: csv_record.sender,
        receiver_id: csv_record.receiver,
        account_number: csv_record.account_number,
        amount,
        remarks: csv_record.remarks.unwrap_or_default(),
        timestamp: csv_record.timestamp.unwrap_or_default(),
    })
}

/// Account row as it appears in seed and output files
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
struct AccountRecord {
    id: AccountId,
    account_number: AccountNumber,
    balance: Balance,
}

/// Parse account seeds with columns `id,account_number,balance`
///
/// A malformed row is fatal: the engine must not run against a partially
/// seeded store.
pub fn read_accounts_csv<R: Read>(input: R) -> Result<Vec<Account>, String> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(input);
    let mut accounts = Vec::new();

    for (index, record) in reader.deserialize::<AccountRecord>().enumerate() {
        // Header is line 1
        let record = record.map_err(|e| format!("Line {}: invalid account row: {}", index + 2, e))?;
        accounts.push(Account::new(record.id, record.account_number, record.balance));
    }

    Ok(accounts)
}

/// Write account states to CSV format
///
/// Writes accounts with columns `id,account_number,balance`, sorted by id
/// for deterministic output.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(|account| account.id);

    for account in sorted_accounts {
        writer
            .serialize(AccountRecord {
                id: account.id,
                account_number: account.account_number,
                balance: account.balance,
            })
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    // An empty slice still gets a header
    if accounts.is_empty() {
        writer
            .write_record(["id", "account_number", "balance"])
            .map_err(|e| format!("Failed to write CSV header: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

/// Write one response as a JSON line
pub fn write_response_line(
    response: &TransferResponse,
    output: &mut dyn Write,
) -> Result<(), String> {
    serde_json::to_writer(&mut *output, response)
        .map_err(|e| format!("Failed to encode response: {}", e))?;
    output
        .write_all(b"\n")
        .map_err(|e| format!("Failed to write response: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Receipt, Rejection, TransferError};
    use rstest::rstest;

    fn record(amount: &str) -> CsvRecord {
        CsvRecord {
            sender: 1,
            receiver: 2,
            account_number: 1002,
            amount: amount.to_string(),
            remarks: Some("rent".to_string()),
            timestamp: Some(1_700_000_000),
        }
    }

    #[rstest]
    #[case::positive("100", 100)]
    #[case::negative("-40", -40)]
    #[case::zero("0", 0)]
    #[case::padded("  25 ", 25)]
    fn test_convert_csv_record_amount_parsing(#[case] amount: &str, #[case] expected: Balance) {
        let request = convert_csv_record(record(amount)).unwrap();
        assert_eq!(request.amount, expected);
        assert_eq!(request.sender_id, 1);
        assert_eq!(request.receiver_id, 2);
        assert_eq!(request.account_number, 1002);
        assert_eq!(request.remarks, "rent");
        assert_eq!(request.timestamp, 1_700_000_000);
    }

    #[rstest]
    #[case::decimal("10.5")]
    #[case::text("abc")]
    #[case::empty("")]
    fn test_convert_csv_record_errors(#[case] amount: &str) {
        let err = convert_csv_record(record(amount)).unwrap_err();
        assert!(err.contains("Invalid amount"));
        assert!(err.contains("1 -> 2"));
    }

    #[test]
    fn test_convert_csv_record_defaults_optional_fields() {
        let mut csv_record = record("5");
        csv_record.remarks = None;
        csv_record.timestamp = None;

        let request = convert_csv_record(csv_record).unwrap();
        assert_eq!(request.remarks, "");
        assert_eq!(request.timestamp, 0);
    }

    #[test]
    fn test_read_accounts_csv() {
        let input = "id,account_number,balance\n1, 1001, 500\n2,1002,0\n";
        let accounts = read_accounts_csv(input.as_bytes()).unwrap();

        assert_eq!(
            accounts,
            vec![Account::new(1, 1001, 500), Account::new(2, 1002, 0)]
        );
    }

    #[test]
    fn test_read_accounts_csv_rejects_bad_row() {
        let input = "id,account_number,balance\n1,1001,500\n2,1002,lots\n";
        let err = read_accounts_csv(input.as_bytes()).unwrap_err();
        assert!(err.starts_with("Line 3:"), "got: {}", err);
    }

    #[rstest]
    #[case::empty(vec![], "id,account_number,balance\n")]
    #[case::sorted(
        vec![Account::new(2, 1002, -30), Account::new(1, 1001, 470)],
        "id,account_number,balance\n1,1001,470\n2,1002,-30\n"
    )]
    fn test_write_accounts_csv(#[case] accounts: Vec<Account>, #[case] expected_output: &str) {
        let mut output = Vec::new();
        write_accounts_csv(&accounts, &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), expected_output);
    }

    #[test]
    fn test_write_response_lines() {
        let mut output = Vec::new();
        let ok = TransferResponse::from(&Ok(Receipt { sender_balance: 400 }));
        let err = TransferResponse::from(&Err(Rejection::new(TransferError::AccountMismatch, 500)));

        write_response_line(&ok, &mut output).unwrap();
        write_response_line(&err, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""updated_balance":400"#));
        assert!(lines[1].contains("Receiver's account number does not match."));
    }
}
