//! End-to-end integration tests
//!
//! These tests drive the public `Ledger` facade against real files:
//! 1. Fixture ledgers under tests/fixtures/{name}/ledger.csv are copied into a
//!    temporary directory, scanned, and exported in summary form
//! 2. The export is compared with tests/fixtures/{name}/expected.csv
//!
//! Scenario tests build their ledgers through the facade and check the budget
//! recommendation heuristics:
//! - The "alice" walkthrough
//! - Custom budget precedence
//! - Festival and unstable-spending detection
//! - Consumption ratio bounds
//! - Rollback through remove
//!
//! Each fixture is read twice: once through the synchronous scan and once
//! through the asynchronous batch scan.

#[cfg(test)]
mod tests {
    use budget_ledger::config::{EngineConfig, LedgerConfig};
    use budget_ledger::core::{scan_history, Ledger, TransactionSource};
    use budget_ledger::io::write_transaction_summary;
    use budget_ledger::types::{BudgetMode, LedgerError, Operation, Transaction};
    use chrono::{Month, NaiveDate};
    use rstest::rstest;
    use rust_decimal::Decimal;
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    fn config(dir: &TempDir) -> LedgerConfig {
        LedgerConfig::new(dir.path().join("transactions.csv"), dir.path().join("user_budget.csv"))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(ledger: &Ledger, user: &str, op: Operation, amount: i64, time: &str) {
        let tx = Transaction::builder(user, op, Decimal::new(amount, 0), time)
            .build()
            .unwrap();
        ledger.add_transaction(&tx).unwrap();
    }

    /// Normalise line endings and trailing whitespace for comparison
    fn normalize(content: &str) -> Vec<String> {
        content
            .lines()
            .map(|line| line.trim_end().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Copy a fixture ledger into `dir`, export alice's history, compare with expected.csv
    ///
    /// # Panics
    ///
    /// Panics if fixture files are missing or the export differs from expected.csv
    fn run_test_fixture(fixture_name: &str, dir: &TempDir, asynchronous: bool) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let input_path = format!("{}/ledger.csv", fixture_dir);
        let expected_path = format!("{}/expected.csv", fixture_dir);

        assert!(Path::new(&input_path).exists(), "Input file not found: {}", input_path);
        assert!(
            Path::new(&expected_path).exists(),
            "Expected file not found: {}",
            expected_path
        );

        let cfg = config(dir);
        fs::copy(&input_path, &cfg.ledger_path).expect("Failed to copy fixture ledger");

        let history = if asynchronous {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .expect("Failed to build runtime");
            runtime
                .block_on(scan_history(&cfg.ledger_path, "alice", 2))
                .unwrap()
        } else {
            Ledger::open(cfg).unwrap().read_transactions("alice").unwrap()
        };

        let mut output = Vec::new();
        write_transaction_summary(&history, &mut output).unwrap();

        let actual = normalize(&String::from_utf8(output).unwrap());
        let expected = normalize(&fs::read_to_string(&expected_path).unwrap());
        assert_eq!(
            actual, expected,
            "\nFixture: {}\nAsync: {}\n",
            fixture_name, asynchronous
        );
    }

    #[rstest]
    #[case::corrupt_lines("corrupt_lines")]
    #[case::legacy_records("legacy_records")]
    #[case::quoted_fields("quoted_fields")]
    fn test_fixture(#[case] fixture_name: &str, #[values(false, true)] asynchronous: bool) {
        let dir = tempdir().unwrap();
        run_test_fixture(fixture_name, &dir, asynchronous);
    }

    #[test]
    fn test_alice_walkthrough() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(config(&dir)).unwrap();
        record(&ledger, "alice", Operation::Income, 5000, "2024/06/10 09:00");

        let rec = ledger.recommend("alice", date(2024, 6, 15));

        assert_eq!(rec.income, Decimal::new(5000, 0));
        assert!(!rec.has_past_data);
        assert_eq!(rec.mode, BudgetMode::Normal);
        assert_eq!(rec.suggested_budget, Decimal::new(4000, 0));
        assert_eq!(rec.suggested_saving, Decimal::new(1000, 0));
    }

    #[test]
    fn test_unknown_and_blank_users_get_zero_recommendations() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(config(&dir)).unwrap();

        let unknown = ledger.recommend("nobody", date(2024, 6, 15));
        assert_eq!(unknown.suggested_budget, Decimal::ZERO);
        assert_eq!(unknown.suggested_saving, Decimal::ZERO);
        assert!(!unknown.has_past_data);

        let blank = ledger.recommend("  ", date(2024, 6, 15));
        assert_eq!(blank.mode, BudgetMode::Normal);
        assert_eq!(blank.reason, "User not specified");
    }

    #[test]
    fn test_custom_budget_takes_precedence_and_persists() {
        let dir = tempdir().unwrap();
        {
            let mut ledger = Ledger::open(config(&dir)).unwrap();
            // Three large expenses last month would otherwise force economical mode
            for day in 1..=3 {
                record(&ledger, "alice", Operation::Expense, 1500, &format!("2024/04/0{} 10:00", day));
            }
            record(&ledger, "alice", Operation::Income, 2000, "2024/05/02 09:00");
            ledger.save_custom_budget("alice", Decimal::new(2500, 0)).unwrap();
        }

        let ledger = Ledger::open(config(&dir)).unwrap();
        let rec = ledger.recommend("Alice", date(2024, 5, 20));

        assert_eq!(rec.mode, BudgetMode::Custom);
        assert_eq!(rec.suggested_budget, Decimal::new(2500, 0));
        assert_eq!(rec.suggested_saving, Decimal::ZERO);
        assert!(!rec.has_past_data);
    }

    #[rstest]
    #[case::october_before_november(date(2024, 10, 15), BudgetMode::EconomicalFestival)]
    #[case::february_before_march(date(2024, 2, 29), BudgetMode::EconomicalFestival)]
    #[case::november_before_december(date(2024, 11, 1), BudgetMode::EconomicalFestival)]
    #[case::july_before_august(date(2024, 7, 15), BudgetMode::Normal)]
    fn test_festival_detection(#[case] reference: NaiveDate, #[case] expected: BudgetMode) {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(config(&dir)).unwrap();
        let time = format!("{} 09:00", reference.format("%Y/%m/01"));
        record(&ledger, "alice", Operation::Income, 1000, &time);

        let rec = ledger.recommend("alice", reference);

        assert_eq!(rec.mode, expected);
        let ratio = if expected == BudgetMode::Normal { 8 } else { 7 };
        assert_eq!(rec.suggested_budget, Decimal::new(100 * ratio, 0));
    }

    #[test]
    fn test_festival_calendar_can_be_replaced() {
        let dir = tempdir().unwrap();
        let engine = EngineConfig::default().with_festival_months([Month::August]);
        let ledger = Ledger::open(config(&dir).with_engine(engine)).unwrap();
        record(&ledger, "alice", Operation::Income, 1000, "2024/07/01 09:00");

        assert_eq!(ledger.recommend("alice", date(2024, 7, 15)).mode, BudgetMode::EconomicalFestival);
        assert_eq!(ledger.recommend("alice", date(2024, 10, 15)).mode, BudgetMode::Normal);
    }

    #[rstest]
    #[case::three_large_expenses(3, BudgetMode::EconomicalUnstable)]
    #[case::two_large_expenses(2, BudgetMode::Normal)]
    fn test_unstable_detection(#[case] large: usize, #[case] expected: BudgetMode) {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(config(&dir)).unwrap();
        for day in 0..large {
            record(&ledger, "bob", Operation::Expense, 1001, &format!("2024/07/{:02} 12:00", day + 10));
        }
        // Exactly at the threshold does not count as large
        record(&ledger, "bob", Operation::Expense, 1000, "2024/07/20 12:00");
        record(&ledger, "bob", Operation::Income, 4000, "2024/08/01 09:00");

        let rec = ledger.recommend("bob", date(2024, 8, 15));

        assert_eq!(rec.mode, expected);
    }

    #[test]
    fn test_out_of_bounds_ratio_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(config(&dir)).unwrap();
        for month in 4..=6 {
            record(&ledger, "carol", Operation::Income, 1000, &format!("2024/0{}/01 09:00", month));
            record(&ledger, "carol", Operation::Expense, 1600, &format!("2024/0{}/15 09:00", month));
        }
        record(&ledger, "carol", Operation::Income, 2000, "2024/07/01 09:00");

        let rec = ledger.recommend("carol", date(2024, 7, 20));

        assert!(rec.has_past_data);
        assert_eq!(rec.mode, BudgetMode::Normal);
        assert_eq!(rec.suggested_budget, Decimal::new(1600, 0));
        assert_eq!(rec.suggested_saving, Decimal::new(400, 0));
    }

    #[test]
    fn test_learned_ratio_is_used_within_bounds() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(config(&dir)).unwrap();
        for (month, expense) in [(4, 500), (5, 600), (6, 700)] {
            record(&ledger, "dave", Operation::Income, 1000, &format!("2024/0{}/01 09:00", month));
            record(&ledger, "dave", Operation::Expense, expense, &format!("2024/0{}/15 09:00", month));
        }
        record(&ledger, "dave", Operation::Income, 3000, "2024/07/01 09:00");

        let rec = ledger.recommend("dave", date(2024, 7, 20));

        assert!(rec.has_past_data);
        assert_eq!(rec.suggested_budget, Decimal::new(1800, 0));
        assert_eq!(rec.suggested_saving, Decimal::new(1200, 0));
    }

    #[test]
    fn test_zero_income_month_clamps_to_zero() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(config(&dir)).unwrap();
        record(&ledger, "erin", Operation::Expense, 300, "2024/07/03 09:00");

        let rec = ledger.recommend("erin", date(2024, 7, 20));

        assert_eq!(rec.income, Decimal::ZERO);
        assert_eq!(rec.suggested_budget, Decimal::ZERO);
        assert_eq!(rec.suggested_saving, Decimal::ZERO);
    }

    #[test]
    fn test_append_then_read_and_rollback() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(config(&dir)).unwrap();
        let tx = Transaction::builder("alice", Operation::Expense, Decimal::new(4210, 2), "2024/06/11 13:05")
            .merchant("Books, Maps & More")
            .remark("gift for \"Sam\"")
            .category("Leisure")
            .build()
            .unwrap();

        ledger.add_transaction(&tx).unwrap();
        assert_eq!(ledger.read_transactions("alice").unwrap(), vec![tx.clone()]);

        assert!(ledger.remove_transaction("alice", tx.timestamp).unwrap());
        assert!(ledger.read_transactions("alice").unwrap().is_empty());
        assert!(!ledger.remove_transaction("alice", tx.timestamp).unwrap());

        let content = fs::read_to_string(ledger.store().path()).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn test_invalid_records_are_rejected_before_io() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(config(&dir)).unwrap();
        let before = fs::read_to_string(ledger.store().path()).unwrap();

        let mut tx = Transaction::builder("alice", Operation::Expense, Decimal::ONE, "2024/06/01 10:00")
            .build()
            .unwrap();
        tx.username = " ".to_string();

        assert!(matches!(ledger.add_transaction(&tx), Err(LedgerError::Validation { .. })));
        assert!(Transaction::builder("alice", Operation::Expense, Decimal::ONE, "2024-06-01 10:00:00")
            .build()
            .is_err());
        assert_eq!(fs::read_to_string(ledger.store().path()).unwrap(), before);
    }

    #[test]
    fn test_overview_lists_large_expenses_and_festival_note() {
        let dir = tempdir().unwrap();
        let mut ledger = Ledger::open(config(&dir)).unwrap();
        record(&ledger, "alice", Operation::Income, 2000, "2024/10/01 09:00");
        for (amount, time, kind) in [(150, "2024/10/05 10:00", "Food"), (90, "2024/10/06 10:00", "Food"), (145, "2024/10/07 10:00", "Travel")] {
            let tx = Transaction::builder("alice", Operation::Expense, Decimal::new(amount, 0), time)
                .kind(kind)
                .build()
                .unwrap();
            ledger.add_transaction(&tx).unwrap();
        }
        ledger.save_custom_budget("alice", Decimal::new(1500, 0)).unwrap();

        let overview = ledger.overview("alice", date(2024, 10, 20));

        assert_eq!(overview.month_income, Decimal::new(2000, 0));
        assert_eq!(overview.month_expense, Decimal::new(385, 0));
        assert_eq!(overview.top_expense_type.as_deref(), Some("Food"));
        // Listing threshold is max(2000 x 0.07, 100) = 140
        assert_eq!(overview.large_expenses.len(), 2);
        assert_eq!(overview.custom_budget, Some(Decimal::new(1500, 0)));
        assert_eq!(overview.recommendation.mode, BudgetMode::Custom);
        assert!(overview.recommendation.reason.contains("festival"));
    }

    #[test]
    fn test_average_daily_expense() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(config(&dir)).unwrap();
        // April 30 days + May 31 days = 61 days
        record(&ledger, "alice", Operation::Expense, 305, "2024/04/10 10:00");
        record(&ledger, "alice", Operation::Expense, 305, "2024/05/10 10:00");
        record(&ledger, "alice", Operation::Expense, 999, "2024/06/01 10:00");

        assert_eq!(ledger.average_daily_expense("alice", date(2024, 6, 15), 2), Decimal::new(10, 0));
        assert_eq!(ledger.average_daily_expense("alice", date(2024, 6, 15), 0), Decimal::ZERO);
    }

    #[test]
    fn test_import_skips_bad_rows_and_rejects_bad_header() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(config(&dir)).unwrap();

        let report = ledger
            .import_transactions(Path::new("tests/fixtures/corrupt_lines/ledger.csv"))
            .unwrap();
        assert_eq!(report.imported, 4);
        assert_eq!(report.skipped, 6);
        assert_eq!(ledger.read_transactions("alice").unwrap().len(), 3);
        assert_eq!(ledger.read_transactions("bob").unwrap().len(), 1);

        let bad = dir.path().join("bad.csv");
        fs::write(&bad, "who,what\nalice,Income\n").unwrap();
        assert!(matches!(
            ledger.import_transactions(&bad),
            Err(LedgerError::InvalidHeader { .. })
        ));
        assert!(matches!(
            ledger.import_transactions(&dir.path().join("absent.csv")),
            Err(LedgerError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_writer_appends_are_visible_to_facade() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(config(&dir)).unwrap();
        assert!(ledger.read_transactions("zoe").unwrap().is_empty());
        let writer = ledger.spawn_writer().unwrap();

        for day in 1..=5 {
            let tx = Transaction::builder("zoe", Operation::Income, Decimal::new(100, 0), format!("2024/06/0{} 09:00", day))
                .build()
                .unwrap();
            writer.append(tx).await.unwrap();
            assert_eq!(ledger.read_transactions("zoe").unwrap().len(), day);
        }
        drop(writer);

        assert_eq!(ledger.store().history("zoe").unwrap().len(), 5);
        assert_eq!(ledger.recommend("zoe", date(2024, 6, 15)).income, Decimal::new(500, 0));
    }

    #[test]
    fn test_oversized_amounts_do_not_break_recommendations() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir);
        fs::write(
            &cfg.ledger_path,
            "user,operation,amount,time,merchant,type,remark,category,payment_method,location,tag,attachment,recurrence\n\
             alice,Income,50000000000000000000000000000,2024/06/01 09:00,u\n\
             alice,Income,50000000000000000000000000000,2024/06/02 09:00,u\n\
             alice,Income,1000.00,2024/06/03 09:00,u\n",
        )
        .unwrap();
        let ledger = Ledger::open(cfg).unwrap();

        let rec = ledger.recommend("alice", date(2024, 6, 15));
        assert_eq!(rec.income, Decimal::new(1000, 0));
        assert_eq!(rec.suggested_budget, Decimal::new(800, 0));

        let overview = ledger.overview("alice", date(2024, 6, 15));
        assert_eq!(overview.month_income, Decimal::new(1000, 0));
        assert_eq!(ledger.financial_summary("alice", 2024).unwrap().balance, Decimal::new(1000, 0));
    }
}
