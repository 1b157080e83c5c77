// SMS Ledger demo binary
// Feeds SMS text through the parse → categorize → learn pipeline.
//
// Modes:
//   sms-ledger demo               built-in sample messages
//   sms-ledger pipe [db-path]     read "SENDER|BODY" lines from stdin

use anyhow::Result;
use chrono::Utc;
use sms_ledger::{
    Categorizer, CategoryRegistry, CategorySource, KeywordClassifier, SqliteStore, TemplateSet,
};
use std::env;
use std::io::BufRead;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("pipe") => run_pipe(args.get(2).map(String::as_str))?,
        _ => run_demo()?,
    }

    Ok(())
}

fn run_demo() -> Result<()> {
    println!("📨 SMS Ledger v{} - pipeline demo", sms_ledger::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let store = SqliteStore::open_in_memory()?;
    let categorizer = Categorizer::with_defaults(store);

    let samples = [
        (
            "VM-HDFCBK",
            "Rs.1,500.50 debited from a/c **1234 on 15-12-23 at AMAZON PAY. Avl bal Rs.32,100",
        ),
        (
            "AD-ICICIB",
            "INR 25000.00 credited to account XX8821 towards SALARY CREDIT on 01/12/2023",
        ),
        (
            "VM-HDFCBK",
            "Rs.249.00 debited from a/c **1234 on 16-12-23 at SWIGGY INSTAMART",
        ),
        ("AX-SBIINB", "Dear customer, your OTP is 445566. Do not share it."),
        (
            "VM-AXISBK",
            "Rs.320.00 paid to SHARMA GENERAL STORES on 17-12-23 from card **9911",
        ),
    ];

    let today = Utc::now().date_naive();

    for (sender, body) in samples {
        println!("\n📩 {sender}: {body}");
        match categorizer.process_sms(sender, body, today) {
            Some((txn, result)) => {
                println!(
                    "   → {:?} {} | {} | {} ({:.0}%, {:?})",
                    txn.kind,
                    txn.amount,
                    if txn.merchant.is_empty() { "<no merchant>" } else { txn.merchant.as_str() },
                    result.category.name,
                    result.confidence * 100.0,
                    result.source,
                );
            }
            None => println!("   → dropped (not a transaction)"),
        }
    }

    // A correction teaches the merchant history layer
    println!("\n✏️  User files SHARMA GENERAL STORES under Groceries...");
    categorizer.learn_from_user_input("SHARMA GENERAL STORES", "groceries")?;

    let result = categorizer.categorize("SHARMA GENERAL STORES");
    println!(
        "   → next time: {} ({:.0}%, {:?})",
        result.category.name,
        result.confidence * 100.0,
        result.source,
    );
    if result.source != CategorySource::MerchantHistory {
        eprintln!("⚠️  expected the correction to come back via merchant history");
    }

    println!("\n✅ Demo complete");
    Ok(())
}

fn run_pipe(db_path: Option<&str>) -> Result<()> {
    let store = match db_path {
        Some(path) => SqliteStore::open(path)?,
        None => SqliteStore::open_in_memory()?,
    };

    // User keyword mappings and categories persisted in the db take over
    // from the built-in defaults once they exist
    let keywords = match store.load_keywords()? {
        entries if entries.is_empty() => KeywordClassifier::with_defaults(),
        entries => KeywordClassifier::from_entries(entries),
    };
    let mut categories = CategoryRegistry::with_defaults();
    for category in store.load_categories()? {
        categories.add(category);
    }

    let categorizer = Categorizer::new(store, TemplateSet::with_defaults(), keywords, categories);
    let today = Utc::now().date_naive();

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let Some((sender, body)) = line.split_once('|') else {
            eprintln!("skipping line without SENDER|BODY format");
            continue;
        };

        match categorizer.process_sms(sender.trim(), body.trim(), today) {
            Some((txn, result)) => println!(
                "{}\t{:?}\t{}\t{}\t{}\t{:.2}",
                txn.date, txn.kind, txn.amount, txn.merchant, result.category.name, result.confidence,
            ),
            None => eprintln!("dropped: {body}"),
        }
    }

    Ok(())
}
