//! Human and JSON output

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use fieldscan_core::application::{InstanceState, ScanReport};
use fieldscan_core::domain::{Outcome, SkipReason};

#[derive(Tabled)]
struct CpuRow {
    cpu: u32,
    #[tabled(rename = "pkg/core/thread")]
    location: String,
    result: &'static str,
    detail: String,
    #[tabled(rename = "ms")]
    duration_ms: i64,
}

#[derive(Tabled)]
struct InstanceRow {
    instance: String,
    status: String,
    current_batch: String,
    details: String,
    image_version: String,
}

fn result_label(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Success => "pass",
        Outcome::Skip(_) => "skip",
        Outcome::Fail(_) => "FAIL",
    }
}

fn outcome_detail(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Success => String::new(),
        Outcome::Skip(reason) => reason.to_string(),
        Outcome::Fail(detail) => detail.to_string(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_report(report: &ScanReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }

    println!(
        "{} image {} version {} (session {})",
        "In-Field Scan".cyan().bold(),
        report.session.image_id,
        report.session.image_version,
        report.session.session_id
    );
    println!();

    let rows: Vec<CpuRow> = report
        .cpus
        .iter()
        .map(|r| CpuRow {
            cpu: r.cpu.cpu_number,
            location: format!("{}/{}/{}", r.cpu.package_id, r.cpu.core_id, r.cpu.thread_index),
            result: result_label(&r.outcome),
            detail: outcome_detail(&r.outcome),
            duration_ms: r.duration_ms,
        })
        .collect();
    println!("{}", Table::new(rows));
    println!();

    let summary = format!(
        "{} passed, {} skipped, {} failed in {} ms",
        report.count(Outcome::is_success),
        report.count(Outcome::is_skip),
        report.count(Outcome::is_fail),
        report.duration_ms
    );
    match &report.overall {
        Outcome::Success => println!("{} {}", "✓ PASS".green().bold(), summary),
        Outcome::Skip(reason) => println!("{} {} ({})", "○ SKIP".yellow().bold(), summary, reason),
        Outcome::Fail(detail) => println!("{} {} ({})", "✗ FAIL".red().bold(), summary, detail),
    }
    Ok(())
}

/// Init declined to run the scan
pub fn print_init_skip(reason: &SkipReason, json: bool) -> Result<()> {
    if json {
        return print_json(&Outcome::Skip(reason.clone()));
    }
    println!("{} {}", "○ SKIP".yellow().bold(), reason);
    Ok(())
}

pub fn print_instances(states: &[InstanceState], json: bool) -> Result<()> {
    if json {
        return print_json(&states);
    }
    if states.is_empty() {
        println!("{}", "No scan instances found".yellow());
        return Ok(());
    }

    let dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let rows: Vec<InstanceRow> = states
        .iter()
        .map(|s| InstanceRow {
            instance: s.instance.clone(),
            status: dash(&s.status),
            current_batch: dash(&s.current_batch),
            details: dash(&s.details),
            image_version: dash(&s.image_version),
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldscan_core::domain::FailureDetail;

    #[test]
    fn test_labels() {
        assert_eq!(result_label(&Outcome::Success), "pass");
        assert_eq!(
            result_label(&Outcome::Skip(SkipReason::NotPrimaryThread)),
            "skip"
        );

        let fail = Outcome::Fail(FailureDetail {
            instance: "intel_ifs_1".to_string(),
            details: Some("0x8100008000".to_string()),
            image_id: "0x2".to_string(),
            image_version: "0x0500".to_string(),
        });
        assert_eq!(result_label(&fail), "FAIL");
        assert!(outcome_detail(&fail).contains("0x8100008000"));
        assert!(outcome_detail(&Outcome::Success).is_empty());
    }
}
