use std::env;
use std::process;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use insights_pipeline::outreach;
use insights_pipeline::record_loader::parse_timestamp;
use insights_pipeline::types::{ChurnRisk, CustomerMetrics, InsightsReport, RiskLevel};
use insights_pipeline::{
    CustomerInsightsPipeline, CustomerSegment, InMemoryRecords, InsightsConfig, InsightsQuery,
};

// ---------------------------------------------------------------------------
// CLI options
// ---------------------------------------------------------------------------

struct Options {
    data_dir: String,
    tenant: Option<String>,
    top: usize,
    segment: Option<CustomerSegment>,
    config_path: Option<String>,
    as_of: Option<DateTime<Utc>>,
    json_output: bool,
}

fn usage() -> ! {
    eprintln!(
        "Usage: insights-server <data-dir> [--tenant ID] [--top N] [--segment S] [--config FILE] [--as-of DATE] [--json]"
    );
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --tenant   Only report on this tenant (default: every tenant in visits.csv)");
    eprintln!("  --top      Number of customers to list, by lifetime value (default: 10)");
    eprintln!("  --segment  Only list customers in this segment (vip, loyal, regular, at-risk, new, churned)");
    eprintln!("  --config   TOML file overriding thresholds and pricing");
    eprintln!("  --as-of    Reference date for recency rules (default: now)");
    eprintln!("  --json     Output as JSON instead of formatted text");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  insights-server fixtures/sample");
    eprintln!("  insights-server fixtures/sample --tenant salon-1 --segment at-risk --as-of 2025-06-01 --json");
    process::exit(1);
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str, what: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value.as_str(),
        None => {
            eprintln!("Error: {} requires {}", flag, what);
            process::exit(1);
        }
    }
}

fn parse_args(args: &[String]) -> Options {
    if args.len() < 2 || args[1].starts_with("--") {
        usage();
    }

    let mut options = Options {
        data_dir: args[1].clone(),
        tenant: None,
        top: 10,
        segment: None,
        config_path: None,
        as_of: None,
        json_output: false,
    };

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--tenant" => {
                options.tenant = Some(flag_value(args, i, "--tenant", "a tenant ID").to_string());
                i += 2;
            }
            "--top" => {
                let raw = flag_value(args, i, "--top", "a number");
                options.top = raw.parse().unwrap_or_else(|_| {
                    eprintln!("Error: --top requires a non-negative integer");
                    process::exit(1);
                });
                i += 2;
            }
            "--segment" => {
                let raw = flag_value(args, i, "--segment", "a segment name");
                options.segment = Some(CustomerSegment::parse(raw).unwrap_or_else(|| {
                    eprintln!("Error: unknown segment '{}'", raw);
                    process::exit(1);
                }));
                i += 2;
            }
            "--config" => {
                options.config_path = Some(flag_value(args, i, "--config", "a file path").to_string());
                i += 2;
            }
            "--as-of" => {
                let raw = flag_value(args, i, "--as-of", "a date");
                options.as_of = Some(parse_timestamp(raw).unwrap_or_else(|| {
                    eprintln!("Error: --as-of expects YYYY-MM-DD or RFC 3339, got '{}'", raw);
                    process::exit(1);
                }));
                i += 2;
            }
            "--json" => {
                options.json_output = true;
                i += 1;
            }
            "--help" | "-h" => usage(),
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
    }

    options
}

// ---------------------------------------------------------------------------
// JSON output contract
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ReportJson<'a> {
    generated_at: String,
    pipeline_ms: u128,
    reports: &'a [InsightsReport],
}

// ---------------------------------------------------------------------------
// Human-readable output
// ---------------------------------------------------------------------------

/// Format a number with comma thousands separators.
fn format_dollars(amount: f64) -> String {
    let whole = amount.abs().round() as u64;
    let sign = if amount < 0.0 { "-" } else { "" };

    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}", sign, grouped.chars().rev().collect::<String>())
}

fn risk_marker(risk: Option<&ChurnRisk>) -> &'static str {
    match risk.map(|r| r.level) {
        Some(RiskLevel::Critical) => "!!",
        Some(RiskLevel::High) => "! ",
        _ => "  ",
    }
}

fn print_customer(rank: usize, c: &CustomerMetrics) {
    println!(
        "  {} {:>2}. {:24} {:8} ${:>7}  {:>3} visits  cancel {:.0}%",
        risk_marker(c.churn_risk.as_ref()),
        rank,
        c.customer_name,
        c.segment.to_string(),
        format_dollars(c.lifetime_value),
        c.total_visits,
        c.cancellation_rate,
    );
    println!(
        "         last visit {}  favorite: {} with {}  rating {:.1} ({} reviews)",
        c.last_visit_date.format("%Y-%m-%d"),
        c.favorite_service_name,
        c.favorite_staff_name,
        c.average_rating,
        c.review_count,
    );
    if let Some(ref risk) = c.churn_risk {
        if risk.level >= RiskLevel::Medium {
            println!(
                "         churn risk {} ({}): {}",
                risk.level,
                risk.score,
                risk.factors.join(", ")
            );
            println!("         -> {}", risk.recommendation);
        }
    }
}

fn print_human(report: &InsightsReport) {
    let rule = "\u{2550}".repeat(62);
    println!();
    println!("  \u{2554}{}\u{2557}", rule);
    println!("  \u{2551}{:^62}\u{2551}", format!("CUSTOMER INSIGHTS \u{00b7} {}", report.tenant_id));
    println!("  \u{255a}{}\u{255d}", rule);
    println!();

    let s = &report.summary;
    println!(
        "  {} customers  \u{00b7}  {} active  \u{00b7}  retention {:.1}%  \u{00b7}  churn {:.1}%",
        s.total_customers, s.active_customers, s.retention_rate, s.churn_rate
    );
    println!(
        "  avg lifetime value ${}  \u{00b7}  {:.1} visits per customer  \u{00b7}  as of {}",
        format_dollars(s.avg_lifetime_value),
        s.avg_visits_per_customer,
        report.as_of.format("%Y-%m-%d")
    );
    let segments: Vec<String> = CustomerSegment::ALL
        .iter()
        .map(|&segment| format!("{} {}", segment, s.segmentation.get(segment)))
        .collect();
    println!("  {}", segments.join("  \u{00b7}  "));
    let r = &report.retention;
    println!(
        "  {} new vs {} returning (completed visits)  \u{00b7}  repeat rate {:.1}%",
        r.new_customers, r.returning_customers, r.retention_rate
    );
    if !report.cohorts.is_empty() {
        let cohorts: Vec<String> = report
            .cohorts
            .iter()
            .map(|c| format!("{}: {}", c.cohort_month, c.customer_count))
            .collect();
        println!("  cohorts  {}", cohorts.join("  \u{00b7}  "));
    }
    println!();

    if report.customers.is_empty() {
        println!("  No customers match.");
    } else {
        println!("  {:\u{2500}<64}", "");
        for (i, c) in report.customers.iter().enumerate() {
            print_customer(i + 1, c);
            println!();
        }
        println!("  {:\u{2500}<64}", "");
    }

    print_outreach("At risk, longest absence first", &report.at_risk_customers, report.as_of);
    let reactivation = &report.reactivation;
    print_outreach(
        &format!("Win back, {} opportunities", reactivation.total_opportunities),
        &reactivation.customers,
        report.as_of,
    );
    println!();
}

fn print_outreach(title: &str, customers: &[CustomerMetrics], as_of: DateTime<Utc>) {
    if customers.is_empty() {
        return;
    }
    println!();
    println!("  {}", title);
    for c in customers {
        let days = outreach::days_since_last_completed(c, as_of).unwrap_or_default();
        println!(
            "    {:24} {:>4} days  projected ${:>7}",
            c.customer_name,
            days.round() as i64,
            format_dollars(c.projected_lifetime_value),
        );
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let options = parse_args(&args);

    let config = match options.config_path {
        Some(ref path) => InsightsConfig::load_file(path).unwrap_or_else(|e| {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }),
        None => InsightsConfig::default(),
    };

    let load_start = Instant::now();
    let records = InMemoryRecords::load_dir(&options.data_dir).unwrap_or_else(|e| {
        eprintln!("Error loading data: {}", e);
        process::exit(1);
    });
    log::info!("data loaded in {}ms", load_start.elapsed().as_millis());

    let available = records.tenant_ids();
    let tenants: Vec<String> = match options.tenant {
        Some(ref tenant) if available.contains(tenant) => vec![tenant.clone()],
        Some(ref tenant) => {
            eprintln!("Error: tenant '{}' not found in the data", tenant);
            eprintln!("  Available: {:?}", available);
            process::exit(1);
        }
        None => available,
    };

    let pipeline_start = Instant::now();
    let pipeline = CustomerInsightsPipeline::with_records(records, config);
    let as_of = options.as_of.unwrap_or_else(Utc::now);

    let mut reports = Vec::with_capacity(tenants.len());
    for (i, tenant) in tenants.iter().enumerate() {
        let mut query = InsightsQuery::new(format!("insights-{:03}", i + 1), tenant.as_str())
            .with_as_of(as_of)
            .with_limit(options.top);
        if let Some(segment) = options.segment {
            query = query.with_segment(segment);
        }
        match pipeline.generate_report(query).await {
            Ok(report) => reports.push(report),
            Err(e) => {
                eprintln!("Error building report for {}: {}", tenant, e);
                process::exit(1);
            }
        }
    }
    let pipeline_ms = pipeline_start.elapsed().as_millis();

    if options.json_output {
        let output = ReportJson {
            generated_at: Utc::now().to_rfc3339(),
            pipeline_ms,
            reports: &reports,
        };
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing report: {}", e);
                process::exit(1);
            }
        }
    } else {
        for report in &reports {
            print_human(report);
        }
        println!("  \u{23f1}  Pipeline ran in {}ms", pipeline_ms);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollars_are_grouped() {
        assert_eq!(format_dollars(0.0), "0");
        assert_eq!(format_dollars(750.0), "750");
        assert_eq!(format_dollars(12_345.4), "12,345");
        assert_eq!(format_dollars(-1_000_000.0), "-1,000,000");
    }

    #[test]
    fn parse_full_flag_set() {
        let args: Vec<String> = [
            "insights-server",
            "data",
            "--tenant",
            "salon-1",
            "--top",
            "3",
            "--segment",
            "at-risk",
            "--as-of",
            "2025-06-01",
            "--json",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let options = parse_args(&args);
        assert_eq!(options.data_dir, "data");
        assert_eq!(options.tenant.as_deref(), Some("salon-1"));
        assert_eq!(options.top, 3);
        assert_eq!(options.segment, Some(CustomerSegment::AtRisk));
        assert!(options.as_of.is_some());
        assert!(options.json_output);
        assert!(options.config_path.is_none());
    }
}
