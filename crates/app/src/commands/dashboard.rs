use std::sync::Arc;

use assess_core::model::{AgeBand, ResultDraft, ResultId, Subject};
use assess_core::trend::{BaselineStatus, PatientTrendSummary, Trend, TrendOverview};
use chrono::{Duration, Utc};
use services::TrendService;
use storage::repository::Storage;

// name, age, band, baseline score, current score, hours since current; scores out of 20
const DEMO_PATIENTS: [(&str, u8, AgeBand, u32, u32, i64); 4] = [
    ("Margaret Wilson", 72, AgeBand::Elderly, 17, 11, 2),
    ("Robert Chen", 45, AgeBand::Adult, 18, 18, 4),
    ("Sarah Johnson", 68, AgeBand::Elderly, 16, 15, 1),
    ("Michael Torres", 35, AgeBand::Adult, 19, 14, 0),
];
const DEMO_TOTAL: u32 = 20;

fn trend_label(trend: Trend) -> &'static str {
    match trend {
        Trend::Up => "improving",
        Trend::Down => "declining",
        Trend::Stable => "stable",
        Trend::New => "new",
    }
}

fn status_label(summary: &PatientTrendSummary) -> String {
    match summary.status {
        Some(BaselineStatus::Normal) => "within normal range".to_owned(),
        Some(status) => format!("{} ({:.0}% below baseline)", status.as_str(), summary.below_baseline_pct),
        None => "-".to_owned(),
    }
}

fn print_table(overview: &TrendOverview, summaries: &[PatientTrendSummary]) {
    println!(
        "{} patients, {} assessed, {} active alerts, {} warnings: {} improving, {} declining, {} stable, {} new. Average {:.0}%",
        overview.total_patients,
        overview.assessed,
        overview.alerts,
        overview.warnings,
        overview.improving,
        overview.declining,
        overview.stable,
        overview.new,
        overview.average_performance
    );
    println!();
    println!(
        "{:<5} {:<20} {:>4} {:>6} {:>8} {:>7} {:>7}  {:<10} status",
        "id", "name", "age", "tests", "baseline", "latest", "average", "trend"
    );
    for summary in summaries {
        if summary.assessments.is_empty() {
            println!(
                "{:<5} {:<20} {:>4} {:>6} {:>8} {:>7} {:>7}  {:<10} -",
                summary.patient_id.to_string(), summary.name, summary.age, 0, "-", "-", "-", "-"
            );
            continue;
        }
        println!(
            "{:<5} {:<20} {:>4} {:>6} {:>7.0}% {:>6.0}% {:>6.0}%  {:<10} {}",
            summary.patient_id.to_string(),
            summary.name,
            summary.age,
            summary.assessments.len(),
            summary.baseline_score,
            summary.latest_score,
            summary.average_score,
            trend_label(summary.trend),
            status_label(summary)
        );
        for result in &summary.assessments {
            println!(
                "      result {:<6} {:<10} {}/{} ({:.0}%)  {}",
                result.id().to_string(),
                result.band().as_str(),
                result.score(),
                result.total_questions(),
                result.percentage(),
                result.completed_at().format("%Y-%m-%d %H:%M")
            );
        }
    }
}

pub async fn trends(storage: &Storage, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let service = TrendService::new(Arc::clone(&storage.results));
    let summaries = service.patient_trends().await?;
    let overview = TrendOverview::from_summaries(&summaries);

    if json {
        let body = serde_json::json!({
            "overview": overview,
            "patients": summaries,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print_table(&overview, &summaries);
    }
    Ok(())
}

pub async fn delete(storage: &Storage, id: ResultId) -> Result<(), Box<dyn std::error::Error>> {
    TrendService::new(Arc::clone(&storage.results))
        .delete_result(id)
        .await?;
    println!("Deleted result {id}.");
    Ok(())
}

pub async fn seed(storage: &Storage) -> Result<(), Box<dyn std::error::Error>> {
    let now = Utc::now();
    for (name, age, band, baseline, current, hours_ago) in DEMO_PATIENTS {
        let subject = Subject {
            name: name.to_owned(),
            age,
        };
        let patient = storage
            .patients
            .create_patient(&subject, now - Duration::days(30))
            .await?;
        let history = [
            (baseline, now - Duration::days(14)),
            (current, now - Duration::hours(hours_ago)),
        ];
        for (score, completed_at) in history {
            let draft = ResultDraft::new(patient, band, score, DEMO_TOTAL, completed_at)?;
            storage.results.save_result(&draft).await?;
        }
        println!("Seeded {name} as patient {patient}.");
    }
    Ok(())
}
