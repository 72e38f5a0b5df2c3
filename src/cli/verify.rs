use super::config::open_node;
use super::read_input;
use silentmatch::protocol::{
    ApiKey, Applicant, BankProtocolClient, ClientStatus, Verdict, VerificationReport,
};
use std::sync::Arc;

/// Screen applicants against the consortium ledger
///
/// Runs even when the member is outdated, but then warns that matches
/// contributed before the last rotation can no longer be found.
pub async fn execute(
    api_key: String,
    input: String,
    config: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let applicants: Vec<Applicant> = read_input(&input)?;
    let node = Arc::new(open_node(config)?);
    let client = BankProtocolClient::new(ApiKey::new(api_key), node)?;

    println!("🔍 Screening {} applicants...", applicants.len());
    let report = client.process_verification(&applicants).await?;
    print_report(&report);

    Ok(())
}

fn print_report(report: &VerificationReport) {
    if let ClientStatus::Outdated {
        client_version,
        server_version,
    } = report.client_status
    {
        println!(
            "⚠️  Degraded: member synced at v{}, server is on v{}. Re-run ingestion.",
            client_version, server_version
        );
    }
    println!();

    for applicant in &report.applicants {
        let label = match applicant.verdict {
            Verdict::Clean => "✅ CLEAN",
            Verdict::Review => "🔎 REVIEW",
            Verdict::VictimProtection => "🛡️  VICTIM PROTECTION",
            Verdict::HighRiskBlock => "⛔ HIGH RISK - BLOCK",
        };
        println!("  {}: {}", applicant.applicant_id, label);
        for alert in &applicant.alerts {
            println!(
                "    - {} matched {} ({}) -> {:?}",
                alert.kind, alert.risk, alert.role, alert.action
            );
        }
    }

    println!();
    println!(
        "{} of {} applicants flagged",
        report.flagged().count(),
        report.applicants.len()
    );
}
