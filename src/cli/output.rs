use crate::archive::PackageSummary;
use crate::deploy::{PublishReport, Verification};
use crate::types::{DeploymentId, PublishOutcome};

/// Print the result of packaging a bundle
pub fn print_package_summary(summary: &PackageSummary) {
    println!("📦 Bundle: {}", summary.output.display());
    println!("  • Entries: {}", summary.entries.len());
    println!("  • Metadata files excluded: {}", summary.excluded);
    for entry in &summary.entries {
        println!("    {entry}");
    }
}

pub fn print_publish_report(report: &PublishReport) {
    println!("📦 Bundle: {} ({} entries)", report.archive.display(), report.entries.len());
    println!("🆔 Deployment: {}", report.deployment);
    if report.attempts > 0 {
        println!("🔁 Status checks: {}", report.attempts);
    }
    println!("{} {}", outcome_icon(report.outcome), report.message());
}

pub fn print_verification(deployment: &DeploymentId, verification: &Verification) {
    println!("🆔 Deployment: {deployment}");
    println!(
        "{} {} (after {} status checks, {:?})",
        outcome_icon(verification.outcome),
        verification.outcome.message(),
        verification.attempts,
        verification.elapsed
    );
}

fn outcome_icon(outcome: PublishOutcome) -> &'static str {
    match outcome {
        PublishOutcome::Uploaded => "⚠️ ",
        PublishOutcome::Validated => "✅",
        PublishOutcome::Published => "🚀",
    }
}
