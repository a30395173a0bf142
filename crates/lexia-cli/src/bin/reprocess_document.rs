use anyhow::Result;
use clap::Parser;

use lexia_cli::{build_app, init_tracing};
use lexia_core::{Config, ContentFingerprint};

#[derive(Parser, Debug)]
#[command(name = "reprocess_document")]
#[command(about = "Re-extract and re-score a committed record under the current rule table")]
struct Args {
    /// Content fingerprint of the record to reprocess (64 hex chars)
    fingerprint: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = Config::from_env()?;
    let app = build_app(&config).await?;

    let fingerprint =
        ContentFingerprint::from_hex(&args.fingerprint).map_err(|e| anyhow::anyhow!("{}", e))?;

    match app.pipeline.reprocess(&fingerprint).await {
        Ok(record) => {
            println!("Superseded: record {} now current", record.id);
            println!(
                "  rule table: {}",
                record.provenance.rule_table_version
            );
            println!(
                "  scores: relevancy {} / legal {} / page {} / case {}",
                record.scores.relevancy,
                record.scores.legal_weight,
                record.scores.page_severity,
                record.scores.case_severity
            );
        }
        Err(e) => {
            use lexia_core::ErrorMetadata;
            eprintln!(
                "Reprocess failed [{}]: {}",
                e.error_code(),
                e.client_message()
            );
            std::process::exit(1);
        }
    }

    Ok(())
}
