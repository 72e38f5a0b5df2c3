use super::config::open_node;
use super::read_input;
use silentmatch::protocol::{ApiKey, BankProtocolClient, IngestionRecord};
use std::sync::Arc;

/// Contribute a bank's fraud records to the consortium
///
/// Every identity attribute is blinded and signed before it is written, so
/// the node's ledger only ever holds opaque signatures. A successful run
/// marks the member synchronized with the current key version.
pub async fn execute(
    api_key: String,
    input: String,
    config: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let records: Vec<IngestionRecord> = read_input(&input)?;
    let node = Arc::new(open_node(config)?);
    let client = BankProtocolClient::new(ApiKey::new(api_key), node)?;

    println!("🔐 Blinding {} records...", records.len());
    let summary = client.process_ingestion(&records).await?;

    println!(
        "✅ Submitted {} signatures under key v{}",
        summary.submitted, summary.key_version
    );
    if summary.skipped_records > 0 {
        println!(
            "  Skipped {} records with no usable identity attribute",
            summary.skipped_records
        );
    }

    Ok(())
}
