use super::config::open_node;
use silentmatch::protocol::ConsortiumNode;

/// Rotate the server key
///
/// The previous ledger is archived untouched. Every member becomes outdated
/// until it re-ingests under the new version.
pub async fn execute(config: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let node = open_node(config)?;
    let previous = node.current_version()?;
    let version = node.rotate().await?;

    println!("🔄 Server key rotated: v{} -> v{}", previous, version);
    println!("  Ledger v{} archived; new ledger v{} is empty.", previous, version);
    println!("  All members must re-ingest their records.");

    Ok(())
}
