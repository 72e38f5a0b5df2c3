use super::config::open_node;
use silentmatch::protocol::{ApiKey, ClientStatus, ConsortiumNode};

/// Show node state and one member's sync status
///
/// An unknown key is reported, not treated as a failure, so operators can
/// use this to check a credential.
pub async fn execute(api_key: String, config: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let node = open_node(config)?;
    let api_key = ApiKey::new(api_key);
    let status = node.authenticate(&api_key).await?;

    println!("📊 SilentMatch Node Status");
    println!();
    println!("  Key version: v{}", node.current_version()?);
    println!("  Active ledger entries: {}", node.active_ledger_len()?);
    println!();

    match node.client(&api_key)? {
        Some(record) => println!("  Member: {}", record.name),
        None => println!("  Member: unknown"),
    }
    let icon = match status {
        ClientStatus::Ok => "✅",
        ClientStatus::Outdated { .. } => "⚠️ ",
        ClientStatus::InvalidKey => "❌",
    };
    println!("  {} {}", icon, status);

    Ok(())
}
