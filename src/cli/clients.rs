use super::config::open_node;

/// List registered members with their sync state
pub async fn execute(config: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let node = open_node(config)?;
    let version = node.current_version()?;
    let clients = node.list_clients()?;

    println!("👥 Consortium members (server key v{})", version);
    println!();

    if clients.is_empty() {
        println!("  No members registered. Use `silentmatch register --name <bank>`.");
        return Ok(());
    }

    for (name, api_key) in clients {
        let synced = node
            .client(&api_key)?
            .map(|record| record.last_sync_version)
            .unwrap_or_default();
        let marker = if synced < version { "⚠️  outdated" } else { "✅ synced" };
        println!("  {}  {}  v{}  {}", api_key.as_str(), name, synced, marker);
    }

    Ok(())
}
