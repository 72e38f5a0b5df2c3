use super::config::open_node;

/// Initialize node state
///
/// Creates the config file if missing, then loads or creates the server key
/// and the active ledger. Running it again on an initialized node only
/// reports the existing state.
pub async fn execute(config: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let node = open_node(config)?;

    println!("✅ SilentMatch node ready");
    println!("  Key version: v{}", node.current_version()?);
    println!("  Active ledger entries: {}", node.active_ledger_len()?);
    println!("  Registered members: {}", node.list_clients()?.len());

    Ok(())
}
