use super::config::open_node;

/// Register a consortium member
///
/// The API key is printed once. The node stores it but never logs it.
pub async fn execute(name: String, config: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    if name.trim().is_empty() {
        return Err("Member name must not be empty".into());
    }

    let node = open_node(config)?;
    let api_key = node.register_client(name.trim())?;

    println!("✅ Registered {}", name.trim());
    println!("  API key: {}", api_key.as_str());
    println!();
    println!("Keep this key private. Run `silentmatch ingest` with it to sync the member.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::write_test_config;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_register_persists_member() {
        let temp_dir = TempDir::new().unwrap();
        let config = write_test_config(temp_dir.path());

        execute("Bank A".to_string(), Some(config.clone())).await.unwrap();

        let node = open_node(Some(config)).unwrap();
        let clients = node.list_clients().unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].0, "Bank A");
    }

    #[tokio::test]
    async fn test_register_rejects_blank_name() {
        let temp_dir = TempDir::new().unwrap();
        let config = write_test_config(temp_dir.path());

        assert!(execute("   ".to_string(), Some(config)).await.is_err());
    }
}
