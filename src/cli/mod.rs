use clap::{Parser, Subcommand};

pub mod clients;
pub mod config;
pub mod ingest;
pub mod init;
pub mod register;
pub mod rotate;
pub mod status;
pub mod verify;
pub mod version;

#[derive(Parser)]
#[command(name = "silentmatch")]
#[command(author = "SilentMatch Project")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for the SilentMatch fraud consortium node", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize node state (config, server key v1, empty ledger)
    Init {
        /// Path to config file (default: ~/.config/silentmatch/config.toml)
        #[arg(long)]
        config: Option<String>,
    },

    /// Register a consortium member and print its API key
    Register {
        /// Display name of the member bank
        #[arg(long)]
        name: String,

        /// Path to config file
        #[arg(long)]
        config: Option<String>,
    },

    /// List registered members and their sync state
    Clients {
        /// Path to config file
        #[arg(long)]
        config: Option<String>,
    },

    /// Rotate the server key; every existing signature stops matching
    Rotate {
        /// Path to config file
        #[arg(long)]
        config: Option<String>,
    },

    /// Show node state and a member's sync status
    Status {
        /// API key to check
        #[arg(long)]
        api_key: String,

        /// Path to config file
        #[arg(long)]
        config: Option<String>,
    },

    /// Contribute fraud records from a JSON file
    Ingest {
        /// API key of the contributing member
        #[arg(long)]
        api_key: String,

        /// JSON array of {email?, phone?, national_id?, name?, risk, role}
        #[arg(long)]
        input: String,

        /// Path to config file
        #[arg(long)]
        config: Option<String>,
    },

    /// Screen applicants from a JSON file against the consortium ledger
    Verify {
        /// API key of the querying member
        #[arg(long)]
        api_key: String,

        /// JSON array of {id, email?, phone?, national_id?, name?}
        #[arg(long)]
        input: String,

        /// Path to config file
        #[arg(long)]
        config: Option<String>,
    },

    /// Display version information
    Version,
}

/// Read a JSON array of input records from a file.
pub fn read_input<T: serde::de::DeserializeOwned>(
    path: &str,
) -> Result<Vec<T>, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read input file '{}': {}", path, e))?;
    let records = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse input file '{}': {}", path, e))?;
    Ok(records)
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Init { config } => init::execute(config).await,
        Commands::Register { name, config } => register::execute(name, config).await,
        Commands::Clients { config } => clients::execute(config).await,
        Commands::Rotate { config } => rotate::execute(config).await,
        Commands::Status { api_key, config } => status::execute(api_key, config).await,
        Commands::Ingest {
            api_key,
            input,
            config,
        } => ingest::execute(api_key, input, config).await,
        Commands::Verify {
            api_key,
            input,
            config,
        } => verify::execute(api_key, input, config).await,
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["silentmatch", "init"]);

        match cli.command {
            Commands::Init { config } => assert_eq!(config, None),
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn test_cli_parse_register() {
        let cli = Cli::parse_from([
            "silentmatch",
            "register",
            "--name",
            "Bank A",
            "--config",
            "/etc/silentmatch/config.toml",
        ]);

        match cli.command {
            Commands::Register { name, config } => {
                assert_eq!(name, "Bank A");
                assert_eq!(config, Some("/etc/silentmatch/config.toml".to_string()));
            }
            _ => panic!("Expected Register command"),
        }
    }

    #[test]
    fn test_cli_register_requires_name() {
        assert!(Cli::try_parse_from(["silentmatch", "register"]).is_err());
    }

    #[test]
    fn test_cli_parse_ingest() {
        let cli = Cli::parse_from([
            "silentmatch",
            "ingest",
            "--api-key",
            "00112233445566778899aabbccddeeff",
            "--input",
            "fraud.json",
        ]);

        match cli.command {
            Commands::Ingest {
                api_key,
                input,
                config,
            } => {
                assert_eq!(api_key, "00112233445566778899aabbccddeeff");
                assert_eq!(input, "fraud.json");
                assert_eq!(config, None);
            }
            _ => panic!("Expected Ingest command"),
        }
    }

    #[test]
    fn test_cli_parse_verify() {
        let cli = Cli::parse_from([
            "silentmatch",
            "verify",
            "--api-key",
            "abc",
            "--input",
            "applicants.json",
        ]);

        match cli.command {
            Commands::Verify { api_key, input, .. } => {
                assert_eq!(api_key, "abc");
                assert_eq!(input, "applicants.json");
            }
            _ => panic!("Expected Verify command"),
        }
    }

    #[test]
    fn test_cli_verify_requires_input() {
        assert!(Cli::try_parse_from(["silentmatch", "verify", "--api-key", "abc"]).is_err());
    }

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::parse_from(["silentmatch", "status", "--api-key", "abc"]);
        assert!(matches!(cli.command, Commands::Status { .. }));
    }

    #[test]
    fn test_cli_parse_rotate_and_clients() {
        let cli = Cli::parse_from(["silentmatch", "rotate"]);
        assert!(matches!(cli.command, Commands::Rotate { config: None }));

        let cli = Cli::parse_from(["silentmatch", "clients"]);
        assert!(matches!(cli.command, Commands::Clients { config: None }));
    }

    #[test]
    fn test_cli_parse_version() {
        let cli = Cli::parse_from(["silentmatch", "version"]);
        assert!(matches!(cli.command, Commands::Version));
    }
}
