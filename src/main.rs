use anyhow::{bail, Context};
use rqdoc::{DiscoveryClient, DocValue, HttpTransport, StoreApi, StoreConfig};
use serde::Deserialize;
use std::fs;
use tracing_subscriber::{self, filter::LevelFilter, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Logging section of the configuration file
#[derive(Deserialize)]
struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Root configuration structure
#[derive(Deserialize, Default)]
struct Config {
    #[serde(default)]
    store: StoreConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

/// Command line arguments structure
struct CliArgs {
    config_path: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    command: Option<String>,
    operand: Option<String>,
    show_help: bool,
    show_version: bool,
}

fn print_help() {
    println!("rqdoc v{} - document-store client for rqlite clusters", VERSION);
    println!();
    println!("USAGE:");
    println!("    rqdoc [OPTIONS] query \"<sql>\"");
    println!("    rqdoc [OPTIONS] execute \"<statement>\"");
    println!("    rqdoc [OPTIONS] discover [url]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>    Path to configuration file (TOML format)");
    println!("    -H, --host <HOST>      Cluster node host (default: 127.0.0.1)");
    println!("    -p, --port <PORT>      Cluster node port (default: 4001)");
    println!("    -h, --help             Print help information");
    println!("    -v, --version          Print version information");
    println!();
    println!("EXAMPLES:");
    println!("    # Read documents through the configured node");
    println!("    rqdoc query \"SELECT json FROM product\"");
    println!();
    println!("    # Write through the leader (followers redirect)");
    println!("    rqdoc -H 10.0.0.7 -p 4001 execute \"DELETE FROM product WHERE id = \\\"a1\\\"\"");
    println!();
    println!("    # Ask the discovery service for the current members");
    println!("    rqdoc -c config/rqdoc.toml discover");
    println!();
    println!("CONFIGURATION FILE:");
    println!("    See config/rqdoc.toml for a complete configuration template.");
    println!();
    println!("    [store]");
    println!("    protocol = \"http\"     # or \"https\"");
    println!("    host = \"127.0.0.1\"");
    println!("    port = 4001");
    println!("    consistency_level = \"weak\"   # none, weak or strong");
    println!("    max_redirects = 10");
    println!();
    println!("    [logging]");
    println!("    level = \"info\"        # trace, debug, info, warn, error");
}

fn print_version() {
    println!("rqdoc {}", VERSION);
}

/// Parse command line arguments
fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        host: None,
        port: None,
        command: None,
        operand: None,
        show_help: false,
        show_version: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                cli.show_help = true;
                return cli;
            }
            "-v" | "--version" => {
                cli.show_version = true;
                return cli;
            }
            "-c" | "--config" => {
                if i + 1 < args.len() {
                    cli.config_path = Some(args[i + 1].clone());
                    i += 1;
                } else {
                    eprintln!("Error: {} requires a file path argument", args[i]);
                    std::process::exit(1);
                }
            }
            "-H" | "--host" => {
                if i + 1 < args.len() {
                    cli.host = Some(args[i + 1].clone());
                    i += 1;
                } else {
                    eprintln!("Error: {} requires a host argument", args[i]);
                    std::process::exit(1);
                }
            }
            "-p" | "--port" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse::<u16>() {
                        Ok(port) => cli.port = Some(port),
                        Err(_) => {
                            eprintln!("Error: Invalid port number '{}'", args[i + 1]);
                            std::process::exit(1);
                        }
                    }
                    i += 1;
                } else {
                    eprintln!("Error: {} requires a port argument", args[i]);
                    std::process::exit(1);
                }
            }
            arg if cli.command.is_none() => {
                cli.command = Some(arg.to_string());
            }
            arg if cli.operand.is_none() => {
                cli.operand = Some(arg.to_string());
            }
            arg => {
                eprintln!("Error: Unexpected argument '{}'. Use --help for usage.", arg);
                std::process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// Load configuration from file and merge with CLI arguments
fn load_config(cli: &CliArgs) -> anyhow::Result<Config> {
    let mut config = Config::default();
    if let Some(ref path) = cli.config_path {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path))?;
        config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file '{}'", path))?;
    }
    if let Some(ref host) = cli.host {
        config.store.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.store.port = port;
    }
    Ok(config)
}

fn init_logging(logging: &LoggingConfig) {
    let level_filter = logging.level.parse::<LevelFilter>().unwrap_or_else(|_| {
        eprintln!("Warning: Invalid log level '{}', using 'info'", logging.level);
        LevelFilter::INFO
    });
    let filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(filter)
        .init();
}

fn print_documents(documents: &[DocValue]) {
    for doc in documents {
        println!("{}", doc.to_json_string());
    }
}

async fn run(cli: &CliArgs) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    init_logging(&config.logging);
    let store = config.store;

    match cli.command.as_deref() {
        Some("query") => {
            let sql = cli
                .operand
                .as_deref()
                .context("query requires a SQL statement operand")?;
            let api = StoreApi::new(HttpTransport::new());
            let documents = api.query(&store, sql).await?;
            print_documents(&documents);
        }
        Some("execute") => {
            let statement = cli
                .operand
                .as_deref()
                .context("execute requires a statement operand")?;
            let api = StoreApi::new(HttpTransport::new());
            api.execute(&store, statement).await?;
            println!("OK");
        }
        Some("discover") => {
            let url = cli
                .operand
                .clone()
                .or_else(|| store.disco_url.clone())
                .context("discover requires a URL operand or a configured disco_url")?;
            let client = DiscoveryClient::new(HttpTransport::new());
            let nodes = client.discover(&url, store.timeout()).await?;
            for node in nodes {
                println!("{}", node);
            }
        }
        Some(other) => bail!("unknown command '{}', use --help for usage", other),
        None => bail!("missing command, use --help for usage"),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = parse_args();

    if cli.show_help {
        print_help();
        return;
    }
    if cli.show_version {
        print_version();
        return;
    }

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
