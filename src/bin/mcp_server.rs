//! Intent browser MCP server
//!
//! Exposes the intent tools (goto, click, fill, extract, ask, ...) to MCP
//! clients over stdio or streamable HTTP. The remote service key is read from
//! `INTENT_BROWSER_API_KEY`.

use clap::{Parser, ValueEnum};
use intent_browser::mcp::{BrowserServer, BrowserTarget};
use intent_browser::{ApiConfig, ConnectionOptions, LaunchOptions};
use rmcp::{ServiceExt, transport::stdio};
use rmcp::transport::streamable_http_server::{StreamableHttpService, session::local::LocalSessionManager};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Transport {
    /// Standard input/output transport (default)
    Stdio,
    /// HTTP streamable transport
    Http,
}

#[derive(Parser)]
#[command(name = "mcp-server")]
#[command(version)]
#[command(about = "Intent-driven browser automation MCP server", long_about = None)]
struct Cli {
    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    executable_path: Option<String>,

    /// WebSocket endpoint URL for remote browser connection
    #[arg(long, value_name = "URL")]
    ws_endpoint: Option<String>,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR")]
    user_data_dir: Option<String>,

    /// Domains whose stored auth session is loaded into the browser
    #[arg(long, value_name = "DOMAIN")]
    auth: Vec<String>,

    /// Transport type to use
    #[arg(long, short = 't', value_enum, default_value = "stdio")]
    transport: Transport,

    /// Port for HTTP transport (default: 3000)
    #[arg(long, short = 'p', default_value = "3000")]
    port: u16,

    /// HTTP streamable endpoint path (default: /mcp)
    #[arg(long, default_value = "/mcp")]
    http_path: String,
}

impl Cli {
    fn target(&self) -> BrowserTarget {
        if let Some(ref endpoint) = self.ws_endpoint {
            return BrowserTarget::Connect(ConnectionOptions::new(endpoint.clone()).auth(self.auth.clone()));
        }

        let mut options = LaunchOptions::new().headless(!self.headed).auth(self.auth.clone());
        if let Some(ref path) = self.executable_path {
            options = options.chrome_path(path);
        }
        if let Some(ref dir) = self.user_data_dir {
            options = options.user_data_dir(dir);
        }
        BrowserTarget::Launch(options)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let api = ApiConfig::from_env()?;
    let target = cli.target();

    log::info!("Intent browser MCP server v{}", env!("CARGO_PKG_VERSION"));
    match &target {
        BrowserTarget::Launch(options) => {
            log::info!("Browser mode: {}", if options.headless { "headless" } else { "headed" });
            if let Some(ref path) = options.chrome_path {
                log::info!("Browser executable: {}", path.display());
            }
            if let Some(ref dir) = options.user_data_dir {
                log::info!("User data directory: {}", dir.display());
            }
        }
        BrowserTarget::Connect(options) => log::info!("WebSocket endpoint: {}", options.ws_url),
    }

    match cli.transport {
        Transport::Stdio => {
            log::info!("Ready to accept MCP connections via stdio");
            let server = BrowserServer::new(target, api);
            let service = server.clone().serve(stdio()).await?;
            let quit_reason = service.waiting().await?;
            log::info!("Server quit with reason: {:?}", quit_reason);
            if let Err(e) = server.close_browser().await {
                log::warn!("Failed to close browser: {}", e);
            }
        }
        Transport::Http => {
            let bind_addr = format!("127.0.0.1:{}", cli.port);

            let service_factory = move || Ok::<_, std::io::Error>(BrowserServer::new(target.clone(), api.clone()));
            let http_service = StreamableHttpService::new(
                service_factory,
                LocalSessionManager::default().into(),
                Default::default(),
            );

            let router = axum::Router::new().nest_service(&cli.http_path, http_service);

            log::info!("Ready to accept MCP connections at http://{}{}", bind_addr, cli.http_path);

            let listener = tokio::net::TcpListener::bind(bind_addr).await?;
            axum::serve(listener, router).await?;
        }
    }

    Ok(())
}
