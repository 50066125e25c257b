use mcp_host_harness::config::HostConfig;
use mcp_host_harness::server::HostServer;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match HostConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("mcp-host-harness: configuration error: {e}");
            std::process::exit(1);
        }
    };

    let server = match HostServer::new(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("mcp-host-harness: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = server.run().await {
        eprintln!("mcp-host-harness: fatal error: {e}");
        std::process::exit(1);
    }
}
