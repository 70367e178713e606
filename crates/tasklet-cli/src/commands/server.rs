//! `tasklet server`: Start the Tasklet HTTP server.

use tasklet_core::EngineConfig;

pub async fn run(host: String, port: u16, engine: EngineConfig) -> Result<(), String> {
    let config = tasklet_server::ServerConfig {
        host: host.clone(),
        port,
        engine,
    };

    println!("Starting Tasklet server on {}:{}...", host, port);

    let addr = tasklet_server::start_server(config).await?;
    println!("Tasklet server listening on http://{}", addr);

    // Keep the process running until interrupted
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for Ctrl+C: {}", e))?;

    println!("\nShutting down...");
    Ok(())
}
