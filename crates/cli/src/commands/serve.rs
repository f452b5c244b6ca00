//! `rxpilot serve`: start the HTTP gateway.

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("rxpilot gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.model());
    match &config.batch.schedule {
        Some(schedule) => println!("   Batch:     scheduled ({schedule})"),
        None => println!("   Batch:     on demand (GET /process-all-texts)"),
    }

    rxpilot_gateway::start(config).await?;

    Ok(())
}
