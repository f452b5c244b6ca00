//! `rxpilot doctor`: diagnose configuration and connectivity.

use rxpilot_config::AppConfig;
use rxpilot_core::{Provider, StoreError, TimingSession, TimingSink};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("rxpilot doctor: system diagnostics");
    println!("==================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  [ok]   Config file found: {}", config_path.display());
    } else {
        println!("  [warn] No config file, using defaults. Run `rxpilot onboard`");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  [ok]   Config valid");
            config
        }
        Err(e) => {
            println!("  [fail] Config invalid: {e}");
            println!("\n  1 issue found. Fix the config and re-run.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  [ok]   API key configured for {}", config.default_provider);
    } else {
        println!("  [fail] No API key for {}. Set GEMINI_API_KEY or RXPILOT_API_KEY", config.default_provider);
        issues += 1;
    }

    match rxpilot_providers::build_gateway(&config) {
        Ok(gateway) => match gateway.provider().health_check().await {
            Ok(true) => println!("  [ok]   Provider {} reachable", config.default_provider),
            Ok(false) | Err(_) => {
                println!("  [fail] Provider {} not reachable", config.default_provider);
                issues += 1;
            }
        },
        Err(e) => {
            println!("  [fail] Provider unavailable: {e}");
            issues += 1;
        }
    }

    let store = rxpilot_store::DocumentStoreClient::from_config(&config.document_store);
    match store.ping().await {
        Ok(()) => println!("  [ok]   Document store reachable at {}", store.base_url()),
        Err(e) => {
            println!("  [fail] Document store: {e}");
            issues += 1;
        }
    }

    match check_timing_sink(&config.persistence.database_url).await {
        Ok(name) => println!("  [ok]   Timing store reachable ({name})"),
        Err(e) => {
            println!("  [fail] Timing store: {e}");
            issues += 1;
        }
    }

    if config.mail.is_configured() {
        println!("  [ok]   Mail credentials set ({})", config.mail.smtp_host);
    } else {
        println!("  [warn] Mail not configured; batch notifications will only be logged");
    }

    if let Some(schedule) = &config.batch.schedule {
        match rxpilot_workflow::CronExpr::parse(schedule) {
            Ok(expr) => println!("  [ok]   Batch schedule: {expr}"),
            Err(e) => {
                println!("  [fail] Batch schedule: {e}");
                issues += 1;
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Open and immediately close one session, as a batch run would.
async fn check_timing_sink(database_url: &str) -> Result<String, StoreError> {
    let sink = rxpilot_store::open_timing_sink(database_url)?;
    sink.open().await?.close().await?;
    Ok(sink.name().to_string())
}
