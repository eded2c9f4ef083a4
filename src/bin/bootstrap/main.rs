use anyhow::Context;
use env_logger::Env;
use sleuthdb::app_config::BootstrapConfig;
use sleuthdb::bootstrap::Bootstrap;
use std::process::ExitCode;

#[actix_rt::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            log::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<bool> {
    let config = BootstrapConfig::load().context("Failed to load configuration")?;
    let bootstrap = Bootstrap::new(config).context("Schema registry is invalid")?;
    let report = bootstrap.run().await.context("Bootstrap aborted")?;

    if report.database_created {
        log::info!("Database created");
    }
    if !report.tables_created.is_empty() {
        log::info!("{} tables created", report.tables_created.len());
    }
    if report.rows_seeded > 0 {
        log::info!("{} lookup rows seeded", report.rows_seeded);
    }
    if let Some(version) = &report.migration {
        log::info!("Recorded migration {}", version);
    }
    for failure in &report.failures {
        if let Some(step) = failure.step() {
            log::error!("Step '{}' failed", step);
        }
    }

    Ok(report.is_success())
}
