//! # wa-bulk
//!
//! Reads a contact sheet, sends one WhatsApp message per contact through
//! the n8n messaging workflow (optionally with an image uploaded once
//! through the PostImagem workflow) and writes a report comparing the
//! `wa_id` sent with what the workflow echoed back.

pub mod config;
pub mod contacts;
pub mod logging;
pub mod report;

use config::{Cli, RunPlan};
use log::info;
use std::sync::Arc;
use wa_dispatch::{
    BatchReport, BatchRunner, DispatchConfig, DispatchResult, HttpTransport, ReqwestTransport,
    Sleeper, TokioSleeper,
};

/// Full run from parsed command-line arguments.
pub async fn run(cli: Cli) -> DispatchResult<BatchReport> {
    let cwd = std::env::current_dir()?;
    let (config, plan) = cli.into_settings(&cwd)?;
    let transport = Arc::new(ReqwestTransport::new(&config)?);
    execute(config, &plan, transport, Arc::new(TokioSleeper)).await
}

/// Load contacts, run the batch and write the report.
pub async fn execute(
    config: DispatchConfig,
    plan: &RunPlan,
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
) -> DispatchResult<BatchReport> {
    info!("URL_N8N: {}", config.webhook_url);
    info!(
        "URL_N8N_IMG_POST: {}",
        config.upload_url.as_deref().unwrap_or("(no upload)")
    );
    match plan.image {
        Some(ref image) => info!("FOTO: {}", image.display()),
        None => info!("FOTO: (no image)"),
    }
    info!("Reading contacts from {}", plan.contacts_path.display());

    let contacts = contacts::load_contacts(&plan.contacts_path, &plan.phone_column)?;

    let runner = BatchRunner::new(config, transport, sleeper);
    let report = runner.run(&contacts, plan.image.as_deref()).await?;

    report::write_report(&plan.report_path, &report.records)?;
    Ok(report)
}
