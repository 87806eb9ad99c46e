//! Command-line and environment configuration.
//!
//! Every option can come from a flag or from the environment variables
//! the n8n campaign setup already uses (`URL_N8N`, `USUARIO_N8N`, ...).

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use wa_dispatch::{DispatchConfig, DispatchError, DispatchResult};

pub const DEFAULT_CONTACTS_FILE: &str = "contatos_comercial.csv";
pub const DEFAULT_REPORT_NAME: &str = "relatorio_input_waid_mensageria.csv";
pub const DEFAULT_PHONE_COLUMN: &str = "Celular";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

/// Send one WhatsApp message per contact through an n8n workflow and
/// write a reconciliation report.
#[derive(Parser, Debug, Clone)]
#[command(name = "wa-bulk")]
#[command(version)]
pub struct Cli {
    /// Messaging workflow webhook (production URL)
    #[arg(long, env = "URL_N8N", default_value = "")]
    pub webhook_url: String,

    /// Basic-auth user for the n8n webhooks
    #[arg(long, env = "USUARIO_N8N", default_value = "")]
    pub username: String,

    /// Basic-auth password for the n8n webhooks
    #[arg(long, env = "SENHA_N8N", default_value = "", hide_env_values = true)]
    pub password: String,

    /// Image upload (PostImagem) workflow webhook
    #[arg(long, env = "URL_N8N_IMG_POST")]
    pub upload_url: Option<String>,

    /// Image sent with every message; uploaded once per run
    #[arg(long, env = "FOTO")]
    pub image: Option<PathBuf>,

    /// Directory holding the contact sheet (absolute, or relative to the
    /// current directory)
    #[arg(long, env = "CAMINHO_ARQUIVO")]
    pub data_dir: Option<PathBuf>,

    /// Contact sheet file name (CSV)
    #[arg(long, env = "ARQUIVO_EXCEL", default_value = DEFAULT_CONTACTS_FILE)]
    pub contacts_file: String,

    /// Column holding the phone numbers
    #[arg(long, default_value = DEFAULT_PHONE_COLUMN)]
    pub phone_column: String,

    /// Seconds to wait after each contact's request
    #[arg(long, env = "DELAY_ENTRE_REQUESTS", default_value_t = 0.5)]
    pub delay_secs: f64,

    /// Attempts per request, rate-limited ones included
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Per-attempt timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout_sec: u64,

    /// Report file name, written next to the contact sheet
    #[arg(long, default_value = DEFAULT_REPORT_NAME)]
    pub report_name: String,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Files and columns a run works on.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub contacts_path: PathBuf,
    pub report_path: PathBuf,
    pub phone_column: String,
    pub image: Option<PathBuf>,
}

impl Cli {
    /// Build a validated config and run plan. Relative paths resolve
    /// against `base_dir`.
    pub fn into_settings(self, base_dir: &Path) -> DispatchResult<(DispatchConfig, RunPlan)> {
        if !self.delay_secs.is_finite() || self.delay_secs < 0.0 {
            return Err(DispatchError::invalid_config(format!(
                "DELAY_ENTRE_REQUESTS must be a non-negative number of seconds, got {}",
                self.delay_secs
            )));
        }

        let image = self
            .image
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| resolve(base_dir, &p));

        let config = DispatchConfig {
            webhook_url: self.webhook_url.trim().to_string(),
            upload_url: non_blank(self.upload_url),
            username: self.username.trim().to_string(),
            password: self.password.trim().to_string(),
            timeout_sec: self.timeout_sec,
            max_retries: self.max_retries,
            inter_request_delay_ms: (self.delay_secs * 1000.0).round() as u64,
            ..DispatchConfig::new("", "", "")
        };
        config.validate(image.is_some())?;

        if let Some(ref path) = image {
            if !path.is_file() {
                return Err(DispatchError::file_not_found("Image", path));
            }
        }

        let data_dir = match self.data_dir.filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => resolve(base_dir, &dir),
            None => base_dir.to_path_buf(),
        };
        let contacts_path = data_dir.join(self.contacts_file.trim());
        if !contacts_path.is_file() {
            return Err(DispatchError::file_not_found("Contact sheet", &contacts_path));
        }
        let report_path = contacts_path
            .parent()
            .unwrap_or(&data_dir)
            .join(self.report_name.trim());

        Ok((
            config,
            RunPlan {
                contacts_path,
                report_path,
                phone_column: self.phone_column,
                image,
            },
        ))
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
