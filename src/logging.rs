use crate::utils::truncate_str;
use crate::PreviewInfo;
use std::fmt::Display;
use std::path::PathBuf;
use tracing::{debug, error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    pub log_level: String,
    pub console_output: bool,
    pub file_output: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".into(),
            log_level: "info".into(),
            console_output: true,
            file_output: false,
        }
    }
}

const CARD_WIDTH: usize = 70;
const CONTENT_WIDTH: usize = CARD_WIDTH - 10;

fn create_separator(width: usize, ch: char) -> String {
    std::iter::repeat(ch).take(width).collect()
}

fn describe_image(info: &PreviewInfo) -> String {
    match info.image() {
        Some(image) => match image.dimensions() {
            Some((w, h)) => format!("{} {}x{} ({} bytes)", image.format().mime_type(), w, h, image.len()),
            None => format!("{} ({} bytes)", image.format().mime_type(), image.len()),
        },
        None => "N/A".to_string(),
    }
}

/// Renders a preview as a boxed, fixed-width card.
pub fn format_preview_card(info: &PreviewInfo, url: &str) -> String {
    let top_bottom = create_separator(CARD_WIDTH - 2, '═');

    format!(
        "╔{top_bottom}╗\n\
         ║ URL:   {:<width$} ║\n\
         ║ Title: {:<width$} ║\n\
         ║ Image: {:<width$} ║\n\
         ╚{top_bottom}╝",
        truncate_str(url, CONTENT_WIDTH),
        truncate_str(info.title(), CONTENT_WIDTH),
        truncate_str(&describe_image(info), CONTENT_WIDTH),
        width = CONTENT_WIDTH
    )
}

pub fn log_preview_card(info: &PreviewInfo, url: &str) {
    info!("\n{}", format_preview_card(info, url));
}

pub fn log_error_card<E: Display + std::error::Error>(url: &str, error: &E) {
    let top_bottom = create_separator(CARD_WIDTH - 2, '═');
    let middle = create_separator(CARD_WIDTH - 2, '─');

    let mut error_details = error.to_string();
    if let Some(source) = error.source() {
        error_details = format!("{error_details} (cause: {source})");
    }

    error!(
        "\n╔{}╗\n\
         ║ URL:   {:<width$} ║\n\
         ║{}║\n\
         ║ Error: {:<width$} ║\n\
         ╚{}╝",
        top_bottom,
        truncate_str(url, CONTENT_WIDTH),
        middle,
        truncate_str(&error_details, CONTENT_WIDTH),
        top_bottom,
        width = CONTENT_WIDTH
    );
}

/// Installs the global subscriber. Fails if one is already set or the log
/// directory cannot be created.
pub fn setup_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let mut layers = Vec::new();

    if config.console_output {
        let console_layer = subscriber_fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .compact();
        layers.push(console_layer.boxed());
    }

    if config.file_output {
        std::fs::create_dir_all(&config.log_dir)?;

        let file_appender =
            RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "link-preview.log");

        let file_layer = subscriber_fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .with_writer(file_appender);

        layers.push(file_layer.boxed());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    debug!("Logging system initialized with config: {:?}", config);
    Ok(())
}

/// Scoped subscriber at a fixed level; the previous default is restored on drop.
pub struct LogLevelGuard {
    _guard: tracing::dispatcher::DefaultGuard,
}

impl LogLevelGuard {
    pub fn set_level(level: &str) -> Self {
        let filter = EnvFilter::new(level);
        let subscriber = tracing_subscriber::registry()
            .with(subscriber_fmt::layer())
            .with(filter);

        LogLevelGuard {
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }
}
