use clap::Parser;
use colored::Colorize;
use link_preview::{
    log_error_card, setup_logging, ActionOptions, AsyncAction, LinkPreviewService,
    LogConfig, PreviewServiceConfig,
};
use std::error::Error;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "preview_cli", about = "Fetch link previews from the command line")]
struct Args {
    /// URLs to preview; scheme-less input is fetched over https
    #[arg(required = true)]
    urls: Vec<String>,

    /// Log level passed to the tracing filter
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Skip the host fallback when a page cannot be previewed
    #[arg(long)]
    no_fallback: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    setup_logging(LogConfig {
        log_level: args.log_level.clone(),
        ..Default::default()
    })
    .map_err(|e| e as Box<dyn Error>)?;

    println!("{}", "Link Preview".bold().green());
    println!("{}", "============".green());

    let mut config = PreviewServiceConfig::default();
    if args.no_fallback {
        config = config.with_max_fallback_depth(0);
    }
    let service = LinkPreviewService::with_http_config(Default::default(), config)?;

    let action = AsyncAction::new(ActionOptions {
        progress_delay: Duration::from_millis(300),
        ..Default::default()
    });
    let mut progress = action.subscribe();
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            if progress.borrow_and_update().show_progress {
                eprintln!("{}", "fetching...".dimmed());
            }
        }
    });

    for url in &args.urls {
        match action.perform(service.fetch_link_info_str(url)).await {
            Ok(info) => {
                println!("\n{}: {}", "URL".bold(), url);
                println!("{}: {}", "Title".bold(), info.title());
                match info.image() {
                    Some(image) => println!(
                        "{}: {} ({} bytes)",
                        "Image".bold(),
                        image.format().mime_type(),
                        image.len()
                    ),
                    None => println!("{}: {}", "Image".bold(), "none".dimmed()),
                }
            }
            Err(e) if e.is_email_rejection() => {
                println!(
                    "\n{}: {} is an email address, showing a plain mail link",
                    "Email".bold().yellow(),
                    url
                );
            }
            Err(e) => {
                log_error_card(url, &e);
                eprintln!("{}: {} - {}", "Error".bold().red(), url, e);
            }
        }
    }

    let stats = service.cache_stats();
    println!(
        "\n{} {} entries, {} cost units",
        "Cache:".bold(),
        stats.entries,
        stats.total_cost
    );
    Ok(())
}
