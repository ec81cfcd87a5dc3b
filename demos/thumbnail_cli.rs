use clap::Parser;
use colored::Colorize;
use link_thumbnail::{
    front_matter_of, front_matter_opts_out, log_error_card, log_preview_card, setup_logging,
    LinkThumbnailService, LogConfig, MarkdownSource, ThumbnailConfig, TokenScanner,
};
use std::error::Error;
use std::path::PathBuf;

/// Resolves every link in a Markdown note and prints its preview card.
#[derive(Parser, Debug)]
#[command(name = "thumbnail_cli")]
struct Args {
    /// Markdown file to scan
    file: PathBuf,

    /// Directory for the persistent results/disabled caches
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Print the rendered card markup instead of a summary
    #[arg(long)]
    html: bool,

    /// Forget previously disabled URLs before resolving
    #[arg(long)]
    retry_disabled: bool,

    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    setup_logging(LogConfig {
        log_level: args.log_level.clone(),
        ..LogConfig::default()
    })?;

    let mut config = ThumbnailConfig::default();
    if let Some(dir) = &args.cache_dir {
        config = config.with_cache_dir(dir);
    }
    let service = LinkThumbnailService::new(config).await?;
    if args.retry_disabled {
        service.cache().clear_disabled().await?;
    }

    let text = tokio::fs::read_to_string(&args.file).await?;
    let config = service.config();
    let opted_out = front_matter_of(&text).is_some_and(|yaml| {
        front_matter_opts_out(yaml, &config.front_matter_field, &config.opt_out_class)
    });
    if opted_out {
        println!("{}", "Note opts out of link thumbnails".yellow());
        return Ok(());
    }

    let source = MarkdownSource::parse(text);
    let tokens = match TokenScanner::new().scan(&source) {
        Ok(tokens) => tokens,
        Err(e) => {
            log_error_card(&args.file.display().to_string(), &e);
            return Err(e.into());
        }
    };
    println!(
        "{} {} link(s) in {}",
        "Found".bold().green(),
        tokens.len(),
        args.file.display()
    );

    for token in tokens {
        let kind = if token.is_block { "block" } else { "inline" };
        match service.metadata(&token.value).await {
            Some(data) if args.html => {
                println!("\n{} {}", kind.cyan(), token.value.bold());
                println!("{}", link_thumbnail::render_card(&data));
            }
            Some(data) => {
                println!("\n{} {}", kind.cyan(), token.value.bold());
                println!("{}: {}", "Title".bold(), data.title);
                if !data.description.is_empty() {
                    println!("{}: {}", "Description".bold(), data.description);
                }
                if !data.image.is_empty() {
                    println!("{}: {} bytes inlined", "Image".bold(), data.image.len());
                }
                log_preview_card(&data, &token.value);
            }
            None => {
                let reason = if service.cache().is_disabled(&token.value).await? {
                    "disabled"
                } else {
                    "no preview"
                };
                eprintln!("\n{} {} ({})", kind.cyan(), token.value.red(), reason);
            }
        }
    }

    Ok(())
}
