//! fulltext-render
//!
//! Renders a payload file headlessly and writes the container HTML.

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fulltext::{render_file, CliConfig};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fulltext=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = CliConfig::from_env().context("FULLTEXT_PAYLOAD must name a payload file")?;
    tracing::info!("Rendering {}", config.payload.display());

    let html = render_file(&config.payload, config.render)
        .with_context(|| format!("Failed to render {}", config.payload.display()))?;

    match &config.output {
        Some(path) => {
            std::fs::write(path, &html)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {} bytes to {}", html.len(), path.display());
        }
        None => println!("{}", html),
    }

    Ok(())
}
