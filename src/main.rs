use stage_screener::{analysis, comfy_table, tui};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let tui_mode = std::env::args().skip(1).any(|arg| arg == "--tui");

    // keep the alternate screen clean in TUI mode
    let default_level = if tui_mode { "stage_screener=warn" } else { "stage_screener=info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env()
                .add_directive(default_level.parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    if tui_mode {
        return tui::run_tui().await;
    }

    // Step 1: Fetch candles and analyze them
    tracing::info!("running analysis pipeline");
    if let Err(e) = analysis::run_analysis_pipeline().await {
        tracing::error!(error = %e, "analysis pipeline failed");
    }

    // Step 2: Display Results
    if let Err(e) = comfy_table::run().await {
        tracing::error!(error = %e, "failed to display results");
    }

    Ok(())
}
