use anyhow::Context;

use file_analyzer::app;
use file_analyzer::config::AnalyzerConfig;
use file_analyzer::fonts;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AnalyzerConfig::load()?;
    log::debug!("configuration: {config:?}");

    fonts::install(config.font_path.as_deref());
    if config.persist_artifacts {
        std::fs::create_dir_all(&config.output_dir)
            .with_context(|| format!("could not create {}", config.output_dir.display()))?;
    }

    app::run(config).await
}
