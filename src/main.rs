use clap::Parser;
use unimbus::args::Args;
use unimbus::config::{ConfigLoader, ConfigProvider};
use unimbus::logging::LoggingConfig;
use unimbus::Unimbus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.config_file {
        ConfigProvider::set_config(ConfigLoader::new().with_file(path).load()?);
    }
    let config = ConfigProvider::get_config()?;
    let logging = args.apply(LoggingConfig::from_config(&config)?);

    let mut app = Unimbus::new().with_logging(logging);
    app.start()?;

    if args.report {
        if let Some(report) = app.startup_report() {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
    }

    tokio::signal::ctrl_c().await?;
    app.stop()?;
    Ok(())
}
