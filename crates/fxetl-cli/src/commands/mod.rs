mod load;
mod rates;
mod ytd;

use serde_json::Value;
use time::{Date, OffsetDateTime};

use crate::cli::{Cli, Command};
use crate::config::AppConfig;
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    let config = AppConfig::from_env(cli.db_path.as_deref())?;
    tracing::debug!(
        db_path = %config.warehouse.db_path.display(),
        currencies = config.universe.len(),
        "configuration loaded"
    );

    match &cli.command {
        Command::InitialLoad(args) => load::initial(&config, args.today.unwrap_or_else(today)).await,
        Command::DailyUpdate(args) => load::daily(&config, args.today.unwrap_or_else(today)).await,
        Command::Rates(args) => rates::run(&config, args),
        Command::Ytd(args) => ytd::run(&config, args.year.unwrap_or_else(|| today().year())),
    }
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}
