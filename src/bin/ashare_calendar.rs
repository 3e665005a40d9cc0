use ashare_calendar::config::Config;
use ashare_calendar::errors::{CalendarError, ToolFailure};
use ashare_calendar::services::calendar_service::CalendarService;
use ashare_calendar::sources::base::CalendarSource;
use ashare_calendar::sources::weekday::WeekdayCalendarSource;
use ashare_calendar::util::SystemClock;

use anyhow::{anyhow, Context};
use chrono_tz::Tz;
use clap::{App, Arg, ArgMatches, SubCommand};
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;

fn date_arg() -> Arg<'static> {
    Arg::with_name("date")
        .value_name("DATE")
        .help("Date in YYYY-MM-DD format")
        .required(true)
        .index(1)
}

fn build_config(matches: &ArgMatches) -> anyhow::Result<Config> {
    let timeout = matches.value_of("timeout")
        .unwrap_or("30")
        .parse::<u64>()
        .context("--timeout must be a number of seconds")?;

    let mut config = Config::new()
        .with_base_url(matches.value_of("base-url").unwrap_or("http://127.0.0.1:8650"))
        .with_request_timeout(Duration::from_secs(timeout));

    if let Some(tz) = matches.value_of("timezone") {
        let tz: Tz = tz.parse().map_err(|e| anyhow!("invalid timezone {}: {}", tz, e))?;
        config = config.with_timezone(tz);
    }

    Ok(config)
}

fn build_service(matches: &ArgMatches, config: &Config) -> anyhow::Result<CalendarService> {
    match matches.value_of("source").unwrap_or("baostock") {
        "weekday" => {
            let source: Arc<dyn CalendarSource + Send + Sync> = match matches.value_of("holidays") {
                Some(path) => Arc::new(WeekdayCalendarSource::from_json_file(path)?),
                None => Arc::new(WeekdayCalendarSource::new([])),
            };
            info!("Using offline weekday calendar");
            Ok(CalendarService::new(config, source, Arc::new(SystemClock::new(config.timezone))))
        }
        _ => {
            info!("Using Baostock gateway at {}", config.base_url);
            Ok(CalendarService::with_baostock(config)?)
        }
    }
}

async fn run(service: &CalendarService, matches: &ArgMatches) -> Result<String, CalendarError> {
    match matches.subcommand() {
        Some(("latest", _)) => service.get_latest_trading_date().await,
        Some(("is-trading-day", sub)) => {
            let date = sub.value_of("date").unwrap_or_default();
            Ok(service.is_trading_day(date).await?.to_string())
        }
        Some(("previous", sub)) => service.previous_trading_day(sub.value_of("date").unwrap_or_default()).await,
        Some(("next", sub)) => service.next_trading_day(sub.value_of("date").unwrap_or_default()).await,
        Some(("timeframe", sub)) => {
            let timeframe = service.get_market_analysis_timeframe(sub.value_of("period")).await?;
            let mut value = serde_json::to_value(&timeframe)?;
            value["range_label"] = serde_json::Value::String(timeframe.range_label());
            Ok(serde_json::to_string_pretty(&value)?)
        }
        Some(("trade-dates", sub)) => {
            let entries = service.get_trade_dates(sub.value_of("start"), sub.value_of("end")).await?;
            Ok(serde_json::to_string_pretty(&entries)?)
        }
        Some(("normalize", sub)) => service.normalize_stock_code(sub.value_of("code").unwrap_or_default()),
        _ => Ok("No command specified. Use --help for usage information.".to_string()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init();

    let app = App::new("ashare_calendar")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A-share trading calendar and stock code utilities")
        .arg(
            Arg::with_name("source")
                .long("source")
                .value_name("SOURCE")
                .help("Calendar source (baostock, weekday)")
                .takes_value(true)
                .possible_values(["baostock", "weekday"])
                .default_value("baostock"),
        )
        .arg(
            Arg::with_name("base-url")
                .long("base-url")
                .value_name("URL")
                .help("Baostock gateway base URL")
                .takes_value(true)
                .default_value("http://127.0.0.1:8650"),
        )
        .arg(
            Arg::with_name("holidays")
                .long("holidays")
                .value_name("FILE")
                .help("JSON array of holiday dates for the weekday source")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("timezone")
                .long("timezone")
                .value_name("TZ")
                .help("Timezone used to resolve today, e.g. Asia/Shanghai (defaults to local)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("timeout")
                .long("timeout")
                .value_name("SECONDS")
                .help("Request timeout for the calendar source")
                .takes_value(true)
                .default_value("30"),
        );

    // 添加子命令
    let app = app
        .subcommand(SubCommand::with_name("latest").about("Latest trading date as of today"))
        .subcommand(
            SubCommand::with_name("is-trading-day")
                .about("Check whether a date is a trading day")
                .arg(date_arg()),
        )
        .subcommand(
            SubCommand::with_name("previous")
                .about("Trading day before the given date")
                .arg(date_arg()),
        )
        .subcommand(
            SubCommand::with_name("next")
                .about("Trading day after the given date")
                .arg(date_arg()),
        )
        .subcommand(
            SubCommand::with_name("timeframe")
                .about("Market analysis timeframe anchored on the latest trading day")
                .arg(
                    Arg::with_name("period")
                        .short('p')
                        .long("period")
                        .value_name("PERIOD")
                        .help("recent, quarter, half_year or year")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("trade-dates")
                .about("Trading status of every day in a range")
                .arg(
                    Arg::with_name("start")
                        .long("start")
                        .value_name("DATE")
                        .help("Start date in YYYY-MM-DD format (defaults to 2015-01-01)")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("end")
                        .long("end")
                        .value_name("DATE")
                        .help("End date in YYYY-MM-DD format (defaults to today)")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("normalize")
                .about("Normalize a stock code to the sh.600000 form")
                .arg(
                    Arg::with_name("code")
                        .value_name("CODE")
                        .help("Stock code, e.g. 600000, 000001.SZ, sh600000")
                        .required(true)
                        .index(1),
                ),
        );

    let matches = app.get_matches();

    let config = build_config(&matches)?;
    let service = build_service(&matches, &config)?;

    match run(&service, &matches).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            println!("{}", serde_json::to_string(&ToolFailure::from(&e))?);
            std::process::exit(1);
        }
    }
}
