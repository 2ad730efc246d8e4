use clap::Parser;
use tokio::runtime::Runtime;

use slackreturn::cli::{Cli, Commands};
use slackreturn::config::Config;
use slackreturn::job::JobResult;
use slackreturn::logging::init_tracing;
use slackreturn::options::returner_options;
use slackreturn::returner::SlackReturner;
use slackreturn::slack::{SlackClient, SlackFunction};

use serde_json::Value;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "name")]
    name: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let rt = Runtime::new()?;
    rt.block_on(async {
        match cli.command {
            Commands::Notify { job, return_config } => {
                let config = Config::load(cli.config.clone())?;
                let ret = JobResult::load(job.as_deref())?;

                let returner = SlackReturner::new(config).with_return_config(return_config);
                if !returner.notify(&ret).await {
                    eprintln!("slackreturn: notification not delivered (run with -v for details)");
                    std::process::exit(1);
                }
            }
            Commands::Rooms { return_config } => {
                let config = Config::load(cli.config.clone())?;
                list(&config, return_config.as_deref(), SlackFunction::Rooms).await?;
            }
            Commands::Users { return_config } => {
                let config = Config::load(cli.config.clone())?;
                list(&config, return_config.as_deref(), SlackFunction::Users).await?;
            }
            Commands::Version { json } => {
                if json {
                    let info = serde_json::json!({
                        "version": env!("CARGO_PKG_VERSION"),
                        "commit": option_env!("GIT_SHA").unwrap_or("unknown"),
                        "build_date": option_env!("BUILD_DATE").unwrap_or("unknown"),
                    });
                    println!("{}", serde_json::to_string_pretty(&info)?);
                } else {
                    println!(
                        "slackreturn {} (commit: {}, built: {})",
                        env!("CARGO_PKG_VERSION"),
                        option_env!("GIT_SHA").unwrap_or("unknown"),
                        option_env!("BUILD_DATE").unwrap_or("unknown"),
                    );
                }
            }
        }
        Ok(())
    })
}

async fn list(config: &Config, return_config: Option<&str>, function: SlackFunction) -> anyhow::Result<()> {
    let opts = returner_options(config, &JobResult::default(), return_config);
    let api_key = opts.text("api_key").unwrap_or_default();

    let client = SlackClient::new();
    let result = match function {
        SlackFunction::Rooms => client.list_rooms(&api_key).await,
        SlackFunction::Users => client.list_users(&api_key).await,
        SlackFunction::Message => anyhow::bail!("{} is not a listing", function.request()),
    };
    let entries = match result {
        Ok(payload) => payload,
        Err(e) => {
            eprintln!("slackreturn: {} failed: {e}", function.request());
            std::process::exit(1);
        }
    };

    let rows: Vec<Row> = entries
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .map(|entry| Row {
            id: field(entry, "id"),
            name: field(entry, "name"),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::modern());
    println!("{}", table);
    Ok(())
}

fn field(entry: &Value, key: &str) -> String {
    entry
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
