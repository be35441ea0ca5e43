use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gatecfg::{ConfigArgs, Gatecfg, logging, settings};

/// Inspect and change the appliance configuration tree.
#[derive(Debug, Parser)]
#[command(name = "gatecfg", version)]
struct Cli {
    /// Service settings file (TOML).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Config directory, overriding the service settings.
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Print the JSON response body instead of YAML.
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    config: ConfigArgs,
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = settings::load(cli.settings.as_deref())?;
    if let Some(dir) = cli.config_dir {
        settings.config_dir = dir;
    }
    logging::init_logging(&settings.log);

    let action = cli.config.into_action()?;
    let store = Gatecfg::builder().from_settings(&settings).build()?;
    let result = gatecfg::handle(&store, &action)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result.to_json()?)?);
    } else {
        println!("{result}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                println!("{}", serde_json::json!({ "error": e.to_string() }));
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}
