use std::{fs, path::PathBuf, process};

use clap::{Parser, Subcommand, ValueEnum};
use flowfront::{
    ChatSettings, Config, ConnectionStrategy, Flavor, FlowfrontError, FormSettings, N8nClient, Result, TransformOutcome, Transformer, WorkflowModel, WorkflowService,
};
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FlavorCli {
    Chat,
    Form,
}

impl From<FlavorCli> for Flavor {
    fn from(value: FlavorCli) -> Self {
        match value {
            FlavorCli::Chat => Flavor::Chat,
            FlavorCli::Form => Flavor::Form,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyCli {
    Rebuild,
    Splice,
}

impl From<StrategyCli> for ConnectionStrategy {
    fn from(value: StrategyCli) -> Self {
        match value {
            StrategyCli::Rebuild => ConnectionStrategy::Rebuild,
            StrategyCli::Splice => ConnectionStrategy::Splice,
        }
    }
}

/// Turn chat and form triggered n8n workflows into webhook driven ones
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base url of the n8n instance
    #[arg(long, env = "FLOWFRONT_INSTANCE_URL")]
    instance_url: Option<String>,

    /// API key of the n8n instance
    #[arg(long, env = "FLOWFRONT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List chat and form workflows on the instance
    List,
    /// Show what a front end would render for a workflow
    Inspect {
        name: String,
    },
    /// Transform a workflow file
    Transform {
        #[arg(short, long, value_enum)]
        flavor: FlavorCli,
        #[arg(short, long)]
        input: PathBuf,
        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long, value_enum)]
        strategy: Option<StrategyCli>,
    },
    /// Fetch a workflow, transform it and upload the result
    Deploy {
        name: String,
        #[arg(short, long, value_enum)]
        flavor: FlavorCli,
        #[arg(short, long, value_enum)]
        strategy: Option<StrategyCli>,
    },
    /// Send a message to a transformed chat workflow
    Chat {
        #[arg(long)]
        url: String,
        #[arg(short, long)]
        message: String,
        #[arg(long)]
        session: Option<String>,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::create(path)?,
        None => Config::default(),
    };
    if let Some(url) = &cli.instance_url {
        config.instance.url = Some(url.clone());
    }
    if let Some(api_key) = &cli.api_key {
        config.instance.api_key = Some(api_key.clone());
    }
    Ok(config)
}

fn transformer(
    config: &Config,
    strategy: Option<StrategyCli>,
) -> Transformer {
    Transformer::new().connection_strategy(strategy.map(Into::into).unwrap_or(config.transform.connection_strategy))
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Command::List => {
            let report = N8nClient::from_config(&config)?.test_connection().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Inspect { name } => {
            let workflow = N8nClient::from_config(&config)?.fetch_workflow_by_name(&name).await?;
            if let Some(chat) = ChatSettings::extract(&workflow) {
                println!("{}", serde_json::to_string_pretty(&chat)?);
            }
            match FormSettings::extract(&workflow) {
                Ok(Some(form)) => println!("{}", serde_json::to_string_pretty(&form)?),
                Ok(None) => {}
                Err(e) => eprintln!("{}", e),
            }
        }
        Command::Transform {
            flavor,
            input,
            output,
            strategy,
        } => {
            let workflow = WorkflowModel::from_json(&fs::read_to_string(&input)?)?;
            match transformer(&config, strategy).transform(&workflow, flavor.into())? {
                TransformOutcome::Transformed(result) => {
                    let json = result.workflow.to_json_pretty()?;
                    match output {
                        Some(path) => {
                            fs::write(&path, json)?;
                            info!(path = %path.display(), webhook_path = %result.webhook_path, "transformed workflow written");
                        }
                        None => println!("{}", json),
                    }
                }
                TransformOutcome::NoTriggerFound => eprintln!("no {} trigger in '{}'", Flavor::from(flavor), workflow.name),
            }
        }
        Command::Deploy {
            name,
            flavor,
            strategy,
        } => {
            let client = N8nClient::from_config(&config)?;
            let workflow = client.fetch_workflow_by_name(&name).await?;
            let Some(result) = transformer(&config, strategy).transform(&workflow, flavor.into())?.into_output() else {
                return Err(FlowfrontError::NotFound(format!("no {} trigger in '{}'", Flavor::from(flavor), name)));
            };
            let created = client.create_workflow(&result.finalize()).await?;
            println!("created '{}' ({})", created.name, created.id.unwrap_or_default());
            println!("webhook: {}", client.webhook_url(&result.webhook_path));
        }
        Command::Chat { url, message, session } => {
            let client = N8nClient::new(&url, config.instance.api_key.as_deref().unwrap_or_default(), std::time::Duration::from_millis(config.request_timeout))?;
            let reply = client.send_chat_message(&url, &message, session.as_deref()).await?;
            println!("{}", reply.response);
            info!(status = reply.status, elapsed_ms = reply.elapsed_ms, "chat reply");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
