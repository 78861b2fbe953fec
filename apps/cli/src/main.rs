use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    Conversation, Greenhouse, ImageCandidate, PhaseKind, ServiceClient, SubmissionController,
};
use shared::domain::SensorField;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

#[derive(Parser, Debug)]
#[command(name = "plant-health", about = "Plant health diagnostics from a leaf photo")]
struct Cli {
    /// Overrides the configured service base URL.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload an image and print the diagnostic report.
    Analyze(AnalyzeArgs),
    #[command(subcommand)]
    Plants(PlantsCommand),
    /// Ask the assistant follow-up questions, optionally about one analysis.
    Chat(ChatArgs),
    /// Query the service health endpoint.
    Health,
    /// Show which vision and language model backends are available.
    Models,
}

#[derive(Args, Debug)]
struct ChatArgs {
    /// Id of an earlier analysis result.
    #[arg(long = "analysis")]
    analysis_id: Option<String>,
    /// Sent as a single question; without it, questions are read from stdin.
    message: Option<String>,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    image: PathBuf,
    #[arg(long)]
    ph: Option<f64>,
    #[arg(long)]
    ec: Option<f64>,
    #[arg(long)]
    temperature: Option<f64>,
    #[arg(long)]
    query: Option<String>,
    /// Send the image without sensor readings.
    #[arg(long)]
    no_sensors: bool,
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum PlantsCommand {
    List,
    Add {
        name: String,
        #[arg(long = "type")]
        plant_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = config::load_settings(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    info!(api_url = %settings.api_url, "using analysis service");

    let client = Arc::new(ServiceClient::new(&settings.api_url)?);

    match cli.command {
        Command::Analyze(args) => analyze(client, &settings, args).await,
        Command::Plants(PlantsCommand::List) => {
            let mut greenhouse = Greenhouse::new(client);
            greenhouse.refresh().await?;
            print!("{}", render::render_plants(greenhouse.plants()));
            Ok(())
        }
        Command::Plants(PlantsCommand::Add { name, plant_type }) => {
            let mut greenhouse = Greenhouse::new(client);
            if !greenhouse.add_plant(&name, plant_type.as_deref()).await? {
                bail!("plant name must not be blank");
            }
            match greenhouse.last_error() {
                Some(err) => println!("Plant added, but the list could not be reloaded: {err}"),
                None => print!("{}", render::render_plants(greenhouse.plants())),
            }
            Ok(())
        }
        Command::Chat(args) => chat(client, args).await,
        Command::Health => {
            let health = client.health().await?;
            print!("{}", render::render_health(&health));
            Ok(())
        }
        Command::Models => {
            let status = client.models_status().await?;
            print!("{}", render::render_models_status(&status));
            Ok(())
        }
    }
}

async fn chat(client: Arc<ServiceClient>, args: ChatArgs) -> Result<()> {
    let mut conversation = Conversation::new(client, args.analysis_id);

    if let Some(message) = args.message {
        if let Some(reply) = conversation.ask(&message).await? {
            print!("{}", render::render_chat_reply(&reply));
        }
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match conversation.ask(&line).await {
            Ok(Some(reply)) => print!("{}", render::render_chat_reply(&reply)),
            Ok(None) => {}
            Err(err) => eprintln!("error: {err}"),
        }
    }
    Ok(())
}

async fn analyze(
    client: Arc<ServiceClient>,
    settings: &config::Settings,
    args: AnalyzeArgs,
) -> Result<()> {
    let bytes = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("failed to read image '{}'", args.image.display()))?;
    let file_name = args
        .image
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let mime_type = mime_guess::from_path(&args.image)
        .first()
        .map(|mime| mime.essence_str().to_string());

    let attach_sensors = settings.attach_sensor_data && !args.no_sensors;
    let mut controller = SubmissionController::new(client, settings.upload_policy(), attach_sensors);

    for (field, value) in [
        (SensorField::Ph, args.ph),
        (SensorField::Ec, args.ec),
        (SensorField::Temperature, args.temperature),
    ] {
        if let Some(value) = value {
            controller
                .update_sensor_data(field, value)
                .with_context(|| format!("invalid --{field} value"))?;
        }
    }
    controller.set_query(args.query);

    controller
        .select_image(ImageCandidate::new(file_name, mime_type, bytes))
        .with_context(|| format!("cannot upload '{}'", args.image.display()))?;

    if controller.analyze().await != PhaseKind::Succeeded {
        let message = controller
            .state()
            .error()
            .unwrap_or("analysis did not complete")
            .to_string();
        bail!(message);
    }

    let Some(report) = controller.report() else {
        bail!("analysis finished without a result");
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render::render_report(&report));
    }
    Ok(())
}
