use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use car_price_predictor::api::PredictionServer;
use car_price_predictor::core::{PredictionForm, Settings};
use car_price_predictor::monitoring::{self, LogLevel, TelemetryConfig};
use car_price_predictor::templates::{user_message, TemplateManager};
use car_price_predictor::{PredictionContext, RequestHandler};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to ./carprice.toml when present)
    #[arg(short, long, global = true, env = "CARPRICE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web form server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Predict the price of one car
    Predict {
        /// Vehicle brand, e.g. Maruti
        #[arg(long)]
        brand: String,
        /// Model year
        #[arg(long)]
        year: String,
        /// Manual or Automatic
        #[arg(long)]
        transmission: String,
        /// Engine displacement in CC
        #[arg(long)]
        engine: String,
        /// Maximum power in bhp
        #[arg(long)]
        max_power: String,
    },
    /// List the known brands and transmissions with their codes
    Brands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv().ok();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;

    let log_level: LogLevel = settings.log_level.parse()?;
    monitoring::init(&TelemetryConfig {
        log_level,
        ..TelemetryConfig::default()
    })?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }

            let context = PredictionContext::load(&settings.artifacts)?;
            let handler = RequestHandler::new(Arc::new(context));

            let mut templates = TemplateManager::new(settings.templates.directory.clone());
            templates
                .load_templates()
                .await
                .context("Failed to load templates")?;

            info!("Car price predictor starting up...");
            let server = PredictionServer::new(settings.server.clone(), handler, templates);
            server.start().await?;
        }
        Commands::Predict {
            brand,
            year,
            transmission,
            engine,
            max_power,
        } => {
            let context = PredictionContext::load(&settings.artifacts)?;
            let handler = RequestHandler::new(Arc::new(context));

            let form = PredictionForm {
                brand: Some(brand),
                year: Some(year),
                transmission: Some(transmission),
                engine: Some(engine),
                max_power: Some(max_power),
            };

            match handler.handle(&form) {
                Ok(prediction) => {
                    println!("Brand: {}", prediction.brand);
                    println!("Year: {}", prediction.year);
                    println!("Transmission: {}", prediction.transmission);
                    println!("Engine: {:?}", prediction.engine);
                    println!("Max Power: {:?}", prediction.max_power);
                    println!("Predicted Price: {:.2}", prediction.predicted_price);
                }
                Err(e) => {
                    anyhow::bail!(user_message(&e, settings.server.expose_internal_errors));
                }
            }
        }
        Commands::Brands => {
            let brands = car_price_predictor::encoding::EncodingTable::brands()?;
            let transmissions = car_price_predictor::encoding::EncodingTable::transmissions()?;

            println!("Brands:");
            for (name, code) in brands.entries() {
                println!("- {} ({})", name, code);
            }
            println!("Transmissions:");
            for (name, code) in transmissions.entries() {
                println!("- {} ({})", name, code);
            }
        }
    }

    Ok(())
}
