//! Forecast service CLI
//!
//! A command-line tool for checking the forecast service and requesting
//! demand and weekly-sales predictions.

mod client;
mod commands;
mod output;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use commands::{predict, service};
use std::process::ExitCode;

/// Forecast service CLI
#[derive(Parser)]
#[command(name = "fcst")]
#[command(author, version, about = "CLI for the demand and weekly sales forecast service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via FCST_API_URL env var)
    #[arg(long, env = "FCST_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show service health and registered strategies
    Health,

    /// List strategies and their defaults per domain
    Strategies,

    /// Forecast units sold for a SKU at a store
    Demand {
        /// Week start (DD/MM/YY)
        #[arg(long, value_parser = predict::parse_week)]
        week: String,

        /// Store identifier
        #[arg(long)]
        store_id: i64,

        /// SKU identifier
        #[arg(long)]
        sku_id: i64,

        /// Base price of the SKU
        #[arg(long)]
        base_price: f64,

        /// Total price paid (defaults to the base price)
        #[arg(long)]
        total_price: Option<f64>,

        /// The SKU was featured that week
        #[arg(long)]
        featured: bool,

        /// The SKU was on display that week
        #[arg(long)]
        display: bool,

        /// Strategy name (uses the service default if not specified)
        #[arg(long, short)]
        strategy: Option<String>,
    },

    /// Forecast weekly sales for a store department
    Price {
        /// Store number
        #[arg(long)]
        store: u32,

        /// Department number
        #[arg(long)]
        dept: u32,

        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Holiday week override (taken from the store calendar if not specified)
        #[arg(long)]
        holiday: Option<bool>,

        /// Strategy name (uses the service default if not specified)
        #[arg(long, short)]
        strategy: Option<String>,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = client::ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Health => service::show_health(&client, cli.format).await?,
        Commands::Strategies => service::show_strategies(&client, cli.format).await?,
        Commands::Demand {
            week,
            store_id,
            sku_id,
            base_price,
            total_price,
            featured,
            display,
            strategy,
        } => {
            let request = client::DemandRequest {
                week,
                store_id,
                sku_id,
                base_price,
                total_price,
                is_featured_sku: u8::from(featured),
                is_display_sku: u8::from(display),
                strategy,
            };
            predict::predict_demand(&client, request, cli.format).await?;
        }
        Commands::Price {
            store,
            dept,
            date,
            holiday,
            strategy,
        } => {
            let request = client::PriceRequest {
                store,
                dept,
                date: date.format("%Y-%m-%d").to_string(),
                is_holiday: holiday,
                strategy,
            };
            predict::predict_price(&client, request, cli.format).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_price_arguments() {
        let cli = Cli::try_parse_from([
            "fcst", "--format", "json", "price", "--store", "1", "--dept", "1", "--date",
            "2012-11-02", "--holiday", "true",
        ])
        .unwrap();

        assert_eq!(cli.format, output::OutputFormat::Json);
        match cli.command {
            Commands::Price { date, holiday, strategy, .. } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2012, 11, 2).unwrap());
                assert_eq!(holiday, Some(true));
                assert!(strategy.is_none());
            }
            _ => panic!("expected price command"),
        }
    }

    #[test]
    fn test_demand_rejects_bad_week() {
        let result = Cli::try_parse_from([
            "fcst", "demand", "--week", "2011-01-17", "--store-id", "8091", "--sku-id",
            "216418", "--base-price", "111.86",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_demand_flags() {
        let cli = Cli::try_parse_from([
            "fcst", "demand", "--week", "17/01/11", "--store-id", "8091", "--sku-id",
            "216418", "--base-price", "111.86", "--featured", "-s", "lightgbm",
        ])
        .unwrap();

        match cli.command {
            Commands::Demand { featured, display, strategy, total_price, .. } => {
                assert!(featured);
                assert!(!display);
                assert_eq!(strategy.as_deref(), Some("lightgbm"));
                assert!(total_price.is_none());
            }
            _ => panic!("expected demand command"),
        }
    }
}
