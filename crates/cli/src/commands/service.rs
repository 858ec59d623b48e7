//! Service discovery commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, StrategyCatalog};
use crate::output::{color_status, print_heading, print_json, print_table, print_warning, OutputFormat};

/// Row for strategies table
#[derive(Tabled)]
struct StrategyRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "Default")]
    default: String,
}

/// Show service health
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            print_heading("Forecast Service");
            println!("Status:                 {}", color_status(&health.status));
            println!(
                "Demand strategies:      {}",
                health.demand_strategies.join(", ").cyan()
            );
            println!(
                "Price strategies:       {}",
                health.price_strategies.join(", ").cyan()
            );

            if health.status != "healthy" {
                println!();
                print_warning("Some strategies failed to load; other strategies keep serving");
            }
        }
    }

    Ok(())
}

/// List registered strategies per domain
pub async fn show_strategies(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let catalog = client.strategies().await?;

    match format {
        OutputFormat::Json => print_json(&catalog)?,
        OutputFormat::Table => print_table(&strategy_rows(&catalog)),
    }

    Ok(())
}

fn strategy_rows(catalog: &StrategyCatalog) -> Vec<StrategyRow> {
    [("demand", &catalog.demand), ("price", &catalog.price)]
        .into_iter()
        .flat_map(|(domain, summary)| {
            summary.available.iter().map(move |name| StrategyRow {
                domain: domain.to_string(),
                strategy: name.clone(),
                default: if summary.default.as_deref() == Some(name.as_str()) {
                    "✓".to_string()
                } else {
                    String::new()
                },
            })
        })
        .collect()
}
