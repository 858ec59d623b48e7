//! Prediction commands

use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;

use crate::client::{ApiClient, DemandRequest, PriceRequest};
use crate::output::{color_status, format_amount, format_currency, print_heading, print_json, OutputFormat};

/// Week labels are `DD/MM/YY`
pub const WEEK_FORMAT: &str = "%d/%m/%y";

/// Reject malformed week labels before they reach the service
pub fn parse_week(value: &str) -> Result<String, String> {
    NaiveDate::parse_from_str(value, WEEK_FORMAT)
        .map(|_| value.to_string())
        .map_err(|e| format!("expected DD/MM/YY: {}", e))
}

/// Forecast units sold for one SKU at one store
pub async fn predict_demand(
    client: &ApiClient,
    request: DemandRequest,
    format: OutputFormat,
) -> Result<()> {
    let response = client.predict_demand(&request).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_heading("Demand Forecast");
            println!("Week:                   {}", request.week);
            println!("Store:                  {}", request.store_id);
            println!("SKU:                    {}", request.sku_id);
            println!("Base price:             {:.2}", request.base_price);
            if let Some(total) = request.total_price {
                println!("Total price:            {:.2}", total);
            }
            println!("Strategy:               {}", response.strategy_used.cyan());
            println!("Status:                 {}", color_status(&response.status));
            println!();
            println!(
                "{}  {}",
                "Predicted units sold:".bold(),
                format_amount(response.predicted_units_sold).green().bold()
            );
        }
    }

    Ok(())
}

/// Forecast weekly sales for one department of one store
pub async fn predict_price(
    client: &ApiClient,
    request: PriceRequest,
    format: OutputFormat,
) -> Result<()> {
    let response = client.predict_price(&request).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_heading("Weekly Sales Forecast");
            println!("Store:                  {}", response.store);
            println!("Department:             {}", response.dept);
            println!("Date:                   {}", response.date);
            if let Some(holiday) = request.is_holiday {
                println!("Holiday week:           {}", if holiday { "yes" } else { "no" });
            }
            println!("Strategy:               {}", response.strategy_used.cyan());
            println!("Status:                 {}", color_status(&response.status));
            println!();
            println!(
                "{}  {}",
                "Predicted weekly sales:".bold(),
                format_currency(response.predicted_weekly_sales).green().bold()
            );
        }
    }

    Ok(())
}
