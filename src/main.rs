mod config;
mod error;
mod fetcher;
mod filters;
mod inventory;
mod models;
mod submission;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::VerifyError;
use fetcher::{FetchState, HttpListingSource};
use filters::{FilterChange, MemoryAddressBar};
use inventory::{Interaction, InventoryPage};
use submission::RegistrationVerifier;

#[derive(Debug, Parser)]
#[command(name = "car-scout", about = "Browse used-car inventory and start a listing")]
struct Cli {
    /// Listing backend base URL (overrides CAR_SCOUT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the inventory page, apply filters and fetch one page
    Browse(BrowseArgs),
    /// Check a registration number before listing a car
    Verify {
        #[arg(long)]
        reg_no: String,
        /// Bearer token of the logged-in seller
        #[arg(long, env = "CAR_SCOUT_TOKEN")]
        token: Option<String>,
    },
}

#[derive(Debug, Args)]
struct BrowseArgs {
    /// Shared link (or path + query) to start from
    #[arg(long, default_value = "/used-cars")]
    location: String,
    #[arg(long)]
    brand: Option<String>,
    #[arg(long)]
    fuel: Option<String>,
    #[arg(long)]
    year: Option<String>,
    #[arg(long)]
    transmission: Option<String>,
    #[arg(long)]
    owner: Option<String>,
    #[arg(long)]
    min_price: Option<f64>,
    #[arg(long)]
    max_price: Option<f64>,
    /// Only verified listings
    #[arg(long)]
    verified: bool,
    /// Jump to this page after applying filters
    #[arg(long)]
    page: Option<u32>,
    /// Reset all filters before applying the others
    #[arg(long)]
    reset: bool,
    /// Write the fetched page as JSON
    #[arg(long)]
    output: Option<PathBuf>,
}

impl BrowseArgs {
    /// Flags in the order a user would click them
    fn interactions(&self, current_min: f64, current_max: f64) -> Vec<Interaction> {
        let mut interactions = Vec::new();
        if self.reset {
            interactions.push(Interaction::Reset);
        }

        let text_filters: [(&Option<String>, fn(Option<String>) -> FilterChange); 5] = [
            (&self.brand, FilterChange::Brand),
            (&self.fuel, FilterChange::Fuel),
            (&self.year, FilterChange::Year),
            (&self.transmission, FilterChange::Transmission),
            (&self.owner, FilterChange::Owner),
        ];
        for (value, change) in text_filters {
            if let Some(value) = value {
                interactions.push(Interaction::Filter(change(Some(value.clone()))));
            }
        }

        if self.min_price.is_some() || self.max_price.is_some() {
            interactions.push(Interaction::Filter(FilterChange::PriceRange {
                min: self.min_price.unwrap_or(current_min),
                max: self.max_price.unwrap_or(current_max),
            }));
        }
        if self.verified {
            interactions.push(Interaction::Filter(FilterChange::VerifiedOnly(true)));
        }
        if let Some(page) = self.page {
            interactions.push(Interaction::Page(page));
        }
        interactions
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(api_url) = cli.api_url {
        config.api_base_url = api_url.trim_end_matches('/').to_string();
    }

    match cli.command {
        Command::Browse(args) => browse(&config, args).await,
        Command::Verify { reg_no, token } => verify(&config, &reg_no, token.as_deref()).await,
    }
}

async fn browse(config: &Config, args: BrowseArgs) -> anyhow::Result<()> {
    info!("🚗 Car Scout - Used Car Inventory");
    info!("Backend: {}", config.api_base_url);

    let source = HttpListingSource::new(config)?;
    let mut page = InventoryPage::mount(MemoryAddressBar::new(args.location.clone()), source, config);

    let query = page.query().clone();
    let mut interactions = args.interactions(query.min_price, query.max_price);
    let last = interactions.pop();
    for interaction in interactions {
        page.apply(interaction);
    }

    let state = match last {
        Some(interaction) => {
            info!("Applying {:?}...", interaction);
            page.handle(interaction).await
        }
        None => {
            info!("Fetching page {}...", page.query().page());
            page.refresh().await
        }
    };

    println!("{}", page.heading());
    println!();

    match &state {
        FetchState::Success(result) => {
            for (i, listing) in result.listings.iter().enumerate() {
                let model = listing.model.as_deref().unwrap_or("");
                println!("{}. {} {} (₹{} Lakh)", i + 1, listing.brand, model, listing.price);
                let details: Vec<String> = [
                    listing.year.map(|y| y.to_string()),
                    listing.fuel.clone(),
                    listing.transmission.clone(),
                    listing.owner.clone().map(|o| format!("{} owner", o)),
                    listing.km_driven.map(|km| format!("{} km", km)),
                ]
                .into_iter()
                .flatten()
                .collect();
                if !details.is_empty() {
                    println!("   {}", details.join(" · "));
                }
                if let Some(city) = &listing.city {
                    println!("   City: {}", city);
                }
                if listing.verified {
                    println!("   ✔ Verified");
                }
                println!("   ID: {}", listing.id);
                println!();
            }

            match (result.total, page.total_pages()) {
                (Some(total), Some(pages)) => println!(
                    "Page {} of {} ({} cars available)",
                    page.current_page(),
                    pages,
                    total
                ),
                _ => println!(
                    "Page {} ({} cars on this page)",
                    page.current_page(),
                    result.listings.len()
                ),
            }

            if let Some(path) = &args.output {
                let json = serde_json::to_string_pretty(result.as_ref())?;
                tokio::fs::write(path, json)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("💾 Saved page to {}", path.display());
            }
        }
        other => {
            if let Some(notice) = other.notice() {
                println!("{}", notice);
            }
            warn!("No listings to show ({:?})", other);
        }
    }

    println!("Shareable URL: {}", page.coordinator().href());
    Ok(())
}

async fn verify(config: &Config, reg_no: &str, token: Option<&str>) -> anyhow::Result<()> {
    let verifier = RegistrationVerifier::new(config)?;

    match verifier.verify(reg_no, token).await {
        Ok(verified) => {
            println!("Car verified successfully!");
            info!("Continue with the details form for {}", verified.reg_no);
            Ok(())
        }
        Err(VerifyError::LoginRequired) => {
            println!("Please log in (pass --token or set CAR_SCOUT_TOKEN) to sell your car.");
            Ok(())
        }
        Err(err @ VerifyError::Network(_)) => Err(err.into()),
        Err(err) => {
            println!("{}", err);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browse_flags_become_interactions() {
        let cli = Cli::parse_from([
            "car-scout",
            "browse",
            "--reset",
            "--fuel",
            "Diesel",
            "--max-price",
            "12",
            "--verified",
            "--page",
            "2",
        ]);
        let Command::Browse(args) = cli.command else {
            panic!("expected browse");
        };

        let interactions = args.interactions(1.0, 50.0);
        assert_eq!(
            interactions,
            vec![
                Interaction::Reset,
                Interaction::Filter(FilterChange::Fuel(Some("Diesel".to_string()))),
                Interaction::Filter(FilterChange::PriceRange {
                    min: 1.0,
                    max: 12.0
                }),
                Interaction::Filter(FilterChange::VerifiedOnly(true)),
                Interaction::Page(2),
            ]
        );
    }

    #[test]
    fn test_no_flags_no_interactions() {
        let cli = Cli::parse_from(["car-scout", "browse", "--location", "/used-cars?page=3"]);
        let Command::Browse(args) = cli.command else {
            panic!("expected browse");
        };
        assert!(args.interactions(1.0, 50.0).is_empty());
        assert_eq!(args.location, "/used-cars?page=3");
    }
}
