use clap::Parser;
use std::path::PathBuf;

/// Server configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug, Clone)]
#[command(name = "car_insights")]
#[command(author, version, about = "REST API serving car market statistics and charts")]
pub struct ServerConfig {
    /// Server port to listen on
    #[arg(short, long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Path to the car listings CSV
    #[arg(long, env = "CAR_DETAILS_CSV", default_value = "car_details_df.csv")]
    pub car_details: PathBuf,

    /// Path to the car prices CSV
    #[arg(long, env = "PRICE_DETAILS_CSV", default_value = "price_cardetails_df.csv")]
    pub price_details: PathBuf,
}
