//! Verify Apex Omni API credentials
//!
//! Checks the environment, calls one public endpoint, then the private
//! account endpoints.
//!
//! ```bash
//! cargo run --bin check_credentials            # mainnet
//! cargo run --bin check_credentials -- --testnet
//! ```

use std::env;
use std::sync::Arc;

use apex_omni_sdk::{Account, ApexClient, BaseUrl, Credentials, MarketData};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    dotenvy::dotenv().ok();

    let base_url = if env::args().any(|a| a == "--testnet") {
        BaseUrl::Testnet
    } else {
        BaseUrl::Mainnet
    };

    println!("Testing Apex Omni API credentials against {}\n", base_url.get_url());

    let missing = Credentials::missing_env_vars();
    if !missing.is_empty() {
        eprintln!("Missing required environment variables: {}", missing.join(", "));
        println!("\nMake sure your .env file contains:");
        println!("APEX_API_KEY=your_key");
        println!("APEX_API_SECRET=your_secret");
        println!("APEX_API_PASSPHRASE=your_passphrase");
        std::process::exit(1);
    }
    println!("All required environment variables found\n");

    println!("Testing public endpoints...");
    let market = MarketData::new(Arc::new(ApexClient::public(base_url)?));
    match market.get_price("BTC-USDT").await {
        Ok(quote) => println!("Public API working - BTC price: {}", quote.price),
        Err(e) => eprintln!("Public API error: {}", e),
    }

    println!("\nTesting private endpoints...");
    let client = Arc::new(ApexClient::new(base_url, Credentials::from_env()?)?);
    let account = Account::new(client);
    match account.get_summary().await {
        Ok(summary) => {
            println!("Authentication successful!");
            println!("User ID: {}", summary.user_id.as_deref().unwrap_or("N/A"));
            println!("Email: {}", summary.email.as_deref().unwrap_or("N/A"));
            println!("Available balance: {:.2}", summary.balance.available);
            println!("Open orders: {}", summary.open_orders);
        }
        Err(e) => {
            eprintln!("Authentication failed: {}", e);
            if e.is_auth_failure() {
                println!("\nPossible issues:");
                println!("1. Invalid API credentials");
                println!("2. API key not activated");
                println!("3. Wrong passphrase");
            }
            std::process::exit(1);
        }
    }

    println!("\nOpen positions:");
    match account.get_positions().await {
        Ok(positions) if positions.is_empty() => println!("  none"),
        Ok(positions) => {
            for p in positions {
                let entry = p.entry_price.map_or("N/A".to_string(), |e| e.to_string());
                println!("  {} {}: {} @ {}", p.symbol, p.side, p.size, entry);
            }
        }
        Err(e) => eprintln!("Could not fetch positions: {}", e),
    }

    Ok(())
}
