use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "tracker-cli")]
#[command(about = "Inspect in-flight requests of a running HTTP tracker", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List in-flight requests as JSON
    Inflight,
    /// Print the text report
    Text,
    /// Show tracker status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Inflight => {
            let res = client
                .get(format!("{}/debug/httpclients", cli.url))
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::Text => {
            let res = client
                .get(format!("{}/debug/httpclients/text", cli.url))
                .send()
                .await?;
            if check_status(&res) {
                print!("{}", res.text().await?);
            }
        }
        Commands::Status => {
            let res = client
                .get(format!("{}/debug/status", cli.url))
                .send()
                .await?;
            print_json(res).await?;
        }
    }

    Ok(())
}

fn check_status(res: &reqwest::Response) -> bool {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: tracker endpoint returned status {}", status);
        return false;
    }
    true
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    if !check_status(&res) {
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
