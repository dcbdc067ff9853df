use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall attendance CLI")]
struct Cli {
    /// Base URL of the attendance daemon
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a frame and mark attendance for a roll number
    Capture {
        /// Roll number identifying the person
        roll_number: String,
    },
    /// Upload a reference image; the identity is the filename stem
    Upload {
        /// Image file to upload
        file: PathBuf,
    },
    /// Release the daemon's camera
    Shutdown,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Capture { roll_number } => {
            let response = client
                .post(format!("{}/capture", cli.url))
                .json(&serde_json::json!({ "rollNumber": roll_number }))
                .send()
                .await
                .context("capture request failed")?;
            print_message(response).await?;
        }
        Commands::Upload { file } => {
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .context("file has no usable name")?
                .to_string();
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;

            let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
            let form = reqwest::multipart::Form::new().part("file", part);

            let response = client
                .post(format!("{}/upload", cli.url))
                .multipart(form)
                .send()
                .await
                .context("upload request failed")?;
            print_message(response).await?;
        }
        Commands::Shutdown => {
            let response = client
                .post(format!("{}/shutdown", cli.url))
                .send()
                .await
                .context("shutdown request failed")?;
            println!("{}", response.text().await.context("bad response body")?);
        }
    }

    Ok(())
}

/// Print the `message` field of a JSON response.
async fn print_message(response: reqwest::Response) -> Result<()> {
    let body: serde_json::Value = response.json().await.context("bad response body")?;
    println!("{}", body["message"].as_str().unwrap_or_default());
    Ok(())
}
