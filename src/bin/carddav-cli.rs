use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;

#[derive(Parser)]
#[command(name = "carddav-cli")]
#[command(about = "Inspection CLI for the CardDAV server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8888")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List address books under the home set
    Books {
        #[arg(default_value = "/ZGU/contacts/")]
        path: String,
    },
    /// List contact resources in an address book
    Contacts {
        #[arg(default_value = "/ZGU/contacts/default/")]
        path: String,
    },
    /// Fetch a single contact by path
    Get { path: String },
}

const ALLPROP_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:"><d:allprop/></d:propfind>"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Books { path } | Commands::Contacts { path } => {
            let mut headers = HeaderMap::new();
            headers.insert("Depth", HeaderValue::from_static("1"));

            let res = client
                .request(Method::from_bytes(b"PROPFIND")?, format!("{}{}", cli.url, path))
                .headers(headers)
                .body(ALLPROP_BODY)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Get { path } => {
            let res = client
                .get(format!("{}{}", cli.url, path))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(etag) = res.headers().get("etag") {
        eprintln!("ETag: {}", etag.to_str().unwrap_or("<binary>"));
    }
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
    }
    let text = res.text().await?;
    println!("{}", text);
    Ok(())
}
