use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    ClientCredentialsProvider, ControllerError, ControllerOptions, CredentialProvider,
    GraphqlQueryExecutor, MissingCredentialProvider, PaginationController, StaticTokenProvider,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, set_page_size, CredentialSource, Settings};
use render::{render_footer, render_table};

#[derive(Parser, Debug)]
#[command(about = "Page through a remote metrics report in the terminal")]
struct Args {
    #[arg(long, default_value = "report.toml")]
    config: PathBuf,
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    page_size: Option<u32>,
    /// Print the first page and exit.
    #[arg(long)]
    once: bool,
}

enum Command {
    Next,
    Previous,
    Retry,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "n" | "next" => Some(Command::Next),
        "p" | "prev" | "previous" => Some(Command::Previous),
        "r" | "retry" => Some(Command::Retry),
        "q" | "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

fn credential_provider(settings: &Settings) -> Result<Box<dyn CredentialProvider>> {
    Ok(match settings.credential_source() {
        CredentialSource::Static(token) => Box::new(StaticTokenProvider::new(token)),
        CredentialSource::ClientCredentials {
            token_host,
            token_path,
            client_id,
            client_secret,
        } => Box::new(ClientCredentialsProvider::new(
            &token_host,
            &token_path,
            client_id,
            client_secret,
        )?),
        CredentialSource::Missing => Box::new(MissingCredentialProvider),
    })
}

async fn print_view(controller: &PaginationController) {
    let view = controller.view_model().await;
    let status = controller.status().await;
    if let Some(view) = &view {
        println!("{}", render_table(view));
    }
    println!("{}", render_footer(view.as_ref(), &status));
}

fn report_outcome(outcome: Result<(), ControllerError>) {
    match outcome {
        Ok(()) => {}
        Err(ControllerError::Rejected(reason)) => println!("{reason}"),
        Err(err) => warn!("report: {err}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config);
    if let Some(endpoint) = args.endpoint {
        settings.graphql_endpoint = endpoint;
    }
    if let Some(page_size) = args.page_size {
        set_page_size(&mut settings, page_size);
    }

    let token = credential_provider(&settings)?
        .access_token()
        .await
        .context("failed to acquire access token")?;
    let executor = GraphqlQueryExecutor::new(
        settings.graphql_url()?,
        Some(Duration::from_secs(settings.request_timeout_secs)),
    )?;
    info!(
        "report: endpoint={} page_size={}",
        executor.endpoint(),
        settings.page_size
    );

    let controller = PaginationController::with_options(
        Arc::new(executor),
        token,
        ControllerOptions {
            page_size: settings.page_size,
        },
    );
    let base = settings.base_query.clone();

    report_outcome(controller.load_initial(&base).await);
    print_view(&controller).await;
    if args.once {
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_command(&line) else {
            if !line.trim().is_empty() {
                println!("unknown command '{}'", line.trim());
            }
            continue;
        };
        if matches!(command, Command::Quit) {
            break;
        }
        let navigation = async {
            match command {
                Command::Next => controller.page_forward(&base).await,
                Command::Previous => controller.page_backward(&base).await,
                Command::Retry => controller.retry().await,
                Command::Quit => Ok(()),
            }
        };

        tokio::select! {
            outcome = navigation => report_outcome(outcome),
            _ = tokio::signal::ctrl_c() => {
                controller.cancel().await;
                info!("report: interrupted");
                return Ok(());
            }
        }
        print_view(&controller).await;
    }

    controller.cancel().await;
    Ok(())
}
