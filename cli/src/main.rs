use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use mofutree_cli::{logging, submit_and_wait, HttpTreeApi, PushRunner, PushSignal};
use mofutree_core::{
    system_clock, AssetReference, ClientHooks, Endpoints, PushEvent, SubmitOutcome, TreeClient,
    UploadFile, UploadView, ROLLBACK_STEPS,
};

#[derive(Parser)]
#[command(name = "mofutree-cli", version, about = "Command-line client for the decorated tree")]
struct Cli {
    #[arg(long, env = "MOFUTREE_BASE_URL", default_value = "http://localhost:8002")]
    base_url: String,
    #[arg(long, env = "MOFUTREE_LOG", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow push notifications and print each new composite address.
    Watch {
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Submit an image to be added to the tree.
    Upload {
        path: PathBuf,
        /// Keep the push channel open until the new composite is announced.
        #[arg(long)]
        wait: bool,
        #[arg(long, default_value_t = 600)]
        wait_secs: u64,
    },
    /// List archived composites, newest first.
    History,
    /// Make an archived composite current again.
    Restore { filename: String },
    /// Step the current composite back by one.
    Undo,
    /// Save the current composite to disk.
    Download {
        #[arg(long)]
        output: Option<PathBuf>,
        /// Download an archived composite instead of the current one.
        #[arg(long)]
        history: Option<String>,
    },
}

type App = TreeClient<HttpTreeApi>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let endpoints = Endpoints::parse(&cli.base_url)?;
    let api = HttpTreeApi::new(endpoints.clone())?;
    let client = TreeClient::new(api, endpoints, system_clock());

    match cli.command {
        Commands::Watch { duration_secs } => watch(&client, duration_secs).await?,
        Commands::Upload {
            path,
            wait,
            wait_secs,
        } => upload(&client, path, wait, Duration::from_secs(wait_secs)).await?,
        Commands::History => history(&client).await?,
        Commands::Restore { filename } => {
            client.unlock_admin();
            let ack = client.restore(&filename).await?;
            println!("restored {filename}");
            if let Some(current) = ack.current {
                println!("current: {current}");
            }
        }
        Commands::Undo => {
            client.unlock_admin();
            let ack = client.rollback(ROLLBACK_STEPS).await?;
            println!("rolled back");
            if let Some(current) = ack.current {
                println!("current: {current}");
            }
        }
        Commands::Download { output, history } => download(&client, output, history).await?,
    }
    Ok(())
}

fn announce_updates(client: &App) {
    let mut hooks = ClientHooks::empty();
    hooks.on_asset = Rc::new(|asset: &AssetReference| {
        println!("updated: {}", asset.current_uri());
    });
    hooks.on_upload = Rc::new(|view: &UploadView| {
        if let Some(status) = &view.status {
            tracing::debug!(%status, loading = view.loading, "upload status");
        }
    });
    hooks.on_notice = Rc::new(|message: String| eprintln!("{message}"));
    client.set_hooks(hooks);
}

async fn watch(client: &App, duration_secs: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    announce_updates(client);
    println!("current: {}", client.asset_uri());
    let (runner, mut signals) = PushRunner::spawn(client.endpoints().push());
    let deadline = async {
        match duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            signal = signals.recv() => match signal {
                Some(PushSignal::CompositeUpdated) => client.handle_push_event(PushEvent::CompositeUpdated),
                Some(PushSignal::State(state)) => tracing::debug!(?state, "push channel state"),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
            _ = &mut deadline => break,
        }
    }
    runner.stop().await;
    Ok(())
}

async fn upload(
    client: &App,
    path: PathBuf,
    wait: bool,
    wait_for: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(&path).await?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("decoration.png")
        .to_string();
    client.select_file(Some(UploadFile::new(name, bytes)));

    let outcome = if wait {
        announce_updates(client);
        let waited = submit_and_wait(client, client.endpoints().push(), wait_for).await;
        print_status(client);
        if waited.outcome == SubmitOutcome::Succeeded && !waited.announced {
            eprintln!("no update announced within {}s", wait_for.as_secs());
        }
        waited.outcome
    } else {
        let outcome = client.submit_upload().await;
        print_status(client);
        outcome
    };

    match outcome {
        SubmitOutcome::Failed(reason) => Err(reason.into()),
        SubmitOutcome::Skipped | SubmitOutcome::Succeeded => Ok(()),
    }
}

fn print_status(client: &App) {
    if let Some(status) = &client.upload_view().status {
        println!("{status}");
    }
}

async fn history(client: &App) -> Result<(), Box<dyn std::error::Error>> {
    client.unlock_admin();
    client.open_admin().await?;
    let view = client.admin_view();
    if view.entries.is_empty() {
        println!("no history");
    }
    for entry in &view.entries {
        let marker = if entry.is_current() { "CURRENT" } else { "" };
        println!(
            "{:>3} {:<8} {}  {}",
            entry.position,
            marker,
            entry.filename,
            client.history_image_uri(entry)
        );
    }
    client.close_admin();
    Ok(())
}

async fn download(
    client: &App,
    output: Option<PathBuf>,
    history: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (bytes, default_name) = match history {
        Some(filename) => {
            let bytes = client.api().download_history_image(&filename).await?;
            (bytes, filename)
        }
        None => {
            let asset = client.asset();
            let bytes = client.api().download(&asset).await?;
            (bytes, asset.download_filename())
        }
    };
    let output = output.unwrap_or_else(|| PathBuf::from(default_name));
    tokio::fs::write(&output, &bytes).await?;
    println!("saved {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}
