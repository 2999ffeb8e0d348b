use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use submerge_core::apply::{ConfigSink, ControllerSink, FileSink};
use submerge_core::merge_batches;
use submerge_core::storage::{self, AppPaths, SubscriptionList};
use submerge_core::subscription::{self, FailurePolicy, Subscription};
use submerge_core::DecoderRegistry;
use tokio::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "submerge", author, version, about = "Merge proxy subscriptions into one routing configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Update(UpdateArgs),
}

#[derive(Args)]
struct UpdateArgs {
    /// Subscriptions YAML definition (defaults to ~/.config/submerge/subscriptions.yaml).
    #[arg(long)]
    subscriptions_file: Option<PathBuf>,

    /// Additional subscription sources (URL or file path). May be repeated.
    #[arg(long = "subscription", short = 's')]
    subscriptions: Vec<String>,

    /// Output config file path. Defaults to the configured output if omitted.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write the merged config to stdout instead of a file.
    #[arg(long)]
    stdout: bool,

    /// External controller endpoint to also push the merged config to.
    #[arg(long)]
    controller: Option<String>,

    /// Bearer secret for the external controller.
    #[arg(long)]
    secret: Option<String>,

    /// Ask the engine to force a full reload when pushing.
    #[arg(long)]
    force_reload: bool,

    /// What to do when a subscription fails to load: skip or abort.
    #[arg(long = "on-error")]
    on_error: Option<FailurePolicy>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Update(args) => run_update(args).await?,
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

async fn run_update(args: UpdateArgs) -> anyhow::Result<()> {
    let paths = AppPaths::new()?;
    paths.ensure_runtime_dirs().await?;

    let client = reqwest::Client::builder()
        .user_agent("submerge/0.1")
        .build()?;

    let app_config = storage::load_app_config(&paths).await?;

    let mut subscription_list = if let Some(path) = args.subscriptions_file.as_ref() {
        load_subscriptions_from_path(path).await?
    } else {
        storage::load_subscription_list(&paths).await?
    };

    let mut ad_hoc: Vec<Subscription> = args
        .subscriptions
        .iter()
        .enumerate()
        .map(|(idx, source)| subscription_from_input(idx, source))
        .collect();

    let registry = DecoderRegistry::with_defaults();
    let policy = args.on_error.unwrap_or(app_config.on_failure);

    let mut batches = subscription::collect_batches(
        &client,
        &mut subscription_list.items,
        &registry,
        policy,
    )
    .await
    .context("update cycle abandoned")?;

    let extra = subscription::collect_batches(&client, &mut ad_hoc, &registry, policy)
        .await
        .context("update cycle abandoned")?;
    batches.extend(extra);

    let document = merge_batches(batches);
    let yaml = document
        .to_yaml_string()
        .context("merged configuration could not be serialized")?;

    if args.stdout {
        println!("{yaml}");
    } else {
        let output_path = args
            .output
            .clone()
            .unwrap_or_else(|| paths.output_config_path());
        let sink = FileSink {
            path: output_path.clone(),
        };
        sink.apply(&yaml, args.force_reload).await.with_context(|| {
            format!("failed to write merged config to {}", output_path.display())
        })?;
        println!("merged config written to {}", output_path.display());
    }

    if let Some(endpoint) = args.controller.clone().or(app_config.controller) {
        let sink = ControllerSink {
            endpoint,
            secret: args.secret.clone().or(app_config.secret),
            client: client.clone(),
        };
        sink.apply(&yaml, args.force_reload)
            .await
            .context("engine refused the merged configuration")?;
        info!("merged config pushed to engine");
    }

    if let Some(path) = args.subscriptions_file.as_ref() {
        save_subscriptions_to_path(path, &subscription_list).await?;
    } else {
        storage::save_subscription_list(&paths, &subscription_list).await?;
    }

    Ok(())
}

fn subscription_from_input(index: usize, input: &str) -> Subscription {
    let mut subscription = Subscription {
        name: format!("cli-{index}"),
        url: None,
        path: None,
        enabled: true,
        last_updated: None,
    };

    if is_url(input) {
        subscription.url = Some(input.to_string());
        if let Some(host) = url_name(input) {
            subscription.name = host;
        }
    } else {
        subscription.path = Some(PathBuf::from(input));
        if let Some(stem) = Path::new(input).file_stem().and_then(|stem| stem.to_str()) {
            subscription.name = stem.to_string();
        }
    }

    subscription
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

fn url_name(input: &str) -> Option<String> {
    let start = input.find("//")? + 2;
    let rest = &input[start..];
    match rest.find('/') {
        Some(end) => Some(rest[..end].to_string()),
        None => Some(rest.to_string()),
    }
}

async fn load_subscriptions_from_path(path: &Path) -> anyhow::Result<SubscriptionList> {
    match fs::read_to_string(path).await {
        Ok(contents) => Ok(serde_yaml::from_str(&contents)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(SubscriptionList::default()),
        Err(err) => Err(err.into()),
    }
}

async fn save_subscriptions_to_path(path: &Path, list: &SubscriptionList) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, serde_yaml::to_string(list)?).await?;
    Ok(())
}
