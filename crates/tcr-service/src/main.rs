use anyhow::{bail, Context, Result};
use clap::Parser;
use std::future::Future;
use std::sync::Arc;
use tcr_config::{Config, ConfigLoader};
use tcr_core::{DashboardEngine, IntakeController};
use tcr_types::{
	Address, DashboardEvent, IntentEvent, RegistryEvent, TransactionIntent, UiEvent,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = ConfigLoader::new()
		.with_file(&args.config)
		.load()
		.await
		.context("Failed to load configuration")?;

	let log_level = args
		.log_level
		.as_deref()
		.unwrap_or(&config.dashboard.log_level);
	setup_tracing(log_level)?;

	info!("Loaded configuration from {:?}", args.config);

	let engine = Arc::new(DashboardEngine::from_config(&config).context("Failed to build engine")?);
	if let Command::Validate = args.command {
		return validate_config(&config);
	}

	engine
		.load()
		.await
		.context("Failed to restore registry book")?;

	match args.command {
		Command::Run => run_engine(engine, &config).await,
		Command::Buy { token, amount } => {
			execute_intent(engine, TransactionIntent::buy(token, amount)).await
		}
		Command::Sell { token, amount } => {
			execute_intent(engine, TransactionIntent::sell(token, amount)).await
		}
		Command::Approve {
			token,
			registry,
			amount,
		} => {
			execute_intent(
				engine,
				TransactionIntent::approve_allowance(token, amount, registry),
			)
			.await
		}
		Command::AddRegistry { address } => add_registry(&engine, &address).await,
		Command::RemoveRegistry { address } => remove_registry(&engine, &address).await,
		Command::List => {
			list_registries(&engine);
			Ok(())
		}
		Command::Validate => Ok(()),
	}
}

async fn run_engine(engine: Arc<DashboardEngine>, config: &Config) -> Result<()> {
	info!("Starting {}", config.dashboard.name);

	let account = engine.login().await.context("Failed to log in")?;
	if let Some(wallet) = account.wallet_address {
		info!(wallet = %wallet.to_checksum(), "Wallet unlocked");
	}

	let mut events = engine.subscribe();
	let logger = tokio::spawn(async move {
		loop {
			match events.recv().await {
				Ok(event) => log_event(&event),
				Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event log fell behind"),
				Err(RecvError::Closed) => break,
			}
		}
	});

	let runner = {
		let engine = engine.clone();
		tokio::spawn(async move { engine.run().await })
	};

	let served = serve_intents(
		&engine,
		BufReader::new(tokio::io::stdin()),
		tokio::io::stdout(),
		shutdown_signal(),
	)
	.await;

	engine.shutdown();
	runner.await.context("Engine task panicked")??;
	engine.logout().await;
	logger.abort();

	served?;
	info!("{} stopped", config.dashboard.name);
	Ok(())
}

/// Submits newline-delimited `TransactionIntent` JSON read from `input` and
/// writes one JSON line per result to `output`. Returns once the input is
/// exhausted and every submitted intent has been answered, or when
/// `shutdown` resolves.
async fn serve_intents<R, W>(
	engine: &DashboardEngine,
	input: R,
	mut output: W,
	shutdown: impl Future<Output = ()>,
) -> Result<()>
where
	R: AsyncBufRead + Unpin,
	W: AsyncWrite + Unpin,
{
	let mut lines = input.lines();
	let mut pending = JoinSet::new();
	let mut reading = true;
	tokio::pin!(shutdown);

	loop {
		tokio::select! {
			_ = &mut shutdown => {
				info!("Shutdown signal received, stopping engine...");
				break;
			}

			line = lines.next_line(), if reading => match line.context("Failed to read intents")? {
				Some(line) if line.trim().is_empty() => {}
				Some(line) => match serde_json::from_str::<TransactionIntent>(&line) {
					Ok(intent) => {
						let ticket = engine.submit(intent.clone()).await?;
						pending.spawn(async move { (intent, ticket.outcome().await) });
					}
					Err(e) => warn!(error = %e, "Ignoring malformed intent"),
				},
				None => reading = false,
			},

			Some(joined) = pending.join_next(), if !pending.is_empty() => {
				let (intent, result) = joined.context("Outcome task panicked")?;
				let line = match result? {
					Some(outcome) => serde_json::to_string(&outcome)?,
					None => serde_json::json!({ "dropped": intent }).to_string(),
				};
				output.write_all(line.as_bytes()).await?;
				output.write_all(b"\n").await?;
				output.flush().await?;
			}
		}

		if !reading && pending.is_empty() {
			break;
		}
	}

	Ok(())
}

async fn execute_intent(engine: Arc<DashboardEngine>, intent: TransactionIntent) -> Result<()> {
	engine.login().await.context("Failed to log in")?;

	let runner = {
		let engine = engine.clone();
		tokio::spawn(async move { engine.run().await })
	};

	let ticket = engine.submit(intent).await?;
	let outcome = ticket.outcome().await?;

	engine.shutdown();
	runner.await.context("Engine task panicked")??;

	match outcome {
		Some(outcome) => {
			println!("{}", serde_json::to_string_pretty(&outcome)?);
			if !outcome.is_success() {
				bail!("{} transaction failed", outcome.intent.kind);
			}
			Ok(())
		}
		None => bail!("Intent dropped: wallet not logged in or malformed address"),
	}
}

/// Runs the address through the same intake checks the dashboard form uses.
async fn add_registry(engine: &DashboardEngine, address: &str) -> Result<()> {
	engine.login().await.context("Failed to log in")?;
	let registry = engine.registry();

	let mut intake = IntakeController::new(&registry.snapshot());
	intake.open_modal();
	intake.handle_input(address);

	let Some(request) = intake.submit_address(&registry.snapshot()) else {
		let message = intake
			.state()
			.invalid_address
			.clone()
			.unwrap_or_else(|| "Another registry is being added".to_string());
		bail!("{}", message);
	};

	let result = engine.add_registry(request).await;
	intake.observe(&registry.snapshot());

	if let Some(message) = &intake.state().invalid_address {
		bail!("{}", message);
	}
	let set = result.context("Failed to add registry")?;

	println!(
		"Added {} ({}) with token {}",
		set.name,
		set.address.to_checksum(),
		set.token_symbol
	);
	Ok(())
}

async fn remove_registry(engine: &DashboardEngine, address: &str) -> Result<()> {
	let address = Address::parse(address)?;
	let set = engine
		.registry()
		.remove_registry(address)
		.await
		.context("Failed to remove registry")?;

	println!("Removed {} ({})", set.name, set.address.to_checksum());
	Ok(())
}

fn list_registries(engine: &DashboardEngine) {
	let book = engine.registry().snapshot();

	if book.is_empty() {
		println!("No sets to show.");
	}
	for set in book.sets() {
		let balance = set
			.balance
			.map(|balance| balance.to_string())
			.unwrap_or_else(|| "-".to_string());
		println!(
			"{}  {}  {} {}  balance {}",
			set.address.to_checksum(),
			set.name,
			set.token_symbol,
			set.token_address.to_checksum(),
			balance
		);
	}
	for address in &book.failed_addresses {
		println!("{}  (not a TCR registry)", address.to_checksum());
	}
}

fn validate_config(config: &Config) -> Result<()> {
	info!("Configuration is valid");
	info!("Dashboard name: {}", config.dashboard.name);
	for (section, value) in [
		("account", &config.account),
		("delivery", &config.delivery),
		("storage", &config.storage),
	] {
		let kind = value
			.get("provider")
			.or_else(|| value.get("backend"))
			.and_then(|v| v.as_str())
			.unwrap_or("default");
		info!("  {}: {}", section, kind);
	}
	Ok(())
}

fn log_event(event: &DashboardEvent) {
	match event {
		DashboardEvent::Intent(IntentEvent::Dropped { intent, reason }) => {
			debug!(kind = %intent.kind, reason = %reason, "Intent dropped");
		}
		DashboardEvent::Intent(IntentEvent::Submitted { intent, tx_hash }) => {
			info!(kind = %intent.kind, tx_hash = %tx_hash.truncated(), "Transaction submitted");
		}
		DashboardEvent::Intent(IntentEvent::Completed(outcome)) => {
			info!(
				kind = %outcome.intent.kind,
				token = %outcome.intent.token_address,
				success = outcome.is_success(),
				"Intent completed"
			);
		}
		DashboardEvent::Registry(RegistryEvent::Requested { address }) => {
			info!(registry = %address, "Adding registry");
		}
		DashboardEvent::Registry(RegistryEvent::Added { address }) => {
			info!(registry = %address, "Registry added");
		}
		DashboardEvent::Registry(RegistryEvent::Failed { address, reason }) => {
			warn!(registry = %address, reason = %reason, "Registry rejected");
		}
		DashboardEvent::Registry(RegistryEvent::Refreshed { address }) => {
			debug!(registry = %address, "Registry balance refreshed");
		}
		DashboardEvent::Ui(UiEvent::CloseModal) => {
			debug!("Close modal requested");
		}
	}
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
		.context("Invalid log level")?;

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.try_init()
		.context("Failed to install tracing subscriber")?;

	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			warn!(error = %e, "Failed to listen for Ctrl+C");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(e) => {
				warn!(error = %e, "Failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
