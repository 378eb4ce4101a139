//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tcr-dashboard")]
#[command(about = "Token-curated registry dashboard", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
	/// Path to configuration file
	#[arg(short, long, env = "TCR_CONFIG", default_value = "config/local.toml")]
	pub config: PathBuf,

	/// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
	#[arg(short, long, env = "TCR_LOG_LEVEL")]
	pub log_level: Option<String>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Run the engine, reading one intent JSON object per line from stdin
	/// and printing one result line per intent, until input ends or the
	/// process is interrupted
	Run,

	/// Buy registry tokens, paying `amount` wei
	Buy {
		#[arg(long)]
		token: String,
		#[arg(long)]
		amount: String,
	},

	/// Sell `amount` registry tokens
	Sell {
		#[arg(long)]
		token: String,
		#[arg(long)]
		amount: String,
	},

	/// Allow a registry to spend tokens on the wallet's behalf
	Approve {
		#[arg(long)]
		token: String,
		#[arg(long)]
		registry: String,
		#[arg(long)]
		amount: String,
	},

	/// Add a registry to the dashboard
	AddRegistry {
		/// Registry contract address
		address: String,
	},

	/// Remove a registry from the dashboard
	RemoveRegistry {
		address: String,
	},

	/// List the registries on the dashboard
	List,

	/// Validate the configuration file
	Validate,
}
