//! Standalone runner for the bridge. Builds a handler from a TOML config
//! file and drives it against the bundled in-memory SOME/IP and router
//! fakes — there is no concrete vsomeip/up-rust binding vendored with
//! this crate, so this binary doubles as a way to exercise the dispatch
//! engine end to end without one. Build with `--features test-utils`.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, subscriber::SetGlobalDefaultError};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use someip_uprotocol_bridge::config::BridgeConfig;
use someip_uprotocol_bridge::handler::SomeipHandler;
use someip_uprotocol_bridge::scheduler::ThreadScheduler;
use someip_uprotocol_bridge::testing::{FakeRouter, FakeSomeIpInterface, PassthroughTranslator};

#[derive(Debug, Parser)]
#[command(about = "Runs a SOME/IP <-> uProtocol bridge handler from a config file")]
struct Arguments {
	/// Path to a BridgeConfig TOML file.
	#[arg(long, short = 'c', env = "BRIDGE_CONFIG")]
	config: PathBuf,

	/// Marks the bridge's SOME/IP service as available immediately, as if
	/// a real stack had just discovered it.
	#[arg(long)]
	assume_available: bool,
}

fn main() -> process::ExitCode {
	if let Err(error) = setup_tracing() {
		eprintln!("failed to install tracing subscriber: {error}");
		return process::ExitCode::FAILURE;
	}

	let arguments = Arguments::parse();
	let config = match BridgeConfig::from_path(&arguments.config) {
		Ok(config) => config,
		Err(error) => {
			eprintln!("failed to load {}: {error}", arguments.config.display());
			return process::ExitCode::FAILURE;
		}
	};

	let someip = FakeSomeIpInterface::new();
	let router = FakeRouter::new();
	let translator = PassthroughTranslator::new();
	let scheduler = Arc::new(ThreadScheduler::default());

	let handler = SomeipHandler::new(&config, someip, router, translator, scheduler);
	info!(role = ?handler.role(), "bridge handler constructed");

	if arguments.assume_available {
		handler.on_availability(0, 0, true);
	}

	// No real transport is wired up to keep this running, so just give
	// the dispatch thread a moment to process whatever was queued above.
	std::thread::sleep(Duration::from_millis(100));
	handler.quit();

	process::ExitCode::SUCCESS
}

fn setup_tracing() -> Result<(), SetGlobalDefaultError> {
	let filter = EnvFilter::builder()
		.with_default_directive(LevelFilter::INFO.into())
		.with_env_var("SOMEIP_BRIDGE_LOG")
		.try_from_env();

	let subscriber = tracing_subscriber::fmt()
		.with_file(true)
		.with_target(false)
		.with_env_filter(filter.unwrap_or_default())
		.finish();

	tracing::subscriber::set_global_default(subscriber)
}
