//! CLI for the LusoTown rate limiter.
//!
//! Lists the policy table and simulates bursts of calls against a policy,
//! optionally with community trust signals, printing each outcome and the
//! localized retry message for rejected calls.

use clap::{Parser, Subcommand};
use lusotown_ratelimit::{
    resolve_policy_table, Clock, CommunityContext, CommunityRateLimiter, CommunityStanding, Error,
    Language, ManualClock, MembershipLevel, MemoryStore, MessageRenderer, RateLimitResult,
    RateLimiter, SystemClock, Window,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// LusoTown rate limiter - inspect policies and simulate traffic.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file with policy overrides.
    #[arg(long, global = true, env = "LUSOTOWN_RATELIMIT_POLICIES")]
    policies_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the configured policies.
    Policies,

    /// Run a burst of calls against a named policy.
    Simulate(SimulateArgs),

    /// Parse a window such as `15m` and print its length in milliseconds.
    Window {
        /// Window string.
        window: String,
    },
}

#[derive(clap::Args, Debug)]
struct SimulateArgs {
    /// Policy name, e.g. `authentication`.
    #[arg(long)]
    policy: String,

    /// Identifier the calls are counted against.
    #[arg(long, default_value = "simulated-client")]
    identifier: String,

    /// Number of calls to make.
    #[arg(long, default_value_t = 10)]
    calls: u32,

    /// Simulated milliseconds between calls.
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,

    /// Treat the caller as verified.
    #[arg(long)]
    verified: bool,

    /// Membership tier (free, community, student, premium, ambassador).
    #[arg(long)]
    membership: Option<MembershipLevel>,

    /// Cultural engagement score (0-100).
    #[arg(long)]
    cultural_score: Option<u32>,

    /// Community standing (good, warning, suspended).
    #[arg(long)]
    standing: Option<CommunityStanding>,

    /// Language for retry messages (en, pt).
    #[arg(long, default_value = "en")]
    lang: Language,

    /// Print each result as a JSON line.
    #[arg(long)]
    json: bool,
}

impl SimulateArgs {
    fn context(&self) -> CommunityContext {
        CommunityContext {
            is_verified: self.verified,
            membership_level: self.membership,
            cultural_score: self.cultural_score,
            community_standing: self.standing,
        }
    }
}

/// Tally of a simulation run.
#[derive(Debug, Default)]
struct SimulationSummary {
    admitted: u32,
    rejected: u32,
    limit: u32,
}

impl SimulationSummary {
    fn record_result(&mut self, result: &RateLimitResult) {
        self.limit = result.limit;
        if result.success {
            self.admitted += 1;
        } else {
            self.rejected += 1;
        }
    }
}

fn main() -> ExitCode {
    // Initialize tracing
    init_tracing();

    // Parse arguments
    let args = Args::parse();

    // Run the main logic
    match run(args) {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            error!(error = %e, "Critical failure");
            ExitCode::from(2)
        }
    }
}

/// Initializes tracing with compact output, filtered by `RUST_LOG`
/// (defaults to "info").
fn init_tracing() {
    tracing_subscriber::registry()
        // Compact formatting without module target paths
        .with(fmt::layer().compact().with_target(false))
        // Allow runtime log filtering via RUST_LOG (e.g., RUST_LOG=lusotown_ratelimit=debug)
        // Falls back to "info" level if RUST_LOG is not set or invalid
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        // Register as the global default subscriber
        .init();
}

/// Main execution logic.
fn run(args: Args) -> Result<(), Error> {
    match args.command {
        Command::Policies => {
            let table = resolve_policy_table(args.policies_path.as_deref())?;
            println!("{:<20} {:>8}  {:<6} message", "policy", "requests", "window");
            for (name, policy) in table.iter() {
                println!(
                    "{:<20} {:>8}  {:<6} {}",
                    name,
                    policy.requests,
                    policy.window,
                    policy.message.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
        Command::Window { window } => {
            let parsed = Window::parse(&window)?;
            println!("{window} = {} ms", parsed.as_millis());
            Ok(())
        }
        Command::Simulate(sim) => {
            // Load policies (file overrides layered over built-ins)
            let table = resolve_policy_table(args.policies_path.as_deref())?;
            let policy = table.require(&sim.policy)?;
            let context = sim.context();
            let renderer = MessageRenderer::new()?;

            // Simulated time starts now and only moves between calls
            let clock = ManualClock::new(SystemClock.now_ms());
            let limiter = CommunityRateLimiter::from_limiter(RateLimiter::with_store_and_clock(
                MemoryStore::new(),
                clock.clone(),
            ));

            let mut summary = SimulationSummary::default();
            for call in 1..=sim.calls {
                let result =
                    limiter.limit_with_community_context(&sim.identifier, policy, &context)?;
                summary.record_result(&result);
                print_result(call, &result, &sim, &renderer, clock.now_ms())?;
                clock.advance(sim.interval_ms);
            }

            print_summary(&sim, &summary);
            Ok(())
        }
    }
}

/// Prints one call's outcome.
fn print_result(
    call: u32,
    result: &RateLimitResult,
    sim: &SimulateArgs,
    renderer: &MessageRenderer,
    now_ms: u64,
) -> Result<(), Error> {
    if sim.json {
        match serde_json::to_string(result) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "Failed to serialize result"),
        }
        return Ok(());
    }

    if result.success {
        println!(
            "  #{call:<4} allowed  remaining {}/{}",
            result.remaining, result.limit
        );
    } else {
        let retry = renderer.render_at(result, sim.lang, now_ms)?;
        println!("  #{call:<4} rejected {retry}");
    }
    Ok(())
}

/// Prints the final simulation summary.
fn print_summary(sim: &SimulateArgs, summary: &SimulationSummary) {
    println!("\nSummary:");
    println!("  Policy: {}", sim.policy);
    println!("  Identifier: {}", sim.identifier);
    println!("  Effective limit: {}", summary.limit);
    println!("  Calls admitted: {}", summary.admitted);
    println!("  Calls rejected: {}", summary.rejected);
}
