mod cmd_hook;
mod cmd_report;
mod cmd_sessions;
mod cmd_status;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vigil", version, about = "Tool-call audit trail for coding agents")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Claude Code hook entrypoint (reads the hook payload from stdin)
    Hook,
    /// Show the active session and headline statistics
    Status,
    /// List captured sessions
    Sessions,
    /// Generate an HTML report for a session
    Report {
        /// Session ID (defaults to the active or most recent session)
        #[arg(long)]
        session: Option<String>,
        /// Output directory (defaults to the configured report dir)
        #[arg(long)]
        output: Option<String>,
    },
    /// Install vigil hooks into .claude/settings.local.json
    Install,
    /// Remove vigil hooks from .claude/settings.local.json
    Uninstall,
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    // Stdout is reserved for hook JSON; diagnostics go to stderr only
    let filter = EnvFilter::try_from_env("VIGIL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let project_dir = std::env::current_dir()?;

    match cli.cmd {
        Command::Hook => cmd_hook::execute(),
        Command::Status => cmd_status::execute(&project_dir),
        Command::Sessions => cmd_sessions::execute(&project_dir),
        Command::Report { session, output } => {
            cmd_report::execute(&project_dir, session.as_deref(), output.as_deref())
        }
        Command::Install => vigil_bridge::admin::install(&project_dir),
        Command::Uninstall => vigil_bridge::admin::uninstall(&project_dir),
    }
}
