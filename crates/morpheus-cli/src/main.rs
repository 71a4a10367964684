//! Morpheus CLI binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use morpheus_cli::cli::{Cli, Commands};
use morpheus_cli::commands::{
    ArchivesCommand, AuthCommand, CloudsCommand, GroupsCommand, InstancesCommand, PingCommand,
    RemoteCommand,
};
use morpheus_cli::{CliError, ConfigDir, Context, EnvOverrides, OutputFormat, Prompter};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.global.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Aborted) => {
            eprintln!("Aborted.");
            ExitCode::from(CliError::Aborted.exit_code())
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let format = OutputFormat::new(cli.global.json, cli.global.quiet);
    let prompter = Prompter::new(cli.global.yes);
    let config = ConfigDir::discover()?;
    let mut stdout = io::stdout().lock();
    let resolve = |config| Context::resolve(&cli.global, config, &EnvOverrides::from_env());

    match cli.command {
        // Registry commands never need a resolved remote.
        Commands::Remote { command } => {
            let cmd = RemoteCommand::new(&config, prompter, cli.global.insecure);
            cmd.execute(&mut stdout, &format, &command)
        }
        Commands::Login(args) => {
            let ctx = resolve(config)?;
            let cmd = AuthCommand::new(&ctx, prompter);
            cmd.login(&mut stdout, &format, &args).await
        }
        Commands::Logout => {
            let ctx = resolve(config)?;
            AuthCommand::new(&ctx, prompter).logout(&mut stdout, &format)
        }
        Commands::Whoami => {
            let ctx = resolve(config)?;
            let cmd = AuthCommand::new(&ctx, prompter);
            cmd.whoami(&mut stdout, &format).await
        }
        Commands::Ping => {
            let ctx = resolve(config)?;
            PingCommand::new(&ctx).execute(&mut stdout, &format).await
        }
        Commands::Groups { command } => {
            let ctx = resolve(config)?;
            let cmd = GroupsCommand::new(&ctx, prompter);
            cmd.execute(&mut stdout, &format, &command).await
        }
        Commands::Clouds { command } => {
            let ctx = resolve(config)?;
            let cmd = CloudsCommand::new(&ctx, prompter);
            cmd.execute(&mut stdout, &format, &command).await
        }
        Commands::Instances { command } => {
            let ctx = resolve(config)?;
            let cmd = InstancesCommand::new(&ctx, prompter);
            cmd.execute(&mut stdout, &format, &command).await
        }
        Commands::Archives { command } => {
            let ctx = resolve(config)?;
            let cmd = ArchivesCommand::new(&ctx);
            cmd.execute(&mut stdout, &format, &command).await
        }
    }
}
