use clap::Parser;
use stubledger::cli::{Cli, Commands, Verbosity};
use stubledger::config::Config;
use stubledger::ui::formatter::Formatter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing(verbosity: Verbosity) {
    let log_level = verbosity.to_log_level();
    let fallback_filter = format!("stubledger={}", log_level);

    let use_json = std::env::var("STUBLEDGER_LOG_JSON").is_ok();

    if use_json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true);

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| fallback_filter.clone().into()),
            )
            .with(json_layer)
            .init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true);

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| fallback_filter.into()),
            )
            .with(fmt_layer)
            .init();
    }
}

/// Command-line flags win; otherwise the config file's level applies.
fn resolve_verbosity(cli: &Cli, config: &Config) -> Verbosity {
    if cli.quiet || cli.verbose > 0 {
        return cli.verbosity();
    }
    match config.output.verbosity {
        Some(0) => Verbosity::Quiet,
        Some(level) => Verbosity::from_level(level - 1),
        None => Verbosity::Normal,
    }
}

fn main() -> miette::Result<()> {
    Formatter::configure_colors_from_env();

    let cli = Cli::parse();
    if cli.no_color {
        Formatter::configure_colors(false);
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!(
                "{}",
                Formatter::warning(format!("Warning: {}. Using defaults.", err))
            );
            Config::default()
        }
    };

    initialize_tracing(resolve_verbosity(&cli, &config));

    let result = match cli.command {
        Commands::Run(mut args) => {
            args.merge_config(&config);
            stubledger::cli::commands::run(args, &config)
        }
        Commands::Check(args) => stubledger::cli::commands::check(args, &config),
    };

    if let Err(err) = result {
        eprintln!("{}", Formatter::error(format!("Error: {err}")));
        return Err(err);
    }
    Ok(())
}
