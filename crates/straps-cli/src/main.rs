//! `straps` command line

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use straps_artifact::DeclarationStore;
use straps_core::{
    load_store, run_session, ActionDispatcher, Message, ModelClient, OpenAiClient, StrapsConfig,
    Transcript, TRANSCRIPT_TARGET,
};
use straps_engine::{Generation, ModifyStrategy};
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing(verbose: u8, debug: bool) {
    let mut filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    if debug {
        if let Ok(directive) = format!("{TRANSCRIPT_TARGET}=debug").parse() {
            filter = filter.add_directive(directive);
        }
    }
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cli() -> Command {
    let source = || {
        Arg::new("source")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("Python file to work on")
    };

    Command::new("straps")
        .version(straps_core::VERSION)
        .about("Let a language model edit the functions of a Python file")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Increase verbosity (-v info, -vv debug, -vvv trace)"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print every transcript message sent to the model"),
        )
        .subcommand(
            Command::new("run")
                .about("Run a session and write the next generation of SOURCE")
                .arg(source())
                .arg(
                    Arg::new("goal")
                        .required(true)
                        .num_args(1..)
                        .help("What the model should achieve"),
                )
                .arg(
                    Arg::new("strategy")
                        .long("strategy")
                        .value_parser(["replace", "patch"])
                        .help("How 'modify' payloads are applied"),
                )
                .arg(Arg::new("model").long("model").help("Model identifier"))
                .arg(
                    Arg::new("max-turns")
                        .long("max-turns")
                        .value_parser(value_parser!(usize))
                        .help("Stop after this many model replies"),
                )
                .arg(
                    Arg::new("output-dir")
                        .long("output-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory for generations (default: next to SOURCE)"),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .value_parser(value_parser!(u64))
                        .help("Per-request timeout in seconds"),
                ),
        )
        .subcommand(
            Command::new("ask")
                .about("Send one prompt to the model and print the reply")
                .arg(Arg::new("prompt").required(true).num_args(1..)),
        )
        .subcommand(
            Command::new("list")
                .about("List the functions of SOURCE")
                .arg(source()),
        )
        .subcommand(
            Command::new("show")
                .about("Print the code of one function")
                .arg(source())
                .arg(Arg::new("name").required(true).help("Function name")),
        )
}

fn load_config(matches: &ArgMatches) -> Result<StrapsConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            let config = StrapsConfig::from_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?;
            tracing::info!(path = %path.display(), model = %config.model, "configuration loaded");
            Ok(config)
        }
        None => {
            tracing::debug!("no configuration file, using defaults");
            Ok(StrapsConfig::default())
        }
    }
}

fn apply_run_overrides(mut config: StrapsConfig, args: &ArgMatches) -> StrapsConfig {
    if let Some(strategy) = args.get_one::<String>("strategy") {
        config = config.with_strategy(match strategy.as_str() {
            "patch" => ModifyStrategy::Patch,
            _ => ModifyStrategy::Replace,
        });
    }
    if let Some(model) = args.get_one::<String>("model") {
        config = config.with_model(model);
    }
    if let Some(&max_turns) = args.get_one::<usize>("max-turns") {
        config = config.with_max_turns(max_turns);
    }
    if let Some(dir) = args.get_one::<PathBuf>("output-dir") {
        config = config.with_output_dir(dir);
    }
    if let Some(&secs) = args.get_one::<u64>("timeout") {
        config = config.with_timeout_secs(secs);
    }
    config
}

fn words(args: &ArgMatches, id: &str) -> String {
    args.get_many::<String>(id)
        .map(|values| values.map(String::as_str).collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

fn source_arg(args: &ArgMatches) -> Result<&Path> {
    args.get_one::<PathBuf>("source")
        .map(PathBuf::as_path)
        .context("missing SOURCE argument")
}

fn open(source: &Path) -> Result<DeclarationStore> {
    load_store(source).with_context(|| format!("loading {}", source.display()))
}

fn written(generation: &Generation) -> String {
    format!(
        "Wrote {} ({})",
        generation.path.display(),
        generation.fingerprint.short()
    )
}

async fn run(config: StrapsConfig, args: &ArgMatches) -> Result<()> {
    let config = apply_run_overrides(config, args);
    let source = source_arg(args)?;
    let goal = words(args, "goal");

    let client = OpenAiClient::from_config(&config)?;
    let outcome = run_session(source, &goal, client, &config).await?;

    println!("{}", outcome.report.end.message());
    println!("{}", written(&outcome.generation));
    Ok(())
}

async fn ask(config: StrapsConfig, args: &ArgMatches) -> Result<()> {
    let client = OpenAiClient::from_config(&config)?;
    let transcript: Transcript = std::iter::once(Message::user(words(args, "prompt"))).collect();

    let reply = client.query(&transcript, &config.query_params()).await?;
    println!("{}", reply.content());
    Ok(())
}

fn list(config: &StrapsConfig, args: &ArgMatches) -> Result<()> {
    let store = open(source_arg(args)?)?;
    println!("{}", ActionDispatcher::from_config(config).engine().list(&store));
    Ok(())
}

fn show(config: &StrapsConfig, args: &ArgMatches) -> Result<()> {
    let store = open(source_arg(args)?)?;
    let name = args
        .get_one::<String>("name")
        .context("missing NAME argument")?;
    let code = ActionDispatcher::from_config(config)
        .engine()
        .show(&store, name)?;
    println!("{code}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_count("verbose"), matches.get_flag("debug"));

    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("run", args)) => run(config, args).await,
        Some(("ask", args)) => ask(config, args).await,
        Some(("list", args)) => list(&config, args),
        Some(("show", args)) => show(&config, args),
        _ => anyhow::bail!("no subcommand given"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn run_flags_override_config() {
        let matches = cli()
            .try_get_matches_from([
                "straps",
                "run",
                "tool.py",
                "add",
                "a",
                "flag",
                "--strategy",
                "patch",
                "--max-turns",
                "12",
                "--timeout",
                "60",
                "--output-dir",
                "out",
            ])
            .unwrap();
        let Some(("run", args)) = matches.subcommand() else {
            panic!("expected run");
        };

        let config = apply_run_overrides(StrapsConfig::default(), args);
        assert_eq!(config.strategy, ModifyStrategy::Patch);
        assert_eq!(config.max_turns, Some(12));
        assert_eq!(config.request_timeout_secs, Some(60));
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
        assert_eq!(words(args, "goal"), "add a flag");
        assert_eq!(source_arg(args).unwrap(), Path::new("tool.py"));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let matches = cli()
            .try_get_matches_from(["straps", "list", "tool.py", "-vv", "--debug"])
            .unwrap();
        assert_eq!(matches.get_count("verbose"), 2);
        assert!(matches.get_flag("debug"));
    }

    #[test]
    fn config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("straps.toml");
        std::fs::write(&path, "model = \"local\"\nfuzz = 1\n").unwrap();

        let matches = cli()
            .try_get_matches_from(["straps", "list", "tool.py", "--config", path.to_str().unwrap()])
            .unwrap();
        let config = load_config(&matches).unwrap();
        assert_eq!(config.model, "local");
        assert_eq!(config.fuzz, 1);

        let matches = cli()
            .try_get_matches_from(["straps", "list", "tool.py", "--config", "missing.toml"])
            .unwrap();
        assert!(load_config(&matches).is_err());
    }

    #[test]
    fn written_line_carries_short_fingerprint() {
        let store = DeclarationStore::parse("def f():\n    return 1\n").unwrap();
        let generation = Generation {
            number: 2,
            path: PathBuf::from("out/tool__2.py"),
            fingerprint: store.fingerprint(),
        };
        let line = written(&generation);
        assert_eq!(
            line,
            format!("Wrote out/tool__2.py ({})", store.fingerprint().short())
        );
        assert!(store.fingerprint().to_string().starts_with(&store.fingerprint().short()));
    }

    #[test]
    fn show_requires_name() {
        assert!(cli()
            .try_get_matches_from(["straps", "show", "tool.py"])
            .is_err());
    }
}
