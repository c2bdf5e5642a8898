// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, bail};
use chatfold_app::{AccountId, FolderService, OrganizerConfig, OrganizerState};
use chatfold_db::Store;
use config::{BackendMode, Config};
use runtime::ServiceRuntime;
use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    match options.action {
        Action::Help => {
            print_help();
            return Ok(());
        }
        Action::PrintConfigPath => {
            println!("{}", options.config_path.display());
            return Ok(());
        }
        Action::PrintExampleConfig => {
            print!("{}", Config::example_config(&options.config_path));
            return Ok(());
        }
        Action::Run | Action::Check => {}
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `chatfold --print-example-config` for a template",
            options.config_path.display()
        )
    })?;
    logging::init(&config.log_file()?, config.log_level())?;

    let account = config.account();
    let organizer = config.organizer_config()?;
    let launch = Launch {
        account,
        organizer,
        check_only: options.action == Action::Check,
    };

    if options.demo {
        let store = Store::open_memory().context("open demo database")?;
        store.bootstrap()?;
        runtime::seed_demo(&store, account)?;
        return launch.start(store, "demo");
    }

    match config.backend_mode()? {
        BackendMode::Local => {
            let db_path = config.db_path()?;
            let store = Store::open(&db_path).with_context(|| {
                format!(
                    "open database {} -- if this path is wrong, set [backend].db_path or CHATFOLD_DB_PATH",
                    db_path.display()
                )
            })?;
            store.bootstrap()?;
            launch.start(store, "local")
        }
        BackendMode::Api => {
            let client = chatfold_api::Client::new(
                config.base_url(),
                config.token(),
                config.timeout()?,
            )
            .with_context(|| {
                format!(
                    "invalid [backend] config in {}; fix base_url/token/timeout values",
                    options.config_path.display()
                )
            })?;
            launch.start(client, "api")
        }
    }
}

struct Launch {
    account: AccountId,
    organizer: OrganizerConfig,
    check_only: bool,
}

impl Launch {
    fn start<S>(self, mut service: S, backend: &str) -> Result<()>
    where
        S: FolderService + Send + 'static,
    {
        tracing::info!(backend, account = self.account.get(), "chatfold starting");
        if self.check_only {
            let folders = service.list_folders(self.account).with_context(|| {
                format!(
                    "check {backend} backend for account {}",
                    self.account.get()
                )
            })?;
            tracing::info!(folders = folders.len(), "backend check passed");
            return Ok(());
        }

        let mut state = OrganizerState::new(self.account, self.organizer);
        let mut runtime = ServiceRuntime::new(service);
        chatfold_tui::run_app(&mut state, &mut runtime)
    }
}

/// What a single invocation does. Only one may be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Run,
    Check,
    Help,
    PrintConfigPath,
    PrintExampleConfig,
}

impl Action {
    const fn flag(self) -> &'static str {
        match self {
            Self::Run => "",
            Self::Check => "--check",
            Self::Help => "--help",
            Self::PrintConfigPath => "--print-config-path",
            Self::PrintExampleConfig => "--print-example-config",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    action: Action,
    demo: bool,
}

fn parse_cli_args<I, S>(args: I, config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path,
        action: Action::Run,
        demo: false,
    };

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let requested = match arg.as_ref() {
            "--config" => {
                let Some(path) = args.next() else {
                    bail!("--config needs a path, e.g. --config ~/.config/chatfold/config.toml");
                };
                options.config_path = PathBuf::from(path.as_ref());
                continue;
            }
            "--demo" => {
                options.demo = true;
                continue;
            }
            "--check" => Action::Check,
            "--help" | "-h" => Action::Help,
            "--print-config-path" => Action::PrintConfigPath,
            "--print-example-config" => Action::PrintExampleConfig,
            other => bail!("unrecognized option {other:?}; see `chatfold --help`"),
        };

        if options.action != Action::Run && options.action != requested {
            bail!(
                "{} and {} cannot be combined; pass one of them",
                options.action.flag(),
                requested.flag()
            );
        }
        options.action = requested;
    }

    Ok(options)
}

fn print_help() {
    println!("chatfold - organize chats into folders with the mouse");
    println!();
    println!("usage: chatfold [--config <path>] [--demo] [--check]");
    println!();
    println!("  --config <path>          read settings from <path>");
    println!("  --demo                   use generated chats and folders in memory");
    println!("  --check                  validate config and reach the backend, then exit");
    println!("  --print-config-path      show where the config is read from");
    println!("  --print-example-config   write a commented config to stdout");
    println!("  -h, --help               show this text");
}

#[cfg(test)]
mod tests {
    use super::{Action, CliOptions, parse_cli_args};
    use anyhow::Result;
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        parse_cli_args(args.iter().copied(), PathBuf::from("/etc/chatfold.toml"))
    }

    #[test]
    fn no_arguments_runs_with_resolved_config() -> Result<()> {
        assert_eq!(
            parse(&[])?,
            CliOptions {
                config_path: PathBuf::from("/etc/chatfold.toml"),
                action: Action::Run,
                demo: false,
            }
        );
        Ok(())
    }

    #[test]
    fn demo_combines_with_check_and_config() -> Result<()> {
        let options = parse(&["--demo", "--config", "/tmp/alt.toml", "--check"])?;
        assert!(options.demo);
        assert_eq!(options.action, Action::Check);
        assert_eq!(options.config_path, PathBuf::from("/tmp/alt.toml"));
        Ok(())
    }

    #[test]
    fn repeated_action_is_accepted() -> Result<()> {
        assert_eq!(parse(&["-h", "--help"])?.action, Action::Help);
        Ok(())
    }

    #[test]
    fn conflicting_actions_are_rejected() {
        let error = parse(&["--check", "--print-example-config"])
            .expect_err("two actions should fail");
        assert_eq!(
            error.to_string(),
            "--check and --print-example-config cannot be combined; pass one of them"
        );
    }

    #[test]
    fn config_without_path_is_rejected() {
        let error = parse(&["--config"]).expect_err("missing path should fail");
        assert!(error.to_string().starts_with("--config needs a path"));
    }

    #[test]
    fn unknown_option_points_at_help() {
        let error = parse(&["--verbose"]).expect_err("unknown option should fail");
        assert!(error.to_string().contains("chatfold --help"));
    }
}
