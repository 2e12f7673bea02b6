use std::{
    fs::File,
    io::{self, BufRead, Write},
    process::ExitCode,
};

use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use whatnext_core::{
    gateway::Fixture, Config, ConfigError, CoreError, GatewayError, MemoryGateway, RandomPicker,
    Session,
};

mod command;
mod shell;

use command::Command;
use shell::{execute, Flow};

const SAMPLE_CATALOG: &str = include_str!("../sample.json");

#[derive(Error, Debug)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Unable to read the seed file: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed seed file: {0}")]
    Fixture(#[from] serde_json::Error),
    #[error("Inconsistent seed data: {0}")]
    Store(#[from] GatewayError),
    #[error(transparent)]
    Core(#[from] CoreError),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();

    info!("starting");
    let mut session = match start().await {
        Ok(session) => session,
        Err(err) => {
            error!(%err, "failed to start");
            return ExitCode::FAILURE;
        }
    };

    match repl(&mut session).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "input failed");
            ExitCode::FAILURE
        }
    }
}

async fn start() -> Result<Session<MemoryGateway>, StartupError> {
    let config = Config::load()?;
    info!(hide_policy = %config.hide_policy, seeded = config.pick_seed.is_some(), "loaded config");

    let fixture = match &config.seed_file {
        Some(path) => {
            info!(path = %path.display(), "loading seed file");
            Fixture::from_json(File::open(path)?)?
        }
        None => Fixture::from_json(SAMPLE_CATALOG.as_bytes())?,
    };
    let gateway = MemoryGateway::from_fixture(fixture)?;
    let picker = config.pick_seed.map_or_else(RandomPicker::from_entropy, RandomPicker::seeded);

    let mut session = Session::new(gateway, config.hide_policy, picker);
    match config.user {
        Some(user) => {
            session.gateway().sign_in(user);
            session.log_in().await?;
        }
        None => session.refresh().await?,
    }
    Ok(session)
}

async fn repl(session: &mut Session<MemoryGateway>) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    writeln!(stdout, "Type `pick` for the next activity, or `help`.")?;
    loop {
        write!(stdout, "{}> ", session.viewer())?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                writeln!(stdout, "{err}")?;
                continue;
            }
        };
        match execute(session, command).await {
            Ok((_, Flow::Quit)) => return Ok(()),
            Ok((output, Flow::Continue)) => writeln!(stdout, "{output}")?,
            Err(err) => {
                warn!(%err, "command failed");
                writeln!(stdout, "{}", err.user_message())?;
            }
        }
    }
}
