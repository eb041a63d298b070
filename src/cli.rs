use {
    crate::{
        configs::{
            AppConfig,
            TrainMode,
        },
        logging::setup_logging,
        registry::Registry,
        util::{
            prepare_run_directory,
            read_config,
            write_config,
            RUN_CONFIG_FILE,
            RUN_SUMMARY_FILE,
        },
    },
    anyhow::Result,
    clap::{
        Parser,
        ValueEnum,
    },
    std::path::PathBuf,
    tracing::{
        warn,
        Level,
    },
};


#[derive(ValueEnum, Debug, Clone)]
pub enum Loglevel {
    Error, // put these only during active debugging and then downgrade later
    Warn,  // main events in the program
    Info,  // all the little details
    None,  // don't log anything
}
impl Loglevel {
    pub fn level(&self) -> Option<Level> {
        match self {
            Loglevel::Error => Some(Level::ERROR),
            Loglevel::Warn => Some(Level::WARN),
            Loglevel::Info => Some(Level::INFO),
            Loglevel::None => None,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// RON file to read the run configuration from.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Setup logging
    #[arg(long, value_enum, default_value_t=Loglevel::None)]
    pub log: Loglevel,

    /// File to write the log to.
    #[arg(long, default_value = "debug.log")]
    pub log_file: PathBuf,

    /// The game to run, overrides the config.
    #[arg(long)]
    pub game: Option<String>,

    /// The agent to train, overrides the config.
    #[arg(long)]
    pub agent: Option<String>,

    /// Train inline or on a background thread, overrides the config.
    #[arg(long, value_enum)]
    pub train_mode: Option<TrainMode>,

    /// The number of episodes, overrides the config.
    #[arg(long)]
    pub max_episodes: Option<usize>,

    /// Directory to write the config and the summary of the run to.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Write the default configuration to this file and exit.
    #[arg(long)]
    pub write_default_config: Option<PathBuf>,
}
impl Args {
    /// The configuration file (or the defaults) with the command line
    /// overrides applied.
    pub fn app_config(&self) -> Result<AppConfig> {
        let mut config: AppConfig = match &self.config {
            Some(path) => read_config(path)?,
            None => AppConfig::default(),
        };
        if let Some(game) = &self.game {
            config.game = game.clone();
        }
        if let Some(agent) = &self.agent {
            config.agent = agent.clone();
        }
        if let Some(train_mode) = self.train_mode {
            config.driver.train_mode = train_mode;
        }
        if let Some(max_episodes) = self.max_episodes {
            config.driver.max_episodes = max_episodes;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Set up logging, build the driver from the configuration and run it.
pub fn run(args: Args) -> Result<()> {
    if let Some(path) = &args.write_default_config {
        write_config(path, &AppConfig::default())?;
        println!("default configuration written to {}", path.display());
        return Ok(());
    }

    if let Some(level) = args.log.level() {
        setup_logging(&args.log_file, Some(level), Some(level))?;
    }

    let config = args.app_config()?;
    let run_directory = match &args.output {
        Some(output) => {
            let path = prepare_run_directory(output, &config.run_tag)?;
            write_config(&path.join(RUN_CONFIG_FILE), &config)?;
            Some(path)
        }
        None => None,
    };

    let mut driver = Registry::default().build_driver(&config)?;
    let summary = driver.run()?;

    if let Some(path) = run_directory {
        write_config(&path.join(RUN_SUMMARY_FILE), &summary)?;
        warn!("run data written to {}", path.display());
    }
    println!(
        "{} episodes in {} steps, scores: {:?}",
        summary.episodes, summary.global_steps, summary.scores,
    );
    Ok(())
}
