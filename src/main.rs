use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{info, warn};

use zentype::{
    app::{App, AppOptions, Control},
    app_dirs::AppDirs,
    catalog::{Catalog, Category, Difficulty},
    logging,
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    settings::{CountAmount, FileSettingsStore, Mode, Settings, SettingsStore, TimeDuration},
};

const TICK_RATE_MS: u64 = 100;

/// type real code snippets in your terminal and see your speed, accuracy and most missed keys
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// session mode
    #[clap(short = 'm', long, value_enum)]
    mode: Option<Mode>,

    /// countdown for time mode, one of 15, 30, 60, 120 (seconds)
    #[clap(short = 't', long)]
    time: Option<TimeDuration>,

    /// word target for count mode, one of 10, 25, 50, 100
    #[clap(short = 'c', long)]
    count: Option<CountAmount>,

    /// keep punctuation and operators in the text
    #[clap(long, num_args = 0..=1, default_missing_value = "true")]
    punctuation: Option<bool>,

    /// keep numbers and sprinkle digits onto identifiers
    #[clap(long, num_args = 0..=1, default_missing_value = "true")]
    numbers: Option<bool>,

    /// snippet difficulty
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// snippet topic
    #[clap(long, value_enum)]
    category: Option<Category>,

    /// custom text to type instead of a snippet
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// settings file to use instead of the default location
    #[clap(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    /// Layer the flags given on the command line over stored settings
    fn apply(&self, settings: Settings) -> Settings {
        Settings {
            mode: self.mode.unwrap_or(settings.mode),
            time_duration: self.time.unwrap_or(settings.time_duration),
            count_amount: self.count.unwrap_or(settings.count_amount),
            allow_punctuation: self.punctuation.unwrap_or(settings.allow_punctuation),
            allow_numbers: self.numbers.unwrap_or(settings.allow_numbers),
            difficulty: self.difficulty.unwrap_or(settings.difficulty),
        }
    }

    fn settings_store(&self) -> FileSettingsStore {
        match &self.settings {
            Some(path) => FileSettingsStore::with_path(path),
            None => FileSettingsStore::new(),
        }
    }

    fn app_options(&self) -> AppOptions {
        AppOptions {
            category: self.category.unwrap_or_default(),
            prompt: self.prompt.clone(),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Some(path) = AppDirs::log_path() {
        // the app still runs without a log file
        if let Err(err) = logging::init(&path) {
            eprintln!("zentype: logging disabled: {err}");
        }
    }

    let store = cli.settings_store();
    let stored = store.load();
    let settings = cli.apply(stored);
    if settings != stored {
        if let Err(err) = store.save(&settings) {
            warn!(%err, "failed to save settings from the command line");
        }
    }
    info!(path = %store.path().display(), ?settings, "starting");

    let mut app = App::new(
        Catalog::builtin()?,
        Box::new(store),
        settings,
        cli.app_options(),
    )?;

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            AppEvent::Tick => app.on_tick(),
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if app.handle_key(key) == Control::Quit {
                    break;
                }
            }
        }
    }

    info!("quitting");
    Ok(())
}
