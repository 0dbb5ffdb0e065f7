mod ui;

use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use booktype::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    corpus::{CorpusLibrary, CorpusSource, DirCorpusSource, HttpCorpusSource, SessionPreloader},
    drill::Drill,
    practice::{PracticeStart, PracticeStarter},
    runtime::{CrosstermEventSource, DrillEvent, FixedTicker, Runner},
    session::SessionSummary,
};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{info, level_filters::LevelFilter, warn};

const TICK_RATE_MS: u64 = 100;

/// endless typing practice over a streamed corpus of books
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// base url serving /corpus/index.json and the books
    #[clap(short = 'u', long)]
    corpus_url: Option<String>,

    /// local directory containing corpus/index.json (overrides the url)
    #[clap(short = 'd', long)]
    corpus_dir: Option<PathBuf>,

    /// characters prepared when a session starts
    #[clap(short = 'c', long)]
    initial_chars: Option<usize>,

    /// number of seconds to run a session
    #[clap(short = 's', long)]
    number_of_secs: Option<u64>,

    /// write debug logs
    #[clap(short = 'v', long)]
    verbose: bool,

    /// persist the given options as the new defaults
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(url) = &self.corpus_url {
            config.corpus_url = Some(url.clone());
            config.corpus_dir = None;
        }
        if let Some(dir) = &self.corpus_dir {
            config.corpus_dir = Some(dir.clone());
        }
        if let Some(chars) = self.initial_chars {
            config.initial_chars = chars;
        }
        if self.number_of_secs.is_some() {
            config.number_of_secs = self.number_of_secs;
        }
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Typing,
    Results,
}

pub struct App {
    drill: Drill,
    state: AppState,
    summary: Option<SessionSummary>,
    /// Why the corpus was skipped for the current session.
    notice: Option<String>,
    clock: Instant,
}

impl App {
    fn new(start: PracticeStart, config: &Config) -> Self {
        let notice = start.fallback_reason.as_ref().map(|e| e.to_string());
        Self {
            drill: Drill::new(start, config.drill_settings()),
            state: AppState::Typing,
            summary: None,
            notice,
            clock: Instant::now(),
        }
    }

    /// Milliseconds on this session's clock.
    fn now_ms(&self) -> u64 {
        self.clock.elapsed().as_millis() as u64
    }

    fn finish(&mut self) {
        let now = self.now_ms();
        self.summary = Some(self.drill.finish(now));
        self.state = AppState::Results;
    }
}

fn init_logging(verbose: bool) -> Result<(), Box<dyn Error>> {
    let Some(path) = AppDirs::log_path() else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .init();
    Ok(())
}

fn corpus_source(config: &Config) -> Result<Arc<dyn CorpusSource>, Box<dyn Error>> {
    let source: Arc<dyn CorpusSource> = match (&config.corpus_dir, &config.corpus_url) {
        (Some(dir), _) => Arc::new(DirCorpusSource::new(dir)),
        (None, Some(url)) => Arc::new(HttpCorpusSource::new(url)?),
        // serve from the current directory as a web root
        (None, None) => Arc::new(DirCorpusSource::new(".")),
    };
    Ok(source)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging(cli.verbose)?;

    let store = FileConfigStore::new();
    let config = cli.apply(store.load());
    if cli.save_config {
        store.save(&config)?;
        info!("saved config to {}", store.path().display());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let library = Arc::new(CorpusLibrary::new(corpus_source(&config)?));
    let starter = PracticeStarter::new(SessionPreloader::new(library));
    {
        let _guard = runtime.enter();
        starter.warm(config.session_options());
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &runtime, &starter, &config);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_session(
    runtime: &tokio::runtime::Runtime,
    starter: &PracticeStarter,
    config: &Config,
) -> App {
    let options = config.session_options();
    loop {
        if let Some(start) = runtime.block_on(starter.start(&options)) {
            return App::new(start, config);
        }
        warn!("session start superseded, retrying");
    }
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    runtime: &tokio::runtime::Runtime,
    starter: &PracticeStarter,
    config: &Config,
) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let mut app = start_session(runtime, starter, config);

    loop {
        terminal.draw(|f| f.render_widget(&app, f.area()))?;

        match runner.step() {
            DrillEvent::Tick => {
                if app.state == AppState::Typing {
                    let now = app.now_ms();
                    app.drill.on_tick(now);
                    if app.drill.has_finished() {
                        app.finish();
                    }
                }
            }
            DrillEvent::Resize => {}
            DrillEvent::Key(key) => {
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
                {
                    break;
                }

                match (app.state, key.code) {
                    (AppState::Typing, KeyCode::Esc) => app.finish(),
                    (AppState::Typing, KeyCode::Backspace) => app.drill.backspace(),
                    (AppState::Typing, KeyCode::Char(c)) => {
                        let now = app.now_ms();
                        app.drill.write(c, now);
                    }
                    (AppState::Results, KeyCode::Esc | KeyCode::Char('q')) => break,
                    (AppState::Results, KeyCode::Char('n') | KeyCode::Enter) => {
                        app = start_session(runtime, starter, config);
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(())
}
