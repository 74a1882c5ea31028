use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use fitquest::combat::types::ExerciseKind;
use fitquest::core::clock::SystemClock;
use fitquest::core::config::AppConfig;
use fitquest::core::constants::{INPUT_POLL_MS, TICK_INTERVAL_MS};
use fitquest::core::game::Game;
use fitquest::defense_mode::authority::{AuthorityWorker, HttpAuthority};
use fitquest::defense_mode::types::Difficulty;
use fitquest::protocol::EventSource;
use fitquest::ui::draw_ui;
use fitquest::utils::logging::init_file_logger;
use fitquest::utils::replay::ReplaySource;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct CliArgs {
    connect: Option<String>,
    replay: Option<PathBuf>,
    api: Option<String>,
    exercise: Option<String>,
    difficulty: Option<Difficulty>,
}

fn print_help() {
    println!("FitQuest - pose-tracked monster battle\n");
    println!("Usage: fitquest [options]\n");
    println!("Options:");
    println!("  --connect <url>      Pose backend WebSocket URL (needs the web feature)");
    println!("  --replay <file>      Play a recorded session instead of a live backend");
    println!("  --api <url>          Continuous defense session server");
    println!("  --exercise <name>    Starting exercise (e.g. squat, push-up)");
    println!("  --difficulty <name>  easy, normal, hard or nightmare");
    println!("  --version            Show version information");
    println!("  --help               Show this help message");
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    eprintln!("Run 'fitquest --help' for usage.");
    std::process::exit(1);
}

fn parse_args() -> CliArgs {
    let mut parsed = CliArgs::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .unwrap_or_else(|| fail(&format!("{} needs a value", name)))
        };
        match arg.as_str() {
            "--connect" => parsed.connect = Some(value("--connect")),
            "--replay" => parsed.replay = Some(PathBuf::from(value("--replay"))),
            "--api" => parsed.api = Some(value("--api")),
            "--exercise" => parsed.exercise = Some(value("--exercise")),
            "--difficulty" => {
                let name = value("--difficulty");
                let difficulty = Difficulty::ALL
                    .into_iter()
                    .find(|d| d.name() == name.to_ascii_lowercase())
                    .unwrap_or_else(|| fail(&format!("Unknown difficulty: {}", name)));
                parsed.difficulty = Some(difficulty);
            }
            "--version" | "-v" => {
                println!("fitquest {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => fail(&format!("Unknown option: {}", other)),
        }
    }
    parsed
}

#[cfg(feature = "web")]
fn live_source(url: &str) -> io::Result<Box<dyn EventSource>> {
    Ok(Box::new(fitquest::web::PoseLink::connect(url)?))
}

#[cfg(not(feature = "web"))]
fn live_source(url: &str) -> io::Result<Box<dyn EventSource>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!(
            "cannot connect to {}: built without the web feature (use --replay)",
            url
        ),
    ))
}

fn main() -> io::Result<()> {
    let args = parse_args();

    if let Err(e) = init_file_logger() {
        eprintln!("Warning: file logging disabled: {}", e);
    }

    let mut config = AppConfig::load();
    // Write back so the file lists every field, before CLI overrides apply.
    if let Err(e) = config.save() {
        log::warn!("could not write config: {}", e);
    }
    if let Some(exercise) = &args.exercise {
        config.default_exercise = ExerciseKind::from_label(exercise).label().to_string();
    }
    if let Some(difficulty) = args.difficulty {
        config.difficulty = difficulty;
    }
    if args.api.is_some() {
        config.authority_url = args.api.clone();
    }
    if let Some(url) = &args.connect {
        config.backend_url = url.clone();
    }

    let source: Box<dyn EventSource> = match &args.replay {
        Some(path) => Box::new(ReplaySource::load(path)?),
        None => match live_source(&config.backend_url) {
            Ok(source) => source,
            Err(e) => fail(&e.to_string()),
        },
    };
    let authority = config
        .authority_url
        .as_deref()
        .map(|url| AuthorityWorker::spawn(HttpAuthority::new(url)));
    log::info!(
        "starting with backend {} and authority {:?}",
        source.describe(),
        config.authority_url
    );

    let mut game = Game::new(config, source, authority, SystemClock::new());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut game);
    game.shutdown();

    // Cleanup terminal
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;

    if let Err(e) = &result {
        log::error!("main loop failed: {}", e);
    }
    println!("Goodbye!");
    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    game: &mut Game<SystemClock>,
) -> io::Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| draw_ui(frame, game))?;

        // Poll for input (50ms non-blocking)
        if event::poll(Duration::from_millis(INPUT_POLL_MS))? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press {
                    match key_event.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => break,
                        KeyCode::Char('s') | KeyCode::Char('S') => game.toggle_detection(),
                        KeyCode::Char('r') | KeyCode::Char('R') => game.reset(),
                        KeyCode::Char('e') | KeyCode::Char('E') => game.cycle_exercise(),
                        KeyCode::Char('c') | KeyCode::Char('C') => game.cycle_difficulty(),
                        KeyCode::Char('n') | KeyCode::Char('N') => game.advance_level(),
                        KeyCode::Char('d') | KeyCode::Char('D') => game.toggle_screen(),
                        _ => {}
                    }
                }
            }
        }

        // Game tick every 100ms
        if last_tick.elapsed() >= Duration::from_millis(TICK_INTERVAL_MS) {
            game.tick();
            last_tick = Instant::now();
        }
    }
    Ok(())
}
