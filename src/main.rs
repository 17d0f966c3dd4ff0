use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use capybara::config::{ConfigEngine, Settings};
use capybara::interpreter::{self, Console, Interpreter};

mod editor;
mod input;
mod render;

use editor::{Editor, RunEvent};
use render::Renderer;

/// Editor and runner for Capybara scripts (.capybara)
#[derive(Parser, Debug)]
#[command(name = "capybara", version)]
struct Cli {
    /// Script to open (or run with --run)
    file: Option<PathBuf>,

    /// Run FILE in the terminal instead of opening the editor
    #[arg(long, requires = "file")]
    run: bool,

    /// Config script to load instead of the default init.rhai
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

enum Wake {
    Terminal(Event),
    Run(RunEvent),
    RunLost,
}

#[tokio::main]
async fn main() -> std::io::Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.run);

    let mut config = ConfigEngine::new();
    let loaded = match &cli.config {
        Some(path) => config.load_file(path),
        None => config.load_default(),
    };
    let config_error = loaded.err().map(|e| {
        warn!("{}", e);
        e.to_string()
    });
    let settings = config.settings();

    if cli.run {
        if let Some(e) = &config_error {
            eprintln!("warning: {}", e);
        }
        // `requires = "file"` guarantees the path
        let Some(path) = cli.file.as_deref() else {
            return Ok(ExitCode::FAILURE);
        };
        return Ok(run_headless(path, &settings));
    }

    run_editor(cli.file, settings, config_error).await?;
    Ok(ExitCode::SUCCESS)
}

/// Log to stderr when running headless, to a file next to the config otherwise
fn init_logging(headless: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("capybara=info"));

    if headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return;
    }

    let Some(dir) = ConfigEngine::config_dir() else {
        return;
    };
    let file = std::fs::create_dir_all(&dir).and_then(|_| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("capybara.log"))
    });
    if let Ok(file) = file {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
}

fn run_headless(path: &Path, settings: &Settings) -> ExitCode {
    let code = match interpreter::load(path) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let interpreter = match &settings.storage_dir {
        Some(dir) => Interpreter::with_storage_dir(Console, Console, dir),
        None => Interpreter::new(Console, Console),
    };

    info!(path = %path.display(), "running script");
    // Trailing newlines from the file are not part of the envelope
    match interpreter.and_then(|mut interpreter| interpreter.execute(code.trim())) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_editor(
    file: Option<PathBuf>,
    settings: Settings,
    startup_message: Option<String>,
) -> std::io::Result<()> {
    let mut editor = match file {
        Some(path) => Editor::open(path, settings),
        None => Editor::new(settings),
    };
    if let Some(msg) = startup_message {
        editor.set_message(msg);
    }

    // Set up terminal
    Renderer::setup()?;
    let mut renderer = Renderer::new()?;

    // Initial render
    editor.adjust_scroll(renderer.text_height(&editor));
    renderer.render(&editor)?;

    // Event stream for async key reading
    let mut event_stream = EventStream::new();

    // Main loop
    while editor.running {
        let wake = tokio::select! {
            Some(Ok(event)) = event_stream.next() => Wake::Terminal(event),
            event = next_run_event(&mut editor.run) => match event {
                Some(event) => Wake::Run(event),
                None => Wake::RunLost,
            },
            else => break,
        };

        match wake {
            Wake::Terminal(Event::Resize(width, height)) => renderer.resize(width, height),
            Wake::Terminal(event) => input::handle_event(&mut editor, event),
            Wake::Run(event) => editor.handle_run_event(event),
            Wake::RunLost => editor.handle_run_event(RunEvent::Finished(Err(
                "script worker stopped unexpectedly".to_string(),
            ))),
        }

        editor.adjust_scroll(renderer.text_height(&editor));
        renderer.render(&editor)?;
    }

    // Cleanup
    Renderer::teardown()?;

    Ok(())
}

/// Next event of the running script; never resolves when nothing runs
async fn next_run_event(run: &mut Option<mpsc::UnboundedReceiver<RunEvent>>) -> Option<RunEvent> {
    match run {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
