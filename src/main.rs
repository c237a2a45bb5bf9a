mod cli;
mod config;
mod core;
mod error;
mod logging;
mod tui;

use crate::cli::{Cli, Commands};
use crate::config::Settings;
use crate::core::{ChatSession, Services, VideoReference};
use crate::error::Result;
use crate::logging::LogTarget;
use crate::tui::{App, EventHandler, init as tui_init, restore as tui_restore, ui};
use clap::Parser;
use std::io::Write;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("Error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load_from(cli.config.as_deref())?;

    let target = match cli.command {
        Some(Commands::Tui) | None => LogTarget::File,
        _ => LogTarget::Stderr,
    };
    logging::init(&settings, cli.verbose, target)?;
    info!(provider = %settings.model.provider, model = settings.model.model_name(), "starting");

    let services = Services::from_settings(&settings)?;

    match cli.command {
        Some(Commands::Transcript { url }) => run_cli_transcript(&services, &url).await,
        Some(Commands::Outline { url }) => run_cli_outline(&services, &url).await,
        Some(Commands::Chat { url }) => run_cli_chat(&services, url).await,
        Some(Commands::Tui) | None => run_tui(services).await,
    }
}

async fn run_cli_transcript(services: &Services, url: &str) -> Result<()> {
    let transcript = services.resolver.resolve(url).await?;

    println!(
        "Video: {} (language: {}, {} words)",
        transcript.video_id,
        transcript.language_code,
        transcript.word_count()
    );
    println!();
    println!("{}", transcript.text);
    Ok(())
}

async fn run_cli_outline(services: &Services, url: &str) -> Result<()> {
    let transcript = services.resolver.resolve(url).await?;
    eprintln!("Generating outline ({} words)...", transcript.word_count());

    let mut session = ChatSession::new();
    let outline = services.start_session(&mut session, &transcript).await?;
    println!("{outline}");
    Ok(())
}

async fn analyze(services: &Services, session: &mut ChatSession, url: &str) -> Result<()> {
    let video = VideoReference::parse(url)?;
    println!("Fetching transcript for {}...", video.watch_url());
    let transcript = services.resolver.resolve_video(&video).await?;

    println!("Generating outline...");
    let outline = services.start_session(session, &transcript).await?;
    println!();
    println!("{outline}");
    println!();
    Ok(())
}

fn prompt(session: &ChatSession) -> Result<()> {
    if session.is_seeded() {
        print!("question> ");
    } else {
        print!("url> ");
    }
    std::io::stdout().flush()?;
    Ok(())
}

/// Line-based chat loop. Errors from a single step are reported and the
/// loop keeps going.
async fn run_cli_chat(services: &Services, url: Option<String>) -> Result<()> {
    let mut session = ChatSession::new();
    println!("Type a YouTube URL to start, then ask questions.");
    println!("Commands: 'reset' starts over, 'exit' quits.");

    if let Some(url) = url {
        if let Err(e) = analyze(services, &mut session, &url).await {
            eprintln!("Error: {}", e.user_message());
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&session)?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "exit" | "quit" => break,
            "reset" => {
                session.reset();
                println!("Session reset.");
                continue;
            }
            _ => {}
        }

        let step = if session.is_seeded() {
            session.ask(line).await.map(|answer| {
                println!();
                println!("{answer}");
                println!();
            })
        } else {
            analyze(services, &mut session, line).await
        };

        if let Err(e) = step {
            eprintln!("Error: {}", e.user_message());
        }
    }

    Ok(())
}

async fn run_tui(services: Services) -> Result<()> {
    let mut terminal = tui_init()?;

    let mut app = App::new(services);
    let event_handler = EventHandler::new();

    let result = tui_loop(&mut terminal, &mut app, &event_handler);

    tui_restore()?;
    result
}

fn tui_loop(terminal: &mut tui::Tui, app: &mut App, event_handler: &EventHandler) -> Result<()> {
    loop {
        terminal.draw(|f| {
            ui::draw(f, app);
        })?;

        let event = event_handler.next_event()?;
        app.handle_event(event)?;

        if app.should_quit {
            return Ok(());
        }
    }
}
