use std::io::{self, BufRead, IsTerminal, Read};
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::Parser;
use tubeme::editor::{PointerEvent, Viewport};
use tubeme::state::{FontFamily, QUICK_COLORS};
use tubeme::{FileKeyStorage, GenerationImpl, Session, SessionError};

#[derive(Parser, Debug)]
#[command(
    name = "tubeme",
    version,
    about = "Generate YouTube titles and compose 1280x720 thumbnails"
)]
struct Cli {
    /// Video topic for one-shot title generation (default: stdin)
    #[arg(short = 't', long = "topic")]
    topic: Option<String>,

    /// Gemini API key (overrides the saved key and GEMINI_API_KEY)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Use a running tubeme server instead of calling the services directly
    #[arg(long = "api-base")]
    api_base: Option<String>,

    /// Run the HTTP API server
    #[arg(short = 's', long = "server")]
    server: bool,

    /// Server listen address (default: [server] addr from settings)
    #[arg(short = 'a', long = "addr")]
    addr: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,

    /// Interactive thumbnail editor
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,
}

impl Cli {
    fn config(&self) -> tubeme::Config {
        tubeme::Config {
            key: self.key.clone(),
            api_base: self.api_base.clone(),
            settings_path: self.read_settings.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tubeme::logging::init(cli.verbose, cli.server)?;
    if cli.server {
        let settings = tubeme::settings::load_settings(cli.read_settings.as_deref().map(Path::new))?;
        let addr = cli.addr.clone().unwrap_or_else(|| settings.server_addr.clone());
        return tubeme::server::run_server(settings, addr).await;
    }
    if cli.interactive {
        return run_interactive(cli).await;
    }

    let input = match cli.topic.clone() {
        Some(topic) => Some(topic),
        None if io::stdin().is_terminal() => None,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
    };
    let output = tubeme::run(cli.config(), input).await?;
    println!("{}", output);
    Ok(())
}

struct InteractiveState {
    session: Session<FileKeyStorage, GenerationImpl>,
    preview_path: PathBuf,
}

impl InteractiveState {
    fn write_preview(&self) {
        match self.session.write_preview(&self.preview_path) {
            Ok(()) => println!("preview: {}", self.preview_path.display()),
            Err(err) => eprintln!("error: {:#}", err),
        }
    }
}

async fn run_interactive(cli: Cli) -> Result<()> {
    use std::io::Write;

    let (session, preview_path) = tubeme::open_session(&cli.config()).await?;
    let mut state = InteractiveState {
        session,
        preview_path,
    };
    println!("Interactive mode. Use /quit or /exit to finish.");
    println!("Type /help to see available commands. Plain text generates titles for that topic.");
    if !state.session.state().api_keys.is_complete() {
        println!("Configure your API keys to get started: /keys <gemini> <together>");
    }
    state.write_preview();

    let mut line = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();
    loop {
        line.clear();
        print!("> ");
        io::stdout().flush()?;
        if stdin_lock.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.starts_with('/') {
            match handle_interactive_command(input, &mut state).await {
                Ok(true) => break,
                Ok(false) => {}
                Err(err) => eprintln!("error: {}", err),
            }
            continue;
        }
        report(state.session.generate_titles(input).await);
        print_titles(&state.session);
    }
    Ok(())
}

/// Returns `Ok(true)` when the session should end.
async fn handle_interactive_command(input: &str, state: &mut InteractiveState) -> Result<bool> {
    let trimmed = input.trim();
    let (command, arg) = trimmed
        .split_once(char::is_whitespace)
        .map(|(command, arg)| (command, arg.trim()))
        .unwrap_or((trimmed, ""));
    let session = &mut state.session;

    match command {
        "/quit" | "/exit" => return Ok(true),
        "/help" => print_interactive_help(),
        "/keys" => {
            let mut parts = arg.split_whitespace();
            let gemini = parts.next().unwrap_or_default();
            let together = parts.next().unwrap_or_default();
            report(session.save_api_keys(gemini, together));
        }
        "/topic" => {
            report(session.generate_titles(arg).await);
            print_titles(session);
        }
        "/titles" => print_titles(session),
        "/select" => {
            let index = arg
                .parse::<usize>()
                .map_err(|_| anyhow!("expected a title number"))?;
            report(session.select_title(index));
        }
        "/upload" => {
            if arg.is_empty() {
                return Err(anyhow!("expected an image path"));
            }
            if report(session.upload_image(Path::new(arg)).await) {
                state.write_preview();
            }
        }
        "/image" => {
            println!("Generating...");
            if report(session.generate_image().await) {
                state.write_preview();
            }
        }
        "/text" => {
            if report_change(session.set_text(arg).await) {
                state.write_preview();
            }
        }
        "/font" => {
            if arg.is_empty() {
                let current = session.state().overlay().font_family;
                for family in FontFamily::ALL {
                    let marker = if family == current { "*" } else { " " };
                    println!("{} {}", marker, family);
                }
            } else if report_change(session.set_font_family(arg).await) {
                state.write_preview();
            }
        }
        "/size" => {
            let size = arg
                .parse::<u32>()
                .map_err(|_| anyhow!("expected a font size"))?;
            if report_change(session.set_font_size(size).await) {
                state.write_preview();
            }
        }
        "/color" => {
            if arg.is_empty() {
                for (idx, color) in QUICK_COLORS.iter().enumerate() {
                    println!("{:>2}. {}", idx + 1, color);
                }
                println!("current: {}", session.state().overlay().color);
                return Ok(false);
            }
            let value = match arg.parse::<usize>() {
                Ok(index) => QUICK_COLORS
                    .get(index.wrapping_sub(1))
                    .copied()
                    .ok_or_else(|| anyhow!("expected 1-{} or a hex value", QUICK_COLORS.len()))?,
                Err(_) => arg,
            };
            if report_change(session.set_color(value).await) {
                state.write_preview();
            }
        }
        "/view" => {
            let values = parse_numbers(arg, 4)?;
            report_change(session.set_viewport(Viewport {
                left: values[0],
                top: values[1],
                width: values[2],
                height: values[3],
            }));
        }
        "/down" | "/move" => {
            let values = parse_numbers(arg, 2)?;
            let (x, y) = (values[0], values[1]);
            let event = if command == "/down" {
                PointerEvent::Down { x, y }
            } else {
                PointerEvent::Move { x, y }
            };
            if report_pointer(session.pointer(event).await) {
                state.write_preview();
            }
        }
        "/up" | "/leave" => {
            let event = if command == "/up" {
                PointerEvent::Up
            } else {
                PointerEvent::Leave
            };
            report_pointer(session.pointer(event).await);
        }
        "/drag" => {
            let values = parse_numbers(arg, 4)?;
            let mut changed = report_pointer(
                session
                    .pointer(PointerEvent::Down {
                        x: values[0],
                        y: values[1],
                    })
                    .await,
            );
            changed |= report_pointer(
                session
                    .pointer(PointerEvent::Move {
                        x: values[2],
                        y: values[3],
                    })
                    .await,
            );
            report_pointer(session.pointer(PointerEvent::Up).await);
            if changed {
                let overlay = session.state().overlay();
                println!("text at ({:.1}, {:.1})", overlay.x, overlay.y);
                state.write_preview();
            }
        }
        "/state" => print_state(session)?,
        "/download" => {
            let dir = if arg.is_empty() {
                std::env::current_dir()?
            } else {
                PathBuf::from(arg)
            };
            match session.download(&dir) {
                Ok((notice, path)) => println!("{} ({})", notice, path.display()),
                Err(err) => eprintln!("error: {}", err),
            }
        }
        "/preview" => {
            if !arg.is_empty() {
                state.preview_path = PathBuf::from(arg);
            }
            state.write_preview();
        }
        _ => eprintln!("unknown command: {}", trimmed),
    }
    Ok(false)
}

fn report(result: Result<tubeme::Notice, SessionError>) -> bool {
    match result {
        Ok(notice) => {
            println!("{}", notice);
            true
        }
        Err(err) => {
            eprintln!("error: {}", err);
            false
        }
    }
}

fn report_change(result: Result<(), SessionError>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            eprintln!("error: {}", err);
            false
        }
    }
}

fn report_pointer(result: Result<bool, SessionError>) -> bool {
    match result {
        Ok(changed) => changed,
        Err(err) => {
            eprintln!("error: {}", err);
            false
        }
    }
}

fn parse_numbers(arg: &str, count: usize) -> Result<Vec<f32>> {
    let values = arg
        .split_whitespace()
        .map(|value| value.parse::<f32>().ok().filter(|number| number.is_finite()))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| anyhow!("expected {} numbers", count))?;
    if values.len() != count {
        return Err(anyhow!("expected {} numbers", count));
    }
    Ok(values)
}

fn print_titles(session: &Session<FileKeyStorage, GenerationImpl>) {
    let state = session.state();
    if state.titles.is_empty() {
        return;
    }
    println!("Select a title ({} options):", state.titles.len());
    for (idx, title) in state.titles.iter().enumerate() {
        let marker = if *title == state.selected_title { "*" } else { " " };
        println!("{} #{:<2} {}", marker, idx + 1, title);
    }
}

fn print_state(session: &Session<FileKeyStorage, GenerationImpl>) -> Result<()> {
    let state = session.state();
    let keys = &state.api_keys;
    println!(
        "keys: gemini {}, together {}",
        if keys.gemini.is_empty() { "(none)" } else { "(set)" },
        if keys.together.is_empty() { "(none)" } else { "(set)" }
    );
    println!("topic: {}", state.topic);
    println!(
        "selected: {}",
        if state.selected_title.is_empty() {
            "(none)"
        } else {
            state.selected_title.as_str()
        }
    );
    println!(
        "background: {}",
        if state.thumbnail.background_image.is_some() {
            "(set)"
        } else {
            "(none)"
        }
    );
    println!("overlay: {}", serde_json::to_string(state.overlay())?);
    let viewport = session.viewport();
    println!(
        "viewport: {} {} {}x{}",
        viewport.left, viewport.top, viewport.width, viewport.height
    );
    Ok(())
}

fn print_interactive_help() {
    println!("Commands:");
    println!("  /quit, /exit                 Exit interactive mode");
    println!("  /keys <gemini> <together>    Save API keys");
    println!("  /topic <text>                Generate 10 titles (same as plain input)");
    println!("  /titles                      List generated titles");
    println!("  /select <n>                  Select title n");
    println!("  /upload <path>               Use a PNG/JPEG file (max 5MB) as background");
    println!("  /image                       Generate a background from the selected title");
    println!("  /text [text]                 Set overlay text (empty clears)");
    println!("  /font [name]                 Set font family (or list)");
    println!("  /size <20-200>               Set font size");
    println!("  /color [#hex|n]              Set colour by hex or quick colour number (or list)");
    println!("  /view <left> <top> <w> <h>   Set the displayed canvas rectangle");
    println!("  /down <x> <y>                Pointer down (starts a drag)");
    println!("  /move <x> <y>                Pointer move");
    println!("  /up, /leave                  Pointer up / leave (ends a drag)");
    println!("  /drag <x1> <y1> <x2> <y2>    Down, move and up in one step");
    println!("  /state                       Show session state");
    println!("  /download [dir]              Write the thumbnail PNG");
    println!("  /preview [path]              Write the preview (optionally to a new path)");
}
