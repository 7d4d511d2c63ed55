//! webterm - client for a shared multi-user terminal
//!
//! Connects to a session server, mirrors its terminal screen and forwards
//! keystrokes to it. Everyone connected sees the same screen; whoever owns
//! the terminal types into it, and the status line shows who that is.
//!
//! # Quick Start
//!
//! ```text
//! webterm                       # Connect to the configured server
//! webterm -s example.org:5000   # Connect elsewhere
//! webterm -t light1             # Pick a colour theme
//! ```
//!
//! # Keybindings (Ctrl+B prefix)
//!
//! | Key | Action |
//! |-----|--------|
//! | c | Write a chat message |
//! | t | Next colour theme |
//! | r | Catch up on missed changes |
//! | s | Request the full screen |
//! | o | Ask who owns the terminal |
//! | q | Leave and quit |
//! | Ctrl+B | Send a literal Ctrl+B |

mod config;
mod core;
mod ui;

use std::env;
use std::time::Duration;

use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{config_dir, ColorTheme, Config};
use crate::core::net::{self, FrameReader, Incoming, TcpChannel};
use crate::core::session::{Session, SessionError};
use crate::ui::{Canvas, KeyMapper, Overlay, Presenter};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Ctrl+B
const PREFIX_CODE: u32 = 0x02;

/// Command line overrides
#[derive(Debug, Default)]
struct Args {
    server: Option<String>,
    theme: Option<String>,
}

fn print_version() {
    eprintln!("webterm {}", VERSION);
}

fn print_help() {
    eprintln!("webterm {} - client for a shared multi-user terminal", VERSION);
    eprintln!();
    eprintln!("Usage: webterm [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --server <ADDR>   Session server (host:port)");
    eprintln!("  -t, --theme <NAME>    Colour theme");
    eprintln!("      --list-themes     List colour themes");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keybindings (Ctrl+B prefix):");
    eprintln!("  Ctrl+B, c             Write a chat message (Enter sends, Esc cancels)");
    eprintln!("  Ctrl+B, t             Next colour theme");
    eprintln!("  Ctrl+B, r             Catch up on missed changes");
    eprintln!("  Ctrl+B, s             Request the full screen");
    eprintln!("  Ctrl+B, o             Ask who owns the terminal");
    eprintln!("  Ctrl+B, q             Leave and quit");
    eprintln!("  Ctrl+B, Ctrl+B        Send Ctrl+B");
    eprintln!();
    eprintln!("Configuration: ~/.webterm/config.toml");
    eprintln!("Log file:      ~/.webterm/webterm.log");
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "--list-themes" => {
                for name in ColorTheme::list() {
                    eprintln!("{}", name);
                }
                std::process::exit(0);
            }
            "-s" | "--server" => {
                i += 1;
                let Some(addr) = args.get(i) else {
                    return Err("Missing server address".to_string());
                };
                parsed.server = Some(addr.clone());
            }
            "-t" | "--theme" => {
                i += 1;
                let Some(name) = args.get(i) else {
                    return Err("Missing theme name".to_string());
                };
                if !ColorTheme::list().contains(&name.as_str()) {
                    return Err(format!("Unknown theme: {}. Use --list-themes.", name));
                }
                parsed.theme = Some(name.clone());
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(parsed)
}

fn init_logging(filter: &str) {
    let log_path = config_dir()
        .map(|dir| dir.join("webterm.log"))
        .unwrap_or_else(|| std::path::PathBuf::from("webterm.log"));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let config = Config::load();
    init_logging(&config.log_level);
    info!("webterm {} starting...", VERSION);

    let server = args.server.unwrap_or_else(|| config.server.clone());
    let theme = match &args.theme {
        Some(name) => ColorTheme::by_name(name),
        None => config.get_color_theme(),
    };

    let (channel, reader) =
        net::connect(&server).with_context(|| format!("could not connect to {}", server))?;
    info!(%server, "connected");
    let session = Session::connect(channel, Canvas::new(0, 0), theme, config.cell.clone())?;

    let mut app = App {
        session,
        reader,
        server,
        mode: Mode::Normal,
    };
    let mut presenter = Presenter::new();
    presenter.init()?;
    let result = app.run(&mut presenter);
    presenter.cleanup()?;

    if let Err(e) = &result {
        error!(error = %e, "session ended with an error");
    }
    info!("webterm exiting");
    result
}

/// What keystrokes currently do
#[derive(Debug, PartialEq, Eq)]
enum Mode {
    /// Forwarded to the server
    Normal,
    /// Ctrl+B was pressed; the next key is a command
    Prefix,
    /// Typing a chat message
    Chat(String),
}

struct App {
    session: Session<TcpChannel, Canvas>,
    reader: FrameReader,
    server: String,
    mode: Mode,
}

impl App {
    fn run(&mut self, presenter: &mut Presenter) -> anyhow::Result<()> {
        loop {
            if !self.drain_frames() {
                info!("server closed the connection");
                self.session.disconnect();
                return Ok(());
            }
            if self.session.has_failed() {
                anyhow::bail!("{} did not send usable terminal settings", self.server);
            }

            let overlay = self.overlay();
            match self.session.view_mut() {
                Some(view) => presenter.render(view, &overlay)?,
                None => presenter.render_waiting(&self.server)?,
            }

            if event::poll(Duration::from_millis(16))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if !self.handle_key(key) {
                            return Ok(());
                        }
                    }
                    Event::Resize(..) => {
                        if let Some(view) = self.session.view_mut() {
                            view.console.invalidate();
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    /// Feed every frame that has arrived to the session. False once the
    /// connection is closed.
    fn drain_frames(&mut self) -> bool {
        loop {
            match self.reader.poll() {
                Incoming::Frame(frame) => {
                    if let Err(e) = self.session.handle_message(&frame) {
                        warn!(error = %e, "message rejected");
                    }
                }
                Incoming::Empty => return true,
                Incoming::Closed => return false,
            }
        }
    }

    fn overlay(&self) -> Overlay {
        let owner = self
            .session
            .view()
            .map(|v| v.console.grid().owner().describe())
            .unwrap_or("nobody");
        let mode = match self.mode {
            Mode::Prefix => " [prefix]",
            _ => "",
        };
        Overlay {
            status: format!(
                " {} | owner: {} | theme: {}{} | Ctrl+B c chat, t theme, r catch up, s screen, o owner, q quit",
                self.server,
                owner,
                self.session.theme().name,
                mode
            ),
            input: match &self.mode {
                Mode::Chat(text) => Some(text.clone()),
                _ => None,
            },
        }
    }

    /// Handle one key press. False when the user quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let is_prefix = key.code == KeyCode::Char('b') && key.modifiers.contains(KeyModifiers::CONTROL);

        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Normal if is_prefix => self.mode = Mode::Prefix,
            Mode::Normal => {
                if let Some(codes) = KeyMapper::map(&key) {
                    report(self.session.send_keys(&codes));
                }
            }
            Mode::Prefix => return self.handle_command(key, is_prefix),
            Mode::Chat(mut text) => match key.code {
                KeyCode::Enter => {
                    if !text.is_empty() {
                        report(self.session.send_chat(&text));
                    }
                }
                KeyCode::Esc => {}
                KeyCode::Backspace => {
                    text.pop();
                    self.mode = Mode::Chat(text);
                }
                KeyCode::Char(ch) => {
                    text.push(ch);
                    self.mode = Mode::Chat(text);
                }
                _ => self.mode = Mode::Chat(text),
            },
        }
        true
    }

    /// Key after the prefix
    fn handle_command(&mut self, key: KeyEvent, is_prefix: bool) -> bool {
        if is_prefix {
            report(self.session.send_keys(&[PREFIX_CODE]));
            return true;
        }
        match key.code {
            KeyCode::Char('c') => self.mode = Mode::Chat(String::new()),
            KeyCode::Char('t') => {
                let next = ColorTheme::by_name(self.session.theme().next_name());
                info!(theme = %next.name, "switching theme");
                self.session.set_color_scheme(next);
            }
            KeyCode::Char('r') => report(self.session.catch_up()),
            KeyCode::Char('s') => report(self.session.request_screen()),
            KeyCode::Char('o') => report(self.session.request_owner()),
            KeyCode::Char('q') => {
                report(self.session.leave());
                return false;
            }
            _ => {}
        }
        true
    }
}

fn report(result: Result<(), SessionError>) {
    if let Err(e) = result {
        warn!(error = %e, "request failed");
    }
}
