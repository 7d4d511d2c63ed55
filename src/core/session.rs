//! Session management
//!
//! A `Session` owns the connection to the server, the event handlers and
//! the display they drive. It starts by asking for the terminal settings;
//! the first settings reply sizes the console, registers the handlers and
//! requests the initial screen and owner.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::dispatch::Dispatcher;
use super::protocol::{MessageKind, ProtocolError, Request, ServerEvent, Settings};
use super::term::{decode_row_value, GridError, Owner, Row};
use super::transport::{Channel, PendingReply, Reply, Transport, TransportError};
use crate::config::{CellConfig, ColorTheme};
use crate::ui::chat::ChatLog;
use crate::ui::console::Console;
use crate::ui::surface::Surface;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Grid(#[from] GridError),
}

impl SessionError {
    /// Screen state was rejected; a fresh screen puts the client back in sync
    pub fn needs_resync(&self) -> bool {
        matches!(self, SessionError::Grid(e) if e.rejects_screen())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Everything server messages can change on screen
pub struct View<S> {
    pub console: Console<S>,
    pub chat: ChatLog,
    /// Most recent change number the screen reflects
    pub last_change: Option<u64>,
}

impl<S: Surface> View<S> {
    pub fn new(settings: Settings, theme: ColorTheme, metrics: CellConfig, surface: S) -> Result<Self> {
        Ok(Self {
            console: Console::new(settings.cols, settings.rows, theme, metrics, surface)?,
            chat: ChatLog::new(),
            last_change: None,
        })
    }

    fn decode_rows(&self, rows: &[Value]) -> Result<Vec<Row>> {
        let cols = self.console.grid().cols;
        rows.iter()
            .map(|row| decode_row_value(row, cols).map_err(|e| SessionError::from(GridError::from(e))))
            .collect()
    }

    /// Apply one decoded server message.
    ///
    /// Screen state is fully decoded and checked before anything changes.
    pub fn apply(&mut self, event: ServerEvent) -> Result<()> {
        match event {
            ServerEvent::Screen { rows, change } => {
                let rows = self.decode_rows(&rows)?;
                self.console.replace_screen(rows)?;
                if change.is_some() {
                    self.last_change = change;
                }
            }
            ServerEvent::Changes(changes) => {
                let cols = self.console.grid().cols;
                let rows = self.console.grid().rows;
                let mut decoded = Vec::with_capacity(changes.len());
                for change in &changes {
                    if change.line >= rows {
                        return Err(GridError::RowOutOfRange {
                            index: change.line,
                            rows,
                        }
                        .into());
                    }
                    let row = decode_row_value(&change.row, cols).map_err(GridError::from)?;
                    decoded.push((change.line, row));
                }
                for (line, row) in decoded {
                    self.console.replace_row(line, row)?;
                }
                if let Some(newest) = changes.iter().map(|c| c.number).max() {
                    self.last_change = Some(self.last_change.map_or(newest, |n| n.max(newest)));
                }
            }
            ServerEvent::Cursor { x, y } => self.console.move_cursor(x, y)?,
            ServerEvent::Owner(value) => match Owner::from_wire(value) {
                Some(owner) => self.console.change_owner(owner),
                None => warn!(value, "unknown owner value"),
            },
            ServerEvent::Chat { sender, text } => self.chat.add_chat(&sender, &text),
            ServerEvent::Status(text) => self.chat.add_status(&text),
            ServerEvent::Error(text) => self.chat.add_error(&text),
            ServerEvent::Settings(_) | ServerEvent::Hello | ServerEvent::Ok => {}
        }
        Ok(())
    }
}

/// Decode the arguments as `kind` and apply them
fn apply_args<S: Surface>(view: &mut View<S>, kind: MessageKind, args: &[Value]) -> Result<()> {
    let event = ServerEvent::parse_kind(kind, args)?;
    view.apply(event)
}

enum State<S> {
    /// Waiting for the first settings reply
    Connecting { settings: PendingReply, surface: S },
    Running(View<S>),
    /// Settings never arrived
    Failed,
}

pub struct Session<C, S> {
    transport: Transport<C>,
    dispatcher: Dispatcher<View<S>, SessionError>,
    state: State<S>,
    /// Replies to requests this session made, applied as they arrive
    inflight: Vec<PendingReply>,
    theme: ColorTheme,
    metrics: CellConfig,
}

impl<C: Channel, S: Surface + 'static> Session<C, S> {
    /// Connect over `channel` and ask for the terminal settings.
    pub fn connect(channel: C, surface: S, theme: ColorTheme, metrics: CellConfig) -> Result<Self> {
        let mut transport = Transport::new();
        transport.connect(channel);
        let settings = transport.request(Request::settings())?;
        info!("connected, waiting for settings");

        Ok(Self {
            transport,
            dispatcher: Dispatcher::new(),
            state: State::Connecting { settings, surface },
            inflight: Vec::new(),
            theme,
            metrics,
        })
    }

    pub fn view(&self) -> Option<&View<S>> {
        match &self.state {
            State::Running(view) => Some(view),
            _ => None,
        }
    }

    pub fn view_mut(&mut self) -> Option<&mut View<S>> {
        match &mut self.state {
            State::Running(view) => Some(view),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running(_))
    }

    /// The settings request failed or its reply was unusable
    pub fn has_failed(&self) -> bool {
        matches!(self.state, State::Failed)
    }

    pub fn theme(&self) -> &ColorTheme {
        &self.theme
    }

    /// Handle one frame from the server.
    ///
    /// Replies resolve their requests; everything else goes to the handlers.
    /// Rejected screen updates trigger a fresh screen request.
    pub fn handle_message(&mut self, text: &str) -> Result<()> {
        let result = self.route(text);
        self.poll_replies();

        if let Err(e) = &result {
            if e.needs_resync() && self.is_running() {
                warn!(error = %e, "screen update rejected, requesting a fresh screen");
                self.track(Request::screen())?;
            }
        }
        result
    }

    fn route(&mut self, text: &str) -> Result<()> {
        let Some(event) = self.transport.receive(text)? else {
            return Ok(());
        };
        match &mut self.state {
            State::Running(view) => self.dispatcher.dispatch(view, &event.tag, &event.args),
            _ => {
                debug!(tag = %event.tag, "event before settings, ignored");
                Ok(())
            }
        }
    }

    /// Apply every reply that has arrived
    fn poll_replies(&mut self) {
        if let State::Connecting { settings, .. } = &mut self.state {
            match settings.try_take() {
                Ok(Some(reply)) => self.start(reply),
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "settings request failed");
                    self.state = State::Failed;
                }
            }
        }

        let mut arrived = Vec::new();
        self.inflight.retain_mut(|pending| match pending.try_take() {
            Ok(Some(reply)) => {
                arrived.push(reply);
                false
            }
            Ok(None) => true,
            Err(e) => {
                debug!(id = pending.id(), error = %e, "request abandoned");
                false
            }
        });

        let mut resync = false;
        if let State::Running(view) = &mut self.state {
            for reply in arrived {
                if let Err(e) = Self::apply_reply(view, reply) {
                    warn!(error = %e, "reply rejected");
                    resync |= e.needs_resync();
                }
            }
        }
        if resync {
            if let Err(e) = self.track(Request::screen()) {
                warn!(error = %e, "could not request a fresh screen");
            }
        }
    }

    fn apply_reply(view: &mut View<S>, reply: Reply) -> Result<()> {
        match ServerEvent::parse(&reply.tag, &reply.args) {
            Some(event) => view.apply(event?),
            None => {
                debug!(tag = %reply.tag, "reply with unknown tag");
                Ok(())
            }
        }
    }

    /// First settings reply: build the display and start the session
    fn start(&mut self, reply: Reply) {
        let settings = match ServerEvent::parse(&reply.tag, &reply.args) {
            Some(Ok(ServerEvent::Settings(settings))) => settings,
            other => {
                warn!(tag = %reply.tag, ?other, "unusable settings reply");
                self.state = State::Failed;
                return;
            }
        };
        info!(rows = settings.rows, cols = settings.cols, "starting session");

        let State::Connecting { surface, .. } = std::mem::replace(&mut self.state, State::Failed) else {
            return;
        };
        let view = match View::new(settings, self.theme.clone(), self.metrics.clone(), surface) {
            Ok(view) => view,
            Err(e) => {
                warn!(error = %e, "unusable terminal settings");
                return;
            }
        };
        self.state = State::Running(view);

        self.register_handlers();
        for request in [Request::hello(), Request::screen(), Request::owner()] {
            if let Err(e) = self.track(request) {
                warn!(error = %e, "startup request failed");
            }
        }
    }

    fn register_handlers(&mut self) {
        for kind in [
            MessageKind::Screen,
            MessageKind::Changes,
            MessageKind::Cursor,
            MessageKind::Owner,
            MessageKind::Chat,
            MessageKind::Status,
            MessageKind::Error,
        ] {
            self.dispatcher.on(kind, move |view, args| apply_args(view, kind, args));
        }
    }

    /// Send a request whose reply should be applied to the view
    fn track(&mut self, request: Request) -> Result<()> {
        let pending = self.transport.request(request)?;
        self.inflight.push(pending);
        Ok(())
    }

    /// Register an extra handler for a server message
    pub fn on<F>(&mut self, kind: MessageKind, handler: F)
    where
        F: FnMut(&mut View<S>, &[Value]) -> Result<()> + 'static,
    {
        self.dispatcher.on(kind, handler);
        debug!(tag = kind.tag(), handlers = self.dispatcher.handler_count(kind), "handler added");
    }

    /// Send the key codes of one keystroke
    pub fn send_keys(&mut self, codes: &[u32]) -> Result<()> {
        self.track(Request::keypress(codes))
    }

    pub fn send_chat(&mut self, message: &str) -> Result<()> {
        self.track(Request::chat(message))
    }

    pub fn request_screen(&mut self) -> Result<()> {
        self.track(Request::screen())
    }

    /// Ask for the changes since the last one seen, or the whole screen if
    /// none has been seen yet.
    pub fn catch_up(&mut self) -> Result<()> {
        let last = self.view().and_then(|v| v.last_change);
        match last {
            Some(n) => self.track(Request::changes(n)),
            None => self.track(Request::screen()),
        }
    }

    pub fn request_owner(&mut self) -> Result<()> {
        self.track(Request::owner())
    }

    pub fn leave(&mut self) -> Result<()> {
        self.track(Request::leave())
    }

    /// Switch colour theme and repaint
    pub fn set_color_scheme(&mut self, theme: ColorTheme) {
        self.theme = theme.clone();
        if let Some(view) = self.view_mut() {
            view.console.set_color_scheme(theme);
        }
    }

    /// The connection is gone; outstanding requests are abandoned.
    pub fn disconnect(&mut self) {
        info!(abandoned = self.transport.pending_count(), "disconnected");
        self.transport.disconnect();
        self.inflight.clear();
    }
}
