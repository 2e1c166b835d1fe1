//! Presentation of a chat session.
//!
//! The session never writes to a terminal itself. It pushes commands to a
//! [`PresentationSink`], and [`PlainTextSink`] renders them as plain text with
//! optional ANSI styling.

use std::io::{self, Stdout, Write};
use std::sync::{Arc, Mutex};

use crate::types::{ModelInfo, Role, Turn, TurnContent, TurnId};

/// ANSI escape code for dim text (used for system turns).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for user turns).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for warnings).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for assistant turns).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Severity of a transient notification.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NotificationLevel {
    /// Neutral information.
    Info,
    /// An operation completed.
    Success,
    /// Something degraded but the session continues.
    Warning,
    /// An operation failed.
    Error,
}

impl NotificationLevel {
    fn tag(&self) -> &'static str {
        match self {
            NotificationLevel::Info => "info",
            NotificationLevel::Success => "ok",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        }
    }
}

/// Receiver of the render commands a session emits.
///
/// Update commands for one turn arrive in order, and each carries the full
/// content of the turn so far rather than a delta. Implementations must not
/// call back into the session.
pub trait PresentationSink: Send + Sync {
    /// A turn was appended to the transcript.
    fn append_turn(&self, turn: &Turn);

    /// The in-progress turn `id` now reads `content`.
    fn update_turn(&self, id: TurnId, content: &str);

    /// The transcript was emptied.
    fn clear(&self);

    /// A transient message for the user.
    fn notify(&self, level: NotificationLevel, message: &str);

    /// The selected model changed.
    fn model_selected(&self, model: &ModelInfo) {
        _ = model;
    }

    /// A request started (`true`) or finished (`false`).
    fn set_busy(&self, busy: bool) {
        _ = busy;
    }
}

impl<S: PresentationSink + ?Sized> PresentationSink for Arc<S> {
    fn append_turn(&self, turn: &Turn) {
        (**self).append_turn(turn)
    }

    fn update_turn(&self, id: TurnId, content: &str) {
        (**self).update_turn(id, content)
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn notify(&self, level: NotificationLevel, message: &str) {
        (**self).notify(level, message)
    }

    fn model_selected(&self, model: &ModelInfo) {
        (**self).model_selected(model)
    }

    fn set_busy(&self, busy: bool) {
        (**self).set_busy(busy)
    }
}

/// Remove control characters other than newline and tab.
///
/// Turn content comes from the network and must not be able to drive the
/// terminal.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

struct SinkState<W> {
    out: W,
    /// Turn currently being streamed and the sanitized text printed for it.
    open: Option<(TurnId, String)>,
}

/// Plain text sink with optional ANSI styling.
///
/// Streamed turns are printed incrementally: each snapshot prints only what
/// extends the text already on screen.
pub struct PlainTextSink<W: Write + Send = Stdout> {
    use_color: bool,
    state: Mutex<SinkState<W>>,
}

impl PlainTextSink<Stdout> {
    /// Creates a sink on stdout with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a sink on stdout with the specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl Default for PlainTextSink<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> PlainTextSink<W> {
    /// Creates a sink on an arbitrary writer.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self {
            use_color,
            state: Mutex::new(SinkState {
                out,
                open: None,
            }),
        }
    }

    /// Consumes the sink, returning its writer.
    pub fn into_inner(self) -> W {
        match self.state.into_inner() {
            Ok(state) => state.out,
            Err(poisoned) => poisoned.into_inner().out,
        }
    }

    fn with_state<F: FnOnce(&mut SinkState<W>)>(&self, f: F) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut state);
        let _ = state.out.flush();
    }

    fn color(&self, code: &'static str) -> &'static str {
        if self.use_color { code } else { "" }
    }

    fn role_color(&self, role: Role) -> &'static str {
        self.color(match role {
            Role::User => ANSI_CYAN,
            Role::Assistant => ANSI_GREEN,
            Role::System => ANSI_DIM,
            Role::Error => ANSI_RED,
        })
    }

    fn label(&self, role: Role) -> String {
        format!(
            "{}{}{}:{} ",
            self.color(ANSI_BOLD),
            self.role_color(role),
            role.display_label(),
            self.color(ANSI_RESET)
        )
    }

    fn close_open(state: &mut SinkState<W>) {
        if state.open.take().is_some() {
            let _ = writeln!(state.out);
        }
    }
}

impl<W: Write + Send> PresentationSink for PlainTextSink<W> {
    fn append_turn(&self, turn: &Turn) {
        let label = self.label(turn.role);
        self.with_state(|state| {
            Self::close_open(state);
            match &turn.content {
                TurnContent::Text { text } if turn.role == Role::Assistant && text.is_empty() => {
                    let _ = write!(state.out, "{label}");
                    state.open = Some((turn.id, String::new()));
                }
                TurnContent::Text { text } => {
                    let _ = writeln!(state.out, "{label}{}", sanitize(text));
                }
                TurnContent::Pdf { document } => {
                    let _ = writeln!(
                        state.out,
                        "{label}[PDF: {}] ({} bytes)",
                        sanitize(&document.file_name),
                        document.data.len()
                    );
                }
            }
        });
    }

    fn update_turn(&self, id: TurnId, content: &str) {
        let label = self.label(Role::Assistant);
        self.with_state(|state| {
            let content = sanitize(content);
            match &mut state.open {
                Some((open, printed)) if *open == id => {
                    if let Some(suffix) = content.strip_prefix(printed.as_str()) {
                        let _ = write!(state.out, "{suffix}");
                    } else {
                        let _ = write!(state.out, "\n{label}{content}");
                    }
                    *printed = content;
                }
                _ => {
                    Self::close_open(state);
                    let _ = write!(state.out, "{label}{content}");
                    state.open = Some((id, content));
                }
            }
        });
    }

    fn clear(&self) {
        let dim = self.color(ANSI_DIM);
        let reset = self.color(ANSI_RESET);
        self.with_state(|state| {
            Self::close_open(state);
            let _ = writeln!(state.out, "{dim}--- transcript cleared ---{reset}");
        });
    }

    fn notify(&self, level: NotificationLevel, message: &str) {
        let color = self.color(match level {
            NotificationLevel::Info => ANSI_DIM,
            NotificationLevel::Success => ANSI_GREEN,
            NotificationLevel::Warning => ANSI_YELLOW,
            NotificationLevel::Error => ANSI_RED,
        });
        let reset = self.color(ANSI_RESET);
        self.with_state(|state| {
            Self::close_open(state);
            let _ = writeln!(
                state.out,
                "{color}[{}]{reset} {}",
                level.tag(),
                sanitize(message)
            );
        });
    }

    fn set_busy(&self, busy: bool) {
        if !busy {
            self.with_state(Self::close_open);
        }
    }
}
