//! Terminal session control for the interactive process.
//!
//! Exactly one component may own the terminal's stdin/stdout at any instant:
//! the rustyline editor, a child pager process, or a raw yes/no prompt. The
//! editor runs on a dedicated OS thread and only reads when the REPL loop has
//! granted it a permit, so "suspended" means the thread is parked and raw mode
//! is released. [`TerminalController::suspend`] hands exclusive ownership to
//! the caller as a [`TerminalGuard`]; dropping the guard drains pending stdin
//! bytes and returns ownership to line editing on every exit path.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use rustyline::ExternalPrinter;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, warn};

const PROMPT: &str = "pushgate> ";

/// Parsed answer to the push approval question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushDecision {
    Approved,
    Rejected,
    /// Anything that is not y/yes/n/no; carries the raw answer.
    Invalid(String),
}

impl PushDecision {
    pub fn parse(answer: &str) -> Self {
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Self::Approved,
            "n" | "no" => Self::Rejected,
            other => Self::Invalid(other.to_string()),
        }
    }
}

/// Events delivered from the editor thread to the REPL loop.
#[derive(Debug)]
pub enum ReadlineEvent {
    Line(String),
    /// Ctrl-C at the prompt; the REPL turns this into orderly shutdown.
    Interrupted,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TermState {
    /// Editor thread parked, terminal unowned.
    Idle,
    /// Editor thread inside `readline()`.
    Reading,
    /// A suspender is waiting for an in-flight read to finish.
    SuspendRequested,
    /// A `TerminalGuard` owns the terminal.
    Suspended,
}

struct Shared {
    state: Mutex<TermState>,
    /// True while the REPL has an unanswered read permit outstanding. Survives
    /// suspension so a prompt consumed by a remote takeover is re-issued.
    read_pending: AtomicBool,
    cond: Condvar,
    printer: Mutex<Option<Box<dyn ExternalPrinter + Send>>>,
}

/// Owner of the process's single line-editing interface.
#[derive(Clone)]
pub struct TerminalController {
    shared: Arc<Shared>,
}

impl TerminalController {
    /// Spawn the editor thread. Returns the controller and the stream of
    /// readline events for the REPL loop.
    pub fn spawn() -> (Self, UnboundedReceiver<ReadlineEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            state: Mutex::new(TermState::Idle),
            read_pending: AtomicBool::new(false),
            cond: Condvar::new(),
            printer: Mutex::new(None),
        });

        let thread_shared = Arc::clone(&shared);
        if let Err(e) = std::thread::Builder::new()
            .name("pushgate-readline".into())
            .spawn(move || editor_loop(thread_shared, event_tx))
        {
            error!("failed to spawn readline thread: {e}");
        }

        (Self { shared }, event_rx)
    }

    /// Grant the editor thread a permit to read the next line. No-op unless
    /// the terminal is idle.
    pub fn request_line(&self) {
        let mut state = self.shared.state.lock().unwrap_or_else(|e| e.into_inner());
        self.shared.read_pending.store(true, Ordering::SeqCst);
        if *state == TermState::Idle {
            *state = TermState::Reading;
            self.shared.cond.notify_all();
        }
    }

    /// Take exclusive ownership of the terminal.
    ///
    /// Never returns while the editor is still reading stdin: an in-flight
    /// read gets a printed notice and ownership transfers as soon as it
    /// completes (that line is discarded, not delivered).
    pub fn suspend(&self) -> TerminalGuard {
        let mut state = self.shared.state.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            match *state {
                TermState::Idle => {
                    *state = TermState::Suspended;
                    return TerminalGuard {
                        shared: Arc::clone(&self.shared),
                    };
                }
                TermState::Reading => {
                    *state = TermState::SuspendRequested;
                    self.print_inner("review requested; press Enter to begin".to_string());
                    while *state == TermState::SuspendRequested {
                        state = self
                            .shared
                            .cond
                            .wait(state)
                            .unwrap_or_else(|e| e.into_inner());
                    }
                    // The editor finished its read and handed ownership
                    // straight to this suspender.
                    if *state == TermState::Suspended {
                        return TerminalGuard {
                            shared: Arc::clone(&self.shared),
                        };
                    }
                }
                TermState::SuspendRequested | TermState::Suspended => {
                    state = self
                        .shared
                        .cond
                        .wait(state)
                        .unwrap_or_else(|e| e.into_inner());
                }
            }
        }
    }

    /// Terminal-safe output: goes through the rustyline external printer when
    /// a read may be active, falling back to plain stdout.
    pub fn print(&self, message: impl Into<String>) {
        self.print_inner(message.into());
    }

    fn print_inner(&self, message: String) {
        let mut printer = self
            .shared
            .printer
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(printer) = printer.as_mut() {
            if printer.print(format!("{message}\n")).is_ok() {
                return;
            }
        }
        println!("{message}");
    }
}

/// Exclusive terminal ownership handle. Dropping it drains stdin and returns
/// control to line editing, panics included.
pub struct TerminalGuard {
    shared: Arc<Shared>,
}

impl TerminalGuard {
    /// Ask a raw yes/no question. Only reachable while this guard owns the
    /// terminal, so the read cannot race the line editor.
    pub fn ask_yes_no(&self, question: &str) -> io::Result<PushDecision> {
        let mut stdout = io::stdout();
        write!(stdout, "{question} [y/n] ")?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(PushDecision::parse(&answer))
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        drain_stdin();
        let mut state = self.shared.state.lock().unwrap_or_else(|e| e.into_inner());
        // Re-issue a prompt that was consumed by the suspension.
        *state = if self.shared.read_pending.load(Ordering::SeqCst) {
            TermState::Reading
        } else {
            TermState::Idle
        };
        self.shared.cond.notify_all();
    }
}

/// Discard keystrokes typed while the terminal was suspended so they cannot
/// leak into the next prompt.
fn drain_stdin() {
    #[cfg(unix)]
    {
        // Safety: flushing the input queue of fd 0 has no memory effects.
        let rc = unsafe { libc::tcflush(libc::STDIN_FILENO, libc::TCIFLUSH) };
        if rc != 0 {
            warn!("failed to drain stdin: {}", io::Error::last_os_error());
        }
    }
}

fn editor_loop(shared: Arc<Shared>, event_tx: UnboundedSender<ReadlineEvent>) {
    let config = rustyline::Config::builder().auto_add_history(true).build();
    let mut editor = match rustyline::DefaultEditor::with_config(config) {
        Ok(editor) => editor,
        Err(e) => {
            error!("failed to create readline editor: {e}");
            let _ = event_tx.send(ReadlineEvent::Eof);
            return;
        }
    };

    if let Ok(printer) = editor.create_external_printer() {
        *shared.printer.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(Box::new(printer) as Box<dyn ExternalPrinter + Send>);
    }

    loop {
        // Park until the REPL grants a read permit.
        {
            let mut state = shared.state.lock().unwrap_or_else(|e| e.into_inner());
            while *state != TermState::Reading {
                state = shared.cond.wait(state).unwrap_or_else(|e| e.into_inner());
            }
        }

        let result = editor.readline(PROMPT);

        // A suspender may have requested ownership mid-read; if so this
        // line is drained, not delivered.
        let deliver = {
            let mut state = shared.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state == TermState::SuspendRequested {
                *state = TermState::Suspended;
                shared.cond.notify_all();
                false
            } else {
                *state = TermState::Idle;
                shared.read_pending.store(false, Ordering::SeqCst);
                true
            }
        };

        if !deliver {
            debug!("discarding line entered while suspension was pending");
            continue;
        }

        let event = match result {
            Ok(line) => ReadlineEvent::Line(line),
            Err(rustyline::error::ReadlineError::Interrupted) => ReadlineEvent::Interrupted,
            Err(rustyline::error::ReadlineError::Eof) => ReadlineEvent::Eof,
            Err(e) => {
                error!("readline error: {e}");
                ReadlineEvent::Eof
            }
        };

        let stop = matches!(event, ReadlineEvent::Eof);
        if event_tx.send(event).is_err() || stop {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn shared_in(state: TermState, read_pending: bool) -> Arc<Shared> {
        Arc::new(Shared {
            state: Mutex::new(state),
            read_pending: AtomicBool::new(read_pending),
            cond: Condvar::new(),
            printer: Mutex::new(None),
        })
    }

    fn state_of(shared: &Shared) -> TermState {
        *shared.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn wait_for_state(shared: &Shared, expected: TermState) {
        for _ in 0..400 {
            if state_of(shared) == expected {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("terminal never reached {expected:?}, stuck at {:?}", state_of(shared));
    }

    #[test]
    fn suspend_completes_when_an_in_flight_read_finishes() {
        let shared = shared_in(TermState::Reading, true);
        let controller = TerminalController {
            shared: Arc::clone(&shared),
        };

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let guard = controller.suspend();
            done_tx.send(()).ok();
            drop(guard);
        });

        wait_for_state(&shared, TermState::SuspendRequested);

        // The editor leaves readline() and hands the terminal over.
        {
            let mut state = shared.state.lock().unwrap_or_else(|e| e.into_inner());
            *state = TermState::Suspended;
            shared.cond.notify_all();
        }

        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("suspend must return once the in-flight read completes");

        // The read permit was pending, so dropping the guard re-arms it.
        wait_for_state(&shared, TermState::Reading);
    }

    #[test]
    fn suspend_of_idle_terminal_is_immediate_and_drop_restores_idle() {
        let shared = shared_in(TermState::Idle, false);
        let controller = TerminalController {
            shared: Arc::clone(&shared),
        };

        let guard = controller.suspend();
        assert_eq!(state_of(&shared), TermState::Suspended);
        drop(guard);
        assert_eq!(state_of(&shared), TermState::Idle);
    }

    #[test]
    fn decision_accepts_yes_variants() {
        assert_eq!(PushDecision::parse("y"), PushDecision::Approved);
        assert_eq!(PushDecision::parse("YES\n"), PushDecision::Approved);
        assert_eq!(PushDecision::parse(" Y "), PushDecision::Approved);
    }

    #[test]
    fn decision_accepts_no_variants() {
        assert_eq!(PushDecision::parse("n"), PushDecision::Rejected);
        assert_eq!(PushDecision::parse("No\n"), PushDecision::Rejected);
    }

    #[test]
    fn ambiguous_answers_are_invalid() {
        assert_eq!(
            PushDecision::parse("maybe"),
            PushDecision::Invalid("maybe".to_string())
        );
        assert_eq!(PushDecision::parse(""), PushDecision::Invalid(String::new()));
        // A decision is never guessed from a prefix.
        assert_eq!(
            PushDecision::parse("yep"),
            PushDecision::Invalid("yep".to_string())
        );
    }
}
