//! The terminal front end: stdin commands in, UI events out.

use std::{
    io::{self, BufRead, Write},
    thread::{self, JoinHandle},
};

use clickloop_engine::{Command, NotifyKind, RunState, SessionEvent, StatusSnapshot, UiEvent};
use config::{PlaybackMode, Role};
use crossbeam_channel::{Receiver, Sender};
use tracing::debug;

/// Help text for the interactive session.
pub const HELP: &str = "\
commands:
  start [autoclick|macro]   start a run
  stop                      stop the active run
  toggle                    stop if running, else start
  mode <autoclick|macro>    choose what start and toggle launch
  bind <toggle|emergency|capture>
                            bind the next key or mouse button
  cancel                    leave hotkey assignment
  record / end              start / finish macro recording
  clear                     delete every recorded step
  capture                   use the pointer position as the click target
  steps                     list recorded steps
  status                    show the current state
  save                      validate and write the settings file
  quit                      exit";

/// A line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Forward to the session.
    Command(Command),
    /// Print [`HELP`].
    Help,
    /// Nothing to do.
    Blank,
}

/// Parse one console line.
pub fn parse_line(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(Input::Blank);
    };
    let arg = words.next();
    if let Some(extra) = words.next() {
        return Err(format!("unexpected argument {extra:?}"));
    }
    let cmd = match (verb.to_ascii_lowercase().as_str(), arg) {
        ("help" | "?", None) => return Ok(Input::Help),
        ("start", None) => Command::Start(None),
        ("start", Some(m)) => Command::Start(Some(mode(m)?)),
        ("stop", None) => Command::Stop,
        ("toggle", None) => Command::Toggle,
        ("mode", Some(m)) => Command::SetMode(mode(m)?),
        ("bind", Some(r)) => {
            Command::BeginAssignment(r.parse::<Role>().map_err(|e| e.to_string())?)
        }
        ("cancel", None) => Command::CancelAssignment,
        ("record", None) => Command::StartRecording,
        ("end", None) => Command::StopRecording,
        ("clear", None) => Command::ClearMacro,
        ("capture", None) => Command::CapturePosition,
        ("steps", None) => Command::ListSteps,
        ("status", None) => Command::Status,
        ("save", None) => Command::Save,
        ("quit" | "exit", None) => Command::Quit,
        ("mode" | "bind", None) => return Err(format!("{verb} needs an argument")),
        (_, Some(a)) if is_known(verb) => return Err(format!("unexpected argument {a:?}")),
        _ => return Err(format!("unknown command {verb:?}; try help")),
    };
    Ok(Input::Command(cmd))
}

/// True for verbs [`parse_line`] understands.
fn is_known(verb: &str) -> bool {
    matches!(
        verb.to_ascii_lowercase().as_str(),
        "help" | "?" | "stop" | "toggle" | "cancel" | "record" | "end" | "clear" | "capture"
            | "steps" | "status" | "save" | "quit" | "exit"
    )
}

/// Parse a mode argument.
fn mode(s: &str) -> Result<PlaybackMode, String> {
    s.parse::<PlaybackMode>().map_err(|e| e.to_string())
}

/// Render one UI event as terminal lines.
pub fn render(ev: &UiEvent) -> String {
    match ev {
        UiEvent::State(state) => format!("status: {state}"),
        UiEvent::Progress(progress) => progress.stats_line(),
        UiEvent::Notify { kind, title, text } => {
            let tag = match kind {
                NotifyKind::Info => "info",
                NotifyKind::Warn => "warn",
                NotifyKind::Error => "error",
                NotifyKind::Success => "ok",
            };
            format!("[{tag}] {title}: {text}")
        }
        UiEvent::StepAppended(step) => format!("+ {step}"),
        UiEvent::MacroCleared => "macro cleared".to_string(),
        UiEvent::BindingChanged { role, token } => format!("{role} hotkey: {}", token.label()),
        UiEvent::Listener(mode) => format!("listener: {}", mode.describe()),
        UiEvent::ModeChanged(mode) => format!("mode: {mode}"),
        UiEvent::Status(s) => render_status(s),
        UiEvent::Steps(steps) if steps.is_empty() => "(no steps recorded)".to_string(),
        UiEvent::Steps(steps) => steps
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{:>4}  {s}", i + 1))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Multi-line status block.
fn render_status(s: &StatusSnapshot) -> String {
    let mut out = vec![
        format!("state:     {}", s.state),
        format!("mode:      {}", s.mode),
        format!("listener:  {}", s.listener.describe()),
        format!("toggle:    {}", s.toggle.label()),
        format!("emergency: {}", s.emergency.label()),
        format!(
            "capture:   {}",
            s.capture.as_ref().map_or_else(|| "(none)".to_string(), |t| t.label())
        ),
        format!("steps:     {}", s.steps),
        format!("target:    {}", s.position),
    ];
    if let RunState::Running { progress, .. } = &s.state {
        out.push(progress.stats_line());
    }
    out.join("\n")
}

/// Print UI events to stdout until every sender is gone.
pub fn spawn_printer(rx: Receiver<UiEvent>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("clickloop-console".into())
        .spawn(move || {
            let stdout = io::stdout();
            for ev in rx.iter() {
                let mut out = stdout.lock();
                if writeln!(out, "{}", render(&ev)).is_err() {
                    break;
                }
                out.flush().ok();
            }
            debug!("console_printer_done");
        })
}

/// Forward stdin lines to the session. `Quit` is sent on end of input.
pub fn spawn_reader(tx: Sender<SessionEvent>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("clickloop-stdin".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match parse_line(&line) {
                    Ok(Input::Command(cmd)) => {
                        let quit = cmd == Command::Quit;
                        if tx.send(SessionEvent::Command(cmd)).is_err() || quit {
                            return;
                        }
                    }
                    Ok(Input::Help) => println!("{HELP}"),
                    Ok(Input::Blank) => {}
                    Err(msg) => eprintln!("{msg}"),
                }
            }
            tx.send(SessionEvent::Command(Command::Quit)).ok();
        })
}

/// Call `f` on the first stdin line (or end of input), from a helper thread.
pub fn on_first_line<F>(f: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name("clickloop-stdin".into())
        .spawn(move || {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line).ok();
            f();
        })
}
