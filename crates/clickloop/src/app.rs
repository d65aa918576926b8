//! Subcommand drivers.
//!
//! Every command that touches input builds the same pieces: the backend, the
//! session inbox, the console printer and the global listener. The session
//! then runs on the main thread until its command is done.

use std::{
    path::{Path, PathBuf},
    thread::JoinHandle,
};

use clickloop_engine::{
    Command, EventSink, GlobalListener, ListenerMode, Notifier, RunState, Session, SessionEvent,
    session_channel,
};
use config::{MacroStep, PlaybackMode, Role};
use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{info, warn};

use crate::{
    cli::{BindArgs, CheckArgs, PlayArgs, RunArgs},
    console,
    error::{Error, Result},
};

/// A session wired to a backend, the console and the global listener.
struct Shell {
    /// The coordinator, driven on this thread.
    session: Session,
    /// Inbox sender for helper threads.
    tx: Sender<SessionEvent>,
    /// Inbox.
    rx: Receiver<SessionEvent>,
    /// Console printer thread.
    printer: JoinHandle<()>,
    /// Capture thread; lives as long as the process.
    _listener: GlobalListener,
}

impl Shell {
    /// Load settings from `path`, open the backend and start capture.
    fn open(path: &Path, dry_run: bool) -> Result<Self> {
        let settings = config::load_or_default(path);
        let backend = inputkit::open(dry_run)?;
        info!(backend = backend.name(), path = %path.display(), "backend_opened");
        let (tx, rx) = session_channel();
        let (ui_tx, ui_rx) = unbounded();
        let printer = console::spawn_printer(ui_rx)?;
        let listener = GlobalListener::spawn(backend.clone(), EventSink::new(tx.clone()))?;
        let session = Session::new(backend, settings, Notifier::new(ui_tx), tx.clone())
            .with_settings_path(path.to_path_buf());
        Ok(Self {
            session,
            tx,
            rx,
            printer,
            _listener: listener,
        })
    }

    /// Stop any run, then wait for the console to drain.
    fn close(self) {
        let Self {
            mut session,
            printer,
            ..
        } = self;
        session.shutdown();
        drop(session);
        if printer.join().is_err() {
            warn!("console_printer_panicked");
        }
    }
}

/// `run`: the interactive session.
pub fn interactive(path: &Path, dry_run: bool, args: &RunArgs) -> Result<()> {
    let mut shell = Shell::open(path, dry_run)?;
    if let Some(mode) = args.mode {
        shell.session.set_mode(mode);
    }
    let hk = &shell.session.settings().hotkeys;
    println!(
        "clickloop: {} toggles, {} stops; type help for commands",
        hk.toggle.label(),
        hk.emergency.label()
    );
    console::spawn_reader(shell.tx.clone())?;
    if args.start {
        shell.session.handle(SessionEvent::Command(Command::Start(None)));
    }
    shell.session.run(&shell.rx);
    shell.close();
    Ok(())
}

/// `play`: one run, then exit.
pub fn play(path: &Path, dry_run: bool, args: &PlayArgs) -> Result<()> {
    let mut shell = Shell::open(path, dry_run)?;
    let mode: PlaybackMode = args.mode.unwrap_or(shell.session.settings().mode);
    console::spawn_reader(shell.tx.clone())?;
    if !shell.session.request_start(mode)? {
        shell.close();
        return Ok(());
    }
    shell.session.exit_after_run(true);
    shell.session.run(&shell.rx);
    let state = shell.session.state().clone();
    shell.close();
    match state {
        RunState::Failed(reason) => Err(Error::RunFailed(reason)),
        _ => Ok(()),
    }
}

/// `record`: capture a macro until a line arrives on stdin.
pub fn record(path: &Path, dry_run: bool) -> Result<()> {
    let mut shell = Shell::open(path, dry_run)?;
    if !shell.session.start_recording() {
        shell.close();
        return Ok(());
    }
    println!("Recording. Press Enter here to finish.");
    let tx = shell.tx.clone();
    console::on_first_line(move || {
        tx.send(SessionEvent::Command(Command::Quit)).ok();
    })?;
    shell.session.run(&shell.rx);

    // The Enter that ended the recording was captured too.
    let mut steps = shell.session.settings().macro_steps.clone();
    if trim_stop_key(&mut steps) {
        shell.session.set_macro(steps);
    }
    shell.session.stop_recording();
    shell.close();
    Ok(())
}

/// Drop a trailing `enter` key step and the delay before it. Returns whether
/// anything was removed.
fn trim_stop_key(steps: &mut Vec<MacroStep>) -> bool {
    let is_enter = matches!(
        steps.last(),
        Some(MacroStep::KeyPress { token }) if token.as_str() == "enter"
    );
    if !is_enter {
        return false;
    }
    steps.pop();
    if matches!(steps.last(), Some(MacroStep::Delay { .. })) {
        steps.pop();
    }
    true
}

/// `bind`: wait for one input and bind it to a role.
pub fn bind(path: &Path, dry_run: bool, args: &BindArgs) -> Result<()> {
    let role: Role = args.role;
    let mut shell = Shell::open(path, dry_run)?;
    if !shell.session.begin_assignment(role) {
        shell.close();
        return Ok(());
    }
    println!("Press the key or mouse button for {role} (type cancel to abort).");
    console::spawn_reader(shell.tx.clone())?;
    for ev in shell.rx.iter() {
        if !shell.session.handle(ev) || shell.session.listener_mode() == ListenerMode::Idle {
            break;
        }
    }
    shell.close();
    Ok(())
}

/// `check`: load strictly, validate, and report.
pub fn check(default_path: PathBuf, args: &CheckArgs) -> Result<()> {
    let path = args.path.clone().unwrap_or(default_path);
    if !path.exists() {
        println!("{}: not found; defaults apply", path.display());
    }
    let settings = config::load_from_path(&path)?;
    settings.validate()?;
    println!("{}: ok", path.display());
    println!(
        "  mode {} | {} steps | toggle {} | emergency {} | {}",
        settings.mode,
        settings.macro_steps.len(),
        settings.hotkeys.toggle.label(),
        settings.hotkeys.emergency.label(),
        settings.position_text()
    );
    if args.dump {
        println!("{}", config::to_json(&settings)?);
    }
    Ok(())
}
