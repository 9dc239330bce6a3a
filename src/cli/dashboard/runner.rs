//! The dashboard loop: one task, fed by both operation channels, the
//! animation timer, terminal input and the operation's join handle.

use super::msg::DashboardMsg;
use super::state::{Command, DashboardState};
use super::view::{plain_line, render, DashboardStyle};
use crate::cli::logging;
use crate::domain::stack::{EngineEvent, ProgressMessage};
use crate::shared::error::OperationError;
use crossterm::cursor::{Hide, MoveToColumn, MoveUp, Show};
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::style::Print;
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode, Clear, ClearType};
use crossterm::{execute, queue};
use futures::{Stream, StreamExt};
use std::io::{stdout, Stdout, Write};
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The operation reported completion.
    Finished,
    /// The user pressed a key. The operation may still be running.
    Interrupted,
}

/// Input from the terminal, already reduced to what the dashboard cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalInput {
    Interrupt,
    Resize(usize),
}

/// Where frames go.
pub trait Surface {
    /// Show the initial or resized state.
    fn draw(&mut self, state: &DashboardState) -> anyhow::Result<()>;

    /// React to a message that has just been applied to `state`.
    fn on_message(&mut self, msg: &DashboardMsg, state: &DashboardState) -> anyhow::Result<()>;

    fn resize(&mut self, _width: usize) {}

    /// Show the last frame. Not called when the operation fails.
    fn finish(&mut self, state: &DashboardState) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub style: DashboardStyle,
    pub tick: Duration,
    pub plain: bool,
}

/// Run the dashboard until the operation completes, the user interrupts or
/// the operation fails. On failure the operation's error is returned and no
/// final frame is drawn.
pub async fn run(
    progress: mpsc::Receiver<ProgressMessage>,
    events: mpsc::Receiver<EngineEvent>,
    producer: JoinHandle<Result<(), OperationError>>,
    options: RunOptions,
) -> anyhow::Result<Outcome> {
    if options.plain {
        let interrupts: Pin<Box<dyn Stream<Item = TerminalInput>>> =
            Box::pin(futures::stream::once(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Failed to listen for Ctrl+C");
                    futures::future::pending::<()>().await;
                }
                TerminalInput::Interrupt
            }));
        let mut surface = PlainSurface;
        return drive(progress, events, producer, options.tick, interrupts, &mut surface).await;
    }

    let width = terminal::size().ok().map(|(w, _)| usize::from(w));
    let style = options.style.with_max_width(width);

    let _raw = RawModeGuard::enter()?;
    let keys = EventStream::new().filter_map(|event| async move {
        match event {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                Some(TerminalInput::Interrupt)
            }
            Ok(Event::Resize(w, _)) => Some(TerminalInput::Resize(usize::from(w))),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "Terminal event error");
                None
            }
        }
    });
    let mut surface = InlineSurface::new(style);
    drive(
        progress,
        events,
        producer,
        options.tick,
        Box::pin(keys),
        &mut surface,
    )
    .await
}

/// The loop itself, independent of any real terminal.
///
/// Each channel is listened to again only when the state asks for it, so a
/// terminal progress message stops progress intake. Order within a channel is
/// kept; order across channels is whatever `select!` picks.
pub async fn drive<I, S>(
    mut progress: mpsc::Receiver<ProgressMessage>,
    mut events: mpsc::Receiver<EngineEvent>,
    mut producer: JoinHandle<Result<(), OperationError>>,
    tick: Duration,
    mut input: I,
    surface: &mut S,
) -> anyhow::Result<Outcome>
where
    I: Stream<Item = TerminalInput> + Unpin,
    S: Surface + ?Sized,
{
    let mut state = DashboardState::new();
    let mut listen_progress = true;
    let mut listen_events = true;
    let mut input_open = true;
    let mut producer_done = false;

    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    surface.draw(&state)?;

    let outcome = loop {
        if producer_done && !listen_progress && !listen_events {
            debug!("Operation finished without a completion message");
            break Outcome::Finished;
        }

        let msg = tokio::select! {
            msg = progress.recv(), if listen_progress => {
                listen_progress = false;
                match msg {
                    Some(msg) => DashboardMsg::Progress(msg),
                    None => continue,
                }
            }
            event = events.recv(), if listen_events => {
                listen_events = false;
                match event {
                    Some(event) => DashboardMsg::Event(event),
                    None => continue,
                }
            }
            _ = ticker.tick() => DashboardMsg::Tick,
            input = input.next(), if input_open => match input {
                Some(TerminalInput::Interrupt) => DashboardMsg::Interrupt,
                Some(TerminalInput::Resize(width)) => {
                    surface.resize(width);
                    surface.draw(&state)?;
                    continue;
                }
                None => {
                    input_open = false;
                    continue;
                }
            },
            joined = &mut producer, if !producer_done => {
                producer_done = true;
                match joined {
                    Ok(Ok(())) => continue,
                    Ok(Err(e)) => return Err(e.into()),
                    Err(e) => return Err(anyhow::anyhow!("Operation task failed: {}", e)),
                }
            }
        };

        let interrupted = msg == DashboardMsg::Interrupt;
        let command = state.update(msg.clone());
        surface.on_message(&msg, &state)?;

        match command {
            Command::ListenEvents => listen_events = true,
            Command::ListenProgress => listen_progress = true,
            Command::Tick | Command::None => {}
            Command::Quit if interrupted => break Outcome::Interrupted,
            Command::Quit => break Outcome::Finished,
        }
    };

    if outcome == Outcome::Finished {
        if !producer_done {
            match producer.await {
                Ok(result) => result?,
                Err(e) => return Err(anyhow::anyhow!("Operation task failed: {}", e)),
            }
        }

        // The producer is done, so every event it sent is already buffered.
        while let Ok(event) = events.try_recv() {
            state.apply_event(event.clone());
            surface.on_message(&DashboardMsg::Event(event), &state)?;
        }
    }

    surface.finish(&state)?;
    Ok(outcome)
}

/// Redraws the frame in place below the cursor.
struct InlineSurface {
    style: DashboardStyle,
    out: Stdout,
    drawn_lines: usize,
}

impl InlineSurface {
    fn new(style: DashboardStyle) -> Self {
        Self {
            style,
            out: stdout(),
            drawn_lines: 0,
        }
    }

    fn redraw(&mut self, state: &DashboardState) -> anyhow::Result<()> {
        let frame = render(state, &self.style);
        if self.drawn_lines > 0 {
            let up = u16::try_from(self.drawn_lines).unwrap_or(u16::MAX);
            queue!(self.out, MoveToColumn(0), MoveUp(up))?;
        }
        queue!(
            self.out,
            Clear(ClearType::FromCursorDown),
            Print(frame.replace('\n', "\r\n"))
        )?;
        self.out.flush()?;
        self.drawn_lines = frame.matches('\n').count();
        Ok(())
    }
}

impl Surface for InlineSurface {
    fn draw(&mut self, state: &DashboardState) -> anyhow::Result<()> {
        self.redraw(state)
    }

    fn on_message(&mut self, _msg: &DashboardMsg, state: &DashboardState) -> anyhow::Result<()> {
        self.redraw(state)
    }

    fn resize(&mut self, width: usize) {
        self.style = self.style.clone().with_max_width(Some(width));
    }

    fn finish(&mut self, state: &DashboardState) -> anyhow::Result<()> {
        self.redraw(state)
    }
}

/// One line per step or resource transition, for pipes and CI logs.
struct PlainSurface;

impl Surface for PlainSurface {
    fn draw(&mut self, _state: &DashboardState) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_message(&mut self, msg: &DashboardMsg, _state: &DashboardState) -> anyhow::Result<()> {
        if let Some(line) = plain_line(msg) {
            println!("{}", line);
        }
        Ok(())
    }

    fn finish(&mut self, _state: &DashboardState) -> anyhow::Result<()> {
        Ok(())
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        logging::hold_stderr();
        let guard = Self;
        execute!(stdout(), Hide)?;
        Ok(guard)
    }

    fn restore(&self) {
        if let Err(e) = execute!(stdout(), Show) {
            debug!(error = %e, "Failed to show cursor");
        }
        if let Err(e) = disable_raw_mode() {
            warn!(error = %e, "Failed to restore terminal");
        }
        logging::release_stderr();
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        self.restore();
    }
}
