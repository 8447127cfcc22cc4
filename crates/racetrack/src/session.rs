//! Interactive session: stdin commands, race events and redraws on one loop.
//!
//! ```text
//!   stdin-reader ──lines────┐
//!   EventBus ────progress───┤
//!   EventBus ────finished───┼──► select! ──► Session ──► RaceControl
//!   tick(100ms) ────────────┘                   │
//!                                               └──► race-waiter (await_completion)
//! ```
//!
//! The loop never blocks on a runner. Finishing a race is observed either
//! through the finish report or by polling the waiter thread, whichever
//! comes first.

use crate::cli::{CliError, Command};
use crate::render;
use crossbeam_channel::{never, select, tick, unbounded, Receiver};
use racetrack_core::{
    ChannelObserver, EventBus, RaceConfig, RaceControl, RaceCoordinator, RaceEvent,
    RaceObserver, RaceReport, Track,
};
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Board refresh period.
pub const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// A race that has been started and not yet collected.
struct LiveRace {
    race_id: u64,
    control: RaceControl,
    tracks: Vec<Arc<Track>>,
    waiter: JoinHandle<RaceReport>,
}

/// Front-end state.
pub struct Session {
    coordinator: Arc<RaceCoordinator>,
    observer: Arc<ChannelObserver>,
    events: Receiver<RaceEvent>,
    finished: Receiver<RaceReport>,
    race: Option<LiveRace>,
    auto: bool,
    ansi: bool,
    dirty: bool,
    quitting: bool,
}

impl Session {
    /// Builds a session whose coordinator reports into a fresh event bus.
    #[must_use]
    pub fn new(config: RaceConfig, auto: bool) -> Self {
        let bus = EventBus::new(config.event_capacity);
        let observer = Arc::new(bus.observer());
        let coordinator = Arc::new(RaceCoordinator::with_observer(
            config,
            Arc::clone(&observer) as Arc<dyn RaceObserver>,
        ));
        Self {
            coordinator,
            observer,
            events: bus.receiver(),
            finished: bus.finished(),
            race: None,
            auto,
            ansi: io::stdout().is_terminal(),
            dirty: false,
            quitting: false,
        }
    }

    /// Runs until `quit`, end of input with no race left, or the end of the
    /// single race in auto mode.
    ///
    /// # Errors
    ///
    /// [`CliError::Io`] if the stdin thread cannot be spawned or stdout fails,
    /// [`CliError::Race`] if the auto-mode race cannot start.
    pub fn run(mut self) -> Result<(), CliError> {
        let mut commands = if self.auto {
            never()
        } else {
            println!("{}", crate::cli::USAGE);
            spawn_stdin_reader()?
        };
        let mut input_closed = self.auto;
        let events = self.events.clone();
        let finished = self.finished.clone();
        let ticker = tick(REDRAW_INTERVAL);

        if self.auto {
            self.start()?;
        }

        loop {
            let mut eof = false;
            select! {
                recv(commands) -> line => match line {
                    Ok(line) if line.trim().is_empty() => {}
                    Ok(line) => match line.parse::<Command>() {
                        Ok(command) => self.apply(command)?,
                        Err(e) => println!("{e}"),
                    },
                    Err(_) => eof = true,
                },
                recv(events) -> event => match event {
                    Ok(_) => self.dirty = true,
                    Err(_) => {
                        warn!("event bus closed");
                        break;
                    }
                },
                recv(finished) -> report => {
                    if let Ok(report) = report {
                        if self.race.as_ref().is_some_and(|r| r.race_id == report.race_id) {
                            self.collect()?;
                        }
                    }
                },
                recv(ticker) -> _ => {
                    if self.race.as_ref().is_some_and(|r| r.waiter.is_finished()) {
                        self.collect()?;
                    } else if self.dirty {
                        self.redraw()?;
                    }
                },
            }

            if eof {
                debug!("stdin closed");
                commands = never();
                input_closed = true;
            }
            if self.race.is_none() && (self.quitting || input_closed) {
                break;
            }
        }

        let dropped = self.observer.dropped();
        if dropped > 0 {
            debug!(dropped, "progress events dropped over the session");
        }
        Ok(())
    }

    fn apply(&mut self, command: Command) -> Result<(), CliError> {
        debug!(?command, "command");
        match command {
            Command::Start => self.start()?,
            Command::Pause => match &self.race {
                Some(race) => {
                    race.control.pause();
                    println!("race paused");
                }
                None => println!("no race running"),
            },
            Command::Resume => match &self.race {
                Some(race) => {
                    race.control.resume();
                    println!("race resumed");
                }
                None => println!("no race running"),
            },
            Command::Cancel(lane) => match (&self.race, lane) {
                (None, _) => println!("no race running"),
                (Some(race), None) => {
                    race.control.cancel();
                    println!("cancelling race {}", race.race_id);
                }
                (Some(race), Some(lane)) => match race.control.cancel_lane(lane) {
                    Ok(()) => println!("cancelling runner-{lane}"),
                    Err(e) => println!("{e}"),
                },
            },
            Command::Status => self.redraw()?,
            Command::Quit => {
                self.quitting = true;
                if let Some(race) = &self.race {
                    race.control.cancel();
                }
            }
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), CliError> {
        if let Some(race) = &self.race {
            println!("race {} is still running", race.race_id);
            return Ok(());
        }

        let handle = self.coordinator.start_configured()?;
        let race_id = handle.race_id();
        let control = handle.control();
        let tracks = handle.tracks().to_vec();

        // On spawn failure the handle drops with the closure, which cancels and joins it.
        let coordinator = Arc::clone(&self.coordinator);
        let waiter = thread::Builder::new()
            .name("race-waiter".to_string())
            .spawn(move || coordinator.await_completion(handle))?;

        info!(race = race_id, lanes = tracks.len(), "race running");
        self.race = Some(LiveRace {
            race_id,
            control,
            tracks,
            waiter,
        });
        self.redraw()
    }

    /// Joins the waiter of the live race and prints the outcome.
    fn collect(&mut self) -> Result<(), CliError> {
        let Some(race) = self.race.take() else {
            return Ok(());
        };
        let board = render::board(&race.tracks, false);
        match race.waiter.join() {
            Ok(report) => {
                self.print(&board)?;
                let mut out = io::stdout().lock();
                write!(out, "{}", render::results(&report))?;
                out.flush()?;
            }
            Err(_) => {
                error!(race = race.race_id, "race aborted by a runner panic");
                println!("race {} aborted", race.race_id);
            }
        }
        self.dirty = false;
        Ok(())
    }

    fn redraw(&mut self) -> Result<(), CliError> {
        self.dirty = false;
        match &self.race {
            Some(race) => {
                let board = render::board(&race.tracks, self.coordinator.is_paused());
                self.print(&board)
            }
            None => {
                println!("no race running");
                Ok(())
            }
        }
    }

    fn print(&self, board: &str) -> Result<(), CliError> {
        let mut out = io::stdout().lock();
        if self.ansi {
            out.write_all(CLEAR_SCREEN.as_bytes())?;
        }
        out.write_all(board.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

/// Forwards stdin lines until end of input. The channel disconnects on EOF.
fn spawn_stdin_reader() -> Result<Receiver<String>, CliError> {
    let (sender, receiver) = unbounded();
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if sender.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(receiver)
}
