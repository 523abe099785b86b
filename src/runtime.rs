use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent};

/// Unified event type consumed by the session loop.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Where terminal input comes from. `next` blocks for at most `wait` and
/// returns None when nothing arrived, so the runner can turn the elapsed
/// wait into a clock tick.
pub trait EventFeed {
    fn next(&self, wait: Duration) -> Option<SessionEvent>;
}

/// Live input from crossterm. A reader thread forwards key and resize
/// events into a channel and exits once the feed is dropped.
pub struct TerminalFeed {
    rx: Receiver<SessionEvent>,
}

impl TerminalFeed {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) => tx.send(SessionEvent::Key(key)),
                Ok(CtEvent::Resize(_, _)) => tx.send(SessionEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl EventFeed for TerminalFeed {
    fn next(&self, wait: Duration) -> Option<SessionEvent> {
        match self.rx.recv_timeout(wait) {
            Ok(ev) => Some(ev),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                // keep the tick cadence alive after the reader dies
                std::thread::sleep(wait);
                None
            }
        }
    }
}

/// Scripted input for headless tests: whatever was queued on the channel.
pub struct ChannelFeed {
    rx: Receiver<SessionEvent>,
}

impl ChannelFeed {
    pub fn new(rx: Receiver<SessionEvent>) -> Self {
        Self { rx }
    }
}

impl EventFeed for ChannelFeed {
    fn next(&self, wait: Duration) -> Option<SessionEvent> {
        match self.rx.recv_timeout(wait) {
            Ok(ev) => Some(ev),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(wait);
                None
            }
        }
    }
}

/// Merges an input feed with a fixed-interval clock. Ticks are scheduled
/// against a deadline, so a burst of keystrokes cannot starve the
/// countdown: the deadline is not reset by incoming events.
pub struct Runner<F: EventFeed> {
    feed: F,
    interval: Duration,
    next_tick: Instant,
}

impl<F: EventFeed> Runner<F> {
    pub fn new(feed: F, interval: Duration) -> Self {
        Self {
            feed,
            interval,
            next_tick: Instant::now() + interval,
        }
    }

    /// An exam countdown decrements once per second.
    pub fn with_exam_clock(feed: F) -> Self {
        Self::new(feed, Duration::from_secs(1))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Return the next input event, or Tick once the current interval has
    /// fully elapsed.
    pub fn step(&mut self) -> SessionEvent {
        let now = Instant::now();
        if now >= self.next_tick {
            self.next_tick += self.interval;
            return SessionEvent::Tick;
        }

        match self.feed.next(self.next_tick - now) {
            Some(ev) => ev,
            None => {
                self.next_tick += self.interval;
                SessionEvent::Tick
            }
        }
    }
}
