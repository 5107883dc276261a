//! Simulated backends and server link for headless runs.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info};

use vyabridge::{MediaElement, PlayRejection, ReadyState, ServerLink};

struct Playhead {
    base: f64,
    since: Option<Instant>,
}

/// Audio element whose every source lasts `media_duration` seconds and plays
/// in real time.
pub struct SimulatedAudio {
    src: Mutex<Option<String>>,
    head: Mutex<Playhead>,
    loaded: Mutex<bool>,
    media_duration: f64,
}

impl SimulatedAudio {
    pub fn new(media_duration: f64) -> Self {
        Self {
            src: Mutex::new(None),
            head: Mutex::new(Playhead {
                base: 0.0,
                since: None,
            }),
            loaded: Mutex::new(false),
            media_duration,
        }
    }

    fn position(&self, head: &Playhead) -> f64 {
        let running = head.since.map(|s| s.elapsed().as_secs_f64()).unwrap_or(0.0);
        (head.base + running).min(self.media_duration)
    }
}

#[async_trait]
impl MediaElement for SimulatedAudio {
    fn src(&self) -> Option<String> {
        self.src.lock().clone()
    }

    fn set_src(&self, src: &str) {
        *self.src.lock() = Some(src.to_string());
        *self.loaded.lock() = false;
        *self.head.lock() = Playhead {
            base: 0.0,
            since: None,
        };
    }

    fn load(&self) {
        *self.loaded.lock() = true;
        debug!(duration = self.media_duration, "[SIM AUDIO] metadata loaded");
    }

    async fn play(&self) -> Result<(), PlayRejection> {
        let mut head = self.head.lock();
        if head.since.is_none() {
            head.since = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&self) {
        let mut head = self.head.lock();
        head.base = self.position(&head);
        head.since = None;
    }

    fn paused(&self) -> bool {
        let head = self.head.lock();
        head.since.is_none() || self.position(&head) >= self.media_duration
    }

    fn current_time(&self) -> f64 {
        self.position(&self.head.lock())
    }

    fn set_current_time(&self, seconds: f64) {
        let mut head = self.head.lock();
        head.base = seconds.clamp(0.0, self.media_duration);
        if head.since.is_some() {
            head.since = Some(Instant::now());
        }
    }

    fn duration(&self) -> f64 {
        if *self.loaded.lock() {
            self.media_duration
        } else {
            f64::NAN
        }
    }

    fn ready_state(&self) -> ReadyState {
        if *self.loaded.lock() {
            ReadyState::HaveEnoughData
        } else {
            ReadyState::HaveNothing
        }
    }
}

/// Server link that only logs what would be sent.
pub struct LoggingServerLink;

impl LoggingServerLink {
    fn check_event(event: &str) -> vyabridge::Result<()> {
        if event.trim().is_empty() {
            return Err(vyabridge::Error::ServerLink("empty event name".to_string()));
        }
        Ok(())
    }
}

impl ServerLink for LoggingServerLink {
    fn push_event(&self, event: &str, payload: Value) -> vyabridge::Result<()> {
        Self::check_event(event)?;
        info!(event, %payload, "[SERVER] <- push");
        Ok(())
    }

    fn push_event_to(&self, target: &str, event: &str, payload: Value) -> vyabridge::Result<()> {
        Self::check_event(event)?;
        info!(to = target, event, %payload, "[SERVER] <- push");
        Ok(())
    }
}
