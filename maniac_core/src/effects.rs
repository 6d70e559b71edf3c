use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectEvent {
    Win,
    Lose,
    Tap,
    Crash,
}

impl EffectEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            EffectEvent::Win => "win",
            EffectEvent::Lose => "lose",
            EffectEvent::Tap => "tap",
            EffectEvent::Crash => "crash",
        }
    }
}

/// Fire-and-forget sink for sound, haptics and visuals. The engine never
/// waits on it and ignores whatever happens inside.
pub trait Effects: Send + Sync {
    fn notify(&self, event: EffectEvent);
}

pub struct NoEffects;

impl Effects for NoEffects {
    fn notify(&self, _event: EffectEvent) {}
}

/// Emits each notification as a tracing event.
#[derive(Debug, Default)]
pub struct TracingEffects {
    pub muted: bool,
}

impl Effects for TracingEffects {
    fn notify(&self, event: EffectEvent) {
        if !self.muted {
            info!(effect = event.as_str(), "effect");
        }
    }
}

/// Keeps every notification; clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingEffects {
    log: Arc<Mutex<Vec<EffectEvent>>>,
}

impl RecordingEffects {
    pub fn events(&self) -> Vec<EffectEvent> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Effects for RecordingEffects {
    fn notify(&self, event: EffectEvent) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
