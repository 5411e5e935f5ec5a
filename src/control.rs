//! Page → worker control channel and the worker-side state it acts on.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Legacy form of [`ControlMessage::Stop`], a bare string.
pub const STOP: &str = "stop";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    Stop,
}

impl ControlMessage {
    /// Accepts the tagged JSON form or the legacy bare string.
    pub fn parse(text: &str) -> Result<Self> {
        if text == STOP {
            return Ok(ControlMessage::Stop);
        }
        serde_json::from_str(text).map_err(|_| Error::UnknownMessage(text.to_string()))
    }
}

/// State owned by one worker instance.
#[derive(Debug, Default)]
pub struct WorkerState {
    interval: Option<i32>,
}

impl WorkerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers a timer so a later `stop` can cancel it. Returns the handle
    /// that was replaced, which the caller must clear.
    pub fn set_interval(&mut self, handle: i32) -> Option<i32> {
        self.interval.replace(handle)
    }

    pub fn interval(&self) -> Option<i32> {
        self.interval
    }

    /// Applies a control message. Returns the timer handle the host has to
    /// clear, if any; a second `stop` is a no-op.
    pub fn apply(&mut self, message: ControlMessage) -> Option<i32> {
        match message {
            ControlMessage::Stop => self.interval.take(),
        }
    }
}
