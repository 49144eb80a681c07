use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderAction {
    Start,
    Stop,
    /// Reading or replacing steps (save, load, export).
    Edit,
}

pub struct RecorderState {
    state: SessionState,
}

impl RecorderState {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    pub fn current_state(&self) -> SessionState {
        self.state
    }

    fn transition(
        &mut self,
        allowed: &[SessionState],
        to: SessionState,
        action: RecorderAction,
    ) -> Result<(), Error> {
        if allowed.contains(&self.state) {
            self.state = to;
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    pub fn start(&mut self) -> Result<(), Error> {
        self.transition(
            &[SessionState::Idle, SessionState::Stopped],
            SessionState::Recording,
            RecorderAction::Start,
        )
    }

    pub fn stop(&mut self) -> Result<(), Error> {
        self.transition(
            &[SessionState::Recording],
            SessionState::Stopped,
            RecorderAction::Stop,
        )
    }

    /// `stop` is only valid while recording. Checked before the worker is
    /// joined; the transition itself happens after.
    pub fn ensure_recording(&self) -> Result<(), Error> {
        if self.state != SessionState::Recording {
            return Err(Error::InvalidTransition {
                from: self.state,
                action: RecorderAction::Stop,
            });
        }
        Ok(())
    }

    /// Steps may only be read or replaced while no capture is running.
    pub fn ensure_editable(&self) -> Result<(), Error> {
        if self.state == SessionState::Recording {
            return Err(Error::InvalidTransition {
                from: self.state,
                action: RecorderAction::Edit,
            });
        }
        Ok(())
    }

    /// Force back to idle (discard, or a start that failed half-way).
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
    }
}

impl Default for RecorderState {
    fn default() -> Self {
        Self::new()
    }
}
