//! Типы ошибок ядра симуляции

use thiserror::Error;

use crate::core::Tick;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Negative duration wait is invalid (wait length specified to be {0})")]
    NegativeDuration(Tick),

    #[error("EVT:{0} - Tried to schedule using a handle already in use")]
    HandleInUse(String),

    #[error("EVT:{manager} - Tried to {action} an event that could not be found")]
    EventNotFound { manager: String, action: &'static str },

    #[error("EVT:{0} - Tried to interrupt a process that is already active")]
    Reentrant(String),

    #[error("EVT:{0} - Process suspended outside of the event manager")]
    ForeignSuspend(String),

    /// Кооперативная отмена процесса. Не считается ошибкой и не попадает в
    /// обработчик ошибок.
    #[error("Process killed")]
    Killed,

    #[error("Process panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Process(#[from] anyhow::Error),

    #[error("Config error: {0}")]
    Config(#[from] ron::error::SpannedError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Simulation error: {0}")]
    SimulationError(String),
}

impl SimError {
    pub fn is_killed(&self) -> bool {
        matches!(self, SimError::Killed)
    }
}

impl From<String> for SimError {
    fn from(s: String) -> Self {
        SimError::SimulationError(s)
    }
}

impl From<&str> for SimError {
    fn from(s: &str) -> Self {
        SimError::SimulationError(s.to_string())
    }
}
