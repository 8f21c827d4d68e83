//! Конфигурация менеджера событий (формат RON)

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::DEFAULT_TICKS_PER_SECOND;
use crate::error::SimResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventManagerConfig {
    pub name: String,
    pub ticks_per_second: f64,
    /// Ограничивать ли ход модельного времени настенными часами
    pub real_time: bool,
    /// Модельных секунд на секунду настенных часов
    pub real_time_factor: f64,
    /// Горизонт прогона по умолчанию для [`Simulator`](crate::Simulator)
    pub run_to_seconds: Option<f64>,
}

impl Default for EventManagerConfig {
    fn default() -> Self {
        Self {
            name: "main".to_string(),
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            real_time: false,
            real_time_factor: 1.0,
            run_to_seconds: None,
        }
    }
}

impl EventManagerConfig {
    pub fn from_ron_str(text: &str) -> SimResult<Self> {
        Ok(ron::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> SimResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }
}
