//! Управление временем симуляции

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Дискретная единица модельного времени
pub type Tick = i64;

/// Предельный тик: сюда "прилипают" события при переполнении
pub const MAX_TICK: Tick = Tick::MAX;

/// Тиков в секунде по умолчанию
pub const DEFAULT_TICKS_PER_SECOND: f64 = 1_000_000.0;

/// Время события с учетом переполнения.
///
/// Отрицательная задержка считается ошибкой использования, переполнение насыщается до
/// [`MAX_TICK`] и никогда не уходит в отрицательные значения.
pub fn event_time(current: Tick, delay: Tick) -> SimResult<Tick> {
    if delay < 0 {
        return Err(SimError::NegativeDuration(delay));
    }
    Ok(current.saturating_add(delay))
}

/// Масштаб перевода тиков в секунды и обратно
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeScale {
    ticks_per_second: f64,
    secs_per_tick: f64,
}

impl TimeScale {
    pub fn new(ticks_per_second: f64) -> Self {
        Self {
            ticks_per_second,
            secs_per_tick: 1.0 / ticks_per_second,
        }
    }

    /// Масштаб, заданный числом тиков в модельном часе
    pub fn from_ticks_per_hour(scale: f64) -> Self {
        Self {
            ticks_per_second: scale / 3600.0,
            secs_per_tick: 3600.0 / scale,
        }
    }

    pub fn ticks_per_second(&self) -> f64 {
        self.ticks_per_second
    }

    /// Секунды, округленные до ближайшего тика (с насыщением)
    pub fn seconds_to_nearest_tick(&self, seconds: f64) -> Tick {
        (seconds * self.ticks_per_second).round() as Tick
    }

    pub fn ticks_to_seconds(&self, ticks: Tick) -> f64 {
        ticks as f64 * self.secs_per_tick
    }
}

impl Default for TimeScale {
    fn default() -> Self {
        Self::new(DEFAULT_TICKS_PER_SECOND)
    }
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ticks/s", self.ticks_per_second)
    }
}
