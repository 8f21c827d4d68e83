//! Фасад симуляции поверх менеджера событий

use std::path::Path;

use serde_json::json;
use tracing::info;

use crate::config::EventManagerConfig;
use crate::core::{EventManager, ProcessTarget, Tick, TieBreak, DEFAULT_PRIORITY};
use crate::error::SimResult;

pub struct Simulator {
    manager: EventManager,
    config: EventManagerConfig,
}

impl Simulator {
    pub fn new() -> Self {
        Self::with_config(EventManagerConfig::default())
    }

    pub fn with_config(config: EventManagerConfig) -> Self {
        Self {
            manager: EventManager::from_config(&config),
            config,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> SimResult<Self> {
        Ok(Self::with_config(EventManagerConfig::from_file(path)?))
    }

    pub fn manager(&self) -> &EventManager {
        &self.manager
    }

    pub fn config(&self) -> &EventManagerConfig {
        &self.config
    }

    /// Планирует запуск процесса через `delay` секунд модельного времени
    pub fn load_process<T: ProcessTarget>(&self, delay: f64, target: T) -> SimResult<()> {
        let ticks = self.manager.seconds_to_nearest_tick(delay);
        self.manager
            .schedule_process(ticks, DEFAULT_PRIORITY, TieBreak::Fifo, target, None)
    }

    /// Прогон на `duration` секунд модельного времени от текущего момента
    pub async fn run(&self, duration: f64) -> SimResult<()> {
        let start = self.manager.current_tick();
        let end = start.saturating_add(self.manager.seconds_to_nearest_tick(duration));
        info!("Запуск симуляции на {} секунд", duration);
        self.run_until_tick(end).await
    }

    /// Прогон до горизонта из конфигурации, а без него до исчерпания событий
    pub async fn run_configured(&self) -> SimResult<()> {
        match self.config.run_to_seconds {
            Some(seconds) => {
                let end = self.manager.seconds_to_nearest_tick(seconds);
                self.run_until_tick(end).await
            }
            None => self.run_until_tick(Tick::MAX).await,
        }
    }

    pub async fn run_until_tick(&self, tick: Tick) -> SimResult<()> {
        self.manager.resume(tick).await;
        info!(
            "Симуляция завершена. Время: {:.3} с (тик {})",
            self.manager.sim_seconds(),
            self.manager.current_tick()
        );
        Ok(())
    }

    pub fn get_stats(&self) -> serde_json::Value {
        json!({
            "time": self.manager.sim_seconds(),
            "config": &self.config,
            "manager": self.manager.stats(),
        })
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}
