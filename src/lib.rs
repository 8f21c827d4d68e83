//! simkernel - ядро дискретно-событийного моделирования на Rust.
//!
//! Единицы работы ([`ProcessTarget`]) исполняются по одной под управлением
//! [`EventManager`] и приостанавливаются только через явный контекст
//! [`Process`]: ожидание на число тиков, условное ожидание, немедленный запуск
//! дочерней работы и прерывание чужих ожиданий.

pub mod config;
pub mod core;
pub mod error;

mod simulator;
pub use simulator::Simulator;

pub use config::EventManagerConfig;
pub use crate::core::{
    named, ConditionalHandle, EventHandle, EventManager, Priority, Process, ProcessTarget,
    TieBreak, Tick,
};
pub use error::{SimError, SimResult};

pub mod prelude {
    pub use crate::core::{
        named, ConditionalHandle, EventHandle, EventManager, Priority, Process, ProcessTarget,
        TieBreak, Tick, DEFAULT_PRIORITY,
    };
    pub use crate::EventManagerConfig;
    pub use crate::Simulator;
    pub use crate::{SimError, SimResult};
}
