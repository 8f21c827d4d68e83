//! Слушатели времени, ошибок и трассировки планировщика.
//!
//! Слушатели времени и трассировки вызываются под блокировкой планировщика и
//! не должны обращаться к нему обратно. Слушатель ошибок вызывается после
//! освобождения блокировки.

use tracing::{error, trace};

use super::event::EventInfo;
use super::manager::EventManager;
use super::time::Tick;
use crate::error::SimError;

pub trait EventTimeListener: Send + Sync {
    fn tick_update(&self, tick: Tick);
    fn time_running(&self, running: bool);
}

pub trait EventErrorListener: Send + Sync {
    fn handle_error(&self, manager: &EventManager, error: &SimError, tick: Tick);
}

/// Трассировка каждого решения планировщика в порядке их принятия
#[allow(unused_variables)]
pub trait EventTraceListener: Send + Sync {
    fn trace_event(&self, current_tick: Tick, event: &EventInfo) {}
    fn trace_wait(&self, current_tick: Tick, event: &EventInfo) {}
    fn trace_wait_until(&self, current_tick: Tick) {}
    fn trace_wait_until_ended(&self, current_tick: Tick, event: &EventInfo) {}
    fn trace_kill(&self, current_tick: Tick, event: &EventInfo) {}
    fn trace_interrupt(&self, current_tick: Tick, event: &EventInfo) {}
    fn trace_process_start(&self, current_tick: Tick, target: &str) {}
    fn trace_process_end(&self, current_tick: Tick) {}
    fn trace_sched_process(&self, current_tick: Tick, event: &EventInfo) {}
}

#[derive(Debug, Default)]
pub struct DefaultTimeListener;

impl EventTimeListener for DefaultTimeListener {
    fn tick_update(&self, _tick: Tick) {}
    fn time_running(&self, _running: bool) {}
}

/// Пишет ошибки процессов в лог
#[derive(Debug, Default)]
pub struct DefaultErrorListener;

impl EventErrorListener for DefaultErrorListener {
    fn handle_error(&self, manager: &EventManager, err: &SimError, tick: Tick) {
        error!("EVT:{} - ошибка процесса на тике {}: {}", manager, tick, err);
    }
}

/// Трассировка решений в `tracing` на уровне TRACE
#[derive(Debug, Default)]
pub struct TracingTraceListener;

impl EventTraceListener for TracingTraceListener {
    fn trace_event(&self, current_tick: Tick, event: &EventInfo) {
        trace!(tick = current_tick, prio = event.priority, "событие {}", event.target);
    }

    fn trace_wait(&self, current_tick: Tick, event: &EventInfo) {
        trace!(tick = current_tick, until = event.tick, "ожидание {}", event.target);
    }

    fn trace_wait_until(&self, current_tick: Tick) {
        trace!(tick = current_tick, "условное ожидание");
    }

    fn trace_wait_until_ended(&self, current_tick: Tick, event: &EventInfo) {
        trace!(tick = current_tick, "условие выполнено: {}", event.target);
    }

    fn trace_kill(&self, current_tick: Tick, event: &EventInfo) {
        trace!(tick = current_tick, at = event.tick, "отмена {}", event.target);
    }

    fn trace_interrupt(&self, current_tick: Tick, event: &EventInfo) {
        trace!(tick = current_tick, at = event.tick, "прерывание {}", event.target);
    }

    fn trace_process_start(&self, current_tick: Tick, target: &str) {
        trace!(tick = current_tick, "запуск процесса {}", target);
    }

    fn trace_process_end(&self, current_tick: Tick) {
        trace!(tick = current_tick, "процесс завершен");
    }

    fn trace_sched_process(&self, current_tick: Tick, event: &EventInfo) {
        trace!(tick = current_tick, at = event.tick, "запланирован {}", event.target);
    }
}
