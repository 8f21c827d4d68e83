//! Контекст исполнения, который планировщик передает каждой единице работы.
//!
//! Все примитивы приостановки устроены одинаково: синхронная регистрация под
//! блокировкой планировщика, затем однократная уступка управления. Планировщик
//! опрашивает фьючерсы с пустым будильником, поэтому остановленный контекст
//! продолжается только тогда, когда планировщик сам выберет его.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::event::{Priority, TieBreak};
use super::handle::{ConditionalHandle, EventHandle};
use super::manager::EventManager;
use super::process::{ProcessId, ProcessTarget};
use super::time::Tick;
use crate::error::SimResult;

/// Однократная уступка управления планировщику
struct Suspend {
    yielded: bool,
}

impl Future for Suspend {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            Poll::Pending
        }
    }
}

fn suspend() -> Suspend {
    Suspend { yielded: false }
}

/// Явная ссылка на исполняющийся контекст и его планировщик.
///
/// Пользоваться им можно только изнутри собственной единицы работы: примитивы
/// приостановки, вызванные из чужого кода, возвращают
/// [`SimError::ForeignSuspend`](crate::SimError::ForeignSuspend).
#[derive(Clone)]
pub struct Process {
    manager: EventManager,
    id: ProcessId,
}

impl Process {
    pub(crate) fn new(manager: EventManager, id: ProcessId) -> Self {
        Self { manager, id }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn manager(&self) -> &EventManager {
        &self.manager
    }

    pub fn current_tick(&self) -> Tick {
        self.manager.current_tick()
    }

    pub fn sim_seconds(&self) -> f64 {
        self.manager.sim_seconds()
    }

    /// Отменен ли этот контекст
    pub fn is_killed(&self) -> bool {
        self.manager.is_killed(self.id)
    }

    /// Приостанавливает контекст на `ticks` тиков
    pub async fn wait_ticks(
        &self,
        ticks: Tick,
        priority: Priority,
        tie_break: TieBreak,
        handle: Option<&EventHandle>,
    ) -> SimResult<()> {
        self.manager
            .register_wait(self.id, ticks, priority, tie_break, handle)?;
        suspend().await;
        self.manager.check_alive(self.id)
    }

    /// Ожидание в секундах модельного времени, в порядке планирования
    pub async fn wait_seconds(&self, seconds: f64, priority: Priority) -> SimResult<()> {
        let ticks = self.manager.seconds_to_nearest_tick(seconds);
        self.wait_ticks(ticks, priority, TieBreak::Fifo, None).await
    }

    /// Планирует новую единицу работы, не приостанавливая текущую
    pub fn schedule_process<T: ProcessTarget>(
        &self,
        ticks: Tick,
        priority: Priority,
        tie_break: TieBreak,
        target: T,
        handle: Option<&EventHandle>,
    ) -> SimResult<()> {
        self.manager.audit_wait_until(self.id);
        self.manager
            .schedule_process(ticks, priority, tie_break, target, handle)
    }

    /// Запускает цель немедленно; текущий контекст продолжится, когда новый
    /// завершится или остановится
    pub async fn start_process<T: ProcessTarget>(&self, target: T) -> SimResult<()> {
        self.manager.register_start(self.id, Box::new(target))?;
        suspend().await;
        self.manager.check_alive(self.id)
    }

    /// Регистрирует контекст в списке условных ожиданий и останавливает его.
    ///
    /// Контекст будет возобновляться перед каждым продвижением часов, чтобы
    /// перепроверить условие. Когда условие выполнено, нужно вызвать
    /// [`end_wait_until`](Self::end_wait_until).
    pub async fn wait_until(&self, handle: Option<&ConditionalHandle>) -> SimResult<()> {
        self.manager.register_wait_until(self.id, handle)?;
        suspend().await;
        self.manager.check_alive(self.id)
    }

    /// Снимает условное ожидание. Продолжение выполнится на текущем тике
    /// раньше любого продвижения часов.
    pub async fn end_wait_until(&self) -> SimResult<()> {
        if !self.manager.register_end_wait_until(self.id)? {
            return Ok(());
        }
        suspend().await;
        self.manager.check_alive(self.id)
    }

    /// Ждет, пока `condition` не станет истинным
    pub async fn wait_until_condition<F>(
        &self,
        mut condition: F,
        handle: Option<&ConditionalHandle>,
    ) -> SimResult<()>
    where
        F: FnMut() -> bool + Send,
    {
        while !condition() {
            self.wait_until(handle).await?;
        }
        self.end_wait_until().await
    }

    pub fn kill_event(&self, handle: &EventHandle) -> SimResult<()> {
        self.manager.kill_event_from(Some(self.id), handle)
    }

    pub fn kill_wait_until(&self, handle: &ConditionalHandle) -> SimResult<()> {
        self.manager.kill_wait_until_from(Some(self.id), handle)
    }

    /// Снимает событие с очереди и исполняет его цель прямо сейчас.
    /// Текущий контекст продолжится после того, как цель завершится или
    /// остановится.
    pub async fn interrupt_event(&self, handle: &EventHandle) -> SimResult<()> {
        if !self.manager.register_interrupt_event(self.id, handle)? {
            return Ok(());
        }
        suspend().await;
        self.manager.check_alive(self.id)
    }

    /// Немедленно возобновляет условное ожидание для перепроверки условия.
    ///
    /// Ожидающий контекст исполняется на месте вызова; он не должен сам
    /// прерывать вызывающего, иначе оба останутся остановленными.
    pub async fn interrupt_wait_until(&self, handle: &ConditionalHandle) -> SimResult<()> {
        if !self.manager.register_interrupt_wait_until(self.id, handle)? {
            return Ok(());
        }
        suspend().await;
        self.manager.check_alive(self.id)
    }
}
