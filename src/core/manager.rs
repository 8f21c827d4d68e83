//! Планировщик событий: часы, индекс событий, условные ожидания и цикл
//! диспетчеризации.
//!
//! Все изменения состояния происходят под одной блокировкой. Единицы работы
//! исполняются без нее, но всегда по одной: их опрашивает только тот, кто
//! владеет циклом.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::task::noop_waker_ref;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::context::Process;
use super::event::{Event, EventInfo, EventKey, EventTarget, Priority, TieBreak, WAIT_UNTIL_PRIORITY};
use super::handle::{ConditionalHandle, EventHandle};
use super::listener::{
    DefaultErrorListener, DefaultTimeListener, EventErrorListener, EventTimeListener,
    EventTraceListener,
};
use super::process::{Body, ProcessFuture, ProcessId, ProcessPool, ProcessSlot, ProcessTarget};
use super::time::{event_time, Tick, TimeScale, MAX_TICK};
use super::tree::EventTree;
use crate::config::EventManagerConfig;
use crate::error::{SimError, SimResult};

/// Пауза цикла, когда он обогнал настенные часы
pub const REAL_TIME_POLL: Duration = Duration::from_millis(20);

struct ManagerState {
    tree: EventTree,
    pool: ProcessPool,
    // Списки всегда одной длины и выровнены по индексу
    conditional_list: Vec<ProcessId>,
    conditional_handles: Vec<Option<ConditionalHandle>>,

    current_tick: Tick,
    /// Ближайший тик, для которого условия уже проверены
    next_tick: Tick,
    target_tick: Tick,
    loop_running: bool,
    seq: u64,
    scale: TimeScale,

    execute_real_time: bool,
    real_time_factor: f64,
    rebase_real_time: bool,
    real_time_tick: Tick,
    real_time_instant: Option<Instant>,

    time_listener: Arc<dyn EventTimeListener>,
    error_listener: Arc<dyn EventErrorListener>,
    trace_listener: Option<Arc<dyn EventTraceListener>>,
}

impl ManagerState {
    fn new() -> Self {
        Self {
            tree: EventTree::new(),
            pool: ProcessPool::new(),
            conditional_list: Vec::new(),
            conditional_handles: Vec::new(),
            current_tick: 0,
            next_tick: 0,
            target_tick: MAX_TICK,
            loop_running: false,
            seq: 0,
            scale: TimeScale::default(),
            execute_real_time: false,
            real_time_factor: 1.0,
            rebase_real_time: true,
            real_time_tick: 0,
            real_time_instant: None,
            time_listener: Arc::new(DefaultTimeListener),
            error_listener: Arc::new(DefaultErrorListener),
            trace_listener: None,
        }
    }

    fn trace<F: FnOnce(&dyn EventTraceListener)>(&self, f: F) {
        if let Some(listener) = &self.trace_listener {
            f(listener.as_ref());
        }
    }

    fn insert_event(
        &mut self,
        manager: &str,
        ticks: Tick,
        priority: Priority,
        tie_break: TieBreak,
        target: EventTarget,
        handle: Option<&EventHandle>,
    ) -> SimResult<Option<EventInfo>> {
        let tick = event_time(self.current_tick, ticks)?;
        self.seq += 1;
        let seq = self.seq;
        let mut event = Event::new(seq, target);
        if let Some(handle) = handle {
            if !handle.bind(EventKey { tick, priority, seq }) {
                return Err(SimError::HandleInUse(manager.to_string()));
            }
            event.handle = Some(handle.clone());
        }
        let info = self
            .trace_listener
            .as_ref()
            .map(|_| EventInfo::of(tick, priority, &event));
        self.tree.insert(tick, priority, event, tie_break);
        Ok(info)
    }

    /// Слот контекста, который сейчас исполняется и вправе приостановиться
    fn active_slot(&mut self, manager: &str, id: ProcessId) -> SimResult<&mut ProcessSlot> {
        let slot = self.pool.get_mut(id).ok_or(SimError::Killed)?;
        if slot.killed {
            return Err(SimError::Killed);
        }
        if slot.body.is_some() {
            return Err(SimError::ForeignSuspend(manager.to_string()));
        }
        Ok(slot)
    }

    fn park(&mut self, id: ProcessId) {
        if let Some(slot) = self.pool.get_mut(id) {
            slot.parked = true;
        }
    }

    /// Контекст остановлен и может быть возобновлен планировщиком
    fn is_parked(&self, id: ProcessId) -> bool {
        self.pool
            .get(id)
            .map_or(false, |slot| slot.parked && slot.body.is_some())
    }

    fn audit_wait_until(&self, manager: &str, id: ProcessId) {
        if let Some(slot) = self.pool.get(id) {
            if slot.cond_wait {
                warn!(
                    "AUDIT - wait_until без end_wait_until: процесс {} ({}) в {}",
                    slot.name, id, manager
                );
            }
        }
    }

    fn conditional_index(&self, id: ProcessId) -> Option<usize> {
        self.conditional_list.iter().position(|p| *p == id)
    }

    fn deregister_conditional(&mut self, id: ProcessId) -> bool {
        let Some(index) = self.conditional_index(id) else {
            return false;
        };
        self.conditional_list.remove(index);
        if let Some(handle) = self.conditional_handles.remove(index) {
            handle.unbind();
        }
        if let Some(slot) = self.pool.get_mut(id) {
            slot.cond_wait = false;
        }
        true
    }

    /// Остановленный контекст уничтожается сразу, исполняющийся только
    /// помечается и увидит отмену на следующей приостановке
    fn kill_process(&mut self, id: ProcessId, graveyard: &mut Vec<Body>) {
        let Some(slot) = self.pool.get_mut(id) else {
            return;
        };
        slot.killed = true;
        if slot.body.is_none() {
            return;
        }
        self.deregister_conditional(id);
        graveyard.extend(self.pool.release(id));
    }

    /// Передает управление `target`, вызывающий продолжит после него
    fn hand_off(&mut self, caller: ProcessId, target: ProcessId) {
        if let Some(slot) = self.pool.get_mut(target) {
            slot.successor = Some(caller);
        }
        if let Some(slot) = self.pool.get_mut(caller) {
            slot.handoff = Some(target);
        }
    }

    fn spawn_slot(&mut self, target: Box<dyn ProcessTarget>) -> ProcessId {
        let id = self.pool.allocate(target.describe());
        if let Some(slot) = self.pool.get_mut(id) {
            slot.body = Some(Body::Pending(target));
        }
        id
    }

    fn stop_loop(&mut self) {
        self.loop_running = false;
        self.time_listener.time_running(false);
    }

    fn advance_to(&mut self, tick: Tick) {
        self.current_tick = tick;
        self.time_listener.tick_update(tick);
    }

    /// Тик, до которого разрешено дойти по настенным часам
    fn real_time_tick(&mut self) -> Tick {
        let now = Instant::now();
        let base = match self.real_time_instant {
            Some(instant) if !self.rebase_real_time => instant,
            _ => {
                self.real_time_tick = self.current_tick;
                self.real_time_instant = Some(now);
                self.rebase_real_time = false;
                now
            }
        };
        let elapsed = now.duration_since(base).as_secs_f64();
        let budget = self
            .scale
            .seconds_to_nearest_tick(elapsed * self.real_time_factor);
        self.real_time_tick.saturating_add(budget)
    }
}

enum Step {
    Stop,
    Run(ProcessId),
    Evaluate(Vec<ProcessId>),
    Pace,
    Advance,
}

struct Shared {
    name: String,
    execute_events: AtomicBool,
    state: Mutex<ManagerState>,
}

/// Менеджер событий. Клоны разделяют одно состояние.
#[derive(Clone)]
pub struct EventManager {
    shared: Arc<Shared>,
}

/// Снимает флаг работающего цикла, если фьючерс бросили до остановки
struct LoopGuard<'a> {
    manager: &'a EventManager,
    stopped: bool,
}

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        if !self.stopped {
            self.manager.lock().stop_loop();
        }
    }
}

impl EventManager {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                execute_events: AtomicBool::new(false),
                state: Mutex::new(ManagerState::new()),
            }),
        }
    }

    pub fn from_config(config: &EventManagerConfig) -> Self {
        let manager = Self::new(config.name.clone());
        manager.set_ticks_per_second(config.ticks_per_second);
        manager.set_execute_real_time(config.real_time, config.real_time_factor);
        manager
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Устанавливает слушателя времени и сразу сообщает ему текущий тик
    pub fn set_time_listener(&self, listener: Option<Arc<dyn EventTimeListener>>) {
        let mut st = self.lock();
        st.time_listener = listener.unwrap_or_else(|| Arc::new(DefaultTimeListener));
        let tick = st.current_tick;
        st.time_listener.tick_update(tick);
    }

    pub fn set_error_listener(&self, listener: Option<Arc<dyn EventErrorListener>>) {
        self.lock().error_listener = listener.unwrap_or_else(|| Arc::new(DefaultErrorListener));
    }

    pub fn set_trace_listener(&self, listener: Option<Arc<dyn EventTraceListener>>) {
        self.lock().trace_listener = listener;
    }

    /// Полный сброс: часы в ноль, все ожидающие события и условные ожидания
    /// отменяются вместе с их контекстами
    pub fn clear(&self) {
        let mut graveyard = Vec::new();
        {
            let mut st = self.lock();
            st.current_tick = 0;
            st.next_tick = 0;
            st.target_tick = MAX_TICK;
            st.time_listener.tick_update(0);
            st.rebase_real_time = true;

            for event in st.tree.reset() {
                if let Some(handle) = &event.handle {
                    handle.unbind();
                }
                match event.target {
                    EventTarget::Wait(id) => st.kill_process(id, &mut graveyard),
                    EventTarget::Spawn(target) => graveyard.push(Body::Pending(target)),
                }
            }

            let waiters = std::mem::take(&mut st.conditional_list);
            let handles = std::mem::take(&mut st.conditional_handles);
            for (id, handle) in waiters.into_iter().zip(handles) {
                if let Some(handle) = handle {
                    handle.unbind();
                }
                if let Some(slot) = st.pool.get_mut(id) {
                    slot.cond_wait = false;
                }
                st.kill_process(id, &mut graveyard);
            }
        }
        info!("EVT:{} - сброс, отменено контекстов: {}", self, graveyard.len());
    }

    pub fn current_tick(&self) -> Tick {
        self.lock().current_tick
    }

    pub fn target_tick(&self) -> Tick {
        self.lock().target_tick
    }

    pub fn sim_seconds(&self) -> f64 {
        let st = self.lock();
        st.scale.ticks_to_seconds(st.current_tick)
    }

    /// Крутится ли сейчас цикл диспетчеризации
    pub fn is_running(&self) -> bool {
        self.lock().loop_running
    }

    pub fn pending_event_count(&self) -> usize {
        self.lock().tree.event_count()
    }

    pub fn conditional_waiter_count(&self) -> usize {
        self.lock().conditional_list.len()
    }

    /// Ожидающие события в порядке срабатывания
    pub fn pending_events(&self) -> Vec<EventInfo> {
        let st = self.lock();
        let mut events = Vec::with_capacity(st.tree.event_count());
        st.tree.visit_all_nodes(|node| {
            events.extend(
                node.events()
                    .map(|e| EventInfo::of(node.tick(), node.priority(), e)),
            );
        });
        events
    }

    /// Масштаб времени в тиках на модельный час
    pub fn set_sim_time_scale(&self, ticks_per_hour: f64) {
        self.lock().scale = TimeScale::from_ticks_per_hour(ticks_per_hour);
    }

    pub fn set_ticks_per_second(&self, ticks_per_second: f64) {
        self.lock().scale = TimeScale::new(ticks_per_second);
    }

    pub fn seconds_to_nearest_tick(&self, seconds: f64) -> Tick {
        self.lock().scale.seconds_to_nearest_tick(seconds)
    }

    pub fn ticks_to_seconds(&self, ticks: Tick) -> f64 {
        self.lock().scale.ticks_to_seconds(ticks)
    }

    /// Режим реального времени: `factor` модельных секунд на секунду настенных
    /// часов
    pub fn set_execute_real_time(&self, enabled: bool, factor: f64) {
        let mut st = self.lock();
        st.execute_real_time = enabled;
        st.real_time_factor = factor;
        if enabled {
            st.rebase_real_time = true;
        }
    }

    /// Просит цикл остановиться перед следующим шагом. Можно вызывать из
    /// любого потока.
    pub fn pause(&self) {
        self.shared.execute_events.store(false, Ordering::SeqCst);
    }

    /// Исполняет события до тика `target_tick` включительно.
    ///
    /// Возвращается, когда событий не осталось, часы дошли до цели, цикл
    /// поставлен на паузу или единица работы завершилась с ошибкой. Если цикл
    /// уже крутит другой вызывающий, только обновляет цель и возвращается сразу.
    pub async fn resume(&self, target_tick: Tick) {
        {
            let mut st = self.lock();
            st.target_tick = target_tick;
            st.rebase_real_time = true;
            self.shared.execute_events.store(true, Ordering::SeqCst);
            if st.loop_running {
                return;
            }
            st.loop_running = true;
            st.time_listener.time_running(true);
        }
        let mut guard = LoopGuard {
            manager: self,
            stopped: false,
        };
        info!("EVT:{} - запуск до тика {}", self, target_tick);

        loop {
            match self.next_step() {
                Step::Stop => {
                    guard.stopped = true;
                    break;
                }
                Step::Run(id) => self.run_chain(id),
                Step::Evaluate(waiters) => {
                    for id in waiters {
                        if self.is_waiting_until(id) {
                            self.run_chain(id);
                        }
                    }
                }
                Step::Pace => tokio::time::sleep(REAL_TIME_POLL).await,
                Step::Advance => {}
            }
        }

        info!("EVT:{} - остановка на тике {}", self, self.current_tick());
    }

    /// Один шаг цикла под блокировкой
    fn next_step(&self) -> Step {
        let mut st = self.lock();
        let earliest = st.tree.earliest_node().map(|node| node.tick());

        let execute = self.shared.execute_events.load(Ordering::SeqCst);
        let earliest = match earliest {
            Some(tick) if execute && (tick <= st.current_tick || st.current_tick < st.target_tick) => tick,
            _ => {
                // Флаг цикла сбрасывается под той же блокировкой, что и решение
                self.shared.execute_events.store(false, Ordering::SeqCst);
                st.stop_loop();
                return Step::Stop;
            }
        };

        if earliest <= st.current_tick {
            let Some((tick, priority, mut event)) = st.tree.pop_earliest_event() else {
                return Step::Advance;
            };
            st.next_tick = st.current_tick;
            let current = st.current_tick;
            st.trace(|t| t.trace_event(current, &EventInfo::of(tick, priority, &event)));
            if let Some(handle) = event.handle.take() {
                handle.unbind();
            }
            return match event.target {
                EventTarget::Wait(id) => Step::Run(id),
                EventTarget::Spawn(target) => Step::Run(st.spawn_slot(target)),
            };
        }

        // Перед продвижением часов условные ожидания перепроверяются
        if st.next_tick <= st.current_tick && !st.conditional_list.is_empty() {
            st.next_tick = earliest;
            return Step::Evaluate(st.conditional_list.clone());
        }
        st.next_tick = earliest;

        if st.execute_real_time {
            let real_tick = st.real_time_tick();
            if real_tick < earliest && real_tick < st.target_tick {
                if real_tick > st.current_tick {
                    st.advance_to(real_tick);
                }
                return Step::Pace;
            }
        }

        let tick = earliest.min(st.target_tick);
        st.advance_to(tick);
        Step::Advance
    }

    fn is_waiting_until(&self, id: ProcessId) -> bool {
        let st = self.lock();
        st.conditional_index(id).is_some() && st.is_parked(id)
    }

    /// Исполняет контекст и всех, кому он передает управление
    fn run_chain(&self, first: ProcessId) {
        let mut next = Some(first);
        while let Some(id) = next {
            next = self.step_process(id);
        }
    }

    /// Опрашивает контекст один раз и возвращает того, кто исполняется следующим
    fn step_process(&self, id: ProcessId) -> Option<ProcessId> {
        let body = {
            let mut st = self.lock();
            let slot = st.pool.get_mut(id)?;
            slot.parked = false;
            slot.body.take()?
        };

        let mut future: Option<ProcessFuture> = None;
        let mut cx = Context::from_waker(noop_waker_ref());
        let poll = catch_unwind(AssertUnwindSafe(|| {
            let running = future.insert(match body {
                Body::Pending(target) => target.start(Process::new(self.clone(), id)),
                Body::Running(running) => running,
            });
            running.as_mut().poll(&mut cx)
        }));

        let mut st = self.lock();
        let tick = st.current_tick;
        let Some(slot) = st.pool.get_mut(id) else {
            drop(st);
            return None;
        };

        let outcome = match poll {
            Ok(Poll::Pending) => {
                if let Some(next) = slot.handoff.take() {
                    slot.body = future.take().map(Body::Running);
                    return Some(next);
                }
                if slot.parked {
                    slot.body = future.take().map(Body::Running);
                    return slot.successor.take();
                }
                Err(SimError::ForeignSuspend(self.name().to_string()))
            }
            Ok(Poll::Ready(result)) => result,
            Err(payload) => Err(SimError::Panicked(panic_message(payload))),
        };

        let successor = slot.successor.take();
        let name = std::mem::take(&mut slot.name);
        st.audit_wait_until(self.name(), id);
        st.deregister_conditional(id);
        let retired = st.pool.release(id);

        let failure = match outcome {
            Ok(()) => {
                st.trace(|t| t.trace_process_end(tick));
                debug!("Процесс {} ({}) завершен на тике {}", name, id, tick);
                None
            }
            Err(err) if err.is_killed() => {
                debug!("Процесс {} ({}) отменен на тике {}", name, id, tick);
                None
            }
            Err(err) => {
                self.shared.execute_events.store(false, Ordering::SeqCst);
                Some(err)
            }
        };
        drop(st);
        drop(retired);
        drop(future);

        if let Some(err) = failure {
            self.report_error(&err, tick);
        }
        successor
    }

    fn report_error(&self, err: &SimError, tick: Tick) {
        let listener = Arc::clone(&self.lock().error_listener);
        listener.handle_error(self, err, tick);
    }

    /// Планирует новую единицу работы через `ticks` тиков, не приостанавливая
    /// вызывающего
    pub fn schedule_process<T: ProcessTarget>(
        &self,
        ticks: Tick,
        priority: Priority,
        tie_break: TieBreak,
        target: T,
        handle: Option<&EventHandle>,
    ) -> SimResult<()> {
        let mut st = self.lock();
        let target = EventTarget::Spawn(Box::new(target));
        if let Some(info) = st.insert_event(self.name(), ticks, priority, tie_break, target, handle)? {
            let current = st.current_tick;
            st.trace(|t| t.trace_sched_process(current, &info));
        }
        debug!(
            "EVT:{} - процесс запланирован через {} тиков (приоритет {})",
            self, ticks, priority
        );
        Ok(())
    }

    /// Снимает событие с очереди, не исполняя его, и отменяет его контекст
    pub fn kill_event(&self, handle: &EventHandle) -> SimResult<()> {
        self.kill_event_from(None, handle)
    }

    /// Снимает условное ожидание и отменяет ожидающий контекст
    pub fn kill_wait_until(&self, handle: &ConditionalHandle) -> SimResult<()> {
        self.kill_wait_until_from(None, handle)
    }

    /// Снимок состояния для отладки и отчетов
    pub fn stats(&self) -> serde_json::Value {
        let st = self.lock();
        json!({
            "name": self.name(),
            "tick": st.current_tick,
            "seconds": st.scale.ticks_to_seconds(st.current_tick),
            "target_tick": st.target_tick,
            "pending_events": st.tree.event_count(),
            "event_nodes": st.tree.len(),
            "conditional_waiters": st.conditional_list.len(),
            "live_processes": st.pool.live_count(),
            "pooled_processes": st.pool.pooled_count(),
            "running": st.loop_running,
        })
    }

    pub(crate) fn is_killed(&self, id: ProcessId) -> bool {
        self.lock().pool.get(id).map_or(true, |slot| slot.killed)
    }

    pub(crate) fn check_alive(&self, id: ProcessId) -> SimResult<()> {
        if self.is_killed(id) {
            Err(SimError::Killed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn register_wait(
        &self,
        id: ProcessId,
        ticks: Tick,
        priority: Priority,
        tie_break: TieBreak,
        handle: Option<&EventHandle>,
    ) -> SimResult<()> {
        let mut st = self.lock();
        st.active_slot(self.name(), id)?;
        st.audit_wait_until(self.name(), id);
        let target = EventTarget::Wait(id);
        if let Some(info) = st.insert_event(self.name(), ticks, priority, tie_break, target, handle)? {
            let current = st.current_tick;
            st.trace(|t| t.trace_wait(current, &info));
        }
        st.park(id);
        Ok(())
    }

    pub(crate) fn audit_wait_until(&self, id: ProcessId) {
        self.lock().audit_wait_until(self.name(), id);
    }

    pub(crate) fn register_start(&self, id: ProcessId, target: Box<dyn ProcessTarget>) -> SimResult<()> {
        let mut st = self.lock();
        st.active_slot(self.name(), id)?;
        st.audit_wait_until(self.name(), id);
        let description = target.describe();
        let child = st.spawn_slot(target);
        st.hand_off(id, child);
        let current = st.current_tick;
        st.trace(|t| t.trace_process_start(current, &description));
        debug!("Процесс {} запускает {} ({})", id, description, child);
        Ok(())
    }

    pub(crate) fn register_wait_until(
        &self,
        id: ProcessId,
        handle: Option<&ConditionalHandle>,
    ) -> SimResult<()> {
        let mut st = self.lock();
        st.active_slot(self.name(), id)?.cond_wait = true;
        if st.conditional_index(id).is_none() {
            if let Some(handle) = handle {
                if !handle.bind(id) {
                    if let Some(slot) = st.pool.get_mut(id) {
                        slot.cond_wait = false;
                    }
                    return Err(SimError::HandleInUse(self.name().to_string()));
                }
            }
            let current = st.current_tick;
            st.trace(|t| t.trace_wait_until(current));
            st.conditional_list.push(id);
            st.conditional_handles.push(handle.cloned());
        }
        st.park(id);
        Ok(())
    }

    /// true, если контекст был в списке условных ожиданий и теперь должен
    /// остановиться до продолжения на текущем тике
    pub(crate) fn register_end_wait_until(&self, id: ProcessId) -> SimResult<bool> {
        let mut st = self.lock();
        st.active_slot(self.name(), id)?;
        if !st.deregister_conditional(id) {
            return Ok(false);
        }
        let target = EventTarget::Wait(id);
        if let Some(info) =
            st.insert_event(self.name(), 0, WAIT_UNTIL_PRIORITY, TieBreak::Fifo, target, None)?
        {
            let current = st.current_tick;
            st.trace(|t| t.trace_wait_until_ended(current, &info));
        }
        st.park(id);
        Ok(true)
    }

    pub(crate) fn register_interrupt_event(&self, id: ProcessId, handle: &EventHandle) -> SimResult<bool> {
        let mut st = self.lock();
        st.active_slot(self.name(), id)?;
        st.audit_wait_until(self.name(), id);

        let Some(key) = handle.key() else {
            return Ok(false);
        };
        let waiting = match st.tree.find_event(key) {
            Some(event) => event.target().process(),
            None => {
                handle.unbind();
                return Err(SimError::EventNotFound {
                    manager: self.name().to_string(),
                    action: "interrupt",
                });
            }
        };
        if let Some(waiting) = waiting {
            if !st.is_parked(waiting) {
                return Err(SimError::Reentrant(self.name().to_string()));
            }
        }

        let Some(mut event) = st.tree.remove_event(key) else {
            return Ok(false);
        };
        handle.unbind();
        event.handle = None;
        let current = st.current_tick;
        st.trace(|t| t.trace_interrupt(current, &EventInfo::of(key.tick, key.priority, &event)));

        let target = match event.target {
            EventTarget::Wait(waiting) => waiting,
            EventTarget::Spawn(target) => st.spawn_slot(target),
        };
        st.hand_off(id, target);
        debug!("Процесс {} прерывает событие на тике {}", id, key.tick);
        Ok(true)
    }

    pub(crate) fn register_interrupt_wait_until(
        &self,
        id: ProcessId,
        handle: &ConditionalHandle,
    ) -> SimResult<bool> {
        let mut st = self.lock();
        st.active_slot(self.name(), id)?;
        st.audit_wait_until(self.name(), id);

        let Some(waiter) = handle.process() else {
            return Ok(false);
        };
        if st.conditional_index(waiter).is_none() {
            return Err(SimError::EventNotFound {
                manager: self.name().to_string(),
                action: "interrupt",
            });
        }
        if waiter == id {
            return Ok(false);
        }
        if !st.is_parked(waiter) {
            return Err(SimError::Reentrant(self.name().to_string()));
        }
        st.hand_off(id, waiter);
        Ok(true)
    }

    pub(crate) fn kill_event_from(&self, caller: Option<ProcessId>, handle: &EventHandle) -> SimResult<()> {
        let mut graveyard = Vec::new();
        let result = {
            let mut st = self.lock();
            if let Some(id) = caller {
                st.audit_wait_until(self.name(), id);
            }
            match handle.unbind() {
                None => Ok(()),
                Some(key) => match st.tree.remove_event(key) {
                    None => Err(SimError::EventNotFound {
                        manager: self.name().to_string(),
                        action: "kill",
                    }),
                    Some(mut event) => {
                        event.handle = None;
                        let current = st.current_tick;
                        st.trace(|t| t.trace_kill(current, &EventInfo::of(key.tick, key.priority, &event)));
                        match event.target {
                            EventTarget::Wait(id) => st.kill_process(id, &mut graveyard),
                            EventTarget::Spawn(target) => graveyard.push(Body::Pending(target)),
                        }
                        debug!("EVT:{} - событие на тике {} отменено", self, key.tick);
                        Ok(())
                    }
                },
            }
        };
        drop(graveyard);
        result
    }

    pub(crate) fn kill_wait_until_from(
        &self,
        caller: Option<ProcessId>,
        handle: &ConditionalHandle,
    ) -> SimResult<()> {
        let mut graveyard = Vec::new();
        let result = {
            let mut st = self.lock();
            if let Some(id) = caller {
                st.audit_wait_until(self.name(), id);
            }
            match handle.process() {
                None => Ok(()),
                Some(waiter) if st.deregister_conditional(waiter) => {
                    st.kill_process(waiter, &mut graveyard);
                    debug!("EVT:{} - условное ожидание {} отменено", self, waiter);
                    Ok(())
                }
                Some(_) => {
                    handle.unbind();
                    Err(SimError::EventNotFound {
                        manager: self.name().to_string(),
                        action: "terminate",
                    })
                }
            }
        };
        drop(graveyard);
        result
    }
}

impl fmt::Display for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.shared.name)
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("name", &self.shared.name)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
