//! Процессы: цели (единицы работы) и пул контекстов исполнения

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;

use super::context::Process;
use crate::error::SimResult;

/// Фьючерс, исполняющий одну единицу работы
pub type ProcessFuture = BoxFuture<'static, SimResult<()>>;

/// Единица работы, которую планировщик запускает в собственном контексте.
///
/// Цель либо выполняется до конца, либо приостанавливается только через
/// примитивы [`Process`]. Любое другое ожидание нарушает контракт.
pub trait ProcessTarget: Send + 'static {
    /// Имя цели для трассировки и логов
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    fn start(self: Box<Self>, process: Process) -> ProcessFuture;
}

impl<F, Fut> ProcessTarget for F
where
    F: FnOnce(Process) -> Fut + Send + 'static,
    Fut: Future<Output = SimResult<()>> + Send + 'static,
{
    fn start(self: Box<Self>, process: Process) -> ProcessFuture {
        Box::pin((*self)(process))
    }
}

/// Цель с человекочитаемым именем
pub struct NamedTarget<T> {
    name: String,
    inner: T,
}

impl<T: ProcessTarget> ProcessTarget for NamedTarget<T> {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn start(self: Box<Self>, process: Process) -> ProcessFuture {
        Box::new(self.inner).start(process)
    }
}

/// Дает цели имя, которое увидят слушатели трассировки
pub fn named<T: ProcessTarget>(name: impl Into<String>, target: T) -> NamedTarget<T> {
    NamedTarget {
        name: name.into(),
        inner: target,
    }
}

/// Идентификатор контекста в пуле. Поколение отличает переиспользованный слот
/// от прежнего владельца.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId {
    index: u32,
    generation: u32,
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "P{}.{}", self.index, self.generation)
    }
}

/// Тело контекста: еще не запущенная цель или приостановленный фьючерс
pub(crate) enum Body {
    Pending(Box<dyn ProcessTarget>),
    Running(ProcessFuture),
}

/// Запись контекста исполнения
#[derive(Default)]
pub(crate) struct ProcessSlot {
    generation: u32,
    live: bool,
    pub(crate) name: String,
    /// Отсутствует, пока контекст исполняется (фьючерс у планировщика)
    pub(crate) body: Option<Body>,
    /// Кому передать управление после остановки или завершения
    pub(crate) successor: Option<ProcessId>,
    /// Запрошенная передача управления (start_process, interrupt)
    pub(crate) handoff: Option<ProcessId>,
    pub(crate) parked: bool,
    pub(crate) cond_wait: bool,
    pub(crate) killed: bool,
}

impl ProcessSlot {
    fn reset(&mut self) -> Option<Body> {
        self.live = false;
        self.generation = self.generation.wrapping_add(1);
        self.name.clear();
        self.successor = None;
        self.handoff = None;
        self.parked = false;
        self.cond_wait = false;
        self.killed = false;
        self.body.take()
    }
}

/// Пул контекстов: арена слотов со списком свободных
#[derive(Default)]
pub(crate) struct ProcessPool {
    slots: Vec<ProcessSlot>,
    free: Vec<u32>,
}

impl ProcessPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Берет контекст из пула (или создает новый)
    pub fn allocate(&mut self, name: String) -> ProcessId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(ProcessSlot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.live = true;
        slot.name = name;
        ProcessId {
            index,
            generation: slot.generation,
        }
    }

    pub fn get(&self, id: ProcessId) -> Option<&ProcessSlot> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.live && slot.generation == id.generation)
    }

    pub fn get_mut(&mut self, id: ProcessId) -> Option<&mut ProcessSlot> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.live && slot.generation == id.generation)
    }

    /// Возвращает контекст в пул. Оставшееся тело отдается вызывающему,
    /// чтобы тот уничтожил его вне блокировки.
    pub fn release(&mut self, id: ProcessId) -> Option<Body> {
        let slot = self.get_mut(id)?;
        let body = slot.reset();
        self.free.push(id.index);
        body
    }

    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn pooled_count(&self) -> usize {
        self.free.len()
    }
}
