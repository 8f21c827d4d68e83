//! Дескрипторы для отмены и прерывания ожидающих событий

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::event::EventKey;
use super::process::ProcessId;
use super::time::Tick;

#[derive(Debug)]
struct Binding<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Default for Binding<T> {
    fn default() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }
}

impl<T: Copy> Binding<T> {
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self) -> Option<T> {
        *self.lock()
    }

    /// Привязывает значение; false, если дескриптор уже занят
    fn bind(&self, value: T) -> bool {
        let mut slot = self.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        true
    }

    fn take(&self) -> Option<T> {
        self.lock().take()
    }
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

/// Дескриптор не более чем одного ожидающего события.
///
/// Клоны разделяют одну привязку. Привязка меняется только планировщиком под
/// его блокировкой.
#[derive(Debug, Clone, Default)]
pub struct EventHandle {
    binding: Binding<EventKey>,
}

impl EventHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_scheduled(&self) -> bool {
        self.binding.get().is_some()
    }

    /// Тик, на который запланировано привязанное событие
    pub fn scheduled_tick(&self) -> Option<Tick> {
        self.binding.get().map(|key| key.tick)
    }

    pub(crate) fn key(&self) -> Option<EventKey> {
        self.binding.get()
    }

    pub(crate) fn bind(&self, key: EventKey) -> bool {
        self.binding.bind(key)
    }

    pub(crate) fn unbind(&self) -> Option<EventKey> {
        self.binding.take()
    }
}

/// Дескриптор регистрации условного ожидания
#[derive(Debug, Clone, Default)]
pub struct ConditionalHandle {
    binding: Binding<ProcessId>,
}

impl ConditionalHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_waiting(&self) -> bool {
        self.binding.get().is_some()
    }

    pub(crate) fn process(&self) -> Option<ProcessId> {
        self.binding.get()
    }

    pub(crate) fn bind(&self, process: ProcessId) -> bool {
        self.binding.bind(process)
    }

    pub(crate) fn unbind(&self) -> Option<ProcessId> {
        self.binding.take()
    }
}
