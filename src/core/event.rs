//! Система событий для симуляции

use std::collections::VecDeque;
use std::fmt;

use super::handle::EventHandle;
use super::process::{ProcessId, ProcessTarget};
use super::time::Tick;

/// Приоритет события (меньше = важнее)
pub type Priority = i32;

/// Приоритет продолжения после `end_wait_until`
pub const WAIT_UNTIL_PRIORITY: Priority = 0;

/// Приоритет по умолчанию
pub const DEFAULT_PRIORITY: Priority = 5;

/// Порядок событий с одинаковыми (tick, priority)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    /// В порядке планирования
    Fifo,
    /// Последнее запланированное срабатывает первым
    Lifo,
}

/// Полный адрес события в индексе
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub tick: Tick,
    pub priority: Priority,
    pub seq: u64,
}

/// Что делает событие при срабатывании
pub enum EventTarget {
    /// Возобновить остановленный контекст
    Wait(ProcessId),
    /// Запустить новую единицу работы
    Spawn(Box<dyn ProcessTarget>),
}

impl EventTarget {
    pub fn describe(&self) -> String {
        match self {
            EventTarget::Wait(id) => format!("wait:{}", id),
            EventTarget::Spawn(target) => target.describe(),
        }
    }

    /// Контекст, захваченный событием
    pub fn process(&self) -> Option<ProcessId> {
        match self {
            EventTarget::Wait(id) => Some(*id),
            EventTarget::Spawn(_) => None,
        }
    }
}

impl fmt::Debug for EventTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Событие в очереди симуляции
#[derive(Debug)]
pub struct Event {
    pub(crate) seq: u64,
    pub(crate) target: EventTarget,
    pub(crate) handle: Option<EventHandle>,
}

impl Event {
    pub fn new(seq: u64, target: EventTarget) -> Self {
        Self {
            seq,
            target,
            handle: None,
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn target(&self) -> &EventTarget {
        &self.target
    }
}

/// Снимок события для слушателей трассировки
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInfo {
    pub tick: Tick,
    pub priority: Priority,
    pub target: String,
}

impl EventInfo {
    pub(crate) fn of(tick: Tick, priority: Priority, event: &Event) -> Self {
        Self {
            tick,
            priority,
            target: event.target.describe(),
        }
    }
}

/// Узел индекса: все события с одними и теми же (tick, priority)
#[derive(Debug)]
pub struct EventNode {
    pub(crate) tick: Tick,
    pub(crate) priority: Priority,
    pub(crate) events: VecDeque<Event>,
}

impl EventNode {
    pub fn new(tick: Tick, priority: Priority) -> Self {
        Self {
            tick,
            priority,
            events: VecDeque::new(),
        }
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn add_event(&mut self, event: Event, tie_break: TieBreak) {
        match tie_break {
            TieBreak::Fifo => self.events.push_back(event),
            TieBreak::Lifo => self.events.push_front(event),
        }
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub(crate) fn pop_head(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub(crate) fn remove(&mut self, seq: u64) -> Option<Event> {
        let position = self.events.iter().position(|e| e.seq == seq)?;
        self.events.remove(position)
    }
}
