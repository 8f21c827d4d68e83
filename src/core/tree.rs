//! Упорядоченный индекс ожидающих событий

use std::collections::BTreeMap;

use super::event::{Event, EventKey, EventNode, Priority, TieBreak};
use super::time::Tick;

/// Индекс узлов по ключу (tick, priority). Тик важнее приоритета, пустых узлов
/// в индексе не бывает.
#[derive(Debug, Default)]
pub struct EventTree {
    nodes: BTreeMap<(Tick, Priority), EventNode>,
    events: usize,
}

impl EventTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Находит узел или вставляет новый. Узел должен получить событие до
    /// следующей операции над деревом.
    pub fn create_or_find_node(&mut self, tick: Tick, priority: Priority) -> &mut EventNode {
        self.nodes
            .entry((tick, priority))
            .or_insert_with(|| EventNode::new(tick, priority))
    }

    /// Добавляет событие в узел (tick, priority)
    pub fn insert(&mut self, tick: Tick, priority: Priority, event: Event, tie_break: TieBreak) -> EventKey {
        let key = EventKey {
            tick,
            priority,
            seq: event.seq,
        };
        self.create_or_find_node(tick, priority).add_event(event, tie_break);
        self.events += 1;
        key
    }

    pub fn earliest_node(&self) -> Option<&EventNode> {
        self.nodes.values().next()
    }

    /// Извлекает головное событие самого раннего узла
    pub fn pop_earliest_event(&mut self) -> Option<(Tick, Priority, Event)> {
        let mut entry = self.nodes.first_entry()?;
        let node = entry.get_mut();
        let (tick, priority) = (node.tick, node.priority);
        let event = node.pop_head();
        if node.is_empty() {
            entry.remove();
        }
        let event = event?;
        self.events -= 1;
        Some((tick, priority, event))
    }

    pub fn find_event(&self, key: EventKey) -> Option<&Event> {
        self.nodes
            .get(&(key.tick, key.priority))?
            .events()
            .find(|e| e.seq == key.seq)
    }

    /// Удаляет конкретное событие, не исполняя его
    pub fn remove_event(&mut self, key: EventKey) -> Option<Event> {
        let node = self.nodes.get_mut(&(key.tick, key.priority))?;
        let event = node.remove(key.seq)?;
        if node.is_empty() {
            self.nodes.remove(&(key.tick, key.priority));
        }
        self.events -= 1;
        Some(event)
    }

    pub fn remove_node(&mut self, tick: Tick, priority: Priority) -> bool {
        match self.nodes.remove(&(tick, priority)) {
            Some(node) => {
                self.events -= node.len();
                true
            }
            None => false,
        }
    }

    /// Обходит все узлы в порядке срабатывания
    pub fn visit_all_nodes<F: FnMut(&EventNode)>(&self, mut visitor: F) {
        for node in self.nodes.values() {
            visitor(node);
        }
    }

    /// Очищает индекс, возвращая все события
    pub fn reset(&mut self) -> Vec<Event> {
        self.events = 0;
        std::mem::take(&mut self.nodes)
            .into_values()
            .flat_map(|node| node.events)
            .collect()
    }

    /// Число узлов
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn event_count(&self) -> usize {
        self.events
    }
}
