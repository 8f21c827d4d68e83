//! Ядро симуляции: часы, индекс событий, контексты исполнения и планировщик

mod context;
mod event;
mod handle;
mod listener;
mod manager;
mod process;
mod time;
mod tree;

pub use context::Process;
pub use event::{
    Event, EventInfo, EventKey, EventNode, EventTarget, Priority, TieBreak, DEFAULT_PRIORITY,
    WAIT_UNTIL_PRIORITY,
};
pub use handle::{ConditionalHandle, EventHandle};
pub use listener::{
    DefaultErrorListener, DefaultTimeListener, EventErrorListener, EventTimeListener,
    EventTraceListener, TracingTraceListener,
};
pub use manager::{EventManager, REAL_TIME_POLL};
pub use process::{named, NamedTarget, ProcessFuture, ProcessId, ProcessTarget};
pub use time::{event_time, Tick, TimeScale, DEFAULT_TICKS_PER_SECOND, MAX_TICK};
pub use tree::EventTree;
