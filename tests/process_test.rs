mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use common::{recorder, Log};
use simkernel::core::{
    named, ConditionalHandle, EventHandle, EventManager, Process, TieBreak, DEFAULT_PRIORITY,
    MAX_TICK,
};
use simkernel::SimError;

#[tokio::test]
async fn test_wait_ticks_resumes_later() {
    let manager = EventManager::new("wait");
    let log = Log::new();

    let l = log.clone();
    manager
        .schedule_process(0, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            l.push(format!("start@{}", p.current_tick()));
            p.wait_ticks(10, DEFAULT_PRIORITY, TieBreak::Fifo, None).await?;
            l.push(format!("woke@{}", p.current_tick()));
            p.wait_ticks(5, DEFAULT_PRIORITY, TieBreak::Fifo, None).await?;
            l.push(format!("done@{}", p.current_tick()));
            Ok::<(), SimError>(())
        }, None)
        .unwrap();

    manager.resume(MAX_TICK).await;
    assert_eq!(log.entries(), vec!["start@0", "woke@10", "done@15"]);
    assert_eq!(manager.stats()["live_processes"], 0);
}

#[tokio::test]
async fn test_processes_interleave_by_time() {
    let manager = EventManager::new("interleave");
    let log = Log::new();

    for (name, step) in [("a", 3), ("b", 5)] {
        let l = log.clone();
        manager
            .schedule_process(0, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
                for _ in 0..2 {
                    p.wait_ticks(step, DEFAULT_PRIORITY, TieBreak::Fifo, None).await?;
                    l.push(format!("{}@{}", name, p.current_tick()));
                }
                Ok::<(), SimError>(())
            }, None)
            .unwrap();
    }

    manager.resume(MAX_TICK).await;
    assert_eq!(log.entries(), vec!["a@3", "b@5", "a@6", "b@10"]);
}

#[tokio::test]
async fn test_start_process_runs_child_first() {
    let manager = EventManager::new("start");
    let log = Log::new();

    let l = log.clone();
    manager
        .schedule_process(0, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            l.push("parent:before");
            let child_log = l.clone();
            p.start_process(named("child", move |c: Process| async move {
                child_log.push("child:start");
                c.wait_ticks(5, DEFAULT_PRIORITY, TieBreak::Fifo, None).await?;
                child_log.push(format!("child:end@{}", c.current_tick()));
                Ok::<(), SimError>(())
            }))
            .await?;
            l.push(format!("parent:after@{}", p.current_tick()));
            Ok::<(), SimError>(())
        }, None)
        .unwrap();

    manager.resume(MAX_TICK).await;
    assert_eq!(
        log.entries(),
        vec!["parent:before", "child:start", "parent:after@0", "child:end@5"]
    );
}

#[tokio::test]
async fn test_kill_parked_process() {
    let manager = EventManager::new("kill");
    let log = Log::new();
    let handle = EventHandle::new();

    let (l, h) = (log.clone(), handle.clone());
    manager
        .schedule_process(0, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            p.wait_ticks(100, DEFAULT_PRIORITY, TieBreak::Fifo, Some(&h)).await?;
            l.push("victim woke");
            Ok::<(), SimError>(())
        }, None)
        .unwrap();

    let (l, h) = (log.clone(), handle.clone());
    manager
        .schedule_process(5, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            p.kill_event(&h)?;
            p.kill_event(&h)?;
            l.push(format!("killer@{}", p.current_tick()));
            Ok::<(), SimError>(())
        }, None)
        .unwrap();

    manager.resume(MAX_TICK).await;
    assert_eq!(log.entries(), vec!["killer@5"]);
    assert_eq!(manager.current_tick(), 5);
    assert_eq!(manager.pending_event_count(), 0);
    assert_eq!(manager.stats()["live_processes"], 0);
}

#[tokio::test]
async fn test_interrupt_event_resumes_waiter_once() {
    let manager = EventManager::new("interrupt");
    let log = Log::new();
    let handle = EventHandle::new();

    let (l, h) = (log.clone(), handle.clone());
    manager
        .schedule_process(0, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            p.wait_ticks(100, DEFAULT_PRIORITY, TieBreak::Fifo, Some(&h)).await?;
            l.push(format!("sleeper@{}", p.current_tick()));
            Ok::<(), SimError>(())
        }, None)
        .unwrap();

    let (l, h) = (log.clone(), handle.clone());
    manager
        .schedule_process(5, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            p.interrupt_event(&h).await?;
            l.push(format!("interrupter@{}", p.current_tick()));
            Ok::<(), SimError>(())
        }, None)
        .unwrap();

    manager.resume(MAX_TICK).await;
    assert_eq!(log.entries(), vec!["sleeper@5", "interrupter@5"]);
    assert_eq!(manager.current_tick(), 5);
    assert!(!handle.is_scheduled());
}

#[tokio::test]
async fn test_interrupt_scheduled_process_starts_it_now() {
    let manager = EventManager::new("interrupt-spawn");
    let log = Log::new();
    let handle = EventHandle::new();

    manager
        .schedule_process(50, DEFAULT_PRIORITY, TieBreak::Fifo, recorder(&log, "target"), Some(&handle))
        .unwrap();

    let (l, h) = (log.clone(), handle.clone());
    manager
        .schedule_process(2, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            p.interrupt_event(&h).await?;
            l.push("caller");
            Ok::<(), SimError>(())
        }, None)
        .unwrap();

    manager.resume(MAX_TICK).await;
    assert_eq!(log.entries(), vec!["target@2", "caller"]);
    assert_eq!(manager.current_tick(), 2);
}

#[tokio::test]
async fn test_wait_until_condition() {
    let manager = EventManager::new("cond");
    let log = Log::new();
    let flag = Arc::new(AtomicBool::new(false));

    let (l, f) = (log.clone(), flag.clone());
    manager
        .schedule_process(0, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            p.wait_until_condition(|| f.load(Ordering::SeqCst), None).await?;
            l.push(format!("condition@{}", p.current_tick()));
            Ok::<(), SimError>(())
        }, None)
        .unwrap();

    let f = flag.clone();
    manager
        .schedule_process(10, DEFAULT_PRIORITY, TieBreak::Fifo, move |_p: Process| async move {
            f.store(true, Ordering::SeqCst);
            Ok::<(), SimError>(())
        }, None)
        .unwrap();
    manager.schedule_process(20, DEFAULT_PRIORITY, TieBreak::Fifo, recorder(&log, "tick"), None).unwrap();

    manager.resume(MAX_TICK).await;
    // Условие перепроверяется до продвижения часов к 20
    assert_eq!(log.entries(), vec!["condition@10", "tick@20"]);
    assert_eq!(manager.conditional_waiter_count(), 0);
}

#[tokio::test]
async fn test_unmatched_wait_until_does_not_block() {
    let manager = EventManager::new("stuck");
    let log = Log::new();
    let handle = ConditionalHandle::new();

    let (l, h) = (log.clone(), handle.clone());
    manager
        .schedule_process(0, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            p.wait_until_condition(|| false, Some(&h)).await?;
            l.push("never");
            Ok::<(), SimError>(())
        }, None)
        .unwrap();
    for tick in [5, 10] {
        manager
            .schedule_process(tick, DEFAULT_PRIORITY, TieBreak::Fifo, recorder(&log, "e"), None)
            .unwrap();
    }

    manager.resume(MAX_TICK).await;
    assert_eq!(log.entries(), vec!["e@5", "e@10"]);
    assert_eq!(manager.conditional_waiter_count(), 1);
    assert!(handle.is_waiting());

    manager.kill_wait_until(&handle).unwrap();
    assert_eq!(manager.conditional_waiter_count(), 0);
    assert!(!handle.is_waiting());
    assert_eq!(manager.stats()["live_processes"], 0);
}

#[tokio::test]
async fn test_interrupt_wait_until_reevaluates_inline() {
    let manager = EventManager::new("cond-interrupt");
    let log = Log::new();
    let flag = Arc::new(AtomicBool::new(false));
    let handle = ConditionalHandle::new();

    let (l, f, h) = (log.clone(), flag.clone(), handle.clone());
    manager
        .schedule_process(0, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            p.wait_until_condition(|| f.load(Ordering::SeqCst), Some(&h)).await?;
            l.push(format!("waiter@{}", p.current_tick()));
            Ok::<(), SimError>(())
        }, None)
        .unwrap();

    let (l, f, h) = (log.clone(), flag.clone(), handle.clone());
    manager
        .schedule_process(5, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            f.store(true, Ordering::SeqCst);
            p.interrupt_wait_until(&h).await?;
            l.push("signaller");
            Ok::<(), SimError>(())
        }, None)
        .unwrap();

    manager.resume(MAX_TICK).await;
    // Ожидающий снял регистрацию на месте, продолжение идет следующим событием
    assert_eq!(log.entries(), vec!["signaller", "waiter@5"]);
    assert!(!handle.is_waiting());
}

#[tokio::test]
async fn test_kill_wait_until_from_process() {
    let manager = EventManager::new("cond-kill");
    let log = Log::new();
    let handle = ConditionalHandle::new();

    let (l, h) = (log.clone(), handle.clone());
    manager
        .schedule_process(0, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            p.wait_until_condition(|| false, Some(&h)).await?;
            l.push("waiter resumed");
            Ok::<(), SimError>(())
        }, None)
        .unwrap();

    let (l, h) = (log.clone(), handle.clone());
    manager
        .schedule_process(5, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            p.kill_wait_until(&h)?;
            // Второй раз дескриптор уже свободен
            p.kill_wait_until(&h)?;
            l.push(format!("killer@{}", p.current_tick()));
            Ok::<(), SimError>(())
        }, None)
        .unwrap();

    manager.resume(MAX_TICK).await;
    assert_eq!(log.entries(), vec!["killer@5"]);
    assert_eq!(manager.conditional_waiter_count(), 0);
    assert!(!handle.is_waiting());
    assert_eq!(manager.stats()["live_processes"], 0);
}

#[tokio::test]
async fn test_primitive_outside_own_process_is_rejected() {
    let manager = EventManager::new("foreign");
    let stolen: Arc<Mutex<Option<Process>>> = Arc::new(Mutex::new(None));

    let s = stolen.clone();
    manager
        .schedule_process(0, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            *s.lock().unwrap() = Some(p.clone());
            p.wait_ticks(10, DEFAULT_PRIORITY, TieBreak::Fifo, None).await?;
            Ok::<(), SimError>(())
        }, None)
        .unwrap();

    manager.resume(5).await;
    let process = stolen.lock().unwrap().take().unwrap();
    let err = process
        .wait_ticks(1, DEFAULT_PRIORITY, TieBreak::Fifo, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SimError::ForeignSuspend(_)));
    assert_eq!(manager.pending_event_count(), 1);
}

#[derive(Default)]
struct RecordingErrors {
    errors: Mutex<Vec<String>>,
}

impl simkernel::core::EventErrorListener for RecordingErrors {
    fn handle_error(&self, _manager: &EventManager, error: &SimError, _tick: simkernel::Tick) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}

#[tokio::test]
async fn test_self_kill_is_cooperative_and_silent() {
    let manager = EventManager::new("self-kill");
    let errors = Arc::new(RecordingErrors::default());
    manager.set_error_listener(Some(errors.clone()));
    let log = Log::new();
    let handle = ConditionalHandle::new();

    let (l, h) = (log.clone(), handle.clone());
    manager
        .schedule_process(0, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            p.wait_until(Some(&h)).await?;
            // Перепроверка: контекст исполняется и все еще зарегистрирован
            p.kill_wait_until(&h)?;
            l.push(format!("killed={}", p.is_killed()));
            let result = p.wait_ticks(1, DEFAULT_PRIORITY, TieBreak::Fifo, None).await;
            if let Err(err) = &result {
                l.push(format!("wait -> {}", err));
            }
            result?;
            l.push("unreachable");
            Ok::<(), SimError>(())
        }, None)
        .unwrap();
    manager.schedule_process(5, DEFAULT_PRIORITY, TieBreak::Fifo, recorder(&log, "e"), None).unwrap();

    manager.resume(MAX_TICK).await;
    assert_eq!(log.entries(), vec!["killed=true", "wait -> Process killed", "e@5"]);
    assert!(errors.errors.lock().unwrap().is_empty());
    assert_eq!(manager.conditional_waiter_count(), 0);
    assert_eq!(manager.pending_event_count(), 0);
    assert_eq!(manager.stats()["live_processes"], 0);
}

#[tokio::test]
async fn test_clear_kills_parked_and_conditional_contexts() {
    let manager = EventManager::new("clear-all");
    let log = Log::new();
    let event_handle = EventHandle::new();
    let cond_handle = ConditionalHandle::new();

    let (l, h) = (log.clone(), event_handle.clone());
    manager
        .schedule_process(0, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            p.wait_ticks(100, DEFAULT_PRIORITY, TieBreak::Fifo, Some(&h)).await?;
            l.push("sleeper woke");
            Ok::<(), SimError>(())
        }, None)
        .unwrap();

    let (l, h) = (log.clone(), cond_handle.clone());
    manager
        .schedule_process(0, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            p.wait_until_condition(|| false, Some(&h)).await?;
            l.push("waiter done");
            Ok::<(), SimError>(())
        }, None)
        .unwrap();

    manager.resume(10).await;
    assert!(event_handle.is_scheduled());
    assert!(cond_handle.is_waiting());
    assert_eq!(manager.stats()["live_processes"], 2);

    manager.clear();
    assert!(!event_handle.is_scheduled());
    assert!(!cond_handle.is_waiting());
    assert_eq!(manager.pending_event_count(), 0);
    assert_eq!(manager.conditional_waiter_count(), 0);
    assert_eq!(manager.stats()["live_processes"], 0);

    manager.resume(MAX_TICK).await;
    assert!(log.entries().is_empty());
    assert_eq!(manager.current_tick(), 0);
}

#[tokio::test]
async fn test_interrupt_wait_until_of_active_waiter_is_reentrant() {
    let manager = EventManager::new("cond-reentrant");
    let log = Log::new();
    let first = ConditionalHandle::new();
    let second = ConditionalHandle::new();

    let (l, mine, other) = (log.clone(), first.clone(), second.clone());
    manager
        .schedule_process(0, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            p.wait_until(Some(&mine)).await?;
            p.interrupt_wait_until(&other).await?;
            l.push("first resumed");
            p.end_wait_until().await?;
            l.push("first done");
            Ok::<(), SimError>(())
        }, None)
        .unwrap();

    let (l, mine, other) = (log.clone(), second.clone(), first.clone());
    manager
        .schedule_process(0, DEFAULT_PRIORITY, TieBreak::Fifo, move |p: Process| async move {
            p.wait_until(Some(&mine)).await?;
            // Первый ждет, пока второй не остановится, и не может быть возобновлен
            match p.interrupt_wait_until(&other).await {
                Err(SimError::Reentrant(_)) => l.push("second reentrant"),
                Err(err) => return Err(err),
                Ok(()) => l.push("second interrupted first"),
            }
            p.end_wait_until().await?;
            l.push("second done");
            Ok::<(), SimError>(())
        }, None)
        .unwrap();
    manager.schedule_process(10, DEFAULT_PRIORITY, TieBreak::Fifo, recorder(&log, "e"), None).unwrap();

    manager.resume(MAX_TICK).await;
    assert_eq!(
        log.entries(),
        vec!["second reentrant", "first resumed", "second done", "first done", "e@10"]
    );
    assert_eq!(manager.conditional_waiter_count(), 0);
}
