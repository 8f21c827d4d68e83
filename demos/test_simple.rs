use simkernel::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Инициализируем логирование
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("🚀 Запуск тестовой симуляции");

    let sim = Simulator::with_config(EventManagerConfig {
        name: "simple".to_string(),
        ticks_per_second: 10.0,
        ..Default::default()
    });

    sim.load_process(0.0, named("wait_test", |p: Process| async move {
        println!("Процесс wait_test начал работу");
        p.wait_seconds(3.0, DEFAULT_PRIORITY).await?;
        println!("Процесс wait_test завершен в {:.1} сек", p.sim_seconds());
        Ok::<(), SimError>(())
    }))?;

    let handle = EventHandle::new();
    let h = handle.clone();
    sim.load_process(1.0, named("sleeper", move |p: Process| async move {
        println!("Процесс sleeper засыпает надолго");
        p.wait_ticks(1_000, DEFAULT_PRIORITY, TieBreak::Fifo, Some(&h)).await?;
        println!("Процесс sleeper разбужен в {:.1} сек", p.sim_seconds());
        Ok::<(), SimError>(())
    }))?;

    sim.load_process(2.0, named("alarm", move |p: Process| async move {
        println!("Процесс alarm будит sleeper");
        p.interrupt_event(&handle).await?;
        Ok::<(), SimError>(())
    }))?;

    sim.run(10.0).await?;

    println!("✅ Симуляция завершена: {}", sim.get_stats());
    Ok(())
}
