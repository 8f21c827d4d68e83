use simkernel::core::TracingTraceListener;
use simkernel::prelude::*;

async fn child(p: Process, n: u32) -> SimResult<()> {
    tracing::info!("Дочерний процесс {} запущен в {} сек", n, p.sim_seconds());
    p.wait_seconds(2.0, DEFAULT_PRIORITY).await?;
    tracing::info!("Дочерний процесс {} завершен в {} сек", n, p.sim_seconds());
    Ok(())
}

async fn parent(p: Process) -> SimResult<()> {
    tracing::info!("Родительский процесс начал работу в {} сек", p.sim_seconds());
    for n in 1..=3 {
        p.wait_seconds(1.0, DEFAULT_PRIORITY).await?;
        p.start_process(named(format!("child-{}", n), move |c: Process| child(c, n)))
            .await?;
        tracing::info!("Родитель продолжает после запуска {}", n);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Инициализируем логирование
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("🧪 Тест функции start_process");
    println!("=============================\n");

    let sim = Simulator::with_config(EventManagerConfig {
        ticks_per_second: 1.0,
        ..Default::default()
    });
    sim.manager()
        .set_trace_listener(Some(std::sync::Arc::new(TracingTraceListener)));

    sim.load_process(0.0, named("parent", parent))?;
    sim.run(10.0).await?;

    println!("\n✅ Тест завершен на тике {}", sim.manager().current_tick());
    Ok(())
}
