use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simkernel::prelude::*;

const TELLERS: usize = 2;
const CLIENTS: usize = 10;

struct Bank {
    free_tellers: AtomicUsize,
    served: AtomicUsize,
    rng: Mutex<StdRng>,
}

impl Bank {
    fn try_take_teller(&self) -> bool {
        self.free_tellers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |free| free.checked_sub(1))
            .is_ok()
    }

    fn release_teller(&self) {
        self.free_tellers.fetch_add(1, Ordering::SeqCst);
    }

    fn sample(&self, from: f64, to: f64) -> f64 {
        self.rng.lock().unwrap().gen_range(from..to)
    }
}

async fn client(p: Process, bank: Arc<Bank>, id: usize) -> SimResult<()> {
    tracing::info!("Клиент {} пришел в банк в {:.2} сек", id, p.sim_seconds());

    // Условие само занимает кассира, как только он освободится
    p.wait_until_condition(|| bank.try_take_teller(), None).await?;
    tracing::info!("Клиент {} у кассира в {:.2} сек", id, p.sim_seconds());

    let service = bank.sample(3.0, 7.0);
    p.wait_seconds(service, DEFAULT_PRIORITY).await?;
    bank.release_teller();
    bank.served.fetch_add(1, Ordering::SeqCst);

    tracing::info!("Клиент {} обслужен и уходит в {:.2} сек", id, p.sim_seconds());
    Ok(())
}

async fn generator(p: Process, bank: Arc<Bank>) -> SimResult<()> {
    tracing::info!("Генератор запущен");
    for id in 1..=CLIENTS {
        let b = bank.clone();
        p.start_process(named(format!("client-{}", id), move |c: Process| client(c, b, id)))
            .await?;
        let pause = bank.sample(0.5, 3.0);
        p.wait_seconds(pause, DEFAULT_PRIORITY).await?;
    }
    tracing::info!("Генератор закончил работу в {:.2} сек", p.sim_seconds());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Инициализируем логирование
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("🏦 Симуляция банка");
    println!("==================\n");

    let sim = Simulator::with_config(EventManagerConfig {
        name: "bank".to_string(),
        ticks_per_second: 1000.0,
        ..Default::default()
    });

    let bank = Arc::new(Bank {
        free_tellers: AtomicUsize::new(TELLERS),
        served: AtomicUsize::new(0),
        rng: Mutex::new(StdRng::seed_from_u64(42)),
    });

    let b = bank.clone();
    sim.load_process(0.0, named("generator", move |p: Process| generator(p, b)))?;
    sim.run(120.0).await?;

    println!("\n📊 Статистика:");
    println!("Обслужено клиентов: {}", bank.served.load(Ordering::SeqCst));
    println!("{}", serde_json::to_string_pretty(&sim.get_stats())?);

    Ok(())
}
