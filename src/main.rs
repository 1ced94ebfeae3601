use std::time::Instant;

use bus_tracker::{
    callbacks::log_ticks::TickLogCallback, config::SessionConfig, intake::TripForm,
    map::InMemorySurface, session::Session,
};
use chrono::{Duration, Local};
use humantime::format_duration;
use rand::{rngs::SmallRng, SeedableRng};
use tracing::info;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let rng = SmallRng::seed_from_u64(727);
    let config = SessionConfig::default();
    let log = TickLogCallback::new("demo".to_string(), config.timing);
    let mut session = Session::new(
        config,
        InMemorySurface::new(),
        rng,
        Local::now().naive_local(),
        vec![Box::new(log)],
    )?;

    let start = Instant::now();
    session.submit_trip(&TripForm::new("Shivajinagar", "Hebbal"));
    if let Some(title) = session.title() {
        info!("{title}");
    }
    for _ in 0..8 {
        session.simulate_for(Duration::seconds(2));
        for row in session.list().rows() {
            info!("{}: {} min to destination", row.id, row.minutes_to_destination);
        }
    }
    info!(
        "simulated {} ticks in {}",
        session.simulator().tick_count(),
        format_duration(start.elapsed())
    );
    Ok(())
}
