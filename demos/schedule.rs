use chrono::{Duration, Utc};
use resurface::{CardState, ItemStore, MemoryStore, Scheduler, schedule_review};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .apply()?;

    let scheduler = Scheduler::new(&[])?;
    let store = MemoryStore::new();

    // A problem solved three days ago, never reviewed since.
    let solved_at = Utc::now() - Duration::days(3);
    store.insert("demo-user", "two-sum", CardState::new(solved_at))?;

    let card = store.fetch("demo-user", "two-sum")?;
    let next_states = scheduler.next_states(Some(card.memory()), card.elapsed_days(Utc::now()));
    println!(
        "Again interval: {} days",
        next_states.again.interval.round().max(1.0)
    );
    println!(
        "Hard interval: {} days",
        next_states.hard.interval.round().max(1.0)
    );
    println!(
        "Good interval: {} days",
        next_states.good.interval.round().max(1.0)
    );
    println!(
        "Easy interval: {} days",
        next_states.easy.interval.round().max(1.0)
    );

    // The user rates the review `Good`.
    let updated = schedule_review(&store, &scheduler, "demo-user", "two-sum", 3, None)?;
    println!("Status: {}", updated.status);
    println!("Next review due: {}", updated.due);
    println!(
        "Memory state: stability {:.2}, difficulty {:.2}",
        updated.stability, updated.difficulty
    );

    let due_now = store.due_items("demo-user", Utc::now());
    println!("Problems still due today: {}", due_now.len());
    Ok(())
}
