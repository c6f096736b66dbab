//! Minimal plain-text table rendering. Human-readable table rendering is
//! explicitly out of scope for this specification (spec §1); this is kept
//! deliberately small since the crate still needs to be runnable
//! end-to-end.

use crate::model::Job;
use crate::queue::Stats;

pub fn print_jobs(jobs: &[Job]) {
    if jobs.is_empty() {
        println!("(no jobs)");
        return;
    }
    println!(
        "{:<20} {:<12} {:>9} {:>11}  {}",
        "ID", "STATE", "ATTEMPTS", "MAX_RETRIES", "ERROR"
    );
    for job in jobs {
        println!(
            "{:<20} {:<12} {:>9} {:>11}  {}",
            job.id,
            job.state,
            job.attempts,
            job.max_retries,
            job.error_message.as_deref().unwrap_or("")
        );
    }
}

pub fn print_stats(stats: &Stats) {
    println!("pending:    {}", stats.pending);
    println!("processing: {}", stats.processing);
    println!("completed:  {}", stats.completed);
    println!("dead:       {}", stats.dead);
}
