#[macro_use]
extern crate log;
extern crate chrono;
extern crate crossbeam_channel;
extern crate env_logger;


use chrono::prelude::{DateTime, Local};
use std::io::Write;

extern crate election_modules;
extern crate leader_election;

fn init_logger() {
    env_logger::builder()
        .format(|buf, record| {
            let now: DateTime<Local> = Local::now();
            let now_str = now.format("%H:%M:%S.%3f").to_string();
            writeln!(buf, "{:5}: {} - {}", record.level(), now_str, record.args())
        })
        .init();
}

fn main() {
    init_logger();

    cases::lease::bootstrap::run();
    cases::lease::mutual_exclusion::run();
    cases::lease::failover::run();
    cases::lease::partition::run();
    cases::lease::graceful_stop::run();
    cases::lease::step_down::run();
    cases::lease::leader_record::run();
    cases::rank::bootstrap::run();
    cases::rank::ordering::run();
    cases::rank::session_expiry::run();
    cases::rank::suspension::run();
    cases::rank::step_down::run();
    cases::rank::withdraw_retry::run();

    info!("All cases passed");
}
