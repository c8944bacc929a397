mod books;
mod shopping;
mod user;

use crate::{books::books, shopping::shopping, user::users};
use log::LevelFilter;
use std::env;
use tabula::Gateway;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Runs every scenario against `gateway`. Tables are dropped and created by the scenarios.
pub async fn execute_tests<G: Gateway>(mut gateway: G) {
    users(&mut gateway).await;
    books(&mut gateway).await;
    shopping(&mut gateway).await;
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
