pub mod error;
pub mod handlers;

use crate::daemon::core::Core;
use log::info;
use rocket::config::LogLevel;
use rocket::{Build, Config, Rocket};
use std::sync::Arc;

/// Assembles the Rocket application: the Control Interface mounted behind
/// the exact JSON endpoints of §6.2, nothing else. No templating, no
/// static assets -- the HTML dashboard is out of scope for this core.
pub fn build(core: Arc<Core>, host: &str, port: u16) -> Rocket<Build> {
    let figment = Config::figment()
        .merge(("address", host))
        .merge(("port", port))
        .merge(("log_level", LogLevel::Normal))
        .merge(("workers", 4));

    info!("Assembling API listener on {}:{}", host, port);
    rocket::custom(figment)
        .manage(core)
        .mount(
            "/",
            routes![
                handlers::status_all,
                handlers::status_one,
                handlers::logs,
                handlers::start,
                handlers::stop,
                handlers::restart,
                handlers::add,
                handlers::edit,
                handlers::remove,
                handlers::upload,
                handlers::update,
            ],
        )
        .register("/", catchers![handlers::default_catcher])
}
