#[macro_use]
extern crate rocket;

use log::{error, info};
use rocket::fairing::AdHoc;
use std::env;

use pretrained_snake::bot::Bot;
use pretrained_snake::config::Config;
use pretrained_snake::debug_logger::DebugLogger;
use pretrained_snake::oracle::OracleSet;

mod handler;

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Lots of web hosting services expect you to bind to the port specified by the `PORT`
    // environment variable. However, Rocket looks at the `ROCKET_PORT` environment variable.
    // If we find a value for `PORT`, we set `ROCKET_PORT` to that value.
    if let Ok(port) = env::var("PORT") {
        env::set_var("ROCKET_PORT", &port);
    }

    // We default to 'info' level logging. But if the `RUST_LOG` environment variable is set,
    // we keep that value instead.
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }

    env_logger::init();

    info!("Starting Battlesnake Server...");

    // Configuration and policy models are loaded once and never change afterwards
    let config = Config::load_or_default();
    let oracles = OracleSet::load(&config.oracle).map_err(|e| {
        error!("Failed to load policy models: {}", e);
        e
    })?;
    info!("Policy models ready for board sizes {:?}", oracles.board_sizes());

    let debug_logger = DebugLogger::new(config.debug.enabled, &config.debug.log_file_path).await;
    let bot = Bot::new(config, oracles).with_debug_logger(debug_logger);

    let _rocket = rocket::build()
        .manage(bot)
        .attach(AdHoc::on_response("Server ID Middleware", |_, res| {
            Box::pin(async move {
                res.set_raw_header("Server", "battlesnake/github/pretrained-snake");
            })
        }))
        .mount(
            "/",
            routes![
                handler::index,
                handler::ping,
                handler::start,
                handler::get_move,
                handler::end
            ],
        )
        .launch()
        .await?;

    Ok(())
}
