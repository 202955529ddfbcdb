use std::{
    env,
    sync::{Arc, Mutex},
};

use log::info;

mod atmos;
mod bme280;
mod calib;
mod config;
mod http;
mod logging;
mod sensor;

use bme280::Bme280;
use http::SharedReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Vec<String> = env::args().collect();
    let config = config::parse_config(&args)?;

    let sensor = Bme280::connect(config.i2c_address)?;
    let reader: SharedReader = Arc::new(Mutex::new(sensor));

    info!("Starting up HTTP server on {}", config.listen);
    let listener = http::bind(config.listen).await?;

    tokio::select! {
        r = http::serve(listener, reader) => r,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            Ok(())
        }
    }
}
