use log::{error, info, LevelFilter};

async fn launch() -> Result<(), rocket::Error> {
    let rocket = polls_backend::build().ignite().await?;
    info!("...server configured!");
    // Rocket's own logging is only useful up to ignition.
    log4rs_dynamic_filters::DynamicLevelFilter::set("rocket", LevelFilter::Off);
    let _ = rocket.launch().await?;
    Ok(())
}

#[rocket::main]
async fn main() {
    log4rs::init_file("log4rs.yaml", log4rs_dynamic_filters::default_deserializers())
        .expect("Failed to initialise logging");
    info!("Configuring server...");

    if let Err(err) = launch().await {
        error!("{err}");
        error!("Critical failure, shutting down");
        std::process::exit(1)
    }
}
