use anyhow::Result;
use temphist_core::Config;

mod routes;

#[tokio::main]
async fn main() -> Result<()> {
    temphist_core::init()?;

    let (config, _validation) = Config::load_validated()?;

    // One-shot historical load, then exit
    if std::env::args().nth(1).as_deref() == Some("backfill") {
        let client = routes::archive_client(&config)?;
        let outcome = temphist_etl::backfill(&client, &config).await?;
        println!("{}", outcome.message);
        return Ok(());
    }

    let port = config.server.port;
    let api = routes::api(routes::AppState::new(config));

    tracing::info!("Listening on 127.0.0.1:{}", port);
    warp::serve(api).run(([127, 0, 0, 1], port)).await;

    Ok(())
}
