use std::{sync::Arc, time::Duration};

use car_logbook_data_management::DataManager;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracker::{api::ApiClient, config::TrackerConfig, controller::TrackingController, foreground::NoopForegroundTask, journal::{TripJournal, VehicleGarage}, location::SimulatedLocationSource, state::TrackingState};

/// Records one simulated drive against a live backend: log in, start a trip,
/// stream jittered fixes through the full buffer-and-flush pipeline for a
/// short while, then stop and let the backend compute the totals.
#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = TrackerConfig {
        base_url: std::env::var("LOGBOOK_API").unwrap_or_else(|_| "http://localhost:8080".to_string()),
        sample_interval: Duration::from_secs(2),
        flush_interval: Duration::from_secs(10),
        ..Default::default()
    };

    let email = std::env::var("LOGBOOK_EMAIL").map_err(|_| anyhow::anyhow!("LOGBOOK_EMAIL is not set"))?;
    let password = std::env::var("LOGBOOK_PASSWORD").map_err(|_| anyhow::anyhow!("LOGBOOK_PASSWORD is not set"))?;

    let data = DataManager::open("data/logbook.db").await
        .map_err(|err| anyhow::anyhow!("Failed to open local database: {err:?}"))?;

    let api = Arc::new(ApiClient::new(&config).map_err(|err| anyhow::anyhow!("{err:?}"))?);
    api.login(&email, &password).await.map_err(|err| anyhow::anyhow!("Login failed: {err:?}"))?;

    let garage = VehicleGarage::new(api.clone(), data.clone());
    garage.refresh().await;
    let vehicle = garage.vehicles().await
        .map_err(|err| anyhow::anyhow!("{err:?}"))?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("No vehicle registered for this account"))?;
    tracing::info!("Driving {}", vehicle.display_name());

    // Kyiv city centre
    let locations = Arc::new(SimulatedLocationSource::new(geo_types::Point::new(30.5234, 50.4501)));

    let controller = TrackingController::new(
        config,
        data.clone(),
        api.clone(),
        locations,
        Arc::new(NoopForegroundTask),
        Arc::new(TrackingState::new()),
    );

    // Anything a previous run failed to deliver goes out first.
    controller.flush_stranded().await;

    let journal = TripJournal::new(api.clone(), data);
    let trip = journal.start_trip(vehicle.vehicle_id).await.map_err(|err| anyhow::anyhow!("Failed to start trip: {err:?}"))?;

    controller.start(trip.id).await.map_err(|err| anyhow::anyhow!("Failed to start tracking: {err:?}"))?;
    tokio::time::sleep(Duration::from_secs(30)).await;
    controller.stop().await;

    let finished = journal.end_trip(trip.id).await.map_err(|err| anyhow::anyhow!("Failed to end trip: {err:?}"))?;
    tracing::info!(
        "Trip {} finished: {:.1} km",
        finished.id,
        finished.total_distance_km.unwrap_or(0.0)
    );

    Ok(())
}
