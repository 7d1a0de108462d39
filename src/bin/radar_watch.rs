use std::collections::HashMap;
use std::time::Duration;

use dotenvy::dotenv;

use devradar::models::Developer;
use devradar::services::discovery_service::DiscoverySession;
use devradar::services::live_channel::{ChannelStatus, SocketIoChannel};
use devradar::services::location_service::FixedLocation;
use devradar::services::search_service::HttpSearchClient;
use devradar::RadarConfig;

// Usage: radar_watch [techs]
#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let techs = std::env::args().skip(1).collect::<Vec<_>>().join(" ");

    let config = match RadarConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("radar watch: {}", e);
            std::process::exit(2);
        }
    };
    let api = match HttpSearchClient::new(&config) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("radar watch: {}", e);
            std::process::exit(2);
        }
    };

    let mut session = DiscoverySession::new(api, SocketIoChannel::new(&config));
    if let Err(e) = session
        .locate(&FixedLocation::new(config.device_position))
        .await
    {
        eprintln!("radar watch: {} (set RADAR_LATITUDE and RADAR_LONGITUDE)", e);
        std::process::exit(1);
    }

    session.set_tech_filter(techs.clone());
    match session.search().await {
        Ok(count) => println!("snapshot techs='{}': {} developers", techs, count),
        Err(e) => {
            eprintln!("radar watch: search failed: {}", e);
            std::process::exit(1);
        }
    }

    let mut seen: HashMap<String, Developer> = HashMap::new();
    let mut last_status = ChannelStatus::Disconnected;
    let mut tick = tokio::time::interval(Duration::from_millis(500));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tick.tick() => {}
        }

        let status = session.channel_status();
        if status != last_status {
            println!("channel: {:?}", status);
            last_status = status;
        }

        for dev in session.developers() {
            let marker = match seen.get(&dev.id) {
                None => "+",
                Some(prev) if prev != &dev => "~",
                Some(_) => continue,
            };
            println!(
                "{} {} @ ({:.4}, {:.4}) [{}] {}",
                marker,
                dev.name,
                dev.latitude,
                dev.longitude,
                dev.techs_label(),
                dev.profile_url().unwrap_or_default()
            );
            seen.insert(dev.id.clone(), dev);
        }
    }

    session.close().await;
}
