use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use voxlink::{
    common,
    configs::Config,
    resolver::{CatalogResolver, DurationPolicy},
    scheduler::{ChannelSink, Scheduler},
    transport::{LoopbackController, spawn_event_pump},
};

mod console;

use console::{Console, HELP};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Falling back to built-in defaults: {}", e);
            Config::default()
        }
    };

    common::logger::init(config.logging.as_ref());

    let (event_tx, event_rx) = flume::unbounded();
    let transport = LoopbackController::new(true).with_events(event_tx);

    let (sink, notifications) = ChannelSink::unbounded();
    tokio::spawn(async move {
        while let Ok(event) = notifications.recv_async().await {
            match serde_json::to_string(&event) {
                Ok(json) => println!("{}", json),
                Err(e) => warn!("Failed to serialize notification: {}", e),
            }
        }
    });

    let catalog = Arc::new(CatalogResolver::new(DurationPolicy::new(
        config.limits.clone(),
    )));
    console::demo_catalog(&catalog);

    let scheduler = Scheduler::builder(Arc::new(transport.clone()), Arc::new(sink))
        .resolver(catalog.clone())
        .config(config.scheduler.clone())
        .limits(config.limits.clone())
        .build();
    spawn_event_pump(scheduler.clone(), event_rx);

    let console = Console::new(scheduler.clone(), transport, catalog);
    info!("voxlink console ready, type `help` for commands");
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match console::parse(&line) {
                    Ok(command) => console.run(command).await,
                    Err(e) => warn!("{}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    scheduler.end_all().await;
    Ok(())
}
