//! Export query example
//!
//! This example demonstrates the core functionality of redshift-unload:
//! - Loading configuration from a JSON file
//! - Connecting to the warehouse and the bucket
//! - Subscribing to progress events
//! - Exporting a query into a single gzip file with a header line
//! - Shutting down cleanly on Ctrl+C
//!
//! ```bash
//! cargo run --example export_query -- unload.json "SELECT * FROM sales" sales.csv.gz
//! ```

use redshift_unload::{Config, Error, Event, Unloader, shutdown_on_signal};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let (Some(config_path), Some(query), Some(destination)) = (args.next(), args.next(), args.next())
    else {
        eprintln!("usage: export_query <config.json> <query> <destination.gz>");
        std::process::exit(2);
    };

    // Load and check configuration
    let config = Config::from_json_file(&config_path)?;
    config.validate()?;

    // Connect both clients
    let unloader = Unloader::connect(config).await?;

    // Cancel the export on SIGINT/SIGTERM
    tokio::spawn(shutdown_on_signal(unloader.clone()));

    // Subscribe to events
    let mut events = unloader.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::StageReached { session_id, stage } => {
                    println!("→ [{}] {}", session_id, stage);
                }
                Event::PartitionDownloaded {
                    key,
                    bytes,
                    completed,
                    total,
                    ..
                } => {
                    println!("⬇ {}/{} {} ({} bytes)", completed, total, key, bytes);
                }
                Event::Completed {
                    destination,
                    bytes_written,
                    ..
                } => {
                    println!("✓ wrote {} bytes to {:?}", bytes_written, destination);
                }
                Event::Failed {
                    stage,
                    error,
                    remote_objects_may_remain,
                    ..
                } => {
                    println!("✗ failed during {}: {}", stage, error);
                    if remote_objects_may_remain {
                        println!("  remote partitions may remain in the bucket");
                    }
                }
            }
        }
    });

    let result = unloader.export(&query, &destination, true).await;

    match &result {
        Ok(summary) => {
            println!(
                "Exported {} partition(s) in {:.1}s",
                summary.partitions,
                summary.elapsed.as_secs_f64()
            );
        }
        Err(Error::Export(failure)) => {
            eprintln!("Export failed: {}", failure);
            if failure.remote_objects_may_remain() {
                eprintln!("  leftover prefix: {}", failure.remote_prefix);
                for key in &failure.remote_keys {
                    eprintln!("    {}", key);
                }
            }
            if let Some(dir) = failure.staging_dir.as_ref().filter(|_| failure.staging_dir_remains()) {
                eprintln!("  leftover staging directory: {:?}", dir);
            }
        }
        Err(e) => eprintln!("Export failed: {}", e),
    }

    unloader.close().await?;
    result?;
    Ok(())
}
