use media_importer::structs::{ImportParams, SortOptions};
use media_importer::{EngineConfig, ImportError, MediaImporter};
use std::env;
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Imports a mounted card into a folder and prints what happened.
///
/// `cargo run --example import_folder -- <card> <output> [config.toml]`
#[tokio::main]
async fn main() -> Result<(), ImportError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("media_importer=info")))
        .with(fmt::layer())
        .init();

    let mut args = env::args().skip(1);
    let input = args.next().unwrap_or_else(|| "/media/sdcard".to_string());
    let output = args.next().unwrap_or_else(|| "./imported".to_string());
    let config = match args.next() {
        Some(path) => EngineConfig::load(Path::new(&path))?,
        None => EngineConfig::default(),
    };

    let importer = MediaImporter::builder().config(config).build()?;
    let params = ImportParams::builder()
        .input(input)
        .output(output)
        .sort(SortOptions {
            by_camera: true,
            by_location: true,
        })
        .build();

    let result = importer.import(params).await?;
    println!("Imported {} of {} files", result.files_imported, result.attempted());
    for error in &result.errors {
        println!("\t{error}");
    }

    Ok(())
}
