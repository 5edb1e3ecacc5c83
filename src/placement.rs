//! Builds the destination directory of a media item from the configured placement order.

use crate::config::{LocationConfig, PlacementComponent};
use crate::location::LocationService;
use crate::location::geocode::Geocoder;
use crate::structs::SortOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Composes `<output>/<segments...>` for one item at a time. Nothing is cached between items.
#[derive(Clone)]
pub struct PlacementEngine {
    config: Arc<LocationConfig>,
    sort: SortOptions,
    geocoder: Arc<Geocoder>,
}

impl PlacementEngine {
    pub fn new(config: LocationConfig, sort: SortOptions, geocoder: Arc<Geocoder>) -> Self {
        Self {
            config: Arc::new(config),
            sort,
            geocoder,
        }
    }

    /// Resolves and creates the directory an item is placed under.
    ///
    /// The location lookup runs as its own task while the other segments are prepared; its
    /// label only enters the path once that task has been joined. Any lookup or geocoding
    /// failure yields the configured fallback label.
    pub async fn resolve(
        &self,
        output: &Path,
        date_folder: &str,
        device_name: &str,
        source: &Path,
        locator: Option<Arc<dyn LocationService>>,
    ) -> std::io::Result<PathBuf> {
        let wants_location = self.sort.by_location
            && self.config.order.contains(&PlacementComponent::Location);
        let mut location_task = match locator {
            Some(locator) if wants_location => Some(tokio::spawn(location_label(
                locator,
                Arc::clone(&self.geocoder),
                Arc::clone(&self.config),
                source.to_path_buf(),
            ))),
            _ => None,
        };

        let mut folder = output.to_path_buf();
        for component in &self.config.order {
            match component {
                PlacementComponent::Date => folder.push(date_folder),
                PlacementComponent::Camera if self.sort.by_camera => folder.push(device_name),
                PlacementComponent::Location => {
                    if let Some(task) = location_task.take() {
                        let label = task.await.unwrap_or_else(|err| {
                            debug!(file = %source.display(), error = %err, "Location task failed");
                            self.config.fallback.clone()
                        });
                        folder.push(label);
                    }
                }
                PlacementComponent::Camera => {}
            }
        }

        tokio::fs::create_dir_all(&folder).await?;
        Ok(folder)
    }
}

async fn location_label(
    locator: Arc<dyn LocationService>,
    geocoder: Arc<Geocoder>,
    config: Arc<LocationConfig>,
    source: PathBuf,
) -> String {
    match locator.location(&source).await {
        Ok(coordinates) => geocoder.label(&coordinates, &config),
        Err(err) => {
            debug!(file = %source.display(), error = %err, "No location, using fallback");
            config.fallback.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use crate::location::Coordinates;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FixedLocation(Option<Coordinates>);

    #[async_trait]
    impl LocationService for FixedLocation {
        async fn location(&self, _path: &Path) -> Result<Coordinates, ExtractError> {
            self.0.ok_or(ExtractError::NoGpsData)
        }
    }

    fn engine(order: Vec<PlacementComponent>, sort: SortOptions) -> PlacementEngine {
        let config = LocationConfig {
            order,
            ..LocationConfig::default()
        };
        PlacementEngine::new(config, sort, Arc::new(Geocoder::new()))
    }

    fn all_sorting() -> SortOptions {
        SortOptions {
            by_camera: true,
            by_location: true,
        }
    }

    #[tokio::test]
    async fn test_default_order_with_failed_lookup() -> std::io::Result<()> {
        let out = TempDir::new()?;
        let engine = engine(LocationConfig::default().order, all_sorting());

        let folder = engine
            .resolve(
                out.path(),
                "05-01-2023",
                "HERO9 Black",
                Path::new("GX010001.MP4"),
                Some(Arc::new(FixedLocation(None))),
            )
            .await?;

        assert_eq!(
            folder,
            out.path().join("05-01-2023").join("NoLocation").join("HERO9 Black")
        );
        assert!(folder.is_dir(), "destination must be created");
        Ok(())
    }

    #[tokio::test]
    async fn test_geocoded_location_segment() -> std::io::Result<()> {
        let out = TempDir::new()?;
        let engine = engine(vec![PlacementComponent::Location], all_sorting());
        let amsterdam = Coordinates {
            latitude: 52.379_189,
            longitude: 4.899_431,
        };

        let folder = engine
            .resolve(
                out.path(),
                "05-01-2023",
                "cam",
                Path::new("GOPR0001.JPG"),
                Some(Arc::new(FixedLocation(Some(amsterdam)))),
            )
            .await?;

        let label = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        assert!(label.starts_with("Amsterdam"), "unexpected label {label}");
        Ok(())
    }

    #[tokio::test]
    async fn test_disabled_segments_are_skipped() -> std::io::Result<()> {
        let out = TempDir::new()?;
        let engine = engine(
            vec![
                PlacementComponent::Camera,
                PlacementComponent::Location,
                PlacementComponent::Date,
            ],
            SortOptions::default(),
        );

        let folder = engine
            .resolve(
                out.path(),
                "2023-01-05",
                "cam",
                Path::new("x.MP4"),
                Some(Arc::new(FixedLocation(None))),
            )
            .await?;

        assert_eq!(folder, out.path().join("2023-01-05"));
        Ok(())
    }

    #[tokio::test]
    async fn test_no_service_means_no_location_segment() -> std::io::Result<()> {
        let out = TempDir::new()?;
        let engine = engine(
            vec![PlacementComponent::Location, PlacementComponent::Camera],
            all_sorting(),
        );

        let folder = engine
            .resolve(out.path(), "d", "Insta360 X3", Path::new("VID.insv"), None)
            .await?;

        assert_eq!(folder, out.path().join("Insta360 X3"));
        Ok(())
    }
}
