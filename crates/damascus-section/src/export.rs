//! Raster hand-off to external image writers.

use std::io;
use std::time::Instant;

use damascus_kernel::{param_map, Billet, OperationRecord};

use crate::error::{Result, SectionError};
use crate::slice::{extract_cross_section, CrossSection, SectionSettings};

const OPERATION: &str = "export_cross_section";

/// An image encoder for cross-section rasters (PNG, PGM, ...).
pub trait RasterWriter {
    /// Short format name for logs, e.g. `png`.
    fn format(&self) -> &str;

    /// Encode the raster.
    fn write_raster(&mut self, section: &CrossSection) -> io::Result<()>;
}

/// Slice the billet and hand the raster to `writer`.
///
/// The attempt is appended to the billet history with a `success` stat,
/// including when the writer fails; the geometry is never touched.
pub fn export_cross_section(
    billet: &mut Billet,
    settings: &SectionSettings,
    writer: &mut dyn RasterWriter,
) -> Result<CrossSection> {
    let started = Instant::now();
    let section = extract_cross_section(billet, settings)?;
    let outcome = writer.write_raster(&section);

    let stats = section.stats();
    billet.record(OperationRecord::new(
        OPERATION,
        param_map(&[
            ("slice_position", settings.slice_position),
            ("resolution", settings.resolution as f64),
        ]),
        started.elapsed().as_secs_f64(),
        param_map(&[
            ("success", if outcome.is_ok() { 1.0 } else { 0.0 }),
            ("triangles_processed", stats.triangles_processed as f64),
            ("triangles_intersecting", stats.triangles_intersecting as f64),
            ("pixels_written", stats.pixels_written as f64),
        ]),
    ));

    match outcome {
        Ok(()) => {
            tracing::info!(format = writer.format(), slice = settings.slice_position, "exported cross-section");
            Ok(section)
        }
        Err(e) => {
            tracing::error!(format = writer.format(), error = %e, "cross-section export failed");
            Err(SectionError::Io(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use damascus_kernel::BilletConfig;

    #[derive(Default)]
    struct Keep {
        rasters: Vec<Vec<u8>>,
    }

    impl RasterWriter for Keep {
        fn format(&self) -> &str {
            "memory"
        }

        fn write_raster(&mut self, section: &CrossSection) -> io::Result<()> {
            self.rasters.push(section.pixels().to_vec());
            Ok(())
        }
    }

    struct DiskFull;

    impl RasterWriter for DiskFull {
        fn format(&self) -> &str {
            "broken"
        }

        fn write_raster(&mut self, _: &CrossSection) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
    }

    #[test]
    fn test_export_records_success() {
        let mut billet = Billet::from_config(&BilletConfig::default()).unwrap();
        let mut writer = Keep::default();
        let settings = SectionSettings {
            slice_position: 0.0,
            resolution: 32,
        };
        let section = export_cross_section(&mut billet, &settings, &mut writer).unwrap();

        assert_eq!(writer.rasters.len(), 1);
        assert_eq!(writer.rasters[0], section.pixels());
        let record = billet.history().last().unwrap();
        assert_eq!(record.operation, "export_cross_section");
        assert_eq!(record.stats["success"], 1.0);
        assert_eq!(record.parameters["resolution"], 32.0);
    }

    #[test]
    fn test_failed_export_still_recorded() {
        let mut billet = Billet::from_config(&BilletConfig::default()).unwrap();
        let before: Vec<_> = billet.layers().iter().map(|l| l.mesh().clone()).collect();
        let err = export_cross_section(&mut billet, &SectionSettings::default(), &mut DiskFull)
            .unwrap_err();
        assert!(matches!(err, SectionError::Io(_)));
        assert_eq!(billet.history().len(), 1);
        assert_eq!(billet.history().last().unwrap().stats["success"], 0.0);
        for (layer, original) in billet.layers().iter().zip(&before) {
            assert_eq!(layer.mesh(), original);
        }
    }

    #[test]
    fn test_invalid_settings_record_nothing() {
        let mut billet = Billet::from_config(&BilletConfig::default()).unwrap();
        let settings = SectionSettings {
            resolution: 0,
            ..Default::default()
        };
        assert!(export_cross_section(&mut billet, &settings, &mut Keep::default()).is_err());
        assert!(billet.history().is_empty());
    }
}
