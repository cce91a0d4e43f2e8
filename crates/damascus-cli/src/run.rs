//! Executes a recipe against a fresh session and writes its outputs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use damascus_kernel::{BilletStats, OperationReport, Session, Settings};
use damascus_section::export_cross_section;

use crate::recipe::{MeshOutput, Recipe};
use crate::writers::{PngWriter, StlWriter};

/// What a recipe run produced.
pub struct RunOutput {
    pub files: Vec<PathBuf>,
    pub reports: Vec<OperationReport>,
    pub stats: BilletStats,
}

/// Build the billet and apply every operation in order, in memory only.
pub fn simulate(recipe: &Recipe, settings: Settings) -> Result<(Session, Vec<OperationReport>)> {
    recipe.validate()?;
    let mut session = Session::new(recipe.billet.clone(), settings)?;
    let mut reports = Vec::with_capacity(recipe.operations.len());
    for (i, op) in recipe.operations.iter().enumerate() {
        let report = session
            .apply(op.clone())
            .with_context(|| format!("operation {} ({}) failed", i + 1, op.name()))?;
        reports.push(report);
    }
    Ok((session, reports))
}

/// Run the recipe and write sections, meshes and the operation log into `out_dir`.
pub fn run(recipe: &Recipe, settings: Settings, out_dir: &Path) -> Result<RunOutput> {
    let (mut session, reports) = simulate(recipe, settings)?;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut files = Vec::new();
    for (i, section) in recipe.sections.iter().enumerate() {
        let mut writer = PngWriter::new(out_dir.join(format!("{}_section_{:02}.png", recipe.name, i)));
        export_cross_section(session.billet_mut(), section, &mut writer)
            .with_context(|| format!("failed to write {}", writer.path().display()))?;
        files.push(writer.path().to_path_buf());
    }

    if recipe.mesh != MeshOutput::None {
        let mut writer = StlWriter::new(out_dir, recipe.name.as_str());
        session
            .billet_mut()
            .export_meshes(&mut writer, recipe.mesh == MeshOutput::Merged)
            .context("mesh export failed")?;
        files.extend_from_slice(writer.written());
    }

    let log_path = out_dir.join(format!("{}_operations.json", recipe.name));
    session
        .billet()
        .operation_log()
        .write_json(&log_path)
        .with_context(|| format!("failed to write {}", log_path.display()))?;
    files.push(log_path);

    tracing::info!(recipe = %recipe.name, files = files.len(), "recipe complete");
    Ok(RunOutput {
        files,
        reports,
        stats: session.billet().stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::Demo;
    use damascus_kernel::ops::{CompressParams, TwistParams};
    use damascus_kernel::{BilletError, Operation, OperationLog, SessionSettings};

    fn small(demo: Demo) -> Recipe {
        let mut recipe = demo.recipe();
        for section in &mut recipe.sections {
            section.resolution = 64;
        }
        recipe
    }

    #[test]
    fn test_feather_run_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let out = run(&small(Demo::Feather), Settings::default(), dir.path()).unwrap();

        let png = dir.path().join("feather_section_00.png");
        let log = dir.path().join("feather_operations.json");
        assert_eq!(out.files, vec![png.clone(), log.clone()]);
        assert!(png.exists());

        let parsed = OperationLog::from_json(&fs::read_to_string(&log).unwrap()).unwrap();
        let names: Vec<_> = parsed.operations.iter().map(|r| r.operation.as_str()).collect();
        assert_eq!(names, ["wedge_deformation", "export_cross_section"]);
        assert_eq!(parsed.billet_info.layer_count, 30);
        assert_eq!(out.reports.len(), 1);
    }

    #[test]
    fn test_merged_mesh_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut recipe = small(Demo::Raindrop);
        recipe.mesh = MeshOutput::Merged;
        recipe.sections.clear();
        let out = run(&recipe, Settings::default(), dir.path()).unwrap();

        let stl = dir.path().join("raindrop_billet.stl");
        assert!(out.files.contains(&stl));
        assert_eq!(fs::metadata(&stl).unwrap().len(), 84 + 25 * 12 * 50);
        assert_eq!(out.stats.layer_count, 25);
        // Nine holes, one compression, one export.
        assert_eq!(out.stats.operation_count, 11);
    }

    #[test]
    fn test_twist_before_forge_is_rejected() {
        let mut recipe = Demo::Feather.recipe();
        recipe.operations = vec![
            Operation::Twist(TwistParams { angle_degrees: 90.0 }),
            Operation::Compress(CompressParams { factor: 0.8 }),
        ];
        let err = simulate(&recipe, Settings::default()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<BilletError>(),
            Some(BilletError::ForgeRequired)
        ));

        let relaxed = Settings {
            session: SessionSettings {
                require_forge_before_twist: false,
            },
            ..Default::default()
        };
        let (session, reports) = simulate(&recipe, relaxed).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(!session.billet().is_forged());
    }

    #[test]
    fn test_twist_demo_forges_first() {
        let (session, reports) = simulate(&Demo::Twist.recipe(), Settings::default()).unwrap();
        assert_eq!(reports[0].operation, "forge_square");
        assert!(session.billet().is_forged());
        assert_eq!(session.billet().width(), 20.0);
    }
}
