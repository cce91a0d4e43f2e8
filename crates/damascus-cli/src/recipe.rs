//! Recipe files: a billet, the operations to apply and what to write out.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use damascus_kernel::ops::{
    CompressParams, DrillParams, ForgeParams, ForgeProfile, TwistParams, WedgeParams,
};
use damascus_kernel::{BilletConfig, Operation};
use damascus_section::SectionSettings;
use serde::{Deserialize, Serialize};

/// Which mesh files to write after the operations have run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MeshOutput {
    /// No mesh files.
    #[default]
    None,
    /// One STL per layer.
    Layers,
    /// A single STL holding every layer.
    Merged,
}

/// A whole patterning session described as data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recipe {
    /// Used as the output file prefix.
    pub name: String,
    pub billet: BilletConfig,
    pub operations: Vec<Operation>,
    /// Cross-sections to extract once all operations have run.
    pub sections: Vec<SectionSettings>,
    pub mesh: MeshOutput,
}

impl Recipe {
    /// Parse TOML or JSON, chosen by file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read recipe {}", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let mut recipe: Recipe = match ext.to_lowercase().as_str() {
            "toml" => toml::from_str(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?,
            "json" => serde_json::from_str(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?,
            _ => bail!("unknown recipe format: {:?} (expected .toml or .json)", ext),
        };
        if recipe.name.is_empty() {
            recipe.name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("billet")
                .to_string();
        }
        Ok(recipe)
    }

    /// Check every part before any geometry is built.
    pub fn validate(&self) -> Result<()> {
        self.billet.validate()?;
        for (i, op) in self.operations.iter().enumerate() {
            op.validate()
                .with_context(|| format!("operation {} ({})", i + 1, op.name()))?;
        }
        for (i, section) in self.sections.iter().enumerate() {
            section
                .validate()
                .with_context(|| format!("section {}", i + 1))?;
        }
        Ok(())
    }
}

/// The built-in walkthroughs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Demo {
    /// Wedge split into a feather pattern.
    Feather,
    /// Forge to a square bar, twist and consolidate (ladder).
    Twist,
    /// Nine drilled holes closed by compression.
    Raindrop,
}

impl Demo {
    pub fn recipe(self) -> Recipe {
        match self {
            Demo::Feather => Recipe {
                name: "feather".into(),
                billet: BilletConfig::default(),
                operations: vec![Operation::Wedge(WedgeParams {
                    depth: 18.0,
                    angle_degrees: 35.0,
                    split_gap: 6.0,
                })],
                sections: vec![pattern_section()],
                mesh: MeshOutput::None,
            },
            Demo::Twist => Recipe {
                name: "twist".into(),
                billet: BilletConfig {
                    layer_count: 24,
                    white_thickness: 1.0,
                    black_thickness: 1.0,
                    width: 40.0,
                    length: 120.0,
                },
                operations: vec![
                    Operation::Forge(ForgeParams {
                        target_size: 20.0,
                        num_heats: 5,
                        profile: ForgeProfile::Square,
                    }),
                    Operation::Twist(TwistParams {
                        angle_degrees: 180.0,
                    }),
                    Operation::Compress(CompressParams { factor: 0.7 }),
                ],
                sections: vec![pattern_section()],
                mesh: MeshOutput::None,
            },
            Demo::Raindrop => {
                let mut operations: Vec<Operation> = [-20.0, 0.0, 20.0]
                    .into_iter()
                    .flat_map(|y| {
                        [-15.0, 0.0, 15.0].into_iter().map(move |x| {
                            Operation::Drill(DrillParams { x, y, radius: 6.0 })
                        })
                    })
                    .collect();
                operations.push(Operation::Compress(CompressParams { factor: 0.5 }));
                Recipe {
                    name: "raindrop".into(),
                    billet: BilletConfig {
                        layer_count: 25,
                        white_thickness: 0.8,
                        black_thickness: 0.8,
                        width: 60.0,
                        length: 80.0,
                    },
                    operations,
                    sections: vec![pattern_section()],
                    mesh: MeshOutput::None,
                }
            }
        }
    }
}

fn pattern_section() -> SectionSettings {
    SectionSettings {
        slice_position: 0.0,
        resolution: 800,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FEATHER_TOML: &str = r#"
name = "my-feather"
mesh = "merged"

[billet]
layer_count = 12
width = 40.0

[[operations]]
type = "wedge"
depth = 10.0
angle_degrees = 30.0
split_gap = 4.0

[[operations]]
type = "forge"
target_size = 15.0
num_heats = 3
profile = { shape = "octagon", chamfer_fraction = 0.2 }

[[operations]]
type = "drill_grid"
grid_size = 2
spacing = 10.0
radius = 3.0

[[sections]]
slice_position = 5.0
resolution = 64
"#;

    #[test]
    fn test_parse_toml_recipe() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(FEATHER_TOML.as_bytes()).unwrap();

        let recipe = Recipe::load(file.path()).unwrap();
        assert_eq!(recipe.name, "my-feather");
        assert_eq!(recipe.mesh, MeshOutput::Merged);
        assert_eq!(recipe.billet.layer_count, 12);
        assert_eq!(recipe.billet.width, 40.0);
        // Unspecified billet fields keep their defaults.
        assert_eq!(recipe.billet.length, 100.0);
        assert_eq!(recipe.operations.len(), 3);
        assert!(matches!(
            recipe.operations[1],
            Operation::Forge(ForgeParams {
                profile: ForgeProfile::Octagon { .. },
                ..
            })
        ));
        assert_eq!(recipe.sections[0].resolution, 64);
        recipe.validate().unwrap();
    }

    #[test]
    fn test_json_recipe_name_from_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ladder.json");
        let recipe = Recipe {
            name: String::new(),
            ..Demo::Twist.recipe()
        };
        fs::write(&path, serde_json::to_string(&recipe).unwrap()).unwrap();

        let loaded = Recipe::load(&path).unwrap();
        assert_eq!(loaded.name, "ladder");
        assert_eq!(loaded.operations, recipe.operations);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipe.yaml");
        fs::write(&path, "name: x").unwrap();
        assert!(Recipe::load(&path).is_err());
    }

    #[test]
    fn test_validate_names_failing_operation() {
        let mut recipe = Demo::Feather.recipe();
        recipe.operations.push(Operation::Compress(CompressParams { factor: -1.0 }));
        let err = recipe.validate().unwrap_err();
        assert!(format!("{err:#}").contains("operation 2 (compression)"));
    }

    #[test]
    fn test_bundled_recipes_load() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../recipes");
        let ladder = Recipe::load(&dir.join("octagon-ladder.toml")).unwrap();
        ladder.validate().unwrap();
        assert_eq!(ladder.sections.len(), 2);

        let raindrop = Recipe::load(&dir.join("raindrop-grid.json")).unwrap();
        raindrop.validate().unwrap();
        assert_eq!(raindrop.mesh, MeshOutput::Layers);
        assert_eq!(raindrop.billet.white_thickness, 0.8);

        let settings = damascus_kernel::Settings::load(dir.join("settings.toml")).unwrap();
        assert_eq!(settings.limits.twist_angle.max, 720.0);
        assert_eq!(settings.limits.wedge_depth.max, 30.0);
    }

    #[test]
    fn test_demos_are_valid() {
        for demo in [Demo::Feather, Demo::Twist, Demo::Raindrop] {
            demo.recipe().validate().unwrap();
        }
        let raindrop = Demo::Raindrop.recipe();
        assert_eq!(raindrop.operations.len(), 10);
        assert_eq!(
            raindrop.operations[0],
            Operation::Drill(DrillParams {
                x: -15.0,
                y: -20.0,
                radius: 6.0
            })
        );
    }
}
