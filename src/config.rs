//! Build configuration
//!
//! What to build (input paths, output path, encoding) is kept separate from
//! how the filesystem image is produced (an optional external command run
//! through a [`BuildRunner`](crate::pipeline::BuildRunner)).
//!
//! A config file looks like:
//!
//! ```toml
//! output = ".pio/build/esp32dev/mz5_firm.bin"
//! encoding = "compressed"
//!
//! [inputs]
//! font = "src/fonts/TakaoPGothicC.ttf"
//! filesystem = ".pio/build/esp32dev/spiffs.bin"
//! firmware = ".pio/build/esp32dev/firmware.bin"
//!
//! [build]
//! program = "pio"
//! args = ["run", "--target", "buildfs", "--environment", "esp32dev"]
//! ```
//!
//! Relative paths resolve against the directory holding the config file.

use crate::compression::Encoding;
use crate::entry::{EntryRole, Label};
use crate::error::{ArchiveError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// PlatformIO environment of the reference deployment.
pub const DEFAULT_PIO_ENV: &str = "esp32dev";

/// Output file name inside the PlatformIO build directory.
pub const DEFAULT_OUTPUT_NAME: &str = "mz5_firm.bin";

/// Font resource shipped with the firmware sources.
pub const DEFAULT_FONT_PATH: &str = "src/fonts/TakaoPGothicC.ttf";

/// Paths of the three input blobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputPaths {
    pub font: PathBuf,
    pub filesystem: PathBuf,
    pub firmware: PathBuf,
}

impl InputPaths {
    pub fn path(&self, role: EntryRole) -> &Path {
        match role {
            EntryRole::Font => &self.font,
            EntryRole::Filesystem => &self.filesystem,
            EntryRole::Firmware => &self.firmware,
        }
    }
}

/// Optional label overrides; roles left unset use their default label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelOverrides {
    pub font: Option<String>,
    pub filesystem: Option<String>,
    pub firmware: Option<String>,
}

/// External command that produces the filesystem image.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl BuildCommand {
    /// `pio run --target buildfs --environment <env>`
    pub fn platformio_buildfs(env: &str, project_root: &Path) -> Self {
        BuildCommand {
            program: "pio".to_string(),
            args: ["run", "--target", "buildfs", "--environment", env]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            working_dir: Some(project_root.to_path_buf()),
        }
    }

    /// Command line for log and error messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Everything one pipeline run needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    pub inputs: InputPaths,
    pub output: PathBuf,
    #[serde(default)]
    pub encoding: Encoding,
    #[serde(default)]
    pub labels: LabelOverrides,
    /// Filesystem-image build step; `None` skips it
    pub build: Option<BuildCommand>,
}

impl BuildConfig {
    /// Layout of a PlatformIO project for environment `env`.
    pub fn platformio(project_root: &Path, env: &str) -> Self {
        let build_dir = project_root.join(".pio").join("build").join(env);
        BuildConfig {
            inputs: InputPaths {
                font: project_root.join(DEFAULT_FONT_PATH),
                filesystem: build_dir.join("spiffs.bin"),
                firmware: build_dir.join("firmware.bin"),
            },
            output: build_dir.join(DEFAULT_OUTPUT_NAME),
            encoding: Encoding::default(),
            labels: LabelOverrides::default(),
            build: Some(BuildCommand::platformio_buildfs(env, project_root)),
        }
    }

    /// Parse a TOML config, resolving relative paths against `base_dir`.
    pub fn from_toml_str(toml_str: &str, base_dir: &Path) -> Result<Self> {
        let mut config: BuildConfig = toml::from_str(toml_str)?;
        config.resolve_paths(base_dir);
        Ok(config)
    }

    /// Load a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            ArchiveError::Config(format!("reading config '{}': {}", path.display(), e))
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&text, base_dir)
    }

    /// Validated label for `role`.
    pub fn label(&self, role: EntryRole) -> Result<Label> {
        let custom = match role {
            EntryRole::Font => self.labels.font.as_deref(),
            EntryRole::Filesystem => self.labels.filesystem.as_deref(),
            EntryRole::Firmware => self.labels.firmware.as_deref(),
        };
        Label::new(custom.unwrap_or(role.default_label()))
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base_dir.join(&*p);
            }
        };

        resolve(&mut self.inputs.font);
        resolve(&mut self.inputs.filesystem);
        resolve(&mut self.inputs.firmware);
        resolve(&mut self.output);

        if let Some(build) = self.build.as_mut() {
            match build.working_dir.as_mut() {
                Some(dir) => resolve(dir),
                None => build.working_dir = Some(base_dir.to_path_buf()),
            }
        }
    }
}
