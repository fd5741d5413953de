use std::path::Path;
use std::process::Command;
use serde::Deserialize;

/// swaybg `-m` scaling modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    Stretch,
    Fit,
    #[default]
    Fill,
    Center,
    Tile,
    SolidColor,
}

impl FitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitMode::Stretch => "stretch",
            FitMode::Fit => "fit",
            FitMode::Fill => "fill",
            FitMode::Center => "center",
            FitMode::Tile => "tile",
            FitMode::SolidColor => "solid_color",
        }
    }
}

impl std::fmt::Display for FitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renderer settings taken from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// swaybg output selector, `*` for every output.
    pub output: String,
    pub mode: FitMode,
    /// Run the palette tool after the renderer starts.
    pub generate_palette: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output: "*".to_string(),
            mode: FitMode::Fill,
            generate_palette: true,
        }
    }
}

pub const RENDERER: &str = "swaybg";
pub const PALETTE_TOOL: &str = "wal";

#[derive(Debug, Clone, Default)]
pub struct CommandBuilder;

impl CommandBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build_renderer_command(&self, image_path: &Path, config: &OutputConfig) -> Command {
        let mut cmd = Command::new(RENDERER);
        cmd.args(["-o", &config.output])
            .arg("-i")
            .arg(image_path)
            .args(["-m", config.mode.as_str()]);
        cmd
    }

    /// Terminates every running renderer. Exit status 1 just means none was running.
    pub fn build_kill_command(&self) -> Command {
        let mut cmd = Command::new("pkill");
        cmd.args(["-x", RENDERER]);
        cmd
    }

    pub fn build_palette_command(&self, image_path: &Path) -> Command {
        let mut cmd = Command::new(PALETTE_TOOL);
        cmd.arg("-i").arg(image_path).args(["-n", "-q"]);
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect()
    }

    #[test]
    fn test_renderer_command() {
        let config = OutputConfig {
            output: "DP-1".to_string(),
            mode: FitMode::Center,
            generate_palette: false,
        };
        let cmd = CommandBuilder::new().build_renderer_command(Path::new("/walls/a.png"), &config);

        assert_eq!(cmd.get_program(), "swaybg");
        assert_eq!(args(&cmd), vec!["-o", "DP-1", "-i", "/walls/a.png", "-m", "center"]);
    }

    #[test]
    fn test_palette_and_kill_commands() {
        let builder = CommandBuilder::new();

        let palette = builder.build_palette_command(Path::new("/walls/a.png"));
        assert_eq!(palette.get_program(), "wal");
        assert_eq!(args(&palette), vec!["-i", "/walls/a.png", "-n", "-q"]);

        let kill = builder.build_kill_command();
        assert_eq!(args(&kill), vec!["-x", "swaybg"]);
    }

    #[test]
    fn test_fit_mode_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: FitMode,
        }

        let parsed: Wrapper = toml::from_str("mode = \"solid_color\"").unwrap();
        assert_eq!(parsed.mode, FitMode::SolidColor);
        assert_eq!(FitMode::default().to_string(), "fill");
        assert!(toml::from_str::<Wrapper>("mode = \"zoom\"").is_err());
    }
}
