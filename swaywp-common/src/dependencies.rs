use std::path::PathBuf;

use crate::command_builder::{PALETTE_TOOL, RENDERER};
use crate::error::DependencyError;
use crate::notify::NOTIFY_TOOL;
use crate::picker::{PICKER_TOOL, THUMBNAIL_TOOL};
use crate::Result;

/// What the current invocation is about to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Interactive,
    SetPath,
    Auto,
}

/// External tools `mode` will call.
pub fn required_tools(mode: RunMode, generate_palette: bool) -> Vec<&'static str> {
    let mut tools = vec![RENDERER, NOTIFY_TOOL];
    if generate_palette {
        tools.push(PALETTE_TOOL);
    }
    if mode == RunMode::Interactive {
        tools.push(PICKER_TOOL);
        tools.push(THUMBNAIL_TOOL);
    }
    tools
}

/// Resolves every tool on `PATH`. All missing tools are reported together.
pub fn check_dependencies(tools: &[&str]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::with_capacity(tools.len());
    let mut missing = Vec::new();

    for tool in tools {
        match which::which(tool) {
            Ok(path) => {
                log::debug!("Found {} at {:?}", tool, path);
                found.push(path);
            }
            Err(_) => missing.push(tool.to_string()),
        }
    }

    if !missing.is_empty() {
        log::error!("Missing required tools: {}", missing.join(", "));
        return Err(DependencyError::Missing { tools: missing }.into());
    }
    Ok(found)
}
