//! Loading rules and match setups from RON files.

use std::path::Path;

use elemental_core::data::GameRules;
use elemental_core::scenario::MatchConfig;

use crate::error::{Result, RunnerError};

fn read(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(RunnerError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Load and validate a ruleset.
pub fn load_rules<P: AsRef<Path>>(path: P) -> Result<GameRules> {
    let text = read(path.as_ref())?;
    Ok(GameRules::from_ron_str(&text)?)
}

/// Load a full match setup. Its rules are validated when the match is built.
pub fn load_match<P: AsRef<Path>>(path: P) -> Result<MatchConfig> {
    let text = read(path.as_ref())?;
    match_from_ron_str(&text)
}

/// Parse a match setup from RON text.
pub fn match_from_ron_str(text: &str) -> Result<MatchConfig> {
    Ok(ron::from_str(text)?)
}

/// Write a ruleset as pretty RON, e.g. to seed an override file.
pub fn save_rules<P: AsRef<Path>>(rules: &GameRules, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, rules.to_ron_string()?)?;
    Ok(())
}
