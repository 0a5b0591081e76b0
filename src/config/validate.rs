// src/config/validate.rs

use crate::config::model::{CommandRule, ConfigFile, RawConfigFile};
use crate::errors::{Result, RunOnSaveError};
use crate::matcher::RuleMatcher;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RunOnSaveError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_global_config(&raw)?;
        let RawConfigFile { config, commands } = raw;

        let mut rules = Vec::with_capacity(commands.len());
        for (index, command) in commands.into_iter().enumerate() {
            let matcher = RuleMatcher::compile(
                &format!("commands[{index}]"),
                command.match_pattern.as_deref(),
                command.not_match.as_deref(),
            )?;
            rules.push(CommandRule::new(command, matcher));
        }

        Ok(ConfigFile::new_unchecked(config, rules))
    }
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if let Some(shell) = &cfg.config.shell {
        if shell.trim().is_empty() {
            return Err(RunOnSaveError::ConfigError(
                "[config].shell must not be empty when set".to_string(),
            ));
        }
    }
    Ok(())
}
