#![allow(dead_code)]

use runonsave::config::{CommandConfig, ConfigFile, ConfigSection, RawConfigFile};
use runonsave::types::{KillSignal, OutputPanelPolicy};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                commands: Vec::new(),
            },
        }
    }

    pub fn with_command(mut self, command: CommandConfig) -> Self {
        self.config.commands.push(command);
        self
    }

    pub fn shell(mut self, shell: &str) -> Self {
        self.config.config.shell = Some(shell.to_string());
        self
    }

    pub fn auto_clear_console(mut self, val: bool) -> Self {
        self.config.config.auto_clear_console = val;
        self
    }

    pub fn ignore_unchanged_files(mut self, val: bool) -> Self {
        self.config.config.ignore_unchanged_files = val;
        self
    }

    pub fn message(mut self, text: &str) -> Self {
        self.config.config.message = Some(text.to_string());
        self
    }

    pub fn message_after(mut self, text: &str) -> Self {
        self.config.config.message_after = Some(text.to_string());
        self
    }

    pub fn show_elapsed(mut self, val: bool) -> Self {
        self.config.config.show_elapsed = val;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one `[[commands]]` entry.
pub struct CommandConfigBuilder {
    command: CommandConfig,
}

impl CommandConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            command: CommandConfig {
                cmd: Some(cmd.to_string()),
                ..CommandConfig::default()
            },
        }
    }

    /// An entry without a command line.
    pub fn message_only(message: &str) -> Self {
        Self {
            command: CommandConfig {
                message: Some(message.to_string()),
                ..CommandConfig::default()
            },
        }
    }

    pub fn matching(mut self, pattern: &str) -> Self {
        self.command.match_pattern = Some(pattern.to_string());
        self
    }

    pub fn not_matching(mut self, pattern: &str) -> Self {
        self.command.not_match = Some(pattern.to_string());
        self
    }

    pub fn message(mut self, text: &str) -> Self {
        self.command.message = Some(text.to_string());
        self
    }

    pub fn message_after(mut self, text: &str) -> Self {
        self.command.message_after = Some(text.to_string());
        self
    }

    pub fn parallel(mut self) -> Self {
        self.command.is_async = true;
        self
    }

    pub fn show_elapsed(mut self, val: bool) -> Self {
        self.command.show_elapsed = val;
        self
    }

    pub fn output_panel(mut self, policy: OutputPanelPolicy) -> Self {
        self.command.auto_show_output_panel = policy;
        self
    }

    pub fn kill_signal(mut self, signal: KillSignal) -> Self {
        self.command.kill_signal = signal;
        self
    }

    pub fn build(self) -> CommandConfig {
        self.command
    }
}
