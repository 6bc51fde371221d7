//! Config subcommand handlers.

use std::fmt::Write as _;
use std::io::IsTerminal;

use dialoguer::{Input, Password};

use matterhub_config::{HomeAssistant, resolve_access_token, store_access_token};

use crate::cli::{ConfigArgs, ConfigCommand, ConfigInitArgs, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output::{self, Render};

use super::util::prompt_err;

const DEFAULT_URL: &str = "http://homeassistant.local:8123";

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of the config with secrets masked.
fn redacted(cfg: &Config) -> Config {
    let mut masked = cfg.clone();
    if masked.home_assistant.access_token.is_some() {
        masked.home_assistant.access_token = Some("****".into());
    }
    masked
}

/// Config as shown by `config show`: secrets masked, the TOML form for
/// humans, plus where storage and the token resolve to.
#[derive(serde::Serialize)]
#[serde(transparent)]
struct ShownConfig<'a> {
    #[serde(skip)]
    actual: &'a Config,
    masked: Config,
}

impl<'a> ShownConfig<'a> {
    fn new(actual: &'a Config) -> Self {
        Self {
            actual,
            masked: redacted(actual),
        }
    }
}

impl Render for ShownConfig<'_> {
    fn human(&self) -> String {
        let mut out = toml::to_string_pretty(&self.masked)
            .unwrap_or_else(|e| format!("# failed to render config: {e}\n"));
        let _ = writeln!(out);
        let _ = writeln!(out, "# storage path: {}", self.actual.storage_path().display());
        let token = if resolve_access_token(self.actual).is_ok() {
            "resolved"
        } else {
            "missing"
        };
        let _ = write!(out, "# access token: {token}");
        out
    }

    fn ids(&self) -> Vec<String> {
        vec![self.masked.home_assistant.url.clone()]
    }
}

fn prompt_url() -> Result<String, CliError> {
    if !std::io::stdin().is_terminal() {
        return Ok(DEFAULT_URL.into());
    }
    Input::new()
        .with_prompt("Home Assistant URL")
        .default(DEFAULT_URL.to_owned())
        .interact_text()
        .map_err(prompt_err)
}

fn init(args: ConfigInitArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::active_config_path(global);
    if path.exists() && !args.force {
        return Err(CliError::ConfigExists {
            path: path.display().to_string(),
        });
    }

    let url = match args.url {
        Some(url) => url,
        None => prompt_url()?,
    };

    let mut cfg = Config {
        home_assistant: HomeAssistant {
            url,
            access_token: None,
            access_token_env: args.access_token_env,
        },
        storage_location: args.storage,
        ..Config::default()
    };
    if let Some(level) = args.log_level {
        cfg.log_level = level;
    }
    cfg.validate()?;

    config::save_config_to(&path, &cfg)?;
    output::status(global, &format!("Configuration written to {}", path.display()));
    if cfg.home_assistant.access_token_env.is_none() {
        output::status(global, "Store the access token with: matterhub config set-token");
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init(init_args) => init(init_args, global),

        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            output::emit(global, &ShownConfig::new(&cfg));
            Ok(())
        }

        ConfigCommand::Path => {
            output::line(global, &config::active_config_path(global).display().to_string());
            Ok(())
        }

        ConfigCommand::SetToken => {
            if !std::io::stdin().is_terminal() {
                return Err(CliError::Validation {
                    field: "access_token".into(),
                    reason: "set-token needs an interactive terminal".into(),
                });
            }
            let token = Password::new()
                .with_prompt("Home Assistant access token")
                .interact()
                .map_err(prompt_err)?;
            if token.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "access_token".into(),
                    reason: "token cannot be empty".into(),
                });
            }
            store_access_token(token.trim())?;
            output::status(global, "Access token stored in the system keyring");
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn redaction_masks_plaintext_token_only() {
        let mut cfg = Config::default();
        assert_eq!(redacted(&cfg).home_assistant.access_token, None);

        cfg.home_assistant.access_token = Some("secret".into());
        let shown = ShownConfig::new(&cfg).human();
        assert!(shown.contains("****"));
        assert!(!shown.contains("secret"));
        assert!(shown.contains("# storage path:"));
    }
}
