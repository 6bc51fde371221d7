//! Bridge command handlers.

use std::fmt::Write as _;

use serde_json::json;
use tabled::Tabled;

use matterhub_core::{BridgeConfig, EntityFilter, FeatureFlags, Matcher};

use crate::cli::{BridgeAddArgs, BridgesArgs, BridgesCommand, FeatureFlagArg, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output::{self, Render};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct BridgeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Port")]
    port: u16,
    #[tabled(rename = "Country")]
    country: String,
    #[tabled(rename = "Include")]
    include: usize,
    #[tabled(rename = "Exclude")]
    exclude: usize,
    #[tabled(rename = "Flags")]
    flags: String,
}

impl From<&BridgeConfig> for BridgeRow {
    fn from(b: &BridgeConfig) -> Self {
        Self {
            id: b.id.clone(),
            name: b.name.clone(),
            port: b.port,
            country: b.country_code.clone().unwrap_or_default(),
            include: b.filter.include.len(),
            exclude: b.filter.exclude.len(),
            flags: enabled_flags(&b.feature_flags).join(", "),
        }
    }
}

fn enabled_flags(flags: &FeatureFlags) -> Vec<&'static str> {
    [
        (flags.matter_speakers, "matter-speakers"),
        (flags.matter_fans, "matter-fans"),
        (flags.cover_do_not_invert_percentage, "cover-do-not-invert-percentage"),
        (flags.cover_swap_open_close, "cover-swap-open-close"),
        (flags.include_hidden_entities, "include-hidden-entities"),
        (
            flags.use_on_off_sensor_as_default_for_binary_sensors,
            "use-on-off-sensor-as-default-for-binary-sensors",
        ),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect()
}

impl Render for [BridgeConfig] {
    fn human(&self) -> String {
        output::table(self.iter().map(BridgeRow::from))
    }

    fn ids(&self) -> Vec<String> {
        self.iter().map(|b| b.id.clone()).collect()
    }
}

impl Render for BridgeConfig {
    fn human(&self) -> String {
        detail(self)
    }

    fn ids(&self) -> Vec<String> {
        vec![self.id.clone()]
    }
}

fn detail(b: &BridgeConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID:       {}", b.id);
    let _ = writeln!(out, "Name:     {}", b.name);
    let _ = writeln!(out, "Port:     {}", b.port);
    if let Some(ref code) = b.country_code {
        let _ = writeln!(out, "Country:  {code}");
    }
    let _ = writeln!(out, "Include:");
    write_matchers(&mut out, &b.filter.include);
    let _ = writeln!(out, "Exclude:");
    write_matchers(&mut out, &b.filter.exclude);
    let flags = enabled_flags(&b.feature_flags);
    let _ = write!(
        out,
        "Flags:    {}",
        if flags.is_empty() {
            "-".to_owned()
        } else {
            flags.join(", ")
        }
    );
    out
}

fn write_matchers(out: &mut String, matchers: &[Matcher]) {
    if matchers.is_empty() {
        let _ = writeln!(out, "  -");
    }
    for (position, m) in matchers.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}={}", position + 1, m.kind(), m.value());
    }
}

// ── Argument conversion ─────────────────────────────────────────────

/// Parse a `KIND=VALUE` matcher argument.
fn parse_matcher(raw: &str) -> Result<Matcher, CliError> {
    let (kind, value) = raw.split_once('=').ok_or_else(|| CliError::Validation {
        field: "matcher".into(),
        reason: format!("expected KIND=VALUE, got '{raw}'"),
    })?;
    serde_json::from_value(json!({ "type": kind.trim(), "value": value })).map_err(|_| {
        CliError::Validation {
            field: "matcher".into(),
            reason: format!(
                "unknown matcher kind '{kind}' (expected domain, label, entity_category, platform, pattern or area)"
            ),
        }
    })
}

fn apply_flag(flags: &mut FeatureFlags, flag: FeatureFlagArg) {
    match flag {
        FeatureFlagArg::MatterSpeakers => flags.matter_speakers = true,
        FeatureFlagArg::MatterFans => flags.matter_fans = true,
        FeatureFlagArg::CoverDoNotInvertPercentage => flags.cover_do_not_invert_percentage = true,
        FeatureFlagArg::CoverSwapOpenClose => flags.cover_swap_open_close = true,
        FeatureFlagArg::IncludeHiddenEntities => flags.include_hidden_entities = true,
        FeatureFlagArg::UseOnOffSensorAsDefaultForBinarySensors => {
            flags.use_on_off_sensor_as_default_for_binary_sensors = true;
        }
    }
}

fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn bridge_from_args(args: BridgeAddArgs) -> Result<BridgeConfig, CliError> {
    if let Some(ref path) = args.from_file {
        let mut value: serde_json::Value = util::read_json_file(path, "from-file")?;
        if let Some(object) = value.as_object_mut() {
            if let Some(id) = args.id {
                object.insert("id".into(), id.into());
            } else if !object.contains_key("id") {
                object.insert("id".into(), generate_id().into());
            }
        }
        return serde_json::from_value(value).map_err(|e| CliError::Validation {
            field: "from-file".into(),
            reason: e.to_string(),
        });
    }

    let name = args.name.ok_or_else(|| CliError::Validation {
        field: "name".into(),
        reason: "required without --from-file".into(),
    })?;
    let port = args.port.ok_or_else(|| CliError::Validation {
        field: "port".into(),
        reason: "required without --from-file".into(),
    })?;

    let mut feature_flags = FeatureFlags::default();
    for flag in args.flags {
        apply_flag(&mut feature_flags, flag);
    }

    Ok(BridgeConfig {
        id: args.id.unwrap_or_else(generate_id),
        name,
        port,
        country_code: args.country_code,
        filter: EntityFilter {
            include: args
                .include
                .iter()
                .map(|m| parse_matcher(m))
                .collect::<Result<_, _>>()?,
            exclude: args
                .exclude
                .iter()
                .map(|m| parse_matcher(m))
                .collect::<Result<_, _>>()?,
        },
        feature_flags,
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(config: &Config, args: BridgesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let store = config::open_store(config).await?;

    match args.command {
        BridgesCommand::List => {
            output::emit(global, store.bridges().as_slice());
            Ok(())
        }

        BridgesCommand::Show { id } => {
            let bridge = store.get(&id).ok_or_else(|| CliError::bridge_not_found(&id))?;
            output::emit(global, &bridge);
            Ok(())
        }

        BridgesCommand::Add(add) => {
            let bridge = bridge_from_args(add)?;
            let replaced = store.get(&bridge.id).is_some();
            store.add(bridge.clone()).await?;
            tracing::info!(bridge_id = %bridge.id, replaced, "bridge saved");

            let verb = if replaced { "updated" } else { "created" };
            output::status(global, &format!("Bridge '{}' {verb}", bridge.id));
            output::emit(global, &bridge);
            Ok(())
        }

        BridgesCommand::Remove { id } => {
            if store.get(&id).is_none() {
                return Err(CliError::bridge_not_found(&id));
            }
            if !util::confirm(
                &format!("Remove bridge '{id}'? Its devices disappear from every Matter controller."),
                "bridges remove",
                global.yes,
            )? {
                return Ok(());
            }
            if !store.remove(&id).await? {
                return Err(CliError::bridge_not_found(&id));
            }
            output::status(global, &format!("Bridge '{id}' removed"));
            Ok(())
        }
    }
}
