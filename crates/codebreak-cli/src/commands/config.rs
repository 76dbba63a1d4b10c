use clap::Subcommand;

use codebreak_core::AppSettings;

use super::AppContext;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print every setting
    List,
    /// Print one setting
    Get { key: String },
    /// Change one setting (the value is parsed against the existing type)
    Set { key: String, value: String },
}

pub fn run(action: ConfigAction, ctx: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = ctx.registry.lock().expect("registry lock");

    match action {
        ConfigAction::List => {
            let json = serde_json::to_value(registry.settings())?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        ConfigAction::Get { key } => {
            let json = serde_json::to_value(registry.settings())?;
            let value = json
                .get(&key)
                .ok_or_else(|| format!("unknown config key: {key}"))?;
            match value {
                serde_json::Value::String(s) => println!("{s}"),
                other => println!("{other}"),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut json = serde_json::to_value(registry.settings())?;
            set_value_by_key(&mut json, &key, &value)?;
            let parsed: AppSettings = serde_json::from_value(json)?;
            *registry.settings_mut() = parsed;
            println!("{key} = {value}");
        }
    }

    Ok(())
}

/// Replace one field of the settings JSON, parsing `value` against the type
/// already stored under `key`.
fn set_value_by_key(
    root: &mut serde_json::Value,
    key: &str,
    value: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let obj = root
        .as_object_mut()
        .ok_or("settings did not serialize to an object")?;
    let existing = obj
        .get(key)
        .ok_or_else(|| format!("unknown config key: {key}"))?;

    let new_value = match existing {
        serde_json::Value::Bool(_) => serde_json::Value::Bool(value.parse::<bool>()?),
        serde_json::Value::Number(_) => {
            if let Ok(n) = value.parse::<u64>() {
                serde_json::Value::Number(n.into())
            } else if let Ok(n) = value.parse::<i64>() {
                serde_json::Value::Number(n.into())
            } else {
                return Err(format!("cannot parse '{value}' as number").into());
            }
        }
        _ => serde_json::Value::String(value.into()),
    };

    obj.insert(key.to_string(), new_value);
    Ok(())
}
