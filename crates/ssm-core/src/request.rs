//! Tag to backend request conversion

use crate::config::SerializerConfig;
use crate::error::WriteError;
use regex::Regex;
use ssm_backend::{GetEntry, PutEntry, ValueType, VersionSelector};
use ssm_tag::{KeyRef, StoreTag};
use uuid::Uuid;

/// Read entry for `path`; secrets honour their version pins
pub(crate) fn get_entry(tag: &StoreTag, path: &str) -> GetEntry {
    let version = match tag {
        StoreTag::Asm(asm) => VersionSelector {
            id: asm.version_id().map(str::to_string),
            stage: asm.version_stage().map(str::to_string),
        },
        StoreTag::Pms(_) | StoreTag::Custom(_) => VersionSelector::latest(),
    };
    GetEntry {
        path: path.to_string(),
        version,
    }
}

/// Write entry for `path` holding `value`
pub(crate) fn put_entry(
    tag: &StoreTag,
    path: &str,
    value: String,
    config: &SerializerConfig,
) -> Result<PutEntry, WriteError> {
    let mut entry = PutEntry::new(path, value);
    entry.tags = tag.base().tags().clone();

    match tag {
        StoreTag::Pms(pms) => {
            if let Some(pattern) = pms.pattern() {
                validate(pattern, &entry.value)?;
            }
            entry.value_type = if pms.secure() {
                ValueType::SecureString
            } else {
                ValueType::String
            };
            entry.key_id = resolve_key(pms.key_id(), config)?;
            entry.tier = Some(pms.tier().or(config.default_tier));
            entry.description = pms.description().map(str::to_string);
            entry.overwrite = pms.overwrite();
        }
        StoreTag::Asm(asm) => {
            entry.value_type = ValueType::SecureString;
            entry.key_id = resolve_key(asm.key_id(), config)?;
            entry.description = asm.description().map(str::to_string);
            entry.client_token = Some(Uuid::new_v4());
        }
        StoreTag::Custom(_) => {}
    }
    Ok(entry)
}

fn resolve_key(key: Option<KeyRef>, config: &SerializerConfig) -> Result<Option<String>, WriteError> {
    match key {
        None | Some(KeyRef::AccountDefault) => Ok(None),
        Some(KeyRef::Explicit(id)) => Ok(Some(id)),
        Some(KeyRef::Local(name)) => config
            .keys
            .get(&name)
            .cloned()
            .map(Some)
            .ok_or(WriteError::UnknownKey(name)),
    }
}

fn validate(pattern: &str, value: &str) -> Result<(), WriteError> {
    let regex = Regex::new(pattern).map_err(|e| WriteError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;
    if regex.is_match(value) {
        Ok(())
    } else {
        Err(WriteError::PatternMismatch(pattern.to_string()))
    }
}
