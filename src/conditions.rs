//! Conditions and modifiers attached to road links (restrictions, signs,
//! signals, events), flattened into one row per condition/modifier pair.
//!
//! Code values follow the Navstreets condition tables.

use log::{debug, warn};
use std::collections::{HashMap, HashSet};

pub const COND_SPECIAL_SPEED: u32 = 10;
pub const COND_TRAFFIC_SIGNAL: u32 = 16;
pub const COND_TRAFFIC_SIGN: u32 = 17;
pub const COND_RAILWAY_CROSSING: u32 = 18;
pub const COND_TRANSPORT_ACCESS: u32 = 23;

pub const MOD_TRAFFIC_SIGN_TYPE: u32 = 22;

pub const SPEED_BUMPS_PRESENT: &str = "SPEED BUMPS PRESENT";

/// A condition row keyed by link, with its access flags.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Condition {
    pub link_id: u64,
    pub cond_id: u64,
    pub cond_type: u32,
    pub cond_val1: Option<String>,
    pub access: AccessFlags,
}

/// Which vehicle classes a condition applies to (`None` when not given).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessFlags {
    pub automobiles: Option<bool>,
    pub trucks: Option<bool>,
    pub deliveries: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Modifier {
    pub cond_id: u64,
    pub mod_type: u32,
    pub mod_val: String,
}

/// One condition joined with one of its modifiers (or none).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionRecord {
    pub link_id: u64,
    pub cond_id: u64,
    pub cond_type: u32,
    pub cond_val1: Option<String>,
    pub mod_type: Option<u32>,
    pub mod_val: Option<String>,
}

impl ConditionRecord {
    /// Modifier value read as a number, for the codes and limits stored as text.
    pub fn mod_value(&self) -> Option<f64> {
        self.mod_val.as_deref()?.trim().parse().ok()
    }
}

/// Joins conditions with their modifiers. A condition with several modifiers
/// yields one record per modifier; one without modifiers yields a single
/// record with empty modifier fields.
pub fn join_modifiers(conditions: &[Condition], modifiers: &[Modifier]) -> Vec<ConditionRecord> {
    let mut by_condition: HashMap<u64, Vec<&Modifier>> = HashMap::new();
    for modifier in modifiers {
        by_condition.entry(modifier.cond_id).or_default().push(modifier);
    }

    let mut records = Vec::with_capacity(conditions.len());
    for condition in conditions {
        let base = ConditionRecord {
            link_id: condition.link_id,
            cond_id: condition.cond_id,
            cond_type: condition.cond_type,
            cond_val1: condition.cond_val1.clone(),
            mod_type: None,
            mod_val: None,
        };
        match by_condition.get(&condition.cond_id) {
            Some(mods) => records.extend(mods.iter().map(|m| ConditionRecord {
                mod_type: Some(m.mod_type),
                mod_val: Some(m.mod_val.clone()),
                ..base.clone()
            })),
            None => records.push(base),
        }
    }

    let known: HashSet<u64> = conditions.iter().map(|c| c.cond_id).collect();
    let orphans = modifiers
        .iter()
        .filter(|m| !known.contains(&m.cond_id))
        .count();
    if orphans > 0 {
        warn!("{} modifier rows reference unknown conditions", orphans);
    }
    debug!(
        "Joined {} conditions with {} modifiers into {} records",
        conditions.len(),
        modifiers.len(),
        records.len()
    );
    records
}

/// Condition records grouped by link, built once before segments are scored.
#[derive(Debug, Default)]
pub struct ConditionIndex {
    by_link: HashMap<u64, Vec<ConditionRecord>>,
}

impl ConditionIndex {
    pub fn new(records: impl IntoIterator<Item = ConditionRecord>) -> Self {
        let mut by_link: HashMap<u64, Vec<ConditionRecord>> = HashMap::new();
        for record in records {
            by_link.entry(record.link_id).or_default().push(record);
        }
        Self { by_link }
    }

    pub fn for_link(&self, link_id: u64) -> &[ConditionRecord] {
        self.by_link.get(&link_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn link_count(&self) -> usize {
        self.by_link.len()
    }
}
