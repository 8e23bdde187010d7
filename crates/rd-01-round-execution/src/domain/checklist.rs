//! Completion gate
//!
//! A checkpoint can be finalized when every required checklist item is
//! checked, a photo is attached, and a signature is attached if the
//! checkpoint demands one. Optional items never block.

use serde::{Deserialize, Serialize};
use shared_types::ChecklistItemTemplate;
use std::fmt;

/// One checklist line in an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub description: String,
    pub required: bool,
    pub checked: bool,
}

/// Checklist items for the current attempt, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistState {
    items: Vec<ChecklistItem>,
}

impl ChecklistState {
    /// Fresh, all-unchecked state from a checkpoint template.
    ///
    /// Item ids are `item-<index>` in template order.
    pub fn from_template(templates: &[ChecklistItemTemplate]) -> Self {
        let items = templates
            .iter()
            .enumerate()
            .map(|(index, template)| ChecklistItem {
                id: format!("item-{}", index),
                description: template.description.clone(),
                required: template.required,
                checked: false,
            })
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.items.iter().any(|item| item.id == item_id)
    }

    /// A copy with one item set. `None` if the id is unknown.
    pub fn with_item(&self, item_id: &str, checked: bool) -> Option<Self> {
        if !self.contains(item_id) {
            return None;
        }
        let items = self
            .items
            .iter()
            .map(|item| {
                if item.id == item_id {
                    ChecklistItem {
                        checked,
                        ..item.clone()
                    }
                } else {
                    item.clone()
                }
            })
            .collect();
        Some(Self { items })
    }

    /// Required items still unchecked.
    pub fn required_unchecked(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.items.iter().filter(|item| item.required && !item.checked)
    }
}

/// Something that still blocks finalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MissingRequirement {
    /// No scan, manual code, or geofence entry yet.
    CheckIn,
    ChecklistItem { id: String, description: String },
    Photo,
    Signature,
}

impl fmt::Display for MissingRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingRequirement::CheckIn => write!(f, "check-in"),
            MissingRequirement::ChecklistItem { description, .. } => {
                write!(f, "checklist item '{}'", description)
            }
            MissingRequirement::Photo => write!(f, "photo"),
            MissingRequirement::Signature => write!(f, "signature"),
        }
    }
}

/// Completion gate predicate.
pub fn can_finalize(
    checklist: &ChecklistState,
    photo_present: bool,
    signature_present: bool,
    requires_signature: bool,
) -> bool {
    checklist.required_unchecked().next().is_none()
        && photo_present
        && (!requires_signature || signature_present)
}

/// What keeps the gate closed, in display order.
pub fn missing_requirements(
    checklist: &ChecklistState,
    photo_present: bool,
    signature_present: bool,
    requires_signature: bool,
) -> Vec<MissingRequirement> {
    let mut missing: Vec<MissingRequirement> = checklist
        .required_unchecked()
        .map(|item| MissingRequirement::ChecklistItem {
            id: item.id.clone(),
            description: item.description.clone(),
        })
        .collect();

    if !photo_present {
        missing.push(MissingRequirement::Photo);
    }
    if requires_signature && !signature_present {
        missing.push(MissingRequirement::Signature);
    }
    missing
}
