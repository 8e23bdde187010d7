//! Checkpoint identifier matching
//!
//! A token reaches the engine either as a camera-decoded tag or as a code
//! typed on the keypad. The tag is a JSON object:
//!
//! ```json
//! {"type": "checkpoint", "manual_code": "123456789", "checkpoint_id": "cp-1"}
//! ```
//!
//! `manualCode` and `code` are accepted as aliases of `manual_code`, and the
//! embedded code may be a JSON string or number. A bare token is a manual
//! code only when it is exactly the configured number of ASCII digits.
//!
//! Matching is strict: a token is valid only for the checkpoint that is
//! current. There is no fallback to other checkpoints of the same client.

use serde_json::Value;
use shared_types::{CheckInMethod, Checkpoint, CheckpointId};

/// Digits in a keypad code.
pub const DEFAULT_MANUAL_CODE_LENGTH: usize = 9;

/// Value of the `type` field that marks a checkpoint tag.
pub const CHECKPOINT_TAG: &str = "checkpoint";

const CODE_KEYS: [&str; 3] = ["manual_code", "manualCode", "code"];
const REF_KEYS: [&str; 2] = ["checkpoint_id", "checkpointId"];

/// A decoded scan input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanToken {
    /// Structured tag read by the camera.
    Structured {
        code: String,
        checkpoint_ref: Option<CheckpointId>,
    },
    /// Keypad code of the configured length.
    Manual { code: String },
    /// Neither form.
    Malformed { raw: String },
}

impl ScanToken {
    /// The identifying code carried by the token.
    pub fn code(&self) -> Option<&str> {
        match self {
            ScanToken::Structured { code, .. } | ScanToken::Manual { code } => Some(code),
            ScanToken::Malformed { .. } => None,
        }
    }

    /// Check-in method recorded when this token is accepted.
    pub fn check_in_method(&self) -> Option<CheckInMethod> {
        match self {
            ScanToken::Structured { .. } => Some(CheckInMethod::Scan),
            ScanToken::Manual { .. } => Some(CheckInMethod::ManualCode),
            ScanToken::Malformed { .. } => None,
        }
    }

    /// Whether the token identifies `checkpoint`.
    ///
    /// An explicit checkpoint reference inside a tag must agree with the
    /// checkpoint id as well as the code.
    pub fn identifies(&self, checkpoint: &Checkpoint) -> bool {
        match self {
            ScanToken::Structured {
                code,
                checkpoint_ref,
            } => {
                checkpoint.has_code(code)
                    && checkpoint_ref
                        .as_ref()
                        .map_or(true, |r| *r == checkpoint.id)
            }
            ScanToken::Manual { code } => checkpoint.manual_code.as_deref() == Some(code.as_str()),
            ScanToken::Malformed { .. } => false,
        }
    }
}

/// Outcome of matching a scan against the expected checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Valid,
    Mismatch,
    Malformed,
}

/// Decode raw scanner or keypad input.
pub fn decode(raw: &str, manual_code_length: usize) -> ScanToken {
    let trimmed = raw.trim();

    if trimmed.starts_with('{') {
        return decode_structured(trimmed).unwrap_or_else(|| ScanToken::Malformed {
            raw: raw.to_string(),
        });
    }

    if manual_code_length > 0
        && trimmed.len() == manual_code_length
        && trimmed.bytes().all(|b| b.is_ascii_digit())
    {
        return ScanToken::Manual {
            code: trimmed.to_string(),
        };
    }

    ScanToken::Malformed {
        raw: raw.to_string(),
    }
}

fn decode_structured(text: &str) -> Option<ScanToken> {
    let value: Value = serde_json::from_str(text).ok()?;
    let object = value.as_object()?;

    if object.get("type")?.as_str()? != CHECKPOINT_TAG {
        return None;
    }

    let code = CODE_KEYS
        .iter()
        .filter_map(|key| object.get(*key))
        .find_map(code_text)?;

    let checkpoint_ref = REF_KEYS
        .iter()
        .filter_map(|key| object.get(*key))
        .find_map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()))
        .map(CheckpointId::from);

    Some(ScanToken::Structured {
        code,
        checkpoint_ref,
    })
}

fn code_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Match a decoded token against the checkpoint the guard should be at.
pub fn match_token(token: &ScanToken, expected: &Checkpoint) -> MatchOutcome {
    match token {
        ScanToken::Malformed { .. } => MatchOutcome::Malformed,
        _ if token.identifies(expected) => MatchOutcome::Valid,
        _ => MatchOutcome::Mismatch,
    }
}

/// Decode and match in one step.
pub fn match_scan(scanned: &str, expected: &Checkpoint, manual_code_length: usize) -> MatchOutcome {
    match_token(&decode(scanned, manual_code_length), expected)
}
