use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Which test-file naming convention the gate recognises.
///
/// - `Strict`: the URI must end in `.spec.<ext>` or `.test.<ext>` where
///   `<ext>` is a known script extension (default).
/// - `Broad`: the URI contains `.spec.` anywhere, or `.test.` followed by the
///   generated-file marker `g`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatePolicy {
    #[default]
    Strict,
    Broad,
}

impl FromStr for GatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(GatePolicy::Strict),
            "broad" => Ok(GatePolicy::Broad),
            other => Err(format!(
                "invalid gate policy: {other} (expected \"strict\" or \"broad\")"
            )),
        }
    }
}

/// Behaviour when a document event arrives while a validation cycle for the
/// same document is still in flight.
///
/// - `Cancel`: tear down the previous runner process; only the newest cycle
///   may publish (default).
/// - `Parallel`: let both cycles run; whichever finishes last wins the
///   publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapBehaviour {
    #[default]
    Cancel,
    Parallel,
}

impl FromStr for OverlapBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cancel" => Ok(OverlapBehaviour::Cancel),
            "parallel" => Ok(OverlapBehaviour::Parallel),
            other => Err(format!(
                "invalid overlap behaviour: {other} (expected \"cancel\" or \"parallel\")"
            )),
        }
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs = |factor: u64| {
        value
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration '{}' is too large", s))
    };

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => secs(60),
        "h" => secs(60 * 60),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
