//! User issue positions and the preference fingerprint used to partition cached
//! analyses.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CivicError;
use crate::issues;

/// Position on an issue axis: -2 (strongly left pole) ..= +2 (strongly right pole).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub struct Position(i8);

impl Position {
    pub const NEUTRAL: Position = Position(0);

    pub fn new(value: i8) -> Result<Self, CivicError> {
        if (-2..=2).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CivicError::validation(format!(
                "position must be between -2 and 2, got {value}"
            )))
        }
    }

    pub fn value(self) -> i8 {
        self.0
    }

    pub fn intensity(self) -> u8 {
        self.0.unsigned_abs()
    }
}

impl TryFrom<i8> for Position {
    type Error = CivicError;
    fn try_from(v: i8) -> Result<Self, Self::Error> {
        Position::new(v)
    }
}

impl From<Position> for i8 {
    fn from(p: Position) -> i8 {
        p.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wire form of a single preference. `intensity` is derived and ignored on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreference {
    pub issue_id: String,
    pub position: Position,
    #[serde(default)]
    pub intensity: u8,
}

impl UserPreference {
    pub fn new(issue_id: impl Into<String>, position: Position) -> Self {
        Self {
            issue_id: issue_id.into(),
            position,
            intensity: position.intensity(),
        }
    }
}

/// All positions a user has answered, one per issue id (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<UserPreference>", into = "Vec<UserPreference>")]
pub struct PreferenceSet {
    by_issue: BTreeMap<String, Position>,
}

impl PreferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, issue_id: impl Into<String>, position: Position) {
        self.by_issue.insert(issue_id.into(), position);
    }

    pub fn remove(&mut self, issue_id: &str) -> Option<Position> {
        self.by_issue.remove(issue_id)
    }

    pub fn get(&self, issue_id: &str) -> Option<Position> {
        self.by_issue.get(issue_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_issue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_issue.is_empty()
    }

    /// Iterates in issue-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Position)> + '_ {
        self.by_issue.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn to_list(&self) -> Vec<UserPreference> {
        self.iter()
            .map(|(id, pos)| UserPreference::new(id, pos))
            .collect()
    }

    /// Order-independent digest of the (issue id, position) pairs.
    ///
    /// 32-bit `h * 31 + unit` over the UTF-16 units of `"id:pos|id:pos|..."` with
    /// ids in ordinal order, rendered as base-36 of the absolute value. Stable
    /// across releases: it is part of persisted cache keys.
    pub fn fingerprint(&self) -> String {
        let joined = self
            .iter()
            .map(|(id, pos)| format!("{id}:{pos}"))
            .collect::<Vec<_>>()
            .join("|");

        let mut hash: i32 = 0;
        for unit in joined.encode_utf16() {
            hash = (hash << 5).wrapping_sub(hash).wrapping_add(i32::from(unit));
        }
        to_base36(i64::from(hash).unsigned_abs())
    }

    /// Human-readable profile handed to the language model. Unknown issue ids are
    /// skipped.
    pub fn user_profile(&self) -> String {
        let mut lines = Vec::with_capacity(self.len());
        for (id, pos) in self.iter() {
            let Some(issue) = issues::issue(id) else {
                continue;
            };
            let wording = match pos.intensity() {
                2 => "strongly",
                1 => "somewhat",
                _ => "neutral on",
            };
            let stance = match pos.value() {
                0 => format!("Neutral on {}", issue.name),
                v if v > 0 => format!("{wording} favors: \"{}\"", issue.right_label),
                _ => format!("{wording} favors: \"{}\"", issue.left_label),
            };
            lines.push(format!("- **{}** (ID: {}): {}", issue.name, issue.id, stance));
        }
        lines.join("\n")
    }
}

impl From<Vec<UserPreference>> for PreferenceSet {
    fn from(list: Vec<UserPreference>) -> Self {
        let mut set = PreferenceSet::new();
        for p in list {
            set.set(p.issue_id, p.position);
        }
        set
    }
}

impl From<PreferenceSet> for Vec<UserPreference> {
    fn from(set: PreferenceSet) -> Self {
        set.to_list()
    }
}

impl FromIterator<(String, Position)> for PreferenceSet {
    fn from_iter<I: IntoIterator<Item = (String, Position)>>(iter: I) -> Self {
        let mut set = PreferenceSet::new();
        for (id, pos) in iter {
            set.set(id, pos);
        }
        set
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(v: i8) -> Position {
        Position::new(v).unwrap()
    }

    fn set_of(pairs: &[(&str, i8)]) -> PreferenceSet {
        pairs
            .iter()
            .map(|(id, v)| (id.to_string(), pos(*v)))
            .collect()
    }

    #[test]
    fn position_rejects_out_of_range() {
        assert!(Position::new(3).is_err());
        assert!(Position::new(-3).is_err());
        assert_eq!(pos(-2).intensity(), 2);
        assert_eq!(Position::NEUTRAL.intensity(), 0);
    }

    #[test]
    fn fingerprint_matches_known_values() {
        assert_eq!(PreferenceSet::new().fingerprint(), "0");
        assert_eq!(set_of(&[("water", 0)]).fingerprint(), "imerv1");
        assert_eq!(
            set_of(&[("rent-control", 2), ("housing-development", -1)]).fingerprint(),
            "dx17a"
        );
    }

    #[test]
    fn fingerprint_ignores_insertion_order() {
        let orders: [&[(&str, i8)]; 3] = [
            &[("water", 1), ("energy", -2), ("ceqa", 0)],
            &[("ceqa", 0), ("water", 1), ("energy", -2)],
            &[("energy", -2), ("ceqa", 0), ("water", 1)],
        ];
        let fps: Vec<String> = orders.iter().map(|o| set_of(o).fingerprint()).collect();
        assert!(fps.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn fingerprint_changes_with_any_single_position() {
        let base = set_of(&[("water", 1), ("energy", -2), ("ceqa", 0)]);
        let fp = base.fingerprint();
        for (id, current) in base.iter().map(|(i, p)| (i.to_string(), p.value())).collect::<Vec<_>>() {
            for v in -2..=2i8 {
                if v == current {
                    continue;
                }
                let mut changed = base.clone();
                changed.set(id.clone(), pos(v));
                assert_ne!(changed.fingerprint(), fp, "{id} -> {v} collided");
            }
        }
    }

    #[test]
    fn last_write_wins_on_duplicate_issue() {
        let json = r#"[{"issueId":"water","position":2,"intensity":2},{"issueId":"water","position":-1}]"#;
        let set: PreferenceSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("water"), Some(pos(-1)));
    }

    #[test]
    fn serializes_with_derived_intensity() {
        let set = set_of(&[("water", -2)]);
        let v = serde_json::to_value(&set).unwrap();
        assert_eq!(v[0]["issueId"], "water");
        assert_eq!(v[0]["position"], -2);
        assert_eq!(v[0]["intensity"], 2);
    }

    #[test]
    fn out_of_range_position_fails_to_decode() {
        let json = r#"[{"issueId":"water","position":5}]"#;
        assert!(serde_json::from_str::<PreferenceSet>(json).is_err());
    }

    #[test]
    fn profile_uses_pole_labels_and_skips_unknown_ids() {
        let set = set_of(&[("rent-control", 2), ("water", -1), ("ceqa", 0), ("bogus", 2)]);
        let profile = set.user_profile();
        assert!(profile.contains("strongly favors: \"Expand rent protections\""));
        assert!(profile.contains("somewhat favors: \"Prioritize supply\""));
        assert!(profile.contains("Neutral on "));
        assert!(!profile.contains("bogus"));
        assert_eq!(profile.lines().count(), 3);
    }
}
