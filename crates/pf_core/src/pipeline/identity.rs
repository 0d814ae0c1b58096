//! Track identity resolution and the per-session roster table.
//!
//! Canonical id space is the flat integer track id 0..=21 (0..=10 home,
//! 11..=21 away). Three encodings arrive at the boundary for the same
//! identity and all must resolve to the same canonical id:
//! - already-canonical integer
//! - roster-prefixed string `"H{n}"` / `"A{n}"` with n in 0..=10
//! - bare integer string, interpreted as a team-local index via a team hint
//!
//! Unresolvable input yields the -1 sentinel. Callers skip on -1, never index.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snapshot::{team_of, HOME_SLOT_MAX, NO_TRACK, TRACK_COUNT};

/// Side used to contextualize team-local indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamSide {
    Home,
    Away,
}

impl TeamSide {
    /// Map a team-local index (0..=10) onto the canonical id space.
    #[inline]
    pub fn canonical_slot(self, local: usize) -> usize {
        match self {
            TeamSide::Home => local,
            TeamSide::Away => local + HOME_SLOT_MAX + 1,
        }
    }
}

/// Resolve a string-encoded identity.
///
/// `"H5"` -> 5, `"A3"` -> 14, `"7"` + Away -> 18. Anything else -> -1.
pub fn resolve_track_str(raw: &str, hint: TeamSide) -> i32 {
    let raw = raw.trim();
    if raw.is_empty() {
        return NO_TRACK;
    }

    let (side, digits) = match raw.as_bytes()[0] {
        b'H' | b'h' => (TeamSide::Home, &raw[1..]),
        b'A' | b'a' => (TeamSide::Away, &raw[1..]),
        _ => (hint, raw),
    };

    match digits.parse::<usize>() {
        Ok(local) if local <= HOME_SLOT_MAX => side.canonical_slot(local) as i32,
        _ => NO_TRACK,
    }
}

/// Resolve any supported JSON encoding of an identity.
///
/// Integers are treated as already-canonical and only range-checked;
/// strings go through [`resolve_track_str`].
pub fn resolve_track_value(raw: &Value, hint: TeamSide) -> i32 {
    match raw {
        Value::Number(n) => match n.as_i64() {
            Some(id) if (0..TRACK_COUNT as i64).contains(&id) => id as i32,
            _ => NO_TRACK,
        },
        Value::String(s) => resolve_track_str(s, hint),
        _ => NO_TRACK,
    }
}

// ============================================================================
// Roster document (consumed identity/display metadata)
// ============================================================================

/// Roster/identity document handed over at session start. Used solely for
/// identity resolution and display metadata, never for gameplay logic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterDoc {
    #[serde(default)]
    pub home: RosterTeam,
    #[serde(default)]
    pub away: RosterTeam,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterTeam {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub players: Vec<RosterEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Some documents carry `id`, others `track_id`; both mean the
    /// team-local index when present. Absent -> list order.
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub track_id: Option<u32>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub number: u32,
}

impl RosterEntry {
    fn local_index(&self, fallback: usize) -> usize {
        self.track_id.or(self.id).map(|v| v as usize).unwrap_or(fallback)
    }
}

// ============================================================================
// IdentityTable
// ============================================================================

/// Display metadata for the occupant of one pitch slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotMeta {
    pub name: String,
    pub role: String,
    pub number: u32,
}

/// Per-session slot -> occupant table.
///
/// Lives for one match session. Substitutions swap occupants between slots;
/// the slot ids themselves never change.
#[derive(Debug, Clone)]
pub struct IdentityTable {
    slots: [SlotMeta; TRACK_COUNT],
}

impl Default for IdentityTable {
    fn default() -> Self {
        Self { slots: std::array::from_fn(|_| SlotMeta::default()) }
    }
}

impl IdentityTable {
    /// Build the table from a roster document. Entries beyond the 11 starting
    /// slots per team (bench players) are ignored here; they enter the table
    /// through substitution swaps.
    pub fn from_roster(doc: &RosterDoc) -> Self {
        let mut table = Self::default();
        for (fallback, entry) in doc.home.players.iter().enumerate() {
            let local = entry.local_index(fallback);
            if local <= HOME_SLOT_MAX {
                table.slots[TeamSide::Home.canonical_slot(local)] = SlotMeta {
                    name: entry.name.clone(),
                    role: entry.position.clone(),
                    number: entry.number,
                };
            }
        }
        for (fallback, entry) in doc.away.players.iter().enumerate() {
            let local = entry.local_index(fallback);
            if local <= HOME_SLOT_MAX {
                table.slots[TeamSide::Away.canonical_slot(local)] = SlotMeta {
                    name: entry.name.clone(),
                    role: entry.position.clone(),
                    number: entry.number,
                };
            }
        }
        table
    }

    #[inline]
    pub fn slot(&self, track_id: usize) -> &SlotMeta {
        &self.slots[track_id]
    }

    pub fn set_slot(&mut self, track_id: usize, meta: SlotMeta) {
        self.slots[track_id] = meta;
    }

    /// Apply a substitution: the occupant entering `slot_out` replaces the
    /// one leaving it. Cross-team swaps are rejected; invalid ids are skipped.
    pub fn apply_substitution(&mut self, slot_out: i32, slot_in: i32, incoming: Option<SlotMeta>) {
        let (a, b) = (slot_out, slot_in);
        if a == NO_TRACK || b == NO_TRACK {
            return;
        }
        let (a, b) = (a as usize, b as usize);
        if a >= TRACK_COUNT || b >= TRACK_COUNT || team_of(a) != team_of(b) {
            return;
        }
        if let Some(meta) = incoming {
            // Named replacement: the new occupant takes the vacated slot.
            self.slots[a] = meta;
        } else {
            self.slots.swap(a, b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prefixed_resolution() {
        assert_eq!(resolve_track_str("H5", TeamSide::Away), 5);
        assert_eq!(resolve_track_str("A3", TeamSide::Home), 14);
        assert_eq!(resolve_track_str("H0", TeamSide::Home), 0);
        assert_eq!(resolve_track_str("A10", TeamSide::Home), 21);
    }

    #[test]
    fn test_out_of_range_is_unresolved() {
        assert_eq!(resolve_track_str("H15", TeamSide::Home), NO_TRACK);
        assert_eq!(resolve_track_str("A11", TeamSide::Away), NO_TRACK);
        assert_eq!(resolve_track_str("", TeamSide::Home), NO_TRACK);
        assert_eq!(resolve_track_str("GK", TeamSide::Home), NO_TRACK);
    }

    #[test]
    fn test_bare_string_uses_hint() {
        assert_eq!(resolve_track_str("7", TeamSide::Home), 7);
        assert_eq!(resolve_track_str("7", TeamSide::Away), 18);
        // Team-local indices stop at 10
        assert_eq!(resolve_track_str("11", TeamSide::Home), NO_TRACK);
    }

    #[test]
    fn test_value_resolution() {
        assert_eq!(resolve_track_value(&json!(13), TeamSide::Home), 13);
        assert_eq!(resolve_track_value(&json!(22), TeamSide::Home), NO_TRACK);
        assert_eq!(resolve_track_value(&json!(-3), TeamSide::Home), NO_TRACK);
        assert_eq!(resolve_track_value(&json!("A3"), TeamSide::Home), 14);
        assert_eq!(resolve_track_value(&json!(null), TeamSide::Home), NO_TRACK);
    }

    fn sample_roster() -> RosterDoc {
        serde_json::from_value(json!({
            "home": {
                "name": "Home FC",
                "players": [
                    {"id": 0, "name": "Keeper", "position": "GK", "number": 1},
                    {"id": 5, "name": "Mid", "position": "CM", "number": 8}
                ]
            },
            "away": {
                "name": "Away United",
                "players": [
                    {"track_id": 3, "name": "Back", "position": "CB", "number": 4}
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_table_from_roster() {
        let table = IdentityTable::from_roster(&sample_roster());
        assert_eq!(table.slot(0).name, "Keeper");
        assert_eq!(table.slot(5).role, "CM");
        assert_eq!(table.slot(14).name, "Back");
        assert_eq!(table.slot(14).number, 4);
        // Unlisted slot stays at defaults
        assert!(table.slot(9).name.is_empty());
    }

    #[test]
    fn test_substitution_swaps_occupants() {
        let mut table = IdentityTable::from_roster(&sample_roster());
        let incoming = SlotMeta { name: "Sub".into(), role: "CM".into(), number: 22 };
        table.apply_substitution(5, 5, Some(incoming));
        assert_eq!(table.slot(5).name, "Sub");
        assert_eq!(table.slot(5).number, 22);
    }

    #[test]
    fn test_substitution_rejects_cross_team_and_sentinel() {
        let mut table = IdentityTable::from_roster(&sample_roster());
        let before = table.slot(5).name.clone();
        table.apply_substitution(5, 14, None); // cross-team
        table.apply_substitution(NO_TRACK, 5, None);
        table.apply_substitution(5, 40, None); // out of range
        assert_eq!(table.slot(5).name, before);
    }
}
