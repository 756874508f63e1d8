use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Pick {
    pub id: String,
    pub entry_id: String,
    pub week: i64,
    pub team: String,
    pub locked: bool,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>
}

#[derive(Debug, Deserialize, Clone)]
pub struct CreatePick {
    pub entry_id: String,
    pub week: i64,
    pub team: String
}

/// Only the supplied fields are applied; absent ones keep their stored value.
/// `result` tells an explicit `null` (clear it) apart from an absent field.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct UpdatePick {
    pub week: Option<i64>,
    pub team: Option<String>,
    pub locked: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub result: Option<Option<String>>
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl UpdatePick {
    pub fn apply_to(self, pick: &mut Pick) {
        if let Some(week) = self.week {
            pick.week = week;
        }
        if let Some(team) = self.team {
            pick.team = team;
        }
        if let Some(locked) = self.locked {
            pick.locked = locked;
        }
        if let Some(result) = self.result {
            pick.result = result;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick() -> Pick {
        let now = Utc::now();
        Pick {
            id: "p1".into(),
            entry_id: "e1".into(),
            week: 3,
            team: "KC".into(),
            locked: false,
            result: Some("pending".into()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn unset_fields_are_left_untouched() {
        let mut target = pick();
        UpdatePick { team: Some("BUF".into()), ..Default::default() }.apply_to(&mut target);

        assert_eq!(target.team, "BUF");
        assert_eq!(target.week, 3);
        assert!(!target.locked);
        assert_eq!(target.result.as_deref(), Some("pending"));
    }

    #[test]
    fn absent_json_fields_deserialize_as_unset() {
        let update: UpdatePick = serde_json::from_str(r#"{"result": "win"}"#).unwrap();
        assert!(update.week.is_none());
        assert!(update.team.is_none());
        assert!(update.locked.is_none());
        assert_eq!(update.result, Some(Some("win".to_string())));
    }

    #[test]
    fn explicit_null_clears_result() {
        let update: UpdatePick = serde_json::from_str(r#"{"result": null}"#).unwrap();
        assert_eq!(update.result, Some(None));

        let mut target = pick();
        update.apply_to(&mut target);
        assert!(target.result.is_none());

        let mut target = pick();
        let untouched: UpdatePick = serde_json::from_str("{}").unwrap();
        untouched.apply_to(&mut target);
        assert_eq!(target.result.as_deref(), Some("pending"));
    }
}
