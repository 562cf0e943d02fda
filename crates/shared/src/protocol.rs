use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{ContinuationToken, RegionName, StatusKind};

/// One complete server-reported state of the game at a point in time.
/// Opaque beyond `id` and `type`; the named-region data stays as raw fields
/// until a region schema claims it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub id: ContinuationToken,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<StatusKind>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinSeat {
    pub name: String,
    #[serde(default)]
    pub started: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListContext {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub players: Vec<JoinSeat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatMove {
    Decided,
    Undecided,
    Lando,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSeat {
    pub name: String,
    #[serde(rename = "move", default, skip_serializing_if = "Option::is_none")]
    pub move_: Option<SeatMove>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameContext {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<StatusKind>,
    #[serde(default)]
    pub players: Vec<PlayerSeat>,
    #[serde(default)]
    pub table: Vec<String>,
    #[serde(default)]
    pub captured: Vec<String>,
    #[serde(default)]
    pub pot: u32,
    #[serde(default)]
    pub round: u32,
    #[serde(default)]
    pub artifacts: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct YouContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub you: Option<String>,
    #[serde(default)]
    pub loot: i64,
    #[serde(default)]
    pub artifacts: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatesContext {
    #[serde(default)]
    pub updates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLine {
    pub speaker: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatContext {
    #[serde(default)]
    pub chat: Vec<ChatLine>,
}

/// Build the template context for one region from a snapshot's raw fields.
///
/// Each region deserializes only the fields its schema names, defaulting the
/// absent ones, so templates never see missing keys. A present field of the
/// wrong shape is an error; callers fall back to [`empty_region_context`].
pub fn region_context(
    region: RegionName,
    snapshot: &StateSnapshot,
) -> Result<Value, serde_json::Error> {
    let fields = Value::Object(snapshot.fields.clone());
    match region {
        RegionName::List => serde_json::to_value(serde_json::from_value::<ListContext>(fields)?),
        RegionName::Game => {
            let mut context: GameContext = serde_json::from_value(fields)?;
            context.kind = snapshot.kind;
            serde_json::to_value(context)
        }
        RegionName::You => serde_json::to_value(serde_json::from_value::<YouContext>(fields)?),
        RegionName::Updates => {
            serde_json::to_value(serde_json::from_value::<UpdatesContext>(fields)?)
        }
        RegionName::Chat => serde_json::to_value(serde_json::from_value::<ChatContext>(fields)?),
    }
}

pub fn empty_region_context(region: RegionName) -> Value {
    let value = match region {
        RegionName::List => serde_json::to_value(ListContext::default()),
        RegionName::Game => serde_json::to_value(GameContext::default()),
        RegionName::You => serde_json::to_value(YouContext::default()),
        RegionName::Updates => serde_json::to_value(UpdatesContext::default()),
        RegionName::Chat => serde_json::to_value(ChatContext::default()),
    };
    value.unwrap_or_else(|_| Value::Object(Map::new()))
}
