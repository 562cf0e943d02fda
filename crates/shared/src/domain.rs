use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub $inner);
    };
}

// The server keys its event stream off an integer id and echoes it back as
// `?id=`; the client never inspects the value beyond passing it along.
id_newtype!(ContinuationToken, i64);
id_newtype!(SnapshotEpoch, u64);
id_newtype!(FormId, i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Start,
    Join,
    InProgress,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionName {
    List,
    Game,
    You,
    Updates,
    Chat,
}

impl RegionName {
    /// Fixed render order; regions are always painted in this sequence.
    pub const ALL: [RegionName; 5] = [
        RegionName::List,
        RegionName::Game,
        RegionName::You,
        RegionName::Updates,
        RegionName::Chat,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormMethod {
    Get,
    Post,
}

impl FormMethod {
    /// Interpret a form's declared `method` attribute; browsers default to GET.
    pub fn from_attr(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("post") {
            FormMethod::Post
        } else {
            FormMethod::Get
        }
    }
}
