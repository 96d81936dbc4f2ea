use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use crate::{
    dao::models::MatchEntity,
    state::cricket::{
        BatsmanStat, BowlerStat, Commentary, Innings, MatchResult, MatchStatus, TossDecision,
    },
};

/// Document layout of the `matches` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    team1: String,
    team2: String,
    venue: String,
    scheduled_at: DateTime,
    status: MatchStatus,
    toss_winner: Option<String>,
    toss_decision: Option<TossDecision>,
    total_overs: u32,
    #[serde(default)]
    current_innings: u8,
    #[serde(default)]
    innings: Vec<Innings>,
    #[serde(default)]
    batsman_stats: Vec<BatsmanStat>,
    #[serde(default)]
    bowler_stats: Vec<BowlerStat>,
    #[serde(default)]
    commentary: Vec<Commentary>,
    result: Option<MatchResult>,
    version: i64,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<MatchEntity> for MongoMatchDocument {
    fn from(value: MatchEntity) -> Self {
        Self {
            id: value.id,
            title: value.title,
            team1: value.team1,
            team2: value.team2,
            venue: value.venue,
            scheduled_at: DateTime::from_system_time(value.scheduled_at),
            status: value.status,
            toss_winner: value.toss_winner,
            toss_decision: value.toss_decision,
            total_overs: value.total_overs,
            current_innings: value.current_innings,
            innings: value.innings,
            batsman_stats: value.batsman_stats,
            bowler_stats: value.bowler_stats,
            commentary: value.commentary,
            result: value.result,
            version: version_to_bson(value.version),
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoMatchDocument> for MatchEntity {
    fn from(value: MongoMatchDocument) -> Self {
        Self {
            id: value.id,
            title: value.title,
            team1: value.team1,
            team2: value.team2,
            venue: value.venue,
            scheduled_at: value.scheduled_at.to_system_time(),
            status: value.status,
            toss_winner: value.toss_winner,
            toss_decision: value.toss_decision,
            total_overs: value.total_overs,
            current_innings: value.current_innings,
            innings: value.innings,
            batsman_stats: value.batsman_stats,
            bowler_stats: value.bowler_stats,
            commentary: value.commentary,
            result: value.result,
            version: u64::try_from(value.version).unwrap_or_default(),
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

/// BSON has no unsigned 64-bit integer; versions never get near `i64::MAX`.
pub fn version_to_bson(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

pub fn doc_id(id: &str) -> Document {
    doc! {"_id": id}
}

/// Filter matching the document only while it still carries `version`.
pub fn doc_id_at_version(id: &str, version: u64) -> Document {
    doc! {"_id": id, "version": version_to_bson(version)}
}
