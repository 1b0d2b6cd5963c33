use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{fetch_page, optional_text, required_text, Filter, ListQuery, Page, Pagination};
use crate::error::{on_write, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    Reward,
    Punishment,
}

impl RewardKind {
    pub const ALL: [RewardKind; 2] = [RewardKind::Reward, RewardKind::Punishment];

    pub fn as_str(self) -> &'static str {
        match self {
            RewardKind::Reward => "reward",
            RewardKind::Punishment => "punishment",
        }
    }
}

impl fmt::Display for RewardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "reward" | "奖励" => Ok(RewardKind::Reward),
            "punishment" | "惩罚" => Ok(RewardKind::Punishment),
            _ => Err(StoreError::validation(
                "type",
                "type must be \"reward\" or \"punishment\"",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardPunishment {
    pub rp_id: i64,
    pub student_id: String,
    pub student_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: RewardKind,
    pub reason: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewardInput {
    pub student_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RewardFilter {
    pub student_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

const REWARDS: ListQuery = ListQuery {
    columns: "rp.rp_id, rp.student_id, s.name, rp.type, rp.reason, rp.date",
    from: "reward_punishment rp LEFT JOIN student s ON rp.student_id = s.student_id",
    order_by: "rp.date DESC, rp.rp_id DESC",
};

fn reward_row(r: &Row<'_>) -> rusqlite::Result<RewardPunishment> {
    let kind: String = r.get(3)?;
    let kind = kind.parse::<RewardKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(RewardPunishment {
        rp_id: r.get(0)?,
        student_id: r.get(1)?,
        student_name: r.get(2)?,
        kind,
        reason: r.get(4)?,
        date: r.get(5)?,
    })
}

pub fn list(
    conn: &Connection,
    filter: &RewardFilter,
    pagination: Option<Pagination>,
) -> Result<Page<RewardPunishment>, StoreError> {
    let kind = match optional_text(filter.kind.as_deref()) {
        Some(k) => Some(k.parse::<RewardKind>()?.as_str().to_string()),
        None => None,
    };
    let f = Filter::new()
        .eq("rp.student_id", optional_text(filter.student_id.as_deref()))
        .eq("rp.type", kind);
    fetch_page(conn, &REWARDS, &f, pagination, reward_row)
}

pub fn get(conn: &Connection, rp_id: i64) -> Result<RewardPunishment, StoreError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE rp.rp_id = ?",
        REWARDS.columns, REWARDS.from
    );
    conn.query_row(&sql, [rp_id], reward_row)
        .optional()?
        .ok_or_else(|| StoreError::not_found("reward/punishment record"))
}

pub fn create(conn: &Connection, input: &RewardInput) -> Result<i64, StoreError> {
    let kind: RewardKind = input.kind.parse()?;
    let student_id = required_text("student_id", &input.student_id)?;
    conn.execute(
        "INSERT INTO reward_punishment(student_id, type, reason, date) VALUES(?, ?, ?, ?)",
        (
            &student_id,
            kind.as_str(),
            optional_text(input.reason.as_deref()),
            input.date,
        ),
    )
    .map_err(|e| on_write(e, "reward/punishment record", "student"))?;
    Ok(conn.last_insert_rowid())
}

pub fn update(conn: &Connection, rp_id: i64, input: &RewardInput) -> Result<(), StoreError> {
    let kind: RewardKind = input.kind.parse()?;
    let student_id = required_text("student_id", &input.student_id)?;
    let changed = conn
        .execute(
            "UPDATE reward_punishment SET student_id = ?, type = ?, reason = ?, date = ?
             WHERE rp_id = ?",
            (
                &student_id,
                kind.as_str(),
                optional_text(input.reason.as_deref()),
                input.date,
                rp_id,
            ),
        )
        .map_err(|e| on_write(e, "reward/punishment record", "student"))?;
    if changed == 0 {
        return Err(StoreError::not_found("reward/punishment record"));
    }
    Ok(())
}

pub fn delete(conn: &Connection, rp_id: i64) -> Result<(), StoreError> {
    let changed = conn.execute("DELETE FROM reward_punishment WHERE rp_id = ?", [rp_id])?;
    if changed == 0 {
        return Err(StoreError::not_found("reward/punishment record"));
    }
    Ok(())
}
