use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::db::Db;
use crate::error::StoreError;
use crate::store::rewards::RewardKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Overview,
    #[serde(alias = "count-by-class", alias = "count_by_class")]
    StudentCountByClass,
    #[serde(alias = "count-by-major", alias = "count_by_major")]
    StudentCountByMajor,
    #[serde(alias = "count-by-department", alias = "count_by_department")]
    StudentCountByDepartment,
    #[serde(alias = "average-score-by-course")]
    AverageScoreByCourse,
    #[serde(alias = "score-distribution")]
    ScoreDistribution,
    #[serde(alias = "reward-punishment-summary")]
    RewardPunishmentSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassCount {
    pub class_id: i64,
    pub class_name: String,
    pub major_name: Option<String>,
    pub dept_name: Option<String>,
    pub student_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MajorCount {
    pub major_id: i64,
    pub major_name: String,
    pub dept_name: Option<String>,
    pub student_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentCount {
    pub dept_id: i64,
    pub dept_name: String,
    pub student_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseScoreStats {
    pub course_id: i64,
    pub course_name: String,
    pub avg_score: Option<f64>,
    pub student_count: i64,
    pub max_score: Option<i64>,
    pub min_score: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBand {
    pub grade_level: &'static str,
    pub min_score: i64,
    pub max_score: i64,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardShare {
    #[serde(rename = "type")]
    pub kind: RewardKind,
    pub count: i64,
    pub percentage: f64,
}

/// Grade bands, highest first. Upper bounds are inclusive.
pub const SCORE_BANDS: [(&str, i64, i64); 5] = [
    ("Excellent (90-100)", 90, 100),
    ("Good (80-89)", 80, 89),
    ("Fair (70-79)", 70, 79),
    ("Pass (60-69)", 60, 69),
    ("Fail (0-59)", 0, 59),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportRows {
    ByClass(Vec<ClassCount>),
    ByMajor(Vec<MajorCount>),
    ByDepartment(Vec<DepartmentCount>),
    CourseScores(Vec<CourseScoreStats>),
    Distribution(Vec<ScoreBand>),
    Rewards(Vec<RewardShare>),
}

impl ReportRows {
    pub fn len(&self) -> usize {
        match self {
            ReportRows::ByClass(v) => v.len(),
            ReportRows::ByMajor(v) => v.len(),
            ReportRows::ByDepartment(v) => v.len(),
            ReportRows::CourseScores(v) => v.len(),
            ReportRows::Distribution(v) => v.len(),
            ReportRows::Rewards(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reports answered with a list of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabularReport {
    ByClass,
    ByMajor,
    ByDepartment,
    CourseScores,
    Distribution,
    Rewards,
}

impl TabularReport {
    pub const ALL: [TabularReport; 6] = [
        TabularReport::ByClass,
        TabularReport::ByMajor,
        TabularReport::ByDepartment,
        TabularReport::CourseScores,
        TabularReport::Distribution,
        TabularReport::Rewards,
    ];
}

/// How a requested report is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPlan {
    /// Independent counts over the pool; see [`overview`].
    Overview,
    Tabular(TabularReport),
}

impl ReportKind {
    pub fn plan(self) -> ReportPlan {
        match self {
            ReportKind::Overview => ReportPlan::Overview,
            ReportKind::StudentCountByClass => ReportPlan::Tabular(TabularReport::ByClass),
            ReportKind::StudentCountByMajor => ReportPlan::Tabular(TabularReport::ByMajor),
            ReportKind::StudentCountByDepartment => {
                ReportPlan::Tabular(TabularReport::ByDepartment)
            }
            ReportKind::AverageScoreByCourse => ReportPlan::Tabular(TabularReport::CourseScores),
            ReportKind::ScoreDistribution => ReportPlan::Tabular(TabularReport::Distribution),
            ReportKind::RewardPunishmentSummary => ReportPlan::Tabular(TabularReport::Rewards),
        }
    }
}

pub fn run_tabular(conn: &Connection, report: TabularReport) -> Result<ReportRows, StoreError> {
    Ok(match report {
        TabularReport::ByClass => ReportRows::ByClass(count_by_class(conn)?),
        TabularReport::ByMajor => ReportRows::ByMajor(count_by_major(conn)?),
        TabularReport::ByDepartment => ReportRows::ByDepartment(count_by_department(conn)?),
        TabularReport::CourseScores => ReportRows::CourseScores(average_score_by_course(conn)?),
        TabularReport::Distribution => ReportRows::Distribution(score_distribution(conn)?),
        TabularReport::Rewards => ReportRows::Rewards(reward_summary(conn)?),
    })
}

pub fn count_by_class(conn: &Connection) -> Result<Vec<ClassCount>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT c.class_id, c.class_name, m.major_name, d.dept_name, COUNT(s.student_id) AS student_count
         FROM class c
         LEFT JOIN major m ON c.major_id = m.major_id
         LEFT JOIN department d ON m.dept_id = d.dept_id
         LEFT JOIN student s ON c.class_id = s.class_id
         GROUP BY c.class_id, c.class_name, m.major_name, d.dept_name
         ORDER BY student_count DESC, c.class_id",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(ClassCount {
                class_id: r.get(0)?,
                class_name: r.get(1)?,
                major_name: r.get(2)?,
                dept_name: r.get(3)?,
                student_count: r.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_by_major(conn: &Connection) -> Result<Vec<MajorCount>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT m.major_id, m.major_name, d.dept_name, COUNT(s.student_id) AS student_count
         FROM major m
         LEFT JOIN class c ON m.major_id = c.major_id
         LEFT JOIN student s ON c.class_id = s.class_id
         LEFT JOIN department d ON m.dept_id = d.dept_id
         GROUP BY m.major_id, m.major_name, d.dept_name
         ORDER BY student_count DESC, m.major_id",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(MajorCount {
                major_id: r.get(0)?,
                major_name: r.get(1)?,
                dept_name: r.get(2)?,
                student_count: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_by_department(conn: &Connection) -> Result<Vec<DepartmentCount>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT d.dept_id, d.dept_name, COUNT(s.student_id) AS student_count
         FROM department d
         LEFT JOIN major m ON d.dept_id = m.dept_id
         LEFT JOIN class c ON m.major_id = c.major_id
         LEFT JOIN student s ON c.class_id = s.class_id
         GROUP BY d.dept_id, d.dept_name
         ORDER BY student_count DESC, d.dept_id",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(DepartmentCount {
                dept_id: r.get(0)?,
                dept_name: r.get(1)?,
                student_count: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn average_score_by_course(conn: &Connection) -> Result<Vec<CourseScoreStats>, StoreError> {
    // SQLite sorts NULL first under DESC; push unscored courses to the end.
    let mut stmt = conn.prepare(
        "SELECT c.course_id, c.course_name,
                AVG(sc.score) AS avg_score,
                COUNT(sc.student_id) AS student_count,
                MAX(sc.score) AS max_score,
                MIN(sc.score) AS min_score
         FROM course c
         LEFT JOIN score sc ON c.course_id = sc.course_id
         GROUP BY c.course_id, c.course_name
         ORDER BY avg_score IS NULL, avg_score DESC, c.course_id",
    )?;
    let rows = stmt
        .query_map([], |r| {
            let avg: Option<f64> = r.get(2)?;
            Ok(CourseScoreStats {
                course_id: r.get(0)?,
                course_name: r.get(1)?,
                avg_score: avg.map(round2),
                student_count: r.get(3)?,
                max_score: r.get(4)?,
                min_score: r.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn score_distribution(conn: &Connection) -> Result<Vec<ScoreBand>, StoreError> {
    let mut counts = [0i64; SCORE_BANDS.len()];
    let mut stmt = conn.prepare(
        "SELECT CASE
                  WHEN score >= 90 THEN 0
                  WHEN score >= 80 THEN 1
                  WHEN score >= 70 THEN 2
                  WHEN score >= 60 THEN 3
                  ELSE 4
                END AS band,
                COUNT(*)
         FROM score
         GROUP BY band",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let band: i64 = row.get(0)?;
        let n: i64 = row.get(1)?;
        if let Some(slot) = usize::try_from(band).ok().and_then(|b| counts.get_mut(b)) {
            *slot = n;
        }
    }
    Ok(bands_from_counts(counts))
}

pub fn bands_from_counts(counts: [i64; SCORE_BANDS.len()]) -> Vec<ScoreBand> {
    let total: i64 = counts.iter().sum();
    SCORE_BANDS
        .iter()
        .zip(counts)
        .map(|(&(label, min, max), count)| ScoreBand {
            grade_level: label,
            min_score: min,
            max_score: max,
            count,
            percentage: percentage(count, total),
        })
        .collect()
}

pub fn reward_summary(conn: &Connection) -> Result<Vec<RewardShare>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT type, COUNT(*) FROM reward_punishment GROUP BY type")?;
    let counted = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let total: i64 = counted.iter().map(|(_, n)| n).sum();
    Ok(RewardKind::ALL
        .iter()
        .map(|&kind| {
            let count = counted
                .iter()
                .find(|(t, _)| t == kind.as_str())
                .map(|(_, n)| *n)
                .unwrap_or(0);
            RewardShare {
                kind,
                count,
                percentage: percentage(count, total),
            }
        })
        .collect())
}

fn percentage(part: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(part as f64 * 100.0 / total as f64)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverviewCount {
    Students,
    Majors,
    RewardsPunishments,
    Departments,
}

impl OverviewCount {
    pub const ALL: [OverviewCount; 4] = [
        OverviewCount::Students,
        OverviewCount::Majors,
        OverviewCount::RewardsPunishments,
        OverviewCount::Departments,
    ];

    fn sql(self) -> &'static str {
        match self {
            OverviewCount::Students => "SELECT COUNT(*) FROM student",
            OverviewCount::Majors => "SELECT COUNT(*) FROM major",
            OverviewCount::RewardsPunishments => "SELECT COUNT(*) FROM reward_punishment",
            OverviewCount::Departments => "SELECT COUNT(*) FROM department",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            OverviewCount::Students => "studentCount",
            OverviewCount::Majors => "majorCount",
            OverviewCount::RewardsPunishments => "rewardCount",
            OverviewCount::Departments => "deptCount",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub student_count: Option<i64>,
    pub major_count: Option<i64>,
    pub reward_count: Option<i64>,
    pub dept_count: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<&'static str>,
}

impl Overview {
    fn set(&mut self, which: OverviewCount, value: Option<i64>) {
        let slot = match which {
            OverviewCount::Students => &mut self.student_count,
            OverviewCount::Majors => &mut self.major_count,
            OverviewCount::RewardsPunishments => &mut self.reward_count,
            OverviewCount::Departments => &mut self.dept_count,
        };
        *slot = value;
        if value.is_none() {
            self.failed.push(which.key());
        }
    }

    pub fn all_failed(&self) -> bool {
        self.failed.len() == OverviewCount::ALL.len()
    }
}

pub fn count_one(conn: &Connection, which: OverviewCount) -> Result<i64, StoreError> {
    Ok(conn.query_row(which.sql(), [], |r| r.get(0))?)
}

/// Four independent counts, each on its own pooled connection. A failing
/// count is logged and left empty; the others are still reported.
pub async fn overview(db: &Db) -> Overview {
    let run = |which: OverviewCount| async move {
        let res = db.run(move |conn| count_one(conn, which)).await;
        (which, res)
    };
    let (a, b, c, d) = tokio::join!(
        run(OverviewCount::Students),
        run(OverviewCount::Majors),
        run(OverviewCount::RewardsPunishments),
        run(OverviewCount::Departments),
    );

    let mut out = Overview::default();
    for (which, res) in [a, b, c, d] {
        match res {
            Ok(n) => out.set(which, Some(n)),
            Err(e) => {
                error!(count = which.key(), error = %e, "overview count failed");
                out.set(which, None);
            }
        }
    }
    out
}
