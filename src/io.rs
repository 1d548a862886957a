//! Tabular inputs and outputs of a study: the study file, the CSV datasets,
//! the slope tile responses and the two result tables.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::config::RawStudyConfig;
use crate::criteria::gauge::GaugeDimension;
use crate::criteria::slope::SlopeRecord;
use crate::criteria::time_window::UNRESTRICTED_DAILY_HOURS;
use crate::criteria::{Criterion, CriterionRegistry, Group};
use crate::segment::{ScoredSegment, Segment};
use crate::study::StudyInputs;
use crate::summary::SummaryRow;

/// Navstreets tables, one raw row type per file, named after the source
/// columns.
pub(crate) mod navstreets {
    use serde::{Deserialize, Deserializer};

    use crate::conditions::{AccessFlags, Condition, Modifier};
    use crate::criteria::lanes::{LaneAttributes, LaneRecord, TravelDirection};
    use crate::criteria::time_window::DateTimeModifier;
    use crate::segment::Segment;

    /// `Y`/`N` columns; anything else reads as not given.
    pub(super) fn yes_no<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(match raw.as_deref().map(str::trim) {
            Some("Y") | Some("y") => Some(true),
            Some("N") | Some("n") => Some(false),
            _ => None,
        })
    }

    #[derive(Debug, Deserialize, Clone)]
    pub struct SegmentRow {
        #[serde(rename = "LINK_ID")]
        pub link_id: u64,
        #[serde(rename = "FUNC_CLASS")]
        pub func_class: u8,
        #[serde(rename = "LEN_KM_GEO")]
        pub length_km: f64,
        #[serde(rename = "FROM_LANES", default)]
        pub from_lanes: Option<u32>,
        #[serde(rename = "TO_LANES", default)]
        pub to_lanes: Option<u32>,
        #[serde(rename = "LANE_CAT", default)]
        pub lane_category: Option<u8>,
        #[serde(rename = "DIR_TRAVEL", default)]
        pub direction: Option<TravelDirection>,
        #[serde(rename = "PHYS_LANES", default)]
        pub physical_lanes: Option<u32>,
        #[serde(rename = "TO_SPD_LIM", default)]
        pub to_speed_limit: Option<f64>,
        #[serde(rename = "FR_SPD_LIM", default)]
        pub from_speed_limit: Option<f64>,
        #[serde(rename = "ROUNDABOUT", default, deserialize_with = "yes_no")]
        pub roundabout: Option<bool>,
    }

    impl From<SegmentRow> for Segment {
        fn from(row: SegmentRow) -> Self {
            Segment {
                link_id: row.link_id,
                func_class: row.func_class,
                length_km: row.length_km,
                lanes: LaneAttributes {
                    from_lanes: row.from_lanes.unwrap_or(0),
                    to_lanes: row.to_lanes.unwrap_or(0),
                    lane_category: row.lane_category.unwrap_or(0),
                    direction: row.direction.unwrap_or_default(),
                    physical_lanes: row.physical_lanes.unwrap_or(0),
                },
                to_speed_limit: row.to_speed_limit.unwrap_or(0.0),
                from_speed_limit: row.from_speed_limit.unwrap_or(0.0),
                roundabout: row.roundabout.unwrap_or(false),
            }
        }
    }

    #[derive(Debug, Deserialize, Clone)]
    pub struct ConditionRow {
        #[serde(rename = "LINK_ID")]
        pub link_id: u64,
        #[serde(rename = "COND_ID")]
        pub cond_id: u64,
        #[serde(rename = "COND_TYPE")]
        pub cond_type: u32,
        #[serde(rename = "COND_VAL1", default)]
        pub cond_val1: Option<String>,
        #[serde(rename = "AR_AUTO", default, deserialize_with = "yes_no")]
        pub automobiles: Option<bool>,
        #[serde(rename = "AR_TRUCKS", default, deserialize_with = "yes_no")]
        pub trucks: Option<bool>,
        #[serde(rename = "AR_DELIVER", default, deserialize_with = "yes_no")]
        pub deliveries: Option<bool>,
    }

    impl From<ConditionRow> for Condition {
        fn from(row: ConditionRow) -> Self {
            Condition {
                link_id: row.link_id,
                cond_id: row.cond_id,
                cond_type: row.cond_type,
                cond_val1: row.cond_val1.filter(|v| !v.is_empty()),
                access: AccessFlags {
                    automobiles: row.automobiles,
                    trucks: row.trucks,
                    deliveries: row.deliveries,
                },
            }
        }
    }

    #[derive(Debug, Deserialize, Clone)]
    pub struct ModifierRow {
        #[serde(rename = "COND_ID")]
        pub cond_id: u64,
        #[serde(rename = "MOD_TYPE")]
        pub mod_type: u32,
        #[serde(rename = "MOD_VAL", default)]
        pub mod_val: String,
    }

    impl From<ModifierRow> for Modifier {
        fn from(row: ModifierRow) -> Self {
            Modifier {
                cond_id: row.cond_id,
                mod_type: row.mod_type,
                mod_val: row.mod_val,
            }
        }
    }

    #[derive(Debug, Deserialize, Clone)]
    pub struct DateTimeModifierRow {
        #[serde(rename = "LINK_ID")]
        pub link_id: u64,
        #[serde(rename = "COND_ID")]
        pub cond_id: u64,
        #[serde(rename = "DTTME_TYPE", default)]
        pub dttme_type: String,
        #[serde(rename = "REF_DATE", default)]
        pub ref_date: String,
        #[serde(rename = "STARTTIME", default)]
        pub start_time: String,
        #[serde(rename = "ENDTIME", default)]
        pub end_time: String,
    }

    impl From<DateTimeModifierRow> for DateTimeModifier {
        fn from(row: DateTimeModifierRow) -> Self {
            DateTimeModifier {
                link_id: row.link_id,
                cond_id: row.cond_id,
                dttme_type: row.dttme_type,
                ref_date: row.ref_date,
                start_time: row.start_time,
                end_time: row.end_time,
            }
        }
    }

    #[derive(Debug, Deserialize, Clone)]
    pub struct LaneRow {
        #[serde(rename = "LINK_ID")]
        pub link_id: u64,
        #[serde(rename = "LANE_TYP")]
        pub lane_type: u32,
    }

    impl From<LaneRow> for LaneRecord {
        fn from(row: LaneRow) -> Self {
            LaneRecord {
                link_id: row.link_id,
                lane_type: row.lane_type,
            }
        }
    }
}

/// Traffic feeds and pre-computed spatial joins.
pub(crate) mod feeds {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use log::warn;
    use serde::Deserialize;

    use crate::aggregate::PoiCount;
    use crate::criteria::construction::{Criticality, Incident};
    use crate::criteria::parking::ParkingCount;
    use crate::criteria::transit::StopFrequency;
    use crate::speed_probe::ProbeRecord;

    const TIMESTAMP_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    /// Incident feeds mix local timestamps, RFC 3339 and bare dates.
    pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_local());
        }
        TIMESTAMP_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }

    #[derive(Debug, Deserialize, Clone)]
    pub struct ProbeRow {
        #[serde(rename = "LINK-DIR")]
        pub link_dir: String,
        #[serde(rename = "DATE-TIME")]
        pub date_time: String,
        #[serde(rename = "EPOCH-60MIN", default)]
        pub epoch_hour: Option<u32>,
        #[serde(rename = "MEAN")]
        pub mean_speed: f64,
        #[serde(rename = "FREEFLOW")]
        pub freeflow_speed: f64,
    }

    impl From<ProbeRow> for ProbeRecord {
        fn from(row: ProbeRow) -> Self {
            ProbeRecord {
                link_dir: row.link_dir,
                date_time: row.date_time,
                epoch_hour: row.epoch_hour,
                mean_speed: row.mean_speed,
                freeflow_speed: row.freeflow_speed,
            }
        }
    }

    #[derive(Debug, Deserialize, Clone)]
    pub struct IncidentRow {
        #[serde(rename = "ID")]
        pub id: String,
        /// `;`-separated
        #[serde(rename = "LINK_IDS")]
        pub link_ids: String,
        #[serde(rename = "TYPE", default)]
        pub kind: String,
        #[serde(rename = "CRITICALITY", default)]
        pub criticality: String,
        #[serde(rename = "START_TIME", default)]
        pub start_time: Option<String>,
        #[serde(rename = "END_TIME", default)]
        pub end_time: Option<String>,
    }

    fn timestamp_field(incident: &str, field: &str, raw: Option<&str>) -> Option<NaiveDateTime> {
        let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            warn!("Incident {}: unreadable {} '{}'", incident, field, raw);
        }
        parsed
    }

    impl From<IncidentRow> for Incident {
        fn from(row: IncidentRow) -> Self {
            let mut link_ids = Vec::new();
            for token in row.link_ids.split(';').map(str::trim).filter(|t| !t.is_empty()) {
                match token.parse::<u64>() {
                    Ok(id) => link_ids.push(id),
                    Err(_) => warn!("Incident {}: ignoring link id '{}'", row.id, token),
                }
            }
            let start = timestamp_field(&row.id, "START_TIME", row.start_time.as_deref());
            let end = timestamp_field(&row.id, "END_TIME", row.end_time.as_deref());
            Incident {
                link_ids,
                kind: row.kind.trim().to_string(),
                criticality: Criticality::from_label(&row.criticality),
                start,
                end,
                id: row.id,
            }
        }
    }

    #[derive(Debug, Deserialize, Clone)]
    pub struct PoiCountRow {
        #[serde(rename = "LINK_ID")]
        pub link_id: u64,
        #[serde(rename = "LAYER")]
        pub layer: String,
        #[serde(rename = "Point_Count")]
        pub count: f64,
    }

    impl From<PoiCountRow> for PoiCount {
        fn from(row: PoiCountRow) -> Self {
            PoiCount {
                link_id: row.link_id,
                layer: row.layer,
                count: row.count,
            }
        }
    }

    #[derive(Debug, Deserialize, Clone)]
    pub struct ParkingRow {
        #[serde(rename = "LINK_ID")]
        pub link_id: u64,
        #[serde(rename = "NB_PLACE")]
        pub spots: f64,
    }

    impl From<ParkingRow> for ParkingCount {
        fn from(row: ParkingRow) -> Self {
            ParkingCount {
                link_id: row.link_id,
                spots: row.spots,
            }
        }
    }

    #[derive(Debug, Deserialize, Clone)]
    pub struct TransitStopRow {
        #[serde(rename = "LINK_ID")]
        pub link_id: u64,
        #[serde(rename = "NUM_RUNS_PER_HOUR")]
        pub runs_per_hour: f64,
    }

    impl From<TransitStopRow> for StopFrequency {
        fn from(row: TransitStopRow) -> Self {
            StopFrequency {
                link_id: row.link_id,
                runs_per_hour: row.runs_per_hour,
            }
        }
    }
}

/// Attribute tile responses as returned by the slope service.
pub(crate) mod slope_tiles {
    use serde::Deserialize;

    use crate::criteria::slope::SlopeRecord;

    #[derive(Debug, Deserialize, Clone)]
    pub struct TileResponse {
        #[serde(rename = "Tiles", default)]
        pub tiles: Vec<Tile>,
    }

    #[derive(Debug, Deserialize, Clone)]
    pub struct Tile {
        #[serde(rename = "Rows", default)]
        pub rows: Vec<TileRow>,
    }

    #[derive(Debug, Deserialize, Clone)]
    #[serde(untagged)]
    pub enum LinkId {
        Number(u64),
        Text(String),
    }

    impl LinkId {
        pub fn value(&self) -> Option<u64> {
            match self {
                LinkId::Number(id) => Some(*id),
                LinkId::Text(id) => id.trim().parse().ok(),
            }
        }
    }

    #[derive(Debug, Deserialize, Clone)]
    pub struct TileRow {
        #[serde(rename = "LINK_ID")]
        pub link_id: LinkId,
        #[serde(rename = "SLOPES", default)]
        pub slopes: Option<String>,
    }

    impl TileResponse {
        /// Rows with a readable link id and a slope list.
        pub fn into_records(self) -> Vec<SlopeRecord> {
            self.tiles
                .into_iter()
                .flat_map(|tile| tile.rows)
                .filter_map(|row| {
                    Some(SlopeRecord {
                        link_id: row.link_id.value()?,
                        slopes: row.slopes.filter(|s| !s.trim().is_empty())?,
                    })
                })
                .collect()
        }
    }
}

/// Dataset files of a study. Relative paths are resolved against the
/// directory of the study file.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetPaths {
    pub segments: PathBuf,
    #[serde(default)]
    pub conditions: Option<PathBuf>,
    #[serde(default)]
    pub modifiers: Option<PathBuf>,
    #[serde(default)]
    pub date_time_modifiers: Option<PathBuf>,
    #[serde(default)]
    pub lanes: Option<PathBuf>,
    #[serde(default)]
    pub slope_tiles: Vec<PathBuf>,
    #[serde(default)]
    pub probes: Option<PathBuf>,
    #[serde(default)]
    pub incidents: Option<PathBuf>,
    #[serde(default)]
    pub poi_counts: Option<PathBuf>,
    #[serde(default)]
    pub parking_counts: Option<PathBuf>,
    #[serde(default)]
    pub transit_stops: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputPaths {
    pub segments: PathBuf,
    pub summary: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            segments: PathBuf::from("segments_scored.csv"),
            summary: PathBuf::from("summary.csv"),
        }
    }
}

/// Everything a study file holds: the raw parameters at the top level, plus
/// the dataset and output locations.
#[derive(Debug, Clone, Deserialize)]
pub struct StudyFile {
    #[serde(flatten)]
    pub config: RawStudyConfig,
    pub datasets: DatasetPaths,
    #[serde(default)]
    pub output: OutputPaths,
    #[serde(default)]
    pub parallel: bool,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl StudyFile {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }
}

pub fn read_study_file(path: &Path) -> Result<StudyFile> {
    let file =
        File::open(path).with_context(|| format!("Failed to open study file {}", path.display()))?;
    let study: StudyFile = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse study file {}", path.display()))?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(study.with_base_dir(base_dir))
}

/// Reads every row of a CSV file with headers, trimming fields.
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    for (i, row) in reader.deserialize().enumerate() {
        // Header is line 1.
        let row = row.with_context(|| format!("{}: bad row on line {}", path.display(), i + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

fn read_table<R, T>(path: &Path) -> Result<Vec<T>>
where
    R: DeserializeOwned,
    T: From<R>,
{
    let rows: Vec<R> = read_csv(path)?;
    Ok(rows.into_iter().map(T::from).collect())
}

fn read_optional<R, T>(study: &StudyFile, path: Option<&PathBuf>, name: &str) -> Result<Vec<T>>
where
    R: DeserializeOwned,
    T: From<R>,
{
    match path {
        Some(path) => {
            let path = study.resolve(path);
            let rows = read_table::<R, T>(&path)?;
            info!("Read {} {} rows from {}", rows.len(), name, path.display());
            Ok(rows)
        }
        None => {
            info!("No {} dataset configured", name);
            Ok(Vec::new())
        }
    }
}

pub fn read_slope_tiles(path: &Path) -> Result<Vec<SlopeRecord>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let response: slope_tiles::TileResponse = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse slope tiles {}", path.display()))?;
    Ok(response.into_records())
}

/// Reads every dataset of a study. Absent optional datasets are empty.
pub fn load_inputs(study: &StudyFile) -> Result<StudyInputs> {
    use feeds::{IncidentRow, ParkingRow, PoiCountRow, ProbeRow, TransitStopRow};
    use navstreets::{ConditionRow, DateTimeModifierRow, LaneRow, ModifierRow, SegmentRow};

    let datasets = &study.datasets;
    let segments_path = study.resolve(&datasets.segments);
    let segments = read_table::<SegmentRow, Segment>(&segments_path)?;
    info!(
        "Read {} segments from {}",
        segments.len(),
        segments_path.display()
    );

    let mut slopes = Vec::new();
    for path in &datasets.slope_tiles {
        slopes.extend(read_slope_tiles(&study.resolve(path))?);
    }
    info!(
        "Read {} slope rows from {} tiles",
        slopes.len(),
        datasets.slope_tiles.len()
    );

    Ok(StudyInputs {
        segments,
        conditions: read_optional::<ConditionRow, _>(
            study,
            datasets.conditions.as_ref(),
            "condition",
        )?,
        modifiers: read_optional::<ModifierRow, _>(study, datasets.modifiers.as_ref(), "modifier")?,
        date_time_modifiers: read_optional::<DateTimeModifierRow, _>(
            study,
            datasets.date_time_modifiers.as_ref(),
            "date-time modifier",
        )?,
        lanes: read_optional::<LaneRow, _>(study, datasets.lanes.as_ref(), "lane")?,
        slopes,
        probes: read_optional::<ProbeRow, _>(study, datasets.probes.as_ref(), "speed probe")?,
        incidents: read_optional::<IncidentRow, _>(
            study,
            datasets.incidents.as_ref(),
            "incident",
        )?,
        poi_counts: read_optional::<PoiCountRow, _>(
            study,
            datasets.poi_counts.as_ref(),
            "POI count",
        )?,
        parking_counts: read_optional::<ParkingRow, _>(
            study,
            datasets.parking_counts.as_ref(),
            "parking",
        )?,
        transit_stops: read_optional::<TransitStopRow, _>(
            study,
            datasets.transit_stops.as_ref(),
            "transit stop",
        )?,
    })
}

const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_timestamp(timestamp: Option<NaiveDateTime>) -> Option<String> {
    timestamp.map(|t| t.format(OUTPUT_TIMESTAMP_FORMAT).to_string())
}

/// One row of the scored segment table: grades, raw values and group scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSegmentRow {
    #[serde(rename = "LINK_ID")]
    pub link_id: u64,
    #[serde(rename = "FUNC_CLASS")]
    pub func_class: u8,
    #[serde(rename = "LEN_KM_GEO")]
    pub length_km: f64,

    #[serde(rename = "Note_NbVoie")]
    pub lanes: u8,
    #[serde(rename = "Note_ArretTP")]
    pub transit: u8,
    #[serde(rename = "Note_Carrefour")]
    pub intersection: u8,
    #[serde(rename = "Note_Obstacle")]
    pub obstacles: u8,
    #[serde(rename = "Note_Vitesse")]
    pub speed: u8,
    #[serde(rename = "Note_Congestion")]
    pub congestion: u8,
    #[serde(rename = "Note_Chantier")]
    pub construction: u8,
    #[serde(rename = "Note_Gabarit")]
    pub gauge: u8,
    #[serde(rename = "Note_Horaire")]
    pub time_window: u8,
    #[serde(rename = "Note_Stationnement")]
    pub parking: u8,
    #[serde(rename = "Note_Pente")]
    pub slope: u8,

    #[serde(rename = "BANDE_CYC")]
    pub bike_lane: &'static str,
    #[serde(rename = "NB_PASSAGE_TP")]
    pub transit_runs: f64,
    #[serde(rename = "TYPE_CARR")]
    pub intersection_kind: &'static str,
    #[serde(rename = "NB_OBSTACLE")]
    pub obstacle_count: u32,
    #[serde(rename = "CONG_RSI_T")]
    pub rsi_to: f64,
    #[serde(rename = "CONG_RSI_F")]
    pub rsi_from: f64,
    #[serde(rename = "IMPACT_CHANTIER")]
    pub construction_impact: String,
    #[serde(rename = "DEBUT_CHANTIER")]
    pub construction_start: Option<String>,
    #[serde(rename = "FIN_CHANTIER")]
    pub construction_end: Option<String>,
    #[serde(rename = "DUREE_CHANTIER")]
    pub construction_days: i64,
    #[serde(rename = "LIM_HAUT")]
    pub height_limit: Option<f64>,
    #[serde(rename = "LIM_POIDS")]
    pub weight_limit: Option<f64>,
    #[serde(rename = "LIM_ESSIEU")]
    pub axle_weight_limit: Option<f64>,
    #[serde(rename = "LIM_LONG")]
    pub length_limit: Option<f64>,
    #[serde(rename = "LIM_LARG")]
    pub width_limit: Option<f64>,
    #[serde(rename = "ACCES_PJOUR")]
    pub daily_access_hours: f64,
    #[serde(rename = "NB_PLACE")]
    pub parking_spots: f64,
    #[serde(rename = "PENTE_MAX")]
    pub slope_percent: Option<f64>,

    #[serde(rename = "CIR_MOY")]
    pub circulation_mean: f64,
    #[serde(rename = "CIR_MOY_pond")]
    pub circulation_weighted: f64,
    #[serde(rename = "CIR_MOY_norm")]
    pub circulation_normalized: f64,
    #[serde(rename = "RATIO_HIE")]
    pub hierarchy_ratio: f64,
    #[serde(rename = "ACC_MOY")]
    pub accessibility_mean: f64,
    #[serde(rename = "ACC_MOY_pond")]
    pub accessibility_weighted: f64,
    #[serde(rename = "ACC_MOY_norm")]
    pub accessibility_normalized: f64,
    #[serde(rename = "POI_COUNT")]
    pub poi_weight: f64,
}

impl ScoredSegmentRow {
    pub fn new(scored: &ScoredSegment, registry: &CriterionRegistry) -> Self {
        // Lanes and bike lane share the Note_NbVoie column.
        let lane_criterion = registry
            .group(Group::Circulation)
            .first()
            .map_or(Criterion::Lanes, |d| d.criterion);
        let grade = |criterion: Criterion| scored.grade(criterion).value();
        let m = &scored.measures;
        let limit = |dimension: GaugeDimension| m.gauge.get(dimension);
        Self {
            link_id: scored.segment.link_id,
            func_class: scored.segment.func_class,
            length_km: scored.segment.length_km,
            lanes: grade(lane_criterion),
            transit: grade(Criterion::Transit),
            intersection: grade(Criterion::Intersection),
            obstacles: grade(Criterion::Obstacles),
            speed: grade(Criterion::Speed),
            congestion: grade(Criterion::Congestion),
            construction: grade(Criterion::Construction),
            gauge: grade(Criterion::Gauge),
            time_window: grade(Criterion::TimeWindow),
            parking: grade(Criterion::Parking),
            slope: grade(Criterion::Slope),
            bike_lane: if m.has_bike_lane { "Oui" } else { "Non" },
            transit_runs: m.transit_runs.unwrap_or(0.0),
            intersection_kind: m.intersection.label(),
            obstacle_count: m.obstacle_count,
            rsi_to: m.rsi_to,
            rsi_from: m.rsi_from,
            construction_impact: m.construction.impact.clone(),
            construction_start: format_timestamp(m.construction.start),
            construction_end: format_timestamp(m.construction.end),
            construction_days: m.construction.duration_days,
            height_limit: limit(GaugeDimension::Height),
            weight_limit: limit(GaugeDimension::Weight),
            axle_weight_limit: limit(GaugeDimension::AxleWeight),
            length_limit: limit(GaugeDimension::Length),
            width_limit: limit(GaugeDimension::Width),
            daily_access_hours: m.daily_access_hours.unwrap_or(UNRESTRICTED_DAILY_HOURS),
            parking_spots: m.parking_spots,
            slope_percent: m.slope_percent,
            circulation_mean: scored.circulation.mean,
            circulation_weighted: scored.circulation.weighted_mean,
            circulation_normalized: scored.circulation.normalized,
            hierarchy_ratio: scored.hierarchy_ratio,
            accessibility_mean: scored.accessibility.mean,
            accessibility_weighted: scored.accessibility.weighted_mean,
            accessibility_normalized: scored.accessibility.normalized,
            poi_weight: scored.poi_weight,
        }
    }
}

fn write_csv<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write a row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

pub fn write_segments(
    path: &Path,
    segments: &[ScoredSegment],
    registry: &CriterionRegistry,
) -> Result<()> {
    write_csv(path, segments.iter().map(|s| ScoredSegmentRow::new(s, registry)))?;
    info!("Wrote {} scored segments to {}", segments.len(), path.display());
    Ok(())
}

pub fn write_summary(path: &Path, summary: &[SummaryRow]) -> Result<()> {
    write_csv(path, summary)?;
    info!("Wrote {} summary rows to {}", summary.len(), path.display());
    Ok(())
}
