//! Glucose readings, moments, symptom flags, and per-user baselines.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse time-of-day classification of a glucose reading.
///
/// Serialized with the labels persisted in storage and shown to the model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Moment {
    /// Fasting / on waking.
    #[serde(rename = "AYUNO")]
    Fasting,
    /// Two hours after a meal.
    #[serde(rename = "POSTCOMIDA")]
    PostMeal,
    /// Before sleep.
    #[serde(rename = "NOCHE")]
    Night,
    /// No cue found.
    #[default]
    #[serde(rename = "DESCONOCIDO")]
    Unknown,
}

impl Moment {
    /// Storage and display label.
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Fasting => "AYUNO",
            Self::PostMeal => "POSTCOMIDA",
            Self::Night => "NOCHE",
            Self::Unknown => "DESCONOCIDO",
        }
    }

    /// Whether a concrete moment was identified.
    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }
}

impl fmt::Display for Moment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for Moment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AYUNO" => Ok(Self::Fasting),
            "POSTCOMIDA" => Ok(Self::PostMeal),
            "NOCHE" => Ok(Self::Night),
            "DESCONOCIDO" => Ok(Self::Unknown),
            other => Err(format!("unknown moment: {other}")),
        }
    }
}

/// A single symptom category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symptom {
    /// Dizziness, tremor, sweating, weakness, confusion, fainting.
    LowSymptoms,
    /// Vomiting or nausea.
    Vomiting,
    /// Chest pain or breathing difficulty.
    RespiratoryOrChest,
}

impl Symptom {
    /// All categories in storage order.
    pub const ALL: [Self; 3] = [Self::LowSymptoms, Self::Vomiting, Self::RespiratoryOrChest];

    /// Storage tag.
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::LowSymptoms => "low_symptoms",
            Self::Vomiting => "vomiting",
            Self::RespiratoryOrChest => "respiratory_or_chest",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_tag() == tag)
    }
}

/// Independent symptom flags detected in a message.
///
/// A message can raise any combination of categories, including none.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symptoms {
    /// Hypoglycemic cues.
    pub low_symptoms: bool,
    /// Vomiting or nausea.
    pub vomiting: bool,
    /// Chest or breathing cues.
    pub respiratory_or_chest: bool,
}

impl Symptoms {
    /// No symptoms.
    pub const NONE: Self = Self {
        low_symptoms: false,
        vomiting: false,
        respiratory_or_chest: false,
    };

    /// Whether the given category is raised.
    pub fn contains(&self, symptom: Symptom) -> bool {
        match symptom {
            Symptom::LowSymptoms => self.low_symptoms,
            Symptom::Vomiting => self.vomiting,
            Symptom::RespiratoryOrChest => self.respiratory_or_chest,
        }
    }

    /// Raise a category.
    pub fn insert(&mut self, symptom: Symptom) {
        match symptom {
            Symptom::LowSymptoms => self.low_symptoms = true,
            Symptom::Vomiting => self.vomiting = true,
            Symptom::RespiratoryOrChest => self.respiratory_or_chest = true,
        }
    }

    /// Raised categories in storage order.
    pub fn iter(&self) -> impl Iterator<Item = Symptom> + '_ {
        Symptom::ALL.into_iter().filter(|s| self.contains(*s))
    }

    /// Whether no category is raised.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Comma-joined tags, or `None` when empty.
    pub fn to_tags(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(self.iter().map(Symptom::as_tag).collect::<Vec<_>>().join(","))
    }

    /// Parse a comma-joined tag list. Unknown tags are ignored.
    pub fn from_tags(tags: &str) -> Self {
        let mut out = Self::NONE;
        for tag in tags.split(',').map(str::trim) {
            if let Some(s) = Symptom::from_tag(tag) {
                out.insert(s);
            }
        }
        out
    }
}

/// One stored glucose observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Store-assigned row id.
    pub id: i64,
    /// Opaque user identifier (the device id).
    pub user_id: String,
    /// Glucose in mg/dL.
    pub glucose: u16,
    /// Moment the reading was taken at.
    pub moment: Moment,
    /// Symptoms reported with the reading.
    pub symptoms: Symptoms,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Reference lab values captured from free text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    /// Glycated hemoglobin percentage.
    pub a1c: Option<f64>,
    /// Average glucose in mg/dL.
    pub avg_glucose: Option<u16>,
    /// Last time either field was written.
    pub set_at: Option<DateTime<Utc>>,
}

impl Baseline {
    /// Whether a baseline has ever been recorded.
    pub fn is_set(&self) -> bool {
        self.set_at.is_some()
    }
}

/// Per-user record holding the baseline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    /// User identifier.
    pub id: String,
    /// Stored baseline.
    pub baseline: Baseline,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}
