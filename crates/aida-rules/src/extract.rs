//! Pattern extractors over free user text.
//!
//! Every function here is total: malformed or unrelated input yields
//! `None`, `false`, or empty flags.

use std::sync::LazyLock;

use aida_core::{Moment, Symptom, Symptoms};
use regex::Regex;

/// Lower bound for a reading taken from the current turn.
pub const TURN_GLUCOSE_MIN: u16 = 40;
/// Lower bound for a reading seen by the safety gate.
pub const SAFETY_GLUCOSE_MIN: u16 = 30;
/// Upper bound for any reading.
pub const GLUCOSE_MAX: u16 = 600;

static GLUCOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([0-9]{2,3})\b").expect("valid regex"));

static FASTING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ayuno|en ayunas|al despertar|despert|sin comer").expect("valid regex")
});
static POST_MEAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)post\s*comida|despu[eé]s de comer|2h|2 horas|dos horas").expect("valid regex")
});
// must not match "cena" or "cené"
static NIGHT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)antes de dormir|al dormir|me voy a dormir|noche").expect("valid regex")
});

static CONFIRMATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:ok|okey|va|listo|perfecto|gracias|sale|lo har[eé]|intentar[eé]|ya lo hice|hecho|de acuerdo)\b",
    )
    .expect("valid regex")
});

static LOW_SYMPTOMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)maread|mareo|temblor|sudor|d[eé]bil|confus|desmay").expect("valid regex")
});
static VOMITING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)vomit|v[oó]mito|n[aá]usea").expect("valid regex"));
static RESPIRATORY_OR_CHEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)dolor\s+(?:de\s+|en\s+(?:el\s+)?)?pecho|falta\s+de\s+aire|ahogo|dificultad\s+para\s+respirar",
    )
    .expect("valid regex")
});

static HYPO_CUES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)mareo|maread|temblor|sudor(?:aci[oó]n)?\s+fr[ií]a|debilidad|palpitaciones|ansiedad|confusi[oó]n",
    )
    .expect("valid regex")
});
static SEVERE_CUES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)confusi[oó]n|desmay|dolor\s+(?:de\s+|en\s+(?:el\s+)?)?pecho|dificultad\s+para\s+respirar|falta\s+de\s+aire|respiraci[oó]n\s+agitada|v[oó]mit",
    )
    .expect("valid regex")
});

static A1C: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:a1c|glicosilada)\s*(?:(?:es|est[aá]|sali[oó])\s*)?(?:(?:de|en)\s*)?[:=]?\s*([0-9]{1,2}(?:[.,][0-9])?)",
    )
    .expect("valid regex")
});
static AVG_GLUCOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:promedio|media)\b(?:\s+(?:es|de|anda|est[aá]|arriba|en|como|por|alrededor|sale|sali[oó])\b)*\s*[:=]?\s*([0-9]{2,3})\b",
    )
    .expect("valid regex")
});

/// Glucose reading stated in the current message.
///
/// Keeps standalone 2–3 digit numbers in `[40, 600]` and returns the last one.
pub fn extract_glucose(text: &str) -> Option<u16> {
    GLUCOSE
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<u16>().ok())
        .filter(|n| (TURN_GLUCOSE_MIN..=GLUCOSE_MAX).contains(n))
        .last()
}

/// First standalone 2–3 digit number, if it lies in `[30, 600]`.
///
/// Only the first number is considered; an out-of-range first number means no reading.
pub fn first_glucose_mention(text: &str) -> Option<u16> {
    let caps = GLUCOSE.captures(text)?;
    let n = caps[1].parse::<u16>().ok()?;
    (SAFETY_GLUCOSE_MIN..=GLUCOSE_MAX).contains(&n).then_some(n)
}

/// Time-of-day cue, checked fasting → post-meal → night.
pub fn detect_moment(text: &str) -> Moment {
    if FASTING.is_match(text) {
        Moment::Fasting
    } else if POST_MEAL.is_match(text) {
        Moment::PostMeal
    } else if NIGHT.is_match(text) {
        Moment::Night
    } else {
        Moment::Unknown
    }
}

/// Whether the message acknowledges or confirms an action.
///
/// Cue words must stand alone: "va" inside "nueva" or "vamos" does not count.
pub fn is_confirmation(text: &str) -> bool {
    CONFIRMATION.is_match(text)
}

/// Independent symptom categories mentioned in the message.
pub fn extract_symptoms(text: &str) -> Symptoms {
    let mut out = Symptoms::default();
    if LOW_SYMPTOMS.is_match(text) {
        out.insert(Symptom::LowSymptoms);
    }
    if VOMITING.is_match(text) {
        out.insert(Symptom::Vomiting);
    }
    if RESPIRATORY_OR_CHEST.is_match(text) {
        out.insert(Symptom::RespiratoryOrChest);
    }
    out
}

/// Hypoglycemic cues used by the safety gate.
pub fn has_hypo_symptoms(text: &str) -> bool {
    HYPO_CUES.is_match(text)
}

/// Severe cues (confusion, fainting, chest, breathing, vomiting) used by the safety gate.
pub fn has_severe_symptoms(text: &str) -> bool {
    SEVERE_CUES.is_match(text)
}

/// Lab values found in one message.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BaselineExtraction {
    /// A1c percentage in `[4, 20]`.
    pub a1c: Option<f64>,
    /// Average glucose in `[40, 600]`.
    pub avg_glucose: Option<u16>,
}

impl BaselineExtraction {
    /// Whether neither value was found.
    pub fn is_empty(&self) -> bool {
        self.a1c.is_none() && self.avg_glucose.is_none()
    }
}

/// A1c stated after "a1c" or "glicosilada". Accepts `,` as decimal separator.
pub fn extract_a1c(text: &str) -> Option<f64> {
    let caps = A1C.captures(text)?;
    let val: f64 = caps[1].replace(',', ".").parse().ok()?;
    (4.0..=20.0).contains(&val).then_some(val)
}

/// Average glucose stated after "promedio" or "media".
///
/// Only connector words may sit between the keyword and the number, so
/// "media hora" or "media manzana" never yield a baseline.
pub fn extract_avg_glucose(text: &str) -> Option<u16> {
    let caps = AVG_GLUCOSE.captures(text)?;
    let val: u16 = caps[1].parse().ok()?;
    (TURN_GLUCOSE_MIN..=GLUCOSE_MAX).contains(&val).then_some(val)
}

/// Both baseline sub-extractors applied independently.
pub fn extract_baseline(text: &str) -> BaselineExtraction {
    BaselineExtraction {
        a1c: extract_a1c(text),
        avg_glucose: extract_avg_glucose(text),
    }
}
