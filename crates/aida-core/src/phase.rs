//! Protocol phases.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stage of the coaching protocol. Rule replies vary by phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Stabilization: remove glucose spikes.
    #[default]
    #[serde(rename = "FASE_1")]
    Fase1,
    /// Controlled reintroduction.
    #[serde(rename = "FASE_2")]
    Fase2,
    /// Maintenance.
    #[serde(rename = "MANTENIMIENTO")]
    Maintenance,
}

impl Phase {
    /// Configuration label.
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Fase1 => "FASE_1",
            Self::Fase2 => "FASE_2",
            Self::Maintenance => "MANTENIMIENTO",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FASE_1" => Ok(Self::Fase1),
            "FASE_2" => Ok(Self::Fase2),
            "MANTENIMIENTO" => Ok(Self::Maintenance),
            other => Err(format!("unknown phase: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_fase1() {
        assert_eq!(Phase::default(), Phase::Fase1);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("fase_2".parse::<Phase>().unwrap(), Phase::Fase2);
        assert_eq!(" mantenimiento ".parse::<Phase>().unwrap(), Phase::Maintenance);
        assert!("FASE_9".parse::<Phase>().is_err());
    }

    #[test]
    fn serde_uses_labels() {
        let p: Phase = serde_json::from_str("\"MANTENIMIENTO\"").unwrap();
        assert_eq!(p, Phase::Maintenance);
        assert_eq!(serde_json::to_string(&Phase::Fase1).unwrap(), "\"FASE_1\"");
    }
}
