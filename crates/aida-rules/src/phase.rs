//! Phase-specific interceptors.

use aida_core::Phase;
use regex::Regex;

use crate::engine::{Rule, RuleSet};

/// Engine name reported in logs and metrics.
pub const PHASE_ENGINE: &str = "phase";

/// Phase rules in evaluation order: tortilla, then frying.
pub fn phase_rules() -> RuleSet {
    RuleSet::new(PHASE_ENGINE, vec![tortilla(), fry()])
}

fn tortilla() -> Rule {
    Rule::by_phase(
        "tortilla",
        Regex::new(r"(?i)tortillas?").expect("valid regex"),
        vec![
            (
                Phase::Fase1,
                "En este momento del Protocolo Funcional es mejor evitar la tortilla. Primero buscamos estabilidad y quitar picos.\nVamos paso a paso.",
            ),
            (
                Phase::Fase2,
                "Aquí ya se puede reintroducir tortilla, pero con condiciones: 1 pieza, junto con proteína y verduras, y no en la noche.\nSeguimos con cuidado.",
            ),
            (
                Phase::Maintenance,
                "En mantenimiento la tortilla puede entrar de forma flexible, cuidando porción y contexto.\nLa clave es observar cómo responde tu glucosa.",
            ),
        ],
    )
}

// No maintenance entry: frying questions fall through to the next engine.
fn fry() -> Rule {
    Rule::by_phase(
        "fry",
        Regex::new(r"(?i)fre[ií]r|frit[oa]s?|fritura|empanizad").expect("valid regex"),
        vec![
            (
                Phase::Fase1,
                "Por ahora evita freír. La grasa caliente junto con harinas eleva más la glucosa y la inflamación.\nMejor asado, hervido o a la plancha.",
            ),
            (
                Phase::Fase2,
                "Aquí ya puedes usar técnicas más controladas como airfryer o poco aceite, sin empanizar.\nObserva cómo te va.",
            ),
        ],
    )
}
