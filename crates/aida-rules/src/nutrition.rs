//! Nutrition interceptors, evaluated after the phase rules.

use regex::Regex;

use crate::engine::{Rule, RuleContext, RuleSet};

/// Engine name reported in logs and metrics.
pub const NUTRITION_ENGINE: &str = "nutrition";

const HUNGER_GLUCOSE_MAX: u16 = 120;

/// Nutrition rules in evaluation order.
pub fn nutrition_rules() -> RuleSet {
    RuleSet::new(
        NUTRITION_ENGINE,
        vec![
            Rule::fixed(
                "tortilla",
                Regex::new(r"(?i)tortilla").expect("valid regex"),
                "En este momento, la tortilla cuenta como cereal y es mejor evitarla para mantener la glucosa estable.\n\nSi necesitas envolver alimentos, usa lechuga o nopal. Seguimos paso a paso.",
            ),
            Rule::fixed(
                "exercise_compensation",
                Regex::new(r"(?i)(?:caminar|ejercicio).*(?:compensar|quemar)").expect("valid regex"),
                "Caminar ayuda a la glucosa, pero no compensa un alimento alto en carbohidratos ahora.\n\nMejor elige una opción baja en carbohidratos y avanzamos sin altibajos.",
            ),
            Rule::fixed(
                "fry",
                Regex::new(r"(?i)fre[ií]r|frit[oa]s?|fritura|empanizad").expect("valid regex"),
                "Mejor evita freír por ahora.\n\nPrefiere plancha, sartén sin aceite o hervido para no sumar grasas que alteren la glucosa.",
            ),
            Rule::fixed(
                "hunger",
                Regex::new(r"(?i)hambre").expect("valid regex"),
                "Ese hambre suele indicar que faltó un poco más de proteína o grasa.\n\nEn la siguiente comida, ajusta agregando grasa saludable o un poco más de proteína.",
            )
            .with_guard(glucose_in_hunger_range),
        ],
    )
}

fn glucose_in_hunger_range(ctx: &RuleContext) -> bool {
    ctx.glucose.is_some_and(|g| g <= HUNGER_GLUCOSE_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aida_core::Phase;

    fn ctx(glucose: Option<u16>) -> RuleContext {
        RuleContext {
            glucose,
            ..RuleContext::default()
        }
    }

    #[test]
    fn tortilla_is_first() {
        let m = nutrition_rules()
            .evaluate("tortilla frita para caminar y quemar", &ctx(None))
            .unwrap();
        assert_eq!(m.rule_id, "tortilla");
    }

    #[test]
    fn exercise_does_not_compensate() {
        let m = nutrition_rules()
            .evaluate("si como pan y luego salgo a caminar para compensar?", &ctx(None))
            .unwrap();
        assert_eq!(m.rule_id, "exercise_compensation");
    }

    #[test]
    fn exercise_requires_both_words_in_order() {
        assert!(nutrition_rules().evaluate("quemar y caminar", &ctx(None)).is_none());
    }

    #[test]
    fn fry_is_phase_independent() {
        let c = RuleContext {
            phase: Phase::Maintenance,
            ..RuleContext::default()
        };
        assert_eq!(nutrition_rules().evaluate("pescado frito", &c).unwrap().rule_id, "fry");
    }

    #[test]
    fn hunger_needs_glucose_at_or_under_120() {
        let rules = nutrition_rules();
        assert_eq!(
            rules.evaluate("tengo hambre, 120", &ctx(Some(120))).unwrap().rule_id,
            "hunger"
        );
        assert!(rules.evaluate("tengo hambre, 121", &ctx(Some(121))).is_none());
        assert!(rules.evaluate("tengo hambre", &ctx(None)).is_none());
    }
}
