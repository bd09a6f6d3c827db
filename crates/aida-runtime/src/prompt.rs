//! Base system prompt.

/// Coach persona and rules, with `{phase_name}` and `{phase_min_weeks}` slots.
pub const SYSTEM_TEMPLATE: &str = include_str!("../prompts/system.md");

/// Fill the template for the current protocol.
pub fn system_prompt(phase_name: &str, phase_min_weeks: u32) -> String {
    SYSTEM_TEMPLATE
        .replace("{phase_name}", phase_name)
        .replace("{phase_min_weeks}", &phase_min_weeks.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_both_placeholders() {
        let prompt = system_prompt("Fase 1", 2);
        assert!(prompt.starts_with("Eres AIDA"));
        assert!(prompt.contains("internamente: Fase 1, mínimo 2 semanas"));
        assert!(!prompt.contains("{phase_name}"));
        assert!(!prompt.contains("{phase_min_weeks}"));
    }
}
