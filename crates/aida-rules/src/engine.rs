//! Ordered pattern rules.
//!
//! A [`RuleSet`] is evaluated top to bottom and the first rule that applies
//! answers the turn. A rule applies when its pattern matches, its guard (if
//! any) accepts the context, and it has reply text for the current phase.

use aida_core::{Moment, Phase, Symptoms};
use regex::Regex;
use tracing::debug;

/// Facts about the turn available to rule guards and phase tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuleContext {
    /// Current protocol phase.
    pub phase: Phase,
    /// Moment detected in the message.
    pub moment: Moment,
    /// Reading stated in the message.
    pub glucose: Option<u16>,
    /// Symptoms stated in the message.
    pub symptoms: Symptoms,
}

/// Predicate over the turn context.
pub type RuleGuard = fn(&RuleContext) -> bool;

/// Reply text for a rule.
#[derive(Clone, Debug)]
pub enum RuleReply {
    /// Same text in every phase.
    Fixed(&'static str),
    /// Text per phase. Phases without an entry let the rule fall through.
    ByPhase(Vec<(Phase, &'static str)>),
}

impl RuleReply {
    fn for_phase(&self, phase: Phase) -> Option<&'static str> {
        match self {
            Self::Fixed(text) => Some(*text),
            Self::ByPhase(table) => table.iter().find(|(p, _)| *p == phase).map(|(_, t)| *t),
        }
    }
}

/// One interceptor.
#[derive(Clone, Debug)]
pub struct Rule {
    /// Stable identifier used in logs and metrics.
    pub id: &'static str,
    /// Case-insensitive trigger.
    pub pattern: Regex,
    /// Extra condition on the context.
    pub guard: Option<RuleGuard>,
    /// Reply text.
    pub reply: RuleReply,
}

impl Rule {
    /// Rule with a fixed reply.
    pub fn fixed(id: &'static str, pattern: Regex, reply: &'static str) -> Self {
        Self {
            id,
            pattern,
            guard: None,
            reply: RuleReply::Fixed(reply),
        }
    }

    /// Rule whose reply depends on the phase.
    pub fn by_phase(id: &'static str, pattern: Regex, table: Vec<(Phase, &'static str)>) -> Self {
        Self {
            id,
            pattern,
            guard: None,
            reply: RuleReply::ByPhase(table),
        }
    }

    /// Attach a guard.
    #[must_use]
    pub fn with_guard(mut self, guard: RuleGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    fn apply(&self, text: &str, ctx: &RuleContext) -> Option<&'static str> {
        if !self.pattern.is_match(text) {
            return None;
        }
        if self.guard.is_some_and(|guard| !guard(ctx)) {
            return None;
        }
        self.reply.for_phase(ctx.phase)
    }
}

/// A rule that answered the turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleMatch {
    /// Engine name.
    pub engine: &'static str,
    /// Matching rule id.
    pub rule_id: &'static str,
    /// Reply sent to the user.
    pub reply: String,
}

/// Ordered list of rules with first-match semantics.
#[derive(Clone, Debug)]
pub struct RuleSet {
    name: &'static str,
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a rule set evaluated in the given order.
    pub fn new(name: &'static str, rules: Vec<Rule>) -> Self {
        Self { name, rules }
    }

    /// Engine name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rule ids in evaluation order.
    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id).collect()
    }

    /// First rule that applies to `text`, if any.
    pub fn evaluate(&self, text: &str, ctx: &RuleContext) -> Option<RuleMatch> {
        self.rules.iter().find_map(|rule| {
            let reply = rule.apply(text, ctx)?;
            debug!(engine = self.name, rule = rule.id, "rule matched");
            Some(RuleMatch {
                engine: self.name,
                rule_id: rule.id,
                reply: reply.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn re(p: &str) -> Regex {
        Regex::new(p).unwrap()
    }

    fn sample() -> RuleSet {
        RuleSet::new(
            "sample",
            vec![
                Rule::by_phase("only_fase2", re("(?i)pan"), vec![(Phase::Fase2, "pan en fase 2")]),
                Rule::fixed("guarded", re("(?i)pan"), "pan con guard")
                    .with_guard(|ctx| ctx.glucose.is_some_and(|g| g < 100)),
                Rule::fixed("fallback", re("(?i)pan|arroz"), "pan o arroz"),
            ],
        )
    }

    #[test]
    fn first_applicable_rule_wins() {
        let ctx = RuleContext {
            phase: Phase::Fase2,
            ..RuleContext::default()
        };
        let m = sample().evaluate("quiero pan", &ctx).unwrap();
        assert_eq!(m.rule_id, "only_fase2");
        assert_eq!(m.engine, "sample");
    }

    #[test]
    fn missing_phase_entry_falls_through() {
        let ctx = RuleContext {
            glucose: Some(90),
            ..RuleContext::default()
        };
        assert_eq!(sample().evaluate("Pan", &ctx).unwrap().rule_id, "guarded");
    }

    #[test]
    fn failing_guard_falls_through() {
        let ctx = RuleContext {
            glucose: Some(150),
            ..RuleContext::default()
        };
        assert_eq!(sample().evaluate("pan", &ctx).unwrap().reply, "pan o arroz");
    }

    #[test]
    fn no_match_is_none() {
        assert!(sample().evaluate("huevo", &RuleContext::default()).is_none());
    }

    #[test]
    fn rule_ids_keep_order() {
        assert_eq!(sample().rule_ids(), vec!["only_fase2", "guarded", "fallback"]);
    }
}
