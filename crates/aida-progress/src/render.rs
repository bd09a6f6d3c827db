//! Text rendering of [`ProgressMetrics`] for model context.

use std::fmt::Display;

use crate::metrics::{ProgressMetrics, round_half_up as round0, round1};

const NOT_AVAILABLE: &str = "N/D";

/// Render the snapshot as the `PROGRESO` block.
///
/// Whole mg/dL values are rounded here; the snapshot keeps one decimal.
pub fn render_progress(m: &ProgressMetrics) -> String {
    if m.n14 == 0 {
        return "PROGRESO: Aún no hay lecturas registradas para estimar promedios.".to_string();
    }

    let avg7 = mg_dl_line("- Promedio 7", m.avg_last7);
    let avg14 = mg_dl_line("- Promedio 14", m.avg14);
    let sd = match m.sd14 {
        Some(v) => format!("- Variabilidad SD14: {} (más bajo = más estable)", round0(v)),
        None => format!("- Variabilidad SD14: {NOT_AVAILABLE}"),
    };

    if !m.has_baseline {
        let trend = match m.trend_mg_dl {
            Some(t) => format!("- Tendencia 7vs7: {} ({} mg/dL)", m.trend_label.as_label(), round0(t)),
            None => "- Tendencia 7vs7: INSUFICIENTE".to_string(),
        };
        return [
            "PROGRESO (sin baseline):".to_string(),
            format!("- Lecturas (14): {}", m.n14),
            avg7,
            avg14,
            sd,
            trend,
        ]
        .join("\n");
    }

    let baseline = format!(
        "- Baseline promedio: {} mg/dL",
        or_na(m.baseline_avg_glucose)
    );
    let change = match m.delta_vs_baseline_mg_dl {
        Some(d) => {
            let pct = m
                .delta_vs_baseline_pct
                .map_or_else(|| NOT_AVAILABLE.to_string(), |p| format!("{}{}%", sign(p), round1(p)));
            format!("- Cambio vs baseline: {}{} mg/dL ({pct})", sign(d), round0(d))
        }
        None => format!("- Cambio vs baseline: {NOT_AVAILABLE}"),
    };
    let trend = match m.trend_mg_dl {
        Some(t) => format!(
            "- Tendencia 7vs7: {} ({}{} mg/dL)",
            m.trend_label.as_label(),
            sign(t),
            round0(t)
        ),
        None => "- Tendencia 7vs7: INSUFICIENTE".to_string(),
    };
    let ranges = format!(
        "- % >180: {} | % >250: {} | % <70: {}",
        percent(m.pct_over180),
        percent(m.pct_over250),
        percent(m.pct_under70)
    );
    let a1c = format!(
        "- A1c est. (14): {} | A1c est. (7): {}",
        or_na(m.a1c_est_from_avg14),
        or_na(m.a1c_est_from_avg7)
    );

    [
        "PROGRESO (con baseline):".to_string(),
        baseline,
        format!("- Lecturas (14): {}", m.n14),
        avg7,
        avg14,
        change,
        trend,
        sd,
        ranges,
        a1c,
    ]
    .join("\n")
}

fn sign(x: f64) -> &'static str {
    if x > 0.0 { "+" } else { "" }
}

fn mg_dl_line(label: &str, value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{label}: {} mg/dL", round0(v)),
        None => format!("{label}: {NOT_AVAILABLE}"),
    }
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{}%", round1(v)))
}

fn or_na<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::compute_metrics;
    use aida_core::Baseline;
    use chrono::Utc;

    fn with_baseline(avg: Option<u16>) -> Baseline {
        Baseline {
            a1c: Some(8.5),
            avg_glucose: avg,
            set_at: Some(Utc::now()),
        }
    }

    #[test]
    fn no_readings() {
        let text = render_progress(&compute_metrics(&[], &with_baseline(Some(190))));
        assert_eq!(
            text,
            "PROGRESO: Aún no hay lecturas registradas para estimar promedios."
        );
    }

    #[test]
    fn without_baseline_template() {
        let text = render_progress(&compute_metrics(&[200, 100], &Baseline::default()));
        assert_eq!(
            text,
            "PROGRESO (sin baseline):\n\
             - Lecturas (14): 2\n\
             - Promedio 7: 150 mg/dL\n\
             - Promedio 14: 150 mg/dL\n\
             - Variabilidad SD14: 71 (más bajo = más estable)\n\
             - Tendencia 7vs7: INSUFICIENTE"
        );
    }

    #[test]
    fn without_baseline_trend_is_unsigned() {
        let mut values = vec![140u16; 7];
        values.extend([125u16; 7]);
        let text = render_progress(&compute_metrics(&values, &Baseline::default()));
        assert!(text.ends_with("- Tendencia 7vs7: SUBIENDO (15 mg/dL)"));
    }

    #[test]
    fn with_baseline_template() {
        let text = render_progress(&compute_metrics(&[150, 160, 170], &with_baseline(Some(180))));
        assert_eq!(
            text,
            "PROGRESO (con baseline):\n\
             - Baseline promedio: 180 mg/dL\n\
             - Lecturas (14): 3\n\
             - Promedio 7: 160 mg/dL\n\
             - Promedio 14: 160 mg/dL\n\
             - Cambio vs baseline: -20 mg/dL (-11.1%)\n\
             - Tendencia 7vs7: INSUFICIENTE\n\
             - Variabilidad SD14: 10 (más bajo = más estable)\n\
             - % >180: 0% | % >250: 0% | % <70: 0%\n\
             - A1c est. (14): 7.2 | A1c est. (7): 7.2"
        );
    }

    #[test]
    fn with_baseline_signs_positive_changes() {
        let mut values = vec![200u16; 7];
        values.extend([180u16; 7]);
        let text = render_progress(&compute_metrics(&values, &with_baseline(Some(170))));
        assert!(text.contains("- Cambio vs baseline: +20 mg/dL (+11.8%)"));
        assert!(text.contains("- Tendencia 7vs7: SUBIENDO (+20 mg/dL)"));
        assert!(text.contains("- % >180: 50% | % >250: 0% | % <70: 0%"));
    }

    #[test]
    fn negative_halves_round_up() {
        assert_eq!(round0(-2.5), -2.0);
        assert_eq!(round0(2.5), 3.0);
        assert!(round0(-0.4).is_sign_positive());
        let text = render_progress(&compute_metrics(&[151, 150], &with_baseline(Some(153))));
        assert!(text.contains("- Promedio 14: 151 mg/dL"));
        assert!(text.contains("- Cambio vs baseline: -2 mg/dL (-1.6%)"));
    }

    #[test]
    fn baseline_a1c_only_renders_placeholders() {
        let text = render_progress(&compute_metrics(&[120], &with_baseline(None)));
        assert!(text.contains("- Baseline promedio: N/D mg/dL"));
        assert!(text.contains("- Cambio vs baseline: N/D"));
        assert!(text.contains("- Variabilidad SD14: N/D"));
    }
}
