//! Situational instruction appended as the last system segment.

use aida_core::Moment;

/// What the model should do this turn, chosen from the user's last message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SituationDirective {
    /// The user confirmed an action.
    Confirmation,
    /// Fasting context.
    Fasting,
    /// Two hours after a meal.
    PostMeal,
    /// Bedtime context.
    Night,
    /// No number in the message.
    NoReading,
    /// A number with no recognizable moment.
    UnknownMoment,
}

impl SituationDirective {
    /// Confirmation wins, then a known moment, then whether a number was given.
    pub fn select(moment: Moment, confirmation: bool, has_glucose: bool) -> Self {
        if confirmation {
            return Self::Confirmation;
        }
        match moment {
            Moment::Fasting => Self::Fasting,
            Moment::PostMeal => Self::PostMeal,
            Moment::Night => Self::Night,
            Moment::Unknown if has_glucose => Self::UnknownMoment,
            Moment::Unknown => Self::NoReading,
        }
    }

    /// Instruction text.
    pub fn text(self) -> &'static str {
        match self {
            Self::Confirmation => {
                "El usuario confirmó que hará/ya hizo una acción. Responde como coach cercano. NO hagas preguntas en este turno.\n\
                 Refuerza la acción + indica el siguiente micro-paso (cuándo medir o qué observar) y cierra con un cierre VARIADO sin pregunta."
            }
            Self::Fasting => {
                "Contexto: AYUNO. Responde como coach cercano.\n\
                 Si el usuario pidió acción inmediata (\"ahorita/para desayunar\"), responde con acción y/o 3 opciones sin preguntar permiso.\n\
                 Evita preguntas innecesarias."
            }
            Self::PostMeal => {
                "Contexto: 2H POSTCOMIDA. Responde como coach cercano.\n\
                 Da 1 acción simple (caminar/agua/respirar) y cierre breve.\n\
                 Si falta info, SOLO 1 pregunta."
            }
            Self::Night => {
                "Contexto: NOCHE. Responde como coach cercano.\n\
                 Recomienda hábito de cierre y descanso.\n\
                 Si falta info, SOLO 1 pregunta."
            }
            Self::NoReading => {
                "El usuario NO dio una lectura numérica en este mensaje.\n\
                 Responde breve, natural y útil.\n\
                 1) Saluda (si aplica) y ofrece 1 camino:\n\
                 2) Haz SOLO 1 pregunta: \"Estoy a tus órdenes, ¿dime como te puedo ayuda?\""
            }
            Self::UnknownMoment => {
                "Contexto no claro PERO hay lectura numérica.\n\
                 Pregunta SOLO 1 cosa: \"¿Fue en ayuno, 2h postcomida o antes de dormir?\""
            }
        }
    }
}
