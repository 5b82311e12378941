//! First-aid instruction lookup keyed by condition tag.

use crate::assessor::Assessment;

const CHEST_PAIN: &[&str] = &[
    "Call 911 immediately",
    "Have the person sit down and rest",
    "Loosen tight clothing",
    "If prescribed, help take nitroglycerin",
    "If unconscious, start CPR",
];

const DIFFICULTY_BREATHING: &[&str] = &[
    "Call 911 immediately",
    "Help person sit upright",
    "Loosen tight clothing",
    "If they have an inhaler, help them use it",
    "Stay calm and reassure them",
];

const SEVERE_BLEEDING: &[&str] = &[
    "Call 911 immediately",
    "Apply direct pressure to wound",
    "Elevate injured area if possible",
    "Do not remove embedded objects",
    "Keep person warm and still",
];

const STROKE_SYMPTOMS: &[&str] = &[
    "Call 911 immediately - Note the time",
    "Do not give food or water",
    "Keep person calm and still",
    "Loosen tight clothing",
    "Monitor breathing and pulse",
];

const ALLERGIC_REACTION: &[&str] = &[
    "Call 911 immediately",
    "Remove or avoid the allergen",
    "Help use EpiPen if available",
    "Keep person calm and still",
    "Monitor breathing closely",
];

const GENERIC: &[&str] = &[
    "Call 911 for any life-threatening emergency",
    "Stay calm and assess the situation",
    "Follow dispatcher instructions",
    "Do not leave the person alone",
    "Be prepared to give CPR if trained",
];

/// Ordered instructions for a condition tag; unknown tags get the generic sequence.
pub fn instructions_for(condition_tag: &str) -> &'static [&'static str] {
    match condition_tag {
        "chest_pain" => CHEST_PAIN,
        "difficulty_breathing" => DIFFICULTY_BREATHING,
        "severe_bleeding" => SEVERE_BLEEDING,
        "stroke_symptoms" => STROKE_SYMPTOMS,
        "allergic_reaction" => ALLERGIC_REACTION,
        _ => GENERIC,
    }
}

/// Whether a tag has its own instruction list.
pub fn has_specific_instructions(condition_tag: &str) -> bool {
    !std::ptr::eq(instructions_for(condition_tag), GENERIC)
}

/// Instructions for the first condition an assessment detected, or `None` when nothing matched.
pub fn instructions_for_assessment(assessment: &Assessment) -> Option<&'static [&'static str]> {
    assessment.primary_condition().map(instructions_for)
}
