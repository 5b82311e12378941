use crate::types::HealthRes;

/// Simple health service shared by every API surface.
///
/// Reports whether the triage service is up and which rule table it is scoring with.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Health response without rule table details.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Triage is alive".into(),
            conditions: None,
        }
    }

    /// Health response naming how many condition rules are loaded.
    pub fn check_health_with_rules(conditions: usize) -> HealthRes {
        HealthRes {
            conditions: Some(conditions),
            ..Self::check_health()
        }
    }
}
