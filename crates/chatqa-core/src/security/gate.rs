//! ============================================================================
//! Security Gate - Ordered, short-circuiting query checks
//! ============================================================================
//! Order is fixed at construction: lexical, personal information, policy.
//! The first check to fire decides the verdict; later checks never run.
//! ============================================================================

use tracing::{info, warn};

use super::{
    LexicalFilter, PiiCheck, PolicyValidator, SecurityCheck, SecurityVerdict, ServiceErrorPolicy,
};

pub struct SecurityGate {
    checks: Vec<Box<dyn SecurityCheck>>,
}

impl SecurityGate {
    pub fn new(lexical: LexicalFilter, pii: PiiCheck, validator: PolicyValidator) -> Self {
        Self {
            checks: vec![Box::new(lexical), Box::new(pii), Box::new(validator)],
        }
    }

    /// Run every check in order until one fires
    pub async fn evaluate(&self, text: &str) -> SecurityVerdict {
        for check in &self.checks {
            let category = check.category();

            let triggered = match check.is_triggered(text).await {
                Ok(triggered) => triggered,
                Err(e) => {
                    let policy = check.on_service_error();
                    warn!(
                        "Security check {} failed ({}), applying {:?}",
                        category, e, policy
                    );
                    policy == ServiceErrorPolicy::FailClosed
                }
            };

            if triggered {
                info!("Query blocked by {} check", category);
                return SecurityVerdict::triggered(category);
            }
        }

        SecurityVerdict::Clear
    }
}
