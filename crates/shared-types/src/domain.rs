//! # Functional Domains
//!
//! The application is split into three domains that talk only through bus
//! topics, and only downstream:
//!
//! ```text
//! ┌────────────┐   topics    ┌────────────┐   topics    ┌──────────────┐
//! │ INGESTION  │ ──────────→ │  DECISION  │ ──────────→ │ PRESENTATION │
//! │  (rank 0)  │             │  (rank 1)  │             │   (rank 2)   │
//! └────────────┘             └────────────┘             └──────────────┘
//! ```
//!
//! | Rule | Meaning |
//! |------|---------|
//! | Publish | A domain only publishes topics it owns (first topic segment) |
//! | Subscribe | A domain only consumes its own or upstream topics |
//! | No direct calls | A domain never references another domain's code |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::FlowViolation;
use crate::topics::WILDCARD_TOPIC;

/// One of the three functional domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Inbound sources: chat, speech recognition, platform events.
    Ingestion,
    /// Turns inbound messages into response intents.
    Decision,
    /// Renders intents: speech, avatar, subtitles.
    Presentation,
}

impl Domain {
    /// All domains in flow order.
    pub const ALL: [Domain; 3] = [Domain::Ingestion, Domain::Decision, Domain::Presentation];

    /// Position in the flow; events only travel to equal or higher ranks.
    pub fn rank(self) -> u8 {
        match self {
            Domain::Ingestion => 0,
            Domain::Decision => 1,
            Domain::Presentation => 2,
        }
    }

    /// Topic prefix / module name of this domain.
    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Ingestion => "ingestion",
            Domain::Decision => "decision",
            Domain::Presentation => "presentation",
        }
    }

    /// The domain owning a topic, or `None` for infrastructure topics.
    pub fn from_topic(topic: &str) -> Option<Domain> {
        let head = topic.split('.').next()?;
        head.parse().ok()
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ingestion" => Ok(Domain::Ingestion),
            "decision" => Ok(Domain::Decision),
            "presentation" => Ok(Domain::Presentation),
            other => Err(format!("unknown domain: {other}")),
        }
    }
}

/// Executable form of the domain flow rules.
///
/// Used at runtime by the per-domain bus adapters and statically by the
/// boundary checker.
pub struct FlowPolicy;

impl FlowPolicy {
    /// Validate that `publisher` may emit `topic`.
    pub fn check_publish(publisher: Domain, topic: &str) -> Result<(), FlowViolation> {
        match Domain::from_topic(topic) {
            Some(owner) if owner != publisher => Err(FlowViolation::ForeignPublish {
                publisher,
                owner,
                topic: topic.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Validate that `subscriber` may consume `topic`.
    pub fn check_subscribe(subscriber: Domain, topic: &str) -> Result<(), FlowViolation> {
        if topic == WILDCARD_TOPIC {
            return Err(FlowViolation::WildcardSubscription { subscriber });
        }
        match Domain::from_topic(topic) {
            Some(owner) if owner.rank() > subscriber.rank() => {
                Err(FlowViolation::UpstreamConsumption {
                    subscriber,
                    owner,
                    topic: topic.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Validate a code reference from one domain to another.
    pub fn check_reference(from: Domain, to: Domain) -> Result<(), FlowViolation> {
        if from == to {
            Ok(())
        } else {
            Err(FlowViolation::DirectDependency { from, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topics::*;

    #[test]
    fn test_domain_from_topic() {
        assert_eq!(
            Domain::from_topic(INGESTION_MESSAGE_READY),
            Some(Domain::Ingestion)
        );
        assert_eq!(
            Domain::from_topic("presentation.avatar.move"),
            Some(Domain::Presentation)
        );
        assert_eq!(Domain::from_topic("system.shutdown"), None);
        assert_eq!(Domain::from_topic("*"), None);
    }

    #[test]
    fn test_rank_order() {
        assert!(Domain::Ingestion.rank() < Domain::Decision.rank());
        assert!(Domain::Decision.rank() < Domain::Presentation.rank());
    }

    #[test]
    fn test_publish_own_topic() {
        assert!(FlowPolicy::check_publish(Domain::Decision, DECISION_INTENT_GENERATED).is_ok());
        assert!(FlowPolicy::check_publish(Domain::Decision, "system.heartbeat").is_ok());
    }

    #[test]
    fn test_publish_foreign_topic_rejected() {
        let err = FlowPolicy::check_publish(Domain::Ingestion, DECISION_INTENT_GENERATED)
            .unwrap_err();
        assert!(matches!(
            err,
            FlowViolation::ForeignPublish {
                owner: Domain::Decision,
                ..
            }
        ));
    }

    #[test]
    fn test_subscribe_downstream_direction() {
        assert!(FlowPolicy::check_subscribe(Domain::Decision, INGESTION_MESSAGE_READY).is_ok());
        assert!(
            FlowPolicy::check_subscribe(Domain::Presentation, DECISION_INTENT_GENERATED).is_ok()
        );
        assert!(
            FlowPolicy::check_subscribe(Domain::Presentation, PRESENTATION_INTENT_READY).is_ok()
        );
    }

    #[test]
    fn test_subscribe_upstream_rejected() {
        let err = FlowPolicy::check_subscribe(Domain::Ingestion, DECISION_INTENT_GENERATED)
            .unwrap_err();
        assert!(matches!(err, FlowViolation::UpstreamConsumption { .. }));
        assert!(FlowPolicy::check_subscribe(Domain::Decision, "*").is_err());
    }

    #[test]
    fn test_direct_reference() {
        assert!(FlowPolicy::check_reference(Domain::Decision, Domain::Decision).is_ok());
        assert!(FlowPolicy::check_reference(Domain::Decision, Domain::Presentation).is_err());
    }

    #[test]
    fn test_domain_parse_roundtrip() {
        for domain in Domain::ALL {
            assert_eq!(domain.as_str().parse::<Domain>().unwrap(), domain);
        }
        assert!("render".parse::<Domain>().is_err());
    }
}
