//! A deterministic provider used in `DRY`/test configurations and by
//! default when no API key is configured (spec.md §6). Classifies inbound
//! mail by keyword rather than calling a model, and drafts boilerplate
//! text for each action type — enough to exercise the rest of the engine
//! without a network dependency.

use async_trait::async_trait;
use records_core::{ActionType, Case, Classification, Draft, Message, ResponseAnalysis, Sentiment};
use regex::Regex;

use crate::error::Result;
use crate::traits::{DraftContext, DraftGenerator, ResponseAnalyzer};

pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }

    fn fee_amount(text: &str) -> Option<f64> {
        let re = Regex::new(r"\$\s*([0-9]+(?:\.[0-9]{1,2})?)").unwrap();
        re.captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    }

    fn classify(text: &str) -> (Classification, Vec<String>) {
        let lower = text.to_lowercase();
        let mut key_points = Vec::new();

        let classification = if lower.contains("lawsuit") || lower.contains("sue you") || lower.contains("idiots") {
            key_points.push("aggressive tone detected".to_string());
            Classification::Hostile
        } else if lower.contains("wrong department") || lower.contains("not the correct agency") {
            Classification::WrongAgency
        } else if lower.contains("submit your request through our portal") || lower.contains("online portal") {
            Classification::PortalRedirect
        } else if lower.contains("could you clarify") || lower.contains("please clarify") {
            Classification::ClarificationRequest
        } else if lower.contains("fee") || lower.contains('$') {
            Classification::FeeQuote
        } else if lower.contains("denied") || lower.contains("exempt") {
            if lower.contains("ongoing investigation") || lower.contains("active investigation") {
                key_points.push("ongoing investigation".to_string());
            }
            if lower.contains("juvenile") {
                key_points.push("juvenile".to_string());
            }
            if lower.contains("sealed") || lower.contains("court order") {
                key_points.push("sealed".to_string());
            }
            Classification::Denial
        } else if lower.contains("partially approved") || lower.contains("partial approval") {
            Classification::PartialApproval
        } else if lower.contains("partial records") || lower.contains("additional records to follow") {
            Classification::PartialDelivery
        } else if lower.contains("enclosed") || lower.contains("records are attached") || lower.contains("please find the requested records") {
            Classification::RecordsReady
        } else if lower.contains("we have received your request") || lower.contains("thank you for your request") {
            Classification::Acknowledgment
        } else {
            Classification::Unknown
        };

        (classification, key_points)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseAnalyzer for MockProvider {
    async fn analyze_response(&self, message: &Message, _case: &Case) -> Result<ResponseAnalysis> {
        let text = message.body_text.clone().unwrap_or_default();
        let (classification, key_points) = Self::classify(&text);
        let fee_amount = if classification == Classification::FeeQuote {
            Self::fee_amount(&text)
        } else {
            None
        };
        let sentiment = if classification == Classification::Hostile {
            Sentiment::Hostile
        } else {
            Sentiment::Neutral
        };
        let suggested_action = match classification {
            Classification::Unknown => None,
            _ => Some(ActionType::None),
        };
        Ok(ResponseAnalysis {
            message_id: message.id,
            classification,
            confidence: if classification == Classification::Unknown { 0.0 } else { 0.8 },
            sentiment,
            extracted_fee_amount: fee_amount,
            extracted_deadline: None,
            constraints_to_add: Vec::new(),
            scope_updates: Vec::new(),
            key_points,
            requires_action: true,
            suggested_action,
        })
    }
}

#[async_trait]
impl DraftGenerator for MockProvider {
    async fn generate(&self, case: &Case, action_type: ActionType, context: &DraftContext) -> Result<Draft> {
        let agency = &case.agency.name;
        let mut body = match action_type {
            ActionType::SendInitialRequest => {
                format!("To {agency}: this is a request for public records under applicable law.")
            }
            ActionType::SendFollowup => {
                format!("To {agency}: following up on our pending public records request.")
            }
            ActionType::SendRebuttal => {
                format!("To {agency}: we respectfully disagree with the stated basis for denial.")
            }
            ActionType::SendAppeal => {
                format!("To {agency}: we are appealing the denial of our records request.")
            }
            ActionType::SendClarification => {
                format!("To {agency}: here is the clarification you requested.")
            }
            ActionType::SendFeeWaiverRequest => {
                format!("To {agency}: we request a fee waiver for this request.")
            }
            ActionType::AcceptFee => format!("To {agency}: we accept the quoted fee."),
            ActionType::NegotiateFee => format!("To {agency}: we would like to negotiate the quoted fee."),
            ActionType::DeclineFee => format!("To {agency}: we decline to pay the quoted fee."),
            ActionType::ReformulateRequest => {
                format!("To {agency}: here is a narrower reformulation of our request.")
            }
            ActionType::RespondPartialApproval => {
                format!("To {agency}: acknowledging your partial approval.")
            }
            ActionType::ResearchAgency | ActionType::SubmitPortal | ActionType::CloseCase | ActionType::Escalate | ActionType::None => {
                String::new()
            }
        };
        if !context.exclude_items.is_empty() {
            body.push_str(&format!(
                "\n\nThis request excludes: {}.",
                context.exclude_items.join(", ")
            ));
        }
        if let Some(instruction) = &context.adjustment_instruction {
            body.push_str(&format!("\n\n[Adjusted per instruction: {instruction}]"));
        }
        Ok(Draft {
            subject: format!("Re: public records request — {agency}"),
            body_text: body.clone(),
            body_html: format!("<p>{}</p>", body.replace('\n', "<br>")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use records_core::{AgencyIdentity, CaseId, CaseStatus, AutopilotMode, PortalBookkeeping, MessageId, Direction};
    use std::collections::BTreeSet;

    fn sample_case() -> Case {
        Case {
            id: CaseId(1),
            agency: AgencyIdentity {
                name: "City PD".into(),
                email: Some("records@citypd.example".into()),
                portal_url: None,
                portal_provider: None,
            },
            jurisdiction_code: "US-CA".into(),
            status: CaseStatus::AwaitingResponse,
            substatus: None,
            pause_reason: None,
            constraints: BTreeSet::new(),
            scope_items: Vec::new(),
            next_due_at: None,
            autopilot_mode: AutopilotMode::Supervised,
            portal: PortalBookkeeping::default(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn inbound(body: &str) -> Message {
        Message {
            id: MessageId(1),
            case_id: CaseId(1),
            direction: Direction::Inbound,
            provider_message_id: Some("p1".into()),
            rfc2822_id: None,
            subject: Some("Re: request".into()),
            body_text: Some(body.to_string()),
            body_html: None,
            message_type: None,
            sent_at: None,
            received_at: Some(chrono::Utc::now()),
            processed_at: None,
            processed_run_id: None,
            last_error: None,
        }
    }

    #[tokio::test]
    async fn classifies_fee_quote_and_extracts_amount() {
        let provider = MockProvider::new();
        let analysis = provider
            .analyze_response(&inbound("There is a fee of $42.50 to process this request."), &sample_case())
            .await
            .unwrap();
        assert_eq!(analysis.classification, Classification::FeeQuote);
        assert_eq!(analysis.extracted_fee_amount, Some(42.50));
    }

    #[tokio::test]
    async fn classifies_denial_with_strong_indicator_key_point() {
        let provider = MockProvider::new();
        let analysis = provider
            .analyze_response(
                &inbound("Your request is denied due to an ongoing investigation."),
                &sample_case(),
            )
            .await
            .unwrap();
        assert_eq!(analysis.classification, Classification::Denial);
        assert!(analysis.key_points.iter().any(|p| p.contains("ongoing investigation")));
    }

    #[tokio::test]
    async fn unrecognized_text_is_unknown_with_zero_confidence() {
        let provider = MockProvider::new();
        let analysis = provider
            .analyze_response(&inbound("lorem ipsum dolor sit amet"), &sample_case())
            .await
            .unwrap();
        assert_eq!(analysis.classification, Classification::Unknown);
        assert_eq!(analysis.confidence, 0.0);
    }

    #[tokio::test]
    async fn draft_includes_excluded_items_and_adjustment() {
        let provider = MockProvider::new();
        let context = DraftContext {
            adjustment_instruction: Some("be more formal".into()),
            exclude_items: vec!["Body Camera Footage".into()],
            scope_items: Vec::new(),
        };
        let draft = provider
            .generate(&sample_case(), ActionType::SendFollowup, &context)
            .await
            .unwrap();
        assert!(draft.body_text.contains("Body Camera Footage"));
        assert!(draft.body_text.contains("be more formal"));
    }
}
