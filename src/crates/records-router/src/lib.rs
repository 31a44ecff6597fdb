//! The deterministic action router (spec.md §4.3): prune to an allowed
//! action set, select one action within it, and decide whether it
//! auto-executes. Deliberately dependency-free — no I/O, no LLM calls, no
//! clock reads — so the whole thing stays a pure function of its input
//! and is trivially unit- and property-tested.

use std::collections::{BTreeSet, HashMap};

use records_core::{ActionType, AutopilotMode, Classification, DenialSubtype, PauseReason, TriggerType};

/// Case-wide constraint codes that force an immediate escalation
/// regardless of classification (spec.md §4.3 pruning table).
const ESCALATING_CONSTRAINTS: &[&str] = &[
    "CITIZENSHIP_REQUIRED",
    "RESIDENCY_REQUIRED",
    "AL_CITIZENSHIP_REQUIRED",
];

/// Everything the router needs to prune, select, and gate. Borrowed, not
/// owned — the caller (the `decide_next_action` node) assembles this from
/// the current `Case`, the latest `ResponseAnalysis`, and configuration.
#[derive(Debug, Clone)]
pub struct RouteInput<'a> {
    pub classification: Classification,
    pub denial_subtype: Option<DenialSubtype>,
    /// `ResponseAnalysis::strong_denial_indicator_count`, passed in rather
    /// than recomputed here so the router stays free of the analysis type.
    pub strong_denial_indicator_count: usize,
    pub constraints: &'a BTreeSet<String>,
    pub followup_count: u32,
    pub max_followups: u32,
    pub portal_automatable: bool,
    pub trigger_type: TriggerType,
    pub dismissed_action_counts: &'a HashMap<ActionType, u32>,
    pub autopilot_mode: AutopilotMode,
    pub extracted_fee_amount: Option<f64>,
    pub fee_auto_approve_max: f64,
    pub fee_moderate_max: f64,
}

/// The router's output: one selected action, its gating decision, and an
/// ordered trail of the reasoning that led there (surfaced on the
/// Proposal, never just logged).
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDecision {
    pub action_type: ActionType,
    pub can_auto_execute: bool,
    pub pause_reason: Option<PauseReason>,
    pub reasoning: Vec<String>,
}

/// The full action universe, used as the "otherwise" pruning fallback.
fn action_universe() -> BTreeSet<ActionType> {
    [
        ActionType::SendInitialRequest,
        ActionType::SendFollowup,
        ActionType::SendRebuttal,
        ActionType::SendAppeal,
        ActionType::SendClarification,
        ActionType::SendFeeWaiverRequest,
        ActionType::AcceptFee,
        ActionType::NegotiateFee,
        ActionType::DeclineFee,
        ActionType::ReformulateRequest,
        ActionType::ResearchAgency,
        ActionType::SubmitPortal,
        ActionType::RespondPartialApproval,
        ActionType::CloseCase,
        ActionType::Escalate,
        ActionType::None,
    ]
    .into_iter()
    .collect()
}

fn set(actions: &[ActionType]) -> BTreeSet<ActionType> {
    actions.iter().copied().collect()
}

/// Step one: prune to an allowed action set, per the verbatim pruning
/// table in spec.md §4.3. Classification-driven rows are checked first
/// since they're the most specific; the constraint/followup rows then
/// narrow further; anything left unmatched falls through to the full
/// universe for selection to narrow down.
pub fn allowed_actions(input: &RouteInput) -> BTreeSet<ActionType> {
    use Classification::*;

    let mut allowed = match input.classification {
        Hostile | Unknown => set(&[ActionType::Escalate]),
        WrongAgency => set(&[ActionType::ResearchAgency, ActionType::Escalate]),
        PartialApproval => set(&[ActionType::RespondPartialApproval, ActionType::Escalate]),
        RecordsReady => set(&[ActionType::None, ActionType::CloseCase]),
        Acknowledgment => set(&[ActionType::None]),
        PartialDelivery => set(&[ActionType::None, ActionType::SendFollowup]),
        FeeQuote => set(&[
            ActionType::AcceptFee,
            ActionType::NegotiateFee,
            ActionType::DeclineFee,
            ActionType::SendFeeWaiverRequest,
            ActionType::SendRebuttal,
            ActionType::Escalate,
            ActionType::None,
        ]),
        PortalRedirect if input.portal_automatable => set(&[
            ActionType::SubmitPortal,
            ActionType::None,
            ActionType::Escalate,
            ActionType::ResearchAgency,
        ]),
        PortalRedirect => set(&[ActionType::None, ActionType::Escalate, ActionType::ResearchAgency]),
        Denial | ClarificationRequest | NoResponse => action_universe(),
    };

    if input.followup_count >= input.max_followups {
        allowed = set(&[ActionType::Escalate]);
    }
    if input
        .constraints
        .iter()
        .any(|c| ESCALATING_CONSTRAINTS.contains(&c.as_str()))
    {
        allowed = set(&[ActionType::Escalate]);
    }

    if input.trigger_type != TriggerType::InitialRequest {
        allowed.remove(&ActionType::SendInitialRequest);
    }
    if !input.portal_automatable {
        allowed.remove(&ActionType::SubmitPortal);
    }
    allowed.retain(|action| input.dismissed_action_counts.get(action).copied().unwrap_or(0) < 2);

    allowed
}

/// Step two: pick one action from the pruned set, and record why.
fn select_action(input: &RouteInput, allowed: &BTreeSet<ActionType>) -> (ActionType, Vec<String>) {
    let mut reasoning = Vec::new();

    let pick = |action: ActionType, allowed: &BTreeSet<ActionType>, reasoning: &mut Vec<String>, note: &str| -> Option<ActionType> {
        if allowed.contains(&action) {
            reasoning.push(note.to_string());
            Some(action)
        } else {
            None
        }
    };

    let chosen = match input.classification {
        Classification::FeeQuote => {
            let amount = input.extracted_fee_amount.unwrap_or(0.0);
            if amount <= input.fee_auto_approve_max {
                pick(
                    ActionType::AcceptFee,
                    allowed,
                    &mut reasoning,
                    &format!("fee ${amount:.2} is within the auto-approve threshold"),
                )
            } else if amount <= input.fee_moderate_max {
                pick(
                    ActionType::AcceptFee,
                    allowed,
                    &mut reasoning,
                    &format!("fee ${amount:.2} exceeds auto-approve but is within the moderate threshold"),
                )
            } else {
                pick(
                    ActionType::NegotiateFee,
                    allowed,
                    &mut reasoning,
                    &format!("fee ${amount:.2} exceeds the moderate threshold, negotiating"),
                )
            }
        }
        Classification::Denial => {
            let subtype = input.denial_subtype.unwrap_or(DenialSubtype::Other);
            match subtype {
                DenialSubtype::OverlyBroad => pick(
                    ActionType::ReformulateRequest,
                    allowed,
                    &mut reasoning,
                    "denial cites overbreadth, reformulating the request",
                ),
                DenialSubtype::GlomarNcnd => pick(
                    ActionType::SendAppeal,
                    allowed,
                    &mut reasoning,
                    "denial is a Glomar/neither-confirm-nor-deny response, appealing",
                ),
                DenialSubtype::JuvenileRecords | DenialSubtype::SealedCourtOrder => pick(
                    ActionType::CloseCase,
                    allowed,
                    &mut reasoning,
                    "denial basis is a strong legal bar, recommending case closure",
                ),
                DenialSubtype::OngoingInvestigation if input.strong_denial_indicator_count > 0 => pick(
                    ActionType::CloseCase,
                    allowed,
                    &mut reasoning,
                    "denial cites an ongoing investigation with strong supporting indicators",
                ),
                _ => pick(
                    ActionType::SendRebuttal,
                    allowed,
                    &mut reasoning,
                    "denial basis is contestable, drafting a rebuttal",
                ),
            }
        }
        Classification::ClarificationRequest => pick(
            ActionType::SendClarification,
            allowed,
            &mut reasoning,
            "agency asked for clarification",
        ),
        Classification::NoResponse => {
            if input.followup_count >= input.max_followups {
                pick(
                    ActionType::Escalate,
                    allowed,
                    &mut reasoning,
                    "no response and follow-up cap reached",
                )
            } else {
                pick(
                    ActionType::SendFollowup,
                    allowed,
                    &mut reasoning,
                    "no response received, sending a follow-up",
                )
            }
        }
        Classification::RecordsReady => pick(
            ActionType::None,
            allowed,
            &mut reasoning,
            "records were delivered, no further action needed",
        ),
        Classification::Acknowledgment => pick(
            ActionType::None,
            allowed,
            &mut reasoning,
            "agency acknowledged receipt, no further action needed",
        ),
        Classification::PartialDelivery => pick(
            ActionType::SendFollowup,
            allowed,
            &mut reasoning,
            "a partial delivery implies more records are outstanding",
        )
        .or_else(|| pick(ActionType::None, allowed, &mut reasoning, "no follow-up available, waiting")),
        Classification::PartialApproval => pick(
            ActionType::RespondPartialApproval,
            allowed,
            &mut reasoning,
            "acknowledging the partial approval",
        ),
        Classification::WrongAgency => pick(
            ActionType::ResearchAgency,
            allowed,
            &mut reasoning,
            "message indicates the wrong agency, researching the correct one",
        ),
        Classification::PortalRedirect if input.portal_automatable => pick(
            ActionType::SubmitPortal,
            allowed,
            &mut reasoning,
            "agency requires portal submission and the portal is automatable",
        ),
        Classification::PortalRedirect => pick(
            ActionType::ResearchAgency,
            allowed,
            &mut reasoning,
            "agency requires a non-automatable portal submission",
        ),
        Classification::Hostile | Classification::Unknown => None,
    };

    let action = chosen.unwrap_or_else(|| {
        reasoning.push("falling back to escalation, no applicable action remained allowed".to_string());
        ActionType::Escalate
    });

    (action, reasoning)
}

/// Step three: decide whether the selected action auto-executes, and if
/// not, which `pause_reason` it carries. `ESCALATE`/`NONE` are always
/// auto-executed since they have no externally visible side effect worth
/// gating; `CLOSE_CASE` always requires a human to confirm a case is
/// truly done; everything else auto-executes only in `AUTO` mode, with
/// `ACCEPT_FEE` additionally bounded by the auto-approve threshold.
fn gate(input: &RouteInput, action: ActionType) -> (bool, Option<PauseReason>) {
    let can_auto_execute = match action {
        ActionType::Escalate | ActionType::None => true,
        ActionType::CloseCase => false,
        ActionType::AcceptFee => {
            input.autopilot_mode == AutopilotMode::Auto
                && input.extracted_fee_amount.unwrap_or(f64::MAX) <= input.fee_auto_approve_max
        }
        _ => input.autopilot_mode == AutopilotMode::Auto,
    };

    if can_auto_execute {
        return (true, None);
    }

    let pause_reason = if action == ActionType::CloseCase {
        PauseReason::CloseAction
    } else {
        match input.classification {
            Classification::FeeQuote => PauseReason::FeeQuote,
            Classification::Denial => PauseReason::Denial,
            Classification::ClarificationRequest => PauseReason::IdRequired,
            Classification::PartialApproval | Classification::PartialDelivery => PauseReason::Scope,
            _ => PauseReason::Scope,
        }
    };

    (false, Some(pause_reason))
}

/// Runs the full prune → select → gate pipeline.
pub fn route(input: &RouteInput) -> RouteDecision {
    let allowed = allowed_actions(input);
    let (action_type, mut reasoning) = select_action(input, &allowed);
    let (can_auto_execute, pause_reason) = gate(input, action_type);
    if can_auto_execute {
        reasoning.push("auto-executing".to_string());
    } else {
        reasoning.push(format!(
            "gating for human review ({:?})",
            pause_reason.expect("gated decisions always carry a pause reason")
        ));
    }
    RouteDecision {
        action_type,
        can_auto_execute,
        pause_reason,
        reasoning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        constraints: BTreeSet<String>,
        dismissed: HashMap<ActionType, u32>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                constraints: BTreeSet::new(),
                dismissed: HashMap::new(),
            }
        }

        fn input(&self, classification: Classification) -> RouteInput<'_> {
            RouteInput {
                classification,
                denial_subtype: None,
                strong_denial_indicator_count: 0,
                constraints: &self.constraints,
                followup_count: 0,
                max_followups: 2,
                portal_automatable: false,
                trigger_type: TriggerType::InboundMessage,
                dismissed_action_counts: &self.dismissed,
                autopilot_mode: AutopilotMode::Supervised,
                extracted_fee_amount: None,
                fee_auto_approve_max: 100.0,
                fee_moderate_max: 500.0,
            }
        }
    }

    #[test]
    fn hostile_is_always_escalated() {
        let fixture = Fixture::new();
        let input = fixture.input(Classification::Hostile);
        let decision = route(&input);
        assert_eq!(decision.action_type, ActionType::Escalate);
        assert!(decision.can_auto_execute);
    }

    #[test]
    fn low_fee_auto_accepts_in_auto_mode() {
        let fixture = Fixture::new();
        let input = RouteInput {
            autopilot_mode: AutopilotMode::Auto,
            extracted_fee_amount: Some(50.0),
            ..fixture.input(Classification::FeeQuote)
        };
        let decision = route(&input);
        assert_eq!(decision.action_type, ActionType::AcceptFee);
        assert!(decision.can_auto_execute);
        assert_eq!(decision.pause_reason, None);
    }

    #[test]
    fn high_fee_gates_in_supervised_mode() {
        let fixture = Fixture::new();
        let input = RouteInput {
            extracted_fee_amount: Some(750.0),
            ..fixture.input(Classification::FeeQuote)
        };
        let decision = route(&input);
        assert_eq!(decision.action_type, ActionType::NegotiateFee);
        assert!(!decision.can_auto_execute);
        assert_eq!(decision.pause_reason, Some(PauseReason::FeeQuote));
    }

    #[test]
    fn fee_exactly_at_auto_threshold_auto_executes_in_auto_mode() {
        let fixture = Fixture::new();
        let input = RouteInput {
            autopilot_mode: AutopilotMode::Auto,
            extracted_fee_amount: Some(100.0),
            ..fixture.input(Classification::FeeQuote)
        };
        let decision = route(&input);
        assert!(decision.can_auto_execute);
    }

    #[test]
    fn fee_exactly_at_auto_threshold_gates_in_supervised_mode() {
        let fixture = Fixture::new();
        let input = RouteInput {
            extracted_fee_amount: Some(100.0),
            ..fixture.input(Classification::FeeQuote)
        };
        let decision = route(&input);
        assert!(!decision.can_auto_execute);
    }

    #[test]
    fn followups_at_cap_escalate_on_no_response() {
        let fixture = Fixture::new();
        let input = RouteInput {
            followup_count: 2,
            max_followups: 2,
            ..fixture.input(Classification::NoResponse)
        };
        let decision = route(&input);
        assert_eq!(decision.action_type, ActionType::Escalate);
    }

    #[test]
    fn citizenship_constraint_forces_escalation_regardless_of_classification() {
        let mut fixture = Fixture::new();
        fixture.constraints.insert("CITIZENSHIP_REQUIRED".to_string());
        let input = RouteInput {
            extracted_fee_amount: Some(10.0),
            ..fixture.input(Classification::FeeQuote)
        };
        let decision = route(&input);
        assert_eq!(decision.action_type, ActionType::Escalate);
    }

    #[test]
    fn send_initial_request_is_removed_for_non_initial_triggers() {
        let fixture = Fixture::new();
        let input = RouteInput {
            trigger_type: TriggerType::ScheduledFollowup,
            ..fixture.input(Classification::NoResponse)
        };
        let allowed = allowed_actions(&input);
        assert!(!allowed.contains(&ActionType::SendInitialRequest));
    }

    #[test]
    fn twice_dismissed_action_is_removed_from_the_allowed_set() {
        let mut fixture = Fixture::new();
        fixture.dismissed.insert(ActionType::SendRebuttal, 2);
        let input = RouteInput {
            denial_subtype: Some(DenialSubtype::Other),
            ..fixture.input(Classification::Denial)
        };
        let allowed = allowed_actions(&input);
        assert!(!allowed.contains(&ActionType::SendRebuttal));
    }

    #[test]
    fn close_case_never_auto_executes() {
        let fixture = Fixture::new();
        let input = RouteInput {
            denial_subtype: Some(DenialSubtype::JuvenileRecords),
            autopilot_mode: AutopilotMode::Auto,
            ..fixture.input(Classification::Denial)
        };
        let decision = route(&input);
        assert_eq!(decision.action_type, ActionType::CloseCase);
        assert!(!decision.can_auto_execute);
        assert_eq!(decision.pause_reason, Some(PauseReason::CloseAction));
    }

    #[test]
    fn portal_redirect_not_automatable_never_submits_portal() {
        let fixture = Fixture::new();
        let input = fixture.input(Classification::PortalRedirect);
        let allowed = allowed_actions(&input);
        assert!(!allowed.contains(&ActionType::SubmitPortal));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn classification_strategy() -> impl Strategy<Value = Classification> {
        prop_oneof![
            Just(Classification::FeeQuote),
            Just(Classification::Denial),
            Just(Classification::Acknowledgment),
            Just(Classification::RecordsReady),
            Just(Classification::ClarificationRequest),
            Just(Classification::PartialApproval),
            Just(Classification::PartialDelivery),
            Just(Classification::PortalRedirect),
            Just(Classification::WrongAgency),
            Just(Classification::Hostile),
            Just(Classification::NoResponse),
            Just(Classification::Unknown),
        ]
    }

    proptest! {
        /// `route` never returns a `SEND_INITIAL_REQUEST` for anything but
        /// an `INITIAL_REQUEST` trigger (spec.md §4.3 unconditional
        /// removal rule).
        #[test]
        fn never_sends_initial_request_on_non_initial_triggers(
            classification in classification_strategy(),
            followup_count in 0u32..5,
        ) {
            let constraints = BTreeSet::new();
            let dismissed = HashMap::new();
            let input = RouteInput {
                classification,
                denial_subtype: Some(DenialSubtype::Other),
                strong_denial_indicator_count: 0,
                constraints: &constraints,
                followup_count,
                max_followups: 2,
                portal_automatable: true,
                trigger_type: TriggerType::InboundMessage,
                dismissed_action_counts: &dismissed,
                autopilot_mode: AutopilotMode::Auto,
                extracted_fee_amount: Some(42.0),
                fee_auto_approve_max: 100.0,
                fee_moderate_max: 500.0,
            };
            let decision = route(&input);
            prop_assert_ne!(decision.action_type, ActionType::SendInitialRequest);
        }

        /// A gated decision always carries a pause reason; an
        /// auto-executed one never does.
        #[test]
        fn gating_and_pause_reason_are_consistent(
            classification in classification_strategy(),
            autopilot_mode in prop_oneof![
                Just(AutopilotMode::Auto),
                Just(AutopilotMode::Supervised),
                Just(AutopilotMode::Manual),
            ],
            fee in 0.0f64..2000.0,
        ) {
            let constraints = BTreeSet::new();
            let dismissed = HashMap::new();
            let input = RouteInput {
                classification,
                denial_subtype: Some(DenialSubtype::Other),
                strong_denial_indicator_count: 0,
                constraints: &constraints,
                followup_count: 0,
                max_followups: 2,
                portal_automatable: true,
                trigger_type: TriggerType::InitialRequest,
                dismissed_action_counts: &dismissed,
                autopilot_mode,
                extracted_fee_amount: Some(fee),
                fee_auto_approve_max: 100.0,
                fee_moderate_max: 500.0,
            };
            let decision = route(&input);
            prop_assert_eq!(decision.can_auto_execute, decision.pause_reason.is_none());
        }
    }
}
