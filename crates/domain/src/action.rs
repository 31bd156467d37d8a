use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use procura_core::{AppError, AppResult, NonEmptyString, TenantId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::entity::EntityReference;

/// Closed set of actions the copilot can propose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Draft a request for quotation.
    RfqDraft,
    /// Draft a message to a supplier.
    SupplierMessage,
    /// Run an inventory what-if scenario.
    #[serde(rename = "inventory_whatif")]
    InventoryWhatIf,
    /// Compare received quotes.
    CompareQuotes,
    /// Draft a purchase order.
    PoDraft,
    /// Draft a goods receipt.
    ReceiptDraft,
    /// Draft a supplier invoice.
    InvoiceDraft,
    /// Approve an existing invoice.
    ApproveInvoice,
    /// Draft a payment.
    PaymentDraft,
}

impl ActionType {
    /// Returns a stable storage value for this action type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RfqDraft => "rfq_draft",
            Self::SupplierMessage => "supplier_message",
            Self::InventoryWhatIf => "inventory_whatif",
            Self::CompareQuotes => "compare_quotes",
            Self::PoDraft => "po_draft",
            Self::ReceiptDraft => "receipt_draft",
            Self::InvoiceDraft => "invoice_draft",
            Self::ApproveInvoice => "approve_invoice",
            Self::PaymentDraft => "payment_draft",
        }
    }

    /// Returns all known action types.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[ActionType] = &[
            ActionType::RfqDraft,
            ActionType::SupplierMessage,
            ActionType::InventoryWhatIf,
            ActionType::CompareQuotes,
            ActionType::PoDraft,
            ActionType::ReceiptDraft,
            ActionType::InvoiceDraft,
            ActionType::ApproveInvoice,
            ActionType::PaymentDraft,
        ];

        ALL
    }

    /// Returns whether this action touches invoices or payments.
    #[must_use]
    pub fn is_financial(&self) -> bool {
        matches!(
            self,
            Self::InvoiceDraft | Self::ApproveInvoice | Self::PaymentDraft
        )
    }
}

impl Display for ActionType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|action_type| action_type.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown action type '{value}'")))
    }
}

/// Unique identifier for an action draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionDraftId(Uuid);

impl ActionDraftId {
    /// Creates a new random draft identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a draft identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Parses a transport value.
    pub fn parse(value: &str) -> AppResult<Self> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|error| AppError::Validation(format!("invalid draft id '{value}': {error}")))
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ActionDraftId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ActionDraftId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Request captured when an action was planned. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionInput {
    /// Free-text question or instruction.
    pub query: Option<String>,
    /// Free-form structured inputs.
    pub inputs: Value,
    /// Workspace filters applied when planning.
    pub filters: Value,
    /// Snapshot of the user and company context at planning time.
    pub context: Value,
}

impl ActionInput {
    /// Creates a validated input record, normalizing absent objects to `{}`.
    pub fn new(query: Option<String>, inputs: Value, filters: Value, context: Value) -> AppResult<Self> {
        let query = query.and_then(|value| {
            let trimmed = value.trim().to_owned();
            (!trimmed.is_empty()).then_some(trimmed)
        });

        Ok(Self {
            query,
            inputs: object_or_empty("inputs", inputs)?,
            filters: object_or_empty("filters", filters)?,
            context: object_or_empty("context", context)?,
        })
    }
}

/// Source the AI service cited for a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Cited document or record identifier.
    pub doc_id: Option<String>,
    /// Display title.
    pub title: Option<String>,
    /// Link to the source.
    pub url: Option<String>,
    /// Quoted snippet.
    pub snippet: Option<String>,
}

/// Proposal returned by the AI service. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutput {
    /// Human-readable summary of the proposal.
    pub summary: String,
    /// Action-type-specific payload consumed by conversion.
    pub payload: Value,
    /// Sources backing the proposal.
    pub citations: Vec<Citation>,
    /// Caveats surfaced to the reviewer.
    pub warnings: Vec<String>,
    /// Model confidence in `[0, 1]` when reported.
    pub confidence: Option<f64>,
    /// Whether the service flagged the proposal for careful review.
    pub needs_human_review: bool,
}

impl ActionOutput {
    /// Validates the structural guarantees every stored output must satisfy.
    pub fn validate(&self) -> AppResult<()> {
        if self.summary.trim().is_empty() {
            return Err(AppError::Validation(
                "action output summary must not be empty".to_owned(),
            ));
        }

        if !self.payload.is_object() {
            return Err(AppError::Validation(
                "action output payload must be an object".to_owned(),
            ));
        }

        if let Some(confidence) = self.confidence
            && !(0.0..=1.0).contains(&confidence)
        {
            return Err(AppError::Validation(format!(
                "action output confidence {confidence} must be between 0 and 1"
            )));
        }

        Ok(())
    }
}

/// Coarse lifecycle status of an action draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionDraftStatus {
    /// Awaiting a human decision.
    Drafted,
    /// Approved and converted into a domain entity.
    Approved,
    /// Rejected with a reason.
    Rejected,
}

impl ActionDraftStatus {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drafted => "drafted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "drafted" => Ok(Self::Drafted),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(AppError::Validation(format!(
                "unknown action draft status '{value}'"
            ))),
        }
    }
}

/// Decision state of a draft. Each variant carries exactly the data it implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DraftDecision {
    /// No decision yet.
    Drafted,
    /// Approved and converted.
    Approved {
        /// Approving subject.
        approved_by: String,
        /// Approval timestamp.
        approved_at: DateTime<Utc>,
        /// Primary entity produced by conversion.
        entity: EntityReference,
    },
    /// Rejected by a reviewer.
    Rejected {
        /// Rejecting subject.
        rejected_by: String,
        /// Rejection timestamp.
        rejected_at: DateTime<Utc>,
        /// Reviewer-supplied reason.
        reason: NonEmptyString,
    },
}

impl DraftDecision {
    /// Returns the coarse status for this decision.
    #[must_use]
    pub fn status(&self) -> ActionDraftStatus {
        match self {
            Self::Drafted => ActionDraftStatus::Drafted,
            Self::Approved { .. } => ActionDraftStatus::Approved,
            Self::Rejected { .. } => ActionDraftStatus::Rejected,
        }
    }
}

/// Values required to create a new draft.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActionDraft {
    /// Owning company.
    pub tenant_id: TenantId,
    /// Creating subject.
    pub created_by: String,
    /// Proposed action type.
    pub action_type: ActionType,
    /// Planning request.
    pub input: ActionInput,
    /// AI service proposal.
    pub output: ActionOutput,
}

/// One proposed action awaiting or past its human decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDraft {
    draft_id: ActionDraftId,
    tenant_id: TenantId,
    created_by: String,
    action_type: ActionType,
    input: ActionInput,
    output: ActionOutput,
    decision: DraftDecision,
    created_at: DateTime<Utc>,
}

impl ActionDraft {
    /// Creates a draft in the `Drafted` state.
    pub fn new(input: NewActionDraft, created_at: DateTime<Utc>) -> AppResult<Self> {
        let NewActionDraft {
            tenant_id,
            created_by,
            action_type,
            input,
            output,
        } = input;

        output.validate()?;
        let created_by = NonEmptyString::new(created_by)?;

        Ok(Self {
            draft_id: ActionDraftId::new(),
            tenant_id,
            created_by: created_by.into(),
            action_type,
            input,
            output,
            decision: DraftDecision::Drafted,
            created_at,
        })
    }

    /// Rehydrates a persisted draft.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn restore(
        draft_id: ActionDraftId,
        tenant_id: TenantId,
        created_by: String,
        action_type: ActionType,
        input: ActionInput,
        output: ActionOutput,
        decision: DraftDecision,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            draft_id,
            tenant_id,
            created_by,
            action_type,
            input,
            output,
            decision,
            created_at,
        }
    }

    /// Returns the draft identifier.
    #[must_use]
    pub fn draft_id(&self) -> ActionDraftId {
        self.draft_id
    }

    /// Returns the owning company.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the creating subject.
    #[must_use]
    pub fn created_by(&self) -> &str {
        self.created_by.as_str()
    }

    /// Returns the proposed action type.
    #[must_use]
    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    /// Returns the planning request.
    #[must_use]
    pub fn input(&self) -> &ActionInput {
        &self.input
    }

    /// Returns the AI service proposal.
    #[must_use]
    pub fn output(&self) -> &ActionOutput {
        &self.output
    }

    /// Returns the decision state.
    #[must_use]
    pub fn decision(&self) -> &DraftDecision {
        &self.decision
    }

    /// Returns the coarse status.
    #[must_use]
    pub fn status(&self) -> ActionDraftStatus {
        self.decision.status()
    }

    /// Returns the entity produced by conversion once approved.
    #[must_use]
    pub fn entity(&self) -> Option<&EntityReference> {
        match &self.decision {
            DraftDecision::Approved { entity, .. } => Some(entity),
            _ => None,
        }
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Fails with a coded conflict unless the draft still awaits a decision.
    pub fn ensure_drafted(&self) -> AppResult<()> {
        if self.status() == ActionDraftStatus::Drafted {
            return Ok(());
        }

        Err(AppError::Conflict(format!(
            "action draft '{}' is already {}",
            self.draft_id,
            self.status().as_str()
        ))
        .with_code("draft_already_decided"))
    }

    /// Returns the approved draft with its produced entity.
    pub fn approve(
        &self,
        approved_by: &str,
        approved_at: DateTime<Utc>,
        entity: EntityReference,
    ) -> AppResult<Self> {
        self.ensure_drafted()?;
        let approved_by = NonEmptyString::new(approved_by)?;

        Ok(Self {
            decision: DraftDecision::Approved {
                approved_by: approved_by.into(),
                approved_at,
                entity,
            },
            ..self.clone()
        })
    }

    /// Returns the rejected draft.
    pub fn reject(
        &self,
        rejected_by: &str,
        rejected_at: DateTime<Utc>,
        reason: &str,
    ) -> AppResult<Self> {
        self.ensure_drafted()?;
        let reason = NonEmptyString::new(reason.trim()).map_err(|_| {
            AppError::Validation("rejection reason must not be empty".to_owned())
                .with_code("rejection_reason_required")
        })?;
        let rejected_by = NonEmptyString::new(rejected_by)?;

        Ok(Self {
            decision: DraftDecision::Rejected {
                rejected_by: rejected_by.into(),
                rejected_at,
                reason,
            },
            ..self.clone()
        })
    }
}

fn object_or_empty(field: &str, value: Value) -> AppResult<Value> {
    match value {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Object(_) => Ok(value),
        _ => Err(AppError::Validation(format!(
            "action input '{field}' must be an object"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use procura_core::TenantId;
    use serde_json::json;

    use super::{
        ActionDraft, ActionDraftStatus, ActionInput, ActionOutput, ActionType, NewActionDraft,
    };
    use crate::entity::{EntityKind, EntityReference};

    fn output() -> ActionOutput {
        ActionOutput {
            summary: "Draft RFQ for 40 bearings".to_owned(),
            payload: json!({"title": "Bearings"}),
            citations: Vec::new(),
            warnings: Vec::new(),
            confidence: Some(0.82),
            needs_human_review: false,
        }
    }

    fn draft() -> ActionDraft {
        let input = ActionInput::new(Some("need bearings".to_owned()), json!(null), json!({}), json!({}));
        assert!(input.is_ok());

        let draft = ActionDraft::new(
            NewActionDraft {
                tenant_id: TenantId::new(),
                created_by: "alice".to_owned(),
                action_type: ActionType::RfqDraft,
                input: input.unwrap_or_else(|_| unreachable!()),
                output: output(),
            },
            Utc::now(),
        );
        assert!(draft.is_ok());
        draft.unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn action_type_storage_values_roundtrip() {
        for action_type in ActionType::all() {
            let parsed: Result<ActionType, _> = action_type.as_str().parse();
            assert!(matches!(parsed, Ok(value) if value == *action_type));
        }
    }

    #[test]
    fn whatif_serializes_with_storage_name() {
        let value = serde_json::to_value(ActionType::InventoryWhatIf);
        assert!(matches!(value, Ok(ref v) if v == "inventory_whatif"));
    }

    #[test]
    fn input_rejects_non_object_inputs() {
        let input = ActionInput::new(None, json!([1, 2]), json!({}), json!({}));
        assert!(input.is_err());
    }

    #[test]
    fn output_rejects_out_of_range_confidence() {
        let mut output = output();
        output.confidence = Some(1.4);
        assert!(output.validate().is_err());
    }

    #[test]
    fn approve_records_entity_and_blocks_second_decision() {
        let draft = draft();
        let entity = EntityReference::new(EntityKind::Rfq, "rfq-1");
        assert!(entity.is_ok());

        let approved = draft.approve("alice", Utc::now(), entity.unwrap_or_else(|_| unreachable!()));
        assert!(approved.is_ok());
        let approved = approved.unwrap_or_else(|_| unreachable!());
        assert_eq!(approved.status(), ActionDraftStatus::Approved);
        assert_eq!(approved.entity().map(|entity| entity.entity_id()), Some("rfq-1"));

        let again = approved.reject("bob", Utc::now(), "too late");
        assert_eq!(
            again.err().map(|error| error.code()),
            Some("draft_already_decided")
        );
    }

    #[test]
    fn reject_requires_reason() {
        let draft = draft();
        let rejected = draft.reject("alice", Utc::now(), "   ");
        assert_eq!(
            rejected.err().map(|error| error.code()),
            Some("rejection_reason_required")
        );
        assert_eq!(draft.status(), ActionDraftStatus::Drafted);
    }
}
