use std::fmt::{Display, Formatter};
use std::str::FromStr;

use procura_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Kinds of records a copilot operation can produce or correlate with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Request for quotation.
    Rfq,
    /// Outbound message to a supplier.
    SupplierMessage,
    /// Analytical inventory what-if snapshot.
    InventoryScenarioSnapshot,
    /// Side-by-side quote comparison snapshot.
    QuoteComparison,
    /// Purchase order.
    PurchaseOrder,
    /// Goods receipt.
    Receipt,
    /// Non-conformance report raised for a rejected receipt line.
    NonConformance,
    /// Supplier invoice.
    Invoice,
    /// Approval decision recorded against an existing invoice.
    InvoiceApproval,
    /// Outgoing payment.
    Payment,
    /// Copilot action draft, used for event correlation.
    ActionDraft,
    /// Copilot workflow, used for event correlation.
    CopilotWorkflow,
    /// Copilot chat thread, used for event correlation.
    ChatThread,
}

impl EntityKind {
    /// Returns a stable storage value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rfq => "rfq",
            Self::SupplierMessage => "supplier_message",
            Self::InventoryScenarioSnapshot => "inventory_scenario_snapshot",
            Self::QuoteComparison => "quote_comparison",
            Self::PurchaseOrder => "purchase_order",
            Self::Receipt => "receipt",
            Self::NonConformance => "non_conformance",
            Self::Invoice => "invoice",
            Self::InvoiceApproval => "invoice_approval",
            Self::Payment => "payment",
            Self::ActionDraft => "action_draft",
            Self::CopilotWorkflow => "copilot_workflow",
            Self::ChatThread => "chat_thread",
        }
    }

    /// Returns all known kinds.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[EntityKind] = &[
            EntityKind::Rfq,
            EntityKind::SupplierMessage,
            EntityKind::InventoryScenarioSnapshot,
            EntityKind::QuoteComparison,
            EntityKind::PurchaseOrder,
            EntityKind::Receipt,
            EntityKind::NonConformance,
            EntityKind::Invoice,
            EntityKind::InvoiceApproval,
            EntityKind::Payment,
            EntityKind::ActionDraft,
            EntityKind::CopilotWorkflow,
            EntityKind::ChatThread,
        ];

        ALL
    }
}

impl FromStr for EntityKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown entity kind '{value}'")))
    }
}

/// Tagged reference to a persisted domain entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityReference {
    entity_kind: EntityKind,
    entity_id: String,
}

impl EntityReference {
    /// Creates a validated entity reference.
    pub fn new(entity_kind: EntityKind, entity_id: impl Into<String>) -> AppResult<Self> {
        let entity_id = entity_id.into();
        if entity_id.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "{} reference requires a non-empty id",
                entity_kind.as_str()
            )));
        }

        Ok(Self {
            entity_kind,
            entity_id,
        })
    }

    /// Returns the referenced kind.
    #[must_use]
    pub fn entity_kind(&self) -> EntityKind {
        self.entity_kind
    }

    /// Returns the referenced identifier.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        self.entity_id.as_str()
    }
}

impl Display for EntityReference {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}:{}", self.entity_kind.as_str(), self.entity_id)
    }
}
