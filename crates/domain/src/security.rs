use std::str::FromStr;

use procura_core::AppError;
use serde::{Deserialize, Serialize};

/// Permissions enforced by copilot policy checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Allows asking the AI service to plan single actions.
    AiActionsPlan,
    /// Allows approving or rejecting action drafts.
    AiActionsApprove,
    /// Allows rating action drafts.
    AiActionsFeedback,
    /// Required in addition for invoice and payment action types.
    AiActionsFinance,
    /// Allows starting, viewing and stepping copilot workflows.
    AiWorkflowsRun,
    /// Allows approving or rejecting workflow steps.
    AiWorkflowsApprove,
    /// Required in addition for financially sensitive workflow steps.
    AiWorkflowsApproveFinancial,
    /// Allows copilot chat conversations.
    AiChatUse,
    /// Allows reading copilot event history.
    AiEventsRead,
}

impl Permission {
    /// Returns a stable storage value for this permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AiActionsPlan => "ai.actions.plan",
            Self::AiActionsApprove => "ai.actions.approve",
            Self::AiActionsFeedback => "ai.actions.feedback",
            Self::AiActionsFinance => "ai.actions.finance",
            Self::AiWorkflowsRun => "ai.workflows.run",
            Self::AiWorkflowsApprove => "ai.workflows.approve",
            Self::AiWorkflowsApproveFinancial => "ai.workflows.approve_financial",
            Self::AiChatUse => "ai.chat.use",
            Self::AiEventsRead => "ai.events.read",
        }
    }

    /// Returns all known permissions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Permission] = &[
            Permission::AiActionsPlan,
            Permission::AiActionsApprove,
            Permission::AiActionsFeedback,
            Permission::AiActionsFinance,
            Permission::AiWorkflowsRun,
            Permission::AiWorkflowsApprove,
            Permission::AiWorkflowsApproveFinancial,
            Permission::AiChatUse,
            Permission::AiEventsRead,
        ];

        ALL
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|permission| permission.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown permission value '{value}'")))
    }
}

/// Company-level persona an actor is currently acting as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyRole {
    /// Company owner with every copilot capability.
    Owner,
    /// Buyer administrator.
    BuyerAdmin,
    /// Buyer who raises requests but does not approve them.
    BuyerRequester,
    /// Read-mostly buyer team member.
    BuyerMember,
    /// Finance user handling invoices and payments.
    Finance,
    /// Supplier-side administrator.
    SupplierAdmin,
    /// Supplier-side estimator.
    SupplierEstimator,
}

impl CompanyRole {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::BuyerAdmin => "buyer_admin",
            Self::BuyerRequester => "buyer_requester",
            Self::BuyerMember => "buyer_member",
            Self::Finance => "finance",
            Self::SupplierAdmin => "supplier_admin",
            Self::SupplierEstimator => "supplier_estimator",
        }
    }

    /// Parses a persona key, returning `None` for unknown values.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "owner" => Some(Self::Owner),
            "buyer_admin" => Some(Self::BuyerAdmin),
            "buyer_requester" => Some(Self::BuyerRequester),
            "buyer_member" => Some(Self::BuyerMember),
            "finance" => Some(Self::Finance),
            "supplier_admin" => Some(Self::SupplierAdmin),
            "supplier_estimator" => Some(Self::SupplierEstimator),
            _ => None,
        }
    }

    /// Returns permissions every holder of this role receives.
    #[must_use]
    pub fn default_permissions(&self) -> &'static [Permission] {
        use Permission::*;

        match self {
            Self::Owner => Permission::all(),
            Self::BuyerAdmin => &[
                AiActionsPlan,
                AiActionsApprove,
                AiActionsFeedback,
                AiWorkflowsRun,
                AiWorkflowsApprove,
                AiChatUse,
                AiEventsRead,
            ],
            Self::BuyerRequester => &[AiActionsPlan, AiActionsFeedback, AiWorkflowsRun, AiChatUse],
            Self::BuyerMember => &[AiActionsFeedback, AiChatUse],
            Self::Finance => &[
                AiActionsPlan,
                AiActionsApprove,
                AiActionsFeedback,
                AiActionsFinance,
                AiWorkflowsRun,
                AiWorkflowsApprove,
                AiWorkflowsApproveFinancial,
                AiChatUse,
            ],
            Self::SupplierAdmin => &[AiActionsFeedback, AiChatUse],
            Self::SupplierEstimator => &[AiActionsFeedback],
        }
    }
}

/// Stable audit actions emitted outside the copilot event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted for every entitlement resolution regardless of outcome.
    EntitlementChecked,
    /// Emitted when the permission gate denies a copilot operation.
    CopilotAccessDenied,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EntitlementChecked => "entitlement.checked",
            Self::CopilotAccessDenied => "copilot.access.denied",
        }
    }
}
