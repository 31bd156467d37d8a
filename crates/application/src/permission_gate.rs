use std::collections::HashSet;
use std::sync::Arc;

use procura_core::{ActorContext, AppError, AppResult, TenantId};
use procura_domain::{
    ActionType, AuditAction, CompanyRole, Permission, Workflow, WorkflowStep, WorkflowType,
};
use tracing::warn;

use crate::{AuditEvent, AuditRepository, AuthorizationRepository};

/// Default-deny permission predicates for copilot operations.
///
/// Effective permissions are the active persona's defaults unioned with explicit
/// grants. Platform administrators pass every predicate. Missing company context,
/// cross-company targets and repository failures all deny.
#[derive(Clone)]
pub struct PermissionGate {
    repository: Arc<dyn AuthorizationRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl PermissionGate {
    /// Creates a gate from its permission and audit sources.
    #[must_use]
    pub fn new(
        repository: Arc<dyn AuthorizationRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            repository,
            audit_repository,
        }
    }

    /// Returns whether the actor may plan `action_type`.
    pub async fn can_plan(&self, actor: &ActorContext, action_type: ActionType) -> bool {
        self.action_permitted(actor, Permission::AiActionsPlan, action_type)
            .await
    }

    /// Returns whether the actor may approve or reject drafts of `action_type`.
    pub async fn can_approve(&self, actor: &ActorContext, action_type: ActionType) -> bool {
        self.action_permitted(actor, Permission::AiActionsApprove, action_type)
            .await
    }

    /// Returns whether the actor may rate drafts. Independent of approval rights.
    pub async fn can_feedback(&self, actor: &ActorContext, _action_type: ActionType) -> bool {
        self.holds_all(actor, actor.company_id(), &[Permission::AiActionsFeedback])
            .await
    }

    /// Returns whether the actor may read drafts.
    pub async fn can_read_drafts(&self, actor: &ActorContext) -> bool {
        let company_id = actor.company_id();
        self.holds_all(actor, company_id, &[Permission::AiActionsPlan])
            .await
            || self
                .holds_all(actor, company_id, &[Permission::AiActionsApprove])
                .await
    }

    /// Returns whether the actor may start a workflow of `workflow_type`.
    pub async fn can_start_workflow(
        &self,
        actor: &ActorContext,
        workflow_type: WorkflowType,
    ) -> bool {
        let mut required = vec![Permission::AiWorkflowsRun];
        if workflow_type.is_financial() {
            required.push(Permission::AiActionsFinance);
        }

        self.holds_all(actor, actor.company_id(), &required).await
    }

    /// Returns whether the actor may list workflows of the active company.
    pub async fn can_list_workflows(&self, actor: &ActorContext) -> bool {
        self.holds_all(actor, actor.company_id(), &[Permission::AiWorkflowsRun])
            .await
    }

    /// Returns whether the actor may view and step `workflow`.
    pub async fn can_access_workflow(&self, actor: &ActorContext, workflow: &Workflow) -> bool {
        self.holds_all(
            actor,
            Some(workflow.tenant_id()),
            &[Permission::AiWorkflowsRun],
        )
        .await
    }

    /// Returns whether the actor may decide `step` of `workflow`.
    ///
    /// Financial steps additionally require `ai.workflows.approve_financial`.
    pub async fn can_approve_workflow_step(
        &self,
        actor: &ActorContext,
        workflow: &Workflow,
        step: &WorkflowStep,
    ) -> bool {
        let mut required = vec![Permission::AiWorkflowsRun, Permission::AiWorkflowsApprove];
        if step.is_financial() {
            required.push(Permission::AiWorkflowsApproveFinancial);
        }

        self.holds_all(actor, Some(workflow.tenant_id()), &required)
            .await
    }

    /// Returns whether the actor may cancel `workflow`.
    pub async fn can_cancel_workflow(&self, actor: &ActorContext, workflow: &Workflow) -> bool {
        self.holds_all(
            actor,
            Some(workflow.tenant_id()),
            &[Permission::AiWorkflowsRun, Permission::AiWorkflowsApprove],
        )
        .await
    }

    /// Returns whether the actor may chat.
    pub async fn can_use_chat(&self, actor: &ActorContext) -> bool {
        self.holds_all(actor, actor.company_id(), &[Permission::AiChatUse])
            .await
    }

    /// Returns whether the actor may read events of `tenant_id`, or of every
    /// company when `None`.
    pub async fn can_read_events(&self, actor: &ActorContext, tenant_id: Option<TenantId>) -> bool {
        if actor.is_platform_admin() {
            return true;
        }

        match tenant_id {
            Some(tenant_id) => {
                self.holds_all(actor, Some(tenant_id), &[Permission::AiEventsRead])
                    .await
            }
            None => false,
        }
    }

    /// Fails with `ai_action_forbidden` unless [`Self::can_plan`] holds.
    pub async fn require_plan(&self, actor: &ActorContext, action_type: ActionType) -> AppResult<()> {
        let allowed = self.can_plan(actor, action_type).await;
        self.enforce(
            allowed,
            actor,
            "ai_action_forbidden",
            "action_type",
            action_type.as_str(),
        )
        .await
    }

    /// Fails with `ai_action_approval_forbidden` unless [`Self::can_approve`] holds.
    pub async fn require_approve(
        &self,
        actor: &ActorContext,
        action_type: ActionType,
    ) -> AppResult<()> {
        let allowed = self.can_approve(actor, action_type).await;
        self.enforce(
            allowed,
            actor,
            "ai_action_approval_forbidden",
            "action_type",
            action_type.as_str(),
        )
        .await
    }

    /// Fails with `ai_feedback_forbidden` unless [`Self::can_feedback`] holds.
    pub async fn require_feedback(
        &self,
        actor: &ActorContext,
        action_type: ActionType,
    ) -> AppResult<()> {
        let allowed = self.can_feedback(actor, action_type).await;
        self.enforce(
            allowed,
            actor,
            "ai_feedback_forbidden",
            "action_type",
            action_type.as_str(),
        )
        .await
    }

    /// Fails with `ai_action_forbidden` unless [`Self::can_read_drafts`] holds.
    pub async fn require_read_drafts(&self, actor: &ActorContext) -> AppResult<()> {
        let allowed = self.can_read_drafts(actor).await;
        self.enforce(allowed, actor, "ai_action_forbidden", "action_draft", "*")
            .await
    }

    /// Fails with `workflow_forbidden` unless [`Self::can_start_workflow`] holds.
    pub async fn require_start_workflow(
        &self,
        actor: &ActorContext,
        workflow_type: WorkflowType,
    ) -> AppResult<()> {
        let allowed = self.can_start_workflow(actor, workflow_type).await;
        self.enforce(
            allowed,
            actor,
            "workflow_forbidden",
            "workflow_type",
            workflow_type.as_str(),
        )
        .await
    }

    /// Fails with `workflow_forbidden` unless [`Self::can_list_workflows`] holds.
    pub async fn require_list_workflows(&self, actor: &ActorContext) -> AppResult<()> {
        let allowed = self.can_list_workflows(actor).await;
        self.enforce(allowed, actor, "workflow_forbidden", "copilot_workflow", "*")
            .await
    }

    /// Fails with `workflow_forbidden` unless [`Self::can_access_workflow`] holds.
    pub async fn require_access_workflow(
        &self,
        actor: &ActorContext,
        workflow: &Workflow,
    ) -> AppResult<()> {
        let allowed = self.can_access_workflow(actor, workflow).await;
        self.enforce(
            allowed,
            actor,
            "workflow_forbidden",
            "copilot_workflow",
            workflow.workflow_id().as_str(),
        )
        .await
    }

    /// Fails with `workflow_approval_forbidden` unless
    /// [`Self::can_approve_workflow_step`] holds.
    pub async fn require_approve_workflow_step(
        &self,
        actor: &ActorContext,
        workflow: &Workflow,
        step: &WorkflowStep,
    ) -> AppResult<()> {
        let allowed = self.can_approve_workflow_step(actor, workflow, step).await;
        let resource_id = format!("{}#{}", workflow.workflow_id(), step.step_index());
        self.enforce(
            allowed,
            actor,
            "workflow_approval_forbidden",
            "copilot_workflow_step",
            resource_id.as_str(),
        )
        .await
    }

    /// Fails with `workflow_approval_forbidden` unless [`Self::can_cancel_workflow`] holds.
    pub async fn require_cancel_workflow(
        &self,
        actor: &ActorContext,
        workflow: &Workflow,
    ) -> AppResult<()> {
        let allowed = self.can_cancel_workflow(actor, workflow).await;
        self.enforce(
            allowed,
            actor,
            "workflow_approval_forbidden",
            "copilot_workflow",
            workflow.workflow_id().as_str(),
        )
        .await
    }

    /// Fails with `ai_chat_forbidden` unless [`Self::can_use_chat`] holds.
    pub async fn require_chat(&self, actor: &ActorContext) -> AppResult<()> {
        let allowed = self.can_use_chat(actor).await;
        self.enforce(allowed, actor, "ai_chat_forbidden", "chat_thread", "*")
            .await
    }

    /// Fails with `ai_events_forbidden` unless [`Self::can_read_events`] holds.
    pub async fn require_read_events(
        &self,
        actor: &ActorContext,
        tenant_id: Option<TenantId>,
    ) -> AppResult<()> {
        let allowed = self.can_read_events(actor, tenant_id).await;
        self.enforce(allowed, actor, "ai_events_forbidden", "copilot_event", "*")
            .await
    }

    async fn action_permitted(
        &self,
        actor: &ActorContext,
        permission: Permission,
        action_type: ActionType,
    ) -> bool {
        let mut required = vec![permission];
        if action_type.is_financial() {
            required.push(Permission::AiActionsFinance);
        }

        self.holds_all(actor, actor.company_id(), &required).await
    }

    async fn holds_all(
        &self,
        actor: &ActorContext,
        target_company: Option<TenantId>,
        required: &[Permission],
    ) -> bool {
        if actor.is_platform_admin() {
            return true;
        }

        let (Some(company_id), Some(target_company)) = (actor.company_id(), target_company) else {
            return false;
        };
        if company_id != target_company {
            return false;
        }

        match self.effective_permissions(actor, company_id).await {
            Ok(permissions) => required
                .iter()
                .all(|permission| permissions.contains(permission)),
            Err(error) => {
                warn!(
                    subject = actor.subject(),
                    tenant_id = %company_id,
                    error = %error,
                    "permission lookup failed, denying"
                );
                false
            }
        }
    }

    async fn effective_permissions(
        &self,
        actor: &ActorContext,
        tenant_id: TenantId,
    ) -> AppResult<HashSet<Permission>> {
        let mut permissions: HashSet<Permission> = actor
            .persona()
            .and_then(CompanyRole::parse)
            .map(|role| role.default_permissions().iter().copied().collect())
            .unwrap_or_default();

        permissions.extend(
            self.repository
                .list_permissions_for_subject(tenant_id, actor.subject())
                .await?,
        );

        Ok(permissions)
    }

    async fn enforce(
        &self,
        allowed: bool,
        actor: &ActorContext,
        code: &'static str,
        resource_type: &str,
        resource_id: &str,
    ) -> AppResult<()> {
        if allowed {
            return Ok(());
        }

        if let Some(tenant_id) = actor.company_id() {
            let audit = self
                .audit_repository
                .append_event(AuditEvent {
                    tenant_id,
                    subject: actor.subject().to_owned(),
                    action: AuditAction::CopilotAccessDenied,
                    resource_type: resource_type.to_owned(),
                    resource_id: resource_id.to_owned(),
                    detail: Some(format!(
                        "denied with code '{code}' for persona '{}'",
                        actor.persona().unwrap_or("none")
                    )),
                })
                .await;
            if let Err(error) = audit {
                warn!(error = %error, code, "failed to audit copilot denial");
            }
        }

        Err(AppError::Forbidden(format!(
            "subject '{}' is not allowed to perform this copilot operation on {resource_type} '{resource_id}'",
            actor.subject()
        ))
        .with_code(code))
    }
}
