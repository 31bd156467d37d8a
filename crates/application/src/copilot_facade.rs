use std::sync::Arc;
use std::time::Duration;

use procura_core::AppResult;

use crate::{
    ActionDraftRepository, ActionDraftService, AuditRepository, AuthorizationRepository,
    ChatRepository, ChatService, ConversionRegistry, CopilotEventRepository, CopilotRateLimits,
    CopilotServiceClient, CopilotServiceContext, CopilotWorkflowRepository,
    DecisionLeaseCoordinator, EntitlementDefaults, EntitlementRepository, EntitlementService,
    EntityStore, EventQueryService, EventRecorder, PermissionGate, RateLimitRepository,
    RateLimitService, ToolResolver, WorkflowOrchestrationService, WorkspaceToolProvider,
};

/// Adapters the copilot engine runs on.
#[derive(Clone)]
pub struct CopilotPorts {
    /// Audit log.
    pub audit: Arc<dyn AuditRepository>,
    /// Explicit permission grants.
    pub authorization: Arc<dyn AuthorizationRepository>,
    /// Company overrides and plan entitlements.
    pub entitlements: Arc<dyn EntitlementRepository>,
    /// Rate limit attempts.
    pub rate_limits: Arc<dyn RateLimitRepository>,
    /// Draft and feedback storage.
    pub drafts: Arc<dyn ActionDraftRepository>,
    /// Workflow and step storage.
    pub workflows: Arc<dyn CopilotWorkflowRepository>,
    /// Event log storage.
    pub events: Arc<dyn CopilotEventRepository>,
    /// Chat storage.
    pub chats: Arc<dyn ChatRepository>,
    /// Destination of converted entities.
    pub entity_store: Arc<dyn EntityStore>,
    /// Read-only workspace search for chat tools.
    pub workspace_tools: Arc<dyn WorkspaceToolProvider>,
    /// Decision leases.
    pub leases: Arc<dyn DecisionLeaseCoordinator>,
    /// Remote AI service.
    pub ai_client: Arc<dyn CopilotServiceClient>,
}

/// Tunables for the copilot engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopilotSettings {
    /// Entitlement defaults when no override or plan decides.
    pub entitlement_defaults: EntitlementDefaults,
    /// Per-subsystem request budgets.
    pub rate_limits: CopilotRateLimits,
    /// Decision lease duration.
    pub lease_seconds: u32,
    /// Bound on one tool batch.
    pub tool_timeout: Duration,
}

/// Single entry point for actions, workflows, chat and event reads.
#[derive(Clone)]
pub struct CopilotFacade {
    actions: ActionDraftService,
    workflows: WorkflowOrchestrationService,
    chat: ChatService,
    events: EventQueryService,
}

impl CopilotFacade {
    /// Wires every copilot service. Fails when the converter registry is incomplete.
    pub fn new(ports: CopilotPorts, settings: CopilotSettings) -> AppResult<Self> {
        let gate = PermissionGate::new(ports.authorization, ports.audit.clone());
        let context = CopilotServiceContext {
            gate: gate.clone(),
            entitlements: EntitlementService::new(
                ports.entitlements,
                ports.audit,
                settings.entitlement_defaults,
            ),
            rate_limits: RateLimitService::new(ports.rate_limits),
            events: EventRecorder::new(ports.events.clone()),
            leases: ports.leases,
            ai_client: ports.ai_client,
            lease_seconds: settings.lease_seconds,
        };
        let conversions = ConversionRegistry::with_default_converters(ports.entity_store)?;

        Ok(Self {
            actions: ActionDraftService::new(
                context.clone(),
                ports.drafts,
                conversions,
                settings.rate_limits.actions,
            ),
            workflows: WorkflowOrchestrationService::new(
                context.clone(),
                ports.workflows,
                settings.rate_limits.workflows,
            ),
            chat: ChatService::new(
                context,
                ports.chats,
                ToolResolver::new(ports.workspace_tools, settings.tool_timeout),
                settings.rate_limits.chat,
            ),
            events: EventQueryService::new(gate, ports.events),
        })
    }

    /// Action draft lifecycle.
    #[must_use]
    pub fn actions(&self) -> &ActionDraftService {
        &self.actions
    }

    /// Workflow orchestration.
    #[must_use]
    pub fn workflows(&self) -> &WorkflowOrchestrationService {
        &self.workflows
    }

    /// Chat conversations.
    #[must_use]
    pub fn chat(&self) -> &ChatService {
        &self.chat
    }

    /// Event log reads.
    #[must_use]
    pub fn events(&self) -> &EventQueryService {
        &self.events
    }
}
