use procura_application::CopilotFacade;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub copilot: CopilotFacade,
    pub frontend_url: String,
}
