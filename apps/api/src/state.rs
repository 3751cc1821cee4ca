use tieline_application::ConnectionService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub connection_service: ConnectionService,
}
