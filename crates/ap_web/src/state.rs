use ap_inference::AnalysisService;

use crate::auth::AuthState;

pub struct AppState {
    pub analysis: AnalysisService,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(analysis: AnalysisService, auth: AuthState) -> Self {
        Self { analysis, auth }
    }
}
