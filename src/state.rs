use std::sync::Arc;

use crate::config::Config;
use crate::services::subscription::SubscriptionService;

#[derive(Clone)]
pub struct AppState {
    pub subscriptions: Arc<SubscriptionService>,
    pub config: Arc<Config>,
}
