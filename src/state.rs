use crate::{
    config::AppConfig,
    services::{distance::DistanceResolver, ledger::TripStore, rates::RateService},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: TripStore,
    pub rates: RateService,
    pub resolver: DistanceResolver,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let store = TripStore::new(config.data_dir.clone());
        let rates = RateService::new(config.fallback_rate);
        let resolver = DistanceResolver::from_config(&config);
        Self {
            config,
            store,
            rates,
            resolver,
        }
    }
}
