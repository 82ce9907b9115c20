use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::fs;
use tracing::warn;

use crate::{
    error::AppError,
    models::trip::{CostUpdate, Trip},
};

const TRIPS_FILE: &str = "trips.json";

/// File-backed trip ledger. The JSON document under the data directory is
/// the entire durable state; every write rewrites it in full. Storage order
/// is append order; newest-first sorting happens at presentation time.
#[derive(Clone)]
pub struct TripStore {
    root: Arc<PathBuf>,
}

impl TripStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn trips_path(&self) -> PathBuf {
        self.root().join(TRIPS_FILE)
    }

    pub async fn ensure_structure(&self) -> Result<(), AppError> {
        fs::create_dir_all(self.root()).await?;
        Ok(())
    }

    /// Reads the full collection. A missing or empty file is an empty
    /// ledger; an unparseable one is treated the same way (recording must
    /// stay available), with a warning so an operator can intervene.
    pub async fn load(&self) -> Result<Vec<Trip>, AppError> {
        let path = self.trips_path();
        if !fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }
        let raw = fs::read(&path).await?;
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_slice(&raw) {
            Ok(trips) => Ok(trips),
            Err(err) => {
                warn!(path = %path.display(), "trips file is unparseable, treating as empty: {err}");
                Ok(Vec::new())
            }
        }
    }

    pub async fn save(&self, trips: &[Trip]) -> Result<(), AppError> {
        self.ensure_structure().await?;
        let data = serde_json::to_vec_pretty(trips).map_err(|err| AppError::Other(err.into()))?;
        fs::write(self.trips_path(), data).await?;
        Ok(())
    }

    pub async fn append(&self, trip: Trip) -> Result<Trip, AppError> {
        let mut trips = self.load().await?;
        trips.push(trip.clone());
        self.save(&trips).await?;
        Ok(trip)
    }

    /// Amends the cost sub-record of the trip with the given id.
    ///
    /// Gas/food/tolls are replaced outright (repeat amendments are not
    /// additive); a ticket in the update is appended to the trip's ticket
    /// list. Returns whether a trip matched; on a miss nothing is written.
    pub async fn amend_costs(&self, trip_id: &str, update: CostUpdate) -> Result<bool, AppError> {
        let mut trips = self.load().await?;
        let Some(trip) = trips.iter_mut().find(|trip| trip.id == trip_id) else {
            return Ok(false);
        };

        trip.costs.gas = update.gas;
        trip.costs.food = update.food;
        trip.costs.tolls = update.tolls;
        if let Some(ticket) = update.ticket {
            trip.costs.tickets.push(ticket);
        }

        self.save(&trips).await?;
        Ok(true)
    }
}
