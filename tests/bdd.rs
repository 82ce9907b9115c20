use std::fmt;

use anyhow::Context;
use cucumber::{given, then, when, World as _};
use mileage::{
    models::trip::{CostUpdate, DistanceSource, Ticket, Trip, TripSubmission, TripType},
    services::{distance::DistanceResolver, ledger::TripStore},
};
use tempfile::TempDir;

const EPS: f64 = 1e-9;

#[derive(Debug, cucumber::World, Default)]
struct AppWorld {
    state: Option<TestState>,
    last_error: Option<String>,
    amend_found: Option<bool>,
    ledger_snapshot: Option<Vec<u8>>,
}

impl AppWorld {
    fn store(&self) -> &TripStore {
        &self
            .state
            .as_ref()
            .expect("state must be initialised first")
            .store
    }

    async fn trips(&self) -> Vec<Trip> {
        self.store().load().await.expect("load trips")
    }

    async fn latest_trip(&self) -> Trip {
        self.trips()
            .await
            .pop()
            .expect("at least one trip expected")
    }
}

struct TestState {
    store: TripStore,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        let store = TripStore::new(root.path().join("data"));
        store.ensure_structure().await?;
        Ok(Self { store, _root: root })
    }
}

#[given("a fresh trip ledger")]
async fn given_fresh_ledger(world: &mut AppWorld) {
    world.state = Some(TestState::new().await.expect("state"));
    world.last_error = None;
    world.amend_found = None;
    world.ledger_snapshot = None;
}

#[given("the ledger file contains invalid JSON")]
async fn given_corrupt_ledger(world: &mut AppWorld) {
    tokio::fs::write(world.store().trips_path(), b"{ this is not json")
        .await
        .expect("write corrupt trips file");
}

#[given(
    regex = r#"^a recorded (one_way|round_trip) trip from "([^"]*)" to "([^"]*)" with ([-\d.]+) manual miles, ([-\d.]+) extra miles and rate ([\d.]+)$"#
)]
async fn given_recorded_trip(
    world: &mut AppWorld,
    trip_type: String,
    start: String,
    end: String,
    manual_miles: f64,
    extra_miles: f64,
    rate: f64,
) {
    record_trip(world, trip_type, start, end, manual_miles, extra_miles, rate).await;
}

#[when(
    regex = r#"^I record a (one_way|round_trip) trip from "([^"]*)" to "([^"]*)" with ([-\d.]+) manual miles, ([-\d.]+) extra miles and rate ([\d.]+)$"#
)]
async fn when_record_trip(
    world: &mut AppWorld,
    trip_type: String,
    start: String,
    end: String,
    manual_miles: f64,
    extra_miles: f64,
    rate: f64,
) {
    record_trip(world, trip_type, start, end, manual_miles, extra_miles, rate).await;
}

async fn record_trip(
    world: &mut AppWorld,
    trip_type: String,
    start: String,
    end: String,
    manual_miles: f64,
    extra_miles: f64,
    rate: f64,
) {
    let submission = TripSubmission {
        trip_type: if trip_type == "round_trip" {
            TripType::RoundTrip
        } else {
            TripType::OneWay
        },
        start_address: start,
        end_address: end,
        manual_one_way_miles: manual_miles,
        manual_stop_miles: extra_miles,
        ..TripSubmission::default()
    };

    // No routing backend configured: the manual path, same as production
    // without an ORS key.
    let resolver = DistanceResolver::new(None);
    let resolved = resolver
        .resolve(
            &submission.start_address,
            &submission.stops,
            &submission.end_address,
            submission.manual_one_way_miles,
            submission.manual_stop_miles,
        )
        .await;

    match submission.validate(resolved.one_way_miles) {
        Ok(()) => {
            let trip = Trip::from_submission(submission, resolved, rate);
            world.store().append(trip).await.expect("append trip");
            world.last_error = None;
        }
        Err(err) => world.last_error = Some(err.to_string()),
    }
}

#[then(regex = r#"^the submission is rejected with "([^"]+)"$"#)]
async fn then_rejected(world: &mut AppWorld, message: String) {
    let error = world
        .last_error
        .as_ref()
        .expect("a rejection was expected");
    assert!(
        error.contains(&message),
        "expected rejection containing {message:?}, got {error:?}"
    );
}

#[then(regex = r"^the ledger has (\d+) stored trips?$")]
async fn then_ledger_count(world: &mut AppWorld, expected: usize) {
    assert_eq!(world.trips().await.len(), expected);
}

#[then(
    regex = r"^the latest trip has one-way miles ([\d.]+), total miles ([\d.]+) and reimbursement ([\d.]+)$"
)]
async fn then_latest_amounts(world: &mut AppWorld, one_way: f64, total: f64, reimbursement: f64) {
    let trip = world.latest_trip().await;
    assert!((trip.one_way_miles - one_way).abs() < EPS, "one-way miles");
    assert!((trip.total_miles - total).abs() < EPS, "total miles");
    assert!(
        (trip.reimbursement - reimbursement).abs() < EPS,
        "reimbursement"
    );
}

#[then(regex = r#"^the latest trip's distance source is "manual" with no recorded legs$"#)]
async fn then_latest_manual(world: &mut AppWorld) {
    let trip = world.latest_trip().await;
    assert_eq!(trip.distance_source, DistanceSource::Manual);
    assert!(trip.distance_legs.is_empty());
}

#[then(regex = r#"^the first stored trip still runs from "([^"]*)" to "([^"]*)"$"#)]
async fn then_first_trip_intact(world: &mut AppWorld, start: String, end: String) {
    let trips = world.trips().await;
    let first = trips.first().expect("a first trip expected");
    assert_eq!(first.start_address, start);
    assert_eq!(first.end_address, end);
}

#[when(regex = r"^I amend the latest trip with gas ([\d.]+), food ([\d.]+) and tolls ([\d.]+)$")]
async fn when_amend_latest(world: &mut AppWorld, gas: f64, food: f64, tolls: f64) {
    let trip_id = world.latest_trip().await.id;
    amend(world, &trip_id, gas, food, tolls, None).await;
}

#[when(
    regex = r#"^I amend the latest trip with gas ([\d.]+), food ([\d.]+), tolls ([\d.]+) and ticket number "([^"]+)"$"#
)]
async fn when_amend_latest_with_ticket(
    world: &mut AppWorld,
    gas: f64,
    food: f64,
    tolls: f64,
    ticket_number: String,
) {
    let trip_id = world.latest_trip().await.id;
    let ticket = Ticket::from_fields("", "", "", "", &ticket_number);
    assert!(ticket.is_some(), "a ticket number must produce a ticket");
    amend(world, &trip_id, gas, food, tolls, ticket).await;
}

#[when(regex = r#"^I amend trip "([^"]+)" with gas ([\d.]+), food ([\d.]+) and tolls ([\d.]+)$"#)]
async fn when_amend_by_id(world: &mut AppWorld, trip_id: String, gas: f64, food: f64, tolls: f64) {
    world.ledger_snapshot = Some(
        tokio::fs::read(world.store().trips_path())
            .await
            .expect("snapshot trips file"),
    );
    amend(world, &trip_id, gas, food, tolls, None).await;
}

async fn amend(
    world: &mut AppWorld,
    trip_id: &str,
    gas: f64,
    food: f64,
    tolls: f64,
    ticket: Option<Ticket>,
) {
    let update = CostUpdate {
        gas,
        food,
        tolls,
        ticket,
    };
    let found = world
        .store()
        .amend_costs(trip_id, update)
        .await
        .expect("amend costs");
    world.amend_found = Some(found);
}

#[then("the amendment is reported as found")]
async fn then_amend_found(world: &mut AppWorld) {
    assert_eq!(world.amend_found, Some(true));
}

#[then("the amendment is reported as not found")]
async fn then_amend_not_found(world: &mut AppWorld) {
    assert_eq!(world.amend_found, Some(false));
}

#[then("the ledger file is byte-for-byte unchanged")]
async fn then_ledger_unchanged(world: &mut AppWorld) {
    let snapshot = world
        .ledger_snapshot
        .as_ref()
        .expect("a snapshot must be taken before this assertion");
    let current = tokio::fs::read(world.store().trips_path())
        .await
        .expect("read trips file");
    assert_eq!(snapshot, &current);
}

#[then(regex = r"^the latest trip has gas ([\d.]+), food ([\d.]+) and tolls ([\d.]+)$")]
async fn then_latest_costs(world: &mut AppWorld, gas: f64, food: f64, tolls: f64) {
    let trip = world.latest_trip().await;
    assert!((trip.costs.gas - gas).abs() < EPS, "gas");
    assert!((trip.costs.food - food).abs() < EPS, "food");
    assert!((trip.costs.tolls - tolls).abs() < EPS, "tolls");
}

#[then(regex = r"^the latest trip has (\d+) tickets?$")]
async fn then_latest_ticket_count(world: &mut AppWorld, expected: usize) {
    assert_eq!(world.latest_trip().await.costs.tickets.len(), expected);
}

#[tokio::main]
async fn main() {
    AppWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
