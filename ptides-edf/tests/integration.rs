//! End-to-end tests driving the director through its public API only.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use ptides_edf::actor::{Actor, Actuator};
use ptides_edf::config::{DirectorConfig, SelectionPolicy};
use ptides_edf::demo::{self, DemoParams};
use ptides_edf::director::{Director, FireContext, Outcome};
use ptides_edf::error::FatalError;
use ptides_edf::event::{ActorId, Payload, PendingEvent};
use ptides_edf::platform::SimPlatform;
use ptides_edf::time::{SignedTime, Tag, Time};

type Actuations = Rc<RefCell<Vec<(Time, Payload)>>>;
type FireLog = Rc<RefCell<Vec<(ActorId, Tag)>>>;

struct RecordingMotor(Actuations);

impl Actuator for RecordingMotor {
    fn actuate(&mut self, at: Time, value: Payload) {
        self.0.borrow_mut().push((at, value));
    }
}

/// Records each fire and does nothing else.
struct Recorder(FireLog);

impl Actor<SimPlatform> for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn fire(&mut self, ctx: &mut FireContext<'_, SimPlatform>) -> Result<(), FatalError> {
        self.0.borrow_mut().push((ctx.actor(), ctx.tag()));
        Ok(())
    }
}

fn three_actors() -> DirectorConfig {
    DirectorConfig::default()
        .with_actor("a", 0, SignedTime::ZERO, 0)
        .with_actor("b", 0, SignedTime::ZERO, 0)
        .with_actor("c", 0, SignedTime::ZERO, 0)
}

// ── Sample control loop ───────────────────────────────────────────────────────

#[test]
fn demo_loop_actuates_once_per_period() {
    let config = demo::default_config().unwrap();
    let mut director = Director::new(SimPlatform::new(), &config).unwrap();
    let actuations: Actuations = Rc::default();
    let wiring = demo::install(
        &mut director,
        &DemoParams::default(),
        Box::new(RecordingMotor(Rc::clone(&actuations))),
    )
    .unwrap();

    let stats = demo::run_simulated(
        &mut director,
        &wiring,
        Time::from_millis(10),
        Time::from_millis(100),
    );

    // Eleven periods (0 ms ..= 100 ms): setpoint, filter and controller fire
    // once each, and the controller sees both inputs in one firing.
    assert_eq!(stats.fired, 33);
    assert_eq!(stats.groups_merged, 11);
    assert_eq!(stats.actuations, 10);
    assert_eq!(director.pending_actuations(), 1);

    let times: Vec<Time> = actuations.borrow().iter().map(|(at, _)| *at).collect();
    let expected: Vec<Time> = (0..10).map(|i| Time::from_millis(2 + 10 * i)).collect();
    assert_eq!(times, expected);

    director.check_invariants().unwrap();
}

// ── Configuration from disk ───────────────────────────────────────────────────

#[test]
fn scan_queue_config_from_file_fires_past_a_blocked_head() {
    let yaml = r#"
director:
  max_events: 8
  selection: scan_queue
actors:
  - name: late
    depth: 0
  - name: ready
    depth: 1
"#;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let config = DirectorConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.selection, SelectionPolicy::ScanQueue);
    assert_eq!(config.max_events, 8);

    let log: FireLog = Rc::default();
    let mut director = Director::new(SimPlatform::starting_at(Time::from_secs(2)), &config).unwrap();
    let late = director.actor_id("late").unwrap();
    let ready = director.actor_id("ready").unwrap();
    director.install_actor(late, Box::new(Recorder(Rc::clone(&log)))).unwrap();
    director.install_actor(ready, Box::new(Recorder(Rc::clone(&log)))).unwrap();

    director.post(PendingEvent::pure(late, Tag::new(Time::from_secs(5), 0)));
    director.post(PendingEvent::pure(ready, Tag::new(Time::from_secs(1), 0)).with_deadline(Time::from_secs(9)));

    assert_eq!(
        director.process_events(),
        Outcome::Suspended { wake_at: Time::from_secs(5) }
    );
    assert_eq!(*log.borrow(), vec![(ready, Tag::new(Time::from_secs(1), 0))]);

    director.platform().advance_to(Time::from_secs(5));
    assert_eq!(director.platform().take_expired_timer(), Some(Time::from_secs(5)));
    assert_eq!(director.on_timer_interrupt(), Outcome::Idle);
    assert_eq!(log.borrow().len(), 2);
    director.check_invariants().unwrap();
}

// ── Queue order ───────────────────────────────────────────────────────────────

#[test]
fn queue_orders_by_deadline_regardless_of_arrival() {
    let mut director = Director::new(SimPlatform::new(), &three_actors()).unwrap();
    let a = director.actor_id("a").unwrap();
    let b = director.actor_id("b").unwrap();
    let c = director.actor_id("c").unwrap();
    let at = Tag::new(Time::from_secs(10), 0);

    director.post(PendingEvent::pure(a, at).with_deadline(Time::from_secs(3)));
    director.post(PendingEvent::pure(b, at).with_deadline(Time::from_secs(1)));
    director.post(PendingEvent::pure(c, at).with_deadline(Time::from_secs(2)));

    let order: Vec<ActorId> = director.queued_events().iter().map(|e| e.actor).collect();
    assert_eq!(order, vec![b, c, a]);
    assert_eq!(director.free_len() + director.queued_len(), director.capacity());
}

// ── Fatal paths ───────────────────────────────────────────────────────────────

#[test]
#[should_panic(expected = "out of event memory: all 2 event slots are in use")]
fn posting_past_capacity_is_fatal() {
    let config = three_actors().with_max_events(2);
    let mut director = Director::new(SimPlatform::new(), &config).unwrap();
    let a = director.actor_id("a").unwrap();
    for s in 1..=3 {
        director.post(PendingEvent::pure(a, Tag::new(Time::from_secs(s), 0)));
    }
}
