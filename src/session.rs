//! The top-level session: explicitly constructed, explicitly owned state
//! (no process-wide singleton). One producer feeds raw captures through
//! [`Session::process`]; any number of consumer threads poll frames out
//! of the history concurrently.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use log::{debug, info};

use crate::config::ConfigStore;
use crate::frame::{Frame, FrameData};
use crate::gestures::{Gesture, GestureType, RecognizerBank};
use crate::history::{EntityIds, FrameHistory, IdentityMatcher, NearestNeighborMatcher};

/// Optional-behavior bitmask. Requested flags take effect only once the
/// external service grants them; a request may never be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolicyFlags(pub u32);

impl PolicyFlags {
    pub const DEFAULT: PolicyFlags = PolicyFlags(0);
    pub const BACKGROUND_FRAMES: PolicyFlags = PolicyFlags(1 << 0);
    pub const IMAGES: PolicyFlags = PolicyFlags(1 << 1);
    pub const OPTIMIZE_HMD: PolicyFlags = PolicyFlags(1 << 2);

    pub fn contains(self, other: PolicyFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Connection lifecycle notifications from the external service layer.
/// They may arrive in any order relative to frame delivery; each is an
/// idempotent state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Init,
    Connect,
    Disconnect,
    Exit,
    FocusGained,
    FocusLost,
    ServiceConnect,
    ServiceDisconnect,
    DeviceChange,
}

pub struct Session {
    config: Mutex<ConfigStore>,
    history: RwLock<FrameHistory>,
    bank: Mutex<RecognizerBank>,
    matcher: Mutex<Box<dyn IdentityMatcher>>,
    entity_ids: Mutex<EntityIds>,
    next_frame_id: AtomicI64,
    requested_policy: AtomicU32,
    granted_policy: AtomicU32,
    connected: AtomicBool,
    service_connected: AtomicBool,
    focused: AtomicBool,
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(ConfigStore::new())
    }

    pub fn with_config(config: ConfigStore) -> Self {
        let bank = RecognizerBank::new(config.gesture_config());
        Self {
            config: Mutex::new(config),
            history: RwLock::new(FrameHistory::new()),
            bank: Mutex::new(bank),
            matcher: Mutex::new(Box::new(NearestNeighborMatcher::default())),
            entity_ids: Mutex::new(EntityIds::default()),
            next_frame_id: AtomicI64::new(0),
            requested_policy: AtomicU32::new(0),
            granted_policy: AtomicU32::new(0),
            connected: AtomicBool::new(false),
            service_connected: AtomicBool::new(false),
            focused: AtomicBool::new(false),
        }
    }

    /// Swap the identity-continuity heuristic.
    pub fn set_matcher(&self, matcher: Box<dyn IdentityMatcher>) {
        *self.matcher.lock().unwrap() = matcher;
    }

    // --- producer side -------------------------------------------------

    /// Ingest one completed capture: repair entity identities against the
    /// previous frame, run the enabled recognizers, publish to history.
    /// Called by the single capture producer, in frame order.
    pub fn process(&self, data: FrameData) -> Arc<Frame> {
        let previous = {
            let history = self.history.read().unwrap();
            (!history.is_empty()).then(|| history.newest())
        };

        let mut hands = data.hands;
        {
            let matcher = self.matcher.lock().unwrap();
            let mut ids = self.entity_ids.lock().unwrap();
            matcher.assign(previous.as_deref(), data.timestamp, &mut hands, &mut ids);
        }

        let mut frame = Frame {
            id: self.next_frame_id.fetch_add(1, Ordering::Relaxed),
            timestamp: data.timestamp,
            current_frames_per_second: data.frames_per_second,
            hands,
            gestures: Vec::new(),
        };
        frame.gestures = self.bank.lock().unwrap().ingest(&frame);
        if !frame.gestures.is_empty() {
            debug!(
                "frame {}: {} gesture snapshot(s)",
                frame.id,
                frame.gestures.len()
            );
        }

        let frame = Arc::new(frame);
        self.history.write().unwrap().insert(frame.clone());
        frame
    }

    // --- consumer side (concurrent reads) ------------------------------

    /// The most recent completed frame, or the invalid sentinel before the
    /// first capture.
    pub fn frame(&self) -> Arc<Frame> {
        self.frame_at(0)
    }

    /// The frame `offset` steps into the past (0 = newest).
    pub fn frame_at(&self, offset: usize) -> Arc<Frame> {
        self.history.read().unwrap().frame(offset)
    }

    /// Gesture snapshots from all retained frames newer than `since`,
    /// oldest first. Best-effort for frames that did not come from this
    /// session's history (e.g. deserialized ones).
    pub fn gestures_since(&self, since: &Frame) -> Vec<Gesture> {
        self.history
            .read()
            .unwrap()
            .newer_than(since.id)
            .iter()
            .flat_map(|f| f.gestures.iter().cloned())
            .collect()
    }

    // --- gestures & configuration --------------------------------------

    pub fn enable_gesture(&self, ty: GestureType, enabled: bool) {
        self.bank.lock().unwrap().set_enabled(ty, enabled);
    }

    pub fn is_gesture_enabled(&self, ty: GestureType) -> bool {
        self.bank.lock().unwrap().is_enabled(ty)
    }

    /// The typed key/value settings. Threshold edits take effect on the
    /// recognizers after [`apply_gesture_config`](Self::apply_gesture_config).
    pub fn config(&self) -> MutexGuard<'_, ConfigStore> {
        self.config.lock().unwrap()
    }

    /// Push the store's current thresholds into the recognizer bank.
    pub fn apply_gesture_config(&self) {
        let cfg = self.config.lock().unwrap().gesture_config();
        self.bank.lock().unwrap().set_config(cfg);
    }

    // --- policy flags ---------------------------------------------------

    /// Request optional behaviors; the request stays pending until the
    /// external side grants it (which may never happen).
    pub fn set_policy(&self, flags: PolicyFlags) {
        self.requested_policy.fetch_or(flags.0, Ordering::Relaxed);
        info!("policy requested: {:#x}", flags.0);
    }

    pub fn clear_policy(&self, flags: PolicyFlags) {
        self.requested_policy.fetch_and(!flags.0, Ordering::Relaxed);
        self.granted_policy.fetch_and(!flags.0, Ordering::Relaxed);
    }

    /// Whether the external side has granted every bit in `flags`.
    pub fn is_policy_set(&self, flags: PolicyFlags) -> bool {
        PolicyFlags(self.granted_policy.load(Ordering::Relaxed)).contains(flags)
    }

    /// External-approval path: grants whatever subset of `flags` is
    /// currently requested.
    pub fn grant_policy(&self, flags: PolicyFlags) {
        let requested = self.requested_policy.load(Ordering::Relaxed);
        self.granted_policy
            .fetch_or(flags.0 & requested, Ordering::Relaxed);
    }

    pub fn policy_flags(&self) -> PolicyFlags {
        PolicyFlags(self.granted_policy.load(Ordering::Relaxed))
    }

    // --- lifecycle ------------------------------------------------------

    pub fn dispatch(&self, event: SessionEvent) {
        debug!("session event: {event:?}");
        match event {
            SessionEvent::Init => {}
            SessionEvent::Connect => self.connected.store(true, Ordering::Relaxed),
            SessionEvent::Disconnect => self.connected.store(false, Ordering::Relaxed),
            SessionEvent::Exit => {
                self.connected.store(false, Ordering::Relaxed);
                self.service_connected.store(false, Ordering::Relaxed);
                self.focused.store(false, Ordering::Relaxed);
            }
            SessionEvent::FocusGained => self.focused.store(true, Ordering::Relaxed),
            SessionEvent::FocusLost => self.focused.store(false, Ordering::Relaxed),
            SessionEvent::ServiceConnect => self.service_connected.store(true, Ordering::Relaxed),
            SessionEvent::ServiceDisconnect => {
                self.service_connected.store(false, Ordering::Relaxed)
            }
            SessionEvent::DeviceChange => info!("device change notified"),
        }
        let live = self.connected.load(Ordering::Relaxed)
            || self.service_connected.load(Ordering::Relaxed);
        self.config.lock().unwrap().set_connected(live);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn is_service_connected(&self) -> bool {
        self.service_connected.load(Ordering::Relaxed)
    }

    pub fn has_focus(&self) -> bool {
        self.focused.load(Ordering::Relaxed)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::keys;
    use crate::gestures::GestureState;
    use crate::synth;

    fn feed(session: &Session, frames: &[Frame]) {
        for f in frames {
            session.process(synth::data_from(f));
        }
    }

    #[test]
    fn frames_flow_through_with_stable_hand_ids() {
        let session = Session::new();
        feed(&session, &synth::circle_frames(20));
        let newest = session.frame();
        assert!(newest.is_valid());
        let older = session.frame_at(5);
        assert_eq!(older.id, newest.id - 5);
        assert_eq!(newest.hands[0].id, older.hands[0].id);
    }

    #[test]
    fn history_window_is_bounded_through_the_session() {
        let session = Session::new();
        feed(&session, &synth::static_frames(100));
        assert_eq!(session.frame().id, 99);
        assert_eq!(session.frame_at(59).id, 40);
        assert!(!session.frame_at(60).is_valid());
    }

    #[test]
    fn end_to_end_circle_recognition() {
        let session = Session::new();
        session.config().set_float(keys::CIRCLE_MIN_ARC, 0.05);
        session.apply_gesture_config();
        session.enable_gesture(GestureType::Circle, true);
        assert!(session.is_gesture_enabled(GestureType::Circle));

        let frames = synth::circle_frames(40);
        let mut snapshots = Vec::new();
        for f in &frames {
            let published = session.process(synth::data_from(f));
            snapshots.extend(published.gestures.iter().cloned());
        }
        assert_eq!(
            snapshots.iter().filter(|g| g.state == GestureState::Start).count(),
            1
        );
        assert_eq!(
            snapshots.iter().filter(|g| g.state == GestureState::Stop).count(),
            1
        );

        // the same snapshots are reachable through gestures_since
        let replayed = session.gestures_since(Frame::invalid());
        assert_eq!(replayed.len(), snapshots.len());
    }

    #[test]
    fn disabled_gesture_type_stays_silent_end_to_end() {
        let session = Session::new();
        session.config().set_float(keys::CIRCLE_MIN_ARC, 0.05);
        session.apply_gesture_config();
        // circle never enabled
        feed(&session, &synth::circle_frames(40));
        assert!(session.gestures_since(Frame::invalid()).is_empty());
    }

    #[test]
    fn policy_requests_tolerate_never_being_granted() {
        let session = Session::new();
        session.set_policy(PolicyFlags::BACKGROUND_FRAMES);
        assert!(!session.is_policy_set(PolicyFlags::BACKGROUND_FRAMES));
        // grants apply only to requested bits
        session.grant_policy(PolicyFlags::IMAGES);
        assert!(!session.is_policy_set(PolicyFlags::IMAGES));
        session.grant_policy(PolicyFlags::BACKGROUND_FRAMES);
        assert!(session.is_policy_set(PolicyFlags::BACKGROUND_FRAMES));
        session.clear_policy(PolicyFlags::BACKGROUND_FRAMES);
        assert!(!session.is_policy_set(PolicyFlags::BACKGROUND_FRAMES));
    }

    #[test]
    fn lifecycle_events_are_order_tolerant() {
        let session = Session::new();
        // a disconnect before any connect must not disturb ingestion
        session.dispatch(SessionEvent::Disconnect);
        feed(&session, &synth::static_frames(3));
        assert!(session.frame().is_valid());

        session.dispatch(SessionEvent::ServiceConnect);
        assert!(session.config().save());
        session.dispatch(SessionEvent::FocusGained);
        assert!(session.has_focus());
        session.dispatch(SessionEvent::Exit);
        assert!(!session.has_focus());
        assert!(!session.config().save());
    }

    #[test]
    fn concurrent_polling_while_producing() {
        let session = Arc::new(Session::new());
        let reader = {
            let session = session.clone();
            std::thread::spawn(move || {
                let mut last_seen = -1;
                for _ in 0..200 {
                    let f = session.frame();
                    if f.is_valid() {
                        // IDs only ever move forward; gaps are legal
                        assert!(f.id >= last_seen);
                        last_seen = f.id;
                    }
                }
            })
        };
        feed(&session, &synth::static_frames(100));
        reader.join().unwrap();
    }
}
