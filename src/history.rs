//! Bounded frame-history cache and cross-frame identity continuity.
//!
//! The cache keeps the last [`HISTORY_DEPTH`] completed frames behind
//! `Arc`s, newest first. Consumers clone the `Arc` on read, so the
//! producer never waits on a slow consumer; skipped frames show up as
//! gaps in `Frame::id`.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::entity::Hand;
use crate::frame::Frame;

/// Number of most-recent frames retained for backward lookup.
pub const HISTORY_DEPTH: usize = 60;

pub struct FrameHistory {
    frames: VecDeque<Arc<Frame>>,
    invalid: Arc<Frame>,
}

impl FrameHistory {
    pub fn new() -> Self {
        Self {
            frames: VecDeque::with_capacity(HISTORY_DEPTH),
            invalid: Arc::new(Frame::default()),
        }
    }

    /// Publish a completed frame, evicting the oldest once full.
    pub fn insert(&mut self, frame: Arc<Frame>) {
        if self.frames.len() == HISTORY_DEPTH {
            self.frames.pop_back();
        }
        self.frames.push_front(frame);
    }

    /// The frame `offset` steps into the past (0 = newest); the invalid
    /// sentinel past the retained window.
    pub fn frame(&self, offset: usize) -> Arc<Frame> {
        self.frames
            .get(offset)
            .cloned()
            .unwrap_or_else(|| self.invalid.clone())
    }

    pub fn newest(&self) -> Arc<Frame> {
        self.frame(0)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// All retained frames newer than `frame_id`, oldest first.
    pub fn newer_than(&self, frame_id: i64) -> Vec<Arc<Frame>> {
        let mut out: Vec<Arc<Frame>> = self
            .frames
            .iter()
            .filter(|f| f.id > frame_id)
            .cloned()
            .collect();
        out.reverse();
        out
    }
}

impl Default for FrameHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Fresh-ID source for entities the matcher could not pair up. Hands and
/// pointables draw from one counter, keeping IDs unique within a frame.
#[derive(Debug, Default)]
pub struct EntityIds {
    next: i32,
}

impl EntityIds {
    pub fn next(&mut self) -> i32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Cross-frame identity continuity as a swappable strategy: rewrite the
/// raw entities' provisional IDs in place, reusing the previous frame's
/// IDs where a correspondence is found and drawing fresh ones otherwise.
///
/// This is a best-effort heuristic, not a guarantee: a failed match stays
/// silent and simply produces a new ID.
pub trait IdentityMatcher: Send {
    fn assign(
        &self,
        previous: Option<&Frame>,
        timestamp: i64,
        hands: &mut [Hand],
        ids: &mut EntityIds,
    );
}

/// Default matcher: nearest neighbor against the previous frame's
/// velocity-predicted positions, gated by a maximum jump distance.
///
/// Failure modes (documented, accepted): an entity occluded for even one
/// frame, or re-entering the sensed volume, is treated as new; two hands
/// crossing within the gate distance in one frame interval can swap IDs.
pub struct NearestNeighborMatcher {
    /// Maximum distance (mm) between prediction and observation for a
    /// match; anything farther is a new entity.
    pub max_jump: f32,
}

impl Default for NearestNeighborMatcher {
    fn default() -> Self {
        Self { max_jump: 80.0 }
    }
}

impl NearestNeighborMatcher {
    /// Greedy closest-pair assignment over the prediction/observation
    /// distance matrix, returning `(observed_idx, previous_idx)` pairs.
    fn pair(
        &self,
        predicted: &[(crate::math::Vector, usize)],
        observed: &[(crate::math::Vector, usize)],
    ) -> Vec<(usize, usize)> {
        let mut edges: Vec<(f32, usize, usize)> = Vec::new();
        for (obs_pos, obs_idx) in observed {
            for (pred_pos, prev_idx) in predicted {
                let d = obs_pos.distance_to(*pred_pos);
                if d <= self.max_jump {
                    edges.push((d, *obs_idx, *prev_idx));
                }
            }
        }
        edges.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut used_obs = Vec::new();
        let mut used_prev = Vec::new();
        let mut pairs = Vec::new();
        for (_, obs_idx, prev_idx) in edges {
            if !used_obs.contains(&obs_idx) && !used_prev.contains(&prev_idx) {
                used_obs.push(obs_idx);
                used_prev.push(prev_idx);
                pairs.push((obs_idx, prev_idx));
            }
        }
        pairs
    }
}

impl IdentityMatcher for NearestNeighborMatcher {
    fn assign(
        &self,
        previous: Option<&Frame>,
        timestamp: i64,
        hands: &mut [Hand],
        ids: &mut EntityIds,
    ) {
        // strip provisional IDs first; everything unmatched ends up fresh
        for hand in hands.iter_mut() {
            hand.id = -1;
            for p in &mut hand.pointables {
                p.id = -1;
            }
        }

        if let Some(prev) = previous.filter(|f| f.is_valid()) {
            let dt = ((timestamp - prev.timestamp) as f32 / 1_000_000.0).max(0.0);

            let predicted: Vec<_> = prev
                .hands
                .iter()
                .enumerate()
                .map(|(i, h)| (h.palm_position + h.palm_velocity * dt, i))
                .collect();
            let observed: Vec<_> = hands
                .iter()
                .enumerate()
                .map(|(i, h)| (h.palm_position, i))
                .collect();

            for (obs_idx, prev_idx) in self.pair(&predicted, &observed) {
                let prev_hand = &prev.hands[prev_idx];
                hands[obs_idx].id = prev_hand.id;

                // pointables follow the same rule inside the matched hand
                let predicted_tips: Vec<_> = prev_hand
                    .pointables
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (p.tip_position + p.tip_velocity * dt, i))
                    .collect();
                let observed_tips: Vec<_> = hands[obs_idx]
                    .pointables
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (p.tip_position, i))
                    .collect();
                for (tip_obs, tip_prev) in self.pair(&predicted_tips, &observed_tips) {
                    hands[obs_idx].pointables[tip_obs].id = prev_hand.pointables[tip_prev].id;
                }
            }
        }

        for hand in hands.iter_mut() {
            if hand.id < 0 {
                hand.id = ids.next();
            }
            for p in &mut hand.pointables {
                if p.id < 0 {
                    p.id = ids.next();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector;
    use crate::synth;

    #[test]
    fn ring_buffer_keeps_the_newest_sixty() {
        let mut history = FrameHistory::new();
        for frame in synth::static_frames(100) {
            history.insert(Arc::new(frame));
        }
        assert_eq!(history.len(), HISTORY_DEPTH);
        // frames are numbered 0..100 by synth
        assert_eq!(history.frame(0).id, 99);
        assert_eq!(history.frame(59).id, 40);
        assert!(!history.frame(60).is_valid());
        assert!(!history.frame(10_000).is_valid());
    }

    #[test]
    fn empty_history_returns_the_sentinel() {
        let history = FrameHistory::new();
        assert!(history.is_empty());
        assert!(!history.frame(0).is_valid());
    }

    #[test]
    fn continuously_observed_hand_keeps_its_id() {
        let matcher = NearestNeighborMatcher::default();
        let mut ids = EntityIds::default();
        let frames = synth::circle_frames(30);

        let mut prev: Option<Frame> = None;
        let mut hand_ids = Vec::new();
        for f in &frames {
            let mut hands = f.hands.clone();
            matcher.assign(prev.as_ref(), f.timestamp, &mut hands, &mut ids);
            hand_ids.push(hands[0].id);
            let mut stamped = f.clone();
            stamped.hands = hands;
            prev = Some(stamped);
        }
        assert!(hand_ids.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn reacquisition_after_a_jump_gets_a_new_id() {
        let matcher = NearestNeighborMatcher::default();
        let mut ids = EntityIds::default();
        let base = synth::two_hand_frame();

        let mut first = base.hands.clone();
        matcher.assign(None, base.timestamp, &mut first, &mut ids);
        let old_id = first[0].id;

        let mut prev = base.clone();
        prev.hands = first;

        // teleport far beyond the gate: heuristic treats it as a new hand
        let jumped = synth::translated(&base, Vector::new(500.0, 0.0, 0.0));
        let mut hands = jumped.hands.clone();
        matcher.assign(Some(&prev), jumped.timestamp + 10_000, &mut hands, &mut ids);
        assert!(hands.iter().all(|h| h.id != old_id));
    }

    #[test]
    fn ids_stay_unique_within_a_frame() {
        let matcher = NearestNeighborMatcher::default();
        let mut ids = EntityIds::default();
        let frame = synth::two_hand_frame();
        let mut hands = frame.hands.clone();
        matcher.assign(None, frame.timestamp, &mut hands, &mut ids);
        let mut seen = Vec::new();
        for h in &hands {
            assert!(!seen.contains(&h.id));
            seen.push(h.id);
            for p in &h.pointables {
                assert!(!seen.contains(&p.id));
                seen.push(p.id);
            }
        }
    }
}
