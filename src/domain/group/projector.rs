//! Pure fold from events to the materialized Group view.
//!
//! Every handler is a total function from `(current view, event)` to the
//! next view. Replay must never abort on a single bad historical event, so
//! unknown event types and malformed payloads are logged and skipped, and
//! events that do not fit the current state (a `MemberAdded` for an existing
//! member, a `JoinRequestProcessed` for a terminal request) are treated as
//! already applied and skipped as well. That makes the fold idempotent under
//! redelivery, which is what lets the incremental path and full rebuild
//! produce the same view.
//!
//! I/O (fetching the log, persisting the view) lives in
//! `application::Projection`; this module only folds.

use tracing::{debug, warn};

use crate::domain::foundation::{Amount, StateMachine};

use super::events::{
    ContributionMade, GroupCreated, GroupEvent, JoinRequestCreated, JoinRequestProcessed,
    MemberAdded, PayoutProcessed, StoredEvent,
};
use super::{Group, JoinAction, JoinRequest, JoinRequestState, Member, MemberRole};

/// Replays group events into the materialized view.
pub struct Projector;

impl Projector {
    /// Folds a full ordered event sequence into a view.
    ///
    /// Returns `None` when the sequence contains no applicable
    /// `GroupCreated`.
    pub fn replay(events: &[StoredEvent]) -> Option<Group> {
        events.iter().fold(None, Self::apply_stored)
    }

    /// Applies one stored event, decoding it first.
    ///
    /// Decode failures are logged and the event is skipped; one bad
    /// historical event must not make a group unrecoverable.
    ///
    /// `last_sequence` advances over skipped events too, so a view that has
    /// moved past a bad event is never considered behind the log because
    /// of it.
    pub fn apply_stored(state: Option<Group>, stored: &StoredEvent) -> Option<Group> {
        let next = match stored.decode() {
            Ok(event) => Self::apply(state, &event),
            Err(err) => {
                warn!(
                    group_id = %stored.group_id,
                    sequence = stored.sequence,
                    event_type = %stored.event_type,
                    error = %err,
                    "skipping undecodable event during replay"
                );
                state
            }
        };
        next.map(|mut group| {
            group.last_sequence = group.last_sequence.max(stored.sequence);
            group
        })
    }

    /// Applies one decoded event.
    ///
    /// This is the incremental path used by command handlers after a
    /// successful append; its result is identical to what a full rebuild
    /// over the extended log would produce.
    pub fn apply(state: Option<Group>, event: &GroupEvent) -> Option<Group> {
        match (state, event) {
            (None, GroupEvent::GroupCreated(payload)) => Some(Self::create(payload)),
            (Some(group), GroupEvent::GroupCreated(_)) => {
                warn!(group_id = %group.group_id, "duplicate GroupCreated ignored");
                Some(group)
            }
            (None, other) => {
                warn!(
                    group_id = %other.group_id(),
                    event_type = other.event_type(),
                    "event for nonexistent group skipped"
                );
                None
            }
            (Some(mut group), event) => {
                match event {
                    GroupEvent::JoinRequestCreated(p) => Self::add_request(&mut group, p),
                    GroupEvent::JoinRequestProcessed(p) => Self::process_request(&mut group, p),
                    GroupEvent::JoinRequestRejected(_) => {
                        // Rejection facts feed the cooldown/ban counters,
                        // which read the log directly; the view keeps the
                        // request state from JoinRequestProcessed.
                        debug!(group_id = %group.group_id, "JoinRequestRejected applied (no view change)");
                    }
                    GroupEvent::MemberAdded(p) => Self::add_member(&mut group, p),
                    GroupEvent::PayoutProcessed(p) => Self::process_payout(&mut group, p),
                    GroupEvent::ContributionMade(p) => Self::add_contribution(&mut group, p),
                    GroupEvent::UserLeftGroup(p) => {
                        // Member removal is unimplemented upstream; members
                        // are never deleted from this view.
                        warn!(
                            group_id = %group.group_id,
                            user_id = %p.user_id,
                            "UserLeftGroup recognized but not applied"
                        );
                    }
                    GroupEvent::GroupCreated(_) => unreachable!("handled above"),
                }
                Some(group)
            }
        }
    }

    fn create(payload: &GroupCreated) -> Group {
        let members = payload
            .member_ids
            .iter()
            .map(|user_id| {
                let (role, username) = if user_id == &payload.admin_id {
                    (MemberRole::Founder, payload.admin_username.clone())
                } else {
                    // Initial non-admin members arrive as bare ids; their
                    // usernames catch up when the user service syncs.
                    (MemberRole::Member, user_id.to_string())
                };
                Member::new(user_id.clone(), username, role, payload.created_at)
            })
            .collect();

        Group {
            group_id: payload.group_id.clone(),
            name: payload.name.clone(),
            description: payload.description.clone(),
            admin_id: payload.admin_id.clone(),
            visibility: payload.visibility,
            min_contribution: payload.min_contribution,
            max_members: payload.max_members,
            contribution_frequency: payload.contribution_frequency,
            payout_frequency: payload.payout_frequency,
            balance: Amount::ZERO,
            members,
            requests: Vec::new(),
            payout_order: Vec::new(),
            current_payout_position: 0,
            last_payout_recipient: None,
            last_payout_date: None,
            created_at: payload.created_at,
            last_sequence: 0,
            version: 0,
        }
    }

    fn add_request(group: &mut Group, payload: &JoinRequestCreated) {
        if group.request(&payload.request_id).is_some() {
            debug!(
                group_id = %group.group_id,
                request_id = %payload.request_id,
                "duplicate JoinRequestCreated skipped"
            );
            return;
        }
        group.requests.push(JoinRequest {
            request_id: payload.request_id,
            user_id: payload.user_id.clone(),
            username: payload.username.clone(),
            state: JoinRequestState::Waiting,
            requested_at: payload.requested_at,
        });
    }

    fn process_request(group: &mut Group, payload: &JoinRequestProcessed) {
        let Some(request) = group
            .requests
            .iter_mut()
            .find(|r| r.request_id == payload.request_id)
        else {
            warn!(
                group_id = %group.group_id,
                request_id = %payload.request_id,
                "JoinRequestProcessed for unknown request skipped"
            );
            return;
        };
        let target = match payload.action {
            JoinAction::Accept => JoinRequestState::Accepted,
            JoinAction::Reject => JoinRequestState::Rejected,
        };
        match request.state.transition_to(target) {
            Ok(next) => request.state = next,
            Err(_) => debug!(
                group_id = %group.group_id,
                request_id = %payload.request_id,
                "JoinRequestProcessed for terminal request skipped"
            ),
        }
    }

    fn add_member(group: &mut Group, payload: &MemberAdded) {
        if group.is_member(&payload.user_id) {
            debug!(
                group_id = %group.group_id,
                user_id = %payload.user_id,
                "duplicate MemberAdded skipped"
            );
            return;
        }
        group.members.push(Member::new(
            payload.user_id.clone(),
            payload.username.clone(),
            payload.role,
            payload.added_at,
        ));
        // Keep an initialized rotation a permutation of member ids: late
        // joiners go to the back of the line.
        if !group.payout_order.is_empty() {
            group.payout_order.push(payload.user_id.clone());
        }
    }

    fn process_payout(group: &mut Group, payload: &PayoutProcessed) {
        let order = group.effective_payout_order();
        if order.is_empty() {
            warn!(group_id = %group.group_id, "PayoutProcessed on memberless group skipped");
            return;
        }
        // Materialize the lazily derived order so the advance below is
        // against a fixed permutation.
        group.payout_order = order;
        group.balance = group.balance.saturating_sub(payload.amount);
        group.last_payout_recipient = Some(payload.recipient_id.clone());
        group.last_payout_date = Some(payload.payout_date);
        let len = group.payout_order.len() as u32;
        group.current_payout_position = (group.current_payout_position % len + 1) % len;
    }

    fn add_contribution(group: &mut Group, payload: &ContributionMade) {
        let Some(member) = group
            .members
            .iter_mut()
            .find(|m| m.user_id == payload.user_id)
        else {
            warn!(
                group_id = %group.group_id,
                user_id = %payload.user_id,
                "ContributionMade by non-member skipped"
            );
            return;
        };
        member.contribution = member.contribution + payload.amount;
        member.last_active = payload.contributed_at;
        group.balance = group.balance + payload.amount;
    }
}
