use rand::seq::SliceRandom;
use rand::RngCore;

use crate::models::ChannelStatus;
use crate::models::ChannelStatuses;

/// Returns `true` if the player is already playing `stream_id`.
///
/// The player reports a decorated media reference, so this is a contains
/// match rather than an exact one.  An empty `stream_id` never matches.
pub fn is_current_stream(current_stream_id: &str, stream_id: &str) -> bool {
    !stream_id.is_empty() && current_stream_id.contains(stream_id)
}

/// Picks the first live channel in `priority` order.
///
/// Returns `None` if no listed channel is live, or if the first live channel
/// is already playing.  A lower priority channel is never picked over a
/// higher priority one which is already playing.
pub fn select_by_priority(
    priority: &[String],
    statuses: &ChannelStatuses,
    current_stream_id: &str,
) -> Option<(String, String)> {
    let (name, status) = priority.iter().find_map(|name| {
        statuses
            .get(name)
            .filter(|status| status.is_live)
            .map(|status| (name, status))
    })?;
    if is_current_stream(current_stream_id, &status.stream_id) {
        tracing::debug!(channel = name, stream.id = status.stream_id, "Already playing");
        return None;
    }
    Some((name.clone(), status.stream_id.clone()))
}

/// Picks a live channel at random.
///
/// All channel names are shuffled with `rng`, then the first live channel
/// which is not already playing is returned.
pub fn select_random_live<'a, R>(
    statuses: &'a ChannelStatuses,
    current_stream_id: &str,
    rng: &mut R,
) -> Option<(&'a str, &'a ChannelStatus)>
where
    R: RngCore + ?Sized,
{
    let mut indices: Vec<usize> = (0..statuses.len()).collect();
    indices.shuffle(rng);
    indices
        .into_iter()
        .filter_map(|i| statuses.get_index(i))
        .find(|(_, status)| {
            status.is_live && !is_current_stream(current_stream_id, &status.stream_id)
        })
        .map(|(name, status)| (name.as_str(), status))
}

// </coverage:exclude>
