use embedded_hal::digital::InputPin;

use crate::blinds::line::majority_level;
use crate::config::MajorityVote;

/// Start-up level of an input, decided by majority vote over repeated reads.
/// A failed read counts as low.
pub fn settled_level<P: InputPin>(pin: &mut P, vote: MajorityVote) -> bool {
    majority_level(vote.samples, vote.threshold, || pin.is_high().unwrap_or(false))
}
